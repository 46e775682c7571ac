//! Schema model supplied by the caller.
//!
//! The wire shape follows the JSON produced by the schema extraction service:
//! `{"tables": [{"name", "columns": [{"name", "type", "primaryKey", "notNull"}], "rowCount"}]}`.

use crate::error::{Nl2SqlError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub tables: Vec<Table>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    /// Informational only; used to describe what an unsafe statement would touch.
    #[serde(default)]
    pub row_count: u64,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(rename = "type", default)]
    pub declared_type: String,
    #[serde(default, alias = "pk")]
    pub primary_key: bool,
    #[serde(default, alias = "notnull")]
    pub not_null: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    pub column: String,
    pub references_table: String,
    pub references_column: String,
}

/// Storage class of a column, used only to decide how values are cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    /// SQLite-style affinity rules applied to a declared type name.
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.to_uppercase();
        if upper.contains("INT") {
            ColumnType::Integer
        } else if ["REAL", "FLOA", "DOUB", "NUMERIC", "DECIMAL", "NUMBER"]
            .iter()
            .any(|marker| upper.contains(marker))
        {
            ColumnType::Real
        } else {
            ColumnType::Text
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Real)
    }
}

impl Column {
    pub fn new(name: &str, declared_type: &str) -> Self {
        Self {
            name: name.to_string(),
            declared_type: declared_type.to_string(),
            primary_key: false,
            not_null: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.not_null = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn affinity(&self) -> ColumnType {
        ColumnType::from_declared(&self.declared_type)
    }
}

impl Table {
    pub fn new(name: &str, columns: Vec<Column>) -> Self {
        Self {
            name: name.to_string(),
            columns,
            row_count: 0,
            foreign_keys: Vec::new(),
        }
    }

    pub fn with_row_count(mut self, row_count: u64) -> Self {
        self.row_count = row_count;
        self
    }

    pub fn with_foreign_key(mut self, column: &str, references_table: &str, references_column: &str) -> Self {
        self.foreign_keys.push(ForeignKey {
            column: column.to_string(),
            references_table: references_table.to_string(),
            references_column: references_column.to_string(),
        });
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.primary_key)
    }

    /// Columns a positional INSERT may fill.
    pub fn insertable_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| !c.primary_key)
    }

    /// The column that stands for "the name" of a row: an exact `name`, `first_name`
    /// or `full_name` column first, then the first column containing `name`.
    pub fn name_column(&self) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| {
                let lower = c.name.to_lowercase();
                lower == "name" || lower == "first_name" || lower == "full_name"
            })
            .or_else(|| self.columns.iter().find(|c| c.name.to_lowercase().contains("name")))
    }

    /// First column whose name suggests a stored date.
    pub fn date_column(&self, hints: &[String]) -> Option<&Column> {
        self.columns.iter().find(|c| {
            let lower = c.name.to_lowercase();
            hints.iter().any(|h| lower.contains(h.as_str()))
        })
    }

    /// Whether `word` names this table, ignoring case and a plural suffix.
    pub fn is_named_by(&self, word: &str) -> bool {
        let name = self.name.to_lowercase();
        let word = word.to_lowercase();
        word == name
            || word == format!("{}s", name)
            || word == format!("{}es", name)
            || name == format!("{}s", word)
            || (name.ends_with('y') && word == format!("{}ies", &name[..name.len() - 1]))
            || (word.ends_with('y') && name == format!("{}ies", &word[..word.len() - 1]))
    }
}

impl Schema {
    pub fn new(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let schema: Schema = serde_json::from_str(json)?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    fn validate(&self) -> Result<()> {
        for (idx, table) in self.tables.iter().enumerate() {
            if table.name.trim().is_empty() {
                return Err(Nl2SqlError::Schema(format!("Table #{} has no name", idx + 1)));
            }
            if self.tables[..idx].iter().any(|t| t.name.eq_ignore_ascii_case(&table.name)) {
                return Err(Nl2SqlError::Schema(format!("Duplicate table name: {}", table.name)));
            }
            for (col_idx, column) in table.columns.iter().enumerate() {
                if table.columns[..col_idx].iter().any(|c| c.name.eq_ignore_ascii_case(&column.name)) {
                    return Err(Nl2SqlError::Schema(format!(
                        "Duplicate column {} in table {}",
                        column.name, table.name
                    )));
                }
            }
        }
        Ok(())
    }
}
