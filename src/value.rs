//! Value casting and SQL literal rendering.

use crate::schema::ColumnType;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum SqlLiteral {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlLiteral {
    pub fn is_text(&self) -> bool {
        matches!(self, SqlLiteral::Text(_))
    }

    /// The value as a user would read it, without SQL quoting.
    pub fn plain(&self) -> String {
        match self {
            SqlLiteral::Integer(i) => i.to_string(),
            SqlLiteral::Real(r) => r.to_string(),
            SqlLiteral::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for SqlLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlLiteral::Integer(i) => write!(f, "{}", i),
            SqlLiteral::Real(r) => write!(f, "{}", r),
            SqlLiteral::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

/// Cast a raw value for a column of `column_type`. Values that do not parse
/// as the column's numeric type degrade to text literals.
pub fn cast(raw: &str, column_type: ColumnType) -> SqlLiteral {
    let trimmed = raw.trim();
    match column_type {
        ColumnType::Integer => {
            if let Ok(i) = trimmed.parse::<i64>() {
                return SqlLiteral::Integer(i);
            }
        }
        ColumnType::Real => {
            if let Ok(r) = trimmed.parse::<f64>() {
                if r.is_finite() {
                    return SqlLiteral::Real(r);
                }
            }
        }
        ColumnType::Text => {}
    }
    SqlLiteral::Text(raw.to_string())
}

/// Double-quoted identifier with embedded quotes doubled.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
