mod common;

use common::{schema, statement};
use rusqlite::Connection;

fn seeded() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    for table in &schema().tables {
        let columns: Vec<String> = table
            .columns
            .iter()
            .map(|c| {
                let pk = if c.primary_key { " PRIMARY KEY" } else { "" };
                format!("\"{}\" {}{}", c.name, c.declared_type, pk)
            })
            .collect();
        conn.execute(&format!("CREATE TABLE \"{}\" ({})", table.name, columns.join(", ")), [])
            .unwrap();
    }
    conn.execute_batch(
        "INSERT INTO EMPLOYEE VALUES (1, 'Kavya', 'Rao', 'kavya@x.com', '111', '12-JAN-21', 4500.0, 10);
         INSERT INTO EMPLOYEE VALUES (2, 'Ammu', 'Nair', 'ammu@x.com', '222', '03-MAR-22', 7000.0, 20);
         INSERT INTO EMPLOYEE VALUES (3, 'Ravi', 'Kumar', 'ravi@x.com', '333', '15-JAN-22', 5200.0, 10);
         INSERT INTO DEPARTMENT VALUES (10, 'Sales');
         INSERT INTO DEPARTMENT VALUES (20, 'Support');",
    )
    .unwrap();
    conn
}

fn row_count(conn: &Connection, sql: &str) -> usize {
    let mut stmt = conn.prepare(sql).unwrap();
    let mut rows = stmt.query([]).unwrap();
    let mut n = 0;
    while rows.next().unwrap().is_some() {
        n += 1;
    }
    n
}

fn scalar(conn: &Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |row| row.get(0)).unwrap()
}

#[test]
fn test_delete_by_name_executes() {
    let conn = seeded();
    let sql = statement("delete employee record whose employee name is 'Kavya'");
    assert_eq!(conn.execute(&sql, []).unwrap(), 1);
    assert_eq!(scalar(&conn, "SELECT COUNT(*) FROM EMPLOYEE"), 2);
}

#[test]
fn test_delete_by_column_value_executes() {
    let conn = seeded();
    let sql = statement("delete employees with salary 5200");
    assert_eq!(conn.execute(&sql, []).unwrap(), 1);
    assert_eq!(scalar(&conn, "SELECT COUNT(*) FROM EMPLOYEE WHERE FIRST_NAME = 'Ravi'"), 0);
}

#[test]
fn test_update_by_name_executes() {
    let conn = seeded();
    let sql = statement(r#"update phone number 987654321 where employee name is "Ammu""#);
    assert_eq!(conn.execute(&sql, []).unwrap(), 1);
    let phone: String = conn
        .query_row("SELECT PHONE_NUMBER FROM EMPLOYEE WHERE EMPLOYEE_ID = 2", [], |row| row.get(0))
        .unwrap();
    assert_eq!(phone, "987654321");
}

#[test]
fn test_filters_select_expected_rows() {
    let conn = seeded();
    assert_eq!(row_count(&conn, &statement("show employees where salary greater than 5000")), 2);
    assert_eq!(row_count(&conn, &statement("show employees hired in january")), 2);
    assert_eq!(
        row_count(&conn, &statement("show employees whose first name starts with 'ka'")),
        1
    );
    assert_eq!(row_count(&conn, &statement("show employee table")), 3);
    assert_eq!(row_count(&conn, &statement("show salary of Ravi")), 1);
}

#[test]
fn test_aggregates_execute() {
    let conn = seeded();
    assert_eq!(scalar(&conn, &statement("how many employees are there")), 3);
    assert_eq!(row_count(&conn, &statement("count employees per department")), 2);
}

#[test]
fn test_insert_executes() {
    let conn = seeded();
    let sql = statement("insert into employee first name = Anu, salary = 5000");
    assert_eq!(conn.execute(&sql, []).unwrap(), 1);
    assert_eq!(scalar(&conn, "SELECT COUNT(*) FROM EMPLOYEE"), 4);
}

#[test]
fn test_ranking_orders_rows() {
    let conn = seeded();
    let sql = statement("show the top 2 employees by salary");
    let first: String = conn.query_row(&sql, [], |row| row.get(1)).unwrap();
    assert_eq!(first, "Ammu");
    assert_eq!(row_count(&conn, &sql), 2);
}

#[test]
fn test_explicit_ddl_executes() {
    let conn = seeded();
    let sql = statement("ALTER TABLE EMPLOYEE ADD COLUMN HOSPITAL_ID INTEGER");
    conn.execute(&sql, []).unwrap();
    assert_eq!(row_count(&conn, "SELECT HOSPITAL_ID FROM EMPLOYEE"), 3);
}
