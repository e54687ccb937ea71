use super::*;

fn users_db() -> MemoryDatabase {
    let db = MemoryDatabase::new();
    db.create_table("users", vec![
        ColumnSpec::new("id", JdbcType::BigInt).auto_increment(),
        ColumnSpec::new("name", JdbcType::Varchar),
        ColumnSpec::new("age", JdbcType::Integer),
    ]).unwrap();
    db
}

fn insert(conn: &mut MemoryConnection, name: &str, age: Value) -> u64 {
    let mut st = conn.prepare("INSERT INTO users (name, age) VALUES (?, ?)", false).unwrap();
    st.set_value(1, Value::from(name)).unwrap();
    st.set_value(2, age).unwrap();
    st.execute_update().unwrap()
}

#[test]
fn insert_select_round_trip() {
    let db = users_db();
    let mut conn = db.connect(true);
    assert_eq!(insert(&mut conn, "ann", Value::Long(31)), 1);
    assert_eq!(insert(&mut conn, "bob", Value::Null), 1);

    let mut st = conn.prepare("select id, name, age from users where name = ?", false).unwrap();
    st.set_value(1, Value::from("ann")).unwrap();
    let rs = st.execute_query().unwrap();
    assert_eq!(rs.len(), 1);
    let row = &rs.rows()[0];
    assert_eq!(row.get_by_name("ID"), Some(&Value::Long(1)));
    // BIGINT-to-INTEGER narrowing on store
    assert_eq!(row.get_by_name("age"), Some(&Value::Int(31)));
    assert_eq!(row.jdbc_type(3), Some(JdbcType::Integer));
    drop(st);
    assert_eq!(db.executed_statements(), 3);
    assert_eq!(db.open_statements(), 0);
}

#[test]
fn where_ordering_and_null_tests() {
    let db = users_db();
    let mut conn = db.connect(true);
    insert(&mut conn, "ann", Value::Int(31));
    insert(&mut conn, "bob", Value::Null);
    insert(&mut conn, "cy", Value::Int(12));

    let mut st = conn.prepare("SELECT name FROM users WHERE age IS NOT NULL ORDER BY age DESC", false).unwrap();
    let names: Vec<Value> = st.execute_query().unwrap().rows().iter().map(|r| r.get(1).cloned().unwrap()).collect();
    assert_eq!(names, vec![Value::from("ann"), Value::from("cy")]);
    drop(st);

    let mut st = conn.prepare("SELECT * FROM users WHERE age >= 12 AND age < ?", false).unwrap();
    st.set_value(1, Value::Int(20)).unwrap();
    assert_eq!(st.execute_query().unwrap().len(), 1);
    drop(st);

    // comparisons against NULL never match
    let mut st = conn.prepare("SELECT * FROM users WHERE age = ?", false).unwrap();
    st.set_null(1, JdbcType::Integer).unwrap();
    assert!(st.execute_query().unwrap().is_empty());
}

#[test]
fn update_and_delete_report_affected_rows() {
    let db = users_db();
    let mut conn = db.connect(true);
    insert(&mut conn, "ann", Value::Int(31));
    insert(&mut conn, "bob", Value::Int(40));

    let mut st = conn.prepare("UPDATE users SET age = ? WHERE age > 30", false).unwrap();
    st.set_value(1, Value::Int(1)).unwrap();
    assert_eq!(st.execute_update().unwrap(), 2);
    drop(st);

    let mut st = conn.prepare("DELETE FROM users WHERE name <> 'ann'", false).unwrap();
    assert_eq!(st.execute_update().unwrap(), 1);
    drop(st);
    assert_eq!(db.row_count("users"), 1);
}

#[test]
fn generated_keys_follow_auto_increment() {
    let db = users_db();
    let mut conn = db.connect(true);
    insert(&mut conn, "ann", Value::Null);
    let mut st = conn.prepare("INSERT INTO users (name) VALUES ('bob')", true).unwrap();
    st.execute_update().unwrap();
    let keys = st.generated_keys().unwrap();
    assert_eq!(keys.columns()[0].name, "id");
    assert_eq!(keys.rows()[0].get(1), Some(&Value::Long(2)));
}

#[test]
fn generated_keys_require_request_at_prepare() {
    let db = users_db();
    let mut conn = db.connect(true);
    let mut st = conn.prepare("INSERT INTO users (name) VALUES ('bob')", false).unwrap();
    st.execute_update().unwrap();
    assert!(st.generated_keys().is_err());
}

#[test]
fn transactional_connection_isolates_until_commit() {
    let db = users_db();
    let mut tx = db.connect(false);
    insert(&mut tx, "ann", Value::Null);
    assert_eq!(db.row_count("users"), 0);

    let mut st = tx.prepare("SELECT * FROM users", false).unwrap();
    assert_eq!(st.execute_query().unwrap().len(), 1);
    drop(st);

    tx.rollback().unwrap();
    assert_eq!(db.row_count("users"), 0);

    insert(&mut tx, "bob", Value::Null);
    tx.commit().unwrap();
    assert_eq!(db.row_count("users"), 1);
}

#[test]
fn commits_on_different_tables_both_survive() {
    let db = users_db();
    db.create_table("audit", vec![ColumnSpec::new("note", JdbcType::Varchar)]).unwrap();
    let mut first = db.connect(false);
    let mut second = db.connect(false);
    insert(&mut first, "ann", Value::Int(30));
    {
        let mut st = second.prepare("INSERT INTO audit (note) VALUES (?)", false).unwrap();
        st.set_value(1, Value::from("created ann")).unwrap();
        st.execute_update().unwrap();
    }
    first.commit().unwrap();
    second.commit().unwrap();
    assert_eq!(db.row_count("users"), 1);
    assert_eq!(db.row_count("audit"), 1);
}

#[test]
fn errors_carry_sqlstate() {
    let db = users_db();
    let mut conn = db.connect(true);
    let err = conn.prepare("SELECT * FROM nope", false).unwrap().execute_query().unwrap_err();
    assert_eq!(err.sqlstate.as_deref(), Some("42P01"));

    let err = conn.prepare("SELEKT 1", false).err().unwrap();
    assert_eq!(err.sqlstate.as_deref(), Some("42601"));

    let mut st = conn.prepare("SELECT * FROM users WHERE id = ?", false).unwrap();
    assert_eq!(st.execute_query().unwrap_err().sqlstate.as_deref(), Some("07001"));
    assert!(st.set_value(2, Value::Int(1)).is_err());
}

#[test]
fn closed_connection_refuses_work() {
    let db = users_db();
    let mut conn = db.connect(true);
    conn.close().unwrap();
    assert!(conn.prepare("SELECT * FROM users", false).is_err());
}
