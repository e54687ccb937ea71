use super::*;
use crate::driver::ColumnMeta;
use crate::mapping::{ResultDescriptor, ResultMapping, SqlCommandType};
use crate::scripting::SqlSource;
use crate::value::JdbcType;

#[derive(Debug, Clone, Default, PartialEq)]
struct Person { id: i64, name: Option<String>, score: f64 }
crate::mapped_entity!(Person { id: i64, name: Option<String>, score: f64 });

fn declared(id: &str, result_type: ResultDescriptor, result_map: Option<ResultMap>) -> MappedStatement {
    let registry = Arc::new(TypeHandlerRegistry::new());
    let mut b = MappedStatement::builder(id, SqlCommandType::Select, SqlSource::from_script("SELECT * FROM people", &registry).unwrap())
        .result_type(result_type);
    if let Some(rm) = result_map { b = b.result_map(Arc::new(rm)); }
    b.build().unwrap()
}

fn statement(result_map: Option<ResultMap>) -> MappedStatement {
    declared("people.all", ResultDescriptor::Object("Person".into()), result_map)
}

fn scalar_statement(vt: ValueType) -> MappedStatement { declared("people.column", ResultDescriptor::Scalar(vt), None) }

fn people() -> ResultSet {
    ResultSet::new(
        vec![
            ColumnMeta::new("ID", JdbcType::BigInt),
            ColumnMeta::new("PERSON_NAME", JdbcType::Varchar),
            ColumnMeta::new("SCORE", JdbcType::Double),
        ],
        vec![
            vec![Value::Long(1), Value::from("ann"), Value::Double(2.5)],
            vec![Value::Long(2), Value::Null, Value::Null],
        ],
    )
}

#[test]
fn column_name_strategy_ignores_unknown_columns() {
    let reg = TypeHandlerRegistry::new();
    let rows = DefaultResultSetHandler::<Person>::new().map_rows(&statement(None), &people(), &reg).unwrap();
    assert_eq!(rows[0], Person { id: 1, name: None, score: 2.5 });
    // null score is skipped for the non-nullable field
    assert_eq!(rows[1], Person { id: 2, name: None, score: 0.0 });
}

#[test]
fn result_map_strategy_matches_columns_case_insensitively() {
    let rm = ResultMap::builder("personMap", "Person")
        .mapping(ResultMapping::new("id", "id"))
        .mapping(ResultMapping::new("name", "person_name"))
        .build()
        .unwrap();
    let reg = TypeHandlerRegistry::new();
    let rows = DefaultResultSetHandler::<Person>::new().map_rows(&statement(Some(rm)), &people(), &reg).unwrap();
    assert_eq!(rows[0], Person { id: 1, name: Some("ann".into()), score: 0.0 });
    assert_eq!(rows[1].name, None);
}

#[test]
fn result_map_with_unknown_property_fails() {
    let rm = ResultMap::builder("bad", "Person").mapping(ResultMapping::new("nickname", "person_name")).build().unwrap();
    let reg = TypeHandlerRegistry::new();
    let err = DefaultResultSetHandler::<Person>::new().map_rows(&statement(Some(rm)), &people(), &reg).unwrap_err();
    assert_eq!(err.code_str(), "property");
}

#[test]
fn scalars_read_first_column() {
    let reg = TypeHandlerRegistry::new();
    let ms = scalar_statement(ValueType::Long);
    let ids = DefaultResultSetHandler::<i64>::new().map_rows(&ms, &people(), &reg).unwrap();
    assert_eq!(ids, vec![1, 2]);
    let rs = ResultSet::new(vec![ColumnMeta::new("n", JdbcType::Varchar)], vec![vec![Value::Null], vec![Value::from("x")]]);
    let ms = scalar_statement(ValueType::String);
    let names = DefaultResultSetHandler::<Option<String>>::new().map_rows(&ms, &rs, &reg).unwrap();
    assert_eq!(names, vec![None, Some("x".to_string())]);
    assert!(DefaultResultSetHandler::<String>::new().map_rows(&ms, &rs, &reg).is_err());
}

#[test]
fn requested_type_must_fit_declared_result() {
    let reg = TypeHandlerRegistry::new();
    let err = DefaultResultSetHandler::<Person>::new().map_rows(&scalar_statement(ValueType::String), &people(), &reg).unwrap_err();
    assert_eq!(err.code_str(), "result_type_mismatch");
    let err = DefaultResultSetHandler::<i64>::new().map_rows(&statement(None), &people(), &reg).unwrap_err();
    assert_eq!(err.code_str(), "result_type_mismatch");
    let rm = ResultMap::builder("personMap", "Person").mapping(ResultMapping::new("id", "id")).build().unwrap();
    let mapped = declared("people.mapped", ResultDescriptor::Scalar(ValueType::Long), Some(rm));
    assert!(DefaultResultSetHandler::<Value>::new().map_rows(&mapped, &people(), &reg).is_err());
    // records fit either declaration
    assert_eq!(DefaultResultSetHandler::<Record>::new().map_rows(&scalar_statement(ValueType::Long), &people(), &reg).unwrap().len(), 2);
    assert_eq!(DefaultResultSetHandler::<Value>::new().map_rows(&scalar_statement(ValueType::Object), &people(), &reg).unwrap()[0], Value::Long(1));
}

#[test]
fn records_take_every_column() {
    let reg = TypeHandlerRegistry::new();
    let rows = DefaultResultSetHandler::<Record>::new().map_rows(&statement(None), &people(), &reg).unwrap();
    assert_eq!(rows[0].get("PERSON_NAME"), Some(&Value::from("ann")));
    assert_eq!(rows[1].get("SCORE"), Some(&Value::Null));
}

#[test]
fn handler_recognises_its_own_lists() {
    let reg = TypeHandlerRegistry::new();
    let h = DefaultResultSetHandler::<Person>::new();
    let list = h.handle_result_set(&statement(None), people(), &reg).unwrap();
    assert!(h.accepts(&list));
    assert!(!DefaultResultSetHandler::<Record>::new().accepts(&list));
}
