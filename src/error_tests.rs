use super::*;
use std::error::Error as _;

#[test]
fn code_mapping() {
    assert_eq!(MapperError::expression("a ==", "unexpected end").code_str(), "expression_evaluation");
    assert_eq!(MapperError::NoTypeHandlerFound { value_type: ValueType::Object, jdbc_type: None }.code_str(), "no_type_handler");
    assert_eq!(MapperError::NullTypeRequired { index: 1 }.code_str(), "null_type_required");
    assert_eq!(MapperError::CacheKey("opaque".into()).code_str(), "cache_key");
    assert_eq!(MapperError::AmbiguousSingleResult { statement: "ns.all".into(), rows: 2 }.code_str(), "ambiguous_single_result");
    assert_eq!(MapperError::StatementNotFound("ns.x".into()).code_str(), "statement_not_found");
    assert_eq!(MapperError::ExecutorClosed.code_str(), "executor_closed");
    let mismatch = MapperError::ResultTypeMismatch { statement: "ns.names".into(), declared: "scalar".into(), requested: "Author".into() };
    assert_eq!(mismatch.code_str(), "result_type_mismatch");
    assert!(mismatch.to_string().contains("ns.names"));
}

#[test]
fn execution_error_keeps_original_cause() {
    let err = MapperError::Driver(DriverError::new("table 't' not found")).within_statement("ns.byId");
    assert_eq!(err.code_str(), "statement_execution");
    assert!(err.to_string().contains("ns.byId"));
    let cause = err.source().expect("cause");
    assert_eq!(cause.to_string(), "table 't' not found");
}

#[test]
fn within_statement_leaves_other_errors_alone() {
    let err = MapperError::NullTypeRequired { index: 2 }.within_statement("ns.insert");
    assert!(matches!(err, MapperError::NullTypeRequired { index: 2 }));
    assert!(err.is_configuration_gap());
}
