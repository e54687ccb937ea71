//! Connection-provider boundary.
//!
//! The engine only needs "prepare / bind / execute / fetch rows / fetch generated keys /
//! close" from the store underneath it. Pooling and transaction wiring live behind
//! [`DataSource`]; [`memory`] is a small in-process store implementing the same contract.

pub mod memory;

use crate::ident::column_key;
use crate::value::{JdbcType, Value};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct DriverError {
    pub message: String,
    pub sqlstate: Option<String>,
}

impl DriverError {
    pub fn new<S: Into<String>>(message: S) -> Self { Self { message: message.into(), sqlstate: None } }
    pub fn with_state<S: Into<String>, C: Into<String>>(message: S, sqlstate: C) -> Self {
        Self { message: message.into(), sqlstate: Some(sqlstate.into()) }
    }
}

pub type DriverResult<T> = Result<T, DriverError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    pub jdbc_type: JdbcType,
}

impl ColumnMeta {
    pub fn new<S: Into<String>>(name: S, jdbc_type: JdbcType) -> Self { Self { name: name.into(), jdbc_type } }
}

/// One fetched row. Column metadata is shared by all rows of a result set.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<Vec<ColumnMeta>>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<Vec<ColumnMeta>>, values: Vec<Value>) -> Self { Self { columns, values } }

    pub fn columns(&self) -> &[ColumnMeta] { &self.columns }

    pub fn len(&self) -> usize { self.values.len() }
    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// Zero-based index of a column, matched case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let key = column_key(name);
        self.columns.iter().position(|c| column_key(&c.name) == key)
    }

    pub fn has_column(&self, name: &str) -> bool { self.column_index(name).is_some() }

    /// Value at a 1-based column position.
    pub fn get(&self, index: usize) -> Option<&Value> {
        if index == 0 { return None; }
        self.values.get(index - 1)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.column_index(name).and_then(|i| self.values.get(i))
    }

    /// Wire type of a 1-based column position.
    pub fn jdbc_type(&self, index: usize) -> Option<JdbcType> {
        if index == 0 { return None; }
        self.columns.get(index - 1).map(|c| c.jdbc_type)
    }

    pub fn jdbc_type_of(&self, name: &str) -> Option<JdbcType> {
        self.column_index(name).map(|i| self.columns[i].jdbc_type)
    }

    pub fn values(&self) -> &[Value] { &self.values }
}

/// Fully fetched result of a query or of a generated-keys request.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    columns: Arc<Vec<ColumnMeta>>,
    rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(columns: Vec<ColumnMeta>, rows: Vec<Vec<Value>>) -> Self {
        let columns = Arc::new(columns);
        let rows = rows.into_iter().map(|values| Row::new(columns.clone(), values)).collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[ColumnMeta] { &self.columns }
    pub fn rows(&self) -> &[Row] { &self.rows }
    pub fn len(&self) -> usize { self.rows.len() }
    pub fn is_empty(&self) -> bool { self.rows.is_empty() }
    pub fn into_rows(self) -> Vec<Row> { self.rows }
}

/// A statement prepared on a connection. Parameter indexes are 1-based.
pub trait PreparedStatement: Send {
    fn sql(&self) -> &str;
    fn set_value(&mut self, index: usize, value: Value) -> DriverResult<()>;
    fn set_null(&mut self, index: usize, jdbc_type: JdbcType) -> DriverResult<()>;
    fn execute_query(&mut self) -> DriverResult<ResultSet>;
    fn execute_update(&mut self) -> DriverResult<u64>;
    /// Keys generated by the last update; only available when generated-key retrieval was
    /// requested at prepare time.
    fn generated_keys(&mut self) -> DriverResult<ResultSet>;
    fn close(&mut self) -> DriverResult<()>;
}

pub trait Connection: Send {
    /// Prepare `sql`; `return_generated_keys` is fixed for the lifetime of the statement.
    fn prepare<'c>(&'c mut self, sql: &str, return_generated_keys: bool) -> DriverResult<Box<dyn PreparedStatement + 'c>>;
    fn commit(&mut self) -> DriverResult<()>;
    fn rollback(&mut self) -> DriverResult<()>;
    fn close(&mut self) -> DriverResult<()>;
    fn is_autocommit(&self) -> bool;
}

pub trait DataSource: Send + Sync {
    fn connection(&self, autocommit: bool) -> DriverResult<Box<dyn Connection>>;
}

/// Scoped ownership of a prepared statement: the statement is closed when the guard drops,
/// on success and on every error path.
pub struct StatementGuard<'c> {
    inner: Box<dyn PreparedStatement + 'c>,
    closed: bool,
}

impl<'c> StatementGuard<'c> {
    pub fn new(inner: Box<dyn PreparedStatement + 'c>) -> Self { Self { inner, closed: false } }

    pub fn close(mut self) -> DriverResult<()> {
        self.closed = true;
        self.inner.close()
    }
}

impl<'c> Deref for StatementGuard<'c> {
    type Target = dyn PreparedStatement + 'c;
    fn deref(&self) -> &Self::Target { self.inner.as_ref() }
}

impl<'c> DerefMut for StatementGuard<'c> {
    fn deref_mut(&mut self) -> &mut Self::Target { self.inner.as_mut() }
}

impl Drop for StatementGuard<'_> {
    fn drop(&mut self) {
        if self.closed { return; }
        if let Err(e) = self.inner.close() {
            debug!(target: "sqlmapper::exec", "closing statement failed: {}", e);
        }
    }
}
