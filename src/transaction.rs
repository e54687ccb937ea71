//! Transaction wrapper around a lazily opened connection.

use crate::driver::{Connection, DataSource};
use crate::error::{MapperError, MapperResult};
use std::sync::Arc;
use tracing::debug;

pub trait Transaction: Send {
    fn connection(&mut self) -> MapperResult<&mut dyn Connection>;
    fn commit(&mut self) -> MapperResult<()>;
    fn rollback(&mut self) -> MapperResult<()>;
    fn close(&mut self) -> MapperResult<()>;
}

/// Uses the connection's own commit/rollback. The connection is opened on first use.
pub struct JdbcTransaction {
    data_source: Arc<dyn DataSource>,
    autocommit: bool,
    connection: Option<Box<dyn Connection>>,
}

impl JdbcTransaction {
    pub fn new(data_source: Arc<dyn DataSource>, autocommit: bool) -> Self {
        Self { data_source, autocommit, connection: None }
    }

    pub fn is_open(&self) -> bool { self.connection.is_some() }
}

impl Transaction for JdbcTransaction {
    fn connection(&mut self) -> MapperResult<&mut dyn Connection> {
        if self.connection.is_none() {
            debug!(target: "sqlmapper::session", "opening connection (autocommit={})", self.autocommit);
            self.connection = Some(self.data_source.connection(self.autocommit)?);
        }
        match self.connection.as_deref_mut() {
            Some(c) => Ok(c),
            None => Err(MapperError::builder("connection unavailable")),
        }
    }

    fn commit(&mut self) -> MapperResult<()> {
        if let Some(c) = self.connection.as_mut() {
            if !c.is_autocommit() {
                debug!(target: "sqlmapper::session", "committing connection");
                c.commit()?;
            }
        }
        Ok(())
    }

    fn rollback(&mut self) -> MapperResult<()> {
        if let Some(c) = self.connection.as_mut() {
            if !c.is_autocommit() {
                debug!(target: "sqlmapper::session", "rolling back connection");
                c.rollback()?;
            }
        }
        Ok(())
    }

    fn close(&mut self) -> MapperResult<()> {
        if let Some(mut c) = self.connection.take() {
            debug!(target: "sqlmapper::session", "closing connection");
            c.close()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::memory::{ColumnSpec, MemoryDatabase};
    use crate::value::{JdbcType, Value};

    #[test]
    fn connection_opens_lazily_and_commits() {
        let db = MemoryDatabase::new();
        db.create_table("t", vec![ColumnSpec::new("a", JdbcType::Integer)]).unwrap();
        let mut tx = JdbcTransaction::new(Arc::new(db.clone()), false);
        assert!(!tx.is_open());
        tx.commit().unwrap();
        {
            let conn = tx.connection().unwrap();
            let mut st = conn.prepare("INSERT INTO t (a) VALUES (?)", false).unwrap();
            st.set_value(1, Value::Int(1)).unwrap();
            st.execute_update().unwrap();
        }
        assert!(tx.is_open());
        assert_eq!(db.row_count("t"), 0);
        tx.commit().unwrap();
        assert_eq!(db.row_count("t"), 1);
        tx.close().unwrap();
        assert!(!tx.is_open());
    }
}
