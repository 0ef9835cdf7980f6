//! Database capability traits.
//!
//! The query layer never talks to a driver directly. It resolves an
//! `Arc<dyn Connection>` through the execution context, and connections are
//! opened by the [`Connector`] registered for a database name. The built-in
//! Postgres driver lives in [`crate::postgres`]; any other backend plugs in by
//! implementing these two traits.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::DbConfig;
use crate::error::OrmResult;
use crate::row::Row;
use crate::value::Value;

/// Outcome of a single write statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    /// Identity generated by the statement, as reported by the driver.
    pub last_insert_id: Option<i64>,
}

/// An open database session.
///
/// SQL passed to every method uses `?` placeholders; drivers rewrite them to
/// their native form.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Run a statement and return all rows.
    async fn query(&self, sql: &str, args: &[Value]) -> OrmResult<Vec<Row>>;

    /// Run a write statement.
    async fn exec(&self, sql: &str, args: &[Value]) -> OrmResult<ExecOutcome>;

    /// Run one statement text once per argument row; returns the total of
    /// affected rows.
    async fn exec_many(&self, sql: &str, rows: &[Vec<Value>]) -> OrmResult<u64>;

    async fn commit(&self) -> OrmResult<()>;

    async fn rollback(&self) -> OrmResult<()>;

    /// Close the session. Called exactly once by the execution context.
    async fn close(&self) -> OrmResult<()>;
}

/// Opens connections for a registered database.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a session. With `autocommit == false` the session starts inside
    /// a transaction that ends with `commit` or `rollback`.
    async fn connect(&self, config: &DbConfig, autocommit: bool) -> OrmResult<Arc<dyn Connection>>;
}
