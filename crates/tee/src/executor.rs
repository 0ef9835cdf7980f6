//! Statement execution against the current execution unit.
//!
//! Every call resolves its connection through [`context::acquire`], runs the
//! statement, then releases the ambient connection. Inside a transaction the
//! release is a no-op and the transaction's connection stays open.

use std::future::Future;
use std::sync::Arc;

use crate::client::Connection;
use crate::context;
use crate::error::OrmResult;
use crate::row::Row;
use crate::statement::{BatchStatement, Statement};

/// Runs compiled statements.
pub struct Executor;

impl Executor {
    /// Run a query and return its rows.
    pub async fn select(statement: &Statement, db: &str) -> OrmResult<Vec<Row>> {
        dispatch(db, statement.sql(), statement.args().len(), |conn| async move {
            conn.query(statement.sql(), statement.args()).await
        })
        .await
    }

    /// Run a write statement and return the number of affected rows.
    pub async fn execute(statement: &Statement, db: &str) -> OrmResult<u64> {
        dispatch(db, statement.sql(), statement.args().len(), |conn| async move {
            conn.exec(statement.sql(), statement.args())
                .await
                .map(|outcome| outcome.rows_affected)
        })
        .await
    }

    /// Run a batch and return the total of affected rows.
    pub async fn execute_many(batch: &BatchStatement, db: &str) -> OrmResult<u64> {
        dispatch(db, batch.sql(), batch.rows().len(), |conn| async move {
            conn.exec_many(batch.sql(), batch.rows()).await
        })
        .await
    }

    /// Run an INSERT and return the identity the driver reports for it.
    pub async fn insert(statement: &Statement, db: &str) -> OrmResult<Option<i64>> {
        dispatch(db, statement.sql(), statement.args().len(), |conn| async move {
            conn.exec(statement.sql(), statement.args())
                .await
                .map(|outcome| outcome.last_insert_id)
        })
        .await
    }
}

/// Acquire, run, release. The operation's result wins over a failed release.
async fn dispatch<T, F, Fut>(db: &str, sql: &str, count: usize, op: F) -> OrmResult<T>
where
    F: FnOnce(Arc<dyn Connection>) -> Fut,
    Fut: Future<Output = OrmResult<T>>,
{
    context::enter(async {
        let result = match context::acquire(db).await {
            Ok(conn) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    target: "tee.sql",
                    db,
                    sql,
                    count,
                    in_transaction = context::in_transaction(),
                    "executing statement"
                );
                #[cfg(not(feature = "tracing"))]
                let _ = (sql, count);
                op(conn).await
            }
            Err(error) => Err(error),
        };
        context::release_ambient().await;
        result
    })
    .await
}
