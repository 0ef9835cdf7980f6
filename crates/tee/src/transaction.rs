//! Transaction scopes bound to the current execution unit.
//!
//! While a scope is open, every builder call on the same task runs on the
//! scope's connection, whatever database it names.
//!
//! # Example
//!
//! ```ignore
//! use tee::{Filter, Model, OrmResult};
//!
//! # async fn demo() -> OrmResult<()> {
//! tee::transaction!("default", conn, {
//!     Account::update()
//!         .set(tee::record! { "balance" => 0 })?
//!         .eq(Account::ID, 1)
//!         .execute()
//!         .await?;
//!     Account::delete().eq(Account::ID, 2).execute().await?;
//!     Ok(())
//! })?;
//! # Ok(()) }
//! ```
//!
//! The block commits when it evaluates to `Ok`, rolls back when it evaluates
//! to `Err`, and the connection is closed exactly once either way.

use std::future::Future;
use std::sync::Arc;

use crate::client::Connection;
use crate::config;
use crate::context::{self, Binding};
use crate::error::{OrmError, OrmResult};

/// Runs the given block inside a transaction on the current execution unit.
///
/// - `transaction!(db, conn, { .. })` opens a transaction on `db`.
/// - `transaction!(conn, { .. })` uses the default database.
///
/// `conn` is bound to the transaction's `Arc<dyn Connection>`. The block must
/// evaluate to `tee::OrmResult<T>`; the macro evaluates to the same type.
#[macro_export]
macro_rules! transaction {
    ($conn:ident, $body:block) => {
        $crate::transaction!($crate::DEFAULT_DB, $conn, $body)
    };
    ($db:expr, $conn:ident, $body:block) => {
        $crate::context::enter(async {
            let __tee_tx = match $crate::TransactionScope::begin($db).await {
                Ok(tx) => tx,
                Err(error) => return Err(error),
            };
            let $conn = ::std::sync::Arc::clone(__tee_tx.connection());
            let _ = &$conn;
            let __tee_tx_body_result = async { $body }.await;
            __tee_tx.finish(__tee_tx_body_result).await
        })
        .await
    };
}

/// An open transaction bound to the current unit.
///
/// Dropping a scope without [`finish`](Self::finish) (panic, cancellation)
/// restores the previous binding and drops the connection without
/// committing.
pub struct TransactionScope {
    conn: Arc<dyn Connection>,
    binding: Binding,
    /// Binding replaced by this scope; `Some` until restored.
    previous: Option<Option<Binding>>,
}

impl TransactionScope {
    /// Open a connection with auto-commit disabled and bind it.
    ///
    /// Fails with `NoExecutionUnit` outside [`context::scope`] /
    /// [`context::enter`].
    pub async fn begin(db: &str) -> OrmResult<Self> {
        context::ensure_unit()?;
        let conn = config::connect(db, false).await?;
        let binding = Binding::new(db, Arc::clone(&conn));
        let previous = context::bind_transaction(binding.clone())?;

        #[cfg(feature = "tracing")]
        tracing::trace!(target: "tee.conn", db, nested = previous.is_some(), "transaction started");

        Ok(Self {
            conn,
            binding,
            previous: Some(previous),
        })
    }

    /// The transaction's connection.
    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.conn
    }

    /// End the transaction: commit on `Ok`, roll back on `Err`.
    ///
    /// A failed commit is rolled back and reported. A failed rollback is
    /// reported as [`OrmError::Rollback`] with the block's error as source.
    pub async fn finish<T>(mut self, result: OrmResult<T>) -> OrmResult<T> {
        let outcome = match result {
            Ok(value) => match self.conn.commit().await {
                Ok(()) => Ok(value),
                Err(error) => Err(self.rollback_after(error).await),
            },
            Err(error) => Err(self.rollback_after(error).await),
        };

        context::close_logged(&self.binding).await;
        self.restore();
        outcome
    }

    async fn rollback_after(&self, error: OrmError) -> OrmError {
        #[cfg(feature = "tracing")]
        tracing::trace!(target: "tee.conn", db = self.binding.db(), %error, "rolling back");

        match self.conn.rollback().await {
            Ok(()) => error,
            Err(rollback) => OrmError::Rollback {
                source: Box::new(error),
                rollback: Box::new(rollback),
            },
        }
    }

    fn restore(&mut self) {
        if let Some(previous) = self.previous.take() {
            context::restore_transaction(previous);
        }
    }
}

impl Drop for TransactionScope {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Run `f` inside a transaction on `db`.
///
/// ```ignore
/// let id = tee::transaction("default", |_conn| async {
///     let id = User::insert().execute(tee::record! { "name" => "alice" }).await?;
///     Ok(id)
/// })
/// .await?;
/// ```
pub async fn transaction<T, F, Fut>(db: &str, f: F) -> OrmResult<T>
where
    F: FnOnce(Arc<dyn Connection>) -> Fut,
    Fut: Future<Output = OrmResult<T>>,
{
    context::enter(async {
        let scope = match TransactionScope::begin(db).await {
            Ok(scope) => scope,
            Err(error) => return Err(error),
        };
        let result = f(Arc::clone(scope.connection())).await;
        scope.finish(result).await
    })
    .await
}
