//! Task-scoped connection state.
//!
//! Each execution unit (a future run under [`scope`] or [`enter`]) owns one
//! slot holding at most one ambient connection and at most one transaction
//! connection. A bound transaction connection shadows everything else.
//!
//! ```text
//! Idle --acquire--> Ambient --release_ambient--> Idle
//!   \                                            ^
//!    +--transaction begin--> InTransaction --end-+
//! ```
//!
//! The slot lives in tokio task-local storage, so it is never shared between
//! tasks and needs no lock. Borrows of the slot never span an `.await`.

use std::cell::RefCell;
use std::future::Future;
use std::sync::Arc;

use crate::client::Connection;
use crate::config;
use crate::error::{OrmError, OrmResult};

tokio::task_local! {
    static UNIT: RefCell<UnitContext>;
}

#[derive(Default)]
struct UnitContext {
    ambient: Option<Binding>,
    transaction: Option<Binding>,
}

/// A connection bound to the current unit.
#[derive(Clone)]
pub(crate) struct Binding {
    db: String,
    conn: Arc<dyn Connection>,
}

impl Binding {
    pub(crate) fn new(db: &str, conn: Arc<dyn Connection>) -> Self {
        Self {
            db: db.to_string(),
            conn,
        }
    }

    pub(crate) fn db(&self) -> &str {
        &self.db
    }
}

/// Connection state of the current execution unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// No connection is bound (or no unit is active).
    Idle,
    /// An auto-commit connection is open for the running operation.
    Ambient,
    /// A transaction connection is bound.
    InTransaction,
}

/// Run `fut` as a fresh execution unit with an empty slot.
pub async fn scope<F: Future>(fut: F) -> F::Output {
    UNIT.scope(RefCell::new(UnitContext::default()), fut).await
}

/// Run `fut` in the current execution unit, creating one if none is active.
pub async fn enter<F: Future>(fut: F) -> F::Output {
    if UNIT.try_with(|_| ()).is_ok() {
        fut.await
    } else {
        scope(fut).await
    }
}

/// State of the current unit; `Idle` outside any unit.
pub fn state() -> UnitState {
    UNIT.try_with(|slot| {
        let slot = slot.borrow();
        if slot.transaction.is_some() {
            UnitState::InTransaction
        } else if slot.ambient.is_some() {
            UnitState::Ambient
        } else {
            UnitState::Idle
        }
    })
    .unwrap_or(UnitState::Idle)
}

/// Whether a transaction connection is bound to the current unit.
pub fn in_transaction() -> bool {
    state() == UnitState::InTransaction
}

fn with_slot<R>(f: impl FnOnce(&mut UnitContext) -> R) -> OrmResult<R> {
    UNIT.try_with(|slot| f(&mut slot.borrow_mut()))
        .map_err(|_| OrmError::NoExecutionUnit)
}

/// The connection the current unit should use for `db`.
///
/// A bound transaction wins regardless of `db`; then an open ambient
/// connection; otherwise a new auto-commit connection is opened and bound
/// as ambient.
pub async fn acquire(db: &str) -> OrmResult<Arc<dyn Connection>> {
    let bound = with_slot(|slot| {
        slot.transaction
            .as_ref()
            .or(slot.ambient.as_ref())
            .map(|b| Arc::clone(&b.conn))
    })?;
    if let Some(conn) = bound {
        return Ok(conn);
    }

    let conn = config::connect(db, true).await?;
    with_slot(|slot| slot.ambient = Some(Binding::new(db, Arc::clone(&conn))))?;
    Ok(conn)
}

/// Close and clear the ambient connection.
///
/// No-op while a transaction is bound or outside any unit. A close failure is
/// logged, never returned.
pub async fn release_ambient() {
    let released = with_slot(|slot| {
        if slot.transaction.is_some() {
            None
        } else {
            slot.ambient.take()
        }
    })
    .ok()
    .flatten();

    if let Some(binding) = released {
        close_logged(&binding).await;
    }
}

/// Fail with `NoExecutionUnit` outside any unit.
pub(crate) fn ensure_unit() -> OrmResult<()> {
    with_slot(|_| ())
}

/// Bind a transaction connection, returning the binding it replaces.
pub(crate) fn bind_transaction(binding: Binding) -> OrmResult<Option<Binding>> {
    with_slot(|slot| slot.transaction.replace(binding))
}

/// Put back the binding saved by [`bind_transaction`].
///
/// Safe to call while unwinding: does nothing if the unit is gone or the
/// slot is borrowed.
pub(crate) fn restore_transaction(previous: Option<Binding>) {
    let _ = UNIT.try_with(|slot| {
        if let Ok(mut slot) = slot.try_borrow_mut() {
            slot.transaction = previous;
        }
    });
}

pub(crate) async fn close_logged(binding: &Binding) {
    match binding.conn.close().await {
        Ok(()) => {
            #[cfg(feature = "tracing")]
            tracing::trace!(target: "tee.conn", db = binding.db(), "connection closed");
        }
        Err(_err) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(target: "tee.conn", db = binding.db(), error = %_err, "failed to close connection");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn idle_outside_any_unit() {
        assert_eq!(state(), UnitState::Idle);
        assert!(!in_transaction());
        // Nothing to release, nothing to fail.
        release_ambient().await;
    }

    #[tokio::test]
    async fn acquire_requires_a_unit() {
        let err = acquire("default").await.err().unwrap();
        assert!(matches!(err, OrmError::NoExecutionUnit));
    }

    #[tokio::test]
    async fn enter_joins_the_current_unit() {
        scope(async {
            assert_eq!(state(), UnitState::Idle);
            enter(async { assert!(UNIT.try_with(|_| ()).is_ok()) }).await;
        })
        .await;
    }

    #[tokio::test]
    async fn acquire_fails_for_unregistered_database() {
        let err = scope(acquire("context_tests_missing")).await.err().unwrap();
        assert!(matches!(err, OrmError::UnknownDatabase(_)));
        assert_eq!(scope(async { state() }).await, UnitState::Idle);
    }
}
