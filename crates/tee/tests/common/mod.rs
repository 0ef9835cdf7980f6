//! Recording in-memory driver for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tee::{Connection, Connector, DbConfig, ExecOutcome, OrmError, OrmResult, Row, Value};

/// One capability call observed by the mock, tagged with its connection id.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Connect { conn: usize, autocommit: bool },
    Query { conn: usize, sql: String, args: Vec<Value> },
    Exec { conn: usize, sql: String, args: Vec<Value> },
    ExecMany { conn: usize, sql: String, rows: Vec<Vec<Value>> },
    Commit(usize),
    Rollback(usize),
    Close(usize),
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    next_conn: usize,
    rows: VecDeque<Vec<Row>>,
    outcome: ExecOutcome,
    fail_exec: Option<String>,
    fail_commit: bool,
    fail_rollback: bool,
    fail_close: bool,
}

/// A fake database. Clones share state.
#[derive(Clone, Default)]
pub struct MockDb {
    state: Arc<Mutex<State>>,
}

impl MockDb {
    /// A mock registered under `name`.
    pub fn register(name: &str) -> Self {
        let db = Self::default();
        tee::set_db_with_connector(name, DbConfig::default(), Arc::new(db.clone()))
            .expect("register mock database");
        db
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Queue the result of the next `query` call.
    pub fn push_rows(&self, rows: Vec<Row>) -> &Self {
        self.state().rows.push_back(rows);
        self
    }

    pub fn set_outcome(&self, rows_affected: u64, last_insert_id: Option<i64>) -> &Self {
        self.state().outcome = ExecOutcome {
            rows_affected,
            last_insert_id,
        };
        self
    }

    pub fn fail_exec(&self, message: &str) -> &Self {
        self.state().fail_exec = Some(message.to_string());
        self
    }

    pub fn fail_commit(&self) -> &Self {
        self.state().fail_commit = true;
        self
    }

    pub fn fail_rollback(&self) -> &Self {
        self.state().fail_rollback = true;
        self
    }

    pub fn fail_close(&self) -> &Self {
        self.state().fail_close = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// `(sql, args)` of every query and exec, in order.
    pub fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Query { sql, args, .. } | Call::Exec { sql, args, .. } => Some((sql, args)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.state().calls.push(call);
    }
}

#[async_trait]
impl Connector for MockDb {
    async fn connect(&self, _config: &DbConfig, autocommit: bool) -> OrmResult<Arc<dyn Connection>> {
        let conn = {
            let mut state = self.state();
            state.next_conn += 1;
            state.next_conn
        };
        self.record(Call::Connect { conn, autocommit });
        Ok(Arc::new(MockConnection {
            id: conn,
            db: self.clone(),
        }))
    }
}

pub struct MockConnection {
    id: usize,
    db: MockDb,
}

#[async_trait]
impl Connection for MockConnection {
    async fn query(&self, sql: &str, args: &[Value]) -> OrmResult<Vec<Row>> {
        self.db.record(Call::Query {
            conn: self.id,
            sql: sql.to_string(),
            args: args.to_vec(),
        });
        Ok(self.db.state().rows.pop_front().unwrap_or_default())
    }

    async fn exec(&self, sql: &str, args: &[Value]) -> OrmResult<ExecOutcome> {
        self.db.record(Call::Exec {
            conn: self.id,
            sql: sql.to_string(),
            args: args.to_vec(),
        });
        let state = self.db.state();
        match &state.fail_exec {
            Some(message) => Err(OrmError::Connection(message.clone())),
            None => Ok(state.outcome),
        }
    }

    async fn exec_many(&self, sql: &str, rows: &[Vec<Value>]) -> OrmResult<u64> {
        self.db.record(Call::ExecMany {
            conn: self.id,
            sql: sql.to_string(),
            rows: rows.to_vec(),
        });
        Ok(rows.len() as u64)
    }

    async fn commit(&self) -> OrmResult<()> {
        self.db.record(Call::Commit(self.id));
        if self.db.state().fail_commit {
            return Err(OrmError::Connection("commit failed".into()));
        }
        Ok(())
    }

    async fn rollback(&self) -> OrmResult<()> {
        self.db.record(Call::Rollback(self.id));
        if self.db.state().fail_rollback {
            return Err(OrmError::Connection("rollback failed".into()));
        }
        Ok(())
    }

    async fn close(&self) -> OrmResult<()> {
        self.db.record(Call::Close(self.id));
        if self.db.state().fail_close {
            return Err(OrmError::Connection("close failed".into()));
        }
        Ok(())
    }
}

/// Build a row from `(column, value)` pairs.
pub fn row<const N: usize>(cells: [(&str, Value); N]) -> Row {
    cells.into_iter().collect()
}
