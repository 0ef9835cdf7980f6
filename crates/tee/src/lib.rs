//! # tee
//!
//! A small model-first SQL layer: fluent query builders that compile to
//! parameterized SQL, and connections scoped to the running tokio task.
//!
//! ## Features
//!
//! - **Model schemas**: `#[derive(Model)]` registers the table, its columns and
//!   primary key, and generates a `Field` constant per column
//! - **Condition trees**: nested AND/OR groups with arguments bound in call order
//! - **Safe defaults**: UPDATE and DELETE refuse to run without WHERE
//! - **Task-scoped connections**: each operation opens and closes its own
//!   connection unless a transaction is bound to the task
//! - **Pluggable drivers**: Postgres is built in, other backends implement
//!   [`Connector`] and [`Connection`]
//!
//! ## Example
//!
//! ```ignore
//! use tee::{DbConfig, Filter, Model, Where};
//!
//! #[derive(Debug, tee::Model)]
//! #[orm(table = "users")]
//! struct User {
//!     #[orm(id)]
//!     id: Option<i64>,
//!     name: String,
//!     status: String,
//! }
//!
//! tee::set_default_db(DbConfig::new("localhost", 5432, "app", "secret", "app"))?;
//!
//! let active = User::select()
//!     .eq(User::STATUS, "active")
//!     .group(Where::or().l_like(User::NAME, "a").l_like(User::NAME, "b"))
//!     .asc(&[User::NAME])
//!     .list()
//!     .await?;
//!
//! tee::transaction!(conn, {
//!     User::update()
//!         .set(tee::record! { "status" => "archived" })?
//!         .eq(User::STATUS, "inactive")
//!         .execute()
//!         .await?;
//!     Ok(())
//! })?;
//! ```

pub mod client;
pub mod condition;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod model;
pub mod qb;
pub mod row;
pub mod statement;
pub mod transaction;
pub mod value;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use client::{Connection, Connector, ExecOutcome};
pub use condition::{Condition, ConditionTree, Logic, Operator};
pub use config::{
    DEFAULT_DB, DbConfig, TlsMode, get_db, load_toml_with_connector, registered_dbs,
    set_db_with_connector, set_default_db_with_connector,
};
pub use context::UnitState;
pub use error::{OrmError, OrmResult};
pub use executor::Executor;
pub use model::{Field, FieldKind, Model, Schema, SqlKind};
pub use qb::{Delete, Filter, Insert, Select, Update, Upsert, Where};
pub use row::{FromRow, Record, Row};
pub use statement::{BatchStatement, PLACEHOLDER, Statement};
pub use transaction::{TransactionScope, transaction};
pub use value::{FromValue, ToValue, Value};

#[cfg(feature = "postgres")]
pub use config::{load_toml, set_db, set_default_db};

#[cfg(feature = "postgres")]
pub use postgres::PostgresConnector;

#[cfg(feature = "derive")]
pub use tee_derive::Model;
