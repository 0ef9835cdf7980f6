//! Model query builders.
//!
//! Every builder is created from a [`Model`](crate::Model) and compiles into a
//! [`Statement`](crate::Statement) that uses `?` placeholders:
//!
//! ```ignore
//! use tee::{Filter, Model, Where};
//!
//! // SELECT
//! let users = User::select()
//!     .eq(User::STATUS, "active")
//!     .desc(&[User::CREATED_AT])
//!     .limit(10)
//!     .list()
//!     .await?;
//!
//! // INSERT
//! let id = User::insert()
//!     .execute(tee::record! { "name" => "alice", "status" => "active" })
//!     .await?;
//!
//! // UPDATE
//! User::update()
//!     .set(tee::record! { "status" => "inactive" })?
//!     .eq(User::ID, 1)
//!     .execute()
//!     .await?;
//!
//! // DELETE
//! User::delete().eq(User::ID, 1).execute().await?;
//! ```
//!
//! Terminal calls consume the builder. UPDATE and DELETE refuse to run
//! without a WHERE condition.

mod delete;
mod filter;
mod insert;
mod select;
mod update;


pub use delete::Delete;
pub use filter::{Filter, Where};
pub use insert::{Insert, Upsert};
pub use select::Select;
pub use update::Update;

use crate::condition::ConditionTree;
use crate::statement::PLACEHOLDER;
use crate::value::Value;

/// Render ` WHERE ...` for a non-empty tree, nothing otherwise.
fn where_clause(tree: &ConditionTree, sql: &mut String, args: &mut Vec<Value>) {
    let (fragment, values) = tree.compile(PLACEHOLDER);
    if !fragment.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&fragment);
        args.extend(values);
    }
}

fn placeholders(n: usize) -> String {
    vec![PLACEHOLDER; n].join(", ")
}
