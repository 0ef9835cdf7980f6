//! DELETE builder.

use std::fmt;
use std::marker::PhantomData;

use crate::condition::ConditionTree;
use crate::config::DEFAULT_DB;
use crate::error::{OrmError, OrmResult};
use crate::executor::Executor;
use crate::model::Model;
use crate::qb::filter::Filter;
use crate::qb::where_clause;
use crate::statement::Statement;

/// DELETE builder for model `M`. Requires at least one condition.
pub struct Delete<M> {
    conditions: ConditionTree,
    db: String,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Delete<M> {
    pub fn new() -> Self {
        Self {
            conditions: ConditionTree::and(),
            db: DEFAULT_DB.to_string(),
            _model: PhantomData,
        }
    }

    /// Route the delete to a named database.
    pub fn using(mut self, db: impl Into<String>) -> Self {
        self.db = db.into();
        self
    }

    pub fn to_statement(&self) -> OrmResult<Statement> {
        if self.conditions.is_empty() {
            return Err(OrmError::UnscopedMutation("DELETE"));
        }
        let mut sql = format!("DELETE FROM {}", M::schema().table);
        let mut args = Vec::new();
        where_clause(&self.conditions, &mut sql, &mut args);
        Statement::new(sql, args)
    }

    /// Run the delete and return the number of affected rows.
    pub async fn execute(self) -> OrmResult<u64> {
        let statement = self.to_statement()?;
        Executor::execute(&statement, &self.db).await
    }
}

impl<M: Model> Default for Delete<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Filter for Delete<M> {
    fn conditions_mut(&mut self) -> &mut ConditionTree {
        &mut self.conditions
    }
}

impl<M> fmt::Debug for Delete<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delete")
            .field("conditions", &self.conditions)
            .field("db", &self.db)
            .finish()
    }
}
