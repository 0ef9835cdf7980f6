//! UPDATE builder.

use std::fmt;
use std::marker::PhantomData;

use crate::condition::ConditionTree;
use crate::config::DEFAULT_DB;
use crate::error::{OrmError, OrmResult};
use crate::executor::Executor;
use crate::model::Model;
use crate::qb::filter::Filter;
use crate::qb::where_clause;
use crate::statement::{PLACEHOLDER, Statement};
use crate::value::Value;

/// UPDATE builder for model `M`.
pub struct Update<M> {
    assignments: Option<Vec<(&'static str, Value)>>,
    conditions: ConditionTree,
    db: String,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Update<M> {
    pub fn new() -> Self {
        Self {
            assignments: None,
            conditions: ConditionTree::and(),
            db: DEFAULT_DB.to_string(),
            _model: PhantomData,
        }
    }

    /// Set the columns to assign, replacing any earlier `set`.
    ///
    /// Keys unknown to the schema are skipped; none left fails with
    /// `NoValidFields`.
    pub fn set<K, V>(mut self, data: impl IntoIterator<Item = (K, V)>) -> OrmResult<Self>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let schema = M::schema();
        let mut assignments: Vec<(&'static str, Value)> = Vec::new();
        for (key, value) in data {
            let Some(field) = schema.field(key.as_ref()) else {
                continue;
            };
            let value = value.into();
            match assignments.iter_mut().find(|(c, _)| *c == field.name()) {
                Some(slot) => slot.1 = value,
                None => assignments.push((field.name(), value)),
            }
        }
        if assignments.is_empty() {
            return Err(OrmError::NoValidFields);
        }
        self.assignments = Some(assignments);
        Ok(self)
    }

    /// Route the update to a named database.
    pub fn using(mut self, db: impl Into<String>) -> Self {
        self.db = db.into();
        self
    }

    /// Compile the update. SET arguments precede WHERE arguments.
    pub fn to_statement(&self) -> OrmResult<Statement> {
        if self.conditions.is_empty() {
            return Err(OrmError::UnscopedMutation("UPDATE"));
        }
        let Some(assignments) = &self.assignments else {
            return Err(OrmError::NoValidFields);
        };

        let set = assignments
            .iter()
            .map(|(c, _)| format!("{c} = {PLACEHOLDER}"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("UPDATE {} SET {set}", M::schema().table);
        let mut args: Vec<Value> = assignments.iter().map(|(_, v)| v.clone()).collect();
        where_clause(&self.conditions, &mut sql, &mut args);

        Statement::new(sql, args)
    }

    /// Run the update and return the number of affected rows.
    pub async fn execute(self) -> OrmResult<u64> {
        let statement = self.to_statement()?;
        Executor::execute(&statement, &self.db).await
    }
}

impl<M: Model> Default for Update<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Filter for Update<M> {
    fn conditions_mut(&mut self) -> &mut ConditionTree {
        &mut self.conditions
    }
}

impl<M> fmt::Debug for Update<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Update")
            .field("assignments", &self.assignments)
            .field("conditions", &self.conditions)
            .field("db", &self.db)
            .finish()
    }
}
