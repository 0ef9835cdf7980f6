//! SELECT builder.

use std::fmt;
use std::marker::PhantomData;

use crate::condition::ConditionTree;
use crate::config::DEFAULT_DB;
use crate::error::{OrmError, OrmResult};
use crate::executor::Executor;
use crate::model::{Field, Model};
use crate::qb::filter::Filter;
use crate::qb::where_clause;
use crate::statement::Statement;

/// SELECT query builder for model `M`.
pub struct Select<M> {
    /// Projection; `None` selects every schema field.
    columns: Option<Vec<&'static str>>,
    conditions: ConditionTree,
    order_by: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    db: String,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Select<M> {
    pub fn new() -> Self {
        Self {
            columns: None,
            conditions: ConditionTree::and(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            db: DEFAULT_DB.to_string(),
            _model: PhantomData,
        }
    }

    /// Narrow the projection to the given fields.
    pub fn columns(mut self, fields: &[Field]) -> Self {
        self.columns = Some(fields.iter().map(Field::name).collect());
        self
    }

    /// Append ascending ORDER BY terms.
    pub fn asc(mut self, fields: &[Field]) -> Self {
        self.order_by
            .extend(fields.iter().map(|f| format!("{} ASC", f.name())));
        self
    }

    /// Append descending ORDER BY terms.
    pub fn desc(mut self, fields: &[Field]) -> Self {
        self.order_by
            .extend(fields.iter().map(|f| format!("{} DESC", f.name())));
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Route the query to a named database.
    pub fn using(mut self, db: impl Into<String>) -> Self {
        self.db = db.into();
        self
    }

    /// Compile without executing.
    pub fn to_statement(&self) -> OrmResult<Statement> {
        let schema = M::schema();
        let columns = match &self.columns {
            Some(cols) => cols.join(", "),
            None => schema.field_names().collect::<Vec<_>>().join(", "),
        };

        let mut sql = format!("SELECT {columns} FROM {}", schema.table);
        let mut args = Vec::new();
        where_clause(&self.conditions, &mut sql, &mut args);

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        Statement::new(sql, args)
    }

    /// Fetch exactly one row.
    ///
    /// Zero rows fail with `NotFound`. With `first = false` more than one row
    /// fails with `MultipleRecords`; `first = true` adds `LIMIT 1` instead.
    pub async fn get(mut self, first: bool) -> OrmResult<M> {
        if first {
            self.limit = Some(1);
        }
        let statement = self.to_statement()?;
        let rows = Executor::select(&statement, &self.db).await?;
        match rows.as_slice() {
            [] => Err(OrmError::not_found(format!(
                "no {} row matches the query",
                M::schema().table
            ))),
            [row] => M::from_row(row),
            [row, ..] if first => M::from_row(row),
            _ => Err(OrmError::MultipleRecords(rows.len())),
        }
    }

    /// Like `get(false)`, but zero rows is `Ok(None)`.
    pub async fn one(self) -> OrmResult<Option<M>> {
        none_if_missing(self.get(false).await)
    }

    /// Like `get(true)`, but zero rows is `Ok(None)`.
    pub async fn first(self) -> OrmResult<Option<M>> {
        none_if_missing(self.get(true).await)
    }

    /// Fetch every matching row.
    pub async fn list(self) -> OrmResult<Vec<M>> {
        let statement = self.to_statement()?;
        let rows = Executor::select(&statement, &self.db).await?;
        rows.iter().map(M::from_row).collect()
    }
}

fn none_if_missing<M>(result: OrmResult<M>) -> OrmResult<Option<M>> {
    match result {
        Ok(model) => Ok(Some(model)),
        Err(OrmError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

impl<M: Model> Default for Select<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Filter for Select<M> {
    fn conditions_mut(&mut self) -> &mut ConditionTree {
        &mut self.conditions
    }
}

impl<M> fmt::Debug for Select<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Select")
            .field("columns", &self.columns)
            .field("conditions", &self.conditions)
            .field("order_by", &self.order_by)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("db", &self.db)
            .finish()
    }
}
