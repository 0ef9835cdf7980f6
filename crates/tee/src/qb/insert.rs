//! INSERT builder with optional upsert.

use std::fmt;
use std::marker::PhantomData;

use crate::config::DEFAULT_DB;
use crate::error::{OrmError, OrmResult};
use crate::executor::Executor;
use crate::model::{Field, Model, Schema};
use crate::qb::placeholders;
use crate::row::Record;
use crate::statement::{BatchStatement, Statement};
use crate::value::Value;

/// Columns refreshed when an insert conflicts.
#[derive(Debug, Clone, PartialEq)]
pub enum Upsert {
    /// Every inserted column except the conflict target.
    All,
    /// Only the listed columns.
    Columns(Vec<Field>),
}

impl Upsert {
    pub fn columns(fields: &[Field]) -> Self {
        Upsert::Columns(fields.to_vec())
    }
}

/// INSERT builder for model `M`.
pub struct Insert<M> {
    upsert: Option<Upsert>,
    conflict_target: Option<Vec<&'static str>>,
    db: String,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Insert<M> {
    pub fn new() -> Self {
        Self {
            upsert: None,
            conflict_target: None,
            db: DEFAULT_DB.to_string(),
            _model: PhantomData,
        }
    }

    /// Turn the insert into an upsert (`ON CONFLICT ... DO UPDATE`).
    pub fn on_conflict(mut self, upsert: Upsert) -> Self {
        self.upsert = Some(upsert);
        self
    }

    /// Columns of the unique constraint checked by the upsert.
    ///
    /// Defaults to the schema primary key.
    pub fn conflict_target(mut self, fields: &[Field]) -> Self {
        self.conflict_target = Some(fields.iter().map(Field::name).collect());
        self
    }

    /// Route the insert to a named database.
    pub fn using(mut self, db: impl Into<String>) -> Self {
        self.db = db.into();
        self
    }

    /// Compile a single-row insert.
    ///
    /// Keys unknown to the schema are skipped; none left fails with
    /// `NoValidFields`.
    pub fn to_statement<K, V>(&self, data: impl IntoIterator<Item = (K, V)>) -> OrmResult<Statement>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let schema = M::schema();
        let mut columns = Vec::new();
        let mut args = Vec::new();
        for (key, value) in data {
            let Some(field) = schema.field(key.as_ref()) else {
                continue;
            };
            if columns.contains(&field.name()) {
                continue;
            }
            columns.push(field.name());
            args.push(value.into());
        }
        if columns.is_empty() {
            return Err(OrmError::NoValidFields);
        }

        let mut sql = self.insert_sql(schema, &columns)?;
        if let Some(pk) = schema.primary_key
            && !columns.contains(&pk)
        {
            sql.push_str(&format!(" RETURNING {pk}"));
        }
        Statement::new(sql, args)
    }

    /// Insert one row and return the generated identity, if any.
    pub async fn execute<K, V>(self, data: impl IntoIterator<Item = (K, V)>) -> OrmResult<Option<i64>>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let statement = self.to_statement(data)?;
        Executor::insert(&statement, &self.db).await
    }

    /// Insert a model instance; unset `Option` attributes are left out.
    pub async fn execute_model(self, model: &M) -> OrmResult<Option<i64>> {
        self.execute(model.to_record()).await
    }

    /// Compile a multi-row insert.
    ///
    /// The column set comes from the first row; other rows are read by those
    /// columns, with missing keys bound as NULL. Returns `None` for no rows.
    pub fn to_batch(&self, rows: impl IntoIterator<Item = Record>) -> OrmResult<Option<BatchStatement>> {
        let schema = M::schema();
        let mut rows = rows.into_iter().peekable();
        let Some(first) = rows.peek() else {
            return Ok(None);
        };

        let mut columns: Vec<&'static str> = Vec::new();
        for key in first.keys() {
            if let Some(field) = schema.field(key)
                && !columns.contains(&field.name())
            {
                columns.push(field.name());
            }
        }
        if columns.is_empty() {
            return Err(OrmError::NoValidFields);
        }

        let sql = self.insert_sql(schema, &columns)?;
        let values = rows
            .map(|row| {
                columns
                    .iter()
                    .map(|c| row.get(c).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        BatchStatement::new(sql, values).map(Some)
    }

    /// Insert many rows with one statement text; returns total affected rows.
    ///
    /// No rows means no round trip and `Ok(0)`.
    pub async fn execute_bulk(self, rows: impl IntoIterator<Item = Record>) -> OrmResult<u64> {
        match self.to_batch(rows)? {
            Some(batch) => Executor::execute_many(&batch, &self.db).await,
            None => Ok(0),
        }
    }

    fn insert_sql(&self, schema: &Schema, columns: &[&'static str]) -> OrmResult<String> {
        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            schema.table,
            columns.join(", "),
            placeholders(columns.len())
        );
        if let Some(upsert) = &self.upsert {
            sql.push_str(&self.conflict_clause(schema, upsert, columns)?);
        }
        Ok(sql)
    }

    fn conflict_clause(
        &self,
        schema: &Schema,
        upsert: &Upsert,
        columns: &[&'static str],
    ) -> OrmResult<String> {
        let target: Vec<&str> = match (&self.conflict_target, schema.primary_key) {
            (Some(target), _) if !target.is_empty() => target.clone(),
            (_, Some(pk)) => vec![pk],
            _ => {
                return Err(OrmError::validation(format!(
                    "upsert on {} needs a conflict target: the model has no primary key",
                    schema.table
                )));
            }
        };

        let refreshed: Vec<&str> = match upsert {
            Upsert::All => columns
                .iter()
                .copied()
                .filter(|c| !target.contains(c))
                .collect(),
            Upsert::Columns(fields) => fields
                .iter()
                .map(Field::name)
                .filter(|c| schema.has_field(c))
                .collect(),
        };

        let target = target.join(", ");
        if refreshed.is_empty() {
            return Ok(format!(" ON CONFLICT ({target}) DO NOTHING"));
        }
        let set = refreshed
            .iter()
            .map(|c| format!("{c} = EXCLUDED.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!(" ON CONFLICT ({target}) DO UPDATE SET {set}"))
    }
}

impl<M: Model> Default for Insert<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for Insert<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Insert")
            .field("upsert", &self.upsert)
            .field("conflict_target", &self.conflict_target)
            .field("db", &self.db)
            .finish()
    }
}
