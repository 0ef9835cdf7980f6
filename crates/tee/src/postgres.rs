//! Built-in Postgres driver over `tokio-postgres`.
//!
//! Registered automatically by [`set_default_db`](crate::set_default_db),
//! [`set_db`](crate::set_db) and [`load_toml`](crate::load_toml). Generated
//! `?` placeholders are rewritten to `$1..$n` before the statement is sent,
//! and `col IN ?` becomes `col = ANY($n)` so a list binds as one array
//! parameter.

use async_trait::async_trait;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures_util::TryStreamExt;
use std::error::Error;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_postgres::config::SslMode;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_postgres::{Client, NoTls};

use crate::client::{Connection, Connector, ExecOutcome};
use crate::config::{DbConfig, TlsMode};
use crate::error::{OrmError, OrmResult};
use crate::row::Row;
use crate::statement::rewrite_placeholders;
use crate::value::Value;

/// Opens `tokio-postgres` sessions.
///
/// Connections are made without TLS support; `TlsMode::Require` therefore
/// fails to connect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresConnector;

#[async_trait]
impl Connector for PostgresConnector {
    async fn connect(&self, config: &DbConfig, autocommit: bool) -> OrmResult<Arc<dyn Connection>> {
        let mut pg = tokio_postgres::Config::new();
        pg.host(config.host.as_str())
            .port(config.port)
            .user(config.user.as_str())
            .dbname(config.database.as_str())
            .ssl_mode(match config.tls {
                TlsMode::Disable => SslMode::Disable,
                TlsMode::Prefer => SslMode::Prefer,
                TlsMode::Require => SslMode::Require,
            });
        if !config.password.is_empty() {
            pg.password(config.password.as_str());
        }

        let (client, connection) = pg.connect(NoTls).await?;
        let task = tokio::spawn(async move {
            if let Err(_err) = connection.await {
                #[cfg(feature = "tracing")]
                tracing::warn!(target: "tee.conn", error = %_err, "postgres connection task ended");
            }
        });

        let conn = PostgresConnection { client, task };
        if !autocommit {
            conn.client.batch_execute("BEGIN").await?;
        }
        Ok(Arc::new(conn))
    }
}

/// One `tokio-postgres` session plus the task driving its socket.
pub struct PostgresConnection {
    client: Client,
    task: JoinHandle<()>,
}

fn native_sql(sql: &str) -> String {
    rewrite_placeholders(sql, |out, i| {
        let head = out.trim_end().as_bytes();
        let is_in = head.len() >= 3
            && head[head.len() - 3].is_ascii_whitespace()
            && head[head.len() - 2..].eq_ignore_ascii_case(b"IN");
        if is_in {
            let keep = head.len() - 2;
            out.truncate(keep);
            out.push_str(&format!("= ANY(${i})"));
        } else {
            out.push_str(&format!("${i}"));
        }
    })
}

fn params(args: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    args.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

#[async_trait]
impl Connection for PostgresConnection {
    async fn query(&self, sql: &str, args: &[Value]) -> OrmResult<Vec<Row>> {
        let rows = self.client.query(&native_sql(sql), &params(args)).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn exec(&self, sql: &str, args: &[Value]) -> OrmResult<ExecOutcome> {
        let stream = self.client.query_raw(&native_sql(sql), args.iter()).await?;
        let mut stream = std::pin::pin!(stream);

        let mut last_insert_id = None;
        let mut first = true;
        while let Some(row) = stream.try_next().await? {
            if first && !row.is_empty() {
                if let Value::Int(id) = decode_cell(&row, 0)? {
                    last_insert_id = Some(id);
                }
            }
            first = false;
        }

        Ok(ExecOutcome {
            rows_affected: stream.rows_affected().unwrap_or(0),
            last_insert_id,
        })
    }

    async fn exec_many(&self, sql: &str, rows: &[Vec<Value>]) -> OrmResult<u64> {
        let statement = self.client.prepare(&native_sql(sql)).await?;
        let mut total = 0;
        for args in rows {
            total += self.client.execute(&statement, &params(args)).await?;
        }
        Ok(total)
    }

    async fn commit(&self) -> OrmResult<()> {
        self.client.batch_execute("COMMIT").await?;
        Ok(())
    }

    async fn rollback(&self) -> OrmResult<()> {
        self.client.batch_execute("ROLLBACK").await?;
        Ok(())
    }

    async fn close(&self) -> OrmResult<()> {
        self.task.abort();
        Ok(())
    }
}

impl Drop for PostgresConnection {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn decode_row(row: &tokio_postgres::Row) -> OrmResult<Row> {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        columns.push(column.name().to_string());
        values.push(decode_cell(row, idx)?);
    }
    Ok(Row::new(columns, values))
}

fn decode_cell(row: &tokio_postgres::Row, idx: usize) -> OrmResult<Value> {
    let column = &row.columns()[idx];
    let value = match *column.type_() {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.map(Value::Bool),
        Type::INT2 => row.try_get::<_, Option<i16>>(idx)?.map(Value::from),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx)?.map(Value::from),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.map(Value::Int),
        Type::OID => row.try_get::<_, Option<u32>>(idx)?.map(Value::from),
        Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx)?.map(Value::from),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.map(Value::Float),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            row.try_get::<_, Option<String>>(idx)?.map(Value::Text)
        }
        Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(idx)?.map(Value::Bytes),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(Value::Timestamp),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(|v| Value::Timestamp(v.naive_utc())),
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(idx)?
            .map(|v| Value::Timestamp(v.and_time(NaiveTime::MIN))),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(idx)?
            .map(Value::Json),
        ref other => {
            return Err(OrmError::decode(
                column.name(),
                format!("unsupported column type: {other}"),
            ));
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

// Every variant either converts explicitly or defers to the checked impl of
// its Rust type, so a value never reaches the wire under a foreign type.
impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql_checked(ty, out),
            Value::Int(v) => match *ty {
                Type::INT2 => i16::try_from(*v)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql(ty, out),
                Type::OID => u32::try_from(*v)?.to_sql(ty, out),
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::FLOAT8 => (*v as f64).to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => v.to_string().to_sql(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            Value::Float(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            Value::Text(v) => match *ty {
                Type::JSON | Type::JSONB => {
                    serde_json::from_str::<serde_json::Value>(v)?.to_sql(ty, out)
                }
                _ => v.to_sql_checked(ty, out),
            },
            Value::Bytes(v) => v.to_sql_checked(ty, out),
            Value::Timestamp(v) => match *ty {
                Type::TIMESTAMPTZ => v.and_utc().to_sql(ty, out),
                Type::DATE => v.date().to_sql(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            Value::Json(v) => v.to_sql_checked(ty, out),
            // Array parameters only; elements go back through this impl.
            Value::List(items) => items.to_sql_checked(ty, out),
        }
    }

    /// NULL binds to any parameter type; the rest is checked in `to_sql`.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_become_numbered() {
        assert_eq!(
            native_sql("UPDATE t SET a = ? WHERE b = ? AND c = '?'"),
            "UPDATE t SET a = $1 WHERE b = $2 AND c = '?'"
        );
    }

    #[test]
    fn in_binds_one_array_parameter() {
        assert_eq!(
            native_sql("SELECT id FROM t WHERE id IN ? AND name = ?"),
            "SELECT id FROM t WHERE id = ANY($1) AND name = $2"
        );
        assert_eq!(
            native_sql("SELECT id FROM t WHERE kind = 'IN ?' OR id IN ?"),
            "SELECT id FROM t WHERE kind = 'IN ?' OR id = ANY($1)"
        );
        assert_eq!(
            native_sql("SELECT id FROM t WHERE login = ?"),
            "SELECT id FROM t WHERE login = $1"
        );
    }

    #[test]
    fn in_list_filter_reaches_postgres_as_any() {
        use crate::qb::{Filter, Where};

        const ID: crate::Field = crate::Field::new("id", crate::FieldKind::Int);
        let (clause, args) = Where::and().in_list(ID, vec![1, 2]).into_tree().compile("?");
        assert_eq!(
            native_sql(&format!("DELETE FROM t WHERE {clause}")),
            "DELETE FROM t WHERE id = ANY($1)"
        );

        let mut out = BytesMut::new();
        assert!(args[0].to_sql_checked(&Type::INT8_ARRAY, &mut out).is_ok());
    }

    #[test]
    fn int_narrows_to_column_type() {
        let mut out = BytesMut::new();
        Value::Int(7).to_sql(&Type::INT4, &mut out).unwrap();
        assert_eq!(&out[..], &7i32.to_be_bytes());

        let mut out = BytesMut::new();
        assert!(Value::Int(i64::MAX).to_sql(&Type::INT2, &mut out).is_err());
    }

    #[test]
    fn mismatched_types_are_rejected() {
        let cases = [
            (Value::from("1234"), Type::INT4),
            (Value::Bool(true), Type::INT8),
            (Value::Int(1), Type::NUMERIC),
            (Value::Float(1.5), Type::NUMERIC),
            (Value::Float(1.5), Type::INT8),
            (Value::Bytes(vec![1, 2]), Type::TEXT),
            (Value::Json(serde_json::json!(1)), Type::TEXT),
        ];
        for (value, ty) in cases {
            let mut out = BytesMut::new();
            assert!(value.to_sql_checked(&ty, &mut out).is_err(), "{value:?} as {ty}");
            assert!(out.is_empty(), "{value:?} as {ty}");
        }
    }

    #[test]
    fn matching_types_are_written() {
        let mut out = BytesMut::new();
        Value::from("alice").to_sql_checked(&Type::VARCHAR, &mut out).unwrap();
        assert_eq!(&out[..], b"alice");

        let mut out = BytesMut::new();
        Value::Int(3).to_sql_checked(&Type::INT8, &mut out).unwrap();
        assert_eq!(&out[..], &3i64.to_be_bytes());

        let mut out = BytesMut::new();
        Value::Bool(true).to_sql_checked(&Type::BOOL, &mut out).unwrap();
        assert_eq!(&out[..], &[1]);
    }

    #[test]
    fn lists_bind_only_to_arrays() {
        let ids = Value::from(vec![1i64, 2, 3]);

        let mut out = BytesMut::new();
        assert!(ids.to_sql_checked(&Type::INT8_ARRAY, &mut out).is_ok());
        assert!(!out.is_empty());

        let mut out = BytesMut::new();
        assert!(ids.to_sql_checked(&Type::INT8, &mut out).is_err());

        let mixed = Value::List(vec![Value::Int(1), Value::from("two")]);
        let mut out = BytesMut::new();
        assert!(mixed.to_sql_checked(&Type::INT8_ARRAY, &mut out).is_err());
    }

    #[test]
    fn null_is_sent_as_null() {
        let mut out = BytesMut::new();
        assert!(matches!(
            Value::Null.to_sql(&Type::TEXT, &mut out).unwrap(),
            IsNull::Yes
        ));
    }
}
