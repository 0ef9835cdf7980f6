//! Compiled statements ready for execution.
//!
//! Every statement generated by this crate uses a single positional
//! placeholder, [`PLACEHOLDER`]. Arguments bind left to right.

use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// The placeholder token emitted into generated SQL.
pub const PLACEHOLDER: &str = "?";

/// An immutable SQL text plus its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    args: Vec<Value>,
}

impl Statement {
    /// Create a statement, checking that the placeholder count matches `args`.
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> OrmResult<Self> {
        let sql = sql.into();
        check_arity(&sql, args.len())?;
        Ok(Self { sql, args })
    }

    /// Create a statement without placeholders.
    pub fn raw(sql: impl Into<String>) -> OrmResult<Self> {
        Self::new(sql, Vec::new())
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.args)
    }
}

/// One SQL text executed once per argument row.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchStatement {
    sql: String,
    rows: Vec<Vec<Value>>,
}

impl BatchStatement {
    /// Create a batch, checking every row against the placeholder count.
    pub fn new(sql: impl Into<String>, rows: Vec<Vec<Value>>) -> OrmResult<Self> {
        let sql = sql.into();
        let expected = count_placeholders(&sql);
        if let Some(bad) = rows.iter().find(|r| r.len() != expected) {
            return Err(OrmError::PlaceholderMismatch {
                expected,
                got: bad.len(),
            });
        }
        Ok(Self { sql, rows })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }
}

fn check_arity(sql: &str, got: usize) -> OrmResult<()> {
    let expected = count_placeholders(sql);
    if expected != got {
        return Err(OrmError::PlaceholderMismatch { expected, got });
    }
    Ok(())
}

/// Count `?` placeholders outside quoted literals and identifiers.
pub fn count_placeholders(sql: &str) -> usize {
    let mut n = 0;
    rewrite_placeholders(sql, |_, _| n += 1);
    n
}

/// Replace each `?` outside quotes by calling `render(out, index)`, where
/// `out` holds the SQL rewritten so far and `index` is 1-based.
///
/// `render` may edit the text before the placeholder (a driver can rewrite
/// `col IN ?` into its own list syntax). Single-quoted literals (with `''`
/// escapes) and double-quoted identifiers are copied through untouched.
pub fn rewrite_placeholders(sql: &str, mut render: impl FnMut(&mut String, usize)) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut idx = 0;
    let mut quote: Option<char> = None;

    for ch in sql.chars() {
        match quote {
            Some(q) => {
                out.push(ch);
                // A doubled quote closes then immediately reopens; net effect is the same.
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    out.push(ch);
                }
                '?' => {
                    idx += 1;
                    render(&mut out, idx);
                }
                _ => out.push(ch),
            },
        }
    }
    out
}
