//! Model schemas and the [`Model`] trait.
//!
//! A model is a Rust type mapped onto one table. Its [`Schema`] is a static
//! registry built once at registration time, either by `#[derive(Model)]` or
//! by a hand-written impl:
//!
//! ```ignore
//! #[derive(tee::Model)]
//! #[orm(table = "users")]
//! struct User {
//!     #[orm(id)]
//!     id: Option<i64>,
//!     name: String,
//! }
//!
//! let users = User::select().eq(User::NAME, "alice").list().await?;
//! ```

use chrono::NaiveDateTime;

use crate::qb::{Delete, Insert, Select, Update};
use crate::row::{FromRow, Record};

/// Storage kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Float,
    Str,
    Bool,
    Bytes,
    DateTime,
    Json,
}

/// A column descriptor: name plus kind.
///
/// Query builders take fields wherever a column is named, so typos in column
/// names are caught by the compiler when the derive-generated constants are
/// used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    name: &'static str,
    kind: FieldKind,
}

impl Field {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn kind(&self) -> FieldKind {
        self.kind
    }
}

impl AsRef<str> for Field {
    fn as_ref(&self) -> &str {
        self.name
    }
}

/// Maps a Rust attribute type to its [`FieldKind`].
pub trait SqlKind {
    const KIND: FieldKind;
}

macro_rules! sql_kind {
    ($kind:ident: $($t:ty),*) => {
        $(impl SqlKind for $t {
            const KIND: FieldKind = FieldKind::$kind;
        })*
    };
}

sql_kind!(Int: i8, i16, i32, i64, u8, u16, u32);
sql_kind!(Float: f32, f64);
sql_kind!(Str: String);
sql_kind!(Bool: bool);
sql_kind!(Bytes: Vec<u8>);
sql_kind!(DateTime: NaiveDateTime);
sql_kind!(Json: serde_json::Value);

impl<T: SqlKind> SqlKind for Option<T> {
    const KIND: FieldKind = T::KIND;
}

/// Static description of a model's table.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub table: &'static str,
    /// Columns in declaration order.
    pub fields: &'static [Field],
    pub primary_key: Option<&'static str>,
}

impl Schema {
    pub const fn new(
        table: &'static str,
        fields: &'static [Field],
        primary_key: Option<&'static str>,
    ) -> Self {
        Self {
            table,
            fields,
            primary_key,
        }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}

/// A type mapped onto one table.
pub trait Model: FromRow + Send + Sync + 'static {
    fn schema() -> &'static Schema;

    /// The set attributes of this instance, in declaration order.
    fn to_record(&self) -> Record;

    fn select() -> Select<Self> {
        Select::new()
    }

    fn insert() -> Insert<Self> {
        Insert::new()
    }

    fn update() -> Update<Self> {
        Update::new()
    }

    fn delete() -> Delete<Self> {
        Delete::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{FromValue, ToValue, Value};

    /// Decodes `value` as `T`, encodes it back, and reports the column kind.
    fn column_kind<T: SqlKind + FromValue + ToValue>(value: Value) -> FieldKind {
        let decoded = T::from_value(&value).unwrap();
        assert_eq!(decoded.to_value(), Some(value));
        T::KIND
    }

    #[test]
    fn every_column_type_decodes_and_encodes() {
        assert_eq!(column_kind::<u8>(Value::Int(7)), FieldKind::Int);
        assert_eq!(column_kind::<u32>(Value::Int(u32::MAX.into())), FieldKind::Int);
        assert_eq!(column_kind::<i64>(Value::Int(-1)), FieldKind::Int);
        assert_eq!(column_kind::<f64>(Value::Float(0.5)), FieldKind::Float);
        assert_eq!(column_kind::<String>(Value::from("x")), FieldKind::Str);
        assert_eq!(column_kind::<bool>(Value::Bool(true)), FieldKind::Bool);
        assert_eq!(column_kind::<Vec<u8>>(Value::Bytes(vec![1])), FieldKind::Bytes);
        assert_eq!(
            column_kind::<Option<i32>>(Value::Int(3)),
            FieldKind::Int
        );
    }

    #[test]
    fn out_of_range_integers_fail_to_decode() {
        assert!(u8::from_value(&Value::Int(256)).is_err());
        assert!(u32::from_value(&Value::Int(-1)).is_err());
    }
}
