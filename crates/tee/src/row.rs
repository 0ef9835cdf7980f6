//! Row mapping traits and key/value records

use crate::error::{OrmError, OrmResult};
use crate::value::{FromValue, Value};

/// A result row: column names paired with their values, in SELECT order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row from parallel column and value vectors.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a column, if the row has it.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Value at a column index.
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Decode a column into `T`.
    ///
    /// A column missing from the row decodes as NULL, so `Option` fields of a
    /// model stay `None` when a narrowed projection leaves them out.
    pub fn get_as<T: FromValue>(&self, column: &str) -> OrmResult<T> {
        let value = self.get(column).unwrap_or(&Value::Null);
        T::from_value(value).map_err(|message| OrmError::decode(column, message))
    }

    /// Iterate `(column, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let (columns, values) = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self { columns, values }
    }
}

/// Trait for types that can be constructed from a result [`Row`].
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> OrmResult<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> OrmResult<Self> {
        Ok(row.clone())
    }
}

/// An ordered key/value mapping used as INSERT/UPDATE input.
///
/// Keys are unique: inserting an existing key replaces its value in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    entries: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder-style [`Record::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Build a [`Record`] from `key => value` pairs.
///
/// ```ignore
/// let data = tee::record! { "name" => "alice", "age" => 30 };
/// ```
#[macro_export]
macro_rules! record {
    () => { $crate::Record::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut __tee_record = $crate::Record::new();
        $(__tee_record.insert($key, $value);)+
        __tee_record
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_replaces_duplicate_keys_in_place() {
        let mut r = Record::new();
        r.insert("a", 1);
        r.insert("b", 2);
        r.insert("a", 3);
        let keys: Vec<_> = r.keys().collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(r.get("a"), Some(&Value::Int(3)));
    }

    #[test]
    fn missing_column_decodes_as_null() {
        let row: Row = [("id", Value::Int(1))].into_iter().collect();
        assert_eq!(row.get_as::<Option<String>>("name").unwrap(), None);
        let err = row.get_as::<String>("name").unwrap_err();
        assert!(matches!(err, OrmError::Decode { ref column, .. } if column == "name"));
    }
}
