//! Result rows and eager-loaded relation attachments.

use crate::error::{OrmError, OrmResult};
use crate::value::{FromValue, Value};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// One result row: ordered column → value pairs plus any relations attached by the loader.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    columns: Vec<(String, Value)>,
    relations: Vec<(String, Related)>,
}

/// A relation attached to a [`Record`].
///
/// The attachment is always present after a load: `One(None)` and an empty `Many` stand in for
/// "no match" so callers see a stable shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    One(Option<Record>),
    Many(Vec<Record>),
}

impl Related {
    /// Iterate the attached records mutably (zero or one for `One`).
    pub fn records_mut(&mut self) -> std::slice::IterMut<'_, Record> {
        match self {
            Related::One(Some(record)) => std::slice::from_mut(record).iter_mut(),
            Related::One(None) => Default::default(),
            Related::Many(records) => records.iter_mut(),
        }
    }

    /// Iterate the attached records.
    pub fn records(&self) -> std::slice::Iter<'_, Record> {
        match self {
            Related::One(Some(record)) => std::slice::from_ref(record).iter(),
            Related::One(None) => Default::default(),
            Related::Many(records) => records.iter(),
        }
    }

    /// Number of attached records.
    pub fn len(&self) -> usize {
        self.records().len()
    }

    /// `true` when nothing matched.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Record::set`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    /// Set a column, replacing an existing value in place.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((column, value)),
        }
    }

    /// Get a column value.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Get a column converted to `T`.
    pub fn try_get<T: FromValue>(&self, column: &str) -> OrmResult<T> {
        let value = self
            .get(column)
            .cloned()
            .ok_or_else(|| OrmError::decode(column, "column not found"))?;
        T::from_value(value).map_err(|message| OrmError::decode(column, message))
    }

    /// Remove a column and return its value.
    pub fn remove(&mut self, column: &str) -> Option<Value> {
        let idx = self.columns.iter().position(|(name, _)| name == column)?;
        Some(self.columns.remove(idx).1)
    }

    /// Whether the record has this column.
    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    /// Columns in result order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Column names in result order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// First column value (scalar queries such as `COUNT(*)`).
    pub fn first_value(&self) -> Option<&Value> {
        self.columns.first().map(|(_, value)| value)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// `true` when the record has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Attach a relation under `key`, replacing a previous attachment.
    pub fn attach(&mut self, key: impl Into<String>, related: Related) {
        let key = key.into();
        match self.relations.iter_mut().find(|(name, _)| *name == key) {
            Some(slot) => slot.1 = related,
            None => self.relations.push((key, related)),
        }
    }

    /// Get an attached relation.
    pub fn relation(&self, key: &str) -> Option<&Related> {
        self.relations
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, related)| related)
    }

    /// Get an attached relation mutably.
    pub fn relation_mut(&mut self, key: &str) -> Option<&mut Related> {
        self.relations
            .iter_mut()
            .find(|(name, _)| name == key)
            .map(|(_, related)| related)
    }

    /// Attached records of a to-many relation; empty when absent.
    pub fn many(&self, key: &str) -> &[Record] {
        match self.relation(key) {
            Some(Related::Many(records)) => records,
            _ => &[],
        }
    }

    /// Attached record of a to-one relation.
    pub fn one(&self, key: &str) -> Option<&Record> {
        match self.relation(key) {
            Some(Related::One(record)) => record.as_ref(),
            _ => None,
        }
    }

    /// Relation keys in attachment order.
    pub fn relation_keys(&self) -> Vec<&str> {
        self.relations.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Convert an attached relation into `T`; absent relations yield `T::default()`.
    pub fn try_get_related<T: FromRelated>(&self, key: &str) -> OrmResult<T> {
        match self.relation(key) {
            Some(related) => T::from_related(related),
            None => Ok(T::default()),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (column, value) in iter {
            record.set(column, value);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len() + self.relations.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        for (name, related) in &self.relations {
            map.serialize_entry(name, related)?;
        }
        map.end()
    }
}

impl Serialize for Related {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Related::One(record) => record.serialize(serializer),
            Related::Many(records) => records.serialize(serializer),
        }
    }
}

/// Map a [`Record`] into a typed value.
pub trait FromRecord: Sized {
    fn from_record(record: &Record) -> OrmResult<Self>;
}

impl FromRecord for Record {
    fn from_record(record: &Record) -> OrmResult<Self> {
        Ok(record.clone())
    }
}

/// Map an attached relation into a typed field (`Vec<T>` or `Option<T>`).
pub trait FromRelated: Sized + Default {
    fn from_related(related: &Related) -> OrmResult<Self>;
}

impl<T: FromRecord> FromRelated for Vec<T> {
    fn from_related(related: &Related) -> OrmResult<Self> {
        related.records().map(T::from_record).collect()
    }
}

impl<T: FromRecord> FromRelated for Option<T> {
    fn from_related(related: &Related) -> OrmResult<Self> {
        related.records().next().map(T::from_record).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_in_place() {
        let mut record = Record::new().with("id", 1).with("name", "a");
        record.set("id", 2);
        assert_eq!(record.column_names(), vec!["id", "name"]);
        assert_eq!(record.try_get::<i64>("id").unwrap(), 2);
    }

    #[test]
    fn missing_column_is_decode_error() {
        let record = Record::new().with("id", 1);
        let err = record.try_get::<String>("name").unwrap_err();
        assert!(matches!(err, OrmError::Decode { ref column, .. } if column == "name"));
    }

    #[test]
    fn serializes_relations_nested() {
        let mut user = Record::new().with("id", 1);
        user.attach(
            "posts",
            Related::Many(vec![Record::new().with("id", 10).with("user_id", 1)]),
        );
        user.attach("profile", Related::One(None));

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 1,
                "posts": [{"id": 10, "user_id": 1}],
                "profile": null
            })
        );
    }

    #[test]
    fn relation_accessors() {
        let mut user = Record::new().with("id", 1);
        assert!(user.many("posts").is_empty());
        user.attach("post", Related::One(Some(Record::new().with("id", 3))));
        assert_eq!(user.one("post").and_then(|p| p.get("id")), Some(&Value::Int(3)));
        assert_eq!(user.relation("post").map(Related::len), Some(1));
    }
}
