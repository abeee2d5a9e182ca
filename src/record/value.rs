//! Dynamic record values

use std::fmt;

/// A dynamically typed field value
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RecordValue {
    Integer(i64),
    String(Vec<u8>),
    Record(Record),
    List(Vec<RecordValue>),
    #[default]
    Nil,
}

impl RecordValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RecordValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            RecordValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// String content, if it is valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|s| std::str::from_utf8(s).ok())
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            RecordValue::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[RecordValue]> {
        match self {
            RecordValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, RecordValue::Nil)
    }
}

impl From<i64> for RecordValue {
    fn from(i: i64) -> Self {
        RecordValue::Integer(i)
    }
}

impl From<&str> for RecordValue {
    fn from(s: &str) -> Self {
        RecordValue::String(s.as_bytes().to_vec())
    }
}

impl From<String> for RecordValue {
    fn from(s: String) -> Self {
        RecordValue::String(s.into_bytes())
    }
}

impl From<Record> for RecordValue {
    fn from(r: Record) -> Self {
        RecordValue::Record(r)
    }
}

impl From<Vec<RecordValue>> for RecordValue {
    fn from(items: Vec<RecordValue>) -> Self {
        RecordValue::List(items)
    }
}

/// Field name to value map that keeps insertion order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    entries: Vec<(String, RecordValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&RecordValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Set a field, returning the previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<RecordValue>) -> Option<RecordValue> {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<RecordValue> {
        let pos = self.entries.iter().position(|(k, _)| k == name)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RecordValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Builder: set an integer field
    pub fn with_int(mut self, name: &str, value: i64) -> Self {
        self.insert(name, value);
        self
    }

    /// Builder: set a string field
    pub fn with_str(mut self, name: &str, value: &str) -> Self {
        self.insert(name, value);
        self
    }

    /// Builder: set a raw byte string field
    pub fn with_bytes(mut self, name: &str, value: &[u8]) -> Self {
        self.insert(name, RecordValue::String(value.to_vec()));
        self
    }

    /// Builder: set a nested record field
    pub fn with_record(mut self, name: &str, value: Record) -> Self {
        self.insert(name, value);
        self
    }

    /// Builder: set a list field
    pub fn with_list(mut self, name: &str, items: Vec<RecordValue>) -> Self {
        self.insert(name, items);
        self
    }
}

impl fmt::Display for RecordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordValue::Integer(i) => write!(f, "{i}"),
            RecordValue::String(s) => write!(f, "{:?}", String::from_utf8_lossy(s)),
            RecordValue::Record(r) => write!(f, "{r}"),
            RecordValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            RecordValue::Nil => f.write_str("nil"),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_order_and_replaces() {
        let mut record = Record::new().with_str("name", "Ann").with_int("age", 5);
        assert_eq!(record.insert("name", "Bo"), Some(RecordValue::from("Ann")));

        let names: Vec<_> = record.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["name", "age"]);
        assert_eq!(record.get("name").and_then(RecordValue::as_str), Some("Bo"));
        assert_eq!(record.get("age").and_then(RecordValue::as_integer), Some(5));
    }

    #[test]
    fn test_remove() {
        let mut record = Record::new().with_int("a", 1).with_int("b", 2);
        assert_eq!(record.remove("a"), Some(RecordValue::Integer(1)));
        assert!(record.get("a").is_none());
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_display() {
        let record = Record::new()
            .with_str("name", "Ann")
            .with_list("tags", vec![RecordValue::Integer(1), RecordValue::Nil])
            .with_record("pet", Record::new().with_int("legs", 4));
        assert_eq!(
            record.to_string(),
            r#"{name: "Ann", tags: [1, nil], pet: {legs: 4}}"#
        );
    }
}
