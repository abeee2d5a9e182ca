//! JSON conversion for records

use serde_json::{Map, Number, Value as Json};
use thiserror::Error;

use super::value::{Record, RecordValue};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// Top-level JSON is not an object
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// JSON value has no record equivalent
    #[error("unsupported value at {path}: {reason}")]
    Unsupported { path: String, reason: String },
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

impl Record {
    /// Convert a JSON object; nulls become nil and integers must fit in i64
    pub fn from_json(value: &Json) -> Result<Self, RecordError> {
        match value {
            Json::Object(map) => record_from_map(map, "$"),
            other => Err(RecordError::NotAnObject(json_kind(other))),
        }
    }

    pub fn to_json(&self) -> Json {
        let mut map = Map::new();
        for (name, value) in self.iter() {
            map.insert(name.to_string(), value.to_json());
        }
        Json::Object(map)
    }
}

impl RecordValue {
    pub fn from_json(value: &Json) -> Result<Self, RecordError> {
        value_from_json(value, "$")
    }

    /// Strings that are not valid UTF-8 are converted lossily
    pub fn to_json(&self) -> Json {
        match self {
            RecordValue::Integer(i) => Json::Number(Number::from(*i)),
            RecordValue::String(s) => Json::String(String::from_utf8_lossy(s).into_owned()),
            RecordValue::Record(r) => r.to_json(),
            RecordValue::List(items) => Json::Array(items.iter().map(RecordValue::to_json).collect()),
            RecordValue::Nil => Json::Null,
        }
    }
}

fn record_from_map(map: &Map<String, Json>, path: &str) -> Result<Record, RecordError> {
    let mut record = Record::new();
    for (name, value) in map {
        let value = value_from_json(value, &format!("{path}.{name}"))?;
        record.insert(name.as_str(), value);
    }
    Ok(record)
}

fn value_from_json(value: &Json, path: &str) -> Result<RecordValue, RecordError> {
    match value {
        Json::Null => Ok(RecordValue::Nil),
        Json::Number(n) => n.as_i64().map(RecordValue::Integer).ok_or_else(|| {
            RecordError::Unsupported {
                path: path.to_string(),
                reason: format!("{n} is not a 64-bit integer"),
            }
        }),
        Json::String(s) => Ok(RecordValue::String(s.as_bytes().to_vec())),
        Json::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| value_from_json(item, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(RecordValue::List),
        Json::Object(map) => record_from_map(map, path).map(RecordValue::Record),
        Json::Bool(_) => Err(RecordError::Unsupported {
            path: path.to_string(),
            reason: "booleans have no wire type".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json() {
        let record = Record::from_json(&json!({
            "name": "Ann",
            "age": 5,
            "phones": [{ "number": "111" }, null],
            "note": null
        }))
        .unwrap();

        assert_eq!(record.get("name").and_then(RecordValue::as_str), Some("Ann"));
        assert_eq!(record.get("age").and_then(RecordValue::as_integer), Some(5));
        assert!(record.get("note").unwrap().is_nil());

        let phones = record.get("phones").and_then(RecordValue::as_list).unwrap();
        assert_eq!(phones.len(), 2);
        assert_eq!(
            phones[0].as_record().and_then(|r| r.get("number")),
            Some(&RecordValue::from("111"))
        );
        assert!(phones[1].is_nil());
    }

    #[test]
    fn test_to_json() {
        let record = Record::new()
            .with_str("name", "Ann")
            .with_list("xs", vec![RecordValue::Integer(1), RecordValue::Nil])
            .with_record("pet", Record::new().with_int("legs", 4));
        assert_eq!(
            record.to_json(),
            json!({ "name": "Ann", "xs": [1, null], "pet": { "legs": 4 } })
        );
    }

    #[test]
    fn test_rejects_unsupported() {
        assert_eq!(
            Record::from_json(&json!([1, 2])),
            Err(RecordError::NotAnObject("array"))
        );
        assert_eq!(
            Record::from_json(&json!({ "a": { "b": [1, 2.5] } })),
            Err(RecordError::Unsupported {
                path: "$.a.b[1]".into(),
                reason: "2.5 is not a 64-bit integer".into(),
            })
        );
        assert!(matches!(
            Record::from_json(&json!({ "flag": true })),
            Err(RecordError::Unsupported { .. })
        ));
    }
}
