//! Getter and Setter over dynamic records
//!
//! Mirrors how a dictionary-based language binding feeds the codec:
//! missing keys read as nil, a list reports its length when asked for the
//! count, and nested records are handed over as custom values.

use std::marker::PhantomData;

use super::value::{Record, RecordValue};
use crate::codec::{Decoded, FieldKey, Getter, HostError, Setter, Value};

// ============================================================================
// Encode side
// ============================================================================

/// Reads fields out of a borrowed [`Record`] tree
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordGetter<'r>(PhantomData<&'r Record>);

impl<'r> RecordGetter<'r> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

fn to_value(value: &RecordValue) -> Value<'_, &Record> {
    match value {
        RecordValue::Integer(i) => Value::Integer(*i),
        RecordValue::String(s) => Value::String(s.as_slice()),
        RecordValue::Record(r) => Value::Custom(r),
        RecordValue::List(items) => Value::Integer(items.len() as i64),
        RecordValue::Nil => Value::Nil,
    }
}

impl<'r> Getter for RecordGetter<'r> {
    type Userdata = &'r Record;

    fn get<'a>(
        &'a self,
        ud: &'a &'r Record,
        key: &FieldKey<'_>,
    ) -> Result<Value<'a, &'r Record>, HostError> {
        let record: &'r Record = *ud;
        let Some(value) = record.get(key.name) else {
            return Ok(Value::Nil);
        };

        let value: &'r RecordValue = match key.index {
            None => value,
            Some(i) => match value.as_list().and_then(|items| items.get(i)) {
                Some(item) => item,
                None => return Ok(Value::Nil),
            },
        };
        Ok(to_value(value))
    }
}

// ============================================================================
// Decode side
// ============================================================================

/// Handle to a record or list under construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum Slot {
    Value(RecordValue),
    Node(NodeId),
}

#[derive(Debug)]
enum Node {
    Record(Vec<(String, Slot)>),
    List(Vec<Slot>),
}

/// Builds a [`Record`] tree from setter calls
///
/// Nested records and lists live in an arena addressed by [`NodeId`];
/// [`RecordBuilder::finish`] assembles the tree once decoding is done.
#[derive(Debug)]
pub struct RecordBuilder {
    nodes: Vec<Node>,
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::Record(Vec::new())],
        }
    }

    /// Handle of the top-level record
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn alloc(&mut self, node: Node) -> Result<NodeId, HostError> {
        self.nodes
            .try_reserve(1)
            .map_err(|_| HostError::new("memory not enough for record node"))?;
        self.nodes.push(node);
        Ok(NodeId(self.nodes.len() - 1))
    }

    fn store(&mut self, at: NodeId, key: &FieldKey<'_>, slot: Slot) -> Result<(), HostError> {
        let node = self
            .nodes
            .get_mut(at.0)
            .ok_or_else(|| HostError::new(format!("unknown node {}", at.0)))?;

        match (node, key.index) {
            (Node::Record(fields), None) => {
                match fields.iter_mut().find(|(name, _)| name == key.name) {
                    Some((_, existing)) => *existing = slot,
                    None => fields.push((key.name.to_string(), slot)),
                }
                Ok(())
            }
            (Node::List(items), Some(i)) => {
                let len = items.len();
                let item = items.get_mut(i).ok_or_else(|| {
                    HostError::new(format!("index {i} out of range for {}[{len}]", key.name))
                })?;
                *item = slot;
                Ok(())
            }
            (Node::Record(_), Some(i)) => Err(HostError::new(format!(
                "{}[{i}] set on a record",
                key.name
            ))),
            (Node::List(_), None) => Err(HostError::new(format!("{} set on a list", key.name))),
        }
    }

    /// Assemble the decoded tree
    pub fn finish(mut self) -> Record {
        match self.take(NodeId(0)) {
            RecordValue::Record(record) => record,
            _ => Record::new(),
        }
    }

    fn take(&mut self, id: NodeId) -> RecordValue {
        let node = match self.nodes.get_mut(id.0) {
            Some(node) => std::mem::replace(node, Node::List(Vec::new())),
            None => return RecordValue::Nil,
        };

        match node {
            Node::Record(fields) => {
                let mut record = Record::new();
                for (name, slot) in fields {
                    let value = self.resolve(slot);
                    record.insert(name, value);
                }
                RecordValue::Record(record)
            }
            Node::List(items) => {
                RecordValue::List(items.into_iter().map(|slot| self.resolve(slot)).collect())
            }
        }
    }

    fn resolve(&mut self, slot: Slot) -> RecordValue {
        match slot {
            Slot::Value(value) => value,
            Slot::Node(id) => self.take(id),
        }
    }
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Setter for RecordBuilder {
    type Userdata = NodeId;

    fn set(
        &mut self,
        ud: &NodeId,
        key: &FieldKey<'_>,
        value: Decoded<'_>,
    ) -> Result<Option<NodeId>, HostError> {
        let (slot, child) = match value {
            Decoded::Integer(i) => (Slot::Value(RecordValue::Integer(i)), None),
            Decoded::String(s) => (Slot::Value(RecordValue::String(s.to_vec())), None),
            // An absent named field stays absent; list positions keep their place.
            Decoded::Nil if key.index.is_none() => return Ok(None),
            Decoded::Nil => (Slot::Value(RecordValue::Nil), None),
            Decoded::Custom => {
                let id = self.alloc(Node::Record(Vec::new()))?;
                (Slot::Node(id), Some(id))
            }
            Decoded::List(n) => {
                let mut items = Vec::new();
                items
                    .try_reserve_exact(n)
                    .map_err(|_| HostError::new(format!("memory not enough for {n} items")))?;
                items.resize(n, Slot::Value(RecordValue::Nil));
                let id = self.alloc(Node::List(items))?;
                (Slot::Node(id), Some(id))
            }
        };

        self.store(*ud, key, slot)?;
        Ok(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ValueKind;

    fn key<'a>(name: &'a str, index: Option<usize>, kind: ValueKind) -> FieldKey<'a> {
        FieldKey {
            block: "t",
            name,
            index,
            type_name: None,
            kind,
            is_list: index.is_some(),
        }
    }

    #[test]
    fn test_getter_values() {
        let inner = Record::new().with_int("n", 1);
        let record = Record::new()
            .with_str("name", "Ann")
            .with_record("pet", inner.clone())
            .with_list("xs", vec![RecordValue::Integer(7), RecordValue::Integer(8)]);
        let getter = RecordGetter::new();
        let ud = &record;

        assert_eq!(
            getter.get(&ud, &key("name", None, ValueKind::String)).unwrap(),
            Value::String(b"Ann".as_slice())
        );
        assert_eq!(
            getter.get(&ud, &key("pet", None, ValueKind::Custom)).unwrap(),
            Value::Custom(&inner)
        );
        assert_eq!(
            getter.get(&ud, &key("xs", None, ValueKind::Integer)).unwrap(),
            Value::Integer(2)
        );
        assert_eq!(
            getter.get(&ud, &key("xs", Some(1), ValueKind::Integer)).unwrap(),
            Value::Integer(8)
        );
        assert_eq!(
            getter.get(&ud, &key("xs", Some(2), ValueKind::Integer)).unwrap(),
            Value::Nil
        );
        assert_eq!(
            getter.get(&ud, &key("missing", None, ValueKind::Integer)).unwrap(),
            Value::Nil
        );
    }

    #[test]
    fn test_builder_assembles_tree() {
        let mut builder = RecordBuilder::new();
        let root = builder.root();

        builder
            .set(&root, &key("name", None, ValueKind::String), Decoded::String(b"Ann"))
            .unwrap();
        let list = builder
            .set(&root, &key("pets", None, ValueKind::Custom), Decoded::List(2))
            .unwrap()
            .unwrap();
        let pet = builder
            .set(&list, &key("pets", Some(0), ValueKind::Custom), Decoded::Custom)
            .unwrap()
            .unwrap();
        builder
            .set(&pet, &key("legs", None, ValueKind::Integer), Decoded::Integer(4))
            .unwrap();
        builder
            .set(&list, &key("pets", Some(1), ValueKind::Custom), Decoded::Nil)
            .unwrap();
        builder
            .set(&root, &key("age", None, ValueKind::Integer), Decoded::Nil)
            .unwrap();

        let record = builder.finish();
        let expected = Record::new().with_str("name", "Ann").with_list(
            "pets",
            vec![
                RecordValue::Record(Record::new().with_int("legs", 4)),
                RecordValue::Nil,
            ],
        );
        assert_eq!(record, expected);
        assert!(record.get("age").is_none());
    }

    #[test]
    fn test_builder_rejects_bad_index() {
        let mut builder = RecordBuilder::new();
        let root = builder.root();
        let list = builder
            .set(&root, &key("xs", None, ValueKind::Integer), Decoded::List(1))
            .unwrap()
            .unwrap();

        let err = builder
            .set(&list, &key("xs", Some(3), ValueKind::Integer), Decoded::Integer(1))
            .unwrap_err();
        assert_eq!(err, HostError::new("index 3 out of range for xs[1]"));

        let err = builder
            .set(&root, &key("xs", Some(0), ValueKind::Integer), Decoded::Integer(1))
            .unwrap_err();
        assert_eq!(err, HostError::new("xs[0] set on a record"));
    }
}
