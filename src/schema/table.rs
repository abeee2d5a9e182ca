//! Fixed-slot symbol table
//!
//! Separate-chaining hash map keyed by byte strings, used for the
//! name -> block index and the id -> block index. The slot count never
//! changes; schemas are small, so chains stay short.

use std::fmt;

/// Number of hash slots
pub const SLOT_COUNT: usize = 64;

/// Seed of the multiplicative rolling hash
const HASH_SEED: u64 = 5381;

/// `hash = hash * 33 + byte`, starting from 5381
pub fn hash_bytes(key: &[u8]) -> u64 {
    key.iter().fold(HASH_SEED, |hash, &byte| {
        hash.wrapping_mul(33).wrapping_add(u64::from(byte))
    })
}

#[derive(Clone)]
struct Entry<V> {
    key: Box<[u8]>,
    value: V,
}

/// Hash map with a fixed number of chained slots
#[derive(Clone)]
pub struct SymbolTable<V> {
    slots: Vec<Vec<Entry<V>>>,
    len: usize,
}

impl<V> SymbolTable<V> {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            slots: (0..SLOT_COUNT).map(|_| Vec::new()).collect(),
            len: 0,
        }
    }

    #[inline]
    fn slot_of(key: &[u8]) -> usize {
        (hash_bytes(key) % SLOT_COUNT as u64) as usize
    }

    /// Insert a value, replacing and returning any previous value for the key
    pub fn insert(&mut self, key: &[u8], value: V) -> Option<V> {
        let chain = &mut self.slots[Self::slot_of(key)];
        if let Some(entry) = chain.iter_mut().find(|e| &*e.key == key) {
            return Some(std::mem::replace(&mut entry.value, value));
        }

        chain.push(Entry {
            key: key.into(),
            value,
        });
        self.len += 1;
        None
    }

    /// Look up a value by key
    pub fn get(&self, key: &[u8]) -> Option<&V> {
        self.slots[Self::slot_of(key)]
            .iter()
            .find(|e| &*e.key == key)
            .map(|e| &e.value)
    }

    /// Check whether a key is present
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Remove a key, keeping the order of the rest of its chain
    pub fn remove(&mut self, key: &[u8]) -> Option<V> {
        let chain = &mut self.slots[Self::slot_of(key)];
        let pos = chain.iter().position(|e| &*e.key == key)?;
        self.len -= 1;
        Some(chain.remove(pos).value)
    }

    /// Insert under a 4-byte integer key
    pub fn insert_id(&mut self, id: u32, value: V) -> Option<V> {
        self.insert(&id.to_le_bytes(), value)
    }

    /// Look up by 4-byte integer key
    pub fn get_id(&self, id: u32) -> Option<&V> {
        self.get(&id.to_le_bytes())
    }

    /// Remove a 4-byte integer key
    pub fn remove_id(&mut self, id: u32) -> Option<V> {
        self.remove(&id.to_le_bytes())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Values in slot-major, then chain order
    ///
    /// The order is stable only while the table is not mutated.
    pub fn iter(&self) -> impl Iterator<Item = &V> {
        self.slots.iter().flat_map(|chain| chain.iter().map(|e| &e.value))
    }

    /// Key/value pairs in the same order as [`SymbolTable::iter`]
    pub fn entries(&self) -> impl Iterator<Item = (&[u8], &V)> {
        self.slots
            .iter()
            .flat_map(|chain| chain.iter().map(|e| (&*e.key, &e.value)))
    }
}

impl<V> Default for SymbolTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for SymbolTable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let used = self.slots.iter().filter(|c| !c.is_empty()).count();
        f.debug_struct("SymbolTable")
            .field("len", &self.len)
            .field("slots_used", &used)
            .finish()
    }
}
