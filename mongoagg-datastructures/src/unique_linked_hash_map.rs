use linked_hash_map::LinkedHashMap;
use std::{fmt::Display, hash::Hash, iter::IntoIterator};
use thiserror::Error;

/// An insertion-ordered map that rejects duplicate keys on `insert`.
/// Callers that want shadowing semantics instead use `insert_replacing`,
/// which keeps the first occurrence's position and replaces its value.
#[derive(Debug, Hash, Default, Clone, PartialEq, Eq)]
pub struct UniqueLinkedHashMap<K, V>(LinkedHashMap<K, V>)
where
    K: Hash + Eq + PartialEq + Display;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("duplicate key found: {0}")]
pub struct DuplicateKeyError(pub String);

impl DuplicateKeyError {
    pub fn key_name(&self) -> &str {
        &self.0
    }
}

impl<K, V> UniqueLinkedHashMap<K, V>
where
    K: Hash + PartialEq + Eq + Display,
{
    pub fn new() -> Self {
        Self(LinkedHashMap::new())
    }

    pub fn insert(&mut self, k: K, v: V) -> Result<(), DuplicateKeyError> {
        // Check before inserting so the error can carry the key, not the
        // evicted value.
        if self.0.contains_key(&k) {
            return Err(DuplicateKeyError(format!("{k}")));
        }
        self.0.insert(k, v);
        Ok(())
    }

    pub fn insert_many(
        &mut self,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Result<(), DuplicateKeyError> {
        for (k, v) in entries {
            self.insert(k, v)?;
        }
        Ok(())
    }

    /// Last declaration wins: an existing key keeps its position in the
    /// insertion order but takes the new value.
    pub fn insert_replacing(&mut self, k: K, v: V) -> Option<V> {
        self.0.insert(k, v)
    }

    pub fn get(&self, k: &K) -> Option<&V> {
        self.0.get(k)
    }

    pub fn contains_key(&self, k: &K) -> bool {
        self.0.contains_key(k)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.0.iter()
    }
}

impl<K, V> IntoIterator for UniqueLinkedHashMap<K, V>
where
    K: Hash + PartialEq + Eq + Display,
{
    type Item = (K, V);
    type IntoIter = linked_hash_map::IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<K, V> From<UniqueLinkedHashMap<K, V>> for LinkedHashMap<K, V>
where
    K: Hash + Eq + PartialEq + Display,
{
    fn from(map: UniqueLinkedHashMap<K, V>) -> Self {
        map.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn insert_rejects_duplicate_key() {
        let mut map = UniqueLinkedHashMap::new();
        map.insert("a", 1).unwrap();
        assert_eq!(
            Err(DuplicateKeyError("a".to_string())),
            map.insert("a", 2)
        );
        assert_eq!(Some(&1), map.get(&"a"));
    }

    #[test]
    fn insert_replacing_keeps_position_and_takes_last_value() {
        let mut map = UniqueLinkedHashMap::new();
        map.insert_replacing("a", 1);
        map.insert_replacing("b", 2);
        assert_eq!(Some(1), map.insert_replacing("a", 3));
        assert_eq!(
            vec![("a", 3), ("b", 2)],
            map.into_iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn insert_many_preserves_order() {
        let mut map = UniqueLinkedHashMap::new();
        map.insert_many(vec![("x", 1), ("y", 2), ("z", 3)]).unwrap();
        assert_eq!(vec![&"x", &"y", &"z"], map.keys().collect::<Vec<_>>());
    }
}
