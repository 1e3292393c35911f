use std::collections::BTreeMap;

/// Maps logical property names to the authoritative stored field names for a
/// mapped domain type. Populated by the (out of scope) entity metadata
/// machinery and handed to `Aggregation::typed`; relaxed binding contexts
/// defer to it when resolving a field path's root segment.
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct FieldMappingRegistry(BTreeMap<String, String>);

impl FieldMappingRegistry {
    pub fn new() -> Self {
        FieldMappingRegistry(BTreeMap::new())
    }

    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, property: K, field: V) -> Option<String> {
        self.0.insert(property.into(), field.into())
    }

    pub fn get(&self, property: &str) -> Option<&String> {
        self.0.get(property)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn merge(&mut self, other: FieldMappingRegistry) -> &mut Self {
        self.0.extend(other.0);
        self
    }
}

impl FromIterator<(String, String)> for FieldMappingRegistry {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        FieldMappingRegistry(iter.into_iter().collect())
    }
}
