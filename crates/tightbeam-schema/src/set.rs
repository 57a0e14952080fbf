//! Descriptor registry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{MessageDescriptor, SchemaError};

/// Registry of message descriptors, keyed by full name and by wire id.
///
/// Ids are unique across the whole set regardless of codec group, so a
/// received id always resolves to exactly one descriptor.
#[derive(Debug, Default)]
pub struct SchemaSet {
    by_name: HashMap<String, Arc<MessageDescriptor>>,
    by_id: HashMap<u32, String>,
}

impl SchemaSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor.
    ///
    /// # Errors
    ///
    /// - `SchemaError::DuplicateMessage` if the full name is taken
    /// - `SchemaError::DuplicateId` if the id is taken, including by a
    ///   message of a different codec group
    /// - `SchemaError::DuplicateField` if two fields share a name
    pub fn insert(&mut self, descriptor: MessageDescriptor) -> Result<Arc<MessageDescriptor>, SchemaError> {
        if self.by_name.contains_key(&descriptor.full_name) {
            return Err(SchemaError::DuplicateMessage { name: descriptor.full_name });
        }

        for (i, field) in descriptor.fields.iter().enumerate() {
            if descriptor.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField {
                    message: descriptor.full_name.clone(),
                    field: field.name.clone(),
                });
            }
        }

        if let Some(id) = descriptor.id
            && let Some(existing) = self.by_id.get(&id)
        {
            return Err(SchemaError::DuplicateId { id, existing: existing.clone() });
        }

        if let Some(id) = descriptor.id {
            self.by_id.insert(id, descriptor.full_name.clone());
        }
        let name = descriptor.full_name.clone();
        let arc = Arc::new(descriptor);
        self.by_name.insert(name, Arc::clone(&arc));
        Ok(arc)
    }

    /// Descriptor by full name.
    pub fn by_name(&self, name: &str) -> Result<&Arc<MessageDescriptor>, SchemaError> {
        self.by_name
            .get(name)
            .ok_or_else(|| SchemaError::UnknownMessage { name: name.to_string() })
    }

    /// Descriptor by wire id.
    pub fn by_id(&self, id: u32) -> Result<&Arc<MessageDescriptor>, SchemaError> {
        let name = self.by_id.get(&id).ok_or(SchemaError::UnknownId { id })?;
        self.by_name(name)
    }

    /// True when a descriptor with this full name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Unregister a descriptor, releasing its name and id.
    ///
    /// Exists so a caller can roll back a registration whose follow-up
    /// checks (e.g. codec validation) failed.
    pub fn remove(&mut self, name: &str) -> Option<Arc<MessageDescriptor>> {
        let descriptor = self.by_name.remove(name)?;
        if let Some(id) = descriptor.id {
            self.by_id.remove(&id);
        }
        Some(descriptor)
    }

    /// Registered descriptors, in no particular order.
    pub fn descriptors(&self) -> impl Iterator<Item = &Arc<MessageDescriptor>> {
        self.by_name.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldDescriptor, FieldKind};

    #[test]
    fn lookup_by_name_and_id() {
        let mut set = SchemaSet::new();
        set.insert(MessageDescriptor::new("test.A").with_id(1)).unwrap();
        set.insert(MessageDescriptor::new("test.B").with_id(2)).unwrap();

        assert_eq!(set.by_id(1).unwrap().full_name, "test.A");
        assert_eq!(set.by_name("test.B").unwrap().id, Some(2));
        assert!(matches!(set.by_id(3), Err(SchemaError::UnknownId { id: 3 })));
    }

    #[test]
    fn duplicate_id_rejected_across_groups() {
        let mut set = SchemaSet::new();
        set.insert(MessageDescriptor::new("test.A").with_id(7).with_group("standard")).unwrap();

        let err = set
            .insert(MessageDescriptor::new("test.B").with_id(7).with_group("legacy-ccl"))
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateId { id: 7, existing: "test.A".to_string() });
    }

    #[test]
    fn duplicate_field_name_rejected() {
        let mut set = SchemaSet::new();
        let desc = MessageDescriptor::new("test.Dup")
            .with_field(FieldDescriptor::required("x", FieldKind::Bool))
            .with_field(FieldDescriptor::required("x", FieldKind::Bool));
        assert!(matches!(set.insert(desc), Err(SchemaError::DuplicateField { .. })));
    }

    #[test]
    fn messages_without_id_are_name_only() {
        let mut set = SchemaSet::new();
        set.insert(MessageDescriptor::new("test.NoId")).unwrap();
        assert!(set.contains("test.NoId"));
    }
}
