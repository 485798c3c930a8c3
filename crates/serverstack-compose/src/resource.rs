//! Per-stack resource declarations.
//!
//! Every stack owns one [`ResourceRegistry`]. Names are unique within the
//! registry regardless of kind, and a declared resource never changes.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use serverstack_common::error::{Result, ServerstackError};
use serverstack_common::types::{AuthorizerMode, FieldType, ResourceKind};

use crate::stack::StackHandle;

/// Non-owning reference to a declared resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceRef {
    stack: StackHandle,
    stack_name: String,
    name: String,
    kind: ResourceKind,
}

impl ResourceRef {
    /// Handle of the declaring stack.
    #[must_use]
    pub const fn stack(&self) -> StackHandle {
        self.stack
    }

    /// Name of the declaring stack.
    #[must_use]
    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    /// Logical name within the declaring stack.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resource kind.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Qualified `Stack/name` path, unique across a composition.
    #[must_use]
    pub fn path(&self) -> String {
        format!("{}/{}", self.stack_name, self.name)
    }

    pub(crate) fn unknown(&self) -> ServerstackError {
        ServerstackError::UnknownResource {
            stack: self.stack_name.clone(),
            resource: self.name.clone(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.stack_name, self.name)
    }
}

/// Primary-key schema of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Declared fields and their types.
    pub fields: BTreeMap<String, FieldType>,
    /// Partition key of the primary index.
    pub partition_key: String,
    /// Optional sort key of the primary index.
    pub sort_key: Option<String>,
}

impl TableSchema {
    /// Creates a schema whose primary index is partitioned by `partition_key`.
    #[must_use]
    pub fn new(partition_key: impl Into<String>) -> Self {
        Self {
            fields: BTreeMap::new(),
            partition_key: partition_key.into(),
            sort_key: None,
        }
    }

    /// Declares a field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        let _ = self.fields.insert(name.into(), field_type);
        self
    }

    /// Sets the sort key of the primary index.
    #[must_use]
    pub fn sort_key(mut self, key: impl Into<String>) -> Self {
        self.sort_key = Some(key.into());
        self
    }

    /// Checks that both index keys are declared fields.
    ///
    /// # Errors
    ///
    /// Returns `ServerstackError::Config` naming the undeclared key.
    pub fn validate(&self, table: &str) -> Result<()> {
        let keys = std::iter::once(&self.partition_key).chain(self.sort_key.as_ref());
        for key in keys {
            if !self.fields.contains_key(key) {
                return Err(ServerstackError::Config {
                    message: format!("table \"{table}\" index key \"{key}\" is not a declared field"),
                });
            }
        }
        Ok(())
    }
}

/// Kind-specific attributes of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResourceAttributes {
    /// A storage table and its key schema.
    Table(TableSchema),
    /// A secret; its value only exists at deploy time.
    Secret,
    /// An API and its default authorizer.
    Api {
        /// Authorizer applied to routes that do not override it.
        authorizer: AuthorizerMode,
    },
}

impl ResourceAttributes {
    /// Kind described by these attributes.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::Table(_) => ResourceKind::Table,
            Self::Secret => ResourceKind::Secret,
            Self::Api { .. } => ResourceKind::Api,
        }
    }
}

/// A declared resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    reference: ResourceRef,
    attributes: ResourceAttributes,
}

impl Resource {
    /// Reference to this resource.
    #[must_use]
    pub const fn reference(&self) -> &ResourceRef {
        &self.reference
    }

    /// Kind-specific attributes.
    #[must_use]
    pub const fn attributes(&self) -> &ResourceAttributes {
        &self.attributes
    }
}

/// Checks that a reference points at a declared resource.
pub trait ResourceLookup {
    /// Verifies `reference`.
    ///
    /// # Errors
    ///
    /// Returns `ServerstackError::UnknownResource` when it was never declared,
    /// or a dependency error when its stack is out of reach.
    fn check(&self, reference: &ResourceRef) -> Result<()>;
}

/// Ordered resource declarations of one stack.
#[derive(Debug, Clone)]
pub struct ResourceRegistry {
    stack: StackHandle,
    stack_name: String,
    resources: Vec<Resource>,
    index: HashMap<String, usize>,
}

impl ResourceRegistry {
    /// Creates an empty registry for the given stack.
    #[must_use]
    pub fn new(stack: StackHandle, stack_name: impl Into<String>) -> Self {
        Self {
            stack,
            stack_name: stack_name.into(),
            resources: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Handle of the owning stack.
    #[must_use]
    pub const fn stack(&self) -> StackHandle {
        self.stack
    }

    /// Name of the owning stack.
    #[must_use]
    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    /// Declares a resource.
    ///
    /// # Errors
    ///
    /// Returns `ServerstackError::DuplicateResource` if `name` is taken, or
    /// `ServerstackError::Config` for an invalid table schema.
    pub fn declare(
        &mut self,
        name: impl Into<String>,
        attributes: ResourceAttributes,
    ) -> Result<ResourceRef> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(ServerstackError::DuplicateResource {
                stack: self.stack_name.clone(),
                resource: name,
            });
        }
        if let ResourceAttributes::Table(schema) = &attributes {
            schema.validate(&name)?;
        }

        let reference = ResourceRef {
            stack: self.stack,
            stack_name: self.stack_name.clone(),
            name: name.clone(),
            kind: attributes.kind(),
        };
        tracing::debug!(stack = %self.stack_name, resource = %name, kind = %reference.kind, "declared resource");
        let _ = self.index.insert(name, self.resources.len());
        self.resources.push(Resource {
            reference: reference.clone(),
            attributes,
        });
        Ok(reference)
    }

    /// Looks up a resource by logical name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Resource> {
        self.index.get(name).map(|&idx| &self.resources[idx])
    }

    /// Returns whether `reference` was declared here.
    #[must_use]
    pub fn contains(&self, reference: &ResourceRef) -> bool {
        reference.stack == self.stack
            && reference.stack_name == self.stack_name
            && self
                .get(&reference.name)
                .is_some_and(|r| r.reference.kind == reference.kind)
    }

    /// Iterates resources in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    /// Number of declared resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns whether nothing has been declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl ResourceLookup for ResourceRegistry {
    fn check(&self, reference: &ResourceRef) -> Result<()> {
        if self.contains(reference) {
            Ok(())
        } else {
            Err(reference.unknown())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ResourceRegistry {
        ResourceRegistry::new(StackHandle::new(0), "Storage")
    }

    fn notes_schema() -> TableSchema {
        TableSchema::new("userId")
            .field("userId", FieldType::String)
            .field("noteId", FieldType::String)
            .sort_key("noteId")
    }

    #[test]
    fn declare_returns_qualified_reference() {
        let mut registry = registry();
        let table = registry
            .declare("Notes", ResourceAttributes::Table(notes_schema()))
            .expect("declare");
        assert_eq!(table.kind(), ResourceKind::Table);
        assert_eq!(table.path(), "Storage/Notes");
        assert!(registry.contains(&table));
    }

    #[test]
    fn duplicate_name_fails_across_kinds() {
        let mut registry = registry();
        let _ = registry
            .declare("Notes", ResourceAttributes::Table(notes_schema()))
            .expect("declare");
        let err = registry
            .declare("Notes", ResourceAttributes::Secret)
            .unwrap_err();
        assert!(matches!(
            err,
            ServerstackError::DuplicateResource { ref resource, .. } if resource == "Notes"
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn undeclared_sort_key_is_rejected() {
        let mut registry = registry();
        let schema = TableSchema::new("userId")
            .field("userId", FieldType::String)
            .sort_key("noteId");
        let msg = registry
            .declare("Notes", ResourceAttributes::Table(schema))
            .unwrap_err()
            .to_string();
        assert!(msg.contains("noteId"), "got: {msg}");
        assert!(registry.is_empty());
    }

    #[test]
    fn reference_from_other_stack_is_unknown() {
        let mut other = ResourceRegistry::new(StackHandle::new(1), "Other");
        let foreign = other
            .declare("Notes", ResourceAttributes::Secret)
            .expect("declare");
        let mut registry = registry();
        let _ = registry
            .declare("Notes", ResourceAttributes::Secret)
            .expect("declare");
        assert!(registry.check(&foreign).is_err());
    }

    #[test]
    fn iteration_preserves_declaration_order() {
        let mut registry = registry();
        for name in ["b", "a", "c"] {
            let _ = registry
                .declare(name, ResourceAttributes::Secret)
                .expect("declare");
        }
        let names: Vec<&str> = registry.iter().map(|r| r.reference().name()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }
}
