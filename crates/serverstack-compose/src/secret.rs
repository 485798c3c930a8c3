//! Secret placeholders.
//!
//! A secret is declared by name only. Its value is never materialized during
//! composition; the deployment collaborator resolves it and injects it into
//! every consumer bound with [`Capability::Inject`](serverstack_common::types::Capability).

use std::fmt;

use serde::{Deserialize, Serialize};
use serverstack_common::error::Result;

use crate::resource::{ResourceAttributes, ResourceRef, ResourceRegistry};

/// Reference to a declared secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretRef(ResourceRef);

impl SecretRef {
    /// Secret name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.name()
    }

    /// The underlying resource reference.
    #[must_use]
    pub const fn as_resource(&self) -> &ResourceRef {
        &self.0
    }
}

impl From<SecretRef> for ResourceRef {
    fn from(secret: SecretRef) -> Self {
        secret.0
    }
}

impl AsRef<ResourceRef> for SecretRef {
    fn as_ref(&self) -> &ResourceRef {
        &self.0
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Secrets declared by one stack, in declaration order.
///
/// Secrets share the stack's resource namespace, so a secret cannot reuse the
/// name of a table or api.
#[derive(Debug, Clone, Default)]
pub struct SecretStore {
    secrets: Vec<SecretRef>,
}

impl SecretStore {
    /// Creates an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            secrets: Vec::new(),
        }
    }

    /// Declares a secret placeholder in `registry`.
    ///
    /// # Errors
    ///
    /// Returns `ServerstackError::DuplicateResource` if the name is taken.
    pub fn declare(
        &mut self,
        registry: &mut ResourceRegistry,
        name: impl Into<String>,
    ) -> Result<SecretRef> {
        let reference = registry.declare(name, ResourceAttributes::Secret)?;
        let secret = SecretRef(reference);
        self.secrets.push(secret.clone());
        Ok(secret)
    }

    /// Declared secrets.
    #[must_use]
    pub fn secrets(&self) -> &[SecretRef] {
        &self.secrets
    }
}

#[cfg(test)]
mod tests {
    use serverstack_common::error::ServerstackError;
    use serverstack_common::types::ResourceKind;

    use super::*;
    use crate::stack::StackHandle;

    #[test]
    fn declared_secret_is_a_secret_resource() {
        let mut registry = ResourceRegistry::new(StackHandle::new(0), "Api");
        let mut store = SecretStore::new();
        let secret = store
            .declare(&mut registry, "STRIPE_SECRET_KEY")
            .expect("declare");
        assert_eq!(secret.name(), "STRIPE_SECRET_KEY");
        assert_eq!(secret.as_resource().kind(), ResourceKind::Secret);
        assert!(registry.contains(secret.as_resource()));
        assert_eq!(store.secrets().len(), 1);
    }

    #[test]
    fn duplicate_secret_is_rejected() {
        let mut registry = ResourceRegistry::new(StackHandle::new(0), "Api");
        let mut store = SecretStore::new();
        let _ = store.declare(&mut registry, "KEY").expect("declare");
        let err = store.declare(&mut registry, "KEY").unwrap_err();
        assert!(matches!(err, ServerstackError::DuplicateResource { .. }));
        assert_eq!(store.secrets().len(), 1);
    }
}
