//! Capability grants from resources to consuming compute units.
//!
//! The binder only records what a consumer must be granted. The merged
//! binding set is later enacted by the deployment collaborator, which turns
//! every [`Binding`] into runtime permissions and injected identifiers.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serverstack_common::error::{Result, ServerstackError};
use serverstack_common::types::{Capability, HandlerRef};

use crate::resolver::environment_key;
use crate::resource::{ResourceLookup, ResourceRef};

/// A compute unit receiving grants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum ConsumerRef {
    /// A declared construct whose functions share the grant, such as an api.
    Construct(ResourceRef),
    /// A single handler function.
    Function(HandlerRef),
}

impl ConsumerRef {
    /// Consumer for a declared construct.
    #[must_use]
    pub fn construct(resource: &ResourceRef) -> Self {
        Self::Construct(resource.clone())
    }

    /// Consumer for a single handler.
    #[must_use]
    pub fn function(handler: impl Into<HandlerRef>) -> Self {
        Self::Function(handler.into())
    }
}

impl fmt::Display for ConsumerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Construct(resource) => write!(f, "{}", resource.path()),
            Self::Function(handler) => write!(f, "fn:{handler}"),
        }
    }
}

/// Recorded grant of capabilities over one resource to one consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    resource: ResourceRef,
    consumer: ConsumerRef,
    capabilities: BTreeSet<Capability>,
}

impl Binding {
    /// Bound resource.
    #[must_use]
    pub const fn resource(&self) -> &ResourceRef {
        &self.resource
    }

    /// Receiving consumer.
    #[must_use]
    pub const fn consumer(&self) -> &ConsumerRef {
        &self.consumer
    }

    /// Granted capabilities.
    #[must_use]
    pub const fn capabilities(&self) -> &BTreeSet<Capability> {
        &self.capabilities
    }

    /// Returns whether `capability` is granted.
    #[must_use]
    pub fn grants(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// Binding set of one stack.
///
/// At most one [`Binding`] exists per (resource, consumer) pair. Rebinding
/// unions the requested capabilities into it; grants never shrink.
#[derive(Debug, Clone, Default)]
pub struct ResourceBinder {
    bindings: Vec<Binding>,
}

impl ResourceBinder {
    /// Creates an empty binder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Grants `capabilities` on `resource` to `consumer`.
    ///
    /// # Errors
    ///
    /// Returns `ServerstackError::UnknownResource` if `lookup` does not know
    /// the resource (or the construct consumer), and
    /// `ServerstackError::Config` if another resource bound to the same
    /// consumer would be injected under the same variable name.
    pub fn bind<L>(
        &mut self,
        lookup: &L,
        resource: &ResourceRef,
        consumer: &ConsumerRef,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Result<&Binding>
    where
        L: ResourceLookup + ?Sized,
    {
        lookup.check(resource)?;
        if let ConsumerRef::Construct(construct) = consumer {
            lookup.check(construct)?;
        }
        let requested: BTreeSet<Capability> = capabilities.into_iter().collect();

        let existing = self
            .bindings
            .iter()
            .position(|b| b.resource == *resource && b.consumer == *consumer);
        let idx = if let Some(idx) = existing {
            let binding = &mut self.bindings[idx];
            let before = binding.capabilities.len();
            binding.capabilities.extend(requested);
            if binding.capabilities.len() == before {
                tracing::debug!(resource = %resource.path(), %consumer, "binding already grants requested capabilities");
            } else {
                tracing::debug!(resource = %resource.path(), %consumer, "widened binding");
            }
            idx
        } else {
            self.check_environment_key(resource, consumer)?;
            tracing::debug!(resource = %resource.path(), %consumer, "bound resource");
            self.bindings.push(Binding {
                resource: resource.clone(),
                consumer: consumer.clone(),
                capabilities: requested,
            });
            self.bindings.len() - 1
        };
        Ok(&self.bindings[idx])
    }

    fn check_environment_key(&self, resource: &ResourceRef, consumer: &ConsumerRef) -> Result<()> {
        let key = environment_key(resource);
        let clash = self
            .for_consumer(consumer)
            .find(|b| environment_key(&b.resource) == key);
        match clash {
            Some(existing) => Err(ServerstackError::Config {
                message: format!(
                    "{} and {} would both be injected into {consumer} as {key}",
                    existing.resource.path(),
                    resource.path()
                ),
            }),
            None => Ok(()),
        }
    }

    /// Binding for a (resource, consumer) pair, if any.
    #[must_use]
    pub fn get(&self, resource: &ResourceRef, consumer: &ConsumerRef) -> Option<&Binding> {
        self.bindings
            .iter()
            .find(|b| b.resource == *resource && b.consumer == *consumer)
    }

    /// Bindings received by `consumer`.
    pub fn for_consumer<'a>(
        &'a self,
        consumer: &'a ConsumerRef,
    ) -> impl Iterator<Item = &'a Binding> + 'a {
        self.bindings.iter().filter(move |b| b.consumer == *consumer)
    }

    /// All bindings in first-bound order.
    #[must_use]
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }
}
