//! Stack identity, lifecycle state, and contents.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::binder::{Binding, ResourceBinder};
use crate::output::{OutputExporter, OutputValue};
use crate::resource::{ResourceRef, ResourceRegistry};
use crate::route::{Route, RouteTable};
use crate::secret::{SecretRef, SecretStore};

/// Identity of a stack within one composition run.
///
/// Handles are issued by the registry in declaration order. Two handles are
/// equal exactly when they name the same stack instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StackHandle(usize);

impl StackHandle {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Declaration index of the stack.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StackState {
    /// Known by name only; its factory has not run.
    Declared,
    /// Its factory is running.
    Building,
    /// Its factory returned; the stack is immutable.
    Built,
    /// Its factory returned an error; the composition is aborted.
    Failed,
}

impl fmt::Display for StackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declared => write!(f, "declared"),
            Self::Building => write!(f, "building"),
            Self::Built => write!(f, "built"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A route table attached to a stack as an `Api` resource.
#[derive(Debug, Clone)]
pub struct ApiRoutes {
    resource: ResourceRef,
    table: RouteTable,
}

impl ApiRoutes {
    pub(crate) const fn new(resource: ResourceRef, table: RouteTable) -> Self {
        Self { resource, table }
    }

    /// The api resource.
    #[must_use]
    pub const fn resource(&self) -> &ResourceRef {
        &self.resource
    }

    /// Its route table.
    #[must_use]
    pub const fn table(&self) -> &RouteTable {
        &self.table
    }
}

/// A named stack.
///
/// Contents are only appended while the stack is building, through its
/// [`StackContext`](crate::app::StackContext); afterwards it is read-only.
#[derive(Debug, Clone)]
pub struct Stack {
    handle: StackHandle,
    name: String,
    pub(crate) resources: ResourceRegistry,
    pub(crate) secrets: SecretStore,
    pub(crate) bindings: ResourceBinder,
    pub(crate) apis: Vec<ApiRoutes>,
    pub(crate) dependencies: BTreeMap<StackHandle, String>,
    pub(crate) outputs: OutputExporter,
}

impl Stack {
    pub(crate) fn new(handle: StackHandle, name: &str) -> Self {
        Self {
            handle,
            name: name.to_string(),
            resources: ResourceRegistry::new(handle, name),
            secrets: SecretStore::new(),
            bindings: ResourceBinder::new(),
            apis: Vec::new(),
            dependencies: BTreeMap::new(),
            outputs: OutputExporter::new(name),
        }
    }

    /// Stack identity.
    #[must_use]
    pub const fn handle(&self) -> StackHandle {
        self.handle
    }

    /// Unique stack name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared resources, including secrets and apis.
    #[must_use]
    pub const fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    /// Declared secrets.
    #[must_use]
    pub fn secrets(&self) -> &[SecretRef] {
        self.secrets.secrets()
    }

    /// Bindings recorded by this stack.
    #[must_use]
    pub fn bindings(&self) -> &[Binding] {
        self.bindings.bindings()
    }

    /// The binder, for per-consumer queries.
    #[must_use]
    pub const fn binder(&self) -> &ResourceBinder {
        &self.bindings
    }

    /// Attached apis in declaration order.
    #[must_use]
    pub fn apis(&self) -> &[ApiRoutes] {
        &self.apis
    }

    /// Every route of every api, in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.apis.iter().flat_map(|api| api.table.routes())
    }

    /// Handles of the stacks this one depends on.
    pub fn dependencies(&self) -> impl Iterator<Item = StackHandle> + '_ {
        self.dependencies.keys().copied()
    }

    /// Names of the stacks this one depends on, ordered by handle.
    pub fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.dependencies.values().map(String::as_str)
    }

    /// Returns whether `handle` is a declared dependency.
    #[must_use]
    pub fn depends_on(&self, handle: StackHandle) -> bool {
        self.dependencies.contains_key(&handle)
    }

    /// Exported outputs, sorted by name.
    #[must_use]
    pub const fn outputs(&self) -> &BTreeMap<String, OutputValue> {
        self.outputs.outputs()
    }

    /// Looks up one output.
    #[must_use]
    pub fn output(&self, name: &str) -> Option<&OutputValue> {
        self.outputs.get(name)
    }
}
