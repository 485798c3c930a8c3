//! Composition root and memoizing stack registry.
//!
//! An [`App`] is threaded explicitly into every stack factory through a
//! [`StackContext`]. Factories pull their dependencies with
//! [`StackContext::use_stack`] (or build them in place with
//! [`StackContext::build`]); a lookup only succeeds for stacks that already
//! finished building, so a dependency cycle surfaces as
//! `ServerstackError::UnbuiltDependency` instead of unbounded recursion.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serverstack_common::config::AppConfig;
use serverstack_common::constants::ROOT_REQUESTER;
use serverstack_common::error::{Result, ServerstackError};
use serverstack_common::types::{Capability, Sha256Hash};

use crate::binder::{Binding, ConsumerRef};
use crate::graph::DependencyGraph;
use crate::manifest::{self, CompositionManifest};
use crate::output::OutputValue;
use crate::resolver::{PhysicalResolver, ResolvedOutput};
use crate::resource::{ResourceAttributes, ResourceLookup, ResourceRef, ResourceRegistry, TableSchema};
use crate::route::{Route, RouteTable};
use crate::secret::SecretRef;
use crate::stack::{ApiRoutes, Stack, StackHandle, StackState};

enum Slot {
    Building(String),
    Built { stack: Stack, exports: Box<dyn Any> },
    Failed(String),
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Building(name) => f.debug_tuple("Building").field(name).finish(),
            Self::Built { stack, .. } => f.debug_tuple("Built").field(&stack.name()).finish(),
            Self::Failed(name) => f.debug_tuple("Failed").field(name).finish(),
        }
    }
}

/// Composition root: owns every stack of one composition run.
#[derive(Debug)]
pub struct App {
    config: AppConfig,
    slots: Vec<Slot>,
    index: HashMap<String, StackHandle>,
    build_order: Vec<StackHandle>,
    aborted: Option<String>,
}

impl App {
    /// Creates an empty composition.
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            slots: Vec::new(),
            index: HashMap::new(),
            build_order: Vec::new(),
            aborted: None,
        }
    }

    /// Application configuration.
    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Builds the stack `name` with `factory`, at most once per run.
    ///
    /// The first call runs the factory and stores its stack and exports.
    /// Later calls return the same handle without running `factory`.
    ///
    /// # Errors
    ///
    /// Returns the factory's error, `ServerstackError::UnbuiltDependency`
    /// if `name` is still building, or `ServerstackError::Aborted` once any
    /// build has failed.
    pub fn build<T, F>(&mut self, name: &str, factory: F) -> Result<StackHandle>
    where
        T: Any,
        F: FnOnce(&mut StackContext<'_>) -> Result<T>,
    {
        self.build_for(ROOT_REQUESTER, name, factory)
    }

    /// Chaining form of [`App::build`].
    ///
    /// # Errors
    ///
    /// Same as [`App::build`].
    pub fn stack<T, F>(&mut self, name: &str, factory: F) -> Result<&mut Self>
    where
        T: Any,
        F: FnOnce(&mut StackContext<'_>) -> Result<T>,
    {
        let _ = self.build(name, factory)?;
        Ok(self)
    }

    /// Looks up an already-built stack.
    ///
    /// # Errors
    ///
    /// Returns `ServerstackError::UnbuiltDependency` if `name` is not built.
    pub fn use_stack(&self, name: &str) -> Result<StackHandle> {
        self.lookup(ROOT_REQUESTER, name)
    }

    /// Clones the exports a stack's factory returned.
    ///
    /// # Errors
    ///
    /// Returns `ServerstackError::ExportMismatch` if the exports are not a `T`,
    /// or `ServerstackError::NotFound` if `handle` is not a built stack.
    pub fn exports<T: Any + Clone>(&self, handle: StackHandle) -> Result<T> {
        match self.slots.get(handle.index()) {
            Some(Slot::Built { stack, exports }) => exports
                .downcast_ref::<T>()
                .cloned()
                .ok_or_else(|| ServerstackError::ExportMismatch {
                    stack: stack.name().to_string(),
                }),
            _ => Err(ServerstackError::NotFound {
                kind: "stack",
                id: handle.to_string(),
            }),
        }
    }

    /// A built stack.
    #[must_use]
    pub fn get(&self, handle: StackHandle) -> Option<&Stack> {
        match self.slots.get(handle.index()) {
            Some(Slot::Built { stack, .. }) => Some(stack),
            _ => None,
        }
    }

    /// Lifecycle state of `name`. Names the registry has not started
    /// building are reported as [`StackState::Declared`]; a stack whose
    /// factory returned an error stays [`StackState::Failed`].
    #[must_use]
    pub fn state(&self, name: &str) -> StackState {
        match self.index.get(name).map(|h| &self.slots[h.index()]) {
            Some(Slot::Built { .. }) => StackState::Built,
            Some(Slot::Building(_)) => StackState::Building,
            Some(Slot::Failed(_)) => StackState::Failed,
            None => StackState::Declared,
        }
    }

    /// Built stacks in the order their factories returned.
    pub fn built(&self) -> impl Iterator<Item = &Stack> {
        self.build_order.iter().filter_map(|&h| self.get(h))
    }

    /// Freezes the composition.
    ///
    /// # Errors
    ///
    /// Returns `ServerstackError::Aborted` if any build failed, or
    /// `ServerstackError::Config` if the dependency graph has a cycle.
    pub fn finish(self) -> Result<Composition> {
        self.ensure_live()?;

        let mut slots: Vec<Option<Slot>> = self.slots.into_iter().map(Some).collect();
        let mut stacks = Vec::with_capacity(self.build_order.len());
        for handle in &self.build_order {
            if let Some(Slot::Built { stack, .. }) = slots[handle.index()].take() {
                stacks.push(stack);
            }
        }

        let mut graph = DependencyGraph::new();
        for stack in &stacks {
            let _ = graph.add_stack(stack.name());
            for dependency in stack.dependency_names() {
                graph.add_dependency(stack.name(), dependency);
            }
        }
        let deployment_order = graph.resolve_order()?;

        let positions = stacks
            .iter()
            .enumerate()
            .map(|(pos, stack)| (stack.handle(), pos))
            .collect();
        tracing::info!(app = %self.config.name, stage = %self.config.stage, stacks = stacks.len(), "composition finished");
        Ok(Composition {
            config: self.config,
            stacks,
            positions,
            deployment_order,
        })
    }

    fn ensure_live(&self) -> Result<()> {
        match &self.aborted {
            Some(stack) => Err(ServerstackError::Aborted {
                stack: stack.clone(),
            }),
            None => Ok(()),
        }
    }

    fn lookup(&self, requester: &str, name: &str) -> Result<StackHandle> {
        self.ensure_live()?;
        match self.index.get(name) {
            Some(&handle) if matches!(self.slots[handle.index()], Slot::Built { .. }) => Ok(handle),
            _ => Err(ServerstackError::UnbuiltDependency {
                requested: name.to_string(),
                requested_by: requester.to_string(),
            }),
        }
    }

    fn build_for<T, F>(&mut self, requester: &str, name: &str, factory: F) -> Result<StackHandle>
    where
        T: Any,
        F: FnOnce(&mut StackContext<'_>) -> Result<T>,
    {
        self.ensure_live()?;
        if let Some(&handle) = self.index.get(name) {
            return match self.slots[handle.index()] {
                Slot::Built { .. } => {
                    tracing::debug!(stack = name, "stack already built, reusing");
                    Ok(handle)
                }
                Slot::Building(_) | Slot::Failed(_) => Err(ServerstackError::UnbuiltDependency {
                    requested: name.to_string(),
                    requested_by: requester.to_string(),
                }),
            };
        }

        let handle = StackHandle::new(self.slots.len());
        self.slots.push(Slot::Building(name.to_string()));
        let _ = self.index.insert(name.to_string(), handle);
        tracing::info!(stack = name, "building stack");

        let mut ctx = StackContext {
            app: self,
            stack: Stack::new(handle, name),
        };
        let result = factory(&mut ctx);
        let StackContext { stack, .. } = ctx;

        let exports = match result {
            Ok(exports) => exports,
            Err(err) => {
                tracing::error!(stack = name, error = %err, "stack failed to build");
                self.slots[handle.index()] = Slot::Failed(name.to_string());
                if self.aborted.is_none() {
                    self.aborted = Some(name.to_string());
                }
                return Err(err);
            }
        };
        // a factory that swallowed a nested failure must not complete the run
        if let Err(err) = self.ensure_live() {
            self.slots[handle.index()] = Slot::Failed(name.to_string());
            return Err(err);
        }

        self.slots[handle.index()] = Slot::Built {
            stack,
            exports: Box::new(exports),
        };
        self.build_order.push(handle);
        tracing::info!(stack = name, "stack built");
        Ok(handle)
    }
}

struct ContextLookup<'a> {
    app: &'a App,
    local: &'a ResourceRegistry,
    dependencies: &'a BTreeMap<StackHandle, String>,
}

impl ResourceLookup for ContextLookup<'_> {
    fn check(&self, reference: &ResourceRef) -> Result<()> {
        if reference.stack() == self.local.stack() {
            return self.local.check(reference);
        }
        match self.app.slots.get(reference.stack().index()) {
            Some(Slot::Built { stack, .. }) => {
                if !self.dependencies.contains_key(&stack.handle()) {
                    return Err(ServerstackError::UndeclaredDependency {
                        stack: self.local.stack_name().to_string(),
                        dependency: stack.name().to_string(),
                    });
                }
                stack.resources().check(reference)
            }
            Some(Slot::Building(name) | Slot::Failed(name)) => {
                Err(ServerstackError::UnbuiltDependency {
                    requested: name.clone(),
                    requested_by: self.local.stack_name().to_string(),
                })
            }
            None => Err(reference.unknown()),
        }
    }
}

/// Access to the composition while one stack builds.
#[derive(Debug)]
pub struct StackContext<'a> {
    app: &'a mut App,
    stack: Stack,
}

impl StackContext<'_> {
    /// Name of the stack being built.
    #[must_use]
    pub fn name(&self) -> &str {
        self.stack.name()
    }

    /// Handle of the stack being built.
    #[must_use]
    pub const fn handle(&self) -> StackHandle {
        self.stack.handle()
    }

    /// Application configuration.
    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.app.config
    }

    /// Lifecycle state of `name`, see [`App::state`].
    #[must_use]
    pub fn state(&self, name: &str) -> StackState {
        self.app.state(name)
    }

    /// Builds (or reuses) `name` and records it as a dependency.
    ///
    /// # Errors
    ///
    /// Same as [`App::build`]; building the current stack or one of the
    /// stacks currently building fails with `UnbuiltDependency`.
    pub fn build<T, F>(&mut self, name: &str, factory: F) -> Result<StackHandle>
    where
        T: Any,
        F: FnOnce(&mut StackContext<'_>) -> Result<T>,
    {
        let requester = self.stack.name().to_string();
        let handle = self.app.build_for(&requester, name, factory)?;
        self.record_dependency(handle, name);
        Ok(handle)
    }

    /// Looks up a built stack and records it as a dependency.
    ///
    /// # Errors
    ///
    /// Returns `ServerstackError::UnbuiltDependency` if `name` is not built.
    pub fn use_stack(&mut self, name: &str) -> Result<StackHandle> {
        let handle = self.app.lookup(self.stack.name(), name)?;
        self.record_dependency(handle, name);
        Ok(handle)
    }

    /// [`StackContext::use_stack`] followed by [`App::exports`].
    ///
    /// # Errors
    ///
    /// Returns `UnbuiltDependency` or `ExportMismatch`.
    pub fn use_exports<T: Any + Clone>(&mut self, name: &str) -> Result<T> {
        let handle = self.use_stack(name)?;
        self.app.exports(handle)
    }

    /// Reads an output of a built dependency.
    ///
    /// # Errors
    ///
    /// Returns `UnbuiltDependency` if the stack is not built, or
    /// `ServerstackError::NotFound` if it does not export `output`.
    pub fn use_output(&mut self, stack: &str, output: &str) -> Result<OutputValue> {
        let handle = self.use_stack(stack)?;
        self.app
            .get(handle)
            .and_then(|s| s.output(output))
            .cloned()
            .ok_or_else(|| ServerstackError::NotFound {
                kind: "output",
                id: format!("{stack}.{output}"),
            })
    }

    /// Declares a resource in the current stack.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateResource`, or `Config` for an invalid table schema.
    pub fn declare_resource(
        &mut self,
        name: &str,
        attributes: ResourceAttributes,
    ) -> Result<ResourceRef> {
        self.stack.resources.declare(name, attributes)
    }

    /// Declares a table.
    ///
    /// # Errors
    ///
    /// Same as [`StackContext::declare_resource`].
    pub fn table(&mut self, name: &str, schema: TableSchema) -> Result<ResourceRef> {
        self.declare_resource(name, ResourceAttributes::Table(schema))
    }

    /// Declares a secret placeholder.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateResource` if the name is taken.
    pub fn secret(&mut self, name: &str) -> Result<SecretRef> {
        self.stack.secrets.declare(&mut self.stack.resources, name)
    }

    /// Grants `capabilities` on `resource` to `consumer`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownResource` for undeclared resources, and
    /// `UndeclaredDependency` for resources of stacks never used.
    pub fn bind(
        &mut self,
        resource: &ResourceRef,
        consumer: &ConsumerRef,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Result<()> {
        let lookup = ContextLookup {
            app: &*self.app,
            local: &self.stack.resources,
            dependencies: &self.stack.dependencies,
        };
        let _ = self
            .stack
            .bindings
            .bind(&lookup, resource, consumer, capabilities)?;
        Ok(())
    }

    /// Grants the default capabilities of `resource`'s kind to `consumer`.
    ///
    /// # Errors
    ///
    /// Same as [`StackContext::bind`].
    pub fn bind_default(&mut self, resource: &ResourceRef, consumer: &ConsumerRef) -> Result<()> {
        let capabilities = resource.kind().default_capabilities().iter().copied();
        self.bind(resource, consumer, capabilities)
    }

    /// Attaches `routes` as an api named `name`.
    ///
    /// Every resource of the table defaults is bound to the api, and every
    /// route-specific addition is bound to that route's handler, each with
    /// the default capabilities of its kind.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateResource` if `name` is taken, or a lookup error for
    /// any bound resource out of reach.
    pub fn api(&mut self, name: &str, routes: RouteTable) -> Result<ResourceRef> {
        {
            let lookup = ContextLookup {
                app: &*self.app,
                local: &self.stack.resources,
                dependencies: &self.stack.dependencies,
            };
            let bound = routes
                .defaults()
                .bound_resources
                .iter()
                .chain(routes.routes().iter().flat_map(Route::additional_resources));
            for resource in bound {
                lookup.check(resource)?;
            }
        }

        let api = self.declare_resource(
            name,
            ResourceAttributes::Api {
                authorizer: routes.defaults().authorizer.clone(),
            },
        )?;
        let consumer = ConsumerRef::construct(&api);
        for resource in &routes.defaults().bound_resources {
            self.bind_default(resource, &consumer)?;
        }
        for route in routes.routes() {
            let handler = ConsumerRef::Function(route.handler().clone());
            for resource in route.additional_resources() {
                self.bind_default(resource, &handler)?;
            }
        }

        tracing::debug!(stack = %self.stack.name(), api = name, routes = routes.len(), "attached api");
        self.stack.apis.push(ApiRoutes::new(api.clone(), routes));
        Ok(api)
    }

    /// Exports an output of the current stack.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateOutput`, or a lookup error when the value refers to
    /// a resource out of reach.
    pub fn export(&mut self, name: &str, value: OutputValue) -> Result<()> {
        if let Some(resource) = value.resource() {
            let lookup = ContextLookup {
                app: &*self.app,
                local: &self.stack.resources,
                dependencies: &self.stack.dependencies,
            };
            lookup.check(resource)?;
        }
        self.stack.outputs.export(name, value)
    }

    fn record_dependency(&mut self, handle: StackHandle, name: &str) {
        if self
            .stack
            .dependencies
            .insert(handle, name.to_string())
            .is_none()
        {
            tracing::debug!(stack = %self.stack.name(), dependency = name, "recorded dependency");
        }
    }
}

/// A finished, immutable composition.
#[derive(Debug)]
pub struct Composition {
    config: AppConfig,
    stacks: Vec<Stack>,
    positions: HashMap<StackHandle, usize>,
    deployment_order: Vec<String>,
}

impl Composition {
    /// Application configuration.
    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Stacks in build order.
    #[must_use]
    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    /// Looks up a stack by name.
    #[must_use]
    pub fn stack(&self, name: &str) -> Option<&Stack> {
        self.stacks.iter().find(|s| s.name() == name)
    }

    /// Looks up a stack by handle.
    #[must_use]
    pub fn get(&self, handle: StackHandle) -> Option<&Stack> {
        self.positions.get(&handle).map(|&pos| &self.stacks[pos])
    }

    /// Topological deployment order of stack names.
    #[must_use]
    pub fn deployment_order(&self) -> &[String] {
        &self.deployment_order
    }

    /// Physical name of `stack` for the configured stage.
    #[must_use]
    pub fn physical_name(&self, stack: &Stack) -> String {
        self.config.physical_stack_name(stack.name())
    }

    /// Every binding of every stack.
    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.stacks.iter().flat_map(|s| s.bindings().iter())
    }

    /// Every route of every stack, in build then registration order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.stacks.iter().flat_map(Stack::routes)
    }

    /// Serializable description handed to the deployment collaborator.
    #[must_use]
    pub fn manifest(&self) -> CompositionManifest {
        CompositionManifest::from_composition(self)
    }

    /// SHA-256 digest of the manifest's JSON form.
    ///
    /// # Errors
    ///
    /// Returns `ServerstackError::Serialization` if encoding fails.
    pub fn digest(&self) -> Result<Sha256Hash> {
        manifest::digest(&self.manifest())
    }

    /// Resolves every output through the deployment collaborator.
    ///
    /// # Errors
    ///
    /// Returns the resolver's error for the first output it cannot resolve.
    pub fn resolve_outputs<R>(&self, resolver: &R) -> Result<Vec<ResolvedOutput>>
    where
        R: PhysicalResolver + ?Sized,
    {
        let mut resolved = Vec::new();
        for stack in &self.stacks {
            for (name, value) in stack.outputs() {
                let value = match value {
                    OutputValue::Literal(value) => value.clone(),
                    OutputValue::Attribute {
                        resource,
                        attribute,
                    } => {
                        let physical = self.config.physical_stack_name(resource.stack_name());
                        resolver.resolve(&physical, resource, attribute)?
                    }
                };
                resolved.push(ResolvedOutput {
                    stack: stack.name().to_string(),
                    name: name.clone(),
                    value,
                });
            }
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use serverstack_common::types::{AuthorizerMode, FieldType};

    use super::*;
    use crate::route::{RouteDefaults, RouteOptions};

    #[derive(Debug, Clone)]
    struct StorageExports {
        table: ResourceRef,
    }

    fn storage(ctx: &mut StackContext<'_>) -> Result<StorageExports> {
        let table = ctx.table(
            "Notes",
            TableSchema::new("userId")
                .field("userId", FieldType::String)
                .field("noteId", FieldType::String)
                .sort_key("noteId"),
        )?;
        Ok(StorageExports { table })
    }

    #[test]
    fn build_is_memoized() {
        let runs = Cell::new(0);
        let mut app = App::new(AppConfig::default());
        let factory = |ctx: &mut StackContext<'_>| {
            runs.set(runs.get() + 1);
            storage(ctx)
        };
        let first = app.build("Storage", factory).expect("first");
        let second = app.build("Storage", factory).expect("second");
        assert_eq!(first, second);
        assert_eq!(runs.get(), 1);
        assert_eq!(app.state("Storage"), StackState::Built);
    }

    #[test]
    fn use_before_build_fails() {
        let app = App::new(AppConfig::default());
        let err = app.use_stack("Storage").unwrap_err();
        assert!(matches!(
            err,
            ServerstackError::UnbuiltDependency { ref requested, .. } if requested == "Storage"
        ));
        assert_eq!(app.state("Storage"), StackState::Declared);
    }

    #[test]
    fn self_reference_fails_while_building() {
        let mut app = App::new(AppConfig::default());
        let err = app
            .build("Loop", |ctx| {
                assert_eq!(ctx.config().stage, "dev");
                ctx.use_stack("Loop")
            })
            .unwrap_err();
        assert!(matches!(err, ServerstackError::UnbuiltDependency { .. }));
    }

    #[test]
    fn nested_build_records_dependency() {
        let mut app = App::new(AppConfig::default());
        let api = app
            .build("Api", |ctx| {
                let _ = ctx.build("Storage", storage)?;
                let exports: StorageExports = ctx.use_exports("Storage")?;
                Ok(exports.table)
            })
            .expect("build");
        let storage_handle = app.use_stack("Storage").expect("storage built");
        let stack = app.get(api).expect("api stack");
        assert!(stack.depends_on(storage_handle));
        let order: Vec<&str> = app.built().map(Stack::name).collect();
        assert_eq!(order, vec!["Storage", "Api"]);
    }

    #[test]
    fn nested_cycle_surfaces_as_unbuilt_dependency() {
        let mut app = App::new(AppConfig::default());
        let err = app
            .build("A", |ctx| ctx.build("B", |inner| inner.build("A", storage)))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("\"A\"") && msg.contains("requested by B"), "got: {msg}");
    }

    #[test]
    fn failed_build_aborts_composition() {
        let mut app = App::new(AppConfig::default());
        let err = app
            .build("Broken", |ctx| {
                let _ = ctx.secret("KEY")?;
                ctx.secret("KEY")
            })
            .unwrap_err();
        assert!(matches!(err, ServerstackError::DuplicateResource { .. }));
        assert_eq!(app.state("Broken"), StackState::Failed);
        let err = app.build("Storage", storage).unwrap_err();
        assert!(matches!(err, ServerstackError::Aborted { ref stack } if stack == "Broken"));
        assert!(app.finish().is_err());
    }

    #[test]
    fn swallowed_nested_failure_still_aborts() {
        let mut app = App::new(AppConfig::default());
        let err = app
            .build("Outer", |ctx| {
                let _ = ctx.build("Inner", |_| -> Result<()> {
                    Err(ServerstackError::Config {
                        message: "boom".into(),
                    })
                });
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, ServerstackError::Aborted { ref stack } if stack == "Inner"));
        assert_eq!(app.state("Inner"), StackState::Failed);
        assert_eq!(app.state("Outer"), StackState::Failed);
    }

    #[test]
    fn states_follow_the_build_lifecycle() {
        let mut app = App::new(AppConfig::default());
        assert_eq!(app.state("Api"), StackState::Declared);
        let _ = app
            .build("Api", |ctx| {
                assert_eq!(ctx.state("Api"), StackState::Building);
                let _ = ctx.build("Storage", |inner| {
                    assert_eq!(inner.state("Api"), StackState::Building);
                    assert_eq!(inner.state("Storage"), StackState::Building);
                    storage(inner)
                })?;
                assert_eq!(ctx.state("Storage"), StackState::Built);
                Ok(())
            })
            .expect("api");
        assert_eq!(app.state("Api"), StackState::Built);
    }

    #[test]
    fn exports_with_wrong_type_are_rejected() {
        let mut app = App::new(AppConfig::default());
        let _ = app.build("Storage", storage).expect("storage");
        let err = app
            .build("Api", |ctx| ctx.use_exports::<String>("Storage"))
            .unwrap_err();
        assert!(matches!(err, ServerstackError::ExportMismatch { .. }));
    }

    #[test]
    fn binding_foreign_resource_requires_dependency() {
        let mut app = App::new(AppConfig::default());
        let handle = app.build("Storage", storage).expect("storage");
        let table = app.exports::<StorageExports>(handle).expect("exports").table;
        let err = app
            .build("Api", |ctx| {
                let consumer = ConsumerRef::function("list.main");
                ctx.bind(&table, &consumer, [Capability::Read])
            })
            .unwrap_err();
        assert!(matches!(
            err,
            ServerstackError::UndeclaredDependency { ref dependency, .. } if dependency == "Storage"
        ));
    }

    #[test]
    fn api_binds_defaults_to_api_and_additions_to_handlers() {
        let mut app = App::new(AppConfig::default());
        let _ = app.build("Storage", storage).expect("storage");
        let handle = app
            .build("Api", |ctx| {
                let StorageExports { table } = ctx.use_exports("Storage")?;
                let key = ctx.secret("STRIPE_SECRET_KEY")?;
                let mut routes =
                    RouteTable::new(RouteDefaults::new().authorizer(AuthorizerMode::Iam).bind(table));
                let _ = routes.add("GET /notes", "list.main", RouteOptions::new())?;
                let _ = routes.add("POST /billing", "billing.main", RouteOptions::new().bind(key))?;
                ctx.api("Api", routes)
            })
            .expect("api");
        let stack = app.get(handle).expect("stack");
        assert_eq!(stack.bindings().len(), 2);

        let table_binding = &stack.bindings()[0];
        assert_eq!(table_binding.resource().path(), "Storage/Notes");
        assert!(matches!(table_binding.consumer(), ConsumerRef::Construct(r) if r.name() == "Api"));
        assert!(table_binding.grants(Capability::Read) && table_binding.grants(Capability::Write));

        let secret_binding = &stack.bindings()[1];
        assert_eq!(
            secret_binding.consumer(),
            &ConsumerRef::function("billing.main")
        );
        assert!(secret_binding.grants(Capability::Inject));
        assert_eq!(stack.routes().count(), 2);
    }

    #[test]
    fn export_requires_reachable_resource() {
        let mut app = App::new(AppConfig::default());
        let handle = app.build("Storage", storage).expect("storage");
        let table = app.exports::<StorageExports>(handle).expect("exports").table;
        let err = app
            .build("Report", |ctx| {
                ctx.export("TableName", OutputValue::attribute(&table, "tableName"))
            })
            .unwrap_err();
        assert!(matches!(err, ServerstackError::UndeclaredDependency { .. }));
    }

    #[test]
    fn use_output_reads_dependency_outputs() {
        let mut app = App::new(AppConfig::default());
        let _ = app
            .build("Config", |ctx| ctx.export("Region", OutputValue::literal("eu-west-2")))
            .expect("config");
        let web = app
            .build("Web", |ctx| {
                let region = ctx.use_output("Config", "Region")?;
                assert!(ctx.use_output("Config", "Missing").is_err());
                ctx.export("Region", region)
            })
            .expect("web");
        let stack = app.get(web).expect("web stack");
        assert_eq!(
            stack.output("Region"),
            Some(&OutputValue::literal("eu-west-2"))
        );
    }

    #[test]
    fn chained_stacks_finish_in_order() {
        let mut app = App::new(AppConfig::default());
        let _ = app
            .stack("Storage", storage)
            .and_then(|app| app.stack("Api", |ctx| ctx.use_stack("Storage")))
            .expect("chain");
        let composition = app.finish().expect("finish");
        assert_eq!(composition.deployment_order(), ["Storage", "Api"]);
        let names: Vec<&str> = composition.stacks().iter().map(Stack::name).collect();
        assert_eq!(names, vec!["Storage", "Api"]);
    }
}
