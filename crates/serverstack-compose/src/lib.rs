//! # serverstack-compose
//!
//! Composition engine for serverless backends built from named stacks.
//!
//! Handles:
//! - **App**: the composition root and memoizing stack registry.
//! - **Resource / Secret**: per-stack resource and secret declarations.
//! - **Binder**: capability grants from resources to consuming compute units.
//! - **Route**: path template parsing and the validated route table.
//! - **Output**: named values exported by stacks.
//! - **Graph**: dependency graph and deployment ordering.
//! - **Manifest / Resolver**: the serialized composition handed to the
//!   deployment collaborator and the interface it resolves identities through.

pub mod app;
pub mod binder;
pub mod graph;
pub mod manifest;
pub mod output;
pub mod resolver;
pub mod resource;
pub mod route;
pub mod secret;
pub mod stack;

pub use app::{App, Composition, StackContext};
pub use binder::{Binding, ConsumerRef, ResourceBinder};
pub use output::{OutputExporter, OutputValue};
pub use resource::{ResourceAttributes, ResourceRef, ResourceRegistry, TableSchema};
pub use route::{Route, RouteDefaults, RouteOptions, RouteTable};
pub use secret::{SecretRef, SecretStore};
pub use stack::{Stack, StackHandle, StackState};
