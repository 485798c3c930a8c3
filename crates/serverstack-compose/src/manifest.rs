//! Serialized composition handed to the deployment collaborator.
//!
//! The manifest carries, per stack in build order: resources with their
//! attributes, bindings with the environment they inject, routes in
//! registration order, and outputs. Every collection is ordered, so the same
//! composition always serializes to the same bytes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serverstack_common::error::Result;
use serverstack_common::types::{AuthorizerMode, Capability, HttpMethod, ResourceKind, Sha256Hash};
use sha2::{Digest, Sha256};

use crate::app::Composition;
use crate::binder::Binding;
use crate::output::OutputValue;
use crate::resolver::injected_environment;
use crate::resource::{Resource, ResourceAttributes};
use crate::route::Route;
use crate::stack::Stack;

/// The whole composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionManifest {
    /// Application name.
    pub app: String,
    /// Deployment stage.
    pub stage: String,
    /// Deployment region.
    pub region: String,
    /// Topological deployment order of stack names.
    pub deployment_order: Vec<String>,
    /// Stacks in build order.
    pub stacks: Vec<StackManifest>,
}

/// One stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackManifest {
    /// Logical name.
    pub name: String,
    /// `{stage}-{app}-{name}`.
    pub physical_name: String,
    /// Names of the stacks this one depends on.
    pub dependencies: Vec<String>,
    /// Declared resources in declaration order.
    pub resources: Vec<ResourceManifest>,
    /// Capability grants.
    pub bindings: Vec<BindingManifest>,
    /// Routes in registration order.
    pub routes: Vec<RouteManifest>,
    /// Outputs by name.
    pub outputs: BTreeMap<String, OutputManifest>,
}

/// One declared resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceManifest {
    /// Logical name.
    pub name: String,
    /// Kind tag and kind-specific attributes.
    #[serde(flatten)]
    pub attributes: ResourceAttributes,
}

/// One capability grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingManifest {
    /// `Stack/name` of the bound resource.
    pub resource: String,
    /// Kind of the bound resource.
    pub kind: ResourceKind,
    /// Receiving consumer (`Stack/name` or `fn:handler`).
    pub consumer: String,
    /// Granted capabilities, sorted.
    pub capabilities: Vec<Capability>,
    /// Variables to inject into the consumer.
    pub environment: BTreeMap<String, String>,
}

/// One route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteManifest {
    /// Api the route belongs to.
    pub api: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Template as written.
    pub path: String,
    /// Opaque handler reference.
    pub handler: String,
    /// Effective authorizer.
    pub authorizer: AuthorizerMode,
    /// `Stack/name` of every bound resource.
    pub bound_resources: Vec<String>,
}

/// One output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutputManifest {
    /// Known at composition time.
    Literal {
        /// The value.
        value: String,
    },
    /// Resolved by the deployment collaborator.
    Attribute {
        /// `Stack/name` of the resource.
        resource: String,
        /// Attribute name.
        attribute: String,
    },
}

impl CompositionManifest {
    /// Describes a finished composition.
    #[must_use]
    pub fn from_composition(composition: &Composition) -> Self {
        let config = composition.config();
        Self {
            app: config.name.clone(),
            stage: config.stage.clone(),
            region: config.region.clone(),
            deployment_order: composition.deployment_order().to_vec(),
            stacks: composition
                .stacks()
                .iter()
                .map(|stack| stack_manifest(composition, stack))
                .collect(),
        }
    }

    /// Looks up a stack by name.
    #[must_use]
    pub fn stack(&self, name: &str) -> Option<&StackManifest> {
        self.stacks.iter().find(|s| s.name == name)
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `ServerstackError::Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn stack_manifest(composition: &Composition, stack: &Stack) -> StackManifest {
    StackManifest {
        name: stack.name().to_string(),
        physical_name: composition.physical_name(stack),
        dependencies: stack.dependency_names().map(str::to_string).collect(),
        resources: stack.resources().iter().map(resource_manifest).collect(),
        bindings: stack.bindings().iter().map(binding_manifest).collect(),
        routes: stack
            .apis()
            .iter()
            .flat_map(|api| {
                api.table()
                    .routes()
                    .iter()
                    .map(move |route| route_manifest(api.resource().name(), route))
            })
            .collect(),
        outputs: stack
            .outputs()
            .iter()
            .map(|(name, value)| (name.clone(), output_manifest(value)))
            .collect(),
    }
}

fn resource_manifest(resource: &Resource) -> ResourceManifest {
    ResourceManifest {
        name: resource.reference().name().to_string(),
        attributes: resource.attributes().clone(),
    }
}

fn binding_manifest(binding: &Binding) -> BindingManifest {
    BindingManifest {
        resource: binding.resource().path(),
        kind: binding.resource().kind(),
        consumer: binding.consumer().to_string(),
        capabilities: binding.capabilities().iter().copied().collect(),
        environment: injected_environment(binding).into_iter().collect(),
    }
}

fn route_manifest(api: &str, route: &Route) -> RouteManifest {
    RouteManifest {
        api: api.to_string(),
        method: route.method(),
        path: route.path().as_str().to_string(),
        handler: route.handler().as_str().to_string(),
        authorizer: route.authorizer().clone(),
        bound_resources: route.bound_resources().iter().map(|r| r.path()).collect(),
    }
}

fn output_manifest(value: &OutputValue) -> OutputManifest {
    match value {
        OutputValue::Literal(value) => OutputManifest::Literal {
            value: value.clone(),
        },
        OutputValue::Attribute {
            resource,
            attribute,
        } => OutputManifest::Attribute {
            resource: resource.path(),
            attribute: attribute.clone(),
        },
    }
}

/// SHA-256 of the manifest's compact JSON encoding.
///
/// # Errors
///
/// Returns `ServerstackError::Serialization` if encoding fails.
pub fn digest(manifest: &CompositionManifest) -> Result<Sha256Hash> {
    let bytes = serde_json::to_vec(manifest)?;
    Sha256Hash::from_hex(format!("{:x}", Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use serverstack_common::config::AppConfig;
    use serverstack_common::types::FieldType;

    use super::*;
    use crate::app::App;
    use crate::resource::TableSchema;
    use crate::route::{RouteDefaults, RouteOptions, RouteTable};

    fn compose(stage: &str) -> Composition {
        let mut app = App::new(AppConfig::default().with_stage(stage));
        let _ = app
            .stack("Storage", |ctx| {
                ctx.table(
                    "Notes",
                    TableSchema::new("userId").field("userId", FieldType::String),
                )
            })
            .and_then(|app| {
                app.stack("Api", |ctx| {
                    let table: crate::resource::ResourceRef = ctx.use_exports("Storage")?;
                    let mut routes = RouteTable::new(
                        RouteDefaults::new()
                            .authorizer(AuthorizerMode::Iam)
                            .bind(table),
                    );
                    let _ = routes.add("GET /notes/{id}", "get.main", RouteOptions::new())?;
                    let api = ctx.api("Api", routes)?;
                    ctx.export("ApiEndpoint", OutputValue::attribute(&api, "url"))
                })
            })
            .expect("compose");
        app.finish().expect("finish")
    }

    #[test]
    fn manifest_describes_every_stack() {
        let manifest = compose("dev").manifest();
        assert_eq!(manifest.deployment_order, vec!["Storage", "Api"]);

        let storage = manifest.stack("Storage").expect("storage");
        assert_eq!(storage.physical_name, "dev-notes-Storage");
        assert!(storage.outputs.is_empty());
        assert!(matches!(
            storage.resources[0].attributes,
            ResourceAttributes::Table(_)
        ));

        let api = manifest.stack("Api").expect("api");
        assert_eq!(api.dependencies, vec!["Storage"]);
        assert_eq!(api.bindings[0].consumer, "Api/Api");
        assert_eq!(
            api.bindings[0].capabilities,
            vec![Capability::Read, Capability::Write]
        );
        assert_eq!(api.routes[0].bound_resources, vec!["Storage/Notes"]);
        assert_eq!(
            api.outputs.get("ApiEndpoint"),
            Some(&OutputManifest::Attribute {
                resource: "Api/Api".into(),
                attribute: "url".into(),
            })
        );
    }

    #[test]
    fn manifest_json_tags_resource_kind() {
        let json = compose("dev").manifest().to_json().expect("json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
        let resource = &value["stacks"][0]["resources"][0];
        assert_eq!(resource["kind"], "table");
        assert_eq!(resource["partition_key"], "userId");
        assert_eq!(value["stacks"][1]["bindings"][0]["kind"], "table");
        let back: CompositionManifest = serde_json::from_str(&json).expect("roundtrip");
        assert_eq!(back.stacks.len(), 2);
    }

    #[test]
    fn digest_is_stable_and_stage_sensitive() {
        let first = compose("dev").digest().expect("digest");
        let second = compose("dev").digest().expect("digest");
        let prod = compose("prod").digest().expect("digest");
        assert_eq!(first, second);
        assert_ne!(first, prod);
        assert_eq!(first.as_hex().len(), 64);
    }
}
