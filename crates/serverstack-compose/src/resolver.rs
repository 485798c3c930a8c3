//! Boundary with the deployment collaborator.
//!
//! The engine never touches live infrastructure. After composition the
//! deployment collaborator resolves declared resources to physical
//! identities through [`PhysicalResolver`], and injects into every bound
//! consumer the environment computed by [`injected_environment`].

use serde::{Deserialize, Serialize};
use serverstack_common::constants::{
    API_URL_ATTRIBUTE, ENV_PREFIX, SECRET_VALUE_ATTRIBUTE, TABLE_NAME_ATTRIBUTE,
};
use serverstack_common::error::Result;
use serverstack_common::types::{Capability, ResourceKind};

use crate::binder::Binding;
use crate::resource::ResourceRef;

/// Resolves attributes of declared resources once they are deployed.
pub trait PhysicalResolver {
    /// Resolves `attribute` of `resource`, declared in the stack deployed
    /// as `physical_stack`.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource or attribute is not deployed.
    fn resolve(&self, physical_stack: &str, resource: &ResourceRef, attribute: &str)
    -> Result<String>;
}

impl<F> PhysicalResolver for F
where
    F: Fn(&str, &ResourceRef, &str) -> Result<String>,
{
    fn resolve(
        &self,
        physical_stack: &str,
        resource: &ResourceRef,
        attribute: &str,
    ) -> Result<String> {
        self(physical_stack, resource, attribute)
    }
}

/// Resolves every attribute to a deterministic `${stack.resource.attribute}`
/// token, for previews before anything is deployed.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderResolver;

impl PhysicalResolver for PlaceholderResolver {
    fn resolve(
        &self,
        physical_stack: &str,
        resource: &ResourceRef,
        attribute: &str,
    ) -> Result<String> {
        Ok(format!("${{{physical_stack}.{}.{attribute}}}", resource.name()))
    }
}

/// An output with its resolved value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedOutput {
    /// Exporting stack.
    pub stack: String,
    /// Output name.
    pub name: String,
    /// Resolved value.
    pub value: String,
}

/// Environment variables a consumer needs for `binding`.
///
/// Each entry maps a variable name to the `Stack/name.attribute` reference
/// the deployment collaborator substitutes. A table is injected only for
/// read or write grants, a secret only for inject grants.
#[must_use]
pub fn injected_environment(binding: &Binding) -> Vec<(String, String)> {
    let resource = binding.resource();
    let needed = match resource.kind() {
        ResourceKind::Table => {
            binding.grants(Capability::Read) || binding.grants(Capability::Write)
        }
        ResourceKind::Secret => binding.grants(Capability::Inject),
        ResourceKind::Api => !binding.capabilities().is_empty(),
    };
    if !needed {
        return Vec::new();
    }

    vec![(
        environment_key(resource),
        format!("{}.{}", resource.path(), injected_attribute(resource.kind())),
    )]
}

/// Variable name under which `resource` is injected into its consumers:
/// `SERVERSTACK_{KIND}_{ATTRIBUTE}_{STACK}_{NAME}`, upper-cased, with every
/// other character replaced by `_`.
#[must_use]
pub fn environment_key(resource: &ResourceRef) -> String {
    format!(
        "{ENV_PREFIX}_{}_{}_{}_{}",
        env_fragment(&resource.kind().to_string()),
        env_fragment(injected_attribute(resource.kind())),
        env_fragment(resource.stack_name()),
        env_fragment(resource.name()),
    )
}

const fn injected_attribute(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Table => TABLE_NAME_ATTRIBUTE,
        ResourceKind::Secret => SECRET_VALUE_ATTRIBUTE,
        ResourceKind::Api => API_URL_ATTRIBUTE,
    }
}

fn env_fragment(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serverstack_common::config::AppConfig;
    use serverstack_common::error::ServerstackError;
    use serverstack_common::types::FieldType;

    use super::*;
    use crate::app::App;
    use crate::binder::ConsumerRef;
    use crate::output::OutputValue;
    use crate::resource::TableSchema;
    use crate::stack::Stack;

    fn composed() -> Stack {
        let mut app = App::new(AppConfig::default());
        let handle = app
            .build("Api", |ctx| {
                let table = ctx.table(
                    "Notes",
                    TableSchema::new("userId").field("userId", FieldType::String),
                )?;
                let key = ctx.secret("stripe-key")?;
                let audit = ctx.secret("AUDIT")?;
                let handler = ConsumerRef::function("list.main");
                ctx.bind(&table, &handler, [Capability::Read])?;
                ctx.bind(key.as_resource(), &handler, [Capability::Inject])?;
                ctx.bind(audit.as_resource(), &handler, [Capability::Read])?;
                ctx.export("Table", OutputValue::attribute(&table, TABLE_NAME_ATTRIBUTE))
            })
            .expect("build");
        app.get(handle).expect("stack").clone()
    }

    #[test]
    fn table_binding_injects_table_name() {
        let stack = composed();
        let env = injected_environment(&stack.bindings()[0]);
        assert_eq!(
            env,
            vec![(
                "SERVERSTACK_TABLE_TABLENAME_API_NOTES".to_string(),
                "Api/Notes.tableName".to_string()
            )]
        );
    }

    #[test]
    fn secret_binding_injects_sanitized_key() {
        let stack = composed();
        let env = injected_environment(&stack.bindings()[1]);
        assert_eq!(env[0].0, "SERVERSTACK_SECRET_VALUE_API_STRIPE_KEY");
    }

    #[test]
    fn secret_without_inject_grant_is_not_injected() {
        let stack = composed();
        assert!(injected_environment(&stack.bindings()[2]).is_empty());
    }

    #[test]
    fn placeholder_resolver_is_deterministic() {
        let stack = composed();
        let Some(OutputValue::Attribute {
            resource,
            attribute,
        }) = stack.output("Table")
        else {
            panic!("expected an attribute output");
        };
        let value = PlaceholderResolver
            .resolve("dev-notes-Api", resource, attribute)
            .expect("resolve");
        assert_eq!(value, "${dev-notes-Api.Notes.tableName}");
    }

    #[test]
    fn closures_act_as_resolvers() {
        let stack = composed();
        let resource = stack.bindings()[0].resource();
        let failing = |_: &str, r: &ResourceRef, _: &str| -> Result<String> {
            Err(ServerstackError::NotFound {
                kind: "resource",
                id: r.path(),
            })
        };
        let err = failing.resolve("dev-notes-Api", resource, "arn").unwrap_err();
        assert!(err.to_string().contains("Api/Notes"), "got: {err}");
    }
}
