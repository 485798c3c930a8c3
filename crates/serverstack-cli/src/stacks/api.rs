//! Api stack: the notes CRUD routes over the storage table.

use serverstack_common::constants::API_URL_ATTRIBUTE;
use serverstack_common::error::Result;
use serverstack_common::types::AuthorizerMode;
use serverstack_compose::{
    OutputValue, ResourceRef, RouteDefaults, RouteOptions, RouteTable, StackContext,
};

use super::storage::{self, StorageExports};

/// Logical stack name.
pub const NAME: &str = "Api";

/// Name of the exported endpoint output.
pub const ENDPOINT_OUTPUT: &str = "ApiEndpoint";

/// Secret injected into every handler.
pub const STRIPE_SECRET: &str = "STRIPE_SECRET_KEY";

const ROUTES: [(&str, &str); 5] = [
    ("POST /notes", "packages/functions/src/create.main"),
    ("GET /notes/{id}", "packages/functions/src/get.main"),
    ("GET /notes", "packages/functions/src/list.main"),
    ("PUT /notes/{id}", "packages/functions/src/update.main"),
    ("DELETE /notes/{id}", "packages/functions/src/delete.main"),
];

/// What the api stack hands to its dependents.
#[derive(Debug, Clone)]
pub struct ApiExports {
    /// The api construct.
    pub api: ResourceRef,
}

/// Attaches the notes routes, binding the table and the payment secret to
/// the api, and exports its endpoint.
///
/// # Errors
///
/// Returns `UnbuiltDependency` if the storage stack is not built yet, or any
/// route or binding error.
pub fn api_stack(ctx: &mut StackContext<'_>) -> Result<ApiExports> {
    let StorageExports { table } = ctx.use_exports(storage::NAME)?;
    let stripe_key = ctx.secret(STRIPE_SECRET)?;

    let mut routes = RouteTable::new(
        RouteDefaults::new()
            .authorizer(AuthorizerMode::Iam)
            .bind(table)
            .bind(stripe_key),
    );
    for (key, handler) in ROUTES {
        let _ = routes.add(key, handler, RouteOptions::new())?;
    }

    let api = ctx.api(NAME, routes)?;
    ctx.export(
        ENDPOINT_OUTPUT,
        OutputValue::attribute(&api, API_URL_ATTRIBUTE),
    )?;
    Ok(ApiExports { api })
}
