//! The notes backend: a storage stack and an api stack that uses it.

pub mod api;
pub mod storage;

use serverstack_common::config::AppConfig;
use serverstack_common::error::Result;
use serverstack_compose::{App, Composition};

/// Composes the notes backend.
///
/// # Errors
///
/// Returns the first error raised by a stack factory.
pub fn compose(config: AppConfig) -> Result<Composition> {
    let mut app = App::new(config);
    let _ = app.build(storage::NAME, storage::storage_stack)?;
    let handle = app.build(api::NAME, api::api_stack)?;
    let api::ApiExports { api } = app.exports(handle)?;
    tracing::debug!(api = %api.path(), "notes api composed");
    app.finish()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;

    #[test]
    fn composes_both_stacks_in_order() {
        let composition = compose(AppConfig::default()).expect("compose");
        let names: Vec<&str> = composition.stacks().iter().map(|s| s.name()).collect();
        assert_eq!(names, [storage::NAME, api::NAME]);
        assert_eq!(composition.deployment_order(), [storage::NAME, api::NAME]);
    }
}
