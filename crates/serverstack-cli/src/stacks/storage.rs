//! Storage stack: the notes table.

use serverstack_common::error::Result;
use serverstack_common::types::FieldType;
use serverstack_compose::{ResourceRef, StackContext, TableSchema};

/// Logical stack name.
pub const NAME: &str = "Storage";

/// What the storage stack hands to its dependents.
#[derive(Debug, Clone)]
pub struct StorageExports {
    /// The notes table.
    pub table: ResourceRef,
}

/// Declares the `Notes` table, keyed by user then note.
///
/// # Errors
///
/// Returns an error if the table cannot be declared.
pub fn storage_stack(ctx: &mut StackContext<'_>) -> Result<StorageExports> {
    let table = ctx.table(
        "Notes",
        TableSchema::new("userId")
            .field("userId", FieldType::String)
            .field("noteId", FieldType::String)
            .sort_key("noteId"),
    )?;
    Ok(StorageExports { table })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use serverstack_common::config::AppConfig;
    use serverstack_compose::{App, ResourceAttributes};

    use super::*;

    #[test]
    fn declares_notes_table_without_outputs() {
        let mut app = App::new(AppConfig::default());
        let handle = app.build(NAME, storage_stack).expect("build");
        let exports: StorageExports = app.exports(handle).expect("exports");
        assert_eq!(exports.table.path(), "Storage/Notes");

        let stack = app.get(handle).expect("stack");
        assert!(stack.outputs().is_empty());
        let Some(ResourceAttributes::Table(schema)) = stack
            .resources()
            .get("Notes")
            .map(|r| r.attributes().clone())
        else {
            panic!("expected a table");
        };
        assert_eq!(schema.partition_key, "userId");
        assert_eq!(schema.sort_key.as_deref(), Some("noteId"));
    }
}
