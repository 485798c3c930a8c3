//! Unified error types for the serverstack workspace.
//!
//! Every composition-time failure is fail-fast: the variant carries the
//! identity of the offending stack, resource, route, or output so the
//! composition root can report it verbatim.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum ServerstackError {
    /// A stack was requested before it finished building (includes cycles).
    #[error("stack \"{requested}\" has not been built yet (requested by {requested_by})")]
    UnbuiltDependency {
        /// Name of the stack that was requested.
        requested: String,
        /// Stack (or the composition root) that made the request.
        requested_by: String,
    },

    /// A resource name was declared twice within one stack.
    #[error("resource \"{resource}\" is already declared in stack \"{stack}\"")]
    DuplicateResource {
        /// Stack that owns the resource namespace.
        stack: String,
        /// Logical resource name.
        resource: String,
    },

    /// A reference points at a resource that was never declared.
    #[error("unknown resource \"{resource}\" in stack \"{stack}\"")]
    UnknownResource {
        /// Stack the reference claims to belong to.
        stack: String,
        /// Logical resource name.
        resource: String,
    },

    /// A stack referenced something owned by a stack it never declared as a dependency.
    #[error("stack \"{stack}\" references \"{dependency}\" without declaring it as a dependency")]
    UndeclaredDependency {
        /// Referencing stack.
        stack: String,
        /// Stack that owns the referenced item.
        dependency: String,
    },

    /// A route with the same method and normalized path already exists.
    #[error("duplicate route: {method} {path}")]
    DuplicateRoute {
        /// HTTP method of the colliding route.
        method: String,
        /// Normalized path template of the colliding route.
        path: String,
    },

    /// A path template is malformed.
    #[error("invalid path \"{path}\": {reason}")]
    InvalidPath {
        /// The template as written.
        path: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An output name was exported twice by one stack.
    #[error("output \"{output}\" is already exported by stack \"{stack}\"")]
    DuplicateOutput {
        /// Exporting stack.
        stack: String,
        /// Output name.
        output: String,
    },

    /// The exports of a stack were requested with the wrong type.
    #[error("exports of stack \"{stack}\" do not have the requested type")]
    ExportMismatch {
        /// Stack whose exports were requested.
        stack: String,
    },

    /// A previous build failed, so the composition can no longer be used.
    #[error("composition aborted after stack \"{stack}\" failed to build")]
    Aborted {
        /// Stack whose build failed first.
        stack: String,
    },

    /// A required item was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing item.
        kind: &'static str,
        /// Identifier of the missing item.
        id: String,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, ServerstackError>;
