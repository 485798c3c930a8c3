//! System-wide constants and defaults.

/// Default application name.
pub const DEFAULT_APP_NAME: &str = "notes";

/// Default deployment region.
pub const DEFAULT_REGION: &str = "eu-west-2";

/// Default deployment stage.
pub const DEFAULT_STAGE: &str = "dev";

/// Default configuration file looked up by the CLI.
pub const DEFAULT_CONFIG_FILE: &str = "serverstack.yaml";

/// Prefix of every environment variable injected into a bound consumer.
pub const ENV_PREFIX: &str = "SERVERSTACK";

/// Requester name used when the composition root itself asks for a stack.
pub const ROOT_REQUESTER: &str = "composition root";

/// Attribute of an `Api` resource holding its externally visible endpoint.
pub const API_URL_ATTRIBUTE: &str = "url";

/// Attribute of a `Table` resource holding its physical table name.
pub const TABLE_NAME_ATTRIBUTE: &str = "tableName";

/// Attribute of a `Secret` resource holding its resolved value.
pub const SECRET_VALUE_ATTRIBUTE: &str = "value";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "sstk";
