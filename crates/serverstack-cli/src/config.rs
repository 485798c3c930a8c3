//! Loading of `serverstack.yaml` and command-line overrides.

use std::path::Path;

use anyhow::Context;
use serverstack_common::config::AppConfig;

/// Reads the app configuration at `path`.
///
/// A missing file yields the default configuration unless `required` is set.
///
/// # Errors
///
/// Returns an error if the file is required but missing, unreadable, or not
/// valid YAML for an [`AppConfig`].
pub fn load(path: &Path, required: bool) -> anyhow::Result<AppConfig> {
    if !path.exists() {
        if required {
            anyhow::bail!("config file not found: {}", path.display());
        }
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(AppConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: AppConfig = serde_yaml::from_str(&content)
        .with_context(|| format!("invalid config file {}", path.display()))?;
    tracing::debug!(path = %path.display(), app = %config.name, "loaded config");
    Ok(config)
}

/// Applies `--stage` and `--region` and validates the result.
///
/// # Errors
///
/// Returns an error if the final configuration is invalid.
pub fn apply_overrides(
    mut config: AppConfig,
    stage: Option<&str>,
    region: Option<&str>,
) -> anyhow::Result<AppConfig> {
    if let Some(stage) = stage {
        config.stage = stage.to_string();
    }
    if let Some(region) = region {
        config.region = region.to_string();
    }
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use serverstack_common::constants::{DEFAULT_REGION, DEFAULT_STAGE};

    use super::*;

    #[test]
    fn missing_optional_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = load(&dir.path().join("serverstack.yaml"), false).expect("load");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn missing_required_file_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load(&dir.path().join("other.yaml"), true).unwrap_err();
        assert!(err.to_string().contains("not found"), "got: {err}");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("serverstack.yaml");
        std::fs::write(&path, "name: ledger\n").expect("write");
        let config = load(&path, true).expect("load");
        assert_eq!(config.name, "ledger");
        assert_eq!(config.region, DEFAULT_REGION);
        assert_eq!(config.stage, DEFAULT_STAGE);
    }

    #[test]
    fn malformed_file_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("serverstack.yaml");
        std::fs::write(&path, "name: [unterminated\n").expect("write");
        assert!(load(&path, true).is_err());
    }

    #[test]
    fn overrides_replace_stage_and_region() {
        let config =
            apply_overrides(AppConfig::default(), Some("prod"), Some("us-east-1")).expect("apply");
        assert_eq!(config.stage, "prod");
        assert_eq!(config.region, "us-east-1");
    }

    #[test]
    fn invalid_override_is_rejected() {
        assert!(apply_overrides(AppConfig::default(), Some("prod stage"), None).is_err());
    }
}
