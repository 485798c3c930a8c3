//! Application configuration model.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_APP_NAME, DEFAULT_REGION, DEFAULT_STAGE};
use crate::error::{Result, ServerstackError};

/// Root configuration of a composed application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application name, used as the middle part of physical stack names.
    pub name: String,
    /// Deployment region handed to the deployment collaborator.
    pub region: String,
    /// Deployment stage (e.g. `dev`, `prod`).
    pub stage: String,
}

impl AppConfig {
    /// Creates a configuration with the default stage.
    #[must_use]
    pub fn new(name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
            stage: DEFAULT_STAGE.into(),
        }
    }

    /// Replaces the stage.
    #[must_use]
    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = stage.into();
        self
    }

    /// Checks that name, region, and stage can be used in physical names.
    ///
    /// # Errors
    ///
    /// Returns `ServerstackError::Config` describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        check_name_part("name", &self.name)?;
        check_name_part("stage", &self.stage)?;
        if self.region.trim().is_empty() {
            return Err(ServerstackError::Config {
                message: "region must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Physical name of a stack: `{stage}-{app}-{stack}`.
    #[must_use]
    pub fn physical_stack_name(&self, stack: &str) -> String {
        format!("{}-{}-{stack}", self.stage, self.name)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new(DEFAULT_APP_NAME, DEFAULT_REGION)
    }
}

fn check_name_part(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ServerstackError::Config {
            message: format!("{field} must not be empty"),
        });
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ServerstackError::Config {
            message: format!("{field} \"{value}\" may only contain letters, digits, and '-'"),
        });
    }
    Ok(())
}
