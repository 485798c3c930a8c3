//! Named values exported by a stack.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serverstack_common::error::{Result, ServerstackError};

use crate::resource::ResourceRef;

/// Value of an output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputValue {
    /// A value known at composition time.
    Literal(String),
    /// An attribute of a declared resource, only known after deployment
    /// (e.g. the `url` of an api).
    Attribute {
        /// Resource carrying the attribute.
        resource: ResourceRef,
        /// Attribute name.
        attribute: String,
    },
}

impl OutputValue {
    /// A literal value.
    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    /// A deploy-time attribute of `resource`.
    #[must_use]
    pub fn attribute(resource: &ResourceRef, attribute: impl Into<String>) -> Self {
        Self::Attribute {
            resource: resource.clone(),
            attribute: attribute.into(),
        }
    }

    /// Resource this value depends on, if any.
    #[must_use]
    pub const fn resource(&self) -> Option<&ResourceRef> {
        match self {
            Self::Literal(_) => None,
            Self::Attribute { resource, .. } => Some(resource),
        }
    }
}

impl fmt::Display for OutputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.write_str(value),
            Self::Attribute {
                resource,
                attribute,
            } => write!(f, "<{}.{attribute}>", resource.path()),
        }
    }
}

/// Outputs of one stack, keyed by name.
#[derive(Debug, Clone)]
pub struct OutputExporter {
    stack_name: String,
    outputs: BTreeMap<String, OutputValue>,
}

impl OutputExporter {
    /// Creates an empty exporter for the named stack.
    #[must_use]
    pub fn new(stack_name: impl Into<String>) -> Self {
        Self {
            stack_name: stack_name.into(),
            outputs: BTreeMap::new(),
        }
    }

    /// Exports `value` under `name`.
    ///
    /// # Errors
    ///
    /// Returns `ServerstackError::DuplicateOutput` if `name` is already exported.
    pub fn export(&mut self, name: impl Into<String>, value: OutputValue) -> Result<()> {
        let name = name.into();
        if self.outputs.contains_key(&name) {
            return Err(ServerstackError::DuplicateOutput {
                stack: self.stack_name.clone(),
                output: name,
            });
        }
        tracing::debug!(stack = %self.stack_name, output = %name, %value, "exported output");
        let _ = self.outputs.insert(name, value);
        Ok(())
    }

    /// Looks up an output.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OutputValue> {
        self.outputs.get(name)
    }

    /// All outputs, sorted by name.
    #[must_use]
    pub const fn outputs(&self) -> &BTreeMap<String, OutputValue> {
        &self.outputs
    }
}
