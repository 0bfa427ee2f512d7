//! # Router Configuration
//!
//! [`RouterOptions`] controls how strict the startup validation is and how the
//! built router behaves at request time. Every field has a default, so options
//! can be built in code or loaded from a partial YAML document:
//!
//! ```yaml
//! recover_on_panic: true
//! log_level: warn
//! must_handle_all_operations: error
//! handle_all_content_types: warn
//! default_operation_validation:
//!   handle_all_responses: warn
//! operation_validations:
//!   legacyUpload:
//!     validate_request_body: off
//! exclude_operations:
//!   - internalDebug
//! ```

use crate::diagnostics::Severity;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Severity of each per-operation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationValidation {
    /// Handler body type vs. request body schemas, and body presence on both sides.
    pub validate_request_body: Severity,
    /// Declared path parameters exist and their types match.
    pub validate_path_params: Severity,
    /// Declared query parameters exist and their types match.
    pub validate_query_params: Severity,
    /// Envelope statuses exist and their payload types match.
    pub validate_responses: Severity,
    /// Every specification path parameter is bound by some handler.
    pub handle_all_path_params: Severity,
    /// Every specification query parameter is bound by some handler.
    pub handle_all_query_params: Severity,
    /// Every specification response status is produced by some handler.
    pub handle_all_responses: Severity,
}

impl Default for OperationValidation {
    fn default() -> Self {
        Self {
            validate_request_body: Severity::Error,
            validate_path_params: Severity::Error,
            validate_query_params: Severity::Error,
            validate_responses: Severity::Error,
            handle_all_path_params: Severity::Error,
            handle_all_query_params: Severity::Error,
            handle_all_responses: Severity::Error,
        }
    }
}

/// Per-operation overrides; unset fields inherit the default policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationValidationOverrides {
    pub validate_request_body: Option<Severity>,
    pub validate_path_params: Option<Severity>,
    pub validate_query_params: Option<Severity>,
    pub validate_responses: Option<Severity>,
    pub handle_all_path_params: Option<Severity>,
    pub handle_all_query_params: Option<Severity>,
    pub handle_all_responses: Option<Severity>,
}

impl OperationValidation {
    /// Every check at the same severity.
    pub fn all(severity: Severity) -> Self {
        Self {
            validate_request_body: severity,
            validate_path_params: severity,
            validate_query_params: severity,
            validate_responses: severity,
            handle_all_path_params: severity,
            handle_all_query_params: severity,
            handle_all_responses: severity,
        }
    }

    pub fn with_overrides(mut self, o: &OperationValidationOverrides) -> Self {
        macro_rules! apply {
            ($($field:ident),*) => {
                $( if let Some(s) = o.$field { self.$field = s; } )*
            };
        }
        apply!(
            validate_request_body,
            validate_path_params,
            validate_query_params,
            validate_responses,
            handle_all_path_params,
            handle_all_query_params,
            handle_all_responses
        );
        self
    }
}

/// Options for [`crate::RouterBuilder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterOptions {
    /// Turn request-time panics into `500` instead of unwinding into the server.
    pub recover_on_panic: bool,
    /// Minimum severity of build diagnostics that gets logged.
    pub log_level: Severity,
    /// Policy for specification operations without a handler.
    pub must_handle_all_operations: Severity,
    /// Policy for specification content types without a codec.
    pub handle_all_content_types: Severity,
    pub default_operation_validation: OperationValidation,
    pub operation_validations: HashMap<String, OperationValidationOverrides>,
    /// Operations skipped entirely: not registered, not validated, not counted.
    pub exclude_operations: BTreeSet<String>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            recover_on_panic: true,
            log_level: Severity::Warn,
            must_handle_all_operations: Severity::Error,
            handle_all_content_types: Severity::Error,
            default_operation_validation: OperationValidation::default(),
            operation_validations: HashMap::new(),
            exclude_operations: BTreeSet::new(),
        }
    }
}

impl RouterOptions {
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("invalid router options")
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml_str(&content)
    }

    /// Effective policy for one operation.
    pub fn validation_for(&self, operation_id: &str) -> OperationValidation {
        match self.operation_validations.get(operation_id) {
            Some(overrides) => self.default_operation_validation.with_overrides(overrides),
            None => self.default_operation_validation,
        }
    }

    pub fn is_excluded(&self, operation_id: &str) -> bool {
        self.exclude_operations.contains(operation_id)
    }
}
