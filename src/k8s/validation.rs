// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! Validation functions for Kubernetes object names and keys.
//!
//! Rejects names the API server would refuse, so a malformed PMR fails
//! before any cluster access instead of halfway through a cycle.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

/// Maximum allowed length for identity strings (users, service accounts).
pub const MAX_FIELD_LENGTH: usize = 256;

/// Maximum length of an RFC-1123 label.
pub const MAX_LABEL_LENGTH: usize = 63;

/// Maximum length of a DNS subdomain (qualified-name prefix).
const MAX_SUBDOMAIN_LENGTH: usize = 253;

/// Maximum allowed length for path fields.
const MAX_PATH_LENGTH: usize = 1024;

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid RFC-1123 label '{0}'")]
    InvalidLabel(String),
    #[error("Invalid qualified name '{0}'")]
    InvalidQualifiedName(String),
    #[error("Path traversal detected: {0}")]
    PathTraversal(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Field contains control characters: {0}")]
    ControlCharacters(String),
    #[error("Field '{field}' exceeds maximum length of {max}")]
    MaxLengthExceeded { field: String, max: usize },
    #[error("Field '{0}' cannot be empty")]
    EmptyField(String),
}

fn label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("label pattern compiles")
    })
}

fn qualified_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]$")
            .expect("qualified name pattern compiles")
    })
}

fn subdomain_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
            .expect("subdomain pattern compiles")
    })
}

/// Validate an RFC-1123 label, as used for namespaces and Profile names.
pub fn validate_label(value: &str, field_name: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyField(field_name.to_string()));
    }

    if value.len() > MAX_LABEL_LENGTH {
        return Err(ValidationError::MaxLengthExceeded {
            field: field_name.to_string(),
            max: MAX_LABEL_LENGTH,
        });
    }

    if !label_regex().is_match(value) {
        return Err(ValidationError::InvalidLabel(value.to_string()));
    }

    Ok(())
}

/// Validate a Kubernetes qualified name such as `limits.cpu` or
/// `requests.nvidia.com/gpu`.
///
/// The optional prefix before `/` must be a DNS subdomain.
pub fn validate_qualified_name(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyField("resource name".to_string()));
    }

    let (prefix, name) = match value.rsplit_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, value),
    };

    if let Some(prefix) = prefix {
        if prefix.is_empty()
            || prefix.len() > MAX_SUBDOMAIN_LENGTH
            || !subdomain_regex().is_match(prefix)
        {
            return Err(ValidationError::InvalidQualifiedName(value.to_string()));
        }
    }

    if name.len() > MAX_LABEL_LENGTH || !qualified_name_regex().is_match(name) {
        return Err(ValidationError::InvalidQualifiedName(value.to_string()));
    }

    Ok(())
}

/// Validate an identity string (user e-mail, service-account reference).
///
/// Identities end up in annotations and request-header matches, so control
/// characters are rejected.
pub fn validate_identity(value: &str, field_name: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field_name.to_string()));
    }

    if value.len() > MAX_FIELD_LENGTH {
        return Err(ValidationError::MaxLengthExceeded {
            field: field_name.to_string(),
            max: MAX_FIELD_LENGTH,
        });
    }

    if value.chars().any(char::is_control) {
        return Err(ValidationError::ControlCharacters(field_name.to_string()));
    }

    Ok(())
}

/// Validate a path relative to the synced repository root.
///
/// Checks for traversal, absolute paths, null bytes, and length limits.
pub fn validate_relative_path(path: &str, field_name: &str) -> Result<(), ValidationError> {
    if path.is_empty() {
        return Err(ValidationError::EmptyField(field_name.to_string()));
    }

    if path.len() > MAX_PATH_LENGTH {
        return Err(ValidationError::MaxLengthExceeded {
            field: field_name.to_string(),
            max: MAX_PATH_LENGTH,
        });
    }

    if path.contains('\0') {
        return Err(ValidationError::InvalidPath(format!(
            "{}: contains null byte",
            field_name
        )));
    }

    let path_obj = Path::new(path);
    if path_obj.is_absolute() || path.starts_with('/') {
        return Err(ValidationError::InvalidPath(format!(
            "{}: must be relative to the repository root",
            field_name
        )));
    }

    for component in path_obj.components() {
        if let std::path::Component::ParentDir = component {
            return Err(ValidationError::PathTraversal(format!(
                "{}: contains '..' sequence",
                field_name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;
