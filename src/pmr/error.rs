// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! Schema errors raised while building a PMR.

use thiserror::Error;

use super::types::Role;
use crate::k8s::validation::ValidationError;

/// A PMR that cannot be trusted, with the path of the offending field.
///
/// Paths use the document layout, e.g. `profiles[1].contributors[0].role`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid PMR at '{path}': {violation}")]
pub struct SchemaError {
    pub path: String,
    pub violation: SchemaViolation,
}

/// What was wrong with the field at [`SchemaError::path`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    #[error("duplicate profile name '{0}'")]
    DuplicateProfile(String),

    #[error("contributor '{name}' listed with conflicting roles {first} and {second}")]
    ConflictingRole { name: String, first: Role, second: Role },

    #[error("owner '{0}' must not be listed as a contributor")]
    OwnerListedAsContributor(String),

    #[error("unknown role '{0}', expected one of admin, edit, view")]
    UnknownRole(String),

    #[error("unknown owner kind '{0}', expected one of User, ServiceAccount")]
    UnknownOwnerKind(String),

    #[error("resource quota must define 'hard' when any quota field is set")]
    QuotaWithoutHard,

    #[error("quota limit must be a string or number")]
    NonScalarLimit,

    #[error("object name '{object}' is produced by both '{first}' and '{second}'")]
    ObjectNameCollision {
        object: String,
        first: String,
        second: String,
    },

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("malformed document: {0}")]
    Malformed(String),
}

impl SchemaError {
    pub fn new(path: impl Into<String>, violation: impl Into<SchemaViolation>) -> Self {
        Self {
            path: path.into(),
            violation: violation.into(),
        }
    }

    /// Prefix the field path with an enclosing element, e.g. `profiles[3]`.
    pub fn within(mut self, prefix: &str) -> Self {
        self.path = if self.path.is_empty() {
            prefix.to_string()
        } else {
            format!("{}.{}", prefix, self.path)
        };
        self
    }
}
