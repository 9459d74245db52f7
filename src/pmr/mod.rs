// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! Profile Management Representation (PMR) model.
//!
//! Immutable desired state: which Profiles exist, who owns them, their
//! quota, and which contributors may access them at which role.

pub mod document;
pub mod error;
pub mod representation;
pub mod types;

pub use document::{load_pmr, parse_pmr, PmrDocument, PmrLoadError};
pub use error::{SchemaError, SchemaViolation};
pub use representation::{Pmr, ProfilesManagementRepresentation};
pub use types::{
    Contributor, Owner, OwnerKind, Profile, ResourceQuota, Role, ScopeOperator,
    ScopeRequirement, ScopeSelector,
};
