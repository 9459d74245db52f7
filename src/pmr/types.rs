// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! Value types of the Profile Management Representation.
//!
//! Every constructor validates, so a `Profile` that exists is one the
//! engine may apply. Nothing here talks to the cluster.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{SchemaError, SchemaViolation};
use crate::k8s::validation::{validate_identity, validate_label, validate_qualified_name};

/// Subject kind of a Profile owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OwnerKind {
    User,
    ServiceAccount,
}

impl OwnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerKind::User => "User",
            OwnerKind::ServiceAccount => "ServiceAccount",
        }
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OwnerKind {
    type Err = SchemaViolation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "User" => Ok(OwnerKind::User),
            "ServiceAccount" => Ok(OwnerKind::ServiceAccount),
            other => Err(SchemaViolation::UnknownOwnerKind(other.to_string())),
        }
    }
}

/// Contributor permission tier, ordered `Admin > Edit > View`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    View,
    Edit,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Edit, Role::View];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Edit => "edit",
            Role::View => "view",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = SchemaViolation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "edit" => Ok(Role::Edit),
            "view" => Ok(Role::View),
            other => Err(SchemaViolation::UnknownRole(other.to_string())),
        }
    }
}

/// Owner of a Profile. Owner access is implicit and always full.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner {
    pub name: String,
    pub kind: OwnerKind,
}

impl Owner {
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: OwnerKind::User,
        }
    }

    pub fn service_account(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: OwnerKind::ServiceAccount,
        }
    }
}

/// An identity granted some access level to a Profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Contributor {
    pub name: String,
    pub role: Role,
}

impl Contributor {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }
}

/// Operator of a quota scope-selector requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeOperator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeRequirement {
    pub operator: ScopeOperator,
    pub scope_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeSelector {
    #[serde(default)]
    pub match_expressions: Vec<ScopeRequirement>,
}

/// Resource quota of a Profile, passed through verbatim to the workspace.
///
/// An empty quota means no limits are imposed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceQuota {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hard: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_selector: Option<ScopeSelector>,
}

impl ResourceQuota {
    pub fn from_hard<K, V>(limits: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            hard: limits
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hard.is_empty() && self.scopes.is_empty() && self.scope_selector.is_none()
    }

    /// Either no quota fields at all, or `hard` with well-formed keys.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.is_empty() {
            return Ok(());
        }

        if self.hard.is_empty() {
            return Err(SchemaError::new("hard", SchemaViolation::QuotaWithoutHard));
        }

        for (key, limit) in &self.hard {
            let path = format!("hard.{}", key);
            validate_qualified_name(key).map_err(|e| SchemaError::new(path.clone(), e))?;
            if limit.trim().is_empty() {
                return Err(SchemaError::new(
                    path,
                    crate::k8s::validation::ValidationError::EmptyField(key.clone()),
                ));
            }
        }

        Ok(())
    }
}

/// A Profile and its contributors.
///
/// Fields are private: the only way to obtain a `Profile` is through
/// [`Profile::new`], which enforces the invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    name: String,
    owner: Owner,
    resources: ResourceQuota,
    contributors: Vec<Contributor>,
}

impl Profile {
    /// Validate and build a Profile.
    ///
    /// Duplicate contributors with the same role collapse into one entry;
    /// a duplicate with a different role is rejected.
    ///
    /// # Errors
    /// Returns a `SchemaError` whose path is relative to the profile.
    pub fn new(
        name: impl Into<String>,
        owner: Owner,
        resources: ResourceQuota,
        contributors: Vec<Contributor>,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        validate_label(&name, "name").map_err(|e| SchemaError::new("name", e))?;
        validate_identity(&owner.name, "owner.name")
            .map_err(|e| SchemaError::new("owner.name", e))?;
        resources.validate().map_err(|e| e.within("resources"))?;

        let mut seen: BTreeMap<&str, Role> = BTreeMap::new();
        let mut unique = Vec::with_capacity(contributors.len());
        for (i, contributor) in contributors.iter().enumerate() {
            let path = format!("contributors[{}]", i);
            validate_identity(&contributor.name, "name")
                .map_err(|e| SchemaError::new(format!("{}.name", path), e))?;

            if contributor.name == owner.name {
                return Err(SchemaError::new(
                    format!("{}.name", path),
                    SchemaViolation::OwnerListedAsContributor(contributor.name.clone()),
                ));
            }

            match seen.entry(contributor.name.as_str()) {
                Entry::Vacant(slot) => {
                    slot.insert(contributor.role);
                    unique.push(contributor.clone());
                }
                Entry::Occupied(slot) if *slot.get() == contributor.role => {}
                Entry::Occupied(slot) => {
                    return Err(SchemaError::new(
                        format!("{}.role", path),
                        SchemaViolation::ConflictingRole {
                            name: contributor.name.clone(),
                            first: *slot.get(),
                            second: contributor.role,
                        },
                    ));
                }
            }
        }

        Ok(Self {
            name,
            owner,
            resources,
            contributors: unique,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn resources(&self) -> &ResourceQuota {
        &self.resources
    }

    /// Contributors in PMR order, duplicates collapsed.
    pub fn contributors(&self) -> &[Contributor] {
        &self.contributors
    }

    pub fn contributor(&self, name: &str) -> Option<&Contributor> {
        self.contributors.iter().find(|c| c.name == name)
    }

    pub fn has_contributor(&self, name: &str, role: Role) -> bool {
        self.contributor(name).map(|c| c.role == role).unwrap_or(false)
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
