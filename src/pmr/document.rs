// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! On-disk PMR document and its conversion into a validated PMR.
//!
//! The document mirrors the YAML layout checked into the repository:
//!
//! ```yaml
//! profiles:
//!   - name: ml-engineers
//!     owner: { kind: User, name: admin@example.com }
//!     resources:
//!       hard:
//!         limits.cpu: "1"
//!     contributors:
//!       - { name: kimonas@example.com, role: admin }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::error::{SchemaError, SchemaViolation};
use super::representation::Pmr;
use super::types::{Contributor, Owner, Profile, ResourceQuota, ScopeSelector};

#[derive(Debug, Error)]
pub enum PmrLoadError {
    #[error("failed to read PMR {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PmrDocument {
    pub profiles: Vec<ProfileDocument>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileDocument {
    pub name: String,
    pub owner: OwnerDocument,
    #[serde(default)]
    pub resources: Option<QuotaDocument>,
    pub contributors: Vec<ContributorDocument>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OwnerDocument {
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContributorDocument {
    pub name: String,
    pub role: String,
}

/// Quota as written by hand: limits may be YAML numbers or strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct QuotaDocument {
    #[serde(default)]
    pub hard: Option<BTreeMap<String, serde_yaml::Value>>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub scope_selector: Option<ScopeSelector>,
}

impl PmrDocument {
    /// Parse a YAML document. Structural problems become a `SchemaError`
    /// at the document root.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SchemaError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| SchemaError::new("", SchemaViolation::Malformed(e.to_string())))
    }

    /// Validate every profile and build the PMR.
    pub fn into_pmr(self) -> Result<Pmr, SchemaError> {
        let mut pmr = Pmr::new();
        for (i, doc) in self.profiles.into_iter().enumerate() {
            let prefix = format!("profiles[{}]", i);
            let profile = doc.into_profile().map_err(|e| e.within(&prefix))?;
            pmr.add_profile(profile).map_err(|e| e.within(&prefix))?;
        }
        Ok(pmr)
    }
}

impl ProfileDocument {
    fn into_profile(self) -> Result<Profile, SchemaError> {
        let kind = self
            .owner
            .kind
            .parse()
            .map_err(|v| SchemaError::new("owner.kind", v))?;
        let owner = Owner {
            name: self.owner.name,
            kind,
        };

        let resources = match self.resources {
            Some(doc) => doc.into_quota().map_err(|e| e.within("resources"))?,
            None => ResourceQuota::default(),
        };

        let mut contributors = Vec::with_capacity(self.contributors.len());
        for (i, c) in self.contributors.into_iter().enumerate() {
            let role = c
                .role
                .parse()
                .map_err(|v| SchemaError::new(format!("contributors[{}].role", i), v))?;
            contributors.push(Contributor::new(c.name, role));
        }

        Profile::new(self.name, owner, resources, contributors)
    }
}

impl QuotaDocument {
    fn into_quota(self) -> Result<ResourceQuota, SchemaError> {
        let mut hard = BTreeMap::new();
        for (key, value) in self.hard.unwrap_or_default() {
            let limit = match value {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                _ => {
                    return Err(SchemaError::new(
                        format!("hard.{}", key),
                        SchemaViolation::NonScalarLimit,
                    ))
                }
            };
            hard.insert(key, limit);
        }

        Ok(ResourceQuota {
            hard,
            scopes: self.scopes,
            scope_selector: self.scope_selector,
        })
    }
}

/// Parse and validate a PMR from YAML text.
pub fn parse_pmr(yaml: &str) -> Result<Pmr, SchemaError> {
    PmrDocument::from_yaml_str(yaml)?.into_pmr()
}

/// Read, parse and validate a PMR file.
pub fn load_pmr(path: &Path) -> Result<Pmr, PmrLoadError> {
    let contents = std::fs::read_to_string(path).map_err(|source| PmrLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let pmr = parse_pmr(&contents)?;
    tracing::info!(path = %path.display(), profiles = pmr.len(), "Loaded PMR");
    Ok(pmr)
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
