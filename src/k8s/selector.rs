// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! Label selectors and the management marker.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::ObjectMeta;

pub const DEFAULT_MANAGED_BY_KEY: &str = "app.kubernetes.io/managed-by";
pub const DEFAULT_MANAGED_BY_VALUE: &str = "pmr-sync";

/// Equality-based label selector (`key=value,key2=value2`).
///
/// An empty selector matches every object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: BTreeMap<String, String>,
}

impl LabelSelector {
    pub fn equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::default().and(key, value)
    }

    pub fn and(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.requirements.insert(key.into(), value.into());
        self
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements
            .iter()
            .all(|(k, v)| labels.get(k) == Some(v))
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms: Vec<String> = self
            .requirements
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        f.write_str(&terms.join(","))
    }
}

/// Label identifying objects owned and reconciled by this engine.
///
/// Objects without it are never listed, diffed, updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManagementMarker {
    pub key: String,
    pub value: String,
}

impl Default for ManagementMarker {
    fn default() -> Self {
        Self {
            key: DEFAULT_MANAGED_BY_KEY.to_string(),
            value: DEFAULT_MANAGED_BY_VALUE.to_string(),
        }
    }
}

impl ManagementMarker {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn selector(&self) -> LabelSelector {
        LabelSelector::equals(self.key.clone(), self.value.clone())
    }

    pub fn is_marked(&self, meta: &ObjectMeta) -> bool {
        meta.labels.get(&self.key) == Some(&self.value)
    }

    pub fn stamp(&self, meta: &mut ObjectMeta) {
        meta.labels.insert(self.key.clone(), self.value.clone());
    }
}

impl fmt::Display for ManagementMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}
