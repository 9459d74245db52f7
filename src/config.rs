// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration loading.
//!
//! Sources, lowest precedence first: built-in defaults, the TOML file named
//! by `PMR_SYNC_CONFIG`, then `PMR_SYNC_*` environment variables.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::k8s::selector::{ManagementMarker, DEFAULT_MANAGED_BY_KEY, DEFAULT_MANAGED_BY_VALUE};
use crate::k8s::validation::{validate_qualified_name, validate_relative_path, ValidationError};
use crate::reconcile::engine::{
    EngineConfig, DEFAULT_CLUSTER_TIMEOUT, DEFAULT_MAX_CONCURRENT_APPLIES,
};
use crate::reconcile::translator::{
    TrustPrincipals, DEFAULT_ISTIO_INGRESSGATEWAY_PRINCIPAL, DEFAULT_KFP_UI_PRINCIPAL,
};

/// Environment variable naming the TOML config file.
pub const CONFIG_PATH_ENV: &str = "PMR_SYNC_CONFIG";

const ENV_PREFIX: &str = "PMR_SYNC_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("{field}: {source}")]
    Invalid {
        field: &'static str,
        #[source]
        source: ValidationError,
    },

    #[error("{0}")]
    Constraint(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagementLabel {
    pub key: String,
    pub value: String,
}

impl Default for ManagementLabel {
    fn default() -> Self {
        Self {
            key: DEFAULT_MANAGED_BY_KEY.to_string(),
            value: DEFAULT_MANAGED_BY_VALUE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Local checkout maintained by the sync sidecar.
    pub repository_root: PathBuf,
    /// PMR document, relative to `repository_root`.
    pub pmr_path: String,
    /// Only consumed by the external trigger.
    pub sync_interval_secs: u64,
    /// Only consumed by the sync sidecar.
    pub git_revision: String,
    pub kfp_ui_principal: String,
    pub istio_ingressgateway_principal: String,
    pub cluster_timeout_ms: u64,
    pub max_concurrent_applies: usize,
    pub log_format: LogFormat,
    pub management_label: ManagementLabel,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            repository_root: PathBuf::from("."),
            pmr_path: "pmr.yaml".to_string(),
            sync_interval_secs: 60,
            git_revision: "HEAD".to_string(),
            kfp_ui_principal: DEFAULT_KFP_UI_PRINCIPAL.to_string(),
            istio_ingressgateway_principal: DEFAULT_ISTIO_INGRESSGATEWAY_PRINCIPAL.to_string(),
            cluster_timeout_ms: DEFAULT_CLUSTER_TIMEOUT.as_millis() as u64,
            max_concurrent_applies: default_apply_workers(),
            log_format: LogFormat::Pretty,
            management_label: ManagementLabel::default(),
        }
    }
}

/// One apply worker per core, capped at the engine default.
fn default_apply_workers() -> usize {
    num_cpus::get().clamp(1, DEFAULT_MAX_CONCURRENT_APPLIES)
}

fn parse_env<T: FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

impl SyncConfig {
    pub fn from_toml_str(raw: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw, &path.display().to_string())
    }

    /// Load from `explicit_path`, else `PMR_SYNC_CONFIG`, else defaults,
    /// then apply environment overrides and validate.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let mut config = match explicit_path.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `PMR_SYNC_*` overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            let key = format!("{}{}", ENV_PREFIX, name);
            lookup(&key).map(|value| (key, value))
        };

        if let Some((_, v)) = var("REPOSITORY_ROOT") {
            self.repository_root = PathBuf::from(v);
        }
        if let Some((_, v)) = var("PMR_PATH") {
            self.pmr_path = v;
        }
        if let Some((k, v)) = var("SYNC_INTERVAL_SECS") {
            self.sync_interval_secs = parse_env(&k, v)?;
        }
        if let Some((_, v)) = var("GIT_REVISION") {
            self.git_revision = v;
        }
        if let Some((_, v)) = var("KFP_UI_PRINCIPAL") {
            self.kfp_ui_principal = v;
        }
        if let Some((_, v)) = var("ISTIO_INGRESSGATEWAY_PRINCIPAL") {
            self.istio_ingressgateway_principal = v;
        }
        if let Some((k, v)) = var("CLUSTER_TIMEOUT_MS") {
            self.cluster_timeout_ms = parse_env(&k, v)?;
        }
        if let Some((k, v)) = var("MAX_CONCURRENT_APPLIES") {
            self.max_concurrent_applies = parse_env(&k, v)?;
        }
        if let Some((_, v)) = var("MANAGEMENT_LABEL_KEY") {
            self.management_label.key = v;
        }
        if let Some((_, v)) = var("MANAGEMENT_LABEL_VALUE") {
            self.management_label.value = v;
        }
        if let Some((k, v)) = var("LOG_FORMAT") {
            self.log_format = parse_env(&k, v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kfp_ui_principal.trim().is_empty() {
            return Err(ConfigError::Constraint(
                "kfp_ui_principal cannot be empty".to_string(),
            ));
        }
        if self.istio_ingressgateway_principal.trim().is_empty() {
            return Err(ConfigError::Constraint(
                "istio_ingressgateway_principal cannot be empty".to_string(),
            ));
        }
        if self.kfp_ui_principal == self.istio_ingressgateway_principal {
            return Err(ConfigError::Constraint(
                "trust principals must be distinct".to_string(),
            ));
        }
        if self.max_concurrent_applies == 0 {
            return Err(ConfigError::Constraint(
                "max_concurrent_applies must be at least 1".to_string(),
            ));
        }
        if self.cluster_timeout_ms == 0 {
            return Err(ConfigError::Constraint(
                "cluster_timeout_ms must be positive".to_string(),
            ));
        }
        validate_relative_path(&self.pmr_path, "pmr_path").map_err(|source| {
            ConfigError::Invalid {
                field: "pmr_path",
                source,
            }
        })?;
        validate_qualified_name(&self.management_label.key).map_err(|source| {
            ConfigError::Invalid {
                field: "management_label.key",
                source,
            }
        })?;
        if self.management_label.value.is_empty() {
            return Err(ConfigError::Constraint(
                "management_label.value cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Absolute location of the PMR document.
    pub fn pmr_file(&self) -> PathBuf {
        self.repository_root.join(&self.pmr_path)
    }

    pub fn cluster_timeout(&self) -> Duration {
        Duration::from_millis(self.cluster_timeout_ms)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            trust: TrustPrincipals::new(
                self.kfp_ui_principal.clone(),
                self.istio_ingressgateway_principal.clone(),
            ),
            marker: ManagementMarker::new(
                self.management_label.key.clone(),
                self.management_label.value.clone(),
            ),
            cluster_timeout: self.cluster_timeout(),
            max_concurrent_applies: self.max_concurrent_applies,
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Constraint(e.to_string()))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
