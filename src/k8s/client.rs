// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! Cluster access seam.
//!
//! The engine only talks to the cluster through [`ClusterClient`]. Any
//! backend (API server, in-memory store) implements it.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::selector::LabelSelector;
use super::types::{ClusterObject, ObjectKey, ResourceKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
    #[error("{0} not found")]
    NotFound(ObjectKey),

    #[error("{0} already exists")]
    AlreadyExists(ObjectKey),

    #[error("API error {code}: {message}")]
    Api { code: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl ClusterError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClusterError::NotFound(_))
    }
}

pub type ClusterResult<T> = Result<T, ClusterError>;

#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Fetch one object; `Ok(None)` when it does not exist.
    async fn get(&self, key: &ObjectKey) -> ClusterResult<Option<ClusterObject>>;

    /// List objects of `kind` matching `selector`, across all namespaces
    /// when `namespace` is `None`.
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        selector: &LabelSelector,
    ) -> ClusterResult<Vec<ClusterObject>>;

    async fn create(&self, object: ClusterObject) -> ClusterResult<ClusterObject>;

    /// Replace an existing object.
    async fn update(&self, object: ClusterObject) -> ClusterResult<ClusterObject>;

    async fn delete(&self, key: &ObjectKey) -> ClusterResult<()>;

    /// True when deleting a workspace also removes the objects in its namespace.
    fn supports_cascading_delete(&self) -> bool {
        false
    }
}

/// Bound a cluster call by `limit`.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> ClusterResult<T>
where
    F: Future<Output = ClusterResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ClusterError::Timeout(limit)),
    }
}
