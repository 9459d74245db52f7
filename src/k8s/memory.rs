// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! In-memory cluster.
//!
//! Implements [`ClusterClient`] over a map guarded by `tokio::sync::RwLock`.
//! Used for dry runs, the CLI `--state` file and tests. Supports latency
//! and per-object failure injection so partial-failure paths can be
//! exercised without an API server.
//!
//! Semantics follow the API server where the engine depends on them:
//! - `resourceVersion` is bumped only when content changes
//! - an update carrying a stale `resourceVersion` is rejected with 409
//! - namespaced objects can only be created in an existing workspace

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use super::client::{ClusterClient, ClusterError, ClusterResult};
use super::selector::LabelSelector;
use super::types::{ClusterObject, ObjectKey, ResourceKind};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to access state file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid state file {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Call counters, for asserting on cluster traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterStats {
    pub gets: u64,
    pub lists: u64,
    pub creates: u64,
    pub updates: u64,
    pub noop_updates: u64,
    pub deletes: u64,
}

#[derive(Default)]
struct Counters {
    gets: AtomicU64,
    lists: AtomicU64,
    creates: AtomicU64,
    updates: AtomicU64,
    noop_updates: AtomicU64,
    deletes: AtomicU64,
}

#[derive(Default)]
struct Faults {
    writes: HashMap<ObjectKey, ClusterError>,
    lists: HashMap<ResourceKind, ClusterError>,
}

pub struct MemoryCluster {
    objects: Arc<RwLock<BTreeMap<ObjectKey, ClusterObject>>>,
    next_version: AtomicU64,
    faults: Mutex<Faults>,
    latency: Mutex<Duration>,
    cascading_delete: bool,
    counters: Counters,
}

impl Default for MemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(RwLock::new(BTreeMap::new())),
            next_version: AtomicU64::new(1),
            faults: Mutex::new(Faults::default()),
            latency: Mutex::new(Duration::ZERO),
            cascading_delete: false,
            counters: Counters::default(),
        }
    }

    /// Deleting a workspace also removes every object in its namespace.
    pub fn with_cascading_delete(mut self) -> Self {
        self.cascading_delete = true;
        self
    }

    /// Build a cluster holding `objects`, keeping their resource versions.
    pub fn from_objects(objects: Vec<ClusterObject>) -> Self {
        let max_version = objects
            .iter()
            .filter_map(|o| o.metadata.resource_version.as_deref())
            .filter_map(|v| v.parse::<u64>().ok())
            .max()
            .unwrap_or(0);

        let cluster = Self::new();
        cluster.next_version.store(max_version + 1, Ordering::SeqCst);
        let map: BTreeMap<_, _> = objects
            .into_iter()
            .map(|mut o| {
                if o.metadata.resource_version.is_none() {
                    o.metadata.resource_version = Some(cluster.bump_version());
                }
                (o.key(), o)
            })
            .collect();
        Self {
            objects: Arc::new(RwLock::new(map)),
            ..cluster
        }
    }

    /// Load a JSON state file; a missing file yields an empty cluster.
    pub fn load_snapshot(path: &Path) -> Result<Self, SnapshotError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: display.clone(),
            source,
        })?;
        let objects: Vec<ClusterObject> =
            serde_json::from_str(&raw).map_err(|source| SnapshotError::Json {
                path: display,
                source,
            })?;
        Ok(Self::from_objects(objects))
    }

    pub async fn save_snapshot(&self, path: &Path) -> Result<(), SnapshotError> {
        let display = path.display().to_string();
        let objects = self.snapshot().await;
        let json = serde_json::to_string_pretty(&objects).map_err(|source| {
            SnapshotError::Json {
                path: display.clone(),
                source,
            }
        })?;
        std::fs::write(path, json).map_err(|source| SnapshotError::Io {
            path: display,
            source,
        })
    }

    /// All objects in key order.
    pub async fn snapshot(&self) -> Vec<ClusterObject> {
        self.objects.read().await.values().cloned().collect()
    }

    /// Store an object as-is, bypassing every check.
    pub async fn insert(&self, mut object: ClusterObject) {
        if object.metadata.resource_version.is_none() {
            object.metadata.resource_version = Some(self.bump_version());
        }
        self.objects.write().await.insert(object.key(), object);
    }

    pub async fn contains(&self, key: &ObjectKey) -> bool {
        self.objects.read().await.contains_key(key)
    }

    pub async fn object(&self, key: &ObjectKey) -> Option<ClusterObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Fail every create, update and delete of `key` with `error`.
    pub fn fail_writes_to(&self, key: ObjectKey, error: ClusterError) {
        self.faults.lock().writes.insert(key, error);
    }

    /// Fail every list of `kind` with `error`.
    pub fn fail_lists_of(&self, kind: ResourceKind, error: ClusterError) {
        self.faults.lock().lists.insert(kind, error);
    }

    pub fn clear_faults(&self) {
        *self.faults.lock() = Faults::default();
    }

    /// Delay applied before every call.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    pub fn stats(&self) -> ClusterStats {
        let c = &self.counters;
        ClusterStats {
            gets: c.gets.load(Ordering::Relaxed),
            lists: c.lists.load(Ordering::Relaxed),
            creates: c.creates.load(Ordering::Relaxed),
            updates: c.updates.load(Ordering::Relaxed),
            noop_updates: c.noop_updates.load(Ordering::Relaxed),
            deletes: c.deletes.load(Ordering::Relaxed),
        }
    }

    fn bump_version(&self) -> String {
        self.next_version.fetch_add(1, Ordering::SeqCst).to_string()
    }

    async fn delay(&self) {
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    fn write_fault(&self, key: &ObjectKey) -> ClusterResult<()> {
        match self.faults.lock().writes.get(key) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ClusterClient for MemoryCluster {
    async fn get(&self, key: &ObjectKey) -> ClusterResult<Option<ClusterObject>> {
        self.delay().await;
        self.counters.gets.fetch_add(1, Ordering::Relaxed);
        Ok(self.objects.read().await.get(key).cloned())
    }

    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        selector: &LabelSelector,
    ) -> ClusterResult<Vec<ClusterObject>> {
        self.delay().await;
        self.counters.lists.fetch_add(1, Ordering::Relaxed);
        let fault = self.faults.lock().lists.get(&kind).cloned();
        if let Some(err) = fault {
            return Err(err);
        }

        let objects = self.objects.read().await;
        Ok(objects
            .values()
            .filter(|o| o.kind() == kind)
            .filter(|o| namespace.map_or(true, |ns| o.namespace() == Some(ns)))
            .filter(|o| selector.matches(&o.metadata.labels))
            .cloned()
            .collect())
    }

    async fn create(&self, mut object: ClusterObject) -> ClusterResult<ClusterObject> {
        self.delay().await;
        let key = object.key();
        self.write_fault(&key)?;

        let mut objects = self.objects.write().await;
        if objects.contains_key(&key) {
            return Err(ClusterError::AlreadyExists(key));
        }
        if let Some(ns) = object.namespace() {
            if !objects.contains_key(&ObjectKey::workspace(ns)) {
                return Err(ClusterError::Api {
                    code: 404,
                    message: format!("namespace '{}' not found", ns),
                });
            }
        }

        object.metadata.resource_version = Some(self.bump_version());
        objects.insert(key, object.clone());
        self.counters.creates.fetch_add(1, Ordering::Relaxed);
        Ok(object)
    }

    async fn update(&self, mut object: ClusterObject) -> ClusterResult<ClusterObject> {
        self.delay().await;
        let key = object.key();
        self.write_fault(&key)?;

        let mut objects = self.objects.write().await;
        let current = objects
            .get(&key)
            .ok_or_else(|| ClusterError::NotFound(key.clone()))?;

        if let Some(expected) = object.metadata.resource_version.as_deref() {
            if current.metadata.resource_version.as_deref() != Some(expected) {
                return Err(ClusterError::Api {
                    code: 409,
                    message: format!("{} has been modified", key),
                });
            }
        }

        if current.same_content(&object) {
            self.counters.noop_updates.fetch_add(1, Ordering::Relaxed);
            return Ok(current.clone());
        }

        object.metadata.resource_version = Some(self.bump_version());
        objects.insert(key, object.clone());
        self.counters.updates.fetch_add(1, Ordering::Relaxed);
        Ok(object)
    }

    async fn delete(&self, key: &ObjectKey) -> ClusterResult<()> {
        self.delay().await;
        self.write_fault(key)?;

        let mut objects = self.objects.write().await;
        if objects.remove(key).is_none() {
            return Err(ClusterError::NotFound(key.clone()));
        }
        self.counters.deletes.fetch_add(1, Ordering::Relaxed);

        if self.cascading_delete && key.kind == ResourceKind::Workspace {
            objects.retain(|k, _| k.namespace.as_deref() != Some(key.name.as_str()));
        }
        Ok(())
    }

    fn supports_cascading_delete(&self) -> bool {
        self.cascading_delete
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
