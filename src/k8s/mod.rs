// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes integration.
//!
//! Typed objects for the Profile, RoleBinding and AuthorizationPolicy
//! kinds, the [`ClusterClient`] seam and an in-memory implementation.

pub mod client;
pub mod memory;
pub mod naming;
pub mod selector;
pub mod types;
pub mod validation;

pub use client::{with_timeout, ClusterClient, ClusterError, ClusterResult};
pub use memory::{ClusterStats, MemoryCluster, SnapshotError};
pub use selector::{LabelSelector, ManagementMarker};
pub use types::{ClusterObject, ObjectKey, ObjectMeta, ObjectSpec, ResourceKind};
