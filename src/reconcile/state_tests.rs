// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! Tests for reading observed state.

use super::*;
use crate::k8s::memory::MemoryCluster;
use crate::k8s::selector::ManagementMarker;
use crate::pmr::{Contributor, Owner, Profile};
use crate::reconcile::translator::{render_workspace, translate, TrustPrincipals};

const TIMEOUT: Duration = Duration::from_secs(1);

fn profile(name: &str) -> Profile {
    Profile::new(
        name,
        Owner::user("admin@example.com"),
        ResourceQuota::from_hard([("limits.cpu", "1")]),
        vec![],
    )
    .unwrap()
}

async fn seed_access(cluster: &MemoryCluster, ns: &str, user: &str, role: Role) {
    let marker = ManagementMarker::default();
    let (grant, policy) = translate(ns, &Contributor::new(user, role), &TrustPrincipals::default());
    cluster.insert(grant.to_object(&marker)).await;
    cluster.insert(policy.to_object(&marker)).await;
}

#[tokio::test]
async fn test_empty_cluster() {
    let cluster = MemoryCluster::new();
    let state = read_cluster_state(&cluster, &ManagementMarker::default().selector(), TIMEOUT)
        .await
        .unwrap();
    assert!(state.workspaces.is_empty());
    assert!(state.detached.is_empty());
}

#[tokio::test]
async fn test_groups_access_by_workspace() {
    let marker = ManagementMarker::default();
    let cluster = MemoryCluster::new();
    cluster.insert(render_workspace(&profile("team"), &marker)).await;
    cluster.insert(render_workspace(&profile("idle"), &marker)).await;
    seed_access(&cluster, "team", "michal@example.com", Role::Edit).await;

    let state = read_cluster_state(&cluster, &marker.selector(), TIMEOUT)
        .await
        .unwrap();

    let team = state.workspace("team").unwrap();
    assert_eq!(team.owner.name, "admin@example.com");
    assert_eq!(team.quota.hard.get("limits.cpu").map(String::as_str), Some("1"));
    assert_eq!(team.access.len(), 2);
    let access = team.access.values().next().unwrap();
    assert_eq!(access.user.as_deref(), Some("michal@example.com"));
    assert_eq!(access.role, Some(Role::Edit));

    assert!(state.workspace("idle").unwrap().access.is_empty());
    assert_eq!(state.access_count(), 2);
}

#[tokio::test]
async fn test_detached_access_is_excluded() {
    let cluster = MemoryCluster::new();
    seed_access(&cluster, "gone", "michal@example.com", Role::View).await;

    let state = read_cluster_state(&cluster, &ManagementMarker::default().selector(), TIMEOUT)
        .await
        .unwrap();
    assert!(state.workspaces.is_empty());
    assert_eq!(state.detached.len(), 2);
}

#[tokio::test]
async fn test_unmarked_objects_never_observed() {
    let marker = ManagementMarker::default();
    let cluster = MemoryCluster::new();

    let mut foreign = render_workspace(&profile("foreign"), &marker);
    foreign.metadata.labels.clear();
    cluster.insert(foreign).await;

    let (grant, _) = translate(
        "foreign",
        &Contributor::new("x@example.com", Role::Admin),
        &TrustPrincipals::default(),
    );
    cluster.insert(grant.to_object(&ManagementMarker::new("owner", "someone-else"))).await;

    let state = read_cluster_state(&cluster, &marker.selector(), TIMEOUT)
        .await
        .unwrap();
    assert!(state.workspaces.is_empty());
    assert!(state.detached.is_empty());
}

#[tokio::test]
async fn test_owner_resources_skipped() {
    let marker = ManagementMarker::default();
    let cluster = MemoryCluster::new();
    cluster.insert(render_workspace(&profile("team"), &marker)).await;

    let (grant, _) = translate(
        "team",
        &Contributor::new("admin@example.com", Role::Admin),
        &TrustPrincipals::default(),
    );
    let mut owner_binding = grant.to_object(&marker);
    owner_binding.metadata.name = "namespaceAdmin".to_string();
    cluster.insert(owner_binding).await;

    let state = read_cluster_state(&cluster, &marker.selector(), TIMEOUT)
        .await
        .unwrap();
    assert!(state.workspace("team").unwrap().access.is_empty());
}

#[tokio::test]
async fn test_list_failure_aborts() {
    let cluster = MemoryCluster::new();
    cluster.fail_lists_of(
        ResourceKind::NetworkPolicy,
        ClusterError::Transport("connection reset".into()),
    );

    let err = read_cluster_state(&cluster, &ManagementMarker::default().selector(), TIMEOUT)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ResourceKind::NetworkPolicy);
}

#[tokio::test]
async fn test_slow_list_times_out() {
    let cluster = MemoryCluster::new();
    cluster.set_latency(Duration::from_millis(200));

    let err = read_cluster_state(
        &cluster,
        &ManagementMarker::default().selector(),
        Duration::from_millis(10),
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind, ResourceKind::Workspace);
    assert!(matches!(err.source, ClusterError::Timeout(_)));
}
