// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end reconciliation scenarios against the in-memory cluster.
//!
//! A team profile is created, re-applied unchanged, then loses a
//! contributor; the removed grant must be reported and left in place.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use pmr_sync::k8s::naming::contributor_object_name;
use pmr_sync::k8s::types::ObjectSpec;
use pmr_sync::k8s::{MemoryCluster, ObjectKey, ResourceKind};
use pmr_sync::pmr::{parse_pmr, Role};
use pmr_sync::reconcile::{CycleStatus, EngineConfig, Reconciler};

const TEAM: &str = r#"
profiles:
  - name: ml-engineers
    owner:
      kind: User
      name: admin@example.com
    resources:
      hard:
        limits.cpu: "1"
    contributors:
      - name: kimonas@example.com
        role: admin
      - name: michal@example.com
        role: edit
"#;

const TEAM_WITHOUT_MICHAL: &str = r#"
profiles:
  - name: ml-engineers
    owner:
      kind: User
      name: admin@example.com
    resources:
      hard:
        limits.cpu: "1"
    contributors:
      - name: kimonas@example.com
        role: admin
"#;

fn engine() -> Reconciler<MemoryCluster> {
    Reconciler::new(Arc::new(MemoryCluster::new()), EngineConfig::default())
}

fn grant(name: &str) -> ObjectKey {
    ObjectKey::namespaced(ResourceKind::AccessGrant, "ml-engineers", name)
}

fn policy(name: &str) -> ObjectKey {
    ObjectKey::namespaced(ResourceKind::NetworkPolicy, "ml-engineers", name)
}

// ============================================================================
// First apply, re-apply, contributor removal
// ============================================================================

#[tokio::test]
async fn scenario_first_cycle_creates_everything() {
    let engine = engine();
    let report = engine
        .reconcile(&parse_pmr(TEAM).unwrap(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.status(), CycleStatus::Converged);
    assert_eq!(report.created_of(ResourceKind::Workspace), 1);
    assert_eq!(report.created_of(ResourceKind::AccessGrant), 2);
    assert_eq!(report.created_of(ResourceKind::NetworkPolicy), 2);
    assert_eq!(report.updated(), 0);
    assert!(report.failures.is_empty());

    let cluster = engine.client();
    let ws = cluster
        .object(&ObjectKey::workspace("ml-engineers"))
        .await
        .unwrap();
    let ObjectSpec::Workspace(spec) = &ws.spec else {
        panic!("workspace spec expected");
    };
    assert_eq!(spec.owner.name, "admin@example.com");
    assert_eq!(
        spec.resource_quota_spec.hard.get("limits.cpu").map(String::as_str),
        Some("1")
    );

    let michal = contributor_object_name("michal@example.com", Role::Edit);
    assert_eq!(michal, "michal-example-com-edit");
    assert!(cluster.contains(&grant(&michal)).await);
    assert!(cluster.contains(&policy(&michal)).await);
}

#[tokio::test]
async fn scenario_second_cycle_changes_nothing() {
    let engine = engine();
    let pmr = parse_pmr(TEAM).unwrap();
    let cancel = CancellationToken::new();
    engine.reconcile(&pmr, &cancel).await.unwrap();
    let before = engine.client().snapshot().await;

    let report = engine.reconcile(&pmr, &cancel).await.unwrap();
    assert_eq!(report.created(), 0);
    assert_eq!(report.updated(), 5);
    assert_eq!(report.changed(), 0);
    assert_eq!(engine.client().snapshot().await, before);
}

#[tokio::test]
async fn scenario_removed_contributor_is_reported_not_deleted() {
    let engine = engine();
    let cancel = CancellationToken::new();
    engine
        .reconcile(&parse_pmr(TEAM).unwrap(), &cancel)
        .await
        .unwrap();

    let pmr = parse_pmr(TEAM_WITHOUT_MICHAL).unwrap();
    let report = engine.reconcile(&pmr, &cancel).await.unwrap();

    assert_eq!(report.status(), CycleStatus::ConvergedWithOrphans);
    assert_eq!(report.created(), 0);
    assert_eq!(report.updated(), 3);
    assert_eq!(report.orphaned_grants.len(), 2);
    assert!(report.orphaned_workspaces.is_empty());
    for orphan in &report.orphaned_grants {
        assert_eq!(orphan.user.as_deref(), Some("michal@example.com"));
        assert_eq!(orphan.role, Some(Role::Edit));
    }

    let michal = contributor_object_name("michal@example.com", Role::Edit);
    assert!(engine.client().contains(&grant(&michal)).await);
    assert!(engine.client().contains(&policy(&michal)).await);

    // The workspace is not stale, so an explicit deletion removes nothing.
    let stale = engine.list_stale(&pmr).await.unwrap();
    assert!(stale.orphaned_workspaces.is_empty());
    assert_eq!(stale.orphaned_grants.len(), 2);
    let deleted = engine.delete_stale(&pmr, &[]).await.unwrap();
    assert!(deleted.deleted_workspaces.is_empty());
    assert_eq!(engine.client().len().await, 5);
}

#[tokio::test]
async fn scenario_role_change_renames_access() {
    let engine = engine();
    let cancel = CancellationToken::new();
    engine
        .reconcile(&parse_pmr(TEAM).unwrap(), &cancel)
        .await
        .unwrap();

    let promoted = TEAM.replace("role: edit", "role: view");
    let report = engine
        .reconcile(&parse_pmr(&promoted).unwrap(), &cancel)
        .await
        .unwrap();

    let view = contributor_object_name("michal@example.com", Role::View);
    assert_eq!(report.created_of(ResourceKind::AccessGrant), 1);
    assert!(engine.client().contains(&grant(&view)).await);
    assert_eq!(report.orphaned_grants.len(), 2);
}

#[tokio::test]
async fn scenario_names_are_deterministic_across_engines() {
    let pmr = parse_pmr(TEAM).unwrap();
    let first = engine().plan(&pmr).unwrap().objects();
    let second = engine().plan(&pmr).unwrap().objects();
    assert_eq!(first, second);
}

#[tokio::test]
async fn scenario_pmr_display_lists_contributors() {
    let text = parse_pmr(TEAM).unwrap().to_string();
    assert!(text.contains("ml-engineers"));
    assert!(text.contains("(kimonas@example.com, admin)"));
    assert!(text.contains("(michal@example.com, edit)"));
}
