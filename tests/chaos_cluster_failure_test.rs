// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! Chaos & Resilience - Cluster Failures
//!
//! Per-object write failures, failed and slow reads, overlapping triggers,
//! foreign objects sharing names with managed ones, and trust principal
//! changes.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use pmr_sync::k8s::types::ObjectSpec;
use pmr_sync::k8s::{ClusterError, ManagementMarker, MemoryCluster, ObjectKey, ResourceKind};
use pmr_sync::pmr::{parse_pmr, Contributor, Owner, Pmr, Profile, ResourceQuota, Role};
use pmr_sync::reconcile::translator::{render_workspace, translate};
use pmr_sync::reconcile::{
    ClusterWriteError, CycleStatus, EngineConfig, Reconciler, SyncError, TrustPrincipals,
};

const TEAM: &str = r#"
profiles:
  - name: ml-engineers
    owner: { kind: User, name: admin@example.com }
    contributors:
      - { name: kimonas@example.com, role: admin }
      - { name: michal@example.com, role: edit }
"#;

fn team() -> Pmr {
    parse_pmr(TEAM).unwrap()
}

fn engine_with(config: EngineConfig) -> Reconciler<MemoryCluster> {
    Reconciler::new(Arc::new(MemoryCluster::new()), config)
}

fn engine() -> Reconciler<MemoryCluster> {
    engine_with(EngineConfig::default())
}

fn foreign_marker() -> ManagementMarker {
    ManagementMarker::new("app.kubernetes.io/managed-by", "someone-else")
}

fn michal_grant() -> ObjectKey {
    ObjectKey::namespaced(
        ResourceKind::AccessGrant,
        "ml-engineers",
        "michal-example-com-edit",
    )
}

// ============================================================================
// Write Failures
// ============================================================================

#[tokio::test]
async fn chaos_single_write_failure_is_contained() {
    let engine = engine();
    engine.client().fail_writes_to(
        michal_grant(),
        ClusterError::Api {
            code: 500,
            message: "etcd unavailable".into(),
        },
    );

    let report = engine
        .reconcile(&team(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.status(), CycleStatus::PartialFailure);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.failures[0].key, michal_grant());
    assert_eq!(report.created(), 4, "every other object is still applied");

    engine.client().clear_faults();
    let retry = engine
        .reconcile(&team(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(retry.status(), CycleStatus::Converged);
    assert_eq!(retry.created(), 1);
}

#[tokio::test]
async fn chaos_workspace_failure_fails_its_access_too() {
    let engine = engine();
    engine.client().fail_writes_to(
        ObjectKey::workspace("ml-engineers"),
        ClusterError::Transport("connection reset".into()),
    );

    let report = engine
        .reconcile(&team(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.status(), CycleStatus::PartialFailure);
    // Without the namespace, grants and policies are rejected by the cluster.
    assert_eq!(report.failed(), 5);
    assert!(engine.client().is_empty().await);
}

// ============================================================================
// Read Failures
// ============================================================================

#[tokio::test]
async fn chaos_list_failure_aborts_before_mutation() {
    let engine = engine();
    engine.client().fail_lists_of(
        ResourceKind::NetworkPolicy,
        ClusterError::Api {
            code: 403,
            message: "forbidden".into(),
        },
    );

    let err = engine
        .reconcile(&team(), &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        SyncError::ClusterRead(read) => assert_eq!(read.kind, ResourceKind::NetworkPolicy),
        other => panic!("unexpected error {:?}", other),
    }
    let stats = engine.client().stats();
    assert_eq!(stats.creates + stats.updates + stats.deletes, 0);
}

#[tokio::test]
async fn chaos_slow_cluster_times_out() {
    let engine = engine_with(EngineConfig {
        cluster_timeout: Duration::from_millis(20),
        ..EngineConfig::default()
    });
    engine.client().set_latency(Duration::from_millis(200));

    let err = engine
        .reconcile(&team(), &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        SyncError::ClusterRead(read) => {
            assert_eq!(read.source, ClusterError::Timeout(Duration::from_millis(20)));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

// ============================================================================
// Overlapping Triggers
// ============================================================================

#[tokio::test]
async fn chaos_overlapping_triggers_run_once() {
    let engine = Arc::new(engine());
    engine.client().set_latency(Duration::from_millis(30));
    let cancel = CancellationToken::new();

    let first = {
        let engine = engine.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { engine.reconcile(&team(), &cancel).await.map(|r| r.status()) })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    let second = engine.reconcile(&team(), &cancel).await;
    assert!(matches!(second, Err(SyncError::Busy)));
    assert!(matches!(
        engine.list_stale(&team()).await,
        Ok(_)
    ), "read-only listing is not guarded");

    assert_eq!(first.await.unwrap().unwrap(), CycleStatus::Converged);
    assert_eq!(engine.skipped_cycles(), 1);
}

// ============================================================================
// Isolation
// ============================================================================

#[tokio::test]
async fn chaos_foreign_object_with_managed_name_is_untouched() {
    let engine = engine();
    let profile = team().get("ml-engineers").unwrap().clone();
    let (grant, _) = translate(
        "ml-engineers",
        &Contributor::new("michal@example.com", Role::Edit),
        &TrustPrincipals::default(),
    );
    let foreign = grant.to_object(&foreign_marker());
    engine.client().insert(render_workspace(&profile, &foreign_marker())).await;
    engine.client().insert(foreign).await;
    let before = engine.client().object(&michal_grant()).await.unwrap();

    let report = engine
        .reconcile(&team(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.status(), CycleStatus::PartialFailure);
    let unmanaged: Vec<_> = report
        .failures
        .iter()
        .filter(|f| matches!(f.error, ClusterWriteError::Unmanaged(_)))
        .map(|f| f.key.clone())
        .collect();
    assert_eq!(
        unmanaged,
        vec![ObjectKey::workspace("ml-engineers"), michal_grant()]
    );
    assert_eq!(engine.client().object(&michal_grant()).await.unwrap(), before);
}

#[tokio::test]
async fn chaos_foreign_workspace_is_never_stale() {
    let engine = engine();
    let other = Profile::new(
        "other-team",
        Owner::user("someone@example.com"),
        ResourceQuota::default(),
        vec![],
    )
    .unwrap();
    engine.client().insert(render_workspace(&other, &foreign_marker())).await;

    let report = engine
        .reconcile(&team(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(report.orphaned_workspaces.is_empty());

    let stale = engine.list_stale(&team()).await.unwrap();
    assert!(stale.orphaned_workspaces.is_empty());
    let err = engine
        .delete_stale(&team(), &["other-team".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::OrphanConfirmationRequired(_)));
    assert!(engine
        .client()
        .contains(&ObjectKey::workspace("other-team"))
        .await);
}

// ============================================================================
// Trust Principals
// ============================================================================

#[tokio::test]
async fn chaos_principal_change_only_touches_policies() {
    let engine = engine();
    let cancel = CancellationToken::new();
    engine.reconcile(&team(), &cancel).await.unwrap();
    let before = engine.client().snapshot().await;

    let moved = Reconciler::new(
        engine.client().clone(),
        EngineConfig {
            trust: TrustPrincipals::new(
                "cluster.local/ns/pipelines/sa/ml-pipeline-ui",
                "cluster.local/ns/gateways/sa/ingress",
            ),
            ..EngineConfig::default()
        },
    );
    let report = moved.reconcile(&team(), &cancel).await.unwrap();
    assert_eq!(report.created(), 0);
    assert_eq!(report.changed(), 2);

    let after = moved.client().snapshot().await;
    let keys = |objs: &[pmr_sync::k8s::ClusterObject]| {
        objs.iter().map(|o| o.key()).collect::<Vec<_>>()
    };
    assert_eq!(keys(&before), keys(&after));

    for object in &after {
        if let ObjectSpec::NetworkPolicy(spec) = &object.spec {
            let principals = spec.principals().unwrap();
            assert!(principals.contains(&"cluster.local/ns/gateways/sa/ingress".to_string()));
        }
    }
}
