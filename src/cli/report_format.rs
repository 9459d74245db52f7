// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! Human-readable rendering of command results.

use crate::reconcile::desired::DesiredState;
use crate::reconcile::report::{
    CycleReport, CycleStatus, DeleteReport, ObjectFailure, PruneReport, RevokeReport,
    StaleReport,
};
use crate::reconcile::state::ObservedAccess;

const RULE: &str = "====================================================";

pub fn format_cycle(report: &CycleReport) -> String {
    let icon = match report.status() {
        CycleStatus::Converged => "V",
        CycleStatus::ConvergedWithOrphans => "!",
        CycleStatus::PartialFailure | CycleStatus::Cancelled => "X",
    };
    let elapsed = (report.finished_at - report.started_at).num_milliseconds();

    let mut lines = vec![
        RULE.to_string(),
        format!("  Cycle {}", report.cycle_id),
        format!(
            "  Status: {} {:24} Took: {}",
            icon,
            report.status().as_str(),
            format_elapsed(elapsed)
        ),
        RULE.to_string(),
        format!(
            "  Desired: {} workspaces, {} grants, {} policies",
            report.desired.workspaces, report.desired.grants, report.desired.policies
        ),
        format!(
            "  Created: {}   Updated: {} ({} changed)   Failed: {}   Skipped: {}",
            report.created(),
            report.updated(),
            report.changed(),
            report.failed(),
            report.skipped.len()
        ),
    ];

    push_failures(&mut lines, &report.failures);
    if !report.skipped.is_empty() {
        lines.push(format!("\nSkipped ({})", report.skipped.len()));
        lines.extend(report.skipped.iter().map(|k| format!("  {}", k)));
    }
    push_workspaces(&mut lines, "Orphaned workspaces", &report.orphaned_workspaces);
    push_access(&mut lines, "Orphaned grants", &report.orphaned_grants);
    push_access(&mut lines, "Detached objects", &report.detached);
    lines.join("\n")
}

pub fn format_stale(report: &StaleReport) -> String {
    let mut lines = vec![format!(
        "Stale workspaces: {}",
        report.orphaned_workspaces.len()
    )];
    lines.extend(report.orphaned_workspaces.iter().map(|n| format!("  {}", n)));
    push_access(&mut lines, "Orphaned grants", &report.orphaned_grants);
    push_access(&mut lines, "Detached objects", &report.detached);
    lines.join("\n")
}

pub fn format_delete(report: &DeleteReport) -> String {
    let mut lines = vec![format!(
        "Deleted {} of {} requested workspaces ({} dependents)",
        report.deleted_workspaces.len(),
        report.requested.len(),
        report.deleted_dependents.len()
    )];
    lines.extend(report.deleted_workspaces.iter().map(|n| format!("  {}", n)));
    push_workspaces(&mut lines, "No longer stale", &report.no_longer_stale);
    push_failures(&mut lines, &report.failures);
    push_access(&mut lines, "Orphaned grants (kept)", &report.orphaned_grants);
    lines.join("\n")
}

pub fn format_revoke(report: &RevokeReport) -> String {
    let mut lines = vec![format!(
        "Revoked {} access objects in {} stale workspaces",
        report.revoked.len(),
        report.workspaces.len()
    )];
    lines.extend(report.revoked.iter().map(|k| format!("  {}", k)));
    if !report.detached.is_empty() {
        lines.push(format!("\nDetached objects removed ({})", report.detached.len()));
        lines.extend(report.detached.iter().map(|k| format!("  {}", k)));
    }
    push_failures(&mut lines, &report.failures);
    lines.join("\n")
}

pub fn format_prune(report: &PruneReport) -> String {
    let mut lines = vec![format!("Pruned {} orphaned grants", report.pruned.len())];
    lines.extend(report.pruned.iter().map(|k| format!("  {}", k)));
    push_failures(&mut lines, &report.failures);
    lines.join("\n")
}

pub fn format_plan(desired: &DesiredState) -> String {
    let summary = desired.summary();
    let mut lines = vec![format!(
        "Plan: {} workspaces, {} grants, {} policies (marker {})",
        summary.workspaces,
        summary.grants,
        summary.policies,
        desired.marker()
    )];
    for ws in desired.workspaces() {
        lines.push(format!("\n{}", ws.name));
        lines.push("  Contributor                    | Role  | Grant".to_string());
        lines.push("  -------------------------------+-------+------------------------".to_string());
        for access in &ws.access {
            lines.push(format!(
                "  {:30} | {:5} | {}",
                truncate(&access.contributor.name, 30),
                access.contributor.role.as_str(),
                access.grant.name
            ));
        }
    }
    lines.join("\n")
}

fn push_failures(lines: &mut Vec<String>, failures: &[ObjectFailure]) {
    if failures.is_empty() {
        return;
    }
    lines.push(format!("\nFailures ({})", failures.len()));
    lines.extend(
        failures
            .iter()
            .map(|f| format!("  E {} {}", f.key, f.error)),
    );
}

fn push_workspaces(lines: &mut Vec<String>, title: &str, names: &[String]) {
    if names.is_empty() {
        return;
    }
    lines.push(format!("\n{} ({})", title, names.len()));
    lines.extend(names.iter().map(|n| format!("  {}", n)));
}

fn push_access(lines: &mut Vec<String>, title: &str, access: &[ObservedAccess]) {
    if access.is_empty() {
        return;
    }
    lines.push(format!("\n{} ({})", title, access.len()));
    lines.extend(access.iter().map(format_access));
}

pub fn format_access(access: &ObservedAccess) -> String {
    match (&access.user, access.role) {
        (Some(user), Some(role)) => format!("  {} ({}, {})", access.key, user, role),
        _ => format!("  {} (unannotated)", access.key),
    }
}

pub fn format_elapsed(ms: i64) -> String {
    let ms = ms.max(0);
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{}m {}s", ms / 60_000, (ms % 60_000) / 1000)
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
