// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! Tests for PMR value types.

use super::*;

fn owner() -> Owner {
    Owner::user("admin@example.com")
}

#[test]
fn test_role_ordering() {
    assert!(Role::Admin > Role::Edit);
    assert!(Role::Edit > Role::View);
    assert_eq!(Role::ALL.iter().max(), Some(&Role::Admin));
}

#[test]
fn test_role_parsing() {
    assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
    assert_eq!("edit".parse::<Role>(), Ok(Role::Edit));
    assert_eq!("view".parse::<Role>(), Ok(Role::View));
    assert_eq!(
        "owner".parse::<Role>(),
        Err(SchemaViolation::UnknownRole("owner".to_string()))
    );
    assert!("Admin".parse::<Role>().is_err());
}

#[test]
fn test_owner_kind_parsing() {
    assert_eq!("User".parse::<OwnerKind>(), Ok(OwnerKind::User));
    assert_eq!(
        "ServiceAccount".parse::<OwnerKind>(),
        Ok(OwnerKind::ServiceAccount)
    );
    assert!(matches!(
        "Group".parse::<OwnerKind>(),
        Err(SchemaViolation::UnknownOwnerKind(_))
    ));
}

#[test]
fn test_profile_valid() {
    let profile = Profile::new(
        "ml-engineers",
        owner(),
        ResourceQuota::from_hard([("limits.cpu", "1")]),
        vec![
            Contributor::new("kimonas@example.com", Role::Admin),
            Contributor::new("michal@example.com", Role::Edit),
        ],
    )
    .unwrap();

    assert_eq!(profile.name(), "ml-engineers");
    assert_eq!(profile.contributors().len(), 2);
    assert!(profile.has_contributor("kimonas@example.com", Role::Admin));
    assert!(!profile.has_contributor("kimonas@example.com", Role::Edit));
    assert!(!profile.has_contributor("nobody@example.com", Role::View));
    assert_eq!(profile.resources().hard.get("limits.cpu").unwrap(), "1");
}

#[test]
fn test_duplicate_contributor_same_role_collapses() {
    let profile = Profile::new(
        "team",
        owner(),
        ResourceQuota::default(),
        vec![
            Contributor::new("a@example.com", Role::View),
            Contributor::new("b@example.com", Role::Edit),
            Contributor::new("a@example.com", Role::View),
        ],
    )
    .unwrap();

    let names: Vec<&str> = profile.contributors().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["a@example.com", "b@example.com"]);
}

#[test]
fn test_duplicate_contributor_conflicting_role_rejected() {
    let err = Profile::new(
        "team",
        owner(),
        ResourceQuota::default(),
        vec![
            Contributor::new("a@example.com", Role::View),
            Contributor::new("a@example.com", Role::Admin),
        ],
    )
    .unwrap_err();

    assert_eq!(err.path, "contributors[1].role");
    assert_eq!(
        err.violation,
        SchemaViolation::ConflictingRole {
            name: "a@example.com".to_string(),
            first: Role::View,
            second: Role::Admin,
        }
    );
}

#[test]
fn test_owner_listed_as_contributor_rejected() {
    let err = Profile::new(
        "team",
        owner(),
        ResourceQuota::default(),
        vec![Contributor::new("admin@example.com", Role::Admin)],
    )
    .unwrap_err();

    assert_eq!(err.path, "contributors[0].name");
    assert!(matches!(
        err.violation,
        SchemaViolation::OwnerListedAsContributor(_)
    ));
}

#[test]
fn test_invalid_profile_name_rejected() {
    let err = Profile::new("Data_Scientists", owner(), ResourceQuota::default(), vec![])
        .unwrap_err();
    assert_eq!(err.path, "name");
}

#[test]
fn test_invalid_quota_key_rejected() {
    let err = Profile::new(
        "team",
        owner(),
        ResourceQuota::from_hard([("limits cpu", "1")]),
        vec![],
    )
    .unwrap_err();
    assert_eq!(err.path, "resources.hard.limits cpu");
}

#[test]
fn test_quota_scopes_without_hard_rejected() {
    let quota = ResourceQuota {
        scopes: vec!["BestEffort".to_string()],
        ..Default::default()
    };
    let err = Profile::new("team", owner(), quota, vec![]).unwrap_err();
    assert_eq!(err.path, "resources.hard");
    assert_eq!(err.violation, SchemaViolation::QuotaWithoutHard);
}

#[test]
fn test_empty_quota_is_valid() {
    let profile = Profile::new("team", owner(), ResourceQuota::default(), vec![]).unwrap();
    assert!(profile.resources().is_empty());
    assert!(profile.contributors().is_empty());
}

#[test]
fn test_quota_serialization_is_camel_case() {
    let quota = ResourceQuota {
        hard: [("limits.cpu".to_string(), "2".to_string())].into_iter().collect(),
        scopes: vec![],
        scope_selector: Some(ScopeSelector {
            match_expressions: vec![ScopeRequirement {
                operator: ScopeOperator::In,
                scope_name: "PriorityClass".to_string(),
                values: vec!["high".to_string()],
            }],
        }),
    };

    let json = serde_json::to_string(&quota).unwrap();
    assert!(json.contains("scopeSelector"));
    assert!(json.contains("matchExpressions"));
    assert!(json.contains("scopeName"));
    assert!(!json.contains("scopes"));
}
