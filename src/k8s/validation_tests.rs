// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! Tests for Kubernetes name validation.

use super::*;

#[test]
fn test_valid_labels() {
    assert!(validate_label("ml-engineers", "name").is_ok());
    assert!(validate_label("a", "name").is_ok());
    assert!(validate_label("team-42", "name").is_ok());
}

#[test]
fn test_invalid_labels() {
    assert!(matches!(
        validate_label("", "name"),
        Err(ValidationError::EmptyField(_))
    ));
    assert!(matches!(
        validate_label("ML-Engineers", "name"),
        Err(ValidationError::InvalidLabel(_))
    ));
    assert!(matches!(
        validate_label("-leading", "name"),
        Err(ValidationError::InvalidLabel(_))
    ));
    assert!(matches!(
        validate_label("trailing-", "name"),
        Err(ValidationError::InvalidLabel(_))
    ));
    assert!(matches!(
        validate_label("has.dot", "name"),
        Err(ValidationError::InvalidLabel(_))
    ));
}

#[test]
fn test_label_length_limit() {
    let long = "a".repeat(64);
    assert_eq!(
        validate_label(&long, "name"),
        Err(ValidationError::MaxLengthExceeded {
            field: "name".to_string(),
            max: 63,
        })
    );
    assert!(validate_label(&"a".repeat(63), "name").is_ok());
}

#[test]
fn test_quota_keys() {
    assert!(validate_qualified_name("limits.cpu").is_ok());
    assert!(validate_qualified_name("requests.memory").is_ok());
    assert!(validate_qualified_name("requests.nvidia.com/gpu").is_ok());
    assert!(validate_qualified_name("count/deployments.apps").is_ok());
    assert!(validate_qualified_name("pods").is_ok());
}

#[test]
fn test_invalid_quota_keys() {
    assert!(validate_qualified_name("").is_err());
    assert!(validate_qualified_name("limits cpu").is_err());
    assert!(validate_qualified_name(".cpu").is_err());
    assert!(validate_qualified_name("/gpu").is_err());
    assert!(validate_qualified_name("Bad_Prefix/gpu").is_err());
    assert!(validate_qualified_name("requests.nvidia.com/").is_err());
}

#[test]
fn test_identity_validation() {
    assert!(validate_identity("kimonas@example.com", "owner.name").is_ok());
    assert!(validate_identity(
        "system:serviceaccount:kubeflow:pipeline-runner",
        "owner.name"
    )
    .is_ok());
    assert!(matches!(
        validate_identity("   ", "owner.name"),
        Err(ValidationError::EmptyField(_))
    ));
    assert!(matches!(
        validate_identity("evil\nheader", "owner.name"),
        Err(ValidationError::ControlCharacters(_))
    ));
    assert!(validate_identity(&"x".repeat(MAX_FIELD_LENGTH + 1), "owner.name").is_err());
}

#[test]
fn test_relative_path_validation() {
    assert!(validate_relative_path("pmr.yaml", "pmr_path").is_ok());
    assert!(validate_relative_path("profiles/pmr.yaml", "pmr_path").is_ok());
    assert!(matches!(
        validate_relative_path("../outside.yaml", "pmr_path"),
        Err(ValidationError::PathTraversal(_))
    ));
    assert!(matches!(
        validate_relative_path("/etc/passwd", "pmr_path"),
        Err(ValidationError::InvalidPath(_))
    ));
    assert!(matches!(
        validate_relative_path("", "pmr_path"),
        Err(ValidationError::EmptyField(_))
    ));
}
