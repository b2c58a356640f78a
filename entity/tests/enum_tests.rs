/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Tests for entity enums

use entity::build::BuildStatus;
use std::str::FromStr;

#[test]
fn test_build_status_from_str() {
    assert_eq!(BuildStatus::from_str("Pending").unwrap(), BuildStatus::Pending);
    assert_eq!(BuildStatus::from_str("Running").unwrap(), BuildStatus::Running);
    assert_eq!(BuildStatus::from_str("Failed").unwrap(), BuildStatus::Failed);

    assert!(BuildStatus::from_str("running").is_err());
    assert!(BuildStatus::from_str("Queued").is_err());
}

#[test]
fn test_build_status_display_round_trip() {
    for status in [
        BuildStatus::Pending,
        BuildStatus::Cloning,
        BuildStatus::Building,
        BuildStatus::Publishing,
        BuildStatus::Deploying,
        BuildStatus::Running,
        BuildStatus::Failed,
    ] {
        assert_eq!(BuildStatus::from_str(&status.to_string()).unwrap(), status);
    }
}

#[test]
fn test_build_status_forward_transitions() {
    assert!(BuildStatus::Pending.can_transition_to(BuildStatus::Cloning));
    assert!(BuildStatus::Cloning.can_transition_to(BuildStatus::Building));
    assert!(BuildStatus::Building.can_transition_to(BuildStatus::Publishing));
    assert!(BuildStatus::Publishing.can_transition_to(BuildStatus::Deploying));
    assert!(BuildStatus::Deploying.can_transition_to(BuildStatus::Running));

    assert!(!BuildStatus::Pending.can_transition_to(BuildStatus::Building));
    assert!(!BuildStatus::Building.can_transition_to(BuildStatus::Cloning));
    assert!(!BuildStatus::Pending.can_transition_to(BuildStatus::Pending));
}

#[test]
fn test_build_status_failure_transitions() {
    assert!(BuildStatus::Pending.can_transition_to(BuildStatus::Failed));
    assert!(BuildStatus::Deploying.can_transition_to(BuildStatus::Failed));

    assert!(!BuildStatus::Running.can_transition_to(BuildStatus::Failed));
    assert!(!BuildStatus::Failed.can_transition_to(BuildStatus::Failed));
    assert!(!BuildStatus::Failed.can_transition_to(BuildStatus::Pending));
}

#[test]
fn test_build_status_rank_order() {
    assert!(BuildStatus::Pending.rank() < BuildStatus::Cloning.rank());
    assert!(BuildStatus::Deploying.rank() < BuildStatus::Running.rank());
    assert_eq!(BuildStatus::Failed.rank(), None);
    assert!(BuildStatus::Running.is_terminal());
    assert!(BuildStatus::Failed.is_terminal());
    assert!(!BuildStatus::Publishing.is_terminal());
}
