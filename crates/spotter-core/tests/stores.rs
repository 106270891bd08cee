// crates/spotter-core/tests/stores.rs
// ============================================================================
// Module: Result and Progress Store Tests
// Description: Blackboard, progress tracker, and traversal policy behavior.
// Dependencies: spotter-core
// ============================================================================
//! ## Overview
//! Covers overwrite semantics of the blackboard, terminal progress statuses,
//! and the traversal policy decision table.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;
use std::thread;

use spotter_core::DiagnosisProgress;
use spotter_core::DiagnosisStatus;
use spotter_core::NodeVerdict;
use spotter_core::ProblemId;
use spotter_core::ProblemNode;
use spotter_core::ProgressTracker;
use spotter_core::ResultBlackboard;
use spotter_core::SpotterResult;
use spotter_core::TraversalPolicy;
use spotter_core::runtime::BlackboardError;

// ============================================================================
// SECTION: Blackboard
// ============================================================================

/// Tests that results are kept in insertion order with their summaries.
#[test]
fn blackboard_keeps_investigation_order() {
    let blackboard = ResultBlackboard::new();
    for (id, detected) in [("c", true), ("a", false), ("b", true)] {
        blackboard.put_result(&ProblemNode::new(id, id.to_uppercase()).summary(), SpotterResult::new(detected));
    }

    assert_eq!(blackboard.len(), 3);
    assert_eq!(blackboard.results().len(), 3);
    let order: Vec<String> =
        blackboard.investigated().iter().map(|summary| summary.unique_id.to_string()).collect();
    assert_eq!(order, vec!["c", "a", "b"]);
    assert!(blackboard.has_been_detected(&ProblemId::new("c")).unwrap());
    assert!(!blackboard.has_been_detected(&ProblemId::new("a")).unwrap());
}

/// Tests that storing twice replaces the result without a second entry.
#[test]
fn blackboard_overwrites_in_place() {
    let blackboard = ResultBlackboard::new();
    let summary = ProblemNode::new("p", "P").summary();
    blackboard.put_result(&summary, SpotterResult::new(false));
    blackboard.put_result(&summary, SpotterResult::new(true));

    assert_eq!(blackboard.len(), 1);
    assert_eq!(blackboard.investigated().len(), 1);
    assert!(blackboard.result(&summary.unique_id).unwrap().is_detected());
}

/// Tests that unknown problems are an error, not a silent false.
#[test]
fn blackboard_rejects_unknown_problem() {
    let blackboard = ResultBlackboard::new();
    let err = blackboard.has_been_detected(&ProblemId::new("missing")).unwrap_err();
    assert_eq!(err, BlackboardError::UnknownProblem(ProblemId::new("missing")));
    assert!(!blackboard.contains(&ProblemId::new("missing")));
}

#[test]
fn blackboard_reset_clears_everything() {
    let blackboard = ResultBlackboard::new();
    blackboard.put_result(&ProblemNode::new("p", "P").summary(), SpotterResult::new(true));
    blackboard.reset();
    assert!(blackboard.is_empty());
    assert!(blackboard.entries().is_empty());
}

/// Tests concurrent writers against one blackboard.
#[test]
fn blackboard_accepts_concurrent_writers() {
    let blackboard = Arc::new(ResultBlackboard::new());
    thread::scope(|scope| {
        for worker in 0 .. 4 {
            let blackboard = Arc::clone(&blackboard);
            scope.spawn(move || {
                for i in 0 .. 25 {
                    let id = format!("w{worker}-{i}");
                    blackboard.put_result(&ProblemNode::new(id.as_str(), id.as_str()).summary(), SpotterResult::new(i % 2 == 0));
                }
            });
        }
    });
    assert_eq!(blackboard.len(), 100);
}

// ============================================================================
// SECTION: Progress
// ============================================================================

/// Tests that terminal statuses are final.
#[test]
fn terminal_status_ignores_later_updates() {
    let progress = ProgressTracker::new();
    let id = ProblemId::new("p");
    progress.set_status(&id, DiagnosisStatus::Pending);
    progress.update(&id, DiagnosisProgress {
        status: DiagnosisStatus::ExperimentingRampUp,
        estimated_progress: 0.25,
        estimated_remaining_secs: 90,
        message: "ramping".to_string(),
    });
    assert_eq!(progress.get(&id).unwrap().estimated_remaining_secs, 90);

    progress.set_status(&id, DiagnosisStatus::Detected);
    progress.set_status(&id, DiagnosisStatus::Analysing);
    progress.update(&id, DiagnosisProgress::new(DiagnosisStatus::WarmUp));

    let record = progress.get(&id).unwrap();
    assert_eq!(record.status, DiagnosisStatus::Detected);
    assert_eq!(record.message, "ramping");
}

#[test]
fn progress_snapshot_and_reset() {
    let progress = ProgressTracker::new();
    progress.set_status(&ProblemId::new("a"), DiagnosisStatus::Pending);
    progress.set_status(&ProblemId::new("b"), DiagnosisStatus::NotDetected);
    assert_eq!(progress.snapshot().len(), 2);
    progress.reset();
    assert!(progress.snapshot().is_empty());
    assert!(progress.get(&ProblemId::new("a")).is_none());
}

/// Tests the wire labels of diagnosis statuses.
#[test]
fn status_labels_are_screaming_snake_case() {
    assert_eq!(DiagnosisStatus::ExperimentingStablePhase.to_string(), "EXPERIMENTING_STABLE_PHASE");
    let json = serde_json::to_string(&DiagnosisStatus::NotDetected).unwrap();
    assert_eq!(json, "\"NOT_DETECTED\"");
    assert!(DiagnosisStatus::NotDetected.is_terminal());
    assert!(!DiagnosisStatus::Analysing.is_terminal());
}

// ============================================================================
// SECTION: Traversal Policy
// ============================================================================

/// Tests the full descend decision table.
#[test]
fn traversal_policy_decision_table() {
    let cases = [
        (TraversalPolicy::PruneUndetected, NodeVerdict::Grouping, true),
        (TraversalPolicy::PruneUndetected, NodeVerdict::Detected, true),
        (TraversalPolicy::PruneUndetected, NodeVerdict::NotDetected, false),
        (TraversalPolicy::ExploreAll, NodeVerdict::Grouping, true),
        (TraversalPolicy::ExploreAll, NodeVerdict::Detected, true),
        (TraversalPolicy::ExploreAll, NodeVerdict::NotDetected, true),
    ];
    for (policy, verdict, expected) in cases {
        assert_eq!(policy.should_descend(verdict), expected, "{policy} / {verdict:?}");
    }
}

#[test]
fn traversal_policy_parses_config_labels() {
    assert_eq!("explore_all".parse::<TraversalPolicy>().unwrap(), TraversalPolicy::ExploreAll);
    assert_eq!("prune_undetected".parse::<TraversalPolicy>().unwrap(), TraversalPolicy::PruneUndetected);
    assert!("everything".parse::<TraversalPolicy>().is_err());
    assert_eq!(TraversalPolicy::default(), TraversalPolicy::PruneUndetected);
}
