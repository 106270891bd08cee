// crates/spotter-cli/src/progress.rs
// ============================================================================
// Module: Progress Rendering
// Description: Change detection over polled progress snapshots.
// Purpose: Print one line per problem whenever its progress changes.
// Dependencies: spotter-core
// ============================================================================

//! ## Overview
//! The CLI polls [`ProgressReport`] snapshots on an interval. A
//! [`ProgressPrinter`] remembers the last record per problem and reports only
//! problems whose status, estimate, or message changed since the last poll.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use spotter_core::DiagnosisProgress;
use spotter_core::ProblemId;
use spotter_core::ProgressReport;

// ============================================================================
// SECTION: Formatting
// ============================================================================

/// Formats one problem's progress as a single line.
#[must_use]
pub fn format_progress(id: &ProblemId, progress: &DiagnosisProgress) -> String {
    let percent = progress.estimated_progress.clamp(0.0, 1.0) * 100.0;
    let mut line = format!("{id}: {} ({percent:.0}%)", progress.status);
    if progress.estimated_remaining_secs > 0 {
        line.push_str(&format!(", ~{}s left", progress.estimated_remaining_secs));
    }
    if !progress.message.is_empty() {
        line.push_str(" - ");
        line.push_str(&progress.message);
    }
    line
}

// ============================================================================
// SECTION: Printer
// ============================================================================

/// Tracks the last printed progress per problem.
#[derive(Debug, Default)]
pub struct ProgressPrinter {
    /// Last seen record per problem.
    last: BTreeMap<ProblemId, DiagnosisProgress>,
}

impl ProgressPrinter {
    /// Creates a printer that has seen nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns lines for problems that changed since the previous call.
    pub fn changes(&mut self, report: &ProgressReport) -> Vec<String> {
        let mut lines = Vec::new();
        for (id, progress) in &report.problems {
            if self.last.get(id) == Some(progress) {
                continue;
            }
            lines.push(format_progress(id, progress));
            self.last.insert(id.clone(), progress.clone());
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use std::collections::BTreeMap;

    use spotter_core::DiagnosisProgress;
    use spotter_core::DiagnosisStatus;
    use spotter_core::JobId;
    use spotter_core::JobState;
    use spotter_core::ProblemId;
    use spotter_core::ProgressReport;

    use super::ProgressPrinter;
    use super::format_progress;

    fn report(entries: &[(&str, DiagnosisProgress)]) -> ProgressReport {
        ProgressReport {
            job_id: JobId::new(1),
            state: JobState::Running,
            problems: entries.iter().map(|(id, progress)| (ProblemId::new(*id), progress.clone())).collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn lines_show_status_percent_and_message() {
        let progress = DiagnosisProgress {
            status: DiagnosisStatus::ExperimentingStablePhase,
            estimated_progress: 0.456,
            estimated_remaining_secs: 12,
            message: "step 2 of 3".to_string(),
        };
        assert_eq!(
            format_progress(&ProblemId::new("slow"), &progress),
            "slow: EXPERIMENTING_STABLE_PHASE (46%), ~12s left - step 2 of 3"
        );
        assert_eq!(
            format_progress(&ProblemId::new("slow"), &DiagnosisProgress::new(DiagnosisStatus::Pending)),
            "slow: PENDING (0%)"
        );
    }

    #[test]
    fn only_changed_problems_are_reported() {
        let mut printer = ProgressPrinter::new();
        let pending = DiagnosisProgress::new(DiagnosisStatus::Pending);
        let first = report(&[("a", pending.clone()), ("b", pending.clone())]);
        assert_eq!(printer.changes(&first).len(), 2);
        assert!(printer.changes(&first).is_empty());

        let second = report(&[("a", DiagnosisProgress::new(DiagnosisStatus::Analysing)), ("b", pending)]);
        assert_eq!(printer.changes(&second), vec!["a: ANALYSING (0%)".to_string()]);
    }
}
