//! Progress aggregation over step evaluations.

use serde::{Deserialize, Serialize};

use crate::steps::rules::{StepEvaluation, StepId};

/// Aggregated onboarding progress for a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSummary {
    /// Rounded completion percentage over non-locked steps.
    pub percent: u8,
    /// Steps currently complete.
    pub completed_count: usize,
    /// Steps counted in the denominator (locked steps excluded).
    pub total_count: usize,
    /// First step needing attention, in priority order. `None` when every
    /// non-locked step is complete.
    pub next_actionable: Option<StepId>,
}

/// Combine step evaluations into a single progress view.
///
/// Locked steps are excluded from the denominator: a step the host cannot
/// act on must not drag the percentage down. The next actionable step is the
/// first non-complete, non-locked step ordered by priority (high before
/// medium before low), ties broken by declared step order. Deterministic:
/// identical input yields identical output.
pub fn aggregate(evaluations: &[StepEvaluation]) -> ProgressSummary {
    let countable: Vec<&StepEvaluation> = evaluations
        .iter()
        .filter(|e| !e.status.is_locked())
        .collect();

    let total_count = countable.len();
    let completed_count = countable
        .iter()
        .filter(|e| e.status.is_complete())
        .count();

    let percent = if total_count == 0 {
        0
    } else {
        // Round half up; counts are tiny so u32 math cannot overflow.
        ((100 * completed_count as u32 + total_count as u32 / 2) / total_count as u32) as u8
    };

    let mut ordered: Vec<&StepEvaluation> = evaluations.iter().collect();
    ordered.sort_by_key(|e| (e.step.priority(), declared_index(e.step)));
    let next_actionable = ordered
        .iter()
        .find(|e| !e.status.is_complete() && !e.status.is_locked())
        .map(|e| e.step);

    ProgressSummary {
        percent,
        completed_count,
        total_count,
        next_actionable,
    }
}

fn declared_index(step: StepId) -> usize {
    StepId::ALL.iter().position(|s| *s == step).unwrap_or(usize::MAX)
}
