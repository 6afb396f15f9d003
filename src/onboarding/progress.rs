//! Derived onboarding progress — a view over completion facts.
//!
//! Never persisted on its own: every read recomputes the three task
//! booleans from the current wizard/payout facts, so an interrupted wizard
//! can never resume from a stale cursor.

use serde::{Deserialize, Serialize};

/// One of the three onboarding wizard tasks, in fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardTask {
    Photos,
    Rate,
    Payout,
}

impl WizardTask {
    /// All tasks in wizard order.
    pub const ALL: [WizardTask; 3] = [WizardTask::Photos, WizardTask::Rate, WizardTask::Payout];
}

impl std::fmt::Display for WizardTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Photos => "photos",
            Self::Rate => "rate",
            Self::Payout => "payout",
        };
        write!(f, "{s}")
    }
}

/// Snapshot of onboarding completion, recomputed on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingProgress {
    pub photos_uploaded: bool,
    pub rate_configured: bool,
    pub payout_connected: bool,
    /// Rounded share of the three tasks complete.
    pub percent: u8,
    /// First incomplete task; the wizard always resumes here. `None` once
    /// all three are done.
    pub next_task: Option<WizardTask>,
}

impl OnboardingProgress {
    /// Build the view from the three completion facts.
    pub fn derive(photos_uploaded: bool, rate_configured: bool, payout_connected: bool) -> Self {
        let done = [photos_uploaded, rate_configured, payout_connected]
            .iter()
            .filter(|d| **d)
            .count() as u32;
        let percent = ((100 * done + 1) / 3) as u8; // round half up over thirds

        let next_task = WizardTask::ALL
            .iter()
            .zip([photos_uploaded, rate_configured, payout_connected])
            .find(|(_, complete)| !complete)
            .map(|(task, _)| *task);

        Self {
            photos_uploaded,
            rate_configured,
            payout_connected,
            percent,
            next_task,
        }
    }

    /// All three tasks report complete.
    pub fn is_complete(&self) -> bool {
        self.photos_uploaded && self.rate_configured && self.payout_connected
    }
}
