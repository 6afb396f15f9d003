//! Negotiation state machine.
//!
//! The phase enum and its transition table are the single source of truth
//! for what a booking request may do next. Transitions not in the table are
//! rejected outright; nothing is inferred from flag combinations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ConflictError;

/// Phase of a (host, booking request) negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationPhase {
    /// Offer stands; the host may accept-and-onboard, counter, or decline.
    Offered,
    /// A counter-offer is with the platform's reviewer.
    CounterPending,
    /// Host accepted (at the original or approved counter rate) and is
    /// working through the onboarding wizard.
    OnboardingInProgress,
    /// Onboarding finalized; the booking is accepted.
    OnboardingComplete,
    /// Host declined the request.
    Declined,
    /// The deadline passed before resolution.
    Expired,
}

impl NegotiationPhase {
    /// Check if this phase allows transitioning to another phase.
    pub fn can_transition_to(&self, target: NegotiationPhase) -> bool {
        use NegotiationPhase::*;

        matches!(
            (self, target),
            // From Offered
            (Offered, CounterPending) | (Offered, OnboardingInProgress) |
            (Offered, Declined) | (Offered, Expired) |
            // From CounterPending: rejected goes back to Offered (rate
            // unchanged), approved goes straight into onboarding (rate
            // updated)
            (CounterPending, Offered) | (CounterPending, OnboardingInProgress) |
            (CounterPending, Declined) | (CounterPending, Expired) |
            // From OnboardingInProgress
            (OnboardingInProgress, OnboardingComplete) |
            (OnboardingInProgress, Declined) | (OnboardingInProgress, Expired)
        )
    }

    /// Check if this is a terminal phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::OnboardingComplete | Self::Declined | Self::Expired)
    }
}

impl std::fmt::Display for NegotiationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Offered => "offered",
            Self::CounterPending => "counter_pending",
            Self::OnboardingInProgress => "onboarding_in_progress",
            Self::OnboardingComplete => "onboarding_complete",
            Self::Declined => "declined",
            Self::Expired => "expired",
        };
        write!(f, "{s}")
    }
}

/// Resolution state of a submitted counter-offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterStatus {
    Pending,
    Approved,
    Rejected,
}

/// What a decline does to the host record. Always an explicit choice; there
/// is no default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclineDisposition {
    /// Irreversible: host record and booking request are both removed.
    RemoveAccount,
    /// Booking cancelled; host record retained for future assignment.
    KeepAccount,
}

impl std::fmt::Display for DeclineDisposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::RemoveAccount => "remove_account",
            Self::KeepAccount => "keep_account",
        };
        write!(f, "{s}")
    }
}

/// A phase transition event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: NegotiationPhase,
    pub to: NegotiationPhase,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Negotiation record for one (host, booking request) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationState {
    /// Current phase.
    pub phase: NegotiationPhase,
    /// Latest counter-offer amount, if one was ever submitted.
    pub counter_amount: Option<Decimal>,
    /// Free-text justification attached to the counter-offer.
    pub counter_note: Option<String>,
    /// Resolution state of the latest counter-offer.
    pub counter_status: Option<CounterStatus>,
    /// When onboarding began.
    pub onboarding_started_at: Option<DateTime<Utc>>,
    /// When onboarding was finalized.
    pub onboarding_completed_at: Option<DateTime<Utc>>,
    /// When the request was declined.
    pub declined_at: Option<DateTime<Utc>>,
    /// Disposition chosen at decline time.
    pub decline_disposition: Option<DeclineDisposition>,
    /// Phase transition history.
    pub transitions: Vec<PhaseTransition>,
}

impl NegotiationState {
    /// Fresh state for a newly assigned offer.
    pub fn new() -> Self {
        Self {
            phase: NegotiationPhase::Offered,
            counter_amount: None,
            counter_note: None,
            counter_status: None,
            onboarding_started_at: None,
            onboarding_completed_at: None,
            declined_at: None,
            decline_disposition: None,
            transitions: Vec::new(),
        }
    }

    /// Transition to a new phase, rejecting anything not in the table.
    pub fn transition_to(
        &mut self,
        target: NegotiationPhase,
        reason: Option<String>,
    ) -> Result<(), ConflictError> {
        if !self.phase.can_transition_to(target) {
            return Err(ConflictError::IllegalTransition {
                action: format!("transition to {target}"),
                phase: self.phase.to_string(),
            });
        }

        let now = Utc::now();
        self.transitions.push(PhaseTransition {
            from: self.phase,
            to: target,
            timestamp: now,
            reason,
        });
        self.phase = target;

        match target {
            NegotiationPhase::OnboardingInProgress if self.onboarding_started_at.is_none() => {
                self.onboarding_started_at = Some(now);
            }
            NegotiationPhase::OnboardingComplete => {
                self.onboarding_completed_at = Some(now);
            }
            NegotiationPhase::Declined => {
                self.declined_at = Some(now);
            }
            _ => {}
        }

        Ok(())
    }

    /// A counter-offer is awaiting review. Blocks onboarding start/resume
    /// and any second counter submission.
    pub fn counter_pending(&self) -> bool {
        self.counter_status == Some(CounterStatus::Pending)
    }

    /// Record a submitted counter-offer and move to `CounterPending`.
    pub fn record_counter(
        &mut self,
        amount: Decimal,
        note: Option<String>,
    ) -> Result<(), ConflictError> {
        if self.counter_pending() {
            return Err(ConflictError::CounterAlreadyPending);
        }
        self.transition_to(
            NegotiationPhase::CounterPending,
            Some(format!("Counter-offer of {amount} submitted")),
        )?;
        self.counter_amount = Some(amount);
        self.counter_note = note;
        self.counter_status = Some(CounterStatus::Pending);
        Ok(())
    }
}

impl Default for NegotiationState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn valid_transitions() {
        use NegotiationPhase::*;
        let transitions = [
            (Offered, CounterPending),
            (Offered, OnboardingInProgress),
            (Offered, Declined),
            (Offered, Expired),
            (CounterPending, Offered),
            (CounterPending, OnboardingInProgress),
            (CounterPending, Declined),
            (CounterPending, Expired),
            (OnboardingInProgress, OnboardingComplete),
            (OnboardingInProgress, Declined),
            (OnboardingInProgress, Expired),
        ];
        for (from, to) in transitions {
            assert!(from.can_transition_to(to), "{from} should transition to {to}");
        }
    }

    #[test]
    fn invalid_transitions() {
        use NegotiationPhase::*;
        // Terminal phases go nowhere
        for terminal in [OnboardingComplete, Declined, Expired] {
            for target in [
                Offered,
                CounterPending,
                OnboardingInProgress,
                OnboardingComplete,
                Declined,
                Expired,
            ] {
                assert!(
                    !terminal.can_transition_to(target),
                    "{terminal} must not transition to {target}"
                );
            }
        }
        // No skipping into completion
        assert!(!Offered.can_transition_to(OnboardingComplete));
        assert!(!CounterPending.can_transition_to(OnboardingComplete));
        // No self-transitions
        assert!(!Offered.can_transition_to(Offered));
        // Onboarding never reopens negotiation
        assert!(!OnboardingInProgress.can_transition_to(Offered));
        assert!(!OnboardingInProgress.can_transition_to(CounterPending));
    }

    #[test]
    fn terminal_phases() {
        use NegotiationPhase::*;
        assert!(OnboardingComplete.is_terminal());
        assert!(Declined.is_terminal());
        assert!(Expired.is_terminal());
        assert!(!Offered.is_terminal());
        assert!(!CounterPending.is_terminal());
        assert!(!OnboardingInProgress.is_terminal());
    }

    #[test]
    fn transition_records_history_and_timestamps() {
        let mut state = NegotiationState::new();
        state
            .transition_to(NegotiationPhase::OnboardingInProgress, None)
            .unwrap();
        assert!(state.onboarding_started_at.is_some());

        state
            .transition_to(NegotiationPhase::OnboardingComplete, Some("Finalized".into()))
            .unwrap();
        assert!(state.onboarding_completed_at.is_some());
        assert_eq!(state.transitions.len(), 2);
        assert_eq!(state.transitions[1].from, NegotiationPhase::OnboardingInProgress);
    }

    #[test]
    fn illegal_transition_is_rejected_with_context() {
        let mut state = NegotiationState::new();
        let err = state
            .transition_to(NegotiationPhase::OnboardingComplete, None)
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("onboarding_complete"));
        assert!(msg.contains("offered"));
        // State unchanged on rejection
        assert_eq!(state.phase, NegotiationPhase::Offered);
        assert!(state.transitions.is_empty());
    }

    #[test]
    fn record_counter_sets_pending() {
        let mut state = NegotiationState::new();
        state
            .record_counter(dec!(60), Some("Peak week".into()))
            .unwrap();
        assert_eq!(state.phase, NegotiationPhase::CounterPending);
        assert_eq!(state.counter_amount, Some(dec!(60)));
        assert!(state.counter_pending());
    }

    #[test]
    fn second_counter_while_pending_conflicts() {
        let mut state = NegotiationState::new();
        state.record_counter(dec!(60), None).unwrap();
        let err = state.record_counter(dec!(65), None).unwrap_err();
        assert!(matches!(err, ConflictError::CounterAlreadyPending));
        // First counter untouched
        assert_eq!(state.counter_amount, Some(dec!(60)));
    }

    #[test]
    fn decline_stamps_time() {
        let mut state = NegotiationState::new();
        state
            .transition_to(NegotiationPhase::Declined, Some("Host declined".into()))
            .unwrap();
        assert!(state.declined_at.is_some());
    }

    #[test]
    fn phase_serde_roundtrip() {
        let phase = NegotiationPhase::OnboardingInProgress;
        let json = serde_json::to_string(&phase).unwrap();
        assert_eq!(json, "\"onboarding_in_progress\"");
        let parsed: NegotiationPhase = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, phase);
    }

    #[test]
    fn display_matches_serde() {
        use NegotiationPhase::*;
        for phase in [
            Offered,
            CounterPending,
            OnboardingInProgress,
            OnboardingComplete,
            Declined,
            Expired,
        ] {
            let display = format!("{phase}");
            let json = serde_json::to_string(&phase).unwrap();
            assert_eq!(format!("\"{display}\""), json);
        }
    }
}
