//! Host verification steps — snapshot model, step rules, and progress
//! aggregation.
//!
//! Statuses are derived, never stored: each read re-evaluates the rules
//! against the latest [`snapshot::HostSnapshot`], so the dashboard can never
//! disagree with the underlying profile/fleet/payout facts.

pub mod progress;
pub mod rules;
pub mod snapshot;

pub use progress::{ProgressSummary, aggregate};
pub use rules::{
    ListingChecklist, StepEvaluation, StepId, StepPriority, StepStatus, evaluate, evaluate_all,
};
pub use snapshot::{HostProfile, HostSnapshot, InsuranceTier, SourceFreshness, VehicleRecord};
