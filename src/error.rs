//! Error types for the fleetside engine.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::steps::rules::StepId;

/// Top-level error type for the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Dependency locked: {0}")]
    Locked(#[from] LockedError),

    #[error("Expired: {0}")]
    Expired(#[from] ExpiredError),

    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Conflict: {0}")]
    Conflict(#[from] ConflictError),
}

/// Locally rejected input. State is never changed by a validation failure;
/// the message names the condition that failed.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error(
        "Counter-offer of {amount} is outside the allowed band [{floor}, {ceiling}] \
         for an offer of {offered}"
    )]
    CounterOutOfBand {
        amount: Decimal,
        offered: Decimal,
        floor: Decimal,
        ceiling: Decimal,
    },

    #[error("Daily rate must be greater than zero, got {rate}")]
    NonPositiveRate { rate: Decimal },

    #[error("At least {required} photos are required, only {uploaded} uploaded")]
    TooFewPhotos { uploaded: usize, required: usize },

    #[error("Photo limit of {capacity} reached ({uploaded} uploaded, {submitted} submitted)")]
    PhotoCapacity {
        uploaded: usize,
        submitted: usize,
        capacity: usize,
    },

    #[error("No photo with reference {reference}")]
    UnknownPhoto { reference: String },
}

/// An action targeted a step whose dependency has not cleared.
#[derive(Debug, thiserror::Error)]
#[error("Step {step} is locked until {blocked_on} is complete")]
pub struct LockedError {
    pub step: StepId,
    pub blocked_on: StepId,
}

/// The booking request's deadline has passed. Takes precedence over the
/// action's own validity; the only remaining legal path is decline-side
/// cleanup via support.
#[derive(Debug, thiserror::Error)]
#[error("Booking request {request_id} expired; no further actions are accepted")]
pub struct ExpiredError {
    pub request_id: Uuid,
}

/// A collaborator fetch or submit failed. The prior snapshot stays in place
/// and the affected sources are reported stale, never assumed incomplete.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("{service} request failed: {reason}")]
    RequestFailed { service: String, reason: String },

    #[error("{service} timed out")]
    Timeout { service: String },

    #[error("{service} rejected the submission: {reason}")]
    Rejected { service: String, reason: String },

    #[error("Invalid response from {service}: {reason}")]
    InvalidResponse { service: String, reason: String },
}

/// The action is legal in general but not in the request's current state.
#[derive(Debug, thiserror::Error)]
pub enum ConflictError {
    #[error("A counter-offer is already pending review; wait for its resolution")]
    CounterAlreadyPending,

    #[error("Onboarding cannot start while a counter-offer is pending review")]
    OnboardingBlockedByCounter,

    #[error("Booking request {request_id} was already declined")]
    AlreadyDeclined { request_id: Uuid },

    #[error("Booking request {request_id} is already resolved ({phase})")]
    AlreadyResolved { request_id: Uuid, phase: String },

    #[error("Cannot {action} while the negotiation is in phase {phase}")]
    IllegalTransition { action: String, phase: String },

    #[error("Onboarding tasks are incomplete: {missing}")]
    OnboardingIncomplete { missing: String },

    #[error("No booking request {request_id} is assigned")]
    UnknownRequest { request_id: Uuid },
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, EngineError>;
