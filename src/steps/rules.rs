//! Step rules engine — pure evaluation of onboarding/verification steps.
//!
//! Every rule is a deterministic function of a single [`HostSnapshot`]:
//! no I/O, no clock reads, no hidden state. The engine re-runs the rules on
//! every read, so a step's status can never drift from the underlying facts.

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::steps::snapshot::{HostSnapshot, VehicleRecord};

/// A named unit of host verification/onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    /// Display name, bio, profile photo, photo-ID uploads.
    Profile,
    /// Identity document review.
    Identity,
    /// Vehicle listings meet the bookability bar.
    Listing,
    /// Payout connection. Locked until identity clears.
    Payout,
    /// Insurance tier selection.
    Insurance,
}

impl StepId {
    /// All steps in declared (display) order.
    pub const ALL: [StepId; 5] = [
        StepId::Profile,
        StepId::Identity,
        StepId::Listing,
        StepId::Payout,
        StepId::Insurance,
    ];

    /// Action priority for this step. Identity and payout gate money
    /// movement, so they outrank the rest.
    pub const fn priority(&self) -> StepPriority {
        match self {
            Self::Identity | Self::Payout => StepPriority::High,
            Self::Profile | Self::Listing => StepPriority::Medium,
            Self::Insurance => StepPriority::Low,
        }
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Profile => "profile",
            Self::Identity => "identity",
            Self::Listing => "listing",
            Self::Payout => "payout",
            Self::Insurance => "insurance",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for StepId {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "profile" => Ok(Self::Profile),
            "identity" => Ok(Self::Identity),
            "listing" => Ok(Self::Listing),
            "payout" => Ok(Self::Payout),
            "insurance" => Ok(Self::Insurance),
            _ => Err(format!("Unknown step: {}", s)),
        }
    }
}

/// How urgently a step wants the host's attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPriority {
    High,
    Medium,
    Low,
}

/// Computed status of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    NotStarted,
    InProgress,
    PendingReview,
    Complete,
    Failed,
    /// Dependency not yet satisfied. Excluded from progress percentages.
    Locked,
}

impl StepStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked)
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::PendingReview => "pending_review",
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::Locked => "locked",
        };
        write!(f, "{s}")
    }
}

/// Auxiliary display data attached to an evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepDetail {
    /// Selected insurance tier and the earnings share it carries.
    InsuranceSelection {
        tier: crate::steps::snapshot::InsuranceTier,
        earnings_percent: u8,
    },
}

/// Result of evaluating one step against one snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepEvaluation {
    pub step: StepId,
    pub status: StepStatus,
    /// Why the step landed in this status.
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<StepDetail>,
}

impl StepEvaluation {
    fn new(step: StepId, status: StepStatus, reason: impl Into<String>) -> Self {
        Self {
            step,
            status,
            reason: reason.into(),
            detail: None,
        }
    }
}

/// Evaluate a single step against a snapshot.
pub fn evaluate(step: StepId, snapshot: &HostSnapshot) -> StepEvaluation {
    match step {
        StepId::Profile => evaluate_profile(snapshot),
        StepId::Identity => evaluate_identity(snapshot),
        StepId::Listing => evaluate_listing(snapshot),
        StepId::Payout => evaluate_payout(snapshot),
        StepId::Insurance => evaluate_insurance(snapshot),
    }
}

/// Evaluate every step, in declared order.
pub fn evaluate_all(snapshot: &HostSnapshot) -> Vec<StepEvaluation> {
    StepId::ALL
        .iter()
        .map(|step| evaluate(*step, snapshot))
        .collect()
}

fn evaluate_profile(snapshot: &HostSnapshot) -> StepEvaluation {
    let p = &snapshot.profile;
    let mut missing = Vec::new();
    if p.display_name.trim().is_empty() {
        missing.push("display name");
    }
    if p.bio.trim().is_empty() {
        missing.push("bio");
    }
    if p.photo_url.is_none() {
        missing.push("profile photo");
    }
    if !p.has_both_id_faces() {
        missing.push("photo ID (both sides)");
    }

    if missing.is_empty() {
        StepEvaluation::new(StepId::Profile, StepStatus::Complete, "Profile complete")
    } else {
        StepEvaluation::new(
            StepId::Profile,
            StepStatus::InProgress,
            format!("Missing: {}", missing.join(", ")),
        )
    }
}

/// Identity precedence is fixed: verified > rejected > pending-review >
/// in-progress > not-started. Conflicting flags (verified and rejected both
/// set) must resolve to the higher rung, never to an ambiguous state.
fn evaluate_identity(snapshot: &HostSnapshot) -> StepEvaluation {
    let p = &snapshot.profile;
    if p.identity_verified {
        return StepEvaluation::new(StepId::Identity, StepStatus::Complete, "Identity verified");
    }
    if p.identity_rejected {
        return StepEvaluation::new(
            StepId::Identity,
            StepStatus::Failed,
            "Identity documents rejected; re-submit both ID faces",
        );
    }
    if p.has_both_id_faces() && p.identity_submitted_at.is_some() {
        return StepEvaluation::new(
            StepId::Identity,
            StepStatus::PendingReview,
            "Documents submitted, review pending",
        );
    }
    if p.has_any_id_face() {
        return StepEvaluation::new(
            StepId::Identity,
            StepStatus::InProgress,
            "ID upload incomplete",
        );
    }
    StepEvaluation::new(
        StepId::Identity,
        StepStatus::NotStarted,
        "No ID documents uploaded",
    )
}

fn evaluate_listing(snapshot: &HostSnapshot) -> StepEvaluation {
    if !snapshot.profile.manages_own_vehicles {
        return StepEvaluation::new(
            StepId::Listing,
            StepStatus::Complete,
            "Managed fleet; listing step does not apply",
        );
    }
    if snapshot.vehicles.is_empty() {
        return StepEvaluation::new(
            StepId::Listing,
            StepStatus::InProgress,
            "No vehicles listed yet",
        );
    }
    let incomplete = snapshot
        .vehicles
        .iter()
        .filter(|v| !v.is_listing_ready())
        .count();
    if incomplete == 0 {
        StepEvaluation::new(
            StepId::Listing,
            StepStatus::Complete,
            format!("All {} vehicles bookable", snapshot.vehicles.len()),
        )
    } else {
        StepEvaluation::new(
            StepId::Listing,
            StepStatus::InProgress,
            format!(
                "{} of {} vehicles incomplete",
                incomplete,
                snapshot.vehicles.len()
            ),
        )
    }
}

fn evaluate_payout(snapshot: &HostSnapshot) -> StepEvaluation {
    let identity = evaluate_identity(snapshot);
    if !identity.status.is_complete() {
        return StepEvaluation::new(
            StepId::Payout,
            StepStatus::Locked,
            "Locked until identity verification is complete",
        );
    }
    if snapshot.payout_connected {
        StepEvaluation::new(StepId::Payout, StepStatus::Complete, "Payout connected")
    } else {
        StepEvaluation::new(
            StepId::Payout,
            StepStatus::NotStarted,
            "No payout connection",
        )
    }
}

fn evaluate_insurance(snapshot: &HostSnapshot) -> StepEvaluation {
    if !snapshot.profile.manages_own_vehicles {
        return StepEvaluation::new(
            StepId::Insurance,
            StepStatus::Complete,
            "Managed fleet; insurance step does not apply",
        );
    }
    match snapshot.insurance {
        Some(tier) => {
            let mut eval = StepEvaluation::new(
                StepId::Insurance,
                StepStatus::Complete,
                format!("{} tier selected", tier),
            );
            eval.detail = Some(StepDetail::InsuranceSelection {
                tier,
                earnings_percent: tier.earnings_percent(),
            });
            eval
        }
        None => StepEvaluation::new(
            StepId::Insurance,
            StepStatus::NotStarted,
            "No insurance tier selected",
        ),
    }
}

// ── Dashboard checklist ─────────────────────────────────────────────────

/// Per-vehicle checklist line for the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleChecklist {
    pub vehicle_id: Uuid,
    pub complete: bool,
    /// Human-readable names of the fields still missing.
    pub missing: Vec<String>,
}

/// Dashboard listing checklist — the stricter completeness definition.
///
/// Unlike [`evaluate`], this also requires a listing description and checks
/// the VIN against the standard character set (no I, O, Q).
pub struct ListingChecklist {
    vin_pattern: Regex,
}

impl ListingChecklist {
    pub fn new() -> Self {
        Self {
            vin_pattern: Regex::new(r"^[A-HJ-NPR-Z0-9]{17}$").unwrap(),
        }
    }

    /// Review every vehicle and report what is missing.
    pub fn review(&self, vehicles: &[VehicleRecord]) -> Vec<VehicleChecklist> {
        vehicles.iter().map(|v| self.review_one(v)).collect()
    }

    fn review_one(&self, vehicle: &VehicleRecord) -> VehicleChecklist {
        use crate::steps::snapshot::{
            CHECKLIST_MIN_DESCRIPTION_LEN, LISTING_MIN_PHOTOS, LISTING_MIN_PLATE_LEN,
            LISTING_MIN_VIN_LEN,
        };

        let mut missing = Vec::new();
        if vehicle.photo_count < LISTING_MIN_PHOTOS {
            missing.push(format!(
                "photos ({}/{})",
                vehicle.photo_count, LISTING_MIN_PHOTOS
            ));
        }
        if vehicle.vin.chars().count() < LISTING_MIN_VIN_LEN {
            missing.push("vin".to_string());
        } else if !self.vin_pattern.is_match(&vehicle.vin) {
            missing.push("vin (invalid characters)".to_string());
        }
        if vehicle.license_plate.chars().count() < LISTING_MIN_PLATE_LEN {
            missing.push("license plate".to_string());
        }
        if vehicle.daily_rate <= rust_decimal::Decimal::ZERO {
            missing.push("daily rate".to_string());
        }
        if vehicle.description.chars().count() < CHECKLIST_MIN_DESCRIPTION_LEN {
            missing.push("description".to_string());
        }

        VehicleChecklist {
            vehicle_id: vehicle.id,
            complete: missing.is_empty(),
            missing,
        }
    }
}

impl Default for ListingChecklist {
    fn default() -> Self {
        Self::new()
    }
}
