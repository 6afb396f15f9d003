//! Collaborator contracts — the external services the engine consumes.
//!
//! Everything behind these traits is a black box: profile storage, fleet
//! CRUD, insurance administration, payout connection flows, and the booking
//! desk that books, cancels, and removes accounts. The engine only ever
//! sees fetched snapshots and accepted/rejected submissions.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::UpstreamError;
use crate::negotiation::state::DeclineDisposition;
use crate::steps::snapshot::{HostProfile, InsuranceTier, VehicleRecord};

/// Host identity and profile data.
#[async_trait]
pub trait HostDirectory: Send + Sync {
    async fn fetch_profile(&self, host_id: &str) -> Result<HostProfile, UpstreamError>;
}

/// Vehicle listings owned by a host.
#[async_trait]
pub trait FleetService: Send + Sync {
    async fn fetch_vehicles(&self, host_id: &str) -> Result<Vec<VehicleRecord>, UpstreamError>;
}

/// Insurance tier selection.
#[async_trait]
pub trait InsuranceService: Send + Sync {
    async fn fetch_tier(&self, host_id: &str) -> Result<Option<InsuranceTier>, UpstreamError>;
}

/// Payout connection status. The connection flow itself (bank linking,
/// KYC handoff) lives entirely on the other side of this trait.
#[async_trait]
pub trait PayoutGateway: Send + Sync {
    async fn fetch_status(&self, host_id: &str) -> Result<bool, UpstreamError>;
}

/// Booking-desk submissions. `Ok(())` means the desk accepted the action;
/// a rejection surfaces as [`UpstreamError::Rejected`] and the engine keeps
/// its state unchanged.
#[async_trait]
pub trait BookingDesk: Send + Sync {
    async fn submit_counter_offer(
        &self,
        request_id: Uuid,
        amount: Decimal,
        note: Option<&str>,
    ) -> Result<(), UpstreamError>;

    async fn submit_decline(
        &self,
        request_id: Uuid,
        disposition: DeclineDisposition,
        reason: Option<&str>,
    ) -> Result<(), UpstreamError>;

    async fn start_onboarding(&self, request_id: Uuid) -> Result<(), UpstreamError>;

    async fn finalize_onboarding(&self, request_id: Uuid) -> Result<(), UpstreamError>;
}
