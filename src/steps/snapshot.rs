//! Host snapshot — the immutable input to step evaluation.
//!
//! A snapshot is assembled from four independently-fetched sources (host
//! directory, fleet service, insurance service, payout gateway). Evaluation
//! is always a pure function of one snapshot; the engine swaps whole
//! snapshots on refresh and never mutates one in place.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity and completion inputs for a host. Mutated only by the profile
/// and identity-review collaborators; read-only here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostProfile {
    /// Display name shown to guests.
    pub display_name: String,
    /// Free-text host biography.
    pub bio: String,
    /// Profile photo reference, if uploaded.
    pub photo_url: Option<String>,
    /// Front face of the photo ID, if uploaded.
    pub id_front_url: Option<String>,
    /// Back face of the photo ID, if uploaded.
    pub id_back_url: Option<String>,
    /// Identity review passed.
    pub identity_verified: bool,
    /// Identity review rejected the submitted documents.
    pub identity_rejected: bool,
    /// When the ID documents were submitted for review.
    pub identity_submitted_at: Option<DateTime<Utc>>,
    /// Whether this host manages their own vehicles. Hosts managing vehicles
    /// on behalf of others skip the listing and insurance-tier steps.
    pub manages_own_vehicles: bool,
}

impl HostProfile {
    /// Both photo-ID faces have been uploaded.
    pub fn has_both_id_faces(&self) -> bool {
        self.id_front_url.is_some() && self.id_back_url.is_some()
    }

    /// At least one photo-ID face has been uploaded.
    pub fn has_any_id_face(&self) -> bool {
        self.id_front_url.is_some() || self.id_back_url.is_some()
    }
}

/// One vehicle listing owned by a host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleRecord {
    /// Listing ID.
    pub id: Uuid,
    /// Number of listing photos uploaded.
    pub photo_count: u32,
    /// Vehicle identification number.
    pub vin: String,
    /// License plate.
    pub license_plate: String,
    /// Daily rate in the marketplace currency.
    pub daily_rate: Decimal,
    /// Free-text listing description.
    pub description: String,
}

/// Minimum photos for a bookable listing.
pub const LISTING_MIN_PHOTOS: u32 = 6;
/// Minimum VIN length for a bookable listing.
pub const LISTING_MIN_VIN_LEN: usize = 17;
/// Minimum license plate length for a bookable listing.
pub const LISTING_MIN_PLATE_LEN: usize = 2;
/// Minimum description length for the dashboard checklist.
pub const CHECKLIST_MIN_DESCRIPTION_LEN: usize = 50;

impl VehicleRecord {
    /// Completeness as the onboarding flow defines it: enough photos, a full
    /// VIN, a plate, and a positive rate. Does NOT require a description.
    ///
    /// The dashboard checklist uses the stricter [`is_checklist_complete`]
    /// instead; the two definitions are intentionally different and must not
    /// be unified without product sign-off.
    ///
    /// [`is_checklist_complete`]: VehicleRecord::is_checklist_complete
    pub fn is_listing_ready(&self) -> bool {
        self.photo_count >= LISTING_MIN_PHOTOS
            && self.vin.chars().count() >= LISTING_MIN_VIN_LEN
            && self.license_plate.chars().count() >= LISTING_MIN_PLATE_LEN
            && self.daily_rate > Decimal::ZERO
    }

    /// Completeness as the general dashboard checklist defines it:
    /// everything [`is_listing_ready`] requires, plus a description of at
    /// least 50 characters.
    ///
    /// [`is_listing_ready`]: VehicleRecord::is_listing_ready
    pub fn is_checklist_complete(&self) -> bool {
        self.is_listing_ready()
            && self.description.chars().count() >= CHECKLIST_MIN_DESCRIPTION_LEN
    }
}

/// Insurance tier selected by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsuranceTier {
    Basic,
    Standard,
    Premium,
}

impl InsuranceTier {
    /// Share of booking earnings the host keeps under this tier.
    pub const fn earnings_percent(&self) -> u8 {
        match self {
            Self::Basic => 40,
            Self::Standard => 75,
            Self::Premium => 90,
        }
    }
}

impl std::fmt::Display for InsuranceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Basic => "basic",
            Self::Standard => "standard",
            Self::Premium => "premium",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for InsuranceTier {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Self::Basic),
            "standard" => Ok(Self::Standard),
            "premium" => Ok(Self::Premium),
            _ => Err(format!("Unknown insurance tier: {}", s)),
        }
    }
}

/// Which sources of a snapshot are fresh. A source goes stale when its
/// fetch fails and the prior value is carried forward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SourceFreshness {
    pub profile: bool,
    pub vehicles: bool,
    pub insurance: bool,
    pub payout: bool,
}

impl Default for SourceFreshness {
    fn default() -> Self {
        Self {
            profile: true,
            vehicles: true,
            insurance: true,
            payout: true,
        }
    }
}

impl SourceFreshness {
    /// All four sources were fetched successfully on the last refresh.
    pub fn all_fresh(&self) -> bool {
        self.profile && self.vehicles && self.insurance && self.payout
    }
}

/// One refresh's worth of host data. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSnapshot {
    /// Host this snapshot belongs to.
    pub host_id: String,
    /// Profile and identity inputs.
    pub profile: HostProfile,
    /// Vehicles owned by the host.
    pub vehicles: Vec<VehicleRecord>,
    /// Selected insurance tier, if any.
    pub insurance: Option<InsuranceTier>,
    /// Whether a payout connection exists.
    pub payout_connected: bool,
    /// When this snapshot was assembled.
    pub fetched_at: DateTime<Utc>,
    /// Per-source freshness after the last refresh.
    pub freshness: SourceFreshness,
}

impl HostSnapshot {
    /// Create an empty snapshot for a host (used as the merge base for the
    /// first refresh).
    pub fn empty(host_id: impl Into<String>) -> Self {
        Self {
            host_id: host_id.into(),
            profile: HostProfile::default(),
            vehicles: Vec::new(),
            insurance: None,
            payout_connected: false,
            fetched_at: Utc::now(),
            freshness: SourceFreshness::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ready_vehicle() -> VehicleRecord {
        VehicleRecord {
            id: Uuid::new_v4(),
            photo_count: 6,
            vin: "1HGCM82633A004352".into(),
            license_plate: "7ABC123".into(),
            daily_rate: dec!(45),
            description: String::new(),
        }
    }

    #[test]
    fn listing_ready_at_exact_minimums() {
        let v = ready_vehicle();
        assert_eq!(v.vin.len(), 17);
        assert!(v.is_listing_ready());
    }

    #[test]
    fn listing_not_ready_below_any_minimum() {
        let mut v = ready_vehicle();
        v.photo_count = 5;
        assert!(!v.is_listing_ready());

        let mut v = ready_vehicle();
        v.vin = "1HGCM82633A00435".into(); // 16 chars
        assert!(!v.is_listing_ready());

        let mut v = ready_vehicle();
        v.license_plate = "A".into();
        assert!(!v.is_listing_ready());

        let mut v = ready_vehicle();
        v.daily_rate = Decimal::ZERO;
        assert!(!v.is_listing_ready());
    }

    #[test]
    fn checklist_is_stricter_than_listing_ready() {
        // The two completeness definitions diverge on the description field.
        let v = ready_vehicle();
        assert!(v.is_listing_ready());
        assert!(!v.is_checklist_complete());

        let mut v = ready_vehicle();
        v.description = "A well-kept sedan with clean interior, Bluetooth, and backup camera.".into();
        assert!(v.description.len() >= CHECKLIST_MIN_DESCRIPTION_LEN);
        assert!(v.is_checklist_complete());
    }

    #[test]
    fn tier_earnings_percentages() {
        assert_eq!(InsuranceTier::Basic.earnings_percent(), 40);
        assert_eq!(InsuranceTier::Standard.earnings_percent(), 75);
        assert_eq!(InsuranceTier::Premium.earnings_percent(), 90);
    }

    #[test]
    fn tier_display_and_fromstr() {
        assert_eq!(InsuranceTier::Premium.to_string(), "premium");
        assert_eq!(
            "standard".parse::<InsuranceTier>().unwrap(),
            InsuranceTier::Standard
        );
        assert!("gold".parse::<InsuranceTier>().is_err());
    }

    #[test]
    fn id_face_helpers() {
        let mut profile = HostProfile::default();
        assert!(!profile.has_any_id_face());

        profile.id_front_url = Some("s3://ids/front.jpg".into());
        assert!(profile.has_any_id_face());
        assert!(!profile.has_both_id_faces());

        profile.id_back_url = Some("s3://ids/back.jpg".into());
        assert!(profile.has_both_id_faces());
    }

    #[test]
    fn freshness_defaults_fresh() {
        let snapshot = HostSnapshot::empty("host_1");
        assert!(snapshot.freshness.all_fresh());
    }
}
