//! End-to-end engine flows with in-memory collaborator stubs: the full
//! offer → counter → onboarding → finalize path, decline exclusivity, and
//! expiry precedence.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use fleetside::clients::{
    BookingDesk, Collaborators, FleetService, HostDirectory, InsuranceService, PayoutGateway,
};
use fleetside::config::EngineConfig;
use fleetside::engine::HostEngine;
use fleetside::error::{ConflictError, EngineError, UpstreamError};
use fleetside::negotiation::offer::BookingOffer;
use fleetside::negotiation::state::{DeclineDisposition, NegotiationPhase};
use fleetside::onboarding::progress::WizardTask;
use fleetside::steps::rules::{StepId, StepStatus};
use fleetside::steps::snapshot::{HostProfile, InsuranceTier, VehicleRecord};

/// In-memory platform: one host, mutable from the test.
struct FakePlatform {
    profile: std::sync::Mutex<HostProfile>,
    vehicles: std::sync::Mutex<Vec<VehicleRecord>>,
    insurance: std::sync::Mutex<Option<InsuranceTier>>,
    payout_connected: AtomicBool,
}

impl FakePlatform {
    fn new() -> Self {
        Self {
            profile: std::sync::Mutex::new(HostProfile {
                display_name: "Dana R.".into(),
                bio: "Hosting since 2021.".into(),
                photo_url: Some("s3://profiles/dana.jpg".into()),
                id_front_url: Some("s3://ids/front.jpg".into()),
                id_back_url: Some("s3://ids/back.jpg".into()),
                identity_verified: true,
                identity_rejected: false,
                identity_submitted_at: Some(Utc::now()),
                manages_own_vehicles: true,
            }),
            vehicles: std::sync::Mutex::new(vec![VehicleRecord {
                id: Uuid::new_v4(),
                photo_count: 7,
                vin: "1HGCM82633A004352".into(),
                license_plate: "7ABC123".into(),
                daily_rate: dec!(45),
                description: "Clean, reliable sedan with Bluetooth and a full-size spare.".into(),
            }]),
            insurance: std::sync::Mutex::new(Some(InsuranceTier::Standard)),
            payout_connected: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl HostDirectory for FakePlatform {
    async fn fetch_profile(&self, _host_id: &str) -> Result<HostProfile, UpstreamError> {
        Ok(self.profile.lock().unwrap().clone())
    }
}

#[async_trait]
impl FleetService for FakePlatform {
    async fn fetch_vehicles(&self, _host_id: &str) -> Result<Vec<VehicleRecord>, UpstreamError> {
        Ok(self.vehicles.lock().unwrap().clone())
    }
}

#[async_trait]
impl InsuranceService for FakePlatform {
    async fn fetch_tier(&self, _host_id: &str) -> Result<Option<InsuranceTier>, UpstreamError> {
        Ok(*self.insurance.lock().unwrap())
    }
}

#[async_trait]
impl PayoutGateway for FakePlatform {
    async fn fetch_status(&self, _host_id: &str) -> Result<bool, UpstreamError> {
        Ok(self.payout_connected.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl BookingDesk for FakePlatform {
    async fn submit_counter_offer(
        &self,
        _request_id: Uuid,
        _amount: Decimal,
        _note: Option<&str>,
    ) -> Result<(), UpstreamError> {
        Ok(())
    }

    async fn submit_decline(
        &self,
        _request_id: Uuid,
        _disposition: DeclineDisposition,
        _reason: Option<&str>,
    ) -> Result<(), UpstreamError> {
        Ok(())
    }

    async fn start_onboarding(&self, _request_id: Uuid) -> Result<(), UpstreamError> {
        Ok(())
    }

    async fn finalize_onboarding(&self, _request_id: Uuid) -> Result<(), UpstreamError> {
        Ok(())
    }
}

fn engine(platform: Arc<FakePlatform>) -> HostEngine {
    let collaborators = Collaborators {
        directory: platform.clone(),
        fleet: platform.clone(),
        insurance: platform.clone(),
        payout: platform.clone(),
        desk: platform,
    };
    HostEngine::new(EngineConfig::default(), collaborators)
}

fn offer(rate: Decimal, hours_left: i64) -> BookingOffer {
    BookingOffer {
        request_id: Uuid::new_v4(),
        vehicle_summary: "Midsize sedan".into(),
        guest_summary: "Jordan M. (4.9★, 23 trips)".into(),
        start_date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2026, 4, 15).unwrap(),
        duration_days: 14,
        daily_rate: rate,
        pickup_city: "Austin".into(),
        pickup_state: "TX".into(),
        expires_at: Utc::now() + chrono::Duration::hours(hours_left),
    }
}

#[tokio::test]
async fn fully_verified_host_shows_complete_steps() {
    let engine = engine(Arc::new(FakePlatform::new()));

    let statuses = engine.step_statuses("host_1").await.unwrap();
    assert_eq!(statuses.len(), 5);
    for status in &statuses {
        assert_eq!(
            status.evaluation.status,
            StepStatus::Complete,
            "step {} should be complete",
            status.evaluation.step
        );
    }

    let progress = engine.progress("host_1").await.unwrap();
    assert_eq!(progress.percent, 100);
    assert_eq!(progress.next_actionable, None);
}

#[tokio::test]
async fn unverified_host_progress_and_next_step() {
    let platform = Arc::new(FakePlatform::new());
    {
        let mut profile = platform.profile.lock().unwrap();
        profile.identity_verified = false;
        profile.identity_submitted_at = None;
        profile.id_back_url = None;
    }
    let engine = engine(platform);

    let statuses = engine.step_statuses("host_1").await.unwrap();
    let by_step = |id: StepId| {
        statuses
            .iter()
            .find(|s| s.evaluation.step == id)
            .unwrap()
            .evaluation
            .status
    };
    assert_eq!(by_step(StepId::Identity), StepStatus::InProgress);
    assert_eq!(by_step(StepId::Payout), StepStatus::Locked);

    let progress = engine.progress("host_1").await.unwrap();
    // Payout is locked: denominator is 4, with listing + insurance complete
    // and profile incomplete (missing ID face) and identity in progress.
    assert_eq!(progress.total_count, 4);
    assert_eq!(progress.completed_count, 2);
    assert_eq!(progress.percent, 50);
    assert_eq!(progress.next_actionable, Some(StepId::Identity));
}

#[tokio::test]
async fn counter_offer_negotiation_to_accepted_booking() {
    let platform = Arc::new(FakePlatform::new());
    let engine = engine(platform);

    let offer = offer(dec!(45), 48);
    let request_id = offer.request_id;
    engine.assign_offer("host_1", offer).await;

    // Offer visible with full time remaining and original-rate earnings.
    let view = engine.negotiation_view(request_id).await.unwrap();
    assert_eq!(view.phase, NegotiationPhase::Offered);
    assert!(!view.time_remaining.expired);
    assert_eq!(view.earnings.total, dec!(630.00));
    assert_eq!(view.earnings.platform_fee, dec!(63.00));
    assert_eq!(view.earnings.host_earnings, dec!(567.00));

    // Counter within the band; reviewer approves.
    engine
        .submit_counter_offer(request_id, dec!(60), Some("Festival weekend".into()))
        .await
        .unwrap();
    let view = engine.negotiation_view(request_id).await.unwrap();
    assert_eq!(view.phase, NegotiationPhase::CounterPending);

    engine.resolve_counter_offer(request_id, true).await.unwrap();
    let view = engine.negotiation_view(request_id).await.unwrap();
    assert_eq!(view.phase, NegotiationPhase::OnboardingInProgress);
    // Earnings now follow the negotiated rate.
    assert_eq!(view.earnings.total, dec!(840.00));

    // Wizard: photos, then rate (prefilled with the approved counter).
    engine
        .add_photos(
            request_id,
            vec!["p1.jpg".into(), "p2.jpg".into(), "p3.jpg".into()],
        )
        .await
        .unwrap();
    let progress = engine.onboarding_progress(request_id).await.unwrap();
    assert!(progress.photos_uploaded);
    assert_eq!(progress.next_task, Some(WizardTask::Rate));

    let confirmed = engine.confirm_rate(request_id, None).await.unwrap();
    assert_eq!(confirmed, dec!(60));

    let connected = engine.refresh_payout(request_id).await.unwrap();
    assert!(connected);

    let progress = engine.onboarding_progress(request_id).await.unwrap();
    assert!(progress.is_complete());
    assert_eq!(progress.percent, 100);

    // Still needs the explicit finalize.
    let view = engine.negotiation_view(request_id).await.unwrap();
    assert_eq!(view.phase, NegotiationPhase::OnboardingInProgress);

    engine.finalize_onboarding(request_id).await.unwrap();
    let view = engine.negotiation_view(request_id).await.unwrap();
    assert_eq!(view.phase, NegotiationPhase::OnboardingComplete);
}

#[tokio::test]
async fn out_of_band_counter_is_rejected_without_transition() {
    let engine = engine(Arc::new(FakePlatform::new()));
    let offer = offer(dec!(100), 48);
    let request_id = offer.request_id;
    engine.assign_offer("host_1", offer).await;

    let err = engine
        .submit_counter_offer(request_id, dec!(201), None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let view = engine.negotiation_view(request_id).await.unwrap();
    assert_eq!(view.phase, NegotiationPhase::Offered);
    assert!(view.counter_amount.is_none());
}

#[tokio::test]
async fn wizard_reopen_resumes_at_first_incomplete_task() {
    let platform = Arc::new(FakePlatform::new());
    platform.payout_connected.store(false, Ordering::SeqCst);
    let engine = engine(platform.clone());

    let offer = offer(dec!(45), 48);
    let request_id = offer.request_id;
    engine.assign_offer("host_1", offer).await;
    engine.start_onboarding(request_id).await.unwrap();

    engine
        .add_photos(
            request_id,
            vec!["p1.jpg".into(), "p2.jpg".into(), "p3.jpg".into()],
        )
        .await
        .unwrap();

    // Photos done, rate not confirmed: reopening lands on rate, not photos
    // or payout — even though payout later connects out of band.
    platform.payout_connected.store(true, Ordering::SeqCst);
    engine.refresh_payout(request_id).await.unwrap();
    let progress = engine.onboarding_progress(request_id).await.unwrap();
    assert_eq!(progress.next_task, Some(WizardTask::Rate));
}

#[tokio::test]
async fn decline_is_terminal_and_exclusive() {
    let engine = engine(Arc::new(FakePlatform::new()));
    let offer = offer(dec!(45), 48);
    let request_id = offer.request_id;
    engine.assign_offer("host_1", offer).await;

    engine
        .decline(
            request_id,
            DeclineDisposition::KeepAccount,
            Some("Dates don't work".into()),
        )
        .await
        .unwrap();

    let view = engine.negotiation_view(request_id).await.unwrap();
    assert_eq!(view.phase, NegotiationPhase::Declined);

    // The other disposition is no longer reachable.
    let err = engine
        .decline(request_id, DeclineDisposition::RemoveAccount, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Conflict(ConflictError::AlreadyDeclined { .. })
    ));

    // Neither is onboarding.
    let err = engine.start_onboarding(request_id).await.unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
async fn expiry_rejects_finalize_even_with_wizard_complete() {
    let engine = engine(Arc::new(FakePlatform::new()));

    // Enough time to finish the wizard, not enough to dawdle on finalize.
    let mut o = offer(dec!(45), 48);
    o.expires_at = Utc::now() + chrono::Duration::milliseconds(300);
    let request_id = o.request_id;
    engine.assign_offer("host_1", o).await;

    engine.start_onboarding(request_id).await.unwrap();
    engine
        .add_photos(
            request_id,
            vec!["p1.jpg".into(), "p2.jpg".into(), "p3.jpg".into()],
        )
        .await
        .unwrap();
    engine.confirm_rate(request_id, None).await.unwrap();
    engine.refresh_payout(request_id).await.unwrap();

    let progress = engine.onboarding_progress(request_id).await.unwrap();
    assert!(progress.is_complete());

    // The deadline passes before the finalize click arrives.
    tokio::time::sleep(std::time::Duration::from_millis(400)).await;

    let err = engine.finalize_onboarding(request_id).await.unwrap_err();
    assert!(matches!(err, EngineError::Expired(_)));

    let view = engine.negotiation_view(request_id).await.unwrap();
    assert_eq!(view.phase, NegotiationPhase::Expired);
    assert!(view.time_remaining.expired);

    // Every further action answers with the terminal error.
    let err = engine
        .submit_counter_offer(request_id, dec!(45), None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Expired(_)));
}

#[tokio::test]
async fn expiry_feed_reaches_zero() {
    let engine = engine(Arc::new(FakePlatform::new()));
    let mut o = offer(dec!(45), 0);
    o.expires_at = Utc::now() + chrono::Duration::milliseconds(40);
    let request_id = o.request_id;
    engine.assign_offer("host_1", o).await;

    let mut feed = engine.expiry_feed(request_id).await.unwrap();
    loop {
        if feed.borrow().expired {
            break;
        }
        if feed.changed().await.is_err() {
            break;
        }
    }
    let view = engine.negotiation_view(request_id).await.unwrap();
    assert_eq!(view.phase, NegotiationPhase::Expired);
}

#[tokio::test]
async fn statuses_recompute_only_on_refresh() {
    let platform = Arc::new(FakePlatform::new());
    let engine = engine(platform.clone());
    engine.refresh("host_1").await.unwrap();

    // The fleet stub cannot fail, but a removed vehicle list simulates the
    // dashboard-visible outcome of a refresh; statuses recompute from facts.
    platform.vehicles.lock().unwrap().clear();
    let statuses = engine.step_statuses("host_1").await.unwrap();
    // Cached snapshot still in place: no refresh was requested, listing
    // remains complete from the cached vehicles.
    let listing = statuses
        .iter()
        .find(|s| s.evaluation.step == StepId::Listing)
        .unwrap();
    assert_eq!(listing.evaluation.status, StepStatus::Complete);

    // An explicit refresh picks up the new facts.
    engine.refresh("host_1").await.unwrap();
    let statuses = engine.step_statuses("host_1").await.unwrap();
    let listing = statuses
        .iter()
        .find(|s| s.evaluation.step == StepId::Listing)
        .unwrap();
    assert_eq!(listing.evaluation.status, StepStatus::InProgress);
}
