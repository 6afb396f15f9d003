//! Engine facade — snapshot ingestion, step queries, and negotiation
//! actions behind one handle.
//!
//! The engine owns a snapshot cache per host and a session per booking
//! request. Snapshot ingestion is last-completed-wins: refreshes take a
//! generation number when they start, and a result that resolves after a
//! newer refresh has already been applied is discarded. Negotiation
//! transitions are the opposite — there, expiry always wins (see
//! [`crate::negotiation::session`]).

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clients::Collaborators;
use crate::config::EngineConfig;
use crate::error::{ConflictError, LockedError, Result, UpstreamError};
use crate::negotiation::clock::TimeRemaining;
use crate::negotiation::offer::BookingOffer;
use crate::negotiation::session::{NegotiationSession, NegotiationView};
use crate::negotiation::state::DeclineDisposition;
use crate::onboarding::progress::OnboardingProgress;
use crate::steps::progress::{ProgressSummary, aggregate};
use crate::steps::rules::{
    ListingChecklist, StepEvaluation, StepId, VehicleChecklist, evaluate_all,
};
use crate::steps::snapshot::{HostSnapshot, SourceFreshness};

/// A step evaluation plus whether the sources it reads are stale.
#[derive(Debug, Clone, Serialize)]
pub struct StepStatusView {
    #[serde(flatten)]
    pub evaluation: StepEvaluation,
    /// A source this step reads failed its last fetch; the status reflects
    /// the prior snapshot, not confirmed-current facts.
    pub stale: bool,
}

struct CachedSnapshot {
    snapshot: HostSnapshot,
    generation: u64,
}

/// The host onboarding & rate-negotiation engine.
pub struct HostEngine {
    config: EngineConfig,
    collaborators: Collaborators,
    snapshots: RwLock<HashMap<String, CachedSnapshot>>,
    refresh_counter: AtomicU64,
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<NegotiationSession>>>>,
    checklist: ListingChecklist,
}

impl HostEngine {
    pub fn new(config: EngineConfig, collaborators: Collaborators) -> Self {
        Self {
            config,
            collaborators,
            snapshots: RwLock::new(HashMap::new()),
            refresh_counter: AtomicU64::new(0),
            sessions: RwLock::new(HashMap::new()),
            checklist: ListingChecklist::new(),
        }
    }

    // ── Snapshot ingestion ──────────────────────────────────────────

    /// Refresh a host's snapshot from all four sources.
    ///
    /// Sources are fetched concurrently; a failed source keeps its prior
    /// value and is marked stale rather than read as incomplete. Returns the
    /// authoritative snapshot after ingestion, which may be a newer one than
    /// this refresh produced if another refresh completed in between.
    pub async fn refresh(&self, host_id: &str) -> Result<HostSnapshot> {
        let generation = self.refresh_counter.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(host = host_id, generation, "Refreshing host snapshot");

        let base = {
            let snapshots = self.snapshots.read().await;
            snapshots.get(host_id).map(|c| c.snapshot.clone())
        };
        let had_prior = base.is_some();
        let mut next = base.unwrap_or_else(|| HostSnapshot::empty(host_id));

        let (profile, vehicles, insurance, payout) = futures::join!(
            self.collaborators.directory.fetch_profile(host_id),
            self.collaborators.fleet.fetch_vehicles(host_id),
            self.collaborators.insurance.fetch_tier(host_id),
            self.collaborators.payout.fetch_status(host_id),
        );

        let mut freshness = SourceFreshness::default();
        let mut first_error: Option<UpstreamError> = None;
        let mut track = |err: UpstreamError, flag: &mut bool, source: &str| {
            warn!(host = host_id, source, %err, "Source fetch failed; keeping prior value");
            *flag = false;
            if first_error.is_none() {
                first_error = Some(err);
            }
        };

        match profile {
            Ok(p) => next.profile = p,
            Err(e) => track(e, &mut freshness.profile, "host-directory"),
        }
        match vehicles {
            Ok(v) => next.vehicles = v,
            Err(e) => track(e, &mut freshness.vehicles, "fleet"),
        }
        match insurance {
            Ok(t) => next.insurance = t,
            Err(e) => track(e, &mut freshness.insurance, "insurance"),
        }
        match payout {
            Ok(connected) => next.payout_connected = connected,
            Err(e) => track(e, &mut freshness.payout, "payout"),
        }

        if let Some(err) = first_error {
            // Nothing fetched and nothing to fall back on: surface the failure.
            if !had_prior && !freshness.profile && !freshness.vehicles
                && !freshness.insurance && !freshness.payout
            {
                return Err(err.into());
            }
        }

        next.freshness = freshness;
        next.fetched_at = Utc::now();

        Ok(self.apply_snapshot(host_id, generation, next).await)
    }

    /// Ingest a refreshed snapshot, discarding it if a newer generation has
    /// already been applied. Returns the authoritative snapshot.
    async fn apply_snapshot(
        &self,
        host_id: &str,
        generation: u64,
        snapshot: HostSnapshot,
    ) -> HostSnapshot {
        let mut snapshots = self.snapshots.write().await;
        match snapshots.get(host_id) {
            Some(existing) if existing.generation > generation => {
                debug!(
                    host = host_id,
                    stale = generation,
                    applied = existing.generation,
                    "Discarding stale in-flight refresh"
                );
                existing.snapshot.clone()
            }
            _ => {
                snapshots.insert(
                    host_id.to_string(),
                    CachedSnapshot {
                        snapshot: snapshot.clone(),
                        generation,
                    },
                );
                snapshot
            }
        }
    }

    async fn snapshot_or_refresh(&self, host_id: &str) -> Result<HostSnapshot> {
        {
            let snapshots = self.snapshots.read().await;
            if let Some(cached) = snapshots.get(host_id) {
                return Ok(cached.snapshot.clone());
            }
        }
        self.refresh(host_id).await
    }

    // ── Step queries ────────────────────────────────────────────────

    /// Evaluate all verification steps for a host.
    pub async fn step_statuses(&self, host_id: &str) -> Result<Vec<StepStatusView>> {
        let snapshot = self.snapshot_or_refresh(host_id).await?;
        Ok(evaluate_all(&snapshot)
            .into_iter()
            .map(|evaluation| StepStatusView {
                stale: step_is_stale(evaluation.step, &snapshot.freshness),
                evaluation,
            })
            .collect())
    }

    /// Aggregate progress and the next actionable step for a host.
    pub async fn progress(&self, host_id: &str) -> Result<ProgressSummary> {
        let snapshot = self.snapshot_or_refresh(host_id).await?;
        Ok(aggregate(&evaluate_all(&snapshot)))
    }

    /// Dashboard listing checklist — the stricter completeness definition.
    pub async fn listing_checklist(&self, host_id: &str) -> Result<Vec<VehicleChecklist>> {
        let snapshot = self.snapshot_or_refresh(host_id).await?;
        Ok(self.checklist.review(&snapshot.vehicles))
    }

    /// Gate for opening a step's flow in the dashboard. A locked step is
    /// rejected with its blocking dependency named — never silently ignored.
    pub async fn open_step(&self, host_id: &str, step: StepId) -> Result<StepStatusView> {
        let snapshot = self.snapshot_or_refresh(host_id).await?;
        let evaluation = crate::steps::rules::evaluate(step, &snapshot);
        if evaluation.status.is_locked() {
            return Err(LockedError {
                step,
                // Payout is the only dependent step today; its gate is
                // identity verification.
                blocked_on: StepId::Identity,
            }
            .into());
        }
        Ok(StepStatusView {
            stale: step_is_stale(step, &snapshot.freshness),
            evaluation,
        })
    }

    // ── Negotiation lifecycle ───────────────────────────────────────

    /// Assign a booking offer to a host, superseding any prior session for
    /// the same request (its ticker is dropped and aborted).
    pub async fn assign_offer(&self, host_id: &str, offer: BookingOffer) {
        let request_id = offer.request_id;
        let session = NegotiationSession::assign(host_id, offer, self.config.clone());
        let mut sessions = self.sessions.write().await;
        if sessions
            .insert(request_id, Arc::new(Mutex::new(session)))
            .is_some()
        {
            info!(%request_id, "Superseded existing negotiation session");
        }
    }

    async fn session(&self, request_id: Uuid) -> Result<Arc<Mutex<NegotiationSession>>> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&request_id)
            .cloned()
            .ok_or_else(|| ConflictError::UnknownRequest { request_id }.into())
    }

    /// Read model for one negotiation: phase, countdown, earnings, wizard
    /// progress. Also applies the automatic expiry transition when due.
    pub async fn negotiation_view(&self, request_id: Uuid) -> Result<NegotiationView> {
        let session = self.session(request_id).await?;
        let mut session = session.lock().await;
        Ok(session.view())
    }

    /// Live countdown feed for one negotiation.
    pub async fn expiry_feed(&self, request_id: Uuid) -> Result<watch::Receiver<TimeRemaining>> {
        let session = self.session(request_id).await?;
        let session = session.lock().await;
        Ok(session.expiry_feed())
    }

    /// Submit a counter-offer for review.
    pub async fn submit_counter_offer(
        &self,
        request_id: Uuid,
        amount: Decimal,
        note: Option<String>,
    ) -> Result<()> {
        let session = self.session(request_id).await?;
        let mut session = session.lock().await;
        session
            .submit_counter(self.collaborators.desk.as_ref(), amount, note)
            .await
    }

    /// Apply the reviewer's counter-offer decision.
    pub async fn resolve_counter_offer(&self, request_id: Uuid, approved: bool) -> Result<()> {
        let session = self.session(request_id).await?;
        let mut session = session.lock().await;
        session.resolve_counter(approved)
    }

    /// Decline the booking request. With
    /// [`DeclineDisposition::RemoveAccount`] the host's cached snapshot is
    /// evicted too; the upstream desk removes the record itself.
    pub async fn decline(
        &self,
        request_id: Uuid,
        disposition: DeclineDisposition,
        reason: Option<String>,
    ) -> Result<()> {
        let session = self.session(request_id).await?;
        let mut session = session.lock().await;
        session
            .decline(self.collaborators.desk.as_ref(), disposition, reason)
            .await?;

        if disposition == DeclineDisposition::RemoveAccount {
            let host_id = session.host_id().to_string();
            drop(session);
            self.snapshots.write().await.remove(&host_id);
            info!(host = %host_id, "Host record removed after decline");
        }
        Ok(())
    }

    /// Accept the offer and begin (or resume) onboarding.
    pub async fn start_onboarding(&self, request_id: Uuid) -> Result<()> {
        let session = self.session(request_id).await?;
        let mut session = session.lock().await;
        session
            .start_onboarding(self.collaborators.desk.as_ref())
            .await
    }

    /// Upload a batch of onboarding photos. Returns the new photo count.
    pub async fn add_photos(&self, request_id: Uuid, references: Vec<String>) -> Result<usize> {
        let session = self.session(request_id).await?;
        let mut session = session.lock().await;
        session.add_photos(references)
    }

    /// Remove an onboarding photo. Returns the new photo count.
    pub async fn remove_photo(&self, request_id: Uuid, reference: &str) -> Result<usize> {
        let session = self.session(request_id).await?;
        let mut session = session.lock().await;
        session.remove_photo(reference)
    }

    /// Mark the photo task complete (validates the minimum count).
    pub async fn complete_photos(&self, request_id: Uuid) -> Result<OnboardingProgress> {
        let session = self.session(request_id).await?;
        let mut session = session.lock().await;
        session.complete_photos()
    }

    /// Confirm the daily rate (`None` accepts the prefill).
    pub async fn confirm_rate(&self, request_id: Uuid, rate: Option<Decimal>) -> Result<Decimal> {
        let session = self.session(request_id).await?;
        let mut session = session.lock().await;
        session.confirm_rate(rate)
    }

    /// Re-check the payout connection with the gateway.
    pub async fn refresh_payout(&self, request_id: Uuid) -> Result<bool> {
        let session = self.session(request_id).await?;
        let mut session = session.lock().await;
        session
            .refresh_payout(self.collaborators.payout.as_ref())
            .await
    }

    /// Finalize a fully-onboarded negotiation into an accepted booking.
    pub async fn finalize_onboarding(&self, request_id: Uuid) -> Result<()> {
        let session = self.session(request_id).await?;
        let mut session = session.lock().await;
        session.finalize(self.collaborators.desk.as_ref()).await
    }

    /// Wizard progress for one negotiation (derived, never stored).
    pub async fn onboarding_progress(&self, request_id: Uuid) -> Result<OnboardingProgress> {
        Ok(self.negotiation_view(request_id).await?.onboarding)
    }

    /// Drop every session, stopping its expiry ticker. Called on shutdown.
    pub async fn shutdown(&self) {
        let mut sessions = self.sessions.write().await;
        sessions.clear();
        info!("Engine shut down; all expiry tickers stopped");
    }
}

fn step_is_stale(step: StepId, freshness: &SourceFreshness) -> bool {
    match step {
        StepId::Profile | StepId::Identity => !freshness.profile,
        StepId::Listing => !freshness.vehicles,
        // Payout reads the payout gateway and, for its lock dependency,
        // the identity facts on the profile.
        StepId::Payout => !freshness.payout || !freshness.profile,
        StepId::Insurance => !freshness.insurance,
    }
}
