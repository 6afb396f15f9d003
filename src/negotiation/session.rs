//! One negotiation session — offer, state machine, wizard, and expiry
//! ticker for a single (host, booking request) pair.
//!
//! Every action runs the same gauntlet: terminal-state checks first, then
//! the expiry clock (expiry always wins, even over an action that arrived a
//! moment before the deadline), then the action's own validity. Collaborator
//! submits happen before any local transition, so a failed submit leaves
//! state exactly as it was.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::clients::traits::{BookingDesk, PayoutGateway};
use crate::config::EngineConfig;
use crate::error::{ConflictError, EngineError, ExpiredError, Result, ValidationError};
use crate::negotiation::clock::{ExpiryTicker, TimeRemaining};
use crate::negotiation::offer::{BookingOffer, EarningsPreview};
use crate::negotiation::state::{
    CounterStatus, DeclineDisposition, NegotiationPhase, NegotiationState,
};
use crate::onboarding::progress::OnboardingProgress;
use crate::onboarding::wizard::WizardController;

/// Read model returned to dashboards and the wizard UI.
#[derive(Debug, Clone, Serialize)]
pub struct NegotiationView {
    pub request_id: Uuid,
    pub host_id: String,
    pub phase: NegotiationPhase,
    pub time_remaining: TimeRemaining,
    pub earnings: EarningsPreview,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counter_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counter_status: Option<CounterStatus>,
    pub onboarding: OnboardingProgress,
}

/// Live negotiation for one booking request assigned to one host.
pub struct NegotiationSession {
    host_id: String,
    offer: BookingOffer,
    state: NegotiationState,
    wizard: WizardController,
    ticker: ExpiryTicker,
    config: EngineConfig,
}

impl NegotiationSession {
    /// Assign an offer to a host, starting the expiry countdown.
    pub fn assign(host_id: impl Into<String>, offer: BookingOffer, config: EngineConfig) -> Self {
        let ticker = ExpiryTicker::spawn(
            offer.request_id,
            offer.expires_at,
            config.tick_interval,
            config.expiring_soon,
        );
        let host_id = host_id.into();
        info!(request_id = %offer.request_id, host = %host_id, "Offer assigned");
        Self {
            host_id,
            wizard: WizardController::new(&config),
            state: NegotiationState::new(),
            offer,
            ticker,
            config,
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.offer.request_id
    }

    pub fn host_id(&self) -> &str {
        &self.host_id
    }

    pub fn phase(&self) -> NegotiationPhase {
        self.state.phase
    }

    pub fn offer(&self) -> &BookingOffer {
        &self.offer
    }

    /// Live countdown feed for push-style consumers. The feed publishes a
    /// final expired value and then goes quiet.
    pub fn expiry_feed(&self) -> tokio::sync::watch::Receiver<TimeRemaining> {
        self.ticker.subscribe()
    }

    /// The authoritative daily rate: the approved counter-offer when one
    /// exists, otherwise the original offered rate.
    pub fn effective_rate(&self) -> Decimal {
        match (self.state.counter_status, self.state.counter_amount) {
            (Some(CounterStatus::Approved), Some(amount)) => amount,
            _ => self.offer.daily_rate,
        }
    }

    /// Earnings at the rate currently on the table.
    pub fn earnings_preview(&self) -> EarningsPreview {
        let rate = self
            .wizard
            .confirmed_rate()
            .unwrap_or_else(|| self.effective_rate());
        EarningsPreview::compute(rate, self.offer.duration_days, self.config.platform_fee_ratio)
    }

    /// Countdown reading, plus the automatic transition to `Expired` when
    /// the deadline has passed. Reads go through here too, so an expired
    /// request shows its terminal phase without waiting for a user action.
    pub fn poll_expiry(&mut self) -> TimeRemaining {
        let remaining = TimeRemaining::until_with_threshold(
            self.offer.expires_at,
            Utc::now(),
            self.config.expiring_soon,
        );
        if remaining.expired && !self.state.phase.is_terminal() {
            // Cannot fail: every non-terminal phase may expire.
            let _ = self
                .state
                .transition_to(NegotiationPhase::Expired, Some("Deadline passed".into()));
            self.ticker.stop();
            info!(request_id = %self.offer.request_id, "Negotiation expired");
        }
        remaining
    }

    /// Full read model for consumers.
    pub fn view(&mut self) -> NegotiationView {
        let time_remaining = self.poll_expiry();
        NegotiationView {
            request_id: self.offer.request_id,
            host_id: self.host_id.clone(),
            phase: self.state.phase,
            time_remaining,
            earnings: self.earnings_preview(),
            counter_amount: self.state.counter_amount,
            counter_status: self.state.counter_status,
            onboarding: self.wizard.progress(),
        }
    }

    /// Gate shared by every action: terminal phases answer with their
    /// terminal error, and expiry is checked before anything else is
    /// considered.
    fn ensure_actionable(&mut self) -> Result<()> {
        match self.state.phase {
            NegotiationPhase::Expired => Err(ExpiredError {
                request_id: self.offer.request_id,
            }
            .into()),
            NegotiationPhase::Declined => Err(ConflictError::AlreadyDeclined {
                request_id: self.offer.request_id,
            }
            .into()),
            NegotiationPhase::OnboardingComplete => Err(ConflictError::AlreadyResolved {
                request_id: self.offer.request_id,
                phase: self.state.phase.to_string(),
            }
            .into()),
            _ => {
                if self.poll_expiry().expired {
                    return Err(ExpiredError {
                        request_id: self.offer.request_id,
                    }
                    .into());
                }
                Ok(())
            }
        }
    }

    fn illegal(&self, action: &str) -> EngineError {
        ConflictError::IllegalTransition {
            action: action.to_string(),
            phase: self.state.phase.to_string(),
        }
        .into()
    }

    // ── Negotiation actions ─────────────────────────────────────────

    /// Submit a counter-offer. The amount must lie within the configured
    /// band around the offered rate, inclusive at both ends.
    pub async fn submit_counter(
        &mut self,
        desk: &dyn BookingDesk,
        amount: Decimal,
        note: Option<String>,
    ) -> Result<()> {
        self.ensure_actionable()?;
        match self.state.phase {
            NegotiationPhase::Offered => {}
            NegotiationPhase::CounterPending => {
                return Err(ConflictError::CounterAlreadyPending.into());
            }
            _ => return Err(self.illegal("submit a counter-offer")),
        }

        let floor = self.offer.daily_rate * self.config.counter_floor_ratio;
        let ceiling = self.offer.daily_rate * self.config.counter_ceiling_ratio;
        if amount < floor || amount > ceiling {
            return Err(ValidationError::CounterOutOfBand {
                amount,
                offered: self.offer.daily_rate,
                floor,
                ceiling,
            }
            .into());
        }

        desk.submit_counter_offer(self.offer.request_id, amount, note.as_deref())
            .await?;
        self.state.record_counter(amount, note)?;
        info!(request_id = %self.offer.request_id, %amount, "Counter-offer submitted");
        Ok(())
    }

    /// Apply the reviewer's decision on the pending counter-offer.
    ///
    /// Approval makes the counter amount the authoritative rate and moves
    /// straight into onboarding; rejection returns to `Offered` with the
    /// original rate intact, and the host may counter again or proceed at
    /// the original rate.
    pub fn resolve_counter(&mut self, approved: bool) -> Result<()> {
        self.ensure_actionable()?;
        if self.state.phase != NegotiationPhase::CounterPending || !self.state.counter_pending() {
            return Err(self.illegal("resolve a counter-offer"));
        }

        if approved {
            self.state.counter_status = Some(CounterStatus::Approved);
            self.state.transition_to(
                NegotiationPhase::OnboardingInProgress,
                Some("Counter-offer approved".into()),
            )?;
            info!(
                request_id = %self.offer.request_id,
                rate = %self.effective_rate(),
                "Counter-offer approved; onboarding started"
            );
        } else {
            self.state.counter_status = Some(CounterStatus::Rejected);
            self.state.transition_to(
                NegotiationPhase::Offered,
                Some("Counter-offer rejected; original rate stands".into()),
            )?;
            info!(request_id = %self.offer.request_id, "Counter-offer rejected");
        }
        Ok(())
    }

    /// Decline the booking request with an explicit disposition.
    pub async fn decline(
        &mut self,
        desk: &dyn BookingDesk,
        disposition: DeclineDisposition,
        reason: Option<String>,
    ) -> Result<()> {
        self.ensure_actionable()?;

        desk.submit_decline(self.offer.request_id, disposition, reason.as_deref())
            .await?;
        self.state.transition_to(
            NegotiationPhase::Declined,
            Some(format!("Declined ({disposition})")),
        )?;
        self.state.decline_disposition = Some(disposition);
        self.ticker.stop();
        info!(
            request_id = %self.offer.request_id,
            %disposition,
            "Booking request declined"
        );
        Ok(())
    }

    // ── Onboarding actions ──────────────────────────────────────────

    /// Accept the offer and begin onboarding. Re-entering an onboarding
    /// already in progress is a no-op; the wizard resumes from its derived
    /// position.
    pub async fn start_onboarding(&mut self, desk: &dyn BookingDesk) -> Result<()> {
        self.ensure_actionable()?;
        if self.state.counter_pending() {
            return Err(ConflictError::OnboardingBlockedByCounter.into());
        }
        match self.state.phase {
            NegotiationPhase::OnboardingInProgress => Ok(()),
            NegotiationPhase::Offered => {
                desk.start_onboarding(self.offer.request_id).await?;
                self.state.transition_to(
                    NegotiationPhase::OnboardingInProgress,
                    Some(format!("Accepted at {}", self.effective_rate())),
                )?;
                info!(request_id = %self.offer.request_id, "Onboarding started");
                Ok(())
            }
            _ => Err(self.illegal("start onboarding")),
        }
    }

    fn ensure_onboarding(&mut self, action: &str) -> Result<()> {
        self.ensure_actionable()?;
        if self.state.counter_pending() {
            return Err(ConflictError::OnboardingBlockedByCounter.into());
        }
        if self.state.phase != NegotiationPhase::OnboardingInProgress {
            return Err(self.illegal(action));
        }
        Ok(())
    }

    /// Upload a batch of vehicle photos for the onboarding listing.
    pub fn add_photos(&mut self, references: Vec<String>) -> Result<usize> {
        self.ensure_onboarding("upload photos")?;
        Ok(self.wizard.add_photos(references)?)
    }

    /// Remove a previously uploaded photo.
    pub fn remove_photo(&mut self, reference: &str) -> Result<usize> {
        self.ensure_onboarding("remove a photo")?;
        Ok(self.wizard.remove_photo(reference)?)
    }

    /// Mark the photo task done and move on. Rejected below the minimum;
    /// the uploaded photos stay in place either way.
    pub fn complete_photos(&mut self) -> Result<OnboardingProgress> {
        self.ensure_onboarding("complete the photo task")?;
        let progress = self.wizard.progress();
        if !progress.photos_uploaded {
            return Err(ValidationError::TooFewPhotos {
                uploaded: self.wizard.photos().len(),
                required: self.config.min_photos,
            }
            .into());
        }
        Ok(progress)
    }

    /// Confirm the daily rate. `None` accepts the prefill: the approved
    /// counter-offer amount if one exists, else the original offered rate.
    pub fn confirm_rate(&mut self, rate: Option<Decimal>) -> Result<Decimal> {
        self.ensure_onboarding("confirm the rate")?;
        let rate = rate.unwrap_or_else(|| self.effective_rate());
        self.wizard.confirm_rate(rate)?;
        Ok(rate)
    }

    /// Re-fetch payout status from the gateway and record the result.
    pub async fn refresh_payout(&mut self, gateway: &dyn PayoutGateway) -> Result<bool> {
        self.ensure_onboarding("check payout connection")?;
        let connected = gateway.fetch_status(&self.host_id).await?;
        self.wizard.set_payout_connected(connected);
        Ok(connected)
    }

    /// Finalize the negotiation. Only accepted with all three wizard tasks
    /// complete and the phase still `OnboardingInProgress`; completing the
    /// tasks never finalizes implicitly.
    pub async fn finalize(&mut self, desk: &dyn BookingDesk) -> Result<()> {
        self.ensure_onboarding("finalize onboarding")?;
        if !self.wizard.is_complete() {
            return Err(ConflictError::OnboardingIncomplete {
                missing: self.wizard.missing_tasks(),
            }
            .into());
        }

        desk.finalize_onboarding(self.offer.request_id).await?;
        self.state.transition_to(
            NegotiationPhase::OnboardingComplete,
            Some("Onboarding finalized".into()),
        )?;
        self.ticker.stop();
        info!(
            request_id = %self.offer.request_id,
            rate = %self.effective_rate(),
            "Booking accepted"
        );
        Ok(())
    }
}
