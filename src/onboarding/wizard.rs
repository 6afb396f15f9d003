//! Onboarding wizard controller.
//!
//! Three ordered tasks — photos, rate, payout — each idempotent on
//! re-entry. The controller holds the raw facts (photo references, confirmed
//! rate, observed payout state) and derives everything else through
//! [`OnboardingProgress`]; there is no stored "current step" pointer.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::ValidationError;
use crate::onboarding::progress::{OnboardingProgress, WizardTask};

/// Wizard state for one negotiation's onboarding flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardController {
    /// Uploaded photo references, in submission order.
    photos: Vec<String>,
    /// Daily rate the host confirmed, once the rate task is done.
    confirmed_rate: Option<Decimal>,
    /// Last observed payout-connection result.
    payout_connected: bool,
    min_photos: usize,
    max_photos: usize,
}

impl WizardController {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            photos: Vec::new(),
            confirmed_rate: None,
            payout_connected: false,
            min_photos: config.min_photos,
            max_photos: config.max_photos,
        }
    }

    /// Add a batch of photo references.
    ///
    /// References already present are skipped (re-submitting a batch is a
    /// no-op, not an error). The capacity check runs against the deduplicated
    /// total and rejects the whole batch — no partial acceptance.
    pub fn add_photos(
        &mut self,
        references: Vec<String>,
    ) -> Result<usize, ValidationError> {
        let fresh: Vec<String> = references
            .into_iter()
            .filter(|r| !self.photos.contains(r))
            .collect();

        if self.photos.len() + fresh.len() > self.max_photos {
            return Err(ValidationError::PhotoCapacity {
                uploaded: self.photos.len(),
                submitted: fresh.len(),
                capacity: self.max_photos,
            });
        }

        self.photos.extend(fresh);
        debug!(count = self.photos.len(), "Photos updated");
        Ok(self.photos.len())
    }

    /// Remove a previously uploaded photo. Permitted before completion and
    /// does not touch the other tasks.
    pub fn remove_photo(&mut self, reference: &str) -> Result<usize, ValidationError> {
        let before = self.photos.len();
        self.photos.retain(|r| r != reference);
        if self.photos.len() == before {
            return Err(ValidationError::UnknownPhoto {
                reference: reference.to_string(),
            });
        }
        Ok(self.photos.len())
    }

    /// Confirm the daily rate. Must be positive; the caller supplies the
    /// default (approved counter-offer if one exists, else the original
    /// offered rate) when the host accepts the prefill.
    pub fn confirm_rate(&mut self, rate: Decimal) -> Result<(), ValidationError> {
        if rate <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveRate { rate });
        }
        self.confirmed_rate = Some(rate);
        Ok(())
    }

    /// Record the payout-connection result observed from the payout
    /// collaborator. The wizard never drives the connection flow itself.
    pub fn set_payout_connected(&mut self, connected: bool) {
        self.payout_connected = connected;
    }

    pub fn photos(&self) -> &[String] {
        &self.photos
    }

    pub fn confirmed_rate(&self) -> Option<Decimal> {
        self.confirmed_rate
    }

    /// Derive the progress view from the current facts.
    pub fn progress(&self) -> OnboardingProgress {
        OnboardingProgress::derive(
            self.photos.len() >= self.min_photos,
            self.confirmed_rate.is_some(),
            self.payout_connected,
        )
    }

    /// Where the wizard resumes on reopen: always the first incomplete task.
    pub fn resume_at(&self) -> Option<WizardTask> {
        self.progress().next_task
    }

    /// All three tasks report complete.
    pub fn is_complete(&self) -> bool {
        self.progress().is_complete()
    }

    /// Names of the incomplete tasks, for finalize rejections.
    pub fn missing_tasks(&self) -> String {
        let progress = self.progress();
        let mut missing = Vec::new();
        if !progress.photos_uploaded {
            missing.push(format!(
                "photos ({}/{} uploaded)",
                self.photos.len(),
                self.min_photos
            ));
        }
        if !progress.rate_configured {
            missing.push("rate".to_string());
        }
        if !progress.payout_connected {
            missing.push("payout".to_string());
        }
        missing.join(", ")
    }
}
