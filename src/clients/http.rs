//! HTTP implementations of the collaborator contracts.
//!
//! One client for the platform's internal API. Authenticates with a bearer
//! token held in a `SecretString`; every call carries the client-level
//! timeout so no engine action can hang on a slow upstream.

use async_trait::async_trait;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::config::HttpConfig;
use crate::error::UpstreamError;
use crate::negotiation::state::DeclineDisposition;
use crate::steps::snapshot::{HostProfile, InsuranceTier, VehicleRecord};

use super::traits::{BookingDesk, FleetService, HostDirectory, InsuranceService, PayoutGateway};

/// Client for the platform's internal API.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    http: reqwest::Client,
    base_url: String,
    token: SecretString,
}

/// Desk response to a submission.
#[derive(Debug, Deserialize)]
struct SubmitOutcome {
    accepted: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Payout status payload.
#[derive(Debug, Deserialize)]
struct PayoutStatus {
    connected: bool,
}

/// Insurance selection payload.
#[derive(Debug, Deserialize)]
struct TierSelection {
    tier: Option<InsuranceTier>,
}

impl PlatformClient {
    pub fn new(config: &HttpConfig, token: SecretString) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .build()
            .map_err(|e| UpstreamError::RequestFailed {
                service: "platform".into(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            http,
            base_url: config.upstream_base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        service: &str,
        path: &str,
    ) -> Result<T, UpstreamError> {
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(|e| wrap_reqwest(service, e))?
            .error_for_status()
            .map_err(|e| wrap_reqwest(service, e))?;

        response
            .json::<T>()
            .await
            .map_err(|e| UpstreamError::InvalidResponse {
                service: service.to_string(),
                reason: e.to_string(),
            })
    }

    async fn post_submission(
        &self,
        service: &str,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<(), UpstreamError> {
        debug!(service, path, "Submitting to booking desk");
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(self.token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| wrap_reqwest(service, e))?
            .error_for_status()
            .map_err(|e| wrap_reqwest(service, e))?;

        let outcome: SubmitOutcome =
            response
                .json()
                .await
                .map_err(|e| UpstreamError::InvalidResponse {
                    service: service.to_string(),
                    reason: e.to_string(),
                })?;

        if outcome.accepted {
            Ok(())
        } else {
            Err(UpstreamError::Rejected {
                service: service.to_string(),
                reason: outcome.error.unwrap_or_else(|| "not accepted".to_string()),
            })
        }
    }
}

fn wrap_reqwest(service: &str, err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Timeout {
            service: service.to_string(),
        }
    } else {
        UpstreamError::RequestFailed {
            service: service.to_string(),
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl HostDirectory for PlatformClient {
    async fn fetch_profile(&self, host_id: &str) -> Result<HostProfile, UpstreamError> {
        self.get_json("host-directory", &format!("/internal/hosts/{host_id}/profile"))
            .await
    }
}

#[async_trait]
impl FleetService for PlatformClient {
    async fn fetch_vehicles(&self, host_id: &str) -> Result<Vec<VehicleRecord>, UpstreamError> {
        self.get_json("fleet", &format!("/internal/hosts/{host_id}/vehicles"))
            .await
    }
}

#[async_trait]
impl InsuranceService for PlatformClient {
    async fn fetch_tier(&self, host_id: &str) -> Result<Option<InsuranceTier>, UpstreamError> {
        let selection: TierSelection = self
            .get_json("insurance", &format!("/internal/hosts/{host_id}/insurance"))
            .await?;
        Ok(selection.tier)
    }
}

#[async_trait]
impl PayoutGateway for PlatformClient {
    async fn fetch_status(&self, host_id: &str) -> Result<bool, UpstreamError> {
        let status: PayoutStatus = self
            .get_json("payout", &format!("/internal/hosts/{host_id}/payout"))
            .await?;
        Ok(status.connected)
    }
}

#[async_trait]
impl BookingDesk for PlatformClient {
    async fn submit_counter_offer(
        &self,
        request_id: Uuid,
        amount: Decimal,
        note: Option<&str>,
    ) -> Result<(), UpstreamError> {
        self.post_submission(
            "booking-desk",
            &format!("/internal/requests/{request_id}/counter-offer"),
            &serde_json::json!({ "amount": amount, "note": note }),
        )
        .await
    }

    async fn submit_decline(
        &self,
        request_id: Uuid,
        disposition: DeclineDisposition,
        reason: Option<&str>,
    ) -> Result<(), UpstreamError> {
        self.post_submission(
            "booking-desk",
            &format!("/internal/requests/{request_id}/decline"),
            &serde_json::json!({ "disposition": disposition, "reason": reason }),
        )
        .await
    }

    async fn start_onboarding(&self, request_id: Uuid) -> Result<(), UpstreamError> {
        self.post_submission(
            "booking-desk",
            &format!("/internal/requests/{request_id}/onboarding/start"),
            &serde_json::json!({}),
        )
        .await
    }

    async fn finalize_onboarding(&self, request_id: Uuid) -> Result<(), UpstreamError> {
        self.post_submission(
            "booking-desk",
            &format!("/internal/requests/{request_id}/onboarding/finalize"),
            &serde_json::json!({}),
        )
        .await
    }
}
