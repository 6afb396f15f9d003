//! External collaborators — trait contracts and the HTTP client that
//! implements them against the platform's internal API.

pub mod http;
pub mod traits;

use std::sync::Arc;

pub use http::PlatformClient;
pub use traits::{BookingDesk, FleetService, HostDirectory, InsuranceService, PayoutGateway};

/// Bundle of collaborator handles the engine is constructed with.
#[derive(Clone)]
pub struct Collaborators {
    pub directory: Arc<dyn HostDirectory>,
    pub fleet: Arc<dyn FleetService>,
    pub insurance: Arc<dyn InsuranceService>,
    pub payout: Arc<dyn PayoutGateway>,
    pub desk: Arc<dyn BookingDesk>,
}

impl Collaborators {
    /// Wire every contract to one [`PlatformClient`].
    pub fn from_platform(client: PlatformClient) -> Self {
        let client = Arc::new(client);
        Self {
            directory: client.clone(),
            fleet: client.clone(),
            insurance: client.clone(),
            payout: client.clone(),
            desk: client,
        }
    }
}
