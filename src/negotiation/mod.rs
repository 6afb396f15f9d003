//! Rate negotiation — the time-boxed protocol between a recruited host and
//! the platform over a booking request's daily rate.
//!
//! The phase machine in [`state`] is authoritative for what may happen
//! next; [`session`] wires it to the offer, the onboarding wizard, and the
//! expiry clock for one booking request.

pub mod clock;
pub mod offer;
pub mod session;
pub mod state;

pub use clock::{ExpiryTicker, TimeRemaining};
pub use offer::{BookingOffer, EarningsPreview};
pub use session::{NegotiationSession, NegotiationView};
pub use state::{CounterStatus, DeclineDisposition, NegotiationPhase, NegotiationState};
