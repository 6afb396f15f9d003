//! Onboarding wizard — the three tasks between accepting an offer and a
//! finalized booking.
//!
//! The wizard sequences photo upload, rate confirmation, and payout
//! connection. Progress is a derived view over completion facts, so a
//! reopened wizard always lands on the first genuinely incomplete task even
//! if the previous run was interrupted mid-flow.

pub mod progress;
pub mod wizard;

pub use progress::{OnboardingProgress, WizardTask};
pub use wizard::WizardController;
