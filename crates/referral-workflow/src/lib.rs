//! Referral-driven onboarding workflow.
//!
//! Three stateless stages, each triggered independently:
//! - `ReferralDispatcher` sends the invitation when a referral record is created
//! - `SignupGate` validates a sign-up and redeems its referral code
//! - `SignupFinalizer` welcomes a confirmed user and links the referrer
//!
//! Collaborators are injected as trait objects. The only shared state
//! between stages is the `ReferralStore`.

mod dispatcher;
mod error;
mod events;
mod finalizer;
mod gate;

pub use dispatcher::{DispatchSummary, ReferralDispatcher};
pub use error::{
    DispatchError, FinalizeError, RejectReason, SignupError, ValidationError, ValidationFailure,
};
pub use events::*;
pub use finalizer::{FinalizeOutcome, SignupFinalizer};
pub use gate::{SignupAttempt, SignupGate};
