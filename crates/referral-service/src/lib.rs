//! Referral service: HTTP host for the onboarding triggers.
//!
//! Exposes the three workflow stages as webhook endpoints, plus a small
//! referral issuing API whose inserts feed the dispatcher through an
//! in-process change feed.

pub mod api;
pub mod config;
pub mod error;
pub mod feed;

pub use config::Config;
pub use error::ServiceError;
pub use feed::ChangeFeed;
