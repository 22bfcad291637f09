//! HTTP API for the referral triggers.

mod handlers;
mod middleware;
mod types;

pub use handlers::*;
pub use middleware::{logging_middleware, rate_limit_middleware, RateLimitState};
pub use types::*;

use crate::feed::ChangeFeed;
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use referral_store::ReferralStore;
use referral_workflow::{ReferralDispatcher, SignupFinalizer, SignupGate};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReferralStore>,
    pub gate: Arc<SignupGate>,
    pub finalizer: Arc<SignupFinalizer>,
    pub dispatcher: Arc<ReferralDispatcher>,
    /// Feed for referrals issued through this service
    pub feed: ChangeFeed,
}

pub fn create_router(state: AppState) -> Router {
    create_router_with_rate_limit(state, RateLimitState::new(600))
}

pub fn create_router_with_rate_limit(state: AppState, rate_limit: RateLimitState) -> Router {
    let limited = Router::new()
        .route("/v1/triggers/pre-sign-up", post(handlers::pre_sign_up))
        .route(
            "/v1/triggers/post-confirmation",
            post(handlers::post_confirmation),
        )
        .route("/v1/streams/referrals", post(handlers::referral_changes))
        .route("/v1/referrals", post(handlers::create_referral))
        .route("/v1/referrals/:number", get(handlers::get_referral))
        .layer(axum_middleware::from_fn_with_state(
            rate_limit,
            rate_limit_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(limited)
        .layer(axum_middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
