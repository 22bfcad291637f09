//! HTTP request handlers.
//!
//! Trigger endpoints accept the identity provider's event JSON and return the
//! (possibly mutated) event, mirroring the hook contract. A rejected sign-up
//! surfaces as 422 with the user-visible message in `error`.

use super::types::{CreateReferralRequest, HealthResponse, ReferralResponse};
use super::AppState;
use crate::error::ServiceError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use identity_client::normalize_phone_number;
use referral_store::{is_real_code, ReferralRecord};
use referral_workflow::{ChangeBatch, ChangeRecord, DispatchSummary, TriggerEvent};
use tracing::{info, warn};

pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ServiceError> {
    let referral_count = state.store.count().await?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        referral_count,
    }))
}

/// Pre-sign-up hook: validate the attempt and redeem its referral code.
pub async fn pre_sign_up(
    State(state): State<AppState>,
    Json(event): Json<TriggerEvent>,
) -> Result<Json<TriggerEvent>, ServiceError> {
    let event = state.gate.handle(event).await?;
    Ok(Json(event))
}

/// Post-confirmation hook: welcome the user and link the referrer.
pub async fn post_confirmation(
    State(state): State<AppState>,
    Json(event): Json<TriggerEvent>,
) -> Result<Json<TriggerEvent>, ServiceError> {
    let event = state.finalizer.handle(event).await?;
    Ok(Json(event))
}

/// Change stream hook: dispatch invitations for inserted referrals.
pub async fn referral_changes(
    State(state): State<AppState>,
    Json(batch): Json<ChangeBatch>,
) -> Result<Json<DispatchSummary>, ServiceError> {
    let summary = state.dispatcher.handle_batch(batch).await?;
    Ok(Json(summary))
}

/// Issue a referral. The invitation is sent asynchronously via the change feed.
pub async fn create_referral(
    State(state): State<AppState>,
    Json(request): Json<CreateReferralRequest>,
) -> Result<(StatusCode, Json<ReferralResponse>), ServiceError> {
    let phone_number =
        normalize_phone_number(&request.phone_number).map_err(ServiceError::InvalidPhoneNumber)?;

    let referral_code = request.referral_code.trim();
    if !is_real_code(referral_code) {
        return Err(ServiceError::InvalidReferralCode(referral_code.to_string()));
    }

    let record = ReferralRecord::new(phone_number, referral_code, request.principal_id);
    state.store.create(record.clone()).await?;

    info!(
        phone_number = %record.phone_number,
        principal_id = %record.principal_id,
        "Referral issued"
    );

    let batch = ChangeBatch {
        records: vec![ChangeRecord::insert(&record)],
    };
    if let Err(e) = state.feed.publish(batch).await {
        // The record exists; only the invitation is lost
        warn!(phone_number = %record.phone_number, "Invitation not queued: {}", e);
        return Err(e);
    }

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// Outstanding referral for a phone number.
pub async fn get_referral(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> Result<Json<ReferralResponse>, ServiceError> {
    let number = normalize_phone_number(&number).map_err(ServiceError::InvalidPhoneNumber)?;

    match state.store.query_by_phone(&number).await? {
        Some(record) => Ok(Json(record.into())),
        None => Err(ServiceError::NotFound(number)),
    }
}
