use std::net::SocketAddr;

use axum::Json;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;

use nightwatch_auth::{VerifyOutcome, timing_delay};
use nightwatch_core::phone::normalize_e164;
use nightwatch_core::{DomainError, MessageType, NewOutboxItem};

use crate::error::ApiResult;
use crate::state::AppState;

use super::schemas::{RegisterRequest, TokenResponse, VerifyRequest};

/// `POST /auth/register` -- starts the OTP flow. Creates the user record on
/// first contact (the very first user ever registered becomes admin, per
/// `Store::create_user`); never reveals whether the phone pre-existed.
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses((status = 200, description = "OTP issued"))
)]
pub async fn register(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let client_ip = addr.ip().to_string();
    let now = Utc::now();

    let (phone, code) = match state.otp.issue(&req.phone, &client_ip, now) {
        Ok(v) => v,
        Err(err) => {
            timing_delay().await;
            return Err(err.into());
        }
    };

    if state.store.get_user_by_phone(&phone).await?.is_none() {
        state.store.create_user(&phone, req.name.as_deref()).await?;
    }

    state
        .store
        .enqueue_outbox_item(NewOutboxItem::now(
            MessageType::OtpVerification,
            phone,
            serde_json::json!({ "otp": code }),
        ))
        .await?;

    Ok(StatusCode::OK)
}

/// `POST /auth/verify` -- exchanges a valid OTP for a bearer token. Every
/// failure mode (unregistered phone, wrong code, exhausted attempts)
/// responds identically, per §7's OTP enumeration resistance requirement.
#[utoipa::path(
    post,
    path = "/auth/verify",
    tag = "Auth",
    request_body = VerifyRequest,
    responses((status = 200, description = "Verified", body = TokenResponse))
)]
pub async fn verify(State(state): State<AppState>, Json(req): Json<VerifyRequest>) -> ApiResult<impl IntoResponse> {
    let now = Utc::now();
    match state.otp.verify(&req.phone, &req.code, now) {
        VerifyOutcome::Verified => {
            let phone = normalize_e164(&req.phone).ok_or(DomainError::AuthenticationFailed)?;
            let user = state
                .store
                .get_user_by_phone(&phone)
                .await?
                .ok_or(DomainError::AuthenticationFailed)?;
            let token = state.jwt.issue(&user)?;
            Ok(Json(TokenResponse { token, user: user.into() }))
        }
        VerifyOutcome::Failed => {
            timing_delay().await;
            Err(DomainError::AuthenticationFailed.into())
        }
    }
}
