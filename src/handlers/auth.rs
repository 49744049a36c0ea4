use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    app_state::AppState,
    auth::{LoginOutcome, ResetOutcome},
    db::models::{CustomerDetails, CustomerId, CustomerProfile},
    error::{AppError, AppResult},
};

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub status: String,
    pub message: String,
}

fn message(text: &str) -> Json<MessageResponse> {
    Json(MessageResponse {
        status: "OK".to_string(),
        message: text.to_string(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    customer_id: CustomerId,
    password: String,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<MessageResponse>> {
    let text = match state.auth.login(req.customer_id, &req.password).await? {
        LoginOutcome::FirstLogin => "First login, change password required",
        LoginOutcome::LoggedIn => "Customer logged in successfully!",
    };
    Ok(message(text))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    new_password: String,
}

/// PUT /api/customers/{customer_id}/password
pub async fn update_password(
    Path(customer_id): Path<CustomerId>,
    State(state): State<AppState>,
    Json(req): Json<UpdatePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    state.auth.update_password(customer_id, &req.new_password).await?;
    Ok(message("Password updated successfully, please login again"))
}

/// GET /api/customers/{customer_id}
pub async fn get_customer(
    Path(customer_id): Path<CustomerId>,
    State(state): State<AppState>,
) -> AppResult<Json<CustomerProfile>> {
    Ok(Json(state.auth.get_customer(customer_id).await?))
}

/// POST /api/customers
pub async fn create_customer(
    State(state): State<AppState>,
    Json(details): Json<Option<CustomerDetails>>,
) -> AppResult<Json<CustomerProfile>> {
    let details = details.ok_or_else(|| AppError::bad_request("Customer profile cannot be null"))?;
    Ok(Json(state.auth.create_customer(&details).await?))
}

/// PUT /api/customers/{customer_id}
pub async fn update_customer(
    Path(customer_id): Path<CustomerId>,
    State(state): State<AppState>,
    Json(details): Json<Option<CustomerDetails>>,
) -> AppResult<Json<CustomerProfile>> {
    let details = details.ok_or_else(|| AppError::bad_request("Customer profile cannot be null"))?;
    Ok(Json(state.auth.update_customer(customer_id, &details).await?))
}

#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    email: String,
}

#[derive(Debug, Serialize)]
pub struct SentResponse {
    pub sent: bool,
}

/// POST /api/auth/otp
pub async fn send_otp(
    State(state): State<AppState>,
    Json(req): Json<SendOtpRequest>,
) -> AppResult<Json<SentResponse>> {
    let sent = state.auth.issue(&req.email).await?;
    Ok(Json(SentResponse { sent }))
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    email: String,
    otp: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
}

/// POST /api/auth/otp/verify
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(req): Json<VerifyOtpRequest>,
) -> AppResult<Json<VerifyResponse>> {
    let valid = state.auth.verify(&req.email, &req.otp).await?;
    Ok(Json(VerifyResponse { valid }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    email: String,
    otp: String,
    new_password: String,
}

/// POST /api/auth/password-reset
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    match state
        .auth
        .reset(&req.email, &req.otp, &req.new_password)
        .await?
    {
        ResetOutcome::Applied => Ok(message("Password reset successfully")),
        ResetOutcome::VerificationFailed => Err(AppError::Unverified),
        ResetOutcome::ProfileNotFound => Err(AppError::not_found("Customer not found")),
    }
}
