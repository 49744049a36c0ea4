use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    app_state::AppState,
    db::models::{
        Account, AccountNumber, AccountRecord, CustomerId, Dashboard, DueSummary, NewTransaction,
        PaymentLimit, PaymentStatus, PaymentStatuses, Pin, Transaction,
    },
    error::{AppError, AppResult},
};

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

fn ok() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "OK".to_string(),
    })
}

/// POST /api/accounts
pub async fn create_account(
    State(state): State<AppState>,
    Json(record): Json<Option<AccountRecord>>,
) -> AppResult<Json<Account>> {
    let record = record.ok_or_else(|| AppError::illegal_argument("Customer card account data cannot be null"))?;
    Ok(Json(state.accounts.create_account(&record).await?))
}

/// PUT /api/accounts/{account_number}
pub async fn update_account(
    Path(account_number): Path<AccountNumber>,
    State(state): State<AppState>,
    Json(record): Json<Option<AccountRecord>>,
) -> AppResult<Json<Account>> {
    let record = record.ok_or_else(|| AppError::illegal_argument("Customer card account data cannot be null"))?;
    Ok(Json(state.accounts.update_account(account_number, &record).await?))
}

/// GET /api/accounts/{account_number}/dashboard
pub async fn dashboard(
    Path(account_number): Path<AccountNumber>,
    State(state): State<AppState>,
) -> AppResult<Json<Dashboard>> {
    Ok(Json(state.accounts.dashboard(account_number).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePinRequest {
    old_pin: Pin,
    new_pin: Pin,
}

/// PUT /api/accounts/{account_number}/pin
pub async fn change_pin(
    Path(account_number): Path<AccountNumber>,
    State(state): State<AppState>,
    Json(req): Json<ChangePinRequest>,
) -> AppResult<Json<StatusResponse>> {
    state
        .accounts
        .change_pin(account_number, &req.old_pin, &req.new_pin)
        .await?;
    Ok(ok())
}

/// GET /api/accounts/{account_number}/due
pub async fn due_summary(
    Path(account_number): Path<AccountNumber>,
    State(state): State<AppState>,
) -> AppResult<Json<DueSummary>> {
    Ok(Json(state.accounts.due_summary(account_number).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueAmountRequest {
    due_amount: Decimal,
}

/// PUT /api/accounts/{account_number}/due
pub async fn update_due_amount(
    Path(account_number): Path<AccountNumber>,
    State(state): State<AppState>,
    Json(req): Json<DueAmountRequest>,
) -> AppResult<Json<StatusResponse>> {
    state
        .accounts
        .update_due_amount(account_number, req.due_amount)
        .await?;
    Ok(ok())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayDueResponse {
    pub status: String,
    pub amount_paid: Decimal,
}

/// POST /api/accounts/{account_number}/pay-due
pub async fn pay_due(
    Path(account_number): Path<AccountNumber>,
    State(state): State<AppState>,
) -> AppResult<Json<PayDueResponse>> {
    let amount_paid = state.accounts.pay_due(account_number).await?;
    Ok(Json(PayDueResponse {
        status: "OK".to_string(),
        amount_paid,
    }))
}

/// GET /api/accounts/{account_number}/limits/{channel}
pub async fn payment_limit(
    Path((account_number, channel)): Path<(AccountNumber, String)>,
    State(state): State<AppState>,
) -> AppResult<Json<PaymentLimit>> {
    Ok(Json(state.accounts.payment_limit(account_number, &channel).await?))
}

#[derive(Debug, Deserialize)]
pub struct LimitRequest {
    limit: Decimal,
}

/// PUT /api/accounts/{account_number}/limits/{channel}
pub async fn update_transaction_limit(
    Path((account_number, channel)): Path<(AccountNumber, String)>,
    State(state): State<AppState>,
    Json(req): Json<LimitRequest>,
) -> AppResult<Json<StatusResponse>> {
    state
        .accounts
        .update_transaction_limit(account_number, &channel, req.limit)
        .await?;
    Ok(ok())
}

/// GET /api/accounts/{account_number}/payment-statuses
pub async fn payment_statuses(
    Path(account_number): Path<AccountNumber>,
    State(state): State<AppState>,
) -> AppResult<Json<PaymentStatuses>> {
    Ok(Json(state.accounts.payment_statuses(account_number).await?))
}

#[derive(Debug, Deserialize)]
pub struct PaymentStatusRequest {
    status: PaymentStatus,
}

/// PUT /api/accounts/{account_number}/payment-statuses/{channel}
pub async fn update_payment_status(
    Path((account_number, channel)): Path<(AccountNumber, String)>,
    State(state): State<AppState>,
    Json(req): Json<PaymentStatusRequest>,
) -> AppResult<Json<StatusResponse>> {
    state
        .accounts
        .update_payment_status(account_number, &channel, req.status)
        .await?;
    Ok(ok())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardTypeRequest {
    card_type: String,
}

/// PUT /api/accounts/{account_number}/card-type
pub async fn update_card_type(
    Path(account_number): Path<AccountNumber>,
    State(state): State<AppState>,
    Json(req): Json<CardTypeRequest>,
) -> AppResult<Json<StatusResponse>> {
    state
        .accounts
        .update_card_type(account_number, &req.card_type)
        .await?;
    Ok(ok())
}

/// POST /api/accounts/{account_number}/deactivate
pub async fn deactivate(
    Path(account_number): Path<AccountNumber>,
    State(state): State<AppState>,
) -> AppResult<Json<StatusResponse>> {
    state.accounts.deactivate(account_number).await?;
    Ok(ok())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditLimitResponse {
    pub credit_limit: Decimal,
}

/// GET /api/accounts/{account_number}/credit-limit
pub async fn credit_limit(
    Path(account_number): Path<AccountNumber>,
    State(state): State<AppState>,
) -> AppResult<Json<CreditLimitResponse>> {
    let credit_limit = state.accounts.credit_limit(account_number).await?;
    Ok(Json(CreditLimitResponse { credit_limit }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionQuery {
    start_date: NaiveDate,
    end_date: NaiveDate,
    #[serde(rename = "type")]
    transaction_type: String,
}

/// GET /api/accounts/{account_number}/transactions?startDate=&endDate=&type=
pub async fn transactions(
    Path(account_number): Path<AccountNumber>,
    Query(query): Query<TransactionQuery>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Transaction>>> {
    let found = state
        .accounts
        .filtered_transactions(query.start_date, query.end_date, &query.transaction_type, account_number)
        .await?;
    Ok(Json(found))
}

/// POST /api/transactions
pub async fn record_transaction(
    State(state): State<AppState>,
    Json(transaction): Json<NewTransaction>,
) -> AppResult<Json<Transaction>> {
    Ok(Json(state.accounts.record_transaction(&transaction).await?))
}

/// GET /api/customers/{customer_id}/accounts
pub async fn list_accounts(
    Path(customer_id): Path<CustomerId>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Account>>> {
    Ok(Json(state.accounts.list_accounts(customer_id).await?))
}

/// GET /api/customers/{customer_id}/accounts/active
pub async fn list_active_accounts(
    Path(customer_id): Path<CustomerId>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<AccountNumber>>> {
    Ok(Json(state.accounts.list_active_accounts(customer_id).await?))
}
