pub mod accounts;
pub mod auth;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::app_state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        // Account state
        .route("/api/accounts", post(accounts::create_account))
        .route("/api/accounts/{account_number}", put(accounts::update_account))
        .route("/api/accounts/{account_number}/dashboard", get(accounts::dashboard))
        .route("/api/accounts/{account_number}/pin", put(accounts::change_pin))
        .route(
            "/api/accounts/{account_number}/due",
            get(accounts::due_summary).put(accounts::update_due_amount),
        )
        .route("/api/accounts/{account_number}/pay-due", post(accounts::pay_due))
        .route(
            "/api/accounts/{account_number}/limits/{channel}",
            get(accounts::payment_limit).put(accounts::update_transaction_limit),
        )
        .route("/api/accounts/{account_number}/payment-statuses", get(accounts::payment_statuses))
        .route(
            "/api/accounts/{account_number}/payment-statuses/{channel}",
            put(accounts::update_payment_status),
        )
        .route("/api/accounts/{account_number}/card-type", put(accounts::update_card_type))
        .route("/api/accounts/{account_number}/deactivate", post(accounts::deactivate))
        .route("/api/accounts/{account_number}/credit-limit", get(accounts::credit_limit))
        .route("/api/accounts/{account_number}/transactions", get(accounts::transactions))
        .route("/api/transactions", post(accounts::record_transaction))
        // Customers
        .route("/api/customers", post(auth::create_customer))
        .route(
            "/api/customers/{customer_id}",
            get(auth::get_customer).put(auth::update_customer),
        )
        .route("/api/customers/{customer_id}/accounts", get(accounts::list_accounts))
        .route("/api/customers/{customer_id}/accounts/active", get(accounts::list_active_accounts))
        .route("/api/customers/{customer_id}/password", put(auth::update_password))
        // Credentials
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/otp", post(auth::send_otp))
        .route("/api/auth/otp/verify", post(auth::verify_otp))
        .route("/api/auth/password-reset", post(auth::reset_password))
        .with_state(state)
}
