mod accounts;
mod app_state;
mod auth;
mod config;
mod crypto;
mod db;
mod error;
mod handlers;

use clap::Parser;
use rand::{rngs::StdRng, SeedableRng};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use accounts::{db_repository::DatabaseAccountRepository, AccountService};
use app_state::AppState;
use auth::{
    db_repository::DatabaseAuthRepository, notifier::LogNotifier, AuthService, OtpPolicy,
    SystemClock,
};
use config::Config;
use crypto::Sha256Hasher;
use db::init_pool;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "card_accounts=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse configuration
    let config = Arc::new(Config::parse());

    // Initialize database
    let pool = init_pool(&config.database_url, config.max_connections).await?;

    let accounts = AccountService::new(DatabaseAccountRepository::new(pool.clone()));
    let auth = AuthService::new(
        DatabaseAuthRepository::new(pool),
        Arc::new(Sha256Hasher),
        Arc::new(LogNotifier::new(config.mail_from.clone())),
        Arc::new(SystemClock),
        StdRng::from_os_rng(),
        OtpPolicy {
            ttl: config.otp_ttl(),
            revoke_previous: config.revoke_previous_otps,
        },
    );

    // Create shared state
    let state = AppState {
        accounts: Arc::new(accounts),
        auth: Arc::new(auth),
    };

    let app = handlers::router(state).layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.socket_addr()).await?;

    tracing::info!("Server running on {}", config.socket_addr());
    tracing::info!("OTP lifetime: {} minutes", config.otp_ttl_minutes);

    axum::serve(listener, app).await?;

    Ok(())
}
