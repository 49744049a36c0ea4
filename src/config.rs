use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "card-accounts")]
#[command(about = "Credit card account and credential reset service")]
#[command(version)]
pub struct Config {
    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// SQLite database URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://cards.db")]
    pub database_url: String,

    /// Maximum number of pooled database connections
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value = "5")]
    pub max_connections: u32,

    /// Lifetime of a password reset code in minutes
    #[arg(
        long,
        env = "OTP_TTL_MINUTES",
        default_value = "10",
        value_parser = clap::value_parser!(i64).range(1..)
    )]
    pub otp_ttl_minutes: i64,

    /// Sender address used for outgoing notifications
    #[arg(long, env = "MAIL_FROM", default_value = "no-reply@cards.local")]
    pub mail_from: String,

    /// Delete outstanding reset codes for an address before issuing a new one
    #[arg(long, env = "REVOKE_PREVIOUS_OTPS", default_value_t = false)]
    pub revoke_previous_otps: bool,
}

impl Config {
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn otp_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.otp_ttl_minutes)
    }
}
