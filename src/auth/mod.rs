use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use rand::{CryptoRng, Rng};
use serde::Serialize;
use std::sync::{Arc, Mutex};

use crate::{
    crypto::{generate_otp, SecretHasher},
    db::models::{CustomerDetails, CustomerId, CustomerProfile, ResetToken},
    error::{AppError, AppResult},
};

pub mod db_repository;
pub mod notifier;

use notifier::Notifier;

const OTP_SUBJECT: &str = "Your OTP Code";

/// Customer profile storage used by login and password reset
#[async_trait::async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get_profile(&self, customer_id: CustomerId) -> Result<Option<CustomerProfile>>;
    async fn get_profile_by_email(&self, email: &str) -> Result<Option<CustomerProfile>>;
    async fn insert_profile(&self, details: &CustomerDetails, digest: &str) -> Result<CustomerProfile>;
    /// Overwrite every stored field of `profile.customer_id`. Returns
    /// false when no such profile exists.
    async fn replace_profile(&self, profile: &CustomerProfile) -> Result<bool>;
    /// Store a new digest and clear the first-login flag.
    async fn update_password(&self, customer_id: CustomerId, digest: &str) -> Result<bool>;
    /// Store a new digest for the profile owning `email` and delete every
    /// reset token for that address as one atomic unit. Returns false,
    /// changing nothing, when no profile owns `email`.
    async fn reset_password(&self, email: &str, digest: &str) -> Result<bool>;
}

/// Reset token storage
#[async_trait::async_trait]
pub trait TokenRepository: Send + Sync {
    async fn insert_token(&self, email: &str, otp: &str, expiry_time: DateTime<Utc>) -> Result<()>;
    async fn find_token(&self, email: &str, otp: &str) -> Result<Option<ResetToken>>;
    async fn delete_tokens(&self, email: &str) -> Result<u64>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OtpPolicy {
    pub ttl: Duration,
    /// Delete outstanding codes for an address before issuing a new one.
    /// Off by default, so several codes may be valid at once.
    pub revoke_previous: bool,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(10),
            revoke_previous: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResetOutcome {
    Applied,
    VerificationFailed,
    ProfileNotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LoginOutcome {
    /// Credentials are valid but the initial password must be changed.
    FirstLogin,
    LoggedIn,
}

/// Password login and one-time-code password reset.
///
/// The code generator is owned by the service; production wires an
/// OS-seeded `StdRng`, tests a seeded one.
pub struct AuthService<S, R>
where
    S: ProfileRepository + TokenRepository,
    R: Rng + CryptoRng + Send,
{
    store: S,
    hasher: Arc<dyn SecretHasher>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    rng: Mutex<R>,
    policy: OtpPolicy,
}

impl<S, R> AuthService<S, R>
where
    S: ProfileRepository + TokenRepository,
    R: Rng + CryptoRng + Send,
{
    pub fn new(
        store: S,
        hasher: Arc<dyn SecretHasher>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        rng: R,
        policy: OtpPolicy,
    ) -> Self {
        Self {
            store,
            hasher,
            notifier,
            clock,
            rng: Mutex::new(rng),
            policy,
        }
    }

    fn next_code(&self) -> Result<String> {
        let mut rng = self.rng.lock().map_err(|_| anyhow!("OTP generator lock poisoned"))?;
        Ok(generate_otp(&mut *rng))
    }

    /// Issue a reset code for `email` and mail it. Returns false, creating
    /// nothing, when no profile owns the address.
    pub async fn issue(&self, email: &str) -> AppResult<bool> {
        let Some(profile) = self.store.get_profile_by_email(email).await? else {
            tracing::debug!("reset code requested for unknown address");
            return Ok(false);
        };

        if self.policy.revoke_previous {
            self.store.delete_tokens(&profile.email).await?;
        }

        let code = self.next_code()?;
        let expiry = self.clock.now() + self.policy.ttl;
        self.store.insert_token(&profile.email, &code, expiry).await?;
        tracing::info!(customer_id = profile.customer_id, %expiry, "reset code issued");

        notifier::dispatch(
            self.notifier.clone(),
            profile.email,
            OTP_SUBJECT,
            format!("Your OTP code is: {}", code),
        );
        Ok(true)
    }

    /// True iff a token with exactly this code exists for `email` and has
    /// not yet expired. Wrong and expired codes are indistinguishable.
    pub async fn verify(&self, email: &str, code: &str) -> AppResult<bool> {
        let token = self.store.find_token(email, code).await?;
        Ok(token.is_some_and(|t| t.expiry_time > self.clock.now()))
    }

    pub async fn reset(&self, email: &str, code: &str, new_password: &str) -> AppResult<ResetOutcome> {
        if !self.verify(email, code).await? {
            return Ok(ResetOutcome::VerificationFailed);
        }

        let digest = self.hasher.hash(new_password);
        if !self.store.reset_password(email, &digest).await? {
            return Ok(ResetOutcome::ProfileNotFound);
        }
        tracing::info!("password reset with one-time code");
        Ok(ResetOutcome::Applied)
    }

    pub async fn login(&self, customer_id: CustomerId, password: &str) -> AppResult<LoginOutcome> {
        let invalid = || AppError::Unauthorized("Invalid customer ID or password".to_string());
        let profile = self.store.get_profile(customer_id).await?.ok_or_else(invalid)?;
        if profile.password != self.hasher.hash(password) {
            tracing::debug!(customer_id, "login rejected");
            return Err(invalid());
        }
        Ok(if profile.first_login {
            LoginOutcome::FirstLogin
        } else {
            LoginOutcome::LoggedIn
        })
    }

    pub async fn update_password(&self, customer_id: CustomerId, new_password: &str) -> AppResult<()> {
        let digest = self.hasher.hash(new_password);
        if !self.store.update_password(customer_id, &digest).await? {
            return Err(AppError::not_found("Customer not found"));
        }
        tracing::info!(customer_id, "password updated");
        Ok(())
    }

    pub async fn get_customer(&self, customer_id: CustomerId) -> AppResult<CustomerProfile> {
        self.store
            .get_profile(customer_id)
            .await?
            .ok_or_else(|| customer_not_found(customer_id))
    }

    async fn ensure_email_available(&self, email: &str, owner: Option<CustomerId>) -> AppResult<()> {
        if email.trim().is_empty() {
            return Err(AppError::bad_request("Email is required"));
        }
        match self.store.get_profile_by_email(email).await? {
            Some(other) if Some(other.customer_id) != owner => {
                Err(AppError::bad_request("Email is already registered"))
            }
            _ => Ok(()),
        }
    }

    pub async fn create_customer(&self, details: &CustomerDetails) -> AppResult<CustomerProfile> {
        self.ensure_email_available(&details.email, None).await?;
        let digest = self.hasher.hash(&details.password);
        let profile = self.store.insert_profile(details, &digest).await?;
        tracing::info!(customer_id = profile.customer_id, "customer created");
        Ok(profile)
    }

    /// Full overwrite of the profile. Reset codes issued to a replaced
    /// address are deleted.
    pub async fn update_customer(
        &self,
        customer_id: CustomerId,
        details: &CustomerDetails,
    ) -> AppResult<CustomerProfile> {
        let existing = self.get_customer(customer_id).await?;
        self.ensure_email_available(&details.email, Some(customer_id)).await?;

        let profile = CustomerProfile {
            customer_id,
            name: details.name.clone(),
            email: details.email.clone(),
            password: self.hasher.hash(&details.password),
            address: details.address.clone(),
            dob: details.dob,
            first_login: details.first_login.unwrap_or(existing.first_login),
        };
        if !self.store.replace_profile(&profile).await? {
            return Err(customer_not_found(customer_id));
        }
        if existing.email != profile.email {
            self.store.delete_tokens(&existing.email).await?;
        }
        tracing::info!(customer_id, "customer updated");
        Ok(profile)
    }
}

fn customer_not_found(customer_id: CustomerId) -> AppError {
    AppError::not_found(format!("Customer not found with id: {}", customer_id))
}
