use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};

use crate::{
    auth::{ProfileRepository, TokenRepository},
    db::models::{CustomerDetails, CustomerId, CustomerProfile, ResetToken},
};

/// Database implementation of ProfileRepository and TokenRepository
#[derive(Clone)]
pub struct DatabaseAuthRepository {
    pool: Pool<Sqlite>,
}

impl DatabaseAuthRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProfileRepository for DatabaseAuthRepository {
    async fn get_profile(&self, customer_id: CustomerId) -> Result<Option<CustomerProfile>> {
        let profile = sqlx::query_as::<_, CustomerProfile>(
            "SELECT * FROM customer_profiles WHERE customer_id = ?",
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn get_profile_by_email(&self, email: &str) -> Result<Option<CustomerProfile>> {
        let profile = sqlx::query_as::<_, CustomerProfile>(
            "SELECT * FROM customer_profiles WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn insert_profile(&self, details: &CustomerDetails, digest: &str) -> Result<CustomerProfile> {
        let result = sqlx::query(
            "INSERT INTO customer_profiles (name, email, password, address, dob, first_login)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&details.name)
        .bind(&details.email)
        .bind(digest)
        .bind(&details.address)
        .bind(details.dob)
        .bind(details.first_login.unwrap_or(true))
        .execute(&self.pool)
        .await?;

        let customer_id = result.last_insert_rowid();
        self.get_profile(customer_id)
            .await?
            .ok_or_else(|| anyhow!("customer {} vanished after insert", customer_id))
    }

    async fn replace_profile(&self, profile: &CustomerProfile) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE customer_profiles SET name = ?, email = ?, password = ?, address = ?,
             dob = ?, first_login = ? WHERE customer_id = ?",
        )
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(&profile.password)
        .bind(&profile.address)
        .bind(profile.dob)
        .bind(profile.first_login)
        .bind(profile.customer_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_password(&self, customer_id: CustomerId, digest: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE customer_profiles SET password = ?, first_login = 0 WHERE customer_id = ?",
        )
        .bind(digest)
        .bind(customer_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn reset_password(&self, email: &str, digest: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE customer_profiles SET password = ? WHERE email = ?")
            .bind(digest)
            .bind(email)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("DELETE FROM password_reset_tokens WHERE email = ?")
            .bind(email)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}

#[async_trait::async_trait]
impl TokenRepository for DatabaseAuthRepository {
    async fn insert_token(&self, email: &str, otp: &str, expiry_time: DateTime<Utc>) -> Result<()> {
        sqlx::query("INSERT INTO password_reset_tokens (email, otp, expiry_time) VALUES (?, ?, ?)")
            .bind(email)
            .bind(otp)
            .bind(expiry_time)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_token(&self, email: &str, otp: &str) -> Result<Option<ResetToken>> {
        let token = sqlx::query_as::<_, ResetToken>(
            "SELECT * FROM password_reset_tokens WHERE email = ? AND otp = ?
             ORDER BY expiry_time DESC LIMIT 1",
        )
        .bind(email)
        .bind(otp)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    async fn delete_tokens(&self, email: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM password_reset_tokens WHERE email = ?")
            .bind(email)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
