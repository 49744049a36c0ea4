use anyhow::Result;
use chrono::NaiveDate;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    db::models::{
        Account, AccountNumber, AccountRecord, ActivationStatus, CardTier, CustomerId,
        CustomerProfile, Dashboard, DueSummary, NewTransaction, PaymentLimit, PaymentStatus,
        PaymentStatuses, Pin, Transaction, TransactionType,
    },
    error::{AppError, AppResult},
};

pub mod db_repository;
pub mod pure;

use pure::TransactionFilter;

const ACCOUNT_NOT_FOUND: &str = "Account not found";
const CARD_NOT_FOUND: &str = "Card not found";
const CARD_TYPE_NOT_FOUND: &str = "Card type not found";
const DASHBOARD_TRANSACTIONS: i64 = 5;

/// Storage operations the account engine depends on
#[async_trait::async_trait]
pub trait AccountRepository: Send + Sync {
    async fn get_account(&self, account_number: AccountNumber) -> Result<Option<Account>>;
    async fn insert_account(&self, record: &AccountRecord) -> Result<Account>;
    async fn save_account(&self, account: &Account) -> Result<()>;
    async fn list_accounts(&self, customer_id: CustomerId, active_only: bool) -> Result<Vec<Account>>;
    async fn get_customer(&self, customer_id: CustomerId) -> Result<Option<CustomerProfile>>;
    /// Card tier names match case-insensitively.
    async fn get_card_tier(&self, card_type: &str) -> Result<Option<CardTier>>;
    async fn insert_transaction(&self, transaction: &NewTransaction) -> Result<Transaction>;
    async fn find_transactions(
        &self,
        account_number: AccountNumber,
        start: NaiveDate,
        end: NaiveDate,
        transaction_type: Option<TransactionType>,
    ) -> Result<Vec<Transaction>>;
    /// Most recent first.
    async fn latest_transactions(&self, account_number: AccountNumber, limit: i64) -> Result<Vec<Transaction>>;
}

/// Validated, per-account serialized mutations of card accounts.
///
/// Every mutating call holds the account's lock across its whole
/// load, validate, mutate and persist cycle, so two writers on the same
/// account number never interleave. Distinct accounts do not contend.
pub struct AccountService<R: AccountRepository> {
    repo: R,
    locks: DashMap<AccountNumber, Arc<Mutex<()>>>,
}

/// Exclusive hold on one account. On drop the lock is released and its
/// map entry removed unless another task is already waiting on it.
struct AccountLock<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    locks: &'a DashMap<AccountNumber, Arc<Mutex<()>>>,
    account_number: AccountNumber,
}

impl Drop for AccountLock<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .remove_if(&self.account_number, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl<R: AccountRepository> AccountService<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            locks: DashMap::new(),
        }
    }

    async fn lock(&self, account_number: AccountNumber) -> AccountLock<'_> {
        let lock = self.locks.entry(account_number).or_default().clone();
        AccountLock {
            guard: Some(lock.lock_owned().await),
            locks: &self.locks,
            account_number,
        }
    }

    async fn load(&self, account_number: AccountNumber) -> AppResult<Account> {
        self.repo
            .get_account(account_number)
            .await?
            .ok_or_else(|| AppError::not_found(ACCOUNT_NOT_FOUND))
    }

    async fn card_tier(&self, card_type: &str) -> AppResult<CardTier> {
        self.repo
            .get_card_tier(card_type)
            .await?
            .ok_or_else(|| AppError::not_found(CARD_TYPE_NOT_FOUND))
    }

    /// Run `change` against the stored account under its lock and persist
    /// the result. Nothing is written if `change` fails.
    async fn mutate<T, F>(&self, account_number: AccountNumber, change: F) -> AppResult<T>
    where
        F: FnOnce(&mut Account) -> AppResult<T>,
    {
        let _lock = self.lock(account_number).await;
        let mut account = self.load(account_number).await?;
        let out = change(&mut account)?;
        self.repo.save_account(&account).await?;
        Ok(out)
    }

    pub async fn change_pin(&self, account_number: AccountNumber, old_pin: &Pin, new_pin: &Pin) -> AppResult<()> {
        self.mutate(account_number, |account| pure::change_pin(account, old_pin, new_pin))
            .await?;
        tracing::info!(account_number, "PIN changed");
        Ok(())
    }

    pub async fn due_summary(&self, account_number: AccountNumber) -> AppResult<DueSummary> {
        let account = self.load(account_number).await?;
        Ok(pure::due_summary(&account))
    }

    pub async fn update_due_amount(&self, account_number: AccountNumber, amount: Decimal) -> AppResult<()> {
        self.mutate(account_number, |account| pure::set_due_amount(account, amount))
            .await?;
        tracing::info!(account_number, %amount, "due amount updated");
        Ok(())
    }

    pub async fn payment_limit(&self, account_number: AccountNumber, channel: &str) -> AppResult<PaymentLimit> {
        let channel = pure::parse_channel(channel)?;
        let account = self.load(account_number).await?;
        Ok(PaymentLimit {
            channel,
            limit: pure::limit(&account, channel),
        })
    }

    pub async fn update_transaction_limit(
        &self,
        account_number: AccountNumber,
        channel: &str,
        new_limit: Decimal,
    ) -> AppResult<()> {
        let channel = pure::parse_channel(channel)?;
        self.mutate(account_number, |account| pure::set_limit(account, channel, new_limit))
            .await?;
        tracing::info!(account_number, %channel, %new_limit, "transaction limit updated");
        Ok(())
    }

    /// The account must exist before the tier name is considered.
    pub async fn update_card_type(&self, account_number: AccountNumber, card_type: &str) -> AppResult<()> {
        let _lock = self.lock(account_number).await;
        let mut account = self.load(account_number).await?;
        let tier = self.card_tier(card_type).await?;
        account.card_tier = tier.card_type;
        self.repo.save_account(&account).await?;
        tracing::info!(account_number, card_type = %account.card_tier, "card type changed");
        Ok(())
    }

    pub async fn deactivate(&self, account_number: AccountNumber) -> AppResult<()> {
        self.mutate(account_number, |account| {
            account.activation_status = ActivationStatus::Inactive;
            Ok(())
        })
        .await?;
        tracing::info!(account_number, "account deactivated");
        Ok(())
    }

    pub async fn payment_statuses(&self, account_number: AccountNumber) -> AppResult<PaymentStatuses> {
        let account = self.load(account_number).await?;
        Ok(pure::statuses(&account))
    }

    pub async fn update_payment_status(
        &self,
        account_number: AccountNumber,
        channel: &str,
        status: PaymentStatus,
    ) -> AppResult<()> {
        let channel = pure::parse_channel(channel)?;
        self.mutate(account_number, |account| {
            pure::set_status(account, channel, status);
            Ok(())
        })
        .await?;
        tracing::info!(account_number, %channel, %status, "payment status updated");
        Ok(())
    }

    pub async fn credit_limit(&self, account_number: AccountNumber) -> AppResult<Decimal> {
        let account = self.load(account_number).await?;
        let tier = self
            .repo
            .get_card_tier(&account.card_tier)
            .await?
            .ok_or_else(|| AppError::not_found(CARD_NOT_FOUND))?;
        Ok(tier.max_limit)
    }

    /// Returns the amount that was settled.
    pub async fn pay_due(&self, account_number: AccountNumber) -> AppResult<Decimal> {
        let paid = self.mutate(account_number, pure::pay_due).await?;
        tracing::info!(account_number, %paid, "due paid");
        Ok(paid)
    }

    /// The owning customer and the card tier must both exist. The stored
    /// tier name is the tier's canonical spelling.
    pub async fn create_account(&self, record: &AccountRecord) -> AppResult<Account> {
        pure::validate_record(record)?;
        self.ensure_customer(record.customer_id).await?;
        let tier = self.card_tier(&record.card_tier).await?;
        let record = AccountRecord {
            card_tier: tier.card_type,
            ..record.clone()
        };
        let account = self.repo.insert_account(&record).await?;
        tracing::info!(
            account_number = account.account_number,
            customer_id = account.customer_id,
            "account opened"
        );
        Ok(account)
    }

    /// Bulk replace of the account's descriptive and financial fields.
    /// Customer and card tier are checked exactly as on creation.
    pub async fn update_account(&self, account_number: AccountNumber, record: &AccountRecord) -> AppResult<Account> {
        pure::validate_record(record)?;
        let _lock = self.lock(account_number).await;
        let mut account = self.load(account_number).await?;
        self.ensure_customer(record.customer_id).await?;
        let tier = self.card_tier(&record.card_tier).await?;

        pure::apply_record(&mut account, record);
        account.card_tier = tier.card_type;
        self.repo.save_account(&account).await?;
        tracing::info!(account_number, "account replaced");
        Ok(account)
    }

    async fn ensure_customer(&self, customer_id: CustomerId) -> AppResult<CustomerProfile> {
        self.repo
            .get_customer(customer_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("No customer found with id: {}", customer_id)))
    }

    /// An existing customer with no active accounts yields an empty list.
    pub async fn list_active_accounts(&self, customer_id: CustomerId) -> AppResult<Vec<AccountNumber>> {
        self.ensure_customer(customer_id).await?;
        let accounts = self.repo.list_accounts(customer_id, true).await?;
        Ok(accounts.into_iter().map(|a| a.account_number).collect())
    }

    pub async fn list_accounts(&self, customer_id: CustomerId) -> AppResult<Vec<Account>> {
        self.ensure_customer(customer_id).await?;
        Ok(self.repo.list_accounts(customer_id, false).await?)
    }

    pub async fn record_transaction(&self, transaction: &NewTransaction) -> AppResult<Transaction> {
        if transaction.amount.is_sign_negative() {
            return Err(AppError::illegal_argument("Transaction amount cannot be negative"));
        }
        self.load(transaction.account_number).await?;
        let stored = self.repo.insert_transaction(transaction).await?;
        tracing::debug!(
            account_number = stored.account_number,
            transaction_id = stored.transaction_id,
            "transaction recorded"
        );
        Ok(stored)
    }

    pub async fn filtered_transactions(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        transaction_type: &str,
        account_number: AccountNumber,
    ) -> AppResult<Vec<Transaction>> {
        let filter: TransactionFilter = transaction_type.parse()?;
        let only = match filter {
            TransactionFilter::Only(kind) => Some(kind),
            TransactionFilter::All => None,
        };
        Ok(self
            .repo
            .find_transactions(account_number, start, end, only)
            .await?)
    }

    pub async fn dashboard(&self, account_number: AccountNumber) -> AppResult<Dashboard> {
        let account = self.load(account_number).await?;
        let customer = self
            .repo
            .get_customer(account.customer_id)
            .await?
            .ok_or_else(|| AppError::not_found("Customer not found"))?;
        let tier = self
            .repo
            .get_card_tier(&account.card_tier)
            .await?
            .ok_or_else(|| AppError::not_found(CARD_NOT_FOUND))?;
        let transactions = self
            .repo
            .latest_transactions(account_number, DASHBOARD_TRANSACTIONS)
            .await?;

        Ok(Dashboard {
            name: customer.name,
            credit_card: tier.card_type,
            max_limit: tier.max_limit,
            transactions,
            expiry_date: account.expiry_date,
            card_number: account.card_number,
            card_balance: account.card_balance,
            due_amount: account.due_amount,
            due_date: account.due_date,
        })
    }
}
