//! In-memory stores and collaborators for service tests.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::{
    accounts::AccountRepository,
    auth::{notifier::Notifier, Clock, ProfileRepository, TokenRepository},
    db::models::{
        Account, AccountNumber, AccountRecord, ActivationStatus, CardTier, CustomerDetails,
        CustomerId, CustomerProfile, NewTransaction, ResetToken, Transaction, TransactionType,
    },
};

#[derive(Default)]
struct State {
    customers: BTreeMap<CustomerId, CustomerProfile>,
    tiers: Vec<CardTier>,
    accounts: BTreeMap<AccountNumber, Account>,
    transactions: Vec<Transaction>,
    tokens: Vec<ResetToken>,
    saves: usize,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn add_customer(&self, customer_id: CustomerId, name: &str, email: &str, digest: &str) {
        self.state().customers.insert(
            customer_id,
            CustomerProfile {
                customer_id,
                name: name.to_string(),
                email: email.to_string(),
                password: digest.to_string(),
                address: "12 MG Road".to_string(),
                dob: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
                first_login: true,
            },
        );
    }

    pub fn add_card_tier(&self, card_type: &str, max_limit: Decimal) {
        self.state().tiers.push(CardTier {
            card_type: card_type.to_string(),
            max_limit,
        });
    }

    pub fn account(&self, account_number: AccountNumber) -> Option<Account> {
        self.state().accounts.get(&account_number).cloned()
    }

    pub fn put_account(&self, account: Account) {
        self.state().accounts.insert(account.account_number, account);
    }

    pub fn profile(&self, customer_id: CustomerId) -> Option<CustomerProfile> {
        self.state().customers.get(&customer_id).cloned()
    }

    pub fn tokens_for(&self, email: &str) -> Vec<ResetToken> {
        self.state()
            .tokens
            .iter()
            .filter(|t| t.email == email)
            .cloned()
            .collect()
    }

    pub fn save_count(&self) -> usize {
        self.state().saves
    }
}

#[async_trait]
impl AccountRepository for MemoryStore {
    async fn get_account(&self, account_number: AccountNumber) -> Result<Option<Account>> {
        // Give concurrent writers a chance to interleave.
        tokio::task::yield_now().await;
        Ok(self.account(account_number))
    }

    async fn insert_account(&self, record: &AccountRecord) -> Result<Account> {
        let mut state = self.state();
        let account_number = state.accounts.keys().next_back().map_or(1, |n| n + 1);
        let account = Account {
            account_number,
            customer_id: record.customer_id,
            card_number: record.card_number,
            base_currency: record.base_currency.clone(),
            opening_date: record.opening_date,
            activation_status: record.activation_status,
            card_status: record.card_status.clone(),
            online_payment: record.online_payment,
            card_swipe: record.card_swipe,
            international_payment: record.international_payment,
            online_payment_limit: record.online_payment_limit,
            card_swipe_limit: record.card_swipe_limit,
            international_payment_limit: record.international_payment_limit,
            card_balance: record.card_balance,
            due_amount: record.due_amount,
            due_date: record.due_date,
            expiry_date: record.expiry_date,
            pin: record.pin.clone(),
            cvv: record.cvv.clone(),
            card_tier: record.card_tier.clone(),
        };
        state.accounts.insert(account_number, account.clone());
        Ok(account)
    }

    async fn save_account(&self, account: &Account) -> Result<()> {
        tokio::task::yield_now().await;
        let mut state = self.state();
        state.saves += 1;
        state.accounts.insert(account.account_number, account.clone());
        Ok(())
    }

    async fn list_accounts(&self, customer_id: CustomerId, active_only: bool) -> Result<Vec<Account>> {
        Ok(self
            .state()
            .accounts
            .values()
            .filter(|a| a.customer_id == customer_id)
            .filter(|a| !active_only || a.activation_status == ActivationStatus::Active)
            .cloned()
            .collect())
    }

    async fn get_customer(&self, customer_id: CustomerId) -> Result<Option<CustomerProfile>> {
        Ok(self.profile(customer_id))
    }

    async fn get_card_tier(&self, card_type: &str) -> Result<Option<CardTier>> {
        Ok(self
            .state()
            .tiers
            .iter()
            .find(|t| t.card_type.eq_ignore_ascii_case(card_type))
            .cloned())
    }

    async fn insert_transaction(&self, transaction: &NewTransaction) -> Result<Transaction> {
        let mut state = self.state();
        let stored = Transaction {
            transaction_id: state.transactions.len() as i64 + 1,
            account_number: transaction.account_number,
            amount: transaction.amount,
            transaction_type: transaction.transaction_type,
            transaction_date: transaction.transaction_date,
            description: transaction.description.clone(),
        };
        state.transactions.push(stored.clone());
        Ok(stored)
    }

    async fn find_transactions(
        &self,
        account_number: AccountNumber,
        start: NaiveDate,
        end: NaiveDate,
        transaction_type: Option<TransactionType>,
    ) -> Result<Vec<Transaction>> {
        Ok(self
            .state()
            .transactions
            .iter()
            .filter(|t| t.account_number == account_number)
            .filter(|t| t.transaction_date >= start && t.transaction_date <= end)
            .filter(|t| transaction_type.is_none_or(|kind| t.transaction_type == kind))
            .cloned()
            .collect())
    }

    async fn latest_transactions(&self, account_number: AccountNumber, limit: i64) -> Result<Vec<Transaction>> {
        let mut found: Vec<Transaction> = self
            .state()
            .transactions
            .iter()
            .filter(|t| t.account_number == account_number)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            (b.transaction_date, b.transaction_id).cmp(&(a.transaction_date, a.transaction_id))
        });
        found.truncate(limit as usize);
        Ok(found)
    }
}

#[async_trait]
impl ProfileRepository for MemoryStore {
    async fn get_profile(&self, customer_id: CustomerId) -> Result<Option<CustomerProfile>> {
        Ok(self.profile(customer_id))
    }

    async fn get_profile_by_email(&self, email: &str) -> Result<Option<CustomerProfile>> {
        Ok(self
            .state()
            .customers
            .values()
            .find(|c| c.email == email)
            .cloned())
    }

    async fn insert_profile(&self, details: &CustomerDetails, digest: &str) -> Result<CustomerProfile> {
        let mut state = self.state();
        let customer_id = state.customers.keys().next_back().map_or(1, |n| n + 1);
        let profile = CustomerProfile {
            customer_id,
            name: details.name.clone(),
            email: details.email.clone(),
            password: digest.to_string(),
            address: details.address.clone(),
            dob: details.dob,
            first_login: details.first_login.unwrap_or(true),
        };
        state.customers.insert(customer_id, profile.clone());
        Ok(profile)
    }

    async fn replace_profile(&self, profile: &CustomerProfile) -> Result<bool> {
        let mut state = self.state();
        let Some(stored) = state.customers.get_mut(&profile.customer_id) else {
            return Ok(false);
        };
        *stored = profile.clone();
        Ok(true)
    }

    async fn update_password(&self, customer_id: CustomerId, digest: &str) -> Result<bool> {
        let mut state = self.state();
        let Some(profile) = state.customers.get_mut(&customer_id) else {
            return Ok(false);
        };
        profile.password = digest.to_string();
        profile.first_login = false;
        Ok(true)
    }

    async fn reset_password(&self, email: &str, digest: &str) -> Result<bool> {
        let mut state = self.state();
        let Some(profile) = state.customers.values_mut().find(|c| c.email == email) else {
            return Ok(false);
        };
        profile.password = digest.to_string();
        state.tokens.retain(|t| t.email != email);
        Ok(true)
    }
}

#[async_trait]
impl TokenRepository for MemoryStore {
    async fn insert_token(&self, email: &str, otp: &str, expiry_time: DateTime<Utc>) -> Result<()> {
        let mut state = self.state();
        let id = state.tokens.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        state.tokens.push(ResetToken {
            id,
            email: email.to_string(),
            otp: otp.to_string(),
            expiry_time,
        });
        Ok(())
    }

    async fn find_token(&self, email: &str, otp: &str) -> Result<Option<ResetToken>> {
        Ok(self
            .state()
            .tokens
            .iter()
            .filter(|t| t.email == email && t.otp == otp)
            .max_by_key(|t| t.expiry_time)
            .cloned())
    }

    async fn delete_tokens(&self, email: &str) -> Result<u64> {
        let mut state = self.state();
        let before = state.tokens.len();
        state.tokens.retain(|t| t.email != email);
        Ok((before - state.tokens.len()) as u64)
    }
}

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Forwards every message as `(to, subject, body)`.
pub struct RecordingNotifier {
    tx: UnboundedSender<(String, String, String)>,
}

impl RecordingNotifier {
    pub fn new() -> (Self, UnboundedReceiver<(String, String, String)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        self.tx
            .send((to.to_string(), subject.to_string(), body.to_string()))?;
        Ok(())
    }
}
