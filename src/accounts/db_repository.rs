use anyhow::Result;
use chrono::NaiveDate;
use sqlx::{Pool, Sqlite};

use crate::{
    accounts::AccountRepository,
    db::models::{
        Account, AccountNumber, AccountRecord, AccountRow, ActivationStatus, CardTier,
        CardTierRow, CustomerId, CustomerProfile, NewTransaction, Transaction, TransactionRow,
        TransactionType,
    },
};

/// Database implementation of AccountRepository
#[derive(Clone)]
pub struct DatabaseAccountRepository {
    pool: Pool<Sqlite>,
}

impl DatabaseAccountRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

fn accounts(rows: Vec<AccountRow>) -> Result<Vec<Account>> {
    rows.into_iter().map(Account::try_from).collect()
}

fn transactions(rows: Vec<TransactionRow>) -> Result<Vec<Transaction>> {
    rows.into_iter().map(Transaction::try_from).collect()
}

#[async_trait::async_trait]
impl AccountRepository for DatabaseAccountRepository {
    async fn get_account(&self, account_number: AccountNumber) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>("SELECT * FROM card_accounts WHERE account_number = ?")
            .bind(account_number)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Account::try_from).transpose()
    }

    async fn insert_account(&self, record: &AccountRecord) -> Result<Account> {
        let result = sqlx::query(
            "INSERT INTO card_accounts (customer_id, card_number, base_currency, opening_date,
             activation_status, card_status, online_payment, card_swipe, international_payment,
             online_payment_limit, card_swipe_limit, international_payment_limit, card_balance,
             due_amount, due_date, expiry_date, pin, cvv, card_tier)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.customer_id)
        .bind(record.card_number)
        .bind(&record.base_currency)
        .bind(record.opening_date)
        .bind(record.activation_status.as_str())
        .bind(&record.card_status)
        .bind(record.online_payment.as_str())
        .bind(record.card_swipe.as_str())
        .bind(record.international_payment.as_str())
        .bind(record.online_payment_limit.to_string())
        .bind(record.card_swipe_limit.to_string())
        .bind(record.international_payment_limit.to_string())
        .bind(record.card_balance.to_string())
        .bind(record.due_amount.to_string())
        .bind(record.due_date)
        .bind(record.expiry_date)
        .bind(record.pin.as_str())
        .bind(&record.cvv)
        .bind(&record.card_tier)
        .execute(&self.pool)
        .await?;

        let account_number = result.last_insert_rowid();
        self.get_account(account_number)
            .await?
            .ok_or_else(|| anyhow::anyhow!("account {} vanished after insert", account_number))
    }

    async fn save_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            "UPDATE card_accounts SET customer_id = ?, card_number = ?, base_currency = ?,
             opening_date = ?, activation_status = ?, card_status = ?, online_payment = ?,
             card_swipe = ?, international_payment = ?, online_payment_limit = ?,
             card_swipe_limit = ?, international_payment_limit = ?, card_balance = ?,
             due_amount = ?, due_date = ?, expiry_date = ?, pin = ?, cvv = ?, card_tier = ?
             WHERE account_number = ?",
        )
        .bind(account.customer_id)
        .bind(account.card_number)
        .bind(&account.base_currency)
        .bind(account.opening_date)
        .bind(account.activation_status.as_str())
        .bind(&account.card_status)
        .bind(account.online_payment.as_str())
        .bind(account.card_swipe.as_str())
        .bind(account.international_payment.as_str())
        .bind(account.online_payment_limit.to_string())
        .bind(account.card_swipe_limit.to_string())
        .bind(account.international_payment_limit.to_string())
        .bind(account.card_balance.to_string())
        .bind(account.due_amount.to_string())
        .bind(account.due_date)
        .bind(account.expiry_date)
        .bind(account.pin.as_str())
        .bind(&account.cvv)
        .bind(&account.card_tier)
        .bind(account.account_number)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_accounts(&self, customer_id: CustomerId, active_only: bool) -> Result<Vec<Account>> {
        let rows = if active_only {
            sqlx::query_as::<_, AccountRow>(
                "SELECT * FROM card_accounts WHERE customer_id = ? AND activation_status = ?
                 ORDER BY account_number",
            )
            .bind(customer_id)
            .bind(ActivationStatus::Active.as_str())
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, AccountRow>(
                "SELECT * FROM card_accounts WHERE customer_id = ? ORDER BY account_number",
            )
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?
        };

        accounts(rows)
    }

    async fn get_customer(&self, customer_id: CustomerId) -> Result<Option<CustomerProfile>> {
        let profile = sqlx::query_as::<_, CustomerProfile>(
            "SELECT * FROM customer_profiles WHERE customer_id = ?",
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn get_card_tier(&self, card_type: &str) -> Result<Option<CardTier>> {
        let row = sqlx::query_as::<_, CardTierRow>(
            "SELECT * FROM card_tiers WHERE card_type = ? COLLATE NOCASE",
        )
        .bind(card_type)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CardTier::try_from).transpose()
    }

    async fn insert_transaction(&self, transaction: &NewTransaction) -> Result<Transaction> {
        let result = sqlx::query(
            "INSERT INTO transactions (account_number, amount, transaction_type, transaction_date, description)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(transaction.account_number)
        .bind(transaction.amount.to_string())
        .bind(transaction.transaction_type.as_str())
        .bind(transaction.transaction_date)
        .bind(&transaction.description)
        .execute(&self.pool)
        .await?;

        Ok(Transaction {
            transaction_id: result.last_insert_rowid(),
            account_number: transaction.account_number,
            amount: transaction.amount,
            transaction_type: transaction.transaction_type,
            transaction_date: transaction.transaction_date,
            description: transaction.description.clone(),
        })
    }

    async fn find_transactions(
        &self,
        account_number: AccountNumber,
        start: NaiveDate,
        end: NaiveDate,
        transaction_type: Option<TransactionType>,
    ) -> Result<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM transactions
             WHERE account_number = ? AND transaction_date BETWEEN ? AND ?
             AND (? IS NULL OR transaction_type = ?)
             ORDER BY transaction_date, transaction_id",
        )
        .bind(account_number)
        .bind(start)
        .bind(end)
        .bind(transaction_type.map(|t| t.as_str()))
        .bind(transaction_type.map(|t| t.as_str()))
        .fetch_all(&self.pool)
        .await?;

        transactions(rows)
    }

    async fn latest_transactions(&self, account_number: AccountNumber, limit: i64) -> Result<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM transactions WHERE account_number = ?
             ORDER BY transaction_date DESC, transaction_id DESC LIMIT ?",
        )
        .bind(account_number)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        transactions(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        accounts::{pure::fixtures::{date, record}, AccountService},
        db::{init_pool, test_support::seed_customer},
        error::AppError,
    };
    use rust_decimal::Decimal;

    async fn repo() -> DatabaseAccountRepository {
        let pool = init_pool("sqlite::memory:", 1).await.unwrap();
        seed_customer(&pool, 7, "Asha Rao", "asha@example.com").await;
        sqlx::query("INSERT INTO card_tiers (card_type, max_limit) VALUES ('Gold', '200000.00')")
            .execute(&pool)
            .await
            .unwrap();
        DatabaseAccountRepository::new(pool)
    }

    #[tokio::test]
    async fn test_insert_and_get_round_trips_exact_decimals() {
        let repo = repo().await;
        let mut r = record(7);
        r.card_balance = Decimal::new(123_456_789, 4);
        let inserted = repo.insert_account(&r).await.unwrap();

        let loaded = repo.get_account(inserted.account_number).await.unwrap().unwrap();
        assert_eq!(loaded, inserted);
        assert_eq!(loaded.card_balance.to_string(), "12345.6789");
        assert!(repo.get_account(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_account_persists_changes() {
        let repo = repo().await;
        let mut account = repo.insert_account(&record(7)).await.unwrap();
        account.due_amount = Decimal::ZERO;
        account.activation_status = ActivationStatus::Inactive;
        account.pin = "7777".parse().unwrap();
        repo.save_account(&account).await.unwrap();

        assert_eq!(repo.get_account(account.account_number).await.unwrap().unwrap(), account);
        assert!(repo.list_accounts(7, true).await.unwrap().is_empty());
        assert_eq!(repo.list_accounts(7, false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_card_tier_lookup_ignores_case() {
        let repo = repo().await;
        let tier = repo.get_card_tier("gOLD").await.unwrap().unwrap();
        assert_eq!(tier.card_type, "Gold");
        assert_eq!(tier.max_limit, Decimal::new(20_000_000, 2));
        assert!(repo.get_card_tier("Silver").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transaction_queries() {
        let repo = repo().await;
        let n = repo.insert_account(&record(7)).await.unwrap().account_number;
        for day in 1..=6u32 {
            let kind = if day % 2 == 0 { TransactionType::Credit } else { TransactionType::Debit };
            repo.insert_transaction(&NewTransaction {
                account_number: n,
                amount: Decimal::new(i64::from(day) * 100, 2),
                transaction_type: kind,
                transaction_date: date(2024, 3, day),
                description: format!("tx {}", day),
            })
            .await
            .unwrap();
        }

        let credits = repo
            .find_transactions(n, date(2024, 3, 1), date(2024, 3, 4), Some(TransactionType::Credit))
            .await
            .unwrap();
        assert_eq!(
            credits.iter().map(|t| t.description.as_str()).collect::<Vec<_>>(),
            vec!["tx 2", "tx 4"]
        );

        let all = repo
            .find_transactions(n, date(2024, 3, 2), date(2024, 3, 3), None)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let latest = repo.latest_transactions(n, 5).await.unwrap();
        assert_eq!(latest.len(), 5);
        assert_eq!(latest[0].description, "tx 6");
        assert_eq!(latest[0].amount, Decimal::new(600, 2));
    }

    #[tokio::test]
    async fn test_unknown_customer_is_not_found_before_insert() {
        let service = AccountService::new(repo().await);

        let err = service.create_account(&record(999)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let n = service.create_account(&record(7)).await.unwrap().account_number;
        let err = service.update_account(n, &record(999)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(service.list_accounts(7).await.unwrap()[0].customer_id, 7);
    }
}
