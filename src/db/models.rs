use anyhow::{anyhow, Context};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub type AccountNumber = i64;
pub type CustomerId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActivationStatus {
    Active,
    Inactive,
}

impl ActivationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
        }
    }
}

impl FromStr for ActivationStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "INACTIVE" => Ok(Self::Inactive),
            other => Err(anyhow!("Unknown activation status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Enabled,
    Disabled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enabled => "ENABLED",
            Self::Disabled => "DISABLED",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ENABLED" => Ok(Self::Enabled),
            "DISABLED" => Ok(Self::Disabled),
            other => Err(anyhow!("Unknown payment status '{}'", other)),
        }
    }
}

/// One of the three independently limited payment modes of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentChannel {
    Online,
    CardSwipe,
    International,
}

impl PaymentChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::CardSwipe => "cardswipe",
            Self::International => "international",
        }
    }
}

impl fmt::Display for PaymentChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive, exact match. The long `...payment` spellings used by
/// older clients are accepted as well.
impl FromStr for PaymentChannel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "online" | "onlinepayment" => Ok(Self::Online),
            "cardswipe" => Ok(Self::CardSwipe),
            "international" | "internationalpayment" => Ok(Self::International),
            other => Err(anyhow!("Unknown payment channel '{}'", other)),
        }
    }
}

/// A 4 to 6 digit card PIN.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Pin(String);

impl Pin {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Pin {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !(4..=6).contains(&s.len()) || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(anyhow!("PIN must be 4 to 6 digits"));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for Pin {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pin(****)")
    }
}

/// A card account. PIN and CVV never leave the service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_number: AccountNumber,
    pub customer_id: CustomerId,
    pub card_number: i64,
    pub base_currency: String,
    pub opening_date: NaiveDate,
    pub activation_status: ActivationStatus,
    pub card_status: String,
    pub online_payment: PaymentStatus,
    pub card_swipe: PaymentStatus,
    pub international_payment: PaymentStatus,
    pub online_payment_limit: Decimal,
    pub card_swipe_limit: Decimal,
    pub international_payment_limit: Decimal,
    pub card_balance: Decimal,
    pub due_amount: Decimal,
    pub due_date: NaiveDate,
    pub expiry_date: NaiveDate,
    #[serde(skip_serializing)]
    pub pin: Pin,
    #[serde(skip_serializing)]
    pub cvv: String,
    pub card_tier: String,
}

/// Everything a client supplies to open or bulk-replace an account.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub customer_id: CustomerId,
    pub card_number: i64,
    pub base_currency: String,
    pub opening_date: NaiveDate,
    pub activation_status: ActivationStatus,
    pub card_status: String,
    pub online_payment: PaymentStatus,
    pub card_swipe: PaymentStatus,
    pub international_payment: PaymentStatus,
    pub online_payment_limit: Decimal,
    pub card_swipe_limit: Decimal,
    pub international_payment_limit: Decimal,
    pub card_balance: Decimal,
    pub due_amount: Decimal,
    pub due_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub pin: Pin,
    pub cvv: String,
    pub card_tier: String,
}

#[derive(Debug, sqlx::FromRow)]
pub struct AccountRow {
    pub account_number: i64,
    pub customer_id: i64,
    pub card_number: i64,
    pub base_currency: String,
    pub opening_date: NaiveDate,
    pub activation_status: String,
    pub card_status: String,
    pub online_payment: String,
    pub card_swipe: String,
    pub international_payment: String,
    pub online_payment_limit: String,
    pub card_swipe_limit: String,
    pub international_payment_limit: String,
    pub card_balance: String,
    pub due_amount: String,
    pub due_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub pin: String,
    pub cvv: String,
    pub card_tier: String,
}

fn decimal(column: &str, value: &str) -> anyhow::Result<Decimal> {
    Decimal::from_str(value).with_context(|| format!("column {} holds invalid decimal '{}'", column, value))
}

impl TryFrom<AccountRow> for Account {
    type Error = anyhow::Error;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Self {
            account_number: row.account_number,
            customer_id: row.customer_id,
            card_number: row.card_number,
            base_currency: row.base_currency,
            opening_date: row.opening_date,
            activation_status: row.activation_status.parse()?,
            card_status: row.card_status,
            online_payment: row.online_payment.parse()?,
            card_swipe: row.card_swipe.parse()?,
            international_payment: row.international_payment.parse()?,
            online_payment_limit: decimal("online_payment_limit", &row.online_payment_limit)?,
            card_swipe_limit: decimal("card_swipe_limit", &row.card_swipe_limit)?,
            international_payment_limit: decimal(
                "international_payment_limit",
                &row.international_payment_limit,
            )?,
            card_balance: decimal("card_balance", &row.card_balance)?,
            due_amount: decimal("due_amount", &row.due_amount)?,
            due_date: row.due_date,
            expiry_date: row.expiry_date,
            pin: row.pin.parse()?,
            cvv: row.cvv,
            card_tier: row.card_tier,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardTier {
    pub card_type: String,
    pub max_limit: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
pub struct CardTierRow {
    pub card_type: String,
    pub max_limit: String,
}

impl TryFrom<CardTierRow> for CardTier {
    type Error = anyhow::Error;

    fn try_from(row: CardTierRow) -> Result<Self, Self::Error> {
        Ok(Self {
            max_limit: decimal("max_limit", &row.max_limit)?,
            card_type: row.card_type,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Debit,
    Credit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "Debit",
            Self::Credit => "Credit",
        }
    }
}

impl FromStr for TransactionType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Debit" => Ok(Self::Debit),
            "Credit" => Ok(Self::Credit),
            other => Err(anyhow!("Unknown transaction type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub transaction_id: i64,
    pub account_number: AccountNumber,
    pub amount: Decimal,
    pub transaction_type: TransactionType,
    pub transaction_date: NaiveDate,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub account_number: AccountNumber,
    pub amount: Decimal,
    pub transaction_type: TransactionType,
    pub transaction_date: NaiveDate,
    pub description: String,
}

#[derive(Debug, sqlx::FromRow)]
pub struct TransactionRow {
    pub transaction_id: i64,
    pub account_number: i64,
    pub amount: String,
    pub transaction_type: String,
    pub transaction_date: NaiveDate,
    pub description: String,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = anyhow::Error;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            transaction_id: row.transaction_id,
            account_number: row.account_number,
            amount: decimal("amount", &row.amount)?,
            transaction_type: row.transaction_type.parse()?,
            transaction_date: row.transaction_date,
            description: row.description,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
    pub customer_id: CustomerId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub address: String,
    pub dob: NaiveDate,
    pub first_login: bool,
}

/// Customer fields a client supplies on create and full update. The
/// password is plain text here and is hashed before it is stored.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub address: String,
    pub dob: NaiveDate,
    /// New profiles default to requiring a password change; an update
    /// without it keeps the stored flag.
    #[serde(default)]
    pub first_login: Option<bool>,
}

impl fmt::Debug for CustomerDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomerDetails")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"****")
            .field("address", &self.address)
            .field("dob", &self.dob)
            .field("first_login", &self.first_login)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ResetToken {
    pub id: i64,
    pub email: String,
    pub otp: String,
    pub expiry_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueSummary {
    pub due_date: NaiveDate,
    pub due_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLimit {
    pub channel: PaymentChannel,
    pub limit: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatuses {
    pub online_payment: PaymentStatus,
    pub card_swipe: PaymentStatus,
    pub international_payment: PaymentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub name: String,
    pub credit_card: String,
    pub max_limit: Decimal,
    pub transactions: Vec<Transaction>,
    pub expiry_date: NaiveDate,
    pub card_number: i64,
    pub card_balance: Decimal,
    pub due_amount: Decimal,
    pub due_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_parsing_is_case_insensitive_and_exact() {
        assert_eq!("ONLINE".parse::<PaymentChannel>().unwrap(), PaymentChannel::Online);
        assert_eq!("CardSwipe".parse::<PaymentChannel>().unwrap(), PaymentChannel::CardSwipe);
        assert_eq!(
            "InternationalPayment".parse::<PaymentChannel>().unwrap(),
            PaymentChannel::International
        );
        assert!("onlin".parse::<PaymentChannel>().is_err());
        assert!("card swipe".parse::<PaymentChannel>().is_err());
        assert!("".parse::<PaymentChannel>().is_err());
    }

    #[test]
    fn test_pin_format() {
        assert!("1234".parse::<Pin>().is_ok());
        assert!("012345".parse::<Pin>().is_ok());
        assert!("123".parse::<Pin>().is_err());
        assert!("1234567".parse::<Pin>().is_err());
        assert!("12a4".parse::<Pin>().is_err());
        assert_eq!(format!("{:?}", "9876".parse::<Pin>().unwrap()), "Pin(****)");
    }

    #[test]
    fn test_account_row_conversion_keeps_decimal_precision() {
        let row = AccountRow {
            account_number: 1,
            customer_id: 2,
            card_number: 4111111111111111,
            base_currency: "INR".to_string(),
            opening_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            activation_status: "ACTIVE".to_string(),
            card_status: "ISSUED".to_string(),
            online_payment: "ENABLED".to_string(),
            card_swipe: "DISABLED".to_string(),
            international_payment: "ENABLED".to_string(),
            online_payment_limit: "1000.10".to_string(),
            card_swipe_limit: "0".to_string(),
            international_payment_limit: "250.5".to_string(),
            card_balance: "12345.6789".to_string(),
            due_amount: "0.01".to_string(),
            due_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            expiry_date: NaiveDate::from_ymd_opt(2029, 1, 1).unwrap(),
            pin: "1234".to_string(),
            cvv: "123".to_string(),
            card_tier: "Gold".to_string(),
        };

        let account = Account::try_from(row).unwrap();
        assert_eq!(account.card_balance.to_string(), "12345.6789");
        assert_eq!(account.due_amount.to_string(), "0.01");
        assert_eq!(account.card_swipe, PaymentStatus::Disabled);
    }

    #[test]
    fn test_card_tier_row_rejects_bad_decimal() {
        let row = CardTierRow {
            card_type: "Gold".to_string(),
            max_limit: "lots".to_string(),
        };
        assert!(CardTier::try_from(row).is_err());
    }

    #[test]
    fn test_customer_details_hide_password() {
        let details: CustomerDetails = serde_json::from_str(
            r#"{"name":"Asha Rao","email":"a@x.com","password":"hunter22","dob":"1990-04-12"}"#,
        )
        .unwrap();
        assert_eq!(details.first_login, None);
        assert_eq!(details.address, "");
        assert!(!format!("{:?}", details).contains("hunter22"));
    }
}
