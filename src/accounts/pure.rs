//! State transitions on a loaded [`Account`], free of storage concerns.
//!
//! Every function either applies its whole change or returns an error
//! before touching the account.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::{
    db::models::{
        Account, AccountRecord, DueSummary, PaymentChannel, PaymentStatus, PaymentStatuses, Pin,
        TransactionType,
    },
    error::{AppError, AppResult},
};

pub const INVALID_PAYMENT_TYPE: &str = "Invalid payment type";

/// Which transactions a history query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionFilter {
    Only(TransactionType),
    All,
}

impl FromStr for TransactionFilter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Debit" => Ok(Self::Only(TransactionType::Debit)),
            "Credit" => Ok(Self::Only(TransactionType::Credit)),
            "All" => Ok(Self::All),
            other => Err(AppError::illegal_argument(format!(
                "Invalid transaction type provided: {}",
                other
            ))),
        }
    }
}

/// Parse a channel name received from a client.
pub fn parse_channel(name: &str) -> AppResult<PaymentChannel> {
    name.parse()
        .map_err(|_| AppError::bad_request(INVALID_PAYMENT_TYPE))
}

pub fn change_pin(account: &mut Account, old_pin: &Pin, new_pin: &Pin) -> AppResult<()> {
    if account.pin != *old_pin {
        return Err(AppError::bad_request("PIN is wrong"));
    }
    if old_pin == new_pin {
        return Err(AppError::bad_request("New PIN cannot be equal to the old PIN"));
    }
    account.pin = new_pin.clone();
    Ok(())
}

pub fn due_summary(account: &Account) -> DueSummary {
    DueSummary {
        due_date: account.due_date,
        due_amount: account.due_amount,
    }
}

pub fn set_due_amount(account: &mut Account, amount: Decimal) -> AppResult<()> {
    if amount.is_sign_negative() {
        return Err(AppError::bad_request("Due amount cannot be negative"));
    }
    account.due_amount = amount;
    Ok(())
}

pub fn limit(account: &Account, channel: PaymentChannel) -> Decimal {
    match channel {
        PaymentChannel::Online => account.online_payment_limit,
        PaymentChannel::CardSwipe => account.card_swipe_limit,
        PaymentChannel::International => account.international_payment_limit,
    }
}

pub fn set_limit(account: &mut Account, channel: PaymentChannel, new_limit: Decimal) -> AppResult<()> {
    if new_limit.is_sign_negative() {
        return Err(AppError::bad_request("Transaction limit cannot be negative"));
    }
    let slot = match channel {
        PaymentChannel::Online => &mut account.online_payment_limit,
        PaymentChannel::CardSwipe => &mut account.card_swipe_limit,
        PaymentChannel::International => &mut account.international_payment_limit,
    };
    *slot = new_limit;
    Ok(())
}

pub fn statuses(account: &Account) -> PaymentStatuses {
    PaymentStatuses {
        online_payment: account.online_payment,
        card_swipe: account.card_swipe,
        international_payment: account.international_payment,
    }
}

pub fn set_status(account: &mut Account, channel: PaymentChannel, status: PaymentStatus) {
    match channel {
        PaymentChannel::Online => account.online_payment = status,
        PaymentChannel::CardSwipe => account.card_swipe = status,
        PaymentChannel::International => account.international_payment = status,
    }
}

/// Settle the whole due amount against the balance. The balance may go
/// negative when the due exceeds it. Returns the amount settled.
pub fn pay_due(account: &mut Account) -> AppResult<Decimal> {
    let paid = account.due_amount;
    account.card_balance = account
        .card_balance
        .checked_sub(paid)
        .ok_or_else(|| AppError::bad_request("Balance out of range"))?;
    account.due_amount = Decimal::ZERO;
    Ok(paid)
}

/// Field rules shared by account creation and bulk replacement.
pub fn validate_record(record: &AccountRecord) -> AppResult<()> {
    for (field, value) in [
        ("onlinePaymentLimit", record.online_payment_limit),
        ("cardSwipeLimit", record.card_swipe_limit),
        ("internationalPaymentLimit", record.international_payment_limit),
        ("dueAmount", record.due_amount),
    ] {
        if value.is_sign_negative() {
            return Err(AppError::illegal_argument(format!("{} cannot be negative", field)));
        }
    }
    if record.card_tier.trim().is_empty() {
        return Err(AppError::illegal_argument("cardTier is required"));
    }
    Ok(())
}

/// Bulk replace: copy the fourteen replaceable fields from `record`.
/// PIN, card number and limits are owned by their narrower operations.
pub fn apply_record(account: &mut Account, record: &AccountRecord) {
    account.customer_id = record.customer_id;
    account.base_currency = record.base_currency.clone();
    account.opening_date = record.opening_date;
    account.activation_status = record.activation_status;
    account.card_status = record.card_status.clone();
    account.online_payment = record.online_payment;
    account.card_swipe = record.card_swipe;
    account.international_payment = record.international_payment;
    account.card_balance = record.card_balance;
    account.due_amount = record.due_amount;
    account.due_date = record.due_date;
    account.expiry_date = record.expiry_date;
    account.cvv = record.cvv.clone();
    account.card_tier = record.card_tier.clone();
}
