use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::finance::DocumentKind;

/// Imported bank transaction, keyed by the provider's transaction id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTransaction {
    pub amount: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub booking_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_iban: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default = "Utc::now")]
    pub imported_at: DateTime<Utc>,
}

fn default_currency() -> String {
    "EUR".to_string()
}

/// Import payload: the provider id plus the transaction body.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionImport {
    pub id: String,
    #[serde(flatten)]
    pub transaction: BankTransaction,
}

/// One link between a bank transaction and an accounting document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionLink {
    pub transaction_id: String,
    pub document_kind: DocumentKind,
    pub document_id: String,
    /// Snapshot taken when linking
    pub document_number: String,
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_gross: Option<Decimal>,
    pub linked_by: String,
    pub linked_at: DateTime<Utc>,
}

impl TransactionLink {
    pub fn link_id(transaction_id: &str, document_id: &str) -> String {
        format!("{}_{}", transaction_id, document_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Open,
    Booked,
}

impl BookingStatus {
    pub fn from_links(links: &[TransactionLink]) -> Self {
        if links.is_empty() {
            BookingStatus::Open
        } else {
            BookingStatus::Booked
        }
    }
}

/// Transaction with its derived link view.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionView {
    #[serde(flatten)]
    pub transaction: Value,
    pub links: Vec<TransactionLink>,
    pub booking_status: BookingStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionFilter {
    #[default]
    All,
    Open,
    Booked,
}

impl TransactionFilter {
    pub fn accepts(&self, status: BookingStatus) -> bool {
        match self {
            TransactionFilter::All => true,
            TransactionFilter::Open => status == BookingStatus::Open,
            TransactionFilter::Booked => status == BookingStatus::Booked,
        }
    }
}
