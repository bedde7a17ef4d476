use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const COMPANIES: &str = "companies";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub house_number: Option<String>,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub city: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "DE".to_string()
}

/// Canonical tax settings. Legacy payloads are normalized into this section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vat_id: Option<String>,
    /// Kleinunternehmerregelung (§19 UStG)
    #[serde(default)]
    pub small_business: bool,
    #[serde(default = "default_vat_rate")]
    pub default_vat_rate: Decimal,
}

fn default_vat_rate() -> Decimal {
    Decimal::from(19)
}

impl Default for TaxSettings {
    fn default() -> Self {
        Self {
            tax_number: None,
            vat_id: None,
            small_business: false,
            default_vat_rate: default_vat_rate(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BankDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iban: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_holder: Option<String>,
}

/// Integration flags only; credentials live in `companies/{id}/integrations/{provider}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Integrations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_account_id: Option<String>,
    #[serde(default)]
    pub charges_enabled: bool,
    #[serde(default)]
    pub payouts_enabled: bool,
    #[serde(default)]
    pub datev_connected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub counts: BTreeMap<String, u64>,
    pub total_documents: u64,
    pub calculated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub name: String,
    pub owner_uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_form: Option<String>,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub tax: TaxSettings,
    #[serde(default)]
    pub bank: BankDetails,
    #[serde(default)]
    pub integrations: Integrations,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageSnapshot>,
    #[serde(default)]
    pub platform_hold_balance_cents: i64,

    #[serde(default)]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_reason: Option<String>,

    #[serde(with = "crate::models::timestamp")]

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Company {
    pub fn new(name: impl Into<String>, owner_uid: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            owner_uid: owner_uid.into(),
            email: None,
            phone: None,
            website: None,
            legal_form: None,
            address: Address::default(),
            tax: TaxSettings::default(),
            bank: BankDetails::default(),
            integrations: Integrations::default(),
            usage: None,
            platform_hold_balance_cents: 0,
            locked: false,
            locked_at: None,
            locked_by: None,
            locked_reason: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Company subcollections counted by the usage job and removed on delete.
pub const TRACKED_SUBCOLLECTIONS: [&str; 18] = [
    "invoices",
    "quotes",
    "order_confirmations",
    "customers",
    "suppliers",
    "contacts",
    "expenses",
    "projects",
    "time_entries",
    "inventory",
    "employees",
    "reminders",
    "transactions",
    "transaction_links",
    "email_cache",
    "activities",
    "balance_history",
    "number_sequences",
];
