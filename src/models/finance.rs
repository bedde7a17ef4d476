use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::company::Address;
use super::sequence::SequenceType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Invoice,
    Quote,
    OrderConfirmation,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [DocumentKind::Invoice, DocumentKind::Quote, DocumentKind::OrderConfirmation];

    /// Route segment, e.g. `order-confirmations`
    pub fn from_path(segment: &str) -> Option<Self> {
        match segment {
            "invoices" => Some(DocumentKind::Invoice),
            "quotes" => Some(DocumentKind::Quote),
            "order-confirmations" | "order_confirmations" => Some(DocumentKind::OrderConfirmation),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "invoice",
            DocumentKind::Quote => "quote",
            DocumentKind::OrderConfirmation => "order_confirmation",
        }
    }

    /// Subcollection name below the company
    pub fn collection(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "invoices",
            DocumentKind::Quote => "quotes",
            DocumentKind::OrderConfirmation => "order_confirmations",
        }
    }

    pub fn path(&self, company_id: &str) -> String {
        format!("companies/{}/{}", company_id, self.collection())
    }

    pub fn sequence_type(&self) -> SequenceType {
        match self {
            DocumentKind::Invoice => SequenceType::Invoice,
            DocumentKind::Quote => SequenceType::Quote,
            DocumentKind::OrderConfirmation => SequenceType::OrderConfirmation,
        }
    }

    /// German label used in mail subjects
    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "Rechnung",
            DocumentKind::Quote => "Angebot",
            DocumentKind::OrderConfirmation => "Auftragsbestätigung",
        }
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentKind::from_path(s)
            .or_else(|| DocumentKind::ALL.into_iter().find(|k| k.as_str() == s))
            .ok_or_else(|| format!("unknown document kind '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
    /// Terminal status of a storno document itself
    Storno,
    Accepted,
    Rejected,
    Converted,
    Confirmed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Sent => "sent",
            DocumentStatus::Paid => "paid",
            DocumentStatus::Overdue => "overdue",
            DocumentStatus::Cancelled => "cancelled",
            DocumentStatus::Storno => "storno",
            DocumentStatus::Accepted => "accepted",
            DocumentStatus::Rejected => "rejected",
            DocumentStatus::Converted => "converted",
            DocumentStatus::Confirmed => "confirmed",
        }
    }

    /// Transitions reachable through the status endpoint.
    ///
    /// `cancelled` is only reached through storno and `converted` only through
    /// quote conversion; see `can_transition_internally`.
    pub fn can_transition_to(&self, kind: DocumentKind, to: DocumentStatus) -> bool {
        use DocumentStatus::*;
        match kind {
            DocumentKind::Invoice => matches!(
                (self, to),
                (Draft, Sent) | (Sent, Paid) | (Sent, Overdue) | (Overdue, Paid) | (Overdue, Sent)
            ),
            DocumentKind::Quote => matches!((self, to), (Draft, Sent) | (Sent, Accepted) | (Sent, Rejected)),
            DocumentKind::OrderConfirmation => matches!((self, to), (Draft, Sent) | (Sent, Confirmed)),
        }
    }

    /// Transitions performed by dedicated operations (storno, conversion).
    pub fn can_transition_internally(&self, kind: DocumentKind, to: DocumentStatus) -> bool {
        use DocumentStatus::*;
        match (kind, to) {
            (DocumentKind::Invoice, Cancelled) => matches!(self, Sent | Overdue | Paid),
            (DocumentKind::Quote, Converted) => *self == Accepted,
            _ => self.can_transition_to(kind, to),
        }
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| format!("unknown status '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// Falls back to the company's default rate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vat_rate: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl LineItem {
    /// `None` when the product does not fit a `Decimal`.
    pub fn net(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.unit_price)
    }

    pub fn negated(&self) -> Self {
        Self {
            quantity: -self.quantity,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Totals {
    pub net: Decimal,
    pub tax: Decimal,
    pub gross: Decimal,
}

pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

impl Totals {
    /// Small businesses (Kleinunternehmer) charge no VAT.
    ///
    /// Returns `None` if any intermediate amount overflows.
    pub fn compute(items: &[LineItem], default_vat_rate: Decimal, small_business: bool) -> Option<Self> {
        let hundred = Decimal::from(100);
        let mut net = Decimal::ZERO;
        let mut tax = Decimal::ZERO;
        for item in items {
            let line = item.net()?;
            net = net.checked_add(line)?;
            if !small_business {
                let line_tax = line
                    .checked_mul(item.vat_rate.unwrap_or(default_vat_rate))?
                    .checked_div(hundred)?;
                tax = tax.checked_add(line_tax)?;
            }
        }
        let net = round_money(net);
        let tax = round_money(tax);
        Some(Self { net, tax, gross: net.checked_add(tax)? })
    }
}

/// Invoice, quote or order confirmation stored under the company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinanceDocument {
    pub kind: DocumentKind,
    pub number: String,
    pub sequential_number: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_address: Option<Address>,
    pub items: Vec<LineItem>,
    pub totals: Totals,
    pub currency: String,
    pub issue_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub status: DocumentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,

    // Storno links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storno_document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storno_reason: Option<String>,

    // Quote conversion links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted_invoice_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_quote_id: Option<String>,

    pub created_by: String,
    #[serde(with = "crate::models::timestamp")]
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FinanceDocument {
    pub fn is_storno(&self) -> bool {
        self.status == DocumentStatus::Storno || self.original_document_id.is_some()
    }
}

/// Editable fields accepted on create and replace.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentInput {
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_address: Option<Address>,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(qty: i64, price: &str, rate: Option<i64>) -> LineItem {
        LineItem {
            description: "Beratung".into(),
            quantity: Decimal::from(qty),
            unit_price: price.parse().unwrap(),
            vat_rate: rate.map(Decimal::from),
            unit: None,
        }
    }

    #[test]
    fn totals_round_to_cents() {
        let totals = Totals::compute(&[item(3, "33.335", None), item(1, "10", Some(7))], Decimal::from(19), false).unwrap();
        assert_eq!(totals.net, "110.01".parse::<Decimal>().unwrap());
        assert_eq!(totals.tax, "19.70".parse::<Decimal>().unwrap());
        assert_eq!(totals.gross, totals.net + totals.tax);
    }

    #[test]
    fn small_business_has_no_tax() {
        let totals = Totals::compute(&[item(2, "50", None)], Decimal::from(19), true).unwrap();
        assert_eq!(totals.tax, Decimal::ZERO);
        assert_eq!(totals.gross.to_string(), "100.00");
    }

    #[test]
    fn overflowing_amounts_yield_none() {
        let huge = LineItem { quantity: Decimal::MAX, ..item(1, "2", None) };
        assert_eq!(huge.net(), None);
        assert_eq!(Totals::compute(&[huge], Decimal::from(19), false), None);

        // Each line fits, the sum does not.
        let half = LineItem { quantity: Decimal::MAX, ..item(1, "1", None) };
        assert_eq!(Totals::compute(&[half.clone(), half], Decimal::ZERO, true), None);
    }

    #[test]
    fn invoice_transitions() {
        use DocumentStatus::*;
        let k = DocumentKind::Invoice;
        assert!(Draft.can_transition_to(k, Sent));
        assert!(Sent.can_transition_to(k, Paid));
        assert!(Overdue.can_transition_to(k, Sent));
        assert!(!Draft.can_transition_to(k, Paid));
        assert!(!Paid.can_transition_to(k, Draft));
        assert!(!Sent.can_transition_to(k, Cancelled));
        assert!(Paid.can_transition_internally(k, Cancelled));
        assert!(!Draft.can_transition_internally(k, Cancelled));
        assert!(!Storno.can_transition_internally(k, Cancelled));
    }

    #[test]
    fn quote_and_confirmation_transitions() {
        use DocumentStatus::*;
        assert!(Sent.can_transition_to(DocumentKind::Quote, Accepted));
        assert!(!Accepted.can_transition_to(DocumentKind::Quote, Converted));
        assert!(Accepted.can_transition_internally(DocumentKind::Quote, Converted));
        assert!(Sent.can_transition_to(DocumentKind::OrderConfirmation, Confirmed));
        assert!(!Sent.can_transition_to(DocumentKind::OrderConfirmation, Paid));
    }

    #[test]
    fn kinds_parse_from_routes() {
        assert_eq!(DocumentKind::from_path("order-confirmations"), Some(DocumentKind::OrderConfirmation));
        assert_eq!("quote".parse::<DocumentKind>().unwrap(), DocumentKind::Quote);
        assert!(DocumentKind::from_path("receipts").is_none());
        assert_eq!("overdue".parse::<DocumentStatus>().unwrap(), DocumentStatus::Overdue);
    }
}
