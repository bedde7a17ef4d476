use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::store::MAX_UPDATE_ATTEMPTS;
use crate::database::{update_typed, Document, DocumentStore, StoreError, WriteOp};
use crate::filter::{Filter, SortDirection};
use crate::integrations::{Mailer, OutgoingMail};
use crate::messages::Msg;
use crate::middleware::AuthUser;
use crate::models::finance::round_money;
use crate::models::{
    Activity, Company, DocumentInput, DocumentKind, DocumentStatus, FinanceDocument, LineItem, SequenceType, Totals,
};
use crate::services::error::{DomainError, DomainResult};
use crate::services::sequence;

/// Invoice figures for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceStats {
    pub total: u64,
    pub by_status: BTreeMap<String, u64>,
    /// Gross of paid invoices
    pub total_revenue: Decimal,
    /// Gross of sent and overdue invoices
    pub pending_revenue: Decimal,
}

/// Result of a send: the updated document and whether the mail went out.
#[derive(Debug)]
pub struct SendOutcome {
    pub document: Document,
    pub message: Msg,
}

pub struct FinanceService {
    store: Arc<dyn DocumentStore>,
    mailer: Arc<dyn Mailer>,
}

impl FinanceService {
    pub fn new(store: Arc<dyn DocumentStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self { store, mailer }
    }

    pub fn parse_kind(raw: &str) -> DomainResult<DocumentKind> {
        DocumentKind::from_path(raw).ok_or(DomainError::NotFound(Msg::UnknownDocumentKind))
    }

    pub fn parse_status(raw: &str) -> DomainResult<DocumentStatus> {
        raw.parse()
            .map_err(|_| DomainError::field("status", Msg::InvalidTransition.text()))
    }

    /// Newest first.
    pub async fn list(
        &self,
        company_id: &str,
        kind: DocumentKind,
        status: Option<DocumentStatus>,
        limit: usize,
        offset: usize,
    ) -> DomainResult<Vec<Document>> {
        let mut filter = Filter::new();
        if let Some(status) = status {
            filter = filter.where_eq("status", status.as_str());
        }
        let filter = filter
            .order_by("created_at", SortDirection::Desc)
            .with_limit(limit)
            .with_offset(offset);
        Ok(self.store.query(&kind.path(company_id), &filter).await?)
    }

    pub async fn get(&self, company_id: &str, kind: DocumentKind, id: &str) -> DomainResult<(FinanceDocument, Document)> {
        let doc = self
            .store
            .get(&kind.path(company_id), id)
            .await?
            .ok_or(DomainError::NotFound(Msg::DocumentNotFound))?;
        Ok((doc.parse()?, doc))
    }

    /// New draft numbered from the kind's sequence in the same batch.
    pub async fn create(
        &self,
        auth: &AuthUser,
        company_id: &str,
        company: &Company,
        kind: DocumentKind,
        input: DocumentInput,
    ) -> DomainResult<Document> {
        validate_input(&input)?;
        let totals = document_totals(&input.items, company)?;
        let collection = kind.path(company_id);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let reservation = sequence::reserve(self.store.as_ref(), company_id, kind.sequence_type()).await?;
            let id = Uuid::new_v4().to_string();
            let now = Utc::now();
            let document = FinanceDocument {
                kind,
                number: reservation.number.clone(),
                sequential_number: reservation.value,
                customer_id: input.customer_id.clone(),
                customer_name: input.customer_name.trim().to_string(),
                customer_email: input.customer_email.clone(),
                customer_address: input.customer_address.clone(),
                totals,
                items: input.items.clone(),
                currency: input.currency.clone().unwrap_or_else(|| "EUR".to_string()),
                issue_date: input.issue_date.unwrap_or_else(|| now.date_naive()),
                due_date: input.due_date,
                status: DocumentStatus::Draft,
                notes: input.notes.clone(),
                sent_at: None,
                paid_at: None,
                payment_intent_id: None,
                original_document_id: None,
                storno_document_id: None,
                storno_reason: None,
                converted_invoice_id: None,
                source_quote_id: None,
                created_by: auth.uid.clone(),
                created_at: now,
                updated_at: now,
            };
            let activity = Activity::new("created", kind.as_str(), &id, &auth.uid)
                .with_details(json!({ "number": document.number }));

            let writes = vec![
                reservation.write,
                WriteOp::create(collection.clone(), id.clone(), &document)?,
                activity.write_op(company_id)?,
            ];
            match self.store.commit(writes).await {
                Ok(docs) => {
                    tracing::info!(company_id, kind = kind.as_str(), number = %document.number, "document created");
                    return written(docs, &id);
                }
                Err(e) if e.is_conflict() && attempt < MAX_UPDATE_ATTEMPTS => {
                    tracing::debug!(company_id, attempt, "number reservation contended, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Replace editable fields of a draft.
    pub async fn replace(
        &self,
        company_id: &str,
        company: &Company,
        kind: DocumentKind,
        id: &str,
        input: DocumentInput,
    ) -> DomainResult<Document> {
        validate_input(&input)?;
        self.get(company_id, kind, id).await?;

        let (_, doc) = update_typed::<FinanceDocument, _, DomainError>(self.store.as_ref(), &kind.path(company_id), id, |document| {
            if document.status != DocumentStatus::Draft {
                return Err(DomainError::Conflict(Msg::OnlyDraftsEditable));
            }
            document.customer_id = input.customer_id.clone();
            document.customer_name = input.customer_name.trim().to_string();
            document.customer_email = input.customer_email.clone();
            document.customer_address = input.customer_address.clone();
            document.items = input.items.clone();
            document.totals = document_totals(&document.items, company)?;
            if let Some(currency) = &input.currency {
                document.currency = currency.clone();
            }
            if let Some(issue_date) = input.issue_date {
                document.issue_date = issue_date;
            }
            document.due_date = input.due_date;
            document.notes = input.notes.clone();
            document.updated_at = Utc::now();
            Ok(())
        })
        .await?;
        Ok(doc)
    }

    pub async fn delete(&self, auth: &AuthUser, company_id: &str, kind: DocumentKind, id: &str) -> DomainResult<()> {
        let (document, doc) = self.get(company_id, kind, id).await?;
        if document.status != DocumentStatus::Draft {
            return Err(DomainError::Conflict(Msg::OnlyDraftsDeletable));
        }
        let activity = Activity::new("deleted", kind.as_str(), id, &auth.uid)
            .with_details(json!({ "number": document.number }));
        self.store
            .commit(vec![
                WriteOp::delete(kind.path(company_id), id, Some(doc.version)),
                activity.write_op(company_id)?,
            ])
            .await?;
        tracing::info!(company_id, kind = kind.as_str(), number = %document.number, "draft deleted");
        Ok(())
    }

    /// Validated transition through the status table.
    pub async fn change_status(
        &self,
        auth: &AuthUser,
        company_id: &str,
        kind: DocumentKind,
        id: &str,
        to: DocumentStatus,
    ) -> DomainResult<Document> {
        self.get(company_id, kind, id).await?;

        let mut from = DocumentStatus::Draft;
        let (document, doc) = update_typed::<FinanceDocument, _, DomainError>(self.store.as_ref(), &kind.path(company_id), id, |document| {
            from = document.status;
            if !document.status.can_transition_to(kind, to) {
                return Err(DomainError::InvalidTransition {
                    from: document.status.as_str().to_string(),
                    to: to.as_str().to_string(),
                });
            }
            let now = Utc::now();
            document.status = to;
            match to {
                DocumentStatus::Sent => document.sent_at = Some(now),
                DocumentStatus::Paid => document.paid_at = Some(now),
                _ => {}
            }
            document.updated_at = now;
            Ok(())
        })
        .await?;

        let activity = Activity::new("status_changed", kind.as_str(), id, &auth.uid)
            .with_details(json!({ "from": from.as_str(), "to": to.as_str(), "number": document.number }));
        self.record_activity(company_id, activity).await;

        tracing::info!(company_id, kind = kind.as_str(), number = %document.number, from = from.as_str(), to = to.as_str(), "status changed");
        Ok(doc)
    }

    /// Mark as sent and mail the customer. A failed mail does not undo the status.
    pub async fn send(
        &self,
        auth: &AuthUser,
        company_id: &str,
        company: &Company,
        kind: DocumentKind,
        id: &str,
        to: Option<String>,
    ) -> DomainResult<SendOutcome> {
        let (document, _) = self.get(company_id, kind, id).await?;
        let recipient = to
            .or_else(|| document.customer_email.clone())
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .ok_or(DomainError::BadRequest(Msg::RecipientMissing))?;

        let doc = self.change_status(auth, company_id, kind, id, DocumentStatus::Sent).await?;
        let mail = document_mail(company, &document, recipient);

        let message = match self.mailer.send(&mail).await {
            Ok(()) => Msg::DocumentSent,
            Err(e) => {
                tracing::warn!(company_id, number = %document.number, mailer = self.mailer.name(), "document mail failed: {}", e);
                Msg::DocumentSentMailFailed
            }
        };
        Ok(SendOutcome { document: doc, message })
    }

    /// Cancel an issued invoice with a storno invoice carrying negated amounts.
    pub async fn storno(&self, auth: &AuthUser, company_id: &str, id: &str, reason: Option<String>) -> DomainResult<Document> {
        let kind = DocumentKind::Invoice;
        let collection = kind.path(company_id);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let (mut original, original_doc) = self.get(company_id, kind, id).await?;
            if original.is_storno() {
                return Err(DomainError::Conflict(Msg::StornoOfStorno));
            }
            match original.status {
                DocumentStatus::Draft => return Err(DomainError::Conflict(Msg::StornoOfDraft)),
                DocumentStatus::Cancelled => return Err(DomainError::Conflict(Msg::StornoOfCancelled)),
                status if !status.can_transition_internally(kind, DocumentStatus::Cancelled) => {
                    return Err(DomainError::InvalidTransition {
                        from: status.as_str().to_string(),
                        to: DocumentStatus::Cancelled.as_str().to_string(),
                    });
                }
                _ => {}
            }

            let reservation = sequence::reserve(self.store.as_ref(), company_id, SequenceType::Storno).await?;
            let storno_id = Uuid::new_v4().to_string();
            let now = Utc::now();
            let storno = FinanceDocument {
                number: reservation.number.clone(),
                sequential_number: reservation.value,
                items: original.items.iter().map(LineItem::negated).collect(),
                totals: negate(original.totals),
                issue_date: now.date_naive(),
                due_date: None,
                status: DocumentStatus::Storno,
                sent_at: None,
                paid_at: None,
                payment_intent_id: None,
                original_document_id: Some(id.to_string()),
                storno_document_id: None,
                storno_reason: reason.clone(),
                created_by: auth.uid.clone(),
                created_at: now,
                updated_at: now,
                ..original.clone()
            };

            original.status = DocumentStatus::Cancelled;
            original.storno_document_id = Some(storno_id.clone());
            original.storno_reason = reason.clone();
            original.updated_at = now;

            let activity = Activity::new("storno", kind.as_str(), id, &auth.uid).with_details(json!({
                "number": original.number,
                "storno_number": storno.number,
                "reason": reason,
            }));

            let writes = vec![
                reservation.write,
                WriteOp::create(collection.clone(), storno_id.clone(), &storno)?,
                WriteOp::update(collection.clone(), id, &original, Some(original_doc.version))?,
                activity.write_op(company_id)?,
            ];
            match self.store.commit(writes).await {
                Ok(docs) => {
                    tracing::info!(company_id, number = %original.number, storno_number = %storno.number, "invoice cancelled by storno");
                    return written(docs, &storno_id);
                }
                Err(e) if e.is_conflict() && attempt < MAX_UPDATE_ATTEMPTS => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub async fn stats(&self, company_id: &str) -> DomainResult<InvoiceStats> {
        let docs = self
            .store
            .query(&DocumentKind::Invoice.path(company_id), &Filter::new())
            .await?;

        let mut stats = InvoiceStats {
            total: 0,
            by_status: BTreeMap::new(),
            total_revenue: round_money(Decimal::ZERO),
            pending_revenue: round_money(Decimal::ZERO),
        };
        for doc in &docs {
            let invoice: FinanceDocument = doc.parse()?;
            stats.total += 1;
            *stats.by_status.entry(invoice.status.as_str().to_string()).or_insert(0) += 1;
            match invoice.status {
                DocumentStatus::Paid => stats.total_revenue = stats.total_revenue.saturating_add(invoice.totals.gross),
                DocumentStatus::Sent | DocumentStatus::Overdue => {
                    stats.pending_revenue = stats.pending_revenue.saturating_add(invoice.totals.gross)
                }
                _ => {}
            }
        }
        stats.total_revenue = round_money(stats.total_revenue);
        stats.pending_revenue = round_money(stats.pending_revenue);
        Ok(stats)
    }

    /// Turn an accepted quote into a new draft invoice.
    pub async fn convert_quote(
        &self,
        auth: &AuthUser,
        company_id: &str,
        company: &Company,
        quote_id: &str,
    ) -> DomainResult<Document> {
        let invoices = DocumentKind::Invoice.path(company_id);
        let quotes = DocumentKind::Quote.path(company_id);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let (mut quote, quote_doc) = self.get(company_id, DocumentKind::Quote, quote_id).await?;
            if !quote
                .status
                .can_transition_internally(DocumentKind::Quote, DocumentStatus::Converted)
            {
                return Err(DomainError::Conflict(Msg::QuoteNotAccepted));
            }

            let reservation = sequence::reserve(self.store.as_ref(), company_id, SequenceType::Invoice).await?;
            let invoice_id = Uuid::new_v4().to_string();
            let now = Utc::now();
            let invoice = FinanceDocument {
                kind: DocumentKind::Invoice,
                number: reservation.number.clone(),
                sequential_number: reservation.value,
                totals: document_totals(&quote.items, company)?,
                issue_date: now.date_naive(),
                due_date: None,
                status: DocumentStatus::Draft,
                sent_at: None,
                paid_at: None,
                payment_intent_id: None,
                original_document_id: None,
                storno_document_id: None,
                storno_reason: None,
                converted_invoice_id: None,
                source_quote_id: Some(quote_id.to_string()),
                created_by: auth.uid.clone(),
                created_at: now,
                updated_at: now,
                ..quote.clone()
            };

            quote.status = DocumentStatus::Converted;
            quote.converted_invoice_id = Some(invoice_id.clone());
            quote.updated_at = now;

            let activity = Activity::new("converted", DocumentKind::Quote.as_str(), quote_id, &auth.uid)
                .with_details(json!({ "quote_number": quote.number, "invoice_number": invoice.number }));

            let writes = vec![
                reservation.write,
                WriteOp::create(invoices.clone(), invoice_id.clone(), &invoice)?,
                WriteOp::update(quotes.clone(), quote_id, &quote, Some(quote_doc.version))?,
                activity.write_op(company_id)?,
            ];
            match self.store.commit(writes).await {
                Ok(docs) => {
                    tracing::info!(company_id, quote = %quote.number, invoice = %invoice.number, "quote converted");
                    return written(docs, &invoice_id);
                }
                Err(e) if e.is_conflict() && attempt < MAX_UPDATE_ATTEMPTS => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn record_activity(&self, company_id: &str, activity: Activity) {
        let result = match activity.write_op(company_id) {
            Ok(op) => self.store.commit(vec![op]).await.map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!(company_id, action = %activity.action, "activity not recorded: {}", e);
        }
    }
}

fn validate_input(input: &DocumentInput) -> DomainResult<()> {
    if input.customer_name.trim().is_empty() {
        return Err(DomainError::required("customer_name"));
    }
    if input.items.is_empty() {
        return Err(DomainError::required("items"));
    }
    if input.items.iter().any(|item| item.description.trim().is_empty()) {
        return Err(DomainError::required("items.description"));
    }
    Ok(())
}

fn document_totals(items: &[LineItem], company: &Company) -> DomainResult<Totals> {
    Totals::compute(items, company.tax.default_vat_rate, company.tax.small_business)
        .ok_or_else(|| DomainError::field("items", Msg::AmountOutOfRange.text()))
}

fn negate(totals: Totals) -> Totals {
    Totals {
        net: -totals.net,
        tax: -totals.tax,
        gross: -totals.gross,
    }
}

fn written(docs: Vec<Document>, id: &str) -> DomainResult<Document> {
    docs.into_iter()
        .find(|d| d.id == id)
        .ok_or(DomainError::Store(StoreError::NotAnObject))
}

fn document_mail(company: &Company, document: &FinanceDocument, recipient: String) -> OutgoingMail {
    let label = document.kind.label();
    let mut text = format!(
        "Guten Tag {},\n\nanbei erhalten Sie {} {} über {} {}.\n",
        document.customer_name, label, document.number, document.totals.gross, document.currency
    );
    if let Some(due) = document.due_date {
        text.push_str(&format!("Fällig am {}.\n", due.format("%d.%m.%Y")));
    }
    text.push_str(&format!("\nMit freundlichen Grüßen\n{}\n", company.name));

    OutgoingMail {
        to: vec![recipient],
        subject: format!("{} {} von {}", label, document.number, company.name),
        text,
    }
}
