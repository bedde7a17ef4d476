use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::database::{Document, DocumentStore, StoreError, WriteOp};
use crate::filter::{Filter, SortDirection};
use crate::messages::Msg;
use crate::middleware::AuthUser;
use crate::models::transaction::{TransactionFilter, TransactionImport};
use crate::models::{BookingStatus, DocumentKind, FinanceDocument, TransactionLink, TransactionView};
use crate::services::error::{DomainError, DomainResult};

pub fn transactions_collection(company_id: &str) -> String {
    format!("companies/{}/transactions", company_id)
}

pub fn links_collection(company_id: &str) -> String {
    format!("companies/{}/transaction_links", company_id)
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkRequest {
    pub document_kind: DocumentKind,
    pub document_id: String,
}

/// Bank transactions and their links to accounting documents. Links are stored once,
/// in `transaction_links`; both directions are derived from there.
pub struct BankingService {
    store: Arc<dyn DocumentStore>,
}

impl BankingService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Upsert by provider id.
    pub async fn import(&self, company_id: &str, transactions: Vec<TransactionImport>) -> DomainResult<usize> {
        if let Some(pos) = transactions.iter().position(|t| t.id.trim().is_empty()) {
            return Err(DomainError::required(format!("transactions[{}].id", pos)));
        }
        let coll = transactions_collection(company_id);
        let writes = transactions
            .iter()
            .map(|t| WriteOp::set(coll.clone(), t.id.clone(), &t.transaction))
            .collect::<Result<Vec<_>, StoreError>>()?;
        let count = writes.len();
        if count > 0 {
            self.store.commit(writes).await?;
        }
        tracing::info!(company_id, count, "bank transactions imported");
        Ok(count)
    }

    pub async fn list(&self, company_id: &str, view: TransactionFilter) -> DomainResult<Vec<TransactionView>> {
        let transactions = self
            .store
            .query(
                &transactions_collection(company_id),
                &Filter::new().order_by("booking_date", SortDirection::Desc),
            )
            .await?;

        let mut by_transaction: HashMap<String, Vec<TransactionLink>> = HashMap::new();
        for doc in self.store.query(&links_collection(company_id), &Filter::new()).await? {
            let link: TransactionLink = doc.parse()?;
            by_transaction.entry(link.transaction_id.clone()).or_default().push(link);
        }

        let views: Vec<TransactionView> = transactions
            .iter()
            .map(|doc| {
                let links = by_transaction.remove(&doc.id).unwrap_or_default();
                TransactionView {
                    transaction: doc.to_json(),
                    booking_status: BookingStatus::from_links(&links),
                    links,
                }
            })
            .filter(|v| view.accepts(v.booking_status))
            .collect();
        Ok(views)
    }

    pub async fn link(&self, auth: &AuthUser, company_id: &str, transaction_id: &str, request: LinkRequest) -> DomainResult<Document> {
        self.store
            .get(&transactions_collection(company_id), transaction_id)
            .await?
            .ok_or(DomainError::NotFound(Msg::TransactionNotFound))?;
        let document: FinanceDocument = self
            .store
            .get(&request.document_kind.path(company_id), &request.document_id)
            .await?
            .ok_or(DomainError::NotFound(Msg::DocumentNotFound))?
            .parse()?;

        let link = TransactionLink {
            transaction_id: transaction_id.to_string(),
            document_kind: request.document_kind,
            document_id: request.document_id.clone(),
            document_number: document.number,
            customer_name: document.customer_name,
            document_gross: Some(document.totals.gross),
            linked_by: auth.uid.clone(),
            linked_at: Utc::now(),
        };
        let id = TransactionLink::link_id(transaction_id, &request.document_id);
        let op = WriteOp::create(links_collection(company_id), id, &link)?;

        match self.store.commit(vec![op]).await {
            Ok(mut docs) => {
                tracing::info!(company_id, transaction_id, document_id = %request.document_id, "transaction linked");
                docs.pop().ok_or(DomainError::Store(StoreError::NotAnObject))
            }
            Err(StoreError::AlreadyExists { .. }) => Err(DomainError::Conflict(Msg::LinkExists)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn unlink(&self, company_id: &str, transaction_id: &str, document_id: &str) -> DomainResult<()> {
        let coll = links_collection(company_id);
        let id = TransactionLink::link_id(transaction_id, document_id);
        let existing = self
            .store
            .get(&coll, &id)
            .await?
            .ok_or(DomainError::NotFound(Msg::LinkNotFound))?;
        self.store
            .commit(vec![WriteOp::delete(coll, id, Some(existing.version))])
            .await?;
        tracing::info!(company_id, transaction_id, document_id, "transaction unlinked");
        Ok(())
    }

    /// Transactions linked to one document.
    pub async fn links_for_document(&self, company_id: &str, kind: DocumentKind, document_id: &str) -> DomainResult<Vec<TransactionLink>> {
        self.store
            .get(&kind.path(company_id), document_id)
            .await?
            .ok_or(DomainError::NotFound(Msg::DocumentNotFound))?;
        let filter = Filter::new()
            .where_eq("document_id", document_id)
            .where_eq("document_kind", kind.as_str())
            .order_by("linked_at", SortDirection::Desc);
        let docs = self.store.query(&links_collection(company_id), &filter).await?;
        docs.iter().map(|d| d.parse().map_err(DomainError::from)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::database::MemoryStore;
    use crate::integrations::LogMailer;
    use crate::models::Company;
    use crate::services::finance::FinanceService;
    use serde_json::json;

    fn user() -> AuthUser {
        AuthUser { uid: "u1".into(), role: Role::User, email: None, companies: vec!["c1".into()] }
    }

    async fn setup() -> (BankingService, String) {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let finance = FinanceService::new(store.clone(), Arc::new(LogMailer));
        let input = serde_json::from_value(json!({
            "customer_name": "Kunde AG",
            "items": [{ "description": "Wartung", "quantity": "1", "unit_price": "100" }]
        }))
        .unwrap();
        let invoice = finance
            .create(&user(), "c1", &Company::new("Muster GmbH", "u1"), DocumentKind::Invoice, input)
            .await
            .unwrap();

        let banking = BankingService::new(store);
        let imports: Vec<TransactionImport> = serde_json::from_value(json!([
            { "id": "tx1", "amount": "119.00", "booking_date": "2024-03-01", "purpose": "RE-1" },
            { "id": "tx2", "amount": "-20.00", "booking_date": "2024-03-02" }
        ]))
        .unwrap();
        assert_eq!(banking.import("c1", imports).await.unwrap(), 2);
        (banking, invoice.id)
    }

    #[tokio::test]
    async fn links_drive_booking_status() {
        let (banking, invoice_id) = setup().await;
        let request = LinkRequest { document_kind: DocumentKind::Invoice, document_id: invoice_id.clone() };
        banking.link(&user(), "c1", "tx1", request.clone()).await.unwrap();
        assert!(matches!(
            banking.link(&user(), "c1", "tx1", request).await,
            Err(DomainError::Conflict(Msg::LinkExists))
        ));

        let booked = banking.list("c1", TransactionFilter::Booked).await.unwrap();
        assert_eq!(booked.len(), 1);
        assert_eq!(booked[0].links[0].document_number, "RE-1");
        let open = banking.list("c1", TransactionFilter::Open).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].transaction["id"], "tx2");

        let reverse = banking.links_for_document("c1", DocumentKind::Invoice, &invoice_id).await.unwrap();
        assert_eq!(reverse.len(), 1);
        assert_eq!(reverse[0].transaction_id, "tx1");

        banking.unlink("c1", "tx1", &invoice_id).await.unwrap();
        assert!(matches!(
            banking.unlink("c1", "tx1", &invoice_id).await,
            Err(DomainError::NotFound(Msg::LinkNotFound))
        ));
        assert_eq!(banking.list("c1", TransactionFilter::Open).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn linking_requires_both_sides() {
        let (banking, invoice_id) = setup().await;
        let missing_tx = LinkRequest { document_kind: DocumentKind::Invoice, document_id: invoice_id };
        assert!(matches!(
            banking.link(&user(), "c1", "nope", missing_tx).await,
            Err(DomainError::NotFound(Msg::TransactionNotFound))
        ));
        let missing_doc = LinkRequest { document_kind: DocumentKind::Quote, document_id: "q1".into() };
        assert!(matches!(
            banking.link(&user(), "c1", "tx1", missing_doc).await,
            Err(DomainError::NotFound(Msg::DocumentNotFound))
        ));
    }
}
