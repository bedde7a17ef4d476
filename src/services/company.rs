use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::database::{update_typed, Document, DocumentStore, WriteOp};
use crate::filter::{Filter, SortDirection};
use crate::messages::Msg;
use crate::middleware::AuthUser;
use crate::models::company::COMPANIES;
use crate::models::email::EMAIL_CONFIGS;
use crate::models::{Company, UsageSnapshot};
use crate::observer::implementations::existing_loader::merge_patch;
use crate::services::error::{DomainError, DomainResult};

/// Keys only the platform may write.
pub const PROTECTED_FIELDS: [&str; 8] = [
    "locked",
    "locked_at",
    "locked_by",
    "locked_reason",
    "usage",
    "platform_hold_balance_cents",
    "owner_uid",
    "integrations",
];

pub struct CompanyService {
    store: Arc<dyn DocumentStore>,
}

impl CompanyService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    async fn load(&self, company_id: &str) -> DomainResult<(Company, Document)> {
        let doc = self
            .store
            .get(COMPANIES, company_id)
            .await?
            .ok_or(DomainError::NotFound(Msg::CompanyNotFound))?;
        Ok((doc.parse()?, doc))
    }

    /// Admins, the owner and members named in the token may act on a company.
    pub async fn authorize(&self, auth: &AuthUser, company_id: &str) -> DomainResult<Company> {
        let (company, _) = self.load(company_id).await?;
        if auth.is_admin() || company.owner_uid == auth.uid || auth.is_member_of(company_id) {
            Ok(company)
        } else {
            tracing::debug!(uid = %auth.uid, company_id, "company access denied");
            Err(DomainError::Forbidden(Msg::CompanyAccessDenied))
        }
    }

    pub async fn get(&self, auth: &AuthUser, company_id: &str) -> DomainResult<Value> {
        self.authorize(auth, company_id).await?;
        let (_, doc) = self.load(company_id).await?;
        Ok(doc.to_json())
    }

    pub async fn create(&self, auth: &AuthUser, mut body: Map<String, Value>) -> DomainResult<Document> {
        reject_protected(&body)?;
        normalize_tax(&mut body);
        body.remove("id");

        let name = body
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| DomainError::required("name"))?
            .to_string();

        let company = apply_patch(&Company::new(name, auth.uid.clone()), &body)?;
        let id = Uuid::new_v4().to_string();
        let doc = self.store.create(COMPANIES, &id, crate::database::store::to_map(&company)?).await?;

        tracing::info!(company_id = %id, owner = %auth.uid, "company created");
        Ok(doc)
    }

    /// Partial update; legacy tax payloads are folded into `tax`.
    pub async fn update(&self, auth: &AuthUser, company_id: &str, mut patch: Map<String, Value>) -> DomainResult<Document> {
        self.authorize(auth, company_id).await?;
        reject_protected(&patch)?;
        normalize_tax(&mut patch);
        for key in ["id", "created_at", "updated_at"] {
            patch.remove(key);
        }

        let (_, doc) = update_typed::<Company, _, DomainError>(self.store.as_ref(), COMPANIES, company_id, |company| {
            *company = apply_patch(company, &patch)?;
            company.updated_at = Utc::now();
            Ok(())
        })
        .await?;
        Ok(doc)
    }

    /// Owner or admin only. Locked companies must be unlocked first.
    pub async fn delete(&self, auth: &AuthUser, company_id: &str) -> DomainResult<()> {
        let (company, doc) = self.load(company_id).await?;
        if !auth.is_admin() && company.owner_uid != auth.uid {
            return Err(DomainError::Forbidden(Msg::CompanyAccessDenied));
        }
        if company.locked {
            tracing::warn!(company_id, uid = %auth.uid, "refusing to delete locked company");
            return Err(DomainError::Locked(Msg::CompanyLocked));
        }

        // Children first; the company document is the last write.
        let configs = self
            .store
            .query(EMAIL_CONFIGS, &Filter::new().where_eq("company_id", company_id))
            .await?;
        if !configs.is_empty() {
            let deletes = configs
                .iter()
                .map(|c| WriteOp::delete(EMAIL_CONFIGS, c.id.clone(), None))
                .collect();
            self.store.commit(deletes).await?;
        }
        let removed = self.store.delete_tree(&format!("{}/{}", COMPANIES, company_id)).await?;

        // The guard fails if the company was locked in the meantime.
        self.store
            .commit(vec![WriteOp::delete(COMPANIES, company_id, Some(doc.version))])
            .await?;

        tracing::info!(company_id, uid = %auth.uid, removed, email_configs = configs.len(), "company deleted");
        Ok(())
    }

    pub async fn list(&self, filter: Filter) -> DomainResult<Vec<Value>> {
        let filter = filter.order_by("created_at", SortDirection::Desc);
        let docs = self.store.query(COMPANIES, &filter).await?;
        Ok(docs.iter().map(Document::to_json).collect())
    }

    pub async fn lock(&self, admin: &AuthUser, company_id: &str, reason: Option<String>) -> DomainResult<Document> {
        self.load(company_id).await?;
        let now = Utc::now();
        let (_, doc) = update_typed::<Company, _, DomainError>(self.store.as_ref(), COMPANIES, company_id, |company| {
            company.locked = true;
            company.locked_at = Some(now);
            company.locked_by = Some(admin.uid.clone());
            company.locked_reason = reason.clone();
            company.updated_at = now;
            Ok(())
        })
        .await?;
        tracing::info!(company_id, admin = %admin.uid, "company locked");
        Ok(doc)
    }

    pub async fn unlock(&self, admin: &AuthUser, company_id: &str) -> DomainResult<Document> {
        self.load(company_id).await?;
        let (_, doc) = update_typed::<Company, _, DomainError>(self.store.as_ref(), COMPANIES, company_id, |company| {
            if !company.locked {
                return Err(DomainError::BadRequest(Msg::CompanyNotLocked));
            }
            company.locked = false;
            company.locked_at = None;
            company.locked_by = None;
            company.locked_reason = None;
            company.updated_at = Utc::now();
            Ok(())
        })
        .await?;
        tracing::info!(company_id, admin = %admin.uid, "company unlocked");
        Ok(doc)
    }

    pub async fn usage(&self, auth: &AuthUser, company_id: &str) -> DomainResult<Option<UsageSnapshot>> {
        Ok(self.authorize(auth, company_id).await?.usage)
    }
}

fn reject_protected(body: &Map<String, Value>) -> DomainResult<()> {
    match PROTECTED_FIELDS.iter().find(|key| body.contains_key(**key)) {
        Some(key) => Err(DomainError::field(*key, Msg::ProtectedCompanyField.text())),
        None => Ok(()),
    }
}

/// Merge `patch` into the company and re-parse, so type errors surface as 400.
fn apply_patch(company: &Company, patch: &Map<String, Value>) -> DomainResult<Company> {
    let mut data = crate::database::store::to_map(company)?;
    merge_patch(&mut data, patch);
    serde_json::from_value(Value::Object(data)).map_err(|e| {
        tracing::debug!("rejected company payload: {}", e);
        DomainError::BadRequest(Msg::ValidationFailed)
    })
}

/// Fold legacy tax keys (`step3.*`, root-level aliases) into the canonical `tax` section.
/// Keys already present in `tax` win; the legacy keys are dropped.
pub fn normalize_tax(body: &mut Map<String, Value>) {
    let step3 = match body.remove("step3") {
        Some(Value::Object(map)) => map,
        Some(other) => {
            body.insert("step3".to_string(), other);
            Map::new()
        }
        None => Map::new(),
    };

    let mut legacy = Map::new();
    let mut take = |target: &str, value: Option<Value>| {
        if let Some(value) = value.filter(|v| !v.is_null()) {
            legacy.entry(target.to_string()).or_insert(value);
        }
    };

    take("tax_number", step3.get("taxNumber").cloned());
    take("vat_id", step3.get("vatId").cloned());
    take("small_business", step3.get("ust").and_then(ust_flag));
    take("default_vat_rate", step3.get("defaultTaxRate").and_then(rate_value));

    take("tax_number", body.remove("taxNumber"));
    take("tax_number", body.remove("tax_number"));
    take("vat_id", body.remove("vatId"));
    take("vat_id", body.remove("vat_id"));
    take("small_business", body.remove("kleinunternehmer").as_ref().and_then(yes_no_flag));
    take("small_business", body.remove("small_business").as_ref().and_then(yes_no_flag));
    for key in ["defaultTaxRate", "default_vat_rate", "taxRate"] {
        take("default_vat_rate", body.remove(key).as_ref().and_then(rate_value));
    }

    if legacy.is_empty() {
        return;
    }
    let mut tax = match body.remove("tax") {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    for (key, value) in legacy {
        tax.entry(key).or_insert(value);
    }
    body.insert("tax".to_string(), Value::Object(tax));
}

fn ust_flag(value: &Value) -> Option<Value> {
    match value.as_str()? {
        "kleinunternehmer" => Some(Value::Bool(true)),
        "standard" => Some(Value::Bool(false)),
        _ => None,
    }
}

fn yes_no_flag(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(b) => Some(Value::Bool(*b)),
        Value::String(s) if s == "ja" => Some(Value::Bool(true)),
        Value::String(s) if s == "nein" => Some(Value::Bool(false)),
        _ => None,
    }
}

fn rate_value(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) => Some(Value::String(n.to_string())),
        Value::String(s) if !s.trim().is_empty() => Some(Value::String(s.trim().replace(',', "."))),
        _ => None,
    }
}
