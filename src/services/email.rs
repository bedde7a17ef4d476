use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

use crate::database::{update_typed, DocumentStore, StoreError, WriteOp};
use crate::filter::{Filter, SortDirection};
use crate::messages::Msg;
use crate::middleware::AuthUser;
use crate::models::email::EMAIL_CONFIGS;
use crate::models::{EmailCacheEntry, EmailConfig, EmailConfigView, EmailProvider};
use crate::services::error::{DomainError, DomainResult};

pub fn cache_collection(company_id: &str) -> String {
    format!("companies/{}/email_cache", company_id)
}

/// Mailbox settings as submitted by the client. Secrets are write-only.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfigInput {
    pub provider: EmailProvider,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub imap_host: Option<String>,
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub push_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagePatch {
    #[serde(default)]
    pub read: Option<bool>,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
}

pub struct EmailService {
    store: Arc<dyn DocumentStore>,
}

impl EmailService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Upsert the caller's config. Omitted secrets and the watch state are kept.
    pub async fn upsert_config(&self, auth: &AuthUser, company_id: &str, input: EmailConfigInput) -> DomainResult<EmailConfigView> {
        let email = input.email.trim().to_string();
        if email.is_empty() || !email.contains('@') {
            return Err(DomainError::field("email", Msg::ValidationFailed.text()));
        }

        let id = EmailConfig::doc_id(company_id, &auth.uid);
        let existing = match self.store.get(EMAIL_CONFIGS, &id).await? {
            Some(doc) => Some(doc.parse::<EmailConfig>()?),
            None => None,
        };
        let previous = existing.as_ref();
        let same_mailbox = previous.map(|p| p.email == email && p.provider == input.provider).unwrap_or(false);

        let config = EmailConfig {
            company_id: company_id.to_string(),
            uid: auth.uid.clone(),
            provider: input.provider,
            email,
            display_name: input.display_name,
            access_token: input.access_token.or_else(|| previous.and_then(|p| p.access_token.clone())),
            refresh_token: input.refresh_token.or_else(|| previous.and_then(|p| p.refresh_token.clone())),
            token_expiry: input.token_expiry.or_else(|| previous.and_then(|p| p.token_expiry)),
            imap_host: input.imap_host,
            smtp_host: input.smtp_host,
            password: input.password.or_else(|| previous.and_then(|p| p.password.clone())),
            push_enabled: input
                .push_enabled
                .unwrap_or_else(|| previous.map(|p| p.push_enabled).unwrap_or(false)),
            // A different mailbox needs a fresh watch.
            watch_expiration: previous.filter(|_| same_mailbox).and_then(|p| p.watch_expiration),
            history_id: previous.filter(|_| same_mailbox).and_then(|p| p.history_id.clone()),
            updated_at: Utc::now(),
        };

        self.store
            .commit(vec![WriteOp::set(EMAIL_CONFIGS, id, &config)?])
            .await?;
        tracing::info!(company_id, uid = %auth.uid, provider = ?config.provider, "email config saved");
        Ok(config.redacted())
    }

    pub async fn get_config(&self, auth: &AuthUser, company_id: &str) -> DomainResult<EmailConfigView> {
        let doc = self
            .store
            .get(EMAIL_CONFIGS, &EmailConfig::doc_id(company_id, &auth.uid))
            .await?
            .ok_or(DomainError::NotFound(Msg::EmailConfigNotFound))?;
        Ok(doc.parse::<EmailConfig>()?.redacted())
    }

    /// Newest first.
    pub async fn list_messages(&self, company_id: &str, folder: Option<&str>, limit: usize) -> DomainResult<Vec<EmailCacheEntry>> {
        let mut filter = Filter::new();
        if let Some(folder) = folder.filter(|f| !f.is_empty()) {
            filter = filter.where_eq("folder", folder);
        }
        let filter = filter
            .order_by("received_at", SortDirection::Desc)
            .with_limit(limit);
        let docs = self.store.query(&cache_collection(company_id), &filter).await?;
        docs.iter().map(|d| d.parse().map_err(DomainError::from)).collect()
    }

    pub async fn upsert_messages(&self, auth: &AuthUser, company_id: &str, entries: Vec<EmailCacheEntry>) -> DomainResult<usize> {
        let coll = cache_collection(company_id);
        let writes = entries
            .into_iter()
            .map(|mut entry| {
                entry.uid.get_or_insert_with(|| auth.uid.clone());
                WriteOp::set(coll.clone(), entry.message_id.clone(), &entry)
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        let count = writes.len();
        if count > 0 {
            self.store.commit(writes).await?;
        }
        tracing::debug!(company_id, count, "email cache updated");
        Ok(count)
    }

    pub async fn update_message(&self, company_id: &str, message_id: &str, patch: MessagePatch) -> DomainResult<EmailCacheEntry> {
        let coll = cache_collection(company_id);
        self.store
            .get(&coll, message_id)
            .await?
            .ok_or(DomainError::NotFound(Msg::EmailMessageNotFound))?;

        let (entry, _) = update_typed::<EmailCacheEntry, _, DomainError>(self.store.as_ref(), &coll, message_id, |entry| {
            if let Some(read) = patch.read {
                entry.read = read;
            }
            if let Some(labels) = &patch.labels {
                entry.labels = labels.clone();
            }
            Ok(())
        })
        .await?;
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::database::MemoryStore;
    use serde_json::json;

    fn user() -> AuthUser {
        AuthUser { uid: "u1".into(), role: Role::User, email: None, companies: vec!["c1".into()] }
    }

    #[tokio::test]
    async fn config_keeps_secrets_across_updates() {
        let service = EmailService::new(Arc::new(MemoryStore::new()));
        let first: EmailConfigInput = serde_json::from_value(json!({
            "provider": "gmail", "email": "info@example.de", "access_token": "ya29", "push_enabled": true
        }))
        .unwrap();
        let view = service.upsert_config(&user(), "c1", first).await.unwrap();
        assert!(view.has_access_token);

        let second: EmailConfigInput =
            serde_json::from_value(json!({ "provider": "gmail", "email": "info@example.de", "display_name": "Info" })).unwrap();
        let view = service.upsert_config(&user(), "c1", second).await.unwrap();
        assert!(view.has_access_token);
        assert!(view.push_enabled);
        assert_eq!(service.get_config(&user(), "c1").await.unwrap().display_name.as_deref(), Some("Info"));
    }

    #[tokio::test]
    async fn messages_are_listed_newest_first_and_flagged() {
        let service = EmailService::new(Arc::new(MemoryStore::new()));
        let entries: Vec<EmailCacheEntry> = serde_json::from_value(json!([
            { "message_id": "m1", "from": "a@example.de", "received_at": "2024-05-01T08:00:00Z" },
            { "message_id": "m2", "from": "b@example.de", "received_at": "2024-05-02T08:00:00Z" },
            { "message_id": "m3", "from": "c@example.de", "folder": "SENT", "received_at": "2024-05-03T08:00:00Z" }
        ]))
        .unwrap();
        assert_eq!(service.upsert_messages(&user(), "c1", entries).await.unwrap(), 3);

        let inbox = service.list_messages("c1", Some("INBOX"), 10).await.unwrap();
        let ids: Vec<_> = inbox.iter().map(|e| e.message_id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m1"]);
        assert_eq!(inbox[0].uid.as_deref(), Some("u1"));

        let patch = MessagePatch { read: Some(true), labels: Some(vec!["wichtig".into()]) };
        let updated = service.update_message("c1", "m1", patch).await.unwrap();
        assert!(updated.read);
        assert_eq!(updated.labels, vec!["wichtig"]);
        assert!(matches!(
            service.update_message("c1", "m9", MessagePatch::default()).await,
            Err(DomainError::NotFound(Msg::EmailMessageNotFound))
        ));
    }
}
