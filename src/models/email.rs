use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const EMAIL_CONFIGS: &str = "email_configs";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailProvider {
    Gmail,
    Outlook,
    Imap,
}

/// Mailbox connection of one user within one company, stored at
/// `email_configs/{companyId}_{uid}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailConfig {
    pub company_id: String,
    pub uid: String,
    pub provider: EmailProvider,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_expiry: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imap_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    // Gmail push notifications
    #[serde(default)]
    pub push_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch_expiration: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,

    pub updated_at: DateTime<Utc>,
}

impl EmailConfig {
    pub fn doc_id(company_id: &str, uid: &str) -> String {
        format!("{}_{}", company_id, uid)
    }

    /// Watches renew when missing or when less than `threshold` remains.
    pub fn needs_watch_renewal(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        if self.provider != EmailProvider::Gmail || !self.push_enabled {
            return false;
        }
        match self.watch_expiration {
            None => true,
            Some(expires) => expires - now < threshold,
        }
    }

    pub fn redacted(&self) -> EmailConfigView {
        EmailConfigView {
            company_id: self.company_id.clone(),
            uid: self.uid.clone(),
            provider: self.provider,
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            imap_host: self.imap_host.clone(),
            smtp_host: self.smtp_host.clone(),
            has_access_token: self.access_token.is_some(),
            has_refresh_token: self.refresh_token.is_some(),
            has_password: self.password.is_some(),
            push_enabled: self.push_enabled,
            watch_expiration: self.watch_expiration,
            updated_at: self.updated_at,
        }
    }
}

/// Client-facing view of an `EmailConfig`; secrets become presence flags.
#[derive(Debug, Clone, Serialize)]
pub struct EmailConfigView {
    pub company_id: String,
    pub uid: String,
    pub provider: EmailProvider,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imap_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_host: Option<String>,
    pub has_access_token: bool,
    pub has_refresh_token: bool,
    pub has_password: bool,
    pub push_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch_expiration: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Cached message metadata under `companies/{cid}/email_cache/{messageId}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailCacheEntry {
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default = "default_folder")]
    pub folder: String,
    pub from: String,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub snippet: String,
    pub received_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub has_attachments: bool,
    /// Owner of the mailbox this entry was synced from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

fn default_folder() -> String {
    "INBOX".to_string()
}
