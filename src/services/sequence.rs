use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

use crate::database::store::MAX_UPDATE_ATTEMPTS;
use crate::database::{DocumentStore, StoreError, WriteOp};
use crate::messages::Msg;
use crate::models::sequence::{format_number, is_valid_format, prefix_of, MAX_SEQUENCE_NUMBER};
use crate::models::{NumberSequence, SequenceType};
use crate::observer::error::ObserverError;
use crate::services::error::{DomainError, DomainResult};

#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("number sequence {0} is exhausted")]
    Exhausted(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<SequenceError> for DomainError {
    fn from(err: SequenceError) -> Self {
        match err {
            SequenceError::Exhausted(kind) => {
                tracing::warn!(sequence = kind, "number sequence exhausted");
                DomainError::Conflict(Msg::SequenceExhausted)
            }
            SequenceError::Store(e) => DomainError::Store(e),
        }
    }
}

impl From<SequenceError> for ObserverError {
    fn from(err: SequenceError) -> Self {
        match err {
            SequenceError::Exhausted(_) => ObserverError::validation(Msg::SequenceExhausted.text()),
            SequenceError::Store(e) => ObserverError::Store(e),
        }
    }
}

pub fn collection(company_id: &str) -> String {
    format!("companies/{}/number_sequences", company_id)
}

/// A number taken from a sequence, valid only if `write` commits in the same batch
/// as the document that uses it.
#[derive(Debug, Clone)]
pub struct Reservation {
    pub number: String,
    pub value: u64,
    pub write: WriteOp,
}

/// Reserve the next number of `kind`. The returned write is version-guarded, so two
/// concurrent reservations cannot both commit.
pub async fn reserve(store: &dyn DocumentStore, company_id: &str, kind: SequenceType) -> Result<Reservation, SequenceError> {
    let coll = collection(company_id);
    let (mut sequence, version) = match store.get(&coll, kind.as_str()).await? {
        Some(doc) => (doc.parse::<NumberSequence>()?, Some(doc.version)),
        None => (NumberSequence::default_for(kind), None),
    };

    let value = sequence.next_number;
    if value > MAX_SEQUENCE_NUMBER {
        return Err(SequenceError::Exhausted(kind.as_str()));
    }
    let number = format_number(&sequence.format, value);
    sequence.next_number = value + 1;
    sequence.updated_at = Some(Utc::now());

    let write = match version {
        Some(v) => WriteOp::update(coll, kind.as_str(), &sequence, Some(v))?,
        None => WriteOp::create(coll, kind.as_str(), &sequence)?,
    };

    Ok(Reservation { number, value, write })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SequenceUpdate {
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub next_number: Option<u64>,
}

pub struct SequenceService {
    store: Arc<dyn DocumentStore>,
}

impl SequenceService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn parse_type(raw: &str) -> DomainResult<SequenceType> {
        raw.parse().map_err(|_| DomainError::BadRequest(Msg::UnknownSequenceType))
    }

    /// Every type, with defaults for types never used.
    pub async fn list(&self, company_id: &str) -> DomainResult<Vec<NumberSequence>> {
        let coll = collection(company_id);
        let mut out = Vec::with_capacity(SequenceType::ALL.len());
        for kind in SequenceType::ALL {
            let sequence = match self.store.get(&coll, kind.as_str()).await? {
                Some(doc) => doc.parse()?,
                None => NumberSequence::default_for(kind),
            };
            out.push(sequence);
        }
        Ok(out)
    }

    pub async fn update(&self, company_id: &str, kind: SequenceType, patch: SequenceUpdate) -> DomainResult<NumberSequence> {
        if let Some(format) = &patch.format {
            if !is_valid_format(format) {
                return Err(DomainError::field("format", Msg::SequenceFormatInvalid.text()));
            }
        }

        let coll = collection(company_id);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let (mut sequence, version) = match self.store.get(&coll, kind.as_str()).await? {
                Some(doc) => (doc.parse::<NumberSequence>()?, Some(doc.version)),
                None => (NumberSequence::default_for(kind), None),
            };

            if let Some(next) = patch.next_number {
                if next > MAX_SEQUENCE_NUMBER {
                    return Err(DomainError::field("next_number", Msg::SequenceNumberTooHigh.text()));
                }
                if next < sequence.next_number {
                    return Err(DomainError::field("next_number", Msg::SequenceNumberTooLow.text()));
                }
                sequence.next_number = next;
            }
            if let Some(format) = &patch.format {
                sequence.format = format.trim().to_string();
                sequence.prefix = prefix_of(&sequence.format);
            }
            sequence.updated_at = Some(Utc::now());

            let write = match version {
                Some(v) => WriteOp::update(coll.clone(), kind.as_str(), &sequence, Some(v))?,
                None => WriteOp::create(coll.clone(), kind.as_str(), &sequence)?,
            };
            match self.store.commit(vec![write]).await {
                Ok(_) => {
                    tracing::info!(company_id, sequence = kind.as_str(), next_number = sequence.next_number, "number sequence updated");
                    return Ok(sequence);
                }
                Err(e) if e.is_conflict() && attempt < MAX_UPDATE_ATTEMPTS => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    #[tokio::test]
    async fn reservations_advance_the_sequence() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let first = reserve(store.as_ref(), "c1", SequenceType::Quote).await.unwrap();
        assert_eq!(first.number, "AN-1001");
        store.commit(vec![first.write]).await.unwrap();

        let second = reserve(store.as_ref(), "c1", SequenceType::Quote).await.unwrap();
        assert_eq!(second.number, "AN-1002");
        assert_eq!(second.value, 1002);
    }

    #[tokio::test]
    async fn stale_reservation_cannot_commit() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let a = reserve(store.as_ref(), "c1", SequenceType::Invoice).await.unwrap();
        let b = reserve(store.as_ref(), "c1", SequenceType::Invoice).await.unwrap();
        assert_eq!(a.number, b.number);
        store.commit(vec![a.write]).await.unwrap();
        assert!(store.commit(vec![b.write]).await.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn next_number_cannot_go_backwards() {
        let service = SequenceService::new(Arc::new(MemoryStore::new()));
        let updated = service
            .update("c1", SequenceType::Invoice, SequenceUpdate { format: Some("RE-{number:4}".into()), next_number: Some(50) })
            .await
            .unwrap();
        assert_eq!(updated.preview(), "RE-0050");
        assert_eq!(updated.prefix, "RE-");

        let err = service
            .update("c1", SequenceType::Invoice, SequenceUpdate { format: None, next_number: Some(10) })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
        assert!(matches!(SequenceService::parse_type("receipt"), Err(DomainError::BadRequest(Msg::UnknownSequenceType))));
    }

    #[tokio::test]
    async fn next_number_is_bounded() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let service = SequenceService::new(store.clone());
        let err = service
            .update("c1", SequenceType::Invoice, SequenceUpdate { format: None, next_number: Some(u64::MAX) })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { ref field, .. } if field == "next_number"));

        service
            .update("c1", SequenceType::Invoice, SequenceUpdate { format: None, next_number: Some(MAX_SEQUENCE_NUMBER) })
            .await
            .unwrap();
        let last = reserve(store.as_ref(), "c1", SequenceType::Invoice).await.unwrap();
        assert_eq!(last.value, MAX_SEQUENCE_NUMBER);
        store.commit(vec![last.write]).await.unwrap();
        assert!(matches!(
            reserve(store.as_ref(), "c1", SequenceType::Invoice).await,
            Err(SequenceError::Exhausted("invoice"))
        ));
    }

    #[tokio::test]
    async fn oversized_padding_is_rejected() {
        let service = SequenceService::new(Arc::new(MemoryStore::new()));
        let err = service
            .update("c1", SequenceType::Invoice, SequenceUpdate { format: Some("RE-{number:2000000000}".into()), next_number: None })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { ref field, .. } if field == "format"));
    }
}
