use chrono::Utc;
use std::collections::BTreeMap;

use crate::database::{update_typed, DocumentStore, StoreError};
use crate::filter::Filter;
use crate::models::company::{COMPANIES, TRACKED_SUBCOLLECTIONS};
use crate::models::{Company, JobFailure, JobRun, UsageSnapshot};

pub const JOB_NAME: &str = "usage";

/// Document counts of every tracked subcollection of one company.
pub async fn usage_snapshot(store: &dyn DocumentStore, company_id: &str) -> Result<UsageSnapshot, StoreError> {
    let mut counts = BTreeMap::new();
    let all = Filter::new();
    for name in TRACKED_SUBCOLLECTIONS {
        let count = store
            .count(&format!("{}/{}/{}", COMPANIES, company_id, name), &all)
            .await?;
        counts.insert(name.to_string(), count);
    }
    let total_documents = counts.values().sum();
    Ok(UsageSnapshot { counts, total_documents, calculated_at: Utc::now() })
}

/// Recalculate `usage` for every company. One failing company does not stop the run.
pub async fn run_usage(store: &dyn DocumentStore) -> Result<JobRun, StoreError> {
    let started_at = Utc::now();
    let companies = store.query(COMPANIES, &Filter::new()).await?;
    tracing::info!(companies = companies.len(), "usage calculation started");

    let mut run = JobRun {
        job: JOB_NAME.to_string(),
        processed: 0,
        failed: 0,
        skipped: 0,
        failures: Vec::new(),
        started_at,
        finished_at: started_at,
    };

    for company in &companies {
        match update_company(store, &company.id).await {
            Ok(total) => {
                tracing::debug!(company_id = %company.id, total_documents = total, "usage updated");
                run.processed += 1;
            }
            Err(e) => {
                tracing::error!(company_id = %company.id, "usage calculation failed: {}", e);
                run.failed += 1;
                run.failures.push(JobFailure { target: company.id.clone(), error: e.to_string() });
            }
        }
    }

    run.finished_at = Utc::now();
    super::record_run(store, &run).await?;
    tracing::info!(processed = run.processed, failed = run.failed, "usage calculation finished");
    Ok(run)
}

async fn update_company(store: &dyn DocumentStore, company_id: &str) -> Result<u64, StoreError> {
    let snapshot = usage_snapshot(store, company_id).await?;
    let total = snapshot.total_documents;
    update_typed::<Company, _, StoreError>(store, COMPANIES, company_id, |company| {
        company.usage = Some(snapshot.clone());
        Ok(())
    })
    .await?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::store::to_map;
    use crate::database::MemoryStore;
    use crate::models::job::JOB_RUNS;
    use serde_json::json;

    async fn stored_usage(store: &MemoryStore) -> UsageSnapshot {
        let company: Company = store.get(COMPANIES, "c1").await.unwrap().unwrap().parse().unwrap();
        company.usage.unwrap()
    }

    #[tokio::test]
    async fn totals_are_stable_across_runs() {
        let store = MemoryStore::new();
        store.create(COMPANIES, "c1", to_map(&Company::new("A GmbH", "u1")).unwrap()).await.unwrap();
        store.create(COMPANIES, "c2", to_map(&Company::new("B GmbH", "u2")).unwrap()).await.unwrap();
        for id in ["k1", "k2"] {
            let body = json!({ "name": id }).as_object().cloned().unwrap();
            store.create("companies/c1/customers", id, body).await.unwrap();
        }
        let body = json!({ "total": 1 }).as_object().cloned().unwrap();
        store.create("companies/c1/invoices", "i1", body).await.unwrap();

        let first = run_usage(&store).await.unwrap();
        assert_eq!(first.processed, 2);
        let a = stored_usage(&store).await;
        assert_eq!(a.total_documents, 3);
        assert_eq!(a.counts["customers"], 2);

        run_usage(&store).await.unwrap();
        let b = stored_usage(&store).await;
        assert_eq!(a.counts, b.counts);
        assert_eq!(a.total_documents, b.total_documents);

        let runs = store.query(JOB_RUNS, &Filter::new()).await.unwrap();
        assert_eq!(runs.len(), 1);
    }
}
