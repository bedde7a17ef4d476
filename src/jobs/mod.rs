//! Background jobs. Each job can run from the scheduler, the admin API or the CLI.

pub mod gmail_watch;
pub mod scheduler;
pub mod usage;

pub use gmail_watch::renew_watches;
pub use scheduler::{next_daily_run, Scheduler};
pub use usage::{run_usage, usage_snapshot};

use crate::database::{DocumentStore, StoreError, WriteOp};
use crate::models::job::JOB_RUNS;
use crate::models::JobRun;

/// Store the run summary; a second run on the same day replaces the first.
pub(crate) async fn record_run(store: &dyn DocumentStore, run: &JobRun) -> Result<(), StoreError> {
    store.commit(vec![WriteOp::set(JOB_RUNS, run.doc_id(), run)?]).await?;
    Ok(())
}
