use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::state::AppState;

/// Next instant after `now` at which the wall clock in `tz` reads `hour:minute`.
///
/// An ambiguous local time (autumn fall-back) resolves to its earlier instant.
/// A local time inside the spring gap is moved one hour forward.
pub fn next_daily_run(now: DateTime<Utc>, hour: u32, minute: u32, tz: Tz) -> DateTime<Utc> {
    let today = now.with_timezone(&tz).date_naive();
    let candidate = resolve(today, hour, minute, tz);
    if candidate > now {
        return candidate;
    }
    let tomorrow = today.succ_opt().unwrap_or(today);
    resolve(tomorrow, hour, minute, tz)
}

fn resolve(date: NaiveDate, hour: u32, minute: u32, tz: Tz) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour.min(23), minute.min(59), 0).unwrap_or_default();
    let naive = date.and_time(time);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) => t.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            let shifted = naive + Duration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|| Utc.from_utc_datetime(&shifted))
        }
    }
}

/// Background job loops. Dropping the scheduler leaves the tasks running;
/// call `shutdown` to stop them.
#[derive(Default)]
pub struct Scheduler {
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn start(state: AppState) -> Self {
        let jobs = &state.config.jobs;
        if !jobs.enable_scheduler {
            tracing::info!("job scheduler disabled");
            return Self::default();
        }
        let tz: Tz = match jobs.timezone.parse() {
            Ok(tz) => tz,
            Err(e) => {
                tracing::error!(timezone = %jobs.timezone, "job scheduler not started: {}", e);
                return Self::default();
            }
        };

        let handles = vec![spawn_usage(state.clone(), tz), spawn_gmail_watch(state.clone())];
        tracing::info!(
            usage_at = %format!("{:02}:{:02} {}", jobs.usage_hour, jobs.usage_minute, tz),
            gmail_interval_hours = jobs.gmail_interval_hours,
            "job scheduler started"
        );
        Self { handles }
    }

    pub fn is_running(&self) -> bool {
        self.handles.iter().any(|h| !h.is_finished())
    }

    pub fn shutdown(self) {
        for handle in &self.handles {
            handle.abort();
        }
        tracing::info!(tasks = self.handles.len(), "job scheduler stopped");
    }
}

fn spawn_usage(state: AppState, tz: Tz) -> JoinHandle<()> {
    tokio::spawn(async move {
        let (hour, minute) = (state.config.jobs.usage_hour, state.config.jobs.usage_minute);
        loop {
            let now = Utc::now();
            let next = next_daily_run(now, hour, minute, tz);
            tracing::debug!(next_run = %next, "usage job scheduled");
            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            if let Err(e) = super::run_usage(state.store.as_ref()).await {
                tracing::error!("scheduled usage calculation failed: {}", e);
            }
        }
    })
}

fn spawn_gmail_watch(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let hours = state.config.jobs.gmail_interval_hours.max(1);
        let period = std::time::Duration::from_secs(hours * 3600);
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let threshold = Duration::hours(state.config.gmail.renew_before_hours);

        loop {
            interval.tick().await;
            if let Err(e) = super::renew_watches(
                state.store.clone(),
                state.gmail.clone(),
                &state.config.gmail.pubsub_topic,
                threshold,
            )
            .await
            {
                tracing::error!("scheduled gmail watch renewal failed: {}", e);
            }
        }
    })
}
