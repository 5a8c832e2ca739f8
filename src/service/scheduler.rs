use super::dispatcher::Dispatcher;
use crate::config::Config;
use crate::error::DispatchError;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Accepts classic 5-field expressions (`0 0 * * *`) as well as the
/// seconds-first 6/7-field form understood by `cron`.
pub fn parse_schedule(expr: &str) -> Result<Schedule, DispatchError> {
    let normalized = match expr.split_whitespace().count() {
        5 => format!("0 {}", expr.trim()),
        _ => expr.trim().to_string(),
    };
    Schedule::from_str(&normalized).map_err(|e| DispatchError::InvalidSchedule {
        expr: expr.to_string(),
        reason: e.to_string(),
    })
}

pub fn parse_timezone(name: &str) -> Result<Tz, DispatchError> {
    name.parse::<Tz>()
        .map_err(|_| DispatchError::UnknownTimezone(name.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Scheduled,
    Running,
}

/// Fires the dispatch cycle on a calendar schedule in a fixed timezone.
///
/// Each trigger spawns its cycle and goes straight back to waiting for the
/// next one, so a slow cycle may overlap the following trigger.
pub struct Scheduler {
    schedule: Schedule,
    timezone: Tz,
    dispatcher: Arc<Dispatcher>,
    shutdown_grace: Duration,
    state: watch::Sender<SchedulerState>,
}

impl Scheduler {
    pub fn new(
        schedule: Schedule,
        timezone: Tz,
        dispatcher: Arc<Dispatcher>,
        shutdown_grace: Duration,
    ) -> Self {
        let (state, _) = watch::channel(SchedulerState::Stopped);
        Self {
            schedule,
            timezone,
            dispatcher,
            shutdown_grace,
            state,
        }
    }

    pub fn from_config(cfg: &Config, dispatcher: Arc<Dispatcher>) -> Result<Self, DispatchError> {
        Ok(Self::new(
            parse_schedule(&cfg.schedule)?,
            parse_timezone(&cfg.timezone)?,
            dispatcher,
            cfg.shutdown_grace(),
        ))
    }

    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// First trigger strictly after `after`, expressed in the scheduler's timezone.
    pub fn next_fire_after(&self, after: DateTime<Utc>) -> Option<DateTime<Tz>> {
        self.schedule
            .after(&after.with_timezone(&self.timezone))
            .next()
    }

    /// Runs until `shutdown` resolves, then waits up to the grace period for
    /// in-flight cycles before aborting them.
    pub async fn run_until<S>(&self, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut cycles: JoinSet<()> = JoinSet::new();
        let mut last_fire: Option<DateTime<Utc>> = None;

        info!(timezone = %self.timezone, "scheduler started");

        loop {
            let now = Utc::now();
            let from = last_fire.map_or(now, |fired| fired.max(now));
            let Some(next) = self.next_fire_after(from) else {
                warn!("schedule has no upcoming trigger; scheduler stopping");
                break;
            };
            let wait = (next.with_timezone(&Utc) - now).to_std().unwrap_or_default();

            self.state.send_replace(if cycles.is_empty() {
                SchedulerState::Scheduled
            } else {
                SchedulerState::Running
            });
            debug!(next_fire = %next, wait_secs = wait.as_secs(), "next dispatch cycle armed");

            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                _ = tokio::time::sleep(wait) => {
                    last_fire = Some(next.with_timezone(&Utc));
                    let dispatcher = self.dispatcher.clone();
                    cycles.spawn(async move {
                        // Outcome is logged inside the cycle span.
                        let _ = dispatcher.run_cycle().await;
                    });
                }
                Some(joined) = cycles.join_next(), if !cycles.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "dispatch cycle task failed");
                    }
                }
            }
        }

        if !cycles.is_empty() {
            info!(in_flight = cycles.len(), "waiting for in-flight dispatch cycles");
            let drained = tokio::time::timeout(self.shutdown_grace, async {
                while cycles.join_next().await.is_some() {}
            })
            .await;
            if drained.is_err() {
                warn!(
                    in_flight = cycles.len(),
                    "grace period elapsed; aborting in-flight dispatch cycles"
                );
                cycles.abort_all();
            }
        }

        self.state.send_replace(SchedulerState::Stopped);
        info!("scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn five_field_expression_gets_a_seconds_column() {
        let schedule = parse_schedule("0 0 * * *").expect("daily at midnight");
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let next = schedule.after(&start).next().expect("next");
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 16, 0, 0, 0).unwrap());
    }

    #[test]
    fn garbage_expression_is_rejected() {
        assert!(matches!(
            parse_schedule("every night please"),
            Err(DispatchError::InvalidSchedule { .. })
        ));
    }

    #[test]
    fn timezone_names_are_iana() {
        assert!(parse_timezone("America/New_York").is_ok());
        assert!(matches!(
            parse_timezone("EST5EDT-ish"),
            Err(DispatchError::UnknownTimezone(_))
        ));
    }
}
