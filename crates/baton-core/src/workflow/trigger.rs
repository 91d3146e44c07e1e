use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::goal::GoalConfig;

/// Why a continuous-mode cycle started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Trigger {
    /// Cancelled; the loop is over
    None,
    GoalChanged,
    SteeringMessage,
    AutoTimer,
    CronSchedule,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::GoalChanged => "goal-changed",
            Self::SteeringMessage => "steering-message",
            Self::AutoTimer => "auto-timer",
            Self::CronSchedule => "cron-schedule",
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When the next timed trigger fires, and which kind it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    pub at: Instant,
    pub kind: Trigger,
}

/// Time until the schedule's next tick after now.
pub fn next_cron_tick(schedule: &cron::Schedule) -> Option<Duration> {
    let now = Utc::now();
    let next = schedule.after(&now).next()?;
    Some((next - now).to_std().unwrap_or(Duration::ZERO))
}

/// The earlier of the auto-timer and the next cron tick.
pub fn next_deadline(config: &GoalConfig, now: Instant) -> Option<Deadline> {
    let auto = config.auto_duration().map(|d| Deadline {
        at: now + d,
        kind: Trigger::AutoTimer,
    });
    let cron = config
        .cron_schedule()
        .and_then(|s| next_cron_tick(&s))
        .map(|d| Deadline {
            at: now + d,
            kind: Trigger::CronSchedule,
        });

    match (auto, cron) {
        (Some(a), Some(c)) => Some(if c.at < a.at { c } else { a }),
        (a, c) => a.or(c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(yaml: &str) -> GoalConfig {
        GoalConfig::from_frontmatter(yaml).unwrap()
    }

    #[test]
    fn test_no_schedule_no_deadline() {
        assert!(next_deadline(&config(""), Instant::now()).is_none());
    }

    #[test]
    fn test_auto_timer_only() {
        let now = Instant::now();
        let d = next_deadline(&config("continuous:\n  autoDuration: 100ms\n"), now).unwrap();
        assert_eq!(d.kind, Trigger::AutoTimer);
        assert_eq!(d.at, now + Duration::from_millis(100));
    }

    #[test]
    fn test_earlier_source_wins() {
        let now = Instant::now();
        // Every second beats one day.
        let d = next_deadline(
            &config("continuous:\n  autoDuration: 1d\n  cron: \"* * * * * *\"\n"),
            now,
        )
        .unwrap();
        assert_eq!(d.kind, Trigger::CronSchedule);
        assert!(d.at <= now + Duration::from_secs(1));

        // 100ms beats a yearly schedule.
        let d = next_deadline(
            &config("continuous:\n  autoDuration: 100ms\n  cron: \"0 0 1 1 *\"\n"),
            now,
        )
        .unwrap();
        assert_eq!(d.kind, Trigger::AutoTimer);
    }

    #[test]
    fn test_invalid_cron_falls_back_to_timer() {
        let d = next_deadline(
            &config("continuous:\n  autoDuration: 5m\n  cron: \"whenever\"\n"),
            Instant::now(),
        )
        .unwrap();
        assert_eq!(d.kind, Trigger::AutoTimer);
    }

    #[test]
    fn test_trigger_serializes_kebab_case() {
        assert_eq!(serde_json::to_value(Trigger::SteeringMessage).unwrap(), "steering-message");
        assert_eq!(Trigger::CronSchedule.to_string(), "cron-schedule");
    }
}
