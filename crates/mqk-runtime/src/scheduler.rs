//! Wall-clock slot scheduler (§4.1). Pure logic: given the current UTC time
//! and the set of slots already completed today, decide which slots are due.
//! No IO — the daemon loop owns the minute tick and the daily reset.

use chrono::{DateTime, NaiveTime, Utc};
use std::collections::BTreeSet;

/// One scheduled decision/execution window, e.g. `EU_open` at 07:05 UTC.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Slot {
    pub name: String,
    pub hour: u32,
    pub minute: u32,
    pub allowed_exchanges: Vec<String>,
}

impl Slot {
    pub fn new<S: Into<String>>(name: S, hour: u32, minute: u32, allowed_exchanges: Vec<String>) -> Self {
        Self {
            name: name.into(),
            hour,
            minute,
            allowed_exchanges,
        }
    }

    fn time_of_day(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).expect("valid slot hour/minute")
    }
}

/// Default two-slot schedule: European open and US open.
pub fn default_slots() -> Vec<Slot> {
    vec![
        Slot::new("EU_open", 7, 5, vec!["XETR".into(), "XPAR".into(), "XMIL".into()]),
        Slot::new("US_open", 13, 35, vec!["XNYS".into(), "XNAS".into()]),
    ]
}

/// Slots whose scheduled time has passed `now` and which are not yet in
/// `completed_today`, in configured order.
pub fn due_slots<'a>(slots: &'a [Slot], now: DateTime<Utc>, completed_today: &BTreeSet<String>) -> Vec<&'a Slot> {
    let now_time = now.time();
    slots
        .iter()
        .filter(|s| !completed_today.contains(&s.name) && s.time_of_day() <= now_time)
        .collect()
}

/// Tracks which slots have completed today; resets at the UTC day boundary.
#[derive(Clone, Debug, Default)]
pub struct CompletionTracker {
    day: Option<chrono::NaiveDate>,
    completed: BTreeSet<String>,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Roll the completion set over if `now` is on a new UTC day.
    pub fn roll_to(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        if self.day != Some(today) {
            self.day = Some(today);
            self.completed.clear();
        }
    }

    pub fn mark_complete(&mut self, slot_name: &str) {
        self.completed.insert(slot_name.to_string());
    }

    pub fn completed(&self) -> &BTreeSet<String> {
        &self.completed
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryBudget {
    pub max_attempts: u32,
    pub retry_interval_seconds: u32,
    pub budget_seconds: u32,
}

impl RetryBudget {
    /// Default broker-readiness retry policy: 10 attempts, 90s apart, within 600s.
    pub fn sane_defaults() -> Self {
        Self {
            max_attempts: 10,
            retry_interval_seconds: 90,
            budget_seconds: 600,
        }
    }

    /// Whether another readiness attempt is allowed given how many have
    /// already been made and how much wall-clock time has elapsed.
    pub fn can_retry(&self, attempts_made: u32, elapsed_seconds: u32) -> bool {
        attempts_made < self.max_attempts && elapsed_seconds < self.budget_seconds
    }
}
