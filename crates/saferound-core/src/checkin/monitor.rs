//! Dead-man's switch.
//!
//! ## Escalation Levels
//!
//! - **OK**: checked in within the last `due_after`
//! - **DUE**: silent for longer than `due_after` (or never checked in)
//! - **LOCATE**: silent for longer than `due_after + locate_after`; the
//!   locate notification fires on entry
//!
//! Levels only ever rise between check-ins. An explicit check-in is the
//! one way back to OK.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::events::Event;
use crate::storage::config::CheckInConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckInLevel {
    Ok,
    Due,
    Locate,
}

impl CheckInLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckInLevel::Ok => "OK",
            CheckInLevel::Due => "DUE",
            CheckInLevel::Locate => "LOCATE",
        }
    }
}

impl std::fmt::Display for CheckInLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInState {
    pub last_check_in: Option<DateTime<Utc>>,
    pub level: CheckInLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInThresholds {
    /// Silence before DUE (default: 3 minutes)
    pub due_after_ms: u64,
    /// Further silence after DUE before LOCATE (default: 2 minutes)
    pub locate_after_ms: u64,
}

impl Default for CheckInThresholds {
    fn default() -> Self {
        Self {
            due_after_ms: 3 * 60 * 1000,
            locate_after_ms: 2 * 60 * 1000,
        }
    }
}

impl CheckInThresholds {
    pub fn from_config(config: &CheckInConfig) -> Self {
        Self {
            due_after_ms: config.due_after_secs.saturating_mul(1000),
            locate_after_ms: config.locate_after_secs.saturating_mul(1000),
        }
    }

    fn locate_total_ms(&self) -> u64 {
        self.due_after_ms.saturating_add(self.locate_after_ms)
    }
}

/// Level implied by the clock alone.
///
/// Comparisons are strict: exactly `due_after` of silence is still OK.
/// Without any check-in the user is at least DUE, and the LOCATE deadline
/// runs from when monitoring started.
pub fn evaluate_level(
    now: DateTime<Utc>,
    last_check_in: Option<DateTime<Utc>>,
    started_at: DateTime<Utc>,
    thresholds: &CheckInThresholds,
) -> CheckInLevel {
    let since = last_check_in.unwrap_or(started_at);
    let elapsed_ms = (now - since).num_milliseconds().max(0) as u64;

    if elapsed_ms > thresholds.locate_total_ms() {
        CheckInLevel::Locate
    } else if last_check_in.is_none() || elapsed_ms > thresholds.due_after_ms {
        CheckInLevel::Due
    } else {
        CheckInLevel::Ok
    }
}

/// Owns the single [`CheckInState`]. `tick` and `check_in` are its only
/// mutators and each replaces the whole record.
#[derive(Debug, Clone)]
pub struct CheckInMonitor {
    state: CheckInState,
    started_at: DateTime<Utc>,
    thresholds: CheckInThresholds,
}

impl CheckInMonitor {
    pub fn new(started_at: DateTime<Utc>, thresholds: CheckInThresholds) -> Self {
        Self {
            state: CheckInState {
                last_check_in: None,
                level: CheckInLevel::Ok,
            },
            started_at,
            thresholds,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> CheckInState {
        self.state
    }

    pub fn level(&self) -> CheckInLevel {
        self.state.level
    }

    pub fn thresholds(&self) -> &CheckInThresholds {
        &self.thresholds
    }

    /// Time since the last check-in, if there was one.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.state.last_check_in.map(|at| now - at)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Re-evaluate at `now`. Returns an event only when the level rose.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let from = self.state.level;
        let to = evaluate_level(now, self.state.last_check_in, self.started_at, &self.thresholds).max(from);
        if to == from {
            return None;
        }

        self.state = CheckInState {
            last_check_in: self.state.last_check_in,
            level: to,
        };
        let elapsed_secs = self.elapsed(now).map(|d| d.num_seconds());
        info!(%from, %to, ?elapsed_secs, "check-in level escalated");
        Some(Event::CheckInLevelChanged {
            from,
            to,
            elapsed_secs,
            at: now,
        })
    }

    /// Explicit "I'm OK": back to OK from any level.
    pub fn check_in(&mut self, now: DateTime<Utc>) -> Event {
        self.state = CheckInState {
            last_check_in: Some(now),
            level: CheckInLevel::Ok,
        };
        info!("checked in");
        Event::CheckedIn { at: now }
    }
}
