use chrono::{DateTime, Utc};

const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// Countdown timer state for a task.
///
/// Elapsed time is `time_spent` plus the in-flight session measured from
/// `started_at`, so every reading is a pure function of "now".
#[derive(Debug, Clone, PartialEq)]
pub struct TimeTracking {
    /// Target duration in minutes
    pub estimated_minutes: Option<f64>,
    /// Minutes credited from finished sessions
    pub time_spent: f64,
    /// Start of the running session; `None` while stopped
    pub started_at: Option<DateTime<Utc>>,
}

impl TimeTracking {
    pub fn new(estimated_minutes: Option<f64>) -> Self {
        Self {
            estimated_minutes: sanitize_estimate(estimated_minutes),
            time_spent: 0.0,
            started_at: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Start a session. Returns false if one was already running; its start
    /// time is kept so no elapsed time is lost.
    pub fn start_at(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_running() {
            return false;
        }
        self.started_at = Some(now);
        true
    }

    /// Stop the running session and credit its minutes.
    /// Returns the credited minutes, or `None` if nothing was running.
    pub fn stop_at(&mut self, now: DateTime<Utc>) -> Option<f64> {
        let started = self.started_at.take()?;
        let minutes = minutes_between(started, now);
        self.time_spent += minutes;
        Some(minutes)
    }

    /// Total elapsed minutes including the running session
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> f64 {
        match self.started_at {
            Some(started) => self.time_spent + minutes_between(started, now),
            None => self.time_spent,
        }
    }

    /// Minutes left before the estimate; negative in overtime
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Option<f64> {
        self.estimated_minutes
            .map(|estimate| estimate - self.elapsed_at(now))
    }

    /// Running with an estimate that has been used up
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.is_running() && self.remaining_at(now).is_some_and(|left| left <= 0.0)
    }

    pub fn set_estimate(&mut self, estimated_minutes: Option<f64>) {
        self.estimated_minutes = sanitize_estimate(estimated_minutes);
    }
}

/// Estimates must be positive finite numbers; anything else means "no estimate"
pub fn sanitize_estimate(estimated_minutes: Option<f64>) -> Option<f64> {
    estimated_minutes.filter(|m| m.is_finite() && *m > 0.0)
}

/// Minutes between two instants. Clock skew never yields negative time.
fn minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let millis = end.signed_duration_since(start).num_milliseconds().max(0);
    millis as f64 / MILLIS_PER_MINUTE
}

/// Format minutes as "Xh Ym" (e.g. "1h 30m", "45m", "2h")
pub fn format_minutes(minutes: f64) -> String {
    let total = minutes.abs().floor() as i64;
    let hours = total / 60;
    let mins = total % 60;

    if hours > 0 && mins > 0 {
        format!("{}h {}m", hours, mins)
    } else if hours > 0 {
        format!("{}h", hours)
    } else {
        format!("{}m", mins)
    }
}

/// Format a countdown as "M:SS", with a leading '-' once in overtime
pub fn format_countdown(remaining_minutes: f64) -> String {
    let overtime = remaining_minutes < 0.0;
    let total_secs = if overtime {
        (remaining_minutes.abs() * 60.0).floor() as i64
    } else {
        (remaining_minutes * 60.0).ceil() as i64
    };
    let sign = if overtime && total_secs > 0 { "-" } else { "" };
    format!("{}{}:{:02}", sign, total_secs / 60, total_secs % 60)
}
