//! Ownership of running timers across separate invocations.
//!
//! A one-shot command that exits normally hands its running timers over to
//! the next command through the snapshot. A long-running `watch` session
//! holds a lock with a heartbeat; if the heartbeat stops, the session died
//! and the timers it was driving are treated as stale.

use super::files::atomic_write;
use super::records::RunningTimers;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Heartbeats missing for longer than this mark the owner as gone
pub const STALE_AFTER_SECS: i64 = 10;

/// Lock written by a long-running session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLock {
    pub pid: u32,
    pub heartbeat: DateTime<Utc>,
    /// Refresh interval of the owner, widens the staleness window
    pub tick_ms: u64,
}

impl SessionLock {
    pub fn new_at(now: DateTime<Utc>, tick_ms: u64) -> Self {
        Self {
            pid: std::process::id(),
            heartbeat: now,
            tick_ms,
        }
    }

    /// How long the heartbeat may be silent before the owner counts as gone
    pub fn grace(&self) -> Duration {
        let ticks = Duration::milliseconds((self.tick_ms as i64).saturating_mul(3));
        ticks.max(Duration::seconds(STALE_AFTER_SECS))
    }

    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        now - self.heartbeat > self.grace()
    }
}

/// Read the lock; a missing or unreadable lock is `None`
pub fn read_session_lock<P: AsRef<Path>>(path: P) -> Result<Option<SessionLock>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read session lock: {}", path.display()))?;
    match serde_json::from_str(&content) {
        Ok(lock) => Ok(Some(lock)),
        Err(e) => {
            tracing::warn!(path = %path.display(), "ignoring unreadable session lock: {}", e);
            Ok(None)
        }
    }
}

pub fn write_session_lock<P: AsRef<Path>>(path: P, lock: &SessionLock) -> Result<()> {
    let json = serde_json::to_string(lock)?;
    atomic_write(path, &json)
}

/// Remove the lock if present
pub fn clear_session_lock<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove session lock: {}", path.display()))?;
    }
    Ok(())
}

/// Decide what happens to timers found running in the snapshot.
///
/// Without a lock the last writer exited normally, so its timers carry on.
/// A live lock means a session is still driving them. Only a lock whose
/// heartbeat has stopped leads to the timers being discarded.
pub fn running_timers_policy(lock: Option<&SessionLock>, now: DateTime<Utc>) -> RunningTimers {
    match lock {
        Some(lock) if lock.is_stale_at(now) => RunningTimers::Discard,
        _ => RunningTimers::Resume,
    }
}
