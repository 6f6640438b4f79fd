//! Notification collaborator.
//!
//! The core never delivers notifications itself. It asks a `Notifier` for a
//! one-shot alert and treats a refusal as a soft failure. `ReminderLog` is
//! the host implementation: each request is appended to a JSONL file under
//! an exclusive lock, for a platform daemon to pick up.

use crate::{Clock, Error, Result, SystemClock};
use chrono::{Duration, NaiveDateTime};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Platform notification service
pub trait Notifier {
    /// Ask the user for permission to alert. Returns whether it was granted.
    fn request_permission(&mut self) -> bool;

    /// Request an alert `after_seconds` from now
    fn schedule_one_shot(&mut self, after_seconds: u64, title: &str, body: &str) -> Result<()>;
}

impl<N: Notifier + ?Sized> Notifier for &mut N {
    fn request_permission(&mut self) -> bool {
        (**self).request_permission()
    }

    fn schedule_one_shot(&mut self, after_seconds: u64, title: &str, body: &str) -> Result<()> {
        (**self).schedule_one_shot(after_seconds, title, body)
    }
}

/// A reminder as recorded by `ReminderLog`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReminderRecord {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub after_seconds: u64,
    pub requested_at: NaiveDateTime,
    pub fire_at: NaiveDateTime,
}

impl ReminderRecord {
    /// A reminder requested at `requested_at`, due `after_seconds` later
    pub fn new(
        requested_at: NaiveDateTime,
        after_seconds: u64,
        title: &str,
        body: &str,
    ) -> Result<Self> {
        if after_seconds == 0 {
            return Err(Error::SchedulingFailure(
                "reminder delay must be positive".into(),
            ));
        }
        let fire_at = i64::try_from(after_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|delay| requested_at.checked_add_signed(delay))
            .ok_or_else(|| {
                Error::SchedulingFailure(format!(
                    "a delay of {}s is past the end of the calendar",
                    after_seconds
                ))
            })?;

        Ok(Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            body: body.to_string(),
            after_seconds,
            requested_at,
            fire_at,
        })
    }

    fn to_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Host notifier that records each reminder as one JSON line
///
/// Request times come from the injected clock, so a recorded `fire_at`
/// matches the instant the scheduler computed.
pub struct ReminderLog<C = SystemClock> {
    path: PathBuf,
    clock: C,
}

impl ReminderLog<SystemClock> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_clock(path, SystemClock)
    }
}

impl<C: Clock> ReminderLog<C> {
    pub fn with_clock(path: impl Into<PathBuf>, clock: C) -> Self {
        Self {
            path: path.into(),
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Write the record as a single line while holding the file lock
    fn record(&self, reminder: &ReminderRecord) -> Result<()> {
        let line = reminder.to_line()?;
        self.ensure_parent_dir()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.lock_exclusive()?;
        let written = file.write_all(line.as_bytes()).and_then(|_| file.flush());
        file.unlock()?;
        written?;

        tracing::debug!(
            "Recorded reminder '{}' due {} in {:?}",
            reminder.title,
            reminder.fire_at,
            self.path
        );
        Ok(())
    }
}

impl<C: Clock> Notifier for ReminderLog<C> {
    fn request_permission(&mut self) -> bool {
        match self.ensure_parent_dir() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Reminder log at {:?} is not writable: {}", self.path, e);
                false
            }
        }
    }

    fn schedule_one_shot(&mut self, after_seconds: u64, title: &str, body: &str) -> Result<()> {
        let reminder = ReminderRecord::new(self.clock.now(), after_seconds, title, body)?;
        self.record(&reminder)
            .map_err(|e| Error::SchedulingFailure(format!("could not record reminder: {}", e)))
    }
}

/// Every reminder in a log file, oldest first
///
/// A missing file is an empty log. Lines that do not decode are skipped
/// with a warning so one torn write cannot hide the rest.
pub fn read_reminders(path: &Path) -> Result<Vec<ReminderRecord>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut contents = String::new();
    file.lock_shared()?;
    let read = file.read_to_string(&mut contents);
    file.unlock()?;
    read?;

    let reminders: Vec<ReminderRecord> = contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(index, line)| match serde_json::from_str::<ReminderRecord>(line) {
            Ok(reminder) => Some(reminder),
            Err(e) => {
                tracing::warn!("Skipping reminder on line {} of {:?}: {}", index + 1, path, e);
                None
            }
        })
        .collect();

    tracing::debug!("Read {} reminders from {:?}", reminders.len(), path);
    Ok(reminders)
}

/// A notifier for hosts without notification support
///
/// Permission is always denied and every request fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn request_permission(&mut self) -> bool {
        false
    }

    fn schedule_one_shot(&mut self, _after_seconds: u64, _title: &str, _body: &str) -> Result<()> {
        Err(Error::SchedulingFailure(
            "notifications are not available on this host".into(),
        ))
    }
}
