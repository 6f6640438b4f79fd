//! Countdown to the nearest upcoming workout.
//!
//! `CountdownProjector` is read-only: it resolves every workout's next
//! occurrence and reports the closest one. `CountdownTicker` re-runs the
//! projection on a fixed cadence until it is stopped or dropped.

use crate::scheduler::next_occurrence;
use crate::{Clock, StateStore, Workout};
use chrono::NaiveDateTime;
use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

/// Displayed when there is nothing to count down to
pub const NO_UPCOMING: &str = "--:--:--";

/// The closest upcoming workout occurrence
#[derive(Clone, Debug, PartialEq)]
pub struct Upcoming<'a> {
    pub workout: &'a Workout,
    pub at: NaiveDateTime,
}

/// Time left until the nearest workout
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Countdown {
    None,
    Remaining { workout: String, seconds: i64 },
}

impl Countdown {
    pub fn seconds(&self) -> Option<i64> {
        match self {
            Countdown::None => None,
            Countdown::Remaining { seconds, .. } => Some(*seconds),
        }
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Countdown::None => f.write_str(NO_UPCOMING),
            Countdown::Remaining { seconds, .. } => f.write_str(&format_hms(*seconds)),
        }
    }
}

/// `HH:MM:SS`, hours not wrapped at 24. Negative input shows as zero.
pub fn format_hms(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

pub struct CountdownProjector<C> {
    clock: C,
}

impl<C: Clock> CountdownProjector<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// Earliest next occurrence across the list; ties go to the earlier entry
    pub fn next_workout<'a>(&self, workouts: &'a [Workout]) -> Option<Upcoming<'a>> {
        nearest(workouts, self.clock.now())
    }

    pub fn remaining(&self, workouts: &[Workout]) -> Countdown {
        let now = self.clock.now();
        match nearest(workouts, now) {
            None => Countdown::None,
            Some(upcoming) => Countdown::Remaining {
                workout: upcoming.workout.name.clone(),
                seconds: (upcoming.at - now).num_seconds(),
            },
        }
    }
}

fn nearest(workouts: &[Workout], now: NaiveDateTime) -> Option<Upcoming<'_>> {
    let mut best: Option<Upcoming<'_>> = None;
    for workout in workouts {
        let at = next_occurrence(workout.time, now);
        if best.as_ref().map_or(true, |b| at < b.at) {
            best = Some(Upcoming { workout, at });
        }
    }
    best
}

/// Background timer that recomputes the countdown
///
/// Stopping (or dropping) the ticker cancels the timer and joins its thread.
pub struct CountdownTicker {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CountdownTicker {
    /// Start ticking: every `interval`, snapshot the store and report
    ///
    /// The first report happens immediately.
    pub fn start<C, F>(store: StateStore, clock: C, interval: Duration, mut on_tick: F) -> Self
    where
        C: Clock + Send + 'static,
        F: FnMut(&Countdown) + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let projector = CountdownProjector::new(clock);

        let handle = std::thread::spawn(move || loop {
            let workouts = match store.workouts() {
                Ok(w) => w,
                Err(e) => {
                    tracing::warn!("Countdown stopped: {}", e);
                    break;
                }
            };
            on_tick(&projector.remaining(&workouts));

            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });

        tracing::debug!("Countdown ticker started ({:?} interval)", interval);
        Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("Countdown ticker thread panicked");
            }
            tracing::debug!("Countdown ticker stopped");
        }
    }
}

impl Drop for CountdownTicker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
