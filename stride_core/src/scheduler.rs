//! Workout reminder scheduling.
//!
//! A workout repeats daily at its time of day. Its next occurrence is today
//! at `hh:mm:00`, or the same time tomorrow once that moment has passed
//! (an exact tie counts as passed).

use crate::{
    Clock, Error, NewWorkout, Notifier, Result, StateStore, TimeOfDay, Workout,
};
use chrono::{Duration, NaiveDateTime};

/// Next instant at which a daily time of day occurs, strictly after `now`
pub fn next_occurrence(time: TimeOfDay, now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date().and_time(time.as_naive_time());
    if today <= now {
        today + Duration::days(1)
    } else {
        today
    }
}

/// Whole seconds from `now` until the next occurrence, rounded to nearest
pub fn seconds_until_fire(time: TimeOfDay, now: NaiveDateTime) -> Result<i64> {
    let diff = next_occurrence(time, now) - now;
    let seconds = (diff.num_milliseconds() as f64 / 1000.0).round() as i64;
    if seconds <= 0 {
        return Err(Error::InvalidSchedule(seconds));
    }
    Ok(seconds)
}

/// Title of the alert for a workout
pub fn reminder_title(workout_name: &str) -> String {
    format!("Time for {}!", workout_name)
}

pub const REMINDER_BODY: &str = "Your scheduled workout starts now!";

/// A reminder the notifier accepted
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledReminder {
    pub fire_at: NaiveDateTime,
    pub after_seconds: u64,
    pub title: String,
}

/// What happened to the reminder of a saved workout
#[derive(Clone, Debug, PartialEq)]
pub enum ReminderStatus {
    Scheduled(ScheduledReminder),
    /// Reminders are switched off in the configuration
    Disabled,
    /// The slot is less than a second away, so there is nothing to remind of
    Imminent,
    /// The workout is saved but no alert will fire
    Failed(String),
}

/// Result of saving a workout
#[derive(Clone, Debug)]
pub struct SaveOutcome {
    pub workout: Workout,
    pub reminder: ReminderStatus,
}

/// Resolves workout times against a clock and hands reminders to a notifier
pub struct WorkoutScheduler<C, N> {
    clock: C,
    notifier: N,
    enabled: bool,
}

impl<C: Clock, N: Notifier> WorkoutScheduler<C, N> {
    pub fn new(clock: C, notifier: N) -> Self {
        Self {
            clock,
            notifier,
            enabled: true,
        }
    }

    /// Switch reminder dispatch on or off. Saving workouts is unaffected.
    pub fn with_reminders(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn request_permission(&mut self) -> bool {
        let granted = self.notifier.request_permission();
        if !granted {
            tracing::warn!("Notification permission denied; reminders may not fire");
        }
        granted
    }

    /// Ask the notifier for a one-shot alert at the workout's next occurrence
    pub fn schedule(&mut self, workout: &Workout) -> Result<ScheduledReminder> {
        let now = self.clock.now();
        let fire_at = next_occurrence(workout.time, now);
        let after_seconds = seconds_until_fire(workout.time, now)? as u64;
        let title = reminder_title(&workout.name);

        self.notifier
            .schedule_one_shot(after_seconds, &title, REMINDER_BODY)
            .map_err(|e| match e {
                Error::SchedulingFailure(_) => e,
                other => Error::SchedulingFailure(other.to_string()),
            })?;

        tracing::info!(
            "Scheduled reminder for '{}' at {} (in {}s)",
            workout.name,
            fire_at,
            after_seconds
        );

        Ok(ScheduledReminder {
            fire_at,
            after_seconds,
            title,
        })
    }

    /// Validate and store a workout, then try to schedule its reminder
    ///
    /// Validation errors are returned before the store is touched. Once the
    /// workout is stored, a reminder failure is only reported in the outcome.
    pub fn save_workout(&mut self, store: &StateStore, input: &NewWorkout) -> Result<SaveOutcome> {
        let workout = input.validate()?;
        store.add_workout(workout.clone())?;

        let reminder = if !self.enabled {
            ReminderStatus::Disabled
        } else {
            match self.schedule(&workout) {
                Ok(reminder) => ReminderStatus::Scheduled(reminder),
                Err(Error::InvalidSchedule(seconds)) => {
                    tracing::debug!(
                        "Workout '{}' starts now ({}s away), no reminder requested",
                        workout.name,
                        seconds
                    );
                    ReminderStatus::Imminent
                }
                Err(e) => {
                    tracing::warn!("Workout '{}' saved without reminder: {}", workout.name, e);
                    ReminderStatus::Failed(e.to_string())
                }
            }
        };

        Ok(SaveOutcome { workout, reminder })
    }
}
