#![forbid(unsafe_code)]

//! Core domain model and business logic for Stride.
//!
//! This crate provides:
//! - Domain types (workouts, times of day, profile, app state)
//! - Derived metrics (calories, BMI, progress, distance)
//! - Workout reminder scheduling and the next-workout countdown
//! - The injectable state store and its snapshot persistence
//! - Sensor and notification collaborator traits

pub mod types;
pub mod error;
pub mod clock;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod store;
pub mod sensor;
pub mod notify;
pub mod scheduler;
pub mod countdown;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use clock::{Clock, FixedClock, ManualClock, SystemClock};
pub use config::Config;
pub use metrics::{BmiCategory, CalorieStrategy, DerivedMetrics, Goals};
pub use store::StateStore;
pub use sensor::{ManualPedometer, StepSensor, StepTracker, Subscription};
pub use notify::{read_reminders, Notifier, NullNotifier, ReminderLog, ReminderRecord};
pub use scheduler::{ReminderStatus, SaveOutcome, ScheduledReminder, WorkoutScheduler};
pub use countdown::{Countdown, CountdownProjector, CountdownTicker};
