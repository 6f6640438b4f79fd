//! Core domain types for Stride.
//!
//! This module defines the fundamental types used throughout the system:
//! - Daily workout times and workouts
//! - The user profile and its merge-style update
//! - The application state held by the store

use crate::{Error, Result};
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Default daily calorie-burn goal (kcal)
pub const DEFAULT_CALORIE_GOAL: f64 = 120.0;

/// Default daily step goal
pub const DEFAULT_STEP_GOAL: u32 = 10_000;

// ============================================================================
// Time of Day
// ============================================================================

/// A daily wall-clock time (hour 0-23, minute 0-59)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u32,
    minute: u32,
}

impl TimeOfDay {
    /// Build a time of day, rejecting out-of-range fields
    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(Error::InvalidTimeFormat(format!(
                "{:02}:{:02} is out of range (hour 0-23, minute 0-59)",
                hour, minute
            )));
        }
        Ok(Self { hour, minute })
    }

    /// Parse an `HH:MM` string
    ///
    /// Exactly two colon-separated fields of one or two ASCII digits each.
    /// A field that is not a number at all is `InvalidInput`; any other
    /// mismatch (field count, width, sign, range) is `InvalidTimeFormat`.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let fields: Vec<&str> = trimmed.split(':').collect();
        if fields.len() != 2 {
            return Err(Error::InvalidTimeFormat(format!(
                "'{}' must be in HH:MM format",
                trimmed
            )));
        }

        let hour = parse_field(fields[0], trimmed)?;
        let minute = parse_field(fields[1], trimmed)?;
        Self::new(hour, minute)
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    /// The time as a chrono `NaiveTime` at second 0
    pub fn as_naive_time(&self) -> NaiveTime {
        // Fields are range-checked on construction
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

fn parse_field(field: &str, whole: &str) -> Result<u32> {
    let digits = field.strip_prefix(&['-', '+'][..]).unwrap_or(field);
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidInput(format!(
            "'{}' is not a numeric time field in '{}'",
            field, whole
        )));
    }
    // Numeric, but signed, empty or too wide for HH:MM
    if digits.len() != field.len() || field.is_empty() || field.len() > 2 {
        return Err(Error::InvalidTimeFormat(format!(
            "'{}' must be in HH:MM format",
            whole
        )));
    }
    field
        .parse()
        .map_err(|_| Error::InvalidInput(format!("'{}' is not a number", field)))
}

impl From<NaiveTime> for TimeOfDay {
    fn from(t: NaiveTime) -> Self {
        Self {
            hour: t.hour(),
            minute: t.minute(),
        }
    }
}

impl FromStr for TimeOfDay {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<TimeOfDay> for String {
    fn from(t: TimeOfDay) -> Self {
        t.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

// ============================================================================
// Workouts
// ============================================================================

/// A scheduled daily workout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Workout {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub calories: f64,
    pub time: TimeOfDay,
}

/// User input for a workout that has not been validated yet
#[derive(Clone, Debug, Default)]
pub struct NewWorkout {
    pub name: String,
    pub time: String,
    pub calories: Option<f64>,
}

impl NewWorkout {
    pub fn new(name: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            time: time.into(),
            calories: None,
        }
    }

    pub fn with_calories(mut self, calories: f64) -> Self {
        self.calories = Some(calories);
        self
    }

    /// Validate the input and build a `Workout` with a fresh id
    pub fn validate(&self) -> Result<Workout> {
        let name = self.name.trim();
        if name.is_empty() || self.time.trim().is_empty() {
            return Err(Error::InvalidInput(
                "workout name and time are both required".into(),
            ));
        }

        let time = TimeOfDay::parse(&self.time)?;

        let calories = self.calories.unwrap_or(0.0);
        if !calories.is_finite() || calories < 0.0 {
            return Err(Error::InvalidInput(format!(
                "calories must be a non-negative number, got {}",
                calories
            )));
        }

        Ok(Workout {
            id: Uuid::new_v4(),
            name: name.to_string(),
            calories,
            time,
        })
    }
}

// ============================================================================
// Profile
// ============================================================================

/// The user's body measurements and goals
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub name: String,
    pub goals: String,
    pub height_cm: f64,
    pub weight_kg: f64,
    /// Personal daily calorie goal; `None` follows the configured default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calorie_goal_kcal: Option<f64>,
}

impl UserProfile {
    /// The calorie goal in effect, given the configured default
    pub fn calorie_goal_or(&self, default_kcal: f64) -> f64 {
        self.calorie_goal_kcal
            .filter(|g| g.is_finite() && *g > 0.0)
            .unwrap_or(default_kcal)
    }
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: "Athlete".into(),
            goals: "Lose 5kg".into(),
            height_cm: 175.0,
            weight_kg: 70.0,
            calorie_goal_kcal: None,
        }
    }
}

/// Partial profile update: present fields overwrite, absent fields are kept
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub goals: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub calorie_goal_kcal: Option<f64>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Check every present field without applying anything
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(Error::InvalidInput("name must not be empty".into()));
            }
        }
        check_positive("height", self.height_cm)?;
        check_positive("weight", self.weight_kg)?;
        check_positive("calorie goal", self.calorie_goal_kcal)?;
        Ok(())
    }

    /// Merge into a profile. Callers validate first.
    pub(crate) fn apply_to(self, profile: &mut UserProfile) {
        if let Some(name) = self.name {
            profile.name = name.trim().to_string();
        }
        if let Some(goals) = self.goals {
            profile.goals = goals.trim().to_string();
        }
        if let Some(h) = self.height_cm {
            profile.height_cm = h;
        }
        if let Some(w) = self.weight_kg {
            profile.weight_kg = w;
        }
        if let Some(g) = self.calorie_goal_kcal {
            profile.calorie_goal_kcal = Some(g);
        }
    }
}

fn check_positive(field: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if !v.is_finite() || v <= 0.0 => Err(Error::InvalidInput(format!(
            "{} must be a positive number, got {}",
            field, v
        ))),
        _ => Ok(()),
    }
}

// ============================================================================
// Application State
// ============================================================================

/// Everything the store owns: today's steps, the workout list and the profile
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct AppState {
    #[serde(default)]
    pub steps: u32,
    #[serde(default)]
    pub workouts: Vec<Workout>,
    #[serde(default)]
    pub profile: UserProfile,
}
