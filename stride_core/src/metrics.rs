//! Derived fitness metrics.
//!
//! Everything here is a pure function of the step count, the workout list and
//! the profile. Nothing is cached; values are recomputed on every read.

use crate::{AppState, Error, Result, Workout, DEFAULT_CALORIE_GOAL, DEFAULT_STEP_GOAL};
use serde::{Deserialize, Serialize};
use std::fmt;

/// kcal burned per step under the flat strategy
pub const KCAL_PER_STEP: f64 = 0.04;

/// Kilometres covered per step
pub const KM_PER_STEP: f64 = 0.0008;

const BMI_NORMAL_MIN: f64 = 18.5;
const BMI_NORMAL_MAX: f64 = 24.9;
const BMI_OVERWEIGHT_MIN: f64 = 25.0;
const BMI_OBESE_MIN: f64 = 30.0;

// ============================================================================
// Calories and progress
// ============================================================================

/// Calories burned from walking, flat rate
pub fn calories_from_steps(steps: u32) -> f64 {
    f64::from(steps) * KCAL_PER_STEP
}

/// Sum of workout calories plus the flat step contribution
pub fn total_calories(workouts: &[Workout], steps: u32) -> f64 {
    workout_calories(workouts) + calories_from_steps(steps)
}

fn workout_calories(workouts: &[Workout]) -> f64 {
    workouts.iter().map(|w| w.calories).sum()
}

/// Share of the step goal reached, clamped to 0..=100
pub fn progress_percent(steps: u32, goal: u32) -> f64 {
    if goal == 0 {
        return 100.0;
    }
    (f64::from(steps) / f64::from(goal) * 100.0).min(100.0)
}

/// Distance walked in kilometres
pub fn distance_km(steps: u32) -> f64 {
    f64::from(steps) * KM_PER_STEP
}

/// How step calories are derived
///
/// Two formulas exist in the wild; the caller picks one explicitly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CalorieStrategy {
    /// `steps * 0.04`
    #[default]
    Flat,
    /// `steps / step_goal * calorie_goal`, capped at the calorie goal
    GoalScaled { step_goal: u32, calorie_goal: f64 },
}

impl CalorieStrategy {
    pub fn goal_scaled(step_goal: u32, calorie_goal: f64) -> Self {
        CalorieStrategy::GoalScaled {
            step_goal,
            calorie_goal,
        }
    }

    pub fn calories(&self, steps: u32) -> f64 {
        match *self {
            CalorieStrategy::Flat => calories_from_steps(steps),
            CalorieStrategy::GoalScaled {
                step_goal,
                calorie_goal,
            } => {
                if step_goal == 0 {
                    return calorie_goal;
                }
                (f64::from(steps) / f64::from(step_goal) * calorie_goal).min(calorie_goal)
            }
        }
    }
}

// ============================================================================
// BMI
// ============================================================================

/// Body-mass index from height in centimetres and weight in kilograms
pub fn bmi(height_cm: f64, weight_kg: f64) -> Result<f64> {
    let m = height_m(height_cm)?;
    check_measurement("weight", weight_kg)?;
    Ok(weight_kg / (m * m))
}

fn height_m(height_cm: f64) -> Result<f64> {
    check_measurement("height", height_cm)?;
    Ok(height_cm / 100.0)
}

fn check_measurement(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "{} must be a positive number, got {}",
            field, value
        )))
    }
}

/// WHO weight bands
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    /// Lower bound of each band is inclusive. NaN lands in `Obese`.
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < BMI_NORMAL_MIN {
            BmiCategory::Underweight
        } else if bmi < BMI_OVERWEIGHT_MIN {
            BmiCategory::Normal
        } else if bmi < BMI_OBESE_MIN {
            BmiCategory::Overweight
        } else {
            BmiCategory::Obese
        }
    }

    /// Display color for the band
    pub fn color_hint(&self) -> &'static str {
        match self {
            BmiCategory::Underweight => "#2196F3",
            BmiCategory::Normal => "#4CAF50",
            BmiCategory::Overweight => "#FF9800",
            BmiCategory::Obese => "#F44336",
        }
    }
}

impl fmt::Display for BmiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BmiCategory::Underweight => "Underweight",
            BmiCategory::Normal => "Normal",
            BmiCategory::Overweight => "Overweight",
            BmiCategory::Obese => "Obese",
        };
        f.write_str(label)
    }
}

/// A BMI band together with its display color
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BmiReading {
    pub category: BmiCategory,
    pub color_hint: &'static str,
}

pub fn bmi_category(bmi: f64) -> BmiReading {
    let category = BmiCategory::from_bmi(bmi);
    BmiReading {
        category,
        color_hint: category.color_hint(),
    }
}

/// Weight range (kg) that keeps BMI inside the normal band
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct IdealWeightRange {
    pub min_kg: f64,
    pub max_kg: f64,
}

pub fn ideal_weight_range(height_cm: f64) -> Result<IdealWeightRange> {
    let m = height_m(height_cm)?;
    let m2 = m * m;
    Ok(IdealWeightRange {
        min_kg: round1(BMI_NORMAL_MIN * m2),
        max_kg: round1(BMI_NORMAL_MAX * m2),
    })
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

// ============================================================================
// Aggregate view
// ============================================================================

/// Goals that normalise the derived values
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Goals {
    pub step_goal: u32,
    /// Daily calorie goal for profiles without one of their own
    pub calorie_goal_kcal: f64,
    pub calorie_strategy: CalorieStrategy,
}

impl Default for Goals {
    fn default() -> Self {
        Self {
            step_goal: DEFAULT_STEP_GOAL,
            calorie_goal_kcal: DEFAULT_CALORIE_GOAL,
            calorie_strategy: CalorieStrategy::Flat,
        }
    }
}

/// Every value the dashboard shows, computed from one snapshot
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub steps: u32,
    pub calories_from_steps: f64,
    pub total_calories: f64,
    pub progress_percent: f64,
    pub distance_km: f64,
    pub calorie_goal_kcal: f64,
    pub bmi: Option<f64>,
    pub bmi_category: Option<BmiReading>,
    pub ideal_weight: Option<IdealWeightRange>,
}

impl DerivedMetrics {
    pub fn compute(state: &AppState, goals: &Goals) -> Self {
        let steps = state.steps;
        let step_calories = goals.calorie_strategy.calories(steps);
        let profile = &state.profile;

        // Unusable measurements hide the BMI card instead of failing the view
        let bmi = bmi(profile.height_cm, profile.weight_kg).ok();
        let ideal_weight = ideal_weight_range(profile.height_cm).ok();

        let calorie_goal_kcal = profile.calorie_goal_or(goals.calorie_goal_kcal);

        tracing::debug!(steps, bmi = ?bmi, "Computed derived metrics");

        Self {
            steps,
            calories_from_steps: step_calories,
            total_calories: workout_calories(&state.workouts) + step_calories,
            progress_percent: progress_percent(steps, goals.step_goal),
            distance_km: distance_km(steps),
            calorie_goal_kcal,
            bmi,
            bmi_category: bmi.map(bmi_category),
            ideal_weight,
        }
    }
}
