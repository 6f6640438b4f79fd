//! Configuration file support for Stride.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/stride/config.toml`.

use crate::metrics::{CalorieStrategy, Goals};
use crate::{Error, Result, UserProfile, DEFAULT_CALORIE_GOAL, DEFAULT_STEP_GOAL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub goals: GoalsConfig,

    #[serde(default)]
    pub reminders: RemindersConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Which step-calorie formula the dashboard uses
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CalorieStrategyKind {
    #[default]
    Flat,
    GoalScaled,
}

/// Daily targets
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GoalsConfig {
    #[serde(default = "default_step_goal")]
    pub step_goal: u32,

    /// Daily calorie goal for profiles that have not set their own
    #[serde(default = "default_calorie_goal")]
    pub calorie_goal: f64,

    #[serde(default)]
    pub calorie_strategy: CalorieStrategyKind,
}

impl Default for GoalsConfig {
    fn default() -> Self {
        Self {
            step_goal: default_step_goal(),
            calorie_goal: default_calorie_goal(),
            calorie_strategy: CalorieStrategyKind::default(),
        }
    }
}

/// Workout reminder settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemindersConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl RemindersConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(std::env::temp_dir);
    base.join("stride")
}

fn default_step_goal() -> u32 {
    DEFAULT_STEP_GOAL
}

fn default_calorie_goal() -> f64 {
    DEFAULT_CALORIE_GOAL
}

fn default_true() -> bool {
    true
}

fn default_tick_interval_ms() -> u64 {
    1000
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(std::env::temp_dir);
        base.join("stride").join("config.toml")
    }

    pub fn validate(&self) -> Result<()> {
        if self.goals.step_goal == 0 {
            return Err(Error::Config("goals.step_goal must be at least 1".into()));
        }
        if !self.goals.calorie_goal.is_finite() || self.goals.calorie_goal <= 0.0 {
            return Err(Error::Config(format!(
                "goals.calorie_goal must be positive, got {}",
                self.goals.calorie_goal
            )));
        }
        if self.reminders.tick_interval_ms == 0 {
            return Err(Error::Config(
                "reminders.tick_interval_ms must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Resolve metric goals, preferring the profile's own calorie goal
    pub fn goals(&self, profile: &UserProfile) -> Goals {
        let calorie_goal = profile.calorie_goal_or(self.goals.calorie_goal);

        let calorie_strategy = match self.goals.calorie_strategy {
            CalorieStrategyKind::Flat => CalorieStrategy::Flat,
            CalorieStrategyKind::GoalScaled => {
                CalorieStrategy::goal_scaled(self.goals.step_goal, calorie_goal)
            }
        };

        Goals {
            step_goal: self.goals.step_goal,
            calorie_goal_kcal: calorie_goal,
            calorie_strategy,
        }
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
