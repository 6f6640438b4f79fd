//! Integration tests for the stride binary.
//!
//! These tests verify end-to-end behavior including:
//! - Step recording and the dashboard's derived values
//! - Workout scheduling, validation and reminder dispatch
//! - Profile edits and BMI display
//! - The next-workout countdown

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a test data directory with an empty config file
fn setup_test_dir() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    fs::write(dir.path().join("config.toml"), "").expect("Failed to write config");
    dir
}

/// Helper to get the CLI binary pointed at a test directory
fn stride(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("stride"));
    cmd.arg("--data-dir")
        .arg(dir)
        .arg("--config")
        .arg(dir.join("config.toml"));
    cmd
}

fn read_state(dir: &Path) -> serde_json::Value {
    let contents = fs::read_to_string(dir.join("state.json")).expect("Failed to read state");
    serde_json::from_str(&contents).expect("State is not valid JSON")
}

#[test]
fn test_cli_help() {
    Command::new(assert_cmd::cargo::cargo_bin!("stride"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Daily steps, workouts and reminders"));
}

#[test]
fn test_empty_dashboard() {
    let temp_dir = setup_test_dir();

    stride(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("0 / 10,000 (0%)"))
        .stdout(predicate::str::contains("--:--:--"));
}

#[test]
fn test_steps_feed_dashboard() {
    let temp_dir = setup_test_dir();

    stride(temp_dir.path())
        .args(["steps", "set", "5000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Steps today: 5,000"));

    assert_eq!(read_state(temp_dir.path())["steps"], 5000);

    stride(temp_dir.path())
        .arg("dashboard")
        .assert()
        .success()
        .stdout(predicate::str::contains("5,000 / 10,000 (50%)"))
        .stdout(predicate::str::contains("4.00 km"))
        .stdout(predicate::str::contains("From steps:    200.0 kcal"))
        .stdout(predicate::str::contains("Total:         200.0 kcal"));
}

#[test]
fn test_steps_reset() {
    let temp_dir = setup_test_dir();

    stride(temp_dir.path()).args(["steps", "set", "42"]).assert().success();
    stride(temp_dir.path())
        .args(["steps", "reset"])
        .assert()
        .success();

    assert_eq!(read_state(temp_dir.path())["steps"], 0);
}

#[test]
fn test_goal_scaled_calories() {
    let temp_dir = setup_test_dir();
    fs::write(
        temp_dir.path().join("config.toml"),
        "[goals]\ncalorie_strategy = \"goal_scaled\"\n",
    )
    .unwrap();

    stride(temp_dir.path()).args(["steps", "set", "5000"]).assert().success();

    stride(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Move:          60/120 KCAL"))
        .stdout(predicate::str::contains("From steps:    60.0 kcal"));
}

#[test]
fn test_configured_calorie_goal_drives_move_ring() {
    let temp_dir = setup_test_dir();
    fs::write(
        temp_dir.path().join("config.toml"),
        "[goals]\ncalorie_goal = 200\ncalorie_strategy = \"goal_scaled\"\n",
    )
    .unwrap();

    stride(temp_dir.path()).args(["steps", "set", "5000"]).assert().success();

    stride(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Move:          100/200 KCAL"));

    stride(temp_dir.path())
        .args(["profile", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Daily calorie goal: 200 KCAL (default)"));

    // A personal goal takes over from the configured one
    stride(temp_dir.path())
        .args(["profile", "set", "--calorie-goal", "400"])
        .assert()
        .success();

    stride(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Move:          200/400 KCAL"));
}

#[test]
fn test_workout_add_schedules_reminder_for_tomorrow() {
    let temp_dir = setup_test_dir();

    stride(temp_dir.path())
        .args(["--now", "2024-01-01T22:00:00"])
        .args(["workout", "add", "--name", "Run", "--time", "08:00"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Run\" scheduled for 08:00"))
        .stdout(predicate::str::contains("Reminder at 2024-01-02 08:00 (in 10:00:00)"));

    let log = fs::read_to_string(temp_dir.path().join("reminders.jsonl")).unwrap();
    let record: serde_json::Value = serde_json::from_str(log.lines().next().unwrap()).unwrap();
    assert_eq!(record["after_seconds"], 36_000);
    assert_eq!(record["title"], "Time for Run!");
    assert_eq!(record["requested_at"], "2024-01-01T22:00:00");
    assert_eq!(record["fire_at"], "2024-01-02T08:00:00");

    stride(temp_dir.path())
        .args(["--now", "2024-01-01T22:00:00", "reminders"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-01-02 08:00  Time for Run!"));

    let state = read_state(temp_dir.path());
    assert_eq!(state["workouts"][0]["name"], "Run");
    assert_eq!(state["workouts"][0]["time"], "08:00");
    assert_eq!(state["workouts"][0]["calories"], 0.0);
}

#[test]
fn test_invalid_time_is_rejected_without_saving() {
    let temp_dir = setup_test_dir();

    for bad in ["25:00", "08:70", "0800"] {
        stride(temp_dir.path())
            .args(["workout", "add", "--name", "Run", "--time", bad])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid time format"));
    }

    stride(temp_dir.path())
        .args(["workout", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No workouts scheduled."));
    assert!(!temp_dir.path().join("reminders.jsonl").exists());
}

#[test]
fn test_reminder_failure_still_saves_workout() {
    let temp_dir = setup_test_dir();
    // A directory where the log file should be makes every append fail
    fs::create_dir_all(temp_dir.path().join("reminders.jsonl")).unwrap();

    stride(temp_dir.path())
        .args(["workout", "add", "--name", "Swim", "--time", "07:15"])
        .assert()
        .success()
        .stderr(predicate::str::contains("reminder not scheduled"));

    stride(temp_dir.path())
        .args(["workout", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("07:15  Swim"));
}

#[test]
fn test_disabled_reminders() {
    let temp_dir = setup_test_dir();
    fs::write(
        temp_dir.path().join("config.toml"),
        "[reminders]\nenabled = false\n",
    )
    .unwrap();

    stride(temp_dir.path())
        .args(["workout", "add", "--name", "Yoga", "--time", "19:00"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reminders are disabled"));

    assert!(!temp_dir.path().join("reminders.jsonl").exists());
}

#[test]
fn test_workout_calories_count_toward_total() {
    let temp_dir = setup_test_dir();

    stride(temp_dir.path())
        .args(["workout", "add", "--name", "Lift", "--time", "17:00", "--calories", "150"])
        .assert()
        .success();
    stride(temp_dir.path()).args(["steps", "set", "1000"]).assert().success();

    stride(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Total:         190.0 kcal"));
}

#[test]
fn test_countdown_picks_nearest_workout() {
    let temp_dir = setup_test_dir();

    stride(temp_dir.path())
        .arg("countdown")
        .assert()
        .success()
        .stdout(predicate::str::contains("--:--:--"));

    for (name, time) in [("Evening", "18:00"), ("Lunch", "12:30")] {
        stride(temp_dir.path())
            .args(["workout", "add", "--name", name, "--time", time])
            .assert()
            .success();
    }

    stride(temp_dir.path())
        .args(["--now", "2024-01-01T09:00:00", "countdown"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Lunch in 03:30:00"));

    stride(temp_dir.path())
        .args(["--now", "2024-01-01T13:00:00", "countdown"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Evening in 05:00:00"));
}

#[test]
fn test_countdown_watch_stops_after_ticks() {
    let temp_dir = setup_test_dir();
    fs::write(
        temp_dir.path().join("config.toml"),
        "[reminders]\ntick_interval_ms = 10\n",
    )
    .unwrap();

    let output = stride(temp_dir.path())
        .args(["countdown", "--watch", "--ticks", "3"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 3);
    assert!(stdout.lines().all(|l| l == "--:--:--"));
}

#[test]
fn test_profile_set_and_show() {
    let temp_dir = setup_test_dir();

    stride(temp_dir.path())
        .args(["profile", "set", "--name", "Sam", "--height", "170", "--weight", "72.25"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Profile saved"))
        .stdout(predicate::str::contains("(Overweight)"));

    stride(temp_dir.path())
        .args(["profile", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sam"))
        .stdout(predicate::str::contains("Ideal weight: 53.5 - 72.0 kg"))
        .stdout(predicate::str::contains("Daily calorie goal: 120 KCAL"));
}

#[test]
fn test_invalid_profile_update_is_rejected() {
    let temp_dir = setup_test_dir();

    stride(temp_dir.path())
        .args(["profile", "set", "--weight=-5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid input"));

    stride(temp_dir.path())
        .args(["profile", "set"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to update"));

    stride(temp_dir.path())
        .args(["profile", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Weight: 70 kg"));
}
