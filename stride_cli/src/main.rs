use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc;
use stride_core::countdown::format_hms;
use stride_core::metrics::{bmi, bmi_category, ideal_weight_range};
use stride_core::*;

#[derive(Parser)]
#[command(name = "stride")]
#[command(about = "Daily steps, workouts and reminders", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pin the current time, e.g. 2024-01-01T06:00:00 (for testing)
    #[arg(long, global = true, value_parser = parse_now)]
    now: Option<NaiveDateTime>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show today's steps, calories and the next workout (default)
    Dashboard,

    /// Record or reset today's step count
    Steps {
        #[command(subcommand)]
        action: StepsAction,
    },

    /// Schedule and list daily workouts
    Workout {
        #[command(subcommand)]
        action: WorkoutAction,
    },

    /// Show or edit the user profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Time remaining until the nearest workout
    Countdown {
        /// Keep recomputing on the configured tick interval
        #[arg(long)]
        watch: bool,

        /// Stop watching after this many ticks
        #[arg(long, requires = "watch")]
        ticks: Option<usize>,
    },

    /// List reminders handed to the notifier
    Reminders,
}

#[derive(Subcommand)]
enum StepsAction {
    /// Record the current step count reading
    Set { steps: u32 },
    /// Reset the step count to zero
    Reset,
}

#[derive(Subcommand)]
enum WorkoutAction {
    /// Add a daily workout and schedule its reminder
    Add {
        #[arg(long)]
        name: String,

        /// Time of day, HH:MM
        #[arg(long)]
        time: String,

        #[arg(long)]
        calories: Option<f64>,
    },
    /// List workouts in the order they were added
    List,
    /// Remove every workout
    Reset,
}

#[derive(Subcommand)]
enum ProfileAction {
    Show,
    Set(ProfileArgs),
}

#[derive(Args)]
struct ProfileArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    goals: Option<String>,
    /// Height in centimetres
    #[arg(long)]
    height: Option<f64>,
    /// Weight in kilograms
    #[arg(long)]
    weight: Option<f64>,
    /// Daily calorie goal in kcal
    #[arg(long)]
    calorie_goal: Option<f64>,
}

impl From<ProfileArgs> for ProfileUpdate {
    fn from(args: ProfileArgs) -> Self {
        ProfileUpdate {
            name: args.name,
            goals: args.goals,
            height_cm: args.height,
            weight_kg: args.weight,
            calorie_goal_kcal: args.calorie_goal,
        }
    }
}

fn parse_now(s: &str) -> std::result::Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map_err(|e| format!("expected YYYY-MM-DDTHH:MM:SS: {}", e))
}

/// System time, or a pinned instant when `--now` is given
#[derive(Clone, Copy)]
enum HostClock {
    System(SystemClock),
    Pinned(FixedClock),
}

impl Clock for HostClock {
    fn now(&self) -> NaiveDateTime {
        match self {
            HostClock::System(c) => c.now(),
            HostClock::Pinned(c) => c.now(),
        }
    }
}

/// Everything a command needs: config, paths, the loaded store
struct Host {
    config: Config,
    state_path: PathBuf,
    reminders_path: PathBuf,
    store: StateStore,
    clock: HostClock,
}

impl Host {
    fn load(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };
        let data_dir = cli
            .data_dir
            .clone()
            .unwrap_or_else(|| config.data.data_dir.clone());
        std::fs::create_dir_all(&data_dir)?;
        tracing::debug!("Using data directory {:?}", data_dir);

        let state_path = data_dir.join("state.json");
        let reminders_path = data_dir.join("reminders.jsonl");
        let store = StateStore::new(AppState::load(&state_path)?);
        let clock = match cli.now {
            Some(now) => HostClock::Pinned(FixedClock(now)),
            None => HostClock::System(SystemClock),
        };

        Ok(Self {
            config,
            state_path,
            reminders_path,
            store,
            clock,
        })
    }

    fn save(&self) -> Result<()> {
        self.store.snapshot()?.save(&self.state_path)
    }

    fn goals(&self) -> Result<Goals> {
        let profile = self.store.profile()?;
        Ok(self.config.goals(&profile))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        stride_core::logging::init_with_level("debug");
    } else {
        stride_core::logging::init();
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let host = Host::load(&cli)?;

    match cli.command {
        None | Some(Commands::Dashboard) => cmd_dashboard(&host),
        Some(Commands::Steps { action }) => cmd_steps(&host, action),
        Some(Commands::Workout { action }) => cmd_workout(&host, action),
        Some(Commands::Profile { action }) => cmd_profile(&host, action),
        Some(Commands::Countdown { watch, ticks }) => cmd_countdown(&host, watch, ticks),
        Some(Commands::Reminders) => cmd_reminders(&host.reminders_path),
    }
}

fn cmd_dashboard(host: &Host) -> Result<()> {
    let snapshot = host.store.snapshot()?;
    let goals = host.goals()?;
    let metrics = DerivedMetrics::compute(&snapshot, &goals);
    let countdown = CountdownProjector::new(host.clock).remaining(&snapshot.workouts);

    let today = host.clock.now().format("%A, %d %b").to_string().to_uppercase();

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", today);
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!(
        "  Steps:         {} / {} ({:.0}%)",
        group_thousands(metrics.steps),
        group_thousands(goals.step_goal),
        metrics.progress_percent
    );
    println!("  Distance:      {:.2} km", metrics.distance_km);
    println!(
        "  Move:          {}/{} KCAL",
        metrics.calories_from_steps.round(),
        metrics.calorie_goal_kcal.round()
    );
    println!("  From steps:    {:.1} kcal", metrics.calories_from_steps);
    println!("  Total:         {:.1} kcal", metrics.total_calories);
    println!("  Next workout:  {}", describe_countdown(&countdown));
    println!();
    Ok(())
}

fn cmd_steps(host: &Host, action: StepsAction) -> Result<()> {
    match action {
        StepsAction::Set { steps } => {
            // Readings arrive through the sensor binding, as they would from a device
            let pedometer = ManualPedometer::new();
            let tracker = StepTracker::start(&pedometer, host.store.clone())?;
            pedometer.emit(steps);
            tracker.stop();

            host.save()?;
            println!("✓ Steps today: {}", group_thousands(host.store.steps()?));
        }
        StepsAction::Reset => {
            host.store.reset_steps()?;
            host.save()?;
            println!("✓ Step count reset");
        }
    }
    Ok(())
}

fn cmd_workout(host: &Host, action: WorkoutAction) -> Result<()> {
    match action {
        WorkoutAction::Add {
            name,
            time,
            calories,
        } => {
            let input = NewWorkout {
                name,
                time,
                calories,
            };

            let mut notifier = ReminderLog::with_clock(&host.reminders_path, host.clock);
            let mut scheduler = WorkoutScheduler::new(host.clock, &mut notifier)
                .with_reminders(host.config.reminders.enabled);
            if host.config.reminders.enabled {
                scheduler.request_permission();
            }

            let outcome = scheduler.save_workout(&host.store, &input)?;
            host.save()?;

            println!(
                "✓ Workout \"{}\" scheduled for {}",
                outcome.workout.name, outcome.workout.time
            );
            match outcome.reminder {
                ReminderStatus::Scheduled(reminder) => println!(
                    "  Reminder at {} (in {})",
                    reminder.fire_at.format("%Y-%m-%d %H:%M"),
                    format_hms(reminder.after_seconds as i64)
                ),
                ReminderStatus::Disabled => println!("  Reminders are disabled"),
                ReminderStatus::Imminent => println!("  Starting now, no reminder needed"),
                ReminderStatus::Failed(reason) => {
                    eprintln!("Warning: reminder not scheduled: {}", reason)
                }
            }
        }
        WorkoutAction::List => {
            let workouts = host.store.workouts()?;
            if workouts.is_empty() {
                println!("No workouts scheduled.");
            }
            for workout in workouts {
                println!(
                    "  {}  {}  ({:.0} kcal)",
                    workout.time, workout.name, workout.calories
                );
            }
        }
        WorkoutAction::Reset => {
            let removed = host.store.reset_workouts()?;
            host.save()?;
            println!("✓ Removed {} workouts", removed);
        }
    }
    Ok(())
}

fn cmd_profile(host: &Host, action: ProfileAction) -> Result<()> {
    match action {
        ProfileAction::Show => display_profile(&host.store.profile()?, &host.goals()?),
        ProfileAction::Set(args) => {
            let update = ProfileUpdate::from(args);
            if update.is_empty() {
                return Err(Error::InvalidInput("nothing to update".into()));
            }
            let profile = host.store.update_profile(update)?;
            host.save()?;
            println!("✓ Profile saved");
            display_profile(&profile, &host.goals()?);
        }
    }
    Ok(())
}

fn display_profile(profile: &UserProfile, goals: &Goals) {
    println!();
    println!("  {}", profile.name);
    println!("  Height: {} cm   Weight: {} kg", profile.height_cm, profile.weight_kg);

    match bmi(profile.height_cm, profile.weight_kg) {
        Ok(value) => {
            let reading = bmi_category(value);
            println!("  BMI: {:.1} ({})", value, reading.category);
        }
        Err(e) => println!("  BMI: unavailable ({})", e),
    }
    if let Ok(range) = ideal_weight_range(profile.height_cm) {
        println!("  Ideal weight: {:.1} - {:.1} kg", range.min_kg, range.max_kg);
    }

    let goal_text = if profile.goals.is_empty() {
        "Not set"
    } else {
        profile.goals.as_str()
    };
    println!("  Goals: {}", goal_text);
    let source = if profile.calorie_goal_kcal.is_some() {
        ""
    } else {
        " (default)"
    };
    println!("  Daily calorie goal: {} KCAL{}", goals.calorie_goal_kcal, source);
    println!();
}

fn cmd_countdown(host: &Host, watch: bool, ticks: Option<usize>) -> Result<()> {
    if !watch {
        let workouts = host.store.workouts()?;
        let countdown = CountdownProjector::new(host.clock).remaining(&workouts);
        println!("{}", describe_countdown(&countdown));
        return Ok(());
    }

    let (tx, rx) = mpsc::channel();
    let ticker = CountdownTicker::start(
        host.store.clone(),
        host.clock,
        host.config.reminders.tick_interval(),
        move |countdown| {
            let _ = tx.send(countdown.clone());
        },
    );

    let limit = ticks.unwrap_or(usize::MAX);
    for countdown in rx.iter().take(limit) {
        println!("{}", describe_countdown(&countdown));
    }

    ticker.stop();
    Ok(())
}

fn cmd_reminders(path: &Path) -> Result<()> {
    let reminders = read_reminders(path)?;
    if reminders.is_empty() {
        println!("No reminders recorded.");
    }
    for reminder in reminders {
        println!(
            "  {}  {}",
            reminder.fire_at.format("%Y-%m-%d %H:%M"),
            reminder.title
        );
    }
    Ok(())
}

fn describe_countdown(countdown: &Countdown) -> String {
    match countdown {
        Countdown::None => countdown.to_string(),
        Countdown::Remaining { workout, .. } => format!("{} in {}", workout, countdown),
    }
}

fn group_thousands(n: u32) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
