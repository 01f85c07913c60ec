use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, TimeZone};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use training_stats::api::{self, ApiState};
use training_stats::clock::{Clock, SystemClock};
use training_stats::config::AppConfig;
use training_stats::db::{Database, WorkoutFilter};
use training_stats::report;
use training_stats::stats::{self, aggregate_at, TimeRange};
use training_stats::validation::NewWorkout;
use training_stats::{StrengthExercise, WorkoutType};

#[derive(Parser)]
#[command(name = "training-stats", version, about = "Log workouts and summarize your training")]
struct Cli {
    /// User whose workouts are read or written (defaults to `default_user` from config)
    #[arg(long, global = true)]
    user: Option<String>,

    /// Overrides `database_url` from config
    #[arg(long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print aggregate statistics
    Stats {
        /// 7d, 30d, 90d or all
        #[arg(long)]
        range: Option<TimeRange>,
        #[arg(long)]
        json: bool,
        /// Write the monthly (or weekly) table as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long)]
        weekly: bool,
    },
    /// Log a run, or several runs from one session with repeated --run
    AddRun {
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, requires = "time", conflicts_with = "runs")]
        distance: Option<f64>,
        /// H:MM:SS, MM:SS or SS
        #[arg(long, requires = "zone")]
        time: Option<String>,
        #[arg(long, requires = "distance")]
        zone: Option<i32>,
        /// distance_km:time:zone, repeatable; all runs are saved together or not at all
        #[arg(long = "run")]
        runs: Vec<String>,
        /// YYYY-MM-DD or RFC 3339, defaults to now
        #[arg(long)]
        date: Option<String>,
    },
    /// Log a strength session
    AddStrength {
        #[arg(long, default_value = "")]
        title: String,
        /// name:category:sets:reps:weight_kg[:rpe], repeatable
        #[arg(long = "exercise", required = true)]
        exercises: Vec<String>,
        #[arg(long)]
        date: Option<String>,
    },
    /// Log any other activity
    AddOther {
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// List logged workouts, newest first
    List {
        #[arg(long = "type")]
        workout_type: Option<WorkoutType>,
        /// 7d, 30d, 90d or all; applied before --limit
        #[arg(long)]
        range: Option<TimeRange>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Delete a workout by id
    Delete { id: String },
    /// Serve the JSON API
    Serve,
}

const RECENT_WORKOUTS: usize = 10;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = AppConfig::load().context("Failed to load configuration")?;
    if let Some(database) = &cli.database {
        config.database_url = database.clone();
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let database = Database::open(&config.database_url)
        .with_context(|| format!("Failed to open workout store at {}", config.database_url))?;
    let user = cli.user.clone().unwrap_or_else(|| config.default_user.clone());

    match cli.command {
        Command::Stats { range, json, csv, weekly } => {
            let range = range.unwrap_or(config.default_range);
            let now = SystemClock.now();
            let workouts = database.list_workouts(
                &user,
                &WorkoutFilter {
                    since: range.cutoff(now),
                    ..WorkoutFilter::default()
                },
            )?;
            let result = aggregate_at(&workouts, range, now, &config.aggregate_options());

            if let Some(path) = csv {
                let file = std::fs::File::create(&path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                let buckets = if weekly { &result.weekly } else { &result.monthly };
                report::write_buckets_csv(buckets, file)?;
                info!("Wrote {} rows to {}", buckets.len(), path.display());
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", report::render_text(&result));
                print!("{}", report::render_recent(&stats::recent(&workouts, range, now, RECENT_WORKOUTS)));
            }
        }
        Command::AddRun { title, distance, time, zone, runs, date } => {
            let created_at = date.as_deref().map(parse_date).transpose()?;
            let mut batch = match (distance, time, zone) {
                (Some(distance), Some(time), Some(zone)) => vec![NewWorkout::running(&title, distance, &time, zone)],
                _ => runs
                    .iter()
                    .map(|r| parse_run(&title, r))
                    .collect::<Result<Vec<_>>>()?,
            };
            if batch.is_empty() {
                bail!("Give --distance, --time and --zone, or at least one --run");
            }
            for workout in &mut batch {
                workout.created_at = created_at;
            }
            let saved = database.insert_workouts(&user, &batch)?;
            for run in &saved {
                println!("Saved run {}: {}", run.id, report::summarize(run));
            }
        }
        Command::AddStrength { title, exercises, date } => {
            let exercises = exercises
                .iter()
                .map(|e| parse_exercise(e))
                .collect::<Result<Vec<_>>>()?;
            let mut workout = NewWorkout::strength(&title, exercises);
            workout.created_at = date.as_deref().map(parse_date).transpose()?;
            let saved = database.insert_workout(&user, &workout)?;
            println!("Saved strength session {}: {}", saved.id, report::summarize(&saved));
        }
        Command::AddOther { title, description, date } => {
            let mut workout = NewWorkout::other(&title, &description);
            workout.created_at = date.as_deref().map(parse_date).transpose()?;
            let saved = database.insert_workout(&user, &workout)?;
            println!("Saved workout {}: {}", saved.id, report::summarize(&saved));
        }
        Command::List { workout_type, range, limit } => {
            let workouts = database.list_workouts(
                &user,
                &WorkoutFilter {
                    workout_type,
                    since: range.and_then(|r| r.cutoff(SystemClock.now())),
                    limit,
                },
            )?;
            if workouts.is_empty() {
                println!("No workouts logged for {}.", user);
            }
            for w in &workouts {
                println!(
                    "{:>5}  {}  {:<8}  {:<20}  {}",
                    w.id,
                    w.created_at.format("%Y-%m-%d"),
                    w.workout_type.as_str(),
                    w.title,
                    report::summarize(w)
                );
            }
        }
        Command::Delete { id } => {
            if database.delete_workout(&user, &id)? {
                println!("Deleted workout {}", id);
            } else {
                bail!("No workout {} for {}", id, user);
            }
        }
        Command::Serve => {
            let state = ApiState {
                database: Arc::new(Mutex::new(database)),
                clock: Arc::new(SystemClock),
                options: config.aggregate_options(),
                default_user: user,
                default_range: config.default_range,
            };
            api::run_server(&config, state).await?;
        }
    }

    Ok(())
}

fn parse_date(text: &str) -> Result<DateTime<FixedOffset>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts);
    }
    let day = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .with_context(|| format!("'{}' is neither YYYY-MM-DD nor RFC 3339", text))?;
    let noon = day
        .and_hms_opt(12, 0, 0)
        .ok_or_else(|| anyhow!("invalid time for {}", text))?;
    Local
        .from_local_datetime(&noon)
        .single()
        .map(|dt| dt.fixed_offset())
        .ok_or_else(|| anyhow!("{} is ambiguous in the local timezone", text))
}

fn parse_exercise(text: &str) -> Result<StrengthExercise> {
    let parts: Vec<&str> = text.split(':').map(str::trim).collect();
    if parts.len() < 5 || parts.len() > 6 {
        bail!("exercise '{}' should look like name:category:sets:reps:weight_kg[:rpe]", text);
    }
    Ok(StrengthExercise {
        name: parts[0].to_string(),
        category: parts[1].to_string(),
        sets: parts[2].parse().with_context(|| format!("bad sets in '{}'", text))?,
        reps: parts[3].parse().with_context(|| format!("bad reps in '{}'", text))?,
        weight_kg: parts[4].parse().with_context(|| format!("bad weight in '{}'", text))?,
        rpe: match parts.get(5) {
            Some(rpe) => rpe.parse().with_context(|| format!("bad rpe in '{}'", text))?,
            None => 0,
        },
    })
}

fn parse_run(title: &str, text: &str) -> Result<NewWorkout> {
    let parts: Vec<&str> = text.split(':').map(str::trim).collect();
    // The time itself may contain colons: 5:25:00:3 is 5 km in 25:00, zone 3.
    if parts.len() < 3 {
        bail!("run '{}' should look like distance_km:time:zone", text);
    }
    let distance = parts[0]
        .parse()
        .with_context(|| format!("bad distance in '{}'", text))?;
    let zone = parts[parts.len() - 1]
        .parse()
        .with_context(|| format!("bad zone in '{}'", text))?;
    let time = parts[1..parts.len() - 1].join(":");
    Ok(NewWorkout::running(title, distance, &time, zone))
}
