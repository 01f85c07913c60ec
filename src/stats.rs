use chrono::{DateTime, Datelike, Duration, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::clock::Clock;
use crate::duration::{pace_seconds_per_km, parse_hms, speed_kmh};
use crate::models::{Workout, WorkoutType};

pub const DEFAULT_TOP_EXERCISES: usize = 5;

/// Lookback window relative to "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "7d")]
    Last7Days,
    #[default]
    #[serde(rename = "30d")]
    Last30Days,
    #[serde(rename = "90d")]
    Last90Days,
    #[serde(rename = "all")]
    All,
}

impl TimeRange {
    pub fn window(&self) -> Option<Duration> {
        match self {
            TimeRange::Last7Days => Some(Duration::days(7)),
            TimeRange::Last30Days => Some(Duration::days(30)),
            TimeRange::Last90Days => Some(Duration::days(90)),
            TimeRange::All => None,
        }
    }

    /// Earliest instant still inside the range, if the range is bounded.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.window().map(|window| now - window)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Last7Days => "7d",
            TimeRange::Last30Days => "30d",
            TimeRange::Last90Days => "90d",
            TimeRange::All => "all",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown time range '{0}', expected one of 7d, 30d, 90d, all")]
pub struct UnknownTimeRange(pub String);

impl FromStr for TimeRange {
    type Err = UnknownTimeRange;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "7d" | "7" => Ok(TimeRange::Last7Days),
            "30d" | "30" => Ok(TimeRange::Last30Days),
            "90d" | "90" => Ok(TimeRange::Last90Days),
            "all" => Ok(TimeRange::All),
            _ => Err(UnknownTimeRange(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateOptions {
    pub top_exercises: usize,
    /// Group "Squat" and " squat" together. Off by default, so names must
    /// match exactly.
    pub normalize_exercise_names: bool,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            top_exercises: DEFAULT_TOP_EXERCISES,
            normalize_exercise_names: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeCounts {
    pub running: usize,
    pub strength: usize,
    pub other: usize,
}

impl TypeCounts {
    pub fn get(&self, workout_type: WorkoutType) -> usize {
        match workout_type {
            WorkoutType::Running => self.running,
            WorkoutType::Strength => self.strength,
            WorkoutType::Other => self.other,
        }
    }

    fn bump(&mut self, workout_type: WorkoutType) {
        match workout_type {
            WorkoutType::Running => self.running += 1,
            WorkoutType::Strength => self.strength += 1,
            WorkoutType::Other => self.other += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub count: usize,
    pub by_type: TypeCounts,
    pub first_date: Option<DateTime<FixedOffset>>,
    pub last_date: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    pub sessions: usize,
    pub total_distance_km: f64,
    pub total_seconds: f64,
    pub avg_distance_km: f64,
    /// Seconds per km. `None` when no distance was logged.
    pub avg_pace_sec_per_km: Option<f64>,
    pub avg_speed_kmh: Option<f64>,
    pub zones: BTreeMap<u8, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExerciseVolume {
    pub name: String,
    pub volume_kg: f64,
    pub sets: u64,
    pub reps: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrengthStats {
    pub sessions: usize,
    pub total_sets: u64,
    pub total_reps: u64,
    pub total_volume_kg: f64,
    pub top_exercises: Vec<ExerciseVolume>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodBucket {
    pub key: String,
    pub count: usize,
    pub distance_km: f64,
    pub seconds: f64,
    pub volume_kg: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub range: TimeRange,
    pub totals: Totals,
    pub running: RunningStats,
    pub strength: StrengthStats,
    /// Keyed `YYYY-MM`, newest first.
    pub monthly: Vec<PeriodBucket>,
    /// Keyed by ISO week `YYYY-Www`, newest first.
    pub weekly: Vec<PeriodBucket>,
}

pub fn aggregate<C: Clock + ?Sized>(workouts: &[Workout], range: TimeRange, clock: &C) -> AggregateResult {
    aggregate_at(workouts, range, clock.now(), &AggregateOptions::default())
}

/// Workouts created at or after `now - window`. Unbounded ranges keep everything.
pub fn filter_range(workouts: &[Workout], range: TimeRange, now: DateTime<Utc>) -> Vec<&Workout> {
    match range.cutoff(now) {
        Some(cutoff) => workouts
            .iter()
            .filter(|w| w.created_at.with_timezone(&Utc) >= cutoff)
            .collect(),
        None => workouts.iter().collect(),
    }
}

/// The newest `limit` workouts inside the range, newest first.
pub fn recent(workouts: &[Workout], range: TimeRange, now: DateTime<Utc>, limit: usize) -> Vec<&Workout> {
    let mut in_range = filter_range(workouts, range, now);
    in_range.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    in_range.truncate(limit);
    in_range
}

pub fn month_key(created_at: &DateTime<FixedOffset>) -> String {
    format!("{:04}-{:02}", created_at.year(), created_at.month())
}

pub fn week_key(created_at: &DateTime<FixedOffset>) -> String {
    let week = created_at.iso_week();
    format!("{:04}-W{:02}", week.year(), week.week())
}

pub fn aggregate_at(
    workouts: &[Workout],
    range: TimeRange,
    now: DateTime<Utc>,
    options: &AggregateOptions,
) -> AggregateResult {
    let filtered = filter_range(workouts, range, now);

    let mut totals = Totals {
        count: filtered.len(),
        ..Totals::default()
    };
    let mut running = RunningStats::default();
    let mut strength = StrengthStats::default();
    let mut monthly: BTreeMap<String, PeriodBucket> = BTreeMap::new();
    let mut weekly: BTreeMap<String, PeriodBucket> = BTreeMap::new();

    let mut exercise_index: HashMap<String, usize> = HashMap::new();
    let mut exercises: Vec<ExerciseVolume> = Vec::new();

    for workout in &filtered {
        totals.by_type.bump(workout.workout_type);
        if totals.first_date.map_or(true, |d| workout.created_at < d) {
            totals.first_date = Some(workout.created_at);
        }
        if totals.last_date.map_or(true, |d| workout.created_at > d) {
            totals.last_date = Some(workout.created_at);
        }

        let mut km = 0.0;
        let mut seconds = 0.0;
        let mut volume = 0.0;

        match workout.workout_type {
            WorkoutType::Running => {
                running.sessions += 1;
                km = workout.distance();
                seconds = workout.total_time.as_deref().map(parse_hms).unwrap_or(0.0);
                running.total_distance_km += km;
                running.total_seconds += seconds;
                if let Some(zone) = workout.zone.filter(|z| (1..=5).contains(z)) {
                    *running.zones.entry(zone as u8).or_insert(0) += 1;
                }
            }
            WorkoutType::Strength => {
                strength.sessions += 1;
                for exercise in &workout.exercises {
                    let sets = exercise.sets as u64;
                    let reps = sets.saturating_mul(exercise.reps as u64);
                    let exercise_volume = exercise.volume();

                    strength.total_sets = strength.total_sets.saturating_add(sets);
                    strength.total_reps = strength.total_reps.saturating_add(reps);
                    strength.total_volume_kg += exercise_volume;
                    volume += exercise_volume;

                    let key = if options.normalize_exercise_names {
                        exercise.name.trim().to_lowercase()
                    } else {
                        exercise.name.clone()
                    };
                    let slot = *exercise_index.entry(key).or_insert_with(|| {
                        let name = if options.normalize_exercise_names {
                            exercise.name.trim().to_string()
                        } else {
                            exercise.name.clone()
                        };
                        exercises.push(ExerciseVolume {
                            name,
                            ..ExerciseVolume::default()
                        });
                        exercises.len() - 1
                    });
                    let entry = &mut exercises[slot];
                    entry.volume_kg += exercise_volume;
                    entry.sets = entry.sets.saturating_add(sets);
                    entry.reps = entry.reps.saturating_add(reps);
                }
            }
            WorkoutType::Other => {}
        }

        for (key, buckets) in [
            (month_key(&workout.created_at), &mut monthly),
            (week_key(&workout.created_at), &mut weekly),
        ] {
            let bucket = buckets.entry(key.clone()).or_insert_with(|| PeriodBucket {
                key,
                ..PeriodBucket::default()
            });
            bucket.count += 1;
            bucket.distance_km += km;
            bucket.seconds += seconds;
            bucket.volume_kg += volume;
        }
    }

    if running.sessions > 0 {
        running.avg_distance_km = running.total_distance_km / running.sessions as f64;
    }
    running.avg_pace_sec_per_km = pace_seconds_per_km(running.total_distance_km, running.total_seconds);
    running.avg_speed_kmh = speed_kmh(running.total_distance_km, running.total_seconds);

    // sort_by is stable, so equal volumes keep first-seen order
    exercises.sort_by(|a, b| b.volume_kg.total_cmp(&a.volume_kg));
    exercises.truncate(options.top_exercises);
    strength.top_exercises = exercises;

    AggregateResult {
        range,
        totals,
        running,
        strength,
        monthly: monthly.into_values().rev().collect(),
        weekly: weekly.into_values().rev().collect(),
    }
}
