use std::io;

use crate::duration::{format_duration, format_pace, pace_seconds_per_km, parse_hms};
use crate::models::{Workout, WorkoutType};
use crate::stats::{AggregateResult, PeriodBucket};

pub fn render_text(result: &AggregateResult) -> String {
    let mut out = String::new();
    let totals = &result.totals;
    let running = &result.running;
    let strength = &result.strength;

    out.push_str(&format!("Statistics ({})\n", result.range));
    out.push_str(&format!(
        "Workouts: {} ({} running, {} strength, {} other)\n",
        totals.count, totals.by_type.running, totals.by_type.strength, totals.by_type.other
    ));
    if let (Some(first), Some(last)) = (totals.first_date, totals.last_date) {
        out.push_str(&format!("Period: {} - {}\n", first.format("%Y-%m-%d"), last.format("%Y-%m-%d")));
    }

    out.push_str("\nRunning\n");
    if running.sessions == 0 {
        out.push_str("  No runs in this period.\n");
    } else {
        out.push_str(&format!("  Sessions:      {}\n", running.sessions));
        out.push_str(&format!("  Distance:      {:.1} km\n", running.total_distance_km));
        out.push_str(&format!("  Avg per run:   {:.2} km\n", running.avg_distance_km));
        out.push_str(&format!("  Time:          {}\n", format_duration(running.total_seconds)));
        out.push_str(&format!("  Avg pace:      {}\n", format_pace(running.avg_pace_sec_per_km)));
        if let Some(speed) = running.avg_speed_kmh {
            out.push_str(&format!("  Avg speed:     {:.1} km/h\n", speed));
        }
        if !running.zones.is_empty() {
            let zones: Vec<String> = running
                .zones
                .iter()
                .map(|(zone, count)| format!("Z{}: {}", zone, count))
                .collect();
            out.push_str(&format!("  Zones:         {}\n", zones.join("  ")));
        }
    }

    out.push_str("\nStrength\n");
    if strength.sessions == 0 {
        out.push_str("  No strength sessions in this period.\n");
    } else {
        out.push_str(&format!("  Sessions:      {}\n", strength.sessions));
        out.push_str(&format!("  Sets / reps:   {} / {}\n", strength.total_sets, strength.total_reps));
        out.push_str(&format!("  Volume:        {:.0} kg\n", strength.total_volume_kg));
        if !strength.top_exercises.is_empty() {
            out.push_str("  Top exercises by volume:\n");
            for exercise in &strength.top_exercises {
                out.push_str(&format!(
                    "    - {}: {:.0} kg, {} sets, {} reps\n",
                    exercise.name, exercise.volume_kg, exercise.sets, exercise.reps
                ));
            }
        }
    }

    out.push_str("\nPer month\n");
    if result.monthly.is_empty() {
        out.push_str("  No data in this period.\n");
    } else {
        out.push_str(&format!(
            "  {:<8} {:>8} {:>8} {:>10} {:>10}\n",
            "Month", "Workouts", "Km", "Time", "Volume"
        ));
        for bucket in &result.monthly {
            out.push_str(&format!(
                "  {:<8} {:>8} {:>8.1} {:>10} {:>10.0}\n",
                bucket.key,
                bucket.count,
                bucket.distance_km,
                format_duration(bucket.seconds),
                bucket.volume_kg
            ));
        }
    }

    out
}

/// "Recent" section listing workouts newest first.
pub fn render_recent(workouts: &[&Workout]) -> String {
    let mut out = String::from("\nRecent\n");
    if workouts.is_empty() {
        out.push_str("  No workouts in this period.\n");
        return out;
    }
    for workout in workouts {
        out.push_str(&format!(
            "  {}  {:<8}  {:<20}  {}\n",
            workout.created_at.format("%Y-%m-%d"),
            workout.workout_type.as_str(),
            workout.title,
            summarize(workout)
        ));
    }
    out
}

/// One-line description of what was done in a workout.
pub fn summarize(workout: &Workout) -> String {
    match workout.workout_type {
        WorkoutType::Running => {
            let km = workout.distance();
            let time = workout.total_time.as_deref().unwrap_or("-");
            let pace = pace_seconds_per_km(km, parse_hms(time));
            let zone = workout.zone.map(|z| format!(" zone {} ", z)).unwrap_or_else(|| " ".to_string());
            format!("{:.2} km in {}{}({})", km, time, zone, format_pace(pace))
        }
        WorkoutType::Strength => workout
            .exercises
            .iter()
            .map(|e| format!("{} {}x{}@{}kg", e.name, e.sets, e.reps, e.weight_kg))
            .collect::<Vec<_>>()
            .join(", "),
        WorkoutType::Other => workout.description.clone().unwrap_or_default(),
    }
}

pub fn write_buckets_csv<W: io::Write>(buckets: &[PeriodBucket], writer: W) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["period", "workouts", "distance_km", "duration", "volume_kg"])?;
    for bucket in buckets {
        wtr.write_record([
            bucket.key.clone(),
            bucket.count.to_string(),
            format!("{:.2}", bucket.distance_km),
            format_duration(bucket.seconds),
            format!("{:.1}", bucket.volume_kg),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
