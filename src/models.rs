use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum WorkoutType {
    #[serde(alias = "løping")]
    Running,
    #[serde(alias = "styrke")]
    Strength,
    #[serde(alias = "annet")]
    Other,
}

impl WorkoutType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkoutType::Running => "running",
            WorkoutType::Strength => "strength",
            WorkoutType::Other => "other",
        }
    }
}

impl fmt::Display for WorkoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown workout type: {0}")]
pub struct UnknownWorkoutType(pub String);

impl FromStr for WorkoutType {
    type Err = UnknownWorkoutType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "running" | "run" | "løping" => Ok(WorkoutType::Running),
            "strength" | "styrke" => Ok(WorkoutType::Strength),
            "other" | "annet" => Ok(WorkoutType::Other),
            _ => Err(UnknownWorkoutType(s.to_string())),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StrengthExercise {
    #[serde(alias = "exercise")]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub sets: u32,
    #[serde(default)]
    pub reps: u32,
    #[serde(default, alias = "weight")]
    pub weight_kg: f64,
    #[serde(default)]
    pub rpe: u8,
}

impl StrengthExercise {
    /// sets x reps x weight, with a negative or non-finite weight counted as zero.
    pub fn volume(&self) -> f64 {
        self.sets as f64 * self.reps as f64 * non_negative(self.weight_kg)
    }
}

/// A logged training session as it comes out of the store.
///
/// Only the fields belonging to `workout_type` are meaningful; the rest are
/// carried along but ignored when aggregating.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Workout {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type")]
    pub workout_type: WorkoutType,
    pub created_at: DateTime<FixedOffset>,

    // Running
    #[serde(default, alias = "distance")]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub total_time: Option<String>,
    #[serde(default)]
    pub zone: Option<i32>,

    // Strength
    #[serde(default, alias = "strength_exercises")]
    pub exercises: Vec<StrengthExercise>,

    // Other
    #[serde(default)]
    pub description: Option<String>,
}

impl Workout {
    pub fn distance(&self) -> f64 {
        self.distance_km.map(non_negative).unwrap_or(0.0)
    }
}

pub(crate) fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workout_type_accepts_english_and_legacy_names() {
        assert_eq!("running".parse::<WorkoutType>().unwrap(), WorkoutType::Running);
        assert_eq!("Styrke".parse::<WorkoutType>().unwrap(), WorkoutType::Strength);
        assert_eq!("annet".parse::<WorkoutType>().unwrap(), WorkoutType::Other);
        assert!("swimming".parse::<WorkoutType>().is_err());
    }

    #[test]
    fn deserializes_legacy_record_layout() {
        let json = r#"{
            "id": "w1",
            "user_id": "u1",
            "title": "Leg day",
            "type": "styrke",
            "created_at": "2024-01-05T18:30:00+01:00",
            "strength_exercises": [
                {"exercise": "Squat", "category": "legs", "sets": 3, "reps": 10, "weight": 50, "rpe": 8}
            ]
        }"#;
        let workout: Workout = serde_json::from_str(json).expect("legacy record should parse");
        assert_eq!(workout.workout_type, WorkoutType::Strength);
        assert_eq!(workout.exercises.len(), 1);
        assert_eq!(workout.exercises[0].name, "Squat");
        assert_eq!(workout.exercises[0].volume(), 1500.0);
    }

    #[test]
    fn negative_distance_counts_as_zero() {
        let json = r#"{"id": "w2", "type": "running", "created_at": "2024-01-05T08:00:00Z", "distance_km": -3.0}"#;
        let workout: Workout = serde_json::from_str(json).expect("record should parse");
        assert_eq!(workout.distance(), 0.0);
    }
}
