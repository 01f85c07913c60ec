use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::duration::parse_hms;
use crate::models::{StrengthExercise, WorkoutType};

pub const MAX_ZONE: i32 = 5;
pub const MAX_RPE: u8 = 10;
pub const MAX_SETS: u32 = 100;
pub const MAX_REPS: u32 = 1000;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("running workouts need a distance above 0 km")]
    MissingDistance,
    #[error("'{0}' is not a valid duration, expected H:MM:SS, MM:SS or SS")]
    InvalidDuration(String),
    #[error("running workouts need a zone between 1 and 5")]
    MissingZone,
    #[error("zone {0} is outside 1..=5")]
    InvalidZone(i32),
    #[error("strength workouts need at least one named exercise")]
    NoExercises,
    #[error("exercise '{0}' needs at least one set and one rep")]
    EmptyExercise(String),
    #[error("exercise '{name}' has {sets} sets of {reps} reps, limits are 100 sets and 1000 reps")]
    TooManySetsOrReps { name: String, sets: u32, reps: u32 },
    #[error("exercise '{name}' has an invalid weight of {weight} kg")]
    InvalidWeight { name: String, weight: f64 },
    #[error("exercise '{name}' has RPE {rpe}, expected 0..=10")]
    InvalidRpe { name: String, rpe: u8 },
    #[error("other workouts need a description")]
    MissingDescription,
}

/// A workout as submitted for logging, before it has an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWorkout {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type")]
    pub workout_type: WorkoutType,
    #[serde(default)]
    pub created_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub total_time: Option<String>,
    #[serde(default)]
    pub zone: Option<i32>,
    #[serde(default)]
    pub exercises: Vec<StrengthExercise>,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewWorkout {
    pub fn running(title: &str, distance_km: f64, total_time: &str, zone: i32) -> Self {
        Self {
            title: title.to_string(),
            workout_type: WorkoutType::Running,
            created_at: None,
            distance_km: Some(distance_km),
            total_time: Some(total_time.to_string()),
            zone: Some(zone),
            exercises: Vec::new(),
            description: None,
        }
    }

    pub fn strength(title: &str, exercises: Vec<StrengthExercise>) -> Self {
        Self {
            title: title.to_string(),
            workout_type: WorkoutType::Strength,
            created_at: None,
            distance_km: None,
            total_time: None,
            zone: None,
            exercises,
            description: None,
        }
    }

    pub fn other(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            workout_type: WorkoutType::Other,
            created_at: None,
            distance_km: None,
            total_time: None,
            zone: None,
            exercises: Vec::new(),
            description: Some(description.to_string()),
        }
    }

    /// Checks the fields that matter for this workout type and returns a
    /// cleaned copy with trimmed text and the other types' fields cleared.
    pub fn validate(&self) -> Result<NewWorkout, ValidationError> {
        let mut clean = NewWorkout {
            title: self.title.trim().to_string(),
            workout_type: self.workout_type,
            created_at: self.created_at,
            distance_km: None,
            total_time: None,
            zone: None,
            exercises: Vec::new(),
            description: None,
        };

        match self.workout_type {
            WorkoutType::Running => {
                let distance = self.distance_km.unwrap_or(0.0);
                if !distance.is_finite() || distance <= 0.0 {
                    return Err(ValidationError::MissingDistance);
                }
                let time = self.total_time.as_deref().unwrap_or("").trim();
                if parse_hms(time) <= 0.0 {
                    return Err(ValidationError::InvalidDuration(time.to_string()));
                }
                let zone = self.zone.ok_or(ValidationError::MissingZone)?;
                if !(1..=MAX_ZONE).contains(&zone) {
                    return Err(ValidationError::InvalidZone(zone));
                }
                clean.distance_km = Some(distance);
                clean.total_time = Some(time.to_string());
                clean.zone = Some(zone);
            }
            WorkoutType::Strength => {
                // Blank rows are left over from the entry form and dropped silently
                for exercise in self.exercises.iter().filter(|e| !e.name.trim().is_empty()) {
                    let name = exercise.name.trim().to_string();
                    if exercise.sets == 0 || exercise.reps == 0 {
                        return Err(ValidationError::EmptyExercise(name));
                    }
                    if exercise.sets > MAX_SETS || exercise.reps > MAX_REPS {
                        return Err(ValidationError::TooManySetsOrReps {
                            name,
                            sets: exercise.sets,
                            reps: exercise.reps,
                        });
                    }
                    if !exercise.weight_kg.is_finite() || exercise.weight_kg < 0.0 {
                        return Err(ValidationError::InvalidWeight {
                            name,
                            weight: exercise.weight_kg,
                        });
                    }
                    if exercise.rpe > MAX_RPE {
                        return Err(ValidationError::InvalidRpe { name, rpe: exercise.rpe });
                    }
                    clean.exercises.push(StrengthExercise {
                        name,
                        category: exercise.category.trim().to_string(),
                        ..exercise.clone()
                    });
                }
                if clean.exercises.is_empty() {
                    return Err(ValidationError::NoExercises);
                }
            }
            WorkoutType::Other => {
                let description = self.description.as_deref().unwrap_or("").trim();
                if description.is_empty() {
                    return Err(ValidationError::MissingDescription);
                }
                clean.description = Some(description.to_string());
            }
        }

        Ok(clean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squat(sets: u32, reps: u32, weight_kg: f64) -> StrengthExercise {
        StrengthExercise {
            name: " Squat ".to_string(),
            category: "legs".to_string(),
            sets,
            reps,
            weight_kg,
            rpe: 8,
        }
    }

    #[test]
    fn accepts_complete_run_and_clears_foreign_fields() {
        let mut run = NewWorkout::running("  Tempo  ", 10.0, "50:00", 3);
        run.description = Some("ignored".to_string());
        let clean = run.validate().expect("run should be valid");
        assert_eq!(clean.title, "Tempo");
        assert_eq!(clean.description, None);
        assert_eq!(clean.zone, Some(3));
    }

    #[test]
    fn rejects_bad_runs() {
        assert_eq!(
            NewWorkout::running("r", 0.0, "50:00", 3).validate(),
            Err(ValidationError::MissingDistance)
        );
        assert_eq!(
            NewWorkout::running("r", 5.0, "abc", 3).validate(),
            Err(ValidationError::InvalidDuration("abc".to_string()))
        );
        assert_eq!(
            NewWorkout::running("r", 5.0, "25:00", 6).validate(),
            Err(ValidationError::InvalidZone(6))
        );
        let mut no_zone = NewWorkout::running("r", 5.0, "25:00", 1);
        no_zone.zone = None;
        assert_eq!(no_zone.validate(), Err(ValidationError::MissingZone));
    }

    #[test]
    fn strength_drops_blank_rows_and_trims_names() {
        let mut blank = squat(0, 0, 0.0);
        blank.name = "   ".to_string();
        let clean = NewWorkout::strength("Legs", vec![squat(3, 10, 50.0), blank])
            .validate()
            .expect("strength should be valid");
        assert_eq!(clean.exercises.len(), 1);
        assert_eq!(clean.exercises[0].name, "Squat");
    }

    #[test]
    fn rejects_bad_strength() {
        assert_eq!(NewWorkout::strength("Legs", vec![]).validate(), Err(ValidationError::NoExercises));
        assert_eq!(
            NewWorkout::strength("Legs", vec![squat(0, 10, 50.0)]).validate(),
            Err(ValidationError::EmptyExercise("Squat".to_string()))
        );
        assert!(matches!(
            NewWorkout::strength("Legs", vec![squat(3, 10, -1.0)]).validate(),
            Err(ValidationError::InvalidWeight { .. })
        ));
        assert_eq!(
            NewWorkout::strength("Legs", vec![squat(u32::MAX, u32::MAX, 50.0)]).validate(),
            Err(ValidationError::TooManySetsOrReps {
                name: "Squat".to_string(),
                sets: u32::MAX,
                reps: u32::MAX,
            })
        );
        assert!(NewWorkout::strength("Legs", vec![squat(MAX_SETS, MAX_REPS, 0.0)]).validate().is_ok());
        let mut hard = squat(3, 10, 50.0);
        hard.rpe = 11;
        assert!(matches!(
            NewWorkout::strength("Legs", vec![hard]).validate(),
            Err(ValidationError::InvalidRpe { rpe: 11, .. })
        ));
    }

    #[test]
    fn other_needs_description() {
        assert_eq!(NewWorkout::other("Yoga", "  ").validate(), Err(ValidationError::MissingDescription));
        let clean = NewWorkout::other("Yoga", " Flow ").validate().expect("valid");
        assert_eq!(clean.description.as_deref(), Some("Flow"));
    }
}
