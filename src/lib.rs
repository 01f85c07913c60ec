pub mod api;
pub mod clock;
pub mod config;
pub mod db;
pub mod duration;
pub mod models;
pub mod report;
pub mod stats;
pub mod validation;

pub use models::{StrengthExercise, Workout, WorkoutType};
pub use stats::{aggregate, aggregate_at, AggregateOptions, AggregateResult, TimeRange};
