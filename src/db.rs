use chrono::{DateTime, Local, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use tracing::{debug, info};

use crate::models::{StrengthExercise, Workout, WorkoutType};
use crate::validation::{NewWorkout, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("invalid exercise data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid workout: {0}")]
    Invalid(#[from] ValidationError),
    #[error("corrupt row {id}: {reason}")]
    Corrupt { id: i64, reason: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, Default)]
pub struct WorkoutFilter {
    pub workout_type: Option<WorkoutType>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (or creates) the store. Accepts plain paths and `sqlite://` URLs.
    pub fn open(database_url: &str) -> Result<Self> {
        let path = database_url.trim_start_matches("sqlite://");
        let conn = Connection::open(path)?;
        info!("Opened workout store at {}", path);
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS workouts (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                workout_type TEXT NOT NULL,
                created_at TEXT NOT NULL,
                created_ts INTEGER NOT NULL,
                distance_km REAL,
                total_time TEXT,
                zone INTEGER,
                exercises TEXT NOT NULL DEFAULT '[]',
                description TEXT
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_workouts_user_created
             ON workouts (user_id, created_ts DESC)",
            [],
        )?;
        Ok(Database { conn })
    }

    pub fn insert_workout(&self, user_id: &str, workout: &NewWorkout) -> Result<Workout> {
        let clean = workout.validate()?;
        insert_row(&self.conn, user_id, clean)
    }

    /// Logs several workouts at once. Every entry is validated before anything
    /// is written, and the rows go in inside a single transaction.
    pub fn insert_workouts(&self, user_id: &str, workouts: &[NewWorkout]) -> Result<Vec<Workout>> {
        let cleaned = workouts
            .iter()
            .map(NewWorkout::validate)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let tx = self.conn.unchecked_transaction()?;
        let mut saved = Vec::with_capacity(cleaned.len());
        for clean in cleaned {
            saved.push(insert_row(&tx, user_id, clean)?);
        }
        tx.commit()?;
        debug!("Committed batch of {} workouts for {}", saved.len(), user_id);
        Ok(saved)
    }

    /// Workouts for one user, newest first.
    pub fn list_workouts(&self, user_id: &str, filter: &WorkoutFilter) -> Result<Vec<Workout>> {
        let mut sql = String::from(
            "SELECT id, user_id, title, workout_type, created_at, distance_km, total_time, zone, exercises, description
             FROM workouts WHERE user_id = ?",
        );
        let mut values = vec![Value::Text(user_id.to_string())];

        if let Some(workout_type) = filter.workout_type {
            sql.push_str(" AND workout_type = ?");
            values.push(Value::Text(workout_type.as_str().to_string()));
        }
        if let Some(since) = filter.since {
            sql.push_str(" AND created_ts >= ?");
            values.push(Value::Integer(since.timestamp()));
        }
        sql.push_str(" ORDER BY created_ts DESC, id DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            values.push(Value::Integer(limit as i64));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(values))?;
        let mut workouts = Vec::new();
        while let Some(row) = rows.next()? {
            workouts.push(row_to_workout(row)?);
        }
        debug!("Loaded {} workouts for {}", workouts.len(), user_id);
        Ok(workouts)
    }

    pub fn get_workout(&self, id: &str) -> Result<Option<Workout>> {
        let Ok(id) = id.parse::<i64>() else {
            return Ok(None);
        };
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, title, workout_type, created_at, distance_km, total_time, zone, exercises, description
             FROM workouts WHERE id = ?1",
        )?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(row_to_workout(row)?));
        }
        Ok(None)
    }

    /// Deletes a workout owned by `user_id`. Returns false if nothing matched.
    pub fn delete_workout(&self, user_id: &str, id: &str) -> Result<bool> {
        let Ok(id) = id.parse::<i64>() else {
            return Ok(false);
        };
        let removed = self.conn.execute(
            "DELETE FROM workouts WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        if removed > 0 {
            info!("Deleted workout {} for {}", id, user_id);
        }
        Ok(removed > 0)
    }
}

fn insert_row(conn: &Connection, user_id: &str, clean: NewWorkout) -> Result<Workout> {
    let created_at = clean.created_at.unwrap_or_else(|| Local::now().fixed_offset());
    let exercises = serde_json::to_string(&clean.exercises)?;

    conn.execute(
        "INSERT INTO workouts
         (user_id, title, workout_type, created_at, created_ts, distance_km, total_time, zone, exercises, description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            user_id,
            clean.title,
            clean.workout_type.as_str(),
            created_at.to_rfc3339(),
            created_at.timestamp(),
            clean.distance_km,
            clean.total_time,
            clean.zone,
            exercises,
            clean.description,
        ],
    )?;
    let id = conn.last_insert_rowid();
    info!("Logged {} workout {} for {}", clean.workout_type, id, user_id);

    Ok(Workout {
        id: id.to_string(),
        user_id: user_id.to_string(),
        title: clean.title,
        workout_type: clean.workout_type,
        created_at,
        distance_km: clean.distance_km,
        total_time: clean.total_time,
        zone: clean.zone,
        exercises: clean.exercises,
        description: clean.description,
    })
}

fn row_to_workout(row: &Row<'_>) -> Result<Workout> {
    let id: i64 = row.get(0)?;
    let workout_type: String = row.get(3)?;
    let created_at: String = row.get(4)?;
    let exercises: String = row.get(8)?;

    let workout_type = workout_type.parse::<WorkoutType>().map_err(|e| StoreError::Corrupt {
        id,
        reason: e.to_string(),
    })?;
    let created_at = DateTime::parse_from_rfc3339(&created_at).map_err(|e| StoreError::Corrupt {
        id,
        reason: format!("bad timestamp '{}': {}", created_at, e),
    })?;
    let exercises: Vec<StrengthExercise> = serde_json::from_str(&exercises)?;

    Ok(Workout {
        id: id.to_string(),
        user_id: row.get(1)?,
        title: row.get(2)?,
        workout_type,
        created_at,
        distance_km: row.get(5)?,
        total_time: row.get(6)?,
        zone: row.get(7)?,
        exercises,
        description: row.get(9)?,
    })
}
