use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::config::AppConfig;
use crate::db::{Database, StoreError, WorkoutFilter};
use crate::models::{Workout, WorkoutType};
use crate::stats::{aggregate_at, AggregateOptions, AggregateResult, TimeRange};
use crate::validation::NewWorkout;

#[derive(Clone)]
pub struct ApiState {
    pub database: Arc<Mutex<Database>>,
    pub clock: Arc<dyn Clock + Send + Sync>,
    pub options: AggregateOptions,
    pub default_user: String,
    pub default_range: TimeRange,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (
            status,
            Json(serde_json::json!({ "status": "error", "message": message })),
        )
            .into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Invalid(e) => ApiError::BadRequest(e.to_string()),
            other => {
                error!("Workout store failure: {}", other);
                ApiError::Internal(other.to_string())
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub range: Option<String>,
    pub user: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WorkoutsQuery {
    pub user: Option<String>,
    #[serde(rename = "type")]
    pub workout_type: Option<String>,
    pub limit: Option<usize>,
}

/// `POST /api/workouts` takes either one workout or an array logged together.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WorkoutInput {
    Many(Vec<NewWorkout>),
    One(NewWorkout),
}

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub user: Option<String>,
}

impl ApiState {
    fn user(&self, requested: Option<String>) -> String {
        requested
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| self.default_user.clone())
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/stats", get(get_stats))
        .route("/api/workouts", get(list_workouts).post(create_workout))
        .route("/api/workouts/:id", delete(delete_workout))
        .with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins = config.cors_origins();
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

pub async fn run_server(config: &AppConfig, state: ApiState) -> anyhow::Result<()> {
    let app = router(state).layer(cors_layer(config));

    let addr: SocketAddr = config.api_bind_addr.parse()?;
    info!("API Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn get_stats(
    State(state): State<ApiState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<AggregateResult>, ApiError> {
    let range = match query.range.as_deref() {
        Some(r) => r.parse::<TimeRange>().map_err(|e| ApiError::BadRequest(e.to_string()))?,
        None => state.default_range,
    };
    let user = state.user(query.user);
    let now = state.clock.now();

    let workouts = {
        let db = state.database.lock().await;
        db.list_workouts(
            &user,
            &WorkoutFilter {
                since: range.cutoff(now),
                ..WorkoutFilter::default()
            },
        )?
    };

    Ok(Json(aggregate_at(&workouts, range, now, &state.options)))
}

async fn list_workouts(
    State(state): State<ApiState>,
    Query(query): Query<WorkoutsQuery>,
) -> Result<Json<Vec<Workout>>, ApiError> {
    let workout_type = query
        .workout_type
        .as_deref()
        .map(str::parse::<WorkoutType>)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let filter = WorkoutFilter {
        workout_type,
        since: None,
        limit: query.limit,
    };
    let user = state.user(query.user);

    let db = state.database.lock().await;
    Ok(Json(db.list_workouts(&user, &filter)?))
}

async fn create_workout(
    State(state): State<ApiState>,
    Query(query): Query<UserQuery>,
    Json(input): Json<WorkoutInput>,
) -> Result<Response, ApiError> {
    let user = state.user(query.user);
    let db = state.database.lock().await;
    match input {
        WorkoutInput::One(workout) => {
            let saved = db.insert_workout(&user, &workout)?;
            Ok((StatusCode::CREATED, Json(saved)).into_response())
        }
        WorkoutInput::Many(workouts) => {
            if workouts.is_empty() {
                return Err(ApiError::BadRequest("no workouts in request".to_string()));
            }
            let saved = db.insert_workouts(&user, &workouts)?;
            Ok((StatusCode::CREATED, Json(saved)).into_response())
        }
    }
}

async fn delete_workout(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Query(query): Query<UserQuery>,
) -> Result<StatusCode, ApiError> {
    let user = state.user(query.user);
    let db = state.database.lock().await;
    if db.delete_workout(&user, &id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("workout {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{DateTime, TimeZone, Utc};

    fn state() -> ApiState {
        ApiState {
            database: Arc::new(Mutex::new(Database::open_in_memory().expect("db"))),
            clock: Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())),
            options: AggregateOptions::default(),
            default_user: "me".to_string(),
            default_range: TimeRange::Last30Days,
        }
    }

    fn run_at(ts: &str) -> NewWorkout {
        let mut run = NewWorkout::running("Run", 10.0, "50:00", 3);
        run.created_at = Some(DateTime::parse_from_rfc3339(ts).expect("timestamp"));
        run
    }

    #[tokio::test]
    async fn stats_respect_range_and_user() {
        let state = state();
        {
            let db = state.database.lock().await;
            db.insert_workout("me", &run_at("2024-02-25T08:00:00Z")).expect("insert");
            db.insert_workout("me", &run_at("2023-12-01T08:00:00Z")).expect("insert");
            db.insert_workout("someone", &run_at("2024-02-26T08:00:00Z")).expect("insert");
        }

        let Json(result) = get_stats(State(state.clone()), Query(StatsQuery::default()))
            .await
            .expect("stats");
        assert_eq!(result.range, TimeRange::Last30Days);
        assert_eq!(result.totals.count, 1);
        assert_eq!(result.running.avg_pace_sec_per_km, Some(300.0));

        let Json(all) = get_stats(
            State(state),
            Query(StatsQuery {
                range: Some("all".to_string()),
                user: None,
            }),
        )
        .await
        .expect("stats");
        assert_eq!(all.totals.count, 2);
        assert_eq!(all.monthly.len(), 2);
    }

    #[tokio::test]
    async fn stats_reject_unknown_range() {
        let err = get_stats(
            State(state()),
            Query(StatsQuery {
                range: Some("1y".to_string()),
                user: None,
            }),
        )
        .await
        .expect_err("bad range");
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn create_list_and_delete() {
        let state = state();
        let response = create_workout(
            State(state.clone()),
            Query(UserQuery::default()),
            Json(WorkoutInput::One(NewWorkout::other("Yoga", "Flow"))),
        )
        .await
        .expect("create");
        assert_eq!(response.status(), StatusCode::CREATED);

        let saved = {
            let db = state.database.lock().await;
            db.list_workouts("me", &WorkoutFilter::default()).expect("list").remove(0)
        };
        assert_eq!(saved.user_id, "me");

        let Json(listed) = list_workouts(
            State(state.clone()),
            Query(WorkoutsQuery {
                workout_type: Some("other".to_string()),
                ..WorkoutsQuery::default()
            }),
        )
        .await
        .expect("list");
        assert_eq!(listed.len(), 1);

        let status = delete_workout(State(state.clone()), Path(saved.id.clone()), Query(UserQuery::default()))
            .await
            .expect("delete");
        assert_eq!(status, StatusCode::NO_CONTENT);

        let missing = delete_workout(State(state), Path(saved.id), Query(UserQuery::default()))
            .await
            .expect_err("already gone");
        assert!(matches!(missing, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn invalid_workout_is_bad_request() {
        let err = create_workout(
            State(state()),
            Query(UserQuery::default()),
            Json(WorkoutInput::One(NewWorkout::running("Run", 0.0, "50:00", 3))),
        )
        .await
        .expect_err("invalid run");
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn body_accepts_single_workout_or_array() {
        let one: WorkoutInput =
            serde_json::from_str(r#"{"type": "other", "title": "Yoga", "description": "Flow"}"#).expect("object");
        assert!(matches!(one, WorkoutInput::One(_)));

        let many: WorkoutInput = serde_json::from_str(
            r#"[
                {"type": "running", "title": "Intervals", "distance_km": 5, "total_time": "25:00", "zone": 4},
                {"type": "running", "title": "Intervals", "distance_km": 3, "total_time": "16:30", "zone": 2}
            ]"#,
        )
        .expect("array");
        assert!(matches!(many, WorkoutInput::Many(ref runs) if runs.len() == 2));
    }

    #[tokio::test]
    async fn batch_create_is_all_or_nothing() {
        let state = state();
        let batch = vec![
            NewWorkout::running("Intervals", 5.0, "25:00", 4),
            NewWorkout::running("Intervals", 3.0, "16:30", 9),
        ];
        let err = create_workout(State(state.clone()), Query(UserQuery::default()), Json(WorkoutInput::Many(batch)))
            .await
            .expect_err("zone 9 is invalid");
        assert!(matches!(err, ApiError::BadRequest(_)));

        let empty = create_workout(State(state.clone()), Query(UserQuery::default()), Json(WorkoutInput::Many(vec![])))
            .await
            .expect_err("empty batch");
        assert!(matches!(empty, ApiError::BadRequest(_)));

        let db = state.database.lock().await;
        assert!(db.list_workouts("me", &WorkoutFilter::default()).expect("list").is_empty());
    }
}
