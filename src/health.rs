use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{error, instrument, warn};

use crate::error::AppError;
use crate::state::AppState;
use crate::users::dto::{CreateUserRequest, CreatedUser};
use crate::users::repo::{DbHealth, DbStats, User};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/test-db", get(test_db).post(test_db_create))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SystemInfo {
    server_version: &'static str,
    platform: &'static str,
    arch: &'static str,
    uptime_secs: i64,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    database: DbHealth,
    #[serde(skip_serializing_if = "Option::is_none")]
    statistics: Option<DbStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    system: SystemInfo,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
}

/// Overall service health. Never errors out: a down database produces a 503
/// with a structured body, not a failed response.
#[instrument(skip(state))]
async fn health(State(state): State<AppState>) -> Response {
    let database = User::health_check(&state.db).await;

    let (statistics, stats_error) = if database.is_healthy() {
        match User::stats(&state.db).await {
            Ok(stats) => (Some(stats), None),
            Err(e) => {
                error!(error = %e, "failed to gather statistics");
                (None, Some(e.to_string()))
            }
        }
    } else {
        (None, None)
    };

    let now = OffsetDateTime::now_utc();
    let healthy = database.is_healthy() && stats_error.is_none();
    let body = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" },
        database,
        statistics,
        error: stats_error,
        system: SystemInfo {
            server_version: env!("CARGO_PKG_VERSION"),
            platform: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            uptime_secs: (now - state.started_at).whole_seconds(),
            timestamp: now,
        },
        timestamp: now,
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body)).into_response()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TestDbResponse {
    success: bool,
    message: &'static str,
    user_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
}

/// Connectivity probe: connect and count.
#[instrument(skip(state))]
async fn test_db(State(state): State<AppState>) -> Result<Json<TestDbResponse>, Response> {
    let count = async {
        let pool = state.db.pool().await?;
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;
        Ok::<_, AppError>(count)
    }
    .await;

    match count {
        Ok(user_count) => Ok(Json(TestDbResponse {
            success: true,
            message: "Database connection successful",
            user_count,
            timestamp: OffsetDateTime::now_utc(),
        })),
        Err(e) => {
            error!(error = %e, "database probe failed");
            let body = serde_json::json!({
                "success": false,
                "message": "Database connection failed",
                "error": e.to_string(),
            });
            Err((StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response())
        }
    }
}

#[derive(Debug, Serialize)]
struct TestDbCreateResponse {
    success: bool,
    message: &'static str,
    user: CreatedUser,
}

/// Diagnostics twin of `POST /users` that skips the duplicate pre-check, so
/// the store's unique constraint is exercised directly.
#[instrument(skip(state, payload))]
async fn test_db_create(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<TestDbCreateResponse>, AppError> {
    let Some((name, email)) = payload.required_fields() else {
        warn!("create probe missing required fields");
        return Err(AppError::Validation("Name and email are required".into()));
    };

    let user = User::create(&state.db, name, email, payload.role.unwrap_or_default()).await?;

    Ok(Json(TestDbCreateResponse {
        success: true,
        message: "User created successfully",
        user: user.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo::HealthStatus;
    use time::macros::datetime;

    #[test]
    fn unhealthy_body_reports_503_shape() {
        let ts = datetime!(2024-01-01 00:00 UTC);
        let body = HealthResponse {
            status: "unhealthy",
            database: DbHealth {
                status: HealthStatus::Unhealthy,
                user_count: None,
                error: Some("database connection failed".into()),
                timestamp: ts,
            },
            statistics: None,
            error: None,
            system: SystemInfo {
                server_version: "0.1.0",
                platform: "linux",
                arch: "x86_64",
                uptime_secs: 5,
                timestamp: ts,
            },
            timestamp: ts,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["status"], "unhealthy");
        assert_eq!(json["database"]["status"], "unhealthy");
        assert!(json.get("statistics").is_none());
        assert_eq!(json["system"]["platform"], "linux");
    }

    #[test]
    fn probe_response_uses_camel_case_count() {
        let body = TestDbResponse {
            success: true,
            message: "Database connection successful",
            user_count: 7,
            timestamp: datetime!(2024-01-01 00:00 UTC),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["userCount"], 7);
    }
}
