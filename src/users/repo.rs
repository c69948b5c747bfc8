use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::db::Db;
use crate::error::AppError;

use super::dto::UpdateUserRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Role::Student
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// One group of the per-role breakdown. The `_id` key mirrors the grouping
/// key in the wire format consumers already depend on.
#[derive(Debug, Serialize, FromRow)]
pub struct RoleCount {
    #[serde(rename = "_id")]
    #[sqlx(rename = "_id")]
    pub role: Role,
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Health-check report. Produced even when the store is down; failures are
/// folded into `error` instead of propagating.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl DbHealth {
    pub fn is_healthy(&self) -> bool {
        matches!(self.status, HealthStatus::Healthy)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbStats {
    pub total_users: i64,
    pub active_users: i64,
    pub users_by_role: Vec<RoleCount>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl User {
    /// Active users only, newest first.
    pub async fn get_all(db: &Db) -> Result<Vec<User>, AppError> {
        let pool = db.pool().await?;
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, role, is_active, created_at, updated_at
            FROM users
            WHERE is_active
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(pool)
        .await?;
        Ok(users)
    }

    /// Primary-key fetch. Deliberately does not filter on `is_active` so
    /// soft-deleted users stay reachable by id.
    pub async fn get_by_id(db: &Db, id: Uuid) -> Result<Option<User>, AppError> {
        let pool = db.pool().await?;
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, role, is_active, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(user)
    }

    /// Email lookup over active users; used for the duplicate pre-check.
    pub async fn get_by_email(db: &Db, email: &str) -> Result<Option<User>, AppError> {
        let pool = db.pool().await?;
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, role, is_active, created_at, updated_at
            FROM users
            WHERE email = $1 AND is_active
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;
        Ok(user)
    }

    /// Inserts a new active user. The unique index on `email` backstops the
    /// handler-side duplicate check; a violation surfaces as
    /// [`AppError::DuplicateEmail`].
    pub async fn create(db: &Db, name: &str, email: &str, role: Role) -> Result<User, AppError> {
        let pool = db.pool().await?;
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, role)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, role, is_active, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(role)
        .fetch_one(pool)
        .await?;
        Ok(user)
    }

    /// Merges only the provided fields into the row and bumps `updated_at`.
    pub async fn update(db: &Db, id: Uuid, patch: &UpdateUserRequest) -> Result<User, AppError> {
        let pool = db.pool().await?;
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                role = COALESCE($4, role),
                is_active = COALESCE($5, is_active),
                updated_at = now()
            WHERE id = $1
            RETURNING id, name, email, role, is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.email.as_deref())
        .bind(patch.role)
        .bind(patch.is_active)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        Ok(user)
    }

    /// Soft delete: flips `is_active` off and bumps `updated_at`; the row is
    /// otherwise untouched and stays fetchable by id.
    pub async fn delete(db: &Db, id: Uuid) -> Result<User, AppError> {
        let pool = db.pool().await?;
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET is_active = FALSE,
                updated_at = now()
            WHERE id = $1
            RETURNING id, name, email, role, is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        Ok(user)
    }

    /// Connectivity probe. Never fails: any connection or query error is
    /// reported inside the result.
    pub async fn health_check(db: &Db) -> DbHealth {
        let count = async {
            let pool = db.pool().await?;
            let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
                .fetch_one(pool)
                .await?;
            Ok::<_, AppError>(count)
        }
        .await;

        match count {
            Ok(user_count) => DbHealth {
                status: HealthStatus::Healthy,
                user_count: Some(user_count),
                error: None,
                timestamp: OffsetDateTime::now_utc(),
            },
            Err(e) => {
                warn!(error = %e, "health check failed");
                DbHealth {
                    status: HealthStatus::Unhealthy,
                    user_count: None,
                    error: Some(e.to_string()),
                    timestamp: OffsetDateTime::now_utc(),
                }
            }
        }
    }

    /// Totals plus a per-role breakdown over the whole table, soft-deleted
    /// rows included.
    pub async fn stats(db: &Db) -> Result<DbStats, AppError> {
        let pool = db.pool().await?;

        let (total_users,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;
        let (active_users,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE is_active")
                .fetch_one(pool)
                .await?;
        let users_by_role = sqlx::query_as::<_, RoleCount>(
            r#"
            SELECT role AS _id, COUNT(*) AS count
            FROM users
            GROUP BY role
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(DbStats {
            total_users,
            active_users,
            users_by_role,
            timestamp: OffsetDateTime::now_utc(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sample_user() -> User {
        User {
            id: Uuid::nil(),
            name: "Alice".into(),
            email: "a@x.com".into(),
            role: Role::Student,
            is_active: true,
            created_at: datetime!(2024-01-01 00:00 UTC),
            updated_at: datetime!(2024-01-02 00:00 UTC),
        }
    }

    #[test]
    fn user_serializes_with_camel_case_keys() {
        let json = serde_json::to_value(sample_user()).unwrap();
        assert_eq!(json["isActive"], true);
        assert_eq!(json["role"], "student");
        assert_eq!(json["createdAt"], "2024-01-01T00:00:00Z");
        assert_eq!(json["updatedAt"], "2024-01-02T00:00:00Z");
        assert!(json.get("is_active").is_none());
    }

    #[test]
    fn role_defaults_to_student() {
        assert_eq!(Role::default(), Role::Student);
    }

    #[test]
    fn role_round_trips_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Teacher).unwrap(), "\"teacher\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn role_count_uses_underscore_id_key() {
        let group = RoleCount {
            role: Role::Teacher,
            count: 3,
        };
        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(json["_id"], "teacher");
        assert_eq!(json["count"], 3);
    }

    #[test]
    fn unhealthy_report_carries_error_not_count() {
        let health = DbHealth {
            status: HealthStatus::Unhealthy,
            user_count: None,
            error: Some("database connection failed".into()),
            timestamp: datetime!(2024-01-01 00:00 UTC),
        };
        assert!(!health.is_healthy());
        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["status"], "unhealthy");
        assert!(json.get("userCount").is_none());
        assert_eq!(json["error"], "database connection failed");
    }
}
