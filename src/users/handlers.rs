use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

use super::dto::{
    CreateUserRequest, CreatedUserResponse, ListUsersResponse, UpdateUserRequest, UserResponse,
};
use super::repo::User;

/// A malformed id cannot match any record, so it reads as absent rather
/// than as a client-visible parse failure.
fn parse_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::NotFound("User not found".into()))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<ListUsersResponse>, AppError> {
    let users = User::get_all(&state.db).await?;
    let count = users.len();
    Ok(Json(ListUsersResponse {
        success: true,
        data: users,
        count,
    }))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<CreatedUserResponse>, AppError> {
    let Some((name, email)) = payload.required_fields() else {
        return Err(AppError::Validation("Name and email are required".into()));
    };

    if User::get_by_email(&state.db, email).await?.is_some() {
        warn!(%email, "duplicate email on create");
        return Err(AppError::DuplicateEmail(
            "User with this email already exists".into(),
        ));
    }

    let user = User::create(&state.db, name, email, payload.role.unwrap_or_default()).await?;
    info!(user_id = %user.id, "user created");

    Ok(Json(CreatedUserResponse {
        success: true,
        message: "User created successfully".into(),
        data: user.into(),
    }))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let id = parse_id(&id)?;
    let user = User::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(Json(UserResponse {
        success: true,
        message: None,
        data: user,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let id = parse_id(&id)?;

    if payload.is_empty() {
        return Err(AppError::Validation(
            "At least one field must be provided for update".into(),
        ));
    }
    if payload.has_blank_field() {
        return Err(AppError::Validation(
            "Name and email must not be empty".into(),
        ));
    }

    let existing = User::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    // Only re-check uniqueness when the email actually changes.
    if let Some(email) = payload.email.as_deref() {
        if email != existing.email && User::get_by_email(&state.db, email).await?.is_some() {
            warn!(%email, "duplicate email on update");
            return Err(AppError::DuplicateEmail("Email already exists".into()));
        }
    }

    let user = User::update(&state.db, id, &payload).await?;
    info!(user_id = %user.id, "user updated");

    Ok(Json(UserResponse {
        success: true,
        message: Some("User updated successfully".into()),
        data: user,
    }))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let id = parse_id(&id)?;

    User::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let user = User::delete(&state.db, id).await?;
    info!(user_id = %user.id, "user soft-deleted");

    Ok(Json(UserResponse {
        success: true,
        message: Some("User deleted successfully".into()),
        data: user,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_ids_read_as_not_found() {
        let err = parse_id("not-a-uuid").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert!(parse_id("00000000-0000-0000-0000-000000000000").is_ok());
    }

    #[test]
    fn list_response_serializes_envelope() {
        let resp = ListUsersResponse {
            success: true,
            data: vec![],
            count: 0,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["count"], 0);
        assert!(json["data"].as_array().unwrap().is_empty());
    }

    #[test]
    fn get_response_omits_message() {
        use crate::users::repo::{Role, User};
        use time::macros::datetime;

        let resp = UserResponse {
            success: true,
            message: None,
            data: User {
                id: Uuid::nil(),
                name: "Alice".into(),
                email: "a@x.com".into(),
                role: Role::Student,
                is_active: true,
                created_at: datetime!(2024-01-01 00:00 UTC),
                updated_at: datetime!(2024-01-01 00:00 UTC),
            },
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("message").is_none());
        assert_eq!(json["data"]["email"], "a@x.com");
    }
}
