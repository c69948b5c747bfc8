use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{Role, User};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl CreateUserRequest {
    /// Presence check for the required fields; whitespace-only counts as
    /// missing.
    pub fn required_fields(&self) -> Option<(&str, &str)> {
        let name = self.name.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let email = self
            .email
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())?;
        Some((name, email))
    }
}

/// Patch for partial updates: only fields present in the body are applied.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl UpdateUserRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.role.is_none()
            && self.is_active.is_none()
    }

    /// A field that is present but blank would merge into an invalid record.
    pub fn has_blank_field(&self) -> bool {
        let blank = |v: &Option<String>| v.as_deref().is_some_and(|s| s.trim().is_empty());
        blank(&self.name) || blank(&self.email)
    }
}

#[derive(Debug, Serialize)]
pub struct ListUsersResponse {
    pub success: bool,
    pub data: Vec<User>,
    pub count: usize,
}

/// Trimmed view of a freshly created user, as the create endpoint returns it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for CreatedUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: User,
}

#[derive(Debug, Serialize)]
pub struct CreatedUserResponse {
    pub success: bool,
    pub message: String,
    pub data: CreatedUser,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_rejects_missing_or_blank_fields() {
        let req: CreateUserRequest = serde_json::from_str(r#"{"email":"a@x.com"}"#).unwrap();
        assert!(req.required_fields().is_none());

        let req: CreateUserRequest =
            serde_json::from_str(r#"{"name":"   ","email":"a@x.com"}"#).unwrap();
        assert!(req.required_fields().is_none());

        let req: CreateUserRequest =
            serde_json::from_str(r#"{"name":"Alice","email":"a@x.com"}"#).unwrap();
        assert_eq!(req.required_fields(), Some(("Alice", "a@x.com")));
        assert!(req.role.is_none());
    }

    #[test]
    fn update_request_detects_empty_patch() {
        let patch: UpdateUserRequest = serde_json::from_str("{}").unwrap();
        assert!(patch.is_empty());

        let patch: UpdateUserRequest = serde_json::from_str(r#"{"isActive":false}"#).unwrap();
        assert!(!patch.is_empty());
        assert_eq!(patch.is_active, Some(false));
    }

    #[test]
    fn update_request_detects_blank_fields() {
        let patch: UpdateUserRequest = serde_json::from_str(r#"{"name":""}"#).unwrap();
        assert!(patch.has_blank_field());

        let patch: UpdateUserRequest = serde_json::from_str(r#"{"name":"X"}"#).unwrap();
        assert!(!patch.has_blank_field());
    }

    #[test]
    fn update_request_reads_camel_case_keys() {
        let patch: UpdateUserRequest =
            serde_json::from_str(r#"{"isActive":true,"role":"teacher"}"#).unwrap();
        assert_eq!(patch.is_active, Some(true));
        assert_eq!(patch.role, Some(Role::Teacher));
    }
}
