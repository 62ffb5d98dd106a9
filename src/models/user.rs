use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::models::Timestamps;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Supervisor,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Supervisor => "supervisor",
            Role::Employee => "employee",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Employee
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "supervisor" => Ok(Role::Supervisor),
            "employee" => Ok(Role::Employee),
            other => Err(AppError::validation(format!("unknown role '{other}'"))),
        }
    }
}

/// A registered account. Supervisors are referenced by id only and looked up one level deep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub display_name: Option<String>,
    pub supervisor_id: Option<i64>,
    pub is_active: bool,
    pub timestamps: Timestamps,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            display_name: self.display_name.clone().unwrap_or_else(|| self.username.clone()),
            supervisor_id: self.supervisor_id,
            is_active: self.is_active,
        }
    }

    pub fn reports_to(&self, supervisor_id: i64) -> bool {
        self.supervisor_id == Some(supervisor_id)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: String,
    pub display_name: Option<String>,
    pub supervisor_id: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbUser> for User {
    type Error = AppError;

    fn try_from(value: DbUser) -> Result<Self, Self::Error> {
        let role = value
            .role
            .parse::<Role>()
            .map_err(|_| AppError::internal(format!("user {} has unknown role '{}'", value.id, value.role)))?;

        Ok(User {
            id: value.id,
            username: value.username,
            email: value.email,
            password_hash: value.password_hash,
            role,
            display_name: value.display_name,
            supervisor_id: value.supervisor_id,
            is_active: value.is_active,
            timestamps: Timestamps {
                created_at: value.created_at,
                updated_at: value.updated_at,
            },
        })
    }
}

/// Insert payload; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub display_name: Option<String>,
    pub supervisor_id: Option<i64>,
    pub is_active: bool,
    pub timestamps: Timestamps,
}

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: i64,
    #[schema(example = "user1")]
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
    pub display_name: String,
    pub supervisor_id: Option<i64>,
    pub is_active: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "user1")]
    pub username: String,
    #[schema(example = "password123")]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionStatus {
    pub valid: bool,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    #[schema(example = "user2")]
    pub username: String,
    #[schema(example = "password123")]
    pub password: String,
    #[schema(example = "user2@example.com")]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
    pub display_name: Option<String>,
    pub supervisor_id: Option<i64>,
}

/// Partial profile update. Absent fields are left as they are.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: Option<Role>,
    pub supervisor_id: Option<i64>,
    /// Detach the user from their supervisor. Wins over `supervisor_id`.
    #[serde(default)]
    pub clear_supervisor: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!("Supervisor".parse::<Role>().unwrap(), Role::Supervisor);
        assert_eq!(" ADMIN ".parse::<Role>().unwrap(), Role::Admin);
        assert!("boss".parse::<Role>().is_err());
    }

    #[test]
    fn summary_defaults_display_name_to_username() {
        let now = Utc::now();
        let user = User {
            id: 4,
            username: "user1".into(),
            email: None,
            password_hash: "x".into(),
            role: Role::Employee,
            display_name: None,
            supervisor_id: Some(2),
            is_active: true,
            timestamps: Timestamps::new(now),
        };

        let summary = user.summary();
        assert_eq!(summary.display_name, "user1");
        assert!(user.reports_to(2));
        assert!(!user.reports_to(4));
    }
}
