use std::sync::Arc;

use tracing::{info, instrument};

use crate::authz::is_role;
use crate::clock::Clock;
use crate::errors::{AppError, AppResult};
use crate::models::user::{CreateUserRequest, NewUser, UpdateUserRequest, UserSummary};
use crate::models::{Role, Timestamps, User};
use crate::store::{StoreError, UserStore};
use crate::utils::hash_password;

fn taken(err: StoreError) -> AppError {
    match err {
        StoreError::UniqueViolation => AppError::conflict("username or email already in use"),
        other => other.into(),
    }
}

fn require_admin(actor: &User) -> AppResult<()> {
    if is_role(actor, Role::Admin) {
        Ok(())
    } else {
        Err(AppError::forbidden("admin role required"))
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Account administration.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>, clock: Arc<dyn Clock>) -> Self {
        Self { users, clock }
    }

    /// Creates an account without an acting admin. Used by the CLI and seeding.
    #[instrument(name = "users.register", skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: CreateUserRequest) -> AppResult<User> {
        let username = request.username.trim().to_string();
        if username.is_empty() {
            return Err(AppError::validation("username is required"));
        }

        if let Some(supervisor_id) = request.supervisor_id {
            self.check_supervisor(None, supervisor_id).await?;
        }

        let password_hash = hash_password(&request.password)?;
        let user = self
            .users
            .insert(NewUser {
                username,
                email: normalize(request.email),
                password_hash,
                role: request.role,
                display_name: normalize(request.display_name),
                supervisor_id: request.supervisor_id,
                is_active: true,
                timestamps: Timestamps::new(self.clock.now()),
            })
            .await
            .map_err(taken)?;

        info!(user_id = user.id, role = %user.role, "user registered");
        Ok(user)
    }

    pub async fn list(&self, actor: &User) -> AppResult<Vec<UserSummary>> {
        require_admin(actor)?;
        let users = self.users.list().await?;
        Ok(users.iter().map(User::summary).collect())
    }

    pub async fn create(&self, actor: &User, request: CreateUserRequest) -> AppResult<UserSummary> {
        require_admin(actor)?;
        self.register(request).await.map(|user| user.summary())
    }

    #[instrument(name = "users.update", skip(self, actor, request), fields(actor_id = actor.id))]
    pub async fn update(&self, actor: &User, user_id: i64, request: UpdateUserRequest) -> AppResult<UserSummary> {
        require_admin(actor)?;
        let mut user = self.load(user_id).await?;

        if let Some(email) = request.email {
            user.email = normalize(Some(email));
        }
        if let Some(display_name) = request.display_name {
            user.display_name = normalize(Some(display_name));
        }
        if let Some(role) = request.role {
            user.role = role;
        }
        if request.clear_supervisor {
            user.supervisor_id = None;
        } else if let Some(supervisor_id) = request.supervisor_id {
            self.check_supervisor(Some(user_id), supervisor_id).await?;
            user.supervisor_id = Some(supervisor_id);
        }

        user.timestamps = user.timestamps.touched(self.clock.now());
        self.users.update(&user).await.map_err(taken)?;

        info!(user_id, "user updated");
        Ok(user.summary())
    }

    #[instrument(name = "users.toggle_active", skip(self, actor), fields(actor_id = actor.id))]
    pub async fn toggle_active(&self, actor: &User, user_id: i64) -> AppResult<UserSummary> {
        require_admin(actor)?;
        if actor.id == user_id {
            return Err(AppError::validation("admins cannot deactivate themselves"));
        }

        let mut user = self.load(user_id).await?;
        user.is_active = !user.is_active;
        user.timestamps = user.timestamps.touched(self.clock.now());
        self.users.update(&user).await?;

        info!(user_id, is_active = user.is_active, "user activation toggled");
        Ok(user.summary())
    }

    #[instrument(name = "users.delete", skip(self, actor), fields(actor_id = actor.id))]
    pub async fn delete(&self, actor: &User, user_id: i64) -> AppResult<()> {
        require_admin(actor)?;
        if actor.id == user_id {
            return Err(AppError::validation("admins cannot delete themselves"));
        }

        if !self.users.delete(user_id).await? {
            return Err(AppError::UnknownUser(user_id));
        }

        info!(user_id, "user deleted");
        Ok(())
    }

    async fn load(&self, user_id: i64) -> AppResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::UnknownUser(user_id))
    }

    /// Existing, active, not the user itself, and not one of the user's own direct reports.
    async fn check_supervisor(&self, user_id: Option<i64>, supervisor_id: i64) -> AppResult<()> {
        if user_id == Some(supervisor_id) {
            return Err(AppError::validation("a user cannot supervise themselves"));
        }

        let supervisor = self
            .users
            .find_by_id(supervisor_id)
            .await?
            .ok_or_else(|| AppError::validation(format!("supervisor {supervisor_id} does not exist")))?;

        if !supervisor.is_active {
            return Err(AppError::validation(format!("supervisor {supervisor_id} is inactive")));
        }
        if user_id.is_some_and(|id| supervisor.reports_to(id)) {
            return Err(AppError::validation("supervisor already reports to this user"));
        }
        Ok(())
    }
}
