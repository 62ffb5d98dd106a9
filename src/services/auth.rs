use std::sync::Arc;

use tracing::instrument;

use crate::errors::{AppError, AppResult};
use crate::identity::{Credentials, IdentityResolver};
use crate::jwt::TokenService;
use crate::models::user::{LoginResponse, SessionStatus, UserSummary};
use crate::store::UserStore;
use crate::utils::CredentialVerifier;

/// Login and session checks exposed to the HTTP layer.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: Arc<TokenService>,
    verifier: Arc<dyn CredentialVerifier>,
    identity: Arc<IdentityResolver>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<TokenService>,
        verifier: Arc<dyn CredentialVerifier>,
        identity: Arc<IdentityResolver>,
    ) -> Self {
        Self {
            users,
            tokens,
            verifier,
            identity,
        }
    }

    /// Every failure, whatever the cause, is `InvalidCredentials`.
    #[instrument(name = "auth.login", skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> AppResult<LoginResponse> {
        let user = match self.users.find_by_username(username).await? {
            Some(user) if user.is_active => user,
            _ => {
                self.verifier.matches_nothing(password);
                tracing::warn!("login failed");
                return Err(AppError::InvalidCredentials);
            }
        };

        if !self.verifier.matches(password, &user.password_hash) {
            tracing::warn!("login failed");
            return Err(AppError::InvalidCredentials);
        }

        let token = self
            .tokens
            .issue(&user.username, user.role)
            .map_err(|err| AppError::internal(err.to_string()))?;

        tracing::info!(user_id = user.id, "login succeeded");
        Ok(LoginResponse {
            token,
            user: user.summary(),
        })
    }

    pub async fn validate_current_session(&self, credentials: &Credentials) -> AppResult<SessionStatus> {
        let user = self.identity.resolve(credentials).await?;
        Ok(SessionStatus {
            valid: true,
            username: user.username,
            role: user.role,
        })
    }

    pub async fn current_user(&self, credentials: &Credentials) -> AppResult<UserSummary> {
        let user = self.identity.resolve(credentials).await?;
        Ok(user.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthMode;
    use crate::jwt::JwtConfig;
    use crate::models::user::NewUser;
    use crate::models::{Role, Timestamps};
    use crate::store::MemoryUserStore;
    use crate::utils::{hash_password, Argon2Verifier};
    use chrono::{Duration, Utc};

    async fn service() -> AuthService {
        let users = Arc::new(MemoryUserStore::new());
        let hash = hash_password("password123").unwrap();
        for (name, active) in [("user1", true), ("retired", false)] {
            users
                .insert(NewUser {
                    username: name.into(),
                    email: Some(format!("{name}@example.com")),
                    password_hash: hash.clone(),
                    role: Role::Employee,
                    display_name: Some(format!("{name} display")),
                    supervisor_id: None,
                    is_active: active,
                    timestamps: Timestamps::new(Utc::now()),
                })
                .await
                .unwrap();
        }

        let tokens = Arc::new(TokenService::new(JwtConfig::new("test-secret", Duration::hours(1))));
        let identity = Arc::new(IdentityResolver::new(AuthMode::Enforced, tokens.clone(), users.clone()));
        AuthService::new(users, tokens, Arc::new(Argon2Verifier), identity)
    }

    #[tokio::test]
    async fn login_issues_a_token_that_opens_the_session() {
        let auth = service().await;
        let response = auth.login("user1", "password123").await.unwrap();
        assert_eq!(response.user.username, "user1");
        assert_eq!(response.user.display_name, "user1 display");

        let credentials = Credentials::bearer(response.token);
        let session = auth.validate_current_session(&credentials).await.unwrap();
        assert!(session.valid);
        assert_eq!(session.role, Role::Employee);

        let me = auth.current_user(&credentials).await.unwrap();
        assert_eq!(me.id, response.user.id);
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let auth = service().await;

        let wrong_password = auth.login("user1", "password124").await.unwrap_err();
        let unknown_user = auth.login("nobody", "password123").await.unwrap_err();
        let inactive = auth.login("retired", "password123").await.unwrap_err();

        for err in [&wrong_password, &unknown_user, &inactive] {
            assert!(matches!(err, AppError::InvalidCredentials));
        }
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn session_without_token_is_unauthenticated() {
        let auth = service().await;
        let result = auth.validate_current_session(&Credentials::none()).await;
        assert!(matches!(result, Err(AppError::Unauthenticated(_))));
    }
}
