use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use tracing::instrument;

use crate::app::AppState;
use crate::config::AuthMode;
use crate::errors::{AppError, AppResult};
use crate::jwt::TokenService;
use crate::models::User;
use crate::store::UserStore;

/// Whatever the caller presented with the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub bearer: Option<String>,
}

impl Credentials {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            bearer: Some(token.into()),
        }
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        let bearer = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(String::from);

        Self { bearer }
    }
}

/// Turns request credentials into a concrete, active user.
pub struct IdentityResolver {
    mode: AuthMode,
    tokens: Arc<TokenService>,
    users: Arc<dyn UserStore>,
}

impl IdentityResolver {
    pub fn new(mode: AuthMode, tokens: Arc<TokenService>, users: Arc<dyn UserStore>) -> Self {
        if let AuthMode::Bypass { fallback_username } = &mode {
            tracing::warn!(
                fallback_username = %fallback_username,
                "authentication bypass is enabled; every request acts as the fallback user"
            );
        }

        Self { mode, tokens, users }
    }

    pub fn mode(&self) -> &AuthMode {
        &self.mode
    }

    #[instrument(name = "identity.resolve", skip_all, fields(enforced = self.mode.is_enforced()))]
    pub async fn resolve(&self, credentials: &Credentials) -> AppResult<User> {
        let username = match &self.mode {
            AuthMode::Enforced => {
                let token = credentials
                    .bearer
                    .as_deref()
                    .ok_or_else(|| AppError::unauthenticated("bearer token missing"))?;

                let identity = self.tokens.verify(token).map_err(|err| {
                    tracing::debug!(error = %err, "token rejected");
                    AppError::unauthenticated(err.to_string())
                })?;
                identity.username
            }
            AuthMode::Bypass { fallback_username } => fallback_username.clone(),
        };

        // a valid token naming a removed, renamed or deactivated account grants nothing
        match self.users.find_by_username(&username).await? {
            Some(user) if user.is_active => Ok(user),
            Some(_) => {
                tracing::debug!(username = %username, "token subject is inactive");
                Err(AppError::unauthenticated("account is inactive"))
            }
            None => {
                tracing::debug!(username = %username, "token subject does not exist");
                Err(AppError::unauthenticated("unknown account"))
            }
        }
    }
}

/// The actor behind the current request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let credentials = Credentials::from_headers(&parts.headers);
        state.identity.resolve(&credentials).await.map(CurrentUser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::JwtConfig;
    use crate::models::user::NewUser;
    use crate::models::{Role, Timestamps};
    use crate::store::MemoryUserStore;
    use axum::http::HeaderValue;
    use chrono::{Duration, Utc};

    async fn users() -> Arc<MemoryUserStore> {
        let store = Arc::new(MemoryUserStore::new());
        for (name, active) in [("user1", true), ("ghost", false)] {
            store
                .insert(NewUser {
                    username: name.into(),
                    email: None,
                    password_hash: "x".into(),
                    role: Role::Employee,
                    display_name: None,
                    supervisor_id: None,
                    is_active: active,
                    timestamps: Timestamps::new(Utc::now()),
                })
                .await
                .unwrap();
        }
        store
    }

    fn tokens() -> Arc<TokenService> {
        Arc::new(TokenService::new(JwtConfig::new("test-secret", Duration::hours(1))))
    }

    #[tokio::test]
    async fn enforced_mode_requires_a_valid_token() {
        let tokens = tokens();
        let resolver = IdentityResolver::new(AuthMode::Enforced, tokens.clone(), users().await);

        let missing = resolver.resolve(&Credentials::none()).await;
        assert!(matches!(missing, Err(AppError::Unauthenticated(_))));

        let garbage = resolver.resolve(&Credentials::bearer("abc.def.ghi")).await;
        assert!(matches!(garbage, Err(AppError::Unauthenticated(_))));

        let token = tokens.issue("user1", Role::Employee).unwrap();
        let user = resolver.resolve(&Credentials::bearer(token)).await.unwrap();
        assert_eq!(user.username, "user1");
    }

    #[tokio::test]
    async fn valid_token_for_missing_or_inactive_user_is_rejected() {
        let tokens = tokens();
        let resolver = IdentityResolver::new(AuthMode::Enforced, tokens.clone(), users().await);

        for name in ["nobody", "ghost"] {
            let token = tokens.issue(name, Role::Admin).unwrap();
            let result = resolver.resolve(&Credentials::bearer(token)).await;
            assert!(matches!(result, Err(AppError::Unauthenticated(_))), "{name} resolved");
        }
    }

    #[tokio::test]
    async fn two_modes_coexist_in_one_process() {
        let store = users().await;
        let enforced = IdentityResolver::new(AuthMode::Enforced, tokens(), store.clone());
        let bypass = IdentityResolver::new(
            AuthMode::Bypass {
                fallback_username: "user1".into(),
            },
            tokens(),
            store.clone(),
        );

        assert!(enforced.resolve(&Credentials::none()).await.is_err());
        let user = bypass.resolve(&Credentials::bearer("ignored")).await.unwrap();
        assert_eq!(user.username, "user1");

        let broken = IdentityResolver::new(
            AuthMode::Bypass {
                fallback_username: "nobody".into(),
            },
            tokens(),
            store,
        );
        assert!(matches!(broken.resolve(&Credentials::none()).await, Err(AppError::Unauthenticated(_))));
    }

    #[test]
    fn bearer_is_read_from_authorization_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(Credentials::from_headers(&headers), Credentials::none());

        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(Credentials::from_headers(&headers), Credentials::none());

        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(Credentials::from_headers(&headers), Credentials::bearer("tok"));
    }
}
