use crate::errors::AppError;
use crate::jwt::JwtConfig;

const DEFAULT_FALLBACK_USERNAME: &str = "user1";

/// How inbound credentials are turned into an actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// A verified, unexpired bearer token is required.
    Enforced,
    /// Credentials are ignored and every request acts as `fallback_username`.
    /// Local testing only.
    Bypass { fallback_username: String },
}

impl AuthMode {
    pub fn from_env() -> Result<Self, AppError> {
        let enabled = match std::env::var("JWT_AUTH_ENABLED") {
            Ok(value) => parse_bool(&value)
                .ok_or_else(|| AppError::configuration("JWT_AUTH_ENABLED must be true or false"))?,
            Err(_) => true,
        };

        if enabled {
            return Ok(AuthMode::Enforced);
        }

        let fallback_username = std::env::var("DEBUG_DEFAULT_USERNAME")
            .ok()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_FALLBACK_USERNAME.to_string());

        Ok(AuthMode::Bypass { fallback_username })
    }

    pub fn is_enforced(&self) -> bool {
        matches!(self, AuthMode::Enforced)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt: JwtConfig,
    pub auth_mode: AuthMode,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            jwt: JwtConfig::from_env()?,
            auth_mode: AuthMode::from_env()?,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
