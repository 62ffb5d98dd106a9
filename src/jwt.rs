use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::errors::AppError;
use crate::models::user::Role;

const DEFAULT_EXPIRATION_MS: i64 = 86_400_000;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: Arc<Vec<u8>>,
    pub ttl: Duration,
}

impl JwtConfig {
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self {
            secret: Arc::new(secret.into()),
            ttl,
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        let secret = std::env::var("JWT_SECRET").map_err(|_| AppError::configuration("JWT_SECRET not set"))?;
        if secret.is_empty() {
            return Err(AppError::configuration("JWT_SECRET must not be empty"));
        }

        let expiration_ms = std::env::var("JWT_EXPIRATION_MS")
            .map(|val| val.parse::<i64>())
            .unwrap_or(Ok(DEFAULT_EXPIRATION_MS))
            .map_err(|_| AppError::configuration("JWT_EXPIRATION_MS must be a valid integer"))?;

        if expiration_ms <= 0 {
            return Err(AppError::configuration("JWT_EXPIRATION_MS must be positive"));
        }

        Ok(Self::new(secret.into_bytes(), Duration::milliseconds(expiration_ms)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    /// Standard expiry in whole seconds, rounded up.
    pub exp: i64,
    /// Millisecond-precision expiry; this is what `verify` checks.
    pub exp_ms: i64,
}

/// Identity recovered from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIdentity {
    pub username: String,
    pub role: Role,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("token signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("failed to sign token: {0}")]
    Encoding(String),
}

/// Issues and verifies signed, time-bounded `(username, role)` tokens.
pub struct TokenService {
    config: JwtConfig,
    encoding: EncodingKey,
    decoding: DecodingKey,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService").field("ttl", &self.config.ttl).finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(config: JwtConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: JwtConfig, clock: Arc<dyn Clock>) -> Self {
        let encoding = EncodingKey::from_secret(&config.secret);
        let decoding = DecodingKey::from_secret(&config.secret);
        Self {
            config,
            encoding,
            decoding,
            clock,
        }
    }

    pub fn issue(&self, username: &str, role: Role) -> Result<String, TokenError> {
        let now = self.clock.now();
        let expires_at = now + self.config.ttl;
        let exp_ms = expires_at.timestamp_millis();

        let claims = Claims {
            sub: username.to_string(),
            role,
            iat: now.timestamp(),
            exp: (exp_ms + 999).div_euclid(1000),
            exp_ms,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| TokenError::Encoding(err.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<TokenIdentity, TokenError> {
        let claims = self.decode(token)?;
        if self.is_past(&claims) {
            return Err(TokenError::Expired);
        }

        Ok(TokenIdentity {
            username: claims.sub,
            role: claims.role,
        })
    }

    /// Unparseable or forged tokens count as expired.
    pub fn is_expired(&self, token: &str) -> bool {
        match self.decode(token) {
            Ok(claims) => self.is_past(&claims),
            Err(_) => true,
        }
    }

    fn is_past(&self, claims: &Claims) -> bool {
        self.clock.now().timestamp_millis() >= claims.exp_ms
    }

    fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // expiry is checked against the injected clock with millisecond precision
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["sub", "exp"]);

        jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed(err.to_string()),
            })
    }
}
