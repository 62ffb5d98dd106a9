#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::Duration;
use serde_json::{json, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt;

use daily_report::clock::SystemClock;
use daily_report::config::{AppConfig, AuthMode};
use daily_report::create_app_with_config;
use daily_report::jwt::JwtConfig;
use daily_report::models::user::CreateUserRequest;
use daily_report::models::Role;
use daily_report::services::UserService;
use daily_report::store::SqliteUserStore;

pub const PASSWORD: &str = "password123";

/// Ids handed out by `seed_org`, in insertion order.
pub const ADMIN: i64 = 1;
pub const BOSS: i64 = 2;
pub const LONER_BOSS: i64 = 3;
pub const ALICE: i64 = 4;
pub const BOB: i64 = 5;
pub const CAROL: i64 = 6;

pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    _dir: TempDir,
}

pub fn enforced() -> AppConfig {
    config(AuthMode::Enforced, Duration::hours(1))
}

pub fn config(auth_mode: AuthMode, ttl: Duration) -> AppConfig {
    AppConfig {
        jwt: JwtConfig::new("integration-secret", ttl),
        auth_mode,
    }
}

pub async fn spawn(config: AppConfig) -> Result<TestApp> {
    let dir = tempfile::tempdir().context("failed to create tempdir")?;
    let opts = SqliteConnectOptions::new()
        .filename(dir.path().join("reports.db"))
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new().max_connections(8).connect_with(opts).await?;

    let migrator =
        sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")).await?;
    migrator.run(&pool).await?;

    seed_org(&pool).await?;

    let app = create_app_with_config(pool.clone(), config);
    Ok(TestApp { app, pool, _dir: dir })
}

/// admin; boss under admin with alice and bob; loner_boss without staff; carol alone.
async fn seed_org(pool: &SqlitePool) -> Result<()> {
    let users = UserService::new(Arc::new(SqliteUserStore::new(pool.clone())), Arc::new(SystemClock));
    let people = [
        ("admin", Role::Admin, None),
        ("boss", Role::Supervisor, Some(ADMIN)),
        ("loner_boss", Role::Supervisor, None),
        ("alice", Role::Employee, Some(BOSS)),
        ("bob", Role::Employee, Some(BOSS)),
        ("carol", Role::Employee, None),
    ];

    for (username, role, supervisor_id) in people {
        users
            .register(CreateUserRequest {
                username: username.to_string(),
                password: PASSWORD.to_string(),
                email: Some(format!("{username}@example.com")),
                role,
                display_name: Some(username.to_uppercase()),
                supervisor_id,
            })
            .await?;
    }
    Ok(())
}

impl TestApp {
    pub async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let resp = self.app.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), usize::MAX).await?;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, json))
    }

    pub async fn login(&self, username: &str) -> Result<String> {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "username": username, "password": PASSWORD })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "login for {username} failed: {status} {body}");
        body["token"]
            .as_str()
            .map(str::to_string)
            .context("login response carries no token")
    }

    pub async fn create_report(&self, token: &str, date: &str, status: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::POST, "/api/daily-reports", Some(token), Some(report_body(date, status)))
            .await
    }
}

pub fn report_body(date: &str, status: &str) -> Value {
    json!({
        "title": format!("Report for {date}"),
        "work_content": format!("Worked through the queue on {date} and wrote notes."),
        "report_date": date,
        "status": status,
    })
}
