mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use chrono::Duration;

use common::{config, spawn, BOB};
use daily_report::config::AuthMode;

fn bypass(username: &str) -> daily_report::config::AppConfig {
    config(
        AuthMode::Bypass {
            fallback_username: username.to_string(),
        },
        Duration::hours(1),
    )
}

#[tokio::test]
async fn requests_act_as_the_fallback_user() -> Result<()> {
    let t = spawn(bypass("bob")).await?;

    let (status, me) = t.send(Method::GET, "/api/auth/me", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], BOB);

    // whatever token is presented is ignored
    let (status, created) = t.create_report("garbage", "2024-01-15", "draft").await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["user_id"], BOB);

    let (status, health) = t.send(Method::GET, "/api/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["auth_enforced"], false);
    Ok(())
}

#[tokio::test]
async fn unknown_fallback_user_is_unauthenticated() -> Result<()> {
    let t = spawn(bypass("nobody")).await?;

    let (status, _) = t.send(Method::GET, "/api/daily-reports/my", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}
