mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{enforced, spawn, ADMIN, ALICE, BOSS, CAROL, PASSWORD};

#[tokio::test]
async fn only_admins_manage_users() -> Result<()> {
    let t = spawn(enforced()).await?;
    let admin = t.login("admin").await?;
    let boss = t.login("boss").await?;

    let (status, list) = t.send(Method::GET, "/api/users", Some(&admin), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().map(Vec::len), Some(6));

    let (status, body) = t.send(Method::GET, "/api/users", Some(&boss), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
    Ok(())
}

#[tokio::test]
async fn create_user_then_log_in() -> Result<()> {
    let t = spawn(enforced()).await?;
    let admin = t.login("admin").await?;

    let new_user = json!({
        "username": "dave",
        "password": PASSWORD,
        "email": "dave@example.com",
        "role": "employee",
        "supervisor_id": BOSS,
    });
    let (status, created) = t.send(Method::POST, "/api/users", Some(&admin), Some(new_user.clone())).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["display_name"], "dave");
    assert_eq!(created["supervisor_id"], BOSS);

    let (status, _) = t.send(Method::POST, "/api/users", Some(&admin), Some(new_user)).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    t.login("dave").await?;
    Ok(())
}

#[tokio::test]
async fn reassigning_a_supervisor_changes_visibility() -> Result<()> {
    let t = spawn(enforced()).await?;
    let admin = t.login("admin").await?;
    let carol = t.login("carol").await?;
    let boss = t.login("boss").await?;

    let (_, report) = t.create_report(&carol, "2024-01-15", "submitted").await?;
    let uri = format!("/api/daily-reports/{}", report["id"]);

    let (status, _) = t.send(Method::GET, &uri, Some(&boss), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, updated) = t
        .send(
            Method::PUT,
            &format!("/api/users/{CAROL}"),
            Some(&admin),
            Some(json!({ "supervisor_id": BOSS })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["supervisor_id"], BOSS);

    let (status, _) = t.send(Method::GET, &uri, Some(&boss), None).await?;
    assert_eq!(status, StatusCode::OK);

    // a supervisor cannot be placed under one of their own reports
    let (status, _) = t
        .send(
            Method::PUT,
            &format!("/api/users/{BOSS}"),
            Some(&admin),
            Some(json!({ "supervisor_id": ALICE })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn deleting_a_user_removes_their_reports() -> Result<()> {
    let t = spawn(enforced()).await?;
    let admin = t.login("admin").await?;
    let alice = t.login("alice").await?;
    t.create_report(&alice, "2024-01-15", "draft").await?;

    let (status, _) = t.send(Method::DELETE, &format!("/api/users/{ALICE}"), Some(&admin), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM daily_reports").fetch_one(&t.pool).await?;
    assert_eq!(count, 0);

    let (status, _) = t.send(Method::DELETE, &format!("/api/users/{ADMIN}"), Some(&admin), None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = t.send(Method::DELETE, &format!("/api/users/{ALICE}"), Some(&admin), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
