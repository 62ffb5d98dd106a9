use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::app::AppState;
use crate::errors::AppResult;
use crate::identity::CurrentUser;
use crate::models::report::{
    DailyReportListItem, DailyReportRequest, DailyReportResponse, StatusQuery, TodayReportStatus,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_report))
        .route("/my", get(list_my_reports))
        .route("/subordinates", get(list_subordinate_reports))
        .route("/today/exists", get(today_exists))
        .route("/:id", get(get_report).put(update_report).delete(delete_report))
}

#[utoipa::path(
    post,
    path = "/api/daily-reports",
    tag = "Daily Reports",
    request_body = DailyReportRequest,
    responses(
        (status = 201, description = "Report created", body = DailyReportResponse),
        (status = 400, description = "Invalid report"),
        (status = 409, description = "A report for this date already exists")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<DailyReportRequest>,
) -> AppResult<(StatusCode, Json<DailyReportResponse>)> {
    let report = state.reports.create(user.id, &payload).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

#[utoipa::path(
    get,
    path = "/api/daily-reports/my",
    tag = "Daily Reports",
    params(StatusQuery),
    responses(
        (status = 200, description = "Own reports, newest first", body = Vec<DailyReportListItem>)
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_my_reports(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<StatusQuery>,
) -> AppResult<Json<Vec<DailyReportListItem>>> {
    let reports = state.reports.list_mine(&user, query.status.as_deref()).await?;
    Ok(Json(reports))
}

#[utoipa::path(
    get,
    path = "/api/daily-reports/subordinates",
    tag = "Daily Reports",
    params(StatusQuery),
    responses(
        (status = 200, description = "Direct reports' reports", body = Vec<DailyReportListItem>)
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_subordinate_reports(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<StatusQuery>,
) -> AppResult<Json<Vec<DailyReportListItem>>> {
    let reports = state.reports.list_subordinates(&user, query.status.as_deref()).await?;
    Ok(Json(reports))
}

#[utoipa::path(
    get,
    path = "/api/daily-reports/today/exists",
    tag = "Daily Reports",
    responses((status = 200, description = "Whether today's report exists", body = TodayReportStatus)),
    security(("bearerAuth" = []))
)]
pub async fn today_exists(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<TodayReportStatus>> {
    let exists = state.reports.has_today(&user).await?;
    Ok(Json(TodayReportStatus {
        date: state.reports.today(),
        exists,
    }))
}

/// Reports the caller may not see answer exactly like missing ones.
#[utoipa::path(
    get,
    path = "/api/daily-reports/{id}",
    tag = "Daily Reports",
    params(("id" = i64, Path, description = "Report id")),
    responses(
        (status = 200, description = "Report", body = DailyReportResponse),
        (status = 404, description = "Report not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<DailyReportResponse>> {
    let report = state.reports.get_by_id(id, &user).await?.into_result(id)?;
    Ok(Json(report))
}

#[utoipa::path(
    put,
    path = "/api/daily-reports/{id}",
    tag = "Daily Reports",
    params(("id" = i64, Path, description = "Report id")),
    request_body = DailyReportRequest,
    responses(
        (status = 200, description = "Report updated", body = DailyReportResponse),
        (status = 400, description = "Invalid report"),
        (status = 404, description = "Report not found"),
        (status = 409, description = "A report for this date already exists")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<DailyReportRequest>,
) -> AppResult<Json<DailyReportResponse>> {
    let report = state.reports.update(id, &user, &payload).await?;
    Ok(Json(report))
}

#[utoipa::path(
    delete,
    path = "/api/daily-reports/{id}",
    tag = "Daily Reports",
    params(("id" = i64, Path, description = "Report id")),
    responses(
        (status = 204, description = "Report deleted"),
        (status = 404, description = "Report not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    state.reports.delete(id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}
