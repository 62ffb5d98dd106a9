use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Map, Value};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::models;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
	paths(
		routes::auth::login,
		routes::auth::validate,
		routes::auth::me,
		routes::auth::logout,
		routes::reports::create_report,
		routes::reports::list_my_reports,
		routes::reports::list_subordinate_reports,
		routes::reports::today_exists,
		routes::reports::get_report,
		routes::reports::update_report,
		routes::reports::delete_report,
		routes::users::list_users,
		routes::users::create_user,
		routes::users::update_user,
		routes::users::toggle_active,
		routes::users::delete_user,
		routes::health::health
	),
	components(
		schemas(
			models::user::Role,
			models::user::UserSummary,
			models::user::LoginRequest,
			models::user::LoginResponse,
			models::user::SessionStatus,
			models::user::CreateUserRequest,
			models::user::UpdateUserRequest,
			models::report::ReportStatus,
			models::report::DailyReportRequest,
			models::report::DailyReportResponse,
			models::report::DailyReportListItem,
			models::report::TodayReportStatus,
			routes::MessageResponse,
			routes::health::HealthResponse
		)
	),
	tags(
		(name = "Auth", description = "Login and session checks"),
		(name = "Daily Reports", description = "One report per user per day"),
		(name = "Users", description = "Account administration"),
		(name = "Health", description = "Liveness and database check")
	)
)]
pub struct ApiDoc;

/// OpenAPI document with the bearer scheme and a local server entry.
pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
	let mut doc = serde_json::to_value(ApiDoc::openapi())?;

	ensure_security_components(&mut doc);
	ensure_servers(&mut doc, port);

	Ok(serde_json::from_value(doc)?)
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> anyhow::Result<Router> {
	let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
		.try_it_out_enabled(true)
		.with_credentials(true)
		.persist_authorization(true);

	let doc_json = Arc::new(serde_json::to_value(&doc)?);

	let json_route = {
		let doc_json = Arc::clone(&doc_json);
		get(move || {
			let doc_json = Arc::clone(&doc_json);
			async move { Json((*doc_json).clone()) }
		})
	};

	Ok(Router::new()
		.route("/api-docs/openapi.json", json_route)
		.merge(SwaggerUi::new("/docs").config(swagger_config)))
}

fn object_entry<'a>(map: &'a mut Map<String, Value>, key: &str) -> Option<&'a mut Map<String, Value>> {
	map.entry(key.to_string())
		.or_insert_with(|| Value::Object(Map::new()))
		.as_object_mut()
}

fn ensure_security_components(doc: &mut Value) {
	let Some(root) = doc.as_object_mut() else {
		return;
	};

	if let Some(schemes) = object_entry(root, "components").and_then(|c| object_entry(c, "securitySchemes")) {
		schemes.insert(
			"bearerAuth".to_string(),
			json!({
				"type": "http",
				"scheme": "bearer",
				"bearerFormat": "JWT"
			}),
		);
	}
}

fn ensure_servers(doc: &mut Value, port: u16) {
	let server_url = format!("http://localhost:{}", port);

	match doc.get_mut("servers") {
		Some(Value::Array(arr)) => {
			let has = arr.iter().any(|v| v.get("url").and_then(Value::as_str) == Some(server_url.as_str()));
			if !has {
				arr.push(json!({ "url": server_url }));
			}
		}
		_ => {
			doc["servers"] = json!([{ "url": server_url }]);
		}
	}
}
