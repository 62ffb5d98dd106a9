use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::errors::{AppError, AppResult};
use crate::models::{Timestamps, User};

pub const TITLE_MAX_CHARS: usize = 200;
pub const CONTENT_MIN_CHARS: usize = 10;
pub const CONTENT_MAX_CHARS: usize = 1000;
pub const PREVIEW_CHARS: usize = 100;
const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Draft,
    Submitted,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Draft => "draft",
            ReportStatus::Submitted => "submitted",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(ReportStatus::Draft),
            "submitted" => Ok(ReportStatus::Submitted),
            other => Err(AppError::validation(format!("unknown report status '{other}'"))),
        }
    }
}

/// Status filter of a list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Any,
    Only(ReportStatus),
    /// Names no known status, so no report can match.
    Unmatched,
}

impl StatusFilter {
    /// Blank means no filter.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => StatusFilter::Any,
            Some(value) => value
                .parse::<ReportStatus>()
                .map(StatusFilter::Only)
                .unwrap_or(StatusFilter::Unmatched),
        }
    }
}

/// One user's report for one calendar day.
///
/// `submitted_at` is set exactly when `status` is `Submitted`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyReport {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub work_content: String,
    pub status: ReportStatus,
    pub report_date: NaiveDate,
    pub submitted_at: Option<DateTime<Utc>>,
    pub timestamps: Timestamps,
}

impl DailyReport {
    /// Moves the report to `status`.
    ///
    /// Entering `Submitted` stamps `submitted_at` unless it is already stamped;
    /// entering `Draft` always clears it.
    pub fn transition(&mut self, status: ReportStatus, now: DateTime<Utc>) {
        self.status = status;
        match status {
            ReportStatus::Submitted => {
                if self.submitted_at.is_none() {
                    self.submitted_at = Some(now);
                }
            }
            ReportStatus::Draft => self.submitted_at = None,
        }
    }

    pub fn is_consistent(&self) -> bool {
        (self.status == ReportStatus::Submitted) == self.submitted_at.is_some()
    }

    /// Overwrites the editable fields from an already validated request.
    pub fn apply(&mut self, input: &ReportInput, now: DateTime<Utc>) {
        self.title = input.title.clone();
        self.work_content = input.work_content.clone();
        self.report_date = input.report_date;
        self.transition(input.status, now);
        self.timestamps = self.timestamps.touched(now);
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbDailyReport {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub work_content: String,
    pub status: String,
    pub report_date: NaiveDate,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbDailyReport> for DailyReport {
    type Error = AppError;

    fn try_from(value: DbDailyReport) -> Result<Self, Self::Error> {
        let status = value
            .status
            .parse::<ReportStatus>()
            .map_err(|_| AppError::internal(format!("report {} has unknown status '{}'", value.id, value.status)))?;

        Ok(DailyReport {
            id: value.id,
            user_id: value.user_id,
            title: value.title,
            work_content: value.work_content,
            status,
            report_date: value.report_date,
            submitted_at: value.submitted_at,
            timestamps: Timestamps {
                created_at: value.created_at,
                updated_at: value.updated_at,
            },
        })
    }
}

/// Insert payload; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub user_id: i64,
    pub title: String,
    pub work_content: String,
    pub status: ReportStatus,
    pub report_date: NaiveDate,
    pub submitted_at: Option<DateTime<Utc>>,
    pub timestamps: Timestamps,
}

impl NewReport {
    pub fn from_input(user_id: i64, input: ReportInput, now: DateTime<Utc>) -> Self {
        let submitted_at = match input.status {
            ReportStatus::Submitted => Some(now),
            ReportStatus::Draft => None,
        };

        Self {
            user_id,
            title: input.title,
            work_content: input.work_content,
            status: input.status,
            report_date: input.report_date,
            submitted_at,
            timestamps: Timestamps::new(now),
        }
    }
}

/// Body of create and update calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DailyReportRequest {
    #[serde(default)]
    #[schema(example = "Sprint review prep")]
    pub title: String,
    #[serde(default)]
    #[schema(example = "Wrote the release notes and reviewed two pull requests.")]
    pub work_content: String,
    #[schema(example = "2024-01-15")]
    pub report_date: Option<NaiveDate>,
    pub status: Option<ReportStatus>,
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportInput {
    pub title: String,
    pub work_content: String,
    pub report_date: NaiveDate,
    pub status: ReportStatus,
}

impl DailyReportRequest {
    pub fn validate(&self) -> AppResult<ReportInput> {
        if self.title.trim().is_empty() {
            return Err(AppError::validation("title is required"));
        }
        if self.title.chars().count() > TITLE_MAX_CHARS {
            return Err(AppError::validation(format!(
                "title must be at most {TITLE_MAX_CHARS} characters"
            )));
        }

        if self.work_content.trim().is_empty() {
            return Err(AppError::validation("work content is required"));
        }
        let content_len = self.work_content.chars().count();
        if !(CONTENT_MIN_CHARS..=CONTENT_MAX_CHARS).contains(&content_len) {
            return Err(AppError::validation(format!(
                "work content must be between {CONTENT_MIN_CHARS} and {CONTENT_MAX_CHARS} characters"
            )));
        }

        let report_date = self
            .report_date
            .ok_or_else(|| AppError::validation("report date is required"))?;
        let status = self.status.ok_or_else(|| AppError::validation("status is required"))?;

        Ok(ReportInput {
            title: self.title.clone(),
            work_content: self.work_content.clone(),
            report_date,
            status,
        })
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusQuery {
    /// `draft` or `submitted`; blank lists everything.
    pub status: Option<String>,
}

/// Full report joined with its owner's display fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DailyReportResponse {
    pub id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub title: String,
    pub work_content: String,
    pub status: ReportStatus,
    pub report_date: NaiveDate,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DailyReportResponse {
    pub fn new(report: &DailyReport, owner: Option<&User>) -> Self {
        Self {
            id: report.id,
            user_id: report.user_id,
            username: owner.map(|u| u.username.clone()),
            display_name: owner.and_then(|u| u.display_name.clone()),
            title: report.title.clone(),
            work_content: report.work_content.clone(),
            status: report.status,
            report_date: report.report_date,
            submitted_at: report.submitted_at,
            created_at: report.timestamps.created_at,
            updated_at: report.timestamps.updated_at,
        }
    }
}

/// List row with the work content cut down to a preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DailyReportListItem {
    pub id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub title: String,
    pub work_content_preview: String,
    pub status: ReportStatus,
    pub report_date: NaiveDate,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DailyReportListItem {
    pub fn new(report: &DailyReport, owner: Option<&User>) -> Self {
        Self {
            id: report.id,
            user_id: report.user_id,
            username: owner.map(|u| u.username.clone()),
            display_name: owner.and_then(|u| u.display_name.clone()),
            title: report.title.clone(),
            work_content_preview: preview(&report.work_content),
            status: report.status,
            report_date: report.report_date,
            submitted_at: report.submitted_at,
            created_at: report.timestamps.created_at,
        }
    }
}

/// First `PREVIEW_CHARS` characters, with an ellipsis when something was cut.
pub fn preview(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}{}", &content[..cut], ELLIPSIS),
        None => content.to_string(),
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TodayReportStatus {
    pub date: NaiveDate,
    pub exists: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn request() -> DailyReportRequest {
        DailyReportRequest {
            title: "Daily".into(),
            work_content: "Did a lot of useful work".into(),
            report_date: NaiveDate::from_ymd_opt(2024, 1, 15),
            status: Some(ReportStatus::Draft),
        }
    }

    fn report(status: ReportStatus, submitted_at: Option<DateTime<Utc>>) -> DailyReport {
        let now = Utc::now();
        DailyReport {
            id: 1,
            user_id: 4,
            title: "t".into(),
            work_content: "c".repeat(20),
            status,
            report_date: now.date_naive(),
            submitted_at,
            timestamps: Timestamps::new(now),
        }
    }

    #[test]
    fn preview_passes_short_content_through() {
        let exact = "a".repeat(PREVIEW_CHARS);
        assert_eq!(preview(&exact), exact);
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn preview_cuts_on_characters_not_bytes() {
        let long = "日".repeat(PREVIEW_CHARS + 1);
        let cut = preview(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), PREVIEW_CHARS + 3);
        assert!(cut.starts_with(&"日".repeat(PREVIEW_CHARS)));
    }

    #[test]
    fn submit_keeps_an_existing_timestamp() {
        let first = Utc::now() - Duration::hours(3);
        let mut r = report(ReportStatus::Submitted, Some(first));
        r.transition(ReportStatus::Submitted, Utc::now());
        assert_eq!(r.submitted_at, Some(first));
        assert!(r.is_consistent());
    }

    #[test]
    fn draft_clears_timestamp_idempotently() {
        let mut r = report(ReportStatus::Submitted, Some(Utc::now()));
        r.transition(ReportStatus::Draft, Utc::now());
        assert_eq!(r.submitted_at, None);
        r.transition(ReportStatus::Draft, Utc::now());
        assert_eq!(r.submitted_at, None);
        assert!(r.is_consistent());
    }

    #[test]
    fn new_report_stamps_submission_only_when_submitted() {
        let now = Utc::now();
        let draft = NewReport::from_input(4, request().validate().unwrap(), now);
        assert_eq!(draft.submitted_at, None);

        let mut req = request();
        req.status = Some(ReportStatus::Submitted);
        let submitted = NewReport::from_input(4, req.validate().unwrap(), now);
        assert_eq!(submitted.submitted_at, Some(now));
    }

    #[test]
    fn validation_rejects_bad_input() {
        let cases: Vec<Box<dyn Fn(&mut DailyReportRequest)>> = vec![
            Box::new(|r| r.title = "   ".into()),
            Box::new(|r| r.title = "x".repeat(TITLE_MAX_CHARS + 1)),
            Box::new(|r| r.work_content = "too short".into()),
            Box::new(|r| r.work_content = "x".repeat(CONTENT_MAX_CHARS + 1)),
            Box::new(|r| r.report_date = None),
            Box::new(|r| r.status = None),
        ];

        for mutate in cases {
            let mut req = request();
            mutate(&mut req);
            assert!(matches!(req.validate(), Err(AppError::Validation(_))), "accepted {:?}", req);
        }
    }

    #[test]
    fn status_filter_treats_blank_as_absent() {
        assert_eq!(StatusFilter::parse(None), StatusFilter::Any);
        assert_eq!(StatusFilter::parse(Some("  ")), StatusFilter::Any);
        assert_eq!(StatusFilter::parse(Some("submitted")), StatusFilter::Only(ReportStatus::Submitted));
        assert_eq!(StatusFilter::parse(Some("archived")), StatusFilter::Unmatched);
    }

    #[test]
    fn validated_text_is_kept_as_sent() {
        let mut req = request();
        req.title = "  Daily  ".into();
        req.work_content = "  Did a lot of useful work  ".into();

        let input = req.validate().unwrap();
        assert_eq!(input.title, "  Daily  ");
        assert_eq!(input.work_content, "  Did a lot of useful work  ");
    }
}
