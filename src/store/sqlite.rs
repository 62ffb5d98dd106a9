use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::models::report::{DbDailyReport, NewReport};
use crate::models::user::{DbUser, NewUser};
use crate::models::{DailyReport, ReportStatus, User};

use super::{ReportStore, StoreError, StoreResult, UserStore};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, role, display_name, supervisor_id, is_active, created_at, updated_at";
const REPORT_COLUMNS: &str =
    "id, user_id, title, work_content, status, report_date, submitted_at, created_at, updated_at";

fn to_user(row: DbUser) -> StoreResult<User> {
    User::try_from(row).map_err(|err| StoreError::Corrupt(err.to_string()))
}

fn to_report(row: DbDailyReport) -> StoreResult<DailyReport> {
    DailyReport::try_from(row).map_err(|err| StoreError::Corrupt(err.to_string()))
}

/// Stays well below SQLite's bound-parameter limit, leaving room for the status bind.
const MAX_IDS_PER_QUERY: usize = 500;

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[derive(Debug, Clone)]
pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?");
        sqlx::query_as::<_, DbUser>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .map(to_user)
            .transpose()
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        sqlx::query_as::<_, DbUser>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(to_user)
            .transpose()
    }

    async fn find_by_supervisor_id(&self, supervisor_id: i64) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE supervisor_id = ? ORDER BY id ASC");
        sqlx::query_as::<_, DbUser>(&sql)
            .bind(supervisor_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(to_user)
            .collect()
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id ASC");
        sqlx::query_as::<_, DbUser>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(to_user)
            .collect()
    }

    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let id = sqlx::query(
            "INSERT INTO users (username, email, password_hash, role, display_name, supervisor_id, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.display_name)
        .bind(user.supervisor_id)
        .bind(user.is_active)
        .bind(user.timestamps.created_at)
        .bind(user.timestamps.updated_at)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(User {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            display_name: user.display_name,
            supervisor_id: user.supervisor_id,
            is_active: user.is_active,
            timestamps: user.timestamps,
        })
    }

    async fn update(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "UPDATE users SET username = ?, email = ?, password_hash = ?, role = ?, display_name = ?, supervisor_id = ?, is_active = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.display_name)
        .bind(user.supervisor_id)
        .bind(user.is_active)
        .bind(user.timestamps.updated_at)
        .bind(user.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let affected = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(affected.rows_affected() > 0)
    }
}

#[derive(Debug, Clone)]
pub struct SqliteReportStore {
    pool: SqlitePool,
}

impl SqliteReportStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportStore for SqliteReportStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<DailyReport>> {
        let sql = format!("SELECT {REPORT_COLUMNS} FROM daily_reports WHERE id = ?");
        sqlx::query_as::<_, DbDailyReport>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(to_report)
            .transpose()
    }

    async fn exists_for_user_and_date(&self, user_id: i64, date: NaiveDate) -> StoreResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM daily_reports WHERE user_id = ? AND report_date = ?")
            .bind(user_id)
            .bind(date)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    async fn find_by_user(&self, user_id: i64, status: Option<ReportStatus>) -> StoreResult<Vec<DailyReport>> {
        let status_clause = if status.is_some() { " AND status = ?" } else { "" };
        let sql = format!(
            "SELECT {REPORT_COLUMNS} FROM daily_reports WHERE user_id = ?{status_clause} ORDER BY report_date DESC, id DESC"
        );

        let mut query = sqlx::query_as::<_, DbDailyReport>(&sql).bind(user_id);
        if let Some(status) = status {
            query = query.bind(status.as_str());
        }

        query.fetch_all(&self.pool).await?.into_iter().map(to_report).collect()
    }

    async fn find_by_users(&self, user_ids: &[i64], status: Option<ReportStatus>) -> StoreResult<Vec<DailyReport>> {
        let status_clause = if status.is_some() { " AND status = ?" } else { "" };
        let mut reports = Vec::new();

        for chunk in user_ids.chunks(MAX_IDS_PER_QUERY) {
            let sql = format!(
                "SELECT {REPORT_COLUMNS} FROM daily_reports WHERE user_id IN ({}){status_clause}",
                placeholders(chunk.len())
            );

            let mut query = sqlx::query_as::<_, DbDailyReport>(&sql);
            for id in chunk {
                query = query.bind(*id);
            }
            if let Some(status) = status {
                query = query.bind(status.as_str());
            }

            for row in query.fetch_all(&self.pool).await? {
                reports.push(to_report(row)?);
            }
        }

        // chunks come back independently, so the final order is applied here
        reports.sort_by(|a, b| {
            b.report_date
                .cmp(&a.report_date)
                .then(a.user_id.cmp(&b.user_id))
                .then(a.id.cmp(&b.id))
        });
        Ok(reports)
    }

    async fn insert(&self, report: NewReport) -> StoreResult<DailyReport> {
        let id = sqlx::query(
            "INSERT INTO daily_reports (user_id, title, work_content, status, report_date, submitted_at, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(report.user_id)
        .bind(&report.title)
        .bind(&report.work_content)
        .bind(report.status.as_str())
        .bind(report.report_date)
        .bind(report.submitted_at)
        .bind(report.timestamps.created_at)
        .bind(report.timestamps.updated_at)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(DailyReport {
            id,
            user_id: report.user_id,
            title: report.title,
            work_content: report.work_content,
            status: report.status,
            report_date: report.report_date,
            submitted_at: report.submitted_at,
            timestamps: report.timestamps,
        })
    }

    async fn update(&self, report: &DailyReport) -> StoreResult<bool> {
        // user_id is immutable and absent from the SET list
        let affected = sqlx::query(
            "UPDATE daily_reports SET title = ?, work_content = ?, status = ?, report_date = ?, submitted_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&report.title)
        .bind(&report.work_content)
        .bind(report.status.as_str())
        .bind(report.report_date)
        .bind(report.submitted_at)
        .bind(report.timestamps.updated_at)
        .bind(report.id)
        .execute(&self.pool)
        .await?;

        Ok(affected.rows_affected() > 0)
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let affected = sqlx::query("DELETE FROM daily_reports WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(affected.rows_affected() > 0)
    }
}
