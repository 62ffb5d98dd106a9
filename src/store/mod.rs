//! Persistence ports used by the services.
//!
//! The SQLite implementations back the running server; the in-memory ones
//! back unit tests and count the queries they receive.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::AppError;
use crate::models::report::NewReport;
use crate::models::user::NewUser;
use crate::models::{DailyReport, ReportStatus, User};

pub mod memory;
pub mod sqlite;

pub use memory::{MemoryReportStore, MemoryUserStore};
pub use sqlite::{SqliteReportStore, SqliteUserStore};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("unique constraint violated")]
    UniqueViolation,
    #[error("stored row is unreadable: {0}")]
    Corrupt(String),
    #[error("database error")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::UniqueViolation,
            _ => StoreError::Database(err),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation => AppError::conflict("unique constraint violated"),
            StoreError::Corrupt(message) => AppError::internal(message),
            StoreError::Database(err) => AppError::Database(err),
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>>;
    /// Direct reports only; never walks further down.
    async fn find_by_supervisor_id(&self, supervisor_id: i64) -> StoreResult<Vec<User>>;
    async fn list(&self) -> StoreResult<Vec<User>>;
    async fn insert(&self, user: NewUser) -> StoreResult<User>;
    async fn update(&self, user: &User) -> StoreResult<()>;
    /// Returns true if a row was deleted.
    async fn delete(&self, id: i64) -> StoreResult<bool>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<DailyReport>>;
    async fn exists_for_user_and_date(&self, user_id: i64, date: NaiveDate) -> StoreResult<bool>;
    /// Newest report date first.
    async fn find_by_user(&self, user_id: i64, status: Option<ReportStatus>) -> StoreResult<Vec<DailyReport>>;
    /// Newest report date first, ties broken by ascending owner id.
    async fn find_by_users(&self, user_ids: &[i64], status: Option<ReportStatus>) -> StoreResult<Vec<DailyReport>>;
    /// Fails with `UniqueViolation` if `(user_id, report_date)` is taken.
    async fn insert(&self, report: NewReport) -> StoreResult<DailyReport>;
    /// Returns false if the report no longer exists.
    async fn update(&self, report: &DailyReport) -> StoreResult<bool>;
    /// Returns true if a row was deleted.
    async fn delete(&self, id: i64) -> StoreResult<bool>;
}
