use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::report::NewReport;
use crate::models::user::NewUser;
use crate::models::{DailyReport, ReportStatus, User};

use super::{ReportStore, StoreError, StoreResult, UserStore};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Arena<T> {
    next_id: i64,
    rows: BTreeMap<i64, T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

impl<T> Arena<T> {
    fn allocate(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Users keyed by id, with the same uniqueness rules as the `users` table.
#[derive(Default)]
pub struct MemoryUserStore {
    arena: Mutex<Arena<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a user with a caller-chosen id.
    pub fn put(&self, user: User) {
        let mut arena = lock(&self.arena);
        arena.next_id = arena.next_id.max(user.id + 1);
        arena.rows.insert(user.id, user);
    }
}

fn clashes(existing: &User, username: &str, email: Option<&str>) -> bool {
    existing.username == username || (email.is_some() && existing.email.as_deref() == email)
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(lock(&self.arena).rows.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(lock(&self.arena).rows.get(&id).cloned())
    }

    async fn find_by_supervisor_id(&self, supervisor_id: i64) -> StoreResult<Vec<User>> {
        Ok(lock(&self.arena)
            .rows
            .values()
            .filter(|u| u.reports_to(supervisor_id))
            .cloned()
            .collect())
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        Ok(lock(&self.arena).rows.values().cloned().collect())
    }

    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let mut arena = lock(&self.arena);
        if arena.rows.values().any(|u| clashes(u, &user.username, user.email.as_deref())) {
            return Err(StoreError::UniqueViolation);
        }

        let id = arena.allocate();
        let stored = User {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            display_name: user.display_name,
            supervisor_id: user.supervisor_id,
            is_active: user.is_active,
            timestamps: user.timestamps,
        };
        arena.rows.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, user: &User) -> StoreResult<()> {
        let mut arena = lock(&self.arena);
        if arena
            .rows
            .values()
            .any(|u| u.id != user.id && clashes(u, &user.username, user.email.as_deref()))
        {
            return Err(StoreError::UniqueViolation);
        }
        if let Some(slot) = arena.rows.get_mut(&user.id) {
            *slot = user.clone();
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let mut arena = lock(&self.arena);
        let removed = arena.rows.remove(&id).is_some();
        if removed {
            for user in arena.rows.values_mut() {
                if user.supervisor_id == Some(id) {
                    user.supervisor_id = None;
                }
            }
        }
        Ok(removed)
    }
}

/// Reports keyed by id. Enforces `(user_id, report_date)` uniqueness under its lock
/// and counts every call it receives.
#[derive(Default)]
pub struct MemoryReportStore {
    arena: Mutex<Arena<DailyReport>>,
    queries: AtomicUsize,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store calls made so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        lock(&self.arena).rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn tick(&self) {
        self.queries.fetch_add(1, Ordering::SeqCst);
    }
}

fn matches_status(report: &DailyReport, status: Option<ReportStatus>) -> bool {
    status.map_or(true, |s| report.status == s)
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<DailyReport>> {
        self.tick();
        Ok(lock(&self.arena).rows.get(&id).cloned())
    }

    async fn exists_for_user_and_date(&self, user_id: i64, date: NaiveDate) -> StoreResult<bool> {
        self.tick();
        Ok(lock(&self.arena)
            .rows
            .values()
            .any(|r| r.user_id == user_id && r.report_date == date))
    }

    async fn find_by_user(&self, user_id: i64, status: Option<ReportStatus>) -> StoreResult<Vec<DailyReport>> {
        self.tick();
        let mut reports: Vec<DailyReport> = lock(&self.arena)
            .rows
            .values()
            .filter(|r| r.user_id == user_id && matches_status(r, status))
            .cloned()
            .collect();
        reports.sort_by(|a, b| b.report_date.cmp(&a.report_date).then(b.id.cmp(&a.id)));
        Ok(reports)
    }

    async fn find_by_users(&self, user_ids: &[i64], status: Option<ReportStatus>) -> StoreResult<Vec<DailyReport>> {
        self.tick();
        let mut reports: Vec<DailyReport> = lock(&self.arena)
            .rows
            .values()
            .filter(|r| user_ids.contains(&r.user_id) && matches_status(r, status))
            .cloned()
            .collect();
        reports.sort_by(|a, b| {
            b.report_date
                .cmp(&a.report_date)
                .then(a.user_id.cmp(&b.user_id))
                .then(a.id.cmp(&b.id))
        });
        Ok(reports)
    }

    async fn insert(&self, report: NewReport) -> StoreResult<DailyReport> {
        self.tick();
        let mut arena = lock(&self.arena);
        if arena
            .rows
            .values()
            .any(|r| r.user_id == report.user_id && r.report_date == report.report_date)
        {
            return Err(StoreError::UniqueViolation);
        }

        let id = arena.allocate();
        let stored = DailyReport {
            id,
            user_id: report.user_id,
            title: report.title,
            work_content: report.work_content,
            status: report.status,
            report_date: report.report_date,
            submitted_at: report.submitted_at,
            timestamps: report.timestamps,
        };
        arena.rows.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, report: &DailyReport) -> StoreResult<bool> {
        self.tick();
        let mut arena = lock(&self.arena);
        let Some(owner) = arena.rows.get(&report.id).map(|r| r.user_id) else {
            return Ok(false);
        };
        if arena
            .rows
            .values()
            .any(|r| r.id != report.id && r.user_id == owner && r.report_date == report.report_date)
        {
            return Err(StoreError::UniqueViolation);
        }

        let mut stored = report.clone();
        stored.user_id = owner;
        arena.rows.insert(report.id, stored);
        Ok(true)
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        self.tick();
        Ok(lock(&self.arena).rows.remove(&id).is_some())
    }
}
