use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use crate::authz::PermissionEvaluator;
use crate::clock::Clock;
use crate::errors::{AppError, AppResult};
use crate::models::report::{
    DailyReportListItem, DailyReportRequest, DailyReportResponse, NewReport, StatusFilter,
};
use crate::models::{DailyReport, User};
use crate::store::{ReportStore, StoreError, UserStore};

/// Outcome of a guarded report lookup.
///
/// Callers facing the network collapse `NotFound` and `Forbidden` into the same response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportAccess<T> {
    Granted(T),
    NotFound,
    Forbidden,
}

impl<T> ReportAccess<T> {
    pub fn into_result(self, report_id: i64) -> AppResult<T> {
        match self {
            ReportAccess::Granted(value) => Ok(value),
            ReportAccess::NotFound => Err(AppError::ReportNotFound(report_id)),
            ReportAccess::Forbidden => Err(AppError::PermissionDenied(report_id)),
        }
    }
}

fn duplicate_or(err: StoreError, user_id: i64, date: NaiveDate) -> AppError {
    match err {
        StoreError::UniqueViolation => AppError::DuplicateReport { user_id, date },
        other => other.into(),
    }
}

/// Report lifecycle: one report per user per day, draft/submitted transitions,
/// and owner/supervisor visibility.
#[derive(Clone)]
pub struct ReportService {
    reports: Arc<dyn ReportStore>,
    users: Arc<dyn UserStore>,
    policy: Arc<dyn PermissionEvaluator>,
    clock: Arc<dyn Clock>,
}

impl ReportService {
    pub fn new(
        reports: Arc<dyn ReportStore>,
        users: Arc<dyn UserStore>,
        policy: Arc<dyn PermissionEvaluator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reports,
            users,
            policy,
            clock,
        }
    }

    #[instrument(name = "reports.create", skip(self, request))]
    pub async fn create(&self, actor_id: i64, request: &DailyReportRequest) -> AppResult<DailyReportResponse> {
        let input = request.validate()?;
        let date = input.report_date;

        if self.reports.exists_for_user_and_date(actor_id, date).await? {
            debug!(%date, "report already exists for date");
            return Err(AppError::DuplicateReport { user_id: actor_id, date });
        }

        let owner = self
            .users
            .find_by_id(actor_id)
            .await?
            .ok_or(AppError::UnknownUser(actor_id))?;

        // the existence check above can race; the unique index has the final word
        let report = self
            .reports
            .insert(NewReport::from_input(actor_id, input, self.clock.now()))
            .await
            .map_err(|err| duplicate_or(err, actor_id, date))?;

        info!(report_id = report.id, %date, status = %report.status, "report created");
        Ok(DailyReportResponse::new(&report, Some(&owner)))
    }

    #[instrument(name = "reports.update", skip(self, actor, request), fields(actor_id = actor.id))]
    pub async fn update(
        &self,
        report_id: i64,
        actor: &User,
        request: &DailyReportRequest,
    ) -> AppResult<DailyReportResponse> {
        let input = request.validate()?;
        let mut report = self.load_for_mutation(report_id, actor).await?.into_result(report_id)?;

        report.apply(&input, self.clock.now());
        let updated = self
            .reports
            .update(&report)
            .await
            .map_err(|err| duplicate_or(err, report.user_id, report.report_date))?;
        if !updated {
            warn!(report_id, "report vanished before the update landed");
            return Err(AppError::ReportNotFound(report_id));
        }

        info!(report_id, status = %report.status, "report updated");
        Ok(DailyReportResponse::new(&report, Some(actor)))
    }

    #[instrument(name = "reports.delete", skip(self, actor), fields(actor_id = actor.id))]
    pub async fn delete(&self, report_id: i64, actor: &User) -> AppResult<()> {
        let report = self.load_for_mutation(report_id, actor).await?.into_result(report_id)?;

        if !self.reports.delete(report.id).await? {
            return Err(AppError::ReportNotFound(report_id));
        }

        info!(report_id, "report deleted");
        Ok(())
    }

    /// Owner or direct supervisor only.
    #[instrument(name = "reports.get", skip(self, actor), fields(actor_id = actor.id))]
    pub async fn get_by_id(&self, report_id: i64, actor: &User) -> AppResult<ReportAccess<DailyReportResponse>> {
        let Some(report) = self.reports.find_by_id(report_id).await? else {
            return Ok(ReportAccess::NotFound);
        };

        let owner = if report.user_id == actor.id {
            Some(actor.clone())
        } else {
            self.users.find_by_id(report.user_id).await?
        };

        if !self.policy.can_access_report(actor, &report, owner.as_ref()) {
            return Ok(ReportAccess::Forbidden);
        }

        Ok(ReportAccess::Granted(DailyReportResponse::new(&report, owner.as_ref())))
    }

    #[instrument(name = "reports.list_mine", skip(self, actor), fields(actor_id = actor.id))]
    pub async fn list_mine(&self, actor: &User, status: Option<&str>) -> AppResult<Vec<DailyReportListItem>> {
        let status = match StatusFilter::parse(status) {
            StatusFilter::Any => None,
            StatusFilter::Only(status) => Some(status),
            StatusFilter::Unmatched => return Ok(Vec::new()),
        };
        let reports = self.reports.find_by_user(actor.id, status).await?;

        debug!(count = reports.len(), "listed own reports");
        Ok(reports
            .iter()
            .map(|report| DailyReportListItem::new(report, Some(actor)))
            .collect())
    }

    /// Reports of the supervisor's direct reports, newest date first, then owner id ascending.
    #[instrument(name = "reports.list_subordinates", skip(self, supervisor), fields(supervisor_id = supervisor.id))]
    pub async fn list_subordinates(
        &self,
        supervisor: &User,
        status: Option<&str>,
    ) -> AppResult<Vec<DailyReportListItem>> {
        let status = match StatusFilter::parse(status) {
            StatusFilter::Any => None,
            StatusFilter::Only(status) => Some(status),
            StatusFilter::Unmatched => return Ok(Vec::new()),
        };

        let subordinates = self.users.find_by_supervisor_id(supervisor.id).await?;
        if subordinates.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = subordinates.iter().map(|user| user.id).collect();
        let by_id: HashMap<i64, User> = subordinates.into_iter().map(|user| (user.id, user)).collect();
        let reports = self.reports.find_by_users(&ids, status).await?;

        debug!(subordinates = ids.len(), count = reports.len(), "listed subordinate reports");
        Ok(reports
            .iter()
            .map(|report| DailyReportListItem::new(report, by_id.get(&report.user_id)))
            .collect())
    }

    pub async fn has_today(&self, actor: &User) -> AppResult<bool> {
        let today = self.clock.today();
        Ok(self.reports.exists_for_user_and_date(actor.id, today).await?)
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    async fn load_for_mutation(&self, report_id: i64, actor: &User) -> AppResult<ReportAccess<DailyReport>> {
        let Some(report) = self.reports.find_by_id(report_id).await? else {
            return Ok(ReportAccess::NotFound);
        };

        if !self.policy.can_mutate_report(actor, &report) {
            warn!(report_id, owner_id = report.user_id, "mutation by non-owner refused");
            return Ok(ReportAccess::Forbidden);
        }

        Ok(ReportAccess::Granted(report))
    }
}
