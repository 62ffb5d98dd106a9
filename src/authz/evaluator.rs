use crate::models::{DailyReport, User};

/// Policy evaluator for report-level access.
pub trait PermissionEvaluator: Send + Sync {
    /// `owner` is the user referenced by `report.user_id`, loaded by the caller.
    fn can_access_report(&self, actor: &User, report: &DailyReport, owner: Option<&User>) -> bool;

    fn can_mutate_report(&self, actor: &User, report: &DailyReport) -> bool;
}

/// Self plus direct supervisor, one level only.
///
/// Evaluation order for reads:
/// 1. owner -> allow
/// 2. owner's `supervisor_id` equals the actor -> allow
/// 3. deny
#[derive(Debug, Clone, Copy, Default)]
pub struct SupervisorPolicy;

impl SupervisorPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl PermissionEvaluator for SupervisorPolicy {
    fn can_access_report(&self, actor: &User, report: &DailyReport, owner: Option<&User>) -> bool {
        // 1. Owner
        if actor.id == report.user_id {
            return true;
        }

        // 2. Direct supervisor of the owner; a mismatched owner record is ignored
        let owner = owner.filter(|owner| owner.id == report.user_id);
        if owner.is_some_and(|owner| owner.reports_to(actor.id)) {
            tracing::debug!(
                actor_id = actor.id,
                report_id = report.id,
                "supervisor read access"
            );
            return true;
        }

        // 3. Deny
        tracing::debug!(
            actor_id = actor.id,
            report_id = report.id,
            owner_id = report.user_id,
            "report access denied"
        );
        false
    }

    fn can_mutate_report(&self, actor: &User, report: &DailyReport) -> bool {
        actor.id == report.user_id
    }
}
