use std::sync::Arc;

use tracing::info;

use daydrop_db::Database;
use daydrop_db::queries::Inserted;
use daydrop_db::queries::drops as drop_store;
use daydrop_db::queries::reports as store;
use daydrop_types::models::{DbId, Report, ReportTarget};

use crate::error::{CoreError, CoreResult};
use crate::lookup::IdentityLookup;
use crate::policy;

/// Accepts reports, at most one live report per reporter and target.
/// What happens to a report afterwards is someone else's concern.
pub struct ReportLedger {
    db: Arc<Database>,
    identity: Arc<dyn IdentityLookup>,
}

impl ReportLedger {
    pub fn new(db: Arc<Database>, identity: Arc<dyn IdentityLookup>) -> Self {
        Self { db, identity }
    }

    pub fn report(
        &self,
        reporter_id: DbId,
        target: ReportTarget,
        target_id: DbId,
        reason: &str,
    ) -> CoreResult<Report> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(CoreError::Validation("a reason is required".to_string()));
        }

        if target == ReportTarget::User {
            if policy::is_self(reporter_id, target_id) {
                return Err(CoreError::Validation("cannot report yourself".to_string()));
            }
            if !self.identity.get_user(target_id)?.is_found() {
                return Err(CoreError::UserNotFound(target_id));
            }
        }

        let report = self.db.with_tx(|tx| {
            if target == ReportTarget::Drop && !drop_store::find_drop(tx, target_id)?.is_found() {
                return Err(CoreError::NotFound {
                    entity: "drop",
                    id: target_id,
                });
            }
            if store::find_report(tx, reporter_id, target, target_id)?.is_found() {
                return Err(CoreError::AlreadyReported(target.as_str()));
            }
            match store::insert_report(tx, reporter_id, target, target_id, reason)? {
                Inserted::Created(report) => Ok(report),
                Inserted::Duplicate => Err(CoreError::AlreadyReported(target.as_str())),
            }
        })?;

        info!(report_id = report.id, reporter_id, target_id, "Report filed against {}", target.as_str());
        Ok(report)
    }
}
