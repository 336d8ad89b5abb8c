// Cash Drawer Service - write path for counts
//
// Owns a repository handle and the reconciliation engine. Every submission
// and edit looks up the drawer's current settings, so cash_out is always
// derived from the target in force at write time.

use crate::cash_out::{compute_totals, CountTotals};
use crate::count::{CountEdit, CountRecord, CountSubmission, CountType};
use crate::denominations::DenominationCount;
use crate::entities::DrawerSettings;
use crate::error::{CashError, Result};
use crate::reconciliation::{DrawerSummary, ReconciliationEngine, ReconciliationReport};
use crate::repository::{CountRepository, RecordFilter};
use tracing::{info, warn};

pub struct CashDrawerService<R: CountRepository> {
    repo: R,
    engine: ReconciliationEngine,
}

impl<R: CountRepository> CashDrawerService<R> {
    pub fn new(repo: R) -> Self {
        CashDrawerService {
            repo,
            engine: ReconciliationEngine::new(),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    // ------------------------------------------------------------------------
    // Drawers
    // ------------------------------------------------------------------------

    pub fn register_drawer(&self, settings: DrawerSettings) -> Result<DrawerSettings> {
        self.repo.save_drawer_settings(&settings)?;
        Ok(settings)
    }

    pub fn drawer(&self, drawer_id: &str) -> Result<DrawerSettings> {
        self.repo.get_drawer_settings(drawer_id)
    }

    pub fn drawers(&self) -> Result<Vec<DrawerSettings>> {
        self.repo.list_drawers()
    }

    fn active_drawer(&self, drawer_id: &str) -> Result<DrawerSettings> {
        let drawer = self.repo.get_drawer_settings(drawer_id)?;
        if !drawer.active {
            warn!(drawer_id, "count rejected for inactive drawer");
            return Err(CashError::InactiveDrawer(drawer_id.to_string()));
        }
        Ok(drawer)
    }

    // ------------------------------------------------------------------------
    // Counts
    // ------------------------------------------------------------------------

    /// Validate, derive and persist one count.
    pub fn submit_count(&self, submission: CountSubmission) -> Result<CountRecord> {
        let drawer = self.active_drawer(&submission.drawer_id)?;

        let record = CountRecord::from_submission(&submission, &drawer.target).map_err(|e| {
            warn!(drawer_id = %submission.drawer_id, error = %e, "submission rejected");
            e
        })?;

        let stored = self.repo.create_record(record)?;
        info!(
            record_id = %stored.id,
            drawer_id = %stored.drawer_id,
            count_type = %stored.count_type,
            total_cash = %stored.total_cash,
            total_for_deposit = %stored.total_for_deposit,
            "count submitted"
        );
        Ok(stored)
    }

    /// Replace a record's denominations and side-channel cash wholesale.
    pub fn edit_count(&self, record_id: &str, edit: CountEdit) -> Result<CountRecord> {
        let current = self.repo.get_record(record_id)?;
        let drawer = self.repo.get_drawer_settings(&current.drawer_id)?;

        let replacement = current.replaced_with(&edit, &drawer.target)?;
        let stored = self.repo.update_record(replacement)?;
        info!(
            record_id = %stored.id,
            drawer_id = %stored.drawer_id,
            total_cash = %stored.total_cash,
            "count edited"
        );
        Ok(stored)
    }

    pub fn delete_count(&self, record_id: &str) -> Result<()> {
        self.repo.delete_record(record_id)?;
        info!(record_id, "count deleted");
        Ok(())
    }

    pub fn get_count(&self, record_id: &str) -> Result<CountRecord> {
        self.repo.get_record(record_id)
    }

    pub fn list_counts(&self, filter: &RecordFilter) -> Result<Vec<CountRecord>> {
        self.repo.list_records(filter)
    }

    /// Totals for a count against the drawer's target, without saving.
    pub fn preview_totals(
        &self,
        drawer_id: &str,
        count_type: CountType,
        denominations: &DenominationCount,
    ) -> Result<CountTotals> {
        let drawer = self.repo.get_drawer_settings(drawer_id)?;
        compute_totals(denominations, &drawer.target, count_type)
    }

    // ------------------------------------------------------------------------
    // Reconciliation
    // ------------------------------------------------------------------------

    pub fn reconcile(&self, record_id: &str) -> Result<ReconciliationReport> {
        self.engine.reconcile_record(&self.repo, record_id)
    }

    pub fn drawer_summary(&self, drawer_id: &str) -> Result<DrawerSummary> {
        // Surface an unknown drawer as not-found instead of an empty summary.
        self.repo.get_drawer_settings(drawer_id)?;
        self.engine.drawer_summary(&self.repo, drawer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::denominations::Denomination;
    use crate::entities::TargetProfile;
    use crate::money::Money;
    use crate::reconciliation::DiscrepancyVerdict;
    use crate::repository::InMemoryRepository;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, hour, 0, 0).unwrap()
    }

    fn service() -> CashDrawerService<InMemoryRepository> {
        let service = CashDrawerService::new(InMemoryRepository::new());
        let target = TargetProfile::new(
            DenominationCount::ZERO
                .with(Denomination::Quarters, 40)
                .with(Denomination::Ones, 50),
        );
        service
            .register_drawer(DrawerSettings::new("front", "Front Counter", target))
            .unwrap();
        service
    }

    fn ones(n: u32) -> DenominationCount {
        DenominationCount::ZERO.with(Denomination::Ones, n)
    }

    #[test]
    fn test_submit_uses_drawer_target() {
        let service = service();
        let counts = DenominationCount::ZERO
            .with(Denomination::Quarters, 60)
            .with(Denomination::Ones, 50);
        let record = service
            .submit_count(CountSubmission::new("front", CountType::Closing, counts).at(at(18)))
            .unwrap();

        assert_eq!(record.cash_out.get(Denomination::Quarters), 20);
        assert_eq!(record.cash_out.get(Denomination::Ones), 0);
        assert_eq!(record.total_for_deposit, Money::from_cents(6_000));
        assert_eq!(service.get_count(&record.id).unwrap(), record);
    }

    #[test]
    fn test_unknown_and_inactive_drawers_rejected() {
        let service = service();
        let err = service
            .submit_count(CountSubmission::new("back", CountType::Opening, ones(1)))
            .unwrap_err();
        assert!(err.is_not_found());

        let mut drawer = service.drawer("front").unwrap();
        drawer.deactivate();
        service.register_drawer(drawer).unwrap();
        let err = service
            .submit_count(CountSubmission::new("front", CountType::Opening, ones(1)))
            .unwrap_err();
        assert!(matches!(err, CashError::InactiveDrawer(_)));
    }

    #[test]
    fn test_edit_then_reconcile() {
        let service = service();
        service
            .submit_count(CountSubmission::new("front", CountType::Opening, ones(300)).at(at(9)))
            .unwrap();
        let closing = service
            .submit_count(CountSubmission::new("front", CountType::Closing, ones(340)).at(at(18)))
            .unwrap();

        let report = service.reconcile(&closing.id).unwrap();
        assert_eq!(report.verdict, DiscrepancyVerdict::InsufficientData);

        service
            .edit_count(
                &closing.id,
                CountEdit {
                    denominations: ones(345),
                    sms_cash: Some(Money::from_cents(4_500)),
                },
            )
            .unwrap();
        let report = service.reconcile(&closing.id).unwrap();
        assert_eq!(report.verdict, DiscrepancyVerdict::Balanced);
    }

    #[test]
    fn test_edit_rederives_with_current_target() {
        let service = service();
        let record = service
            .submit_count(CountSubmission::new("front", CountType::Closing, ones(70)).at(at(18)))
            .unwrap();
        assert_eq!(record.cash_out.get(Denomination::Ones), 20);

        let mut drawer = service.drawer("front").unwrap();
        drawer.target.set(Denomination::Ones, 60);
        service.register_drawer(drawer).unwrap();

        let edited = service
            .edit_count(&record.id, CountEdit { denominations: ones(70), sms_cash: None })
            .unwrap();
        assert_eq!(edited.cash_out.get(Denomination::Ones), 10);
    }

    #[test]
    fn test_preview_does_not_persist() {
        let service = service();
        let totals = service
            .preview_totals("front", CountType::Closing, &ones(80))
            .unwrap();
        assert_eq!(totals.total_cash, Money::from_cents(8_000));
        assert_eq!(totals.total_for_deposit, Money::from_cents(5_000));
        assert!(service.list_counts(&RecordFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn test_delete_and_summary() {
        let service = service();
        let opening = service
            .submit_count(CountSubmission::new("front", CountType::Opening, ones(10)).at(at(9)))
            .unwrap();

        let summary = service.drawer_summary("front").unwrap();
        assert_eq!(summary.latest_opening.map(|r| r.id), Some(opening.id.clone()));
        assert!(summary.latest_closing_report.is_none());

        service.delete_count(&opening.id).unwrap();
        assert!(service.get_count(&opening.id).unwrap_err().is_not_found());
        assert!(service.drawer_summary("nope").unwrap_err().is_not_found());
    }
}
