// Reconciliation Engine - ties a closing count back to its opening baseline
//
//   expected    = opening.total_cash + closing.sms_cash
//   actual      = closing.total_cash
//   discrepancy = actual - expected
//
// The baseline is the same drawer's latest opening at or before the closing
// timestamp (later write wins a tie). Every reconciliation runs against one
// fetched snapshot and never mutates a record, so re-running it on unchanged
// data gives the same verdict.

use crate::count::CountRecord;
use crate::error::{CashError, Result};
use crate::money::Money;
use crate::repository::{CountRepository, RecordFilter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ============================================================================
// VERDICT
// ============================================================================

/// Outcome for one closing record. The last two variants mean "cannot
/// reconcile yet" and are normal operating states, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DiscrepancyVerdict {
    Balanced,
    Over { amount: Money },
    Short { amount: Money },
    NoBaseline,
    InsufficientData,
}

impl DiscrepancyVerdict {
    /// Classify a signed discrepancy (actual - expected).
    pub fn classify(discrepancy: Money) -> Self {
        if discrepancy.is_zero() {
            DiscrepancyVerdict::Balanced
        } else if discrepancy.is_negative() {
            DiscrepancyVerdict::Short {
                amount: discrepancy.abs(),
            }
        } else {
            DiscrepancyVerdict::Over {
                amount: discrepancy.abs(),
            }
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            DiscrepancyVerdict::Balanced => "balanced",
            DiscrepancyVerdict::Over { .. } => "over",
            DiscrepancyVerdict::Short { .. } => "short",
            DiscrepancyVerdict::NoBaseline => "no_baseline",
            DiscrepancyVerdict::InsufficientData => "insufficient_data",
        }
    }

    /// Unsigned size of the discrepancy, only for over/short.
    pub fn amount(&self) -> Option<Money> {
        match self {
            DiscrepancyVerdict::Over { amount } | DiscrepancyVerdict::Short { amount } => {
                Some(*amount)
            }
            _ => None,
        }
    }

    /// Signed discrepancy when one could be computed.
    pub fn signed(&self) -> Option<Money> {
        match self {
            DiscrepancyVerdict::Balanced => Some(Money::ZERO),
            DiscrepancyVerdict::Over { amount } => Some(*amount),
            DiscrepancyVerdict::Short { amount } => Some(-*amount),
            _ => None,
        }
    }

    pub fn is_balanced(&self) -> bool {
        matches!(self, DiscrepancyVerdict::Balanced)
    }

    pub fn has_discrepancy(&self) -> bool {
        matches!(
            self,
            DiscrepancyVerdict::Over { .. } | DiscrepancyVerdict::Short { .. }
        )
    }

    pub fn is_reconciled(&self) -> bool {
        self.signed().is_some()
    }
}

// ============================================================================
// RECONCILIATION REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub closing_record_id: String,
    pub drawer_id: String,
    pub baseline_record_id: Option<String>,
    pub opening_total: Option<Money>,
    pub sms_cash: Option<Money>,
    pub expected: Option<Money>,
    pub actual: Money,
    pub verdict: DiscrepancyVerdict,
}

impl ReconciliationReport {
    pub fn is_balanced(&self) -> bool {
        self.verdict.is_balanced()
    }

    pub fn summary(&self) -> String {
        match (self.verdict, self.expected) {
            (DiscrepancyVerdict::NoBaseline, _) => format!(
                "Drawer {} closing {}: no opening count to reconcile against (counted {})",
                self.drawer_id, self.closing_record_id, self.actual
            ),
            (DiscrepancyVerdict::InsufficientData, _) => format!(
                "Drawer {} closing {}: side-channel cash not entered yet (counted {})",
                self.drawer_id, self.closing_record_id, self.actual
            ),
            (verdict, Some(expected)) => format!(
                "Drawer {} closing {}: expected {}, counted {} -> {}{}",
                self.drawer_id,
                self.closing_record_id,
                expected,
                self.actual,
                verdict.status(),
                verdict
                    .amount()
                    .map(|a| format!(" by {a}"))
                    .unwrap_or_default()
            ),
            (verdict, None) => format!(
                "Drawer {} closing {}: {}",
                self.drawer_id,
                self.closing_record_id,
                verdict.status()
            ),
        }
    }
}

/// "Latest opening vs latest closing" view of one drawer. A convenience for
/// dashboards; the per-record report inside is what counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawerSummary {
    pub drawer_id: String,
    pub latest_opening: Option<CountRecord>,
    pub latest_closing: Option<CountRecord>,
    pub latest_closing_report: Option<ReconciliationReport>,
}

// ============================================================================
// BASELINE SELECTION
// ============================================================================

/// Latest opening of `drawer_id` timestamped at or before `at`. On equal
/// timestamps the record written last (highest sequence) wins.
pub fn select_baseline<'a, I>(drawer_id: &str, at: DateTime<Utc>, history: I) -> Option<&'a CountRecord>
where
    I: IntoIterator<Item = &'a CountRecord>,
{
    history
        .into_iter()
        .filter(|r| r.drawer_id == drawer_id && r.is_opening() && r.timestamp <= at)
        .max_by_key(|r| (r.timestamp, r.sequence))
}

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct ReconciliationEngine;

impl ReconciliationEngine {
    pub fn new() -> Self {
        ReconciliationEngine
    }

    /// Verdict for `closing` against a snapshot of history.
    pub fn compute_discrepancy(
        &self,
        closing: &CountRecord,
        history: &[CountRecord],
    ) -> Result<DiscrepancyVerdict> {
        Ok(self.report(closing, history)?.verdict)
    }

    /// Full report for `closing` against a snapshot of history.
    pub fn report(&self, closing: &CountRecord, history: &[CountRecord]) -> Result<ReconciliationReport> {
        let baseline = select_baseline(&closing.drawer_id, closing.timestamp, history);
        self.build_report(closing, baseline)
    }

    /// Reconcile using the repository's indexed baseline lookup.
    pub fn reconcile<R: CountRepository + ?Sized>(
        &self,
        repo: &R,
        closing: &CountRecord,
    ) -> Result<ReconciliationReport> {
        ensure_closing(closing)?;
        let baseline = repo.latest_opening_at_or_before(&closing.drawer_id, closing.timestamp)?;
        self.build_report(closing, baseline.as_ref())
    }

    pub fn reconcile_record<R: CountRepository + ?Sized>(
        &self,
        repo: &R,
        record_id: &str,
    ) -> Result<ReconciliationReport> {
        let closing = repo.get_record(record_id)?;
        self.reconcile(repo, &closing)
    }

    /// Latest opening and closing of a drawer plus the latest closing's own
    /// reconciliation, all from one fetch.
    pub fn drawer_summary<R: CountRepository + ?Sized>(
        &self,
        repo: &R,
        drawer_id: &str,
    ) -> Result<DrawerSummary> {
        let history = repo.list_records(&RecordFilter::drawer(drawer_id))?;

        // history is newest first
        let latest_opening = history.iter().find(|r| r.is_opening()).cloned();
        let latest_closing = history.iter().find(|r| r.is_closing()).cloned();
        let latest_closing_report = latest_closing
            .as_ref()
            .map(|closing| self.report(closing, &history))
            .transpose()?;

        Ok(DrawerSummary {
            drawer_id: drawer_id.to_string(),
            latest_opening,
            latest_closing,
            latest_closing_report,
        })
    }

    fn build_report(
        &self,
        closing: &CountRecord,
        baseline: Option<&CountRecord>,
    ) -> Result<ReconciliationReport> {
        ensure_closing(closing)?;

        let mut report = ReconciliationReport {
            closing_record_id: closing.id.clone(),
            drawer_id: closing.drawer_id.clone(),
            baseline_record_id: baseline.map(|b| b.id.clone()),
            opening_total: baseline.map(|b| b.total_cash),
            sms_cash: closing.sms_cash,
            expected: None,
            actual: closing.total_cash,
            verdict: DiscrepancyVerdict::NoBaseline,
        };

        let Some(opening) = baseline else {
            debug!(drawer_id = %closing.drawer_id, record_id = %closing.id, "no opening baseline");
            return Ok(report);
        };

        let Some(sms_cash) = closing.sms_cash else {
            debug!(drawer_id = %closing.drawer_id, record_id = %closing.id, "side-channel cash not entered");
            report.verdict = DiscrepancyVerdict::InsufficientData;
            return Ok(report);
        };

        let expected = opening
            .total_cash
            .checked_add(sms_cash)
            .ok_or(CashError::Overflow("expected closing total"))?;
        let discrepancy = closing
            .total_cash
            .checked_sub(expected)
            .ok_or(CashError::Overflow("discrepancy"))?;

        report.expected = Some(expected);
        report.verdict = DiscrepancyVerdict::classify(discrepancy);

        if report.verdict.has_discrepancy() {
            warn!(
                drawer_id = %closing.drawer_id,
                record_id = %closing.id,
                baseline_id = %opening.id,
                expected = %expected,
                actual = %closing.total_cash,
                status = report.verdict.status(),
                "drawer does not balance"
            );
        } else {
            debug!(drawer_id = %closing.drawer_id, record_id = %closing.id, "drawer balanced");
        }

        Ok(report)
    }
}

fn ensure_closing(record: &CountRecord) -> Result<()> {
    if record.is_closing() {
        Ok(())
    } else {
        Err(CashError::NotAClosingRecord(record.id.clone()))
    }
}

/// Verdict for `closing` against a snapshot of history.
pub fn compute_discrepancy(closing: &CountRecord, history: &[CountRecord]) -> Result<DiscrepancyVerdict> {
    ReconciliationEngine::new().compute_discrepancy(closing, history)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::count::{CountSubmission, CountType};
    use crate::denominations::{Denomination, DenominationCount};
    use crate::entities::TargetProfile;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, hour, 0, 0).unwrap()
    }

    /// Record whose total is exactly `cents` (hundreds + pennies).
    fn record(
        drawer: &str,
        count_type: CountType,
        hour: u32,
        cents: u32,
        sms_cash: Option<i64>,
        sequence: u64,
    ) -> CountRecord {
        let counts = DenominationCount::ZERO
            .with(Denomination::Hundreds, cents / 10_000)
            .with(Denomination::Pennies, cents % 10_000);
        let mut submission = CountSubmission::new(drawer, count_type, counts).at(at(hour));
        submission.sms_cash = sms_cash.map(Money::from_cents);
        let mut record = CountRecord::from_submission(&submission, &TargetProfile::default()).unwrap();
        record.sequence = sequence;
        record
    }

    #[test]
    fn test_balanced() {
        let opening = record("front", CountType::Opening, 9, 30_000, None, 1);
        let closing = record("front", CountType::Closing, 18, 34_550, Some(4_550), 2);

        let verdict = compute_discrepancy(&closing, &[opening.clone(), closing.clone()]).unwrap();
        assert_eq!(verdict, DiscrepancyVerdict::Balanced);
        assert_eq!(verdict.amount(), None);
        assert_eq!(verdict.signed(), Some(Money::ZERO));
    }

    #[test]
    fn test_short() {
        let opening = record("front", CountType::Opening, 9, 30_000, None, 1);
        let closing = record("front", CountType::Closing, 18, 34_000, Some(4_550), 2);

        let report = ReconciliationEngine::new()
            .report(&closing, &[opening.clone()])
            .unwrap();
        assert_eq!(
            report.verdict,
            DiscrepancyVerdict::Short {
                amount: Money::from_cents(550)
            }
        );
        assert_eq!(report.expected, Some(Money::from_cents(34_550)));
        assert_eq!(report.baseline_record_id, Some(opening.id));
        assert!(report.summary().contains("short by $5.50"));
    }

    #[test]
    fn test_over() {
        let opening = record("front", CountType::Opening, 9, 30_000, None, 1);
        let closing = record("front", CountType::Closing, 18, 31_000, Some(0), 2);

        let verdict = compute_discrepancy(&closing, &[opening]).unwrap();
        assert_eq!(
            verdict,
            DiscrepancyVerdict::Over {
                amount: Money::from_cents(1_000)
            }
        );
        assert_eq!(verdict.signed(), Some(Money::from_cents(1_000)));
    }

    #[test]
    fn test_no_baseline() {
        let closing = record("X", CountType::Closing, 18, 10_000, Some(0), 1);
        let other_drawer = record("Y", CountType::Opening, 9, 10_000, None, 2);

        let report = ReconciliationEngine::new()
            .report(&closing, &[other_drawer])
            .unwrap();
        assert_eq!(report.verdict, DiscrepancyVerdict::NoBaseline);
        assert_eq!(report.verdict.amount(), None);
        assert_eq!(report.expected, None);
        assert!(!report.verdict.is_reconciled());
    }

    #[test]
    fn test_no_baseline_takes_precedence_over_missing_sms_cash() {
        let closing = record("X", CountType::Closing, 18, 10_000, None, 1);
        assert_eq!(
            compute_discrepancy(&closing, &[]).unwrap(),
            DiscrepancyVerdict::NoBaseline
        );
    }

    #[test]
    fn test_insufficient_data_when_sms_cash_absent() {
        let opening = record("front", CountType::Opening, 9, 30_000, None, 1);
        let closing = record("front", CountType::Closing, 18, 30_000, None, 2);

        let report = ReconciliationEngine::new().report(&closing, &[opening]).unwrap();
        assert_eq!(report.verdict, DiscrepancyVerdict::InsufficientData);
        assert!(report.baseline_record_id.is_some());
        assert!(report.summary().contains("not entered"));
    }

    #[test]
    fn test_zero_sms_cash_is_not_missing() {
        let opening = record("front", CountType::Opening, 9, 30_000, None, 1);
        let closing = record("front", CountType::Closing, 18, 30_000, Some(0), 2);
        assert_eq!(
            compute_discrepancy(&closing, &[opening]).unwrap(),
            DiscrepancyVerdict::Balanced
        );
    }

    #[test]
    fn test_selects_latest_opening_before_closing() {
        let early = record("front", CountType::Opening, 8, 20_000, None, 1);
        let late = record("front", CountType::Opening, 10, 30_000, None, 2);
        let after = record("front", CountType::Opening, 19, 90_000, None, 3);
        let closing = record("front", CountType::Closing, 18, 30_000, Some(0), 4);

        let history = vec![late.clone(), after, early, closing.clone()];
        let chosen = select_baseline("front", closing.timestamp, &history).unwrap();
        assert_eq!(chosen.id, late.id);
        assert!(compute_discrepancy(&closing, &history).unwrap().is_balanced());
    }

    #[test]
    fn test_opening_at_same_instant_counts() {
        let opening = record("front", CountType::Opening, 18, 30_000, None, 1);
        let closing = record("front", CountType::Closing, 18, 30_000, Some(0), 2);
        assert!(compute_discrepancy(&closing, &[opening]).unwrap().is_balanced());
    }

    #[test]
    fn test_timestamp_tie_goes_to_latest_write() {
        let first = record("front", CountType::Opening, 9, 20_000, None, 5);
        let rewritten = record("front", CountType::Opening, 9, 30_000, None, 9);
        let closing = record("front", CountType::Closing, 18, 30_000, Some(0), 10);

        let history = vec![rewritten.clone(), first];
        let chosen = select_baseline("front", closing.timestamp, &history).unwrap();
        assert_eq!(chosen.id, rewritten.id);
    }

    #[test]
    fn test_opening_record_is_rejected() {
        let opening = record("front", CountType::Opening, 9, 30_000, None, 1);
        let err = compute_discrepancy(&opening, &[]).unwrap_err();
        assert!(matches!(err, CashError::NotAClosingRecord(_)));
    }

    #[test]
    fn test_idempotent() {
        let opening = record("front", CountType::Opening, 9, 30_000, None, 1);
        let closing = record("front", CountType::Closing, 18, 34_000, Some(4_550), 2);
        let history = vec![opening, closing.clone()];
        let engine = ReconciliationEngine::new();

        let first = engine.report(&closing, &history).unwrap();
        let second = engine.report(&closing, &history).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_verdict_serialization() {
        let short = DiscrepancyVerdict::Short {
            amount: Money::from_cents(550),
        };
        assert_eq!(
            serde_json::to_value(short).unwrap(),
            serde_json::json!({"status": "short", "amount": "5.50"})
        );
        assert_eq!(
            serde_json::to_value(DiscrepancyVerdict::NoBaseline).unwrap(),
            serde_json::json!({"status": "no_baseline"})
        );
    }
}
