// Count Record - one opening or closing snapshot of a drawer
//
// A record is created once from a submission. Its derived fields (cash_out,
// total_cash, total_for_deposit) come from its own denominations and the
// drawer's target at the moment of writing, never from other records.
// Edits replace denominations and side-channel cash wholesale and re-derive.

use crate::cash_out::{compute_totals, CountTotals};
use crate::denominations::DenominationCount;
use crate::entities::TargetProfile;
use crate::error::{Result, ValidationError};
use crate::money::Money;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// COUNT TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountType {
    Opening,
    Closing,
}

impl CountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CountType::Opening => "opening",
            CountType::Closing => "closing",
        }
    }
}

impl fmt::Display for CountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for CountType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "opening" => Ok(CountType::Opening),
            "closing" => Ok(CountType::Closing),
            other => Err(ValidationError::UnknownCountType(other.to_string())),
        }
    }
}

// ============================================================================
// SUBMISSION (input)
// ============================================================================

/// What a cashier submits. Validated before anything is derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountSubmission {
    pub drawer_id: String,
    pub count_type: CountType,
    pub denominations: DenominationCount,

    /// Cash collected outside the drawer during the shift. `None` means
    /// "not entered yet", which is different from zero.
    #[serde(default)]
    pub sms_cash: Option<Money>,

    pub submitted_by: String,

    /// Defaults to the submission time
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl CountSubmission {
    pub fn new(drawer_id: &str, count_type: CountType, denominations: DenominationCount) -> Self {
        CountSubmission {
            drawer_id: drawer_id.to_string(),
            count_type,
            denominations,
            sms_cash: None,
            submitted_by: String::new(),
            timestamp: None,
        }
    }

    pub fn sms_cash(mut self, amount: Money) -> Self {
        self.sms_cash = Some(amount);
        self
    }

    pub fn by(mut self, user: &str) -> Self {
        self.submitted_by = user.to_string();
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_sms_cash(self.count_type, self.sms_cash)
    }
}

fn validate_sms_cash(count_type: CountType, sms_cash: Option<Money>) -> Result<(), ValidationError> {
    match (count_type, sms_cash) {
        (CountType::Opening, Some(_)) => Err(ValidationError::SmsCashOnOpening),
        (_, Some(amount)) if amount.is_negative() => Err(ValidationError::NegativeAmount {
            field: "sms_cash".to_string(),
            value: amount.to_decimal_string(),
        }),
        _ => Ok(()),
    }
}

/// Wholesale replacement of a record's counted values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountEdit {
    pub denominations: DenominationCount,
    #[serde(default)]
    pub sms_cash: Option<Money>,
}

// ============================================================================
// COUNT RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRecord {
    pub id: String,

    /// Reference to the drawer, not ownership
    pub drawer_id: String,

    pub count_type: CountType,
    pub denominations: DenominationCount,

    // Derived at creation (or wholesale edit)
    pub cash_out: DenominationCount,
    pub total_cash: Money,
    pub total_for_deposit: Money,

    #[serde(default)]
    pub sms_cash: Option<Money>,

    pub timestamp: DateTime<Utc>,
    pub submitted_by: String,

    /// Write order assigned by the repository; the later write wins a
    /// timestamp tie during baseline selection
    #[serde(default)]
    pub sequence: u64,

    /// SHA-256 over drawer, type, timestamp and counts. Catches a replay of
    /// the same submission carrying the same explicit timestamp (a retried API
    /// call, a re-imported sheet). Submissions stamped at receipt get distinct
    /// timestamps, so two fresh entries of identical counts both stand.
    pub submission_hash: String,
}

impl CountRecord {
    /// Build a record from a validated submission and the drawer's target.
    pub fn from_submission(submission: &CountSubmission, target: &TargetProfile) -> Result<Self> {
        submission.validate()?;

        let timestamp = submission
            .timestamp
            .unwrap_or_else(Utc::now)
            .trunc_subsecs(6);
        let totals = compute_totals(&submission.denominations, target, submission.count_type)?;

        let mut record = CountRecord {
            id: uuid::Uuid::new_v4().to_string(),
            drawer_id: submission.drawer_id.clone(),
            count_type: submission.count_type,
            denominations: submission.denominations,
            cash_out: totals.cash_out,
            total_cash: totals.total_cash,
            total_for_deposit: totals.total_for_deposit,
            sms_cash: submission.sms_cash,
            timestamp,
            submitted_by: submission.submitted_by.clone(),
            sequence: 0,
            submission_hash: String::new(),
        };
        record.submission_hash = record.compute_submission_hash();
        Ok(record)
    }

    /// Replace counted values and every derived field. Identity, drawer,
    /// type and timestamp stay.
    pub fn replaced_with(&self, edit: &CountEdit, target: &TargetProfile) -> Result<Self> {
        validate_sms_cash(self.count_type, edit.sms_cash)?;
        let totals = compute_totals(&edit.denominations, target, self.count_type)?;

        let mut next = self.clone();
        next.denominations = edit.denominations;
        next.sms_cash = edit.sms_cash;
        next.apply_totals(totals);
        next.submission_hash = next.compute_submission_hash();
        Ok(next)
    }

    fn apply_totals(&mut self, totals: CountTotals) {
        self.cash_out = totals.cash_out;
        self.total_cash = totals.total_cash;
        self.total_for_deposit = totals.total_for_deposit;
    }

    pub fn totals(&self) -> CountTotals {
        CountTotals {
            total_cash: self.total_cash,
            cash_out: self.cash_out,
            total_for_deposit: self.total_for_deposit,
        }
    }

    pub fn is_opening(&self) -> bool {
        self.count_type == CountType::Opening
    }

    pub fn is_closing(&self) -> bool {
        self.count_type == CountType::Closing
    }

    pub fn compute_submission_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.drawer_id.as_bytes());
        hasher.update(self.count_type.as_str().as_bytes());
        hasher.update(self.timestamp.timestamp_micros().to_le_bytes());
        for (_, count) in self.denominations.iter() {
            hasher.update(count.to_le_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}
