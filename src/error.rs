// Error types for the cash-drawer core
//
// Hard failures only. "Cannot reconcile yet" states (no baseline, no declared
// side-channel cash) are verdicts, see `reconciliation::DiscrepancyVerdict`.

use thiserror::Error;

// ============================================================================
// VALIDATION ERRORS
// ============================================================================

/// Input rejected before any calculation runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("[denominations] {key}: count must not be negative, got {value}")]
    NegativeCount { key: String, value: i64 },

    #[error("[denominations] {0}: unknown denomination")]
    UnknownDenomination(String),

    #[error("[denominations] {0}: given more than once")]
    DuplicateDenomination(String),

    #[error("[{field}] expected a whole number, got {value:?}")]
    NonNumeric { field: String, value: String },

    #[error("[amount] invalid amount: {0:?}")]
    InvalidAmount(String),

    #[error("[{field}] amount must not be negative, got {value}")]
    NegativeAmount { field: String, value: String },

    #[error("[sms_cash] side-channel cash is only recorded on closing counts")]
    SmsCashOnOpening,

    #[error("[count_type] unknown count type {0:?}, expected opening or closing")]
    UnknownCountType(String),
}

// ============================================================================
// CRATE ERROR
// ============================================================================

#[derive(Debug, Error)]
pub enum CashError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("drawer {0} is inactive")]
    InactiveDrawer(String),

    #[error("record {0} is not a closing count")]
    NotAClosingRecord(String),

    #[error("duplicate submission for drawer {drawer_id} (hash {hash})")]
    DuplicateSubmission { drawer_id: String, hash: String },

    #[error("amount overflow while summing {0}")]
    Overflow(&'static str),

    #[error(transparent)]
    Storage(#[from] rusqlite::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl CashError {
    pub fn record_not_found(id: &str) -> Self {
        CashError::NotFound {
            entity: "count record",
            id: id.to_string(),
        }
    }

    pub fn drawer_not_found(id: &str) -> Self {
        CashError::NotFound {
            entity: "drawer",
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CashError::NotFound { .. })
    }
}

pub type Result<T, E = CashError> = std::result::Result<T, E>;
