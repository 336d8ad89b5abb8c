// Cash Drawer - Core Library
// Count tracking and end-of-shift reconciliation for cash registers.
// Exposes all modules for use in the CLI, the reporting server and tests.

pub mod error;
pub mod money;
pub mod denominations;
pub mod entities;       // Drawer settings and target profiles
pub mod cash_out;       // Cash-out policy and totals
pub mod count;          // Count submissions and records
pub mod repository;     // Persistence seam + in-memory store
pub mod db;             // SQLite store, audit events, count sheets
pub mod reconciliation;
pub mod service;
pub mod config;
pub mod logging;

// Re-export commonly used types
pub use error::{CashError, Result, ValidationError};
pub use money::Money;
pub use denominations::{total, Denomination, DenominationCount};
pub use entities::{DrawerSettings, TargetProfile};
pub use cash_out::{cash_out, compute_totals, CountTotals};
pub use count::{CountEdit, CountRecord, CountSubmission, CountType};
pub use repository::{CountRepository, InMemoryRepository, RecordFilter};
pub use db::{
    Event, SqliteRepository,
    setup_database, insert_event, get_events_for_entity,
    load_count_sheet, read_count_sheet,
};
pub use reconciliation::{
    compute_discrepancy, select_baseline,
    DiscrepancyVerdict, DrawerSummary, ReconciliationEngine, ReconciliationReport,
};
pub use service::CashDrawerService;
pub use config::AppConfig;
pub use logging::init_logging;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
