// Drawer entity - identity plus the till makeup to leave behind at close
//
// DrawerSettings are owned by the CRUD collaborator. The core only reads them
// to find the TargetProfile a closing count is measured against.

use crate::denominations::{Denomination, DenominationCount};
use crate::error::CashError;
use crate::money::Money;
use serde::{Deserialize, Serialize};

// ============================================================================
// TARGET PROFILE
// ============================================================================

/// Standing cash level a drawer keeps after closing, per denomination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetProfile(DenominationCount);

impl TargetProfile {
    pub fn new(counts: DenominationCount) -> Self {
        TargetProfile(counts)
    }

    pub fn counts(&self) -> &DenominationCount {
        &self.0
    }

    pub fn get(&self, denomination: Denomination) -> u32 {
        self.0.get(denomination)
    }

    pub fn set(&mut self, denomination: Denomination, count: u32) {
        self.0.set(denomination, count);
    }

    /// Value of the till this profile leaves behind.
    pub fn total(&self) -> Result<Money, CashError> {
        self.0.total()
    }
}

impl From<DenominationCount> for TargetProfile {
    fn from(counts: DenominationCount) -> Self {
        TargetProfile(counts)
    }
}

// ============================================================================
// DRAWER SETTINGS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawerSettings {
    /// Stable identity, referenced by every count record of this drawer
    pub id: String,

    pub name: String,

    pub target: TargetProfile,

    /// Inactive drawers accept no new counts
    pub active: bool,

    /// Display hint for the UI: show per-denomination detail rows
    pub show_details: bool,
}

impl DrawerSettings {
    pub fn new(id: &str, name: &str, target: TargetProfile) -> Self {
        DrawerSettings {
            id: id.to_string(),
            name: name.to_string(),
            target,
            active: true,
            show_details: false,
        }
    }

    pub fn with_details(mut self, show_details: bool) -> Self {
        self.show_details = show_details;
        self
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }
}
