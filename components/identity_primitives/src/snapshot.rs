use crate::chassis::ChassisClass;
use crate::directory::DirectoryState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether the device is still inside its out-of-box enrollment window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProvisioningPhase {
    Normal,
    OutOfBoxExperience,
}

impl ProvisioningPhase {
    /// Placeholder account that owns the session during enrollment
    pub const PLACEHOLDER_ACCOUNT: &'static str = "defaultuser0";

    /// Derive the phase from the current interactive session user.
    ///
    /// Accepts both bare (`defaultuser0`) and qualified (`HOST\defaultuser0`)
    /// forms, case-insensitively. No session user means no enrollment session.
    pub fn from_session_user(user: Option<&str>) -> Self {
        let Some(user) = user else {
            return ProvisioningPhase::Normal;
        };

        let account = user.trim().rsplit('\\').next().unwrap_or_default();
        if account.eq_ignore_ascii_case(Self::PLACEHOLDER_ACCOUNT) {
            ProvisioningPhase::OutOfBoxExperience
        } else {
            ProvisioningPhase::Normal
        }
    }
}

impl fmt::Display for ProvisioningPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisioningPhase::Normal => write!(f, "normal"),
            ProvisioningPhase::OutOfBoxExperience => write!(f, "out-of-box experience"),
        }
    }
}

/// Facts about a device at one point in time.
///
/// Captured fresh at the start of every run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentitySnapshot {
    pub current_name: String,
    /// Vendor serial or asset tag as reported, possibly blank
    pub hardware_tag: Option<String>,
    pub chassis: ChassisClass,
    pub directory: DirectoryState,
    pub phase: ProvisioningPhase,
}
