use serde::{Deserialize, Serialize};
use std::fmt;

/// Directory-service membership of a device.
///
/// On-premises and cloud join are mutually exclusive; on-premises wins when
/// the host reports both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DirectoryState {
    /// Not joined to any directory
    Workgroup,
    /// Joined to an on-premises domain
    OnPremises { domain_name: String },
    /// Registered with a cloud directory tenant
    Cloud { tenant_id: String },
}

impl DirectoryState {
    /// Only on-premises membership needs a reachable controller before a rename
    pub fn requires_reachability(&self) -> bool {
        matches!(self, DirectoryState::OnPremises { .. })
    }
}

impl fmt::Display for DirectoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryState::Workgroup => write!(f, "workgroup"),
            DirectoryState::OnPremises { domain_name } => {
                write!(f, "on-premises domain {domain_name}")
            }
            DirectoryState::Cloud { tenant_id } => write!(f, "cloud tenant {tenant_id}"),
        }
    }
}
