//! Host management interface
//!
//! `HostPlatform` is the seam between the pipeline and the operating system:
//! one method per raw inventory, directory, rename or task-scheduler call.
//! `PowerShellHost` is the production implementation; tests drive the
//! pipeline through `FakeHost`.

use crate::error::Result;
use crate::scheduler::ScheduledTaskSpec;
use identity_primitives::CanonicalName;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

mod powershell;
pub use powershell::PowerShellHost;

#[cfg(test)]
pub mod fake;

/// Raw enclosure facts used to classify the form factor
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChassisInfo {
    #[serde(default)]
    pub chassis_types: Vec<u16>,
    pub model: Option<String>,
}

/// On-premises domain membership as reported by the host
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DomainMembership {
    pub part_of_domain: bool,
    pub domain: Option<String>,
}

/// One registration under the cloud-join store
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CloudJoinEntry {
    pub key: String,
    pub tenant_id: Option<String>,
}

pub trait HostPlatform {
    /// Configured computer name, including a rename pending reboot
    async fn computer_name(&self) -> Result<String>;

    /// Name the device is running under until its next restart
    async fn active_computer_name(&self) -> Result<String>;

    /// Vendor serial number or asset tag
    async fn hardware_tag(&self) -> Result<Option<String>>;

    async fn chassis(&self) -> Result<ChassisInfo>;

    async fn domain_membership(&self) -> Result<DomainMembership>;

    /// Cheap root-directory lookup against the domain
    async fn probe_domain(&self, domain: &str) -> Result<bool>;

    async fn cloud_join_entries(&self) -> Result<Vec<CloudJoinEntry>>;

    /// Account owning the interactive session, if any
    async fn session_user(&self) -> Result<Option<String>>;

    async fn rename_computer(&self, name: &CanonicalName) -> Result<()>;

    /// Force a restart after `grace`, showing `message` to the user
    async fn schedule_restart(&self, grace: Duration, message: &str) -> Result<()>;

    async fn task_exists(&self, name: &str) -> Result<bool>;

    async fn register_task(&self, spec: &ScheduledTaskSpec) -> Result<()>;

    /// Limit a directory to the system account and administrators
    async fn restrict_directory(&self, dir: &Path) -> Result<()>;
}
