// bases/device_renamer/src/executor.rs
//! Rename execution
//!
//! Applies the rename once and decides how the run ends. The rename itself
//! is never retried within a run; a later scheduled run that observes the
//! new name takes the no-op path.

use crate::error::RenamerError;
use crate::host::HostPlatform;
use identity_primitives::{CanonicalName, ProvisioningPhase};
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug)]
pub enum ExecutionResult {
    /// Renamed and a forced restart is scheduled
    Completed,
    /// Renamed during enrollment; the provisioning platform owns the reboot
    CompletedDeferredExitForProvisioning,
    Failed(RenamerError),
}

pub struct RenameExecutor<'a, H> {
    host: &'a H,
    restart_grace: Duration,
}

impl<'a, H: HostPlatform> RenameExecutor<'a, H> {
    pub fn new(host: &'a H, restart_grace: Duration) -> Self {
        Self {
            host,
            restart_grace,
        }
    }

    pub async fn apply(&self, name: &CanonicalName, phase: ProvisioningPhase) -> ExecutionResult {
        info!("Renaming computer to {}", name);
        if let Err(e) = self.host.rename_computer(name).await {
            error!("Rename to {} failed: {}", name, e);
            return ExecutionResult::Failed(RenamerError::RenameFailed {
                name: name.to_string(),
                source: Box::new(e),
            });
        }
        info!("Computer renamed to {}", name);

        self.restart(name.as_str(), phase).await
    }

    /// Finish a rename applied by an earlier run whose restart never got
    /// scheduled, leaving the device on its old name until the next reboot
    pub async fn resume_restart(&self, name: &str, phase: ProvisioningPhase) -> ExecutionResult {
        info!("Rename to {} is still waiting for a restart", name);
        self.restart(name, phase).await
    }

    async fn restart(&self, name: &str, phase: ProvisioningPhase) -> ExecutionResult {
        if phase == ProvisioningPhase::OutOfBoxExperience {
            warn!("Enrollment in progress, leaving the restart to the provisioning platform");
            return ExecutionResult::CompletedDeferredExitForProvisioning;
        }

        let message = restart_message(name, self.restart_grace);
        if let Err(e) = self.host.schedule_restart(self.restart_grace, &message).await {
            error!("Could not schedule restart: {}", e);
            return ExecutionResult::Failed(RenamerError::RestartFailed {
                name: name.to_string(),
                source: Box::new(e),
            });
        }
        info!("Restart scheduled in {} seconds", self.restart_grace.as_secs());

        ExecutionResult::Completed
    }
}

fn restart_message(name: &str, grace: Duration) -> String {
    let minutes = grace.as_secs().div_ceil(60);
    format!(
        "This computer has been renamed to {name} and will restart in {minutes} minute(s). \
         Please save your work."
    )
}
