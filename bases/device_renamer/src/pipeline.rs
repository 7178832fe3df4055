// bases/device_renamer/src/pipeline.rs
//! Identity reconciliation pipeline
//!
//! One run, in order:
//! 1. read the current name and apply the prefix filter
//! 2. capture the rest of the snapshot (hardware, directory, phase)
//! 3. gate on domain reachability for on-premises members
//! 4. build and validate the candidate, then decide
//! 5. apply the rename (apply mode only); a name already correct but still
//!    waiting for a restart gets that restart
//! 6. ensure the reconciliation task exists and save this run's settings
//!    for it (apply mode only), whatever happened in steps 1-5
//!
//! Every run starts cold; nothing is carried between runs except the device
//! state and the task registration, both read fresh.

use crate::config::Config;
use crate::directory::DomainJoinDetector;
use crate::error::{RenamerError, Result};
use crate::executor::{ExecutionResult, RenameExecutor};
use crate::hardware::{HardwareIdentity, HardwareIdentityResolver};
use crate::host::HostPlatform;
use crate::scheduler::{ScheduleStatus, SelfHealingScheduler};
use identity_primitives::{
    decide, DeviceIdentitySnapshot, DirectoryState, ProvisioningPhase, RenameDecision,
};
use std::path::Path;
use tracing::{error, info, warn};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
/// Restart required but deferred to the provisioning platform
pub const EXIT_RESTART_DEFERRED: i32 = 1641;

/// How the decision/execution stages of a run ended
#[derive(Debug)]
pub enum RunOutcome {
    /// Current name does not match the configured prefix
    SkippedPrefixMismatch,
    AlreadyCorrect,
    /// Dry run computed a rename without applying it
    WouldRename(RenameDecision),
    Renamed,
    RenamedDeferredForProvisioning,
    /// Name already correct, restart left over from an earlier run scheduled
    RestartResumed,
    Failed(RenamerError),
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::SkippedPrefixMismatch
            | RunOutcome::AlreadyCorrect
            | RunOutcome::WouldRename(_)
            | RunOutcome::Renamed
            | RunOutcome::RestartResumed => EXIT_SUCCESS,
            RunOutcome::RenamedDeferredForProvisioning => EXIT_RESTART_DEFERRED,
            RunOutcome::Failed(_) => EXIT_FAILURE,
        }
    }
}

impl From<ExecutionResult> for RunOutcome {
    fn from(result: ExecutionResult) -> Self {
        match result {
            ExecutionResult::Completed => RunOutcome::Renamed,
            ExecutionResult::CompletedDeferredExitForProvisioning => {
                RunOutcome::RenamedDeferredForProvisioning
            }
            ExecutionResult::Failed(e) => RunOutcome::Failed(e),
        }
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::SkippedPrefixMismatch => write!(f, "skipped, name prefix does not match"),
            RunOutcome::AlreadyCorrect => write!(f, "name already correct"),
            RunOutcome::WouldRename(decision) => write!(f, "test mode, would {decision}"),
            RunOutcome::Renamed => write!(f, "renamed, restart scheduled"),
            RunOutcome::RenamedDeferredForProvisioning => {
                write!(f, "renamed, restart deferred to provisioning")
            }
            RunOutcome::RestartResumed => write!(f, "name already correct, restart scheduled"),
            RunOutcome::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

/// Everything a run produced
#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// `None` when scheduling was skipped (test mode)
    pub schedule: Option<Result<ScheduleStatus>>,
}

impl RunReport {
    /// A scheduler failure fails an otherwise successful run, but never
    /// hides the provisioning signal or an earlier failure
    pub fn exit_code(&self) -> i32 {
        let code = self.outcome.exit_code();
        match &self.schedule {
            Some(Err(_)) if code == EXIT_SUCCESS => EXIT_FAILURE,
            _ => code,
        }
    }
}

pub struct Pipeline<'a, H> {
    host: &'a H,
    config: &'a Config,
}

impl<'a, H: HostPlatform> Pipeline<'a, H> {
    pub fn new(host: &'a H, config: &'a Config) -> Self {
        Self { host, config }
    }

    pub async fn run(&self, self_path: &Path) -> RunReport {
        let outcome = self.reconcile().await;
        match &outcome {
            RunOutcome::Failed(e) => error!("Reconciliation failed: {}", e),
            other => info!("Reconciliation result: {}", other),
        }

        let schedule = if self.config.is_dry_run() {
            info!("Test mode, not touching the scheduled task");
            None
        } else {
            let status = SelfHealingScheduler::new(self.host, &self.config.install_dir)
                .ensure_scheduled(self_path, &self.config.saved_settings())
                .await;
            match &status {
                Ok(status) => info!("Scheduled task: {}", status),
                Err(e) => error!("Scheduled task: {}", e),
            }
            Some(status)
        };

        RunReport { outcome, schedule }
    }

    async fn reconcile(&self) -> RunOutcome {
        match self.try_reconcile().await {
            Ok(outcome) => outcome,
            Err(e) => RunOutcome::Failed(e),
        }
    }

    async fn try_reconcile(&self) -> Result<RunOutcome> {
        let current_name = self.host.computer_name().await?;
        info!("Current computer name: {}", current_name);

        if !self.config.accepts_name(&current_name) {
            info!(
                "Name {} does not start with {:?}, nothing to do",
                current_name,
                self.config.name_prefix.as_deref().unwrap_or_default()
            );
            return Ok(RunOutcome::SkippedPrefixMismatch);
        }

        let resolved = HardwareIdentityResolver::new(self.host, self.config.naming)
            .resolve()
            .await;
        let snapshot = self.capture_snapshot(current_name, resolved.hardware).await?;

        let detector = DomainJoinDetector::new(self.host);
        if !detector.confirm_reachable(&snapshot.directory).await? {
            let domain = match &snapshot.directory {
                DirectoryState::OnPremises { domain_name } => domain_name.clone(),
                other => other.to_string(),
            };
            return Err(RenamerError::DomainUnreachable { domain });
        }

        let decision = decide(&snapshot.current_name, resolved.candidate);
        info!("Decision: {}", decision);

        match decision {
            RenameDecision::NoOpAlreadyCorrect => Ok(self.finish_pending_rename(&snapshot).await),
            RenameDecision::NoOpInvalidCandidate(reason) => {
                Err(RenamerError::InvalidCandidate(reason))
            }
            decision @ RenameDecision::ApplyRename(_) if self.config.is_dry_run() => {
                Ok(RunOutcome::WouldRename(decision))
            }
            RenameDecision::ApplyRename(name) => {
                let executor = RenameExecutor::new(self.host, self.config.restart_delay);
                Ok(executor.apply(&name, snapshot.phase).await.into())
            }
        }
    }

    /// A rename from an earlier run may still be waiting for its restart,
    /// e.g. when scheduling the restart failed
    async fn finish_pending_rename(&self, snapshot: &DeviceIdentitySnapshot) -> RunOutcome {
        if self.config.is_dry_run() {
            return RunOutcome::AlreadyCorrect;
        }

        let active = match self.host.active_computer_name().await {
            Ok(active) => active,
            Err(e) => {
                warn!("Could not read the running name, assuming no rename is pending: {}", e);
                return RunOutcome::AlreadyCorrect;
            }
        };
        if active.eq_ignore_ascii_case(&snapshot.current_name) {
            return RunOutcome::AlreadyCorrect;
        }

        info!("Device still runs as {}", active);
        let executor = RenameExecutor::new(self.host, self.config.restart_delay);
        match executor.resume_restart(&snapshot.current_name, snapshot.phase).await {
            ExecutionResult::Completed => RunOutcome::RestartResumed,
            other => other.into(),
        }
    }

    /// Read the rest of the device facts this run reasons about
    async fn capture_snapshot(
        &self,
        current_name: String,
        hardware: HardwareIdentity,
    ) -> Result<DeviceIdentitySnapshot> {
        let directory = DomainJoinDetector::new(self.host).detect().await?;
        info!("Directory membership: {}", directory);

        let phase = match self.host.session_user().await {
            Ok(user) => ProvisioningPhase::from_session_user(user.as_deref()),
            Err(e) => {
                warn!("Session user query failed, assuming normal phase: {}", e);
                ProvisioningPhase::Normal
            }
        };
        info!("Provisioning phase: {}", phase);

        Ok(DeviceIdentitySnapshot {
            current_name,
            hardware_tag: hardware.tag,
            chassis: hardware.chassis,
            directory,
            phase,
        })
    }
}
