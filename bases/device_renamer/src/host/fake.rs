//! Recording host for tests.
//!
//! Serves configured facts, records every mutation, and can be told to fail
//! any operation by method name. A rename updates the reported computer name,
//! the way a configured-name read does on a real host. The running name
//! follows immediately, as if the restart happened between runs, unless a
//! pending rename is configured.

use super::{ChassisInfo, CloudJoinEntry, DomainMembership, HostPlatform};
use crate::error::{RenamerError, Result};
use crate::scheduler::ScheduledTaskSpec;
use identity_primitives::CanonicalName;
use std::cell::RefCell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct FakeHost {
    pub name: RefCell<String>,
    pub active_name: Option<String>,
    pub hardware_tag: Option<String>,
    pub chassis: ChassisInfo,
    pub membership: DomainMembership,
    pub domain_reachable: bool,
    pub cloud_entries: Vec<CloudJoinEntry>,
    pub session_user: Option<String>,
    pub preexisting_tasks: Vec<String>,
    failing: HashSet<&'static str>,

    pub renames: RefCell<Vec<String>>,
    pub restarts: RefCell<Vec<(Duration, String)>>,
    pub tasks: RefCell<Vec<ScheduledTaskSpec>>,
    pub restricted: RefCell<Vec<PathBuf>>,
    pub probes: RefCell<Vec<String>>,
}

impl FakeHost {
    pub fn new(name: &str) -> Self {
        Self {
            name: RefCell::new(name.to_string()),
            ..Self::default()
        }
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.hardware_tag = Some(tag.to_string());
        self
    }

    pub fn with_chassis(mut self, chassis_types: &[u16], model: &str) -> Self {
        self.chassis = ChassisInfo {
            chassis_types: chassis_types.to_vec(),
            model: Some(model.to_string()),
        };
        self
    }

    pub fn on_premises(mut self, domain: &str, reachable: bool) -> Self {
        self.membership = DomainMembership {
            part_of_domain: true,
            domain: Some(domain.to_string()),
        };
        self.domain_reachable = reachable;
        self
    }

    pub fn with_cloud_entry(mut self, key: &str, tenant_id: Option<&str>) -> Self {
        self.cloud_entries.push(CloudJoinEntry {
            key: key.to_string(),
            tenant_id: tenant_id.map(str::to_string),
        });
        self
    }

    pub fn with_session_user(mut self, user: &str) -> Self {
        self.session_user = Some(user.to_string());
        self
    }

    /// The device still runs as `active` until it restarts
    pub fn with_pending_rename(mut self, active: &str) -> Self {
        self.active_name = Some(active.to_string());
        self
    }

    pub fn with_task(mut self, name: &str) -> Self {
        self.preexisting_tasks.push(name.to_string());
        self
    }

    /// Make the named `HostPlatform` method return an error
    pub fn failing(mut self, operation: &'static str) -> Self {
        self.failing.insert(operation);
        self
    }

    /// Undo `failing` for a later run
    pub fn recover(&mut self, operation: &str) {
        self.failing.remove(operation);
    }

    pub fn current_name(&self) -> String {
        self.name.borrow().clone()
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        if self.failing.contains(operation) {
            Err(RenamerError::CommandExitCode {
                command: operation.to_string(),
                stderr: "injected failure".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

impl HostPlatform for FakeHost {
    async fn computer_name(&self) -> Result<String> {
        self.check("computer_name")?;
        Ok(self.current_name())
    }

    async fn active_computer_name(&self) -> Result<String> {
        self.check("active_computer_name")?;
        Ok(self.active_name.clone().unwrap_or_else(|| self.current_name()))
    }

    async fn hardware_tag(&self) -> Result<Option<String>> {
        self.check("hardware_tag")?;
        Ok(self.hardware_tag.clone())
    }

    async fn chassis(&self) -> Result<ChassisInfo> {
        self.check("chassis")?;
        Ok(self.chassis.clone())
    }

    async fn domain_membership(&self) -> Result<DomainMembership> {
        self.check("domain_membership")?;
        Ok(self.membership.clone())
    }

    async fn probe_domain(&self, domain: &str) -> Result<bool> {
        self.probes.borrow_mut().push(domain.to_string());
        self.check("probe_domain")?;
        Ok(self.domain_reachable)
    }

    async fn cloud_join_entries(&self) -> Result<Vec<CloudJoinEntry>> {
        self.check("cloud_join_entries")?;
        Ok(self.cloud_entries.clone())
    }

    async fn session_user(&self) -> Result<Option<String>> {
        self.check("session_user")?;
        Ok(self.session_user.clone())
    }

    async fn rename_computer(&self, name: &CanonicalName) -> Result<()> {
        self.check("rename_computer")?;
        self.renames.borrow_mut().push(name.to_string());
        *self.name.borrow_mut() = name.to_string();
        Ok(())
    }

    async fn schedule_restart(&self, grace: Duration, message: &str) -> Result<()> {
        self.check("schedule_restart")?;
        self.restarts
            .borrow_mut()
            .push((grace, message.to_string()));
        Ok(())
    }

    async fn task_exists(&self, name: &str) -> Result<bool> {
        self.check("task_exists")?;
        Ok(self.preexisting_tasks.iter().any(|t| t == name)
            || self.tasks.borrow().iter().any(|t| t.name == name))
    }

    async fn register_task(&self, spec: &ScheduledTaskSpec) -> Result<()> {
        self.check("register_task")?;
        self.tasks.borrow_mut().push(spec.clone());
        Ok(())
    }

    async fn restrict_directory(&self, dir: &Path) -> Result<()> {
        self.check("restrict_directory")?;
        self.restricted.borrow_mut().push(dir.to_path_buf());
        Ok(())
    }
}
