// bases/device_renamer/src/directory.rs
//! Domain-join detection
//!
//! Directory state gates renames, so unlike hardware identity it is never
//! guessed: any query failure aborts the run.

use crate::error::{RenamerError, Result};
use crate::host::HostPlatform;
use identity_primitives::DirectoryState;
use tracing::{info, warn};

pub struct DomainJoinDetector<'a, H> {
    host: &'a H,
}

impl<'a, H: HostPlatform> DomainJoinDetector<'a, H> {
    pub fn new(host: &'a H) -> Self {
        Self { host }
    }

    pub async fn detect(&self) -> Result<DirectoryState> {
        let membership = self
            .host
            .domain_membership()
            .await
            .map_err(|e| RenamerError::DirectoryQuery(Box::new(e)))?;

        if membership.part_of_domain {
            let domain_name = membership
                .domain
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .ok_or_else(|| {
                    RenamerError::DirectoryQuery(Box::new(RenamerError::unexpected_output(
                        "read domain membership",
                        "joined to a domain without a domain name",
                    )))
                })?;
            return Ok(DirectoryState::OnPremises { domain_name });
        }

        let entries = self
            .host
            .cloud_join_entries()
            .await
            .map_err(|e| RenamerError::DirectoryQuery(Box::new(e)))?;

        let tenant = entries.into_iter().find_map(|entry| {
            match entry.tenant_id.map(|t| t.trim().to_string()) {
                Some(tenant_id) if !tenant_id.is_empty() => Some(tenant_id),
                _ => {
                    warn!("Cloud join entry {} has no tenant id, ignoring", entry.key);
                    None
                }
            }
        });

        Ok(match tenant {
            Some(tenant_id) => DirectoryState::Cloud { tenant_id },
            None => DirectoryState::Workgroup,
        })
    }

    /// Whether a rename is safe with respect to the directory.
    ///
    /// Only on-premises membership is probed; everything else is reachable
    /// by definition.
    pub async fn confirm_reachable(&self, state: &DirectoryState) -> Result<bool> {
        match state {
            DirectoryState::OnPremises { domain_name } => {
                let reachable = self.host.probe_domain(domain_name).await?;
                if reachable {
                    info!("Domain controller for {} is reachable", domain_name);
                }
                Ok(reachable)
            }
            DirectoryState::Cloud { .. } | DirectoryState::Workgroup => Ok(true),
        }
    }
}
