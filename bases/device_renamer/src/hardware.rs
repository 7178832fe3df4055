// bases/device_renamer/src/hardware.rs
//! Hardware identity resolution
//!
//! Inventory queries are unreliable on virtualized and OEM-modified systems,
//! so nothing here fails: a failed serial query counts as a missing serial
//! and a failed chassis query as unknown hardware.

use crate::host::HostPlatform;
use identity_primitives::{CanonicalName, ChassisClass, NameRejection, NamingScheme};
use tracing::{info, warn};

/// Hardware facts a name is derived from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareIdentity {
    pub tag: Option<String>,
    pub chassis: ChassisClass,
}

/// Hardware facts together with the name derived from them
#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    pub hardware: HardwareIdentity,
    pub candidate: Result<CanonicalName, NameRejection>,
}

pub struct HardwareIdentityResolver<'a, H> {
    host: &'a H,
    naming: NamingScheme,
}

impl<'a, H: HostPlatform> HardwareIdentityResolver<'a, H> {
    pub fn new(host: &'a H, naming: NamingScheme) -> Self {
        Self { host, naming }
    }

    /// Query serial/asset tag and form factor
    async fn identify(&self) -> HardwareIdentity {
        let tag = match self.host.hardware_tag().await {
            Ok(tag) => tag,
            Err(e) => {
                warn!("Hardware serial query failed, treating as missing: {}", e);
                None
            }
        };

        let chassis = match self.host.chassis().await {
            Ok(info) => ChassisClass::classify(&info.chassis_types, info.model.as_deref()),
            Err(e) => {
                warn!("Chassis query failed, treating as unknown: {}", e);
                ChassisClass::Unknown
            }
        };

        info!(
            "Hardware tag: {:?}, chassis: {}",
            tag.as_deref().unwrap_or(""),
            chassis
        );

        HardwareIdentity { tag, chassis }
    }

    /// Query the hardware and derive the candidate name.
    ///
    /// The candidate is returned unjudged; a rejection is the decision's
    /// business, after the directory gates have run.
    pub async fn resolve(&self) -> ResolvedIdentity {
        let hardware = self.identify().await;
        let candidate =
            CanonicalName::build(&self.naming, hardware.tag.as_deref(), hardware.chassis);
        ResolvedIdentity {
            hardware,
            candidate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::fake::FakeHost;
    use assert_matches::assert_matches;
    use identity_primitives::UNKNOWN_SERIAL;

    #[tokio::test]
    async fn resolves_trimmed_serial() {
        let host = FakeHost::new("DESKTOP-AB12CD")
            .with_tag("PF3KX99 ")
            .with_chassis(&[3], "OptiPlex 7090");
        let name = HardwareIdentityResolver::new(&host, NamingScheme::default())
            .resolve()
            .await
            .candidate
            .unwrap();
        assert_eq!(name.as_str(), "PF3KX99");
    }

    #[tokio::test]
    async fn blank_serial_resolves_to_sentinel() {
        let host = FakeHost::new("DESKTOP-AB12CD").with_tag("");
        let name = HardwareIdentityResolver::new(&host, NamingScheme::default())
            .resolve()
            .await
            .candidate
            .unwrap();
        assert_eq!(name.as_str(), UNKNOWN_SERIAL);
    }

    #[tokio::test]
    async fn failed_serial_query_resolves_to_sentinel() {
        let host = FakeHost::new("DESKTOP-AB12CD")
            .with_tag("PF3KX99")
            .failing("hardware_tag");
        let name = HardwareIdentityResolver::new(&host, NamingScheme::default())
            .resolve()
            .await
            .candidate
            .unwrap();
        assert_eq!(name.as_str(), UNKNOWN_SERIAL);
    }

    #[tokio::test]
    async fn failed_chassis_query_is_unknown() {
        let host = FakeHost::new("PC").with_tag("ABC").failing("chassis");
        let resolved = HardwareIdentityResolver::new(&host, NamingScheme::default())
            .resolve()
            .await;
        assert_eq!(resolved.hardware.chassis, ChassisClass::Unknown);
        assert_eq!(resolved.candidate.unwrap().as_str(), "ABC");
    }

    #[tokio::test]
    async fn form_factor_prefix_uses_chassis() {
        let host = FakeHost::new("PC")
            .with_tag("5CG1234XYZ")
            .with_chassis(&[10], "EliteBook 840");
        let naming = NamingScheme::default().with_form_factor_prefix();
        let name = HardwareIdentityResolver::new(&host, naming)
            .resolve()
            .await
            .candidate
            .unwrap();
        assert_eq!(name.as_str(), "L5CG1234XYZ");
    }

    #[tokio::test]
    async fn numeric_serial_is_rejected_by_gate() {
        let host = FakeHost::new("PC").with_tag("123456789");
        let resolved = HardwareIdentityResolver::new(&host, NamingScheme::default())
            .resolve()
            .await;
        assert_eq!(resolved.hardware.tag.as_deref(), Some("123456789"));
        assert_matches!(resolved.candidate, Err(NameRejection::AllDigits(_)));
    }
}
