//! Device identity primitives
//!
//! Pure value types for reasoning about a managed device's name:
//! - `CanonicalName` is the only way to hold an organization-compliant name
//! - `DeviceIdentitySnapshot` captures the facts a single run reasons about
//! - `decide` turns (current name, candidate) into a `RenameDecision`
//!
//! Nothing in this crate touches the host. Every function is total and
//! deterministic, so the decision logic can be tested against literal inputs.
//!
//! # Examples
//!
//! ```
//! use identity_primitives::{decide, CanonicalName, ChassisClass, NamingScheme, RenameDecision};
//!
//! let scheme = NamingScheme::default();
//! let candidate = CanonicalName::build(&scheme, Some("PF3KX99 "), ChassisClass::Desktop);
//! let decision = decide("DESKTOP-AB12CD", candidate);
//! assert_eq!(decision, RenameDecision::ApplyRename(CanonicalName::parse("PF3KX99")?));
//! # Ok::<(), identity_primitives::NameRejection>(())
//! ```

mod chassis;
mod decision;
mod directory;
mod name;
mod snapshot;

pub use chassis::ChassisClass;
pub use decision::{decide, RenameDecision};
pub use directory::DirectoryState;
pub use name::{sanitize_hardware_tag, CanonicalName, NameRejection, NamingScheme, UNKNOWN_SERIAL};
pub use snapshot::{DeviceIdentitySnapshot, ProvisioningPhase};
