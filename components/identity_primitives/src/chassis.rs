use serde::{Deserialize, Serialize};
use std::fmt;

/// Form factor of the device, as far as naming cares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChassisClass {
    Desktop,
    Laptop,
    VirtualMachine,
    Unknown,
}

impl ChassisClass {
    /// SMBIOS enclosure codes reported by desktop-class hardware
    const DESKTOP_CODES: &'static [u16] = &[3, 4, 5, 6, 7, 13, 15, 16, 24, 35];

    /// SMBIOS enclosure codes reported by portable hardware
    const LAPTOP_CODES: &'static [u16] = &[8, 9, 10, 11, 12, 14, 18, 21, 30, 31, 32];

    const VIRTUAL_MODEL_MARKERS: &'static [&'static str] = &[
        "virtual machine",
        "vmware",
        "virtualbox",
        "kvm",
        "qemu",
        "hvm domu",
    ];

    /// Classify from SMBIOS chassis type codes and the system model string.
    ///
    /// Hypervisors report arbitrary enclosure codes, so a virtual model wins.
    /// Otherwise the first code that maps to a known class decides.
    pub fn classify(chassis_types: &[u16], model: Option<&str>) -> Self {
        if let Some(model) = model {
            let model = model.to_ascii_lowercase();
            if Self::VIRTUAL_MODEL_MARKERS
                .iter()
                .any(|marker| model.contains(marker))
            {
                return ChassisClass::VirtualMachine;
            }
        }

        chassis_types
            .iter()
            .find_map(|code| {
                if Self::DESKTOP_CODES.contains(code) {
                    Some(ChassisClass::Desktop)
                } else if Self::LAPTOP_CODES.contains(code) {
                    Some(ChassisClass::Laptop)
                } else {
                    None
                }
            })
            .unwrap_or(ChassisClass::Unknown)
    }

    /// One-letter naming prefix; unknown hardware gets none
    pub fn prefix(&self) -> Option<char> {
        match self {
            ChassisClass::Desktop => Some('D'),
            ChassisClass::Laptop => Some('L'),
            ChassisClass::VirtualMachine => Some('V'),
            ChassisClass::Unknown => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChassisClass::Desktop => "desktop",
            ChassisClass::Laptop => "laptop",
            ChassisClass::VirtualMachine => "virtual-machine",
            ChassisClass::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ChassisClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
