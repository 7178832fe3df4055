use crate::chassis::ChassisClass;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Substituted for a missing, blank or fully-stripped hardware tag
pub const UNKNOWN_SERIAL: &str = "UnknownSerial";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameRejection {
    #[error("candidate name is empty")]
    Empty,

    #[error("candidate name '{name}' is {length} characters, the limit is {max}")]
    TooLong {
        name: String,
        length: usize,
        max: usize,
    },

    #[error("candidate name '{0}' consists only of digits")]
    AllDigits(String),

    #[error("candidate name '{name}' contains invalid character {character:?}")]
    InvalidCharacter { name: String, character: char },
}

/// How the organization composes a name from hardware identity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingScheme {
    /// Prepend the one-letter form-factor prefix (see `ChassisClass::prefix`)
    pub form_factor_prefix: bool,
}

impl NamingScheme {
    pub fn with_form_factor_prefix(mut self) -> Self {
        self.form_factor_prefix = true;
        self
    }
}

/// Reduce a raw vendor serial/asset tag to the hardware-derived name segment.
///
/// Total: never fails and never returns an empty string.
/// - surrounding whitespace is dropped
/// - each internal whitespace run becomes one hyphen
/// - anything outside `[A-Za-z0-9-]` is stripped
/// - the result is cut to `CanonicalName::HARDWARE_SEGMENT_MAX` characters
/// - an empty result becomes [`UNKNOWN_SERIAL`]
///
/// ```
/// use identity_primitives::{sanitize_hardware_tag, UNKNOWN_SERIAL};
///
/// assert_eq!(sanitize_hardware_tag(Some("PF3KX99 ")), "PF3KX99");
/// assert_eq!(sanitize_hardware_tag(Some("AB  12/34")), "AB-1234");
/// assert_eq!(sanitize_hardware_tag(Some("   ")), UNKNOWN_SERIAL);
/// assert_eq!(sanitize_hardware_tag(None), UNKNOWN_SERIAL);
/// ```
pub fn sanitize_hardware_tag(raw: Option<&str>) -> String {
    let trimmed = raw.map(str::trim).unwrap_or_default();

    let mut segment = String::with_capacity(trimmed.len());
    let mut pending_separator = false;
    for c in trimmed.chars() {
        if c.is_whitespace() {
            pending_separator = true;
            continue;
        }
        if pending_separator {
            segment.push('-');
            pending_separator = false;
        }
        if is_name_char(c) {
            segment.push(c);
        }
    }

    // Every kept char is ASCII, so truncating by bytes is truncating by chars
    segment.truncate(CanonicalName::HARDWARE_SEGMENT_MAX);

    if segment.is_empty() {
        UNKNOWN_SERIAL.to_string()
    } else {
        segment
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-'
}

/// An organization-compliant computer name.
///
/// Invariants (checked by every constructor):
/// - non-empty, at most 63 characters
/// - not composed entirely of digits
/// - only ASCII letters, digits and hyphens
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CanonicalName(String);

impl CanonicalName {
    /// Maximum length of a full name
    pub const MAX_LEN: usize = 63;

    /// Maximum length of the hardware-derived segment, before any prefix
    pub const HARDWARE_SEGMENT_MAX: usize = 13;

    /// Validation gate for an already-composed name
    pub fn parse(name: impl Into<String>) -> Result<Self, NameRejection> {
        let name = name.into();

        if name.is_empty() {
            return Err(NameRejection::Empty);
        }

        if let Some(character) = name.chars().find(|c| !is_name_char(*c)) {
            return Err(NameRejection::InvalidCharacter { name, character });
        }

        if name.len() > Self::MAX_LEN {
            let length = name.len();
            return Err(NameRejection::TooLong {
                name,
                length,
                max: Self::MAX_LEN,
            });
        }

        if name.chars().all(|c| c.is_ascii_digit()) {
            return Err(NameRejection::AllDigits(name));
        }

        Ok(CanonicalName(name))
    }

    /// Compose the candidate name for a device from its hardware identity.
    ///
    /// The hardware segment is always produced (see [`sanitize_hardware_tag`]);
    /// only the final validation gate can reject, e.g. a purely numeric serial
    /// with no prefix.
    pub fn build(
        scheme: &NamingScheme,
        hardware_tag: Option<&str>,
        chassis: ChassisClass,
    ) -> Result<Self, NameRejection> {
        let segment = sanitize_hardware_tag(hardware_tag);

        let name = match chassis.prefix().filter(|_| scheme.form_factor_prefix) {
            Some(prefix) => format!("{prefix}{segment}"),
            None => segment,
        };

        Self::parse(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Computer names compare case-insensitively
    pub fn matches(&self, name: &str) -> bool {
        self.0.eq_ignore_ascii_case(name.trim())
    }
}

impl fmt::Display for CanonicalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for CanonicalName {
    type Error = NameRejection;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CanonicalName> for String {
    fn from(name: CanonicalName) -> Self {
        name.0
    }
}

impl AsRef<str> for CanonicalName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some(" "))]
    #[case(Some("\t \n "))]
    #[case(Some("!!!"))]
    #[case(Some("  ###  "))]
    fn blank_or_unusable_tags_become_sentinel(#[case] raw: Option<&str>) {
        assert_eq!(sanitize_hardware_tag(raw), UNKNOWN_SERIAL);
    }

    #[rstest]
    #[case("PF3KX99 ", "PF3KX99")]
    #[case("  5CG1234XYZ", "5CG1234XYZ")]
    #[case("ABC DEF", "ABC-DEF")]
    #[case("ABC \t  DEF", "ABC-DEF")]
    #[case("SN:12.34_56", "SN123456")]
    #[case("ÄBC123", "BC123")]
    #[case("0123456789ABCDEFGH", "0123456789ABC")]
    fn sanitizes_hardware_tags(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(sanitize_hardware_tag(Some(raw)), expected);
    }

    #[test]
    fn sentinel_fits_segment_limit() {
        assert!(UNKNOWN_SERIAL.len() <= CanonicalName::HARDWARE_SEGMENT_MAX);
        assert!(CanonicalName::parse(UNKNOWN_SERIAL).is_ok());
    }

    #[test]
    fn parse_rejects_empty() {
        assert_matches!(CanonicalName::parse(""), Err(NameRejection::Empty));
    }

    #[test]
    fn parse_rejects_all_digits() {
        assert_matches!(
            CanonicalName::parse("12345678"),
            Err(NameRejection::AllDigits(name)) if name == "12345678"
        );
    }

    #[test]
    fn parse_rejects_too_long() {
        let name = "A".repeat(64);
        assert_matches!(
            CanonicalName::parse(name),
            Err(NameRejection::TooLong { length: 64, max: 63, .. })
        );
        assert!(CanonicalName::parse("A".repeat(63)).is_ok());
    }

    #[rstest]
    #[case("PC 01", ' ')]
    #[case("PC_01", '_')]
    #[case("PC.corp", '.')]
    fn parse_rejects_invalid_characters(#[case] name: &str, #[case] bad: char) {
        assert_matches!(
            CanonicalName::parse(name),
            Err(NameRejection::InvalidCharacter { character, .. }) if character == bad
        );
    }

    #[test]
    fn build_without_prefix_uses_segment() {
        let name = CanonicalName::build(
            &NamingScheme::default(),
            Some("PF3KX99 "),
            ChassisClass::Laptop,
        )
        .unwrap();
        assert_eq!(name.as_str(), "PF3KX99");
    }

    #[rstest]
    #[case(ChassisClass::Desktop, "DPF3KX99")]
    #[case(ChassisClass::Laptop, "LPF3KX99")]
    #[case(ChassisClass::VirtualMachine, "VPF3KX99")]
    #[case(ChassisClass::Unknown, "PF3KX99")]
    fn build_with_form_factor_prefix(#[case] chassis: ChassisClass, #[case] expected: &str) {
        let scheme = NamingScheme::default().with_form_factor_prefix();
        let name = CanonicalName::build(&scheme, Some("PF3KX99"), chassis).unwrap();
        assert_eq!(name.as_str(), expected);
    }

    #[test]
    fn prefix_is_applied_after_truncation() {
        let scheme = NamingScheme::default().with_form_factor_prefix();
        let name =
            CanonicalName::build(&scheme, Some("ABCDEFGHIJKLMNOP"), ChassisClass::Desktop).unwrap();
        assert_eq!(name.as_str(), "DABCDEFGHIJKLM");
    }

    #[test]
    fn numeric_serial_is_rejected_without_prefix() {
        let result = CanonicalName::build(
            &NamingScheme::default(),
            Some("20231107"),
            ChassisClass::Desktop,
        );
        assert_matches!(result, Err(NameRejection::AllDigits(_)));
    }

    #[test]
    fn numeric_serial_is_accepted_with_prefix() {
        let scheme = NamingScheme::default().with_form_factor_prefix();
        let name = CanonicalName::build(&scheme, Some("20231107"), ChassisClass::Laptop).unwrap();
        assert_eq!(name.as_str(), "L20231107");
    }

    #[test]
    fn built_names_always_hold_invariants() {
        let inputs = [
            None,
            Some(""),
            Some("   "),
            Some("PF3KX99 "),
            Some("a b c d e f g h i j k l m n o p"),
            Some("€€€ 123 €€€"),
            Some("----"),
            Some("0000000000000000000000000000000000000000000000000000000000000000000000"),
        ];
        for scheme in [NamingScheme::default(), NamingScheme::default().with_form_factor_prefix()] {
            for raw in inputs {
                if let Ok(name) = CanonicalName::build(&scheme, raw, ChassisClass::Desktop) {
                    let s = name.as_str();
                    assert!(!s.is_empty());
                    assert!(s.len() <= CanonicalName::MAX_LEN);
                    assert!(!s.chars().all(|c| c.is_ascii_digit()));
                    assert!(s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));
                }
            }
        }
    }

    #[test]
    fn matches_ignores_case() {
        let name = CanonicalName::parse("PF3KX99").unwrap();
        assert!(name.matches("pf3kx99"));
        assert!(name.matches("Pf3Kx99"));
        assert!(!name.matches("PF3KX98"));
    }

    #[test]
    fn deserialization_validates() {
        let ok: CanonicalName = serde_json::from_str("\"PF3KX99\"").unwrap();
        assert_eq!(ok.as_str(), "PF3KX99");
        assert!(serde_json::from_str::<CanonicalName>("\"12345\"").is_err());
    }
}
