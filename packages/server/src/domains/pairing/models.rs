use lazy_static::lazy_static;
use regex::Regex;

use super::PairingError;
use crate::domains::session::SessionFile;

lazy_static! {
    // ASCII only: `\d` would also accept other scripts' digits
    static ref PHONE_PATTERN: Regex =
        Regex::new(r"^[0-9]{10,15}$").expect("phone pattern is a valid regex");
}

/// Phone number in international format without `+` or separators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(raw: &str) -> Result<Self, PairingError> {
        if PHONE_PATTERN.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(PairingError::InvalidPhoneNumber)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The single terminal result of a pairing attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingOutcome {
    /// Code to type into the phone under Linked Devices
    PairingCodeIssued(String),
    /// The library authenticated before a code was needed
    Authenticated(Vec<SessionFile>),
    /// The library reported an authentication failure
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ten_to_fifteen_digits() {
        assert!(PhoneNumber::parse("1555000123").is_ok());
        assert!(PhoneNumber::parse("15550001234").is_ok());
        assert_eq!(
            PhoneNumber::parse("155500012345678").unwrap().as_str(),
            "155500012345678"
        );
    }

    #[test]
    fn rejects_wrong_lengths() {
        assert_eq!(
            PhoneNumber::parse("12345"),
            Err(PairingError::InvalidPhoneNumber)
        );
        assert!(PhoneNumber::parse("").is_err());
        assert!(PhoneNumber::parse("1555000123456789").is_err());
    }

    #[test]
    fn rejects_symbols_and_whitespace() {
        for raw in [
            "+15550001234",
            "1555-000-1234",
            "(555) 0001234",
            " 15550001234",
            "15550001234\n",
        ] {
            assert!(PhoneNumber::parse(raw).is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn rejects_non_ascii_digits() {
        // Arabic-Indic digits
        assert!(PhoneNumber::parse("١٥٥٥٠٠٠١٢٣٤").is_err());
    }
}
