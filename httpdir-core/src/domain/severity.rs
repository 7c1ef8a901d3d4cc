//! Syslog-style message severity

use serde::Deserialize;
use std::fmt;

/// Severity attached to the messages a polling job emits
///
/// Follows the syslog scale: 0 (emergency) is the most severe, 7 (debug)
/// the least. Values outside 0..=7 are rejected when decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "i64")]
pub struct Severity(u8);

impl Severity {
    pub const EMERGENCY: Severity = Severity(0);
    pub const ALERT: Severity = Severity(1);
    pub const CRITICAL: Severity = Severity(2);
    pub const ERROR: Severity = Severity(3);
    pub const WARNING: Severity = Severity(4);
    pub const NOTICE: Severity = Severity(5);
    pub const INFO: Severity = Severity(6);
    pub const DEBUG: Severity = Severity(7);

    /// Returns the numeric syslog value
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Severity {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (0..=7).contains(&value) {
            Ok(Severity(value as u8))
        } else {
            Err(format!("severity must be between 0 and 7, got {}", value))
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_range() {
        assert_eq!(Severity::try_from(0).unwrap(), Severity::EMERGENCY);
        assert_eq!(Severity::try_from(7).unwrap(), Severity::DEBUG);
        assert!(Severity::try_from(8).is_err());
        assert!(Severity::try_from(-1).is_err());
    }
}
