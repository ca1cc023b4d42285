//! Health token to ordinal mapping.

use std::str::FromStr;

use strum_macros::{AsRefStr, Display, EnumString};

/// Health status vocabulary reported by services, roles and health checks.
///
/// The discriminant is the exported gauge value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Good = 0,
    Disabled = 1,
    HistoryNotAvailable = 2,
    NotAvailable = 3,
    Concerning = 4,
    Bad = 5,
    Unknown = 6,
}

impl HealthStatus {
    /// Legend appended to every health metric's help text.
    pub const LEGEND: &'static str = "GOOD: 0, DISABLED: 1, HISTORY_NOT_AVAILABLE: 2, \
         NOT_AVAILABLE: 3, CONCERNING: 4, BAD: 5, UNKNOWN: 6";

    /// Map an upstream token; anything outside the six reported states
    /// becomes [`HealthStatus::Unknown`] with a warning.
    ///
    /// Tokens are matched exactly (upstream sends upper case). A literal
    /// `UNKNOWN` is not a reported state and is treated like any other
    /// unrecognized token.
    pub fn from_token(token: &str) -> Self {
        match Self::from_str(token) {
            Ok(status) if status != Self::Unknown => status,
            _ => {
                tracing::warn!(token, "Unrecognized health status");
                Self::Unknown
            }
        }
    }

    pub fn ordinal(self) -> f64 {
        f64::from(self as u8)
    }
}

/// Ordinal gauge value for a health token.
pub fn ordinal(token: &str) -> f64 {
    HealthStatus::from_token(token).ordinal()
}
