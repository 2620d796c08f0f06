use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SeverityParseError;

/// Severity of an event.
///
/// Ranks are totally ordered and `Audit` always ranks highest, so audit
/// events pass every threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
    Fatal = 4,
    Audit = 5,
}

pub const DEBUG_SEV: &str = "DEBUG";
pub const INFO_SEV: &str = "INFO";
pub const WARN_SEV: &str = "WARN";
pub const ERROR_SEV: &str = "ERROR";
pub const FATAL_SEV: &str = "FATAL";
pub const AUDIT_SEV: &str = "AUDIT";

impl Severity {
    pub const ALL: [Severity; 6] = [
        Severity::Debug,
        Severity::Info,
        Severity::Warn,
        Severity::Error,
        Severity::Fatal,
        Severity::Audit,
    ];

    /// Name as it appears in the `severity` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Debug => DEBUG_SEV,
            Severity::Info => INFO_SEV,
            Severity::Warn => WARN_SEV,
            Severity::Error => ERROR_SEV,
            Severity::Fatal => FATAL_SEV,
            Severity::Audit => AUDIT_SEV,
        }
    }

    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Lenient lookup: unknown names (including wrong case) map to `Debug`.
    pub fn from_name(name: &str) -> Severity {
        name.parse().unwrap_or(Severity::Debug)
    }
}

impl FromStr for Severity {
    type Err = SeverityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            DEBUG_SEV => Ok(Severity::Debug),
            INFO_SEV => Ok(Severity::Info),
            WARN_SEV => Ok(Severity::Warn),
            ERROR_SEV => Ok(Severity::Error),
            FATAL_SEV => Ok(Severity::Fatal),
            AUDIT_SEV => Ok(Severity::Audit),
            other => Err(SeverityParseError(other.to_string())),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rank for a severity name; unrecognized names rank as `DEBUG`.
pub fn string_to_level(severity: &str) -> u8 {
    Severity::from_name(severity).rank()
}

/// `true` if an event of rank `severity` passes the threshold `level`.
pub fn should_log_level(level: u8, severity: u8) -> bool {
    severity >= level
}

/// Name-based form of [`should_log_level`].
pub fn should_log_severity(level: &str, severity: &str) -> bool {
    should_log_level(string_to_level(level), string_to_level(severity))
}
