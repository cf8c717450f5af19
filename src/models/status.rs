//! Record visibility status
//!
//! Employees, services and clients are never hard-deleted while referenced by
//! history; delete flips them to `Hidden` and restore flips them back.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Active,
    Hidden,
}

impl RecordStatus {
    pub fn is_hidden(&self) -> bool {
        matches!(self, RecordStatus::Hidden)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Active => "active",
            RecordStatus::Hidden => "hidden",
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(RecordStatus::Active),
            "hidden" => Ok(RecordStatus::Hidden),
            _ => Err(format!("Invalid record status: {}", s)),
        }
    }
}
