// Bug lifecycle states
// Persisted as the canonical variant name, never by ordinal position.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::error::WorkflowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BugStatus {
    Open,
    InProgress,
    Testing,
    Completed,
    Rejected,
    OnHold,
    Failed,
    Reopened,
}

impl BugStatus {
    pub const ALL: [BugStatus; 8] = [
        BugStatus::Open,
        BugStatus::InProgress,
        BugStatus::Testing,
        BugStatus::Completed,
        BugStatus::Rejected,
        BugStatus::OnHold,
        BugStatus::Failed,
        BugStatus::Reopened,
    ];

    /// Canonical name used for storage and internal comparison.
    pub fn as_str(&self) -> &'static str {
        match self {
            BugStatus::Open => "Open",
            BugStatus::InProgress => "InProgress",
            BugStatus::Testing => "Testing",
            BugStatus::Completed => "Completed",
            BugStatus::Rejected => "Rejected",
            BugStatus::OnHold => "OnHold",
            BugStatus::Failed => "Failed",
            BugStatus::Reopened => "Reopened",
        }
    }

    /// Human-facing label. Anything shown to a person goes through here.
    pub fn display_name(&self) -> &'static str {
        match self {
            BugStatus::Open => "Open",
            BugStatus::InProgress => "In Progress",
            BugStatus::Testing => "Testing",
            BugStatus::Completed => "Completed",
            BugStatus::Rejected => "Rejected",
            BugStatus::OnHold => "On Hold",
            BugStatus::Failed => "Failed",
            BugStatus::Reopened => "Reopened",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            BugStatus::Open => "Bug has been reported and is waiting to be addressed",
            BugStatus::InProgress => "Bug is currently being worked on",
            BugStatus::Testing => "Bug fix is being tested",
            BugStatus::Completed => "Bug has been resolved and tested",
            BugStatus::Rejected => "Bug report was deemed invalid or duplicate",
            BugStatus::OnHold => "Work on bug is temporarily paused",
            BugStatus::Failed => "Bug fix failed testing and needs more work",
            BugStatus::Reopened => "Previously completed bug has been reopened",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            BugStatus::Open => "#3B82F6",       // blue
            BugStatus::InProgress => "#F59E0B", // amber
            BugStatus::Testing => "#8B5CF6",    // purple
            BugStatus::Completed => "#10B981",  // green
            BugStatus::Rejected => "#EF4444",   // red
            BugStatus::OnHold => "#6B7280",     // gray
            BugStatus::Failed => "#DC2626",     // dark red
            BugStatus::Reopened => "#F97316",   // orange
        }
    }

    pub fn info(&self) -> StatusInfo {
        StatusInfo {
            value: *self,
            display_name: self.display_name().to_string(),
            description: self.description().to_string(),
        }
    }
}

/// Convenience wrapper used by callers that only hold the enum.
pub fn display_name(status: BugStatus) -> &'static str {
    status.display_name()
}

/// Every status with its presentation strings, in ordinal order.
pub fn all_statuses() -> Vec<StatusInfo> {
    BugStatus::ALL.iter().map(BugStatus::info).collect()
}

impl fmt::Display for BugStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for BugStatus {
    type Err = WorkflowError;

    // Accepts the canonical name or the display name, nothing else.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BugStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s || status.display_name() == s)
            .ok_or_else(|| WorkflowError::InvalidStatusValue {
                value: s.to_string(),
            })
    }
}

impl Serialize for BugStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BugStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusInfo {
    pub value: BugStatus,
    pub display_name: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names() {
        assert_eq!(BugStatus::Open.display_name(), "Open");
        assert_eq!(BugStatus::InProgress.display_name(), "In Progress");
        assert_eq!(BugStatus::OnHold.display_name(), "On Hold");
        assert_eq!(BugStatus::Reopened.to_string(), "Reopened");
    }

    #[test]
    fn test_display_name_parse_round_trip() {
        for status in BugStatus::ALL {
            let shown = display_name(status);
            let parsed: BugStatus = shown.parse().unwrap();
            assert_eq!(display_name(parsed), shown);
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_canonical_name_parses() {
        assert_eq!("InProgress".parse::<BugStatus>().unwrap(), BugStatus::InProgress);
        assert_eq!("OnHold".parse::<BugStatus>().unwrap(), BugStatus::OnHold);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for raw in ["", "3", "open", " Open", "Closed", "Offen", "IN PROGRESS"] {
            let err = raw.parse::<BugStatus>().unwrap_err();
            assert!(
                matches!(err, WorkflowError::InvalidStatusValue { ref value } if value == raw),
                "expected InvalidStatusValue for {raw:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_serde_uses_canonical_name() {
        let json = serde_json::to_string(&BugStatus::InProgress).unwrap();
        assert_eq!(json, "\"InProgress\"");

        let parsed: BugStatus = serde_json::from_str("\"On Hold\"").unwrap();
        assert_eq!(parsed, BugStatus::OnHold);

        assert!(serde_json::from_str::<BugStatus>("1").is_err());
        assert!(serde_json::from_str::<BugStatus>("\"Bogus\"").is_err());
    }

    #[test]
    fn test_all_statuses_in_ordinal_order() {
        let infos = all_statuses();
        assert_eq!(infos.len(), 8);
        assert_eq!(infos[0].value, BugStatus::Open);
        assert_eq!(infos[7].value, BugStatus::Reopened);
        assert_eq!(infos[1].description, "Bug is currently being worked on");
    }
}
