//! Attendee records and check-in results.
//!
//! Records are created outside this program (the pre-populated sheet) and are
//! only ever mutated by stamping the entry time once.

use serde::{Deserialize, Serialize};

/// One attendee row from the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    /// Identifier encoded in the attendee's QR code.
    pub id: String,

    /// Attendee name.
    pub name: String,

    /// Registration code.
    pub registration: String,

    /// 1-based sheet row; the header occupies row 1.
    pub row: u32,

    /// Entry stamp, if one was already recorded when the row was read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_time: Option<String>,
}

impl Attendee {
    /// Check whether the row carried an entry stamp when it was read.
    #[must_use]
    pub fn has_entered(&self) -> bool {
        self.entry_time.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Result of writing the entry cell for a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "at", rename_all = "snake_case")]
pub enum EntryMark {
    /// The cell was empty and now holds this stamp.
    Marked(String),
    /// The cell already held this value; nothing was written.
    AlreadyEntered(String),
}

impl EntryMark {
    /// The stamp now in the cell.
    #[must_use]
    pub fn timestamp(&self) -> &str {
        match self {
            Self::Marked(at) | Self::AlreadyEntered(at) => at,
        }
    }

    /// Check whether this call wrote the cell.
    #[must_use]
    pub fn was_written(&self) -> bool {
        matches!(self, Self::Marked(_))
    }
}

/// What happened to one scanned identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckInOutcome {
    /// First scan: the entry time was written.
    Entered {
        /// The matching record.
        attendee: Attendee,
        /// Stamp that was written.
        at: String,
    },
    /// The row already had an entry time.
    AlreadyEntered {
        /// The matching record.
        attendee: Attendee,
        /// Stamp found in the cell.
        at: String,
    },
    /// No row matches the identifier.
    NotFound {
        /// The scanned identifier.
        id: String,
    },
}

impl CheckInOutcome {
    /// Build the outcome for a found attendee from the entry marker result.
    #[must_use]
    pub fn from_mark(attendee: Attendee, mark: EntryMark) -> Self {
        match mark {
            EntryMark::Marked(at) => Self::Entered { attendee, at },
            EntryMark::AlreadyEntered(at) => Self::AlreadyEntered { attendee, at },
        }
    }

    /// The matching record, if any.
    #[must_use]
    pub fn attendee(&self) -> Option<&Attendee> {
        match self {
            Self::Entered { attendee, .. } | Self::AlreadyEntered { attendee, .. } => {
                Some(attendee)
            }
            Self::NotFound { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attendee(entry_time: Option<&str>) -> Attendee {
        Attendee {
            id: "A123".to_string(),
            name: "Ada Lovelace".to_string(),
            registration: "REG-0042".to_string(),
            row: 5,
            entry_time: entry_time.map(str::to_string),
        }
    }

    #[test]
    fn test_has_entered() {
        assert!(!attendee(None).has_entered());
        assert!(!attendee(Some("")).has_entered());
        assert!(attendee(Some("09:05 AM, 19 Oct")).has_entered());
    }

    #[test]
    fn test_entry_mark_accessors() {
        let marked = EntryMark::Marked("09:05 AM, 19 Oct".to_string());
        assert!(marked.was_written());
        assert_eq!(marked.timestamp(), "09:05 AM, 19 Oct");

        let existing = EntryMark::AlreadyEntered("08:00 AM, 19 Oct".to_string());
        assert!(!existing.was_written());
        assert_eq!(existing.timestamp(), "08:00 AM, 19 Oct");
    }

    #[test]
    fn test_outcome_from_mark() {
        let outcome =
            CheckInOutcome::from_mark(attendee(None), EntryMark::Marked("now".to_string()));
        assert!(matches!(outcome, CheckInOutcome::Entered { ref at, .. } if at == "now"));
        assert_eq!(outcome.attendee().map(|a| a.row), Some(5));

        let outcome = CheckInOutcome::from_mark(
            attendee(Some("then")),
            EntryMark::AlreadyEntered("then".to_string()),
        );
        assert!(matches!(outcome, CheckInOutcome::AlreadyEntered { .. }));
    }

    #[test]
    fn test_not_found_has_no_attendee() {
        let outcome = CheckInOutcome::NotFound {
            id: "ZZZ".to_string(),
        };
        assert!(outcome.attendee().is_none());
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = CheckInOutcome::NotFound {
            id: "ZZZ".to_string(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(json, r#"{"outcome":"not_found","id":"ZZZ"}"#);

        let json = serde_json::to_string(&attendee(None)).unwrap();
        assert!(!json.contains("entry_time"));
    }
}
