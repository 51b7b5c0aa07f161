//! Lookup followed by the entry marker, for one scanned identifier.

use std::sync::Arc;

use tracing::{info, warn};

use crate::attendee::CheckInOutcome;
use crate::error::Result;
use crate::sheet::{self, SheetLayout, Worksheet};

/// Checks scanned identifiers in against a worksheet.
#[derive(Clone)]
pub struct CheckIn {
    sheet: Arc<dyn Worksheet>,
    layout: SheetLayout,
    timestamp_format: String,
}

impl std::fmt::Debug for CheckIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckIn")
            .field("sheet", &self.sheet.describe())
            .field("layout", &self.layout)
            .field("timestamp_format", &self.timestamp_format)
            .finish()
    }
}

impl CheckIn {
    /// Create a check-in service.
    #[must_use]
    pub fn new(
        sheet: Arc<dyn Worksheet>,
        layout: SheetLayout,
        timestamp_format: impl Into<String>,
    ) -> Self {
        Self {
            sheet,
            layout,
            timestamp_format: timestamp_format.into(),
        }
    }

    /// The worksheet in use.
    #[must_use]
    pub fn sheet(&self) -> &dyn Worksheet {
        self.sheet.as_ref()
    }

    /// Column layout in use.
    #[must_use]
    pub fn layout(&self) -> &SheetLayout {
        &self.layout
    }

    /// Look `id` up and stamp its entry cell if it is still empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the sheet cannot be read or written.
    pub async fn check_in(&self, id: &str) -> Result<CheckInOutcome> {
        let Some(attendee) = sheet::lookup(self.sheet.as_ref(), id, &self.layout).await? else {
            warn!(id, "No entry found");
            return Ok(CheckInOutcome::NotFound { id: id.to_string() });
        };

        let stamp = sheet::entry_time_now(&self.timestamp_format);
        let mark = sheet::mark_entry(self.sheet.as_ref(), attendee.row, &self.layout, &stamp)
            .await?;
        info!(
            id,
            row = attendee.row,
            written = mark.was_written(),
            "Check-in processed"
        );
        Ok(CheckInOutcome::from_mark(attendee, mark))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_TIMESTAMP_FORMAT;
    use crate::storage::LocalSheet;

    fn rows() -> Vec<Vec<String>> {
        let rows: &[&[&str]] = &[
            &["ID", "Name", "Registration"],
            &["A100", "Grace Hopper", "REG-1"],
            &["A101", "Alan Turing", "REG-2"],
            &["A102", "Edsger Dijkstra", "REG-3", "", "", "", "", "", "08:00 AM, 19 Oct"],
            &["A123", "Ada Lovelace", "REG-4"],
        ];
        rows.iter()
            .map(|r| r.iter().map(|c| (*c).to_string()).collect())
            .collect()
    }

    fn service() -> (Arc<LocalSheet>, CheckIn) {
        let sheet = Arc::new(LocalSheet::open_in_memory().unwrap());
        sheet.import_rows(&rows()).unwrap();
        let checkin = CheckIn::new(
            sheet.clone(),
            SheetLayout::default(),
            DEFAULT_TIMESTAMP_FORMAT,
        );
        (sheet, checkin)
    }

    #[tokio::test]
    async fn test_first_scan_marks_entry() {
        let (sheet, checkin) = service();

        let outcome = checkin.check_in("A123").await.unwrap();
        let CheckInOutcome::Entered { attendee, at } = outcome else {
            panic!("expected Entered, got {outcome:?}");
        };
        assert_eq!(attendee.row, 5);
        assert_eq!(attendee.name, "Ada Lovelace");
        assert_eq!(sheet.cell(5, 9).await.unwrap(), Some(at.clone()));

        let pattern = regex::Regex::new(r"^\d{2}:\d{2} (AM|PM), \d{2} [A-Z][a-z]{2}$").unwrap();
        assert!(pattern.is_match(&at));
    }

    #[tokio::test]
    async fn test_second_scan_reports_existing_stamp() {
        let (sheet, checkin) = service();

        let first = checkin.check_in("A123").await.unwrap();
        let CheckInOutcome::Entered { at: first_at, .. } = first else {
            panic!("expected Entered");
        };

        let second = checkin.check_in("A123").await.unwrap();
        assert!(
            matches!(second, CheckInOutcome::AlreadyEntered { ref at, .. } if *at == first_at)
        );
        assert_eq!(sheet.cell(5, 9).await.unwrap(), Some(first_at));
    }

    #[tokio::test]
    async fn test_pre_stamped_row_is_untouched() {
        let (sheet, checkin) = service();

        let outcome = checkin.check_in("A102").await.unwrap();
        assert!(matches!(
            outcome,
            CheckInOutcome::AlreadyEntered { ref at, .. } if at == "08:00 AM, 19 Oct"
        ));
        assert_eq!(
            sheet.cell(4, 9).await.unwrap().as_deref(),
            Some("08:00 AM, 19 Oct")
        );
    }

    #[tokio::test]
    async fn test_unknown_identifier() {
        let (sheet, checkin) = service();
        let before = sheet.all_values().await.unwrap();

        let outcome = checkin.check_in("ZZZ").await.unwrap();
        assert_eq!(
            outcome,
            CheckInOutcome::NotFound {
                id: "ZZZ".to_string()
            }
        );
        assert_eq!(sheet.all_values().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_custom_entry_column() {
        let sheet = Arc::new(LocalSheet::open_in_memory().unwrap());
        sheet.import_rows(&rows()).unwrap();
        let layout = SheetLayout {
            entry_column: 4,
            ..SheetLayout::default()
        };
        let checkin = CheckIn::new(sheet.clone(), layout, "%H:%M");

        checkin.check_in("A100").await.unwrap();
        let written = sheet.cell(2, 4).await.unwrap().unwrap();
        assert_eq!(written.len(), 5);
        assert!(sheet.cell(2, 9).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_id_column_is_error() {
        let sheet = Arc::new(LocalSheet::open_in_memory().unwrap());
        sheet
            .import_rows(&[vec!["Name".to_string()], vec!["Ada".to_string()]])
            .unwrap();
        let checkin = CheckIn::new(sheet, SheetLayout::default(), DEFAULT_TIMESTAMP_FORMAT);

        let err = checkin.check_in("A123").await.unwrap_err();
        assert!(err.is_sheet_error());
    }

    #[tokio::test]
    async fn test_empty_identifier_never_stamps_blank_row() {
        let sheet = Arc::new(LocalSheet::open_in_memory().unwrap());
        let table = vec![
            vec!["ID".to_string(), "Name".to_string()],
            vec!["A100".to_string(), "Grace Hopper".to_string()],
            Vec::new(),
            vec!["A123".to_string(), "Ada Lovelace".to_string()],
        ];
        sheet.import_rows(&table).unwrap();
        let checkin = CheckIn::new(sheet.clone(), SheetLayout::default(), DEFAULT_TIMESTAMP_FORMAT);

        let outcome = checkin.check_in("").await.unwrap();
        assert!(matches!(outcome, CheckInOutcome::NotFound { .. }));
        assert!(sheet.cell(3, 9).await.unwrap().is_none());
    }
}
