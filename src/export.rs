// Export of the approved list into the 7-column budget sheet layout
//
// Output columns (no header row):
//   0 description | 1 date MM/DD/YYYY | 2 category | 3 method | 4 debit | 5 spare | 6 credit
// Amounts go back to the bank convention (charges positive).

use crate::error::{Result, TriageError};
use crate::rows::{format_amount, CanonicalRow, RowList};
use csv::{Terminator, WriterBuilder};
use std::path::Path;
use tracing::{info, warn};

/// Payment method written for every record; no other method is tracked
pub const PAYMENT_METHOD: &str = "cc";

/// Gifts have no paired credit figure, so their credit column stays empty
pub const GIFT_CATEGORY: &str = "Monthly Gift";

const US_DATE: &str = "%m/%d/%Y";

/// Whether the caller obtained permission to replace an existing file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overwrite {
    Refuse,
    Confirmed,
}

/// True when exporting to `path` would replace a file, so the shell must ask first
pub fn needs_confirmation(path: &Path) -> bool {
    path.exists()
}

/// Map one canonical row onto the output columns
pub fn export_record(row: &CanonicalRow) -> [String; 7] {
    let category = row.category().trim().to_string();
    let flipped = format_amount(-row.amount());
    let credit = if category == GIFT_CATEGORY {
        String::new()
    } else {
        flipped.clone()
    };

    [
        row.description().trim().to_string(),
        row.date().format(US_DATE).to_string(),
        category,
        PAYMENT_METHOD.to_string(),
        flipped,
        String::new(),
        credit,
    ]
}

fn write_records(approved: &RowList, path: &Path) -> csv::Result<usize> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::Any(b'\n'))
        .from_path(path)?;

    let mut count = 0;
    // sentinels (the trailing blank row) carry no data and are skipped
    for row in approved.data_rows() {
        writer.write_record(export_record(row))?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}

/// Write the approved rows to `path` and return the number of records.
///
/// An existing file is only replaced with `Overwrite::Confirmed`. On any error
/// the lists are untouched and the call can simply be retried.
pub fn export(approved: &RowList, path: &Path, overwrite: Overwrite) -> Result<usize> {
    if needs_confirmation(path) && overwrite == Overwrite::Refuse {
        warn!(path = %path.display(), "export refused, file exists");
        return Err(TriageError::OverwriteNotConfirmed {
            path: path.to_path_buf(),
        });
    }

    let count = write_records(approved, path).map_err(|source| TriageError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    info!(path = %path.display(), records = count, "exported approved rows");
    Ok(count)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::{DisplayWidths, Row};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::fs;
    use std::str::FromStr;
    use tempfile::TempDir;

    fn row(date: (i32, u32, u32), description: &str, category: &str, amount: &str) -> CanonicalRow {
        CanonicalRow::new(
            NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            description,
            category,
            Decimal::from_str(amount).unwrap(),
            DisplayWidths::new(20, 15),
        )
    }

    fn approved(rows: Vec<CanonicalRow>) -> RowList {
        let mut list: RowList = rows.into_iter().map(Row::Data).collect();
        list.push(Row::Blank);
        list
    }

    #[test]
    fn test_export_record_layout() {
        let record = export_record(&row((2023, 3, 1), "COFFEE SHOP", "Food", "-4.50"));
        assert_eq!(
            record,
            ["COFFEE SHOP", "03/01/2023", "Food", "cc", "4.50", "", "4.50"].map(String::from)
        );
    }

    #[test]
    fn test_export_record_credit_flips_negative() {
        let record = export_record(&row((2023, 3, 2), "REFUND", "Food", "15.5"));
        assert_eq!(record[4], "-15.50");
        assert_eq!(record[6], "-15.50");
    }

    #[test]
    fn test_monthly_gift_blanks_credit() {
        let record = export_record(&row((2023, 3, 1), "GIFT", "Monthly Gift", "-25.00"));
        assert_eq!(record[4], "25.00");
        assert_eq!(record[5], "");
        assert_eq!(record[6], "");
    }

    #[test]
    fn test_export_writes_file_without_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let list = approved(vec![
            row((2023, 3, 1), "COFFEE SHOP", "Food", "-4.50"),
            row((2023, 3, 1), "GIFT", "Monthly Gift", "-25.00"),
        ]);

        let count = export(&list, &path, Overwrite::Refuse).unwrap();
        assert_eq!(count, 2);
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "COFFEE SHOP,03/01/2023,Food,cc,4.50,,4.50\n\
             GIFT,03/01/2023,Monthly Gift,cc,25.00,,\n"
        );
    }

    #[test]
    fn test_export_quotes_commas() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let list = approved(vec![row((2023, 3, 1), "SHOP, INC", "Food", "-1")]);

        export(&list, &path, Overwrite::Refuse).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, "\"SHOP, INC\",03/01/2023,Food,cc,1.00,,1.00\n");
    }

    #[test]
    fn test_existing_file_needs_confirmation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "keep me\n").unwrap();
        assert!(needs_confirmation(&path));

        let list = approved(vec![row((2023, 3, 1), "A", "Food", "-1")]);
        let err = export(&list, &path, Overwrite::Refuse).unwrap_err();
        assert!(matches!(err, TriageError::OverwriteNotConfirmed { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "keep me\n");

        assert_eq!(export(&list, &path, Overwrite::Confirmed).unwrap(), 1);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "A,03/01/2023,Food,cc,1.00,,1.00\n"
        );
    }

    #[test]
    fn test_unwritable_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        let list = approved(vec![]);

        let err = export(&list, &path, Overwrite::Refuse).unwrap_err();
        match err {
            TriageError::Write { source, .. } => assert!(source.is_io_error()),
            other => panic!("expected a write error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_list_writes_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        assert_eq!(export(&RowList::new(), &path, Overwrite::Refuse).unwrap(), 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }
}
