use chrono::NaiveDate;
use ledger_triage::{
    export, ingest, needs_confirmation, Config, Direction, ListId, Overwrite, Row, Triage,
    TriageError,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

/// One file per supported bank layout, plus a file nobody recognizes
fn fixture_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "basic.csv",
        "Date,Description,Amount\n\
         03/01/2023,COFFEE SHOP,-4.50\n\
         03/04/2023,BOOKSTORE,12.00\n",
    );
    write(
        dir.path(),
        "capital_one.csv",
        "Transaction Date,Posted Date,Card No.,Description,Category,Debit,Credit\n\
         2023-03-03,2023-03-04,1234,GROCERY,Food,30.25,\n\
         2023-03-02,2023-03-03,1234,CAPITAL ONE AUTOPAY,Payment,,500.00\n",
    );
    write(
        dir.path(),
        "chase_checking.csv",
        "Details,Posting Date,Description,Amount,Type,Balance,Check or Slip #\n\
         DEBIT,03/02/2023,LANDLORD,-1200.00,ACH_DEBIT,800.00,\n",
    );
    write(
        dir.path(),
        "chase_card.csv",
        "Transaction Date,Post Date,Description,Category,Type,Amount,Memo\n\
         03/05/2023,03/06/2023,GIFT SHOP,Shopping,Sale,-25.00,\n\
         03/06/2023,03/07/2023,BAD ROW,Shopping,Sale,abc,\n",
    );
    write(dir.path(), "mystery.csv", "When,What,HowMuch\n1,2,3\n");
    write(dir.path(), "notes.txt", "not a csv\n");
    dir
}

fn config(dir: &Path) -> Config {
    Config {
        output_file: dir.join("out.csv").to_string_lossy().to_string(),
        ..Config::default()
    }
}

#[test]
fn test_ingest_reports_and_isolates_failures() {
    let dir = fixture_dir();
    let config = config(dir.path());
    let ingested = ingest(dir.path(), config.widths(), "out.csv").unwrap();

    let report = &ingested.report;
    assert_eq!(report.loaded.len(), 4);
    assert_eq!(report.failed_files(), 1);
    assert_eq!(report.skipped_rows(), 1);
    assert_eq!(report.noise_skipped, 1);
    assert!(report
        .issues
        .iter()
        .any(|i| matches!(i.error, TriageError::UnsupportedLayout { .. })));

    let rows = ingested.rows.rows();
    assert_eq!(rows[0], Row::Header);
    assert_eq!(rows[1], Row::Separator);
    assert_eq!(rows.last(), Some(&Row::Blank));
    assert_eq!(ingested.rows.data_len(), 5);
}

#[test]
fn test_round_trip_flips_sign_and_reformats_date() {
    let dir = fixture_dir();
    let config = config(dir.path());
    let ingested = ingest(dir.path(), config.widths(), "out.csv").unwrap();

    let mut triage = Triage::new(ingested.rows, ingested.widths);
    assert_eq!(triage.approve_all().unwrap(), 5);

    let canonical: HashMap<String, Decimal> = triage
        .approved()
        .data_rows()
        .map(|r| (r.description().trim().to_string(), r.amount()))
        .collect();

    let dates: Vec<NaiveDate> = triage.approved().data_rows().map(|r| r.date()).collect();
    let mut sorted = dates.clone();
    sorted.sort();
    assert_eq!(dates, sorted);

    let path = config.output_path();
    assert!(!needs_confirmation(&path));
    assert_eq!(export(triage.approved(), &path, Overwrite::Refuse).unwrap(), 5);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(&path)
        .unwrap();
    let mut seen = 0;
    for record in reader.records() {
        let record = record.unwrap();
        assert_eq!(record.len(), 7);

        let internal = canonical[&record[0].to_string()];
        let exported = Decimal::from_str(&record[4]).unwrap();
        assert_eq!(exported, -internal);

        NaiveDate::parse_from_str(&record[1], "%m/%d/%Y").unwrap();
        assert_eq!(record[1].len(), 10);
        assert_eq!(&record[3], "cc");
        seen += 1;
    }
    assert_eq!(seen, 5);
}

#[test]
fn test_review_session_and_gift_export() {
    let dir = fixture_dir();
    let config = config(dir.path());
    let ingested = ingest(dir.path(), config.widths(), "out.csv").unwrap();
    let mut triage = Triage::new(ingested.rows, ingested.widths);

    let gift = triage
        .unsorted()
        .rows()
        .iter()
        .position(|r| {
            r.as_data()
                .map_or(false, |d| d.description().trim() == "GIFT SHOP")
        })
        .unwrap();
    assert_eq!(triage.move_rows(&[0, 1, gift], Direction::ToApproved).unwrap(), 1);
    assert_eq!(triage.change_category(&[0], "Monthly Gift").unwrap(), 1);

    let path = config.output_path();
    export(triage.approved(), &path, Overwrite::Refuse).unwrap();
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "GIFT SHOP,03/05/2023,Monthly Gift,cc,25.00,,\n"
    );

    // a second export must be confirmed
    let err = export(triage.approved(), &path, Overwrite::Refuse).unwrap_err();
    assert!(matches!(err, TriageError::OverwriteNotConfirmed { .. }));

    // the output file is not picked up as input on the next run
    let again = ingest(dir.path(), config.widths(), "out.csv").unwrap();
    assert_eq!(again.report.loaded.len(), 4);

    let lines = triage.rendered(ListId::Approved);
    assert!(lines[0].starts_with("2023-03-05 | GIFT SHOP"));
    assert_eq!(lines.last().map(String::as_str), Some(""));
}
