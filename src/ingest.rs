// Directory ingestion - builds the unsorted list from every bank export in a folder
// Failures are isolated: a bad row skips the row, a bad file skips the file,
// and both end up in the IngestReport shown to the user.

use crate::error::{Result, TriageError};
use crate::parser::{detect_layout, format_row, header_signature, SourceLayout};
use crate::rows::{DisplayWidths, Row, RowList};
use csv::ReaderBuilder;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Rows whose text contains any of these (lowercased) are card payments, not spending
const NOISE_MARKERS: &[&str] = &["autopay", "automatic payment"];

// ============================================================================
// REPORT
// ============================================================================

/// One problem found while ingesting
#[derive(Debug)]
pub struct IngestIssue {
    pub path: PathBuf,
    /// Line of the offending row; `None` when the whole file was rejected
    pub line: Option<u64>,
    pub error: TriageError,
}

impl IngestIssue {
    pub fn is_file_level(&self) -> bool {
        self.line.is_none()
    }
}

impl fmt::Display for IngestIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| self.path.to_string_lossy());
        match self.line {
            Some(line) => write!(f, "{} line {}: {}", name, line, self.error),
            None => write!(f, "{}: {}", name, self.error),
        }
    }
}

/// A file that was loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFile {
    pub path: PathBuf,
    pub layout: SourceLayout,
    pub rows: usize,
}

/// Per-run summary of what was loaded, skipped and rejected
#[derive(Debug, Default)]
pub struct IngestReport {
    pub loaded: Vec<LoadedFile>,
    pub issues: Vec<IngestIssue>,
    /// Autopay and empty rows dropped on purpose
    pub noise_skipped: usize,
}

impl IngestReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn failed_files(&self) -> usize {
        self.issues.iter().filter(|i| i.is_file_level()).count()
    }

    pub fn skipped_rows(&self) -> usize {
        self.issues.iter().filter(|i| !i.is_file_level()).count()
    }

    pub fn total_rows(&self) -> usize {
        self.loaded.iter().map(|f| f.rows).sum()
    }

    /// One-line summary for status bars and logs
    pub fn summary(&self) -> String {
        format!(
            "{} rows from {} files, {} rows skipped, {} files failed",
            self.total_rows(),
            self.loaded.len(),
            self.skipped_rows(),
            self.failed_files()
        )
    }
}

/// Result of ingesting a directory
#[derive(Debug)]
pub struct Ingested {
    pub rows: RowList,
    pub widths: DisplayWidths,
    pub report: IngestReport,
}

// ============================================================================
// DISCOVERY
// ============================================================================

/// List the CSV files of `dir` (extension matched case-insensitively), minus
/// `exclude`, sorted and without duplicates.
pub fn discover_csv_files(dir: &Path, exclude: &str) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| TriageError::Ingestion {
        path: dir.to_path_buf(),
        source: e.into(),
    })?;

    let mut files = BTreeSet::new();
    for entry in entries {
        let path = entry
            .map_err(|e| TriageError::Ingestion {
                path: dir.to_path_buf(),
                source: e.into(),
            })?
            .path();

        if !path.is_file() {
            continue;
        }
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if !is_csv {
            continue;
        }
        let is_excluded = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n == exclude)
            .unwrap_or(false);
        if is_excluded {
            debug!(path = %path.display(), "skipping output file");
            continue;
        }
        files.insert(path);
    }

    Ok(files.into_iter().collect())
}

fn is_noise(fields: &[&str]) -> bool {
    if fields.iter().all(|f| f.trim().is_empty()) {
        return true;
    }
    let text = fields.join(" ").to_lowercase();
    NOISE_MARKERS.iter().any(|marker| text.contains(marker))
}

// ============================================================================
// INGESTION
// ============================================================================

struct FileRows {
    layout: SourceLayout,
    rows: Vec<Row>,
    issues: Vec<IngestIssue>,
    noise: usize,
}

fn ingest_file(path: &Path, widths: DisplayWidths) -> Result<FileRows> {
    let ingestion_error = |source: csv::Error| TriageError::Ingestion {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(ingestion_error)?;

    let header = header_signature(reader.headers().map_err(ingestion_error)?.iter());
    let layout = detect_layout(&header)?;
    debug!(path = %path.display(), layout = layout.name(), "detected layout");

    let mut out = FileRows {
        layout,
        rows: Vec::new(),
        issues: Vec::new(),
        noise: 0,
    };

    for result in reader.records() {
        let record = result.map_err(ingestion_error)?;
        let fields: Vec<&str> = record.iter().collect();

        if is_noise(&fields) {
            out.noise += 1;
            continue;
        }

        match format_row(&fields, layout, widths) {
            Ok(row) => out.rows.push(Row::Data(row)),
            Err(error) => {
                let line = record.position().map(|p| p.line());
                warn!(
                    path = %path.display(),
                    line = line.unwrap_or_default(),
                    "skipping row: {}", error
                );
                out.issues.push(IngestIssue {
                    path: path.to_path_buf(),
                    line,
                    error,
                });
            }
        }
    }

    Ok(out)
}

/// Ingest every CSV export in `dir` into one unsorted list.
///
/// The list starts with a header and a separator, has a separator after each
/// loaded file and ends with a blank row. Only an unreadable directory is an
/// error here; per-file and per-row problems go into the report.
pub fn ingest(dir: &Path, widths: DisplayWidths, exclude: &str) -> Result<Ingested> {
    let files = discover_csv_files(dir, exclude)?;
    info!(dir = %dir.display(), files = files.len(), "ingesting");

    let mut rows = RowList::new();
    rows.push(Row::Header);
    rows.push(Row::Separator);
    let mut report = IngestReport::default();

    for path in files {
        match ingest_file(&path, widths) {
            Ok(file) => {
                debug!(
                    path = %path.display(),
                    rows = file.rows.len(),
                    noise = file.noise,
                    "loaded file"
                );
                report.loaded.push(LoadedFile {
                    path: path.clone(),
                    layout: file.layout,
                    rows: file.rows.len(),
                });
                report.noise_skipped += file.noise;
                report.issues.extend(file.issues);
                for row in file.rows {
                    rows.push(row);
                }
                rows.push(Row::Separator);
            }
            Err(error) => {
                warn!(path = %path.display(), "skipping file: {}", error);
                report.issues.push(IngestIssue {
                    path,
                    line: None,
                    error,
                });
            }
        }
    }

    rows.push(Row::Blank);
    info!("{}", report.summary());

    Ok(Ingested {
        rows,
        widths,
        report,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn widths() -> DisplayWidths {
        DisplayWidths::new(20, 10)
    }

    #[test]
    fn test_discover_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        write(&dir, "b.csv", "");
        write(&dir, "a.CSV", "");
        write(&dir, "notes.txt", "");
        write(&dir, "out.csv", "");
        fs::create_dir(dir.path().join("nested.csv")).unwrap();

        let files = discover_csv_files(dir.path(), "out.csv").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.CSV", "b.csv"]);
    }

    #[test]
    fn test_discover_missing_dir() {
        let dir = TempDir::new().unwrap();
        let err = discover_csv_files(&dir.path().join("missing"), "out.csv").unwrap_err();
        assert!(matches!(err, TriageError::Ingestion { .. }));
    }

    #[test]
    fn test_is_noise() {
        assert!(is_noise(&["03/01/2023", "AUTOPAY THANK YOU", "100"]));
        assert!(is_noise(&["03/01/2023", "Automatic Payment - Thank", "100"]));
        assert!(is_noise(&["", "", ""]));
        assert!(!is_noise(&["03/01/2023", "COFFEE", "4.50"]));
    }

    #[test]
    fn test_ingest_builds_framed_list() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "a_basic.csv",
            "Date,Description,Amount\n\
             03/02/2023,BAKERY,3.00\n\
             03/01/2023,AUTOPAY PAYMENT,-500.00\n\
             03/01/2023,COFFEE SHOP,-4.50\n",
        );
        write(
            &dir,
            "b_chase.csv",
            "Transaction Date,Post Date,Description,Category,Type,Amount,Memo\n\
             04/10/2023,04/11/2023,BOOKSTORE,Shopping,Sale,-19.99,\n",
        );

        let ingested = ingest(dir.path(), widths(), "out.csv").unwrap();
        let rows = ingested.rows.rows();

        assert_eq!(rows.len(), 2 + 2 + 1 + 1 + 1 + 1);
        assert_eq!(rows[0], Row::Header);
        assert_eq!(rows[1], Row::Separator);
        assert_eq!(rows[2].as_data().unwrap().description().trim_end(), "BAKERY");
        assert_eq!(rows[3].as_data().unwrap().amount_text(), "4.50");
        assert_eq!(rows[4], Row::Separator);
        assert_eq!(rows[5].as_data().unwrap().description().trim_end(), "BOOKSTORE");
        assert_eq!(rows[6], Row::Separator);
        assert_eq!(rows[7], Row::Blank);

        assert!(ingested.report.is_clean());
        assert_eq!(ingested.report.noise_skipped, 1);
        assert_eq!(ingested.report.total_rows(), 3);
        assert_eq!(ingested.report.loaded[1].layout, SourceLayout::ChaseCard);
        assert_eq!(ingested.widths, widths());
    }

    #[test]
    fn test_unsupported_file_is_isolated() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a_unknown.csv", "Foo,Bar\n1,2\n");
        write(
            &dir,
            "b_basic.csv",
            "Date,Description,Amount\n03/01/2023,COFFEE SHOP,-4.50\n",
        );

        let ingested = ingest(dir.path(), widths(), "out.csv").unwrap();
        assert_eq!(ingested.rows.data_len(), 1);
        assert_eq!(ingested.report.failed_files(), 1);
        let issue = &ingested.report.issues[0];
        assert!(issue.is_file_level());
        assert!(matches!(issue.error, TriageError::UnsupportedLayout { .. }));
        assert!(issue.to_string().starts_with("a_unknown.csv: "));
    }

    #[test]
    fn test_bad_rows_are_skipped_and_reported() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "basic.csv",
            "Date,Description,Amount\n\
             2023-03-01,ISO DATE,1.00\n\
             03/02/2023,NO AMOUNT,abc\n\
             03/03/2023,SHORT\n\
             03/04/2023,GOOD,2.00\n",
        );

        let ingested = ingest(dir.path(), widths(), "out.csv").unwrap();
        assert_eq!(ingested.rows.data_len(), 1);
        assert_eq!(ingested.report.skipped_rows(), 3);

        let issues = &ingested.report.issues;
        assert!(matches!(issues[0].error, TriageError::MalformedDate { .. }));
        assert_eq!(issues[0].line, Some(2));
        assert!(matches!(issues[1].error, TriageError::MalformedAmount { .. }));
        assert!(matches!(issues[2].error, TriageError::MalformedRow { .. }));
        assert_eq!(issues[2].to_string().split(':').next(), Some("basic.csv line 4"));
    }

    #[test]
    fn test_output_file_not_ingested() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "out.csv",
            "Date,Description,Amount\n03/01/2023,ALREADY EXPORTED,1.00\n",
        );

        let ingested = ingest(dir.path(), widths(), "out.csv").unwrap();
        assert_eq!(ingested.rows.data_len(), 0);
        assert_eq!(ingested.rows.rows(), &[Row::Header, Row::Separator, Row::Blank]);
    }
}
