// Ledger Triage - Core Library
// Bank CSV normalization, two-list triage and budget-sheet export,
// shared by the review TUI and the headless commands.

pub mod config;
pub mod error;
pub mod export;
pub mod ingest;
pub mod parser;
pub mod rows;
pub mod transfer;

// Re-export commonly used types
pub use config::Config;
pub use error::{Result, TriageError};
pub use export::{export, export_record, needs_confirmation, Overwrite};
pub use ingest::{discover_csv_files, ingest, IngestIssue, IngestReport, Ingested, LoadedFile};
pub use parser::{detect_layout, format_row, LayoutRule, SourceLayout, LAYOUTS};
pub use rows::{CanonicalRow, DisplayWidths, Row, RowList};
pub use transfer::{Command, Direction, ListId, Triage};
