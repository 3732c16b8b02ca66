// Error kinds for ingestion, triage and export
// Row-level kinds are collected into an IngestReport, file-level kinds fail one file,
// export kinds fail one export call. Nothing here aborts already-loaded data.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    /// Header row does not match any known bank layout
    #[error("unsupported CSV layout, header was '{header}'")]
    UnsupportedLayout { header: String },

    #[error("malformed date '{value}', expected format {expected}")]
    MalformedDate { value: String, expected: &'static str },

    #[error("malformed amount '{value}'")]
    MalformedAmount { value: String },

    /// Data row is too short for the columns its layout reads
    #[error("row has {found} columns, layout needs at least {expected}")]
    MalformedRow { expected: usize, found: usize },

    #[error("failed to ingest {}: {source}", path.display())]
    Ingestion {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{} already exists and overwriting was not confirmed", path.display())]
    OverwriteNotConfirmed { path: PathBuf },

    /// Caller bug: index outside the list it was taken from
    #[error("selection index {index} is out of bounds for a list of {len} rows")]
    InvalidSelection { index: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, TriageError>;
