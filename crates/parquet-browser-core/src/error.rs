//! Error types shared by the inspection components.
//!
//! Only failures a caller has to act on live here. A malformed page header
//! ends page-index construction (see [`crate::page_index::PageIndexEnd`]) and
//! a short statistics value renders inline (see [`crate::decode`]); neither
//! surfaces as an [`InspectError`].

use std::io;

use parquet::errors::ParquetError;
use snafu::{Backtrace, prelude::*};

use crate::page_index::PageKind;

/// General result type used by the inspection API.
pub type InspectResult<T> = Result<T, InspectError>;

/// Errors that can occur while inspecting a Parquet file.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum InspectError {
    /// A row-group, column or page index is out of range.
    #[snafu(display("Invalid {what} index {index} (valid range is 0..{len})"))]
    InvalidIndex {
        /// Which kind of index was rejected ("row group", "column", "page").
        what: &'static str,
        /// The rejected index.
        index: usize,
        /// The number of valid entries.
        len: usize,
    },

    /// Content was requested for a page that does not carry column values.
    #[snafu(display("Page kind {kind} does not carry column values"))]
    UnsupportedPageKind {
        /// Kind of the requested page.
        kind: PageKind,
    },

    /// The decode library failed a full-column read.
    #[snafu(display("Failed to read column {column} values: {source}"))]
    ColumnRead {
        /// Leaf column index that was being read.
        column: usize,
        /// Underlying parquet error, reported verbatim.
        source: ParquetError,
        /// Diagnostic backtrace for this error.
        backtrace: Backtrace,
    },

    /// The file could not be opened.
    #[snafu(display("Failed to open {path}: {source}"))]
    OpenFile {
        /// The path that failed to open.
        path: String,
        /// Underlying I/O error.
        source: io::Error,
        /// Diagnostic backtrace for this error.
        backtrace: Backtrace,
    },

    /// The footer could not be parsed.
    #[snafu(display("Error reading Parquet metadata at {path}: {source}"))]
    ParquetOpen {
        /// The path whose footer failed to parse.
        path: String,
        /// Underlying parquet error.
        source: ParquetError,
        /// Diagnostic backtrace for this error.
        backtrace: Backtrace,
    },
}

/// Check `index` against `len`, producing [`InspectError::InvalidIndex`] on overflow.
pub(crate) fn check_index(what: &'static str, index: usize, len: usize) -> InspectResult<()> {
    ensure!(index < len, InvalidIndexSnafu { what, index, len });
    Ok(())
}
