//! Core engine for browsing the physical layout of Parquet files.
//!
//! This crate provides the pieces a Parquet browser needs below its
//! presentation layer:
//!
//! - A reader for the compact-binary page headers inside a column chunk
//!   (`page_header` module).
//! - A page-index builder that walks a chunk header by header and records
//!   one descriptor per page (`page_index` module).
//! - Resolution of dotted column paths against the flat, depth-first footer
//!   schema, plus type formatting (`schema` module).
//! - A type-aware decoder that turns raw statistics and values into bounded
//!   display strings (`decode` module).
//! - Extraction of exactly one page's values from a full column read
//!   (`content` module).
//! - A file handle tying these to the `parquet` crate, and serializable
//!   summaries for presentation layers (`file` and `summary` modules).
//!
//! Every component is synchronous. Reads that need a seek position open
//! their own file handle, so callers may share a [`ParquetFile`] across
//! threads of their own.
#![deny(missing_docs)]
pub mod content;
pub mod decode;
pub mod error;
pub mod file;
pub mod page_header;
pub mod page_index;
pub mod schema;
pub mod summary;

pub use error::{InspectError, InspectResult};
pub use file::ParquetFile;
pub use page_index::{PageDescriptor, PageIndex, PageIndexOptions, PageKind};
