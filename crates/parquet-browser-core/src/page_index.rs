//! Page-level index of a column chunk, rebuilt from raw page headers.
//!
//! The footer only records where a column chunk starts and how many bytes it
//! spans. [`build_page_index`] walks that byte range header by header and
//! records one [`PageDescriptor`] per page, without decompressing any page
//! body.

use std::fmt;
use std::io::{Read, Seek};

use log::{debug, warn};
use parquet::file::metadata::ColumnChunkMetaData;
use serde::{Deserialize, Serialize};

use crate::page_header::{RawPageHeader, RawStatistics, read_page_header};

/// Hard ceiling on the number of pages read for one chunk.
pub const DEFAULT_MAX_PAGES: usize = 10_000;

/// The kind of a Parquet page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageKind {
    /// A v1 data page.
    DataPage,
    /// A v2 data page.
    DataPageV2,
    /// A dictionary page.
    DictionaryPage,
    /// An index page.
    IndexPage,
}

impl PageKind {
    /// Map a page-type id from the header to its kind.
    pub fn from_type_id(id: i32) -> Option<Self> {
        match id {
            0 => Some(PageKind::DataPage),
            1 => Some(PageKind::IndexPage),
            2 => Some(PageKind::DictionaryPage),
            3 => Some(PageKind::DataPageV2),
            _ => None,
        }
    }

    /// True for the kinds that carry column values.
    pub fn is_data(self) -> bool {
        matches!(self, PageKind::DataPage | PageKind::DataPageV2)
    }

    /// Canonical upper-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            PageKind::DataPage => "DATA_PAGE",
            PageKind::DataPageV2 => "DATA_PAGE_V2",
            PageKind::DictionaryPage => "DICTIONARY_PAGE",
            PageKind::IndexPage => "INDEX_PAGE",
        }
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of a Parquet encoding id.
pub fn encoding_name(id: i32) -> String {
    let name = match id {
        0 => "PLAIN",
        1 => "GROUP_VAR_INT",
        2 => "PLAIN_DICTIONARY",
        3 => "RLE",
        4 => "BIT_PACKED",
        5 => "DELTA_BINARY_PACKED",
        6 => "DELTA_LENGTH_BYTE_ARRAY",
        7 => "DELTA_BYTE_ARRAY",
        8 => "RLE_DICTIONARY",
        9 => "BYTE_STREAM_SPLIT",
        other => return format!("UNKNOWN({other})"),
    };
    name.to_string()
}

/// Min/max/null-count statistics of one page, as raw bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageStatistics {
    /// Raw min value.
    pub min: Option<Vec<u8>>,
    /// Raw max value.
    pub max: Option<Vec<u8>>,
    /// Null count, copied verbatim.
    pub null_count: Option<i64>,
}

impl From<RawStatistics> for PageStatistics {
    fn from(raw: RawStatistics) -> Self {
        // min_value/max_value supersede the deprecated min/max, per bound.
        PageStatistics {
            min: raw.min_value.or(raw.min),
            max: raw.max_value.or(raw.max),
            null_count: raw.null_count,
        }
    }
}

/// Location and header facts of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDescriptor {
    /// Absolute file offset of the page header.
    pub offset: i64,
    /// Encoded length of the page header in bytes.
    pub header_len: u64,
    /// Page kind.
    pub kind: PageKind,
    /// Compressed body size in bytes.
    pub compressed_size: i32,
    /// Uncompressed body size in bytes.
    pub uncompressed_size: i32,
    /// Physical value count (levels, including nulls). Zero for index pages.
    pub num_values: i64,
    /// Value encoding name, `None` for index pages.
    pub encoding: Option<String>,
    /// Definition-level encoding name (data pages only).
    pub def_level_encoding: Option<String>,
    /// Repetition-level encoding name (data pages only).
    pub rep_level_encoding: Option<String>,
    /// Page statistics (data pages only).
    pub statistics: Option<PageStatistics>,
    /// Whether the header carries a CRC.
    pub has_checksum: bool,
}

impl PageDescriptor {
    fn from_header(offset: i64, header_len: u64, kind: PageKind, header: RawPageHeader) -> Self {
        let mut page = PageDescriptor {
            offset,
            header_len,
            kind,
            compressed_size: header.compressed_page_size,
            uncompressed_size: header.uncompressed_page_size,
            num_values: 0,
            encoding: None,
            def_level_encoding: None,
            rep_level_encoding: None,
            statistics: None,
            has_checksum: header.crc.is_some(),
        };

        match kind {
            PageKind::DataPage => {
                if let Some(data) = header.data_page {
                    page.num_values = i64::from(data.num_values);
                    page.encoding = Some(encoding_name(data.encoding));
                    page.def_level_encoding = Some(encoding_name(data.definition_level_encoding));
                    page.rep_level_encoding = Some(encoding_name(data.repetition_level_encoding));
                    page.statistics = data.statistics.map(PageStatistics::from);
                }
            }
            PageKind::DataPageV2 => {
                if let Some(data) = header.data_page_v2 {
                    page.num_values = i64::from(data.num_values);
                    page.encoding = Some(encoding_name(data.encoding));
                    // v2 levels are always RLE and stored uncompressed.
                    page.def_level_encoding = Some(encoding_name(3));
                    page.rep_level_encoding = Some(encoding_name(3));
                    page.statistics = data.statistics.map(PageStatistics::from);
                }
            }
            PageKind::DictionaryPage => {
                if let Some(dict) = header.dictionary_page {
                    page.num_values = i64::from(dict.num_values);
                    page.encoding = Some(encoding_name(dict.encoding));
                }
            }
            PageKind::IndexPage => {}
        }
        page
    }

    /// True when the header carried statistics.
    pub fn has_statistics(&self) -> bool {
        self.statistics.is_some()
    }

    /// Offset of the byte following this page's body.
    pub fn end_offset(&self) -> i64 {
        self.offset + self.header_len as i64 + i64::from(self.compressed_size)
    }
}

/// Byte range and value count of a column chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLayout {
    /// Offset of the dictionary page, when the chunk declares one.
    pub dictionary_page_offset: Option<i64>,
    /// Offset of the first data page.
    pub data_page_offset: i64,
    /// Total compressed size of the chunk, headers included.
    pub total_compressed_size: i64,
    /// Declared physical value count of the chunk.
    pub num_values: i64,
}

impl ChunkLayout {
    /// Layout of a chunk described by footer metadata.
    pub fn from_metadata(col: &ColumnChunkMetaData) -> Self {
        ChunkLayout {
            dictionary_page_offset: col.dictionary_page_offset(),
            data_page_offset: col.data_page_offset(),
            total_compressed_size: col.compressed_size(),
            num_values: col.num_values(),
        }
    }

    /// First byte of the chunk.
    ///
    /// Some writers store a dictionary offset of 0 for chunks without a
    /// dictionary; such an offset cannot precede the data pages and is
    /// ignored.
    pub fn start_offset(&self) -> i64 {
        match self.dictionary_page_offset {
            Some(dict) if dict > 0 => dict,
            _ => self.data_page_offset,
        }
    }

    /// One past the last byte of the chunk.
    pub fn end_offset(&self) -> i64 {
        self.start_offset().saturating_add(self.total_compressed_size)
    }
}

/// Tuning knobs for [`build_page_index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageIndexOptions {
    /// Stop after this many pages.
    pub max_pages: usize,
}

impl Default for PageIndexOptions {
    fn default() -> Self {
        PageIndexOptions {
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// Why page-index construction stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageIndexEnd {
    /// Data pages accounted for every declared value.
    AllValuesRead,
    /// The walk reached the end of the chunk's byte range.
    ChunkEnd,
    /// A header failed to decode; pages before it remain valid.
    HeaderDecodeFailure {
        /// Offset of the header that failed.
        offset: i64,
        /// Rendered cause.
        message: String,
    },
    /// The page ceiling was reached.
    PageLimit,
    /// A page header reported a size that would not move the walk forward.
    NoProgress {
        /// Offset of the offending page.
        offset: i64,
    },
}

/// Ordered pages of one column chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageIndex {
    /// Pages in file order.
    pub pages: Vec<PageDescriptor>,
    /// Why the walk stopped.
    pub end: PageIndexEnd,
}

impl PageIndex {
    /// Sum of value counts over data pages.
    pub fn data_value_count(&self) -> i64 {
        self.pages
            .iter()
            .filter(|p| p.kind.is_data())
            .map(|p| p.num_values)
            .sum()
    }

    /// True unless a header failed to decode.
    pub fn is_complete(&self) -> bool {
        !matches!(self.end, PageIndexEnd::HeaderDecodeFailure { .. })
    }
}

/// Walk the pages of the chunk described by `layout`.
///
/// Never fails: a header that cannot be decoded ends the walk and is
/// reported through [`PageIndex::end`], keeping every page read so far.
pub fn build_page_index<R: Read + Seek>(
    source: &mut R,
    layout: &ChunkLayout,
    options: &PageIndexOptions,
) -> PageIndex {
    let end_offset = layout.end_offset();
    let mut offset = layout.start_offset();
    let mut pages: Vec<PageDescriptor> = Vec::new();
    let mut values_seen: i64 = 0;

    let end = loop {
        if values_seen >= layout.num_values {
            break PageIndexEnd::AllValuesRead;
        }
        if offset >= end_offset {
            break PageIndexEnd::ChunkEnd;
        }
        if pages.len() >= options.max_pages {
            warn!(
                "page ceiling of {} reached at offset {offset}; remaining pages skipped",
                options.max_pages
            );
            break PageIndexEnd::PageLimit;
        }

        let (header, header_len) = match read_page_header(source, offset) {
            Ok(read) => read,
            Err(err) => {
                warn!("stopping page walk: {err}");
                break PageIndexEnd::HeaderDecodeFailure {
                    offset,
                    message: err.to_string(),
                };
            }
        };

        let Some(kind) = PageKind::from_type_id(header.page_type) else {
            warn!("unknown page type {} at offset {offset}", header.page_type);
            break PageIndexEnd::HeaderDecodeFailure {
                offset,
                message: format!("unknown page type {}", header.page_type),
            };
        };

        let page = PageDescriptor::from_header(offset, header_len, kind, header);
        let next = page.end_offset();
        if page.kind.is_data() {
            values_seen += page.num_values;
        }
        pages.push(page);

        if next <= offset {
            warn!("page at offset {offset} does not advance the walk (next={next})");
            break PageIndexEnd::NoProgress { offset };
        }
        offset = next;
    };

    debug!(
        "page walk finished: {} pages, {values_seen}/{} values, end={end:?}",
        pages.len(),
        layout.num_values
    );
    PageIndex { pages, end }
}
