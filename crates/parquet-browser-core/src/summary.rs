//! Serializable summaries handed to presentation layers.
//!
//! These shapes are what a UI or the CLI's `--json` output sees. They carry
//! display strings (already decoded) next to the raw numbers, so consumers
//! need no Parquet knowledge of their own.

use log::debug;
use parquet::basic::{Compression, Type as PhysicalType};
use parquet::file::metadata::{ColumnChunkMetaData, ParquetMetaData, RowGroupMetaData};
use serde::{Deserialize, Serialize};

use crate::decode::{EMPTY_DISPLAY, format_statistic};
use crate::page_index::{ChunkLayout, PageDescriptor, PageKind};
use crate::schema::SchemaLeaf;

/// File-level facts from the footer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOverview {
    /// Format version.
    pub version: i32,
    /// Writer identification, when recorded.
    pub created_by: Option<String>,
    /// Total rows across row groups.
    pub num_rows: i64,
    /// Number of row groups.
    pub num_row_groups: usize,
    /// Number of leaf columns.
    pub num_columns: usize,
}

impl FileOverview {
    /// Overview of a parsed footer.
    pub fn from_metadata(metadata: &ParquetMetaData) -> Self {
        let file = metadata.file_metadata();
        FileOverview {
            version: file.version(),
            created_by: file.created_by().map(str::to_string),
            num_rows: file.num_rows(),
            num_row_groups: metadata.num_row_groups(),
            num_columns: file.schema_descr().num_columns(),
        }
    }
}

/// One row group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowGroupSummary {
    /// Position in the file.
    pub index: usize,
    /// Rows in the group.
    pub num_rows: i64,
    /// Uncompressed bytes of all column data.
    pub total_byte_size: i64,
    /// Compressed bytes of all column chunks.
    pub compressed_size: i64,
    /// Column chunks in the group.
    pub num_columns: usize,
}

impl RowGroupSummary {
    /// Summary of row group `index`.
    pub fn from_metadata(index: usize, rg: &RowGroupMetaData) -> Self {
        RowGroupSummary {
            index,
            num_rows: rg.num_rows(),
            total_byte_size: rg.total_byte_size(),
            compressed_size: rg.compressed_size(),
            num_columns: rg.num_columns(),
        }
    }
}

/// One column chunk, with chunk statistics decoded for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnChunkSummary {
    /// Dotted path in the schema.
    pub path: String,
    /// Physical type name, e.g. `INT64`.
    pub physical_type: String,
    /// Compression codec name, e.g. `SNAPPY`.
    pub codec: String,
    /// Formatted logical type, `-` when unset.
    pub logical_type: String,
    /// Formatted converted type, `-` when unset.
    pub converted_type: String,
    /// Declared physical value count.
    pub num_values: i64,
    /// Compressed bytes, page headers included.
    pub compressed_size: i64,
    /// Uncompressed bytes.
    pub uncompressed_size: i64,
    /// Offset of the dictionary page, if any.
    pub dictionary_page_offset: Option<i64>,
    /// Offset of the first data page.
    pub data_page_offset: i64,
    /// Decoded chunk minimum, `-` when absent.
    pub min_value: String,
    /// Decoded chunk maximum, `-` when absent.
    pub max_value: String,
    /// Null count, when recorded.
    pub null_count: Option<u64>,
}

impl ColumnChunkSummary {
    /// Summarize a chunk, decoding its statistics against `leaf`.
    pub fn from_metadata(col: &ColumnChunkMetaData, leaf: Option<&SchemaLeaf>) -> Self {
        let physical = col.column_type();
        let stats = col.statistics();
        let render = |bytes: Option<&[u8]>| format_statistic(bytes, physical, leaf);
        ColumnChunkSummary {
            path: col.column_path().parts().join("."),
            physical_type: physical_type_name(physical).to_string(),
            codec: codec_name(col.compression()).to_string(),
            logical_type: leaf
                .map_or_else(|| EMPTY_DISPLAY.to_string(), |l| l.logical_type_display()),
            converted_type: leaf
                .map_or_else(|| EMPTY_DISPLAY.to_string(), |l| l.converted_type_display()),
            num_values: col.num_values(),
            compressed_size: col.compressed_size(),
            uncompressed_size: col.uncompressed_size(),
            dictionary_page_offset: col.dictionary_page_offset(),
            data_page_offset: col.data_page_offset(),
            min_value: render(stats.and_then(|s| s.min_bytes_opt())),
            max_value: render(stats.and_then(|s| s.max_bytes_opt())),
            null_count: stats.and_then(|s| s.null_count_opt()),
        }
    }

    /// Physical type named by this summary.
    ///
    /// Unrecognized names fall back to BYTE_ARRAY. The fallback keeps a
    /// summary from another producer usable but may misrender exotic types.
    pub fn physical(&self) -> PhysicalType {
        physical_type_from_name(&self.physical_type).unwrap_or_else(|| {
            debug!(
                "unknown physical type {:?} for {}, using BYTE_ARRAY",
                self.physical_type, self.path
            );
            PhysicalType::BYTE_ARRAY
        })
    }

    /// Codec named by this summary; unrecognized names fall back to
    /// UNCOMPRESSED.
    pub fn compression(&self) -> Compression {
        codec_from_name(&self.codec).unwrap_or_else(|| {
            debug!(
                "unknown codec {:?} for {}, using UNCOMPRESSED",
                self.codec, self.path
            );
            Compression::UNCOMPRESSED
        })
    }

    /// Byte layout for rebuilding the page index from this summary alone.
    pub fn layout(&self) -> ChunkLayout {
        ChunkLayout {
            dictionary_page_offset: self.dictionary_page_offset,
            data_page_offset: self.data_page_offset,
            total_compressed_size: self.compressed_size,
            num_values: self.num_values,
        }
    }
}

/// Name of a physical type.
pub fn physical_type_name(physical: PhysicalType) -> &'static str {
    match physical {
        PhysicalType::BOOLEAN => "BOOLEAN",
        PhysicalType::INT32 => "INT32",
        PhysicalType::INT64 => "INT64",
        PhysicalType::INT96 => "INT96",
        PhysicalType::FLOAT => "FLOAT",
        PhysicalType::DOUBLE => "DOUBLE",
        PhysicalType::BYTE_ARRAY => "BYTE_ARRAY",
        PhysicalType::FIXED_LEN_BYTE_ARRAY => "FIXED_LEN_BYTE_ARRAY",
    }
}

fn physical_type_from_name(name: &str) -> Option<PhysicalType> {
    Some(match name.to_ascii_uppercase().as_str() {
        "BOOLEAN" => PhysicalType::BOOLEAN,
        "INT32" => PhysicalType::INT32,
        "INT64" => PhysicalType::INT64,
        "INT96" => PhysicalType::INT96,
        "FLOAT" => PhysicalType::FLOAT,
        "DOUBLE" => PhysicalType::DOUBLE,
        "BYTE_ARRAY" => PhysicalType::BYTE_ARRAY,
        "FIXED_LEN_BYTE_ARRAY" => PhysicalType::FIXED_LEN_BYTE_ARRAY,
        _ => return None,
    })
}

/// Name of a codec, without its level.
pub fn codec_name(codec: Compression) -> &'static str {
    match codec {
        Compression::UNCOMPRESSED => "UNCOMPRESSED",
        Compression::SNAPPY => "SNAPPY",
        Compression::GZIP(_) => "GZIP",
        Compression::LZO => "LZO",
        Compression::BROTLI(_) => "BROTLI",
        Compression::LZ4 => "LZ4",
        Compression::ZSTD(_) => "ZSTD",
        Compression::LZ4_RAW => "LZ4_RAW",
    }
}

fn codec_from_name(name: &str) -> Option<Compression> {
    Some(match name.to_ascii_uppercase().as_str() {
        "UNCOMPRESSED" => Compression::UNCOMPRESSED,
        "SNAPPY" => Compression::SNAPPY,
        "GZIP" => Compression::GZIP(Default::default()),
        "LZO" => Compression::LZO,
        "BROTLI" => Compression::BROTLI(Default::default()),
        "LZ4" => Compression::LZ4,
        "ZSTD" => Compression::ZSTD(Default::default()),
        "LZ4_RAW" => Compression::LZ4_RAW,
        _ => return None,
    })
}

/// One page, in the shape presentation layers consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    /// Offset of the page header.
    pub offset: i64,
    /// Page kind.
    pub kind: PageKind,
    /// Compressed body size.
    pub compressed_size: i32,
    /// Uncompressed body size.
    pub uncompressed_size: i32,
    /// Physical values in the page.
    pub num_values: i64,
    /// Value encoding, `-` for index pages.
    pub encoding: String,
    /// Definition-level encoding, `-` when not applicable.
    pub def_level_encoding: String,
    /// Repetition-level encoding, `-` when not applicable.
    pub rep_level_encoding: String,
    /// Whether the header carried statistics.
    pub has_statistics: bool,
    /// Whether the header carried a CRC.
    pub has_checksum: bool,
    /// Decoded page minimum, `-` when absent.
    pub min_value: String,
    /// Decoded page maximum, `-` when absent.
    pub max_value: String,
    /// Null count, when recorded.
    pub null_count: Option<i64>,
}

impl PageSummary {
    /// Render `page`, decoding its statistics as `physical` values of `leaf`.
    pub fn from_descriptor(
        page: &PageDescriptor,
        physical: PhysicalType,
        leaf: Option<&SchemaLeaf>,
    ) -> Self {
        let or_dash = |s: &Option<String>| s.clone().unwrap_or_else(|| EMPTY_DISPLAY.to_string());
        let stats = page.statistics.as_ref();
        PageSummary {
            offset: page.offset,
            kind: page.kind,
            compressed_size: page.compressed_size,
            uncompressed_size: page.uncompressed_size,
            num_values: page.num_values,
            encoding: or_dash(&page.encoding),
            def_level_encoding: or_dash(&page.def_level_encoding),
            rep_level_encoding: or_dash(&page.rep_level_encoding),
            has_statistics: page.has_statistics(),
            has_checksum: page.has_checksum,
            min_value: format_statistic(
                stats.and_then(|s| s.min.as_deref()),
                physical,
                leaf,
            ),
            max_value: format_statistic(
                stats.and_then(|s| s.max.as_deref()),
                physical,
                leaf,
            ),
            null_count: stats.and_then(|s| s.null_count),
        }
    }
}
