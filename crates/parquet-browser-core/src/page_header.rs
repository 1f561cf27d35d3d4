//! Decoding of a single Parquet page header at an absolute file offset.
//!
//! Page headers are thrift structs written with the compact protocol. They
//! are self-delimiting, so the only way to learn where the page body starts
//! is to decode the header and count the bytes the decoder pulled from the
//! source. [`read_page_header`] does exactly that and returns the header
//! together with its encoded length.
//!
//! Fields this crate does not understand are skipped, which keeps the reader
//! working against files written by newer format revisions.

use std::io::{self, BufReader, Read, Seek, SeekFrom};

use log::debug;
use snafu::{Backtrace, prelude::*};
use thrift::protocol::{TCompactInputProtocol, TInputProtocol, TType};
use thrift::{ProtocolError, ProtocolErrorKind};

const HEADER_READ_BUFFER: usize = 8 * 1024;

/// Errors produced while decoding one page header.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum HeaderError {
    /// The requested offset cannot be addressed.
    #[snafu(display("Page header offset {offset} is negative"))]
    NegativeOffset {
        /// The rejected offset.
        offset: i64,
    },

    /// Seeking to the header failed.
    #[snafu(display("Failed to seek to page header at offset {offset}: {source}"))]
    Seek {
        /// Offset that was being seeked to.
        offset: i64,
        /// Underlying I/O error.
        source: io::Error,
        /// Diagnostic backtrace for this error.
        backtrace: Backtrace,
    },

    /// The bytes at the offset are not a well-formed page header.
    #[snafu(display("Malformed page header at offset {offset}: {source}"))]
    Decode {
        /// Offset of the header that failed to decode.
        offset: i64,
        /// Underlying thrift error (I/O, truncation, or a missing required field).
        source: thrift::Error,
        /// Diagnostic backtrace for this error.
        backtrace: Backtrace,
    },
}

/// Statistics embedded in a data page header, as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawStatistics {
    /// Deprecated max value (sort order undefined for some types).
    pub max: Option<Vec<u8>>,
    /// Deprecated min value.
    pub min: Option<Vec<u8>>,
    /// Number of null values.
    pub null_count: Option<i64>,
    /// Number of distinct values, when the writer computed it.
    pub distinct_count: Option<i64>,
    /// Max value using the column's declared sort order.
    pub max_value: Option<Vec<u8>>,
    /// Min value using the column's declared sort order.
    pub min_value: Option<Vec<u8>>,
}

/// Sub-header of a v1 data page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPageHeader {
    /// Number of values, including nulls.
    pub num_values: i32,
    /// Encoding id of the values.
    pub encoding: i32,
    /// Encoding id of the definition levels.
    pub definition_level_encoding: i32,
    /// Encoding id of the repetition levels.
    pub repetition_level_encoding: i32,
    /// Optional page statistics.
    pub statistics: Option<RawStatistics>,
}

/// Sub-header of a dictionary page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryPageHeader {
    /// Number of dictionary entries.
    pub num_values: i32,
    /// Encoding id of the entries.
    pub encoding: i32,
    /// Whether the entries are sorted.
    pub is_sorted: Option<bool>,
}

/// Sub-header of a v2 data page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPageHeaderV2 {
    /// Number of values, including nulls.
    pub num_values: i32,
    /// Number of nulls.
    pub num_nulls: i32,
    /// Number of rows in the page.
    pub num_rows: i32,
    /// Encoding id of the values.
    pub encoding: i32,
    /// Byte length of the definition levels section.
    pub definition_levels_byte_length: i32,
    /// Byte length of the repetition levels section.
    pub repetition_levels_byte_length: i32,
    /// Whether the values section is compressed (defaults to true when absent).
    pub is_compressed: Option<bool>,
    /// Optional page statistics.
    pub statistics: Option<RawStatistics>,
}

/// A decoded page header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPageHeader {
    /// Page type id (0 data, 1 index, 2 dictionary, 3 data v2).
    pub page_type: i32,
    /// Uncompressed page body size in bytes.
    pub uncompressed_page_size: i32,
    /// Compressed page body size in bytes; the body follows the header directly.
    pub compressed_page_size: i32,
    /// Optional CRC32 of the page body.
    pub crc: Option<i32>,
    /// Present for v1 data pages.
    pub data_page: Option<DataPageHeader>,
    /// True when an (empty) index page sub-header was present.
    pub index_page: bool,
    /// Present for dictionary pages.
    pub dictionary_page: Option<DictionaryPageHeader>,
    /// Present for v2 data pages.
    pub data_page_v2: Option<DataPageHeaderV2>,
}

/// Counts every byte handed out by the wrapped reader.
struct CountingReader<R> {
    inner: R,
    consumed: u64,
}

impl<R> CountingReader<R> {
    fn new(inner: R) -> Self {
        Self { inner, consumed: 0 }
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.consumed += n as u64;
        Ok(n)
    }
}

/// Seek `source` to `offset` and decode exactly one page header.
///
/// Returns the header and the number of bytes it occupies on disk; the page
/// body starts at `offset + header_len`. The source is borrowed exclusively
/// for the duration of the call and its position afterwards is unspecified.
pub fn read_page_header<R: Read + Seek>(
    source: &mut R,
    offset: i64,
) -> Result<(RawPageHeader, u64), HeaderError> {
    let start = u64::try_from(offset).map_err(|_| HeaderError::NegativeOffset { offset })?;
    source
        .seek(SeekFrom::Start(start))
        .context(SeekSnafu { offset })?;

    let mut counting = CountingReader::new(BufReader::with_capacity(HEADER_READ_BUFFER, source));
    let header = {
        let mut prot = TCompactInputProtocol::new(&mut counting);
        read_header_struct(&mut prot).context(DecodeSnafu { offset })?
    };

    debug!(
        "page header at {offset}: type={} compressed={} header_len={}",
        header.page_type, header.compressed_page_size, counting.consumed
    );
    Ok((header, counting.consumed))
}

fn missing(field: &str) -> thrift::Error {
    thrift::Error::Protocol(ProtocolError::new(
        ProtocolErrorKind::InvalidData,
        format!("missing required field {field}"),
    ))
}

fn required<T>(value: Option<T>, field: &str) -> thrift::Result<T> {
    value.ok_or_else(|| missing(field))
}

/// Walk one struct, handing each field to `on_field`. Fields the callback
/// does not consume (returns `false`) are skipped.
fn read_struct<P, F>(prot: &mut P, mut on_field: F) -> thrift::Result<()>
where
    P: TInputProtocol,
    F: FnMut(&mut P, i16, TType) -> thrift::Result<bool>,
{
    prot.read_struct_begin()?;
    loop {
        let field = prot.read_field_begin()?;
        if field.field_type == TType::Stop {
            break;
        }
        let consumed = match field.id {
            Some(id) => on_field(prot, id, field.field_type)?,
            None => false,
        };
        if !consumed {
            prot.skip(field.field_type)?;
        }
        prot.read_field_end()?;
    }
    prot.read_struct_end()
}

fn read_header_struct<P: TInputProtocol>(prot: &mut P) -> thrift::Result<RawPageHeader> {
    let mut page_type = None;
    let mut uncompressed = None;
    let mut compressed = None;
    let mut crc = None;
    let mut data_page = None;
    let mut index_page = false;
    let mut dictionary_page = None;
    let mut data_page_v2 = None;

    read_struct(prot, |prot, id, ty| {
        match (id, ty) {
            (1, TType::I32) => page_type = Some(prot.read_i32()?),
            (2, TType::I32) => uncompressed = Some(prot.read_i32()?),
            (3, TType::I32) => compressed = Some(prot.read_i32()?),
            (4, TType::I32) => crc = Some(prot.read_i32()?),
            (5, TType::Struct) => data_page = Some(read_data_page_header(prot)?),
            (6, TType::Struct) => {
                prot.skip(TType::Struct)?;
                index_page = true;
            }
            (7, TType::Struct) => dictionary_page = Some(read_dictionary_page_header(prot)?),
            (8, TType::Struct) => data_page_v2 = Some(read_data_page_header_v2(prot)?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    Ok(RawPageHeader {
        page_type: required(page_type, "PageHeader.type")?,
        uncompressed_page_size: required(uncompressed, "PageHeader.uncompressed_page_size")?,
        compressed_page_size: required(compressed, "PageHeader.compressed_page_size")?,
        crc,
        data_page,
        index_page,
        dictionary_page,
        data_page_v2,
    })
}

fn read_data_page_header<P: TInputProtocol>(prot: &mut P) -> thrift::Result<DataPageHeader> {
    let mut num_values = None;
    let mut encoding = None;
    let mut def_encoding = None;
    let mut rep_encoding = None;
    let mut statistics = None;

    read_struct(prot, |prot, id, ty| {
        match (id, ty) {
            (1, TType::I32) => num_values = Some(prot.read_i32()?),
            (2, TType::I32) => encoding = Some(prot.read_i32()?),
            (3, TType::I32) => def_encoding = Some(prot.read_i32()?),
            (4, TType::I32) => rep_encoding = Some(prot.read_i32()?),
            (5, TType::Struct) => statistics = Some(read_statistics(prot)?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    Ok(DataPageHeader {
        num_values: required(num_values, "DataPageHeader.num_values")?,
        encoding: required(encoding, "DataPageHeader.encoding")?,
        definition_level_encoding: required(
            def_encoding,
            "DataPageHeader.definition_level_encoding",
        )?,
        repetition_level_encoding: required(
            rep_encoding,
            "DataPageHeader.repetition_level_encoding",
        )?,
        statistics,
    })
}

fn read_dictionary_page_header<P: TInputProtocol>(
    prot: &mut P,
) -> thrift::Result<DictionaryPageHeader> {
    let mut num_values = None;
    let mut encoding = None;
    let mut is_sorted = None;

    read_struct(prot, |prot, id, ty| {
        match (id, ty) {
            (1, TType::I32) => num_values = Some(prot.read_i32()?),
            (2, TType::I32) => encoding = Some(prot.read_i32()?),
            (3, TType::Bool) => is_sorted = Some(prot.read_bool()?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    Ok(DictionaryPageHeader {
        num_values: required(num_values, "DictionaryPageHeader.num_values")?,
        encoding: required(encoding, "DictionaryPageHeader.encoding")?,
        is_sorted,
    })
}

fn read_data_page_header_v2<P: TInputProtocol>(prot: &mut P) -> thrift::Result<DataPageHeaderV2> {
    let mut num_values = None;
    let mut num_nulls = None;
    let mut num_rows = None;
    let mut encoding = None;
    let mut def_len = None;
    let mut rep_len = None;
    let mut is_compressed = None;
    let mut statistics = None;

    read_struct(prot, |prot, id, ty| {
        match (id, ty) {
            (1, TType::I32) => num_values = Some(prot.read_i32()?),
            (2, TType::I32) => num_nulls = Some(prot.read_i32()?),
            (3, TType::I32) => num_rows = Some(prot.read_i32()?),
            (4, TType::I32) => encoding = Some(prot.read_i32()?),
            (5, TType::I32) => def_len = Some(prot.read_i32()?),
            (6, TType::I32) => rep_len = Some(prot.read_i32()?),
            (7, TType::Bool) => is_compressed = Some(prot.read_bool()?),
            (8, TType::Struct) => statistics = Some(read_statistics(prot)?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    Ok(DataPageHeaderV2 {
        num_values: required(num_values, "DataPageHeaderV2.num_values")?,
        num_nulls: required(num_nulls, "DataPageHeaderV2.num_nulls")?,
        num_rows: required(num_rows, "DataPageHeaderV2.num_rows")?,
        encoding: required(encoding, "DataPageHeaderV2.encoding")?,
        definition_levels_byte_length: required(
            def_len,
            "DataPageHeaderV2.definition_levels_byte_length",
        )?,
        repetition_levels_byte_length: required(
            rep_len,
            "DataPageHeaderV2.repetition_levels_byte_length",
        )?,
        is_compressed,
        statistics,
    })
}

fn read_statistics<P: TInputProtocol>(prot: &mut P) -> thrift::Result<RawStatistics> {
    let mut stats = RawStatistics::default();

    read_struct(prot, |prot, id, ty| {
        match (id, ty) {
            (1, TType::String) => stats.max = Some(prot.read_bytes()?),
            (2, TType::String) => stats.min = Some(prot.read_bytes()?),
            (3, TType::I64) => stats.null_count = Some(prot.read_i64()?),
            (4, TType::I64) => stats.distinct_count = Some(prot.read_i64()?),
            (5, TType::String) => stats.max_value = Some(prot.read_bytes()?),
            (6, TType::String) => stats.min_value = Some(prot.read_bytes()?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    Ok(stats)
}

#[cfg(test)]
pub(crate) mod test_util {
    //! Compact-protocol encoders for synthetic page headers.

    use thrift::protocol::{
        TCompactOutputProtocol, TFieldIdentifier, TOutputProtocol, TStructIdentifier, TType,
    };

    fn field<P: TOutputProtocol>(prot: &mut P, name: &str, ty: TType, id: i16) {
        prot.write_field_begin(&TFieldIdentifier::new(name, ty, id))
            .unwrap();
    }

    fn i32_field<P: TOutputProtocol>(prot: &mut P, name: &str, id: i16, value: i32) {
        field(prot, name, TType::I32, id);
        prot.write_i32(value).unwrap();
        prot.write_field_end().unwrap();
    }

    fn statistics_field<P: TOutputProtocol>(
        prot: &mut P,
        id: i16,
        min: Option<&[u8]>,
        max: Option<&[u8]>,
    ) {
        if min.is_none() && max.is_none() {
            return;
        }
        field(prot, "statistics", TType::Struct, id);
        prot.write_struct_begin(&TStructIdentifier::new("Statistics"))
            .unwrap();
        if let Some(max) = max {
            field(prot, "max_value", TType::String, 5);
            prot.write_bytes(max).unwrap();
            prot.write_field_end().unwrap();
        }
        if let Some(min) = min {
            field(prot, "min_value", TType::String, 6);
            prot.write_bytes(min).unwrap();
            prot.write_field_end().unwrap();
        }
        prot.write_field_stop().unwrap();
        prot.write_struct_end().unwrap();
        prot.write_field_end().unwrap();
    }

    /// Encode a page header. `data_page` is `(num_values, encoding, min, max)`
    /// and is written as the sub-header matching `page_type`: v1 data page
    /// for 0, dictionary for 2, v2 data page for 3.
    pub(crate) fn encode_header(
        page_type: i32,
        uncompressed: i32,
        compressed: i32,
        crc: Option<i32>,
        data_page: Option<(i32, i32, Option<&[u8]>, Option<&[u8]>)>,
    ) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut prot = TCompactOutputProtocol::new(&mut buf);
            prot.write_struct_begin(&TStructIdentifier::new("PageHeader"))
                .unwrap();
            i32_field(&mut prot, "type", 1, page_type);
            i32_field(&mut prot, "uncompressed_page_size", 2, uncompressed);
            i32_field(&mut prot, "compressed_page_size", 3, compressed);
            if let Some(crc) = crc {
                i32_field(&mut prot, "crc", 4, crc);
            }
            if let Some((num_values, encoding, min, max)) = data_page {
                let (name, id) = match page_type {
                    2 => ("dictionary_page_header", 7),
                    3 => ("data_page_header_v2", 8),
                    _ => ("data_page_header", 5),
                };
                field(&mut prot, name, TType::Struct, id);
                prot.write_struct_begin(&TStructIdentifier::new("Sub"))
                    .unwrap();
                i32_field(&mut prot, "num_values", 1, num_values);
                match page_type {
                    2 => i32_field(&mut prot, "encoding", 2, encoding),
                    3 => {
                        i32_field(&mut prot, "num_nulls", 2, 0);
                        i32_field(&mut prot, "num_rows", 3, num_values);
                        i32_field(&mut prot, "encoding", 4, encoding);
                        i32_field(&mut prot, "definition_levels_byte_length", 5, 0);
                        i32_field(&mut prot, "repetition_levels_byte_length", 6, 0);
                        field(&mut prot, "is_compressed", TType::Bool, 7);
                        prot.write_bool(false).unwrap();
                        prot.write_field_end().unwrap();
                        statistics_field(&mut prot, 8, min, max);
                    }
                    _ => {
                        i32_field(&mut prot, "encoding", 2, encoding);
                        i32_field(&mut prot, "definition_level_encoding", 3, 3);
                        i32_field(&mut prot, "repetition_level_encoding", 4, 3);
                        statistics_field(&mut prot, 5, min, max);
                    }
                }
                prot.write_field_stop().unwrap();
                prot.write_struct_end().unwrap();
                prot.write_field_end().unwrap();
            }
            prot.write_field_stop().unwrap();
            prot.write_struct_end().unwrap();
            prot.flush().unwrap();
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::test_util::encode_header;
    use super::*;

    #[test]
    fn reads_data_page_header_and_reports_length() {
        let stats = Some((5, 0, Some(&b"a"[..]), Some(&b"z"[..])));
        let encoded = encode_header(0, 100, 80, Some(7), stats);
        let mut bytes = vec![0xAA; 4];
        bytes.extend_from_slice(&encoded);
        bytes.extend_from_slice(&[0u8; 80]);

        let (header, len) = read_page_header(&mut Cursor::new(bytes), 4).unwrap();
        assert_eq!(len, encoded.len() as u64);
        assert_eq!(header.page_type, 0);
        assert_eq!(header.uncompressed_page_size, 100);
        assert_eq!(header.compressed_page_size, 80);
        assert_eq!(header.crc, Some(7));

        let data = header.data_page.unwrap();
        assert_eq!(data.num_values, 5);
        let stats = data.statistics.unwrap();
        assert_eq!(stats.min_value.as_deref(), Some(&b"a"[..]));
        assert_eq!(stats.max_value.as_deref(), Some(&b"z"[..]));
        assert_eq!(stats.min, None);
    }

    #[test]
    fn reads_dictionary_page_header() {
        let encoded = encode_header(2, 10, 10, None, Some((3, 0, None, None)));
        let (header, _) = read_page_header(&mut Cursor::new(encoded), 0).unwrap();
        assert_eq!(header.page_type, 2);
        assert_eq!(header.dictionary_page.unwrap().num_values, 3);
        assert!(header.data_page.is_none());
    }

    #[test]
    fn reads_data_page_v2_header() {
        let stats = Some((6, 2, Some(&b"b"[..]), Some(&b"y"[..])));
        let encoded = encode_header(3, 64, 40, None, stats);
        let (header, len) = read_page_header(&mut Cursor::new(encoded.clone()), 0).unwrap();
        assert_eq!(len, encoded.len() as u64);
        assert_eq!(header.page_type, 3);
        assert!(header.data_page.is_none());

        let v2 = header.data_page_v2.unwrap();
        assert_eq!(v2.num_values, 6);
        assert_eq!(v2.num_nulls, 0);
        assert_eq!(v2.num_rows, 6);
        assert_eq!(v2.encoding, 2);
        assert_eq!(v2.definition_levels_byte_length, 0);
        assert_eq!(v2.repetition_levels_byte_length, 0);
        assert_eq!(v2.is_compressed, Some(false));
        let stats = v2.statistics.unwrap();
        assert_eq!(stats.min_value.as_deref(), Some(&b"b"[..]));
        assert_eq!(stats.max_value.as_deref(), Some(&b"y"[..]));
    }

    #[test]
    fn truncated_header_is_decode_error() {
        let encoded = encode_header(0, 100, 80, None, Some((5, 0, None, None)));
        let truncated = encoded[..encoded.len() / 2].to_vec();
        let err = read_page_header(&mut Cursor::new(truncated), 0).unwrap_err();
        assert!(matches!(err, HeaderError::Decode { offset: 0, .. }));
    }

    #[test]
    fn missing_required_field_is_decode_error() {
        // A bare stop byte: an empty struct with no page type.
        let err = read_page_header(&mut Cursor::new(vec![0u8]), 0).unwrap_err();
        assert!(matches!(err, HeaderError::Decode { .. }));
    }

    #[test]
    fn negative_offset_is_rejected() {
        let err = read_page_header(&mut Cursor::new(vec![0u8]), -1).unwrap_err();
        assert!(matches!(err, HeaderError::NegativeOffset { offset: -1 }));
    }

    #[test]
    fn counting_reader_counts_only_consumed_bytes() {
        let mut reader = CountingReader::new(&b"abcdef"[..]);
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(reader.consumed, 4);
    }
}
