//! Page content extraction.
//!
//! A page's declared value count is a physical count: for repeated columns it
//! counts levels, not rows. Page boundaries therefore cannot be found with a
//! row-based read. Instead the whole column chunk is decoded once through a
//! fresh [`ColumnCursor`] and the values belonging to the page are sliced out.

mod cursor;

use log::debug;
use parquet::basic::Type as PhysicalType;
use snafu::prelude::*;

use crate::decode::{RawValue, decode_raw};
use crate::error::{InspectResult, UnsupportedPageKindSnafu, check_index};
use crate::page_index::PageDescriptor;
use crate::schema::SchemaLeaf;

pub use cursor::FileColumnCursor;

/// Literal shown for a null slot.
pub const NULL_DISPLAY: &str = "NULL";

/// One physical value (or null slot) of a column.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// A definition level below the column's maximum.
    Null,
    /// BOOLEAN.
    Boolean(bool),
    /// INT32.
    Int32(i32),
    /// INT64.
    Int64(i64),
    /// INT96, as its 12 little-endian bytes.
    Int96([u8; 12]),
    /// FLOAT.
    Float(f32),
    /// DOUBLE.
    Double(f64),
    /// BYTE_ARRAY and FIXED_LEN_BYTE_ARRAY.
    Bytes(Vec<u8>),
}

impl CellValue {
    /// The raw value, or `None` for a null slot.
    pub fn to_raw(&self) -> Option<RawValue> {
        Some(match self {
            CellValue::Null => return None,
            CellValue::Boolean(v) => RawValue::Boolean(*v),
            CellValue::Int32(v) => RawValue::Int32(*v),
            CellValue::Int64(v) => RawValue::Int64(*v),
            CellValue::Int96(b) => RawValue::Bytes(b.to_vec()),
            CellValue::Float(v) => RawValue::Float(*v),
            CellValue::Double(v) => RawValue::Double(*v),
            CellValue::Bytes(b) => RawValue::Bytes(b.clone()),
        })
    }

    /// Render through the same decoder used for statistics.
    pub fn render(&self, physical: PhysicalType, leaf: Option<&SchemaLeaf>) -> String {
        match self.to_raw() {
            Some(raw) => decode_raw(raw, physical, leaf).display(),
            None => NULL_DISPLAY.to_string(),
        }
    }
}

/// A forward-only reader over one file's column values.
pub trait ColumnCursor {
    /// Skip `rows` logical rows, returning how many were actually skipped.
    fn skip_rows(&mut self, rows: usize) -> InspectResult<usize>;

    /// Read up to `count` physical values of leaf column `column`,
    /// continuing into later row groups as needed.
    ///
    /// One entry is returned per definition level, so null slots are
    /// included. Fewer than `count` values means the file ran out.
    fn read_column(&mut self, column: usize, count: usize) -> InspectResult<Vec<CellValue>>;
}

/// Something that can hand out independent cursors.
///
/// Each content request takes its own cursor so no reader state is shared
/// between requests.
pub trait ColumnSource {
    /// Cursor type handed out.
    type Cursor: ColumnCursor;

    /// Open a cursor positioned at the first row of the file.
    fn new_cursor(&self) -> InspectResult<Self::Cursor>;
}

/// Where a column chunk sits in its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLocation {
    /// Leaf column index.
    pub column: usize,
    /// Logical rows in the row groups before this chunk's.
    pub rows_before: usize,
    /// Physical values the chunk declares.
    pub num_values: i64,
}

/// Physical values in data pages before `page`.
fn values_before(pages: &[PageDescriptor], page: usize) -> usize {
    pages[..page]
        .iter()
        .filter(|p| p.kind.is_data())
        .map(|p| usize::try_from(p.num_values).unwrap_or(0))
        .sum()
}

/// Return exactly the values of data page `page` of the chunk at `location`.
///
/// Dictionary and index pages carry no values and are rejected before any
/// read is attempted. A short read yields fewer values than the page
/// declares, or none if the page starts past what was read.
pub fn extract_page_values<S: ColumnSource>(
    source: &S,
    location: &ChunkLocation,
    pages: &[PageDescriptor],
    page: usize,
) -> InspectResult<Vec<CellValue>> {
    check_index("page", page, pages.len())?;
    let target = &pages[page];
    ensure!(
        target.kind.is_data(),
        UnsupportedPageKindSnafu { kind: target.kind }
    );

    let mut cursor = source.new_cursor()?;
    cursor.skip_rows(location.rows_before)?;
    let declared = usize::try_from(location.num_values).unwrap_or(0);
    let mut values = cursor.read_column(location.column, declared)?;
    debug!(
        "read {} of {declared} values of column {} for page {page}",
        values.len(),
        location.column
    );

    let start = values_before(pages, page).min(values.len());
    let end = start
        .saturating_add(usize::try_from(target.num_values).unwrap_or(0))
        .min(values.len());
    values.truncate(end);
    Ok(values.split_off(start))
}

/// Render extracted values as display strings, `NULL` for null slots.
pub fn render_page_values(
    values: &[CellValue],
    physical: PhysicalType,
    leaf: Option<&SchemaLeaf>,
) -> Vec<String> {
    values.iter().map(|v| v.render(physical, leaf)).collect()
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::error::InspectError;
    use crate::page_index::PageKind;

    struct MockSource {
        values: Vec<CellValue>,
        cursors_opened: Cell<usize>,
    }

    struct MockCursor {
        values: Vec<CellValue>,
        skipped: usize,
    }

    impl ColumnCursor for MockCursor {
        fn skip_rows(&mut self, rows: usize) -> InspectResult<usize> {
            self.skipped += rows;
            Ok(rows)
        }

        fn read_column(&mut self, _column: usize, count: usize) -> InspectResult<Vec<CellValue>> {
            Ok(self.values.iter().take(count).cloned().collect())
        }
    }

    impl ColumnSource for MockSource {
        type Cursor = MockCursor;

        fn new_cursor(&self) -> InspectResult<MockCursor> {
            self.cursors_opened.set(self.cursors_opened.get() + 1);
            Ok(MockCursor {
                values: self.values.clone(),
                skipped: 0,
            })
        }
    }

    fn source(n: i32) -> MockSource {
        MockSource {
            values: (0..n).map(CellValue::Int32).collect(),
            cursors_opened: Cell::new(0),
        }
    }

    fn page(kind: PageKind, offset: i64, num_values: i64) -> PageDescriptor {
        PageDescriptor {
            offset,
            header_len: 10,
            kind,
            compressed_size: 20,
            uncompressed_size: 20,
            num_values,
            encoding: Some("PLAIN".to_string()),
            def_level_encoding: None,
            rep_level_encoding: None,
            statistics: None,
            has_checksum: false,
        }
    }

    fn location(num_values: i64) -> ChunkLocation {
        ChunkLocation {
            column: 0,
            rows_before: 0,
            num_values,
        }
    }

    #[test]
    fn second_page_gets_its_slice() -> Result<(), InspectError> {
        let src = source(5);
        let pages = [page(PageKind::DataPage, 4, 2), page(PageKind::DataPage, 34, 3)];
        let values = extract_page_values(&src, &location(5), &pages, 1)?;
        assert_eq!(
            values,
            vec![CellValue::Int32(2), CellValue::Int32(3), CellValue::Int32(4)]
        );
        Ok(())
    }

    #[test]
    fn dictionary_pages_do_not_shift_the_slice() -> Result<(), InspectError> {
        let src = source(5);
        let pages = [
            page(PageKind::DictionaryPage, 4, 5),
            page(PageKind::DataPage, 34, 2),
            page(PageKind::DataPageV2, 64, 3),
        ];
        let values = extract_page_values(&src, &location(5), &pages, 1)?;
        assert_eq!(values, vec![CellValue::Int32(0), CellValue::Int32(1)]);
        Ok(())
    }

    #[test]
    fn short_read_clamps() -> Result<(), InspectError> {
        let src = source(4);
        let pages = [
            page(PageKind::DataPage, 4, 2),
            page(PageKind::DataPage, 34, 3),
            page(PageKind::DataPage, 64, 3),
        ];
        assert_eq!(
            extract_page_values(&src, &location(8), &pages, 1)?,
            vec![CellValue::Int32(2), CellValue::Int32(3)]
        );
        assert!(extract_page_values(&src, &location(8), &pages, 2)?.is_empty());
        Ok(())
    }

    #[test]
    fn non_data_pages_are_rejected_without_reading() {
        let src = source(5);
        let pages = [
            page(PageKind::DictionaryPage, 4, 5),
            page(PageKind::IndexPage, 34, 0),
        ];
        for idx in 0..pages.len() {
            let err = extract_page_values(&src, &location(5), &pages, idx).unwrap_err();
            assert!(matches!(err, InspectError::UnsupportedPageKind { .. }));
        }
        assert_eq!(src.cursors_opened.get(), 0);
    }

    #[test]
    fn page_index_out_of_range() {
        let src = source(5);
        let pages = [page(PageKind::DataPage, 4, 5)];
        let err = extract_page_values(&src, &location(5), &pages, 1).unwrap_err();
        assert!(matches!(
            err,
            InspectError::InvalidIndex {
                what: "page",
                index: 1,
                len: 1
            }
        ));
    }

    #[test]
    fn every_request_opens_a_fresh_cursor() -> Result<(), InspectError> {
        let src = source(5);
        let pages = [page(PageKind::DataPage, 4, 5)];
        extract_page_values(&src, &location(5), &pages, 0)?;
        extract_page_values(&src, &location(5), &pages, 0)?;
        assert_eq!(src.cursors_opened.get(), 2);
        Ok(())
    }

    #[test]
    fn nulls_render_literally() {
        let rendered = render_page_values(
            &[CellValue::Int64(7), CellValue::Null],
            PhysicalType::INT64,
            None,
        );
        assert_eq!(rendered, vec!["7".to_string(), "NULL".to_string()]);
    }
}
