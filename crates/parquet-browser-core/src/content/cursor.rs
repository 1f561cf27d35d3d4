//! Column cursor backed by the parquet crate's typed column readers.

use std::fs::File;

use log::debug;
use parquet::column::reader::{ColumnReader, ColumnReaderImpl};
use parquet::data_type::{AsBytes, ByteArray, DataType, FixedLenByteArray, Int96};
use parquet::errors::ParquetError;
use parquet::file::reader::{FileReader, RowGroupReader, SerializedFileReader};
use snafu::prelude::*;

use super::{CellValue, ColumnCursor};
use crate::error::{ColumnReadSnafu, InspectResult, check_index};

/// Records requested from the column reader per call.
const READ_BATCH: usize = 1024;

/// A forward-only cursor over one open file.
///
/// The cursor owns its reader, so two cursors over the same file never
/// share a seek position. A [`ColumnCursor::read_column`] call consumes the
/// row groups it touches.
pub struct FileColumnCursor {
    reader: SerializedFileReader<File>,
    row_group: usize,
    /// Rows of `row_group` still to skip before reading.
    pending_skip: usize,
}

impl FileColumnCursor {
    /// A cursor positioned at the first row of `reader`.
    pub fn new(reader: SerializedFileReader<File>) -> Self {
        FileColumnCursor {
            reader,
            row_group: 0,
            pending_skip: 0,
        }
    }

    fn rows_in(&self, row_group: usize) -> usize {
        usize::try_from(self.reader.metadata().row_group(row_group).num_rows()).unwrap_or(0)
    }
}

impl ColumnCursor for FileColumnCursor {
    fn skip_rows(&mut self, rows: usize) -> InspectResult<usize> {
        let mut remaining = rows;
        while remaining > 0 && self.row_group < self.reader.num_row_groups() {
            let left = self.rows_in(self.row_group).saturating_sub(self.pending_skip);
            if remaining >= left {
                remaining -= left;
                self.row_group += 1;
                self.pending_skip = 0;
            } else {
                self.pending_skip += remaining;
                remaining = 0;
            }
        }
        Ok(rows - remaining)
    }

    fn read_column(&mut self, column: usize, count: usize) -> InspectResult<Vec<CellValue>> {
        let num_columns = self.reader.metadata().file_metadata().schema_descr().num_columns();
        check_index("column", column, num_columns)?;

        let mut out = Vec::with_capacity(count);
        while out.len() < count && self.row_group < self.reader.num_row_groups() {
            let row_group = self
                .reader
                .get_row_group(self.row_group)
                .context(ColumnReadSnafu { column })?;
            let descr = row_group.metadata().column(column).column_descr();
            let levels = Levels {
                max_def: descr.max_def_level(),
                max_rep: descr.max_rep_level(),
            };
            let reader = row_group
                .get_column_reader(column)
                .context(ColumnReadSnafu { column })?;
            let want = count - out.len();
            let skip = self.pending_skip;
            read_chunk(reader, levels, skip, want, &mut out).context(ColumnReadSnafu { column })?;
            debug!(
                "row group {}: read column {column}, {} values so far",
                self.row_group,
                out.len()
            );
            self.row_group += 1;
            self.pending_skip = 0;
        }
        Ok(out)
    }
}

#[derive(Clone, Copy)]
struct Levels {
    max_def: i16,
    max_rep: i16,
}

fn int96_bytes(words: &[u32]) -> [u8; 12] {
    let mut bytes = [0u8; 12];
    for (chunk, word) in bytes.chunks_exact_mut(4).zip(words) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    bytes
}

fn read_chunk(
    reader: ColumnReader,
    levels: Levels,
    skip: usize,
    want: usize,
    out: &mut Vec<CellValue>,
) -> Result<(), ParquetError> {
    match reader {
        ColumnReader::BoolColumnReader(mut r) => {
            read_levels(&mut r, levels, skip, want, out, CellValue::Boolean)
        }
        ColumnReader::Int32ColumnReader(mut r) => {
            read_levels(&mut r, levels, skip, want, out, CellValue::Int32)
        }
        ColumnReader::Int64ColumnReader(mut r) => {
            read_levels(&mut r, levels, skip, want, out, CellValue::Int64)
        }
        ColumnReader::Int96ColumnReader(mut r) => {
            read_levels(&mut r, levels, skip, want, out, |v: Int96| {
                CellValue::Int96(int96_bytes(v.data()))
            })
        }
        ColumnReader::FloatColumnReader(mut r) => {
            read_levels(&mut r, levels, skip, want, out, CellValue::Float)
        }
        ColumnReader::DoubleColumnReader(mut r) => {
            read_levels(&mut r, levels, skip, want, out, CellValue::Double)
        }
        ColumnReader::ByteArrayColumnReader(mut r) => {
            read_levels(&mut r, levels, skip, want, out, |v: ByteArray| {
                CellValue::Bytes(v.as_bytes().to_vec())
            })
        }
        ColumnReader::FixedLenByteArrayColumnReader(mut r) => {
            read_levels(&mut r, levels, skip, want, out, |v: FixedLenByteArray| {
                CellValue::Bytes(v.as_bytes().to_vec())
            })
        }
    }
}

/// Read one chunk's levels, emitting a value or [`CellValue::Null`] per
/// definition level until `want` entries were added or the chunk ends.
fn read_levels<T: DataType>(
    reader: &mut ColumnReaderImpl<T>,
    levels: Levels,
    skip: usize,
    want: usize,
    out: &mut Vec<CellValue>,
    convert: impl Fn(T::T) -> CellValue,
) -> Result<(), ParquetError> {
    if skip > 0 {
        reader.skip_records(skip)?;
    }

    let target = out.len() + want;
    let mut values: Vec<T::T> = Vec::with_capacity(READ_BATCH);
    let mut def_levels: Option<Vec<i16>> =
        (levels.max_def > 0).then(|| Vec::with_capacity(READ_BATCH));
    let mut rep_levels: Option<Vec<i16>> =
        (levels.max_rep > 0).then(|| Vec::with_capacity(READ_BATCH));

    while out.len() < target {
        values.clear();
        if let Some(defs) = def_levels.as_mut() {
            defs.clear();
        }
        if let Some(reps) = rep_levels.as_mut() {
            reps.clear();
        }

        let (records_read, values_read, levels_read) = reader.read_records(
            READ_BATCH,
            def_levels.as_mut(),
            rep_levels.as_mut(),
            &mut values,
        )?;
        if records_read == 0 {
            break;
        }

        let mut decoded = values.drain(..values_read.min(values.len()));
        match def_levels.as_ref() {
            None => out.extend(decoded.map(&convert)),
            Some(defs) => {
                for &level in &defs[..levels_read.min(defs.len())] {
                    let cell = if level == levels.max_def {
                        decoded.next().map(&convert).unwrap_or(CellValue::Null)
                    } else {
                        CellValue::Null
                    };
                    out.push(cell);
                }
            }
        }
    }

    out.truncate(target);
    Ok(())
}
