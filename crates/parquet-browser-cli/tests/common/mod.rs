use std::{path::Path, sync::Arc};

use arrow::array::{BinaryBuilder, Float64Builder, StringBuilder, TimestampMillisecondBuilder};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub const ROWS: usize = 40;
pub const ROWS_PER_GROUP: usize = 20;
pub const BASE_TS_MILLIS: i64 = 1_700_000_000_000;

pub fn symbol_of(i: usize) -> String {
    format!("SYM{}", i % 3)
}

/// Two row groups of 20 rows, cut into pages of at most 8 rows.
pub fn write_quotes(path: &Path) -> TestResult {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut ts_builder = TimestampMillisecondBuilder::with_capacity(ROWS);
    let mut sym_builder = StringBuilder::new();
    let mut price_builder = Float64Builder::with_capacity(ROWS);
    let mut venue_builder = StringBuilder::new();
    let mut payload_builder = BinaryBuilder::new();

    for i in 0..ROWS {
        ts_builder.append_value(BASE_TS_MILLIS + (i as i64) * 1_000);
        sym_builder.append_value(symbol_of(i));
        price_builder.append_value(100.0 + i as f64 / 4.0);
        if i % 4 == 0 {
            venue_builder.append_null();
        } else {
            venue_builder.append_value(format!("X{}", i % 7));
        }
        payload_builder.append_value([i as u8, 0xFF, 0x00]);
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new(
            "ts",
            DataType::Timestamp(TimeUnit::Millisecond, None),
            false,
        ),
        Field::new("symbol", DataType::Utf8, false),
        Field::new("price", DataType::Float64, false),
        Field::new("venue", DataType::Utf8, true),
        Field::new("payload", DataType::Binary, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(ts_builder.finish()) as _,
            Arc::new(sym_builder.finish()),
            Arc::new(price_builder.finish()),
            Arc::new(venue_builder.finish()),
            Arc::new(payload_builder.finish()),
        ],
    )?;

    let props = WriterProperties::builder()
        .set_max_row_group_size(ROWS_PER_GROUP)
        .set_data_page_row_count_limit(8)
        .set_write_batch_size(8)
        .build();
    let mut writer = ArrowWriter::try_new(std::fs::File::create(path)?, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}
