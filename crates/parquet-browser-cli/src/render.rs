//! Plain-text rendering of core summaries.

use parquet_browser_core::PageIndex;
use parquet_browser_core::page_index::PageIndexEnd;
use parquet_browser_core::schema::{SchemaEntry, SchemaLeaf};
use parquet_browser_core::summary::{
    ColumnChunkSummary, FileOverview, PageSummary, RowGroupSummary, physical_type_name,
};
use serde::Serialize;

/// A resolved leaf with its types formatted for display.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafView {
    pub path: String,
    pub physical_type: String,
    pub logical_type: String,
    pub converted_type: String,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
}

impl From<&SchemaLeaf> for LeafView {
    fn from(leaf: &SchemaLeaf) -> Self {
        LeafView {
            path: leaf.path.clone(),
            physical_type: physical_type_name(leaf.physical_type).to_string(),
            logical_type: leaf.logical_type_display(),
            converted_type: leaf.converted_type_display(),
            precision: leaf.precision,
            scale: leaf.scale,
        }
    }
}

fn or_dash(v: Option<impl ToString>) -> String {
    v.map_or_else(|| "-".to_string(), |v| v.to_string())
}

pub fn print_overview(o: &FileOverview) {
    println!("version:     {}", o.version);
    println!("created by:  {}", o.created_by.as_deref().unwrap_or("-"));
    println!("rows:        {}", o.num_rows);
    println!("row groups:  {}", o.num_row_groups);
    println!("columns:     {}", o.num_columns);
}

pub fn print_schema(entries: &[SchemaEntry]) {
    for e in entries {
        let indent = "  ".repeat(e.depth);
        let mut line = format!("{indent}{} {} {}", e.repetition, e.physical_type, e.name);
        if e.logical_type != "-" {
            line.push_str(&format!(" [{}]", e.logical_type));
        } else if e.converted_type != "-" {
            line.push_str(&format!(" ({})", e.converted_type));
        }
        println!("{line}");
    }
}

pub fn print_leaf(leaf: &LeafView) {
    println!("path:            {}", leaf.path);
    println!("physical type:   {}", leaf.physical_type);
    println!("logical type:    {}", leaf.logical_type);
    println!("converted type:  {}", leaf.converted_type);
    if leaf.precision.is_some() || leaf.scale.is_some() {
        println!(
            "precision/scale: {}/{}",
            or_dash(leaf.precision),
            or_dash(leaf.scale)
        );
    }
}

pub fn print_row_groups(groups: &[RowGroupSummary]) {
    println!(
        "{:>5}  {:>12}  {:>14}  {:>14}  {:>7}",
        "index", "rows", "bytes", "compressed", "columns"
    );
    for g in groups {
        println!(
            "{:>5}  {:>12}  {:>14}  {:>14}  {:>7}",
            g.index, g.num_rows, g.total_byte_size, g.compressed_size, g.num_columns
        );
    }
}

pub fn print_columns(chunks: &[ColumnChunkSummary]) {
    for (i, c) in chunks.iter().enumerate() {
        println!("[{i}] {} {} {}", c.path, c.physical_type, c.codec);
        println!(
            "    values={} compressed={} uncompressed={} dict_offset={} data_offset={}",
            c.num_values,
            c.compressed_size,
            c.uncompressed_size,
            or_dash(c.dictionary_page_offset),
            c.data_page_offset
        );
        println!(
            "    logical={} converted={} min={} max={} nulls={}",
            c.logical_type,
            c.converted_type,
            c.min_value,
            c.max_value,
            or_dash(c.null_count)
        );
    }
}

pub fn print_pages(pages: &[PageSummary]) {
    println!(
        "{:>4}  {:>10}  {:<16}  {:>10}  {:>12}  {:>8}  {:<20}  {:<6}  {:<6}  min / max / nulls",
        "#", "offset", "kind", "compressed", "uncompressed", "values", "encoding", "def", "rep"
    );
    for (i, p) in pages.iter().enumerate() {
        let crc = if p.has_checksum { " crc" } else { "" };
        println!(
            "{:>4}  {:>10}  {:<16}  {:>10}  {:>12}  {:>8}  {:<20}  {:<6}  {:<6}  {} / {} / {}{crc}",
            i,
            p.offset,
            p.kind.as_str(),
            p.compressed_size,
            p.uncompressed_size,
            p.num_values,
            p.encoding,
            p.def_level_encoding,
            p.rep_level_encoding,
            p.min_value,
            p.max_value,
            or_dash(p.null_count)
        );
    }
}

/// Note on stderr when the walk did not account for every value.
pub fn print_walk_end(index: &PageIndex) {
    match &index.end {
        PageIndexEnd::AllValuesRead | PageIndexEnd::ChunkEnd => {}
        PageIndexEnd::HeaderDecodeFailure { offset, message } => {
            eprintln!("note: page header at offset {offset} could not be decoded: {message}");
        }
        PageIndexEnd::PageLimit => {
            eprintln!(
                "note: stopped after {} pages; raise --max-pages to see more",
                index.pages.len()
            );
        }
        PageIndexEnd::NoProgress { offset } => {
            eprintln!("note: page at offset {offset} reports a size that does not advance");
        }
    }
}
