//! An open Parquet file and the navigation built on top of it.
//!
//! [`ParquetFile`] parses the footer once and keeps it. Everything that
//! needs to read bytes (page headers, column values) opens its own handle,
//! so concurrent requests never contend for one seek position.

use std::fs::File;
use std::path::{Path, PathBuf};

use parquet::file::metadata::{ColumnChunkMetaData, ParquetMetaData};
use parquet::file::reader::{FileReader, SerializedFileReader};
use snafu::prelude::*;

use crate::content::{
    CellValue, ChunkLocation, ColumnSource, FileColumnCursor, extract_page_values,
    render_page_values,
};
use crate::error::{InspectResult, OpenFileSnafu, ParquetOpenSnafu, check_index};
use crate::page_index::{ChunkLayout, PageIndex, PageIndexOptions, build_page_index};
use crate::schema::{
    SchemaEntry, SchemaLeaf, SchemaNode, flatten_schema, resolve_leaf, schema_entries,
};
use crate::summary::{ColumnChunkSummary, FileOverview, PageSummary, RowGroupSummary};

/// A Parquet file opened for inspection.
pub struct ParquetFile {
    path: PathBuf,
    reader: SerializedFileReader<File>,
    nodes: Vec<SchemaNode>,
}

impl ParquetFile {
    /// Open `path` and parse its footer.
    pub fn open(path: impl AsRef<Path>) -> InspectResult<Self> {
        let path = path.as_ref().to_path_buf();
        let reader = open_reader(&path)?;
        let nodes = flatten_schema(reader.metadata().file_metadata().schema());
        Ok(ParquetFile {
            path,
            reader,
            nodes,
        })
    }

    /// Path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parsed footer.
    pub fn metadata(&self) -> &ParquetMetaData {
        self.reader.metadata()
    }

    /// The footer schema as a flat depth-first list.
    pub fn schema_nodes(&self) -> &[SchemaNode] {
        &self.nodes
    }

    /// A freshly opened, independently seekable handle on the file bytes.
    pub fn raw_byte_source(&self) -> InspectResult<File> {
        File::open(&self.path).context(OpenFileSnafu {
            path: self.path.display().to_string(),
        })
    }

    /// File-level facts.
    pub fn overview(&self) -> FileOverview {
        FileOverview::from_metadata(self.metadata())
    }

    /// The schema listing.
    pub fn schema_entries(&self) -> Vec<SchemaEntry> {
        schema_entries(&self.nodes)
    }

    /// One summary per row group.
    pub fn row_groups(&self) -> Vec<RowGroupSummary> {
        self.metadata()
            .row_groups()
            .iter()
            .enumerate()
            .map(|(i, rg)| RowGroupSummary::from_metadata(i, rg))
            .collect()
    }

    /// Footer metadata of one column chunk.
    pub fn column_chunk(
        &self,
        row_group: usize,
        column: usize,
    ) -> InspectResult<&ColumnChunkMetaData> {
        let metadata = self.metadata();
        check_index("row group", row_group, metadata.num_row_groups())?;
        let rg = metadata.row_group(row_group);
        check_index("column", column, rg.num_columns())?;
        Ok(rg.column(column))
    }

    /// Schema leaf of a column chunk, resolved by its path in the schema.
    pub fn leaf_for_column(
        &self,
        row_group: usize,
        column: usize,
    ) -> InspectResult<Option<SchemaLeaf>> {
        let chunk = self.column_chunk(row_group, column)?;
        Ok(resolve_leaf(&self.nodes, chunk.column_path().parts()))
    }

    /// Summaries of every column chunk of a row group.
    pub fn column_chunks(&self, row_group: usize) -> InspectResult<Vec<ColumnChunkSummary>> {
        check_index("row group", row_group, self.metadata().num_row_groups())?;
        let rg = self.metadata().row_group(row_group);
        Ok(rg
            .columns()
            .iter()
            .map(|chunk| {
                let leaf = resolve_leaf(&self.nodes, chunk.column_path().parts());
                ColumnChunkSummary::from_metadata(chunk, leaf.as_ref())
            })
            .collect())
    }

    /// Rebuild the page index of one column chunk from its page headers.
    pub fn page_index(
        &self,
        row_group: usize,
        column: usize,
        options: &PageIndexOptions,
    ) -> InspectResult<PageIndex> {
        let chunk = self.column_chunk(row_group, column)?;
        let mut source = self.raw_byte_source()?;
        Ok(build_page_index(
            &mut source,
            &ChunkLayout::from_metadata(chunk),
            options,
        ))
    }

    /// Summaries of the pages in `index`, built for the given chunk, with
    /// statistics decoded.
    pub fn page_summaries(
        &self,
        row_group: usize,
        column: usize,
        index: &PageIndex,
    ) -> InspectResult<Vec<PageSummary>> {
        let physical = self.column_chunk(row_group, column)?.column_type();
        let leaf = self.leaf_for_column(row_group, column)?;
        Ok(index
            .pages
            .iter()
            .map(|page| PageSummary::from_descriptor(page, physical, leaf.as_ref()))
            .collect())
    }

    /// Location of a column chunk for content extraction.
    pub fn chunk_location(&self, row_group: usize, column: usize) -> InspectResult<ChunkLocation> {
        let chunk = self.column_chunk(row_group, column)?;
        let rows_before = self.metadata().row_groups()[..row_group]
            .iter()
            .map(|rg| usize::try_from(rg.num_rows()).unwrap_or(0))
            .sum();
        Ok(ChunkLocation {
            column,
            rows_before,
            num_values: chunk.num_values(),
        })
    }

    /// Values of page `page` of a column chunk whose index was already built.
    pub fn page_values(
        &self,
        row_group: usize,
        column: usize,
        index: &PageIndex,
        page: usize,
    ) -> InspectResult<Vec<CellValue>> {
        let location = self.chunk_location(row_group, column)?;
        extract_page_values(self, &location, &index.pages, page)
    }

    /// Build the chunk's page index and render the values of one page.
    pub fn page_content(
        &self,
        row_group: usize,
        column: usize,
        page: usize,
        options: &PageIndexOptions,
    ) -> InspectResult<Vec<String>> {
        let index = self.page_index(row_group, column, options)?;
        let values = self.page_values(row_group, column, &index, page)?;
        let physical = self.column_chunk(row_group, column)?.column_type();
        let leaf = self.leaf_for_column(row_group, column)?;
        Ok(render_page_values(&values, physical, leaf.as_ref()))
    }
}

impl ColumnSource for ParquetFile {
    type Cursor = FileColumnCursor;

    fn new_cursor(&self) -> InspectResult<FileColumnCursor> {
        Ok(FileColumnCursor::new(open_reader(&self.path)?))
    }
}

fn open_reader(path: &Path) -> InspectResult<SerializedFileReader<File>> {
    let display = path.display().to_string();
    let file = File::open(path).context(OpenFileSnafu {
        path: display.clone(),
    })?;
    SerializedFileReader::new(file).context(ParquetOpenSnafu { path: display })
}
