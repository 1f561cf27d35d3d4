//! CLI tool for browsing the physical layout of Parquet files.

mod error;
mod render;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::debug;
use parquet_browser_core::{PageIndexOptions, ParquetFile, page_index::DEFAULT_MAX_PAGES};
use serde::Serialize;
use snafu::{OptionExt, ResultExt};

use crate::error::{CliResult, InspectSnafu, JsonSnafu, LeafNotFoundSnafu};

#[derive(Debug, Subcommand)]
enum Command {
    /// Show format version, writer, row and column counts
    Info {
        #[arg(long)]
        file: PathBuf,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print the footer schema as an indented tree
    Schema {
        #[arg(long)]
        file: PathBuf,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Resolve a dotted column path to its leaf and show its types
    Leaf {
        #[arg(long)]
        file: PathBuf,

        /// Dotted path, e.g. `address.city`; a bare leaf name also works
        #[arg(long)]
        path: String,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List row groups
    RowGroups {
        #[arg(long)]
        file: PathBuf,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List the column chunks of one row group with decoded statistics
    Columns {
        #[arg(long)]
        file: PathBuf,

        #[arg(long = "row-group")]
        row_group: usize,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List the pages of one column chunk
    Pages {
        #[arg(long)]
        file: PathBuf,

        #[arg(long = "row-group")]
        row_group: usize,

        #[arg(long)]
        column: usize,

        /// Stop walking the chunk after this many pages
        #[arg(long = "max-pages", default_value_t = DEFAULT_MAX_PAGES)]
        max_pages: usize,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print the decoded values of one data page
    Page {
        #[arg(long)]
        file: PathBuf,

        #[arg(long = "row-group")]
        row_group: usize,

        #[arg(long)]
        column: usize,

        #[arg(long)]
        page: usize,

        #[arg(long = "max-pages", default_value_t = DEFAULT_MAX_PAGES)]
        max_pages: usize,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Debug, Parser)]
#[command(name = "pqbrowse", about = "Inspect Parquet files page by page")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

fn open(file: &Path) -> CliResult<ParquetFile> {
    debug!("opening {}", file.display());
    ParquetFile::open(file).context(InspectSnafu {
        file: file.display().to_string(),
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value).context(JsonSnafu)?;
    println!("{text}");
    Ok(())
}

fn cmd_info(file: &Path, json: bool) -> CliResult<()> {
    let overview = open(file)?.overview();
    if json {
        return print_json(&overview);
    }
    render::print_overview(&overview);
    Ok(())
}

fn cmd_schema(file: &Path, json: bool) -> CliResult<()> {
    let entries = open(file)?.schema_entries();
    if json {
        return print_json(&entries);
    }
    render::print_schema(&entries);
    Ok(())
}

fn cmd_leaf(file: &Path, path: &str, json: bool) -> CliResult<()> {
    let pq = open(file)?;
    let leaf = parquet_browser_core::schema::resolve_dotted(pq.schema_nodes(), path).context(
        LeafNotFoundSnafu {
            file: file.display().to_string(),
            path,
        },
    )?;
    let view = render::LeafView::from(&leaf);
    if json {
        return print_json(&view);
    }
    render::print_leaf(&view);
    Ok(())
}

fn cmd_row_groups(file: &Path, json: bool) -> CliResult<()> {
    let groups = open(file)?.row_groups();
    if json {
        return print_json(&groups);
    }
    render::print_row_groups(&groups);
    Ok(())
}

fn cmd_columns(file: &Path, row_group: usize, json: bool) -> CliResult<()> {
    let chunks = open(file)?.column_chunks(row_group).context(InspectSnafu {
        file: file.display().to_string(),
    })?;
    if json {
        return print_json(&chunks);
    }
    render::print_columns(&chunks);
    Ok(())
}

fn cmd_pages(
    file: &Path,
    row_group: usize,
    column: usize,
    options: &PageIndexOptions,
    json: bool,
) -> CliResult<()> {
    let pq = open(file)?;
    let ctx = || InspectSnafu {
        file: file.display().to_string(),
    };
    let index = pq.page_index(row_group, column, options).context(ctx())?;
    let pages = pq
        .page_summaries(row_group, column, &index)
        .context(ctx())?;
    if json {
        return print_json(&pages);
    }
    render::print_pages(&pages);
    render::print_walk_end(&index);
    Ok(())
}

fn cmd_page(
    file: &Path,
    row_group: usize,
    column: usize,
    page: usize,
    options: &PageIndexOptions,
    json: bool,
) -> CliResult<()> {
    let values = open(file)?
        .page_content(row_group, column, page, options)
        .context(InspectSnafu {
            file: file.display().to_string(),
        })?;
    if json {
        return print_json(&values);
    }
    for value in &values {
        println!("{value}");
    }
    Ok(())
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Info { file, json } => cmd_info(&file, json),
        Command::Schema { file, json } => cmd_schema(&file, json),
        Command::Leaf { file, path, json } => cmd_leaf(&file, &path, json),
        Command::RowGroups { file, json } => cmd_row_groups(&file, json),
        Command::Columns {
            file,
            row_group,
            json,
        } => cmd_columns(&file, row_group, json),
        Command::Pages {
            file,
            row_group,
            column,
            max_pages,
            json,
        } => cmd_pages(
            &file,
            row_group,
            column,
            &PageIndexOptions { max_pages },
            json,
        ),
        Command::Page {
            file,
            row_group,
            column,
            page,
            max_pages,
            json,
        } => cmd_page(
            &file,
            row_group,
            column,
            page,
            &PageIndexOptions { max_pages },
            json,
        ),
    }
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
