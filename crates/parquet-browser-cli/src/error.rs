use parquet_browser_core::InspectError;

use snafu::Snafu;

pub type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CliError {
    #[snafu(display("Failed to inspect {file}: {source}"))]
    Inspect {
        file: String,
        #[snafu(source(from(InspectError, Box::new)))]
        source: Box<InspectError>,
    },

    #[snafu(display("No leaf column matches '{path}' in {file}"))]
    LeafNotFound { file: String, path: String },

    #[snafu(display("Failed to serialize output as JSON: {source}"))]
    Json { source: serde_json::Error },
}
