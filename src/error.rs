use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum EnrichError {
    #[error("invalid DOI: {0:?}")]
    InvalidDoi(String),

    #[error("no file selected")]
    NoFileSelected,

    #[error("no DOI column found in {0}")]
    #[diagnostic(help("the header row needs a column whose name contains \"doi\""))]
    MissingDoiColumn(Utf8PathBuf),

    #[error("failed to read input file {path}: {message}")]
    InputRead { path: Utf8PathBuf, message: String },

    #[error("failed to write output file {path}: {message}")]
    OutputWrite { path: Utf8PathBuf, message: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("unknown provider: {0}")]
    #[diagnostic(help("valid providers: pubmed, europe_pmc, crossref, semantic_scholar"))]
    InvalidProvider(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("request failed: {0}")]
    Http(String),

    #[error("{provider} returned an unexpected response: {message}")]
    Parse {
        provider: &'static str,
        message: String,
    },
}

impl EnrichError {
    pub fn parse(provider: &'static str, message: impl ToString) -> Self {
        EnrichError::Parse {
            provider,
            message: message.to_string(),
        }
    }

    /// Input problems end the run normally: a message, no output, no network.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            EnrichError::NoFileSelected | EnrichError::MissingDoiColumn(_)
        )
    }
}
