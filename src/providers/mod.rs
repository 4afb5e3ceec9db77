//! Bibliographic metadata providers, one per external service.

pub mod crossref;
pub mod europe_pmc;
pub mod pubmed;
pub mod semantic_scholar;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{Doi, MetadataRecord};
use crate::error::EnrichError;
use crate::http::HttpClient;

pub use crossref::Crossref;
pub use europe_pmc::EuropePmc;
pub use pubmed::PubMed;
pub use semantic_scholar::SemanticScholar;

/// One external metadata service.
///
/// `Ok(None)` is the absence signal: the provider answered (or failed to
/// answer at the transport level) without anything usable. `Err` means the
/// response could not be interpreted.
pub trait MetadataProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn lookup(&self, doi: &Doi) -> Result<Option<MetadataRecord>, EnrichError>;

    fn name(&self) -> &'static str {
        self.kind().name()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "pubmed")]
    PubMed,
    #[serde(rename = "europe_pmc")]
    EuropePmc,
    #[serde(rename = "crossref")]
    Crossref,
    #[serde(rename = "semantic_scholar")]
    SemanticScholar,
}

impl ProviderKind {
    pub fn default_order() -> &'static [ProviderKind] {
        &[
            ProviderKind::PubMed,
            ProviderKind::EuropePmc,
            ProviderKind::Crossref,
            ProviderKind::SemanticScholar,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::PubMed => "PubMed",
            ProviderKind::EuropePmc => "Europe PMC",
            ProviderKind::Crossref => "Crossref",
            ProviderKind::SemanticScholar => "Semantic Scholar",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            ProviderKind::PubMed => "pubmed",
            ProviderKind::EuropePmc => "europe_pmc",
            ProviderKind::Crossref => "crossref",
            ProviderKind::SemanticScholar => "semantic_scholar",
        }
    }

    pub fn build(self, client: Arc<dyn HttpClient>) -> Box<dyn MetadataProvider> {
        match self {
            ProviderKind::PubMed => Box::new(PubMed::new(client)),
            ProviderKind::EuropePmc => Box::new(EuropePmc::new(client)),
            ProviderKind::Crossref => Box::new(Crossref::new(client)),
            ProviderKind::SemanticScholar => Box::new(SemanticScholar::new(client)),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = EnrichError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "pubmed" => Ok(ProviderKind::PubMed),
            "europe_pmc" | "europepmc" => Ok(ProviderKind::EuropePmc),
            "crossref" => Ok(ProviderKind::Crossref),
            "semantic_scholar" | "semanticscholar" => Ok(ProviderKind::SemanticScholar),
            _ => Err(EnrichError::InvalidProvider(value.to_string())),
        }
    }
}

/// Builds providers in the given order, all sharing one HTTP client.
pub fn build_providers(
    kinds: &[ProviderKind],
    client: Arc<dyn HttpClient>,
) -> Vec<Box<dyn MetadataProvider>> {
    kinds.iter().map(|kind| kind.build(client.clone())).collect()
}

/// Issues a GET and returns the body of a successful response. Transport
/// failures and non-success statuses are logged and reported as absence.
pub(crate) fn fetch_body(
    client: &dyn HttpClient,
    provider: ProviderKind,
    doi: &Doi,
    url: &str,
) -> Option<String> {
    tracing::debug!(provider = provider.name(), doi = %doi, url, "request");
    match client.get(url) {
        Ok(response) if response.is_success() => Some(response.body),
        Ok(response) => {
            tracing::debug!(
                provider = provider.name(),
                doi = %doi,
                status = response.status,
                "non-success status"
            );
            None
        }
        Err(err) => {
            tracing::warn!(provider = provider.name(), doi = %doi, error = %err, "transport failure");
            None
        }
    }
}

pub(crate) fn parse_json(provider: ProviderKind, body: &str) -> Result<Value, EnrichError> {
    serde_json::from_str(body).map_err(|err| EnrichError::parse(provider.name(), err))
}

/// String view of a JSON scalar: strings trimmed, numbers rendered, anything
/// else (including `null`) empty.
pub(crate) fn json_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        _ => String::new(),
    }
}
