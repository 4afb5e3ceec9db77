use std::sync::Arc;

use serde_json::Value;

use crate::citation::{doi_link, format_cite, join_authors};
use crate::domain::{Doi, MetadataRecord};
use crate::error::EnrichError;
use crate::http::{HttpClient, encode_path};
use crate::providers::{MetadataProvider, ProviderKind, fetch_body, json_string, parse_json};

const S2_PAPER_BASE: &str = "https://api.semanticscholar.org/graph/v1/paper";
const S2_FIELDS: &str = "title,abstract,year,venue,authors";

pub struct SemanticScholar {
    client: Arc<dyn HttpClient>,
}

impl SemanticScholar {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }
}

impl MetadataProvider for SemanticScholar {
    fn kind(&self) -> ProviderKind {
        ProviderKind::SemanticScholar
    }

    fn lookup(&self, doi: &Doi) -> Result<Option<MetadataRecord>, EnrichError> {
        let url = format!(
            "{}/DOI:{}?fields={}",
            S2_PAPER_BASE,
            encode_path(doi.as_str()),
            S2_FIELDS
        );
        let Some(body) = fetch_body(self.client.as_ref(), self.kind(), doi, &url) else {
            return Ok(None);
        };
        let payload = parse_json(self.kind(), &body)?;
        if !payload.is_object() {
            return Err(EnrichError::parse(self.name(), "expected a JSON object"));
        }
        Ok(Some(extract_record(doi, &payload)))
    }
}

/// The Graph API has no month, so `month` stays empty and `pub_date` is the
/// year alone.
pub fn extract_record(doi: &Doi, paper: &Value) -> MetadataRecord {
    let title = json_string(&paper["title"]);
    let abstract_text = json_string(&paper["abstract"]);
    let year = json_string(&paper["year"]);
    let month = String::new();
    let journal = json_string(&paper["venue"]);
    let names = paper["authors"]
        .as_array()
        .map(|authors| {
            authors
                .iter()
                .map(|author| json_string(&author["name"]))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    let authors = join_authors(&names);

    MetadataRecord {
        doi: doi.as_str().to_string(),
        cite: format_cite(&authors, &title, &journal, &year, &month),
        pub_date: year.clone(),
        link: doi_link(doi.as_str()),
        title,
        abstract_text,
        year,
        month,
        journal,
        authors,
    }
}
