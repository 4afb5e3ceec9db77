use std::sync::Arc;

use serde_json::Value;

use crate::citation::{doi_link, format_cite, format_pub_date};
use crate::domain::{Doi, MetadataRecord};
use crate::error::EnrichError;
use crate::http::{HttpClient, build_query_url};
use crate::providers::{MetadataProvider, ProviderKind, fetch_body, json_string, parse_json};

const EUROPE_PMC_SEARCH: &str = "https://www.ebi.ac.uk/europepmc/webservices/rest/search";

pub struct EuropePmc {
    client: Arc<dyn HttpClient>,
}

impl EuropePmc {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }
}

impl MetadataProvider for EuropePmc {
    fn kind(&self) -> ProviderKind {
        ProviderKind::EuropePmc
    }

    fn lookup(&self, doi: &Doi) -> Result<Option<MetadataRecord>, EnrichError> {
        let query = format!("DOI:{}", doi.as_str());
        // Only the "core" result type carries abstractText.
        let url = build_query_url(
            EUROPE_PMC_SEARCH,
            &[
                ("query", query.as_str()),
                ("format", "json"),
                ("resultType", "core"),
            ],
        );
        let Some(body) = fetch_body(self.client.as_ref(), self.kind(), doi, &url) else {
            return Ok(None);
        };
        let payload = parse_json(self.kind(), &body)?;
        if !payload.is_object() {
            return Err(EnrichError::parse(self.name(), "expected a JSON object"));
        }
        let first = payload["resultList"]["result"]
            .as_array()
            .and_then(|results| results.first());
        Ok(first.map(|result| extract_record(doi, result)))
    }
}

pub fn extract_record(doi: &Doi, result: &Value) -> MetadataRecord {
    let title = json_string(&result["title"]);
    let abstract_text = json_string(&result["abstractText"]);
    let year = json_string(&result["pubYear"]);
    let month = first_non_empty(&[
        &result["pubMonth"],
        &result["journalInfo"]["monthOfPublication"],
    ]);
    let journal = first_non_empty(&[
        &result["journalTitle"],
        &result["journalInfo"]["journal"]["title"],
    ]);
    let authors = json_string(&result["authorString"]);

    MetadataRecord {
        doi: doi.as_str().to_string(),
        cite: format_cite(&authors, &title, &journal, &year, &month),
        pub_date: format_pub_date(&year, &month),
        link: doi_link(doi.as_str()),
        title,
        abstract_text,
        year,
        month,
        journal,
        authors,
    }
}

fn first_non_empty(candidates: &[&Value]) -> String {
    candidates
        .iter()
        .map(|value| json_string(value))
        .find(|value| !value.is_empty() && value != "0")
        .unwrap_or_default()
}
