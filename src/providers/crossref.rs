use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::citation::{doi_link, format_cite, format_pub_date, join_authors, strip_jats};
use crate::domain::{Doi, MetadataRecord};
use crate::error::EnrichError;
use crate::http::{HttpClient, encode_path};
use crate::providers::{MetadataProvider, ProviderKind, fetch_body, json_string};

const CROSSREF_BASE: &str = "https://api.crossref.org";

pub struct Crossref {
    client: Arc<dyn HttpClient>,
}

impl Crossref {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }
}

impl MetadataProvider for Crossref {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Crossref
    }

    fn lookup(&self, doi: &Doi) -> Result<Option<MetadataRecord>, EnrichError> {
        let url = format!("{}/works/{}", CROSSREF_BASE, encode_path(doi.as_str()));
        let Some(body) = fetch_body(self.client.as_ref(), self.kind(), doi, &url) else {
            return Ok(None);
        };
        let payload: CrossrefResponse =
            serde_json::from_str(&body).map_err(|err| EnrichError::parse(self.name(), err))?;
        Ok(Some(extract_record(doi, &payload.message)))
    }
}

#[derive(Debug, Deserialize)]
pub struct CrossrefResponse {
    pub message: CrossrefMessage,
}

#[derive(Debug, Default, Deserialize)]
pub struct CrossrefMessage {
    #[serde(default)]
    pub title: Option<Vec<String>>,
    #[serde(rename = "abstract", default)]
    pub abstract_text: Option<String>,
    #[serde(rename = "container-title", default)]
    pub container_title: Option<Vec<String>>,
    #[serde(default)]
    pub author: Option<Vec<CrossrefAuthor>>,
    #[serde(default)]
    pub issued: Option<CrossrefDate>,
    #[serde(default)]
    pub published: Option<CrossrefDate>,
}

#[derive(Debug, Deserialize)]
pub struct CrossrefAuthor {
    #[serde(default)]
    pub given: Option<String>,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// `date-parts` is `[[year, month?, day?]]`; Crossref uses `[[null]]` for
/// unknown dates, so the parts are kept as raw JSON.
#[derive(Debug, Deserialize)]
pub struct CrossrefDate {
    #[serde(rename = "date-parts", default)]
    pub date_parts: Vec<Vec<Value>>,
}

impl CrossrefDate {
    fn part(&self, idx: usize) -> String {
        self.date_parts
            .first()
            .and_then(|parts| parts.get(idx))
            .map(json_string)
            .unwrap_or_default()
    }
}

pub fn extract_record(doi: &Doi, message: &CrossrefMessage) -> MetadataRecord {
    let title = first_of(&message.title);
    let abstract_text = message
        .abstract_text
        .as_deref()
        .map(strip_jats)
        .unwrap_or_default();
    let journal = first_of(&message.container_title);

    let date = [&message.issued, &message.published]
        .into_iter()
        .flatten()
        .find(|date| !date.part(0).is_empty());
    let year = date.map(|date| date.part(0)).unwrap_or_default();
    let month = date.map(|date| date.part(1)).unwrap_or_default();

    let names = message
        .author
        .iter()
        .flatten()
        .map(|author| {
            let family = author.family.as_deref().unwrap_or("").trim();
            let given = author.given.as_deref().unwrap_or("").trim();
            let full = format!("{family} {given}").trim().to_string();
            if full.is_empty() {
                author.name.clone().unwrap_or_default()
            } else {
                full
            }
        })
        .collect::<Vec<_>>();
    let authors = join_authors(&names);

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

fn first_of(values: &Option<Vec<String>>) -> String {
    values
        .as_ref()
        .and_then(|items| items.first())
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::{FakeHttp, doi};

    #[test]
    fn builds_citation_from_works_message() {
        let body = r#"{
          "status": "ok",
          "message": {
            "title": ["T"],
            "container-title": ["J"],
            "author": [{"given": "Jane", "family": "Doe", "sequence": "first"}],
            "issued": {"date-parts": [[2020, 5]]}
          }
        }"#;
        let http = FakeHttp::new().route("api.crossref.org/works/10.1000/cr", 200, body);
        let provider = Crossref::new(http.into_arc());

        let record = provider.lookup(&doi("10.1000/cr")).unwrap().unwrap();
        assert_eq!(record.authors, "Doe Jane");
        assert_eq!(record.cite, "Doe Jane. T. J. 2020;5.");
        assert_eq!(record.pub_date, "2020-05");
        assert_eq!(record.year, "2020");
        assert_eq!(record.month, "5");
        assert_eq!(record.link, "https://doi.org/10.1000/cr");
    }

    #[test]
    fn strips_jats_wrapper_from_abstract() {
        let message: CrossrefMessage =
            serde_json::from_str(r#"{"abstract": "<jats:p>Sample text</jats:p>"}"#).unwrap();
        let record = extract_record(&doi("10.1/x"), &message);
        assert_eq!(record.abstract_text, "Sample text");
    }

    #[test]
    fn null_date_parts_and_blank_authors() {
        let message: CrossrefMessage = serde_json::from_str(
            r#"{
              "issued": {"date-parts": [[null]]},
              "published": {"date-parts": [[2011]]},
              "author": [{"given": "", "family": ""}, {"family": "Roe"}]
            }"#,
        )
        .unwrap();
        let record = extract_record(&doi("10.1/x"), &message);
        assert_eq!(record.year, "2011");
        assert_eq!(record.month, "");
        assert_eq!(record.pub_date, "2011");
        assert_eq!(record.authors, "Roe");
        assert_eq!(record.title, "");
    }

    #[test]
    fn not_found_is_absent() {
        let http = FakeHttp::new().route("api.crossref.org", 404, "Resource not found.");
        let provider = Crossref::new(http.into_arc());
        assert!(provider.lookup(&doi("10.1/missing")).unwrap().is_none());
    }

    #[test]
    fn transport_failure_is_absent() {
        let http = FakeHttp::new().fail("api.crossref.org", "connection reset");
        let provider = Crossref::new(http.into_arc());
        assert!(provider.lookup(&doi("10.1/x")).unwrap().is_none());
    }
}
