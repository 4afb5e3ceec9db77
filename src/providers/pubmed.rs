use std::sync::Arc;

use crate::citation::{format_cite, format_pub_date, join_authors};
use crate::domain::{Doi, MetadataRecord};
use crate::error::EnrichError;
use crate::http::{HttpClient, build_query_url};
use crate::providers::{MetadataProvider, ProviderKind, fetch_body, parse_json};
use crate::xml::{self, Element};

const EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const PUBMED_WEB: &str = "https://pubmed.ncbi.nlm.nih.gov";

/// NCBI E-utilities: `esearch` maps the DOI to a PMID, `efetch` returns the
/// article XML for that PMID.
pub struct PubMed {
    client: Arc<dyn HttpClient>,
}

impl PubMed {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }

    fn search_pmid(&self, doi: &Doi) -> Result<Option<String>, EnrichError> {
        let term = format!("{}[DOI]", doi.as_str());
        let url = build_query_url(
            &format!("{EUTILS_BASE}/esearch.fcgi"),
            &[("db", "pubmed"), ("term", term.as_str()), ("retmode", "json")],
        );
        let Some(body) = fetch_body(self.client.as_ref(), ProviderKind::PubMed, doi, &url) else {
            return Ok(None);
        };
        let payload = parse_json(ProviderKind::PubMed, &body)?;
        let pmid = payload["esearchresult"]["idlist"]
            .as_array()
            .and_then(|ids| ids.first())
            .and_then(|id| id.as_str())
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        Ok(pmid)
    }

    fn fetch_article(&self, doi: &Doi, pmid: &str) -> Result<Option<Element>, EnrichError> {
        let url = build_query_url(
            &format!("{EUTILS_BASE}/efetch.fcgi"),
            &[("db", "pubmed"), ("id", pmid), ("retmode", "xml")],
        );
        let Some(body) = fetch_body(self.client.as_ref(), ProviderKind::PubMed, doi, &url) else {
            return Ok(None);
        };
        xml::parse(&body)
            .map(Some)
            .map_err(|message| EnrichError::parse(ProviderKind::PubMed.name(), message))
    }
}

impl MetadataProvider for PubMed {
    fn kind(&self) -> ProviderKind {
        ProviderKind::PubMed
    }

    fn lookup(&self, doi: &Doi) -> Result<Option<MetadataRecord>, EnrichError> {
        let Some(pmid) = self.search_pmid(doi)? else {
            tracing::debug!(doi = %doi, "no PubMed id for DOI");
            return Ok(None);
        };
        let Some(root) = self.fetch_article(doi, &pmid)? else {
            return Ok(None);
        };
        Ok(Some(extract_record(doi, &pmid, &root)))
    }
}

/// Builds a record from an `efetch` document. `pmid` comes from the search
/// step and only feeds the link.
pub fn extract_record(doi: &Doi, pmid: &str, root: &Element) -> MetadataRecord {
    let title = root
        .find("ArticleTitle")
        .map(Element::plain_text)
        .unwrap_or_default();

    let abstract_text = root
        .find("Abstract")
        .map(|element| {
            element
                .find_all("AbstractText")
                .into_iter()
                .map(Element::plain_text)
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();

    let mut year = root.path_text("PubDate", "Year");
    if year.is_empty() {
        year = medline_year(&root.path_text("PubDate", "MedlineDate"));
    }
    let month = root.path_text("PubDate", "Month");
    let journal = root.path_text("Journal", "Title");

    let names = root
        .find_all("AuthorList")
        .into_iter()
        .flat_map(|list| list.children.iter().filter(|child| child.name == "Author"))
        .map(author_name)
        .collect::<Vec<_>>();
    let authors = join_authors(&names);

    MetadataRecord {
        doi: doi.as_str().to_string(),
        cite: format_cite(&authors, &title, &journal, &year, &month),
        pub_date: format_pub_date(&year, &month),
        link: format!("{PUBMED_WEB}/{pmid}"),
        title,
        abstract_text,
        year,
        month,
        journal,
        authors,
    }
}

fn author_name(author: &Element) -> String {
    let last = author.child_text("LastName");
    if last.is_empty() {
        return author.child_text("CollectiveName");
    }
    format!("{} {}", last, author.child_text("Initials"))
        .trim()
        .to_string()
}

// MedlineDate looks like "1998 Dec-1999 Jan" or "2000 Spring".
fn medline_year(value: &str) -> String {
    let digits: String = value.chars().take(4).collect();
    if digits.len() == 4 && digits.chars().all(|ch| ch.is_ascii_digit()) {
        digits
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::{FakeHttp, doi};

    const ARTICLE_XML: &str = r#"<?xml version="1.0" ?>
<!DOCTYPE PubmedArticleSet PUBLIC "-//NLM//DTD PubMedArticle, 1st January 2024//EN" "https://dtd.nlm.nih.gov/ncbi/pubmed/out/pubmed_240101.dtd">
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">12345678</PMID>
      <Article PubModel="Print">
        <Journal>
          <JournalIssue CitedMedium="Internet">
            <Volume>12</Volume>
            <PubDate>
              <Year>2019</Year>
              <Month>Jan</Month>
            </PubDate>
          </JournalIssue>
          <Title>Journal of Examples</Title>
        </Journal>
        <ArticleTitle>Role of <i>Bacillus subtilis</i> in soil.</ArticleTitle>
        <Abstract>
          <AbstractText Label="BACKGROUND" NlmCategory="BACKGROUND">X</AbstractText>
          <AbstractText Label="RESULTS" NlmCategory="RESULTS">Y</AbstractText>
        </Abstract>
        <AuthorList CompleteYN="Y">
          <Author ValidYN="Y">
            <LastName>Smith</LastName>
            <ForeName>John</ForeName>
            <Initials>J</Initials>
          </Author>
          <Author ValidYN="Y">
            <LastName>Doe</LastName>
            <ForeName>Anna B</ForeName>
            <Initials>AB</Initials>
          </Author>
          <Author ValidYN="Y">
            <CollectiveName>Example Consortium</CollectiveName>
          </Author>
        </AuthorList>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>"#;

    #[test]
    fn extracts_full_record_from_efetch_xml() {
        let root = xml::parse(ARTICLE_XML).unwrap();
        let record = extract_record(&doi("10.1000/example"), "12345678", &root);

        assert_eq!(record.title, "Role of Bacillus subtilis in soil.");
        assert_eq!(record.abstract_text, "X Y");
        assert_eq!(record.year, "2019");
        assert_eq!(record.month, "Jan");
        assert_eq!(record.journal, "Journal of Examples");
        assert_eq!(record.authors, "Smith J; Doe AB; Example Consortium");
        assert_eq!(
            record.cite,
            "Smith J; Doe AB; Example Consortium. Role of Bacillus subtilis in soil.. Journal of Examples. 2019;Jan."
        );
        assert_eq!(record.pub_date, "2019-01");
        assert_eq!(record.link, "https://pubmed.ncbi.nlm.nih.gov/12345678");
    }

    #[test]
    fn lookup_threads_pmid_into_link() {
        let http = FakeHttp::new()
            .route(
                "esearch.fcgi",
                200,
                r#"{"esearchresult":{"count":"2","idlist":["12345678","999"]}}"#,
            )
            .route("efetch.fcgi", 200, ARTICLE_XML);
        let provider = PubMed::new(http.into_arc());

        let record = provider.lookup(&doi("10.1000/example")).unwrap().unwrap();
        assert_eq!(record.doi, "10.1000/example");
        assert_eq!(record.link, "https://pubmed.ncbi.nlm.nih.gov/12345678");
    }

    #[test]
    fn search_requests_doi_field() {
        let http = Arc::new(FakeHttp::new().route(
            "esearch.fcgi",
            200,
            r#"{"esearchresult":{"idlist":[]}}"#,
        ));
        let provider = PubMed::new(http.clone());
        assert!(provider.lookup(&doi("10.1/x")).unwrap().is_none());

        let requests = http.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].contains("term=10.1%2Fx%5BDOI%5D"));
    }

    #[test]
    fn empty_id_list_is_absent() {
        let http = FakeHttp::new().route("esearch.fcgi", 200, r#"{"esearchresult":{"idlist":[]}}"#);
        let provider = PubMed::new(http.into_arc());
        assert!(provider.lookup(&doi("10.1/none")).unwrap().is_none());
    }

    #[test]
    fn failed_fetch_is_absent() {
        let http = FakeHttp::new()
            .route("esearch.fcgi", 200, r#"{"esearchresult":{"idlist":["1"]}}"#)
            .route("efetch.fcgi", 500, "oops");
        let provider = PubMed::new(http.into_arc());
        assert!(provider.lookup(&doi("10.1/x")).unwrap().is_none());
    }

    #[test]
    fn malformed_xml_is_a_fault() {
        let http = FakeHttp::new()
            .route("esearch.fcgi", 200, r#"{"esearchresult":{"idlist":["1"]}}"#)
            .route("efetch.fcgi", 200, "<PubmedArticleSet><PubmedArticle>");
        let provider = PubMed::new(http.into_arc());
        assert!(provider.lookup(&doi("10.1/x")).is_err());
    }

    #[test]
    fn medline_date_supplies_year() {
        let root = xml::parse(
            "<Set><ArticleTitle>T</ArticleTitle><PubDate><MedlineDate>1998 Dec-1999 Jan</MedlineDate></PubDate></Set>",
        )
        .unwrap();
        let record = extract_record(&doi("10.1/x"), "1", &root);
        assert_eq!(record.year, "1998");
        assert_eq!(record.pub_date, "1998");
        assert_eq!(record.cite, "");
    }
}
