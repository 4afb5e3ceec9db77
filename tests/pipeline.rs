use std::sync::{Arc, Mutex};
use std::time::Duration;

use camino::Utf8PathBuf;

use doi_enrich::app::{App, ProgressEvent, ProgressSink};
use doi_enrich::config::ResolvedConfig;
use doi_enrich::domain::{Acceptance, Doi, MetadataRecord, Variant};
use doi_enrich::error::EnrichError;
use doi_enrich::http::{HttpClient, HttpResponse};
use doi_enrich::providers::{MetadataProvider, ProviderKind};
use doi_enrich::resolver::Resolver;

struct NoopSink;

impl ProgressSink for NoopSink {
    fn event(&self, _event: ProgressEvent) {}
}

#[derive(Default)]
struct RecordingSink {
    messages: Mutex<Vec<String>>,
    failures: Mutex<Vec<String>>,
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        if event.failure {
            self.failures.lock().unwrap().push(event.message.clone());
        }
        self.messages.lock().unwrap().push(event.message);
    }
}

/// Answers only for DOIs ending in an even digit.
struct EvenOnly;

impl MetadataProvider for EvenOnly {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Crossref
    }

    fn lookup(&self, doi: &Doi) -> Result<Option<MetadataRecord>, EnrichError> {
        let last = doi.as_str().chars().last().and_then(|ch| ch.to_digit(10));
        match last {
            Some(digit) if digit % 2 == 0 => {
                let mut record = MetadataRecord::empty(doi);
                record.title = format!("Title for {doi}");
                Ok(Some(record))
            }
            Some(_) => Ok(None),
            None => Err(EnrichError::parse("Crossref", "no digit")),
        }
    }
}

fn dois(values: &[&str]) -> Vec<Doi> {
    values.iter().map(|value| value.parse().unwrap()).collect()
}

#[test]
fn resolve_all_preserves_length_and_order() {
    let resolver = Resolver::new(
        vec![Box::new(EvenOnly)],
        Duration::ZERO,
        Acceptance::Any,
        Variant::Full,
    );
    let app = App::new(resolver, Variant::Full, "");
    let input = dois(&["10.1/2", "10.1/3", "10.1/x", "10.1/4", "10.1/2"]);

    let result = app.resolve_all(&input, &NoopSink);

    assert_eq!(result.records.len(), input.len());
    for (record, doi) in result.records.iter().zip(&input) {
        assert_eq!(record.doi, doi.as_str());
    }
    assert_eq!(result.records[0].title, "Title for 10.1/2");
    assert_eq!(result.records[1].title, "");
    assert_eq!(result.records[2].title, "");
    assert_eq!(result.summary.total, 5);
    assert_eq!(result.summary.resolved, 3);
    assert_eq!(result.summary.unresolved, 2);
    assert_eq!(result.summary.by_provider.get("crossref"), Some(&3));
}

#[test]
fn resolve_all_reports_progress_per_doi() {
    let resolver = Resolver::new(
        vec![Box::new(EvenOnly)],
        Duration::ZERO,
        Acceptance::Any,
        Variant::Basic,
    );
    let app = App::new(resolver, Variant::Basic, "");
    let sink = RecordingSink::default();

    app.resolve_all(&dois(&["10.1/2", "10.1/3"]), &sink);

    let messages = sink.messages.lock().unwrap();
    assert!(messages[0].starts_with("phase=Resolve; 2 DOIs"));
    assert!(messages.iter().any(|m| m.starts_with("progress=2/2; 10.1/3 not found")));
    assert!(
        messages
            .iter()
            .any(|m| m.starts_with("progress=1/2; 10.1/2 found via Crossref"))
    );
}

#[test]
fn provider_faults_reach_the_progress_sink() {
    let resolver = Resolver::new(
        vec![Box::new(EvenOnly)],
        Duration::ZERO,
        Acceptance::Any,
        Variant::Full,
    );
    let app = App::new(resolver, Variant::Full, "");
    let sink = RecordingSink::default();

    let result = app.resolve_all(&dois(&["10.1/2", "10.1/x"]), &sink);

    let failures = sink.failures.lock().unwrap();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("Crossref failed for 10.1/x"));
    assert!(failures[0].contains("no digit"));
    assert_eq!(result.summary.failures, 1);
    assert_eq!(result.summary.unresolved, 1);
    assert_eq!(result.records[1].doi, "10.1/x");
}

/// Routes by URL substring; everything else is a 404.
struct FakeHttp {
    routes: Vec<(&'static str, u16, &'static str)>,
    requests: Mutex<Vec<String>>,
}

impl HttpClient for FakeHttp {
    fn get(&self, url: &str) -> Result<HttpResponse, EnrichError> {
        self.requests.lock().unwrap().push(url.to_string());
        for (fragment, status, body) in &self.routes {
            if url.contains(*fragment) {
                return Ok(HttpResponse {
                    status: *status,
                    body: body.to_string(),
                });
            }
        }
        Ok(HttpResponse {
            status: 404,
            body: String::new(),
        })
    }
}

fn test_config(output: Utf8PathBuf, variant: Variant, placeholder: &str) -> ResolvedConfig {
    ResolvedConfig {
        delay: Duration::ZERO,
        variant,
        placeholder: placeholder.to_string(),
        output,
        ..ResolvedConfig::default()
    }
}

#[test]
fn falls_back_to_crossref_and_writes_output() {
    let temp = tempfile::tempdir().unwrap();
    let output = Utf8PathBuf::from_path_buf(temp.path().join("output.csv")).unwrap();

    let http = Arc::new(FakeHttp {
        routes: vec![
            ("esearch.fcgi", 200, r#"{"esearchresult":{"idlist":[]}}"#),
            ("europepmc", 200, r#"{"resultList":{"result":[]}}"#),
            (
                "api.crossref.org/works/10.1000/found",
                200,
                r#"{"message":{"title":["T"],"container-title":["J"],
                    "author":[{"given":"Jane","family":"Doe"}],
                    "issued":{"date-parts":[[2020,5]]},
                    "abstract":"<jats:p>Sample text</jats:p>"}}"#,
            ),
        ],
        requests: Mutex::new(Vec::new()),
    });
    let config = test_config(output.clone(), Variant::Full, "");
    let app = App::from_config(&config, http.clone());

    let input = dois(&["10.1000/found", "10.1000/missing"]);
    let result = app.enrich(&input, &output, &NoopSink).unwrap();

    let found = &result.records[0];
    assert_eq!(found.authors, "Doe Jane");
    assert_eq!(found.cite, "Doe Jane. T. J. 2020;5.");
    assert_eq!(found.pub_date, "2020-05");
    assert_eq!(found.abstract_text, "Sample text");
    assert_eq!(result.records[1], MetadataRecord::empty(&input[1]));
    assert_eq!(result.summary.output.as_deref(), Some(output.as_str()));

    // First DOI stops at Crossref; the second exhausts all four providers.
    let requests = http.requests.lock().unwrap();
    assert_eq!(requests.len(), 3 + 4);
    assert!(requests[3].contains("esearch.fcgi"));
    assert!(requests[6].contains("api.semanticscholar.org"));

    let written = std::fs::read_to_string(&output).unwrap();
    let lines = written.lines().collect::<Vec<_>>();
    assert_eq!(
        lines[0],
        "DOI;Title;Abstract;Year;Month;Journal;Authors;Cite;Pub_Date;Link"
    );
    assert_eq!(
        lines[1],
        "10.1000/found;T;Sample text;2020;5;J;Doe Jane;\"Doe Jane. T. J. 2020;5.\";2020-05;https://doi.org/10.1000/found"
    );
    assert_eq!(lines[2], "10.1000/missing;;;;;;;;;");
    assert_eq!(lines.len(), 3);
}

#[test]
fn basic_variant_uses_placeholder_for_unresolved() {
    let temp = tempfile::tempdir().unwrap();
    let output = Utf8PathBuf::from_path_buf(temp.path().join("basic.csv")).unwrap();

    let http = Arc::new(FakeHttp {
        routes: Vec::new(),
        requests: Mutex::new(Vec::new()),
    });
    let config = test_config(output.clone(), Variant::Basic, "not available");
    let app = App::from_config(&config, http);

    app.enrich(&dois(&["10.9/none"]), &output, &NoopSink).unwrap();

    let written = std::fs::read_to_string(&output).unwrap();
    assert_eq!(
        written,
        "DOI;Title;Abstract\n10.9/none;not available;not available\n"
    );
}
