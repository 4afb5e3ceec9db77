use std::sync::Arc;
use std::time::Duration;

use doi_enrich::app::{App, ProgressEvent, ProgressSink};
use doi_enrich::config::ResolvedConfig;
use doi_enrich::domain::Doi;
use doi_enrich::http::ReqwestClient;

struct NoopSink;

impl ProgressSink for NoopSink {
    fn event(&self, _event: ProgressEvent) {}
}

#[test]
#[ignore]
fn resolve_real_doi() {
    let config = ResolvedConfig {
        delay: Duration::from_millis(300),
        ..ResolvedConfig::default()
    };
    let client = ReqwestClient::new(&config).unwrap();
    let app = App::from_config(&config, Arc::new(client));
    let doi: Doi = "10.1038/s41586-020-2649-2".parse().unwrap();

    let result = app.resolve_all(&[doi], &NoopSink);
    assert_eq!(result.summary.resolved, 1);
    assert!(!result.records[0].title.is_empty());
}
