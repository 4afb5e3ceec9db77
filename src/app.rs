use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use camino::Utf8Path;
use serde::Serialize;

use crate::config::ResolvedConfig;
use crate::domain::{Doi, MetadataRecord, Variant};
use crate::error::EnrichError;
use crate::http::HttpClient;
use crate::output::write_records;
use crate::providers::build_providers;
use crate::resolver::{Resolution, Resolver};

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
    /// Set when a provider's response could not be interpreted.
    pub failure: bool,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrichResult {
    pub records: Vec<MetadataRecord>,
    pub summary: RunSummary,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub resolved: usize,
    pub unresolved: usize,
    /// Provider responses that could not be interpreted.
    pub failures: usize,
    /// Accepted answers per provider key.
    pub by_provider: BTreeMap<String, usize>,
    pub output: Option<String>,
    pub variant: Option<String>,
    pub finished_at: Option<String>,
}

/// Batch driver: resolves DOIs one after another and writes the output file.
pub struct App {
    resolver: Resolver,
    variant: Variant,
    placeholder: String,
}

impl App {
    pub fn new(resolver: Resolver, variant: Variant, placeholder: impl Into<String>) -> Self {
        Self {
            resolver,
            variant,
            placeholder: placeholder.into(),
        }
    }

    /// Wires the configured providers, in order, to a shared HTTP client.
    pub fn from_config(config: &ResolvedConfig, client: Arc<dyn HttpClient>) -> Self {
        let providers = build_providers(&config.providers, client);
        let resolver = Resolver::new(
            providers,
            config.delay,
            config.acceptance,
            config.variant,
        );
        Self::new(resolver, config.variant, config.placeholder.clone())
    }

    /// One record per input DOI, in input order.
    pub fn resolve_all(&self, dois: &[Doi], sink: &dyn ProgressSink) -> EnrichResult {
        let started = Instant::now();
        let total = dois.len();
        let mut summary = RunSummary {
            total,
            variant: Some(self.variant.to_string()),
            ..RunSummary::default()
        };
        sink.event(ProgressEvent {
            message: format!(
                "phase=Resolve; {total} DOIs via {}",
                self.resolver
                    .providers()
                    .map(|kind| kind.name())
                    .collect::<Vec<_>>()
                    .join(" > ")
            ),
            elapsed: None,
            failure: false,
        });

        let mut records = Vec::with_capacity(total);
        for (idx, doi) in dois.iter().enumerate() {
            sink.event(ProgressEvent {
                message: format!("progress={}/{}; resolving {doi}", idx, total),
                elapsed: Some(started.elapsed()),
                failure: false,
            });
            let item_started = Instant::now();
            let Resolution {
                record,
                source,
                failures,
            } = self.resolver.resolve(doi);
            summary.failures += failures.len();
            for failure in &failures {
                sink.event(ProgressEvent {
                    message: format!(
                        "progress={}/{}; {} failed for {doi}: {}",
                        idx,
                        total,
                        failure.provider.name(),
                        failure.message
                    ),
                    elapsed: Some(started.elapsed()),
                    failure: true,
                });
            }
            let outcome = match source {
                Some(kind) => {
                    summary.resolved += 1;
                    *summary.by_provider.entry(kind.key().to_string()).or_default() += 1;
                    format!("found via {}", kind.name())
                }
                None => {
                    summary.unresolved += 1;
                    "not found".to_string()
                }
            };
            sink.event(ProgressEvent {
                message: format!(
                    "progress={}/{}; {doi} {outcome} latency_ms={}",
                    idx + 1,
                    total,
                    item_started.elapsed().as_millis()
                ),
                elapsed: Some(started.elapsed()),
                failure: false,
            });
            records.push(record);
        }

        EnrichResult { records, summary }
    }

    /// Resolves every DOI and writes the output file once, at the end.
    pub fn enrich(
        &self,
        dois: &[Doi],
        output: &Utf8Path,
        sink: &dyn ProgressSink,
    ) -> Result<EnrichResult, EnrichError> {
        let mut result = self.resolve_all(dois, sink);
        sink.event(ProgressEvent {
            message: format!("phase=Write; {output}"),
            elapsed: None,
            failure: false,
        });
        write_records(output, &result.records, self.variant, &self.placeholder)?;
        result.summary.output = Some(output.to_string());
        result.summary.finished_at = Some(chrono::Local::now().to_rfc3339());
        sink.event(ProgressEvent {
            message: "phase=Done; export complete".to_string(),
            elapsed: None,
            failure: false,
        });
        Ok(result)
    }
}
