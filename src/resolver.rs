use std::thread;
use std::time::Duration;

use crate::domain::{Acceptance, Doi, MetadataRecord, Variant};
use crate::providers::{MetadataProvider, ProviderKind};

/// Outcome of resolving one DOI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub record: MetadataRecord,
    /// Provider whose answer was accepted; `None` when the chain ran out.
    pub source: Option<ProviderKind>,
    /// Providers whose response could not be interpreted, in the order tried.
    pub failures: Vec<ProviderFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub provider: ProviderKind,
    pub message: String,
}

/// Tries providers in order until one answer passes the acceptance test.
///
/// Never fails: absences, transport failures and malformed responses all
/// move on to the next provider, and an exhausted chain yields an empty
/// record.
pub struct Resolver {
    providers: Vec<Box<dyn MetadataProvider>>,
    delay: Duration,
    acceptance: Acceptance,
    variant: Variant,
}

impl Resolver {
    pub fn new(
        providers: Vec<Box<dyn MetadataProvider>>,
        delay: Duration,
        acceptance: Acceptance,
        variant: Variant,
    ) -> Self {
        Self {
            providers,
            delay,
            acceptance,
            variant,
        }
    }

    pub fn providers(&self) -> impl Iterator<Item = ProviderKind> + '_ {
        self.providers.iter().map(|provider| provider.kind())
    }

    pub fn resolve(&self, doi: &Doi) -> Resolution {
        let mut failures = Vec::new();
        for provider in &self.providers {
            match provider.lookup(doi) {
                Ok(Some(record)) if self.acceptance.accepts(&record, self.variant) => {
                    tracing::info!(provider = provider.name(), doi = %doi, "resolved");
                    return Resolution {
                        record,
                        source: Some(provider.kind()),
                        failures,
                    };
                }
                Ok(Some(_)) => {
                    tracing::debug!(
                        provider = provider.name(),
                        doi = %doi,
                        acceptance = %self.acceptance,
                        "answer rejected"
                    );
                }
                Ok(None) => {
                    tracing::debug!(provider = provider.name(), doi = %doi, "no usable answer");
                }
                Err(err) => {
                    tracing::warn!(
                        provider = provider.name(),
                        doi = %doi,
                        error = %err,
                        "provider lookup failed"
                    );
                    failures.push(ProviderFailure {
                        provider: provider.kind(),
                        message: err.to_string(),
                    });
                }
            }
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
        }

        tracing::info!(doi = %doi, "no provider matched");
        Resolution {
            record: MetadataRecord::empty(doi),
            source: None,
            failures,
        }
    }
}
