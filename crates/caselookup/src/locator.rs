//! Parallel fan-out over every configured source, then merge.
//!
//! All source/instance queries run concurrently and are awaited with a
//! settle-all join: one query failing never cancels or delays another. The
//! merge precedence, not completion order, decides the final record.
//!
//! There is no global deadline; the worst case is bounded by the slowest
//! source's own retry budget.

use crate::config::LookupConfig;
use crate::courts::CourtRegistry;
use crate::error::LookupError;
use crate::extraction::NoRecordReason;
use crate::identifier::{CaseIdentifier, CaseQuery};
use crate::merge::{merge, PartialRecords};
use crate::sources::{CaseSource, DatajudSource, Portal, PortalSource, SourceOutcome};
use crate::types::{Instance, Origin, SourceKey, UnifiedCaseRecord};
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A lookup as handed over by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    /// Case number in any punctuation style.
    pub identifier: String,
    /// Sources to query; empty means all.
    pub targets: Vec<Origin>,
    /// Court alias for the structured API (`tjsp`); derived from the
    /// identifier when absent.
    pub court: Option<String>,
}

impl LookupRequest {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            targets: Vec::new(),
            court: None,
        }
    }

    pub fn targets(mut self, targets: impl IntoIterator<Item = Origin>) -> Self {
        self.targets = targets.into_iter().collect();
        self
    }

    pub fn court(mut self, court: impl Into<String>) -> Self {
        self.court = Some(court.into());
        self
    }

    fn wants(&self, origin: Origin) -> bool {
        self.targets.is_empty() || self.targets.contains(&origin)
    }

    /// Only the structured API matches on loose digit strings.
    fn query(&self) -> Result<CaseQuery, LookupError> {
        let court = self.court.as_deref();
        if !self.targets.is_empty() && self.targets.iter().all(|o| *o == Origin::Datajud) {
            CaseQuery::loose(&self.identifier, court)
        } else {
            CaseQuery::strict(&self.identifier, court)
        }
    }
}

/// How one source/instance settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum SourceStatus {
    Found,
    NoRecord { reason: NoRecordReason },
    Unavailable,
    Failed,
}

/// Entry of the per-source error map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    /// `timeout`, `transport`, `http-status:<code>`, `retries-exhausted`,
    /// `unknown-court`, ...
    pub classification: String,
    pub message: String,
    /// Set for connectivity failures that were downgraded rather than
    /// escalated.
    pub unavailable: bool,
}

/// Raw result of the fan-out, before merging.
#[derive(Debug, Default)]
pub struct FanOut {
    pub records: PartialRecords,
    pub statuses: BTreeMap<SourceKey, SourceStatus>,
    pub errors: BTreeMap<SourceKey, SourceFailure>,
}

/// Best-effort answer: the unified record plus what went wrong where.
#[derive(Debug, Clone, Serialize)]
pub struct LookupReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    pub record: UnifiedCaseRecord,
    pub sources: BTreeMap<SourceKey, SourceStatus>,
    pub errors: BTreeMap<SourceKey, SourceFailure>,
}

impl LookupReport {
    /// One or more sources failed or were unavailable.
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }

    /// At least one source produced data.
    pub fn found(&self) -> bool {
        self.record.provenance.values().any(|v| *v)
    }
}

/// Entry point of the core: fan out, settle, merge.
pub struct CaseLocator {
    sources: Vec<Arc<dyn CaseSource>>,
}

impl CaseLocator {
    /// DataJud, e-SAJ and eproc, built from configuration. The court
    /// registry is constructed here once and shared.
    pub fn from_config(config: &LookupConfig) -> Result<Self, LookupError> {
        let registry = Arc::new(CourtRegistry::builtin());
        Ok(Self::with_sources(vec![
            Arc::new(DatajudSource::new(&config.datajud, registry)),
            Arc::new(PortalSource::new(Portal::Esaj, &config.esaj)?),
            Arc::new(PortalSource::new(Portal::Eproc, &config.eproc)?),
        ]))
    }

    pub fn with_sources(sources: Vec<Arc<dyn CaseSource>>) -> Self {
        Self { sources }
    }

    /// Look a case up everywhere requested and merge what came back.
    ///
    /// Fails only when the identifier itself is invalid; every per-source
    /// failure ends up in the report's error map.
    pub async fn locate(&self, request: &LookupRequest) -> Result<LookupReport, LookupError> {
        let query = request.query()?;
        let fan_out = self.fan_out(&query, request).await;
        Ok(LookupReport {
            identifier: query.identifier().ok().map(CaseIdentifier::dashed),
            record: merge(&fan_out.records),
            sources: fan_out.statuses,
            errors: fan_out.errors,
        })
    }

    /// Query every wanted source/instance concurrently and wait for all.
    pub async fn fan_out(&self, query: &CaseQuery, request: &LookupRequest) -> FanOut {
        let tasks = self
            .sources
            .iter()
            .filter(|s| request.wants(s.origin()))
            .flat_map(|source| {
                source.instances().iter().map(move |instance| {
                    let source = Arc::clone(source);
                    let instance: Instance = *instance;
                    async move {
                        let key = source.key(instance);
                        (key, source.query(query, instance).await)
                    }
                })
            });

        let mut out = FanOut::default();
        for (key, result) in join_all(tasks).await {
            match result {
                Ok(SourceOutcome::Found(record)) => {
                    tracing::debug!(source = %key, "record found");
                    out.statuses.insert(key, SourceStatus::Found);
                    out.records.insert(key, record);
                }
                Ok(SourceOutcome::NoRecord(reason)) => {
                    tracing::debug!(source = %key, %reason, "no record");
                    out.statuses.insert(key, SourceStatus::NoRecord { reason });
                }
                Ok(SourceOutcome::Unavailable(err)) => {
                    out.statuses.insert(key, SourceStatus::Unavailable);
                    out.errors.insert(
                        key,
                        SourceFailure {
                            classification: err.classification(),
                            message: err.to_string(),
                            unavailable: true,
                        },
                    );
                }
                Err(err) => {
                    tracing::warn!(source = %key, error = %err, "source failed");
                    out.statuses.insert(key, SourceStatus::Failed);
                    out.errors.insert(
                        key,
                        SourceFailure {
                            classification: err.classification(),
                            message: err.to_string(),
                            unavailable: false,
                        },
                    );
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_strictness() {
        let datajud_only = LookupRequest::new("0001234-56.2020").targets([Origin::Datajud]);
        assert!(datajud_only.query().is_ok());

        let everything = LookupRequest::new("0001234-56.2020");
        assert!(matches!(
            everything.query(),
            Err(LookupError::InvalidIdentifier { found: 13, .. })
        ));

        let portal = LookupRequest::new("0001234-56.2020").targets([Origin::Datajud, Origin::Esaj]);
        assert!(portal.query().is_err());
    }

    #[test]
    fn test_wants() {
        let all = LookupRequest::new("x");
        assert!(Origin::ALL.iter().all(|o| all.wants(*o)));
        let one = LookupRequest::new("x").targets([Origin::Eproc]);
        assert!(one.wants(Origin::Eproc));
        assert!(!one.wants(Origin::Esaj));
    }

    #[test]
    fn test_from_config_builds_three_sources() {
        let locator = CaseLocator::from_config(&LookupConfig::default()).unwrap();
        let origins: Vec<_> = locator.sources.iter().map(|s| s.origin()).collect();
        assert_eq!(origins, Origin::ALL);
    }
}
