//! Source adapters: each turns one query into zero or one partial record.

pub mod datajud;
pub mod portal;

pub use datajud::{ApiHit, ApiHits, DatajudSource};
pub use portal::{Portal, PortalSource};

use crate::error::{FetchError, LookupError};
use crate::extraction::NoRecordReason;
use crate::identifier::CaseQuery;
use crate::types::{Instance, Origin, SourceKey, SourceRecord};
use async_trait::async_trait;

/// What a source answered for one instance.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    Found(SourceRecord),
    /// Queried successfully; the source has nothing for this case.
    NoRecord(NoRecordReason),
    /// Connectivity-class failure, downgraded instead of escalated.
    Unavailable(FetchError),
}

/// A place a case can be looked up.
#[async_trait]
pub trait CaseSource: Send + Sync {
    fn origin(&self) -> Origin;

    /// Instances this source is queried for.
    fn instances(&self) -> &[Instance];

    fn key(&self, instance: Instance) -> SourceKey {
        SourceKey::new(self.origin(), instance)
    }

    /// Query one instance.
    async fn query(&self, query: &CaseQuery, instance: Instance)
        -> Result<SourceOutcome, LookupError>;
}
