//! CNJ DataJud structured API.
//!
//! One Elasticsearch index per court; a case is found with a `match` query
//! on the digit-only number. Zero hits is an answer, not an error. DataJud
//! never carries parties, counsel, judge, claim value or status.

use super::{CaseSource, SourceOutcome};
use crate::acquisition::{FetchRequest, Fetcher};
use crate::config::DatajudConfig;
use crate::courts::CourtRegistry;
use crate::error::LookupError;
use crate::extraction::NoRecordReason;
use crate::identifier::{CaseQuery, MIN_LOOSE_DIGITS};
use crate::types::{Field, Instance, MovementEvent, Origin, SourceKey, SourceRecord};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

/// A raw hit, as returned by the API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiHit {
    pub origin: Origin,
    /// Index the hit came from (`api_publica_tjsp`).
    pub index: String,
    /// The hit's `_source` document.
    pub source: Value,
}

/// Search result: total count plus the hits returned.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiHits {
    pub total: u64,
    pub hits: Vec<ApiHit>,
}

impl ApiHits {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

pub struct DatajudSource {
    fetcher: Fetcher,
    base_url: String,
    api_key: String,
    registry: Arc<CourtRegistry>,
}

impl DatajudSource {
    pub fn new(config: &DatajudConfig, registry: Arc<CourtRegistry>) -> Self {
        Self {
            fetcher: Fetcher::new(config.retry),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            registry,
        }
    }

    /// Index to query: the caller's court alias if given, otherwise the one
    /// encoded in the identifier.
    pub fn resolve_index(&self, query: &CaseQuery) -> Result<&str, LookupError> {
        match query.court() {
            Some(alias) => self.registry.index_for(alias),
            None => {
                let id = query
                    .identifier()
                    .map_err(|_| LookupError::UnknownCourt("<none given>".to_string()))?;
                self.registry.index_for(self.registry.alias_for(id)?)
            }
        }
    }

    /// Run the match query and return the raw hits.
    pub async fn search(&self, query: &CaseQuery) -> Result<ApiHits, LookupError> {
        if query.digits().len() < MIN_LOOSE_DIGITS {
            return Err(LookupError::InvalidIdentifier {
                expected: "at least 10",
                found: query.digits().len(),
            });
        }
        let index = self.resolve_index(query)?.to_string();
        let request = FetchRequest::post_json(
            format!("{}/{index}/_search", self.base_url),
            json!({ "query": { "match": { "numeroProcesso": query.digits() } } }),
        )
        .header("Authorization", format!("APIKey {}", self.api_key));

        let page = self.fetcher.fetch(&request).await?;
        let body: Value = serde_json::from_str(&page.body).map_err(|e| LookupError::Decode {
            source_name: "datajud",
            message: e.to_string(),
        })?;
        parse_hits(&body, &index)
    }
}

fn parse_hits(body: &Value, index: &str) -> Result<ApiHits, LookupError> {
    let hits = body.get("hits").ok_or_else(|| LookupError::Decode {
        source_name: "datajud",
        message: "response has no `hits` object".to_string(),
    })?;
    let list: Vec<ApiHit> = hits["hits"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|h| h.get("_source"))
                .map(|source| ApiHit {
                    origin: Origin::Datajud,
                    index: index.to_string(),
                    source: source.clone(),
                })
                .collect()
        })
        .unwrap_or_default();
    // `total` is `{ "value": n }` on current clusters, a bare number on old ones.
    let total = hits["total"]["value"]
        .as_u64()
        .or_else(|| hits["total"].as_u64())
        .unwrap_or(list.len() as u64);
    Ok(ApiHits { total, hits: list })
}

/// Turn the hit list into one record: the first first-instance (`G1`) hit,
/// otherwise the first hit.
pub fn record_from_hits(hits: &ApiHits) -> Option<SourceRecord> {
    let hit = hits
        .hits
        .iter()
        .find(|h| h.source["grau"].as_str() == Some("G1"))
        .or_else(|| hits.hits.first())?;
    record_from_source(&hit.source)
}

fn record_from_source(source: &Value) -> Option<SourceRecord> {
    let mut record = SourceRecord::new(SourceKey::DATAJUD);
    let details = &mut record.details;

    if let Some(class) = source["classe"]["nome"].as_str() {
        details.set(Field::Class, class);
    }
    let subjects = subject_names(&source["assuntos"]);
    if !subjects.is_empty() {
        details.set(Field::Subject, subjects.join(", "));
    }
    if let Some(date) = source["dataAjuizamento"].as_str() {
        details.set(Field::DistributionDate, date);
    }
    if let Some(body) = source["orgaoJulgador"]["nome"].as_str() {
        details.set(Field::DecidingBody, body);
    }

    record.movements = source["movimentos"]
        .as_array()
        .map(|movs| movs.iter().filter_map(movement_from_value).collect())
        .unwrap_or_default();

    record.non_empty()
}

/// `assuntos` is a list of `{codigo, nome}`, sometimes nested one level.
fn subject_names(value: &Value) -> Vec<String> {
    let mut names = Vec::new();
    for item in value.as_array().into_iter().flatten() {
        match item {
            Value::Array(inner) => names.extend(
                inner
                    .iter()
                    .filter_map(|v| v["nome"].as_str())
                    .map(crate::extraction::normalize_whitespace),
            ),
            other => {
                if let Some(name) = other["nome"].as_str() {
                    names.push(crate::extraction::normalize_whitespace(name));
                }
            }
        }
    }
    names.retain(|n| !n.is_empty());
    names
}

fn movement_from_value(value: &Value) -> Option<MovementEvent> {
    let description = crate::extraction::normalize_whitespace(value["nome"].as_str()?);
    if description.is_empty() {
        return None;
    }
    let qualifiers = value["complementosTabelados"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|c| {
                    let name = c["nome"].as_str().unwrap_or("").trim();
                    let desc = c["descricao"].as_str().unwrap_or("").trim();
                    match (name.is_empty(), desc.is_empty()) {
                        (false, false) => Some(format!("{desc}: {name}")),
                        (false, true) => Some(name.to_string()),
                        (true, false) => Some(desc.to_string()),
                        (true, true) => None,
                    }
                })
                .collect()
        })
        .unwrap_or_default();
    Some(MovementEvent {
        date: value["dataHora"].as_str().unwrap_or("").trim().to_string(),
        description,
        qualifiers,
        source: Origin::Datajud,
    })
}

const DATAJUD_INSTANCES: [Instance; 1] = [Instance::First];

#[async_trait]
impl CaseSource for DatajudSource {
    fn origin(&self) -> Origin {
        Origin::Datajud
    }

    fn instances(&self) -> &[Instance] {
        &DATAJUD_INSTANCES
    }

    async fn query(
        &self,
        query: &CaseQuery,
        _instance: Instance,
    ) -> Result<SourceOutcome, LookupError> {
        let hits = self.search(query).await?;
        tracing::debug!(total = hits.total, returned = hits.hits.len(), "datajud search settled");
        if hits.is_empty() {
            return Ok(SourceOutcome::NoRecord(NoRecordReason::NoHits));
        }
        Ok(match record_from_hits(&hits) {
            Some(record) => SourceOutcome::Found(record),
            None => SourceOutcome::NoRecord(NoRecordReason::Empty),
        })
    }
}
