//! Public lookup portals (e-SAJ, eproc).
//!
//! Both portals are queried per instance, each instance being a separate
//! deployment. A results list is followed exactly once; connectivity-class
//! failures are downgraded to [`SourceOutcome::Unavailable`] because portal
//! rollouts are partial and some hosts are intermittently absent.

use super::{CaseSource, SourceOutcome};
use crate::acquisition::{FetchRequest, FetchedPage, Fetcher};
use crate::config::PortalConfig;
use crate::error::{FetchError, LookupError};
use crate::extraction::{self, Extraction, NoRecordReason, PortalRules};
use crate::identifier::{CaseIdentifier, CaseQuery};
use crate::types::{Instance, Origin, SourceKey};
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Portal {
    Esaj,
    Eproc,
}

impl Portal {
    pub fn origin(&self) -> Origin {
        match self {
            Portal::Esaj => Origin::Esaj,
            Portal::Eproc => Origin::Eproc,
        }
    }

    /// Built-in rule set for this portal.
    pub fn rules(&self) -> Result<PortalRules, LookupError> {
        match self {
            Portal::Esaj => PortalRules::esaj(),
            Portal::Eproc => PortalRules::eproc(),
        }
    }
}

enum Fetched {
    Page(FetchedPage),
    Unavailable(FetchError),
}

pub struct PortalSource {
    portal: Portal,
    config: PortalConfig,
    fetcher: Fetcher,
    rules: Arc<PortalRules>,
}

impl PortalSource {
    /// Adapter with the portal's built-in rules.
    pub fn new(portal: Portal, config: &PortalConfig) -> Result<Self, LookupError> {
        Ok(Self::with_rules(portal, config, portal.rules()?))
    }

    pub fn with_rules(portal: Portal, config: &PortalConfig, rules: PortalRules) -> Self {
        Self {
            portal,
            config: config.clone(),
            fetcher: Fetcher::new(config.retry),
            rules: Arc::new(rules),
        }
    }

    pub fn portal(&self) -> Portal {
        self.portal
    }

    /// The initial search request for one instance.
    pub fn search_request(&self, id: &CaseIdentifier, instance: Instance) -> FetchRequest {
        let base = self.config.base_for(instance).trim_end_matches('/');
        match (self.portal, instance) {
            (Portal::Esaj, Instance::First) => FetchRequest::get(format!("{base}/search.do"))
                .query("conversationId", "")
                .query("cbPesquisa", "NUMPROC")
                .query("numeroDigitoAnoUnificado", id.sequence_check_year())
                .query("foroNumeroUnificado", id.unit())
                .query("dadosConsulta.valorConsultaNuUnificado", id.dashed())
                .query("dadosConsulta.valorConsulta", "")
                .query("dadosConsulta.tipoNuProcesso", "UNIFICADO"),
            (Portal::Esaj, Instance::Second) => FetchRequest::get(format!("{base}/search.do"))
                .query("conversationId", "")
                .query("paginaConsulta", "0")
                .query("cbPesquisa", "NUMPROC")
                .query("numeroDigitoAnoUnificado", id.sequence_check_year())
                .query("foroNumeroUnificado", id.unit())
                .query("dePesquisaNuUnificado", id.dashed())
                .query("dePesquisa", "")
                .query("tipoNuProcesso", "UNIFICADO"),
            (Portal::Eproc, _) => FetchRequest::post_form(
                format!("{base}/externo_controlador.php"),
                vec![
                    ("txtNumProcesso".to_string(), id.dashed()),
                    ("selForo".to_string(), id.unit().to_string()),
                    ("hdnSegmento".to_string(), id.segment().to_string()),
                    ("hdnTribunal".to_string(), id.court().to_string()),
                ],
            )
            .query("acao", "processo_consulta_publica"),
        }
    }

    async fn fetch_page(
        &self,
        key: SourceKey,
        request: &FetchRequest,
    ) -> Result<Fetched, LookupError> {
        match self.fetcher.fetch(request).await {
            Ok(page) => Ok(Fetched::Page(page)),
            Err(err) if err.is_connectivity() => {
                tracing::warn!(source = %key, url = %request.url, error = %err, "portal unavailable");
                Ok(Fetched::Unavailable(err))
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn resolve_link(base: &str, href: &str) -> Result<String, LookupError> {
    Url::parse(base)
        .and_then(|b| b.join(href))
        .map(String::from)
        .map_err(|e| LookupError::Url {
            url: href.to_string(),
            message: e.to_string(),
        })
}

fn outcome_of(extraction: Extraction) -> SourceOutcome {
    match extraction {
        Extraction::Record(record) => SourceOutcome::Found(record),
        Extraction::NoRecord(reason) => SourceOutcome::NoRecord(reason),
        // A second results list is not followed.
        Extraction::Redirect(_) => SourceOutcome::NoRecord(NoRecordReason::RedirectLoop),
    }
}

#[async_trait]
impl CaseSource for PortalSource {
    fn origin(&self) -> Origin {
        self.portal.origin()
    }

    fn instances(&self) -> &[Instance] {
        &Instance::BOTH
    }

    async fn query(
        &self,
        query: &CaseQuery,
        instance: Instance,
    ) -> Result<SourceOutcome, LookupError> {
        let id = query.identifier()?;
        let key = self.key(instance);

        let page = match self.fetch_page(key, &self.search_request(id, instance)).await? {
            Fetched::Page(page) => page,
            Fetched::Unavailable(err) => return Ok(SourceOutcome::Unavailable(err)),
        };

        let href = match extraction::extract(&page.body, &self.rules, key) {
            Extraction::Redirect(href) => href,
            settled => return Ok(outcome_of(settled)),
        };

        let target = resolve_link(&page.final_url, &href)?;
        tracing::debug!(source = %key, %target, "following results list to detail page");
        let detail = match self.fetch_page(key, &FetchRequest::get(target)).await? {
            Fetched::Page(page) => page,
            Fetched::Unavailable(err) => return Ok(SourceOutcome::Unavailable(err)),
        };
        Ok(outcome_of(extraction::extract(
            &detail.body,
            &self.rules,
            key,
        )))
    }
}
