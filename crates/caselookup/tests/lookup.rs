//! Source adapters and the locator against mocked endpoints.

use assert_json_diff::assert_json_include;
use caselookup::acquisition::RetryPolicy;
use caselookup::courts::CourtRegistry;
use caselookup::extraction::NoRecordReason;
use caselookup::sources::{CaseSource, DatajudSource, Portal, PortalSource, SourceOutcome};
use caselookup::{
    CaseLocator, CaseQuery, DatajudConfig, Instance, LookupConfig, LookupError, LookupRequest,
    Origin, PortalConfig, SourceKey, SourceStatus,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CASE: &str = "1000032-18.2023.8.26.0100";

const ESAJ_DETAIL: &str = include_str!("fixtures/esaj_detail.html");
const ESAJ_RESULTS: &str = include_str!("fixtures/esaj_results.html");
const ESAJ_SECOND_INSTANCE: &str = include_str!("fixtures/esaj_second_instance.html");
const EPROC_DETAIL: &str = include_str!("fixtures/eproc_detail.html");
const EPROC_RESULTS: &str = include_str!("fixtures/eproc_results.html");
const EPROC_NOT_FOUND: &str = include_str!("fixtures/eproc_not_found.html");
const DATAJUD_HITS: &str = include_str!("fixtures/datajud_hits.json");

fn fast() -> RetryPolicy {
    RetryPolicy {
        max_retries: 0,
        timeout: Duration::from_secs(5),
        backoff_step: Duration::from_millis(10),
    }
}

fn portal_config(base: &str, first: &str, second: &str) -> PortalConfig {
    PortalConfig {
        first_instance: format!("{base}/{first}"),
        second_instance: format!("{base}/{second}"),
        retry: fast(),
    }
}

/// A base URL nothing listens on.
fn dead_base() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

fn query() -> CaseQuery {
    CaseQuery::strict(CASE, None).unwrap()
}

#[tokio::test]
async fn test_esaj_detail_returned_directly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cpopg/search.do"))
        .and(query_param("cbPesquisa", "NUMPROC"))
        .and(query_param("foroNumeroUnificado", "0100"))
        .respond_with(html(ESAJ_DETAIL))
        .expect(1)
        .mount(&server)
        .await;

    let source = PortalSource::new(Portal::Esaj, &portal_config(&server.uri(), "cpopg", "cposg")).unwrap();
    match source.query(&query(), Instance::First).await.unwrap() {
        SourceOutcome::Found(record) => {
            assert_eq!(record.key, SourceKey::ESAJ_G1);
            assert_eq!(record.details.class.as_deref(), Some("Procedimento Comum Cível"));
        }
        other => panic!("expected a record, got {other:?}"),
    }
}

#[tokio::test]
async fn test_esaj_results_list_followed_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cposg/search.do"))
        .respond_with(html(ESAJ_RESULTS))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cposg/show.do"))
        .and(query_param("processo.codigo", "RI0001ABC0000"))
        .respond_with(html(ESAJ_SECOND_INSTANCE))
        .expect(1)
        .mount(&server)
        .await;

    let source = PortalSource::new(Portal::Esaj, &portal_config(&server.uri(), "cpopg", "cposg")).unwrap();
    match source.query(&query(), Instance::Second).await.unwrap() {
        SourceOutcome::Found(record) => {
            assert_eq!(record.key, SourceKey::ESAJ_G2);
            assert_eq!(record.details.judge.as_deref(), Some("Beltrano de Souza"));
        }
        other => panic!("expected a record, got {other:?}"),
    }
}

#[tokio::test]
async fn test_second_results_list_is_not_followed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cposg/search.do"))
        .respond_with(html(ESAJ_RESULTS))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cposg/show.do"))
        .respond_with(html(ESAJ_RESULTS))
        .expect(1)
        .mount(&server)
        .await;

    let source = PortalSource::new(Portal::Esaj, &portal_config(&server.uri(), "cpopg", "cposg")).unwrap();
    assert_eq!(
        source.query(&query(), Instance::Second).await.unwrap(),
        SourceOutcome::NoRecord(NoRecordReason::RedirectLoop)
    );
}

#[tokio::test]
async fn test_eproc_form_post_and_relative_link() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/eproc/externo_controlador.php"))
        .and(query_param("acao", "processo_consulta_publica"))
        .and(body_string_contains(format!("txtNumProcesso={CASE}")))
        .respond_with(html(EPROC_RESULTS))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/eproc/externo_controlador.php"))
        .and(query_param("acao", "processo_selecionar"))
        .respond_with(html(EPROC_DETAIL))
        .expect(1)
        .mount(&server)
        .await;

    let source = PortalSource::new(Portal::Eproc, &portal_config(&server.uri(), "eproc", "eproc2")).unwrap();
    match source.query(&query(), Instance::First).await.unwrap() {
        SourceOutcome::Found(record) => {
            assert_eq!(record.key, SourceKey::EPROC_G1);
            assert_eq!(record.movements.len(), 3);
        }
        other => panic!("expected a record, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_portal_is_unavailable() {
    let source = PortalSource::new(Portal::Esaj, &portal_config(&dead_base(), "cpopg", "cposg")).unwrap();
    match source.query(&query(), Instance::First).await.unwrap() {
        SourceOutcome::Unavailable(err) => assert!(err.is_connectivity()),
        other => panic!("expected unavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_portal_client_error_is_escalated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let source = PortalSource::new(Portal::Esaj, &portal_config(&server.uri(), "cpopg", "cposg")).unwrap();
    let err = source.query(&query(), Instance::First).await.unwrap_err();
    assert_eq!(err.classification(), "http-status:403");
}

#[tokio::test]
async fn test_portal_server_errors_are_escalated_after_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cpopg/search.do"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let mut config = portal_config(&server.uri(), "cpopg", "cposg");
    config.retry.max_retries = 1;
    let source: Arc<dyn CaseSource> = Arc::new(PortalSource::new(Portal::Esaj, &config).unwrap());
    let locator = CaseLocator::with_sources(vec![source]);
    let report = locator
        .locate(&LookupRequest::new(CASE).targets([Origin::Esaj]))
        .await
        .unwrap();
    assert_eq!(report.sources[&SourceKey::ESAJ_G1], SourceStatus::Failed);
    let failure = &report.errors[&SourceKey::ESAJ_G1];
    assert_eq!(failure.classification, "retries-exhausted");
    assert!(!failure.unavailable);
}

#[tokio::test]
async fn test_datajud_search_and_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api_publica_tjsp/_search"))
        .and(header("authorization", "APIKey test-key"))
        .and(body_string_contains("10000321820238260100"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DATAJUD_HITS))
        .expect(1)
        .mount(&server)
        .await;

    let config = DatajudConfig {
        base_url: server.uri(),
        api_key: "test-key".into(),
        retry: fast(),
    };
    let source = DatajudSource::new(&config, Arc::new(CourtRegistry::builtin()));
    match source.query(&query(), Instance::First).await.unwrap() {
        SourceOutcome::Found(record) => {
            assert_eq!(record.key, SourceKey::DATAJUD);
            // The first-instance hit wins over the earlier second-instance one.
            assert_eq!(record.details.class.as_deref(), Some("Procedimento Comum Cível"));
            assert_eq!(
                record.details.subject.as_deref(),
                Some("Indenização por Dano Moral, Responsabilidade Civil")
            );
            assert_eq!(record.movements.len(), 3);
            assert_eq!(
                record.movements[0].qualifiers,
                ["tipo_de_distribuicao_redistribuicao: sorteio"]
            );
        }
        other => panic!("expected a record, got {other:?}"),
    }
}

#[tokio::test]
async fn test_datajud_zero_hits() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api_publica_tjrs/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": { "total": { "value": 0 }, "hits": [] }
        })))
        .mount(&server)
        .await;

    let config = DatajudConfig {
        base_url: server.uri(),
        api_key: "k".into(),
        retry: fast(),
    };
    let source = DatajudSource::new(&config, Arc::new(CourtRegistry::builtin()));
    let q = CaseQuery::loose("0001234562020", Some("TJRS")).unwrap();
    assert_eq!(
        source.query(&q, Instance::First).await.unwrap(),
        SourceOutcome::NoRecord(NoRecordReason::NoHits)
    );
}

/// DataJud answers, e-SAJ is down, eproc answers at first instance only.
#[tokio::test]
async fn test_locate_with_one_portal_down() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api_publica_tjsp/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DATAJUD_HITS))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/eproc1/externo_controlador.php"))
        .respond_with(html(EPROC_DETAIL))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/eproc2/externo_controlador.php"))
        .respond_with(html(EPROC_NOT_FOUND))
        .mount(&server)
        .await;

    let config = LookupConfig {
        datajud: DatajudConfig {
            base_url: server.uri(),
            api_key: "k".into(),
            retry: fast(),
        },
        esaj: portal_config(&dead_base(), "cpopg", "cposg"),
        eproc: portal_config(&server.uri(), "eproc1", "eproc2"),
    };
    let locator = CaseLocator::from_config(&config).unwrap();
    let report = locator.locate(&LookupRequest::new(CASE)).await.unwrap();

    assert!(report.is_partial());
    assert!(report.found());
    assert_eq!(report.sources[&SourceKey::DATAJUD], SourceStatus::Found);
    assert_eq!(report.sources[&SourceKey::ESAJ_G1], SourceStatus::Unavailable);
    assert_eq!(report.sources[&SourceKey::ESAJ_G2], SourceStatus::Unavailable);
    assert_eq!(report.sources[&SourceKey::EPROC_G1], SourceStatus::Found);
    assert_eq!(
        report.sources[&SourceKey::EPROC_G2],
        SourceStatus::NoRecord {
            reason: NoRecordReason::NotFound
        }
    );
    assert_eq!(report.errors.len(), 2);

    let record = &report.record;
    assert_eq!(record.movements_from, Some(SourceKey::DATAJUD));
    let dates: Vec<_> = record.movements.iter().map(|m| m.date.as_str()).collect();
    assert_eq!(
        dates,
        ["20230315093000", "2023-01-10T14:02:11.000Z", "não informado"]
    );
    assert_eq!(record.parties.len(), 2);
    assert!(record.second_instance.is_none());

    assert_json_include!(
        actual: serde_json::to_value(&report).unwrap(),
        expected: json!({
            "identifier": CASE,
            "record": {
                "details": {
                    "class": "Procedimento Comum Cível",
                    "subject": "Indenização por Dano Moral, Responsabilidade Civil",
                    "deciding_body": "02 CIVEL DE SAO PAULO",
                    "distribution_date": "2023-01-10T14:02:11.000Z",
                    "judge": "FULANO DE TAL",
                    "value": "R$ 15.000,00",
                    "status": "MOVIMENTO"
                },
                "movements_from": "datajud",
                "provenance": {
                    "datajud": true,
                    "esaj:g1": false,
                    "esaj:g2": false,
                    "eproc:g1": true,
                    "eproc:g2": false
                }
            },
            "sources": {
                "datajud": { "status": "found" },
                "esaj:g1": { "status": "unavailable" },
                "eproc:g2": { "status": "no-record", "reason": "not-found" }
            },
            "errors": {
                "esaj:g1": { "classification": "transport", "unavailable": true }
            }
        })
    );
}

#[tokio::test]
async fn test_locate_only_requested_sources() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api_publica_tjsp/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DATAJUD_HITS))
        .expect(1)
        .mount(&server)
        .await;

    let config = LookupConfig {
        datajud: DatajudConfig {
            base_url: server.uri(),
            api_key: "k".into(),
            retry: fast(),
        },
        ..LookupConfig::default()
    };
    let locator = CaseLocator::from_config(&config).unwrap();
    let report = locator
        .locate(&LookupRequest::new(CASE).targets([Origin::Datajud]))
        .await
        .unwrap();
    assert_eq!(report.sources.len(), 1);
    assert!(!report.is_partial());
}

#[tokio::test]
async fn test_locate_rejects_short_identifier() {
    let locator = CaseLocator::from_config(&LookupConfig::default()).unwrap();
    let err = locator
        .locate(&LookupRequest::new("123-4"))
        .await
        .unwrap_err();
    assert!(matches!(err, LookupError::InvalidIdentifier { found: 4, .. }));
}
