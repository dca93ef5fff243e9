use crate::pipeline::{EntityBatch, EntitySink, Pipeline, SinkError};
use crate::qbxml::EntityType;
use crate::qbxml::samples::CUSTOMER_QUERY_RESPONSE;
use crate::recovery::{RetryExecutor, RetryPolicy};
use crate::session::*;
use crate::soap::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingSink {
    batches: Mutex<Vec<EntityBatch>>,
}

impl RecordingSink {
    fn delivered(&self) -> Vec<EntityBatch> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl EntitySink for RecordingSink {
    async fn deliver(&self, batch: &EntityBatch) -> Result<(), SinkError> {
        self.batches.lock().unwrap().push(batch.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

#[derive(Default)]
struct UnavailableSink {
    attempts: AtomicU32,
}

#[async_trait]
impl EntitySink for UnavailableSink {
    async fn deliver(&self, _batch: &EntityBatch) -> Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(SinkError::Unavailable("crm maintenance window".to_string()))
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

/// Store whose writes always fail
struct BrokenStore;

#[async_trait]
impl SessionStore for BrokenStore {
    async fn create(&self, _session: &Session) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("table offline".to_string()))
    }

    async fn get(&self, _ticket: &str) -> Result<Option<Session>, StoreError> {
        Err(StoreError::Unavailable("table offline".to_string()))
    }

    async fn update_activity(
        &self,
        _ticket: &str,
        _at: DateTime<Utc>,
        _count_request: bool,
    ) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("table offline".to_string()))
    }

    async fn close(&self, _ticket: &str, _at: DateTime<Utc>) -> CleanupOutcome {
        CleanupOutcome::Failed("table offline".to_string())
    }

    async fn delete(&self, _ticket: &str) -> CleanupOutcome {
        CleanupOutcome::Failed("table offline".to_string())
    }

    fn backend_name(&self) -> &'static str {
        "broken"
    }
}

fn fast_executor() -> RetryExecutor {
    RetryExecutor::new(RetryPolicy {
        initial_delay_ms: 1,
        max_delay_ms: 2,
        jitter: false,
        ..Default::default()
    })
}

fn service_with(store: Arc<dyn SessionStore>) -> WebConnectorService {
    WebConnectorService::new(
        SessionManager::new(store, SessionManagerConfig::default()),
        Arc::new(Pipeline::new(Default::default(), fast_executor())),
    )
}

fn memory_service() -> (Arc<InMemorySessionStore>, Arc<RecordingSink>, WebConnectorService) {
    let store = Arc::new(InMemorySessionStore::new());
    let sink = Arc::new(RecordingSink::default());
    let service = service_with(store.clone()).with_sink(sink.clone());
    (store, sink, service)
}

fn envelope(method_xml: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">
  <SOAP-ENV:Body>{}</SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#,
        method_xml
    )
}

#[test]
fn test_decode_calls_ignoring_prefixes() {
    let call = ConnectorCall::decode(&envelope(
        r#"<ns1:authenticate xmlns:ns1="http://developer.intuit.com/">
             <ns1:strUserName>alice</ns1:strUserName>
             <ns1:strPassword>s3cret</ns1:strPassword>
           </ns1:authenticate>"#,
    ))
    .unwrap();
    assert_eq!(
        call,
        ConnectorCall::Authenticate {
            username: "alice".to_string(),
            password: "s3cret".to_string()
        }
    );

    let call = ConnectorCall::decode(&envelope(
        r#"<receiveResponseXML><ticket>t-1</ticket><hresult>0x80040400</hresult></receiveResponseXML>"#,
    ))
    .unwrap();
    assert_eq!(
        call,
        ConnectorCall::ReceiveResponseXml {
            ticket: "t-1".to_string(),
            response: String::new(),
            hresult: "0x80040400".to_string(),
            message: String::new(),
        }
    );
    assert_eq!(call.ticket(), Some("t-1"));
    assert_eq!(call.method_name(), "receiveResponseXML");
}

#[test]
fn test_decode_failures() {
    assert!(matches!(
        ConnectorCall::decode("<html><body/></html>"),
        Err(SoapError::NotAnEnvelope(name)) if name == "html"
    ));
    assert!(matches!(
        ConnectorCall::decode(r#"<soap:Envelope xmlns:soap="x"><soap:Header/></soap:Envelope>"#),
        Err(SoapError::MissingBody)
    ));
    assert!(matches!(
        ConnectorCall::decode(&envelope("")),
        Err(SoapError::MissingMethod)
    ));
    assert!(matches!(
        ConnectorCall::decode(&envelope("<serverVersion/>")),
        Err(SoapError::UnknownMethod(method)) if method == "serverVersion"
    ));
    assert!(matches!(
        ConnectorCall::decode("<soap:Envelope><soap:Body>"),
        Err(SoapError::Document(_))
    ));
}

#[test]
fn test_every_call_survives_encode_and_decode() {
    let calls = vec![
        ConnectorCall::Authenticate {
            username: "a&b".to_string(),
            password: "<p>".to_string(),
        },
        ConnectorCall::SendRequestXml {
            ticket: "t".to_string(),
        },
        ConnectorCall::ReceiveResponseXml {
            ticket: "t".to_string(),
            response: CUSTOMER_QUERY_RESPONSE.trim().to_string(),
            hresult: "0".to_string(),
            message: "ok".to_string(),
        },
        ConnectorCall::ConnectionError {
            ticket: "t".to_string(),
            hresult: "0x8004".to_string(),
            message: "lost".to_string(),
        },
        ConnectorCall::GetLastError {
            ticket: "t".to_string(),
        },
        ConnectorCall::CloseConnection {
            ticket: "t".to_string(),
        },
    ];

    let names: Vec<&str> = calls.iter().map(ConnectorCall::method_name).collect();
    assert_eq!(names, ConnectorCall::METHODS.to_vec());
    for call in calls {
        assert_eq!(ConnectorCall::decode(&call.to_envelope()).unwrap(), call);
    }
}

#[test]
fn test_reply_and_fault_envelopes() {
    let reply = ConnectorReply::text("sendRequestXML", "<QBXML/>").to_envelope();
    assert!(reply.contains(r#"xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/""#));
    assert!(reply.contains(
        r#"<sendRequestXMLResponse xmlns="http://developer.intuit.com/"><sendRequestXMLResult>&lt;QBXML/&gt;</sendRequestXMLResult>"#
    ));

    let reply = ConnectorReply::int("receiveResponseXML", -1);
    assert_eq!(reply.as_int(), Some(-1));
    assert_eq!(reply.as_text(), None);
    assert!(reply.to_envelope().contains("<receiveResponseXMLResult>-1</receiveResponseXMLResult>"));

    let fault = soap_fault("soap:Client", "Bad <input>", Some("line 1"));
    assert!(fault.contains("<faultcode>soap:Client</faultcode>"));
    assert!(fault.contains("<faultstring>Bad &lt;input&gt;</faultstring>"));
    assert!(fault.contains("<detail>line 1</detail>"));
    assert!(!soap_fault("soap:Server", "x", None).contains("<detail>"));
}

#[test]
fn test_credential_policy() {
    assert!(CredentialPolicy::AnyNonEmpty.accepts("u", "p"));
    assert!(!CredentialPolicy::AnyNonEmpty.accepts("u", ""));
    assert!(!CredentialPolicy::AnyNonEmpty.accepts("", "p"));

    let fixed = CredentialPolicy::Static {
        username: "qbwc".to_string(),
        password: "hunter2".to_string(),
    };
    assert!(fixed.accepts("qbwc", "hunter2"));
    assert!(!fixed.accepts("qbwc", "hunter3"));
    assert!(!fixed.accepts("other", "hunter2"));
}

#[tokio::test]
async fn test_authenticate_rejections_create_no_session() {
    let (store, _sink, service) = memory_service();
    assert_eq!(service.authenticate("alice", "").await, "nvu");
    assert_eq!(service.authenticate("", "pw").await, "nvu");
    assert!(store.is_empty());

    let service = service.with_credentials(CredentialPolicy::Static {
        username: "qbwc".to_string(),
        password: "pw".to_string(),
    });
    assert_eq!(service.authenticate("alice", "pw").await, "nvu");
    assert!(store.is_empty());
    assert_ne!(service.authenticate("qbwc", "pw").await, "nvu");
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_store_failures_map_to_sentinels() {
    let service = service_with(Arc::new(BrokenStore));
    assert_eq!(service.authenticate("alice", "pw").await, "nvu");
    assert_eq!(service.begin_exchange("t").await, "");
    assert_eq!(service.complete_exchange("t", "", "0", "").await, -1);
    assert_eq!(service.report_connection_error("t", "x", "y").await, "done");
    assert_eq!(service.close_connection("t").await, "OK");
}

#[tokio::test]
async fn test_full_exchange_hands_off_entities() {
    let (store, sink, service) = memory_service();

    let ticket = service.authenticate("alice", "pw").await;
    assert_ne!(ticket, "nvu");

    let request = service.begin_exchange(&ticket).await;
    assert!(request.contains(r#"<QBXMLMsgsRq onError="stopOnError">"#));
    assert!(request.contains(r#"<CustomerQueryRq requestID="1">"#));
    assert!(request.contains("<MaxReturned>100</MaxReturned>"));

    let percent = service
        .complete_exchange(&ticket, CUSTOMER_QUERY_RESPONSE, "", "")
        .await;
    assert_eq!(percent, 100);

    let delivered = sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].ticket, ticket);
    assert_eq!(delivered[0].owner, "alice");
    assert_eq!(delivered[0].entity_type, EntityType::Customer);
    assert_eq!(delivered[0].entities.len(), 1);

    let stored = store.get(&ticket).await.unwrap().unwrap();
    assert_eq!(stored.requests_sent, 1);

    assert_eq!(service.get_last_error(&ticket).await, "");
    assert_eq!(service.close_connection(&ticket).await, "OK");
    assert_eq!(service.begin_exchange(&ticket).await, "");
    assert_eq!(service.complete_exchange(&ticket, CUSTOMER_QUERY_RESPONSE, "0", "").await, -1);
}

#[tokio::test]
async fn test_unknown_tickets_get_sentinels() {
    let (_store, _sink, service) = memory_service();
    assert_eq!(service.begin_exchange("nope").await, "");
    assert_eq!(service.begin_exchange("").await, "");
    assert_eq!(service.complete_exchange("nope", "", "", "").await, -1);
    assert_eq!(service.report_connection_error("", "", "").await, "done");
    assert_eq!(service.close_connection("nope").await, "OK");
    assert_eq!(service.close_connection("").await, "OK");
}

#[tokio::test]
async fn test_remote_failure_and_bad_documents_skip_handoff() {
    let (_store, sink, service) = memory_service();
    let ticket = service.authenticate("alice", "pw").await;
    service.begin_exchange(&ticket).await;

    let percent = service
        .complete_exchange(&ticket, "", "0x80040408", "Could not start QuickBooks.")
        .await;
    assert_eq!(percent, 100);

    let percent = service
        .complete_exchange(&ticket, "<QBXML><broken", "0", "")
        .await;
    assert_eq!(percent, 100);
    assert!(sink.delivered().is_empty());
}

#[tokio::test]
async fn test_connection_error_closes_session() {
    let (store, _sink, service) = memory_service();
    let ticket = service.authenticate("alice", "pw").await;

    assert_eq!(
        service
            .report_connection_error(&ticket, "0x80040400", "QuickBooks found an error")
            .await,
        "done"
    );
    let stored = store.get(&ticket).await.unwrap().unwrap();
    assert_eq!(stored.status, SessionStatus::Closed);
    assert_eq!(service.begin_exchange(&ticket).await, "");
}

#[tokio::test]
async fn test_entity_sync_source_walks_types() {
    let (_store, _sink, service) = memory_service();
    let service = service.with_source(Arc::new(EntitySyncSource::new(
        vec![EntityType::Customer, EntityType::Item],
        25,
    )));
    let ticket = service.authenticate("alice", "pw").await;

    let first = service.begin_exchange(&ticket).await;
    assert!(first.contains(r#"<CustomerQueryRq requestID="1">"#));
    assert!(first.contains("<MaxReturned>25</MaxReturned>"));
    assert_eq!(
        service.complete_exchange(&ticket, CUSTOMER_QUERY_RESPONSE, "", "").await,
        50
    );

    let second = service.begin_exchange(&ticket).await;
    assert!(second.contains(r#"<ItemQueryRq requestID="2">"#));
    assert_eq!(service.complete_exchange(&ticket, "", "0x1", "fail").await, 100);

    assert_eq!(service.begin_exchange(&ticket).await, "");
}

#[tokio::test]
async fn test_sink_failure_is_retried_but_invisible() {
    let store = Arc::new(InMemorySessionStore::new());
    let sink = Arc::new(UnavailableSink::default());
    let handoff = fast_executor();
    let service = service_with(store)
        .with_sink(sink.clone())
        .with_handoff_executor(handoff.clone());

    let ticket = service.authenticate("alice", "pw").await;
    service.begin_exchange(&ticket).await;
    let percent = service
        .complete_exchange(&ticket, CUSTOMER_QUERY_RESPONSE, "0", "")
        .await;

    assert_eq!(percent, 100);
    assert_eq!(sink.attempts.load(Ordering::SeqCst), 4);
    let stats = handoff.get_error_statistics().await;
    assert_eq!(stats.error_types.get("TEMPORARY_UNAVAILABLE"), Some(&4));
}

#[tokio::test]
async fn test_handle_envelope_round_trip() {
    let (_store, _sink, service) = memory_service();

    let reply = service
        .handle_envelope(
            &ConnectorCall::Authenticate {
                username: "alice".to_string(),
                password: "pw".to_string(),
            }
            .to_envelope(),
        )
        .await
        .unwrap();
    assert!(reply.contains("<authenticateResult>"));
    assert!(!reply.contains("nvu"));

    let reply = service
        .handle_envelope(&envelope("<closeConnection><ticket>x</ticket></closeConnection>"))
        .await
        .unwrap();
    assert!(reply.contains("<closeConnectionResult>OK</closeConnectionResult>"));

    let fault = service.handle_envelope_or_fault("not a soap request").await;
    assert!(fault.contains("<soap:Fault>"));
    assert!(fault.contains("<faultcode>soap:Client</faultcode>"));
}

#[test]
fn test_wsdl_document() {
    let wsdl = wsdl_document("https://relay.example.com/qbwc?a=1&b=2");
    for method in ConnectorCall::METHODS {
        assert!(wsdl.contains(&format!(
            r#"soapAction="http://developer.intuit.com/{}""#,
            method
        )));
    }
    assert!(wsdl.contains(r#"<xsd:element name="receiveResponseXMLResult" type="xsd:int"/>"#));
    assert!(wsdl.contains(r#"location="https://relay.example.com/qbwc?a=1&amp;b=2""#));
    assert!(crate::qbxml::XmlElement::parse(&wsdl).is_ok());
}

#[test]
fn test_qwc_profiles() {
    let dev = QwcProfile::Dev.qwc_document("https://relay.example.com/dev/qbwc");
    assert!(dev.contains("<AppURL>https://relay.example.com/dev/qbwc</AppURL>"));
    assert!(dev.contains("<AppUniqueName>qbxml-relay-dev</AppUniqueName>"));
    assert!(dev.contains("<RunEveryNMinutes>30</RunEveryNMinutes>"));
    assert!(dev.contains("<FriSat>true</FriSat>"));

    let prod = QwcProfile::Prod.qwc_document("https://relay.example.com/qbwc");
    assert!(prod.contains("<RunEveryNMinutes>60</RunEveryNMinutes>"));
    assert!(prod.contains("<BeginTime>08:00:00</BeginTime>"));
    assert!(prod.contains("<FriSat>false</FriSat>"));
    assert!(crate::qbxml::XmlElement::parse(&prod).is_ok());

    assert_eq!(QwcProfile::Staging.run_every_n_minutes(), 60);
    assert_eq!(QwcProfile::Prod.file_name(), "qbxml-relay-prod.qwc");
    assert_eq!("production".parse::<QwcProfile>(), Ok(QwcProfile::Prod));
    assert!("qa".parse::<QwcProfile>().is_err());
}
