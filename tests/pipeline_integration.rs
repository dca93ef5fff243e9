use qbxml_relay::pipeline::{BatchItem, HealthStatus, ProcessingOptions};
use qbxml_relay::qbxml::samples::CUSTOMER_QUERY_RESPONSE;
use qbxml_relay::recovery::BatchOptions;
use qbxml_relay::{Entity, EntityType, Operation, Pipeline};

const TWO_CUSTOMERS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<QBXML>
  <QBXMLMsgsRs>
    <CustomerQueryRs requestID="sync-7" statusCode="0" statusSeverity="Info" statusMessage="Status OK">
      <CustomerRet>
        <ListID>80000002-1</ListID>
        <Name>Globex</Name>
        <IsActive>false</IsActive>
      </CustomerRet>
      <CustomerRet>
        <ListID>80000003-1</ListID>
        <Name>Initech</Name>
        <Email>not-an-email</Email>
      </CustomerRet>
    </CustomerQueryRs>
  </QBXMLMsgsRs>
</QBXML>"#;

const EMPTY_RESULT: &str = r#"<QBXML>
  <QBXMLMsgsRs>
    <CustomerQueryRs requestID="sync-8" statusCode="1" statusSeverity="Info" statusMessage="A query request did not find a matching object in QuickBooks" />
  </QBXMLMsgsRs>
</QBXML>"#;

#[test]
fn test_response_metadata_and_entities() {
    let pipeline = Pipeline::default();
    let result = pipeline.process_response(TWO_CUSTOMERS, None, &ProcessingOptions::default());

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.metadata.request_id, "sync-7");
    assert_eq!(result.metadata.entity_type, EntityType::Customer);
    assert_eq!(result.metadata.operation, Operation::Query);
    assert_eq!(result.metadata.record_count, 2);
    assert_eq!(result.data.len(), 2);

    let names: Vec<_> = result
        .data
        .iter()
        .map(|entity| entity.base().name.clone().unwrap_or_default())
        .collect();
    assert_eq!(names, vec!["Globex", "Initech"]);
    assert!(!result.data[0].base().active);
    assert!(matches!(result.data[1], Entity::Customer(_)));
}

#[test]
fn test_strict_mode_rejects_invalid_entities() {
    let pipeline = Pipeline::default();
    let options = ProcessingOptions {
        validate_entities: true,
        ..Default::default()
    };
    let result = pipeline.process_response(TWO_CUSTOMERS, None, &options);

    assert!(!result.success);
    assert!(
        result
            .errors
            .iter()
            .any(|issue| issue.field == "data[1].email"),
        "errors: {:?}",
        result.errors
    );
    assert_eq!(result.data.len(), 2);
}

#[test]
fn test_non_zero_status_fails_with_status_code() {
    let pipeline = Pipeline::default();
    let result = pipeline.process_response(EMPTY_RESULT, None, &ProcessingOptions::default());

    assert!(!result.success);
    assert!(result.data.is_empty());
    assert_eq!(result.metadata.record_count, 0);
    assert_eq!(result.metadata.request_id, "sync-8");
    assert!(result.errors.iter().any(|issue| issue.code == "1"), "errors: {:?}", result.errors);
    assert!(result.warnings.iter().any(|issue| issue.code == "RESPONSE_ERROR"));
}

#[test]
fn test_expected_type_mismatch_fails() {
    let pipeline = Pipeline::default();
    let result = pipeline.process_response(
        CUSTOMER_QUERY_RESPONSE,
        Some(&EntityType::Invoice),
        &ProcessingOptions::default(),
    );
    assert!(!result.success);
    assert!(!result.errors.is_empty());
}

#[tokio::test]
async fn test_batch_over_mixed_documents() {
    let pipeline = Pipeline::default();
    let items = vec![
        BatchItem::new(CUSTOMER_QUERY_RESPONSE),
        BatchItem::new("<QBXML><QBXMLMsgsRs>"),
        BatchItem::new(TWO_CUSTOMERS),
    ];

    let report = pipeline
        .process_batch(
            &items,
            &ProcessingOptions::default(),
            BatchOptions {
                continue_on_error: true,
                max_concurrent: 2,
            },
        )
        .await;

    assert_eq!(report.summary.total, 3);
    assert_eq!(report.summary.successful, 2);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.results.len() + report.errors.len(), 3);
}

#[tokio::test]
async fn test_health_check_is_healthy_by_default() {
    let pipeline = Pipeline::default();
    let health = pipeline.health_check().await;
    assert_eq!(health.status, HealthStatus::Healthy);

    let statistics = pipeline.statistics();
    assert_eq!(statistics.version, env!("CARGO_PKG_VERSION"));
    assert!(statistics.features.contains(&"batch-processing"));
}
