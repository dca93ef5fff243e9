//! Built-in sample documents used by the health check and by tests.

/// A well-formed customer query request
pub const CUSTOMER_QUERY_REQUEST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<?qbxml version="13.0"?>
<QBXML>
  <QBXMLMsgsRq onError="stopOnError">
    <CustomerQueryRq requestID="health-1">
      <MaxReturned>1</MaxReturned>
    </CustomerQueryRq>
  </QBXMLMsgsRq>
</QBXML>"#;

/// A successful customer query response with one record
pub const CUSTOMER_QUERY_RESPONSE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<?qbxml version="13.0"?>
<QBXML>
  <QBXMLMsgsRs>
    <CustomerQueryRs requestID="health-1" statusCode="0" statusSeverity="Info" statusMessage="Status OK">
      <CustomerRet>
        <ListID>80000001-1234567890</ListID>
        <TimeCreated>2024-01-15T10:30:00-05:00</TimeCreated>
        <TimeModified>2024-02-01T08:00:00-05:00</TimeModified>
        <EditSequence>1705332600</EditSequence>
        <Name>Acme Corp</Name>
        <FullName>Acme Corp</FullName>
        <IsActive>true</IsActive>
        <CompanyName>Acme Corporation</CompanyName>
        <BillAddress>
          <Addr1>100 Main St</Addr1>
          <City>Springfield</City>
          <State>IL</State>
          <PostalCode>62701</PostalCode>
        </BillAddress>
        <Phone>555-123-4567</Phone>
        <Email>billing@acme.example</Email>
        <Balance>1250.50</Balance>
      </CustomerRet>
    </CustomerQueryRs>
  </QBXMLMsgsRs>
</QBXML>"#;
