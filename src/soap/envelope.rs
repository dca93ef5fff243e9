//! SOAP 1.1 envelope codec for the six Web Connector calls.
//!
//! Inbound envelopes are decoded once into a [`ConnectorCall`]; namespace
//! prefixes are ignored and absent parameters decode as empty strings.

use crate::env::namespace;
use crate::qbxml::{DocumentError, XmlElement};
use quick_xml::escape::escape;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SoapError {
    #[error("Malformed SOAP document: {0}")]
    Document(#[from] DocumentError),
    #[error("Invalid SOAP envelope: root element is <{0}>")]
    NotAnEnvelope(String),
    #[error("Missing SOAP body")]
    MissingBody,
    #[error("SOAP body carries no method element")]
    MissingMethod,
    #[error("Unknown method: {0}")]
    UnknownMethod(String),
}

impl SoapError {
    /// All decoding failures are the caller's fault
    pub fn fault_code(&self) -> &'static str {
        "soap:Client"
    }
}

/// One decoded Web Connector call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectorCall {
    Authenticate {
        username: String,
        password: String,
    },
    SendRequestXml {
        ticket: String,
    },
    ReceiveResponseXml {
        ticket: String,
        response: String,
        hresult: String,
        message: String,
    },
    ConnectionError {
        ticket: String,
        hresult: String,
        message: String,
    },
    GetLastError {
        ticket: String,
    },
    CloseConnection {
        ticket: String,
    },
}

impl ConnectorCall {
    pub const METHODS: [&'static str; 6] = [
        "authenticate",
        "sendRequestXML",
        "receiveResponseXML",
        "connectionError",
        "getLastError",
        "closeConnection",
    ];

    /// Wire method name
    pub fn method_name(&self) -> &'static str {
        match self {
            ConnectorCall::Authenticate { .. } => "authenticate",
            ConnectorCall::SendRequestXml { .. } => "sendRequestXML",
            ConnectorCall::ReceiveResponseXml { .. } => "receiveResponseXML",
            ConnectorCall::ConnectionError { .. } => "connectionError",
            ConnectorCall::GetLastError { .. } => "getLastError",
            ConnectorCall::CloseConnection { .. } => "closeConnection",
        }
    }

    pub fn ticket(&self) -> Option<&str> {
        match self {
            ConnectorCall::Authenticate { .. } => None,
            ConnectorCall::SendRequestXml { ticket }
            | ConnectorCall::ReceiveResponseXml { ticket, .. }
            | ConnectorCall::ConnectionError { ticket, .. }
            | ConnectorCall::GetLastError { ticket }
            | ConnectorCall::CloseConnection { ticket } => Some(ticket),
        }
    }

    pub fn decode(xml: &str) -> Result<Self, SoapError> {
        let root = XmlElement::parse(xml)?;
        if root.local_name() != "Envelope" {
            return Err(SoapError::NotAnEnvelope(root.name.clone()));
        }
        let body = root.child_local("Body").ok_or(SoapError::MissingBody)?;
        let method = body.children.first().ok_or(SoapError::MissingMethod)?;

        let param = |name: &str| {
            method
                .child_local(name)
                .and_then(XmlElement::text)
                .unwrap_or_default()
                .to_string()
        };

        let call = match method.local_name() {
            "authenticate" => ConnectorCall::Authenticate {
                username: param("strUserName"),
                password: param("strPassword"),
            },
            "sendRequestXML" => ConnectorCall::SendRequestXml {
                ticket: param("ticket"),
            },
            "receiveResponseXML" => ConnectorCall::ReceiveResponseXml {
                ticket: param("ticket"),
                response: param("response"),
                hresult: param("hresult"),
                message: param("message"),
            },
            "connectionError" => ConnectorCall::ConnectionError {
                ticket: param("ticket"),
                hresult: param("hresult"),
                message: param("message"),
            },
            "getLastError" => ConnectorCall::GetLastError {
                ticket: param("ticket"),
            },
            "closeConnection" => ConnectorCall::CloseConnection {
                ticket: param("ticket"),
            },
            other => return Err(SoapError::UnknownMethod(other.to_string())),
        };
        Ok(call)
    }

    /// Client-side request envelope for this call
    pub fn to_envelope(&self) -> String {
        let params: Vec<(&str, &str)> = match self {
            ConnectorCall::Authenticate { username, password } => vec![
                ("strUserName", username.as_str()),
                ("strPassword", password.as_str()),
            ],
            ConnectorCall::SendRequestXml { ticket }
            | ConnectorCall::GetLastError { ticket }
            | ConnectorCall::CloseConnection { ticket } => vec![("ticket", ticket.as_str())],
            ConnectorCall::ReceiveResponseXml {
                ticket,
                response,
                hresult,
                message,
            } => vec![
                ("ticket", ticket.as_str()),
                ("response", response.as_str()),
                ("hresult", hresult.as_str()),
                ("message", message.as_str()),
            ],
            ConnectorCall::ConnectionError {
                ticket,
                hresult,
                message,
            } => vec![
                ("ticket", ticket.as_str()),
                ("hresult", hresult.as_str()),
                ("message", message.as_str()),
            ],
        };

        let mut inner = String::new();
        for (name, value) in params {
            inner.push_str(&format!("<{name}>{}</{name}>", escape(value)));
        }
        wrap_body(&format!(
            "<{method} xmlns=\"{ns}\">{inner}</{method}>",
            method = self.method_name(),
            ns = namespace::WEB_CONNECTOR,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyValue {
    Text(String),
    Int(i32),
}

/// Result of one call, rendered as `<method>Response/<method>Result`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorReply {
    pub method: &'static str,
    pub value: ReplyValue,
}

impl ConnectorReply {
    pub fn text(method: &'static str, value: impl Into<String>) -> Self {
        Self {
            method,
            value: ReplyValue::Text(value.into()),
        }
    }

    pub fn int(method: &'static str, value: i32) -> Self {
        Self {
            method,
            value: ReplyValue::Int(value),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            ReplyValue::Text(text) => Some(text),
            ReplyValue::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self.value {
            ReplyValue::Int(value) => Some(value),
            ReplyValue::Text(_) => None,
        }
    }

    pub fn to_envelope(&self) -> String {
        let result = match &self.value {
            ReplyValue::Text(text) => escape(text.as_str()).into_owned(),
            ReplyValue::Int(value) => value.to_string(),
        };
        wrap_body(&format!(
            "<{method}Response xmlns=\"{ns}\"><{method}Result>{result}</{method}Result></{method}Response>",
            method = self.method,
            ns = namespace::WEB_CONNECTOR,
        ))
    }
}

/// SOAP Fault envelope
pub fn soap_fault(code: &str, message: &str, detail: Option<&str>) -> String {
    let detail = detail
        .map(|detail| format!("<detail>{}</detail>", escape(detail)))
        .unwrap_or_default();
    wrap_body(&format!(
        "<soap:Fault><faultcode>{}</faultcode><faultstring>{}</faultstring>{}</soap:Fault>",
        escape(code),
        escape(message),
        detail
    ))
}

fn wrap_body(content: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<soap:Envelope xmlns:soap=\"{}\"><soap:Body>{}</soap:Body></soap:Envelope>",
        namespace::SOAP_ENVELOPE,
        content
    )
}
