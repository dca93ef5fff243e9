//! Web Connector SOAP surface: envelope codec, protocol service, request
//! sources and service descriptors.

pub mod descriptor;
pub mod envelope;
pub mod service;
pub mod source;

pub use descriptor::{QwcProfile, wsdl_document};
pub use envelope::{ConnectorCall, ConnectorReply, ReplyValue, SoapError, soap_fault};
pub use service::{CredentialPolicy, WebConnectorService};
pub use source::{EntitySyncSource, FixedQuerySource, RequestSource};

#[cfg(test)]
mod tests;
