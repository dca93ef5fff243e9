use super::envelope::{ConnectorCall, ConnectorReply, SoapError, soap_fault};
use super::source::{FixedQuerySource, RequestSource};
use crate::env::sentinel;
use crate::pipeline::{EntityBatch, EntitySink, LoggingSink, Pipeline, ProcessingOptions, ProcessingResult};
use crate::recovery::{ClassifiedError, ErrorContext, RetryExecutor, log_classified};
use crate::session::{Session, SessionManager};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Which credentials `authenticate` accepts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CredentialPolicy {
    /// Any non-empty username and password
    #[default]
    AnyNonEmpty,
    Static {
        username: String,
        password: String,
    },
}

impl CredentialPolicy {
    pub fn accepts(&self, username: &str, password: &str) -> bool {
        if username.is_empty() || password.is_empty() {
            return false;
        }
        match self {
            CredentialPolicy::AnyNonEmpty => true,
            CredentialPolicy::Static {
                username: expected_user,
                password: expected_password,
            } => username == expected_user && password == expected_password,
        }
    }
}

/// The six-method Web Connector protocol on top of sessions and the pipeline.
///
/// No method returns an error: every internal failure is logged and mapped
/// to the sentinel value the client understands.
#[derive(Clone)]
pub struct WebConnectorService {
    sessions: SessionManager,
    pipeline: Arc<Pipeline>,
    source: Arc<dyn RequestSource>,
    sink: Arc<dyn EntitySink>,
    handoff: RetryExecutor,
    credentials: CredentialPolicy,
    processing: ProcessingOptions,
}

impl std::fmt::Debug for WebConnectorService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebConnectorService")
            .field("sessions", &self.sessions)
            .field("source", &self.source.name())
            .field("sink", &self.sink.name())
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl WebConnectorService {
    pub fn new(sessions: SessionManager, pipeline: Arc<Pipeline>) -> Self {
        let handoff = pipeline.executor().clone();
        Self {
            sessions,
            pipeline,
            source: Arc::new(FixedQuerySource::default()),
            sink: Arc::new(LoggingSink),
            handoff,
            credentials: CredentialPolicy::default(),
            processing: ProcessingOptions::default(),
        }
    }

    pub fn with_source(mut self, source: Arc<dyn RequestSource>) -> Self {
        self.source = source;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn EntitySink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_handoff_executor(mut self, executor: RetryExecutor) -> Self {
        self.handoff = executor;
        self
    }

    pub fn with_credentials(mut self, credentials: CredentialPolicy) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_processing_options(mut self, options: ProcessingOptions) -> Self {
        self.processing = options;
        self
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> String {
        if !self.credentials.accepts(username, password) {
            warn!(username, "Authentication rejected");
            return sentinel::INVALID_USER.to_string();
        }

        match self.sessions.create_session(username).await {
            Ok(session) => {
                info!(username, ticket = %session.ticket, "Authenticated");
                session.ticket
            }
            Err(e) => {
                error!(username, error = %e, "Failed to create session");
                sentinel::INVALID_USER.to_string()
            }
        }
    }

    /// `sendRequestXML`: next outbound document, or empty when there is
    /// nothing to do for this ticket
    pub async fn begin_exchange(&self, ticket: &str) -> String {
        let Some(session) = self.sessions.get_session(ticket).await else {
            debug!(ticket, "No active session for exchange");
            return sentinel::NOTHING_TO_DO.to_string();
        };

        if !self.sessions.update_activity(ticket, true).await {
            debug!(ticket, "Session closed before exchange");
            return sentinel::NOTHING_TO_DO.to_string();
        }

        let Some(request) = self.source.next_request(&session).await else {
            info!(ticket, requests_sent = session.requests_sent, "No more requests for session");
            return sentinel::NOTHING_TO_DO.to_string();
        };

        let xml = request.to_xml();
        let check = self.pipeline.process_request(
            &xml,
            Some(&request.entity_type),
            &ProcessingOptions {
                request_id: Some(request.request_id.clone()),
                ..Default::default()
            },
        );
        if !check.success {
            error!(
                ticket,
                request_id = %request.request_id,
                errors = ?check.errors,
                "Refusing to send invalid request document"
            );
            return sentinel::NOTHING_TO_DO.to_string();
        }

        info!(
            ticket,
            request_id = %request.request_id,
            message = %request.message_name(),
            "Sending request"
        );
        xml
    }

    /// `receiveResponseXML`: process the client's response and report
    /// progress; -1 only when the session is invalid
    pub async fn complete_exchange(
        &self,
        ticket: &str,
        response: &str,
        hresult: &str,
        message: &str,
    ) -> i32 {
        let Some(session) = self.sessions.get_session(ticket).await else {
            warn!(ticket, "Response for unknown or expired session");
            return sentinel::INVALID_SESSION;
        };
        self.sessions.update_activity(ticket, false).await;

        if hresult.is_empty() || hresult == "0" {
            let result = self
                .pipeline
                .process_response(response, None, &self.processing);
            if result.success {
                self.hand_off(&session, result).await;
            } else {
                warn!(
                    ticket,
                    request_id = %result.metadata.request_id,
                    errors = ?result.errors,
                    "Response document rejected"
                );
            }
        } else {
            let context = ErrorContext::default().with_ticket(ticket);
            let classified =
                ClassifiedError::classify(format!("QuickBooks error {}: {}", hresult, message))
                    .with_context(&context);
            log_classified(&classified);
        }

        let percent = self.source.percent_complete(&session);
        debug!(ticket, percent, "Exchange complete");
        percent
    }

    async fn hand_off(&self, session: &Session, result: ProcessingResult) {
        if result.data.is_empty() {
            debug!(ticket = %session.ticket, "Nothing to hand off");
            return;
        }

        let batch = EntityBatch {
            ticket: session.ticket.clone(),
            owner: session.owner.clone(),
            request_id: result.metadata.request_id,
            entity_type: result.metadata.entity_type,
            entities: result.data,
        };
        let context = ErrorContext::for_request(batch.request_id.clone())
            .with_ticket(session.ticket.clone());

        if let Err(e) = self
            .handoff
            .execute(|| self.sink.deliver(&batch), &context)
            .await
        {
            error!(
                ticket = %session.ticket,
                sink = self.sink.name(),
                code = %e.code,
                error = %e,
                "Entity handoff failed"
            );
        }
    }

    /// `connectionError`: always closes the session and reports done
    pub async fn report_connection_error(&self, ticket: &str, hresult: &str, message: &str) -> String {
        warn!(ticket, hresult, message, "Client reported connection error");
        if !ticket.is_empty() {
            let _ = self.sessions.close_session(ticket).await;
        }
        sentinel::DONE.to_string()
    }

    /// Session-scoped error history is not tracked; always empty
    pub async fn get_last_error(&self, ticket: &str) -> String {
        debug!(ticket, "Last error requested");
        String::new()
    }

    pub async fn close_connection(&self, ticket: &str) -> String {
        if let Some(stats) = self.sessions.session_stats(ticket).await {
            info!(
                ticket,
                requests_sent = stats.requests_sent,
                duration_secs = stats.duration_secs,
                "Closing connection"
            );
        }
        let _ = self.sessions.close_session(ticket).await;
        sentinel::CLOSE_ACK.to_string()
    }

    pub async fn dispatch(&self, call: ConnectorCall) -> ConnectorReply {
        let method = call.method_name();
        match call {
            ConnectorCall::Authenticate { username, password } => {
                ConnectorReply::text(method, self.authenticate(&username, &password).await)
            }
            ConnectorCall::SendRequestXml { ticket } => {
                ConnectorReply::text(method, self.begin_exchange(&ticket).await)
            }
            ConnectorCall::ReceiveResponseXml {
                ticket,
                response,
                hresult,
                message,
            } => ConnectorReply::int(
                method,
                self.complete_exchange(&ticket, &response, &hresult, &message)
                    .await,
            ),
            ConnectorCall::ConnectionError {
                ticket,
                hresult,
                message,
            } => ConnectorReply::text(
                method,
                self.report_connection_error(&ticket, &hresult, &message)
                    .await,
            ),
            ConnectorCall::GetLastError { ticket } => {
                ConnectorReply::text(method, self.get_last_error(&ticket).await)
            }
            ConnectorCall::CloseConnection { ticket } => {
                ConnectorReply::text(method, self.close_connection(&ticket).await)
            }
        }
    }

    /// Decode, dispatch and encode one SOAP request
    pub async fn handle_envelope(&self, xml: &str) -> Result<String, SoapError> {
        let call = ConnectorCall::decode(xml)?;
        debug!(method = call.method_name(), "Dispatching SOAP call");
        Ok(self.dispatch(call).await.to_envelope())
    }

    /// Like [`handle_envelope`](Self::handle_envelope), rendering decode
    /// failures as a SOAP Fault
    pub async fn handle_envelope_or_fault(&self, xml: &str) -> String {
        match self.handle_envelope(xml).await {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "Rejected SOAP request");
                soap_fault(e.fault_code(), &e.to_string(), None)
            }
        }
    }
}
