use crate::pipeline::SinkError;
use crate::qbxml::{EntityType, Operation, TransformError};
use crate::session::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Critical => "Critical",
        };
        f.write_str(label)
    }
}

/// Structured failure codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    QbBusy,
    CompanyFileNotFound,
    CompanyFileCorrupt,
    AccessDenied,
    DuplicateName,
    RecordNotFound,
    InvalidData,
    ConnectionLost,
    QbwcNotRunning,
    VersionMismatch,
    FeatureNotSupported,
    RateLimit,
    QbError,
    NetworkError,
    Timeout,
    TemporaryUnavailable,
    ServerError,
    ParsingError,
    ValidationError,
    AuthenticationError,
    Cancelled,
    UnknownError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::QbBusy => "QB_BUSY",
            ErrorCode::CompanyFileNotFound => "COMPANY_FILE_NOT_FOUND",
            ErrorCode::CompanyFileCorrupt => "COMPANY_FILE_CORRUPT",
            ErrorCode::AccessDenied => "ACCESS_DENIED",
            ErrorCode::DuplicateName => "DUPLICATE_NAME",
            ErrorCode::RecordNotFound => "RECORD_NOT_FOUND",
            ErrorCode::InvalidData => "INVALID_DATA",
            ErrorCode::ConnectionLost => "CONNECTION_LOST",
            ErrorCode::QbwcNotRunning => "QBWC_NOT_RUNNING",
            ErrorCode::VersionMismatch => "VERSION_MISMATCH",
            ErrorCode::FeatureNotSupported => "FEATURE_NOT_SUPPORTED",
            ErrorCode::RateLimit => "RATE_LIMIT",
            ErrorCode::QbError => "QB_ERROR",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::TemporaryUnavailable => "TEMPORARY_UNAVAILABLE",
            ErrorCode::ServerError => "SERVER_ERROR",
            ErrorCode::ParsingError => "PARSING_ERROR",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::AuthenticationError => "AUTHENTICATION_ERROR",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a failure happened; enriched as it travels outward
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorContext {
    pub request_id: Option<String>,
    pub entity_type: Option<EntityType>,
    pub operation: Option<Operation>,
    pub ticket: Option<String>,
    pub attempt: Option<u32>,
    pub total_attempts: Option<u32>,
}

impl ErrorContext {
    pub fn for_request(request_id: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id.into()),
            ..Default::default()
        }
    }

    pub fn with_entity(mut self, entity_type: EntityType, operation: Operation) -> Self {
        self.entity_type = Some(entity_type);
        self.operation = Some(operation);
        self
    }

    pub fn with_ticket(mut self, ticket: impl Into<String>) -> Self {
        self.ticket = Some(ticket.into());
        self
    }

    /// Fill unset fields from `other`
    pub fn merge(&mut self, other: &ErrorContext) {
        if self.request_id.is_none() {
            self.request_id = other.request_id.clone();
        }
        if self.entity_type.is_none() {
            self.entity_type = other.entity_type.clone();
        }
        if self.operation.is_none() {
            self.operation = other.operation;
        }
        if self.ticket.is_none() {
            self.ticket = other.ticket.clone();
        }
        if other.attempt.is_some() {
            self.attempt = other.attempt;
            self.total_attempts = other.total_attempts;
        }
    }
}

/// A failure with its classification verdict
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}")]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedError {
    pub message: String,
    pub code: ErrorCode,
    pub severity: Severity,
    pub retryable: bool,
    pub legacy_code: Option<String>,
    pub context: ErrorContext,
}

impl ClassifiedError {
    pub fn new(
        message: impl Into<String>,
        code: ErrorCode,
        severity: Severity,
        retryable: bool,
    ) -> Self {
        Self {
            message: message.into(),
            code,
            severity,
            retryable,
            legacy_code: None,
            context: ErrorContext::default(),
        }
    }

    /// Classify a raw failure message through the rule table
    pub fn classify(message: impl Into<String>) -> Self {
        super::classifier::classify(message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(message, ErrorCode::Cancelled, Severity::Warning, false)
    }

    pub fn with_context(mut self, context: &ErrorContext) -> Self {
        self.context.merge(context);
        self
    }
}

impl From<String> for ClassifiedError {
    fn from(message: String) -> Self {
        Self::classify(message)
    }
}

impl From<&str> for ClassifiedError {
    fn from(message: &str) -> Self {
        Self::classify(message)
    }
}

impl From<anyhow::Error> for ClassifiedError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<ClassifiedError>() {
            Ok(classified) => classified,
            Err(error) => Self::classify(format!("{:#}", error)),
        }
    }
}

impl From<quick_xml::Error> for ClassifiedError {
    fn from(error: quick_xml::Error) -> Self {
        Self::new(
            format!("XML parse error: {}", error),
            ErrorCode::ParsingError,
            Severity::Error,
            false,
        )
    }
}

impl From<TransformError> for ClassifiedError {
    fn from(error: TransformError) -> Self {
        match error {
            // Business failures reported by the accounting system go through the legacy table
            TransformError::ResponseStatus { code, message } => {
                Self::classify(format!("QuickBooks error code {}: {}", code, message))
            }
            other => Self::new(other.to_string(), ErrorCode::ParsingError, Severity::Error, false),
        }
    }
}

impl From<StoreError> for ClassifiedError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Unavailable(message) => Self::new(
                format!("Session store unavailable: {}", message),
                ErrorCode::TemporaryUnavailable,
                Severity::Error,
                true,
            ),
            other => Self::classify(other.to_string()),
        }
    }
}

impl From<SinkError> for ClassifiedError {
    fn from(error: SinkError) -> Self {
        match error {
            SinkError::Unavailable(message) => Self::new(
                format!("Downstream unavailable: {}", message),
                ErrorCode::TemporaryUnavailable,
                Severity::Error,
                true,
            ),
            other => Self::classify(other.to_string()),
        }
    }
}
