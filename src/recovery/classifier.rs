//! Priority-ordered failure classification.
//!
//! Legacy accounting-system failures are recognised first and matched against a
//! fine-grained table. Everything else falls through the coarse categories in
//! a fixed order, ending in a conservative non-retryable default.

use super::types::{ClassifiedError, ErrorCode, Severity};
use regex::Regex;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub code: ErrorCode,
    pub severity: Severity,
    pub retryable: bool,
}

impl Classification {
    const fn new(code: ErrorCode, severity: Severity, retryable: bool) -> Self {
        Self {
            code,
            severity,
            retryable,
        }
    }
}

enum Matcher {
    Pattern(Regex),
    Keywords(&'static [&'static str]),
}

impl Matcher {
    /// `lowered` must already be lowercase
    fn matches(&self, lowered: &str) -> bool {
        match self {
            Matcher::Pattern(pattern) => pattern.is_match(lowered),
            Matcher::Keywords(keywords) => keywords.iter().any(|keyword| lowered.contains(keyword)),
        }
    }
}

struct Rule {
    matcher: Matcher,
    classification: Classification,
}

fn pattern_rule(pattern: &str, code: ErrorCode, severity: Severity, retryable: bool) -> Rule {
    Rule {
        matcher: Matcher::Pattern(Regex::new(pattern).expect("valid classification pattern")),
        classification: Classification::new(code, severity, retryable),
    }
}

fn keyword_rule(
    keywords: &'static [&'static str],
    code: ErrorCode,
    severity: Severity,
    retryable: bool,
) -> Rule {
    Rule {
        matcher: Matcher::Keywords(keywords),
        classification: Classification::new(code, severity, retryable),
    }
}

const LEGACY_KEYWORDS: [&str; 5] = [
    "quickbooks",
    "qbxml",
    "qbwc",
    "web connector",
    "company file",
];

/// Embedded `error 3100`, `error code: 0x80040400` and similar
static LEGACY_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\berror(?:\s+code)?:?\s*(0x[0-9a-f]+|\d+)\b").expect("valid legacy code regex")
});

static LEGACY_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    use ErrorCode::*;
    use Severity::{Critical, Error, Warning};
    vec![
        pattern_rule(r"application.*busy|company.*file.*use", QbBusy, Error, true),
        pattern_rule(
            r"company.*file.*not.*found|no.*company.*file",
            CompanyFileNotFound,
            Critical,
            false,
        ),
        pattern_rule(r"company.*file.*corrupt", CompanyFileCorrupt, Critical, false),
        pattern_rule(
            r"access.*denied|permission.*denied|unauthorized",
            AccessDenied,
            Critical,
            false,
        ),
        pattern_rule(
            r"duplicate.*name|name.*already.*exists|name.*already.*in use",
            DuplicateName,
            Error,
            false,
        ),
        pattern_rule(
            r"record.*not.*found|object.*not.*found|invalid.*reference",
            RecordNotFound,
            Error,
            false,
        ),
        pattern_rule(r"invalid.*data|data.*format", InvalidData, Error, false),
        pattern_rule(r"connection.*lost|connection.*timeout", ConnectionLost, Error, true),
        pattern_rule(r"qbwc.*not.*running|web.*connector.*not", QbwcNotRunning, Critical, false),
        pattern_rule(r"version.*mismatch|unsupported.*version", VersionMismatch, Critical, false),
        pattern_rule(r"feature.*not.*supported", FeatureNotSupported, Error, false),
        pattern_rule(r"too.*many.*requests|rate.*limit", RateLimit, Warning, true),
    ]
});

static GENERIC_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        keyword_rule(
            &["network", "connection", "dns", "host", "socket"],
            ErrorCode::NetworkError,
            Severity::Error,
            true,
        ),
        keyword_rule(
            &["timeout", "timed out", "deadline exceeded"],
            ErrorCode::Timeout,
            Severity::Error,
            true,
        ),
        keyword_rule(
            &["parse", "xml", "syntax", "malformed"],
            ErrorCode::ParsingError,
            Severity::Error,
            false,
        ),
        keyword_rule(
            &["validation", "invalid", "required", "format"],
            ErrorCode::ValidationError,
            Severity::Error,
            false,
        ),
        keyword_rule(
            &[
                "authentication",
                "unauthorized",
                "invalid credentials",
                "access denied",
            ],
            ErrorCode::AuthenticationError,
            Severity::Critical,
            false,
        ),
    ]
});

const LEGACY_DEFAULT: Classification = Classification::new(ErrorCode::QbError, Severity::Error, false);
const UNCLASSIFIED: Classification =
    Classification::new(ErrorCode::UnknownError, Severity::Error, false);

/// Whether a message names the legacy accounting system or carries its error code
pub fn is_legacy_failure(message: &str) -> bool {
    let lowered = message.to_lowercase();
    LEGACY_KEYWORDS.iter().any(|keyword| lowered.contains(keyword)) || LEGACY_CODE.is_match(message)
}

/// The embedded legacy error code, if any
pub fn legacy_code(message: &str) -> Option<String> {
    LEGACY_CODE
        .captures(message)
        .and_then(|captures| captures.get(1))
        .map(|code| code.as_str().to_string())
}

/// Verdict for a raw failure message
pub fn classification_for(message: &str) -> Classification {
    let lowered = message.to_lowercase();

    let (rules, fallback): (&[Rule], Classification) = if is_legacy_failure(message) {
        (LEGACY_RULES.as_slice(), LEGACY_DEFAULT)
    } else {
        (GENERIC_RULES.as_slice(), UNCLASSIFIED)
    };

    rules
        .iter()
        .find(|rule| rule.matcher.matches(&lowered))
        .map(|rule| rule.classification)
        .unwrap_or(fallback)
}

pub fn classify(message: impl Into<String>) -> ClassifiedError {
    let message = message.into();
    let verdict = classification_for(&message);
    let mut error = ClassifiedError::new(
        message,
        verdict.code,
        verdict.severity,
        verdict.retryable,
    );
    if is_legacy_failure(&error.message) {
        error.legacy_code = legacy_code(&error.message);
    }
    error
}
