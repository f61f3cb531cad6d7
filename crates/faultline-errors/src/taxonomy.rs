//! Closed error-type taxonomy and its fixed defaults table
//!
//! Every [`ErrorType`] maps to one [`TypeDefaults`] row. The row is a table
//! lookup, never computed per instance.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a domain error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    Validation,
    NotFound,
    Conflict,
    BusinessRule,
    Authentication,
    Authorization,
    Internal,
    ExternalService,
    Database,
    Network,
    Configuration,
    Timeout,
    RateLimit,
    CircuitBreaker,
}

/// Error severity; `Medium` doubles as the "not customised" placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// Fixed defaults attached to an error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDefaults {
    pub severity: Severity,
    pub category: &'static str,
    pub http_status: u16,
    pub retryable: bool,
    pub temporary: bool,
}

const fn row(
    severity: Severity,
    category: &'static str,
    http_status: u16,
    retryable: bool,
    temporary: bool,
) -> TypeDefaults {
    TypeDefaults {
        severity,
        category,
        http_status,
        retryable,
        temporary,
    }
}

impl ErrorType {
    pub const ALL: [ErrorType; 14] = [
        ErrorType::Validation,
        ErrorType::NotFound,
        ErrorType::Conflict,
        ErrorType::BusinessRule,
        ErrorType::Authentication,
        ErrorType::Authorization,
        ErrorType::Internal,
        ErrorType::ExternalService,
        ErrorType::Database,
        ErrorType::Network,
        ErrorType::Configuration,
        ErrorType::Timeout,
        ErrorType::RateLimit,
        ErrorType::CircuitBreaker,
    ];

    /// Wire name, identical to the serde representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Validation => "VALIDATION",
            ErrorType::NotFound => "NOT_FOUND",
            ErrorType::Conflict => "CONFLICT",
            ErrorType::BusinessRule => "BUSINESS_RULE",
            ErrorType::Authentication => "AUTHENTICATION",
            ErrorType::Authorization => "AUTHORIZATION",
            ErrorType::Internal => "INTERNAL",
            ErrorType::ExternalService => "EXTERNAL_SERVICE",
            ErrorType::Database => "DATABASE",
            ErrorType::Network => "NETWORK",
            ErrorType::Configuration => "CONFIGURATION",
            ErrorType::Timeout => "TIMEOUT",
            ErrorType::RateLimit => "RATE_LIMIT",
            ErrorType::CircuitBreaker => "CIRCUIT_BREAKER",
        }
    }

    pub fn defaults(&self) -> TypeDefaults {
        use Severity::*;
        match self {
            ErrorType::Validation => row(Low, "validation", 400, false, false),
            ErrorType::NotFound => row(Low, "resource", 404, false, false),
            ErrorType::Conflict => row(Medium, "resource", 409, false, false),
            ErrorType::BusinessRule => row(Medium, "business", 422, false, false),
            ErrorType::Authentication => row(High, "security", 401, false, false),
            ErrorType::Authorization => row(High, "security", 403, false, false),
            ErrorType::Internal => row(High, "system", 500, false, false),
            ErrorType::ExternalService => row(High, "integration", 502, true, false),
            ErrorType::Database => row(High, "infrastructure", 500, true, false),
            ErrorType::Network => row(Medium, "infrastructure", 503, true, true),
            ErrorType::Configuration => row(Critical, "system", 500, false, false),
            ErrorType::Timeout => row(Medium, "performance", 504, true, true),
            ErrorType::RateLimit => row(Low, "performance", 429, true, true),
            ErrorType::CircuitBreaker => row(High, "resilience", 503, true, true),
        }
    }

    pub fn default_severity(&self) -> Severity {
        self.defaults().severity
    }

    pub fn default_category(&self) -> &'static str {
        self.defaults().category
    }

    pub fn http_status(&self) -> u16 {
        self.defaults().http_status
    }

    pub fn is_retryable(&self) -> bool {
        self.defaults().retryable
    }

    pub fn is_temporary(&self) -> bool {
        self.defaults().temporary
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_match_serde() {
        for t in ErrorType::ALL {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
        }
        for s in [Severity::Low, Severity::Medium, Severity::High, Severity::Critical] {
            let json = serde_json::to_string(&s).unwrap();
            assert_eq!(json, format!("\"{}\"", s));
        }
    }

    #[test]
    fn test_http_status_table() {
        let cases = [
            (ErrorType::Validation, 400),
            (ErrorType::NotFound, 404),
            (ErrorType::Conflict, 409),
            (ErrorType::Authentication, 401),
            (ErrorType::Authorization, 403),
            (ErrorType::Internal, 500),
            (ErrorType::Timeout, 504),
            (ErrorType::RateLimit, 429),
            (ErrorType::CircuitBreaker, 503),
        ];
        for (t, status) in cases {
            assert_eq!(t.http_status(), status, "wrong status for {t}");
        }
    }

    #[test]
    fn test_transient_types_are_retryable() {
        for t in [ErrorType::Timeout, ErrorType::RateLimit, ErrorType::CircuitBreaker] {
            assert!(t.is_retryable());
            assert!(t.is_temporary());
        }
        assert!(!ErrorType::Validation.is_retryable());
        assert!(!ErrorType::Internal.is_temporary());
    }

    #[test]
    fn test_every_type_has_a_category() {
        for t in ErrorType::ALL {
            assert!(!t.default_category().is_empty(), "{t} has no category");
        }
    }

    #[test]
    fn test_severity_default_is_placeholder() {
        assert_eq!(Severity::default(), Severity::Medium);
        assert!(Severity::Critical > Severity::Low);
    }
}
