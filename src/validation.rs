//! Query Validator
//!
//! Lexical checks on an assembled SOQL string before it leaves the service:
//! required clauses present, no data-modifying keywords, LIMIT within bounds.
//! Nothing here parses the query; structure was already enforced by the builder.

use crate::error::{Result, SoqlError};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

/// Keywords that must never appear, reported in this order.
pub const FORBIDDEN_KEYWORDS: [&str; 6] = ["INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER"];

lazy_static! {
    // A keyword hit must not touch a letter or `_` on the left, nor a letter,
    // digit or `_` on the right: `CreatedDate` and `IsDeleted` pass, `10DROP` does not.
    static ref FORBIDDEN_PATTERNS: Vec<(&'static str, Regex)> = FORBIDDEN_KEYWORDS
        .iter()
        .map(|kw| {
            let pattern = format!(r"(?i)(?:^|[^A-Za-z_]){}(?:$|[^A-Za-z0-9_])", kw);
            (*kw, Regex::new(&pattern).unwrap())
        })
        .collect();
    static ref QUOTED_LITERAL: Regex = Regex::new(r"'(?:[^'\\]|\\.)*'").unwrap();
    static ref LIMIT_VALUE: Regex = Regex::new(r"(?i)\bLIMIT\b\s*(\d*)").unwrap();
}

/// Outcome of a validation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Invalid { reason: String },
}

impl ValidationOutcome {
    fn invalid(reason: impl Into<String>) -> Self {
        ValidationOutcome::Invalid { reason: reason.into() }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ValidationOutcome::Valid => None,
            ValidationOutcome::Invalid { reason } => Some(reason),
        }
    }
}

/// Validator limits
#[derive(Debug, Clone)]
pub struct QueryValidator {
    pub max_limit: u64,
}

impl Default for QueryValidator {
    fn default() -> Self {
        Self { max_limit: 2000 }
    }
}

impl QueryValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the checks in order, stopping at the first failure.
    pub fn validate(&self, text: &str) -> ValidationOutcome {
        if text.trim().is_empty() {
            return ValidationOutcome::invalid("missing query");
        }

        let upper = text.to_uppercase();
        if !upper.contains("SELECT ") {
            return ValidationOutcome::invalid("missing SELECT clause");
        }
        if !upper.contains(" FROM ") {
            return ValidationOutcome::invalid("missing FROM clause");
        }

        if let Some((keyword, _)) = FORBIDDEN_PATTERNS.iter().find(|(_, re)| re.is_match(text)) {
            return ValidationOutcome::invalid(format!("forbidden keyword: {}", keyword));
        }

        // LIMIT is read outside string literals, from the last occurrence
        let unquoted = QUOTED_LITERAL.replace_all(text, "''");
        if !unquoted.to_uppercase().contains(" LIMIT ") {
            return ValidationOutcome::invalid("missing LIMIT clause");
        }

        let raw_limit = LIMIT_VALUE
            .captures_iter(&unquoted)
            .last()
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .unwrap_or_default();

        if raw_limit.is_empty() {
            return ValidationOutcome::invalid("invalid LIMIT value");
        }
        // digits that overflow u64 are over any sane maximum anyway
        match raw_limit.parse::<u64>() {
            Ok(limit) if limit <= self.max_limit => ValidationOutcome::Valid,
            _ => ValidationOutcome::invalid("limit exceeds maximum"),
        }
    }

    /// Like `validate`, but as a `Result` for `?` callers.
    pub fn ensure_valid(&self, text: &str) -> Result<()> {
        match self.validate(text) {
            ValidationOutcome::Valid => Ok(()),
            ValidationOutcome::Invalid { reason } => {
                warn!("Rejected query ({}): {}", reason, text);
                Err(SoqlError::Validation(reason))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(text: &str) -> Option<String> {
        QueryValidator::new().validate(text).reason().map(str::to_string)
    }

    #[test]
    fn test_valid_query() {
        let outcome = QueryValidator::new().validate(
            "SELECT Id, Name, CreatedDate FROM Account WHERE IsDeleted = false ORDER BY Name LIMIT 1000",
        );
        assert!(outcome.is_valid());
    }

    #[test]
    fn test_required_clauses_in_order() {
        assert_eq!(reason("").as_deref(), Some("missing query"));
        assert_eq!(reason("   ").as_deref(), Some("missing query"));
        assert_eq!(reason("Id FROM Account LIMIT 5").as_deref(), Some("missing SELECT clause"));
        assert_eq!(reason("select Id LIMIT 5").as_deref(), Some("missing FROM clause"));
        assert_eq!(reason("select Id from Account").as_deref(), Some("missing LIMIT clause"));
    }

    #[test]
    fn test_forbidden_keywords() {
        assert_eq!(
            reason("SELECT Id FROM Account LIMIT 10; DROP TABLE Account").as_deref(),
            Some("forbidden keyword: DROP")
        );
        assert_eq!(
            reason("select id from account where x = 1; drop table account limit 1").as_deref(),
            Some("forbidden keyword: DROP")
        );
        // first keyword in list order wins
        assert_eq!(
            reason("SELECT Id FROM Account LIMIT 1 DROP DELETE").as_deref(),
            Some("forbidden keyword: DELETE")
        );
        // checked before LIMIT
        assert_eq!(
            reason("SELECT Id FROM Account WHERE (ALTER)").as_deref(),
            Some("forbidden keyword: ALTER")
        );
    }

    #[test]
    fn test_keyword_boundaries() {
        // digits and quotes next to a keyword do not hide it
        assert_eq!(
            reason("SELECT Id FROM Account LIMIT 10DROP").as_deref(),
            Some("forbidden keyword: DROP")
        );
        assert_eq!(
            reason("SELECT Id FROM Account WHERE Name = 'x'DROP LIMIT 5").as_deref(),
            Some("forbidden keyword: DROP")
        );
        assert_eq!(
            reason("SELECT Id FROM Account WHERE Name = 'drop' LIMIT 5").as_deref(),
            Some("forbidden keyword: DROP")
        );
        assert_eq!(
            reason("SELECT Id FROM Account WHERE Name = 'a'\nUPDATE LIMIT 5").as_deref(),
            Some("forbidden keyword: UPDATE")
        );
        // letters or underscores next to a keyword make it part of an identifier
        assert_eq!(reason("SELECT Id, DropOff__c, Q1Update__c FROM Account LIMIT 5"), None);
        assert_eq!(reason("SELECT Id, Pre_Alter FROM Account LIMIT 5"), None);
    }

    #[test]
    fn test_limit_inside_literals_ignored() {
        assert_eq!(
            reason("SELECT Id FROM Account WHERE Description LIKE '%credit limit%' LIMIT 1000"),
            None
        );
        assert_eq!(
            reason("SELECT Id FROM Account WHERE Name = 'limit 5' LIMIT 5000").as_deref(),
            Some("limit exceeds maximum")
        );
        assert_eq!(
            reason("SELECT Id FROM Account WHERE Name = 'no limit here'").as_deref(),
            Some("missing LIMIT clause")
        );
        assert_eq!(
            reason("SELECT Id FROM Account WHERE Name = 'it''s a limit 5' LIMIT 3000").as_deref(),
            Some("limit exceeds maximum")
        );
    }

    #[test]
    fn test_keywords_inside_identifiers_allowed() {
        let text = "SELECT Id, CreatedDate, LastUpdated__c FROM Case WHERE IsDeleted = false LIMIT 1000";
        assert_eq!(reason(text), None);
    }

    #[test]
    fn test_limit_bounds() {
        assert_eq!(reason("SELECT Id FROM Account LIMIT 1000"), None);
        assert_eq!(reason("SELECT Id FROM Account LIMIT 2000"), None);
        assert_eq!(
            reason("SELECT Id FROM Account LIMIT 5000").as_deref(),
            Some("limit exceeds maximum")
        );
        assert_eq!(
            reason("SELECT Id FROM Account LIMIT 99999999999999999999999").as_deref(),
            Some("limit exceeds maximum")
        );
        assert_eq!(
            reason("SELECT Id FROM Account LIMIT all").as_deref(),
            Some("invalid LIMIT value")
        );
    }

    #[test]
    fn test_ensure_valid_maps_to_error() {
        let err = QueryValidator::new().ensure_valid("SELECT Id FROM Account").unwrap_err();
        assert!(matches!(err, SoqlError::Validation(ref r) if r == "missing LIMIT clause"));
    }
}
