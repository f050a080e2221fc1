//! Business Term Lexicon
//!
//! Maps informal phrases ("deals", "tech", "urgent") onto canonical Salesforce
//! tokens. Lookups are advisory: a phrase the lexicon does not know is returned
//! unchanged.

use serde::Serialize;
use std::collections::HashMap;

/// Which table a phrase belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TermCategory {
    Object,
    Status,
    Industry,
    Priority,
}

impl TermCategory {
    pub const ALL: [TermCategory; 4] = [
        TermCategory::Object,
        TermCategory::Status,
        TermCategory::Industry,
        TermCategory::Priority,
    ];
}

const OBJECT_TERMS: &[(&str, &str)] = &[
    ("account", "Account"),
    ("accounts", "Account"),
    ("company", "Account"),
    ("companies", "Account"),
    ("customer", "Account"),
    ("customers", "Account"),
    ("client", "Account"),
    ("clients", "Account"),
    ("contact", "Contact"),
    ("contacts", "Contact"),
    ("person", "Contact"),
    ("people", "Contact"),
    ("lead", "Lead"),
    ("leads", "Lead"),
    ("prospect", "Lead"),
    ("prospects", "Lead"),
    ("opportunity", "Opportunity"),
    ("opportunities", "Opportunity"),
    ("deal", "Opportunity"),
    ("deals", "Opportunity"),
    ("case", "Case"),
    ("cases", "Case"),
    ("ticket", "Case"),
    ("tickets", "Case"),
    ("support", "Case"),
];

const STATUS_TERMS: &[(&str, &str)] = &[
    ("open", "Open"),
    ("new", "New"),
    ("working", "Working"),
    ("in progress", "Working"),
    ("escalated", "Escalated"),
    ("closed", "Closed"),
    ("resolved", "Closed"),
    ("won", "Closed Won"),
    ("lost", "Closed Lost"),
    ("qualified", "Qualified"),
];

const INDUSTRY_TERMS: &[(&str, &str)] = &[
    ("tech", "Technology"),
    ("technology", "Technology"),
    ("software", "Technology"),
    ("finance", "Finance"),
    ("financial", "Finance"),
    ("banking", "Banking"),
    ("healthcare", "Healthcare"),
    ("medical", "Healthcare"),
    ("retail", "Retail"),
    ("manufacturing", "Manufacturing"),
    ("education", "Education"),
    ("energy", "Energy"),
];

const PRIORITY_TERMS: &[(&str, &str)] = &[
    ("urgent", "High"),
    ("critical", "High"),
    ("high", "High"),
    ("high priority", "High"),
    ("normal", "Medium"),
    ("medium", "Medium"),
    ("low", "Low"),
    ("low priority", "Low"),
];

/// Ordered keyword groups for picking an object out of free text. Earlier
/// groups win; matching is by substring so plurals are covered.
const OBJECT_KEYWORD_GROUPS: &[(&[&str], &str)] = &[
    (&["contact", "person", "people"], "Contact"),
    (&["lead"], "Lead"),
    (&["opportunit", "deal"], "Opportunity"),
    (&["case", "support", "ticket"], "Case"),
];

/// Read-only phrase tables
#[derive(Debug, Clone)]
pub struct BusinessLexicon {
    tables: HashMap<TermCategory, HashMap<String, String>>,
}

impl BusinessLexicon {
    pub fn standard() -> Self {
        let table = |terms: &[(&str, &str)]| -> HashMap<String, String> {
            terms.iter().map(|(p, t)| (p.to_string(), t.to_string())).collect()
        };

        let mut tables = HashMap::new();
        tables.insert(TermCategory::Object, table(OBJECT_TERMS));
        tables.insert(TermCategory::Status, table(STATUS_TERMS));
        tables.insert(TermCategory::Industry, table(INDUSTRY_TERMS));
        tables.insert(TermCategory::Priority, table(PRIORITY_TERMS));
        Self { tables }
    }

    /// Resolve a phrase against every table, objects first. Unknown phrases are
    /// returned unchanged.
    pub fn resolve(&self, phrase: &str) -> String {
        TermCategory::ALL
            .iter()
            .find_map(|category| self.lookup(*category, phrase))
            .map(str::to_string)
            .unwrap_or_else(|| phrase.to_string())
    }

    /// Resolve a phrase against one table. Unknown phrases are returned unchanged.
    pub fn resolve_in(&self, category: TermCategory, phrase: &str) -> String {
        self.lookup(category, phrase)
            .map(str::to_string)
            .unwrap_or_else(|| phrase.to_string())
    }

    /// Canonical token and category for a phrase, if any table knows it.
    pub fn classify(&self, phrase: &str) -> Option<(TermCategory, &str)> {
        TermCategory::ALL
            .iter()
            .find_map(|category| self.lookup(*category, phrase).map(|token| (*category, token)))
    }

    fn lookup(&self, category: TermCategory, phrase: &str) -> Option<&str> {
        let key = phrase.trim().to_lowercase();
        self.tables
            .get(&category)
            .and_then(|table| table.get(&key))
            .map(|token| token.as_str())
    }

    /// First object whose keyword group appears anywhere in `text`.
    pub fn detect_object(&self, text: &str) -> Option<&'static str> {
        let lowered = text.to_lowercase();
        OBJECT_KEYWORD_GROUPS
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| lowered.contains(k)))
            .map(|(_, object)| *object)
    }
}

impl Default for BusinessLexicon {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_is_case_insensitive() {
        let lexicon = BusinessLexicon::standard();
        assert_eq!(lexicon.resolve("Deals"), "Opportunity");
        assert_eq!(lexicon.resolve("  TECH "), "Technology");
        assert_eq!(lexicon.resolve("urgent"), "High");
    }

    #[test]
    fn test_unknown_phrase_passes_through() {
        let lexicon = BusinessLexicon::standard();
        assert_eq!(lexicon.resolve("Invoice__c"), "Invoice__c");
        assert_eq!(lexicon.resolve_in(TermCategory::Industry, "deals"), "deals");
    }

    #[test]
    fn test_exact_phrase_only() {
        let lexicon = BusinessLexicon::standard();
        // no partial matching inside a longer phrase
        assert_eq!(lexicon.resolve("big deals"), "big deals");
    }

    #[test]
    fn test_classify() {
        let lexicon = BusinessLexicon::standard();
        assert_eq!(lexicon.classify("resolved"), Some((TermCategory::Status, "Closed")));
        assert_eq!(lexicon.classify("nothing"), None);
    }

    #[test]
    fn test_detect_object_group_order() {
        let lexicon = BusinessLexicon::standard();
        assert_eq!(lexicon.detect_object("Show me all CONTACTS"), Some("Contact"));
        assert_eq!(lexicon.detect_object("big deals closing soon"), Some("Opportunity"));
        assert_eq!(lexicon.detect_object("open support tickets"), Some("Case"));
        // contact group is checked before case
        assert_eq!(lexicon.detect_object("contacts on open cases"), Some("Contact"));
        assert_eq!(lexicon.detect_object("accounts with high revenue"), None);
    }
}
