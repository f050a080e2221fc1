//! Intent Extractor
//!
//! Turns a natural-language question (plus whatever the language model managed
//! to return) into an `Intent`: the object to query, suggested fields and raw
//! predicates. Model output is trusted when it parses as structured JSON, scraped
//! best-effort when it comes back as prose, and absent entirely in keyword mode.
//! Phrase scans over the raw question always run on top.

use crate::lexicon::{BusinessLexicon, TermCategory};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Object used when neither the model nor the keyword scan names one.
pub const DEFAULT_OBJECT: &str = "Account";

/// Fields assumed when a prose reply names no field list.
pub const DEGRADED_FIELDS: [&str; 3] = ["Id", "Name", "CreatedDate"];

/// Temporal phrases in priority order; only the first hit is used.
const TEMPORAL_PHRASES: [(&str, &str); 6] = [
    ("this month", "CreatedDate = THIS_MONTH"),
    ("last month", "CreatedDate = LAST_MONTH"),
    ("this quarter", "CreatedDate = THIS_QUARTER"),
    ("last quarter", "CreatedDate = LAST_QUARTER"),
    ("this year", "CreatedDate = THIS_YEAR"),
    ("last year", "CreatedDate = LAST_YEAR"),
];

const STATUS_PHRASES: [&str; 2] = ["active", "open"];
const VALUE_PHRASES: [&str; 2] = ["high revenue", "high value"];
const INDUSTRY_PHRASES: [&str; 2] = ["technology", "tech"];

lazy_static! {
    static ref SELECT_FROM: Regex =
        Regex::new(r"(?is)\bSELECT\s+(.+?)\s+FROM\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap();
    static ref WHERE_CLAUSE: Regex =
        Regex::new(r"(?is)\bWHERE\s+(.+?)(?:\s+ORDER\s+BY\b|\s+LIMIT\b|;|\n|$)").unwrap();
    static ref AND_SPLIT: Regex = Regex::new(r"(?i)\s+AND\s+").unwrap();
    static ref FIELD_NAME: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*$").unwrap();
    // `<field> <op> <value>` with a literal, date literal or parenthesized list as value
    static ref PREDICATE: Regex = Regex::new(
        r"(?i)^[A-Za-z_][A-Za-z0-9_.]*\s*(?:!=|<>|<=|>=|=|<|>|\s(?:NOT\s+)?(?:LIKE|IN|INCLUDES|EXCLUDES)\s)\s*(?:'(?:[^'\\]|\\.)*'|-?\d+(?:\.\d+)?|\d{4}-\d{2}-\d{2}[0-9T:.Z+\-]*|[A-Za-z_][A-Za-z0-9_]*(?::\d+)?|\([^()]*\))$"
    )
    .unwrap();
}

/// How much the extracted intent can be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentSource {
    /// Structured JSON from the language model
    Model,
    /// Scraped out of a free-form model reply
    DegradedModel,
    /// No model output; keyword scans only
    KeywordFallback,
}

/// Structured output requested from the language model. Every member is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelIntent {
    #[serde(default, alias = "objectName", alias = "object_name")]
    pub object: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub fields: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub explanation: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A parsed model reply together with how it was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelReply {
    pub intent: ModelIntent,
    pub source: IntentSource,
}

impl ModelReply {
    pub fn structured(intent: ModelIntent) -> Self {
        Self { intent, source: IntentSource::Model }
    }

    /// Pin the object of `reply`. Without a reply, an otherwise empty
    /// keyword-mode reply is created.
    pub fn force_object(reply: Option<Self>, object: &str) -> Self {
        let mut reply = reply.unwrap_or(Self {
            intent: ModelIntent::default(),
            source: IntentSource::KeywordFallback,
        });
        reply.intent.object = Some(object.to_string());
        reply
    }
}

/// Transient per-request intent, consumed by the query builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub object_name: String,
    pub fields: Vec<String>,
    pub conditions: Vec<String>,
    pub explanation: String,
    pub source: IntentSource,
}

/// Parse a raw model reply. Returns `None` only for an empty reply.
pub fn parse_model_reply(text: &str) -> Option<ModelReply> {
    let cleaned = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    if cleaned.is_empty() {
        return None;
    }

    if let Ok(intent) = serde_json::from_str::<ModelIntent>(cleaned) {
        return Some(ModelReply::structured(intent));
    }

    // JSON wrapped in commentary
    if let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}')) {
        if start < end {
            if let Ok(intent) = serde_json::from_str::<ModelIntent>(&cleaned[start..=end]) {
                return Some(ModelReply::structured(intent));
            }
        }
    }

    debug!("Model reply is not structured JSON, scraping prose");
    Some(ModelReply {
        intent: scrape_prose(cleaned),
        source: IntentSource::DegradedModel,
    })
}

fn scrape_prose(text: &str) -> ModelIntent {
    let text = text.replace('`', "");

    let (object, mut fields) = match SELECT_FROM.captures(&text) {
        Some(caps) => {
            let fields = caps[1]
                .split(',')
                .map(|f| f.trim())
                .filter(|f| FIELD_NAME.is_match(f))
                .map(str::to_string)
                .collect::<Vec<_>>();
            (Some(caps[2].to_string()), fields)
        }
        None => (None, Vec::new()),
    };

    if fields.is_empty() {
        fields = DEGRADED_FIELDS.iter().map(|f| f.to_string()).collect();
    }

    let conditions = WHERE_CLAUSE
        .captures(&text)
        .map(|caps| {
            AND_SPLIT
                .split(caps[1].trim())
                .map(|c| c.trim().trim_end_matches('.').trim_end())
                .filter(|c| PREDICATE.is_match(c))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let summary = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or_default();

    ModelIntent {
        object,
        fields,
        conditions,
        explanation: Some(format!("Low confidence (parsed from unstructured AI reply): {}", summary)),
    }
}

/// Merges model output with lexicon-driven phrase scans
#[derive(Debug, Clone)]
pub struct IntentExtractor {
    lexicon: Arc<BusinessLexicon>,
}

impl IntentExtractor {
    pub fn new(lexicon: Arc<BusinessLexicon>) -> Self {
        Self { lexicon }
    }

    /// Build the intent for `raw_query`. Never fails; with nothing to go on the
    /// result is a default Account intent.
    pub fn extract(&self, raw_query: &str, model_output: Option<ModelReply>) -> Intent {
        let mut intent = match model_output {
            Some(reply) => self.from_model(raw_query, reply),
            None => self.fallback(raw_query),
        };

        let scanned = self.scan_conditions(raw_query, &intent.object_name);
        intent.conditions.extend(scanned);

        debug!(
            "Extracted intent: object={}, fields={}, conditions={}, source={:?}",
            intent.object_name,
            intent.fields.len(),
            intent.conditions.len(),
            intent.source
        );
        intent
    }

    fn from_model(&self, raw_query: &str, reply: ModelReply) -> Intent {
        let ModelIntent { object, fields, conditions, explanation } = reply.intent;

        let object_name = object
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .map(|o| self.lexicon.resolve_in(TermCategory::Object, &o))
            .unwrap_or_else(|| self.detect_object(raw_query));

        let explanation = explanation
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| format!("Querying {} records", object_name));

        Intent {
            object_name,
            fields,
            conditions,
            explanation,
            source: reply.source,
        }
    }

    fn fallback(&self, raw_query: &str) -> Intent {
        let object_name = self.detect_object(raw_query);
        Intent {
            explanation: format!(
                "Keyword match: querying {} records (AI service unavailable, lower confidence)",
                object_name
            ),
            object_name,
            fields: Vec::new(),
            conditions: Vec::new(),
            source: IntentSource::KeywordFallback,
        }
    }

    fn detect_object(&self, raw_query: &str) -> String {
        self.lexicon
            .detect_object(raw_query)
            .unwrap_or(DEFAULT_OBJECT)
            .to_string()
    }

    /// Phrase-derived predicates for `object_name`. At most one temporal
    /// predicate; the status, value and industry scans are independent.
    pub fn scan_conditions(&self, raw_query: &str, object_name: &str) -> Vec<String> {
        let lowered = raw_query.to_lowercase();
        let mentions = |phrases: &[&str]| phrases.iter().any(|p| lowered.contains(p));
        let mut conditions = Vec::new();

        if let Some((_, predicate)) = TEMPORAL_PHRASES.iter().find(|(p, _)| lowered.contains(p)) {
            conditions.push(predicate.to_string());
        }

        if mentions(&STATUS_PHRASES) {
            let predicate = match object_name {
                "Account" => Some("Active__c = true"),
                "Opportunity" => Some("IsClosed = false"),
                "Case" => Some("Status != 'Closed'"),
                _ => None,
            };
            conditions.extend(predicate.map(str::to_string));
        }

        if mentions(&VALUE_PHRASES) {
            let predicate = match object_name {
                "Opportunity" => Some("Amount > 100000"),
                "Account" => Some("AnnualRevenue > 1000000"),
                _ => None,
            };
            conditions.extend(predicate.map(str::to_string));
        }

        if object_name == "Account" && mentions(&INDUSTRY_PHRASES) {
            let industry = self.lexicon.resolve_in(TermCategory::Industry, "tech");
            conditions.push(format!("Industry = '{}'", industry));
        }

        conditions
    }
}
