//! Query Pipeline
//!
//! raw text → gateway (best effort) → intent extraction → assembly → validation.
//! The gateway call is the only await point; everything after it is
//! synchronous and works off the shared read-only catalogs.

use crate::error::Result;
use crate::intent::{parse_model_reply, IntentExtractor, IntentSource, ModelReply};
use crate::lexicon::BusinessLexicon;
use crate::llm::IntentGateway;
use crate::schema_catalog::SchemaCatalog;
use crate::soql_builder::SoqlBuilder;
use crate::validation::QueryValidator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// What `process` hands back to its caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedQuery {
    pub object_name: String,
    pub fields: Vec<String>,
    pub conditions: Vec<String>,
    pub query_text: String,
    pub explanation: String,
    pub source: IntentSource,
    pub generated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct QueryPipeline {
    catalog: Arc<SchemaCatalog>,
    lexicon: Arc<BusinessLexicon>,
    gateway: Arc<dyn IntentGateway>,
    extractor: IntentExtractor,
    builder: SoqlBuilder,
    validator: QueryValidator,
}

impl QueryPipeline {
    pub fn new(
        catalog: Arc<SchemaCatalog>,
        lexicon: Arc<BusinessLexicon>,
        gateway: Arc<dyn IntentGateway>,
    ) -> Self {
        Self {
            extractor: IntentExtractor::new(lexicon.clone()),
            builder: SoqlBuilder::new(catalog.clone()),
            validator: QueryValidator::new(),
            catalog,
            lexicon,
            gateway,
        }
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    pub fn lexicon(&self) -> &BusinessLexicon {
        &self.lexicon
    }

    pub fn validator(&self) -> &QueryValidator {
        &self.validator
    }

    pub fn gateway_name(&self) -> &'static str {
        self.gateway.name()
    }

    /// Translate `raw_query` into a validated SOQL query. Gateway failures
    /// degrade to keyword matching and never surface here.
    pub async fn process(&self, raw_query: &str) -> Result<ProcessedQuery> {
        info!("Processing query via {} gateway: {}", self.gateway.name(), raw_query);
        let reply = self.fetch_reply(raw_query).await;
        self.process_intent(raw_query, reply)
    }

    /// Ask the gateway once; `None` when it is unavailable or says nothing.
    pub async fn fetch_reply(&self, raw_query: &str) -> Option<ModelReply> {
        match self.gateway.interpret(raw_query).await {
            Ok(text) => {
                let parsed = parse_model_reply(&text);
                if parsed.is_none() {
                    warn!("Empty reply from {} gateway, falling back to keywords", self.gateway.name());
                }
                parsed
            }
            Err(e) => {
                warn!("Gateway unavailable, falling back to keywords: {}", e);
                None
            }
        }
    }

    /// Synchronous core: extract, assemble and validate with an already
    /// obtained (or absent) model reply.
    pub fn process_intent(&self, raw_query: &str, reply: Option<ModelReply>) -> Result<ProcessedQuery> {
        let intent = self.extractor.extract(raw_query, reply);
        let assembled = self.builder.assemble(&intent)?;
        self.validator.ensure_valid(&assembled.text)?;

        info!("Generated SOQL ({:?}): {}", intent.source, assembled.text);

        Ok(ProcessedQuery {
            object_name: assembled.object_name,
            fields: assembled.fields,
            conditions: assembled.conditions,
            query_text: assembled.text,
            explanation: intent.explanation,
            source: intent.source,
            generated_at: Utc::now(),
        })
    }
}
