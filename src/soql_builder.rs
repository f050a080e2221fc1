//! SOQL Builder - Deterministic query assembly from an Intent
//!
//! Resolves the field list and predicates against the schema catalog and joins
//! the clauses in a fixed order:
//! `SELECT ... FROM ... [WHERE ...] [ORDER BY ...] LIMIT 1000`.

use crate::error::{Result, SoqlError};
use crate::intent::Intent;
use crate::schema_catalog::{SchemaCatalog, SchemaEntry};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Row ceiling applied to every generated query, independent of the request.
pub const QUERY_ROW_LIMIT: u32 = 1000;

/// Final query plus the metadata callers echo back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledQuery {
    pub text: String,
    pub object_name: String,
    /// Fields actually selected, in SELECT order
    pub fields: Vec<String>,
    /// Predicates actually in the WHERE clause
    pub conditions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SoqlBuilder {
    catalog: Arc<SchemaCatalog>,
}

impl SoqlBuilder {
    pub fn new(catalog: Arc<SchemaCatalog>) -> Self {
        Self { catalog }
    }

    /// Assemble the query for `intent`. Fails only when the object is not in
    /// the catalog.
    pub fn assemble(&self, intent: &Intent) -> Result<AssembledQuery> {
        let entry = self.catalog.lookup(&intent.object_name).ok_or_else(|| {
            if let Some(suggestion) = self.catalog.closest_object(&intent.object_name) {
                warn!("Unsupported object '{}' (did you mean '{}'?)", intent.object_name, suggestion);
            }
            SoqlError::UnsupportedObject(intent.object_name.clone())
        })?;

        let fields = self.resolve_fields(&intent.fields, entry);
        let conditions = merge_conditions(&intent.conditions, &entry.default_filters);

        let mut clauses = vec![
            format!("SELECT {}", fields.join(", ")),
            format!("FROM {}", entry.object_name),
        ];
        if !conditions.is_empty() {
            clauses.push(format!("WHERE {}", conditions.join(" AND ")));
        }
        let sort = entry
            .default_sort
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .join(", ");
        if !sort.is_empty() {
            clauses.push(format!("ORDER BY {}", sort));
        }
        clauses.push(format!("LIMIT {}", QUERY_ROW_LIMIT));

        let text = clauses.join(" ").trim_end().to_string();
        debug!("Assembled query: {}", text);

        Ok(AssembledQuery {
            text,
            object_name: entry.object_name.clone(),
            fields,
            conditions,
        })
    }

    /// Requested fields (or the object's defaults), de-duplicated, filtered
    /// through the catalog, with `Id` first exactly once.
    fn resolve_fields(&self, requested: &[String], entry: &SchemaEntry) -> Vec<String> {
        let source = if requested.iter().all(|f| f.trim().is_empty()) {
            entry.default_fields.as_slice()
        } else {
            requested
        };

        let rest = source
            .iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty() && *f != "Id")
            .unique();

        // `Id` is a universal field, so the list is never empty
        std::iter::once("Id")
            .chain(rest)
            .filter(|f| self.catalog.is_valid_field(f, &entry.object_name))
            .map(str::to_string)
            .collect()
    }
}

/// Intent predicates followed by the object's default filters, trimmed,
/// blank-free and de-duplicated in first-occurrence order. Disjunctions are
/// parenthesized so the AND-joined filters apply to every branch.
fn merge_conditions(conditions: &[String], default_filters: &[String]) -> Vec<String> {
    conditions
        .iter()
        .chain(default_filters.iter())
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(|c| {
            if has_top_level_or(c) {
                format!("({})", c)
            } else {
                c.to_string()
            }
        })
        .unique()
        .collect()
}

/// True when `predicate` contains an `OR` outside parentheses and string literals.
fn has_top_level_or(predicate: &str) -> bool {
    let bytes = predicate.as_bytes();
    let mut depth = 0usize;
    let mut in_literal = false;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_literal => i += 1,
            b'\'' => in_literal = !in_literal,
            b'(' if !in_literal => depth += 1,
            b')' if !in_literal => depth = depth.saturating_sub(1),
            b if !in_literal && depth == 0 && b.is_ascii_whitespace() => {
                let rest = &bytes[i + 1..];
                if rest.len() > 2
                    && rest[..2].eq_ignore_ascii_case(b"OR")
                    && rest[2].is_ascii_whitespace()
                {
                    return true;
                }
            }
            _ => {}
        }
        i += 1;
    }
    false
}
