//! Schema Catalog - Static Salesforce object definitions
//!
//! Maps each supported object to the fields it may project, its relationship
//! names and the defaults the query builder falls back on (fields, filters, sort).
//! Built once at startup and shared read-only.

use crate::error::{Result, SoqlError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::info;

/// Suffix Salesforce puts on org-defined fields.
pub const CUSTOM_FIELD_SUFFIX: &str = "__c";

/// Fields every object exposes regardless of its catalog entry.
pub const UNIVERSAL_FIELDS: [&str; 4] = ["Id", "Name", "CreatedDate", "LastModifiedDate"];

/// Catalog entry for one object type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaEntry {
    pub object_name: String,

    /// Fields the object may project
    pub valid_fields: BTreeSet<String>,

    /// Related-object traversal names (informational only)
    #[serde(default)]
    pub relationships: BTreeSet<String>,

    /// Used when the caller supplies no fields
    pub default_fields: Vec<String>,

    /// Predicates always appended to the WHERE clause
    #[serde(default)]
    pub default_filters: Vec<String>,

    /// "Field [ASC|DESC]" entries for ORDER BY
    #[serde(default)]
    pub default_sort: Vec<String>,
}

impl SchemaEntry {
    fn new(
        object_name: &str,
        valid_fields: &[&str],
        relationships: &[&str],
        default_fields: &[&str],
        default_filters: &[&str],
        default_sort: &[&str],
    ) -> Self {
        Self {
            object_name: object_name.to_string(),
            valid_fields: valid_fields.iter().map(|f| f.to_string()).collect(),
            relationships: relationships.iter().map(|r| r.to_string()).collect(),
            default_fields: default_fields.iter().map(|f| f.to_string()).collect(),
            default_filters: default_filters.iter().map(|f| f.to_string()).collect(),
            default_sort: default_sort.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Default fields that are neither declared nor universal.
    fn undeclared_defaults(&self) -> Vec<&str> {
        self.default_fields
            .iter()
            .filter(|f| !self.valid_fields.contains(*f) && !UNIVERSAL_FIELDS.contains(&f.as_str()))
            .map(|f| f.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogFile {
    objects: Vec<SchemaEntry>,
}

/// Read-only object catalog
#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    entries: HashMap<String, SchemaEntry>,
}

impl SchemaCatalog {
    /// Build a catalog from entries, rejecting any entry whose default fields
    /// are not declared.
    pub fn from_entries(entries: Vec<SchemaEntry>) -> Result<Self> {
        let mut map = HashMap::with_capacity(entries.len());
        for entry in entries {
            let undeclared = entry.undeclared_defaults();
            if !undeclared.is_empty() {
                return Err(SoqlError::Config(format!(
                    "object '{}' has default fields missing from its field list: {}",
                    entry.object_name,
                    undeclared.join(", ")
                )));
            }
            if map.contains_key(&entry.object_name) {
                return Err(SoqlError::Config(format!(
                    "object '{}' is defined more than once",
                    entry.object_name
                )));
            }
            map.insert(entry.object_name.clone(), entry);
        }
        Ok(Self { entries: map })
    }

    /// Load a catalog from a JSON file of the form `{"objects": [SchemaEntry, ...]}`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let file: CatalogFile = serde_json::from_str(&raw)
            .map_err(|e| SoqlError::Config(format!("invalid catalog file {}: {}", path.display(), e)))?;
        let catalog = Self::from_entries(file.objects)?;
        info!("Loaded schema catalog with {} objects from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// The built-in Sales/Service Cloud catalog.
    pub fn standard() -> Self {
        let entries = vec![
            SchemaEntry::new(
                "Account",
                &[
                    "Id", "Name", "Type", "Industry", "AnnualRevenue", "NumberOfEmployees",
                    "Rating", "Phone", "Website", "OwnerId", "ParentId", "BillingStreet",
                    "BillingCity", "BillingState", "BillingPostalCode", "BillingCountry",
                    "Description", "AccountSource", "Active__c", "IsDeleted", "CreatedDate",
                    "LastModifiedDate",
                ],
                &["Contacts", "Opportunities", "Cases", "Owner", "Parent"],
                &["Id", "Name", "Industry", "Type", "CreatedDate"],
                &["IsDeleted = false"],
                &["Name"],
            ),
            SchemaEntry::new(
                "Contact",
                &[
                    "Id", "Name", "FirstName", "LastName", "Email", "Phone", "MobilePhone",
                    "Title", "Department", "AccountId", "OwnerId", "LeadSource",
                    "MailingCity", "MailingState", "MailingCountry", "Birthdate",
                    "IsDeleted", "CreatedDate", "LastModifiedDate",
                ],
                &["Account", "Owner", "Cases", "Opportunities"],
                &["Id", "Name", "Email", "Phone", "AccountId"],
                &["IsDeleted = false"],
                &["LastName", "FirstName"],
            ),
            SchemaEntry::new(
                "Lead",
                &[
                    "Id", "Name", "FirstName", "LastName", "Company", "Title", "Email",
                    "Phone", "Status", "LeadSource", "Industry", "Rating", "AnnualRevenue",
                    "NumberOfEmployees", "OwnerId", "IsConverted", "ConvertedDate",
                    "IsDeleted", "CreatedDate", "LastModifiedDate",
                ],
                &["Owner", "ConvertedAccount", "ConvertedContact", "ConvertedOpportunity"],
                &["Id", "Name", "Company", "Status", "Email"],
                &["IsDeleted = false", "IsConverted = false"],
                &["CreatedDate DESC"],
            ),
            SchemaEntry::new(
                "Opportunity",
                &[
                    "Id", "Name", "AccountId", "StageName", "Amount", "Probability",
                    "CloseDate", "Type", "LeadSource", "ForecastCategory", "NextStep",
                    "OwnerId", "IsClosed", "IsWon", "ExpectedRevenue", "Description",
                    "IsDeleted", "CreatedDate", "LastModifiedDate",
                ],
                &["Account", "Owner", "OpportunityLineItems", "OpportunityContactRoles"],
                &["Id", "Name", "StageName", "Amount", "CloseDate"],
                &["IsDeleted = false"],
                &["CloseDate DESC"],
            ),
            SchemaEntry::new(
                "Case",
                &[
                    "Id", "CaseNumber", "Subject", "Description", "Status", "Priority",
                    "Origin", "Type", "Reason", "AccountId", "ContactId", "OwnerId",
                    "IsClosed", "IsEscalated", "ClosedDate", "IsDeleted", "CreatedDate",
                    "LastModifiedDate",
                ],
                &["Account", "Contact", "Owner", "CaseComments"],
                &["Id", "CaseNumber", "Subject", "Status", "Priority"],
                &["IsDeleted = false"],
                &["CreatedDate DESC"],
            ),
        ];

        let entries = entries.into_iter().map(|e| (e.object_name.clone(), e)).collect();
        Self { entries }
    }

    pub fn lookup(&self, object_name: &str) -> Option<&SchemaEntry> {
        self.entries.get(object_name)
    }

    /// Whether `field` may be selected from `object_name`.
    ///
    /// Custom fields cannot be enumerated ahead of time, so anything carrying the
    /// `__c` suffix is accepted, as are the universal standard fields.
    pub fn is_valid_field(&self, field: &str, object_name: &str) -> bool {
        if UNIVERSAL_FIELDS.contains(&field) || field.ends_with(CUSTOM_FIELD_SUFFIX) {
            return true;
        }
        self.lookup(object_name)
            .map(|entry| entry.valid_fields.contains(field))
            .unwrap_or(false)
    }

    /// Sorted object names.
    pub fn object_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Closest known object name, for "did you mean" diagnostics.
    pub fn closest_object(&self, name: &str) -> Option<&str> {
        let needle = name.to_lowercase();
        self.entries
            .keys()
            .map(|k| (k.as_str(), strsim::jaro_winkler(&needle, &k.to_lowercase())))
            .filter(|(_, score)| *score >= 0.8)
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(k, _)| k)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
