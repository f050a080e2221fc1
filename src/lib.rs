pub mod api;
pub mod config;
pub mod error;
pub mod intent;
pub mod lexicon;
pub mod llm;
pub mod pipeline;
pub mod schema_catalog;
pub mod soql_builder;
pub mod validation;

pub use error::{Result, SoqlError};
pub use pipeline::{ProcessedQuery, QueryPipeline};
