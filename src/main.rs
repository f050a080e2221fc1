// Import from library crate
use soql_copilot::api::AppState;
use soql_copilot::config::AppConfig;
use soql_copilot::intent::ModelReply;
use soql_copilot::lexicon::TermCategory;
use soql_copilot::validation::ValidationOutcome;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "soql-copilot")]
#[command(about = "Translate business questions into Salesforce SOQL")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a natural-language question into SOQL
    Translate {
        /// The question, e.g. "open cases this quarter"
        query: String,

        /// Force the Salesforce object instead of detecting it
        #[arg(long)]
        object: Option<String>,

        /// Skip the language model and use keyword matching only
        #[arg(long)]
        offline: bool,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a SOQL string against the validation rules
    Validate {
        soql: String,
    },
    /// List supported objects, or show one object's schema
    Objects {
        name: Option<String>,
    },
    /// Resolve an informal business term to its canonical token
    Resolve {
        phrase: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let config = AppConfig::from_env()?;
    let state = AppState::from_config(&config)?;
    let pipeline = &state.pipeline;

    match args.command {
        Commands::Translate { query, object, offline, json } => {
            let query = query.trim();
            if query.is_empty() {
                bail!("query must not be empty");
            }
            if query.chars().count() > config.max_query_chars {
                bail!("query exceeds {} characters", config.max_query_chars);
            }

            let reply = if offline {
                info!("Offline mode - skipping {} gateway", pipeline.gateway_name());
                None
            } else {
                pipeline.fetch_reply(query).await
            };
            let reply = match object.as_deref() {
                Some(name) => Some(ModelReply::force_object(reply, name)),
                None => reply,
            };

            let result = pipeline.process_intent(query, reply)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", result.query_text);
                println!("\n-- {} ({:?})", result.explanation, result.source);
            }
        }
        Commands::Validate { soql } => match pipeline.validator().validate(&soql) {
            ValidationOutcome::Valid => println!("valid"),
            ValidationOutcome::Invalid { reason } => bail!("invalid: {}", reason),
        },
        Commands::Objects { name: None } => {
            for name in pipeline.catalog().object_names() {
                println!("{}", name);
            }
        }
        Commands::Objects { name: Some(name) } => match pipeline.catalog().lookup(&name) {
            Some(entry) => println!("{}", serde_json::to_string_pretty(entry)?),
            None => match pipeline.catalog().closest_object(&name) {
                Some(suggestion) => bail!("unsupported object: {} (did you mean {}?)", name, suggestion),
                None => bail!("unsupported object: {}", name),
            },
        },
        Commands::Resolve { phrase } => {
            let lexicon = pipeline.lexicon();
            match lexicon.classify(&phrase) {
                Some((category, token)) => println!("{} ({})", token, category_label(category)),
                None => println!("{} (unrecognized)", lexicon.resolve(&phrase)),
            }
        }
    }

    Ok(())
}

fn category_label(category: TermCategory) -> &'static str {
    match category {
        TermCategory::Object => "object",
        TermCategory::Status => "status",
        TermCategory::Industry => "industry",
        TermCategory::Priority => "priority",
    }
}
