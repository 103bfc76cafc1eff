//! Configuration management for Sluice.
//!
//! Two layers, both read once at process start:
//!
//! 1. **Deployment configuration** (`sluice.toml`): backends, credentials, load
//!    strategy and logging. TOML with `${VAR_NAME}` substitution and
//!    `SLUICE_<SECTION>_<KEY>` overrides.
//! 2. **Pipeline settings** (`config.ini`): a flat key-value file with the
//!    project, dataset and topic names. Missing keys stop the process.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use sluice::config::{load_config, PipelineSettings};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("sluice.toml")?;
//! let settings = PipelineSettings::load(&config.application.settings_path)?;
//!
//! println!("Strategy: {}", config.ingest.load_strategy);
//! println!("Dataset: {}", settings.dataset);
//! # Ok(())
//! # }
//! ```
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//! settings_path = "config.ini"
//!
//! [ingest]
//! load_strategy = "bulk_load"
//! table_prefix = "dc"
//!
//! [cosmosdb]
//! endpoint = "https://your-account.documents.azure.com:443/"
//! key = "${SLUICE_COSMOS_KEY}"
//! database_name = "sluice"
//!
//! [postgresql]
//! connection_string = "${SLUICE_PG_URL}"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;
pub mod settings;

// Re-export commonly used types
pub use loader::load_config;
pub use schema::{
    ApplicationConfig, CosmosDbConfig, GcsConfig, IngestConfig, LoggingConfig, MoverConfig,
    PostgreSQLConfig, PubSubConfig, SluiceConfig,
};
pub use secret::{bearer_header, redact_connection_string, secret_string, SecretString, SecretValue};
pub use settings::PipelineSettings;
