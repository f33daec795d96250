use std::env;
use anyhow::{bail, Context, Result};

/// Connection settings for Cloud Spanner
#[derive(Debug, Clone, PartialEq)]
pub struct SpannerConfig {
    pub emulator_host: Option<String>,
    pub project: String,
    pub instance: String,
    pub database: String,
}

impl SpannerConfig {
    pub fn database_path(&self) -> String {
        format!(
            "projects/{}/instances/{}/databases/{}",
            self.project, self.instance, self.database
        )
    }
}

/// Which datastore backs the API
#[derive(Debug, Clone, PartialEq)]
pub enum DatastoreConfig {
    Spanner(SpannerConfig),
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub datastore: DatastoreConfig,
    pub log_format: LogFormat,
    /// Project that qualifies trace ids in JSON logs
    pub gcp_project: Option<String>,
    pub service_port: u16,
    pub service_host: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let backend = env::var("DATASTORE_BACKEND").unwrap_or_else(|_| "spanner".to_string());

        let datastore = match backend.as_str() {
            "spanner" => DatastoreConfig::Spanner(SpannerConfig {
                emulator_host: env::var("SPANNER_EMULATOR_HOST").ok(),
                project: env::var("SPANNER_PROJECT")
                    .context("SPANNER_PROJECT environment variable is required")?,
                instance: env::var("SPANNER_INSTANCE")
                    .context("SPANNER_INSTANCE environment variable is required")?,
                database: env::var("SPANNER_DATABASE")
                    .context("SPANNER_DATABASE environment variable is required")?,
            }),
            "memory" => DatastoreConfig::Memory,
            other => bail!("DATASTORE_BACKEND must be 'spanner' or 'memory', got '{}'", other),
        };

        let log_format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("pretty") | Err(_) => LogFormat::Pretty,
            Ok(other) => bail!("LOG_FORMAT must be 'pretty' or 'json', got '{}'", other),
        };

        let gcp_project = env::var("GOOGLE_CLOUD_PROJECT")
            .ok()
            .filter(|p| !p.is_empty());

        // App Engine hands the port over in PORT
        let service_port = env::var("SERVICE_PORT")
            .or_else(|_| env::var("PORT"))
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("SERVICE_PORT must be a valid port number (0-65535)")?;

        let service_host = env::var("SERVICE_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string());

        Ok(Config {
            datastore,
            log_format,
            gcp_project,
            service_port,
            service_host,
        })
    }

    /// Project used for `logging.googleapis.com/trace`, falling back to the
    /// Spanner project
    pub fn trace_project(&self) -> Option<&str> {
        self.gcp_project.as_deref().or(match &self.datastore {
            DatastoreConfig::Spanner(spanner) => Some(spanner.project.as_str()),
            DatastoreConfig::Memory => None,
        })
    }

    pub fn log_startup(&self) {
        tracing::info!("Configuration loaded:");
        match &self.datastore {
            DatastoreConfig::Spanner(spanner) => {
                tracing::info!("  Datastore: Cloud Spanner");
                tracing::info!("  Spanner emulator: {}",
                    spanner.emulator_host.as_deref().unwrap_or("disabled (using production)"));
                tracing::info!("  Spanner database: {}", spanner.database_path());
            }
            DatastoreConfig::Memory => {
                tracing::info!("  Datastore: in-memory (data is lost on restart)");
            }
        }
        tracing::info!("  Log format: {:?}", self.log_format);
        tracing::info!("  Trace project: {}", self.trace_project().unwrap_or("none"));
        tracing::info!("  Service listening on: {}:{}", self.service_host, self.service_port);
    }
}
