use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use gcloud_gax::conn::Environment;
use gcloud_gax::grpc::Code;
use gcloud_googleapis::spanner::admin::database::v1::{
    CreateDatabaseRequest, GetDatabaseDdlRequest, GetDatabaseRequest, UpdateDatabaseDdlRequest,
};
use gcloud_googleapis::spanner::admin::instance::v1::{
    CreateInstanceRequest, GetInstanceRequest, Instance,
};
use gcloud_spanner::admin::client::Client as AdminClient;
use gcloud_spanner::admin::AdminClientConfig;
use gcloud_spanner::client::{Client, ClientConfig};
use gcloud_spanner::key::Key;
use gcloud_spanner::mutation::{delete, insert};
use gcloud_spanner::row::Row;
use gcloud_spanner::statement::Statement;
use gcloud_spanner::value::CommitTimestamp;
use std::num::NonZeroUsize;
use std::sync::Arc;
use uuid::Uuid;

use super::{CatEntity, Datastore, Page};
use crate::config::SpannerConfig;
use crate::keys::{CatKey, PageCursor};
use crate::models::{CatRecord, Species};

const TABLE: &str = "cats";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Cloud Spanner backed datastore, shareable across async handlers
#[derive(Clone)]
pub struct SpannerDatastore {
    inner: Arc<Client>,
}

impl SpannerDatastore {
    /// Create a new Spanner client from configuration
    ///
    /// Connects to the emulator when `emulator_host` is set and to
    /// production Spanner (with application default credentials) otherwise.
    ///
    /// This function also performs auto-provisioning: it will automatically
    /// create the instance, database, and table if they don't exist.
    pub async fn from_config(config: &SpannerConfig) -> Result<Self> {
        // Perform auto-provisioning first
        auto_provision(config).await?;

        let database_path = config.database_path();

        let client_config = match &config.emulator_host {
            Some(host) => {
                tracing::info!("Connecting to Spanner emulator at: {}", host);
                ClientConfig {
                    environment: Environment::Emulator(host.clone()),
                    ..ClientConfig::default()
                }
            }
            None => {
                tracing::info!("Connecting to production Spanner");
                ClientConfig::default()
                    .with_auth()
                    .await
                    .context("Failed to load Spanner credentials")?
            }
        };

        let client = Client::new(&database_path, client_config)
            .await
            .context("Failed to create Spanner client")?;

        tracing::info!(
            "Successfully connected to Spanner database: {}",
            database_path
        );

        Ok(Self {
            inner: Arc::new(client),
        })
    }
}

#[async_trait]
impl Datastore for SpannerDatastore {
    /// All rows go out in a single commit; `created_at` is the commit timestamp.
    async fn put_multi(&self, records: Vec<CatRecord>) -> Result<Vec<CatKey>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::with_capacity(records.len());
        let mut mutations = Vec::with_capacity(records.len());
        for record in records {
            let key = CatKey::generate();
            let id_str = key.uuid().to_string();
            let date_str = record.date_of_birth.format(DATE_FORMAT).to_string();
            let species_str = record.species.as_str().to_string();

            mutations.push(insert(
                TABLE,
                &["id", "name", "date_of_birth", "weight", "species", "created_at"],
                &[
                    &id_str,
                    &record.name,
                    &date_str,
                    &record.weight,
                    &species_str,
                    &CommitTimestamp::new(),
                ],
            ));
            keys.push(key);
        }

        self.inner
            .apply(mutations)
            .await
            .context("Failed to insert cats into Spanner")?;

        tracing::debug!("Inserted {} cats", keys.len());
        Ok(keys)
    }

    async fn fetch_page(&self, limit: NonZeroUsize, start: Option<&PageCursor>) -> Result<Page> {
        // Every UUID string sorts after the empty string
        let after = start
            .map(|cursor| cursor.last_key().uuid().to_string())
            .unwrap_or_default();
        let fetch = i64::try_from(limit.get().saturating_add(1)).unwrap_or(i64::MAX);

        let mut statement = Statement::new(
            "SELECT id, name, date_of_birth, weight, species FROM cats \
             WHERE id > @after ORDER BY id LIMIT @fetch",
        );
        statement.add_param("after", &after);
        statement.add_param("fetch", &fetch);

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create read transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to query cats from Spanner")?;

        let mut rows = Vec::new();
        while let Some(row) = result_set.next().await? {
            let id_str: String = row.column_by_name("id")?;
            let id = Uuid::parse_str(&id_str)
                .with_context(|| format!("Stored cat has a malformed id: {}", id_str))?;
            rows.push(CatEntity {
                key: CatKey::from_uuid(id),
                record: record_from_row(&row)?,
            });
        }

        tracing::debug!("Fetched {} rows (limit: {}, after: {:?})", rows.len(), limit, after);
        Ok(Page::from_overfetch(rows, limit))
    }

    async fn get(&self, key: &CatKey) -> Result<Option<CatRecord>> {
        let id_str = key.uuid().to_string();

        let mut statement = Statement::new(
            "SELECT name, date_of_birth, weight, species FROM cats WHERE id = @id"
        );
        statement.add_param("id", &id_str);

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create read transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to query cat from Spanner")?;

        // Check if we got any rows
        if let Some(row) = result_set.next().await? {
            tracing::debug!("Read cat with id: {}", id_str);
            Ok(Some(record_from_row(&row)?))
        } else {
            tracing::debug!("Cat not found with id: {}", id_str);
            Ok(None)
        }
    }

    async fn delete(&self, key: &CatKey) -> Result<()> {
        let id_str = key.uuid().to_string();

        self.inner
            .apply(vec![delete(TABLE, Key::new(&id_str))])
            .await
            .context("Failed to delete cat from Spanner")?;

        tracing::debug!("Deleted cat with id: {}", id_str);
        Ok(())
    }

    /// Perform a health check by executing a simple query
    async fn health_check(&self) -> Result<()> {
        let statement = Statement::new("SELECT 1");

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create health check transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to execute health check query")?;

        // Just verify that we can execute the query and get a result
        if result_set.next().await?.is_some() {
            tracing::debug!("Health check query succeeded");
            Ok(())
        } else {
            Err(anyhow::anyhow!("Health check query returned no results"))
        }
    }
}

fn record_from_row(row: &Row) -> Result<CatRecord> {
    let name: String = row.column_by_name("name")?;
    let date_str: String = row.column_by_name("date_of_birth")?;
    let weight: f64 = row.column_by_name("weight")?;
    let species_str: String = row.column_by_name("species")?;

    Ok(CatRecord {
        name,
        date_of_birth: NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
            .context("Failed to parse stored date_of_birth")?,
        weight,
        species: species_str
            .parse::<Species>()
            .context("Failed to parse stored species")?,
    })
}

fn admin_client_config(config: &SpannerConfig) -> AdminClientConfig {
    match &config.emulator_host {
        Some(host) => AdminClientConfig {
            environment: Environment::Emulator(host.clone()),
            ..AdminClientConfig::default()
        },
        None => AdminClientConfig::default(),
    }
}

/// Automatically provision Spanner instance, database, and table
///
/// This function checks if the configured resources exist and creates them if needed.
/// It's designed to enable zero-setup local development with the emulator.
async fn auto_provision(config: &SpannerConfig) -> Result<()> {
    tracing::info!("Starting auto-provisioning checks...");

    let admin_config = match config.emulator_host {
        Some(_) => admin_client_config(config),
        None => admin_client_config(config)
            .with_auth()
            .await
            .context("Failed to load Spanner admin credentials")?,
    };

    let admin_client = AdminClient::new(admin_config)
        .await
        .context("Failed to create Spanner admin client")?;

    let project_path = format!("projects/{}", config.project);
    let instance_path = format!("{}/instances/{}", project_path, config.instance);
    let database_path = config.database_path();

    ensure_instance_exists(&admin_client, config, &project_path, &instance_path).await?;
    ensure_database_exists(&admin_client, &instance_path, &database_path).await?;
    ensure_table_exists(&admin_client, &database_path).await?;

    tracing::info!("Auto-provisioning complete");
    Ok(())
}

/// Ensure the Spanner instance exists, creating it if necessary
async fn ensure_instance_exists(
    admin_client: &AdminClient,
    config: &SpannerConfig,
    project_path: &str,
    instance_path: &str,
) -> Result<()> {
    let get_request = GetInstanceRequest {
        name: instance_path.to_string(),
        field_mask: None,
    };

    match admin_client.instance().get_instance(get_request, None).await {
        Ok(_) => {
            tracing::info!("Instance already exists: {}", instance_path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("Instance not found, creating: {}", instance_path);

            let instance_config = if config.emulator_host.is_some() {
                format!("{}/instanceConfigs/emulator-config", project_path)
            } else {
                format!("{}/instanceConfigs/regional-us-central1", project_path)
            };

            let create_request = CreateInstanceRequest {
                parent: project_path.to_string(),
                instance_id: config.instance.clone(),
                instance: Some(Instance {
                    name: instance_path.to_string(),
                    config: instance_config,
                    display_name: format!("{} instance", config.instance),
                    node_count: 1,
                    ..Default::default()
                }),
            };

            let mut operation = admin_client
                .instance()
                .create_instance(create_request, None)
                .await
                .context("Failed to start instance creation")?;

            operation
                .wait(None)
                .await
                .context("Failed to create instance")?;

            tracing::info!("Instance created successfully: {}", instance_path);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to check instance existence: {}",
            e.message()
        )),
    }
}

/// Ensure the Spanner database exists, creating it if necessary
async fn ensure_database_exists(
    admin_client: &AdminClient,
    instance_path: &str,
    database_path: &str,
) -> Result<()> {
    let get_request = GetDatabaseRequest {
        name: database_path.to_string(),
    };

    match admin_client
        .database()
        .get_database(get_request, None)
        .await
    {
        Ok(_) => {
            tracing::info!("Database already exists: {}", database_path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("Database not found, creating: {}", database_path);

            let database_id = database_path
                .split('/')
                .next_back()
                .context("Invalid database path")?;

            let create_request = CreateDatabaseRequest {
                parent: instance_path.to_string(),
                create_statement: format!("CREATE DATABASE `{}`", database_id),
                extra_statements: vec![],
                encryption_config: None,
                database_dialect: 1, // Google Standard SQL
                proto_descriptors: vec![],
            };

            let mut operation = admin_client
                .database()
                .create_database(create_request, None)
                .await
                .context("Failed to start database creation")?;

            operation
                .wait(None)
                .await
                .context("Failed to create database")?;

            tracing::info!("Database created successfully: {}", database_path);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to check database existence: {}",
            e.message()
        )),
    }
}

/// Ensure the cats table exists, creating it if necessary
async fn ensure_table_exists(admin_client: &AdminClient, database_path: &str) -> Result<()> {
    let get_ddl_request = GetDatabaseDdlRequest {
        database: database_path.to_string(),
    };

    let ddl_response = admin_client
        .database()
        .get_database_ddl(get_ddl_request, None)
        .await
        .context("Failed to get database DDL")?;

    let table_exists = ddl_response
        .into_inner()
        .statements
        .iter()
        .any(|stmt| stmt.contains("CREATE TABLE cats") || stmt.contains("CREATE TABLE `cats`"));

    if table_exists {
        tracing::info!("Table 'cats' already exists");
        return Ok(());
    }

    tracing::info!("Table 'cats' not found, creating...");

    let create_table_ddl = r#"
CREATE TABLE cats (
    id STRING(36) NOT NULL,
    name STRING(MAX) NOT NULL,
    date_of_birth STRING(10) NOT NULL,
    weight FLOAT64 NOT NULL,
    species STRING(32) NOT NULL,
    created_at TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true),
) PRIMARY KEY (id)
"#
    .trim()
    .to_string();

    let update_request = UpdateDatabaseDdlRequest {
        database: database_path.to_string(),
        statements: vec![create_table_ddl],
        operation_id: String::new(),
        proto_descriptors: vec![],
        throughput_mode: false,
    };

    let mut operation = admin_client
        .database()
        .update_database_ddl(update_request, None)
        .await
        .context("Failed to start table creation")?;

    operation
        .wait(None)
        .await
        .context("Failed to create table")?;

    tracing::info!("Table 'cats' created successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emulator_config(instance: &str) -> SpannerConfig {
        SpannerConfig {
            emulator_host: Some("localhost:9010".to_string()),
            project: "test-project".to_string(),
            instance: instance.to_string(),
            database: format!("{}-db", instance),
        }
    }

    fn record(name: &str) -> CatRecord {
        CatRecord {
            name: name.to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            weight: 4.2,
            species: Species::NorwegianForestCat,
        }
    }

    #[tokio::test]
    async fn test_client_creation_with_emulator() {
        // This will fail if emulator is not running, but that's expected
        let result = SpannerDatastore::from_config(&emulator_config("test-instance")).await;

        match result {
            Ok(_) => {
                // Client created successfully - emulator is running
            }
            Err(e) => {
                let error_msg = e.to_string();
                assert!(
                    error_msg.contains("Failed to create Spanner")
                        || error_msg.contains("Failed to start")
                        || error_msg.contains("Failed to check")
                        || error_msg.contains("Failed to get"),
                    "Error should have context: {}",
                    error_msg
                );
            }
        }
    }

    #[test]
    fn test_datastore_is_clonable() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<SpannerDatastore>();
    }

    #[test]
    fn test_datastore_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SpannerDatastore>();
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let Ok(store) = SpannerDatastore::from_config(&emulator_config("crud-test-instance")).await
        else {
            println!("CRUD test skipped (emulator may not be running)");
            return;
        };

        let keys = store.put_multi(vec![record("Tom")]).await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(store.get(&keys[0]).await.unwrap(), Some(record("Tom")));

        store.delete(&keys[0]).await.unwrap();
        assert_eq!(store.get(&keys[0]).await.unwrap(), None);

        // Deleting again is a no-op
        store.delete(&keys[0]).await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_page_follows_cursor() {
        let Ok(store) = SpannerDatastore::from_config(&emulator_config("page-test-instance")).await
        else {
            println!("Pagination test skipped (emulator may not be running)");
            return;
        };

        let inserted = store
            .put_multi(vec![record("a"), record("b"), record("c")])
            .await
            .unwrap();

        let mut seen = Vec::new();
        let mut cursor = None;
        loop {
            let page = store.fetch_page(NonZeroUsize::new(2).unwrap(), cursor.as_ref()).await.unwrap();
            assert!(page.entities.len() <= 2);
            seen.extend(page.entities.into_iter().map(|entity| entity.key));
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        for key in &inserted {
            assert_eq!(seen.iter().filter(|k| *k == key).count(), 1);
        }
    }
}
