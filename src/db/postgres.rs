//! PostgreSQL query executor

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::Arguments;
use tracing::{debug, info};

use super::{DataAccessError, NamedQueries, QueryExecutor, QueryParam, Row};
use crate::config::DatabaseSettings;

const MAX_CONNECTION_LIFETIME: Duration = Duration::from_secs(3 * 60);

/// Runs named statements against a PostgreSQL pool
#[derive(Clone)]
pub struct PgExecutor {
    pool: PgPool,
    queries: NamedQueries,
}

impl PgExecutor {
    /// Open the pool and verify the server answers
    pub async fn connect(
        settings: &DatabaseSettings,
        queries: NamedQueries,
    ) -> Result<Self, DataAccessError> {
        let options = PgConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.user)
            .password(&settings.password)
            .database(&settings.name);

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .max_lifetime(Some(MAX_CONNECTION_LIFETIME))
            .connect_with(options)
            .await?;

        let executor = Self { pool, queries };
        executor.ping().await?;

        info!(
            host = %settings.host,
            port = settings.port,
            database = %settings.name,
            max_connections = settings.max_connections,
            "Database pool created"
        );
        Ok(executor)
    }

    pub async fn ping(&self) -> Result<(), DataAccessError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Run every statement of the schema file once, in file order
    pub async fn bootstrap(&self, init: &NamedQueries) -> Result<(), DataAccessError> {
        info!("Checking database schema; missing objects will be created");
        for statement in init.iter() {
            debug!(statement = %statement.name, "Running schema statement");
            sqlx::raw_sql(&statement.sql).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl QueryExecutor for PgExecutor {
    async fn query(&self, name: &str, params: &[QueryParam]) -> Result<Vec<Row>, DataAccessError> {
        let sql = json_rows(self.queries.get(name)?);
        let values: Vec<Value> = sqlx::query_scalar_with(&sql, arguments(params)?)
            .fetch_all(&self.pool)
            .await?;

        debug!(query = name, rows = values.len(), "Query finished");
        values
            .into_iter()
            .map(|value| serde_json::from_value::<Row>(value).map_err(DataAccessError::from))
            .collect()
    }

    async fn execute(&self, name: &str, params: &[QueryParam]) -> Result<u64, DataAccessError> {
        let sql = self.queries.get(name)?;
        let result = sqlx::query_with(sql, arguments(params)?)
            .execute(&self.pool)
            .await?;

        debug!(query = name, rows_affected = result.rows_affected(), "Statement finished");
        Ok(result.rows_affected())
    }
}

/// Wrap a row-returning statement so each row comes back as one JSON object
fn json_rows(statement: &str) -> String {
    format!("SELECT row_to_json(q) FROM ({}) q", statement)
}

fn arguments(params: &[QueryParam]) -> Result<PgArguments, DataAccessError> {
    let mut args = PgArguments::default();
    for param in params {
        let added = match param {
            QueryParam::Text(value) => args.add(value.clone()),
            QueryParam::OptionalText(value) => args.add(value.clone()),
            QueryParam::Float(value) => args.add(*value),
            QueryParam::Integer(value) => args.add(*value),
            QueryParam::Uuid(value) => args.add(*value),
            QueryParam::Timestamp(value) => args.add(*value),
        };
        added.map_err(|e| DataAccessError::Database(sqlx::Error::Encode(e)))?;
    }
    Ok(args)
}
