use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::config::AppConfig;
use crate::infrastructure::persistence::error::DbError;
use crate::utils::logging;

// Pool contract for accumulator deployments: bounded connections recycled
// every five minutes.
const MAX_CONNECTIONS: u32 = 32;
const CONN_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const CONN_MAX_LIFETIME: Duration = Duration::from_secs(5 * 60);

/// Manages database connection pool
pub struct DbPool {
    connection: DatabaseConnection,
}

impl DbPool {
    /// Creates the read-write connection pool the accumulator runs against
    pub async fn new(config: &AppConfig) -> Result<Self, DbError> {
        Self::connect(&config.database.url).await
    }

    /// Creates a read-only pool against the replica URL
    pub async fn new_read_only(config: &AppConfig) -> Result<Self, DbError> {
        Self::connect(&config.database.read_replica_url).await
    }

    async fn connect(url: &str) -> Result<Self, DbError> {
        logging::log_info(&format!("Connecting to database: {}", url));

        let options = ConnectOptions::new(url.to_string())
            .max_connections(MAX_CONNECTIONS)
            .idle_timeout(CONN_IDLE_TIMEOUT)
            .max_lifetime(CONN_MAX_LIFETIME)
            .sqlx_logging(false)
            .to_owned();

        match Database::connect(options).await {
            Ok(connection) => {
                logging::log_info("Database connection established successfully");
                Ok(DbPool { connection })
            }
            Err(e) => {
                logging::log_error(&format!("Failed to connect to database: {}", e));
                Err(DbError::ConnectionError(format!(
                    "Failed to connect to database: {}",
                    e
                )))
            }
        }
    }

    /// Returns the database connection
    pub fn get_connection(&self) -> &DatabaseConnection {
        &self.connection
    }
}
