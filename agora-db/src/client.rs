use agora_common::{
    model::{Id, ModelValidationError, user::Email},
    snowflake::{ProcessId, SnowflakeGenerator, WorkerId},
};
use sqlx::{
    SqlitePool,
    migrate::MigrateError,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{
    str::FromStr,
    sync::{Mutex, PoisonError},
};
use thiserror::Error;
use tracing::info;

mod auth;
mod comments;
mod follows;
mod posts;
mod users;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("Email address {} is already registered", .0.get())]
    EmailTaken(Email),
    #[error("Running migrations failed: {0}")]
    Migrate(#[from] MigrateError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub struct DbClient {
    pool: SqlitePool,
    snowflake_generator: Mutex<SnowflakeGenerator>,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: SqlitePool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        let snowflake_generator = Mutex::new(SnowflakeGenerator::new(worker_id, process_id));

        Self {
            pool,
            snowflake_generator,
        }
    }

    /// Opens a pool on `database_url`, creating the database file if needed.
    ///
    /// Connections are never recycled, so `sqlite::memory:` with a single
    /// connection keeps its data for the lifetime of the client.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        worker_id: WorkerId,
        process_id: ProcessId,
    ) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Ok(Self::new(pool, worker_id, process_id))
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!().run(&self.pool).await?;
        info!("Database migrations applied");

        Ok(())
    }

    fn next_id<Marker>(&self) -> Id<Marker> {
        self.snowflake_generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()
            .into()
    }
}

pub(crate) fn db_id<Marker>(id: Id<Marker>) -> i64 {
    id.snowflake().get().cast_signed()
}

pub(crate) fn model_id<Marker>(snowflake: i64) -> Id<Marker> {
    snowflake.cast_unsigned().into()
}
