use crate::server::auth::TokenSettings;
use agora_common::{
    snowflake::{ProcessId, WorkerId},
    util::{NonPositiveDurationError, PositiveDuration},
};
use serde::Deserialize;
use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
};
use tracing::debug;

/// Process configuration, read from the environment and an optional `.env` file.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct Env {
    pub server_address: IpAddr,
    pub server_port: u16,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,
    #[serde(default)]
    pub worker_id: WorkerId,
    #[serde(default)]
    pub process_id: ProcessId,
    #[serde(default = "default_access_token_lifetime_seconds")]
    pub access_token_lifetime_seconds: i64,
    #[serde(default = "default_refresh_token_lifetime_seconds")]
    pub refresh_token_lifetime_seconds: i64,
}

fn default_database_url() -> String {
    "sqlite://agora.db".to_owned()
}

fn default_database_max_connections() -> u32 {
    5
}

fn default_media_root() -> PathBuf {
    PathBuf::from("media")
}

fn default_access_token_lifetime_seconds() -> i64 {
    5 * 60
}

fn default_refresh_token_lifetime_seconds() -> i64 {
    24 * 60 * 60
}

impl Env {
    #[must_use]
    pub fn socket_address(&self) -> SocketAddr {
        SocketAddr::new(self.server_address, self.server_port)
    }

    pub fn token_settings(&self) -> Result<TokenSettings, NonPositiveDurationError> {
        Ok(TokenSettings {
            access_lifetime: PositiveDuration::from_seconds(self.access_token_lifetime_seconds)?,
            refresh_lifetime: PositiveDuration::from_seconds(self.refresh_token_lifetime_seconds)?,
        })
    }
}

pub fn get_env() -> Result<Env, crate::InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .env file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(crate::InitError::from)
}
