use anyhow::{Context, Result};
use config::{Config, Environment, File};
use sea_orm::Database;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{auth::TokenIssuer, schemas::AppState};

const DEFAULT_JWT_SECRET: &str = "rentals-development-secret";

/// Runtime settings.
///
/// Sources, later ones winning: built-in defaults, an optional `rentals.toml`
/// in the working directory, then environment variables (`DATABASE_URL`,
/// `BIND_ADDRESS`, `JWT_SECRET`, `ACCESS_TOKEN_TTL_SECS`, `REFRESH_TOKEN_TTL_SECS`).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub bind_address: String,
    pub jwt_secret: String,
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let settings = Config::builder()
            .set_default("database_url", "sqlite://rentals.db?mode=rwc")?
            .set_default("bind_address", "0.0.0.0:3000")?
            .set_default("jwt_secret", DEFAULT_JWT_SECRET)?
            .set_default("access_token_ttl_secs", 86_400_i64)?
            .set_default("refresh_token_ttl_secs", 604_800_i64)?
            .add_source(File::with_name("rentals").required(false))
            .add_source(Environment::default().try_parsing(true))
            .build()
            .context("Failed to assemble configuration")?
            .try_deserialize::<Settings>()
            .context("Invalid configuration")?;

        if settings.jwt_secret == DEFAULT_JWT_SECRET {
            warn!("JWT_SECRET is not set, using the development secret");
        }

        Ok(settings)
    }

    pub fn token_issuer(&self) -> TokenIssuer {
        TokenIssuer::new(
            &self.jwt_secret,
            self.access_token_ttl_secs,
            self.refresh_token_ttl_secs,
        )
    }
}

/// Initialize application state from the loaded settings
pub async fn initialize_app_state(settings: &Settings) -> Result<AppState> {
    initialize_app_state_with_url(settings, &settings.database_url).await
}

/// Initialize application state against an explicit database URL
pub async fn initialize_app_state_with_url(
    settings: &Settings,
    database_url: &str,
) -> Result<AppState> {
    info!("Connecting to database: {}", database_url);
    let db = Database::connect(database_url).await?;

    Ok(AppState {
        db,
        tokens: settings.token_issuer(),
    })
}
