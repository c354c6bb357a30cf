use anyhow::Context;
use serde::Deserialize;

use crate::users::store::UniquenessPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Startup seeding switches. Seeding is opt-in.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedSettings {
    pub enabled: bool,
    pub total_count: u64,
    pub batch_size: u64,
    /// Fixed RNG seed for reproducible data sets; random when unset.
    pub rng_seed: Option<u64>,
}

impl Default for SeedSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            total_count: 2_000_000,
            batch_size: 10_000,
            rng_seed: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub jwt: JwtConfig,
    pub seed: SeedSettings,
    pub uniqueness: UniquenessPolicy,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "userbase".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "userbase-clients".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES")?.unwrap_or(60),
        };

        let defaults = SeedSettings::default();
        let seed = SeedSettings {
            enabled: std::env::var("SEED_ON_START")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            total_count: env_parse("SEED_TOTAL")?.unwrap_or(defaults.total_count),
            batch_size: env_parse("SEED_BATCH_SIZE")?.unwrap_or(defaults.batch_size),
            rng_seed: env_parse("SEED_RNG")?,
        };
        anyhow::ensure!(seed.batch_size > 0, "SEED_BATCH_SIZE must be positive");

        let uniqueness = match std::env::var("UNIQUE_CONTACTS") {
            Ok(v) => v.parse()?,
            Err(_) => UniquenessPolicy::default(),
        };

        Ok(Self {
            database_url,
            max_connections: env_parse("DB_MAX_CONNECTIONS")?.unwrap_or(10),
            jwt,
            seed,
            uniqueness,
        })
    }
}

/// Boolean-like env values: `true`, `1`, `yes`, `on` (any case).
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

fn env_parse<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) => v
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("invalid value for {key}: {v:?}")),
        Err(_) => Ok(None),
    }
}
