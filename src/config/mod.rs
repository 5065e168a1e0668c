//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{num::NonZeroU32, path::PathBuf, str::FromStr};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::domain::types::{DEFAULT_PARAGRAPH_OFFSET, PROMO_VIEW_MODE};

mod cli;

pub use cli::{
    CliArgs, Command, LoggingOverrides, RenderArgs, ResolveArgs, SourceOverrides, SplitArgs,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "promo-embed";
const ENV_PREFIX: &str = "PROMO_EMBED";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 4;
const DEFAULT_CACHE_LOOKUP_LIMIT: usize = 1000;
const DEFAULT_CACHE_RENDER_LIMIT: usize = 500;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub promo: PromoSettings,
    pub fixtures: FixtureSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
    pub run_migrations: bool,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub lookup_limit: usize,
    pub render_limit: usize,
}

#[derive(Debug, Clone)]
pub struct PromoSettings {
    pub default_paragraph_offset: usize,
    pub view_mode: String,
}

#[derive(Debug, Clone)]
pub struct FixtureSettings {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match &cli.command {
        Command::Render(args) => raw.apply_source_overrides(&args.overrides),
        Command::Resolve(args) => raw.apply_source_overrides(&args.overrides),
        Command::Split(args) => raw.apply_logging_overrides(&args.logging),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
    promo: RawPromoSettings,
    fixtures: RawFixtureSettings,
}

impl RawSettings {
    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_source_overrides(&mut self, overrides: &SourceOverrides) {
        self.apply_logging_overrides(&overrides.logging);
        if let Some(path) = overrides.fixtures.as_ref() {
            self.fixtures.path = Some(path.clone());
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(offset) = overrides.default_paragraph_offset {
            self.promo.default_paragraph_offset = Some(offset);
        }
        if let Some(view_mode) = overrides.view_mode.as_ref() {
            self.promo.view_mode = Some(view_mode.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            database,
            cache,
            promo,
            fixtures,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            cache: build_cache_settings(cache)?,
            promo: build_promo_settings(promo)?,
            fixtures: build_fixture_settings(fixtures)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
        run_migrations: database.run_migrations.unwrap_or(false),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let lookup_limit = cache.lookup_limit.unwrap_or(DEFAULT_CACHE_LOOKUP_LIMIT);
    if lookup_limit == 0 {
        return Err(LoadError::invalid(
            "cache.lookup_limit",
            "must be greater than zero",
        ));
    }
    let render_limit = cache.render_limit.unwrap_or(DEFAULT_CACHE_RENDER_LIMIT);
    if render_limit == 0 {
        return Err(LoadError::invalid(
            "cache.render_limit",
            "must be greater than zero",
        ));
    }

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        lookup_limit,
        render_limit,
    })
}

fn build_promo_settings(promo: RawPromoSettings) -> Result<PromoSettings, LoadError> {
    let view_mode = promo
        .view_mode
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| PROMO_VIEW_MODE.to_string());
    if view_mode.is_empty() {
        return Err(LoadError::invalid("promo.view_mode", "must not be empty"));
    }

    Ok(PromoSettings {
        default_paragraph_offset: promo
            .default_paragraph_offset
            .unwrap_or(DEFAULT_PARAGRAPH_OFFSET),
        view_mode,
    })
}

fn build_fixture_settings(fixtures: RawFixtureSettings) -> Result<FixtureSettings, LoadError> {
    let path = fixtures.path.filter(|path| !path.as_os_str().is_empty());
    if let Some(path) = path.as_ref()
        && path.extension().is_some_and(|ext| ext != "toml")
    {
        return Err(LoadError::invalid(
            "fixtures.path",
            format!("`{}` is not a .toml file", path.display()),
        ));
    }
    Ok(FixtureSettings { path })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
    run_migrations: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    lookup_limit: Option<usize>,
    render_limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPromoSettings {
    default_paragraph_offset: Option<usize>,
    view_mode: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawFixtureSettings {
    path: Option<PathBuf>,
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
