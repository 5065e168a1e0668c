use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the promo-embed binary.
#[derive(Debug, Parser)]
#[command(
    name = "promo-embed",
    version,
    about = "Embed category-targeted promos into article bodies"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "PROMO_EMBED_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render an article's body with its category promo injected.
    Render(RenderArgs),
    /// Show which promo, if any, a category resolves to.
    Resolve(ResolveArgs),
    /// Split HTML into the paragraph fragments used for injection.
    Split(SplitArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SourceOverrides {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Read nodes from a TOML fixture file instead of the database.
    #[arg(long = "fixtures", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub fixtures: Option<PathBuf>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Toggle the lookup and render caches.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override the paragraph offset used when a promo sets none.
    #[arg(long = "default-offset", value_name = "COUNT")]
    pub default_paragraph_offset: Option<usize>,

    /// Override the view mode promos are rendered with.
    #[arg(long = "view-mode", value_name = "NAME")]
    pub view_mode: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub overrides: SourceOverrides,

    /// Id of the article node to render.
    #[arg(long = "article", value_name = "ID")]
    pub article: i64,

    /// Fall back to the plain body when the promo cannot be resolved or rendered.
    #[arg(long = "best-effort", action = clap::ArgAction::SetTrue)]
    pub best_effort: bool,

    /// Print the processed items and their cache tags as JSON.
    #[arg(long = "json", action = clap::ArgAction::SetTrue)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub overrides: SourceOverrides,

    /// Taxonomy term id of the category.
    #[arg(long = "term", value_name = "ID")]
    pub term: i64,
}

#[derive(Debug, Args, Clone)]
pub struct SplitArgs {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// HTML file to split; reads stdin when omitted.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,
}
