use std::{io::Read, process, sync::Arc};

use promo_embed::{
    application::{
        error::{AppError, ErrorReport},
        formatter::PromoFormatter,
        promo::{EmbedPromoManager, PromoError, PromoOptions},
        render::{RenderPipelineConfig, configure_render_service, render_service},
        repos::EntityStore,
    },
    cache::{CacheConfig, CacheTag, PromoCaches},
    config::{self, Command, RenderArgs, ResolveArgs, Settings, SplitArgs},
    domain::{
        entities::ContentNode,
        paragraphs::split_paragraphs,
        types::{NodeId, TermId},
    },
    infra::{db::PostgresEntityStore, error::InfraError, fixtures, telemetry},
};
use serde::Serialize;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(i32::from(error.exit_code()));
    }
}

fn report_application_error(error: &AppError) {
    let report = ErrorReport::from_error("promo_embed::main", error);
    if dispatcher::has_been_set() {
        error!(error = %report.render(), source = report.source, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %report.render(), source = report.source, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;
    configure_render_service(RenderPipelineConfig::from(&settings.promo))
        .map_err(|err| AppError::unexpected(err.to_string()))?;

    match cli_args.command {
        Command::Render(args) => run_render(&settings, args).await,
        Command::Resolve(args) => run_resolve(&settings, args).await,
        Command::Split(args) => run_split(args).await,
    }
}

async fn run_render(settings: &Settings, args: RenderArgs) -> Result<(), AppError> {
    let store = open_store(settings).await?;
    let article_id = NodeId(args.article);
    let article = store
        .load_node(article_id)
        .await
        .map_err(PromoError::from)?
        .ok_or_else(|| AppError::not_found(format!("node {article_id}")))?;

    let formatter = PromoFormatter::new(Arc::new(build_manager(settings, store)));
    let elements = if args.best_effort {
        formatter
            .view_elements_best_effort(&article, &article.body)
            .await
    } else {
        formatter.view_elements(&article, &article.body).await?
    };

    info!(
        article = %article_id,
        items = elements.len(),
        tagged = elements.iter().any(|element| !element.cache_tags.is_empty()),
        "Article body rendered"
    );

    if args.json {
        print_json(&elements)?;
    } else {
        for element in &elements {
            println!("{}", element.text);
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ResolveOutput<'a> {
    term: TermId,
    promo: Option<&'a ContentNode>,
    markup: Option<String>,
    cache_tags: Vec<CacheTag>,
}

async fn run_resolve(settings: &Settings, args: ResolveArgs) -> Result<(), AppError> {
    let store = open_store(settings).await?;
    let manager = build_manager(settings, store);
    let term = TermId(args.term);

    let promo = manager.resolve(term).await?;
    let markup = manager.rendered_markup(promo.as_ref()).await?;

    print_json(&ResolveOutput {
        term,
        promo: promo.as_ref(),
        markup,
        cache_tags: EmbedPromoManager::target_term_cache_tags(term),
    })
}

async fn run_split(args: SplitArgs) -> Result<(), AppError> {
    let html = match args.file.as_deref() {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(InfraError::from)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(InfraError::from)?;
            buffer
        }
    };

    print_json(&split_paragraphs(&html))
}

async fn open_store(settings: &Settings) -> Result<Arc<dyn EntityStore>, AppError> {
    if let Some(path) = settings.fixtures.path.as_deref() {
        let store = fixtures::load_store(path).await?;
        return Ok(Arc::new(store));
    }

    if settings.database.url.is_some() {
        let store = PostgresEntityStore::from_settings(&settings.database).await?;
        return Ok(Arc::new(store));
    }

    Err(AppError::validation(
        "no entity source configured; set fixtures.path or database.url",
    ))
}

fn build_manager(settings: &Settings, store: Arc<dyn EntityStore>) -> EmbedPromoManager {
    let caches = PromoCaches::from_config(&CacheConfig::from(&settings.cache));
    EmbedPromoManager::new(
        store,
        render_service(),
        caches,
        PromoOptions::from(&settings.promo),
    )
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))?;
    println!("{json}");
    Ok(())
}
