mod config;

use std::sync::Arc;

use comrak::{Arena, format_html, parse_document};
use once_cell::sync::{Lazy, OnceCell};
use thiserror::Error;
use tracing::debug;

use crate::application::render::types::{RenderError, RenderPipeline};
use crate::domain::entities::{ContentNode, TextItem};
use crate::domain::types::PROMO_VIEW_MODE;

use config::{build_promo_sanitizer, build_text_sanitizer, default_options};

const MARKDOWN_FORMAT: &str = "markdown";

/// Settings for the promo markup wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPipelineConfig {
    /// CSS class on the wrapping `<aside>`.
    pub wrapper_class: String,
    /// View modes this renderer accepts.
    pub view_modes: Vec<String>,
}

impl Default for RenderPipelineConfig {
    fn default() -> Self {
        Self {
            wrapper_class: "embed-promo".to_string(),
            view_modes: vec![PROMO_VIEW_MODE.to_string()],
        }
    }
}

/// Comrak-based promo renderer with Ammonia sanitisation.
///
/// Markdown body items are converted with comrak; any other text format is
/// treated as HTML. Both paths are sanitised before being wrapped as
///
/// ```html
/// <aside class="embed-promo" data-view-mode="body_embed_promo" data-promo-id="7">
/// <h3 class="embed-promo__title">Title</h3>
/// ...body...
/// </aside>
/// ```
pub struct ComrakPromoRenderer {
    config: RenderPipelineConfig,
    options: comrak::Options<'static>,
    body_sanitizer: ammonia::Builder<'static>,
    text_sanitizer: ammonia::Builder<'static>,
}

impl ComrakPromoRenderer {
    pub fn new(config: RenderPipelineConfig) -> Self {
        Self {
            config,
            options: default_options(),
            body_sanitizer: build_promo_sanitizer(),
            text_sanitizer: build_text_sanitizer(),
        }
    }

    fn render_item(&self, item: &TextItem) -> Result<String, RenderError> {
        let html = if item.format == MARKDOWN_FORMAT {
            markdown_to_html(&item.value, &self.options)?
        } else {
            item.value.clone()
        };
        Ok(self.body_sanitizer.clean(&html).to_string())
    }
}

impl Default for ComrakPromoRenderer {
    fn default() -> Self {
        Self::new(RenderPipelineConfig::default())
    }
}

impl From<&crate::config::PromoSettings> for RenderPipelineConfig {
    fn from(settings: &crate::config::PromoSettings) -> Self {
        Self {
            view_modes: vec![settings.view_mode.clone()],
            ..Self::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderConfigError {
    #[error("render service already configured")]
    AlreadyConfigured,
}

static RENDER_PIPELINE_CONFIG: OnceCell<RenderPipelineConfig> = OnceCell::new();

static RENDER_SERVICE: Lazy<Arc<ComrakPromoRenderer>> =
    Lazy::new(|| Arc::new(ComrakPromoRenderer::new(active_render_config())));

/// Set the configuration the shared renderer is built with. Must run before
/// the first call to [`render_service`].
pub fn configure_render_service(config: RenderPipelineConfig) -> Result<(), RenderConfigError> {
    RENDER_PIPELINE_CONFIG
        .set(config)
        .map_err(|_| RenderConfigError::AlreadyConfigured)
}

/// Access the shared renderer instance, initialised on first use.
pub fn render_service() -> Arc<ComrakPromoRenderer> {
    Arc::clone(&RENDER_SERVICE)
}

fn active_render_config() -> RenderPipelineConfig {
    RENDER_PIPELINE_CONFIG.get().cloned().unwrap_or_default()
}

impl RenderPipeline for ComrakPromoRenderer {
    fn render(&self, node: &ContentNode, view_mode: &str) -> Result<String, RenderError> {
        if !self.config.view_modes.iter().any(|mode| mode == view_mode) {
            return Err(RenderError::UnsupportedViewMode {
                node_id: node.id.0,
                view_mode: view_mode.to_string(),
            });
        }

        let class = &self.config.wrapper_class;
        let title = self.text_sanitizer.clean(&node.title).to_string();

        let mut html = format!(
            "<aside class=\"{class}\" data-view-mode=\"{view_mode}\" data-promo-id=\"{id}\">\n\
             <h3 class=\"{class}__title\">{title}</h3>\n",
            id = node.id,
        );
        for item in &node.body {
            let body = self.render_item(item)?;
            html.push_str(body.trim_end());
            html.push('\n');
        }
        html.push_str("</aside>\n");

        debug!(
            node_id = %node.id,
            view_mode,
            bytes = html.len(),
            "Promo rendered"
        );
        Ok(html)
    }
}

fn markdown_to_html(markdown: &str, options: &comrak::Options<'static>) -> Result<String, RenderError> {
    let arena = Arena::new();
    let root = parse_document(&arena, markdown, options);
    let mut html = String::new();
    format_html(root, options, &mut html).map_err(|err| RenderError::Markdown {
        message: err.to_string(),
    })?;
    Ok(html)
}
