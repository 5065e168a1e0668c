//! Promo rendering pipeline.
//!
//! The pipeline is pure: it turns a promo node into markup and surfaces
//! structured errors. Caching of its output happens in the caller (the render
//! cache manager), never here.

mod service;
mod types;

pub use service::{
    ComrakPromoRenderer, RenderConfigError, RenderPipelineConfig, configure_render_service,
    render_service,
};
pub use types::{RenderError, RenderPipeline};
