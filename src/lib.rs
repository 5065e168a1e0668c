//! Category-targeted promo embedding for article bodies.
//!
//! Articles carry a primary category; promo nodes (`embed_promo`) target one.
//! When an article body is displayed, the newest published promo for its
//! category is rendered and spliced in after a configured number of paragraphs.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
