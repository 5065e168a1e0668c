//! Domain layer types and invariants.

pub mod entities;
pub mod paragraphs;
pub mod types;
