//! Application services layer.

pub mod error;
pub mod formatter;
pub mod promo;
pub mod render;
pub mod repos;
