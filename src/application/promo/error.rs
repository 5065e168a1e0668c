use thiserror::Error;

use crate::application::render::RenderError;
use crate::application::repos::RepoError;
use crate::cache::CacheError;

/// Failure of a resolve, render, or inject call. A term without an eligible
/// promo is not an error; those calls return `Ok(None)`.
#[derive(Debug, Error)]
pub enum PromoError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("lookup cache entry `{key}` holds an unreadable node id `{value}`")]
    CorruptLookup { key: String, value: String },
}
