//! Third-party entity resolution.
//!
//! An [`EntityResolver`] maps a URL to the provider that owns it. Lookups can
//! fail on input that is not a URL at all (trace data routinely carries labels
//! such as `Browser` in URL positions), so the attribution pass only ever goes
//! through [`safe_entity_for_url`], which turns every failure into "no match".

pub mod database;

pub use database::{DatabaseError, EntityDatabase};

use crate::models::Entity;
use thiserror::Error;
use tracing::debug;

/// Errors produced by an entity lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("URL has no host: {0}")]
    MissingHost(String),
}

/// A read-only knowledge base of third-party entities.
pub trait EntityResolver {
    /// Returns the entity owning `url`, `Ok(None)` if the URL is valid but
    /// belongs to no known entity, or an error if the URL cannot be looked up.
    fn entity_for_url(&self, url: &str) -> Result<Option<&Entity>, LookupError>;
}

/// Resolves `url` to an entity, converting any lookup failure into `None`.
pub fn safe_entity_for_url<'a>(resolver: &'a dyn EntityResolver, url: &str) -> Option<&'a Entity> {
    match resolver.entity_for_url(url) {
        Ok(entity) => entity,
        Err(e) => {
            debug!(url, error = %e, "Entity lookup failed, skipping");
            None
        }
    }
}
