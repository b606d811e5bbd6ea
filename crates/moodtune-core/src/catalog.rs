//! Track retrieval from a music catalog.

use crate::types::Track;
use thiserror::Error;

pub const DEFAULT_TRACK_LIMIT: usize = 5;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("catalog API error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("invalid catalog response: {0}")]
    InvalidResponse(String),
    #[error("rate limited")]
    RateLimited,
}

/// Capability: free-text track search, results in catalog rank order.
pub trait TrackCatalog {
    fn search_tracks(&self, query: &str, limit: usize) -> Result<Vec<Track>, CatalogError>;
}

pub struct TrackRetriever {
    catalog: Box<dyn TrackCatalog>,
}

impl TrackRetriever {
    pub fn new(catalog: Box<dyn TrackCatalog>) -> Self {
        Self { catalog }
    }

    /// Search for at most `limit` tracks matching `query`.
    ///
    /// An empty result is a normal outcome. A blank query or a zero limit
    /// short-circuits without contacting the catalog.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<Track>, CatalogError> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let mut tracks = self.catalog.search_tracks(query, limit)?;
        tracks.truncate(limit);

        tracing::debug!(query, limit, found = tracks.len(), "catalog search finished");
        Ok(tracks)
    }
}
