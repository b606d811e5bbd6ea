//! Spotify Web API track search with client-credentials authentication.

use moodtune_core::{CatalogError, Track, TrackCatalog};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";

/// Spotify accepts 1..=50 results per search page.
const MAX_SEARCH_LIMIT: usize = 50;
/// Tokens are refreshed this long before Spotify says they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

const UNKNOWN_ARTIST: &str = "Unknown artist";

#[derive(Debug, Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

pub struct SpotifyCatalog {
    client: Client,
    credentials: SpotifyCredentials,
    token_url: String,
    api_base: String,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyCatalog {
    pub fn new(credentials: SpotifyCredentials, timeout: Duration) -> Result<Self, CatalogError> {
        Self::with_endpoints(credentials, timeout, SPOTIFY_TOKEN_URL, SPOTIFY_API_BASE)
    }

    pub fn with_endpoints(
        credentials: SpotifyCredentials,
        timeout: Duration,
        token_url: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Connection(e.to_string()))?;
        let api_base: String = api_base.into();
        Ok(Self {
            client,
            credentials,
            token_url: token_url.into(),
            api_base: api_base.trim_end_matches('/').to_string(),
            token: Mutex::new(None),
        })
    }

    /// A valid access token, fetching a new one when the cached one is stale.
    fn access_token(&self) -> Result<String, CatalogError> {
        let mut cached = self.token.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(token) = cached.as_ref().filter(|t| t.expires_at > Instant::now()) {
            return Ok(token.access_token.clone());
        }

        let fresh = self.fetch_token()?;
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access_token)
    }

    fn forget_token(&self) {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Error for a non-2xx search response. A rejected token is dropped so the
    /// next search fetches a fresh one.
    fn search_failure(&self, status: StatusCode, body: String) -> CatalogError {
        match status {
            StatusCode::UNAUTHORIZED => {
                self.forget_token();
                CatalogError::Auth("access token rejected".into())
            }
            StatusCode::TOO_MANY_REQUESTS => CatalogError::RateLimited,
            _ => CatalogError::Api { status: status.as_u16(), message: body },
        }
    }

    fn fetch_token(&self) -> Result<CachedToken, CatalogError> {
        tracing::debug!("requesting Spotify client-credentials token");

        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .map_err(|e| CatalogError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(CatalogError::Auth(format!("token request failed with {status}: {body}")));
        }

        let token: TokenResponse = response
            .json()
            .map_err(|e| CatalogError::InvalidResponse(format!("token response: {e}")))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        tracing::info!(expires_in = token.expires_in, "obtained Spotify access token");

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + lifetime,
        })
    }
}

impl TrackCatalog for SpotifyCatalog {
    fn search_tracks(&self, query: &str, limit: usize) -> Result<Vec<Track>, CatalogError> {
        let token = self.access_token()?;
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT).to_string();

        let response = self
            .client
            .get(format!("{}/search", self.api_base))
            .bearer_auth(token)
            .query(&[("q", query), ("type", "track"), ("limit", limit.as_str())])
            .send()
            .map_err(|e| CatalogError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(self.search_failure(status, body));
        }

        let body: SearchResponse = response
            .json()
            .map_err(|e| CatalogError::InvalidResponse(format!("search response: {e}")))?;
        let tracks = flatten_tracks(body);

        tracing::debug!(query, found = tracks.len(), "Spotify search returned");
        Ok(tracks)
    }
}

/// Flatten Spotify's nested track objects, keeping rank order.
fn flatten_tracks(body: SearchResponse) -> Vec<Track> {
    body.tracks
        .map(|page| page.items)
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .map(|t| Track {
            name: t.name,
            artist: t
                .artists
                .into_iter()
                .next()
                .map(|a| a.name)
                .unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            url: t.external_urls.and_then(|u| u.spotify).unwrap_or_default(),
            preview_url: t.preview_url.filter(|p| !p.is_empty()),
        })
        .collect()
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct SearchResponse {
    tracks: Option<TrackPage>,
}

#[derive(Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<Option<SpotifyTrack>>,
}

#[derive(Deserialize)]
struct SpotifyTrack {
    name: String,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
    external_urls: Option<ExternalUrls>,
    preview_url: Option<String>,
}

#[derive(Deserialize)]
struct SpotifyArtist {
    name: String,
}

#[derive(Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}
