use log::debug;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde_json::Value;
use url::Url;

use crate::error::{CirclogError, Result};

use super::cache::HttpCache;
use super::sanitize;

/// Authenticated HTTP layer for the CircleCI v1.1 REST API.
///
/// Wraps a blocking client around the response cache: every request is
/// served from the cache when possible unless the caller forces a live
/// fetch. Authentication is HTTP Basic with the API token as username and
/// a blank password, as the v1.1 API expects.
pub struct Transport {
    client: Client,
    api_url: Url,
    token: String,
    cache: HttpCache,
}

impl Transport {
    /// Creates a transport for a CircleCI host.
    ///
    /// # Arguments
    ///
    /// * `host` - Instance base URL (e.g., <https://circleci.com>)
    /// * `token` - Personal API token
    /// * `cache` - Response cache; pass a disabled cache to always hit
    ///   the network
    ///
    /// # Errors
    ///
    /// Returns an error if the API base URL cannot be constructed.
    pub fn new(host: &str, token: &str, cache: HttpCache) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(concat!("circlog/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| CirclogError::Config(format!("Failed to create HTTP client: {e}")))?;

        let api_url = Url::parse(host)
            .map_err(|e| CirclogError::Config(format!("Invalid base URL: {e}")))?
            .join("api/v1.1/")
            .map_err(|e| CirclogError::Config(format!("Invalid API base URL: {e}")))?;

        Ok(Self {
            client,
            api_url,
            token: token.to_string(),
            cache,
        })
    }

    /// Fetches a route and decodes the body as JSON.
    ///
    /// The decoded payload is scrubbed of embedded CI configuration
    /// before it is returned. A body that fails to decode is a fatal
    /// error; there is no partial result.
    pub fn get_json(&self, route: &str, params: &[(&str, &str)], force_live: bool) -> Result<Value> {
        let body = self.get(route, params, force_live)?;
        let payload: Value = serde_json::from_str(&body)?;
        Ok(sanitize::scrub(payload))
    }

    /// Fetches a route and returns the raw text body. Used for log output,
    /// the one route that does not answer with JSON.
    pub fn get_text(&self, route: &str, params: &[(&str, &str)], force_live: bool) -> Result<String> {
        self.get(route, params, force_live)
    }

    fn get(&self, route: &str, params: &[(&str, &str)], force_live: bool) -> Result<String> {
        let mut url = self
            .api_url
            .join(route)
            .map_err(|e| CirclogError::Config(format!("Invalid route {route:?}: {e}")))?;

        // Sorted so that equivalent requests share one cache key
        let mut pairs: Vec<(&str, &str)> = params.to_vec();
        pairs.push(("shallow", "true"));
        pairs.sort_unstable();
        url.query_pairs_mut().extend_pairs(&pairs);

        let key = url.to_string();

        if !force_live {
            if let Some(body) = self.cache.get(&key) {
                return Ok(body);
            }
        }

        debug!("GET {key}");

        let response = self
            .client
            .get(url)
            .basic_auth(&self.token, Some(""))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(CirclogError::Api {
                status: status.as_u16(),
            });
        }

        let body = response.text()?;
        if !force_live {
            self.cache.put(&key, &body);
        }

        Ok(body)
    }
}
