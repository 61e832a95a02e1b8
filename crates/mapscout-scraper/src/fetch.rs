//! Fetch Client: one HTTP attempt, classified.
//!
//! Nothing here sleeps or retries. The Query Scraper owns that policy and
//! reads only the [`FetchOutcome`] returned from each call.

use std::time::Duration;

use async_trait::async_trait;
use mapscout_core::Query;
use reqwest::{Client, Url};

use crate::error::ScraperError;
use crate::identity::IdentityPool;

/// Lower-case tokens whose presence in a 2xx body marks it as a block page.
const BLOCK_MARKERS: [&str; 6] = [
    "captcha",
    "unusual traffic",
    "automated",
    "denied",
    "/cdn-cgi/challenge-platform/",
    "cf-chl-",
];

/// Result of a single fetch attempt. A body is only present on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success { body: String, status: u16 },
    Blocked { reason: String },
    HttpError { status: u16 },
    NetworkError { cause: String },
}

impl FetchOutcome {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            FetchOutcome::Success { .. } => "success",
            FetchOutcome::Blocked { .. } => "blocked",
            FetchOutcome::HttpError { .. } => "http_error",
            FetchOutcome::NetworkError { .. } => "network_error",
        }
    }
}

/// Returns the first block marker found in `body`, matched case-insensitively.
#[must_use]
pub fn detect_block(body: &str) -> Option<&'static str> {
    let lowered = body.to_lowercase();
    BLOCK_MARKERS
        .iter()
        .copied()
        .find(|marker| lowered.contains(marker))
}

/// Classifies a completed response.
#[must_use]
pub fn classify_response(status: u16, body: String) -> FetchOutcome {
    if !(200..300).contains(&status) {
        return FetchOutcome::HttpError { status };
    }
    if let Some(marker) = detect_block(&body) {
        return FetchOutcome::Blocked {
            reason: format!("block marker \"{marker}\" in response body"),
        };
    }
    FetchOutcome::Success { body, status }
}

/// A source of result pages for a query.
///
/// [`HttpFetcher`] is the plain HTTP implementation; a headless-browser
/// strategy plugs in by implementing the same trait.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url, query: &Query) -> FetchOutcome;
}

/// Builds paginated search URLs from the configured endpoint.
#[derive(Debug, Clone)]
pub struct SearchEndpoint {
    base: Url,
}

impl SearchEndpoint {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidSearchUrl`] unless `raw` is an
    /// absolute http(s) URL.
    pub fn parse(raw: &str) -> Result<Self, ScraperError> {
        let base = Url::parse(raw).map_err(|e| ScraperError::InvalidSearchUrl {
            url: raw.to_owned(),
            reason: e.to_string(),
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ScraperError::InvalidSearchUrl {
                url: raw.to_owned(),
                reason: format!("unsupported scheme \"{}\"", base.scheme()),
            });
        }
        Ok(Self { base })
    }

    /// URL for `query` starting at item offset `cursor`. The first page
    /// carries no `start` parameter.
    #[must_use]
    pub fn page_url(&self, query: &Query, cursor: usize) -> Url {
        let mut url = self.base.clone();
        let kept: Vec<(String, String)> = self
            .base
            .query_pairs()
            .filter(|(k, _)| k != "q" && k != "start")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            for (k, v) in &kept {
                pairs.append_pair(k, v);
            }
            pairs.append_pair("q", query.as_str());
            if cursor > 0 {
                pairs.append_pair("start", &cursor.to_string());
            }
        }
        url
    }
}

/// reqwest-backed [`PageFetcher`] with per-call identity rotation.
pub struct HttpFetcher {
    client: Client,
    identities: IdentityPool,
}

impl HttpFetcher {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout: Duration, identities: IdentityPool) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()?;
        Ok(Self { client, identities })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, query: &Query) -> FetchOutcome {
        let identity = self.identities.pick();
        let response = match self
            .client
            .get(url.clone())
            .header(reqwest::header::USER_AGENT, identity.user_agent)
            .header(reqwest::header::ACCEPT, identity.accept)
            .header(reqwest::header::ACCEPT_LANGUAGE, identity.accept_language)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                tracing::debug!(query = %query, url = %url, error = %err, "search request failed");
                return FetchOutcome::NetworkError {
                    cause: err.to_string(),
                };
            }
        };

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                tracing::debug!(query = %query, status, error = %err, "failed to read response body");
                return FetchOutcome::NetworkError {
                    cause: err.to_string(),
                };
            }
        };

        let outcome = classify_response(status, body);
        tracing::debug!(query = %query, url = %url, status, outcome = outcome.kind(), "fetched page");
        outcome
    }
}
