//! Contact Enricher: best-effort email discovery on each record's website.
//!
//! Any failure here leaves `email` as `None`. Nothing is ever propagated to
//! the caller.

use std::sync::LazyLock;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use mapscout_core::BusinessRecord;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use tokio_util::sync::CancellationToken;

use crate::error::ScraperError;
use crate::identity::IdentityPool;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}")
        .expect("valid email regex")
});

static LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid link selector"));

static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid body selector"));

/// Address-like strings that are really asset file names (`logo@2x.png`).
const IMAGE_SUFFIXES: [&str; 6] = [".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg"];

/// Separator used when several addresses are stored in one record.
pub const EMAIL_SEPARATOR: &str = "; ";

/// Collects up to `max` distinct addresses from an HTML page, `mailto:`
/// links first, then the page text, in first-seen order.
#[must_use]
pub fn extract_emails(html: &str, max: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut found: Vec<String> = Vec::new();
    let mut push = |candidate: &str| {
        let email = candidate.trim().to_lowercase();
        if found.len() < max && is_plausible(&email) && !found.contains(&email) {
            found.push(email);
        }
    };

    for link in document.select(&LINKS) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.get(..7).is_some_and(|p| p.eq_ignore_ascii_case("mailto:")) {
            let address = href[7..].split('?').next().unwrap_or_default();
            if EMAIL_RE.find(address).is_some_and(|m| m.as_str() == address.trim()) {
                push(address);
            }
        }
    }

    let text = document
        .select(&BODY)
        .next()
        .unwrap_or_else(|| document.root_element())
        .text()
        .collect::<Vec<_>>()
        .join(" ");
    for m in EMAIL_RE.find_iter(&text) {
        push(m.as_str());
    }

    found
}

fn is_plausible(email: &str) -> bool {
    !email.is_empty() && !IMAGE_SUFFIXES.iter().any(|ext| email.ends_with(ext))
}

/// Secondary fetcher for record websites.
pub struct ContactEnricher {
    client: Client,
    identities: IdentityPool,
    max_emails: usize,
    concurrency: usize,
}

impl ContactEnricher {
    /// `timeout` bounds each website fetch; `concurrency` bounds how many run
    /// at once.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        timeout: Duration,
        max_emails: usize,
        concurrency: usize,
        identities: IdentityPool,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            identities,
            max_emails,
            concurrency: concurrency.max(1),
        })
    }

    /// Fills `email` on records with a usable website. Order is preserved;
    /// after cancellation the remaining records pass through untouched.
    pub async fn enrich(
        &self,
        records: Vec<BusinessRecord>,
        cancel: &CancellationToken,
    ) -> Vec<BusinessRecord> {
        let total = records.len();
        let enriched: Vec<BusinessRecord> = stream::iter(records)
            .map(|mut record| async move {
                if record.email.is_none() && !cancel.is_cancelled() {
                    if let Some(website) = record.enrichable_website().map(str::to_owned) {
                        record.email = self.find_emails(&website, cancel).await;
                    }
                }
                record
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let with_email = enriched.iter().filter(|r| r.email.is_some()).count();
        tracing::info!(total, with_email, "contact enrichment finished");
        enriched
    }

    /// Fetches `website` and returns the joined addresses found there.
    pub async fn find_emails(&self, website: &str, cancel: &CancellationToken) -> Option<String> {
        let identity = self.identities.pick();
        let request = self
            .client
            .get(website)
            .header(reqwest::header::USER_AGENT, identity.user_agent)
            .header(reqwest::header::ACCEPT, identity.accept)
            .send();

        let response = tokio::select! {
            () = cancel.cancelled() => return None,
            result = request => result,
        };
        let body = match response.and_then(reqwest::Response::error_for_status) {
            Ok(resp) => match resp.text().await {
                Ok(body) => body,
                Err(err) => {
                    tracing::debug!(website, error = %err, "failed to read website body");
                    return None;
                }
            },
            Err(err) => {
                tracing::debug!(website, error = %err, "website fetch failed");
                return None;
            }
        };

        let emails = extract_emails(&body, self.max_emails);
        if emails.is_empty() {
            None
        } else {
            tracing::debug!(website, count = emails.len(), "found contact emails");
            Some(emails.join(EMAIL_SEPARATOR))
        }
    }
}
