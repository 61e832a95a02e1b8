//! In-memory [`PageFetcher`] for session and orchestrator tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use mapscout_core::Query;
use reqwest::Url;

use crate::fetch::{FetchOutcome, PageFetcher};

/// Replays a fixed script of outcomes per query and records every URL asked for.
/// When a query's script runs out, an empty results page is returned.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, VecDeque<FetchOutcome>>>,
    calls: Mutex<Vec<(String, Url)>>,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn script(self, query: &str, outcomes: Vec<FetchOutcome>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(query.to_owned(), outcomes.into());
        self
    }

    pub(crate) fn calls_for(&self, query: &str) -> Vec<Url> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(q, _)| q == query)
            .map(|(_, url)| url.clone())
            .collect()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &Url, query: &Query) -> FetchOutcome {
        self.calls
            .lock()
            .unwrap()
            .push((query.as_str().to_owned(), url.clone()));
        self.scripts
            .lock()
            .unwrap()
            .get_mut(query.as_str())
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| page(EMPTY_PAGE))
    }
}

pub(crate) const EMPTY_PAGE: &str = "<html><body><div id=\"rso\"></div></body></html>";

pub(crate) fn page(html: &str) -> FetchOutcome {
    FetchOutcome::Success {
        body: html.to_owned(),
        status: 200,
    }
}

/// A results page with one `div.VkpGBb` listing per `(name, address)`.
pub(crate) fn listing_page(listings: &[(&str, &str)], total: Option<u64>) -> FetchOutcome {
    let mut html = String::from("<html><body>");
    if let Some(total) = total {
        html.push_str(&format!("<div id=\"result-stats\">About {total} results</div>"));
    }
    for (name, address) in listings {
        html.push_str(&format!(
            "<div class=\"VkpGBb\"><div class=\"rllt__details\">\
             <div role=\"heading\">{name}</div><div>{address} · City</div></div></div>"
        ));
    }
    html.push_str("</body></html>");
    page(&html)
}

pub(crate) fn blocked() -> FetchOutcome {
    FetchOutcome::Blocked {
        reason: "captcha".to_owned(),
    }
}

pub(crate) fn http_error(status: u16) -> FetchOutcome {
    FetchOutcome::HttpError { status }
}

pub(crate) fn network_error() -> FetchOutcome {
    FetchOutcome::NetworkError {
        cause: "connection reset".to_owned(),
    }
}
