//! Query Scraper: drives fetch → classify → extract → paginate for one query.
//!
//! ```text
//! Idle ─▶ Fetching ─┬─▶ Blocked ──(budget left, long backoff)──▶ Fetching
//!                   ├─▶ Failed  ──(budget left, backoff)───────▶ Fetching
//!                   └─▶ Extracted ─┬─▶ Paginating ─(delay)─▶ Fetching
//!                                  └─▶ Done
//! Blocked / Failed with budget exhausted ─▶ Aborted
//! ```
//!
//! Only `Extracted` moves the cursor. The session ends on the first page that
//! adds no new records, whatever the page claims about remaining results.

use std::collections::HashSet;

use mapscout_core::{BusinessRecord, DedupKey, Query};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::backoff::sleep_or_cancel;
use crate::fetch::{FetchOutcome, PageFetcher, SearchEndpoint};
use crate::page::{extract_page, PageExtraction};
use crate::rules::RuleSet;
use crate::settings::ScrapeConfig;

/// Hard cap on pages per session, independent of any other stop condition.
pub const MAX_PAGES: usize = 50;

/// Terminal status of one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Done,
    Aborted,
    Cancelled,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Done => write!(f, "done"),
            SessionStatus::Aborted => write!(f, "aborted"),
            SessionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// An empty page, or the reported total has been reached.
    NoMorePages,
    /// A page that yielded records but none with a new key.
    Stagnated,
    RecordCap,
    PageLimit,
    RetryBudgetExhausted,
    CaptchaBudgetExhausted,
    Cancelled,
}

impl TerminationReason {
    #[must_use]
    pub fn status(self) -> SessionStatus {
        match self {
            TerminationReason::NoMorePages
            | TerminationReason::Stagnated
            | TerminationReason::RecordCap
            | TerminationReason::PageLimit => SessionStatus::Done,
            TerminationReason::RetryBudgetExhausted
            | TerminationReason::CaptchaBudgetExhausted => SessionStatus::Aborted,
            TerminationReason::Cancelled => SessionStatus::Cancelled,
        }
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TerminationReason::NoMorePages => "no_more_pages",
            TerminationReason::Stagnated => "stagnated",
            TerminationReason::RecordCap => "record_cap",
            TerminationReason::PageLimit => "page_limit",
            TerminationReason::RetryBudgetExhausted => "retry_budget_exhausted",
            TerminationReason::CaptchaBudgetExhausted => "captcha_budget_exhausted",
            TerminationReason::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Everything one session produced.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub query: Query,
    pub status: SessionStatus,
    pub reason: TerminationReason,
    /// Records in pagination order, unique by [`DedupKey`] within the session.
    pub records: Vec<BusinessRecord>,
    pub pages_fetched: usize,
    pub fetch_attempts: usize,
    pub blocked_attempts: usize,
}

/// Per-query mutable state. Owned by a single [`QueryScraper::run`] call.
#[derive(Debug)]
struct ScrapeSession {
    query: Query,
    cursor: usize,
    consecutive_failures: u32,
    consecutive_blocks: u32,
    records: Vec<BusinessRecord>,
    seen: HashSet<DedupKey>,
    pages_fetched: usize,
    fetch_attempts: usize,
    blocked_attempts: usize,
}

impl ScrapeSession {
    fn new(query: Query) -> Self {
        Self {
            query,
            cursor: 0,
            consecutive_failures: 0,
            consecutive_blocks: 0,
            records: Vec::new(),
            seen: HashSet::new(),
            pages_fetched: 0,
            fetch_attempts: 0,
            blocked_attempts: 0,
        }
    }

    /// Appends records with unseen keys, up to `cap` in total. Returns how
    /// many were new.
    fn absorb(&mut self, page: PageExtraction, cap: usize) -> usize {
        let mut added = 0;
        for partial in page.records {
            if self.records.len() >= cap {
                break;
            }
            let record = partial.into_record(&self.query);
            if self.seen.insert(record.dedup_key()) {
                self.records.push(record);
                added += 1;
            }
        }
        added
    }

    fn finish(self, reason: TerminationReason) -> QueryOutcome {
        QueryOutcome {
            query: self.query,
            status: reason.status(),
            reason,
            records: self.records,
            pages_fetched: self.pages_fetched,
            fetch_attempts: self.fetch_attempts,
            blocked_attempts: self.blocked_attempts,
        }
    }
}

#[derive(Debug)]
enum SessionState {
    Fetching,
    Blocked(String),
    Failed(String),
    Extracted(PageExtraction),
    Paginating,
    Finished(TerminationReason),
}

/// Runs sessions against one fetcher, endpoint, and rule set.
pub struct QueryScraper<'a> {
    fetcher: &'a dyn PageFetcher,
    endpoint: &'a SearchEndpoint,
    rules: &'a RuleSet,
    config: &'a ScrapeConfig,
}

impl<'a> QueryScraper<'a> {
    #[must_use]
    pub fn new(
        fetcher: &'a dyn PageFetcher,
        endpoint: &'a SearchEndpoint,
        rules: &'a RuleSet,
        config: &'a ScrapeConfig,
    ) -> Self {
        Self {
            fetcher,
            endpoint,
            rules,
            config,
        }
    }

    /// Scrapes `query` until a terminal state. Never fails: every problem is
    /// folded into the returned outcome.
    pub async fn run(&self, query: Query, cancel: &CancellationToken) -> QueryOutcome {
        let mut session = ScrapeSession::new(query);
        let mut state = SessionState::Fetching;

        loop {
            state = match state {
                SessionState::Fetching => self.fetch(&mut session, cancel).await,
                SessionState::Blocked(reason) => self.on_blocked(&mut session, &reason, cancel).await,
                SessionState::Failed(cause) => self.on_failed(&mut session, &cause, cancel).await,
                SessionState::Extracted(page) => self.on_extracted(&mut session, page),
                SessionState::Paginating => {
                    if sleep_or_cancel(self.config.backoff.page_delay(), cancel).await {
                        SessionState::Fetching
                    } else {
                        SessionState::Finished(TerminationReason::Cancelled)
                    }
                }
                SessionState::Finished(reason) => {
                    let outcome = session.finish(reason);
                    log_outcome(&outcome);
                    return outcome;
                }
            };
        }
    }

    async fn fetch(&self, session: &mut ScrapeSession, cancel: &CancellationToken) -> SessionState {
        if cancel.is_cancelled() {
            return SessionState::Finished(TerminationReason::Cancelled);
        }

        let url = self.endpoint.page_url(&session.query, session.cursor);
        session.fetch_attempts += 1;
        tracing::debug!(
            query = %session.query,
            cursor = session.cursor,
            attempt = session.fetch_attempts,
            "fetching results page"
        );

        match self.fetcher.fetch(&url, &session.query).await {
            FetchOutcome::Success { body, .. } => {
                SessionState::Extracted(extract_page(&body, self.rules))
            }
            FetchOutcome::Blocked { reason } => SessionState::Blocked(reason),
            FetchOutcome::HttpError { status } => SessionState::Failed(format!("HTTP {status}")),
            FetchOutcome::NetworkError { cause } => SessionState::Failed(cause),
        }
    }

    async fn on_blocked(
        &self,
        session: &mut ScrapeSession,
        reason: &str,
        cancel: &CancellationToken,
    ) -> SessionState {
        session.blocked_attempts += 1;
        session.consecutive_blocks += 1;
        if session.consecutive_blocks > self.config.captcha_retry_budget {
            return SessionState::Finished(TerminationReason::CaptchaBudgetExhausted);
        }

        let delay = self.config.backoff.blocked_delay(session.consecutive_blocks);
        tracing::warn!(
            query = %session.query,
            cursor = session.cursor,
            attempt = session.consecutive_blocks,
            budget = self.config.captcha_retry_budget,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            reason,
            "blocked by target; cooling down before retrying the same page"
        );
        if sleep_or_cancel(delay, cancel).await {
            SessionState::Fetching
        } else {
            SessionState::Finished(TerminationReason::Cancelled)
        }
    }

    async fn on_failed(
        &self,
        session: &mut ScrapeSession,
        cause: &str,
        cancel: &CancellationToken,
    ) -> SessionState {
        session.consecutive_failures += 1;
        if session.consecutive_failures > self.config.max_retries {
            return SessionState::Finished(TerminationReason::RetryBudgetExhausted);
        }

        let delay = self.config.backoff.failure_delay(session.consecutive_failures);
        tracing::warn!(
            query = %session.query,
            cursor = session.cursor,
            attempt = session.consecutive_failures,
            max_retries = self.config.max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = cause,
            "fetch failed; retrying after backoff"
        );
        if sleep_or_cancel(delay, cancel).await {
            SessionState::Fetching
        } else {
            SessionState::Finished(TerminationReason::Cancelled)
        }
    }

    fn on_extracted(&self, session: &mut ScrapeSession, page: PageExtraction) -> SessionState {
        session.consecutive_failures = 0;
        session.consecutive_blocks = 0;
        session.pages_fetched += 1;

        if page.is_empty() {
            return SessionState::Finished(TerminationReason::NoMorePages);
        }

        let fragments = page.fragments;
        let total_hint = page.total_hint;
        let added = session.absorb(page, self.config.max_records_per_query);
        session.cursor += fragments;

        tracing::debug!(
            query = %session.query,
            cursor = session.cursor,
            fragments,
            added,
            collected = session.records.len(),
            "page extracted"
        );

        if added == 0 {
            return SessionState::Finished(TerminationReason::Stagnated);
        }
        if session.records.len() >= self.config.max_records_per_query {
            return SessionState::Finished(TerminationReason::RecordCap);
        }
        if total_hint.is_some_and(|total| usize::try_from(total).unwrap_or(usize::MAX) <= session.cursor) {
            return SessionState::Finished(TerminationReason::NoMorePages);
        }
        if session.pages_fetched >= MAX_PAGES {
            return SessionState::Finished(TerminationReason::PageLimit);
        }
        SessionState::Paginating
    }
}

fn log_outcome(outcome: &QueryOutcome) {
    match outcome.status {
        SessionStatus::Aborted => tracing::warn!(
            query = %outcome.query,
            status = %outcome.status,
            reason = %outcome.reason,
            records = outcome.records.len(),
            fetch_attempts = outcome.fetch_attempts,
            "query session aborted"
        ),
        SessionStatus::Done | SessionStatus::Cancelled => tracing::info!(
            query = %outcome.query,
            status = %outcome.status,
            reason = %outcome.reason,
            records = outcome.records.len(),
            pages = outcome.pages_fetched,
            "query session finished"
        ),
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
