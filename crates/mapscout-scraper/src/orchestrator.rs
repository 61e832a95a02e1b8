//! Orchestrator: bounded fan-out of Query Scrapers and the single merge step.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use mapscout_core::{BusinessRecord, DedupKey, Query};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::enrich::ContactEnricher;
use crate::error::ScraperError;
use crate::fetch::{HttpFetcher, PageFetcher, SearchEndpoint};
use crate::identity::IdentityPool;
use crate::rules::RuleSet;
use crate::session::{QueryOutcome, QueryScraper, SessionStatus, TerminationReason};
use crate::settings::ScrapeConfig;

/// Per-query line of a [`RunReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuerySummary {
    pub query: Query,
    pub status: SessionStatus,
    pub reason: TerminationReason,
    /// Records this query contributed before cross-query dedup.
    pub records: usize,
    pub pages_fetched: usize,
    pub fetch_attempts: usize,
    pub blocked_attempts: usize,
}

impl QuerySummary {
    fn from_outcome(outcome: &QueryOutcome) -> Self {
        Self {
            query: outcome.query.clone(),
            status: outcome.status,
            reason: outcome.reason,
            records: outcome.records.len(),
            pages_fetched: outcome.pages_fetched,
            fetch_attempts: outcome.fetch_attempts,
            blocked_attempts: outcome.blocked_attempts,
        }
    }
}

/// Result of one [`Orchestrator::run`].
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Deduplicated records; first-seen wins.
    pub records: Vec<BusinessRecord>,
    /// One entry per distinct query, in input order.
    pub queries: Vec<QuerySummary>,
    pub duplicates_dropped: usize,
    pub cancelled: bool,
}

impl RunReport {
    #[must_use]
    pub fn aborted_queries(&self) -> usize {
        self.queries
            .iter()
            .filter(|q| q.status == SessionStatus::Aborted)
            .count()
    }
}

/// The run-wide result collection. Only the orchestrator's consumer loop
/// writes to it.
#[derive(Debug, Default)]
struct ResultSet {
    records: Vec<BusinessRecord>,
    seen: HashSet<DedupKey>,
    duplicates_dropped: usize,
}

impl ResultSet {
    fn merge(&mut self, records: Vec<BusinessRecord>) {
        for record in records {
            if self.seen.insert(record.dedup_key()) {
                self.records.push(record);
            } else {
                self.duplicates_dropped += 1;
            }
        }
    }
}

pub struct Orchestrator {
    fetcher: Arc<dyn PageFetcher>,
    endpoint: SearchEndpoint,
    rules: RuleSet,
    config: ScrapeConfig,
    enricher: Option<ContactEnricher>,
}

impl Orchestrator {
    /// Builds an orchestrator that fetches over HTTP.
    ///
    /// # Errors
    ///
    /// Fails on an invalid search URL, a zero concurrency limit, or an HTTP
    /// client that cannot be constructed.
    pub fn new(config: ScrapeConfig, rules: RuleSet) -> Result<Self, ScraperError> {
        let fetcher = HttpFetcher::new(config.request_timeout, IdentityPool::default())?;
        Self::with_fetcher(config, rules, Arc::new(fetcher))
    }

    /// Builds an orchestrator around any [`PageFetcher`].
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::new`].
    pub fn with_fetcher(
        config: ScrapeConfig,
        rules: RuleSet,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Result<Self, ScraperError> {
        if config.concurrency_limit == 0 {
            return Err(ScraperError::InvalidConcurrency);
        }
        let endpoint = SearchEndpoint::parse(&config.search_url)?;
        let enricher = if config.enable_email_enrichment {
            Some(ContactEnricher::new(
                config.enrich_timeout,
                config.max_emails_per_record,
                config.concurrency_limit,
                IdentityPool::default(),
            )?)
        } else {
            None
        };
        Ok(Self {
            fetcher,
            endpoint,
            rules,
            config,
            enricher,
        })
    }

    /// Scrapes every query and returns the merged, deduplicated result.
    ///
    /// Per-query failures never fail the run; they show up in
    /// [`RunReport::queries`]. On cancellation whatever was merged so far is
    /// returned with `cancelled` set.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::EmptyBatch`] when `queries` is empty. Nothing
    /// is fetched in that case.
    pub async fn run(
        &self,
        queries: Vec<Query>,
        cancel: &CancellationToken,
    ) -> Result<RunReport, ScraperError> {
        if queries.is_empty() {
            return Err(ScraperError::EmptyBatch);
        }

        let batch = distinct_queries(queries);
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        tracing::info!(
            %run_id,
            queries = batch.len(),
            concurrency = self.config.concurrency_limit,
            "starting scrape run"
        );

        let scraper = QueryScraper::new(
            self.fetcher.as_ref(),
            &self.endpoint,
            &self.rules,
            &self.config,
        );
        let mut outcomes = stream::iter(batch.into_iter().enumerate())
            .map(|(index, query)| {
                let scraper = &scraper;
                async move { (index, scraper.run(query, cancel).await) }
            })
            .buffer_unordered(self.config.concurrency_limit);

        let mut results = ResultSet::default();
        let mut summaries: Vec<(usize, QuerySummary)> = Vec::new();
        while let Some((index, outcome)) = outcomes.next().await {
            summaries.push((index, QuerySummary::from_outcome(&outcome)));
            results.merge(outcome.records);
        }
        summaries.sort_by_key(|(index, _)| *index);

        let mut records = results.records;
        if let Some(enricher) = &self.enricher {
            if cancel.is_cancelled() {
                tracing::info!(%run_id, "run cancelled; skipping contact enrichment");
            } else {
                records = enricher.enrich(records, cancel).await;
            }
        }

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            records,
            queries: summaries.into_iter().map(|(_, s)| s).collect(),
            duplicates_dropped: results.duplicates_dropped,
            cancelled: cancel.is_cancelled(),
        };
        tracing::info!(
            %run_id,
            records = report.records.len(),
            duplicates_dropped = report.duplicates_dropped,
            aborted = report.aborted_queries(),
            cancelled = report.cancelled,
            "scrape run finished"
        );
        Ok(report)
    }
}

/// Drops repeated queries, keeping the first occurrence.
fn distinct_queries(queries: Vec<Query>) -> Vec<Query> {
    let mut seen = HashSet::new();
    queries
        .into_iter()
        .filter(|q| seen.insert(q.clone()))
        .collect()
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
