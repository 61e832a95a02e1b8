//! Resilient query extraction pipeline for business listings.
//!
//! Layers, leaf first: declarative [`rules`], the Field Extractor
//! ([`field`]), the Page Extractor ([`page`]), the Fetch Client ([`fetch`]),
//! the per-query state machine ([`session`]), the [`orchestrator`], and the
//! optional contact [`enrich`]ment pass.

pub mod backoff;
pub mod enrich;
pub mod error;
pub mod fetch;
pub mod field;
pub mod identity;
pub mod orchestrator;
pub mod page;
pub mod redirect;
pub mod rules;
pub mod session;
pub mod settings;
pub mod text;

#[cfg(test)]
pub(crate) mod testing;

pub use backoff::BackoffPolicy;
pub use enrich::{extract_emails, ContactEnricher};
pub use error::ScraperError;
pub use fetch::{classify_response, detect_block, FetchOutcome, HttpFetcher, PageFetcher, SearchEndpoint};
pub use field::{extract_count, extract_rating, extract_text, PartialRecord};
pub use identity::{ClientIdentity, IdentityPool};
pub use orchestrator::{Orchestrator, QuerySummary, RunReport};
pub use page::{extract_page, PageExtraction};
pub use redirect::resolve_redirect;
pub use rules::{ExtractionStrategy, Field, RuleSet, RuleSpec, RulesFile};
pub use session::{QueryOutcome, QueryScraper, SessionStatus, TerminationReason, MAX_PAGES};
pub use settings::ScrapeConfig;
