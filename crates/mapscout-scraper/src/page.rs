//! Page Extractor: locate result fragments and run the Field Extractor on each.

use std::collections::HashSet;

use scraper::Html;

use crate::field::{extract_fragment, extract_count, PartialRecord};
use crate::rules::RuleSet;

/// Everything pulled out of one results page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageExtraction {
    /// Named records in document order, without in-page duplicates.
    pub records: Vec<PartialRecord>,
    /// Total result count the page claims, when it shows one.
    pub total_hint: Option<u64>,
    /// The container selector that produced `records`; `None` when no
    /// strategy yielded a named fragment.
    pub container_strategy: Option<String>,
    /// Fragments dropped because no name rule matched.
    pub dropped_fragments: usize,
    /// Every fragment the winning container strategy matched, named or not,
    /// in-page duplicates included. This is how far the page moves the
    /// result offset.
    pub fragments: usize,
}

impl PageExtraction {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Extracts records from a results page.
///
/// Container strategies are tried in order; the first one whose fragments
/// produce at least one named record is used. A page where no strategy
/// matches is a normal outcome and yields an empty extraction.
#[must_use]
pub fn extract_page(html: &str, rules: &RuleSet) -> PageExtraction {
    let document = Html::parse_document(html);
    let total_hint = extract_count(document.root_element(), rules.total_hint());

    // Dropped count from the first strategy that matched anything, reported
    // when no strategy wins.
    let mut first_dropped: Option<usize> = None;

    for (raw, selector) in rules.containers() {
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        let mut candidates = 0usize;
        let mut dropped = 0usize;

        for fragment in document.select(selector) {
            candidates += 1;
            match extract_fragment(fragment, rules) {
                Some(record) => {
                    if seen.insert(record.clone()) {
                        records.push(record);
                    }
                }
                None => dropped += 1,
            }
        }

        if candidates == 0 {
            continue;
        }
        if records.is_empty() {
            tracing::debug!(
                container = %raw,
                candidates,
                "container strategy matched only unnamed fragments"
            );
            first_dropped.get_or_insert(dropped);
            continue;
        }

        if dropped > 0 {
            tracing::debug!(container = %raw, dropped, "dropped fragments without a name");
        }
        return PageExtraction {
            records,
            total_hint,
            container_strategy: Some(raw.clone()),
            dropped_fragments: dropped,
            fragments: candidates,
        };
    }

    PageExtraction {
        records: Vec::new(),
        total_hint,
        container_strategy: None,
        dropped_fragments: first_dropped.unwrap_or(0),
        fragments: 0,
    }
}

#[cfg(test)]
#[path = "page_test.rs"]
mod tests;
