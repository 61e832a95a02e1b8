//! Field Extractor: applies one field's fallback chain to a result fragment.
//!
//! Every function here returns `Option`; a rule that matches nothing, reads an
//! empty value, or fails numeric coercion just hands over to the next rule.

use rust_decimal::Decimal;
use scraper::ElementRef;

use crate::redirect::resolve_redirect;
use crate::rules::{ExtractionStrategy, Field, Rule, RuleSet};
use crate::text::{normalize_text, parse_count_token, parse_decimal_token};

/// A record as extracted from one fragment, before it is tied to a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartialRecord {
    pub name: String,
    pub category: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub rating: Option<Decimal>,
    pub review_count: Option<u64>,
}

impl PartialRecord {
    #[must_use]
    pub fn into_record(self, query: &mapscout_core::Query) -> mapscout_core::BusinessRecord {
        mapscout_core::BusinessRecord {
            name: self.name,
            category: self.category,
            address: self.address,
            phone: self.phone,
            website: self.website,
            rating: self.rating,
            review_count: self.review_count,
            email: None,
            source_query: query.as_str().to_owned(),
        }
    }
}

/// Evaluates a single rule against `fragment`.
///
/// Each element the selector matches is tried in document order; the first
/// one that yields a non-empty value wins.
#[must_use]
pub fn apply_rule(fragment: ElementRef<'_>, rule: &Rule) -> Option<String> {
    match &rule.selector {
        Some(selector) => fragment
            .select(selector)
            .find_map(|element| read_value(element, rule)),
        None => read_value(fragment, rule),
    }
}

fn read_value(element: ElementRef<'_>, rule: &Rule) -> Option<String> {
    let raw = match &rule.attr {
        Some(attr) => element.value().attr(attr)?.to_owned(),
        None => element.text().collect::<Vec<_>>().join(" "),
    };
    let value = normalize_text(&raw)?;

    match &rule.pattern {
        Some(pattern) => {
            let caps = pattern.captures(&value)?;
            let matched = caps.get(1).or_else(|| caps.get(0))?;
            normalize_text(matched.as_str())
        }
        None => Some(value),
    }
}

/// First non-empty text value produced by `strategy`.
#[must_use]
pub fn extract_text(fragment: ElementRef<'_>, strategy: &ExtractionStrategy) -> Option<String> {
    strategy
        .rules()
        .iter()
        .find_map(|rule| apply_rule(fragment, rule))
}

/// First value produced by `strategy` that coerces to a decimal.
#[must_use]
pub fn extract_rating(fragment: ElementRef<'_>, strategy: &ExtractionStrategy) -> Option<Decimal> {
    strategy
        .rules()
        .iter()
        .find_map(|rule| apply_rule(fragment, rule).and_then(|v| parse_decimal_token(&v)))
}

/// First value produced by `strategy` that coerces to a whole-number count.
#[must_use]
pub fn extract_count(fragment: ElementRef<'_>, strategy: &ExtractionStrategy) -> Option<u64> {
    strategy
        .rules()
        .iter()
        .find_map(|rule| apply_rule(fragment, rule).and_then(|v| parse_count_token(&v)))
}

/// Builds a [`PartialRecord`] from one fragment. Returns `None` when no name
/// rule matches; every other field is looked up independently.
#[must_use]
pub fn extract_fragment(fragment: ElementRef<'_>, rules: &RuleSet) -> Option<PartialRecord> {
    let name = extract_text(fragment, rules.strategy(Field::Name))?;
    let text = |field| extract_text(fragment, rules.strategy(field));

    Some(PartialRecord {
        name,
        category: text(Field::Category),
        address: text(Field::Address),
        phone: text(Field::Phone),
        website: text(Field::Website).map(|w| resolve_redirect(&w)),
        rating: extract_rating(fragment, rules.strategy(Field::Rating)),
        review_count: extract_count(fragment, rules.strategy(Field::ReviewCount)),
    })
}
