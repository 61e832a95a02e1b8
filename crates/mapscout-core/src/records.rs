use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Placeholder some listings use instead of a real website link.
pub const NO_WEBSITE_SENTINEL: &str = "no website";

/// A user-supplied search string. Always trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(String);

impl Query {
    /// Trims `raw` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyQuery`] when nothing is left after trimming.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::EmptyQuery);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Parses every non-blank line, silently skipping blank ones.
    pub fn parse_lines<'a, I>(lines: I) -> Vec<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        lines
            .into_iter()
            .filter_map(|line| Self::parse(line).ok())
            .collect()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One business listing extracted from a results page.
///
/// Absent fields are `None`; an empty string is never used to mean "absent".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRecord {
    pub name: String,
    pub category: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    /// Resolved destination URL, or the raw link when it could not be unwrapped.
    pub website: Option<String>,
    pub rating: Option<Decimal>,
    pub review_count: Option<u64>,
    /// Set only by the contact enrichment pass.
    pub email: Option<String>,
    pub source_query: String,
}

impl BusinessRecord {
    #[must_use]
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::new(&self.name, self.address.as_deref(), self.website.as_deref())
    }

    /// `true` when a rating is present but outside `0.0..=5.0`.
    ///
    /// Such values are kept as extracted; this only flags them.
    #[must_use]
    pub fn rating_is_suspect(&self) -> bool {
        self.rating
            .is_some_and(|r| r < Decimal::ZERO || r > Decimal::from(5))
    }

    /// The website worth visiting, if any. The "no website" placeholder and
    /// blank values do not count.
    #[must_use]
    pub fn enrichable_website(&self) -> Option<&str> {
        self.website
            .as_deref()
            .map(str::trim)
            .filter(|w| !w.is_empty() && !w.eq_ignore_ascii_case(NO_WEBSITE_SENTINEL))
    }
}

/// Identity of a listing for deduplication: the name plus the address, or the
/// website when the address is missing.
///
/// Components are compared case-insensitively with whitespace collapsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    name: String,
    locator: Locator,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Locator {
    Address(String),
    Website(String),
    Unknown,
}

impl DedupKey {
    #[must_use]
    pub fn new(name: &str, address: Option<&str>, website: Option<&str>) -> Self {
        let locator = match (address.map(fold), website.map(fold)) {
            (Some(a), _) if !a.is_empty() => Locator::Address(a),
            (_, Some(w)) if !w.is_empty() => Locator::Website(w),
            _ => Locator::Unknown,
        };
        Self {
            name: fold(name),
            locator,
        }
    }
}

fn fold(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
