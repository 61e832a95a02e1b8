//! Declarative extraction rules.
//!
//! Rules are data, not code: a YAML table lists, per field, the selectors and
//! patterns to try in order. The table is compiled once per run; compilation
//! is the only place a bad rule can fail, and it fails before any request is
//! made.

use std::path::Path;

use regex::Regex;
use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::ScraperError;

const BUILTIN_RULES: &str = include_str!("../rules/default.yaml");

/// Record fields that have their own fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Category,
    Address,
    Phone,
    Website,
    Rating,
    ReviewCount,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Name,
        Field::Category,
        Field::Address,
        Field::Phone,
        Field::Website,
        Field::Rating,
        Field::ReviewCount,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Category => "category",
            Field::Address => "address",
            Field::Phone => "phone",
            Field::Website => "website",
            Field::Rating => "rating",
            Field::ReviewCount => "review_count",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One uncompiled lookup rule as written in the rules file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// CSS selector evaluated inside the fragment; absent means the fragment itself.
    #[serde(default)]
    pub selector: Option<String>,
    /// Attribute to read; absent means the element's text content.
    #[serde(default)]
    pub attr: Option<String>,
    /// Regex applied to the value; capture group 1 (or the whole match) is kept.
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldRules {
    pub name: Vec<RuleSpec>,
    #[serde(default)]
    pub category: Vec<RuleSpec>,
    #[serde(default)]
    pub address: Vec<RuleSpec>,
    #[serde(default)]
    pub phone: Vec<RuleSpec>,
    #[serde(default)]
    pub website: Vec<RuleSpec>,
    #[serde(default)]
    pub rating: Vec<RuleSpec>,
    #[serde(default)]
    pub review_count: Vec<RuleSpec>,
}

impl FieldRules {
    fn specs(&self, field: Field) -> &[RuleSpec] {
        match field {
            Field::Name => &self.name,
            Field::Category => &self.category,
            Field::Address => &self.address,
            Field::Phone => &self.phone,
            Field::Website => &self.website,
            Field::Rating => &self.rating,
            Field::ReviewCount => &self.review_count,
        }
    }
}

/// The rules file as deserialized from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesFile {
    pub containers: Vec<String>,
    #[serde(default)]
    pub total_hint: Vec<RuleSpec>,
    pub fields: FieldRules,
}

/// A compiled lookup rule.
#[derive(Debug)]
pub struct Rule {
    pub(crate) selector: Option<Selector>,
    pub(crate) attr: Option<String>,
    pub(crate) pattern: Option<Regex>,
    source: String,
}

impl Rule {
    fn compile(label: &str, spec: &RuleSpec) -> Result<Self, ScraperError> {
        let source = describe(spec);
        let invalid = |reason: String| ScraperError::InvalidRule {
            field: label.to_owned(),
            selector: source.clone(),
            reason,
        };

        if spec.selector.is_none() && spec.pattern.is_none() && spec.attr.is_none() {
            return Err(invalid(
                "rule needs at least one of selector, attr, pattern".to_owned(),
            ));
        }

        let selector = spec
            .selector
            .as_deref()
            .map(|s| Selector::parse(s).map_err(|e| invalid(format!("{e:?}"))))
            .transpose()?;
        let pattern = spec
            .pattern
            .as_deref()
            .map(|p| Regex::new(p).map_err(|e| invalid(e.to_string())))
            .transpose()?;

        Ok(Self {
            selector,
            attr: spec.attr.clone(),
            pattern,
            source,
        })
    }

    /// Human-readable form used in logs.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

fn describe(spec: &RuleSpec) -> String {
    let mut parts = Vec::new();
    parts.push(spec.selector.clone().unwrap_or_else(|| ":fragment".to_owned()));
    if let Some(attr) = &spec.attr {
        parts.push(format!("@{attr}"));
    }
    if let Some(pattern) = &spec.pattern {
        parts.push(format!("~/{pattern}/"));
    }
    parts.join(" ")
}

/// An ordered fallback chain for one value.
#[derive(Debug)]
pub struct ExtractionStrategy {
    label: String,
    rules: Vec<Rule>,
}

impl ExtractionStrategy {
    /// Compiles `specs` in order.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidRule`] for the first spec with an
    /// unparseable selector or pattern.
    pub fn compile(label: &str, specs: &[RuleSpec]) -> Result<Self, ScraperError> {
        let rules = specs
            .iter()
            .map(|spec| Rule::compile(label, spec))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            label: label.to_owned(),
            rules,
        })
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Compiled container strategies and per-field fallback chains.
#[derive(Debug)]
pub struct RuleSet {
    containers: Vec<(String, Selector)>,
    total_hint: ExtractionStrategy,
    fields: Vec<(Field, ExtractionStrategy)>,
}

impl RuleSet {
    /// The rule table compiled into the binary.
    ///
    /// # Errors
    ///
    /// Only fails if the embedded table itself is broken, which the test
    /// suite guards against.
    pub fn builtin() -> Result<Self, ScraperError> {
        Self::from_yaml(BUILTIN_RULES)
    }

    /// Loads and compiles a rules file.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::RulesFileIo`] if the file cannot be read,
    /// [`ScraperError::RulesFileParse`] if it is not a valid rules document,
    /// and [`ScraperError::InvalidRule`] if any rule fails to compile.
    pub fn load(path: &Path) -> Result<Self, ScraperError> {
        let content = std::fs::read_to_string(path).map_err(|e| ScraperError::RulesFileIo {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    /// Uses the file at `path` when given, otherwise the built-in table.
    ///
    /// # Errors
    ///
    /// See [`RuleSet::load`].
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self, ScraperError> {
        match path {
            Some(p) => {
                tracing::info!(path = %p.display(), "loading extraction rules from file");
                Self::load(p)
            }
            None => Self::builtin(),
        }
    }

    /// Parses and compiles a YAML rules document.
    ///
    /// # Errors
    ///
    /// See [`RuleSet::load`].
    pub fn from_yaml(yaml: &str) -> Result<Self, ScraperError> {
        let file: RulesFile = serde_yaml::from_str(yaml)?;
        Self::compile(&file)
    }

    /// Compiles an already-parsed rules document.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidRule`] when a rule does not compile or
    /// when the document has no container selectors or no name rules.
    pub fn compile(file: &RulesFile) -> Result<Self, ScraperError> {
        if file.containers.is_empty() {
            return Err(ScraperError::InvalidRule {
                field: "containers".to_owned(),
                selector: String::new(),
                reason: "at least one container selector is required".to_owned(),
            });
        }
        if file.fields.name.is_empty() {
            return Err(ScraperError::InvalidRule {
                field: Field::Name.to_string(),
                selector: String::new(),
                reason: "at least one name rule is required".to_owned(),
            });
        }

        let containers = file
            .containers
            .iter()
            .map(|raw| {
                Selector::parse(raw)
                    .map(|sel| (raw.clone(), sel))
                    .map_err(|e| ScraperError::InvalidRule {
                        field: "containers".to_owned(),
                        selector: raw.clone(),
                        reason: format!("{e:?}"),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let total_hint = ExtractionStrategy::compile("total_hint", &file.total_hint)?;

        let fields = Field::ALL
            .iter()
            .map(|&field| {
                ExtractionStrategy::compile(field.as_str(), file.fields.specs(field))
                    .map(|strategy| (field, strategy))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            containers,
            total_hint,
            fields,
        })
    }

    pub(crate) fn containers(&self) -> &[(String, Selector)] {
        &self.containers
    }

    #[must_use]
    pub fn total_hint(&self) -> &ExtractionStrategy {
        &self.total_hint
    }

    /// The fallback chain for `field`.
    #[must_use]
    pub fn strategy(&self, field: Field) -> &ExtractionStrategy {
        // `compile` inserts every `Field::ALL` entry in order.
        &self.fields[field as usize].1
    }

    #[must_use]
    pub fn container_count(&self) -> usize {
        self.containers.len()
    }
}
