//! `scrape` command handler.
//!
//! Collects queries, applies flag overrides to the loaded configuration, runs
//! the orchestrator with Ctrl-C wired to cancellation, and exports whatever
//! was gathered, including after a cancelled run.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use mapscout_core::{AppConfig, Query};
use mapscout_scraper::{Orchestrator, RuleSet, RunReport, ScrapeConfig, SessionStatus};
use tokio_util::sync::CancellationToken;

use crate::export::{write_records, ExportFormat};

#[derive(Debug)]
pub(crate) struct ScrapeArgs {
    pub queries: Vec<String>,
    pub file: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub format: ExportFormat,
    pub concurrency: Option<usize>,
    pub max_records: Option<usize>,
    pub enrich: bool,
    pub rules: Option<PathBuf>,
}

/// Runs one scrape batch and exports the result.
///
/// # Errors
///
/// Returns an error if no queries were given, the overridden configuration is
/// invalid, the rules fail to compile, or the export cannot be written.
/// Individual query failures are logged, not returned.
pub(crate) async fn run_scrape(mut config: AppConfig, args: ScrapeArgs) -> anyhow::Result<()> {
    let file_contents = match &args.file {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("failed to read query file {}", path.display()))?,
        ),
        None => None,
    };
    let queries = collect_queries(&args.queries, file_contents.as_deref());
    if queries.is_empty() {
        anyhow::bail!("no queries given; pass them as arguments or with --file");
    }

    apply_overrides(&mut config, &args);
    mapscout_core::validate_app_config(&config)?;

    let rules = RuleSet::load_or_builtin(config.rules_path.as_deref())?;
    let orchestrator = Orchestrator::new(ScrapeConfig::from_app_config(&config), rules)?;

    let cancel = CancellationToken::new();
    let ctrl_c = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));
    let report = orchestrator.run(queries, &cancel).await;
    ctrl_c.abort();
    let report = report?;

    log_summaries(&report);
    export(&report, args.format, args.output.as_deref())?;
    Ok(())
}

/// Positional queries first, then the file's lines, blanks dropped.
fn collect_queries(positional: &[String], file_contents: Option<&str>) -> Vec<Query> {
    let mut queries = Query::parse_lines(positional.iter().map(String::as_str));
    if let Some(contents) = file_contents {
        queries.extend(Query::parse_lines(contents.lines()));
    }
    queries
}

fn apply_overrides(config: &mut AppConfig, args: &ScrapeArgs) {
    if let Some(limit) = args.concurrency {
        config.concurrency_limit = limit;
    }
    if let Some(cap) = args.max_records {
        config.max_records_per_query = cap;
    }
    if args.enrich {
        config.enable_email_enrichment = true;
    }
    if let Some(path) = &args.rules {
        config.rules_path = Some(path.clone());
    }
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::warn!("interrupt received; finishing in-flight requests and exporting");
        cancel.cancel();
    }
}

fn log_summaries(report: &RunReport) {
    for summary in &report.queries {
        if summary.status == SessionStatus::Aborted {
            tracing::warn!(
                query = %summary.query,
                status = %summary.status,
                reason = %summary.reason,
                records = summary.records,
                "query aborted"
            );
        } else {
            tracing::info!(
                query = %summary.query,
                status = %summary.status,
                reason = %summary.reason,
                records = summary.records,
                pages = summary.pages_fetched,
                "query finished"
            );
        }
    }
    tracing::info!(
        run_id = %report.run_id,
        records = report.records.len(),
        duplicates_dropped = report.duplicates_dropped,
        cancelled = report.cancelled,
        "exporting results"
    );
}

fn export(
    report: &RunReport,
    format: ExportFormat,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut out = BufWriter::new(file);
            write_records(&report.records, format, &mut out)?;
            out.flush()?;
        }
        None => {
            let stdout = std::io::stdout();
            write_records(&report.records, format, stdout.lock())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ScrapeArgs {
        ScrapeArgs {
            queries: Vec::new(),
            file: None,
            output: None,
            format: ExportFormat::Csv,
            concurrency: None,
            max_records: None,
            enrich: false,
            rules: None,
        }
    }

    fn config() -> AppConfig {
        AppConfig {
            env: mapscout_core::Environment::Test,
            log_level: "info".to_owned(),
            search_url: "https://search.example/search".to_owned(),
            request_timeout_secs: 15,
            concurrency_limit: 2,
            request_delay_min_ms: 2_500,
            request_delay_max_ms: 5_500,
            retry_backoff_base_ms: 4_000,
            blocked_backoff_base_ms: 30_000,
            max_retries: 3,
            captcha_retry_budget: 2,
            max_records_per_query: 100,
            enable_email_enrichment: false,
            enrich_timeout_secs: 6,
            max_emails_per_record: 3,
            rules_path: None,
        }
    }

    #[test]
    fn positional_and_file_queries_are_combined() {
        let positional = vec!["cafes in paris".to_owned(), "   ".to_owned()];
        let queries = collect_queries(&positional, Some("plumbers austin\n\n  dentists \n"));
        let raw: Vec<&str> = queries.iter().map(Query::as_str).collect();
        assert_eq!(raw, vec!["cafes in paris", "plumbers austin", "dentists"]);
    }

    #[test]
    fn blank_input_yields_no_queries() {
        assert!(collect_queries(&[" ".to_owned()], Some("\n\n")).is_empty());
    }

    #[test]
    fn flags_override_config() {
        let mut cfg = config();
        let overrides = ScrapeArgs {
            concurrency: Some(4),
            max_records: Some(20),
            enrich: true,
            rules: Some(PathBuf::from("/etc/mapscout/rules.yaml")),
            ..args()
        };
        apply_overrides(&mut cfg, &overrides);
        assert_eq!(cfg.concurrency_limit, 4);
        assert_eq!(cfg.max_records_per_query, 20);
        assert!(cfg.enable_email_enrichment);
        assert_eq!(cfg.rules_path, Some(PathBuf::from("/etc/mapscout/rules.yaml")));
    }

    #[test]
    fn absent_flags_leave_config_alone() {
        let mut cfg = config();
        apply_overrides(&mut cfg, &args());
        assert_eq!(cfg.concurrency_limit, 2);
        assert!(!cfg.enable_email_enrichment);
        assert!(cfg.rules_path.is_none());
    }

    #[test]
    fn zero_concurrency_override_fails_validation() {
        let mut cfg = config();
        apply_overrides(
            &mut cfg,
            &ScrapeArgs {
                concurrency: Some(0),
                ..args()
            },
        );
        assert!(mapscout_core::validate_app_config(&cfg).is_err());
    }

    #[tokio::test]
    async fn empty_query_list_is_rejected_before_running() {
        let err = run_scrape(config(), args()).await.unwrap_err();
        assert!(err.to_string().contains("no queries"));
    }
}
