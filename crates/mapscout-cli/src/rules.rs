//! `rules` command handlers.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use mapscout_scraper::{Field, RuleSet};

/// Sub-commands available under `rules`.
#[derive(Debug, Subcommand)]
pub enum RulesCommands {
    /// Compile a rules file (or the built-in table) and summarise it
    Check {
        /// Rules file to check; defaults to `MAPSCOUT_RULES_PATH`, then the built-in table
        path: Option<PathBuf>,
    },
}

/// Compiles the rule table and prints how many rules each field has.
///
/// # Errors
///
/// Returns an error if the file cannot be read or any rule fails to compile.
pub(crate) fn run_rules_check(path: Option<&Path>) -> anyhow::Result<()> {
    let rules = RuleSet::load_or_builtin(path)?;
    print!("{}", summarize(&rules, path));
    Ok(())
}

fn summarize(rules: &RuleSet, path: Option<&Path>) -> String {
    let source = path.map_or_else(|| "built-in".to_owned(), |p| p.display().to_string());
    let mut out = format!("rules OK ({source})\n");
    out.push_str(&format!("  containers: {}\n", rules.container_count()));
    out.push_str(&format!("  total_hint: {}\n", rules.total_hint().rules().len()));
    for field in Field::ALL {
        out.push_str(&format!(
            "  {field}: {}\n",
            rules.strategy(field).rules().len()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lists_every_field() {
        let rules = RuleSet::builtin().unwrap();
        let summary = summarize(&rules, None);
        assert!(summary.starts_with("rules OK (built-in)"));
        for field in Field::ALL {
            assert!(summary.contains(&format!("  {field}: ")), "missing {field}");
        }
        assert!(summary.contains("  containers: 5"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = run_rules_check(Some(Path::new("/nonexistent/mapscout-rules.yaml")));
        assert!(err.is_err());
    }
}
