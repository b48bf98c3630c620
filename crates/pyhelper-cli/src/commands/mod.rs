use anyhow::{bail, Context, Result};
use pyhelper_core::{Analyzer, HelperConfig, HelperEngine, IssueCollection, Rule};
use std::path::Path;
use std::process::ExitCode;
use tracing::debug;

/// How results are printed
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
}

impl Output {
    fn print<T: serde::Serialize>(&self, value: &T, plain: impl FnOnce() -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            print!("{}", plain());
        }
        Ok(())
    }
}

pub async fn analyze(config: HelperConfig, file: &Path, output: Output) -> Result<ExitCode> {
    let engine = HelperEngine::with_config(config)?;
    let issues = engine
        .analyzer()
        .analyze_file(file)
        .await
        .with_context(|| format!("Failed to analyze {}", file.display()))?;

    output.print(&issues, || render_issues(file, &issues))?;

    Ok(if issues.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

pub async fn fix(
    config: HelperConfig,
    file: &Path,
    dry_run: bool,
    only: &[String],
    output: Output,
) -> Result<ExitCode> {
    let engine = HelperEngine::with_config(config)?;
    let mut fixer = engine.fixer().clone();

    if !only.is_empty() {
        let selected = only
            .iter()
            .map(|selector| {
                Rule::from_selector(selector)
                    .with_context(|| format!("Unknown rule selector: {}", selector))
            })
            .collect::<Result<Vec<_>>>()?;
        fixer = fixer.only(&selected);
    }
    debug!("Fixing {} with rules {:?}", file.display(), fixer.fixable());

    let outcome = if dry_run {
        let code = read_source(file).await?;
        fixer.fix_code(&code)
    } else {
        fixer
            .fix_file(file, None)
            .await
            .with_context(|| format!("Failed to fix {}", file.display()))?
    };

    if dry_run && !output.json {
        print!("{}", outcome.patched_text);
        return Ok(ExitCode::SUCCESS);
    }

    let summary = outcome.summary();
    output.print(&summary, || {
        let mut text = String::new();
        for fix in &summary.fixes {
            text.push_str(&format!("{}:{}: {}\n", file.display(), fix.line, fix.description));
        }
        text.push_str(&format!("{} fix(es) applied\n", summary.total_fixes));
        text
    })?;

    Ok(ExitCode::SUCCESS)
}

pub async fn stats(config: HelperConfig, file: &Path, output: Output) -> Result<ExitCode> {
    let engine = HelperEngine::with_config(config)?;
    let code = read_source(file).await?;

    let mut session = engine.session();
    session.analyze(&code);
    let statistics = session.statistics();

    output.print(&statistics, || format!("{}\n", statistics))?;
    Ok(ExitCode::SUCCESS)
}

pub fn rules(config: &HelperConfig, output: Output) -> Result<ExitCode> {
    let table: Vec<serde_json::Value> = Rule::ALL
        .iter()
        .map(|rule| {
            serde_json::json!({
                "code": rule.code(),
                "name": rule.name(),
                "severity": rule.severity(),
                "enabled": config.is_rule_enabled(*rule),
                "fixable": config.is_fixable(*rule),
                "description": rule.description(),
            })
        })
        .collect();

    output.print(&table, || {
        Rule::ALL
            .iter()
            .map(|rule| {
                let state = if config.is_rule_enabled(*rule) { "on" } else { "off" };
                format!(
                    "{}  {:<30} {:<8} {:<4} {}\n",
                    rule.code(),
                    rule.name(),
                    rule.severity(),
                    state,
                    rule.description()
                )
            })
            .collect()
    })?;

    Ok(ExitCode::SUCCESS)
}

pub fn show_config(config: &HelperConfig, output: Output) -> Result<ExitCode> {
    if output.json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        print!("{}", toml::to_string_pretty(config)?);
    }
    Ok(ExitCode::SUCCESS)
}

async fn read_source(file: &Path) -> Result<String> {
    if !file.exists() {
        bail!("File not found: {}", file.display());
    }
    tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))
}

fn render_issues(file: &Path, issues: &IssueCollection) -> String {
    issues
        .iter()
        .map(|issue| format!("{}:{}\n", file.display(), issue))
        .collect()
}
