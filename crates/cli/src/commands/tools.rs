//! `delver tools`: Show retrieval tool status and loop settings.

use std::fmt;
use std::path::Path;

use delver_config::AppConfig;
use delver_tools::{ToolRegistry, ToolStatus};

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let registry = ToolRegistry::load(&config.tools);
    let mut report = String::new();
    write_report(&mut report, &registry.status(), &config)?;
    print!("{report}");
    Ok(())
}

/// The tool table plus the agent and search-strategy sections.
pub fn write_report(
    out: &mut impl fmt::Write,
    statuses: &[ToolStatus],
    config: &AppConfig,
) -> fmt::Result {
    writeln!(out, "  Tools")?;
    writeln!(out, "  =====")?;
    if statuses.is_empty() {
        writeln!(out, "  (none configured)")?;
    }
    for status in statuses {
        let state = match (&status.error, status.enabled) {
            (Some(_), _) => "failed",
            (None, false) => "disabled",
            (None, true) if status.callable => "enabled, callable",
            (None, true) => "enabled",
        };
        let factory = if status.factory.is_empty() {
            "no factory"
        } else {
            status.factory.as_str()
        };
        writeln!(out, "  {} [{factory}] ({state})", status.name)?;
        if !status.description.is_empty() {
            writeln!(out, "      {}", status.description)?;
        }
        for (key, value) in &status.config {
            writeln!(out, "      {key} = {value}")?;
        }
        if let Some(error) = &status.error {
            writeln!(out, "      error: {error}")?;
        }
    }

    let agent = &config.agent_config;
    writeln!(out)?;
    writeln!(out, "  Agent")?;
    writeln!(out, "  =====")?;
    writeln!(out, "  mode:              {}", agent.mode)?;
    writeln!(out, "  max_iterations:    {}", agent.max_iterations)?;
    writeln!(out, "  history_window:    {}", agent.history_window)?;
    writeln!(out, "  verbose:           {}", agent.verbose)?;

    let strategy = &config.search_strategy;
    writeln!(out)?;
    writeln!(out, "  Search strategy")?;
    writeln!(out, "  ===============")?;
    writeln!(
        out,
        "  content_extraction_limit: {}",
        strategy.content_extraction_limit
    )?;
    writeln!(
        out,
        "  extraction_max_length:    {}",
        strategy.extraction_max_length
    )
}
