//! `delver doctor`: Diagnose config, credentials, tools and the model connection.

use std::fmt;
use std::path::Path;

use delver_agent::LlmGateway;
use delver_config::AppConfig;
use delver_tools::ToolRegistry;

const MODEL_REPLY_PREVIEW_CHARS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Pass,
    Warn,
    Fail,
}

/// One diagnostic line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub health: Health,
    pub message: String,
}

impl Check {
    fn pass(message: impl Into<String>) -> Self {
        Self { health: Health::Pass, message: message.into() }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self { health: Health::Warn, message: message.into() }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self { health: Health::Fail, message: message.into() }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = match self.health {
            Health::Pass => "ok  ",
            Health::Warn => "warn",
            Health::Fail => "FAIL",
        };
        write!(f, "  [{mark}] {}", self.message)
    }
}

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Delver Doctor");
    println!("=============");
    println!();

    let path = super::resolve_path(config_path);
    let mut checks = Vec::new();
    match super::load_config(Some(&path)) {
        Ok(config) => {
            checks.push(config_file_check(&path));
            checks.extend(config_checks(&config));
            checks.push(connection_check(&config).await);
        }
        Err(e) => checks.push(Check::fail(format!("Config invalid: {e}"))),
    }

    for check in &checks {
        println!("{check}");
    }

    println!();
    let issues = checks.iter().filter(|c| c.health != Health::Pass).count();
    if issues == 0 {
        println!("  All checks passed.");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }
    Ok(())
}

fn config_file_check(path: &Path) -> Check {
    if path.exists() {
        Check::pass(format!("Config file valid: {}", path.display()))
    } else {
        Check::warn(format!(
            "No config file at {}, using defaults. Run `delver init` to create one.",
            path.display()
        ))
    }
}

/// Credential and tool-loading checks for an already-parsed config.
pub fn config_checks(config: &AppConfig) -> Vec<Check> {
    let mut checks = Vec::new();

    checks.push(match config.require_credentials() {
        Ok(()) => Check::pass(format!("Credentials found for provider '{}'", config.default_provider)),
        Err(e) => Check::fail(format!("Credentials missing: {e}")),
    });

    let registry = ToolRegistry::load(&config.tools);
    for status in registry.status() {
        match (&status.error, status.enabled) {
            (Some(error), _) => checks.push(Check::fail(format!("Tool '{}' failed to load: {error}", status.name))),
            (None, true) => checks.push(Check::pass(format!("Tool '{}' loaded", status.name))),
            (None, false) => {}
        }
    }
    if registry.list_enabled().is_empty() {
        checks.push(Check::warn("No retrieval tools enabled; answers will rest on the model alone"));
    }

    checks
}

async fn connection_check(config: &AppConfig) -> Check {
    if config.require_credentials().is_err() {
        return Check::warn("Model connection not tested without credentials");
    }
    let router = delver_providers::build_from_config(config);
    match router.default() {
        Some(provider) => model_check(&LlmGateway::from_config(provider, config)).await,
        None => Check::fail(format!("Provider '{}' is not configured", router.default_name())),
    }
}

/// One round-trip to the model.
pub async fn model_check(gateway: &LlmGateway) -> Check {
    let target = format!("{}/{}", gateway.provider_name(), gateway.model());
    match gateway.complete("Say OK").await {
        Ok(reply) => {
            let reply: String = reply.trim().chars().take(MODEL_REPLY_PREVIEW_CHARS).collect();
            Check::pass(format!("Model {target} replied: {reply}"))
        }
        Err(e) => Check::fail(format!("Model {target} unreachable: {e}")),
    }
}
