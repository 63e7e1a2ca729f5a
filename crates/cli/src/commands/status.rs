//! `delver status`: Show the resolved configuration.

use std::path::Path;

use delver_config::AppConfig;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let path = super::resolve_path(config_path);
    let config = super::load_config(Some(&path))?;

    println!("Delver Status");
    println!("=============");
    println!("  Config file:  {}", path.display());
    println!("  Provider:     {}", config.default_provider);
    println!("  Model:        {}", config.default_model);
    println!("  Temperature:  {}", config.default_temperature);
    println!("  Max tokens:   {}", config.default_max_tokens);
    println!("  Mode:         {}", config.agent_config.mode);
    println!("  Passes:       up to {}", config.agent_config.max_iterations);
    println!("  Tools:        {}", enabled_tool_names(&config));
    println!(
        "  Credentials:  {}",
        match config.require_credentials() {
            Ok(()) => "ok".to_string(),
            Err(e) => format!("missing ({e})"),
        }
    );

    if path.exists() {
        println!("\n  Config file found");
    } else {
        println!("\n  No config file, using defaults. Run `delver init` to create one.");
    }

    Ok(())
}

fn enabled_tool_names(config: &AppConfig) -> String {
    let names: Vec<&str> = config
        .tools
        .iter()
        .filter(|(_, tool)| tool.enabled)
        .map(|(name, _)| name.as_str())
        .collect();
    if names.is_empty() {
        "none".into()
    } else {
        names.join(", ")
    }
}
