//! `delver init`: Write a default config file.

use std::path::Path;

use delver_config::AppConfig;

/// What `write_default_config` did.
#[derive(Debug, PartialEq)]
pub enum InitOutcome {
    Created,
    Overwritten,
    Kept,
}

pub async fn run(config_path: Option<&Path>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = super::resolve_path(config_path);

    println!("Delver — Setup");
    println!("==============\n");

    match write_default_config(&path, force)? {
        InitOutcome::Kept => {
            println!("  Config already exists at: {}", path.display());
            println!("  Edit it manually or re-run with --force to overwrite.\n");
            return Ok(());
        }
        InitOutcome::Created => println!("  Created config at: {}", path.display()),
        InitOutcome::Overwritten => println!("  Overwrote config at: {}", path.display()),
    }

    println!("\n  Next steps:");
    println!("   1. Set DELVER_API_KEY (or edit api_key in {})", path.display());
    println!("   2. Run: delver tools");
    println!("   3. Run: delver chat\n");
    Ok(())
}

/// Write `AppConfig::default_toml()` to `path`, creating parent directories.
/// An existing file is left alone unless `force` is set.
pub fn write_default_config(path: &Path, force: bool) -> std::io::Result<InitOutcome> {
    let existed = path.exists();
    if existed && !force {
        return Ok(InitOutcome::Kept);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;

    Ok(if existed {
        InitOutcome::Overwritten
    } else {
        InitOutcome::Created
    })
}
