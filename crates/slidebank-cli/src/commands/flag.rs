//! Feature flag commands.

use super::{get_database, get_paths, load_config};
use anyhow::{Context, Result};
use colored::Colorize;
use slidebank_config::Config;
use slidebank_core::{parse_flag_value, FeatureFlag};

fn configured_default(config: &Config, flag: FeatureFlag) -> bool {
    match flag {
        FeatureFlag::AutoProcess => config.watch.auto_process,
        FeatureFlag::AiEnabled => config.ai.enabled,
    }
}

pub fn show() -> Result<()> {
    let config = load_config()?;
    let db = get_database(&get_paths(&config)?)?;

    println!("{}", "Feature Flags".cyan().bold());
    println!("{}", "─".repeat(50));

    for flag in FeatureFlag::all() {
        let default = configured_default(&config, flag);
        let stored = db
            .get_feature_flag(flag.name())
            .with_context(|| format!("Failed to read flag {}", flag.name()))?;

        let (value, source) = match stored.as_deref().map(|v| (v, parse_flag_value(v))) {
            Some((_, Some(value))) => (value, "set".to_string()),
            Some((raw, None)) => (default, format!("invalid value {:?}, using default", raw)),
            None => (default, "default".to_string()),
        };

        let marker = if value { "on".green() } else { "off".red() };
        println!(
            "  {:<14} {} {}",
            flag.name(),
            marker,
            format!("({})", source).dimmed()
        );
    }

    let unknown: Vec<(String, String)> = db
        .list_feature_flags()
        .context("Failed to list flags")?
        .into_iter()
        .filter(|(name, _)| FeatureFlag::from_name(name).is_none())
        .collect();
    for (name, value) in unknown {
        println!(
            "  {:<14} {} {}",
            name,
            value,
            "(unknown flag, ignored)".dimmed()
        );
    }

    Ok(())
}

pub fn set(name: &str, value: &str) -> Result<()> {
    let flag = FeatureFlag::from_name(name).ok_or_else(|| {
        anyhow::anyhow!("Unknown flag: {}. Valid flags: auto_process, ai_enabled", name)
    })?;
    let enabled = parse_flag_value(value)
        .ok_or_else(|| anyhow::anyhow!("Invalid value {:?}. Use true or false", value))?;

    let config = load_config()?;
    let db = get_database(&get_paths(&config)?)?;
    db.set_feature_flag(flag.name(), if enabled { "true" } else { "false" })
        .context("Failed to save flag")?;

    println!(
        "{} Set {} = {}",
        "✓".green(),
        flag.name().cyan(),
        enabled
    );
    if flag == FeatureFlag::AutoProcess && enabled {
        println!(
            "{}",
            "Files dropped while disabled are picked up by the next watcher start or 'slidebank reprocess-all'."
                .dimmed()
        );
    }

    Ok(())
}
