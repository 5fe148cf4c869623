//! Recent command - list recently ingested decks.

use super::{get_database, get_paths, load_config, preview, short_id};
use anyhow::Result;
use colored::Colorize;

pub fn run(limit: i64) -> Result<()> {
    let config = load_config()?;
    let db = get_database(&get_paths(&config)?)?;

    let presentations = db.list_presentations(Some(limit))?;
    if presentations.is_empty() {
        println!(
            "{}",
            "No decks found. Drop files into the stage directory or use 'slidebank process <path>'."
                .dimmed()
        );
        return Ok(());
    }

    println!("{}", "Recent Decks".cyan().bold());
    println!("{}", "─".repeat(70));

    for presentation in presentations {
        let date = presentation.created_at.format("%Y-%m-%d %H:%M").to_string();
        let slides = presentation
            .metadata
            .get("slide_count")
            .and_then(|v| v.as_u64())
            .map(|n| format!("{} slides", n))
            .unwrap_or_default();
        let kind = if presentation.is_template { "T" } else { " " };

        println!(
            "{} {} {} {} {}",
            kind.yellow().bold(),
            presentation.filename.white().bold(),
            format!("[{}]", short_id(&presentation.id)).dimmed(),
            slides,
            date.dimmed()
        );

        if let Some(ref title) = presentation.title {
            println!("  {}", title);
        }
        println!("  {}", preview(&presentation.canonical_path, 70).dimmed());
        if let Some(ref summary) = presentation.summary {
            println!("  {}", preview(summary, 80).dimmed());
        }
    }

    Ok(())
}
