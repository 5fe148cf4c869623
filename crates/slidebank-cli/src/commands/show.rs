//! Show command - display a deck and its slides.

use super::{get_database, get_paths, load_config, preview};
use anyhow::Result;
use colored::Colorize;

pub fn run(id: &str) -> Result<()> {
    let config = load_config()?;
    let db = get_database(&get_paths(&config)?)?;

    let presentation = db.get_presentation_by_prefix(id)?;
    let heading = presentation
        .title
        .clone()
        .unwrap_or_else(|| presentation.filename.clone());

    println!("{}", heading.white().bold());
    println!("{}", "─".repeat(70));
    println!("  {}: {}", "ID".cyan(), presentation.id);
    println!("  {}: {}", "File".cyan(), presentation.filename);
    println!("  {}: {}", "Path".cyan(), presentation.canonical_path);
    println!("  {}: {}", "Checksum".cyan(), presentation.checksum);
    println!(
        "  {}: {}",
        "Created".cyan(),
        presentation.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    if presentation.is_template {
        println!(
            "  {}: {}",
            "Template tags".cyan(),
            presentation.tags.join(", ").yellow()
        );
    }

    if let Some(ref summary) = presentation.summary {
        println!();
        println!("{}", "Summary".white().bold());
        println!("{}", "─".repeat(70));
        println!("{}", summary);
    }

    let slides = db.get_slides(&presentation.id)?;
    println!();
    println!("{} ({})", "Slides".white().bold(), slides.len());
    println!("{}", "─".repeat(70));

    for slide in &slides {
        println!("{}", slide.title.white());
        if !slide.content.is_empty() {
            println!("  {}", preview(&slide.content, 100).dimmed());
        }
        if let Some(ref summary) = slide.summary {
            println!("  {} {}", "Summary:".cyan(), preview(summary, 100));
        }
        if !slide.comments.is_empty() {
            for line in slide.comments.lines() {
                println!("  {} {}", "»".yellow(), preview(line, 96));
            }
        }
        if let Some(ref thumbnail) = slide.thumbnail_path {
            println!("  {}", thumbnail.dimmed());
        }
    }

    if !presentation.metadata.is_null() && presentation.metadata != serde_json::json!({}) {
        println!();
        println!("{}", "Metadata".white().bold());
        println!("{}", "─".repeat(70));
        println!(
            "{}",
            serde_json::to_string_pretty(&presentation.metadata)?.dimmed()
        );
    }

    Ok(())
}
