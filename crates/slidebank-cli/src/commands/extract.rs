//! Extract and set-text commands, operating directly on a deck file.

use super::preview;
use anyhow::{Context, Result};
use colored::Colorize;
use slidebank_core::comments_to_text;
use slidebank_pptx::{
    editable_shapes, extract_slide_content, extract_tags, slide_text, update_slide_text,
};
use std::path::Path;

pub fn run(file: &Path, json: bool) -> Result<()> {
    let deck = extract_slide_content(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let tags = extract_tags(file).with_context(|| format!("Failed to scan {}", file.display()))?;

    if json {
        let slides: Vec<serde_json::Value> = deck
            .slides
            .values()
            .map(|slide| {
                serde_json::json!({
                    "number": slide.number,
                    "text": slide.text,
                    "layout": slide.layout,
                    "comments": slide.comments,
                })
            })
            .collect();
        let output = serde_json::json!({
            "slide_count": deck.slide_count,
            "tags": tags,
            "slides": slides,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "{} ({} slides)",
        file.display().to_string().white().bold(),
        deck.slide_count
    );
    if !tags.is_empty() {
        println!("  {}: {}", "Tags".cyan(), tags.join(", ").yellow());
    }
    println!("{}", "─".repeat(70));

    for number in 1..=deck.slide_count {
        let Some(slide) = deck.slide(number) else {
            println!("{} {}", format!("{:>3}.", number).cyan(), "(unreadable)".red());
            continue;
        };

        println!(
            "{} {}",
            format!("{:>3}.", number).cyan(),
            preview(&slide.text, 90)
        );
        // Same indices as `set-text --shape`, so empty shapes are listed too.
        let shapes = editable_shapes(file, number)?.unwrap_or_default();
        for (index, shape) in shapes.iter().enumerate() {
            let text = shape.text();
            let text = if text.is_empty() {
                "(empty)".dimmed().to_string()
            } else {
                preview(&text, 70)
            };
            println!(
                "     {} {} {}",
                format!("[{}]", index).dimmed(),
                shape.kind.as_str().dimmed(),
                text
            );
        }
        let comments = comments_to_text(&slide.comments);
        for line in comments.lines() {
            println!("     {} {}", "»".yellow(), preview(line, 80));
        }
    }

    Ok(())
}

pub fn set_text(file: &Path, slide: u32, shape: usize, text: &str) -> Result<()> {
    update_slide_text(file, slide, shape, text).with_context(|| {
        format!(
            "Failed to update shape {} on slide {} of {}",
            shape,
            slide,
            file.display()
        )
    })?;

    println!(
        "{} Slide {} shape {} updated in {}",
        "✓".green(),
        slide,
        shape,
        file.display()
    );
    if let Some(text) = slide_text(file, slide)? {
        println!("  {}", preview(&text, 90).dimmed());
    }

    Ok(())
}
