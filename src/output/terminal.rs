// Colored terminal output for scan results.
//
// This module handles all terminal-specific formatting. The main.rs commands
// delegate here after a scan finishes.

use colored::Colorize;

use crate::result::{CommonResult, LegacyVisionResult};

/// Display a normalized scan result.
pub fn display_result(result: &CommonResult) {
    println!("\n{}", format!("=== {} ===", result.method).bold());

    println!("\n  {}", "Best guesses".bold());
    if result.best_guesses.is_empty() {
        println!("    {}", "No direct match found.".dimmed());
    } else {
        for guess in &result.best_guesses {
            println!("    {}", guess.green().bold());
        }
    }

    println!(
        "\n  {}",
        format!("Visual matches ({})", result.visual_matches.len()).bold()
    );
    if result.visual_matches.is_empty() {
        println!("    {}", "No visual matches found.".dimmed());
    }
    for (i, m) in result.visual_matches.iter().enumerate() {
        let title = if m.title.is_empty() { "No Title" } else { &m.title };
        println!(
            "    {:>2}. {}  {}",
            i + 1,
            super::truncate_chars(title, 70),
            format!("[{}]", m.source).dimmed()
        );
        println!("        {}", m.link.dimmed());
    }

    if !result.common_keywords.is_empty() {
        let keywords: Vec<String> = result
            .common_keywords
            .iter()
            .map(|k| format!("{} ({})", k.word, k.count))
            .collect();
        println!("\n  {} {}", "Common keywords:".bold(), keywords.join(", ").cyan());
    }

    if let Some(info) = &result.debug_info {
        println!("\n  {}", info.dimmed());
    }
    println!();
}

/// Display the legacy Cloud Vision result shape.
pub fn display_legacy(result: &LegacyVisionResult) {
    println!("\n{}", "=== Google Cloud Vision (legacy) ===".bold());

    match &result.best_guess {
        Some(guess) => println!("  Best guess: {}", guess.green().bold()),
        None => println!("  Best guess: {}", "N/A".dimmed()),
    }

    let tags: Vec<String> = result
        .google_sees
        .iter()
        .take(5)
        .map(|t| format!("{} ({:.2})", t.description, t.score))
        .collect();
    println!("  Tags: {}", tags.join(", "));

    if !result.matching_pages.is_empty() {
        println!("  Matching pages:");
        for page in result.matching_pages.iter().take(3) {
            println!("    - {}", super::truncate_chars(&page.page_title, 80));
        }
    }

    if !result.common_keywords.is_empty() {
        let keywords: Vec<String> = result
            .common_keywords
            .iter()
            .map(|k| format!("{} ({})", k.word, k.count))
            .collect();
        println!("  Common keywords: {}", keywords.join(", ").cyan());
    }
    println!();
}
