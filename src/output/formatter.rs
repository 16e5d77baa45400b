use owo_colors::OwoColorize;
use std::io::IsTerminal;
use terminal_size::{terminal_size, Width};

use crate::scoring::AthleteScore;

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Format a prestige score with one decimal ("14.7", "0.0")
pub fn format_score(score: f64) -> String {
    format!("{:.1}", score)
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Truncate text to fit available width, accounting for Unicode
fn truncate(text: &str, max_width: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_width {
        text.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

/// Format the ranking as a table with columns: Rank, Score, Athlete, Clubs
/// No headers. Clubs are truncated to the terminal width.
pub fn format_ranking(scores: &[AthleteScore], use_colors: bool) -> String {
    if scores.is_empty() {
        return "No scored athletes.".to_string();
    }

    let term_width = get_terminal_width();
    let name_width = scores
        .iter()
        .map(|s| s.name.chars().count())
        .max()
        .unwrap_or(0);
    let score_width = scores
        .iter()
        .map(|s| format_score(s.score).len())
        .max()
        .unwrap_or(0);
    let index_width = format!("{}.", scores.len()).len();
    let separator = "  ";

    scores
        .iter()
        .enumerate()
        .map(|(idx, scored)| {
            let index_str = format!("{:>width$}", format!("{}.", idx + 1), width = index_width);
            let score_str = format!("{:>width$}", format_score(scored.score), width = score_width);
            let name_pad = name_width - scored.name.chars().count();
            let name_str = format!("{}{}", scored.name, " ".repeat(name_pad));

            let fixed_width = index_width + 1 + score_width + name_width + separator.len() * 2;
            let clubs = match term_width {
                Some(width) if width > fixed_width + 10 => truncate(&scored.clubs, width - fixed_width),
                // Very narrow terminal, show truncated
                Some(_) => truncate(&scored.clubs, 20),
                // No terminal (pipe), don't truncate
                None => scored.clubs.clone(),
            };

            let line = if use_colors {
                format!(
                    "{} {}{}{}{}{}",
                    index_str.dimmed(),
                    score_str.bold(),
                    separator,
                    name_str,
                    separator,
                    clubs.cyan()
                )
            } else {
                format!(
                    "{} {}{}{}{}{}",
                    index_str, score_str, separator, name_str, separator, clubs
                )
            };
            line.trim_end().to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
