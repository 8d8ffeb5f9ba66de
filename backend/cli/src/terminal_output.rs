//! Terminal output: ANSI styling, notes, verdict lines and the progress bar.

use std::io::Write;

use signshuffle_core::{Verdict, Violation};

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const MAGENTA: &str = "\x1b[35m";
pub const CYAN: &str = "\x1b[36m";

const BAR_WIDTH: usize = 30;

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM")
                .map(|t| t != "dumb")
                .unwrap_or(false))
}

pub fn note_info(msg: &str) {
    if supports_color() {
        println!("{CYAN}{BOLD}ℹ{RESET} {msg}");
    } else {
        println!("INFO: {msg}");
    }
}

pub fn note_warn(msg: &str) {
    if supports_color() {
        println!("{YELLOW}{BOLD}⚠{RESET} {msg}");
    } else {
        println!("WARN: {msg}");
    }
}

pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}✗{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

pub fn note_success(msg: &str) {
    if supports_color() {
        println!("{GREEN}{BOLD}✓{RESET} {msg}");
    } else {
        println!("OK: {msg}");
    }
}

/// First character upper-cased, the rest lower-cased.
pub fn display_sentence(sentence: &str) -> String {
    let mut chars = sentence.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

pub fn format_verdict(verdict: &Verdict, color: bool) -> String {
    let text = display_sentence(&verdict.sentence);
    match (verdict.valid, color) {
        (true, true) => format!("🎉 {GREEN}{text}{RESET}"),
        (false, true) => format!("❌ {DIM}{text}{RESET}"),
        (true, false) => format!("🎉 {text}"),
        (false, false) => format!("❌ {text}"),
    }
}

pub fn format_violation(violation: &Violation) -> String {
    match violation {
        Violation::Unknown { token, used } => {
            format!("'{token}' used {used}x but the sign has none")
        }
        Violation::Overused {
            token,
            used,
            available,
        } => format!("'{token}' used {used}x but only {available} available"),
    }
}

pub fn celebration_banner(color: bool) -> String {
    if color {
        format!("{MAGENTA}{BOLD}🎊 Every sentence fits the sign! 🎊{RESET}")
    } else {
        "🎊 Every sentence fits the sign! 🎊".to_string()
    }
}

/// `[#######.......]  42%`
pub fn progress_bar(progress: f64) -> String {
    let pct = progress.clamp(0.0, 100.0);
    let filled = ((pct / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {:>3.0}%",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        pct
    )
}

/// Write a chunk and flush, for in-place redraws.
pub fn stream_write(writer: &mut impl Write, chunk: &str) -> std::io::Result<()> {
    writer.write_all(chunk.as_bytes())?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalises_like_the_web_ui() {
        assert_eq!(display_sentence("hELLO world"), "Hello world");
        assert_eq!(display_sentence(""), "");
        assert_eq!(display_sentence("ßa"), "SSa");
    }

    #[test]
    fn verdict_markers() {
        let ok = Verdict {
            sentence: "ab".into(),
            valid: true,
        };
        let bad = Verdict {
            sentence: "abb".into(),
            valid: false,
        };
        assert_eq!(format_verdict(&ok, false), "🎉 Ab");
        assert_eq!(format_verdict(&bad, false), "❌ Abb");
    }

    #[test]
    fn describes_violations() {
        let v = Violation::Overused {
            token: 'B',
            used: 2,
            available: 1,
        };
        assert_eq!(format_violation(&v), "'B' used 2x but only 1 available");
    }

    #[test]
    fn bar_fills_proportionally() {
        let empty = progress_bar(0.0);
        assert!(empty.starts_with("[......"));
        assert!(empty.ends_with("  0%"));
        let full = progress_bar(100.0);
        assert!(full.contains(&"#".repeat(BAR_WIDTH)));
        assert!(full.ends_with("100%"));
        assert_eq!(progress_bar(150.0), full);
    }
}
