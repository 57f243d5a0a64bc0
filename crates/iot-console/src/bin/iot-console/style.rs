//! Terminal coloring for console output.

use std::io::IsTerminal;

use iot_console::OutcomeKind;
use owo_colors::{AnsiColors, OwoColorize};

fn paint(text: &str, color: AnsiColors, enabled: bool) -> String {
    if enabled {
        text.color(color).to_string()
    } else {
        text.to_string()
    }
}

fn paint_stdout(text: impl AsRef<str>, color: AnsiColors) -> String {
    paint(text.as_ref(), color, std::io::stdout().is_terminal())
}

pub fn success(text: impl AsRef<str>) -> String {
    paint_stdout(text, AnsiColors::Green)
}

pub fn warning(text: impl AsRef<str>) -> String {
    paint_stdout(text, AnsiColors::Yellow)
}

pub fn error(text: impl AsRef<str>) -> String {
    paint_stdout(text, AnsiColors::Red)
}

pub fn accent(text: impl AsRef<str>) -> String {
    paint_stdout(text, AnsiColors::Cyan)
}

/// Color for a device feedback line.
pub fn outcome(kind: OutcomeKind, text: impl AsRef<str>) -> String {
    let color = match kind {
        OutcomeKind::Success => AnsiColors::Green,
        OutcomeKind::Error => AnsiColors::Red,
        OutcomeKind::Info => AnsiColors::Cyan,
    };
    paint_stdout(text, color)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paint_leaves_plain_text_when_disabled() {
        assert_eq!(paint("ready", AnsiColors::Green, false), "ready");
        let colored = paint("ready", AnsiColors::Green, true);
        assert!(colored.starts_with('\u{1b}'));
        assert!(colored.contains("ready"));
    }
}
