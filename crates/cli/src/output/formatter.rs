//! Message formatting for the session commands
//!
//! Human mode prints marked status lines; JSON mode keeps stdout strictly
//! machine-readable and reports errors as `{"error": ...}` on stderr.

use console::{style, StyledObject};
use serde::Serialize;

use super::OutputConfig;

/// Kind of status line, with its marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Ok,
    Warn,
    Fail,
}

impl Mark {
    fn symbol(self) -> &'static str {
        match self {
            Mark::Ok => "✓",
            Mark::Warn => "⚠",
            Mark::Fail => "✗",
        }
    }

    fn styled(self) -> StyledObject<&'static str> {
        let symbol = style(self.symbol());
        match self {
            Mark::Ok => symbol.green(),
            Mark::Warn => symbol.yellow(),
            Mark::Fail => symbol.red(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Formatter {
    config: OutputConfig,
}

impl Formatter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    pub fn is_json(&self) -> bool {
        self.config.json
    }

    fn colored(&self) -> bool {
        !self.config.no_color && !self.config.json && console::colors_enabled()
    }

    fn line(&self, mark: Mark, message: &str) -> String {
        if self.colored() {
            format!("{} {message}", mark.styled())
        } else {
            format!("{} {message}", mark.symbol())
        }
    }

    /// Completion message on stdout, silent in quiet and JSON mode
    pub fn success(&self, message: &str) {
        if !self.config.quiet && !self.config.json {
            println!("{}", self.line(Mark::Ok, message));
        }
    }

    /// Warning on stderr, silent in quiet and JSON mode
    pub fn warning(&self, message: &str) {
        if !self.config.quiet && !self.config.json {
            eprintln!("{}", self.line(Mark::Warn, message));
        }
    }

    /// Errors always reach stderr, even with `--quiet`
    pub fn error(&self, message: &str) {
        if self.config.json {
            eprintln!("{}", serde_json::json!({ "error": message }));
        } else {
            eprintln!("{}", self.line(Mark::Fail, message));
        }
    }

    pub fn json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{json}"),
            Err(e) => self.error(&format!("Unable to encode output: {e}")),
        }
    }

    pub fn println(&self, message: &str) {
        if !self.config.quiet {
            println!("{message}");
        }
    }

    /// Secondary text such as the resume hint
    pub fn dim(&self, text: &str) -> String {
        if self.colored() {
            style(text).dim().to_string()
        } else {
            text.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> Formatter {
        Formatter::new(OutputConfig {
            no_color: true,
            ..Default::default()
        })
    }

    #[test]
    fn test_plain_lines_carry_marker() {
        let formatter = plain();
        assert_eq!(formatter.line(Mark::Ok, "Cleared 2 session(s)."), "✓ Cleared 2 session(s).");
        assert_eq!(formatter.line(Mark::Fail, "boom"), "✗ boom");
        assert_eq!(formatter.dim("hint"), "hint");
    }

    #[test]
    fn test_json_mode_never_colors() {
        let formatter = Formatter::new(OutputConfig {
            json: true,
            ..Default::default()
        });
        assert!(formatter.is_json());
        assert!(!formatter.colored());
        assert_eq!(formatter.line(Mark::Warn, "w"), "⚠ w");
    }
}
