//! Output formatting utilities
//!
//! Formatters for human-readable and JSON output, plus the transfer
//! progress spinner.

mod formatter;
mod progress;

pub use formatter::Formatter;
pub use progress::Progress;

/// Output configuration derived from CLI flags and config defaults
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Use JSON output format
    pub json: bool,
    /// Disable colored output
    pub no_color: bool,
    /// Disable progress display
    pub no_progress: bool,
    /// Suppress non-error output
    pub quiet: bool,
}

impl OutputConfig {
    /// Merge command-line flags over the `[defaults]` section
    pub fn from_flags(json: bool, no_color: bool, no_progress: bool, quiet: bool, defaults: &resync_core::config::Defaults) -> Self {
        Self {
            json: json || defaults.output == "json",
            no_color: no_color || defaults.color == "never",
            no_progress: no_progress || !defaults.progress,
            quiet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resync_core::config::Defaults;

    #[test]
    fn test_flags_override_defaults() {
        let defaults = Defaults {
            output: "json".into(),
            color: "never".into(),
            progress: false,
        };
        let config = OutputConfig::from_flags(false, false, false, true, &defaults);
        assert!(config.json);
        assert!(config.no_color);
        assert!(config.no_progress);
        assert!(config.quiet);

        let config = OutputConfig::from_flags(false, false, false, false, &Defaults::default());
        assert!(!config.json);
        assert!(!config.no_color);
        assert!(!config.no_progress);
    }
}
