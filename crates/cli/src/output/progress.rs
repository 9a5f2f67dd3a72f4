//! Progress display for running sessions

use std::time::Duration;

use resync_core::DriverEvent;

use super::OutputConfig;

/// Spinner tracking transferred objects and bytes
///
/// Hidden in quiet, JSON and no-progress modes.
#[derive(Debug)]
pub struct Progress {
    bar: Option<indicatif::ProgressBar>,
    objects: u64,
    bytes: u64,
}

impl Progress {
    pub fn new(config: &OutputConfig, session_id: &str) -> Self {
        let bar = if config.quiet || config.json || config.no_progress {
            None
        } else {
            let bar = indicatif::ProgressBar::new_spinner();
            if let Ok(style) = indicatif::ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {prefix} {msg}")
            {
                bar.set_style(style);
            }
            bar.set_prefix(session_id.to_string());
            bar.enable_steady_tick(Duration::from_millis(100));
            Some(bar)
        };

        Self {
            bar,
            objects: 0,
            bytes: 0,
        }
    }

    /// Fold one driver event into the display
    pub fn on_event(&mut self, event: &DriverEvent) {
        match event {
            DriverEvent::Transferred { bytes, .. } => {
                self.objects += 1;
                self.bytes += bytes;
            }
            DriverEvent::Skipped { .. } => self.objects += 1,
            DriverEvent::Failed { key, message } => {
                if let Some(bar) = &self.bar {
                    bar.println(format!("✗ {key}: {message}"));
                }
            }
        }
        if let Some(bar) = &self.bar {
            bar.set_message(self.message());
        }
    }

    pub fn message(&self) -> String {
        format!(
            "{} object(s), {}",
            self.objects,
            humansize::format_size(self.bytes, humansize::BINARY)
        )
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }

    pub fn is_visible(&self) -> bool {
        self.bar.is_some()
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        self.finish();
    }
}
