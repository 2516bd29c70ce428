use crate::upload::Visibility;
use chrono::Local;
use std::path::PathBuf;
use std::time::{Duration, Instant};

const COPY_FEEDBACK: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub time: String,
    pub level: LogLevel,
    pub text: String,
}

/// Result of the latest upload as seen through the status stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOutcome {
    pub link: Option<String>,
    pub succeeded: bool,
}

/// What the user fills in before starting an upload.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub selected_file: Option<PathBuf>,
    pub remote_name: String,
    pub visibility: Visibility,
}

/// Everything the window displays. Mutated only on the UI thread.
#[derive(Debug, Clone, Default)]
pub struct UploadView {
    pub log: Vec<LogLine>,
    pub link: String,
    pub copy_enabled: bool,
    pub progress: u8,
    pub uploading: bool,
    pub outcome: UploadOutcome,
    copied_until: Option<Instant>,
}

impl UploadView {
    pub fn append_log(&mut self, text: impl Into<String>) {
        self.push_line(LogLevel::Info, text.into());
    }

    pub fn append_error(&mut self, text: impl Into<String>) {
        self.push_line(LogLevel::Error, text.into());
    }

    fn push_line(&mut self, level: LogLevel, text: String) {
        self.log.push(LogLine {
            time: Local::now().format("%H:%M:%S").to_string(),
            level,
            text,
        });
    }

    /// Shows `link`; an empty link clears the field and disables copying.
    pub fn set_link(&mut self, link: String) {
        self.copy_enabled = !link.is_empty();
        self.outcome.link = if link.is_empty() {
            None
        } else {
            Some(link.clone())
        };
        self.link = link;
    }

    pub fn mark_copied(&mut self, now: Instant) {
        self.copied_until = Some(now + COPY_FEEDBACK);
    }

    /// Copy button caption; confirms a recent copy for a short while.
    pub fn copy_label(&self, now: Instant) -> &'static str {
        match self.copied_until {
            Some(until) if now < until => "✓ copied",
            _ => "Copy link",
        }
    }

    pub fn set_progress(&mut self, percent: u8) {
        self.progress = percent.min(100);
    }

    pub fn progress_fraction(&self) -> f32 {
        f32::from(self.progress) / 100.0
    }

    /// Clears derived state and locks the controls for a new lifecycle.
    pub fn begin_upload(&mut self) {
        self.uploading = true;
        self.progress = 0;
        self.link.clear();
        self.copy_enabled = false;
        self.copied_until = None;
        self.outcome = UploadOutcome::default();
    }

    pub fn enable_controls(&mut self) {
        self.uploading = false;
    }

    pub fn log_text(&self) -> impl Iterator<Item = &str> {
        self.log.iter().map(|line| line.text.as_str())
    }
}
