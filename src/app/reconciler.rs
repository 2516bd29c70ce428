use crate::app::state::UploadView;
use crate::channels::{ProgressReceiver, StatusReceiver};
use crate::upload::{LinkKind, StatusEvent};
use log::debug;

/// Link decision for one drained batch.
#[derive(Debug, Default)]
struct LinkBatch {
    candidate: Option<String>,
    public: bool,
    failed: bool,
}

impl LinkBatch {
    fn offer(&mut self, url: String, kind: LinkKind) {
        match kind {
            LinkKind::Public => {
                self.candidate = Some(url);
                self.public = true;
            }
            LinkKind::Verified if !self.public => self.candidate = Some(url),
            LinkKind::Verified => {}
        }
    }

    fn fail(&mut self) {
        self.failed = true;
    }

    /// `Some("")` clears the field after a failure.
    fn resolve(self) -> Option<String> {
        if self.failed {
            Some(String::new())
        } else {
            self.candidate
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub events: usize,
    pub progress: Option<u8>,
    pub completed: bool,
}

/// Drains the worker's channels into the view on every UI tick.
#[derive(Debug, Default)]
pub struct UiReconciler {
    ticks: u64,
}

impl UiReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(
        &mut self,
        view: &mut UploadView,
        status: &StatusReceiver,
        progress: &ProgressReceiver,
    ) -> TickReport {
        self.ticks += 1;
        let mut report = TickReport::default();
        let mut links = LinkBatch::default();

        for event in status.drain_all() {
            report.events += 1;
            match event {
                StatusEvent::Message(text) => view.append_log(text),
                StatusEvent::Link { url, kind } => {
                    view.outcome.succeeded = true;
                    links.offer(url, kind);
                }
                StatusEvent::Failure(text) => {
                    view.outcome.succeeded = false;
                    links.fail();
                    view.append_error(text);
                }
                StatusEvent::Complete => {
                    view.enable_controls();
                    report.completed = true;
                }
            }
        }

        if let Some(link) = links.resolve() {
            view.set_link(link);
        }

        if let Some(percent) = progress.drain_latest() {
            view.set_progress(percent);
            report.progress = Some(percent);
        }

        if report.events > 0 {
            debug!(
                "Tick {} applied {} status events (completed: {})",
                self.ticks, report.events, report.completed
            );
        }
        report
    }
}
