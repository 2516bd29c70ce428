use crate::app::reconciler::{TickReport, UiReconciler};
use crate::app::state::{UploadForm, UploadView};
use crate::channels::{
    progress_channel, status_channel, ProgressReceiver, ProgressSender, StatusReceiver,
    StatusSender,
};
use crate::error::ValidationError;
use crate::upload::{CancelToken, Services, UploadRequest, UploadWorker};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

/// Receivers and cancel handle of the most recent lifecycle.
#[derive(Debug)]
struct Lifecycle {
    status: StatusReceiver,
    progress: ProgressReceiver,
    cancel: CancelToken,
}

/// Owns one upload lifecycle at a time and the view it feeds.
#[derive(Debug)]
pub struct UploadController {
    services: Services,
    reconciler: UiReconciler,
    lifecycle: Option<Lifecycle>,
    pub form: UploadForm,
    pub view: UploadView,
}

impl UploadController {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            reconciler: UiReconciler::new(),
            lifecycle: None,
            form: UploadForm::default(),
            view: UploadView::default(),
        }
    }

    pub fn is_uploading(&self) -> bool {
        self.view.uploading
    }

    pub fn select_file(&mut self, path: PathBuf) {
        if self.form.remote_name.trim().is_empty() {
            if let Some(name) = path.file_name() {
                self.form.remote_name = name.to_string_lossy().into_owned();
            }
        }
        self.view.append_log(format!("Selected file: {}", path.display()));
        self.form.selected_file = Some(path);
    }

    pub fn selection_cancelled(&mut self) {
        self.view.append_log("File selection cancelled.");
    }

    /// Builds a request from the current form.
    pub fn request(&self) -> UploadRequest {
        UploadRequest::new(
            self.form.selected_file.clone().unwrap_or_default(),
            self.form.remote_name.trim(),
            self.form.visibility,
        )
    }

    pub fn validate(&self, request: &UploadRequest) -> Result<(), ValidationError> {
        if self.is_uploading() {
            return Err(ValidationError::UploadInProgress);
        }
        if request.local_path.as_os_str().is_empty() {
            return Err(ValidationError::NoFileSelected);
        }
        if request.remote_name.trim().is_empty() {
            return Err(ValidationError::MissingRemoteName);
        }
        if self.form.selected_file.as_deref() != Some(request.local_path.as_path()) {
            return Err(ValidationError::SelectionMismatch);
        }
        Ok(())
    }

    /// Starts a background upload and returns at once. Completion shows up
    /// later through [`poll`](Self::poll).
    pub fn submit(&mut self, request: UploadRequest) -> Result<(), ValidationError> {
        self.validate(&request)?;

        self.view.begin_upload();
        self.view.append_log("Authenticating with Google Drive...");

        let (status_tx, status_rx) = status_channel();
        let (progress_tx, progress_rx) = progress_channel();
        let cancel = CancelToken::new();
        self.lifecycle = Some(Lifecycle {
            status: status_rx,
            progress: progress_rx,
            cancel: cancel.clone(),
        });

        info!(
            "Submitting upload of {} as '{}'",
            request.local_path.display(),
            request.remote_name
        );

        let worker = UploadWorker::new(
            self.services.clone(),
            status_tx.clone(),
            progress_tx.clone(),
            cancel,
        );
        spawn_worker(worker, request, status_tx, progress_tx);
        Ok(())
    }

    pub fn cancel(&mut self) {
        if let Some(lifecycle) = &self.lifecycle {
            if self.view.uploading && !lifecycle.cancel.is_cancelled() {
                info!("Cancellation requested");
                lifecycle.cancel.cancel();
                self.view.append_log("Cancelling the upload...");
            }
        }
    }

    /// One reconciler tick against the current lifecycle's channels.
    pub fn poll(&mut self) -> TickReport {
        match &self.lifecycle {
            Some(lifecycle) => {
                let report =
                    self.reconciler.tick(&mut self.view, &lifecycle.status, &lifecycle.progress);
                if report.completed {
                    info!(
                        "Upload lifecycle finished (succeeded: {})",
                        self.view.outcome.succeeded
                    );
                }
                report
            }
            None => TickReport::default(),
        }
    }

    /// The link to put on the clipboard, if there is one.
    pub fn copy_link(&mut self) -> Option<String> {
        if self.view.copy_enabled && !self.view.link.is_empty() {
            self.view.append_log("Link copied to clipboard.");
            self.view.mark_copied(Instant::now());
            Some(self.view.link.clone())
        } else {
            self.view.append_log("No link available to copy.");
            None
        }
    }

    pub fn selected_file(&self) -> Option<&Path> {
        self.form.selected_file.as_deref()
    }
}

/// Runs the worker on a detached thread with its own runtime so it never
/// blocks the UI or process exit.
fn spawn_worker(
    worker: UploadWorker,
    request: UploadRequest,
    status: StatusSender,
    progress: ProgressSender,
) {
    let fallback_status = status.clone();
    let fallback_progress = progress.clone();

    let spawned = thread::Builder::new()
        .name("drive-upload".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!("Could not build upload runtime: {}", e);
                    status.failure(format!("Could not start the upload: {}", e));
                    progress.push(0);
                    status.complete();
                    return;
                }
            };
            runtime.block_on(worker.run(request));
        });

    if let Err(e) = spawned {
        warn!("Could not spawn upload thread: {}", e);
        fallback_status.failure(format!("Could not start the upload: {}", e));
        fallback_progress.push(0);
        fallback_status.complete();
    }
}
