use crate::channels::{ProgressSender, StatusSender};
use crate::upload::traits::{AuthProvider, ObjectStore, UploadTransport};
use crate::upload::types::{
    percent_of, CancelToken, LinkKind, SessionHandle, UploadRequest, UploadedObject, Visibility,
};
use derivative::Derivative;
use log::{error, info, warn};
use std::fmt;
use std::sync::Arc;

/// The collaborators a worker talks to.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct Services {
    #[derivative(Debug = "ignore")]
    pub auth: Arc<dyn AuthProvider>,
    #[derivative(Debug = "ignore")]
    pub transport: Arc<dyn UploadTransport>,
    #[derivative(Debug = "ignore")]
    pub store: Arc<dyn ObjectStore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Authenticate,
    Upload,
    Verify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Authenticate => write!(f, "authentication"),
            Stage::Upload => write!(f, "upload"),
            Stage::Verify => write!(f, "verification"),
        }
    }
}

/// Emits `Complete` when dropped, so every exit path ends the lifecycle.
struct LifecycleGuard {
    status: StatusSender,
    progress: ProgressSender,
}

impl Drop for LifecycleGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            error!("Upload worker panicked");
            self.status.failure("An unexpected error occurred in the upload thread.");
            self.progress.push(0);
        }
        self.status.complete();
    }
}

/// Runs one upload lifecycle off the UI thread.
#[derive(Debug)]
pub struct UploadWorker {
    services: Services,
    status: StatusSender,
    progress: ProgressSender,
    cancel: CancelToken,
}

impl UploadWorker {
    pub fn new(
        services: Services,
        status: StatusSender,
        progress: ProgressSender,
        cancel: CancelToken,
    ) -> Self {
        Self {
            services,
            status,
            progress,
            cancel,
        }
    }

    /// Authenticate, upload, verify and optionally publish. Ends with exactly
    /// one `Complete` event whatever happens.
    pub async fn run(self, request: UploadRequest) {
        let _guard = LifecycleGuard {
            status: self.status.clone(),
            progress: self.progress.clone(),
        };

        info!(
            "Upload worker started for {} as '{}' ({})",
            request.local_path.display(),
            request.remote_name,
            request.visibility
        );

        match self.execute(&request).await {
            Ok(()) => info!("Upload of '{}' finished", request.remote_name),
            Err(stage) => warn!(
                "Upload of '{}' stopped during {}",
                request.remote_name, stage
            ),
        }
    }

    async fn execute(&self, request: &UploadRequest) -> Result<(), Stage> {
        let session = self.authenticate().await?;
        let object = self.upload(&session, request).await?;
        self.verify(&session, &object).await?;

        match request.visibility {
            Visibility::Public => self.publish(&session, &object).await,
            Visibility::Private => self.status.message("File uploaded as private."),
        }
        Ok(())
    }

    async fn authenticate(&self) -> Result<SessionHandle, Stage> {
        match self.services.auth.session(&self.status).await {
            Ok(session) => {
                self.status.message("Authenticated with Google Drive.");
                Ok(session)
            }
            Err(e) => {
                warn!("Authentication failed: {}", e);
                self.status.failure(e.to_string());
                self.status.message("Authentication failed or was cancelled.");
                self.progress.push(0);
                Err(Stage::Authenticate)
            }
        }
    }

    async fn upload(
        &self,
        session: &SessionHandle,
        request: &UploadRequest,
    ) -> Result<UploadedObject, Stage> {
        if !request.local_path.is_file() {
            self.status.failure(format!(
                "Error: file not found: '{}'",
                request.local_path.display()
            ));
            self.progress.push(0);
            return Err(Stage::Upload);
        }

        self.status.message(format!("Starting upload of {}...", request.remote_name));

        let status = self.status.clone();
        let progress = self.progress.clone();
        let mut on_progress = move |fraction: f64| {
            let percent = percent_of(fraction);
            progress.push(percent);
            status.message(format!("Uploading... {}%", percent));
        };

        let result = self
            .services
            .transport
            .send(
                session,
                &request.local_path,
                &request.remote_name,
                &self.cancel,
                &mut on_progress,
            )
            .await;

        match result {
            Ok(object) => {
                self.progress.push(100);
                self.status.message(format!("Upload finished. File ID: {}", object.id));
                Ok(object)
            }
            Err(e) => {
                warn!("Transport failed: {}", e);
                self.status.failure(format!("Error while uploading: {}", e));
                self.progress.push(0);
                Err(Stage::Upload)
            }
        }
    }

    async fn verify(&self, session: &SessionHandle, object: &UploadedObject) -> Result<(), Stage> {
        match self.services.store.verify(session, &object.id).await {
            Ok(link) => {
                self.status.link(link, LinkKind::Verified);
                self.status.message("Verified the file exists on Google Drive.");
                Ok(())
            }
            Err(e) => {
                warn!("Verification failed: {}", e);
                self.status.failure(format!("Error: the file was not found after upload. {}", e));
                self.status.message("The file was not uploaded successfully. Please try again.");
                Err(Stage::Verify)
            }
        }
    }

    async fn publish(&self, session: &SessionHandle, object: &UploadedObject) {
        self.status.message("Attempting to make the file shareable...");

        match self.services.store.make_public(session, &object.id).await {
            Ok(link) => {
                self.status.link(link.clone(), LinkKind::Public);
                self.status.message(format!(
                    "Anyone with the link can now view the file: {}",
                    link
                ));
            }
            Err(e) => {
                warn!("Could not make '{}' public: {}", object.id, e);
                self.status.message(format!("Could not make the file shareable: {}", e));
                self.status.message(
                    "The file remains private. You can change sharing manually in Google Drive.",
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{progress_channel, status_channel, ProgressReceiver, StatusReceiver};
    use crate::upload::testing::{FakeAuth, FakeStore, FakeTransport};
    use crate::upload::StatusEvent;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    struct Harness {
        worker: UploadWorker,
        status: StatusReceiver,
        progress: ProgressReceiver,
    }

    fn harness(auth: FakeAuth, transport: FakeTransport, store: FakeStore) -> Harness {
        let (status_tx, status) = status_channel();
        let (progress_tx, progress) = progress_channel();
        let services = Services {
            auth: Arc::new(auth),
            transport: Arc::new(transport),
            store: Arc::new(store),
        };
        Harness {
            worker: UploadWorker::new(services, status_tx, progress_tx, CancelToken::new()),
            status,
            progress,
        }
    }

    fn existing_file() -> NamedTempFile {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"payload").unwrap();
        file
    }

    fn links(events: &[StatusEvent]) -> Vec<(String, LinkKind)> {
        events
            .iter()
            .filter_map(|event| match event {
                StatusEvent::Link { url, kind } => Some((url.clone(), *kind)),
                _ => None,
            })
            .collect()
    }

    fn count_complete(events: &[StatusEvent]) -> usize {
        events
            .iter()
            .filter(|event| matches!(event, StatusEvent::Complete))
            .count()
    }

    #[tokio::test]
    async fn auth_failure_completes_once_without_links() {
        let file = existing_file();
        let h = harness(FakeAuth::failing(), FakeTransport::ok(&[0.5]), FakeStore::ok());

        h.worker
            .run(UploadRequest::new(file.path(), "x", Visibility::Public))
            .await;

        let events = h.status.drain_all();
        assert_eq!(count_complete(&events), 1);
        assert_eq!(events.last(), Some(&StatusEvent::Complete));
        assert!(links(&events).is_empty());
        assert!(matches!(events[0], StatusEvent::Failure(_)));
        assert_eq!(h.progress.drain_latest(), Some(0));
    }

    #[tokio::test]
    async fn missing_local_file_fails_after_authentication() {
        let h = harness(FakeAuth::ok(), FakeTransport::ok(&[]), FakeStore::ok());

        h.worker
            .run(UploadRequest::new(
                PathBuf::from("missing.txt"),
                "x",
                Visibility::Private,
            ))
            .await;

        let events = h.status.drain_all();
        assert_eq!(
            events[0],
            StatusEvent::Message("Authenticated with Google Drive.".into())
        );
        match &events[1] {
            StatusEvent::Failure(text) => assert!(text.contains("file not found")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(events[2], StatusEvent::Complete);
        assert_eq!(events.len(), 3);
        assert_eq!(h.progress.drain_latest(), Some(0));
    }

    #[tokio::test]
    async fn private_upload_yields_only_verified_link() {
        let file = existing_file();
        let h = harness(
            FakeAuth::ok(),
            FakeTransport::ok(&[0.25, 0.5, 0.75]),
            FakeStore::ok(),
        );

        h.worker
            .run(UploadRequest::new(file.path(), "report.pdf", Visibility::Private))
            .await;

        let events = h.status.drain_all();
        assert_eq!(
            links(&events),
            vec![(FakeStore::VERIFIED_LINK.to_string(), LinkKind::Verified)]
        );
        assert!(events.contains(&StatusEvent::Message("File uploaded as private.".into())));
        assert!(events.contains(&StatusEvent::Message("Uploading... 50%".into())));
        assert_eq!(count_complete(&events), 1);
        assert_eq!(h.progress.drain_latest(), Some(100));
    }

    #[tokio::test]
    async fn public_upload_emits_events_in_order() {
        let file = existing_file();
        let h = harness(FakeAuth::ok(), FakeTransport::ok(&[0.5]), FakeStore::ok());

        h.worker
            .run(UploadRequest::new(file.path(), "x", Visibility::Public))
            .await;

        let events = h.status.drain_all();
        let verified = events
            .iter()
            .position(|e| matches!(e, StatusEvent::Link { kind: LinkKind::Verified, .. }))
            .unwrap();
        let attempting = events
            .iter()
            .position(|e| {
                *e == StatusEvent::Message("Attempting to make the file shareable...".into())
            })
            .unwrap();
        let public = events
            .iter()
            .position(|e| matches!(e, StatusEvent::Link { kind: LinkKind::Public, .. }))
            .unwrap();

        assert!(verified < attempting);
        assert!(attempting < public);
        assert!(matches!(events[public + 1], StatusEvent::Message(_)));
        assert_eq!(events.last(), Some(&StatusEvent::Complete));
        assert_eq!(count_complete(&events), 1);
        assert!(!events.iter().any(|e| matches!(e, StatusEvent::Failure(_))));
    }

    #[tokio::test]
    async fn permission_failure_is_not_terminal() {
        let file = existing_file();
        let h = harness(
            FakeAuth::ok(),
            FakeTransport::ok(&[]),
            FakeStore::permission_denied(),
        );

        h.worker
            .run(UploadRequest::new(file.path(), "x", Visibility::Public))
            .await;

        let events = h.status.drain_all();
        assert_eq!(
            links(&events),
            vec![(FakeStore::VERIFIED_LINK.to_string(), LinkKind::Verified)]
        );
        assert!(!events.iter().any(|e| matches!(e, StatusEvent::Failure(_))));
        assert!(events.contains(&StatusEvent::Message(
            "The file remains private. You can change sharing manually in Google Drive.".into()
        )));
        assert_eq!(events.last(), Some(&StatusEvent::Complete));
    }

    #[tokio::test]
    async fn transport_failure_resets_progress_and_skips_verify() {
        let file = existing_file();
        let store = FakeStore::ok();
        let verify_calls = store.verify_calls.clone();
        let h = harness(FakeAuth::ok(), FakeTransport::failing_after(&[0.3]), store);

        h.worker
            .run(UploadRequest::new(file.path(), "x", Visibility::Public))
            .await;

        let events = h.status.drain_all();
        assert!(events.iter().any(|e| matches!(e, StatusEvent::Failure(_))));
        assert!(links(&events).is_empty());
        assert_eq!(h.progress.drain_latest(), Some(0));
        assert_eq!(verify_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(count_complete(&events), 1);
    }

    #[tokio::test]
    async fn verify_failure_is_terminal() {
        let file = existing_file();
        let store = FakeStore::missing();
        let publish_calls = store.publish_calls.clone();
        let h = harness(FakeAuth::ok(), FakeTransport::ok(&[]), store);

        h.worker
            .run(UploadRequest::new(file.path(), "x", Visibility::Public))
            .await;

        let events = h.status.drain_all();
        assert!(links(&events).is_empty());
        let failure = events
            .iter()
            .position(|e| matches!(e, StatusEvent::Failure(_)))
            .unwrap();
        assert_eq!(
            events[failure + 1],
            StatusEvent::Message("The file was not uploaded successfully. Please try again.".into())
        );
        assert_eq!(publish_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(events.last(), Some(&StatusEvent::Complete));
    }

    #[tokio::test]
    async fn cancelled_upload_is_reported_as_failure() {
        let file = existing_file();
        let h = harness(FakeAuth::ok(), FakeTransport::ok(&[0.2, 0.4]), FakeStore::ok());
        h.worker.cancel.cancel();

        h.worker
            .run(UploadRequest::new(file.path(), "x", Visibility::Private))
            .await;

        let events = h.status.drain_all();
        assert!(events
            .iter()
            .any(|e| matches!(e, StatusEvent::Failure(text) if text.contains("cancelled"))));
        assert!(links(&events).is_empty());
        assert_eq!(h.progress.drain_latest(), Some(0));
        assert_eq!(events.last(), Some(&StatusEvent::Complete));
    }

    #[test]
    fn panic_inside_lifecycle_still_completes() {
        let (status_tx, status) = status_channel();
        let (progress_tx, progress) = progress_channel();

        let handle = std::thread::spawn(move || {
            let _guard = LifecycleGuard {
                status: status_tx,
                progress: progress_tx,
            };
            panic!("boom");
        });
        assert!(handle.join().is_err());

        let events = status.drain_all();
        assert!(matches!(events[0], StatusEvent::Failure(_)));
        assert_eq!(events[1], StatusEvent::Complete);
        assert_eq!(progress.drain_latest(), Some(0));
    }
}
