//! In-memory collaborators for lifecycle tests.

use crate::channels::StatusSender;
use crate::error::{AuthError, NotFoundError, PermissionError, TransportError};
use crate::upload::traits::{AuthProvider, ObjectStore, UploadTransport};
use crate::upload::types::{CancelToken, SessionHandle, UploadedObject};
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub struct FakeAuth {
    fail: bool,
}

impl FakeAuth {
    pub fn ok() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl AuthProvider for FakeAuth {
    async fn session(&self, _status: &StatusSender) -> Result<SessionHandle, AuthError> {
        if self.fail {
            Err(AuthError::Cancelled("access_denied".into()))
        } else {
            Ok(SessionHandle::new("fake-token"))
        }
    }
}

pub struct FakeTransport {
    fractions: Vec<f64>,
    fail: bool,
}

impl FakeTransport {
    pub const OBJECT_ID: &'static str = "file-123";

    pub fn ok(fractions: &[f64]) -> Self {
        Self {
            fractions: fractions.to_vec(),
            fail: false,
        }
    }

    pub fn failing_after(fractions: &[f64]) -> Self {
        Self {
            fractions: fractions.to_vec(),
            fail: true,
        }
    }
}

#[async_trait]
impl UploadTransport for FakeTransport {
    async fn send(
        &self,
        _session: &SessionHandle,
        _local_path: &Path,
        _remote_name: &str,
        cancel: &CancelToken,
        on_progress: &mut (dyn FnMut(f64) + Send),
    ) -> Result<UploadedObject, TransportError> {
        for fraction in &self.fractions {
            if cancel.is_cancelled() {
                return Err(TransportError::Cancelled);
            }
            on_progress(*fraction);
        }
        if self.fail {
            return Err(TransportError::Status {
                status: 503,
                body: "backend error".into(),
            });
        }
        Ok(UploadedObject {
            id: Self::OBJECT_ID.into(),
            view_link: Some(FakeStore::VERIFIED_LINK.into()),
        })
    }
}

pub struct FakeStore {
    verify_ok: bool,
    publish_ok: bool,
    pub verify_calls: Arc<AtomicUsize>,
    pub publish_calls: Arc<AtomicUsize>,
}

impl FakeStore {
    pub const VERIFIED_LINK: &'static str = "https://drive.google.com/file/d/file-123/view";
    pub const PUBLIC_LINK: &'static str =
        "https://drive.google.com/file/d/file-123/view?usp=sharing";

    fn with(verify_ok: bool, publish_ok: bool) -> Self {
        Self {
            verify_ok,
            publish_ok,
            verify_calls: Arc::new(AtomicUsize::new(0)),
            publish_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn ok() -> Self {
        Self::with(true, true)
    }

    pub fn missing() -> Self {
        Self::with(false, true)
    }

    pub fn permission_denied() -> Self {
        Self::with(true, false)
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn verify(&self, _session: &SessionHandle, id: &str) -> Result<String, NotFoundError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        if self.verify_ok {
            Ok(Self::VERIFIED_LINK.into())
        } else {
            Err(NotFoundError::new(id, "status 404"))
        }
    }

    async fn make_public(
        &self,
        _session: &SessionHandle,
        id: &str,
    ) -> Result<String, PermissionError> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        if self.publish_ok {
            Ok(Self::PUBLIC_LINK.into())
        } else {
            Err(PermissionError::new(id, "status 403"))
        }
    }
}
