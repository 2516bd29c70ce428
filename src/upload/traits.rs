use crate::channels::StatusSender;
use crate::error::{AuthError, NotFoundError, PermissionError, TransportError};
use crate::upload::types::{CancelToken, SessionHandle, UploadedObject};
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Returns a usable session, reporting progress lines on `status`.
    async fn session(&self, status: &StatusSender) -> Result<SessionHandle, AuthError>;
}

#[async_trait]
pub trait UploadTransport: Send + Sync {
    /// Sends the file in chunks. `on_progress` receives the acknowledged
    /// fraction after each intermediate chunk; `cancel` is checked between
    /// chunks.
    async fn send(
        &self,
        session: &SessionHandle,
        local_path: &Path,
        remote_name: &str,
        cancel: &CancelToken,
        on_progress: &mut (dyn FnMut(f64) + Send),
    ) -> Result<UploadedObject, TransportError>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Reads the object back and returns its view link.
    async fn verify(&self, session: &SessionHandle, id: &str) -> Result<String, NotFoundError>;

    /// Grants anyone-with-link read access and returns the refreshed view link.
    async fn make_public(
        &self,
        session: &SessionHandle,
        id: &str,
    ) -> Result<String, PermissionError>;
}
