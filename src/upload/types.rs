use derivative::Derivative;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Private,
    Public,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Private => write!(f, "private"),
            Visibility::Public => write!(f, "public"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub local_path: PathBuf,
    pub remote_name: String,
    pub visibility: Visibility,
}

impl UploadRequest {
    pub fn new(
        local_path: impl Into<PathBuf>,
        remote_name: impl Into<String>,
        visibility: Visibility,
    ) -> Self {
        Self {
            local_path: local_path.into(),
            remote_name: remote_name.into(),
            visibility,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// The object exists under its default permissions.
    Verified,
    /// Anyone with the link can view the object.
    Public,
}

/// One entry on the status channel, in the order the worker produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    Message(String),
    Link { url: String, kind: LinkKind },
    Failure(String),
    Complete,
}

/// Opaque authenticated context for Drive calls.
#[derive(Derivative, Clone, PartialEq, Eq)]
#[derivative(Debug)]
pub struct SessionHandle {
    #[derivative(Debug = "ignore")]
    access_token: String,
}

impl SessionHandle {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedObject {
    pub id: String,
    pub view_link: Option<String>,
}

/// Shared flag checked by the transport between chunks.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Converts a completion fraction into a whole percentage in `0..=100`.
pub fn percent_of(fraction: f64) -> u8 {
    if !fraction.is_finite() {
        return 0;
    }
    (fraction.clamp(0.0, 1.0) * 100.0).floor() as u8
}
