mod traits;
mod types;
mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use traits::{AuthProvider, ObjectStore, UploadTransport};
pub use types::{
    percent_of, CancelToken, LinkKind, SessionHandle, StatusEvent, UploadRequest, UploadedObject,
    Visibility,
};
pub use worker::{Services, UploadWorker};
