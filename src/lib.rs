//! Desktop uploader for Google Drive.
//!
//! The upload itself runs on a background thread ([`upload::UploadWorker`])
//! and reports through two channels ([`channels`]); the window drains them on
//! every frame through [`app::UiReconciler`].

pub mod app;
pub mod channels;
pub mod config;
pub mod drive;
pub mod error;
pub mod upload;
pub mod utils;
