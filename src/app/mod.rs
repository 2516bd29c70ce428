mod controller;
mod reconciler;
mod state;
mod ui;

pub use controller::UploadController;
pub use reconciler::{TickReport, UiReconciler};
pub use state::{LogLevel, LogLine, UploadForm, UploadOutcome, UploadView};

use crate::config::UploaderConfig;
use crate::drive::{DriveClient, OAuthProvider};
use crate::upload::Services;
use eframe::App;
use log::info;
use std::sync::Arc;
use std::time::Duration;

pub struct DriveUploader {
    controller: UploadController,
    oauth: Arc<OAuthProvider>,
    poll_interval: Duration,
}

impl DriveUploader {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: UploaderConfig) -> Self {
        info!("Initializing Google Drive uploader");
        let oauth = Arc::new(OAuthProvider::from_config(&config));
        let drive = Arc::new(DriveClient::new(&config));
        let services = Services {
            auth: oauth.clone(),
            transport: drive.clone(),
            store: drive,
        };

        Self {
            controller: UploadController::new(services),
            oauth,
            poll_interval: config.poll_interval(),
        }
    }

    pub fn start_upload(&mut self) {
        let request = self.controller.request();
        if let Err(e) = self.controller.submit(request) {
            info!("Upload request rejected: {}", e);
            rfd::MessageDialog::new()
                .set_level(rfd::MessageLevel::Warning)
                .set_title("Notice")
                .set_description(e.to_string())
                .set_buttons(rfd::MessageButtons::Ok)
                .show();
        }
    }

    pub fn sign_out(&mut self) {
        match self.oauth.forget() {
            Ok(()) => self
                .controller
                .view
                .append_log("Signed out. The next upload will ask for access again."),
            Err(e) => self
                .controller
                .view
                .append_error(format!("Could not remove the stored token: {}", e)),
        }
    }
}

impl App for DriveUploader {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.controller.poll();
        self.render(ctx);
        ctx.request_repaint_after(self.poll_interval);
    }
}
