use drive_uploader::app::DriveUploader;
use drive_uploader::config::{self, UploaderConfig};
use eframe::CreationContext;
use log::info;

fn main() -> Result<(), eframe::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = config::default_config_path();
    let config = UploaderConfig::load_or_default(&config_path);
    info!(
        "Using client secrets {} and token {}",
        config.client_secrets_path.display(),
        config.token_path.display()
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([560.0, 620.0])
            .with_min_inner_size([440.0, 520.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Google Drive Uploader",
        options,
        Box::new(move |cc: &CreationContext| Box::new(DriveUploader::new(cc, config))),
    )
}
