use super::state::LogLevel;
use super::DriveUploader;
use crate::upload::Visibility;
use crate::utils::file_size::describe_file;
use egui::{Color32, RichText};
use rfd::FileDialog;
use std::time::Instant;

const ACCENT: Color32 = Color32::from_rgb(161, 89, 225);
const ERROR_RED: Color32 = Color32::from_rgb(220, 50, 50);

impl DriveUploader {
    pub fn render(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(12.0);
            ui.vertical_centered(|ui| {
                ui.heading("Google Drive Uploader");
                ui.add_space(3.0);
                ui.label(
                    RichText::new("Upload a file to your Drive and share it by link")
                        .color(ui.visuals().text_color().gamma_multiply(0.7)),
                );
            });
            ui.add_space(12.0);

            let uploading = self.controller.is_uploading();

            ui.group(|ui| {
                ui.label(RichText::new("File").strong());
                ui.horizontal(|ui| {
                    let browse = ui.add_enabled(!uploading, egui::Button::new("📁 Browse..."));
                    if browse.clicked() {
                        match FileDialog::new().pick_file() {
                            Some(path) => self.controller.select_file(path),
                            None => self.controller.selection_cancelled(),
                        }
                    }
                    match self.controller.selected_file() {
                        Some(path) => ui.label(describe_file(path)),
                        None => ui.label("No file selected"),
                    };
                });
            });

            ui.add_space(8.0);

            ui.group(|ui| {
                ui.label(RichText::new("Upload options").strong());
                ui.horizontal(|ui| {
                    ui.label("Name on Drive:");
                    ui.add_enabled(
                        !uploading,
                        egui::TextEdit::singleline(&mut self.controller.form.remote_name)
                            .desired_width(f32::INFINITY),
                    );
                });
                ui.add_enabled_ui(!uploading, |ui| {
                    ui.horizontal(|ui| {
                        ui.label("Visibility:");
                        ui.radio_value(
                            &mut self.controller.form.visibility,
                            Visibility::Private,
                            "Private (default)",
                        );
                        ui.radio_value(
                            &mut self.controller.form.visibility,
                            Visibility::Public,
                            "Public (anyone with the link)",
                        );
                    });
                });
            });

            ui.add_space(10.0);

            ui.vertical_centered(|ui| {
                ui.horizontal(|ui| {
                    let label = if uploading {
                        "⏳ Uploading..."
                    } else {
                        "📤 Upload to Drive"
                    };
                    let upload = egui::Button::new(label).min_size(egui::vec2(180.0, 36.0));
                    if ui.add_enabled(!uploading, upload).clicked() {
                        self.start_upload();
                    }
                    if uploading && ui.button("Cancel").clicked() {
                        self.controller.cancel();
                    }
                    if ui
                        .add_enabled(!uploading, egui::Button::new("Sign out"))
                        .on_hover_text("Forget the stored Google token")
                        .clicked()
                    {
                        self.sign_out();
                    }
                });
            });

            ui.add_space(10.0);

            ui.group(|ui| {
                ui.label(RichText::new("Progress").strong());
                let progress = egui::ProgressBar::new(self.controller.view.progress_fraction())
                    .show_percentage()
                    .animate(uploading)
                    .fill(ACCENT);
                ui.add(progress);
            });

            ui.add_space(8.0);

            ui.group(|ui| {
                ui.label(RichText::new("File link").strong());
                ui.horizontal(|ui| {
                    let mut link = self.controller.view.link.as_str();
                    ui.add(
                        egui::TextEdit::singleline(&mut link)
                            .desired_width(ui.available_width() - 90.0),
                    );
                    let caption = self.controller.view.copy_label(Instant::now());
                    let copy = ui.add_enabled(
                        self.controller.view.copy_enabled,
                        egui::Button::new(caption),
                    );
                    if copy.clicked() {
                        if let Some(link) = self.controller.copy_link() {
                            ui.ctx().output_mut(|o| o.copied_text = link);
                        }
                    }
                });
            });

            ui.add_space(8.0);
            self.render_log(ui);
        });
    }

    fn render_log(&self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.label(RichText::new("Status / errors").strong());
            egui::ScrollArea::vertical()
                .max_height(ui.available_height().max(80.0))
                .stick_to_bottom(true)
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    egui::Frame::none()
                        .fill(ui.style().visuals.extreme_bg_color)
                        .show(ui, |ui| {
                            ui.set_width(ui.available_width());
                            for line in &self.controller.view.log {
                                let text = format!("[{}] {}", line.time, line.text);
                                match line.level {
                                    LogLevel::Info => ui.label(text),
                                    LogLevel::Error => ui.colored_label(ERROR_RED, text),
                                };
                            }
                        });
                });
        });
    }
}
