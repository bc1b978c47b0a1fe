use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use egui::TextureHandle;

use crate::{
    backend_bridge::commands::BackendCommand,
    controller::{events::UiEvent, orchestration::dispatch_backend_command, reducer::ViewModel},
};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

struct PreviewTexture {
    uri: String,
    texture: TextureHandle,
    size: egui::Vec2,
}

pub struct FruitApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    view: ViewModel,
    preview: Option<PreviewTexture>,
}

impl FruitApp {
    pub fn new(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            view: ViewModel::default(),
            preview: None,
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            self.view.apply(event);
        }
    }

    /// Keeps at most one preview texture alive, matching the current
    /// selection. Replaced textures are freed when their handle drops.
    fn sync_preview_texture(&mut self, ctx: &egui::Context) {
        let wanted = self.view.preview.as_ref();
        let current = self.preview.as_ref().map(|preview| preview.uri.as_str());
        if wanted.map(|image| image.uri.as_str()) == current {
            return;
        }

        self.preview = wanted.map(|image| {
            let color_image =
                egui::ColorImage::from_rgba_unmultiplied([image.width, image.height], &image.rgba);
            PreviewTexture {
                uri: image.uri.clone(),
                texture: ctx.load_texture(
                    image.uri.clone(),
                    color_image,
                    egui::TextureOptions::LINEAR,
                ),
                size: egui::vec2(image.width as f32, image.height as f32),
            }
        });
    }

    fn dispatch(&mut self, cmd: BackendCommand) -> bool {
        match dispatch_backend_command(&self.cmd_tx, cmd) {
            Some(notice) => {
                self.view.notice = Some(notice);
                false
            }
            None => true,
        }
    }

    fn choose_file(&mut self) {
        let picked = rfd::FileDialog::new()
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_file();
        if let Some(path) = picked {
            self.dispatch(BackendCommand::SelectFile { path });
        }
    }

    fn request_upload(&mut self) {
        if self.dispatch(BackendCommand::Upload) {
            self.view.upload_requested = true;
        }
    }

    fn show_workflow(&mut self, ui: &mut egui::Ui) {
        ui.heading("Fruit Identifier");
        if let Some(server_url) = &self.view.server_url {
            ui.small(egui::RichText::new(format!("Backend: {server_url}")).weak());
        }
        if let Some(error) = &self.view.startup_error {
            ui.colored_label(egui::Color32::LIGHT_RED, error);
        }
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            if ui.button("Choose image…").clicked() {
                self.choose_file();
            }
            match &self.view.selected_name {
                Some(name) => ui.label(name),
                None => ui.label(egui::RichText::new("No file selected").weak()),
            };
        });

        ui.horizontal(|ui| {
            let can_upload = self.view.can_upload();
            if ui
                .add_enabled(can_upload, egui::Button::new("Upload"))
                .clicked()
            {
                self.request_upload();
            }
            let uploading = self.view.upload_requested
                || self
                    .view
                    .snapshot
                    .as_ref()
                    .is_some_and(|snapshot| snapshot.uploading);
            if uploading {
                ui.spinner();
            }
        });

        if let Some(status) = self.view.status_line() {
            ui.label(egui::RichText::new(status).strong());
        }
        if let Some(notice) = &self.view.notice {
            ui.colored_label(egui::Color32::YELLOW, notice);
        }

        ui.add_space(8.0);
        if let Some(preview) = &self.preview {
            ui.add(egui::Image::new((preview.texture.id(), preview.size)));
        }

        ui.add_space(8.0);
        ui.label(self.view.prediction_line());
        if let Some(key) = self
            .view
            .snapshot
            .as_ref()
            .and_then(|snapshot| snapshot.viewer.object_key.as_ref())
        {
            ui.small(egui::RichText::new(format!("computed for {key}")).weak());
        }
    }
}

impl eframe::App for FruitApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        self.sync_preview_texture(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| self.show_workflow(ui));
        });

        ctx.request_repaint_after(Duration::from_millis(100));
    }
}
