mod backend_bridge;
mod controller;
mod ui;

use client_core::ClientSettings;
use crossbeam_channel::bounded;
use eframe::egui;

use crate::{backend_bridge::commands::BackendCommand, controller::events::UiEvent, ui::FruitApp};

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = ClientSettings::load().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "invalid client settings; using defaults");
        ClientSettings::default()
    });

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(64);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(256);
    backend_bridge::runtime::launch(settings, cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Fruit Identifier")
            .with_inner_size([560.0, 640.0])
            .with_min_inner_size([380.0, 420.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Fruit Identifier",
        options,
        Box::new(|_cc| Ok(Box::new(FruitApp::new(cmd_tx, ui_rx)))),
    )
}
