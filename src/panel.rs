use eframe::egui::{self, Color32, RichText};
use std::{sync::Arc, time::Duration};

use crate::{hotkey::Toggle, toggle::ToggleController};

/// How long closing the window waits for click workers to wind down.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

/// Status readout plus toggle and rebind controls.
pub struct ControlPanel {
    controller: Arc<ToggleController>,
    key_input: String,
    key_error: Option<String>,
}

impl ControlPanel {
    pub fn new(controller: Arc<ToggleController>) -> Self {
        Self {
            controller,
            key_input: String::new(),
            key_error: None,
        }
    }

    /// Rebind to whatever is in the text box. Blank input is ignored.
    fn apply_key(&mut self) {
        if self.key_input.trim().is_empty() {
            return;
        }
        match self.controller.set_toggle_key(&self.key_input) {
            Ok(_) => {
                self.key_error = None;
                self.key_input.clear();
            }
            Err(err) => self.key_error = Some(err.to_string()),
        }
    }

    fn current_key(&self) -> String {
        self.controller
            .toggle_key()
            .map_or_else(|| "none".to_owned(), |k| k.to_string())
    }
}

impl eframe::App for ControlPanel {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                let (status, color) = if self.controller.is_enabled() {
                    ("Status: ON", Color32::GREEN)
                } else {
                    ("Status: OFF", Color32::RED)
                };
                ui.label(RichText::new(status).color(color).size(18.0));

                if ui.button("Toggle Autoclicker").clicked() {
                    self.controller.toggle();
                }

                ui.separator();
                ui.label(format!("Set Keybind (current: {}):", self.current_key()));
                let entry = ui.text_edit_singleline(&mut self.key_input);
                let submitted = entry.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if ui.button("Set Keybind").clicked() || submitted {
                    self.apply_key();
                }
                if let Some(err) = &self.key_error {
                    ui.colored_label(Color32::LIGHT_RED, err);
                }
            });
        });

        // The hotkey flips state behind our back; keep the label fresh.
        ctx.request_repaint_after(Duration::from_millis(100));
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.controller.shutdown(SHUTDOWN_GRACE);
    }
}
