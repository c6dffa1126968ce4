//! Settings panel rendering for the prediction endpoint and sample folder.

use super::{Panel, UiApp};
use eframe::egui;
use mri_core::{ClientConfig, HttpPredictionClient};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

impl UiApp {
    /// Renders the settings screen for the endpoint, timeout and samples.
    pub(super) fn render_settings_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Settings");
        ui.add_space(8.0);
        ui.horizontal(|ui| {
            ui.label("Prediction service");
            ui.text_edit_singleline(&mut self.endpoint_input);
        });
        ui.label(format!(
            "Scans are posted to {}",
            ClientConfig::new(self.endpoint_input.trim()).endpoint()
        ));
        ui.add_space(6.0);
        ui.horizontal(|ui| {
            ui.label("Request timeout (s, 0 = default)");
            ui.add(
                egui::DragValue::new(&mut self.timeout_secs)
                    .range(0..=600)
                    .speed(1),
            );
        });
        if ui.button("Apply").clicked() {
            self.apply_endpoint();
        }

        ui.add_space(12.0);
        ui.separator();
        ui.add_space(6.0);
        ui.horizontal(|ui| {
            ui.label("Sample folder");
            ui.text_edit_singleline(&mut self.samples_dir_input);
            if ui.button("Reload").clicked() {
                self.config.samples_dir = PathBuf::from(self.samples_dir_input.trim());
                self.reload_samples();
                let line = format!("{} sample scans loaded.", self.samples.len());
                self.push_log(line);
            }
        });

        ui.add_space(16.0);
        ui.separator();
        ui.add_space(6.0);
        ui.heading("Versions");
        ui.label(format!("App version: {}", self.app_version));
        ui.label(format!(
            "Upload limit: {} MB",
            mri_core::MAX_UPLOAD_BYTES / (1024 * 1024)
        ));
    }

    /// Rebuild the client for the edited endpoint. Uploads already in flight
    /// finish against the previous one.
    fn apply_endpoint(&mut self) {
        let url = self.endpoint_input.trim().to_string();
        if url.is_empty() {
            self.push_log("The prediction service URL cannot be empty.".to_string());
            return;
        }
        let config = ClientConfig {
            base_url: url.clone(),
            timeout: (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs)),
        };
        match HttpPredictionClient::new(&config) {
            Ok(client) => {
                tracing::info!(endpoint = client.endpoint(), "Prediction endpoint changed");
                self.driver.set_service(Arc::new(client));
                self.push_log(format!("Prediction service set to {}", config.endpoint()));
                self.config.client = config;
                self.panel = Panel::Results;
            }
            Err(e) => self.push_log(format!("Cannot use {url}: {e}")),
        }
    }
}
