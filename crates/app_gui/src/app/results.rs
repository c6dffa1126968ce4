//! Results panel: preview next to the ranked predictions.

use super::UiApp;
use super::palette::style_for;
use eframe::egui;
use mri_core::{ClassificationResult, SessionState};

const PREVIEW_SIZE: f32 = 320.0;

impl UiApp {
    pub(super) fn render_results_panel(
        &self,
        ui: &mut egui::Ui,
        preview: Option<&egui::TextureHandle>,
    ) {
        let session = self.driver.session();
        match session.state() {
            SessionState::Idle => {
                ui.heading("Upload a brain MRI scan");
                ui.label("Choose a file, drop one onto this window, or pick a sample on the left.");
                ui.label(format!(
                    "JPG or PNG, at most {} MB.",
                    mri_core::MAX_UPLOAD_BYTES / (1024 * 1024)
                ));
                return;
            }
            SessionState::Previewing { file_name, .. } | SessionState::Loading { file_name, .. } => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.heading(format!("Analyzing {file_name}..."));
                });
            }
            SessionState::Loaded { file_name, .. } => {
                ui.heading(format!("Results for {file_name}"));
            }
            SessionState::FallbackLoaded {
                file_name, reason, ..
            } => {
                ui.heading(format!("Results for {file_name}"));
                ui.colored_label(
                    egui::Color32::from_rgb(219, 138, 34),
                    "Demo mode: the prediction service could not be used.",
                )
                .on_hover_text(reason.to_string());
            }
        }
        ui.add_space(8.0);

        ui.horizontal_top(|ui| {
            paint_preview(ui, preview);
            ui.add_space(16.0);
            ui.vertical(|ui| match session.result() {
                Some(result) => render_predictions(ui, result),
                None => {
                    ui.label("Waiting for the classifier...");
                }
            });
        });
    }
}

fn paint_preview(ui: &mut egui::Ui, preview: Option<&egui::TextureHandle>) {
    let Some(texture) = preview else {
        let (resp, painter) =
            ui.allocate_painter(egui::Vec2::splat(PREVIEW_SIZE), egui::Sense::hover());
        painter.rect_filled(resp.rect, 4.0, egui::Color32::from_gray(40));
        painter.rect_stroke(
            resp.rect,
            4.0,
            egui::Stroke::new(1.0, egui::Color32::DARK_GRAY),
            egui::StrokeKind::Inside,
        );
        return;
    };
    let size = texture.size_vec2();
    let scale = (PREVIEW_SIZE / size.x.max(size.y)).min(1.0);
    let (resp, painter) = ui.allocate_painter(size * scale, egui::Sense::hover());
    let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
    painter.image(texture.id(), resp.rect, uv, egui::Color32::WHITE);
}

fn render_predictions(ui: &mut egui::Ui, result: &ClassificationResult) {
    let primary = result.primary();
    let style = style_for(primary.class);
    ui.label(
        egui::RichText::new(format!("{} {}", style.icon, primary.class))
            .size(22.0)
            .strong()
            .color(style.color),
    );
    ui.label(format!("Confidence {:.1}%", primary.confidence));
    ui.add_space(10.0);

    for prediction in result.predictions() {
        let style = style_for(prediction.class);
        ui.horizontal(|ui| {
            ui.colored_label(style.color, style.icon);
            ui.add_sized(
                [150.0, 18.0],
                egui::Label::new(prediction.class.label()),
            );
            let fraction = (prediction.confidence / 100.0).clamp(0.0, 1.0) as f32;
            ui.add(
                egui::ProgressBar::new(fraction)
                    .desired_width(220.0)
                    .fill(style.color)
                    .text(format!("{:.1}%", prediction.confidence)),
            );
        });
    }

    if result.is_fallback() {
        ui.add_space(6.0);
        ui.small("These values are a fixed demonstration, not a diagnosis.");
    }
}
