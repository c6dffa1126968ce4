//! Main window: upload controls, sample gallery, preview and results.

mod palette;
mod results;
mod settings;

use crate::config::AppConfig;
use eframe::{App, Frame, egui};
use mri_core::{CandidateFile, HttpPredictionClient, SessionDriver, SessionState, list_samples};
use rfd::FileDialog;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const PREVIEW_MAX_PX: u32 = 512;
const MAX_LOG_LINES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Panel {
    Results,
    Settings,
}

/// Texture for the preview of one cycle.
struct PreviewTexture {
    key: (u64, String),
    texture: Option<egui::TextureHandle>,
}

pub struct UiApp {
    driver: SessionDriver,
    config: AppConfig,
    samples: Vec<CandidateFile>,
    panel: Panel,
    status: String,
    log: VecDeque<String>,
    preview: Option<PreviewTexture>,
    endpoint_input: String,
    timeout_secs: u64,
    samples_dir_input: String,
    app_version: &'static str,
}

impl UiApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: AppConfig) -> anyhow::Result<Self> {
        let client = HttpPredictionClient::new(&config.client)?;
        let ctx = cc.egui_ctx.clone();
        let driver = SessionDriver::new(Arc::new(client)).with_waker(move || ctx.request_repaint());

        let mut app = Self {
            driver,
            endpoint_input: config.client.base_url.clone(),
            timeout_secs: config.client.timeout.map(|t| t.as_secs()).unwrap_or(0),
            samples_dir_input: config.samples_dir.display().to_string(),
            config,
            samples: Vec::new(),
            panel: Panel::Results,
            status: String::new(),
            log: VecDeque::new(),
            preview: None,
            app_version: env!("NEUROSCAN_VERSION"),
        };
        app.reload_samples();
        Ok(app)
    }

    fn reload_samples(&mut self) {
        match list_samples(&self.config.samples_dir) {
            Ok(samples) => {
                tracing::info!("Loaded {} sample scans", samples.len());
                self.samples = samples;
            }
            Err(e) => {
                tracing::warn!("No samples available: {e:#}");
                self.samples.clear();
            }
        }
    }

    fn push_log(&mut self, line: String) {
        let stamp = chrono::Local::now().format("%H:%M:%S");
        self.log.push_back(format!("{stamp}  {line}"));
        while self.log.len() > MAX_LOG_LINES {
            self.log.pop_front();
        }
        self.status = line;
    }

    fn submit(&mut self, file: CandidateFile) {
        // rejections surface as notices
        if let Err(e) = self.driver.select(file) {
            tracing::debug!("Selection rejected: {e}");
        }
        self.panel = Panel::Results;
    }

    fn pick_file(&mut self) {
        let Some(path) = FileDialog::new()
            .add_filter("Images", &["jpg", "jpeg", "png", "gif", "bmp", "webp"])
            .pick_file()
        else {
            return;
        };
        self.open_path(&path);
    }

    fn open_path(&mut self, path: &Path) {
        match CandidateFile::from_path(path) {
            Ok(file) => self.submit(file),
            Err(e) => self.push_log(format!("Cannot open {}: {e:#}", path.display())),
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        // one upload at a time; the last drop wins
        let Some(file) = dropped.into_iter().last() else {
            return;
        };
        if let Some(path) = &file.path {
            self.open_path(path);
        } else if let Some(bytes) = &file.bytes {
            let mime = Some(file.mime.clone());
            self.submit(CandidateFile::from_bytes(file.name.clone(), mime, Arc::clone(bytes)));
        }
    }

    fn drain_notices(&mut self) {
        for notice in self.driver.take_notices() {
            self.push_log(notice.to_string());
        }
    }

    /// Texture for the current preview, decoded once per cycle.
    fn preview_texture(&mut self, ctx: &egui::Context) -> Option<egui::TextureHandle> {
        let session = self.driver.session();
        let (Some(cycle), Some(image)) = (session.state().cycle(), session.image()) else {
            self.preview = None;
            return None;
        };
        let key = (cycle.get(), image.file_name().to_string());
        if self.preview.as_ref().map(|p| &p.key) != Some(&key) {
            let texture = match decode_preview(image.decode_bytes()) {
                Ok(color) => Some(ctx.load_texture(
                    format!("preview:{}", key.1),
                    color,
                    egui::TextureOptions::LINEAR,
                )),
                Err(e) => {
                    tracing::warn!("Cannot display preview of {}: {e:#}", key.1);
                    None
                }
            };
            self.preview = Some(PreviewTexture { key, texture });
        }
        self.preview.as_ref().and_then(|p| p.texture.clone())
    }

    fn export_result(&mut self) {
        let Some(result) = self.driver.session().result() else {
            return;
        };
        let mut dialog = FileDialog::new()
            .add_filter("CSV", &["csv"])
            .set_file_name("neuroscan_result.csv");
        if let Some(dirs) = directories_next::UserDirs::new()
            && let Some(docs) = dirs.document_dir()
        {
            dialog = dialog.set_directory(docs);
        }
        let Some(path) = dialog.save_file() else {
            return;
        };
        let line = match mri_core::export_csv(result, &path) {
            Ok(()) => format!("CSV exported: {}", path.display()),
            Err(e) => format!("Export failed: {e:#}"),
        };
        self.push_log(line);
    }

    fn render_top_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Choose scan...").clicked() {
                self.pick_file();
            }

            let can_reset = !matches!(self.driver.session().state(), SessionState::Idle);
            if ui
                .add_enabled(can_reset, egui::Button::new("Reset"))
                .clicked()
            {
                self.driver.reset();
                self.preview = None;
                self.push_log("Session reset.".to_string());
            }

            let can_export = self.driver.session().result().is_some();
            if ui
                .add_enabled(can_export, egui::Button::new("Export CSV"))
                .clicked()
            {
                self.export_result();
            }

            ui.separator();
            ui.selectable_value(&mut self.panel, Panel::Results, "Results");
            ui.selectable_value(&mut self.panel, Panel::Settings, "Settings");

            if !self.status.is_empty() {
                ui.separator();
                ui.label(&self.status);
            }
        });
    }

    fn render_samples(&mut self, ui: &mut egui::Ui) {
        ui.heading("Samples");
        ui.add_space(6.0);
        if self.samples.is_empty() {
            ui.label(format!(
                "No sample scans in {}",
                self.config.samples_dir.display()
            ));
            return;
        }
        let mut chosen = None;
        for (idx, sample) in self.samples.iter().enumerate() {
            if ui.button(sample.name()).clicked() {
                chosen = Some(idx);
            }
        }
        if let Some(idx) = chosen {
            let sample = self.samples[idx].clone();
            self.submit(sample);
        }
    }
}

fn decode_preview(
    bytes: Result<Vec<u8>, mri_core::PreviewError>,
) -> anyhow::Result<egui::ColorImage> {
    let img = image::load_from_memory(&bytes?)?;
    let thumb = img.thumbnail(PREVIEW_MAX_PX, PREVIEW_MAX_PX).to_rgba8();
    let (w, h) = thumb.dimensions();
    let pixels = thumb.into_raw();
    Ok(egui::ColorImage::from_rgba_unmultiplied(
        [w as usize, h as usize],
        &pixels,
    ))
}

impl App for UiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.driver.poll();
        self.handle_dropped_files(ctx);
        self.drain_notices();

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            self.render_top_bar(ui);
        });

        egui::TopBottomPanel::bottom("log")
            .resizable(true)
            .default_height(90.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .stick_to_bottom(true)
                    .auto_shrink([false; 2])
                    .show(ui, |ui| {
                        for line in &self.log {
                            ui.monospace(line);
                        }
                    });
            });

        egui::SidePanel::left("samples")
            .default_width(180.0)
            .show(ctx, |ui| {
                self.render_samples(ui);
            });

        let preview = self.preview_texture(ctx);
        egui::CentralPanel::default().show(ctx, |ui| match self.panel {
            Panel::Results => self.render_results_panel(ui, preview.as_ref()),
            Panel::Settings => self.render_settings_panel(ui),
        });

        if ctx.input(|i| !i.raw.hovered_files.is_empty()) {
            let painter = ctx.layer_painter(egui::LayerId::new(
                egui::Order::Foreground,
                egui::Id::new("drop-target"),
            ));
            let rect = ctx.screen_rect();
            painter.rect_filled(rect, 0.0, egui::Color32::from_black_alpha(160));
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "Drop the scan to analyze it",
                egui::FontId::proportional(24.0),
                egui::Color32::WHITE,
            );
        }

        if self.driver.session().is_loading() {
            // workers wake us, this is only a safety net
            ctx.request_repaint_after(Duration::from_millis(250));
        }
    }
}
