mod app;
mod config;

use app::UiApp;
use config::AppConfig;
use eframe::NativeOptions;

fn main() {
    tracing_subscriber::fmt::init();
    let config = AppConfig::from_env();
    tracing::info!(
        endpoint = %config.client.endpoint(),
        samples = %config.samples_dir.display(),
        "Starting NeuroScan {}",
        env!("NEUROSCAN_VERSION")
    );

    let options = NativeOptions::default();
    if let Err(e) = eframe::run_native(
        "NeuroScan",
        options,
        Box::new(
            move |cc| -> Result<Box<dyn eframe::App>, Box<dyn std::error::Error + Send + Sync>> {
                let app = UiApp::new(cc, config)?;
                Ok(Box::new(app))
            },
        ),
    ) {
        eprintln!("Application stopped with error: {e}");
    }
}
