mod audio;
mod gui;

use audio::{CpalHost, DEFAULT_SOURCE};
use fftspectrum::{cpu, Config, SpectrumSource};
use gui::AnalyzerApp;
use std::sync::Arc;

fn main() -> Result<(), eframe::Error> {
    //
    // Initialize logging with default filter set to "info".
    //
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting real-time audio spectrum analyzer...");
    cpu::log_capabilities();

    //
    // Open the input device. Without one the pipeline still runs, silent.
    //
    let device = match audio::open_default_input() {
        Ok(device) => Some(device),
        Err(err) => {
            log::error!("{}", err);
            None
        }
    };
    let host = device.as_ref().map_or_else(CpalHost::offline, |device| device.host());
    let device_name = device
        .as_ref()
        .map_or("no input device", |device| device.name())
        .to_string();

    let config = Config {
        audio_source: DEFAULT_SOURCE.to_string(),
        ..Default::default()
    };
    let source = Arc::new(SpectrumSource::new(config, Arc::new(host)));

    let audio_stream = device.and_then(|device| match device.start(source.clone()) {
        Ok(stream) => Some(stream),
        Err(err) => {
            log::error!("{}", err);
            None
        }
    });

    //
    // Initialize GUI configuration.
    //
    log::info!("Initializing GUI...");
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([860.0, 400.0])
            .with_min_inner_size([860.0, 360.0])
            .with_title("fftspectrum"),
        ..Default::default()
    };

    eframe::run_native(
        "fftspectrum",
        options,
        Box::new(move |cc| {
            gui::theme::setup_global_style(&cc.egui_ctx);
            Ok(Box::new(AnalyzerApp::new(cc, source, audio_stream, &device_name)))
        }),
    )
}
