mod clicker;
mod config;
mod error;
mod hook;
mod hotkey;
mod key;
mod panel;
mod random;
mod toggle;

use clap::Parser;
use eframe::egui;
use std::sync::Arc;
use tracing::info;

use crate::{
    clicker::EnigoClicker,
    config::{init_logging, Cli},
    panel::ControlPanel,
    random::RandomSource,
    toggle::ToggleController,
};

fn main() -> eframe::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log);

    let seed = match cli.seed {
        Some(seed) => seed,
        None => random::fetch_seed(&cli.seed_url, cli.seed_timeout()),
    };
    let random = Arc::new(RandomSource::new(seed));
    info!(seed = random.seed(), "initialized random source");

    let settings = cli.click_settings();
    info!(workers = settings.workers, interval = ?settings.base_interval, "click settings");

    let controller = ToggleController::new(
        settings,
        Arc::new(EnigoClicker),
        random,
        hook::global_hub(),
    );
    controller.arm(cli.key);

    let mut opts = eframe::NativeOptions::default();
    opts.viewport.inner_size = Some(egui::vec2(300.0, 220.0));
    opts.viewport.resizable = Some(false);
    opts.follow_system_theme = false;

    eframe::run_native(
        "simpleclick",
        opts,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
            Box::new(ControlPanel::new(controller))
        }),
    )
}
