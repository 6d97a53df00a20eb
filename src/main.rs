mod app;
mod docs;
mod util;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    #[arg(long, default_value = "artifacts.json")]
    graph: String,
    #[arg(long)]
    reset_layout: bool,
}

fn main() -> eframe::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "artifact-atlas",
        options,
        Box::new(move |cc| {
            Ok(Box::new(app::AtlasApp::new(
                cc,
                args.graph.clone(),
                args.reset_layout,
            )))
        }),
    )
}
