//! Chatter Desktop: application entry.

mod app;

fn main() -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([900.0, 700.0])
            .with_min_inner_size([480.0, 400.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Chatter",
        options,
        Box::new(|cc| Box::new(app::ChatterApp::new(cc))),
    )
}
