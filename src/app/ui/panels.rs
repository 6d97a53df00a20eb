use eframe::egui::{self, Align, Context, Layout};

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        manifest_path: &str,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        self.update_fps_counter(ctx);

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("artifact-atlas");
                    ui.separator();
                    ui.label(format!("manifest: {manifest_path}"));
                    ui.label(format!(
                        "nodes: {}  edges: {}",
                        self.graph.node_count(),
                        self.graph.edge_count()
                    ));
                    ui.label(format!("renderer: {}", self.strategy_kind.label()));
                    if self.restored_layout {
                        ui.label("restored layout");
                    }
                    let reload_button =
                        ui.add_enabled(!is_loading, egui::Button::new("Reload manifest"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if let Some(visible_text) = self.visible_graph_text() {
                            ui.label(visible_text);
                        }
                        if let Some(fps_text) = self.fps_display_text() {
                            ui.label(fps_text);
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            if is_loading {
                ui.vertical_centered(|ui| {
                    ui.add_space(120.0);
                    ui.heading("Reloading artifact graph...");
                    ui.add_space(8.0);
                    ui.spinner();
                });
            } else {
                self.draw_graph(ui);
            }
        });
    }
}
