use eframe::egui::{self, Ui};
use fuzzy_matcher::FuzzyMatcher;

use crate::docs::ArtifactKind;
use crate::util::ellipsize;

use super::super::ViewModel;

const SEARCH_HIT_LIMIT: usize = 8;
const SLIDER_REHEAT_ALPHA: f32 = 0.3;

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Atlas Controls");
        ui.separator();
        ui.add_space(4.0);

        ui.label("Search by name");
        let search_response = ui
            .text_edit_singleline(&mut self.filters.search)
            .on_hover_text("Hides artifacts whose names do not contain the text.");
        if search_response.changed() {
            self.on_filters_changed();
        }
        self.draw_search_hits(ui);

        ui.separator();
        ui.label("Artifact kinds");
        for kind in ArtifactKind::ALL {
            let count = self.graph.kind_count(kind);
            if count == 0 {
                continue;
            }

            let mut enabled = self.filters.kind_enabled(kind);
            if ui
                .checkbox(&mut enabled, format!("{} ({count})", kind.label()))
                .changed()
            {
                self.filters.set_kind_enabled(kind, enabled);
                self.on_filters_changed();
            }
        }

        ui.separator();
        ui.label("Physics");
        let mut reheat = false;
        {
            let options = self.sim.options_mut();
            reheat |= ui
                .add(
                    egui::Slider::new(&mut options.charge, -2000.0..=-50.0)
                        .text("charge")
                        .step_by(10.0),
                )
                .on_hover_text("Repulsion strength; more negative pushes harder.")
                .changed();
            reheat |= ui
                .add(
                    egui::Slider::new(&mut options.link_stiffness, 0.01..=0.30)
                        .text("link stiffness"),
                )
                .changed();
            reheat |= ui
                .add(
                    egui::Slider::new(&mut options.velocity_decay, 0.50..=0.98)
                        .text("velocity decay"),
                )
                .changed();
            reheat |= ui
                .add(
                    egui::Slider::new(&mut options.interaction_radius, 60.0..=600.0)
                        .text("interaction radius")
                        .step_by(10.0),
                )
                .on_hover_text("Repulsion is ignored past this distance.")
                .changed();
        }
        if reheat {
            self.sim.reheat(SLIDER_REHEAT_ALPHA);
        }

        ui.add_space(6.0);
        ui.horizontal(|ui| {
            if ui.button("Reheat").clicked() {
                self.sim.reheat(1.0);
            }
            if ui.button("Save layout").clicked() && !self.save_layout() {
                log::warn!("manual layout save failed");
            }
            if ui.button("Reset layout").clicked() {
                self.reset_layout();
            }
        });

        ui.separator();
        ui.checkbox(&mut self.show_quadtree_overlay, "Show spatial index");
        ui.checkbox(&mut self.show_fps_bar, "Show FPS");

        ui.add_space(6.0);
        if self.persistence.is_dirty() {
            ui.label("layout changed, auto-save pending");
        }
        ui.label(format!(
            "renderer: {}  |  index {}",
            self.strategy_kind.label(),
            if self.sim.uses_spatial_index() {
                "active"
            } else {
                "off (brute force)"
            }
        ));
        ui.label(format!("alpha: {:.3}", self.sim.alpha()));
    }

    pub(in crate::app) fn on_filters_changed(&mut self) {
        let drag = self.drag;
        super::super::graph::apply_visibility(&mut self.sim, &self.filters, drag);
        self.strategy.on_filter_change(&self.sim);
        self.search_hits_cache = None;
        self.mark_layout_dirty();
    }

    // Ranked fuzzy matches for quick selection; the visibility filter itself
    // is plain substring containment.
    fn draw_search_hits(&mut self, ui: &mut Ui) {
        let query = self.filters.search.trim().to_owned();
        if query.is_empty() {
            self.search_hits_cache = None;
            return;
        }

        let stale = match &self.search_hits_cache {
            Some((cached_query, _)) => *cached_query != query,
            None => true,
        };
        if stale {
            let mut hits = self
                .sim
                .nodes()
                .iter()
                .enumerate()
                .filter_map(|(index, node)| {
                    self.matcher
                        .fuzzy_match(&node.name, &query)
                        .map(|score| (score, index))
                })
                .collect::<Vec<_>>();
            hits.sort_by(|a, b| b.0.cmp(&a.0));
            hits.truncate(SEARCH_HIT_LIMIT);
            self.search_hits_cache = Some((query.clone(), hits));
        }

        let hits = self
            .search_hits_cache
            .as_ref()
            .map(|(_, hits)| hits.clone())
            .unwrap_or_default();
        for (_score, index) in hits {
            let Some((pos, label)) = self.sim.nodes().get(index).map(|node| {
                (
                    node.pos,
                    format!("{}  ({})", ellipsize(&node.name, 30), node.kind.label()),
                )
            }) else {
                continue;
            };

            if ui.selectable_label(self.selected == Some(index), label).clicked() {
                self.selected = Some(index);
                self.transform.focus_on(pos);
                self.mark_layout_dirty();
            }
        }
    }
}
