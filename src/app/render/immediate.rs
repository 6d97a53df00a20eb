use std::collections::HashSet;

use eframe::egui::{Align2, Color32, FontId, Pos2, Rect, Stroke, vec2};

use crate::util::ellipsize;

use super::super::physics::ForceSimulation;
use super::super::render_utils::{
    Transform, circle_on_screen, dim_color, draw_arrowhead, edge_on_screen, kind_color,
    screen_radius,
};
use super::{DrawStats, FrameContext, LodOptions, RenderStrategy, StrategyKind};

// Full clear-and-redraw from simulation state every frame. No per-element
// records; highlight state lives in small index sets rebuilt per frame.
pub(in crate::app) struct ImmediateStrategy {
    lod: LodOptions,
    highlight_nodes: HashSet<usize>,
    highlight_edges: HashSet<usize>,
}

impl ImmediateStrategy {
    pub(in crate::app) fn new(lod: LodOptions) -> Self {
        Self {
            lod,
            highlight_nodes: HashSet::new(),
            highlight_edges: HashSet::new(),
        }
    }

    fn rebuild_highlights(&mut self, frame: &FrameContext<'_>) {
        self.highlight_nodes.clear();
        self.highlight_edges.clear();

        if let Some(hovered) = frame.hovered {
            self.highlight_nodes.insert(hovered);
        }
        let Some(selected) = frame.selected else {
            return;
        };

        self.highlight_nodes.insert(selected);
        for (index, edge) in frame.sim.edges().iter().enumerate() {
            if edge.source == selected || edge.target == selected {
                self.highlight_edges.insert(index);
                self.highlight_nodes.insert(edge.source);
                self.highlight_nodes.insert(edge.target);
            }
        }
    }
}

impl RenderStrategy for ImmediateStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Immediate
    }

    fn init(&mut self, _sim: &ForceSimulation) {}

    fn on_tick(&mut self) {}

    fn on_filter_change(&mut self, _sim: &ForceSimulation) {}

    fn draw(&mut self, frame: &FrameContext<'_>) -> DrawStats {
        self.rebuild_highlights(frame);

        let painter = frame.painter;
        let rect = frame.rect;
        let transform = frame.transform;
        let sim = frame.sim;
        let scale = transform.scale;
        let mut stats = DrawStats::default();

        let draw_edges = scale >= self.lod.immediate_edge_min_zoom;
        let draw_arrows = scale >= self.lod.immediate_arrow_min_zoom;
        let draw_labels = scale >= self.lod.immediate_label_min_zoom;

        if draw_edges {
            let plain_stroke = Stroke::new(
                (1.0 * scale.sqrt()).clamp(0.4, 2.8),
                Color32::from_rgba_unmultiplied(88, 96, 110, 150),
            );
            let highlight_stroke = Stroke::new(
                (2.2 * scale.sqrt()).clamp(1.2, 4.2),
                Color32::from_rgb(241, 176, 94),
            );

            for (index, edge) in sim.edges().iter().enumerate() {
                let (Some(source), Some(target)) =
                    (sim.nodes().get(edge.source), sim.nodes().get(edge.target))
                else {
                    continue;
                };
                if !source.visible || !target.visible {
                    continue;
                }

                let start = transform.world_to_screen(rect, source.pos);
                let end = transform.world_to_screen(rect, target.pos);
                if !edge_on_screen(rect, start, end, 4.0) {
                    continue;
                }

                let highlighted = self.highlight_edges.contains(&index);
                let stroke = if highlighted {
                    highlight_stroke
                } else {
                    plain_stroke
                };
                painter.line_segment([start, end], stroke);
                if draw_arrows || highlighted {
                    draw_arrowhead(
                        painter,
                        start,
                        end,
                        screen_radius(target.base_radius, scale),
                        (6.5 * scale.sqrt()).clamp(4.0, 12.0),
                        stroke.color,
                    );
                }
                stats.visible_edges += 1;
            }
        }

        let outline = Stroke::new(1.0, Color32::from_rgba_unmultiplied(12, 12, 14, 200));
        let any_highlight = !self.highlight_nodes.is_empty() && frame.selected.is_some();
        for (index, node) in sim.nodes().iter().enumerate() {
            if !node.visible {
                continue;
            }

            let screen_pos = transform.world_to_screen(rect, node.pos);
            let radius = screen_radius(node.base_radius, scale);
            if !circle_on_screen(rect, screen_pos, radius + 4.0) {
                continue;
            }

            let highlighted = self.highlight_nodes.contains(&index);
            let base = kind_color(node.kind);
            let color = if frame.hovered == Some(index) {
                Color32::from_rgb(255, 196, 110)
            } else if frame.selected == Some(index) {
                Color32::from_rgb(245, 206, 93)
            } else if any_highlight && !highlighted {
                dim_color(base, 0.45)
            } else {
                base
            };

            painter.circle_filled(screen_pos, radius, color);
            painter.circle_stroke(screen_pos, radius, outline);
            stats.visible_nodes += 1;

            if draw_labels || highlighted {
                painter.text(
                    screen_pos + vec2(radius + 5.0, 0.0),
                    Align2::LEFT_CENTER,
                    ellipsize(&node.name, 28),
                    FontId::proportional(12.0),
                    Color32::from_gray(232),
                );
            }
        }

        stats
    }

    // Linear scan against simulation state through the inverse transform.
    fn hit_test(
        &self,
        rect: Rect,
        transform: &Transform,
        sim: &ForceSimulation,
        pointer: Pos2,
    ) -> Option<usize> {
        let world = transform.screen_to_world(rect, pointer);
        sim.nodes()
            .iter()
            .enumerate()
            .filter(|(_, node)| node.visible)
            .filter_map(|(index, node)| {
                let radius_world =
                    screen_radius(node.base_radius, transform.scale).max(4.0) / transform.scale;
                let distance = (node.pos - world).length();
                (distance <= radius_world).then_some((index, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    fn teardown(&mut self) {
        self.highlight_nodes.clear();
        self.highlight_edges.clear();
    }
}
