use eframe::egui::{Align2, Color32, FontId, Pos2, Rect, Stroke, Vec2, pos2};

use crate::util::ellipsize;

use super::super::physics::ForceSimulation;
use super::super::render_utils::{
    Transform, circle_on_screen, dim_color, edge_on_screen, kind_color, screen_radius,
};
use super::{DrawStats, FrameContext, LodOptions, RenderStrategy, StrategyKind};

// Persistent per-element drawing state, refreshed from the simulation at most
// once per coalescing window.
struct NodeDrawable {
    screen_pos: Pos2,
    radius: f32,
    color: Color32,
    visible: bool,
    label_visible: bool,
}

struct EdgeDrawable {
    start: Pos2,
    end: Pos2,
    visible: bool,
}

pub(in crate::app) struct RetainedStrategy {
    lod: LodOptions,
    nodes: Vec<NodeDrawable>,
    edges: Vec<EdgeDrawable>,
    pending_update: bool,
    last_refresh: f64,
    last_view: Option<(Rect, f32, Vec2)>,
}

impl RetainedStrategy {
    pub(in crate::app) fn new(lod: LodOptions) -> Self {
        Self {
            lod,
            nodes: Vec::new(),
            edges: Vec::new(),
            pending_update: false,
            last_refresh: f64::NEG_INFINITY,
            last_view: None,
        }
    }

    fn labels_enabled(&self, node_count: usize, scale: f32) -> bool {
        node_count <= self.lod.label_max_nodes && scale >= self.lod.label_min_zoom
    }

    fn edges_enabled(&self, scale: f32) -> bool {
        scale >= self.lod.edge_min_zoom
    }

    // Pull fresh positions/visibility out of the simulation. Only drawables
    // whose bounds intersect the viewport get full attribute updates;
    // off-screen ones are just marked hidden.
    fn refresh(&mut self, rect: Rect, transform: &Transform, sim: &ForceSimulation) {
        let node_count = sim.node_count();
        let labels_enabled = self.labels_enabled(node_count, transform.scale);
        let edges_enabled = self.edges_enabled(transform.scale);
        let round_edges = node_count > self.lod.edge_round_min_nodes;

        for (index, node) in sim.nodes().iter().enumerate() {
            // Drawables not created yet for this element: skip this frame.
            let Some(drawable) = self.nodes.get_mut(index) else {
                continue;
            };

            if !node.visible {
                drawable.visible = false;
                continue;
            }

            let screen_pos = transform.world_to_screen(rect, node.pos);
            let radius = screen_radius(node.base_radius, transform.scale);
            if !circle_on_screen(rect, screen_pos, radius + 40.0) {
                drawable.visible = false;
                continue;
            }

            drawable.screen_pos = screen_pos;
            drawable.radius = radius;
            drawable.color = kind_color(node.kind);
            drawable.visible = true;
            drawable.label_visible = labels_enabled;
        }

        for (index, edge) in sim.edges().iter().enumerate() {
            let Some(drawable) = self.edges.get_mut(index) else {
                continue;
            };

            let endpoints_drawn = edges_enabled
                && sim
                    .nodes()
                    .get(edge.source)
                    .is_some_and(|node| node.visible)
                && sim
                    .nodes()
                    .get(edge.target)
                    .is_some_and(|node| node.visible);
            if !endpoints_drawn {
                drawable.visible = false;
                continue;
            }

            let mut start = transform.world_to_screen(rect, sim.nodes()[edge.source].pos);
            let mut end = transform.world_to_screen(rect, sim.nodes()[edge.target].pos);
            if !edge_on_screen(rect, start, end, 4.0) {
                drawable.visible = false;
                continue;
            }

            if round_edges {
                start = pos2(start.x.round(), start.y.round());
                end = pos2(end.x.round(), end.y.round());
            }
            drawable.start = start;
            drawable.end = end;
            drawable.visible = true;
        }

        self.last_view = Some((rect, transform.scale, transform.translate));
    }

    fn view_changed(&self, rect: Rect, transform: &Transform) -> bool {
        match self.last_view {
            Some((last_rect, last_scale, last_translate)) => {
                last_rect != rect
                    || last_scale != transform.scale
                    || last_translate != transform.translate
            }
            None => true,
        }
    }

    fn paint(&self, frame: &FrameContext<'_>) -> DrawStats {
        let painter = frame.painter;
        let mut stats = DrawStats::default();

        let edge_stroke = Stroke::new(
            (1.1 * frame.transform.scale.sqrt()).clamp(0.5, 3.0),
            Color32::from_rgba_unmultiplied(96, 104, 118, 170),
        );
        for drawable in &self.edges {
            if !drawable.visible {
                continue;
            }
            painter.line_segment([drawable.start, drawable.end], edge_stroke);
            stats.visible_edges += 1;
        }

        let outline = Stroke::new(1.0, Color32::from_rgba_unmultiplied(12, 12, 14, 200));
        for (index, drawable) in self.nodes.iter().enumerate() {
            if !drawable.visible {
                continue;
            }

            let is_hovered = frame.hovered == Some(index);
            let is_selected = frame.selected == Some(index);
            let color = if is_hovered {
                Color32::from_rgb(255, 196, 110)
            } else if is_selected {
                Color32::from_rgb(245, 206, 93)
            } else {
                drawable.color
            };

            painter.circle_filled(drawable.screen_pos, drawable.radius, color);
            painter.circle_stroke(drawable.screen_pos, drawable.radius, outline);
            if is_selected {
                painter.circle_stroke(
                    drawable.screen_pos,
                    drawable.radius + 3.5,
                    Stroke::new(1.5, dim_color(color, 0.8)),
                );
            }
            stats.visible_nodes += 1;

            if drawable.label_visible || is_hovered || is_selected {
                if let Some(node) = frame.sim.nodes().get(index) {
                    painter.text(
                        drawable.screen_pos + eframe::egui::vec2(drawable.radius + 5.0, 0.0),
                        Align2::LEFT_CENTER,
                        ellipsize(&node.name, 28),
                        FontId::proportional(12.0),
                        Color32::from_gray(232),
                    );
                }
            }
        }

        stats
    }
}

impl RenderStrategy for RetainedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Retained
    }

    fn init(&mut self, sim: &ForceSimulation) {
        self.nodes = sim
            .nodes()
            .iter()
            .map(|node| NodeDrawable {
                screen_pos: Pos2::ZERO,
                radius: node.base_radius,
                color: kind_color(node.kind),
                visible: false,
                label_visible: false,
            })
            .collect();
        self.edges = sim
            .edges()
            .iter()
            .map(|_| EdgeDrawable {
                start: Pos2::ZERO,
                end: Pos2::ZERO,
                visible: false,
            })
            .collect();
        self.pending_update = true;
        self.last_refresh = f64::NEG_INFINITY;
        self.last_view = None;
    }

    fn on_tick(&mut self) {
        self.pending_update = true;
    }

    fn on_filter_change(&mut self, _sim: &ForceSimulation) {
        self.pending_update = true;
    }

    fn draw(&mut self, frame: &FrameContext<'_>) -> DrawStats {
        let due = frame.now - self.last_refresh >= self.lod.refresh_interval;
        if (self.pending_update && due) || self.view_changed(frame.rect, frame.transform) {
            self.refresh(frame.rect, frame.transform, frame.sim);
            self.pending_update = false;
            self.last_refresh = frame.now;
        }

        self.paint(frame)
    }

    // Drawable-level targeting: test against the cached screen-space records.
    fn hit_test(
        &self,
        _rect: Rect,
        _transform: &Transform,
        _sim: &ForceSimulation,
        pointer: Pos2,
    ) -> Option<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, drawable)| drawable.visible)
            .filter_map(|(index, drawable)| {
                let distance = drawable.screen_pos.distance(pointer);
                (distance <= drawable.radius.max(4.0)).then_some((index, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    fn teardown(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.pending_update = false;
    }
}
