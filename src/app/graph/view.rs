use std::time::{Duration, Instant};

use eframe::egui::{
    self, Align2, Color32, FontId, Painter, Rect, Sense, Stroke, Ui, vec2,
};

use super::super::ViewModel;
use super::super::render::FrameContext;
use super::super::render_utils::draw_background;

const FRAME_BUDGET: Duration = Duration::from_millis(16);
const BUDGET_WARN_INTERVAL: Duration = Duration::from_secs(5);

impl ViewModel {
    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let frame_start = Instant::now();

        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        draw_background(&painter, rect, &self.transform);

        // Input is applied before the tick so pin and transform writes are
        // visible to the physics step that follows.
        let pointer = ui.input(|input| input.pointer.hover_pos());
        self.handle_zoom(ui, rect, &response);
        self.handle_pointer(rect, &response, pointer);

        let mut physics_moving = false;
        if !self.sim.is_settled() {
            physics_moving = self.sim.tick();
            self.strategy.on_tick();
        }

        self.hovered = if self.drag.is_some() {
            self.drag
        } else {
            pointer.and_then(|pointer| {
                self.strategy
                    .hit_test(rect, &self.transform, &self.sim, pointer)
            })
        };
        if self.hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }
        if response.clicked_by(egui::PointerButton::Primary) {
            self.selected = self.hovered;
        }

        let frame = FrameContext {
            painter: &painter,
            rect,
            transform: &self.transform,
            sim: &self.sim,
            hovered: self.hovered,
            selected: self.selected,
            now: ui.input(|input| input.time),
        };
        let stats = self.strategy.draw(&frame);
        self.visible_node_count = stats.visible_nodes;
        self.visible_edge_count = stats.visible_edges;

        if self.show_quadtree_overlay {
            self.draw_index_overlay(&painter, rect);
        }

        if let Some(hovered) = self.hovered
            && let Some(node) = self.sim.nodes().get(hovered)
        {
            let status = format!(
                "{}  |  {}  |  alpha {:.3}",
                node.name,
                node.kind.label(),
                self.sim.alpha()
            );
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                status,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        if physics_moving || response.dragged() {
            ui.ctx().request_repaint();
        }

        self.check_frame_budget(frame_start.elapsed());
        self.pump_autosave();
    }

    fn draw_index_overlay(&mut self, painter: &Painter, rect: Rect) {
        let mut cells = std::mem::take(&mut self.index_cells);
        self.sim.collect_index_cells(&mut cells);

        for cell in &cells {
            let min = cell.center - cell.half;
            let max = cell.center + cell.half;
            let top_left = self.transform.world_to_screen(rect, vec2(min.x, min.y));
            let top_right = self.transform.world_to_screen(rect, vec2(max.x, min.y));
            let bottom_right = self.transform.world_to_screen(rect, vec2(max.x, max.y));
            let bottom_left = self.transform.world_to_screen(rect, vec2(min.x, max.y));

            let alpha = if cell.is_leaf { 110 } else { 55 };
            let line_width =
                (1.4_f32 - (cell.depth as f32 * 0.12_f32)).clamp(0.45_f32, 1.4_f32);
            let stroke = Stroke::new(
                line_width,
                Color32::from_rgba_unmultiplied(106, 198, 255, alpha),
            );

            painter.line_segment([top_left, top_right], stroke);
            painter.line_segment([top_right, bottom_right], stroke);
            painter.line_segment([bottom_right, bottom_left], stroke);
            painter.line_segment([bottom_left, top_left], stroke);
        }

        self.index_cells = cells;
    }

    // Going over the frame budget is a diagnostic, never an error; the
    // warning is rate-limited so a slow machine does not flood the log.
    fn check_frame_budget(&mut self, elapsed: Duration) {
        if elapsed <= FRAME_BUDGET {
            return;
        }

        let now = Instant::now();
        let due = self
            .budget_last_warn
            .is_none_or(|last| now.duration_since(last) >= BUDGET_WARN_INTERVAL);
        if due {
            log::warn!(
                "frame took {:.1} ms (budget {} ms) with {} nodes / {} edges",
                elapsed.as_secs_f64() * 1000.0,
                FRAME_BUDGET.as_millis(),
                self.sim.node_count(),
                self.sim.edges().len()
            );
            self.budget_last_warn = Some(now);
        }
    }

    fn pump_autosave(&mut self) {
        let now = Instant::now();
        if self.persistence.autosave_due(now) && !self.save_layout() {
            log::warn!("auto-save failed, retrying after the next debounce window");
            self.persistence.mark_dirty(now);
        }
    }
}
