use std::time::Instant;

use eframe::egui::{self, Pos2, Rect, Ui, Vec2};

use super::super::ViewModel;

const DRAG_REHEAT_ALPHA: f32 = 0.3;

impl ViewModel {
    pub(in crate::app) fn mark_layout_dirty(&mut self) {
        self.persistence.mark_dirty(Instant::now());
    }

    pub(in crate::app) fn handle_zoom(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        let scale_before = self.transform.scale;
        self.transform.zoom_at(rect, pointer, factor);
        if (self.transform.scale - scale_before).abs() > f32::EPSILON {
            self.mark_layout_dirty();
        }
    }

    pub(in crate::app) fn pan_by(&mut self, delta: Vec2) {
        if delta == Vec2::ZERO {
            return;
        }
        self.transform.translate += delta;
        self.mark_layout_dirty();
    }

    // Pointer-down: a hit starts a node drag and pins the node immediately;
    // a miss leaves the gesture to panning.
    pub(in crate::app) fn begin_drag_at(&mut self, rect: Rect, pointer: Pos2) {
        self.drag = self
            .strategy
            .hit_test(rect, &self.transform, &self.sim, pointer);
        if let Some(index) = self.drag {
            let world = self.transform.screen_to_world(rect, pointer);
            self.sim.nodes_mut()[index].pin_at(world);
            self.mark_layout_dirty();
        }
    }

    // Returns true while a node drag consumed the motion. The pin tracks the
    // pointer exactly, bypassing physics; neighbors get a gentle reheat so
    // they react to the moving node.
    pub(in crate::app) fn update_drag_to(&mut self, rect: Rect, pointer: Pos2) -> bool {
        let Some(index) = self.drag else {
            return false;
        };

        let world = self.transform.screen_to_world(rect, pointer);
        self.sim.nodes_mut()[index].pin_at(world);
        self.sim.reheat(DRAG_REHEAT_ALPHA);
        self.mark_layout_dirty();
        true
    }

    // Release clears the pin, unless the node is currently filtered out: a
    // hidden node stays pinned where it was dropped so it cannot drift while
    // invisible.
    pub(in crate::app) fn end_drag(&mut self) {
        let Some(index) = self.drag.take() else {
            return;
        };

        let node = &mut self.sim.nodes_mut()[index];
        if node.visible {
            node.unpin();
        }
        self.mark_layout_dirty();
    }

    pub(in crate::app) fn handle_pointer(
        &mut self,
        rect: Rect,
        response: &egui::Response,
        pointer: Option<Pos2>,
    ) {
        if response.drag_started_by(egui::PointerButton::Primary)
            && let Some(pointer) = pointer
        {
            self.begin_drag_at(rect, pointer);
        }

        if response.dragged_by(egui::PointerButton::Primary) {
            let node_drag = pointer.is_some_and(|pointer| self.update_drag_to(rect, pointer));
            if !node_drag {
                self.pan_by(response.drag_delta());
            }
        } else if response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.pan_by(response.drag_delta());
        }

        if response.drag_stopped_by(egui::PointerButton::Primary) {
            self.end_drag();
        }
    }
}
