use eframe::egui::{Color32, Painter, Pos2, Rect, Shape, Stroke, Vec2, vec2};

use crate::docs::ArtifactKind;

pub(in crate::app) const MIN_SCALE: f32 = 0.05;
pub(in crate::app) const MAX_SCALE: f32 = 6.0;

// Mapping from simulation space to the drawing surface. `center` is the
// layout's geometric center; with a zero translate and unit scale the layout
// sits centered in the viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct Transform {
    pub scale: f32,
    pub translate: Vec2,
    center: Vec2,
}

impl Transform {
    pub(in crate::app) fn new(center: Vec2) -> Self {
        Self {
            scale: 1.0,
            translate: Vec2::ZERO,
            center,
        }
    }

    pub(in crate::app) fn world_to_screen(&self, rect: Rect, world: Vec2) -> Pos2 {
        rect.center() + self.translate + ((world - self.center) * self.scale)
    }

    pub(in crate::app) fn screen_to_world(&self, rect: Rect, screen: Pos2) -> Vec2 {
        ((screen - rect.center() - self.translate) / self.scale) + self.center
    }

    // Pointer-anchored zoom: the world point under `pointer` stays put.
    pub(in crate::app) fn zoom_at(&mut self, rect: Rect, pointer: Pos2, factor: f32) {
        let world_before = self.screen_to_world(rect, pointer);
        self.scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        self.translate = pointer - rect.center() - ((world_before - self.center) * self.scale);
    }

    pub(in crate::app) fn set_scale_clamped(&mut self, scale: f32) {
        self.scale = scale.clamp(MIN_SCALE, MAX_SCALE);
    }

    // Recenter the view on a world position without changing zoom.
    pub(in crate::app) fn focus_on(&mut self, world: Vec2) {
        self.translate = -(world - self.center) * self.scale;
    }
}

pub(in crate::app) fn kind_color(kind: ArtifactKind) -> Color32 {
    match kind {
        ArtifactKind::Command => Color32::from_rgb(93, 156, 236),
        ArtifactKind::Workflow => Color32::from_rgb(98, 186, 128),
        ArtifactKind::Agent => Color32::from_rgb(240, 150, 84),
        ArtifactKind::Template => Color32::from_rgb(171, 130, 224),
        ArtifactKind::Unknown => Color32::from_gray(138),
    }
}

pub(in crate::app) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        color.a(),
    )
}

pub(in crate::app) fn screen_radius(base_radius: f32, scale: f32) -> f32 {
    (base_radius * scale.powf(0.45)).clamp(2.0, 42.0)
}

pub(in crate::app) fn draw_background(painter: &Painter, rect: Rect, transform: &Transform) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(21, 24, 30));

    let step = (64.0 * transform.scale.clamp(0.5, 2.0)).max(24.0);
    let origin = rect.center() + transform.translate;
    let dot = Color32::from_rgba_unmultiplied(70, 78, 92, 90);

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
        while x < rect.right() {
            painter.circle_filled(Pos2::new(x, y), 1.0, dot);
            x += step;
        }
        y += step;
    }
}

pub(in crate::app) fn circle_on_screen(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

// Conservative bounding-box test; good enough for culling line segments.
pub(in crate::app) fn edge_on_screen(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    !(start.x.max(end.x) + padding < rect.left()
        || start.x.min(end.x) - padding > rect.right()
        || start.y.max(end.y) + padding < rect.top()
        || start.y.min(end.y) - padding > rect.bottom())
}

pub(in crate::app) fn draw_arrowhead(
    painter: &Painter,
    from: Pos2,
    to: Pos2,
    target_radius: f32,
    size: f32,
    color: Color32,
) {
    let delta = to - from;
    let length = delta.length();
    if length <= target_radius + size {
        return;
    }

    let direction = delta / length;
    let tip = to - (direction * target_radius);
    let base = tip - (direction * size);
    let normal = vec2(-direction.y, direction.x) * (size * 0.5);

    painter.add(Shape::convex_polygon(
        vec![tip, base + normal, base - normal],
        color,
        Stroke::NONE,
    ));
}
