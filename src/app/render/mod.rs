mod immediate;
mod retained;

use eframe::egui::{Painter, Pos2, Rect};

pub(in crate::app) use immediate::ImmediateStrategy;
pub(in crate::app) use retained::RetainedStrategy;

use super::physics::ForceSimulation;
use super::render_utils::Transform;

// Below this node count every node/edge gets a persistent drawable; at or
// above it the whole scene is redrawn from simulation state each frame.
pub(in crate::app) const RETAINED_MAX_NODES: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum StrategyKind {
    Retained,
    Immediate,
}

impl StrategyKind {
    pub(in crate::app) fn label(self) -> &'static str {
        match self {
            Self::Retained => "retained",
            Self::Immediate => "immediate",
        }
    }
}

// Decided once per graph load; never hot-swapped mid-session.
pub(in crate::app) fn select_strategy(node_count: usize) -> StrategyKind {
    if node_count < RETAINED_MAX_NODES {
        StrategyKind::Retained
    } else {
        StrategyKind::Immediate
    }
}

pub(in crate::app) fn make_strategy(kind: StrategyKind) -> Box<dyn RenderStrategy> {
    match kind {
        StrategyKind::Retained => Box::new(RetainedStrategy::new(LodOptions::default())),
        StrategyKind::Immediate => Box::new(ImmediateStrategy::new(LodOptions::default())),
    }
}

// Level-of-detail cutoffs. Tuning choices, not invariants.
#[derive(Clone, Copy, Debug)]
pub(in crate::app) struct LodOptions {
    pub label_max_nodes: usize,
    pub label_min_zoom: f32,
    pub edge_min_zoom: f32,
    pub edge_round_min_nodes: usize,
    pub immediate_edge_min_zoom: f32,
    pub immediate_arrow_min_zoom: f32,
    pub immediate_label_min_zoom: f32,
    // Retained refresh coalescing window, seconds.
    pub refresh_interval: f64,
}

impl Default for LodOptions {
    fn default() -> Self {
        Self {
            label_max_nodes: 80,
            label_min_zoom: 0.8,
            edge_min_zoom: 0.3,
            edge_round_min_nodes: 100,
            immediate_edge_min_zoom: 0.18,
            immediate_arrow_min_zoom: 0.7,
            immediate_label_min_zoom: 1.1,
            refresh_interval: 0.016,
        }
    }
}

pub(in crate::app) struct FrameContext<'a> {
    pub painter: &'a Painter,
    pub rect: Rect,
    pub transform: &'a Transform,
    pub sim: &'a ForceSimulation,
    pub hovered: Option<usize>,
    pub selected: Option<usize>,
    // Monotonic seconds, supplied by the host loop.
    pub now: f64,
}

#[derive(Clone, Copy, Debug, Default)]
pub(in crate::app) struct DrawStats {
    pub visible_nodes: usize,
    pub visible_edges: usize,
}

// One drawing strategy per simulation session. `on_tick` only records that
// simulation state moved; `draw` runs every host frame because pan/zoom must
// repaint even when the simulation has settled.
pub(in crate::app) trait RenderStrategy {
    fn kind(&self) -> StrategyKind;
    fn init(&mut self, sim: &ForceSimulation);
    fn on_tick(&mut self);
    fn on_filter_change(&mut self, sim: &ForceSimulation);
    fn draw(&mut self, frame: &FrameContext<'_>) -> DrawStats;
    fn hit_test(
        &self,
        rect: Rect,
        transform: &Transform,
        sim: &ForceSimulation,
        pointer: Pos2,
    ) -> Option<usize>;
    fn teardown(&mut self);
}
