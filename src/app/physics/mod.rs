mod forces;
mod quadtree;

use std::collections::HashMap;

use eframe::egui::{Vec2, vec2};

use crate::docs::{ArtifactKind, EdgeKind};
use forces::{accumulate_charge_brute, accumulate_charge_indexed, accumulate_links};
pub(in crate::app) use quadtree::{IndexCell, QuadBounds, Quadtree};

#[derive(Clone, Copy, Debug)]
pub(in crate::app) struct SimulationOptions {
    pub width: f32,
    pub height: f32,
    // Repulsion coefficient; negative values repel.
    pub charge: f32,
    pub link_stiffness: f32,
    pub alpha: f32,
    pub alpha_decay: f32,
    pub alpha_min: f32,
    // Damping factor applied per tick: `v *= velocity_decay`.
    pub velocity_decay: f32,
    // Fraction of the centroid error corrected per tick.
    pub center_pull: f32,
    // Repulsion is treated as negligible past this distance.
    pub interaction_radius: f32,
    // The spatial index kicks in above this node count.
    pub index_threshold: usize,
    pub bounds_margin: f32,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            width: 2400.0,
            height: 1600.0,
            charge: -300.0,
            link_stiffness: 0.08,
            alpha: 1.0,
            alpha_decay: 0.0228,
            alpha_min: 0.001,
            velocity_decay: 0.85,
            center_pull: 0.05,
            interaction_radius: 250.0,
            index_threshold: 100,
            bounds_margin: 24.0,
        }
    }
}

pub(in crate::app) struct SimNode {
    pub id: String,
    pub name: String,
    pub kind: ArtifactKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub fx: Option<f32>,
    pub fy: Option<f32>,
    pub visible: bool,
    pub base_radius: f32,
}

impl SimNode {
    pub(in crate::app) fn pinned(&self) -> bool {
        self.fx.is_some() || self.fy.is_some()
    }

    pub(in crate::app) fn pin_at(&mut self, pos: Vec2) {
        self.pos = pos;
        self.vel = Vec2::ZERO;
        self.fx = Some(pos.x);
        self.fy = Some(pos.y);
    }

    pub(in crate::app) fn unpin(&mut self) {
        self.fx = None;
        self.fy = None;
    }
}

#[derive(Clone, Copy, Debug)]
pub(in crate::app) struct SimEdge {
    pub source: usize,
    pub target: usize,
    pub kind: EdgeKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum SimPhase {
    Running,
    Settled,
}

struct SimScratch {
    forces: Vec<Vec2>,
    positions: Vec<Vec2>,
    candidates: Vec<usize>,
}

pub(in crate::app) struct ForceSimulation {
    options: SimulationOptions,
    nodes: Vec<SimNode>,
    edges: Vec<SimEdge>,
    index_by_id: HashMap<String, usize>,
    alpha: f32,
    phase: SimPhase,
    index: Quadtree,
    scratch: SimScratch,
}

impl ForceSimulation {
    pub(in crate::app) fn new(
        nodes: Vec<SimNode>,
        edges: Vec<SimEdge>,
        options: SimulationOptions,
    ) -> Self {
        let index_by_id = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.clone(), index))
            .collect::<HashMap<_, _>>();

        let phase = if nodes.is_empty() {
            SimPhase::Settled
        } else {
            SimPhase::Running
        };

        Self {
            alpha: options.alpha,
            phase,
            index: Quadtree::new(QuadBounds::from_min_max(
                Vec2::ZERO,
                vec2(options.width, options.height),
            )),
            options,
            nodes,
            edges,
            index_by_id,
            scratch: SimScratch {
                forces: Vec::new(),
                positions: Vec::new(),
                candidates: Vec::new(),
            },
        }
    }

    pub(in crate::app) fn options(&self) -> &SimulationOptions {
        &self.options
    }

    pub(in crate::app) fn options_mut(&mut self) -> &mut SimulationOptions {
        &mut self.options
    }

    pub(in crate::app) fn alpha(&self) -> f32 {
        self.alpha
    }

    pub(in crate::app) fn is_settled(&self) -> bool {
        self.phase == SimPhase::Settled
    }

    pub(in crate::app) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(in crate::app) fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    pub(in crate::app) fn nodes_mut(&mut self) -> &mut [SimNode] {
        &mut self.nodes
    }

    pub(in crate::app) fn edges(&self) -> &[SimEdge] {
        &self.edges
    }

    pub(in crate::app) fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub(in crate::app) fn center(&self) -> Vec2 {
        vec2(self.options.width * 0.5, self.options.height * 0.5)
    }

    // Restart the cooling schedule from a higher temperature. Never lowers
    // the current alpha.
    pub(in crate::app) fn reheat(&mut self, alpha: f32) {
        self.alpha = self.alpha.max(alpha).min(1.0);
        if self.alpha >= self.options.alpha_min && !self.nodes.is_empty() {
            self.phase = SimPhase::Running;
        }
    }

    // Park the simulation without running the schedule down; a restored
    // layout starts settled.
    pub(in crate::app) fn cool_to_rest(&mut self) {
        self.alpha = 0.0;
        self.phase = SimPhase::Settled;
    }

    pub(in crate::app) fn uses_spatial_index(&self) -> bool {
        self.nodes.len() > self.options.index_threshold
    }

    // One integration step. Returns true while the simulation is still
    // running afterwards; a settled simulation is a no-op returning false.
    pub(in crate::app) fn tick(&mut self) -> bool {
        if self.phase == SimPhase::Settled {
            return false;
        }

        let node_count = self.nodes.len();
        let options = self.options;
        let layout_center = vec2(options.width * 0.5, options.height * 0.5);

        let scratch = &mut self.scratch;
        scratch.forces.resize(node_count, Vec2::ZERO);
        scratch.forces.fill(Vec2::ZERO);
        scratch.positions.clear();
        scratch.positions.reserve(node_count.saturating_sub(scratch.positions.capacity()));
        for node in &self.nodes {
            scratch.positions.push(node.pos);
        }

        if node_count > options.index_threshold {
            let mut min = vec2(0.0, 0.0);
            let mut max = vec2(options.width, options.height);
            for pos in &scratch.positions {
                if pos.x.is_finite() && pos.y.is_finite() {
                    min = min.min(*pos);
                    max = max.max(*pos);
                }
            }

            self.index.clear();
            self.index.set_bounds(QuadBounds::from_min_max(min, max));
            for (index, pos) in scratch.positions.iter().enumerate() {
                self.index.insert(index, *pos);
            }

            accumulate_charge_indexed(
                &self.index,
                &scratch.positions,
                options.charge,
                self.alpha,
                options.interaction_radius,
                &mut scratch.candidates,
                &mut scratch.forces,
            );
        } else {
            accumulate_charge_brute(
                &scratch.positions,
                options.charge,
                self.alpha,
                options.interaction_radius,
                &mut scratch.forces,
            );
        }

        accumulate_links(
            &scratch.positions,
            &self.edges,
            options.link_stiffness,
            self.alpha,
            &mut scratch.forces,
        );

        // Centering: shift every unpinned node so the unpinned centroid
        // drifts back toward the layout center. A uniform correction, so
        // relative distances are untouched.
        let mut centroid = Vec2::ZERO;
        let mut unpinned = 0usize;
        for node in &self.nodes {
            if !node.pinned() {
                centroid += node.pos;
                unpinned += 1;
            }
        }
        if unpinned > 0 {
            centroid /= unpinned as f32;
            let correction = (layout_center - centroid) * options.center_pull;
            for (index, node) in self.nodes.iter().enumerate() {
                if !node.pinned() {
                    scratch.forces[index] += correction;
                }
            }
        }

        let margin = options.bounds_margin;
        let max_x = (options.width - margin).max(margin);
        let max_y = (options.height - margin).max(margin);
        for (index, node) in self.nodes.iter_mut().enumerate() {
            let force = scratch.forces[index];

            match node.fx {
                Some(fx) => {
                    node.pos.x = fx;
                    node.vel.x = 0.0;
                }
                None => {
                    node.vel.x = (node.vel.x + force.x) * options.velocity_decay;
                    node.pos.x = (node.pos.x + node.vel.x).clamp(margin, max_x);
                }
            }
            match node.fy {
                Some(fy) => {
                    node.pos.y = fy;
                    node.vel.y = 0.0;
                }
                None => {
                    node.vel.y = (node.vel.y + force.y) * options.velocity_decay;
                    node.pos.y = (node.pos.y + node.vel.y).clamp(margin, max_y);
                }
            }
        }

        self.alpha *= 1.0 - options.alpha_decay;
        if self.alpha < options.alpha_min {
            self.phase = SimPhase::Settled;
        }

        self.phase == SimPhase::Running
    }

    // Debug overlay support: rebuild the index from current positions and
    // hand back its cells, regardless of the activation threshold.
    pub(in crate::app) fn collect_index_cells(&mut self, cells: &mut Vec<IndexCell>) {
        let mut min = vec2(0.0, 0.0);
        let mut max = vec2(self.options.width, self.options.height);
        for node in &self.nodes {
            if node.pos.x.is_finite() && node.pos.y.is_finite() {
                min = min.min(node.pos);
                max = max.max(node.pos);
            }
        }

        self.index.clear();
        self.index.set_bounds(QuadBounds::from_min_max(min, max));
        for (index, node) in self.nodes.iter().enumerate() {
            self.index.insert(index, node.pos);
        }

        cells.clear();
        self.index.collect_cells(cells);
    }
}

#[cfg(test)]
pub(in crate::app) fn test_node(id: &str, kind: ArtifactKind, pos: Vec2) -> SimNode {
    SimNode {
        id: id.to_owned(),
        name: id.to_owned(),
        kind,
        pos,
        vel: Vec2::ZERO,
        fx: None,
        fy: None,
        visible: true,
        base_radius: 8.0,
    }
}
