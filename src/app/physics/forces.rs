use eframe::egui::Vec2;

use super::quadtree::Quadtree;
use super::SimEdge;

// Charge force between one pair: `charge * alpha / d^2`, repulsive for
// negative charge. Zero-distance pairs are skipped (undefined direction), as
// are pairs beyond the interaction radius.
pub(super) fn accumulate_charge_brute(
    positions: &[Vec2],
    charge: f32,
    alpha: f32,
    max_distance: f32,
    forces: &mut [Vec2],
) {
    let max_distance_sq = max_distance * max_distance;
    for i in 0..positions.len() {
        for j in (i + 1)..positions.len() {
            let delta = positions[i] - positions[j];
            let distance_sq = delta.length_sq();
            if distance_sq <= 0.0 || distance_sq > max_distance_sq {
                continue;
            }

            let distance = distance_sq.sqrt();
            let push = -(charge * alpha) / distance_sq;
            let direction = delta / distance;
            forces[i] += direction * push;
            forces[j] -= direction * push;
        }
    }
}

// Same force law, but neighbor candidates come from the spatial index. Each
// node queries its own neighborhood, so every in-range pair is applied once
// from each side, matching the brute-force accumulation.
pub(super) fn accumulate_charge_indexed(
    index: &Quadtree,
    positions: &[Vec2],
    charge: f32,
    alpha: f32,
    max_distance: f32,
    candidates: &mut Vec<usize>,
    forces: &mut [Vec2],
) {
    let max_distance_sq = max_distance * max_distance;
    for i in 0..positions.len() {
        candidates.clear();
        index.query_radius(positions[i], max_distance, candidates);

        for &j in candidates.iter() {
            if j == i {
                continue;
            }

            let delta = positions[i] - positions[j];
            let distance_sq = delta.length_sq();
            if distance_sq <= 0.0 || distance_sq > max_distance_sq {
                continue;
            }

            let distance = distance_sq.sqrt();
            let push = -(charge * alpha) / distance_sq;
            forces[i] += (delta / distance) * push;
        }
    }
}

// Spring force toward each edge's rest length, split across both endpoints.
// Whether an endpoint actually receives its half is decided at integration
// time by its pin state.
pub(super) fn accumulate_links(
    positions: &[Vec2],
    edges: &[SimEdge],
    stiffness: f32,
    alpha: f32,
    forces: &mut [Vec2],
) {
    for edge in edges {
        if edge.source >= positions.len()
            || edge.target >= positions.len()
            || edge.source == edge.target
        {
            continue;
        }

        let delta = positions[edge.target] - positions[edge.source];
        let distance_sq = delta.length_sq();
        if distance_sq <= 0.0 {
            continue;
        }

        let distance = distance_sq.sqrt();
        let stretch = (distance - edge.kind.rest_length()) * stiffness * alpha;
        let correction = (delta / distance) * (stretch * 0.5);
        forces[edge.source] += correction;
        forces[edge.target] -= correction;
    }
}
