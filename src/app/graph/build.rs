use std::collections::{HashMap, HashSet, VecDeque};

use eframe::egui::{Vec2, vec2};
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::docs::ArtifactGraph;
use crate::util::stable_pair;

use super::super::persist::{KeyValueStore, LayoutPersistence, apply_snapshot, snapshot_layout};
use super::super::physics::{ForceSimulation, SimEdge, SimNode, SimulationOptions};
use super::super::render::{make_strategy, select_strategy};
use super::super::render_utils::Transform;
use super::super::ViewModel;
use super::filter::{FilterState, refresh_visibility_preserving_pins};

// Deterministic scatter inside the layout bounds, keyed on the artifact id
// so reloading the same manifest starts from the same arrangement.
pub(in crate::app) fn initial_position(id: &str, options: &SimulationOptions) -> Vec2 {
    let (jx, jy) = stable_pair(id);
    let spread_x = ((options.width * 0.5) - options.bounds_margin) * 0.85;
    let spread_y = ((options.height * 0.5) - options.bounds_margin) * 0.85;
    vec2(
        (options.width * 0.5) + (jx * spread_x),
        (options.height * 0.5) + (jy * spread_y),
    )
}

fn radius_for_degree(degree: usize) -> f32 {
    (6.0 + ((degree as f32).sqrt() * 2.2)).clamp(6.0, 18.0)
}

fn build_sim_parts(
    graph: &ArtifactGraph,
    options: &SimulationOptions,
) -> (Vec<SimNode>, Vec<SimEdge>) {
    let mut index_by_id = HashMap::with_capacity(graph.nodes.len());
    for (index, node) in graph.nodes.iter().enumerate() {
        index_by_id.insert(node.id.as_str(), index);
    }

    let mut degrees = vec![0usize; graph.nodes.len()];
    let mut seen = HashSet::new();
    let mut edges = Vec::with_capacity(graph.edges.len());
    let mut dropped = 0usize;
    for edge in &graph.edges {
        let (Some(&source), Some(&target)) = (
            index_by_id.get(edge.source.as_str()),
            index_by_id.get(edge.target.as_str()),
        ) else {
            dropped += 1;
            continue;
        };
        if source == target || !seen.insert((source, target)) {
            continue;
        }

        degrees[source] += 1;
        degrees[target] += 1;
        edges.push(SimEdge {
            source,
            target,
            kind: edge.kind,
        });
    }
    if dropped > 0 {
        log::debug!("ignored {dropped} edges with endpoints missing from the node set");
    }

    let nodes = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(index, artifact)| SimNode {
            id: artifact.id.clone(),
            name: artifact.name.clone(),
            kind: artifact.kind,
            pos: initial_position(&artifact.id, options),
            vel: Vec2::ZERO,
            fx: None,
            fy: None,
            visible: true,
            base_radius: radius_for_degree(degrees[index]),
        })
        .collect();

    (nodes, edges)
}

impl ViewModel {
    pub(in crate::app) fn new(
        graph: ArtifactGraph,
        store: Box<dyn KeyValueStore>,
        reset_layout: bool,
    ) -> Self {
        let options = SimulationOptions::default();
        let (nodes, edges) = build_sim_parts(&graph, &options);
        let mut sim = ForceSimulation::new(nodes, edges, options);

        let strategy_kind = select_strategy(sim.node_count());
        let mut strategy = make_strategy(strategy_kind);
        let mut transform = Transform::new(sim.center());
        let mut filters = FilterState::default();

        let mut persistence = LayoutPersistence::new(store);
        if reset_layout {
            persistence.clear();
        }

        // A saved layout is read once, at load, and restored settled.
        let restored_layout = match persistence.load() {
            Some(snapshot) => {
                apply_snapshot(&snapshot, &mut sim, &mut transform, &mut filters);
                refresh_visibility_preserving_pins(&mut sim, &filters);
                sim.cool_to_rest();
                true
            }
            None => false,
        };

        strategy.init(&sim);

        Self {
            graph,
            sim,
            strategy,
            strategy_kind,
            transform,
            filters,
            persistence,
            restored_layout,
            hovered: None,
            selected: None,
            drag: None,
            show_quadtree_overlay: false,
            show_fps_bar: true,
            fps_current: 0.0,
            fps_samples: VecDeque::new(),
            budget_last_warn: None,
            matcher: SkimMatcherV2::default(),
            search_hits_cache: None,
            visible_node_count: 0,
            visible_edge_count: 0,
            index_cells: Vec::new(),
        }
    }

    pub(in crate::app) fn save_layout(&mut self) -> bool {
        let snapshot = snapshot_layout(&self.sim, &self.transform, &self.filters);
        self.persistence.save(&snapshot)
    }

    // Discard the stored snapshot and scatter everything back to the default
    // arrangement.
    pub(in crate::app) fn reset_layout(&mut self) {
        self.persistence.clear();
        self.restored_layout = false;
        self.drag = None;

        let options = *self.sim.options();
        for node in self.sim.nodes_mut() {
            node.pos = initial_position(&node.id, &options);
            node.vel = Vec2::ZERO;
            node.unpin();
        }

        let filters = self.filters.clone();
        for node in self.sim.nodes_mut() {
            node.visible = filters.node_visible(node.kind, &node.name);
            if !node.visible {
                let pos = node.pos;
                node.pin_at(pos);
            }
        }

        self.transform = Transform::new(self.sim.center());
        self.sim.reheat(1.0);
        self.strategy.on_tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::persist::{LAYOUT_STORE_KEY, MemoryStore};
    use crate::app::render::StrategyKind;
    use crate::docs::{ArtifactEdge, ArtifactKind, ArtifactNode, EdgeKind};

    fn node(id: &str, kind: ArtifactKind) -> ArtifactNode {
        ArtifactNode {
            id: id.to_owned(),
            name: id.to_owned(),
            kind,
        }
    }

    fn small_graph() -> ArtifactGraph {
        ArtifactGraph {
            nodes: vec![
                node("cmd/build", ArtifactKind::Command),
                node("wf/release", ArtifactKind::Workflow),
                node("agent/helper", ArtifactKind::Agent),
            ],
            edges: vec![
                ArtifactEdge {
                    source: "wf/release".to_owned(),
                    target: "cmd/build".to_owned(),
                    kind: EdgeKind::Uses,
                },
                ArtifactEdge {
                    source: "wf/release".to_owned(),
                    target: "agent/helper".to_owned(),
                    kind: EdgeKind::Spawns,
                },
            ],
        }
    }

    fn large_graph(count: usize) -> ArtifactGraph {
        let kinds = [
            ArtifactKind::Command,
            ArtifactKind::Workflow,
            ArtifactKind::Agent,
            ArtifactKind::Template,
        ];
        let nodes = (0..count)
            .map(|i| node(&format!("artifact-{i}"), kinds[i % kinds.len()]))
            .collect::<Vec<_>>();
        let edges = (0..count)
            .filter_map(|i| {
                let target = (i * 7 + 3) % count;
                (target != i).then(|| ArtifactEdge {
                    source: format!("artifact-{i}"),
                    target: format!("artifact-{target}"),
                    kind: if i % 2 == 0 {
                        EdgeKind::Uses
                    } else {
                        EdgeKind::Spawns
                    },
                })
            })
            .collect();
        ArtifactGraph { nodes, edges }
    }

    #[test]
    fn small_graphs_get_the_retained_strategy() {
        let vm = ViewModel::new(small_graph(), Box::new(MemoryStore::new()), false);
        assert_eq!(vm.strategy_kind, StrategyKind::Retained);
        assert_eq!(vm.sim.node_count(), 3);
        assert_eq!(vm.sim.edges().len(), 2);
        assert!(!vm.restored_layout);
    }

    #[test]
    fn build_drops_dangling_edges_and_duplicates() {
        let mut graph = small_graph();
        graph.edges.push(ArtifactEdge {
            source: "wf/release".to_owned(),
            target: "nope".to_owned(),
            kind: EdgeKind::Uses,
        });
        graph.edges.push(ArtifactEdge {
            source: "wf/release".to_owned(),
            target: "cmd/build".to_owned(),
            kind: EdgeKind::Includes,
        });

        let vm = ViewModel::new(graph, Box::new(MemoryStore::new()), false);
        assert_eq!(vm.sim.edges().len(), 2);
    }

    #[test]
    fn layout_round_trips_through_the_store_at_load() {
        let graph = small_graph();
        let mut vm = ViewModel::new(graph.clone(), Box::new(MemoryStore::new()), false);
        vm.sim.nodes_mut()[0].pos = vec2(111.0, 222.0);
        vm.sim.nodes_mut()[1].fx = Some(640.0);
        vm.sim.nodes_mut()[1].fy = Some(480.0);
        vm.transform.set_scale_clamped(1.8);
        assert!(vm.save_layout());

        let snapshot = vm.persistence.load().expect("layout saved");
        let mut store = MemoryStore::new();
        store.set(
            LAYOUT_STORE_KEY,
            &serde_json::to_string(&snapshot).expect("serialize"),
        );

        let vm2 = ViewModel::new(graph, Box::new(store), false);
        assert!(vm2.restored_layout);
        assert_eq!(vm2.sim.nodes()[0].pos, vec2(111.0, 222.0));
        assert_eq!(vm2.sim.nodes()[1].fx, Some(640.0));
        assert_eq!(vm2.sim.nodes()[1].fy, Some(480.0));
        assert_eq!(vm2.transform.scale, 1.8);
        assert!(
            vm2.sim.is_settled(),
            "a restored layout is not re-laid-out on load"
        );
    }

    #[test]
    fn reset_layout_clears_the_store_and_all_pins() {
        let graph = small_graph();
        let mut vm = ViewModel::new(graph, Box::new(MemoryStore::new()), false);
        vm.sim.nodes_mut()[0].fx = Some(5.0);
        vm.sim.nodes_mut()[0].fy = Some(5.0);
        assert!(vm.save_layout());

        vm.reset_layout();
        assert!(vm.persistence.load().is_none());
        assert!(!vm.sim.nodes()[0].pinned());
        assert!(!vm.sim.is_settled());
        assert_eq!(vm.transform.scale, 1.0);
    }

    #[test]
    fn large_graphs_use_the_immediate_strategy_and_spread_out() {
        let vm = ViewModel::new(large_graph(250), Box::new(MemoryStore::new()), false);
        assert_eq!(vm.strategy_kind, StrategyKind::Immediate);

        let mut vm = vm;
        assert!(vm.sim.uses_spatial_index());
        let mut ticks = 0usize;
        while vm.sim.tick() {
            ticks += 1;
            assert!(ticks < 10_000, "simulation failed to settle");
        }

        // Repulsion should leave no two centers closer than a few pixels,
        // allowing a handful of statistical outliers.
        let min_separation = 4.0;
        let nodes = vm.sim.nodes();
        let mut violations = 0usize;
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                if (nodes[i].pos - nodes[j].pos).length() < min_separation {
                    violations += 1;
                }
            }
        }
        assert!(violations <= 10, "{violations} node pairs closer than {min_separation}");
    }

    #[test]
    fn initial_positions_stay_inside_the_bounds() {
        let options = SimulationOptions::default();
        for i in 0..200 {
            let pos = initial_position(&format!("artifact-{i}"), &options);
            assert!(pos.x > 0.0 && pos.x < options.width);
            assert!(pos.y > 0.0 && pos.y < options.height);
        }
    }
}
