use crate::docs::ArtifactKind;

use super::super::physics::ForceSimulation;

const FILTER_REHEAT_ALPHA: f32 = 0.3;

// Kind toggles plus the search box. A node is visible iff its kind is
// enabled and (no search text, or its name contains the search text
// case-insensitively).
#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct FilterState {
    enabled: [bool; ArtifactKind::ALL.len()],
    pub search: String,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            enabled: [true; ArtifactKind::ALL.len()],
            search: String::new(),
        }
    }
}

impl FilterState {
    pub(in crate::app) fn kind_enabled(&self, kind: ArtifactKind) -> bool {
        self.enabled[kind.index()]
    }

    pub(in crate::app) fn set_kind_enabled(&mut self, kind: ArtifactKind, enabled: bool) {
        self.enabled[kind.index()] = enabled;
    }

    pub(in crate::app) fn enabled_kinds(&self) -> Vec<ArtifactKind> {
        ArtifactKind::ALL
            .into_iter()
            .filter(|kind| self.kind_enabled(*kind))
            .collect()
    }

    pub(in crate::app) fn from_parts(enabled_kinds: &[ArtifactKind], search: &str) -> Self {
        let mut state = Self {
            enabled: [false; ArtifactKind::ALL.len()],
            search: search.to_owned(),
        };
        for kind in enabled_kinds {
            state.enabled[kind.index()] = true;
        }
        state
    }

    pub(in crate::app) fn node_visible(&self, kind: ArtifactKind, name: &str) -> bool {
        if !self.kind_enabled(kind) {
            return false;
        }

        let query = self.search.trim();
        query.is_empty() || name.to_lowercase().contains(&query.to_lowercase())
    }
}

// Re-derive per-node visibility after a filter or search change. Hiding a
// node pins it in place so physics cannot move it while invisible; showing
// it unpins it unless it is mid-drag. Any change reheats the simulation so
// the remaining visible nodes settle into the freed space.
pub(in crate::app) fn apply_visibility(
    sim: &mut ForceSimulation,
    filters: &FilterState,
    dragging: Option<usize>,
) {
    let mut changed = false;
    for index in 0..sim.node_count() {
        let node = &mut sim.nodes_mut()[index];
        let visible = filters.node_visible(node.kind, &node.name);
        if visible == node.visible {
            continue;
        }

        node.visible = visible;
        changed = true;
        if !visible {
            let pos = node.pos;
            node.pin_at(pos);
        } else if dragging != Some(index) {
            node.unpin();
        }
    }

    if changed {
        sim.reheat(FILTER_REHEAT_ALPHA);
    }
}

// Restore path: set visibility flags from the filters without touching pins,
// so a loaded snapshot's fx/fy survive exactly.
pub(in crate::app) fn refresh_visibility_preserving_pins(
    sim: &mut ForceSimulation,
    filters: &FilterState,
) {
    for node in sim.nodes_mut() {
        node.visible = filters.node_visible(node.kind, &node.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::physics::{SimulationOptions, test_node};
    use eframe::egui::vec2;

    fn sim_with_kinds() -> ForceSimulation {
        let nodes = vec![
            test_node("cmd/build", ArtifactKind::Command, vec2(300.0, 300.0)),
            test_node("wf/release", ArtifactKind::Workflow, vec2(500.0, 500.0)),
            test_node("agent/helper", ArtifactKind::Agent, vec2(700.0, 700.0)),
        ];
        ForceSimulation::new(nodes, Vec::new(), SimulationOptions::default())
    }

    #[test]
    fn visibility_combines_kind_and_search() {
        let mut filters = FilterState::default();
        assert!(filters.node_visible(ArtifactKind::Command, "build"));

        filters.search = "REL".to_owned();
        assert!(filters.node_visible(ArtifactKind::Workflow, "wf/release"));
        assert!(!filters.node_visible(ArtifactKind::Command, "build"));

        filters.set_kind_enabled(ArtifactKind::Workflow, false);
        assert!(!filters.node_visible(ArtifactKind::Workflow, "wf/release"));
    }

    #[test]
    fn hiding_freezes_position_across_ticks() {
        let mut sim = sim_with_kinds();
        let mut filters = FilterState::default();
        filters.set_kind_enabled(ArtifactKind::Workflow, false);
        apply_visibility(&mut sim, &filters, None);

        let frozen = sim.nodes()[1].pos;
        assert!(!sim.nodes()[1].visible);
        assert!(sim.nodes()[1].pinned());

        for _ in 0..10 {
            sim.tick();
        }
        assert_eq!(sim.nodes()[1].pos, frozen);
    }

    #[test]
    fn showing_unpins_unless_mid_drag() {
        let mut sim = sim_with_kinds();
        let mut filters = FilterState::default();
        filters.set_kind_enabled(ArtifactKind::Command, false);
        filters.set_kind_enabled(ArtifactKind::Agent, false);
        apply_visibility(&mut sim, &filters, None);
        assert!(sim.nodes()[0].pinned());
        assert!(sim.nodes()[2].pinned());

        filters.set_kind_enabled(ArtifactKind::Command, true);
        filters.set_kind_enabled(ArtifactKind::Agent, true);
        // Node 2 is mid-drag: its pin must survive the reveal.
        apply_visibility(&mut sim, &filters, Some(2));
        assert!(!sim.nodes()[0].pinned());
        assert!(sim.nodes()[2].pinned());
        assert!(sim.nodes()[2].visible);
    }

    #[test]
    fn filter_changes_reheat_the_simulation() {
        let mut sim = sim_with_kinds();
        while sim.tick() {}
        assert!(sim.is_settled());

        let mut filters = FilterState::default();
        filters.set_kind_enabled(ArtifactKind::Agent, false);
        apply_visibility(&mut sim, &filters, None);
        assert!(!sim.is_settled());
        assert!(sim.alpha() >= FILTER_REHEAT_ALPHA - f32::EPSILON);

        // No change, no reheat.
        while sim.tick() {}
        apply_visibility(&mut sim, &filters, None);
        assert!(sim.is_settled());
    }

    #[test]
    fn restore_path_preserves_pins() {
        let mut sim = sim_with_kinds();
        sim.nodes_mut()[0].fx = Some(123.0);
        sim.nodes_mut()[0].fy = Some(456.0);

        let mut filters = FilterState::default();
        filters.set_kind_enabled(ArtifactKind::Workflow, false);
        refresh_visibility_preserving_pins(&mut sim, &filters);

        assert!(!sim.nodes()[1].visible);
        assert!(!sim.nodes()[1].pinned(), "restore does not add pins");
        assert_eq!(sim.nodes()[0].fx, Some(123.0), "existing pins untouched");
    }
}
