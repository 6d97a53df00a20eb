use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use directories::ProjectDirs;
use eframe::egui::{Vec2, vec2};
use serde::{Deserialize, Serialize};

use crate::docs::ArtifactKind;

use super::graph::FilterState;
use super::physics::ForceSimulation;
use super::render_utils::Transform;

pub(in crate::app) const LAYOUT_STORE_KEY: &str = "layout";
const LAYOUT_VERSION: u32 = 1;
const AUTOSAVE_DEBOUNCE: Duration = Duration::from_millis(1000);

// Durable key-value storage boundary. Failures never propagate: a set that
// fails reports false, a get that fails reads as absent.
pub(in crate::app) trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> bool;
    fn remove(&mut self, key: &str);
}

pub(in crate::app) struct FileStore {
    dir: Option<PathBuf>,
}

impl FileStore {
    pub(in crate::app) fn new() -> Self {
        let dir = ProjectDirs::from("", "", "artifact-atlas")
            .map(|dirs| dirs.data_dir().to_path_buf());
        if dir.is_none() {
            log::warn!("no data directory available, layouts will not persist");
        }
        Self { dir }
    }

    fn path_for(&self, key: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)?).ok()
    }

    fn set(&mut self, key: &str, value: &str) -> bool {
        let Some(path) = self.path_for(key) else {
            return false;
        };
        if let Some(parent) = path.parent()
            && let Err(error) = fs::create_dir_all(parent)
        {
            log::warn!("failed to create layout directory {}: {error}", parent.display());
            return false;
        }
        match fs::write(&path, value) {
            Ok(()) => true,
            Err(error) => {
                log::warn!("failed to write {}: {error}", path.display());
                false
            }
        }
    }

    fn remove(&mut self, key: &str) {
        if let Some(path) = self.path_for(key) {
            let _ = fs::remove_file(path);
        }
    }
}

#[cfg(test)]
pub(in crate::app) struct MemoryStore {
    pub entries: HashMap<String, String>,
}

#[cfg(test)]
impl MemoryStore {
    pub(in crate::app) fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> bool {
        self.entries.insert(key.to_owned(), value.to_owned());
        true
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(in crate::app) struct SavedTransform {
    pub scale: f32,
    pub translate_x: f32,
    pub translate_y: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(in crate::app) struct SavedFilters {
    pub enabled_kinds: Vec<ArtifactKind>,
    pub search: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub(in crate::app) struct SavedNode {
    pub x: f32,
    pub y: f32,
    pub fx: Option<f32>,
    pub fy: Option<f32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(in crate::app) struct LayoutSnapshot {
    pub version: u32,
    pub transform: SavedTransform,
    pub filters: SavedFilters,
    pub nodes: HashMap<String, SavedNode>,
}

pub(in crate::app) fn snapshot_layout(
    sim: &ForceSimulation,
    transform: &Transform,
    filters: &FilterState,
) -> LayoutSnapshot {
    let nodes = sim
        .nodes()
        .iter()
        .map(|node| {
            (
                node.id.clone(),
                SavedNode {
                    x: node.pos.x,
                    y: node.pos.y,
                    fx: node.fx,
                    fy: node.fy,
                },
            )
        })
        .collect();

    LayoutSnapshot {
        version: LAYOUT_VERSION,
        transform: SavedTransform {
            scale: transform.scale,
            translate_x: transform.translate.x,
            translate_y: transform.translate.y,
        },
        filters: SavedFilters {
            enabled_kinds: filters.enabled_kinds(),
            search: filters.search.clone(),
        },
        nodes,
    }
}

// Overwrites matching live nodes; nodes absent from the snapshot keep their
// current (randomized) position. Visibility flags are the caller's concern.
pub(in crate::app) fn apply_snapshot(
    snapshot: &LayoutSnapshot,
    sim: &mut ForceSimulation,
    transform: &mut Transform,
    filters: &mut FilterState,
) {
    for (id, saved) in &snapshot.nodes {
        let Some(index) = sim.index_of(id) else {
            continue;
        };
        let node = &mut sim.nodes_mut()[index];
        node.pos = vec2(saved.x, saved.y);
        node.vel = Vec2::ZERO;
        node.fx = saved.fx;
        node.fy = saved.fy;
    }

    transform.set_scale_clamped(snapshot.transform.scale);
    transform.translate = vec2(snapshot.transform.translate_x, snapshot.transform.translate_y);

    *filters = FilterState::from_parts(&snapshot.filters.enabled_kinds, &snapshot.filters.search);
}

pub(in crate::app) struct LayoutPersistence {
    store: Box<dyn KeyValueStore>,
    dirty_since: Option<Instant>,
}

impl LayoutPersistence {
    pub(in crate::app) fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self {
            store,
            dirty_since: None,
        }
    }

    pub(in crate::app) fn save(&mut self, snapshot: &LayoutSnapshot) -> bool {
        let serialized = match serde_json::to_string(snapshot) {
            Ok(serialized) => serialized,
            Err(error) => {
                log::warn!("failed to serialize layout snapshot: {error}");
                return false;
            }
        };
        let saved = self.store.set(LAYOUT_STORE_KEY, &serialized);
        if saved {
            self.dirty_since = None;
        }
        saved
    }

    // Missing, malformed, or wrong-version records all read as "no saved
    // layout".
    pub(in crate::app) fn load(&self) -> Option<LayoutSnapshot> {
        let raw = self.store.get(LAYOUT_STORE_KEY)?;
        match serde_json::from_str::<LayoutSnapshot>(&raw) {
            Ok(snapshot) if snapshot.version == LAYOUT_VERSION => Some(snapshot),
            Ok(snapshot) => {
                log::warn!(
                    "ignoring layout snapshot with unsupported version {}",
                    snapshot.version
                );
                None
            }
            Err(error) => {
                log::warn!("ignoring malformed layout snapshot: {error}");
                None
            }
        }
    }

    pub(in crate::app) fn clear(&mut self) {
        self.store.remove(LAYOUT_STORE_KEY);
        self.dirty_since = None;
    }

    // Cancel-and-reschedule debounce: every mutation restarts the window.
    pub(in crate::app) fn mark_dirty(&mut self, now: Instant) {
        self.dirty_since = Some(now);
    }

    pub(in crate::app) fn autosave_due(&self, now: Instant) -> bool {
        self.dirty_since
            .is_some_and(|since| now.duration_since(since) >= AUTOSAVE_DEBOUNCE)
    }

    pub(in crate::app) fn is_dirty(&self) -> bool {
        self.dirty_since.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::physics::{SimulationOptions, test_node};
    use crate::docs::ArtifactKind;

    fn sample_sim() -> ForceSimulation {
        let mut nodes = vec![
            test_node("cmd/build", ArtifactKind::Command, vec2(420.0, 310.0)),
            test_node("wf/release", ArtifactKind::Workflow, vec2(900.0, 1200.0)),
        ];
        nodes[1].fx = Some(900.0);
        nodes[1].fy = Some(1200.0);
        ForceSimulation::new(nodes, Vec::new(), SimulationOptions::default())
    }

    #[test]
    fn save_load_apply_round_trips_exactly() {
        let mut sim = sample_sim();
        let mut transform = Transform::new(sim.center());
        transform.scale = 2.25;
        transform.translate = vec2(-40.0, 18.5);
        let mut filters = FilterState::default();
        filters.set_kind_enabled(ArtifactKind::Template, false);
        filters.search = "rel".to_owned();

        let mut persistence = LayoutPersistence::new(Box::new(MemoryStore::new()));
        assert!(persistence.save(&snapshot_layout(&sim, &transform, &filters)));

        // Scramble the live state, then restore.
        sim.nodes_mut()[0].pos = vec2(1.0, 1.0);
        sim.nodes_mut()[1].pos = vec2(2.0, 2.0);
        sim.nodes_mut()[1].unpin();
        let mut restored_transform = Transform::new(sim.center());
        let mut restored_filters = FilterState::default();

        let snapshot = persistence.load().expect("saved layout loads");
        apply_snapshot(&snapshot, &mut sim, &mut restored_transform, &mut restored_filters);

        assert_eq!(sim.nodes()[0].pos, vec2(420.0, 310.0));
        assert_eq!(sim.nodes()[0].fx, None);
        assert_eq!(sim.nodes()[1].pos, vec2(900.0, 1200.0));
        assert_eq!(sim.nodes()[1].fx, Some(900.0));
        assert_eq!(sim.nodes()[1].fy, Some(1200.0));
        assert_eq!(restored_transform.scale, 2.25);
        assert_eq!(restored_transform.translate, vec2(-40.0, 18.5));
        assert!(!restored_filters.kind_enabled(ArtifactKind::Template));
        assert!(restored_filters.kind_enabled(ArtifactKind::Command));
        assert_eq!(restored_filters.search, "rel");
    }

    #[test]
    fn nodes_missing_from_the_snapshot_keep_their_position() {
        let sim = sample_sim();
        let transform = Transform::new(sim.center());
        let filters = FilterState::default();
        let snapshot = snapshot_layout(&sim, &transform, &filters);

        let mut other_nodes = vec![
            test_node("cmd/build", ArtifactKind::Command, vec2(7.0, 7.0)),
            test_node("brand-new", ArtifactKind::Agent, vec2(55.0, 66.0)),
        ];
        other_nodes[0].vel = vec2(3.0, 3.0);
        let mut other_sim =
            ForceSimulation::new(other_nodes, Vec::new(), SimulationOptions::default());
        let mut other_transform = Transform::new(other_sim.center());
        let mut other_filters = FilterState::default();

        apply_snapshot(&snapshot, &mut other_sim, &mut other_transform, &mut other_filters);
        assert_eq!(other_sim.nodes()[0].pos, vec2(420.0, 310.0));
        assert_eq!(other_sim.nodes()[0].vel, Vec2::ZERO);
        assert_eq!(other_sim.nodes()[1].pos, vec2(55.0, 66.0), "unknown id untouched");
    }

    #[test]
    fn malformed_and_wrong_version_records_read_as_absent() {
        let mut store = MemoryStore::new();
        store.set(LAYOUT_STORE_KEY, "{not json");
        let persistence = LayoutPersistence::new(Box::new(store));
        assert!(persistence.load().is_none());

        let sim = sample_sim();
        let mut snapshot =
            snapshot_layout(&sim, &Transform::new(sim.center()), &FilterState::default());
        snapshot.version = 99;
        let mut store = MemoryStore::new();
        store.set(
            LAYOUT_STORE_KEY,
            &serde_json::to_string(&snapshot).expect("serialize"),
        );
        let persistence = LayoutPersistence::new(Box::new(store));
        assert!(persistence.load().is_none());

        let persistence = LayoutPersistence::new(Box::new(MemoryStore::new()));
        assert!(persistence.load().is_none(), "missing record");
    }

    #[test]
    fn clear_deletes_the_stored_record() {
        let sim = sample_sim();
        let snapshot =
            snapshot_layout(&sim, &Transform::new(sim.center()), &FilterState::default());
        let mut persistence = LayoutPersistence::new(Box::new(MemoryStore::new()));
        assert!(persistence.save(&snapshot));
        assert!(persistence.load().is_some());

        persistence.clear();
        assert!(persistence.load().is_none());
    }

    #[test]
    fn autosave_debounce_restarts_on_every_mutation() {
        let sim = sample_sim();
        let snapshot =
            snapshot_layout(&sim, &Transform::new(sim.center()), &FilterState::default());
        let mut persistence = LayoutPersistence::new(Box::new(MemoryStore::new()));

        let start = Instant::now();
        persistence.mark_dirty(start);
        assert!(!persistence.autosave_due(start + Duration::from_millis(400)));

        // A later mutation reschedules the window.
        persistence.mark_dirty(start + Duration::from_millis(800));
        assert!(!persistence.autosave_due(start + Duration::from_millis(1200)));
        assert!(persistence.autosave_due(start + Duration::from_millis(1900)));

        assert!(persistence.save(&snapshot));
        assert!(!persistence.is_dirty(), "a save clears the dirty window");
    }

    #[test]
    fn file_store_round_trips_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = FileStore {
            dir: Some(dir.path().to_path_buf()),
        };

        assert!(store.get(LAYOUT_STORE_KEY).is_none());
        assert!(store.set(LAYOUT_STORE_KEY, "{\"version\":1}"));
        assert_eq!(store.get(LAYOUT_STORE_KEY).as_deref(), Some("{\"version\":1}"));
        store.remove(LAYOUT_STORE_KEY);
        assert!(store.get(LAYOUT_STORE_KEY).is_none());
    }
}
