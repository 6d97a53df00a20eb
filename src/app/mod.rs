use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Instant;

use eframe::egui::{self, Context};
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::docs::{ArtifactGraph, load_artifact_graph};

mod graph;
mod persist;
mod physics;
mod render;
mod render_utils;
mod ui;

use graph::FilterState;
use persist::{FileStore, LayoutPersistence};
use physics::{ForceSimulation, IndexCell};
use render::{RenderStrategy, StrategyKind};
use render_utils::Transform;

pub struct AtlasApp {
    manifest_path: String,
    reset_layout: bool,
    state: AppState,
    reload_rx: Option<Receiver<Result<ArtifactGraph, String>>>,
}

enum AppState {
    Loading {
        rx: Receiver<Result<ArtifactGraph, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

// One simulation session: every piece of mutable engine state lives here and
// is rebuilt wholesale when a new graph arrives.
struct ViewModel {
    graph: ArtifactGraph,
    sim: ForceSimulation,
    strategy: Box<dyn RenderStrategy>,
    strategy_kind: StrategyKind,
    transform: Transform,
    filters: FilterState,
    persistence: LayoutPersistence,
    restored_layout: bool,
    hovered: Option<usize>,
    selected: Option<usize>,
    drag: Option<usize>,
    show_quadtree_overlay: bool,
    show_fps_bar: bool,
    fps_current: f32,
    fps_samples: VecDeque<f32>,
    budget_last_warn: Option<Instant>,
    matcher: SkimMatcherV2,
    search_hits_cache: Option<(String, Vec<(i64, usize)>)>,
    visible_node_count: usize,
    visible_edge_count: usize,
    index_cells: Vec<IndexCell>,
}

impl Drop for ViewModel {
    fn drop(&mut self) {
        self.strategy.teardown();
    }
}

impl AtlasApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, manifest_path: String, reset_layout: bool) -> Self {
        let state = Self::start_load(manifest_path.clone());
        Self {
            manifest_path,
            reset_layout,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(manifest_path: String) -> Receiver<Result<ArtifactGraph, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = load_artifact_graph(&manifest_path).map_err(|error| error.to_string());
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(manifest_path: String) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(manifest_path),
        }
    }

    fn make_view_model(graph: ArtifactGraph, reset_layout: bool) -> Box<ViewModel> {
        Box::new(ViewModel::new(
            graph,
            Box::new(FileStore::new()),
            reset_layout,
        ))
    }
}

impl eframe::App for AtlasApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;
        let reset_layout = self.reset_layout;

        match &mut self.state {
            AppState::Loading { rx } => {
                if let Ok(result) = rx.try_recv() {
                    transition = Some(match result {
                        Ok(graph) => AppState::Ready(Self::make_view_model(graph, reset_layout)),
                        Err(error) => AppState::Error(error),
                    });
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading artifact graph...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load artifact graph");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(self.manifest_path.clone()));
                    }
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &self.manifest_path, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.manifest_path.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(result) => {
                            transition = Some(match result {
                                Ok(graph) => AppState::Ready(Self::make_view_model(graph, reset_layout)),
                                Err(error) => AppState::Error(error),
                            });
                        }
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition = Some(AppState::Error(
                                "Background load worker disconnected".to_owned(),
                            ));
                        }
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            if matches!(next_state, AppState::Ready(_)) {
                // --reset-layout applies to the first successful load only.
                self.reset_layout = false;
            }
            self.reload_rx = None;
            self.state = next_state;
        }
    }
}
