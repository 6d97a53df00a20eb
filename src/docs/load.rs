use std::collections::{HashMap, HashSet};
use std::fs;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use super::{ArtifactEdge, ArtifactGraph, ArtifactNode};

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    nodes: Vec<ArtifactNode>,
    #[serde(default)]
    edges: Vec<ArtifactEdge>,
}

pub fn load_artifact_graph(path: &str) -> Result<ArtifactGraph> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read artifact manifest {path}"))?;
    parse_manifest(&raw).with_context(|| format!("failed to parse artifact manifest {path}"))
}

pub(super) fn parse_manifest(raw: &str) -> Result<ArtifactGraph> {
    let manifest: Manifest =
        serde_json::from_str(raw).context("manifest is not valid artifact-graph JSON")?;

    if manifest.nodes.is_empty() {
        return Err(anyhow!("manifest contains no artifact nodes"));
    }

    // Duplicate ids: the last occurrence wins, matching how re-exported
    // artifacts shadow earlier definitions.
    let mut index_by_id: HashMap<String, usize> = HashMap::with_capacity(manifest.nodes.len());
    let mut nodes: Vec<ArtifactNode> = Vec::with_capacity(manifest.nodes.len());
    for node in manifest.nodes {
        if node.id.is_empty() {
            log::debug!("dropping artifact node with empty id (name: {})", node.name);
            continue;
        }

        if let Some(&existing) = index_by_id.get(&node.id) {
            log::debug!("duplicate artifact id {}, keeping the later definition", node.id);
            nodes[existing] = node;
        } else {
            index_by_id.insert(node.id.clone(), nodes.len());
            nodes.push(node);
        }
    }

    let known_ids = nodes.iter().map(|node| node.id.as_str()).collect::<HashSet<_>>();
    let mut seen_edges = HashSet::new();
    let mut edges = Vec::with_capacity(manifest.edges.len());
    let mut dropped = 0usize;

    for edge in manifest.edges {
        if !known_ids.contains(edge.source.as_str()) || !known_ids.contains(edge.target.as_str()) {
            dropped += 1;
            continue;
        }
        if edge.source == edge.target {
            continue;
        }
        if seen_edges.insert((edge.source.clone(), edge.target.clone())) {
            edges.push(edge);
        }
    }

    if dropped > 0 {
        log::debug!("dropped {dropped} edges referencing unknown artifact ids");
    }

    Ok(ArtifactGraph { nodes, edges })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::{ArtifactKind, EdgeKind};

    #[test]
    fn parses_nodes_edges_and_kinds() {
        let graph = parse_manifest(
            r#"{
                "nodes": [
                    {"id": "cmd/build", "name": "build", "kind": "command"},
                    {"id": "wf/release", "name": "release", "kind": "workflow"}
                ],
                "edges": [
                    {"source": "wf/release", "target": "cmd/build", "kind": "uses"}
                ]
            }"#,
        )
        .expect("parse manifest");

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.nodes[0].kind, ArtifactKind::Command);
        assert_eq!(graph.edges[0].kind, EdgeKind::Uses);
    }

    #[test]
    fn unknown_kinds_map_to_unknown_variants() {
        let graph = parse_manifest(
            r#"{
                "nodes": [
                    {"id": "a", "name": "a", "kind": "gizmo"},
                    {"id": "b", "name": "b"}
                ],
                "edges": [
                    {"source": "a", "target": "b", "kind": "teleports"}
                ]
            }"#,
        )
        .expect("parse manifest");

        assert_eq!(graph.nodes[0].kind, ArtifactKind::Unknown);
        assert_eq!(graph.nodes[1].kind, ArtifactKind::Unknown);
        assert_eq!(graph.edges[0].kind, EdgeKind::Unknown);
    }

    #[test]
    fn dangling_and_self_edges_are_dropped_silently() {
        let graph = parse_manifest(
            r#"{
                "nodes": [
                    {"id": "a", "name": "a", "kind": "agent"},
                    {"id": "b", "name": "b", "kind": "agent"}
                ],
                "edges": [
                    {"source": "a", "target": "b"},
                    {"source": "a", "target": "missing"},
                    {"source": "ghost", "target": "b"},
                    {"source": "b", "target": "b"}
                ]
            }"#,
        )
        .expect("parse manifest");

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edges[0].source, "a");
        assert_eq!(graph.edges[0].target, "b");
    }

    #[test]
    fn duplicate_node_ids_keep_the_last_definition() {
        let graph = parse_manifest(
            r#"{
                "nodes": [
                    {"id": "a", "name": "first", "kind": "command"},
                    {"id": "a", "name": "second", "kind": "template"}
                ],
                "edges": []
            }"#,
        )
        .expect("parse manifest");

        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.nodes[0].name, "second");
        assert_eq!(graph.nodes[0].kind, ArtifactKind::Template);
    }

    #[test]
    fn empty_manifest_is_an_error() {
        assert!(parse_manifest(r#"{"nodes": [], "edges": []}"#).is_err());
        assert!(parse_manifest("not json").is_err());
    }
}
