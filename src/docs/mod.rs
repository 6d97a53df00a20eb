mod load;

pub use load::load_artifact_graph;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Command,
    Workflow,
    Agent,
    Template,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ArtifactKind {
    pub const ALL: [Self; 5] = [
        Self::Command,
        Self::Workflow,
        Self::Agent,
        Self::Template,
        Self::Unknown,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Workflow => "workflow",
            Self::Agent => "agent",
            Self::Template => "template",
            Self::Unknown => "unknown",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Command => 0,
            Self::Workflow => 1,
            Self::Agent => 2,
            Self::Template => 3,
            Self::Unknown => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Uses,
    Spawns,
    Includes,
    #[default]
    #[serde(other)]
    Unknown,
}

impl EdgeKind {
    // Rest length of the link force, per reference kind.
    pub fn rest_length(self) -> f32 {
        match self {
            Self::Uses => 100.0,
            Self::Spawns => 120.0,
            Self::Includes => 80.0,
            Self::Unknown => 110.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ArtifactNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: ArtifactKind,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ArtifactEdge {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub kind: EdgeKind,
}

#[derive(Clone, Debug, Default)]
pub struct ArtifactGraph {
    pub nodes: Vec<ArtifactNode>,
    pub edges: Vec<ArtifactEdge>,
}

impl ArtifactGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn kind_count(&self, kind: ArtifactKind) -> usize {
        self.nodes.iter().filter(|node| node.kind == kind).count()
    }
}
