use renderlens_tree::{Name, Value};
use serde::{Deserialize, Serialize};

/// A node's lifecycle classification for one commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Mount,
    Update,
    Unmount,
}

/// Which part of a node's inputs a change was observed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Props,
    State,
    Context,
}

impl ChangeKind {
    pub(crate) fn bit(self) -> u8 {
        match self {
            ChangeKind::Props => 0b001,
            ChangeKind::State => 0b010,
            ChangeKind::Context => 0b100,
        }
    }
}

/// One observed change on a node.
///
/// `stable: true` means the value differs by identity but serializes
/// identically and is of a type prone to spurious recreation — a heuristic
/// flag for a likely-avoidable re-render cause, not a proof of equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Change {
    pub kind: ChangeKind,
    pub name: Name,
    pub value: Value,
    pub prev_value: Option<Value>,
    pub stable: bool,
}

/// Immutable record of one node's outcome for one commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderEvent {
    pub phase: Phase,
    pub component: Name,
    pub changes: Vec<Change>,
    /// Self time in ms, exclusive of children.
    pub time: f64,
    /// Whether this node itself committed observable output.
    pub did_commit: bool,
    /// `None` when the opt-in unnecessary-render check did not run.
    pub unnecessary: Option<bool>,
    pub uses_compiler_memo: bool,
    /// Frame-rate sample at event time.
    pub fps: u32,
}
