//! Per-commit traversal: which nodes to visit, what lifecycle phase each is
//! in, and how much time each spent on itself.

use renderlens_tree::{Flags, NodeKey, WorkNode, WorkTree};

use crate::event::Phase;

/// Lifecycle phase of `node` in the commit being observed.
pub fn phase_of(node: &WorkNode) -> Phase {
    if node.flags.contains(Flags::DELETION) {
        Phase::Unmount
    } else if node.alternate().is_none() {
        Phase::Mount
    } else {
        Phase::Update
    }
}

/// Whether the node's own flags indicate an effect was scheduled for it this
/// commit — not merely for a descendant.
pub fn did_commit(node: &WorkNode) -> bool {
    node.flags.intersects(Flags::COMMIT_MASK)
}

/// Self time in ms: the node's actual duration minus the time attributed to
/// its direct children, clamped to zero. Uses only the host runtime's own
/// timing fields.
pub fn self_time(tree: &WorkTree, key: NodeKey) -> f64 {
    let Some(node) = tree.node(key) else { return 0.0 };
    let children_total: f64 = tree
        .children(key)
        .filter_map(|c| tree.node(c))
        .map(|c| c.actual_duration)
        .sum();
    (node.actual_duration - children_total).max(0.0)
}

/// Walk the portion of `root`'s subtree touched by this commit, invoking `f`
/// for every touched node with its phase.
///
/// A node is visited only when its own mutation flags or its subtree flags
/// are set, and the walk descends only into subtrees whose flags say
/// something below mutated — commits touching a small part of a large tree
/// cost proportionally to the touched part.
pub fn visit_commit<F>(tree: &WorkTree, root: NodeKey, mut f: F)
where
    F: FnMut(NodeKey, &WorkNode, Phase),
{
    let mut stack = vec![root];
    while let Some(key) = stack.pop() {
        let Some(node) = tree.node(key) else { continue };
        if !node.touched() {
            continue;
        }
        if !node.flags.is_empty() {
            f(key, node, phase_of(node));
        }
        if node.subtree_flags.is_empty() {
            continue;
        }
        // Push children in reverse so the first child pops first.
        let mut children: Vec<NodeKey> = tree.children(key).collect();
        while let Some(c) = children.pop() {
            stack.push(c);
        }
    }
}
