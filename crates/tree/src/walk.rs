use crate::name::Name;
use crate::node::{ContextDep, StateCell, WorkNode};
use crate::tree::{NodeKey, WorkTree};
use crate::value::{UNDEFINED, Value};

/// Which way [`traverse`] walks from its start node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Follow parent links up to the root.
    Ascending,
    /// Pre-order over the start node's subtree, child then sibling.
    Descending,
}

/// Walk from `start`, applying `predicate` to each node, and return the
/// first node it selects. Missing links end the walk; they are never an
/// error, and a dead `start` key simply yields `None`.
pub fn traverse<F>(
    tree: &WorkTree,
    start: NodeKey,
    direction: Direction,
    mut predicate: F,
) -> Option<NodeKey>
where
    F: FnMut(NodeKey, &WorkNode) -> bool,
{
    match direction {
        Direction::Ascending => {
            let mut cursor = Some(start);
            while let Some(key) = cursor {
                let node = tree.node(key)?;
                if predicate(key, node) {
                    return Some(key);
                }
                cursor = node.parent();
            }
            None
        }
        Direction::Descending => {
            descendants(tree, start).find(|&key| match tree.node(key) {
                Some(node) => predicate(key, node),
                None => false,
            })
        }
    }
}

/// Pre-order iterator over `start`'s subtree (including `start`). Siblings
/// of `start` itself are not visited.
pub fn descendants(tree: &WorkTree, start: NodeKey) -> Descendants<'_> {
    let stack = if tree.contains(start) { vec![start] } else { Vec::new() };
    Descendants { tree, stack }
}

pub struct Descendants<'a> {
    tree: &'a WorkTree,
    stack: Vec<NodeKey>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeKey;

    fn next(&mut self) -> Option<NodeKey> {
        let key = self.stack.pop()?;
        if let Some(node) = self.tree.node(key) {
            // Sibling below child so the child subtree pops first.
            let mut reversed = Vec::new();
            let mut cursor = node.child();
            while let Some(c) = cursor {
                reversed.push(c);
                cursor = self.tree.node(c).and_then(WorkNode::sibling);
            }
            while let Some(c) = reversed.pop() {
                self.stack.push(c);
            }
        }
        Some(key)
    }
}

/// Paired state cells of a node and its previous snapshot, in cell order.
/// Pairing ends at the shorter list; a node with no alternate pairs nothing.
pub fn state_pairs<'a>(tree: &'a WorkTree, key: NodeKey) -> Vec<(&'a StateCell, &'a StateCell)> {
    let Some(node) = tree.node(key) else { return Vec::new() };
    let Some(prev) = node.alternate().and_then(|a| tree.node(a)) else {
        return Vec::new();
    };
    prev.state.iter().zip(node.state.iter()).collect()
}

/// Paired context subscriptions of a node and its previous snapshot.
pub fn context_pairs<'a>(tree: &'a WorkTree, key: NodeKey) -> Vec<(&'a ContextDep, &'a ContextDep)> {
    let Some(node) = tree.node(key) else { return Vec::new() };
    let Some(prev) = node.alternate().and_then(|a| tree.node(a)) else {
        return Vec::new();
    };
    prev.contexts.iter().zip(node.contexts.iter()).collect()
}

/// One prop key present on either side of a node's previous/next prop bags.
pub struct PropPair<'a> {
    pub name: &'a Name,
    pub previous: &'a Value,
    pub next: &'a Value,
}

/// Union of prop keys across a node's previous snapshot and committed
/// version, previous-side keys first, each paired with both values (absent
/// slots read as `Undefined`). Empty when the node has no previous snapshot.
pub fn prop_pairs<'a>(tree: &'a WorkTree, key: NodeKey) -> Vec<PropPair<'a>> {
    let Some(node) = tree.node(key) else { return Vec::new() };
    let Some(prev) = node.alternate().and_then(|a| tree.node(a)) else {
        return Vec::new();
    };
    let mut pairs: Vec<PropPair<'a>> = Vec::with_capacity(node.memoized_props.len());
    for (name, previous) in prev.memoized_props.iter() {
        pairs.push(PropPair {
            name,
            previous,
            next: node.memoized_props.get(name),
        });
    }
    for (name, next) in node.memoized_props.iter() {
        if pairs.iter().any(|p| p.name == name) {
            continue;
        }
        pairs.push(PropPair { name, previous: &UNDEFINED, next });
    }
    pairs
}
