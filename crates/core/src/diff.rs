//! Change classification: which of a node's props, state cells, and context
//! subscriptions differ from its previous committed snapshot, and whether
//! each difference is a stable (likely-spurious) one.

use renderlens_tree::name::state_names_from_source;
use renderlens_tree::{Name, NodeKey, Value, WorkTree, context_pairs, prop_pairs, state_pairs};

use crate::event::{Change, ChangeKind};

/// Whether a differing pair is a *stable* change: a new allocation that is
/// structurally indistinguishable from the old one. Signals an inline
/// closure or object literal recreated every render.
pub fn is_stable_change(previous: &Value, next: &Value) -> bool {
    previous.is_reference()
        && next.is_reference()
        && !previous.ref_eq(next)
        && previous.fingerprint() == next.fingerprint()
}

/// Prop changes between a node and its previous snapshot.
///
/// Renderable element values are never diffed structurally — their own work
/// nodes are diffed independently — so a pair with an element on either side
/// is skipped outright.
pub fn props_changes(tree: &WorkTree, key: NodeKey) -> Vec<Change> {
    let mut changes = Vec::new();
    for pair in prop_pairs(tree, key) {
        if pair.previous.is_equal(pair.next)
            || pair.previous.is_element()
            || pair.next.is_element()
        {
            continue;
        }
        changes.push(Change {
            kind: ChangeKind::Props,
            name: pair.name.clone(),
            value: pair.next.clone(),
            prev_value: Some(pair.previous.clone()),
            stable: is_stable_change(pair.previous, pair.next),
        });
    }
    changes
}

/// State changes between a node and its previous snapshot.
///
/// Only cells carrying a queue are considered — queue-less cells are
/// runtime-internal. Cells are unnamed in the underlying runtime; names are
/// recovered from the component's source text where possible, with
/// positional `{index}` fallback.
pub fn state_changes(tree: &WorkTree, key: NodeKey) -> Vec<Change> {
    let recovered: Vec<Name> = tree
        .node(key)
        .and_then(|node| node.component())
        .and_then(|component| component.source.as_ref())
        .map(|source| state_names_from_source(source))
        .unwrap_or_default();

    let mut changes = Vec::new();
    let mut observable_index = 0usize;
    for (prev, next) in state_pairs(tree, key) {
        if next.queue.is_none() {
            continue;
        }
        let index = observable_index;
        observable_index += 1;
        if prev.memoized.is_equal(&next.memoized) {
            continue;
        }
        changes.push(Change {
            kind: ChangeKind::State,
            name: recovered
                .get(index)
                .cloned()
                .unwrap_or_else(|| Name::positional(index)),
            value: next.memoized.clone(),
            prev_value: Some(prev.memoized.clone()),
            stable: is_stable_change(&prev.memoized, &next.memoized),
        });
    }
    changes
}

/// Context changes between a node and its previous snapshot: one per
/// subscription whose observed value differs.
pub fn context_changes(tree: &WorkTree, key: NodeKey) -> Vec<Change> {
    let mut changes = Vec::new();
    for (prev, next) in context_pairs(tree, key) {
        if prev.observed.is_equal(&next.observed) {
            continue;
        }
        changes.push(Change {
            kind: ChangeKind::Context,
            name: next.context.clone(),
            value: next.observed.clone(),
            prev_value: Some(prev.observed.clone()),
            stable: is_stable_change(&prev.observed, &next.observed),
        });
    }
    changes
}

/// Full classification for a node: props, then state, then context.
pub fn classify(tree: &WorkTree, key: NodeKey) -> Vec<Change> {
    let mut changes = props_changes(tree, key);
    changes.extend(state_changes(tree, key));
    changes.extend(context_changes(tree, key));
    changes
}
