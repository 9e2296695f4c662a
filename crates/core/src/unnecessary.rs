//! Post-diff heuristic: did a scheduled render actually change anything a
//! user could observe?
//!
//! This re-walks the touched subtree and re-diffs host props, so it is
//! opt-in (`track_unnecessary_renders`) and additionally gated off in
//! production builds unless explicitly forced.

use renderlens_tree::{NodeKey, WorkTree, descendants};

use crate::diff::props_changes;
use crate::visitor::did_commit;

/// Host-visible descendants of `key` whose own commit flag is set — the
/// nodes whose output actually mutated this commit.
pub fn mutated_host_descendants(tree: &WorkTree, key: NodeKey) -> Vec<NodeKey> {
    descendants(tree, key)
        .filter(|&k| k != key)
        .filter(|&k| {
            tree.node(k)
                .is_some_and(|node| node.tag.is_host() && did_commit(node))
        })
        .collect()
}

/// Whether the render at `key` produced no observable output change.
///
/// Trivially true when the node scheduled no effect of its own. Otherwise
/// true iff every mutated host descendant changed only stable props — new
/// identities with identical structure contribute no real visual change.
pub fn is_unnecessary(tree: &WorkTree, key: NodeKey) -> bool {
    let Some(node) = tree.node(key) else { return true };
    if !did_commit(node) {
        return true;
    }
    for host in mutated_host_descendants(tree, key) {
        let has_required_change = props_changes(tree, host).iter().any(|c| !c.stable);
        if has_required_change {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use renderlens_tree::{ComponentType, Flags, PropBag, Value, WorkNode};

    fn component_over_host() -> (WorkTree, NodeKey, NodeKey) {
        let mut tree = WorkTree::new();
        let root = tree.insert_root(WorkNode::root());
        let app = tree.append_child(
            root,
            WorkNode::composite(ComponentType::new("App"), PropBag::new()),
        );
        let div = tree.append_child(app, WorkNode::host("div", PropBag::new()));
        (tree, app, div)
    }

    #[test]
    fn no_own_effect_is_trivially_unnecessary() {
        let (mut tree, app, div) = component_over_host();
        // Descendant mutated with a real change, but the node itself
        // scheduled nothing.
        tree.node_mut(div).unwrap().memoized_props.set("title", Value::from(1.0));
        tree.begin_update(div);
        tree.node_mut(div).unwrap().memoized_props.set("title", Value::from(2.0));
        tree.node_mut(div).unwrap().flags = Flags::UPDATE;
        assert!(is_unnecessary(&tree, app));
    }

    #[test]
    fn non_stable_host_change_is_necessary() {
        let (mut tree, app, div) = component_over_host();
        tree.node_mut(app).unwrap().flags = Flags::UPDATE;
        tree.node_mut(app).unwrap().subtree_flags = Flags::UPDATE;
        tree.node_mut(div).unwrap().memoized_props.set("title", Value::from(1.0));
        tree.begin_update(div);
        tree.node_mut(div).unwrap().memoized_props.set("title", Value::from(2.0));
        tree.node_mut(div).unwrap().flags = Flags::UPDATE;
        assert!(!is_unnecessary(&tree, app));
    }

    #[test]
    fn all_stable_host_changes_are_unnecessary() {
        let (mut tree, app, div) = component_over_host();
        tree.node_mut(app).unwrap().flags = Flags::UPDATE;
        tree.node_mut(app).unwrap().subtree_flags = Flags::UPDATE;
        tree.node_mut(div)
            .unwrap()
            .memoized_props
            .set("on_click", Value::function("", "() => {}"));
        tree.begin_update(div);
        tree.node_mut(div)
            .unwrap()
            .memoized_props
            .set("on_click", Value::function("", "() => {}"));
        tree.node_mut(div).unwrap().flags = Flags::UPDATE;
        assert!(is_unnecessary(&tree, app));
    }

    #[test]
    fn unflagged_host_descendants_are_ignored() {
        let (mut tree, app, div) = component_over_host();
        tree.node_mut(app).unwrap().flags = Flags::UPDATE;
        // Host props differ but the host scheduled no effect — not mutated.
        tree.node_mut(div).unwrap().memoized_props.set("title", Value::from(1.0));
        tree.begin_update(div);
        tree.node_mut(div).unwrap().memoized_props.set("title", Value::from(2.0));
        assert!(mutated_host_descendants(&tree, app).is_empty());
        assert!(is_unnecessary(&tree, app));
    }
}
