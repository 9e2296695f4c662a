use slotmap::{SlotMap, new_key_type};

use crate::node::{Flags, WorkNode};

new_key_type! {
    /// Generational handle to a work node. Holding a key never extends the
    /// node's lifetime: once the host unmounts the node, the key resolves to
    /// `None` forever.
    pub struct NodeKey;
}

/// The retained, double-buffered work tree.
///
/// The host runtime owns the tree and drives every mutation; the
/// instrumentation engine only reads it. Each node may be paired with an
/// *alternate* holding its previously-committed version — the pairing is
/// symmetric and at most degree one, and the same twin slot is reused on
/// every subsequent update (double buffering).
#[derive(Default)]
pub struct WorkTree {
    nodes: SlotMap<NodeKey, WorkNode>,
    current_root: Option<NodeKey>,
}

impl WorkTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, key: NodeKey) -> Option<&WorkNode> {
        self.nodes.get(key)
    }

    pub fn node_mut(&mut self, key: NodeKey) -> Option<&mut WorkNode> {
        self.nodes.get_mut(key)
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root of the last committed tree.
    pub fn current_root(&self) -> Option<NodeKey> {
        self.current_root
    }

    /// Insert the tree's root node. Replaces the committed root pointer.
    pub fn insert_root(&mut self, node: WorkNode) -> NodeKey {
        let key = self.nodes.insert(node);
        self.current_root = Some(key);
        key
    }

    /// Insert `node` as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeKey, node: WorkNode) -> NodeKey {
        let key = self.nodes.insert(node);
        if let Some(n) = self.nodes.get_mut(key) {
            n.parent = Some(parent);
        }
        let mut cursor = self.nodes.get(parent).and_then(|p| p.child);
        match cursor {
            None => {
                if let Some(p) = self.nodes.get_mut(parent) {
                    p.child = Some(key);
                }
            }
            Some(_) => {
                while let Some(c) = cursor {
                    let next = self.nodes.get(c).and_then(|n| n.sibling);
                    if next.is_none() {
                        if let Some(n) = self.nodes.get_mut(c) {
                            n.sibling = Some(key);
                        }
                        break;
                    }
                    cursor = next;
                }
            }
        }
        key
    }

    /// Direct children of `key`, in sibling order.
    pub fn children(&self, key: NodeKey) -> Children<'_> {
        Children {
            tree: self,
            cursor: self.nodes.get(key).and_then(|n| n.child),
        }
    }

    /// Key of the previously-committed version of `key`, if one exists.
    pub fn alternate(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes.get(key).and_then(|n| n.alternate)
    }

    /// Begin re-rendering `key`: snapshot its committed fields into the
    /// alternate slot (allocated on first update, reused afterwards) and
    /// return the alternate's key. After this call the node at `key` is the
    /// in-progress pending version; the host mutates it freely and the pair
    /// converges when the host commits.
    pub fn begin_update(&mut self, key: NodeKey) -> Option<NodeKey> {
        let snapshot = {
            let node = self.nodes.get(key)?;
            WorkNode {
                tag: node.tag,
                node_type: node.node_type.clone(),
                memoized_props: node.memoized_props.clone(),
                pending_props: node.pending_props.clone(),
                state: node.state.clone(),
                contexts: node.contexts.clone(),
                flags: node.flags,
                subtree_flags: node.subtree_flags,
                actual_duration: node.actual_duration,
                actual_start_time: node.actual_start_time,
                has_memo_cache: node.has_memo_cache,
                child: node.child,
                sibling: node.sibling,
                parent: node.parent,
                alternate: Some(key),
            }
        };
        let existing = self.nodes.get(key).and_then(|n| n.alternate);
        let twin = match existing {
            Some(twin) => {
                if let Some(slot) = self.nodes.get_mut(twin) {
                    *slot = snapshot;
                }
                twin
            }
            None => {
                let twin = self.nodes.insert(snapshot);
                if let Some(node) = self.nodes.get_mut(key) {
                    node.alternate = Some(twin);
                }
                twin
            }
        };
        Some(twin)
    }

    /// Mark `key` (and transitively its subtree, via the host's flag
    /// bubbling) for removal this commit. Sets the deletion effect on the
    /// node and the child-deletion effect on its parent.
    pub fn mark_deletion(&mut self, key: NodeKey) {
        let parent = match self.nodes.get_mut(key) {
            Some(node) => {
                node.flags |= Flags::DELETION;
                node.parent
            }
            None => None,
        };
        if let Some(parent) = parent
            && let Some(p) = self.nodes.get_mut(parent)
        {
            p.flags |= Flags::CHILD_DELETION;
        }
    }

    /// Unlink `key` from its parent and free the node, its alternate, and
    /// all descendants (with their alternates). Called by the host after
    /// the unmount commit has been observed. Every freed key is dead from
    /// this point on.
    pub fn remove_subtree(&mut self, key: NodeKey) {
        self.unlink(key);
        let mut stack = vec![key];
        while let Some(k) = stack.pop() {
            let Some(node) = self.nodes.get(k) else { continue };
            let mut child = node.child;
            let twin = node.alternate;
            while let Some(c) = child {
                stack.push(c);
                child = self.nodes.get(c).and_then(|n| n.sibling);
            }
            if let Some(twin) = twin {
                self.nodes.remove(twin);
            }
            self.nodes.remove(k);
        }
        if self.current_root == Some(key) {
            self.current_root = None;
        }
    }

    fn unlink(&mut self, key: NodeKey) {
        let (parent, sibling) = match self.nodes.get(key) {
            Some(n) => (n.parent, n.sibling),
            None => return,
        };
        let Some(parent) = parent else { return };
        let first = self.nodes.get(parent).and_then(|p| p.child);
        if first == Some(key) {
            if let Some(p) = self.nodes.get_mut(parent) {
                p.child = sibling;
            }
            return;
        }
        let mut cursor = first;
        while let Some(c) = cursor {
            let next = self.nodes.get(c).and_then(|n| n.sibling);
            if next == Some(key) {
                if let Some(n) = self.nodes.get_mut(c) {
                    n.sibling = sibling;
                }
                return;
            }
            cursor = next;
        }
    }

    /// Host bookkeeping helper: OR each node's own flags into every
    /// ancestor's `subtree_flags`, bottom-up from the leaves of `root`'s
    /// subtree. The engine never calls this — flag semantics stay with the
    /// host.
    pub fn bubble_flags(&mut self, root: NodeKey) {
        let order = self.post_order(root);
        for key in order {
            let Some(node) = self.nodes.get(key) else { continue };
            let combined = Flags(node.flags.0 | node.subtree_flags.0);
            if let Some(parent) = node.parent
                && let Some(p) = self.nodes.get_mut(parent)
            {
                p.subtree_flags |= combined;
            }
        }
    }

    /// Host bookkeeping helper: clear all mutation flags in `root`'s
    /// subtree after a commit has been fully observed.
    pub fn clear_flags(&mut self, root: NodeKey) {
        for key in self.post_order(root) {
            if let Some(node) = self.nodes.get_mut(key) {
                node.flags = Flags::NONE;
                node.subtree_flags = Flags::NONE;
            }
        }
    }

    fn post_order(&self, root: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(k) = stack.pop() {
            let Some(node) = self.nodes.get(k) else { continue };
            out.push(k);
            let mut child = node.child;
            while let Some(c) = child {
                stack.push(c);
                child = self.nodes.get(c).and_then(|n| n.sibling);
            }
        }
        out.reverse();
        out
    }
}

/// Iterator over a node's direct children.
pub struct Children<'a> {
    tree: &'a WorkTree,
    cursor: Option<NodeKey>,
}

impl Iterator for Children<'_> {
    type Item = NodeKey;

    fn next(&mut self) -> Option<NodeKey> {
        let key = self.cursor?;
        self.cursor = self.tree.node(key).and_then(WorkNode::sibling);
        Some(key)
    }
}
