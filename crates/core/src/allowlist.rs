//! Opt-in component allow-listing for validity predicates.

use std::sync::Arc;

use renderlens_tree::{ComponentType, Direction, NodeKey, WorkTree, traverse};

#[derive(Debug, Clone, Copy, Default)]
pub struct AllowOptions {
    /// Also accept every descendant of an allowed component.
    pub include_children: bool,
}

/// Component allow-list keyed by component identity (the shared
/// `ComponentType` allocation, not its display name — two components may
/// share a name).
///
/// An empty list accepts everything; ignored components are rejected even
/// when the list is otherwise empty.
#[derive(Default)]
pub struct AllowList {
    entries: Vec<(Arc<ComponentType>, AllowOptions)>,
    ignored: Vec<Arc<ComponentType>>,
}

impl AllowList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(&mut self, component: &Arc<ComponentType>, options: AllowOptions) {
        if let Some(slot) = self
            .entries
            .iter_mut()
            .find(|(c, _)| Arc::ptr_eq(c, component))
        {
            slot.1 = options;
        } else {
            self.entries.push((Arc::clone(component), options));
        }
    }

    /// Mark a component as never instrumented, regardless of allow entries.
    pub fn ignore(&mut self, component: &Arc<ComponentType>) {
        if !self.ignored.iter().any(|c| Arc::ptr_eq(c, component)) {
            self.ignored.push(Arc::clone(component));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry_for(&self, component: &Arc<ComponentType>) -> Option<AllowOptions> {
        self.entries
            .iter()
            .find(|(c, _)| Arc::ptr_eq(c, component))
            .map(|(_, options)| *options)
    }

    /// Whether the node at `key` should be instrumented.
    pub fn accepts(&self, tree: &WorkTree, key: NodeKey) -> bool {
        let component = tree.node(key).and_then(|node| node.component().cloned());

        if let Some(component) = &component
            && self.ignored.iter().any(|c| Arc::ptr_eq(c, component))
        {
            return false;
        }

        if self.entries.is_empty() {
            return true;
        }

        if let Some(component) = &component
            && self.entry_for(component).is_some()
        {
            return true;
        }

        // Accept descendants of an allowed ancestor that opted its
        // children in.
        traverse(tree, key, Direction::Ascending, |_, node| {
            node.component()
                .and_then(|c| self.entry_for(c))
                .is_some_and(|options| options.include_children)
        })
        .is_some()
    }
}
