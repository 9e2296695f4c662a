//! Per-node render bookkeeping.
//!
//! Counts and times accumulate in a node-keyed side table. The table is a
//! `SecondaryMap` over the host tree's generational keys, so entries become
//! unreachable the moment the host unmounts a node — the store can never
//! extend a node's lifetime. A record is written under both the node and its
//! alternate, so the double-buffered pair reads as one component.

use std::collections::HashMap;

use renderlens_tree::{Name, NodeKey, WorkTree};
use serde::Serialize;
use slotmap::SecondaryMap;

use crate::event::RenderEvent;

#[derive(Debug, Clone, Default, Serialize)]
pub struct RenderData {
    pub count: u32,
    /// Cumulative self time in ms.
    pub time: f64,
    pub last_event: Option<RenderEvent>,
}

#[derive(Default)]
pub struct ReportStore {
    by_node: SecondaryMap<NodeKey, RenderData>,
    by_name: HashMap<Name, RenderData>,
}

impl ReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one render event into the store. When `by_name` is set, the
    /// long-lived per-component-name table is updated as well (it survives
    /// unmounts, unlike the node-keyed table).
    pub fn record(&mut self, tree: &WorkTree, key: NodeKey, event: &RenderEvent, by_name: bool) {
        let alternate = tree.alternate(key);

        // The pair shares one logical record; read whichever side is ahead.
        let node_data = self.by_node.get(key);
        let alt_data = alternate.and_then(|a| self.by_node.get(a));
        let existing_count = node_data
            .map_or(0, |d| d.count)
            .max(alt_data.map_or(0, |d| d.count));
        let existing_time =
            f64::max(node_data.map_or(0.0, |d| d.time), alt_data.map_or(0.0, |d| d.time));

        let data = RenderData {
            count: existing_count + 1,
            time: existing_time + event.time,
            last_event: Some(event.clone()),
        };
        if let Some(alternate) = alternate {
            self.by_node.insert(alternate, data.clone());
        }
        self.by_node.insert(key, data);

        if by_name {
            let entry = self.by_name.entry(event.component.clone()).or_default();
            entry.count += 1;
            entry.time += event.time;
            entry.last_event = Some(event.clone());
        }
    }

    /// Render data for a live node. A dead key reads as absent.
    pub fn node_data(&self, key: NodeKey) -> Option<&RenderData> {
        self.by_node.get(key)
    }

    /// The long-lived per-component-name report.
    pub fn get_report(&self, name: &str) -> Option<&RenderData> {
        self.by_name.get(name)
    }

    pub fn by_name(&self) -> &HashMap<Name, RenderData> {
        &self.by_name
    }

    pub fn clear(&mut self) {
        self.by_node.clear();
        self.by_name.clear();
    }
}
