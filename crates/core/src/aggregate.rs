//! Coalescing of render events into decaying per-region summaries for
//! presentation layers.

use std::collections::HashMap;

use renderlens_tree::Name;
use serde::{Deserialize, Serialize};

use crate::event::{ChangeKind, RenderEvent};

/// Union of change kinds seen across aggregated events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeKinds(u8);

impl ChangeKinds {
    pub fn insert(&mut self, kind: ChangeKind) {
        self.0 |= kind.bit();
    }

    pub fn contains(self, kind: ChangeKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn union(self, other: ChangeKinds) -> ChangeKinds {
        ChangeKinds(self.0 | other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Identity of the on-screen slot an event is presented in. Events sharing
/// a key coalesce into one aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionKey {
    pub x: i64,
    pub y: i64,
}

impl RegionKey {
    pub fn new(x: i64, y: i64) -> Self {
        RegionKey { x, y }
    }
}

/// A coalesced, decaying summary of repeated render events for one region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedRender {
    pub name: Name,
    pub kinds: ChangeKinds,
    pub unstable: bool,
    pub unnecessary: bool,
    pub committed: bool,
    pub uses_compiler_memo: bool,
    /// Cumulative self time in ms.
    pub time: f64,
    /// Cumulative frame-rate samples.
    pub fps: u32,
    pub repeat_count: u32,
    /// Timestamp (ms) of the most recent folded event.
    pub last_seen: f64,
}

impl AggregatedRender {
    fn from_event(name: Name, event: &RenderEvent, now_ms: f64) -> Self {
        let mut aggregate = AggregatedRender {
            name,
            kinds: ChangeKinds::default(),
            unstable: false,
            unnecessary: false,
            committed: false,
            uses_compiler_memo: false,
            time: 0.0,
            fps: 0,
            repeat_count: 0,
            last_seen: now_ms,
        };
        aggregate.fold(event, now_ms);
        aggregate
    }

    /// Fold one more event into this aggregate.
    fn fold(&mut self, event: &RenderEvent, now_ms: f64) {
        for change in &event.changes {
            self.kinds.insert(change.kind);
            self.unstable = self.unstable || change.stable;
        }
        self.unnecessary = self.unnecessary || event.unnecessary.unwrap_or(false);
        self.committed = self.committed || event.did_commit;
        self.uses_compiler_memo = self.uses_compiler_memo || event.uses_compiler_memo;
        self.time += event.time;
        self.fps += event.fps;
        self.repeat_count += 1;
        self.last_seen = now_ms;
    }
}

/// Fold `from` into `to`: the combination rule used when two
/// independently-tracked keys turn out to occupy the same presentation slot.
pub fn merge(from: &AggregatedRender, to: &mut AggregatedRender) {
    to.kinds = to.kinds.union(from.kinds);
    to.unstable = to.unstable || from.unstable;
    to.unnecessary = to.unnecessary || from.unnecessary;
    to.committed = to.committed || from.committed;
    to.uses_compiler_memo = to.uses_compiler_memo || from.uses_compiler_memo;
    to.time += from.time;
    to.fps += from.fps;
    to.repeat_count += from.repeat_count;
    to.last_seen = to.last_seen.max(from.last_seen);
}

/// Rolling window of aggregates keyed by screen region.
pub struct Aggregator {
    window_ms: f64,
    entries: HashMap<RegionKey, AggregatedRender>,
}

impl Aggregator {
    /// `window_ms` is the decay window: a key with no events for that long
    /// is evicted and starts fresh on its next event.
    pub fn new(window_ms: f64) -> Self {
        Aggregator { window_ms, entries: HashMap::new() }
    }

    /// Record one event for `key` at `now_ms`, creating or folding the
    /// aggregate.
    pub fn observe(
        &mut self,
        key: RegionKey,
        name: Name,
        event: &RenderEvent,
        now_ms: f64,
    ) -> &AggregatedRender {
        let expired = self
            .entries
            .get(&key)
            .is_some_and(|a| now_ms - a.last_seen > self.window_ms);
        if expired {
            self.entries.remove(&key);
        }
        self.entries
            .entry(key)
            .and_modify(|a| a.fold(event, now_ms))
            .or_insert_with(|| AggregatedRender::from_event(name, event, now_ms))
    }

    /// Fold the aggregate tracked under `from` into the one under `to`.
    /// No-op unless both keys are live.
    pub fn merge_keys(&mut self, from: RegionKey, to: RegionKey) {
        if from == to || !self.entries.contains_key(&to) {
            return;
        }
        if let Some(source) = self.entries.remove(&from)
            && let Some(target) = self.entries.get_mut(&to)
        {
            merge(&source, target);
        }
    }

    /// Drop every aggregate that saw no event within the decay window.
    pub fn evict_stale(&mut self, now_ms: f64) {
        let window = self.window_ms;
        self.entries.retain(|_, a| now_ms - a.last_seen <= window);
    }

    pub fn get(&self, key: RegionKey) -> Option<&AggregatedRender> {
        self.entries.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RegionKey, &AggregatedRender)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

const MAX_NAMES_PER_BUCKET: usize = 4;
const MAX_LABEL_CHARS: usize = 40;
const COMPILER_MEMO_MARKER: char = '✨';

/// Build the presentation label for a group of aggregates sharing a screen
/// slot.
///
/// Aggregates are bucketed by repeat count, highest first; each bucket lists
/// up to four names (ellipsis beyond that), a `×N` suffix for repeated
/// renders, and a compiler-memo marker when any member uses it. The whole
/// label is truncated to forty characters, and a cumulative-time suffix is
/// appended when the total reaches a hundredth of a millisecond.
pub fn label_text(aggregates: &[&AggregatedRender]) -> Option<String> {
    let mut by_count: HashMap<u32, Vec<&AggregatedRender>> = HashMap::new();
    for aggregate in aggregates {
        by_count.entry(aggregate.repeat_count).or_default().push(aggregate);
    }

    let mut counts: Vec<u32> = by_count.keys().copied().collect();
    counts.sort_unstable_by(|a, b| b.cmp(a));

    let mut parts: Vec<String> = Vec::new();
    let mut cumulative_time = 0.0;
    for count in counts {
        let Some(group) = by_count.get(&count) else { continue };

        let names: Vec<&str> = group
            .iter()
            .take(MAX_NAMES_PER_BUCKET)
            .map(|a| a.name.as_str())
            .collect();
        let mut text = names.join(", ");

        cumulative_time += group.iter().map(|a| a.time).sum::<f64>();

        if group.len() > MAX_NAMES_PER_BUCKET {
            text.push('…');
        }
        if count > 1 {
            text.push_str(&format!(" ×{count}"));
        }
        if group.iter().any(|a| a.uses_compiler_memo) {
            text.insert(0, COMPILER_MEMO_MARKER);
        }
        parts.push(text);
    }

    let mut label = parts.join(", ");
    if label.is_empty() {
        return None;
    }

    if label.chars().count() > MAX_LABEL_CHARS {
        label = label.chars().take(MAX_LABEL_CHARS).collect();
        label.push('…');
    }

    if cumulative_time >= 0.01 {
        label.push_str(&format!(" ({}ms)", format_ms(cumulative_time)));
    }

    Some(label)
}

/// Two-decimal ms figure with trailing zeros trimmed: `6.00` → `6`,
/// `1.50` → `1.5`.
fn format_ms(ms: f64) -> String {
    let s = format!("{ms:.2}");
    let s = s.trim_end_matches('0');
    s.trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Phase;

    fn event(time: f64) -> RenderEvent {
        RenderEvent {
            phase: Phase::Update,
            component: Name::from("Row"),
            changes: Vec::new(),
            time,
            did_commit: true,
            unnecessary: None,
            uses_compiler_memo: false,
            fps: 60,
        }
    }

    fn aggregate(name: &str, repeat_count: u32, time: f64, memo: bool) -> AggregatedRender {
        AggregatedRender {
            name: Name::from(name),
            kinds: ChangeKinds::default(),
            unstable: false,
            unnecessary: false,
            committed: true,
            uses_compiler_memo: memo,
            time,
            fps: 0,
            repeat_count,
            last_seen: 0.0,
        }
    }

    #[test]
    fn three_events_sum_time_and_count() {
        let mut aggregator = Aggregator::new(5000.0);
        let key = RegionKey::new(10, 20);
        aggregator.observe(key, Name::from("Row"), &event(1.0), 0.0);
        aggregator.observe(key, Name::from("Row"), &event(2.0), 100.0);
        let folded = aggregator.observe(key, Name::from("Row"), &event(3.0), 200.0);
        assert_eq!(folded.repeat_count, 3);
        assert!((folded.time - 6.0).abs() < f64::EPSILON);
        assert_eq!(folded.fps, 180);
    }

    #[test]
    fn decay_evicts_and_restarts() {
        let mut aggregator = Aggregator::new(5000.0);
        let key = RegionKey::new(0, 0);
        aggregator.observe(key, Name::from("Row"), &event(1.0), 0.0);
        aggregator.evict_stale(5001.0);
        assert!(aggregator.get(key).is_none());

        let fresh = aggregator.observe(key, Name::from("Row"), &event(1.0), 6000.0);
        assert_eq!(fresh.repeat_count, 1);
    }

    #[test]
    fn stale_entry_resets_on_next_observe() {
        let mut aggregator = Aggregator::new(5000.0);
        let key = RegionKey::new(0, 0);
        aggregator.observe(key, Name::from("Row"), &event(1.0), 0.0);
        // No explicit eviction pass; the late event starts a fresh aggregate.
        let fresh = aggregator.observe(key, Name::from("Row"), &event(2.0), 9000.0);
        assert_eq!(fresh.repeat_count, 1);
        assert!((fresh.time - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn flags_and_kinds_union() {
        let mut aggregator = Aggregator::new(5000.0);
        let key = RegionKey::new(0, 0);
        let mut first = event(0.5);
        first.changes.push(crate::event::Change {
            kind: ChangeKind::Props,
            name: Name::from("x"),
            value: renderlens_tree::Value::from(1.0),
            prev_value: None,
            stable: true,
        });
        let mut second = event(0.5);
        second.changes.push(crate::event::Change {
            kind: ChangeKind::State,
            name: Name::from("{0}"),
            value: renderlens_tree::Value::from(2.0),
            prev_value: None,
            stable: false,
        });
        second.unnecessary = Some(true);

        aggregator.observe(key, Name::from("Row"), &first, 0.0);
        let folded = aggregator.observe(key, Name::from("Row"), &second, 1.0);
        assert!(folded.kinds.contains(ChangeKind::Props));
        assert!(folded.kinds.contains(ChangeKind::State));
        assert!(!folded.kinds.contains(ChangeKind::Context));
        assert!(folded.unstable);
        assert!(folded.unnecessary);
    }

    #[test]
    fn merge_keys_folds_counts() {
        let mut aggregator = Aggregator::new(5000.0);
        let a = RegionKey::new(0, 0);
        let b = RegionKey::new(1, 0);
        aggregator.observe(a, Name::from("Row"), &event(1.0), 0.0);
        aggregator.observe(a, Name::from("Row"), &event(1.0), 1.0);
        aggregator.observe(b, Name::from("Row"), &event(2.0), 2.0);

        aggregator.merge_keys(a, b);
        assert!(aggregator.get(a).is_none());
        let target = aggregator.get(b).unwrap();
        assert_eq!(target.repeat_count, 3);
        assert!((target.time - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn label_lists_four_names_with_ellipsis() {
        let aggs: Vec<AggregatedRender> = ["A", "B", "C", "D", "E"]
            .iter()
            .map(|n| aggregate(n, 3, 0.0, false))
            .collect();
        let refs: Vec<&AggregatedRender> = aggs.iter().collect();
        assert_eq!(label_text(&refs).unwrap(), "A, B, C, D… ×3");
    }

    #[test]
    fn label_orders_buckets_by_count_descending() {
        let one = aggregate("Rare", 1, 0.0, false);
        let many = aggregate("Hot", 12, 0.0, false);
        let label = label_text(&[&one, &many]).unwrap();
        assert_eq!(label, "Hot ×12, Rare");
    }

    #[test]
    fn label_appends_cumulative_time() {
        let a = aggregate("Row", 3, 6.0, false);
        assert_eq!(label_text(&[&a]).unwrap(), "Row ×3 (6ms)");

        let b = aggregate("Row", 1, 1.5, false);
        assert_eq!(label_text(&[&b]).unwrap(), "Row (1.5ms)");

        // Sub-threshold time is omitted.
        let c = aggregate("Row", 1, 0.004, false);
        assert_eq!(label_text(&[&c]).unwrap(), "Row");
    }

    #[test]
    fn label_marks_compiler_memo() {
        let a = aggregate("Memoed", 2, 0.0, true);
        assert_eq!(label_text(&[&a]).unwrap(), "✨Memoed ×2");
    }

    #[test]
    fn label_truncates_to_forty_chars() {
        let a = aggregate("AVeryLongComponentNameThatJustKeepsGoingAndGoing", 1, 0.0, false);
        let label = label_text(&[&a]).unwrap();
        assert_eq!(label.chars().count(), 41);
        assert!(label.ends_with('…'));
    }

    #[test]
    fn empty_input_has_no_label() {
        assert!(label_text(&[]).is_none());
    }
}
