//! The process-wide multiplexer: any number of independent consumers share
//! one commit traversal. Each commit is fanned out only to consumers whose
//! validity predicate accepts the node, and one consumer's failure is routed
//! to its own error callback without blinding the others.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value as Json;
use thiserror::Error;
use tracing::debug;

use renderlens_tree::{BuildKind, NodeKey, RendererId, RuntimeHook, WorkNode, WorkTree};

use crate::diff::classify;
use crate::event::{Phase, RenderEvent};
use crate::fps::FrameClock;
use crate::options::{Options, OptionsPatch, validate_options};
use crate::report::ReportStore;
use crate::unnecessary::is_unnecessary;
use crate::visitor::{did_commit, self_time, visit_commit};

pub type ConsumerError = Box<dyn std::error::Error + Send + Sync>;
pub type ConsumerResult = Result<(), ConsumerError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("consumer `{key}` failed during {stage}: {source}")]
    Consumer {
        key: String,
        stage: &'static str,
        #[source]
        source: ConsumerError,
    },
}

/// A registered instrumentation consumer.
///
/// All methods have defaults so a consumer implements only what it needs.
/// Callback errors are caught at the commit boundary and handed back through
/// [`on_error`](Consumer::on_error); nothing a consumer returns can unwind
/// the host runtime's commit.
pub trait Consumer {
    /// Validity predicate: whether render events for this node should be
    /// delivered to this consumer.
    fn is_valid_node(&self, _tree: &WorkTree, _key: NodeKey, _node: &WorkNode) -> bool {
        true
    }

    /// Whether this consumer wants per-node change classification. Leaving
    /// this off skips the diff entirely when no tracking consumer accepts
    /// the node.
    fn track_changes(&self) -> bool {
        true
    }

    fn on_commit_start(&mut self) -> ConsumerResult {
        Ok(())
    }

    fn on_render(&mut self, _tree: &WorkTree, _key: NodeKey, _event: &RenderEvent) -> ConsumerResult {
        Ok(())
    }

    fn on_commit_finish(&mut self) -> ConsumerResult {
        Ok(())
    }

    fn on_error(&mut self, _error: &EngineError) {}
}

/// Pause signal handed back from [`Instrumentation::register`]. While
/// paused, bookkeeping still runs but no events are forwarded to the
/// consumer.
#[derive(Clone)]
pub struct InstanceHandle {
    paused: Arc<AtomicBool>,
}

impl InstanceHandle {
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

struct Instance {
    key: String,
    consumer: Box<dyn Consumer>,
    paused: Arc<AtomicBool>,
}

/// The engine: one commit visitor serving every registered consumer.
pub struct Instrumentation {
    hook: RuntimeHook,
    options: Options,
    instances: Vec<Instance>,
    frame_clock: FrameClock,
    report: ReportStore,
}

impl Instrumentation {
    pub fn new(hook: RuntimeHook, options: Options) -> Self {
        Instrumentation {
            hook,
            options,
            instances: Vec::new(),
            frame_clock: FrameClock::new(),
            report: ReportStore::new(),
        }
    }

    pub fn hook(&self) -> &RuntimeHook {
        &self.hook
    }

    pub fn hook_mut(&mut self) -> &mut RuntimeHook {
        &mut self.hook
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn report(&self) -> &ReportStore {
        &self.report
    }

    /// Register a consumer under `key`. Idempotent per key: re-registering
    /// replaces the consumer but preserves the existing pause signal, so
    /// handles held by the owner stay live.
    pub fn register(&mut self, key: impl Into<String>, consumer: Box<dyn Consumer>) -> InstanceHandle {
        let key = key.into();
        if let Some(existing) = self.instances.iter_mut().find(|i| i.key == key) {
            existing.consumer = consumer;
            return InstanceHandle { paused: Arc::clone(&existing.paused) };
        }
        let paused = Arc::new(AtomicBool::new(!self.options.enabled));
        self.instances.push(Instance {
            key,
            consumer,
            paused: Arc::clone(&paused),
        });
        InstanceHandle { paused }
    }

    /// Remove the consumer registered under `key`. The only way, besides
    /// pausing, to stop observation before the next commit.
    pub fn unregister(&mut self, key: &str) -> bool {
        let before = self.instances.len();
        self.instances.retain(|i| i.key != key);
        self.instances.len() != before
    }

    /// Apply a loosely-typed options layer. Invalid entries were already
    /// warned about and dropped by validation; toggling `enabled` flips
    /// every instance's pause signal.
    pub fn set_options(&mut self, raw: &serde_json::Map<String, Json>) {
        self.apply(&validate_options(raw));
    }

    /// Apply an already-validated options patch.
    pub fn apply(&mut self, patch: &OptionsPatch) {
        if patch.is_empty() {
            return;
        }
        if let Some(enabled) = patch.enabled {
            for instance in &self.instances {
                instance.paused.store(!enabled, Ordering::SeqCst);
            }
        }
        self.options = self.options.merged(patch);
    }

    /// Host animation-frame callback; feeds the frame-rate sample attached
    /// to each render event.
    pub fn on_frame(&mut self, now_ms: f64) {
        self.frame_clock.on_frame(now_ms);
    }

    /// Commit intake: invoked synchronously by the host runtime once per
    /// completed update batch. Walks the touched subtree, classifies each
    /// node, and fans events out to accepting consumers.
    pub fn on_commit(&mut self, renderer_id: RendererId, tree: &WorkTree, root: NodeKey) {
        if self.instances.is_empty() {
            return;
        }
        let production = self
            .hook
            .renderer(renderer_id)
            .is_some_and(|r| r.build_kind == BuildKind::Production);
        let check_unnecessary = self.options.track_unnecessary_renders
            && (!production || self.options.force_run_in_production);
        let fps = self.frame_clock.fps();

        self.each_unpaused("commit_start", |consumer| consumer.on_commit_start());

        let Instrumentation { instances, options, report, .. } = self;
        visit_commit(tree, root, |key, node, phase| {
            let Some(component) = node.component() else { return };

            let accepting: Vec<usize> = instances
                .iter()
                .enumerate()
                .filter(|(_, i)| !i.paused.load(Ordering::SeqCst))
                .filter(|(_, i)| i.consumer.is_valid_node(tree, key, node))
                .map(|(index, _)| index)
                .collect();

            let track = accepting
                .iter()
                .any(|&i| instances[i].consumer.track_changes());
            let changes = if track && phase != Phase::Unmount {
                classify(tree, key)
            } else {
                Vec::new()
            };
            let unnecessary = (check_unnecessary && phase == Phase::Update)
                .then(|| is_unnecessary(tree, key));

            let event = RenderEvent {
                phase,
                component: component.name.clone(),
                changes,
                time: self_time(tree, key),
                did_commit: did_commit(node),
                unnecessary,
                uses_compiler_memo: node.has_memo_cache,
                fps,
            };

            // Bookkeeping stays current even when every consumer is paused.
            report.record(tree, key, &event, options.report);

            if options.log {
                debug!(
                    component = %event.component,
                    phase = ?event.phase,
                    time_ms = event.time,
                    changes = event.changes.len(),
                    "render"
                );
            }

            for &index in &accepting {
                let instance = &mut instances[index];
                if let Err(source) = instance.consumer.on_render(tree, key, &event) {
                    let error = EngineError::Consumer {
                        key: instance.key.clone(),
                        stage: "render",
                        source,
                    };
                    instance.consumer.on_error(&error);
                }
            }
        });

        self.each_unpaused("commit_finish", |consumer| consumer.on_commit_finish());
    }

    fn each_unpaused(
        &mut self,
        stage: &'static str,
        mut f: impl FnMut(&mut dyn Consumer) -> ConsumerResult,
    ) {
        for instance in &mut self.instances {
            if instance.paused.load(Ordering::SeqCst) {
                continue;
            }
            if let Err(source) = f(instance.consumer.as_mut()) {
                let error = EngineError::Consumer {
                    key: instance.key.clone(),
                    stage,
                    source,
                };
                instance.consumer.on_error(&error);
            }
        }
    }
}
