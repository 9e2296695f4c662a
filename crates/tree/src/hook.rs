use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::name::Name;

pub type RendererId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildKind {
    Development,
    Production,
}

/// What a host runtime reports about itself when it registers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererDescriptor {
    pub version: Name,
    pub build_kind: BuildKind,
}

impl RendererDescriptor {
    pub fn development(version: impl Into<Name>) -> Self {
        RendererDescriptor { version: version.into(), build_kind: BuildKind::Development }
    }

    pub fn production(version: impl Into<Name>) -> Self {
        RendererDescriptor { version: version.into(), build_kind: BuildKind::Production }
    }
}

/// The renderer-registration boundary between host runtimes and the engine.
///
/// Owned by the process lifecycle and passed by reference to whatever needs
/// it — never a process-wide global, so tests construct a fresh hook per
/// scenario. Must exist before the host runtime initializes; the host calls
/// [`inject`](RuntimeHook::inject) when it starts.
pub struct RuntimeHook {
    renderers: BTreeMap<RendererId, RendererDescriptor>,
    next_id: RendererId,
    on_active: Option<Box<dyn FnOnce() + Send>>,
    active: bool,
    installed_at: Instant,
    dormant_warned: bool,
}

impl RuntimeHook {
    pub fn new() -> Self {
        RuntimeHook {
            renderers: BTreeMap::new(),
            next_id: 0,
            on_active: None,
            active: false,
            installed_at: Instant::now(),
            dormant_warned: false,
        }
    }

    /// Callback fired exactly once, the first time any renderer registers.
    /// Replaces any previously-set callback if none has fired yet.
    pub fn set_on_active(&mut self, f: impl FnOnce() + Send + 'static) {
        if !self.active {
            self.on_active = Some(Box::new(f));
        }
    }

    /// Host-runtime entry point: register a renderer, get back its id.
    pub fn inject(&mut self, renderer: RendererDescriptor) -> RendererId {
        self.next_id += 1;
        let id = self.next_id;
        self.renderers.insert(id, renderer);
        if !self.active {
            self.active = true;
            if let Some(f) = self.on_active.take() {
                f();
            }
        }
        id
    }

    pub fn renderers(&self) -> &BTreeMap<RendererId, RendererDescriptor> {
        &self.renderers
    }

    pub fn renderer(&self, id: RendererId) -> Option<&RendererDescriptor> {
        self.renderers.get(&id)
    }

    /// Whether any renderer has ever registered.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether any registered renderer is a production build.
    pub fn has_production_renderer(&self) -> bool {
        self.renderers
            .values()
            .any(|r| r.build_kind == BuildKind::Production)
    }

    /// If no renderer has registered within `grace` of hook construction,
    /// emit a single diagnostic warning. The engine stays dormant either
    /// way — this never escalates to an error.
    pub fn warn_if_dormant(&mut self, grace: Duration) -> bool {
        if self.active || self.dormant_warned || self.installed_at.elapsed() < grace {
            return false;
        }
        self.dormant_warned = true;
        warn!(
            grace_ms = grace.as_millis() as u64,
            "no renderer registered; instrumentation must be installed before the host runtime starts"
        );
        true
    }
}

impl Default for RuntimeHook {
    fn default() -> Self {
        Self::new()
    }
}
