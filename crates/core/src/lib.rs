//! Commit instrumentation engine.
//!
//! Attaches to a host runtime's retained work tree (see `renderlens-tree`),
//! walks the subtree touched by each commit, classifies what changed on
//! every re-rendered component and why, and fans compact render events out
//! to registered consumers. Aggregation coalesces repeated events per screen
//! region for presentation and reporting layers.

pub mod aggregate;
pub mod allowlist;
pub mod diff;
pub mod event;
pub mod fps;
pub mod instrumentation;
pub mod options;
pub mod report;
pub mod unnecessary;
pub mod visitor;

pub use aggregate::{AggregatedRender, Aggregator, ChangeKinds, RegionKey, label_text, merge};
pub use allowlist::{AllowList, AllowOptions};
pub use diff::{classify, is_stable_change};
pub use event::{Change, ChangeKind, Phase, RenderEvent};
pub use fps::FrameClock;
pub use instrumentation::{
    Consumer, ConsumerError, ConsumerResult, EngineError, InstanceHandle, Instrumentation,
};
pub use options::{AnimationSpeed, Options, OptionsPatch, validate_options};
pub use report::{RenderData, ReportStore};
pub use unnecessary::is_unnecessary;
pub use visitor::{did_commit, phase_of, self_time, visit_commit};
