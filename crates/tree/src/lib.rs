//! Work-tree model and traversal primitives for the renderlens engine.
//!
//! The host rendering runtime owns a retained, double-buffered tree of
//! [`WorkNode`]s; this crate defines that tree's shape, the opaque [`Value`]
//! universe stored in props/state/context, the walker primitives the engine
//! diffs with, and the [`hook`] boundary a runtime registers through.

pub mod hook;
pub mod name;
pub mod node;
pub mod tree;
pub mod value;
pub mod walk;

pub use hook::{BuildKind, RendererDescriptor, RendererId, RuntimeHook};
pub use name::Name;
pub use node::{
    ComponentType, ContextDep, Flags, NodeType, PropBag, StateCell, StateQueue, WorkNode, WorkTag,
};
pub use tree::{NodeKey, WorkTree};
pub use value::Value;
pub use walk::{Direction, PropPair, context_pairs, descendants, prop_pairs, state_pairs, traverse};
