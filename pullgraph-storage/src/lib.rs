//! In-memory graph and index collaborators for the pullgraph engine.

mod cursor;
pub mod index;
mod interner;
mod mem_graph;
mod stats;

pub use cursor::MemCursor;
pub use index::{
    DualIndexReader, DualIndexSampler, GenericIndexReader, NumberIndexReader, NumberKey,
    routes_to_boost,
};
pub use interner::Interner;
pub use mem_graph::MemGraph;
pub use stats::{FaultInjection, ReaderKind, ResourceCounts, ResourceTracker};
