//! The file driver and watcher (spec §4.7, §9): an initial full build
//! plus an incremental rebuild loop driven by filesystem change events.
//! Ground truth: `original_source/src/session.cpp` and
//! `original_source/src/treewatcher.cpp`.

mod change;
mod driver;
mod fs_stream;
mod graph;

pub use change::{ChangeKind, ChangeStream};
pub use driver::Driver;
pub use fs_stream::FsChangeStream;
pub use graph::DependencyGraph;
