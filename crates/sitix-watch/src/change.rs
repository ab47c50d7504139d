//! The change-event contract a [`crate::Driver`] watches through (spec
//! §5, §9), and the `notify`-backed stream that satisfies it against a
//! real filesystem.

/// What happened to a path, collapsed from `notify`'s richer `EventKind`
/// down to the five outcomes the render driver actually branches on
/// (spec §4.7/§9: modify/create re-render, delete/rename-away drop the
/// output, rename-in is a create).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Modified,
    Created,
    Deleted,
    MovedFrom,
    MovedTo,
}

/// A source of filesystem change events, root-relative path first. `next`
/// blocks until an event is ready. Production watchers (`FsChangeStream`)
/// never return `None` in practice — only an irrecoverable watcher
/// failure ends the stream — but the `Option` lets tests drive a
/// [`crate::Driver`] through a finite, deterministic event sequence.
pub trait ChangeStream {
    fn next(&mut self) -> Option<(String, ChangeKind)>;
}
