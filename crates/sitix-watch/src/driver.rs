//! [`Driver`]: ties the object arena, a [`SourceStore`]/[`OutputStore`]
//! pair, and a [`DependencyGraph`] together into the two operations spec
//! §4.7 describes — an initial full build, and an incremental watch loop
//! — without depending on `notify` directly (that's [`crate::FsChangeStream`]).
//! Ground truth: `original_source/src/session.cpp`'s `Session::build`/
//! `Session::watch`.

use std::collections::{HashSet, VecDeque};

use sitix_config::Fileflags;
use sitix_object::{Arena, Materializer, NameKind, Node, ObjectId, TextBlobNode};
use sitix_render::{render_object, FileResolver};
use sitix_store::{OutputStore, PathKind, SourceStore};

use crate::change::{ChangeKind, ChangeStream};
use crate::graph::DependencyGraph;

/// Join a directory-walk prefix and an entry name, treating the empty
/// string as "the store's root" rather than producing a leading `/` the
/// way `sitix_config::paths::concat("", name)` would.
fn join_rel(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        sitix_config::paths::concat(dir, name)
    }
}

/// Owns the whole render session: the object arena, the config objects
/// registered via `-c`, the store pair, and the dependency graph a watch
/// loop consults to find a changed file's dependants.
pub struct Driver {
    arena: Arena,
    root: ObjectId,
    source: Box<dyn SourceStore>,
    output: Box<dyn OutputStore>,
    config: Vec<(String, ObjectId)>,
    graph: DependencyGraph,
}

impl Driver {
    pub fn new(source: Box<dyn SourceStore>, output: Box<dyn OutputStore>) -> Self {
        let mut arena = Arena::new();
        let root = arena.alloc_object(None, NameKind::Virtual, Fileflags::default());
        Self {
            arena,
            root,
            source,
            output,
            config: Vec::new(),
            graph: DependencyGraph::new(),
        }
    }

    /// Register a `-c NAME [VALUE]` entry (spec §6): a root-level named
    /// object, with a single `TextBlob` child holding `VALUE` when one was
    /// given, or none at all (a bare flag that stringifies empty).
    pub fn add_config(&mut self, name: &str, value: Option<&str>) {
        let obj = self.arena.alloc_object(Some(self.root), NameKind::Named(name.to_string()), Fileflags::default());
        if let Some(v) = value {
            let node = self.arena.alloc_node(Node::TextBlob(TextBlobNode {
                parent: obj,
                fileflags: Fileflags::default(),
                text: v.to_string(),
            }));
            self.arena.add_child(obj, node);
        }
        self.config.push((name.to_string(), obj));
    }

    /// Enumerate the source tree in directory order and render every
    /// regular file once (spec §4.7's initial pass).
    pub fn build_all(&mut self) {
        let files = self.list_all_files();
        for path in files {
            self.render_file(&path);
        }
    }

    fn list_all_files(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.walk("", &mut out);
        out
    }

    fn walk(&self, dir: &str, out: &mut Vec<String>) {
        for entry in self.source.list_dir(dir) {
            let path = join_rel(dir, &entry);
            match self.source.exists(&path) {
                PathKind::Directory => self.walk(&path, out),
                PathKind::File => out.push(path),
                PathKind::Missing | PathKind::Other => {}
            }
        }
    }

    /// (Re-)render the file at `path`: materialise it fresh, swap the
    /// result into the object tree in place of whatever occupied its name
    /// before (if anything), and dereference-render it to the
    /// corresponding output path — unless it's a template (spec §6's
    /// `[?]` header: "parsed but never written").
    fn render_file(&mut self, path: &str) {
        self.graph.remove_dependant_everywhere(path);

        match self.source.open(path) {
            Some(bytes) if bytes.is_empty() => {
                tracing::warn!(target: "watch", path, "zero-size file; render skipped");
                return;
            }
            Some(_) => {}
            None => {
                tracing::error!(target: "watch", path, "source missing or unreadable; render skipped");
                return;
            }
        }

        let mut resolver = FileResolver::new(&mut *self.source, self.config.clone(), &mut self.graph);
        resolver.set_current_file(Some(path.to_string()));

        let file_obj = resolver.materialize_file(&mut self.arena, path, self.root);
        let escaped = sitix_config::paths::escape(path, '.');
        let replaced = sitix_object::replace(&mut self.arena, self.root, &escaped, file_obj, &mut resolver);

        if replaced {
            // `materialize_file` always appends a fresh child of `root`
            // pointing at `file_obj`; `replace` separately swapped the old
            // occupant's own slot to point at `file_obj` too, so the two
            // now duplicate each other. Drop the fresh append rather than
            // let root's children grow without bound across re-renders.
            let children = self.arena.object(self.root).children.clone();
            if let Some(&last) = children.last() {
                if matches!(self.arena.node(last), Node::Object(oid) if *oid == file_obj) {
                    self.arena.object_mut(self.root).children.pop();
                }
            }
        }

        if self.arena.object(file_obj).is_template {
            tracing::debug!(target: "watch", path, "template file parsed but not written");
            return;
        }

        match self.output.create(path) {
            Ok(mut sink) => {
                render_object(&mut self.arena, &mut resolver, &mut *self.output, &mut *sink, file_obj, file_obj, true);
                tracing::info!(target: "watch", path, "rendered");
            }
            Err(err) => {
                tracing::error!(target: "watch", path, %err, "failed to open output sink");
            }
        }
    }

    /// Re-render `path` and, transitively, breadth-first, every file that
    /// depended on something along the way — deterministic in the order
    /// dependants were originally recorded (spec §9).
    fn rerender_transitive(&mut self, path: &str) {
        let mut queue = VecDeque::new();
        let mut seen = HashSet::new();
        queue.push_back(path.to_string());
        seen.insert(path.to_string());

        while let Some(p) = queue.pop_front() {
            self.render_file(&p);
            for dependant in self.graph.dependants_of(&p) {
                if seen.insert(dependant.clone()) {
                    queue.push_back(dependant);
                }
            }
        }
    }

    /// Drive an incremental rebuild off `stream` until it closes (spec
    /// §4.7/§9): modifications and creations re-render transitively;
    /// deletions drop the output and unregister the dependency edges that
    /// named it, without cascading further (a dependant left pointing at a
    /// now-missing file will warn the next time it actually re-renders).
    pub fn watch(&mut self, mut stream: impl ChangeStream) {
        while let Some((path, kind)) = stream.next() {
            self.source.invalidate(&path);
            tracing::info!(target: "watch", path = %path, kind = ?kind, "change event");
            match kind {
                ChangeKind::Modified | ChangeKind::Created | ChangeKind::MovedTo => {
                    self.rerender_transitive(&path);
                }
                ChangeKind::Deleted | ChangeKind::MovedFrom => {
                    if let Err(err) = self.output.remove(&path) {
                        tracing::error!(target: "watch", path = %path, %err, "failed to remove output for deleted source");
                    }
                    self.graph.remove_source(&path);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitix_store::{FsOutputStore, FsSourceStore};
    use std::fs;

    fn driver(src: &std::path::Path, out: &std::path::Path) -> Driver {
        Driver::new(Box::new(FsSourceStore::new(src)), Box::new(FsOutputStore::new(out)))
    }

    fn read(out: &std::path::Path, rel: &str) -> String {
        fs::read_to_string(out.join(rel)).unwrap()
    }

    #[test]
    fn build_all_renders_every_file_in_the_tree() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(src.path().join("index.html"), b"[!]hi").unwrap();
        fs::create_dir(src.path().join("posts")).unwrap();
        fs::write(src.path().join("posts/one.html"), b"one").unwrap();

        let mut d = driver(src.path(), out.path());
        d.build_all();

        assert_eq!(read(out.path(), "index.html"), "hi");
        assert_eq!(read(out.path(), "posts/one.html"), "one");
    }

    #[test]
    fn build_all_skips_writing_a_template_file() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(src.path().join("partial.html"), b"[?]body").unwrap();

        let mut d = driver(src.path(), out.path());
        d.build_all();

        assert!(!out.path().join("partial.html").exists());
    }

    #[test]
    fn config_entry_is_visible_to_a_rendered_file() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(src.path().join("index.html"), br#"[!][v sitename]"#).unwrap();

        let mut d = driver(src.path(), out.path());
        d.add_config("sitename", Some("Example"));
        d.build_all();

        assert_eq!(read(out.path(), "index.html"), "Example");
    }

    struct ScriptedStream {
        events: VecDeque<(String, ChangeKind)>,
    }
    impl ChangeStream for ScriptedStream {
        fn next(&mut self) -> Option<(String, ChangeKind)> {
            self.events.pop_front()
        }
    }

    #[test]
    fn watch_rerenders_a_file_transitively_through_its_dependants() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(src.path().join("partial.html"), b"[?]v1").unwrap();
        fs::write(src.path().join("index.html"), b"[!][#partial.html]").unwrap();

        let mut d = driver(src.path(), out.path());
        d.build_all();
        assert_eq!(read(out.path(), "index.html"), "v1");

        fs::write(src.path().join("partial.html"), b"[?]v2").unwrap();
        let stream = ScriptedStream {
            events: VecDeque::from([("partial.html".to_string(), ChangeKind::Modified)]),
        };
        d.watch(stream);

        assert_eq!(read(out.path(), "index.html"), "v2");
    }

    #[test]
    fn watch_deletion_removes_the_output_file() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(src.path().join("index.html"), b"hello").unwrap();

        let mut d = driver(src.path(), out.path());
        d.build_all();
        assert!(out.path().join("index.html").exists());

        fs::remove_file(src.path().join("index.html")).unwrap();
        let stream = ScriptedStream {
            events: VecDeque::from([("index.html".to_string(), ChangeKind::Deleted)]),
        };
        d.watch(stream);

        assert!(!out.path().join("index.html").exists());
    }

    #[test]
    fn rerendering_a_file_does_not_grow_roots_children_unbounded() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(src.path().join("index.html"), b"hello").unwrap();

        let mut d = driver(src.path(), out.path());
        d.build_all();
        let before = d.arena.object(d.root).children.len();

        for _ in 0..3 {
            d.render_file("index.html");
        }
        let after = d.arena.object(d.root).children.len();
        assert_eq!(before, after);
    }
}
