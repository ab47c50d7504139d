//! [`FileResolver`]: the concrete [`Materializer`] the render engine hands
//! to every `sitix_object::lookup` call. Bridges lazy root-level name
//! resolution to a real [`SourceStore`]: classifies a file's three-byte
//! header (spec §6 "File signals"), parses Sitix bodies via `sitix-parser`,
//! synthesizes the non-virile `filename` child, and records dependency
//! edges into whatever [`DependencyRecorder`] the caller supplies (owned by
//! `sitix-watch` in the full driver, a no-op in tests).

use sitix_config::Fileflags;
use sitix_object::{
    Arena, Materializer, NameKind, Node, ObjectId, PathKind, PlainTextNode, TextBlobNode,
};
use sitix_store::SourceStore;
use sitix_text::ByteWindow;

/// Receives a `source -> dependant` edge whenever resolving a name on behalf
/// of `dependant` materialises `source` for the first time (spec §4.7:
/// "a directed dependency edge... is recorded in the watcher"). Implemented
/// by `sitix-watch`'s dependency graph; render/parser code never needs to
/// know the concrete type.
pub trait DependencyRecorder {
    fn record(&mut self, source: &str, dependant: &str);
}

/// A [`DependencyRecorder`] that discards every edge — used by the initial,
/// watch-less build and by tests that don't care about incremental rebuilds.
#[derive(Debug, Default)]
pub struct NullDependencyRecorder;

impl DependencyRecorder for NullDependencyRecorder {
    fn record(&mut self, _source: &str, _dependant: &str) {}
}

/// The [`Materializer`] backing a real render session: config entries
/// registered via `-c NAME [VALUE]`, a filesystem-backed [`SourceStore`],
/// and a dependency recorder. `current_file` names whichever file's render
/// pass is presently driving lookups, so a materialisation triggered deep
/// inside a `[f]`/`[^]`/directory-unpack chain still attributes its
/// dependency edge to the file actually being rendered, not to whichever
/// object happened to be passed as `lookup`'s root.
pub struct FileResolver<'a> {
    store: &'a mut dyn SourceStore,
    config: Vec<(String, ObjectId)>,
    deps: &'a mut dyn DependencyRecorder,
    current_file: Option<String>,
}

impl<'a> FileResolver<'a> {
    pub fn new(
        store: &'a mut dyn SourceStore,
        config: Vec<(String, ObjectId)>,
        deps: &'a mut dyn DependencyRecorder,
    ) -> Self {
        Self {
            store,
            config,
            deps,
            current_file: None,
        }
    }

    /// Set which file's render pass is presently triggering lookups, so
    /// nested materialisations attribute their dependency edge correctly.
    /// Cleared (`None`) when no file render is in progress.
    pub fn set_current_file(&mut self, path: Option<String>) {
        self.current_file = path;
    }
}

/// Classify a file's three-byte header (spec §6): `is_template`, whether the
/// escape/Sitix stage is active, and the `Fileflags` a freshly materialised
/// file object starts with.
fn classify_header(bytes: &ByteWindow) -> (bool, bool, Fileflags) {
    if bytes.starts_with(b"[!]") {
        (false, true, Fileflags::default())
    } else if bytes.starts_with(b"[?]") {
        (true, true, Fileflags::default())
    } else {
        (false, false, Fileflags::verbatim())
    }
}

impl<'a> Materializer for FileResolver<'a> {
    fn config_lookup(&self, name: &str) -> Option<ObjectId> {
        self.config
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| *id)
    }

    fn path_kind(&self, path: &str) -> PathKind {
        self.store.exists(path)
    }

    fn list_dir(&self, path: &str) -> Vec<String> {
        self.store.list_dir(path)
    }

    fn materialize_file(&mut self, arena: &mut Arena, path: &str, parent: ObjectId) -> ObjectId {
        if let Some(dependant) = self.current_file.clone() {
            if dependant != path {
                self.deps.record(path, &dependant);
            }
        }

        let Some(bytes) = self.store.open(path) else {
            tracing::error!(target: "store", path, "source missing or unreadable; render of this reference will be empty");
            let empty = arena.alloc_object(Some(parent), NameKind::Named(path.to_string()), Fileflags::verbatim());
            let node = arena.alloc_node(Node::Object(empty));
            arena.add_child(parent, node);
            return empty;
        };

        let (is_template, is_sitix_file, flags0) = classify_header(&bytes);
        let file_obj = arena.alloc_object(Some(parent), NameKind::Named(path.to_string()), flags0);
        {
            let slot = arena.object_mut(file_obj);
            slot.is_file = true;
            slot.is_template = is_template;
        }

        // Synthetic, non-virile `filename` child (spec §4.3 step 6b).
        let filename_obj = arena.alloc_object(Some(file_obj), NameKind::Named("filename".to_string()), flags0);
        arena.object_mut(filename_obj).virile = false;
        let text_node = arena.alloc_node(Node::TextBlob(TextBlobNode {
            parent: filename_obj,
            fileflags: flags0,
            text: path.to_string(),
        }));
        arena.add_child(filename_obj, text_node);
        let filename_node = arena.alloc_node(Node::Object(filename_obj));
        arena.add_child(file_obj, filename_node);

        if is_sitix_file {
            let mut body = bytes;
            body.advance(3);
            let mut flags = flags0;
            if let Err(err) = sitix_parser::parse_body(&mut body, arena, file_obj, &mut flags) {
                tracing::error!(target: "parser", path, %err, "failed to parse directive body");
            }
            arena.object_mut(file_obj).fileflags = flags;
        } else {
            let node = arena.alloc_node(Node::PlainText(PlainTextNode {
                parent: file_obj,
                fileflags: flags0,
                text: bytes,
            }));
            arena.add_child(file_obj, node);
        }

        let node = arena.alloc_node(Node::Object(file_obj));
        arena.add_child(parent, node);
        file_obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitix_object::NullMaterializer as _;
    use sitix_store::FsSourceStore;
    use std::fs;

    #[test]
    fn materializes_a_sitix_file_with_filename_child() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.html"), b"[!]hello").unwrap();
        let mut store = FsSourceStore::new(dir.path());
        let mut deps = NullDependencyRecorder;
        let mut resolver = FileResolver::new(&mut store, Vec::new(), &mut deps);

        let mut arena = Arena::new();
        let root = arena.alloc_object(None, NameKind::Virtual, Fileflags::default());
        let file = resolver.materialize_file(&mut arena, "a.html", root);

        assert!(arena.object(file).is_file);
        let filename = sitix_object::child_search_up(&arena, file, "filename").unwrap();
        assert!(!arena.object(filename).virile);
    }

    #[test]
    fn verbatim_file_gets_sitix_flag_off() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("raw.txt"), b"no header here").unwrap();
        let mut store = FsSourceStore::new(dir.path());
        let mut deps = NullDependencyRecorder;
        let mut resolver = FileResolver::new(&mut store, Vec::new(), &mut deps);

        let mut arena = Arena::new();
        let root = arena.alloc_object(None, NameKind::Virtual, Fileflags::default());
        let file = resolver.materialize_file(&mut arena, "raw.txt", root);
        assert!(!arena.object(file).fileflags.sitix);
    }

    #[test]
    fn records_dependency_edge_against_current_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("inc.html"), b"[?]body").unwrap();
        let mut store = FsSourceStore::new(dir.path());

        struct Recorder(Vec<(String, String)>);
        impl DependencyRecorder for Recorder {
            fn record(&mut self, source: &str, dependant: &str) {
                self.0.push((source.to_string(), dependant.to_string()));
            }
        }
        let mut deps = Recorder(Vec::new());
        let mut resolver = FileResolver::new(&mut store, Vec::new(), &mut deps);
        resolver.set_current_file(Some("index.html".to_string()));

        let mut arena = Arena::new();
        let root = arena.alloc_object(None, NameKind::Virtual, Fileflags::default());
        resolver.materialize_file(&mut arena, "inc.html", root);

        assert_eq!(deps.0, vec![("inc.html".to_string(), "index.html".to_string())]);
    }
}
