//! The dependency graph a watch session threads rebuilds through (spec
//! §4.7, §9 design notes): a map from a source path to the list of files
//! that materialised it during their own render. Ground truth:
//! `original_source/src/treewatcher.cpp`'s `TreeWatcher::addDependant` /
//! `removeWatch`, reshaped per spec §9's suggested
//! `HashMap<PathBuf, {watch_handle, dependants: Vec<PathBuf>}>` (the
//! `watch_handle` itself belongs to `FsChangeStream`, not this map — this
//! type only owns the dependant lists spec §5 describes).

use std::collections::HashMap;

use sitix_render::DependencyRecorder;

/// `source -> [dependant, ...]`, insertion-ordered (spec §9: "keep the
/// traversal deterministic"). A dependant may legitimately occur in more
/// than one source's list (a file that includes two others depends on
/// both); it never occurs twice in the *same* list, since re-recording an
/// edge that already exists is a no-op.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    dependants: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every file presently on record as depending on `source`, in the
    /// order their edges were recorded.
    pub fn dependants_of(&self, source: &str) -> Vec<String> {
        self.dependants.get(source).cloned().unwrap_or_default()
    }

    /// Drop `source`'s entire dependants list (watch-mode `Deleted`/
    /// `MovedFrom`, spec §4.7: "unregister its dependants (edges to it are
    /// dropped)").
    pub fn remove_source(&mut self, source: &str) {
        self.dependants.remove(source);
    }

    /// Swap-remove every occurrence of `dependant` from every source's
    /// list (spec §5: "removal swap-deletes to keep it O(1)"). Called
    /// before a file re-renders so a reference it no longer makes doesn't
    /// leave a stale edge pointing at it.
    pub fn remove_dependant_everywhere(&mut self, dependant: &str) {
        for list in self.dependants.values_mut() {
            if let Some(pos) = list.iter().position(|d| d == dependant) {
                list.swap_remove(pos);
            }
        }
    }
}

impl DependencyRecorder for DependencyGraph {
    fn record(&mut self, source: &str, dependant: &str) {
        let list = self.dependants.entry(source.to_string()).or_default();
        if !list.iter().any(|d| d == dependant) {
            list.push(dependant.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_lists_dependants_in_insertion_order() {
        let mut g = DependencyGraph::new();
        g.record("partial.html", "index.html");
        g.record("partial.html", "about.html");
        assert_eq!(g.dependants_of("partial.html"), vec!["index.html", "about.html"]);
    }

    #[test]
    fn recording_the_same_edge_twice_does_not_duplicate() {
        let mut g = DependencyGraph::new();
        g.record("partial.html", "index.html");
        g.record("partial.html", "index.html");
        assert_eq!(g.dependants_of("partial.html"), vec!["index.html"]);
    }

    #[test]
    fn unknown_source_has_no_dependants() {
        let g = DependencyGraph::new();
        assert!(g.dependants_of("nope.html").is_empty());
    }

    #[test]
    fn remove_source_drops_its_whole_list() {
        let mut g = DependencyGraph::new();
        g.record("partial.html", "index.html");
        g.remove_source("partial.html");
        assert!(g.dependants_of("partial.html").is_empty());
    }

    #[test]
    fn remove_dependant_everywhere_swap_removes_from_every_list() {
        let mut g = DependencyGraph::new();
        g.record("header.html", "index.html");
        g.record("footer.html", "index.html");
        g.record("footer.html", "about.html");
        g.remove_dependant_everywhere("index.html");
        assert!(g.dependants_of("header.html").is_empty());
        assert_eq!(g.dependants_of("footer.html"), vec!["about.html"]);
    }
}
