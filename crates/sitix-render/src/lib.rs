//! The render engine (spec §4.6): the node dispatch that walks a
//! materialised object graph and writes output through the pipeline built
//! in `sitix-writer`, plus the concrete [`Materializer`]/[`ScopeResolver`]
//! glue (`resolver`) that lets `sitix-object`'s lazy lookup and
//! `sitix-evals`'s Evals programs reach a real [`SourceStore`] without
//! either of those crates depending on this one.

mod render;
mod resolver;

pub use render::{render_object, resolve_scope_then_parent};
pub use resolver::{DependencyRecorder, FileResolver, NullDependencyRecorder};

#[cfg(test)]
mod tests {
    use super::*;
    use sitix_config::Fileflags;
    use sitix_object::{Arena, NameKind};
    use sitix_store::{FsOutputStore, FsSourceStore};
    use sitix_writer::StringSink;
    use std::fs;

    fn render_one_file(src: &[(&str, &[u8])], entry: &str) -> String {
        let src_dir = tempfile::tempdir().unwrap();
        for (name, contents) in src {
            let path = src_dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, contents).unwrap();
        }
        let mut store = FsSourceStore::new(src_dir.path());
        let mut deps = NullDependencyRecorder;
        let mut resolver = FileResolver::new(&mut store, Vec::new(), &mut deps);
        resolver.set_current_file(Some(entry.to_string()));

        let mut arena = Arena::new();
        let root = arena.alloc_object(None, NameKind::Virtual, Fileflags::default());
        let escaped = sitix_config::paths::escape(entry, '.');
        let file = sitix_object::lookup(&mut arena, root, &escaped, None, &mut resolver).expect("entry file should resolve");

        let mut out = StringSink::new();
        let out_dir = tempfile::tempdir().unwrap();
        let mut output = FsOutputStore::new(out_dir.path());
        render_object(&mut arena, &mut resolver, &mut output, &mut out, file, file, true);
        out.into_inner()
    }

    #[test]
    fn plain_copy_file_renders_byte_identical() {
        let result = render_one_file(&[("index.html", b"hello, world")], "index.html");
        assert_eq!(result, "hello, world");
    }

    #[test]
    fn sitix_file_evaluates_evals_blob() {
        let result = render_one_file(&[("index.html", br#"[!]n: [v "foo" "bar" concat]"#)], "index.html");
        assert_eq!(result, "n: foobar");
    }

    #[test]
    fn if_statement_picks_the_true_branch() {
        let result = render_one_file(&[("index.html", b"[?][i true]yes[e]no[/]")], "index.html");
        assert_eq!(result, "yes");
    }

    #[test]
    fn if_statement_picks_the_false_branch() {
        let result = render_one_file(&[("index.html", b"[?][i false]yes[e]no[/]")], "index.html");
        assert_eq!(result, "no");
    }

    #[test]
    fn dereference_includes_another_file_in_callers_scope() {
        let result = render_one_file(
            &[
                ("index.html", b"[?][#partial.html]"),
                ("partial.html", b"[?]included"),
            ],
            "index.html",
        );
        assert_eq!(result, "included");
    }

    #[test]
    fn for_loop_renders_body_once_per_enumerated_child() {
        let result = render_one_file(
            &[(
                "index.html",
                br#"[?][=items-][=+ "a"][=+ "b"][/][f items it][v it][/]"#,
            )],
            "index.html",
        );
        assert_eq!(result, "ab");
    }

    #[test]
    fn escape_rule_strips_backslash_before_bracket() {
        let result = render_one_file(&[("index.html", b"[?]\\[not a tag\\]")], "index.html");
        assert_eq!(result, "[not a tag]");
    }

    #[test]
    fn verbatim_file_keeps_backslashes() {
        let result = render_one_file(&[("index.html", b"a\\b")], "index.html");
        assert_eq!(result, "a\\b");
    }
}
