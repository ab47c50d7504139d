//! The directive grammar: turns a raw file body into `Node`s inside a
//! shared [`Arena`]. Ground truth: `original_source/src/sitix.cpp`'s
//! `fillObject` (the single recursive-descent loop every directive, and
//! every nested body, runs through).
//!
//! Evals expressions (`[v ...]`, `[i ...]`, `[> ...]`) are parsed once here,
//! at construction time, rather than re-parsed on every render (spec §9) —
//! the `cond`/`program` fields on the node structs already hold a parsed
//! `sitix_evals::Program`.

use sitix_config::{FlagName, FlagOp, Fileflags};
use sitix_evals::ParseError as EvalsParseError;
use sitix_object::{
    Arena, CopierNode, DebuggerNode, DereferenceNode, EvalsBlobNode, ForLoopNode, IfStatementNode, NameKind, Node,
    ObjectId, PlainTextNode, RedirectorNode,
};
use sitix_text::ByteWindow;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed Evals expression in directive: {0}")]
    Evals(#[from] EvalsParseError),
}

/// Why [`parse_body`] stopped consuming its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Ran off the end of the source window (top-level file bodies end
    /// this way).
    Eof,
    /// Hit a `[/]` closing tag, which this call consumed.
    End,
    /// Hit an `[e]` tag: the caller (only `IfStatement` parsing cares)
    /// should now parse the else-branch body.
    Else,
}

/// Parse directives out of `src` into `container`'s children until a
/// closing tag or EOF, mutating `fileflags` in place as `[@ on|off ...]`
/// directives are encountered (fileflags are file-wide and parse-time, not
/// scoped to the directive that changed them — spec §4.4).
pub fn parse_body(
    src: &mut ByteWindow,
    arena: &mut Arena,
    container: ObjectId,
    fileflags: &mut Fileflags,
) -> Result<ExitReason, ParseError> {
    while !src.is_empty() {
        match src.peek(0) {
            Some(b'[') => {
                src.advance(1);
                let mut tag_data = src.consume(b']', true);
                src.advance(1);
                let Some(tag_op) = tag_data.peek(0) else {
                    tracing::warn!("empty directive tag; ignoring");
                    continue;
                };
                tag_data.advance(1);
                tag_data.trim();
                if let Some(exit) = dispatch_tag(tag_op, tag_data, src, arena, container, fileflags)? {
                    return Ok(exit);
                }
            }
            Some(b']') => {
                tracing::warn!("unmatched closing bracket; skipping it");
                src.advance(1);
            }
            _ => {
                let text = src.consume(b'[', true);
                let node = Node::PlainText(PlainTextNode {
                    parent: container,
                    fileflags: *fileflags,
                    text,
                });
                let nid = arena.alloc_node(node);
                arena.add_child(container, nid);
            }
        }
    }
    Ok(ExitReason::Eof)
}

/// Handle one `[...]` directive. Returns `Some(exit)` when the directive
/// itself terminates the enclosing body (`[/]`, `[e]`); `None` otherwise.
fn dispatch_tag(
    tag_op: u8,
    mut tag_data: ByteWindow,
    src: &mut ByteWindow,
    arena: &mut Arena,
    container: ObjectId,
    fileflags: &mut Fileflags,
) -> Result<Option<ExitReason>, ParseError> {
    match tag_op {
        b'=' => {
            parse_assignment(tag_data, src, arena, container, fileflags)?;
            Ok(None)
        }
        b'f' => {
            parse_for_loop(tag_data, src, arena, container, fileflags)?;
            Ok(None)
        }
        b'i' => {
            // Mirrors the original's extra `map++` immediately before
            // constructing an `IfStatement`, which every other directive
            // that recurses into `src` skips.
            src.advance(1);
            let cond = sitix_evals::parser::parse(tag_data)?;
            let main = arena.alloc_object(Some(container), NameKind::Virtual, *fileflags);
            let exit = parse_body(src, arena, main, fileflags)?;
            let else_branch = if exit == ExitReason::Else {
                let e = arena.alloc_object(Some(container), NameKind::Virtual, *fileflags);
                parse_body(src, arena, e, fileflags)?;
                Some(e)
            } else {
                None
            };
            let node = Node::IfStatement(IfStatementNode {
                parent: container,
                fileflags: *fileflags,
                cond,
                main,
                else_branch,
            });
            let nid = arena.alloc_node(node);
            arena.add_child(container, nid);
            Ok(None)
        }
        b'e' => {
            // Same idiosyncratic extra skip as `i`, on the way out this time.
            src.advance(1);
            Ok(Some(ExitReason::Else))
        }
        b'v' => {
            let program = sitix_evals::parser::parse(tag_data)?;
            let node = Node::EvalsBlob(EvalsBlobNode {
                parent: container,
                fileflags: *fileflags,
                program,
            });
            let nid = arena.alloc_node(node);
            arena.add_child(container, nid);
            Ok(None)
        }
        b'd' => {
            let node = Node::DebuggerStatement(DebuggerNode {
                parent: container,
                fileflags: *fileflags,
            });
            let nid = arena.alloc_node(node);
            arena.add_child(container, nid);
            Ok(None)
        }
        b'>' => {
            let cond = sitix_evals::parser::parse(tag_data)?;
            let body = arena.alloc_object(Some(container), NameKind::Virtual, *fileflags);
            parse_body(src, arena, body, fileflags)?;
            let node = Node::RedirectorStatement(RedirectorNode {
                parent: container,
                fileflags: *fileflags,
                cond,
                body,
            });
            let nid = arena.alloc_node(node);
            arena.add_child(container, nid);
            Ok(None)
        }
        b'^' => {
            let name = tag_data.to_string_lossy_free();
            let node = Node::Dereference(DereferenceNode {
                parent: container,
                fileflags: *fileflags,
                name,
            });
            let nid = arena.alloc_node(node);
            arena.add_child(container, nid);
            Ok(None)
        }
        b'#' => {
            // Escapes every literal `.` so the referenced name resolves as
            // one path segment, never splitting on dots the filename
            // happened to contain.
            let name = sitix_config::paths::escape(&tag_data.to_string_lossy_free(), '.');
            let node = Node::Dereference(DereferenceNode {
                parent: container,
                fileflags: *fileflags,
                name,
            });
            let nid = arena.alloc_node(node);
            arena.add_child(container, nid);
            Ok(None)
        }
        b'/' => Ok(Some(ExitReason::End)),
        b'~' => {
            let target = tag_data.consume(b' ', true).to_string_lossy_free();
            tag_data.advance(1);
            let object = tag_data.to_string_lossy_free();
            let node = Node::Copier(CopierNode {
                parent: container,
                fileflags: *fileflags,
                target,
                object,
            });
            let nid = arena.alloc_node(node);
            arena.add_child(container, nid);
            Ok(None)
        }
        b'@' => {
            let request = tag_data.consume(b' ', true).to_string_lossy_free();
            tag_data.advance(1);
            let target = tag_data.to_string_lossy_free();
            if let (Some(op), Some(name)) = (FlagOp::parse(&request), FlagName::parse(&target)) {
                fileflags.apply(op, name);
            }
            Ok(None)
        }
        other => {
            tracing::warn!(tag = %(other as char), "unrecognized tag operation; parsing will continue, output may be malformed");
            Ok(None)
        }
    }
}

/// `[=name content]` / `[=name-]...[/]` and their Enumerated (`[=+ ...]`)
/// variants.
fn parse_assignment(
    mut tag_data: ByteWindow,
    src: &mut ByteWindow,
    arena: &mut Arena,
    container: ObjectId,
    fileflags: &mut Fileflags,
) -> Result<(), ParseError> {
    let is_ext = tag_data.peek(-1) == Some(b'-');
    if is_ext {
        tag_data.pop_back();
    }
    let name_window = tag_data.consume(b' ', true);
    let is_enumerated = name_window.len() == 1 && name_window.peek(0) == Some(b'+');
    let name_kind = if is_enumerated {
        let n = arena.next_enumerated(container);
        NameKind::Enumerated(n)
    } else {
        NameKind::Named(name_window.to_string_lossy_free())
    };

    let obj = arena.alloc_object(Some(container), name_kind, *fileflags);

    if is_ext {
        parse_body(src, arena, obj, fileflags)?;
    } else {
        tag_data.advance(1);
        let program = sitix_evals::parser::parse(tag_data)?;
        let node = Node::EvalsBlob(EvalsBlobNode {
            parent: obj,
            fileflags: *fileflags,
            program,
        });
        let nid = arena.alloc_node(node);
        arena.add_child(obj, nid);
    }

    let node = Node::Object(obj);
    let nid = arena.alloc_node(node);
    arena.add_child(container, nid);
    Ok(())
}

/// `[f GOAL ITER] ... [/]`.
fn parse_for_loop(
    mut tag_data: ByteWindow,
    src: &mut ByteWindow,
    arena: &mut Arena,
    container: ObjectId,
    fileflags: &mut Fileflags,
) -> Result<(), ParseError> {
    tag_data.trim();
    let goal = tag_data.consume(b' ', true).to_string_lossy_free();
    tag_data.advance(1);
    tag_data.trim();
    let iter_name = tag_data.to_string_lossy_free();

    let body = arena.alloc_object(Some(container), NameKind::Virtual, *fileflags);
    parse_body(src, arena, body, fileflags)?;

    let node = Node::ForLoop(ForLoopNode {
        parent: container,
        fileflags: *fileflags,
        goal,
        iter_name,
        body,
    });
    let nid = arena.alloc_node(node);
    arena.add_child(container, nid);
    Ok(())
}
