//! The render dispatch itself (spec §4.6): walks a materialised object's
//! children, writing `PlainText`/`TextBlob` through the writer pipeline and
//! interpreting every directive node. Ground truth throughout:
//! `original_source/src/types/Object.cpp`'s `render` and the individual
//! node `render` overrides it dispatches to.

use sitix_config::Fileflags;
use sitix_evals::{self, Program, ScopeResolver, Value};
use sitix_object::{deghost, Arena, Materializer, NameKind, Node, NodeId, ObjectId};
use sitix_store::OutputStore;
use sitix_writer::Writer;

/// Resolve `name` against `scope` first, then `parent` — `Dereference`'s own
/// order (spec §4.3), also used for `ForLoop`'s `goal` (spec §4.6) and
/// Evals bare-identifier references (see `sitix-evals`'s `ScopeResolver` doc
/// comment for why the other two spec passages lost the vote).
pub fn resolve_scope_then_parent(
    arena: &mut Arena,
    materializer: &mut dyn Materializer,
    parent: ObjectId,
    scope: ObjectId,
    name: &str,
) -> Option<ObjectId> {
    if let Some(id) = sitix_object::lookup(arena, scope, name, None, materializer) {
        return Some(deghost(arena, id));
    }
    let id = sitix_object::lookup(arena, parent, name, None, materializer)?;
    Some(deghost(arena, id))
}

/// Binds `target` under the synthetic, non-virile, `Named(name)` slot of
/// `scope`'s children — reused by `ForLoop` (one binding object per
/// iteration, rebound in place) and `Dereference`'s include-time copy of a
/// template's virile children into the calling scope. Returns the `NodeId`
/// of the slot used, so a caller that owns it transiently (`ForLoop`) can
/// remove it again once done.
fn bind_named_ghost(
    arena: &mut Arena,
    scope: ObjectId,
    name: &str,
    fileflags: Fileflags,
    target: ObjectId,
) -> NodeId {
    let existing = arena.object(scope).children.iter().copied().find(|&nid| {
        matches!(arena.node(nid), Node::Object(oid) if arena.object(*oid).name() == Some(name))
    });
    let ghost_obj = arena.alloc_object(Some(scope), NameKind::Named(name.to_string()), fileflags);
    arena.object_mut(ghost_obj).virile = false;
    arena.object_mut(ghost_obj).ghost = Some(target);
    match existing {
        Some(nid) => {
            if let Node::Object(oid) = arena.node_mut(nid) {
                *oid = ghost_obj;
            }
            nid
        }
        None => {
            let nid = arena.alloc_node(Node::Object(ghost_obj));
            arena.add_child(scope, nid);
            nid
        }
    }
}

/// Bridges `sitix_evals::eval`'s `ScopeResolver` requirement to a live
/// render session: `resolve` is `resolve_scope_then_parent` plus
/// deghosting, `stringify` is a recursive dereference-mode render into a
/// throwaway string sink (`EvalsVariableObject::toString`'s Rust shape).
struct EvalCtx<'a, 'b> {
    arena: &'a mut Arena,
    materializer: &'b mut dyn Materializer,
}

impl<'a, 'b> ScopeResolver for EvalCtx<'a, 'b> {
    fn resolve(&mut self, parent: ObjectId, scope: ObjectId, name: &str) -> Option<ObjectId> {
        resolve_scope_then_parent(self.arena, self.materializer, parent, scope, name)
    }

    fn stringify(&mut self, id: ObjectId, scope: ObjectId) -> String {
        let mut sink = sitix_writer::StringSink::new();
        render_object(self.arena, self.materializer, &mut NullOutput, &mut sink, id, scope, true);
        sink.into_inner()
    }
}

/// `Dereference`'s `stringify` calls never hit a `RedirectorStatement` in
/// practice (the included file's own redirects, if any, already fired
/// during its own top-level render) — this stub exists only so
/// `render_object` has an `OutputStore` to pass through that call chain.
struct NullOutput;
impl OutputStore for NullOutput {
    fn create(&mut self, rel_path: &str) -> std::io::Result<Box<dyn Writer>> {
        tracing::warn!(target: "render", rel_path, "redirector fired while stringifying a value; ignored");
        Err(std::io::Error::new(std::io::ErrorKind::Unsupported, "no output store available here"))
    }
    fn remove(&mut self, _rel_path: &str) -> std::io::Result<()> {
        Ok(())
    }
    fn empty_with_confirmation(&mut self, _confirm: impl FnMut() -> bool) -> std::io::Result<bool> {
        Ok(false)
    }
}

fn eval_program(arena: &mut Arena, materializer: &mut dyn Materializer, program: &Program, parent: ObjectId, scope: ObjectId) -> Value {
    let mut ctx = EvalCtx { arena, materializer };
    sitix_evals::eval(program, &mut ctx, parent, scope)
}

fn display_value(arena: &mut Arena, materializer: &mut dyn Materializer, value: &Value, scope: ObjectId) -> String {
    let mut ctx = EvalCtx { arena, materializer };
    value.to_display_string(scope, &mut ctx)
}

fn write_through_pipeline(writer: &mut dyn Writer, flags: Fileflags, text: &str) {
    let mut pipeline = sitix_writer::build_pipeline(flags, Box::new(ForwardingWriter(writer)));
    pipeline.write_str(text);
}

/// `build_pipeline` wants an owned `Box<dyn Writer>`; this forwards every
/// call on to a borrowed `&mut dyn Writer` so a fresh pipeline can be built
/// per node write without taking ownership of the caller's sink.
struct ForwardingWriter<'a>(&'a mut dyn Writer);
impl<'a> Writer for ForwardingWriter<'a> {
    fn write_bytes(&mut self, data: &[u8]) {
        self.0.write_bytes(data);
    }
}

/// Render `obj` (spec §4.6's general `Object::render` contract):
/// 1. Forward through its ghost chain.
/// 2. If it's a `Named`, virile object and we're not already in dereference
///    mode, attempt to replace its own same-named sibling slot — this is
///    how later-defined template children shadow earlier ones without an
///    explicit directive.
/// 3. If not in dereference mode, stop: ordinary (non-dereferenced) Object
///    children are otherwise silent.
/// 4. Otherwise render every child in order, using `scope` for any lookups
///    they perform.
#[allow(clippy::too_many_arguments)]
pub fn render_object(
    arena: &mut Arena,
    materializer: &mut dyn Materializer,
    output: &mut dyn OutputStore,
    writer: &mut dyn Writer,
    obj: ObjectId,
    scope: ObjectId,
    dereference: bool,
) {
    let real = deghost(arena, obj);

    let is_named_virile = matches!(arena.object(real).name_kind, NameKind::Named(_)) && arena.object(real).virile;
    if is_named_virile && !dereference {
        if let Some(parent) = arena.object(real).parent {
            let name = arena.object(real).name().unwrap().to_string();
            sitix_object::replace(arena, parent, &name, real, materializer);
        }
    }

    if !dereference {
        return;
    }

    let children: Vec<NodeId> = arena.object(real).children.clone();
    for nid in children {
        render_node(arena, materializer, output, writer, nid, scope);
    }
}

#[allow(clippy::too_many_arguments)]
fn render_node(
    arena: &mut Arena,
    materializer: &mut dyn Materializer,
    output: &mut dyn OutputStore,
    writer: &mut dyn Writer,
    nid: NodeId,
    scope: ObjectId,
) {
    enum Action {
        PlainText(sitix_text::ByteWindow, Fileflags),
        TextBlob(String, Fileflags),
        Object(ObjectId),
        ForLoop { goal: String, iter_name: String, body: ObjectId, flags: Fileflags, parent: ObjectId },
        IfStatement { cond: Program, main: ObjectId, else_branch: Option<ObjectId>, parent: ObjectId },
        Dereference { name: String, flags: Fileflags, parent: ObjectId },
        Copier { target: String, object: String, parent: ObjectId },
        Redirector { cond: Program, body: ObjectId, parent: ObjectId },
        EvalsBlob { program: Program, flags: Fileflags, parent: ObjectId },
        Debugger,
    }

    let action = match arena.node(nid) {
        Node::PlainText(n) => Action::PlainText(n.text.clone(), n.fileflags),
        Node::TextBlob(n) => Action::TextBlob(n.text.clone(), n.fileflags),
        Node::Object(oid) => Action::Object(*oid),
        Node::ForLoop(n) => Action::ForLoop {
            goal: n.goal.clone(),
            iter_name: n.iter_name.clone(),
            body: n.body,
            flags: n.fileflags,
            parent: n.parent,
        },
        Node::IfStatement(n) => Action::IfStatement {
            cond: n.cond.clone(),
            main: n.main,
            else_branch: n.else_branch,
            parent: n.parent,
        },
        Node::Dereference(n) => Action::Dereference {
            name: n.name.clone(),
            flags: n.fileflags,
            parent: n.parent,
        },
        Node::Copier(n) => Action::Copier {
            target: n.target.clone(),
            object: n.object.clone(),
            parent: n.parent,
        },
        Node::RedirectorStatement(n) => Action::Redirector { cond: n.cond.clone(), body: n.body, parent: n.parent },
        Node::EvalsBlob(n) => Action::EvalsBlob { program: n.program.clone(), flags: n.fileflags, parent: n.parent },
        Node::DebuggerStatement(_) => Action::Debugger,
    };

    match action {
        Action::PlainText(text, flags) => {
            write_through_pipeline(writer, flags, &text.to_string());
        }
        Action::TextBlob(text, flags) => {
            write_through_pipeline(writer, flags, &text);
        }
        Action::Object(oid) => {
            render_object(arena, materializer, output, writer, oid, scope, false);
        }
        Action::ForLoop { goal, iter_name, body, flags, parent } => {
            render_for_loop(arena, materializer, output, writer, &goal, &iter_name, body, flags, parent, scope);
        }
        Action::IfStatement { cond, main, else_branch, parent } => {
            let value = eval_program(arena, materializer, &cond, parent, scope);
            if value.truthy() {
                render_object(arena, materializer, output, writer, main, main, true);
            } else if let Some(e) = else_branch {
                render_object(arena, materializer, output, writer, e, e, true);
            }
        }
        Action::Dereference { name, flags: _, parent } => {
            render_dereference(arena, materializer, output, writer, &name, parent, scope);
        }
        Action::Copier { target, object, parent } => {
            render_copier(arena, materializer, &target, &object, parent, scope);
        }
        Action::Redirector { cond, body, parent } => {
            render_redirector(arena, materializer, output, &cond, body, parent, scope);
        }
        Action::EvalsBlob { program, flags, parent } => {
            let value = eval_program(arena, materializer, &program, parent, scope);
            let text = display_value(arena, materializer, &value, scope);
            write_through_pipeline(writer, flags, &text);
        }
        Action::Debugger => render_debugger(arena, scope),
    }
}

/// `[^name]` / `[#name]` (spec §4.3, §4.4): resolve `name`, and if it names
/// a file object, copy each of its virile `Named` children into the current
/// scope by ghost before rendering it — this is how an included template's
/// `[=slot ...]` definitions become visible to its includer. The include
/// itself then renders in dereference mode with the *includer's* own
/// lexical parent as scope, so its directives resolve names against the
/// calling file rather than the included one.
#[allow(clippy::too_many_arguments)]
fn render_dereference(
    arena: &mut Arena,
    materializer: &mut dyn Materializer,
    output: &mut dyn OutputStore,
    writer: &mut dyn Writer,
    name: &str,
    node_parent: ObjectId,
    scope: ObjectId,
) {
    let Some(resolved) = resolve_scope_then_parent(arena, materializer, node_parent, scope, name) else {
        tracing::warn!(target: "scope", name, "dereference did not resolve; nothing rendered");
        return;
    };

    if arena.object(resolved).is_file {
        let virile_children: Vec<(String, ObjectId, Fileflags)> = arena
            .child_objects(resolved)
            .filter_map(|c| {
                let slot = arena.object(c);
                if slot.virile {
                    slot.name().map(|n| (n.to_string(), c, slot.fileflags))
                } else {
                    None
                }
            })
            .collect();
        for (child_name, child_id, flags) in virile_children {
            bind_named_ghost(arena, scope, &child_name, flags, child_id);
        }
    }

    render_object(arena, materializer, output, writer, resolved, node_parent, true);
}

/// `[f goal name]...[/]` (spec §4.6): resolve `goal`, iterate its
/// `Enumerated` children in order, and re-render `body` once per item with
/// a single reused binding slot — reusing the slot (rather than leaking one
/// per iteration) keeps `lookup`'s first-match-wins semantics from
/// shadowing later iterations with an earlier one's value.
#[allow(clippy::too_many_arguments)]
fn render_for_loop(
    arena: &mut Arena,
    materializer: &mut dyn Materializer,
    output: &mut dyn OutputStore,
    writer: &mut dyn Writer,
    goal: &str,
    iter_name: &str,
    body: ObjectId,
    flags: Fileflags,
    node_parent: ObjectId,
    scope: ObjectId,
) {
    let Some(goal_id) = resolve_scope_then_parent(arena, materializer, node_parent, scope, goal) else {
        tracing::warn!(target: "scope", name = goal, "for-loop goal did not resolve; loop skipped");
        return;
    };

    let items: Vec<ObjectId> = arena
        .child_objects(goal_id)
        .filter(|c| matches!(arena.object(*c).name_kind, NameKind::Enumerated(_)))
        .collect();

    let mut binding: Option<NodeId> = None;
    for item in items {
        binding = Some(bind_named_ghost(arena, body, iter_name, flags, item));
        render_object(arena, materializer, output, writer, body, body, true);
    }

    if let Some(nid) = binding {
        arena.object_mut(body).children.retain(|&n| n != nid);
    }
}

/// `[~ target object]` (spec §4.6): resolve both names and point
/// `target.ghost` at `object`, rejecting the write if it would close a
/// ghost cycle (spec §5).
fn render_copier(
    arena: &mut Arena,
    materializer: &mut dyn Materializer,
    target: &str,
    object: &str,
    node_parent: ObjectId,
    scope: ObjectId,
) {
    let Some(target_id) = resolve_scope_then_parent(arena, materializer, node_parent, scope, target) else {
        tracing::warn!(target: "scope", name = target, "copier target did not resolve");
        return;
    };
    let Some(source_id) = resolve_scope_then_parent(arena, materializer, node_parent, scope, object) else {
        tracing::warn!(target: "scope", name = object, "copier source did not resolve");
        return;
    };

    if deghost(arena, source_id) == deghost(arena, target_id) {
        tracing::error!(target: "scope", target, object, "copier would close a ghost cycle; ignored");
        return;
    }

    arena.object_mut(target_id).ghost = Some(source_id);
}

/// `[> expr]...[/]` (spec §4.6): evaluate `cond` to a path and render
/// `body` in dereference mode into a fresh output file at that path.
fn render_redirector(
    arena: &mut Arena,
    materializer: &mut dyn Materializer,
    output: &mut dyn OutputStore,
    cond: &Program,
    body: ObjectId,
    node_parent: ObjectId,
    scope: ObjectId,
) {
    let value = eval_program(arena, materializer, cond, node_parent, scope);
    let path = display_value(arena, materializer, &value, scope);

    match output.create(&path) {
        Ok(mut sink) => {
            render_object(arena, materializer, output, &mut *sink, body, body, true);
        }
        Err(err) => {
            tracing::error!(target: "store", path, %err, "redirector could not open its output file");
        }
    }
}

#[derive(serde::Serialize)]
struct ScopeSnapshot {
    name: String,
    kind: &'static str,
    is_file: bool,
    ghost: Option<String>,
    children: Vec<ScopeSnapshot>,
}

/// How deep `[d]` descends before truncating — unmaterialised directories
/// are lazy, so an unbounded dump could force-materialise an entire tree
/// just to print it.
const DEBUG_SNAPSHOT_DEPTH: usize = 6;

fn snapshot(arena: &Arena, id: ObjectId, depth: usize) -> ScopeSnapshot {
    let slot = arena.object(id);
    let (name, kind) = match &slot.name_kind {
        NameKind::Named(s) => (s.clone(), "named"),
        NameKind::Enumerated(n) => (format!("#{n}"), "enumerated"),
        NameKind::Virtual => ("<virtual>".to_string(), "virtual"),
    };
    let ghost = slot.ghost.map(|g| format!("{g:?}"));
    let children = if depth == 0 {
        Vec::new()
    } else {
        arena.child_objects(id).map(|c| snapshot(arena, c, depth - 1)).collect()
    };
    ScopeSnapshot { name, kind, is_file: slot.is_file, ghost, children }
}

/// `[d]` (spec §4.6): dump the current scope's subtree to diagnostics as
/// JSON, matching the original's debugger statement.
fn render_debugger(arena: &Arena, scope: ObjectId) {
    let snap = snapshot(arena, scope, DEBUG_SNAPSHOT_DEPTH);
    match serde_json::to_string_pretty(&snap) {
        Ok(tree) => tracing::info!(target: "debug", tree = %tree, "debugger statement"),
        Err(err) => tracing::error!(target: "debug", %err, "failed to serialise scope snapshot"),
    }
}
