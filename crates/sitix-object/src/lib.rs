//! The scope/object graph (spec §3, §4.3): named and enumerated objects
//! forming the lookup tree, lazy directory/file materialisation, ghost
//! links, and name-replacement semantics.
//!
//! Ground truth throughout: `original_source/src/types/Object.cpp` and
//! `include/types/Object.hpp`. Per spec §9's redesign note, raw
//! `Object*`/`Node*` back-pointers become arena indices (`ObjectId`, reusing
//! the newtype `sitix-evals` already defines so `Value::SitixVariable` and
//! this crate's own ids are the same type; `NodeId` is local to this crate).
//! Reference counting (`rCount`/`pushedOut`) has no Rust analogue: the arena
//! never frees a slot mid-session (spec §3's lifecycle note — "destroyed
//! only when the session ends"), so there is nothing to decrement.

mod ghost;
mod lookup;
mod names;

pub use ghost::GHOST_CHAIN_LIMIT;
pub use lookup::{Materializer, NullMaterializer};
pub use sitix_evals::ObjectId;
pub use sitix_store::PathKind;
use sitix_evals::Program;

use sitix_config::Fileflags;
use sitix_text::ByteWindow;

/// Index into `Arena::nodes`. Distinct from `ObjectId`: every `Object` is
/// also reachable as a `Node::Object` slot inside its parent's children, but
/// not every `Node` is an `Object`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameKind {
    Named(String),
    Enumerated(u32),
    Virtual,
}

#[derive(Debug)]
pub struct ObjectSlot {
    pub parent: Option<ObjectId>,
    pub children: Vec<NodeId>,
    pub name_kind: NameKind,
    pub is_file: bool,
    pub is_template: bool,
    /// When false, rendering skips implicit same-name replacement — used by
    /// synthetic children like the per-file `filename` TextBlob.
    pub virile: bool,
    pub highest_enumerated: u32,
    pub ghost: Option<ObjectId>,
    pub fileflags: Fileflags,
}

impl ObjectSlot {
    fn new(parent: Option<ObjectId>, name_kind: NameKind, fileflags: Fileflags) -> Self {
        ObjectSlot {
            parent,
            children: Vec::new(),
            name_kind,
            is_file: false,
            is_template: false,
            virile: true,
            highest_enumerated: 0,
            ghost: None,
            fileflags,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match &self.name_kind {
            NameKind::Named(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct PlainTextNode {
    pub parent: ObjectId,
    pub fileflags: Fileflags,
    pub text: ByteWindow,
}

#[derive(Debug)]
pub struct TextBlobNode {
    pub parent: ObjectId,
    pub fileflags: Fileflags,
    pub text: String,
}

#[derive(Debug)]
pub struct ForLoopNode {
    pub parent: ObjectId,
    pub fileflags: Fileflags,
    pub goal: String,
    pub iter_name: String,
    /// Anonymous Virtual object holding the loop body, matching the
    /// original's `internalObject`.
    pub body: ObjectId,
}

#[derive(Debug)]
pub struct IfStatementNode {
    pub parent: ObjectId,
    pub fileflags: Fileflags,
    pub cond: Program,
    pub main: ObjectId,
    pub else_branch: Option<ObjectId>,
}

#[derive(Debug)]
pub struct DereferenceNode {
    pub parent: ObjectId,
    pub fileflags: Fileflags,
    pub name: String,
}

#[derive(Debug)]
pub struct CopierNode {
    pub parent: ObjectId,
    pub fileflags: Fileflags,
    pub target: String,
    pub object: String,
}

#[derive(Debug)]
pub struct RedirectorNode {
    pub parent: ObjectId,
    pub fileflags: Fileflags,
    pub cond: Program,
    pub body: ObjectId,
}

#[derive(Debug)]
pub struct EvalsBlobNode {
    pub parent: ObjectId,
    pub fileflags: Fileflags,
    pub program: Program,
}

#[derive(Debug)]
pub struct DebuggerNode {
    pub parent: ObjectId,
    pub fileflags: Fileflags,
}

#[derive(Debug)]
pub enum Node {
    PlainText(PlainTextNode),
    TextBlob(TextBlobNode),
    Object(ObjectId),
    ForLoop(ForLoopNode),
    IfStatement(IfStatementNode),
    Dereference(DereferenceNode),
    Copier(CopierNode),
    RedirectorStatement(RedirectorNode),
    EvalsBlob(EvalsBlobNode),
    DebuggerStatement(DebuggerNode),
}

impl Node {
    pub fn parent(&self) -> Option<ObjectId> {
        match self {
            Node::PlainText(n) => Some(n.parent),
            Node::TextBlob(n) => Some(n.parent),
            Node::Object(_) => None,
            Node::ForLoop(n) => Some(n.parent),
            Node::IfStatement(n) => Some(n.parent),
            Node::Dereference(n) => Some(n.parent),
            Node::Copier(n) => Some(n.parent),
            Node::RedirectorStatement(n) => Some(n.parent),
            Node::EvalsBlob(n) => Some(n.parent),
            Node::DebuggerStatement(n) => Some(n.parent),
        }
    }
}

/// Owns every `Object` and `Node` allocated in a render session. Never frees
/// a slot once allocated — see the module doc comment.
#[derive(Debug, Default)]
pub struct Arena {
    objects: Vec<ObjectSlot>,
    nodes: Vec<Node>,
}

impl Arena {
    pub fn new() -> Self {
        Arena { objects: Vec::new(), nodes: Vec::new() }
    }

    /// Allocate a fresh, childless object.
    pub fn alloc_object(&mut self, parent: Option<ObjectId>, name_kind: NameKind, fileflags: Fileflags) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(ObjectSlot::new(parent, name_kind, fileflags));
        id
    }

    pub fn alloc_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn object(&self, id: ObjectId) -> &ObjectSlot {
        &self.objects[id.0 as usize]
    }

    pub fn object_mut(&mut self, id: ObjectId) -> &mut ObjectSlot {
        &mut self.objects[id.0 as usize]
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    /// Append `child` to `parent`'s children, allocating an Enumerated
    /// number from `parent`'s counter when `as_enumerated` is set. Mirrors
    /// `Object::addChild`.
    pub fn add_child(&mut self, parent: ObjectId, child: NodeId) {
        self.object_mut(parent).children.push(child);
    }

    /// Allocate the next Enumerated index on `parent` and bump its counter,
    /// matching `obj->number = container->highestEnumerated++`.
    pub fn next_enumerated(&mut self, parent: ObjectId) -> u32 {
        let slot = self.object_mut(parent);
        let n = slot.highest_enumerated;
        slot.highest_enumerated += 1;
        n
    }

    pub fn child_objects(&self, id: ObjectId) -> impl Iterator<Item = ObjectId> + '_ {
        self.object(id).children.iter().filter_map(move |nid| match self.node(*nid) {
            Node::Object(oid) => Some(*oid),
            _ => None,
        })
    }
}

pub use ghost::{deghost, nonv_root, ptr_equals, walk_to_file};
pub use lookup::{child_search_up, lookup, replace};
