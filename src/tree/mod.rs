//! In-memory document tree
//!
//! Nodes live in a single arena owned by [`Document`]. Children are held by
//! index, and every node records the index of its parent. The parent link is
//! a plain lookup used for naming context; ownership only flows downward.
//!
//! Every node carries a stable id drawn from an [`IdGenerator`] when it is
//! built. Ids become the primary and foreign key values of emitted rows.

mod convert;
mod render;

pub use convert::parse_document;

use crate::error::{MeltError, Result};
use std::collections::HashSet;

/// Index of a node inside its [`Document`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef(usize);

impl NodeRef {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One node of a parsed JSON document
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Object(Vec<(String, NodeRef)>),
    Array(Vec<NodeRef>),
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
}

impl Node {
    pub fn is_object(&self) -> bool {
        matches!(self, Node::Object(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Node::Array(_))
    }

    pub fn is_scalar(&self) -> bool {
        !self.is_object() && !self.is_array()
    }
}

/// Arena slot: a node plus its identity and parent link
#[derive(Debug, Clone)]
pub struct NodeData {
    pub id: u64,
    pub parent: Option<NodeRef>,
    pub node: Node,
}

/// Monotonic source of node ids
///
/// One generator belongs to one session. Resetting it between independent
/// runs makes their output comparable byte for byte.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        IdGenerator { next: 1 }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Restart numbering at 1. Only call this between runs.
    pub fn reset(&mut self) {
        self.next = 1;
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a [`Document`] bottom-up, children before parents
pub struct TreeBuilder<'a> {
    ids: &'a mut IdGenerator,
    nodes: Vec<NodeData>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(ids: &'a mut IdGenerator) -> Self {
        TreeBuilder {
            ids,
            nodes: Vec::new(),
        }
    }

    fn push(&mut self, node: Node) -> NodeRef {
        let id = self.ids.next_id();
        self.nodes.push(NodeData {
            id,
            parent: None,
            node,
        });
        NodeRef(self.nodes.len() - 1)
    }

    pub fn string(&mut self, value: impl Into<String>) -> NodeRef {
        self.push(Node::String(value.into()))
    }

    pub fn integer(&mut self, value: i64) -> NodeRef {
        self.push(Node::Integer(value))
    }

    pub fn float(&mut self, value: f64) -> NodeRef {
        self.push(Node::Float(value))
    }

    pub fn boolean(&mut self, value: bool) -> NodeRef {
        self.push(Node::Boolean(value))
    }

    pub fn null(&mut self) -> NodeRef {
        self.push(Node::Null)
    }

    /// Create an object owning `pairs`. Each value must be unattached.
    pub fn object(&mut self, pairs: Vec<(String, NodeRef)>) -> Result<NodeRef> {
        self.check_orphans(pairs.iter().map(|(_, child)| *child))?;
        let children: Vec<NodeRef> = pairs.iter().map(|(_, child)| *child).collect();
        let node = self.push(Node::Object(pairs));
        self.adopt(node, &children);
        Ok(node)
    }

    /// Create an array owning `elements`. Each element must be unattached.
    pub fn array(&mut self, elements: Vec<NodeRef>) -> Result<NodeRef> {
        self.check_orphans(elements.iter().copied())?;
        let children = elements.clone();
        let node = self.push(Node::Array(elements));
        self.adopt(node, &children);
        Ok(node)
    }

    /// Seal the arena with `root` as the document root.
    pub fn finish(self, root: NodeRef) -> Result<Document> {
        match self.nodes.get(root.0) {
            None => Err(MeltError::MalformedNode(root.0)),
            Some(data) if data.parent.is_some() => Err(MeltError::AlreadyAttached(root.0)),
            Some(_) => Ok(Document {
                nodes: self.nodes,
                root,
            }),
        }
    }

    fn check_orphans(&self, children: impl Iterator<Item = NodeRef>) -> Result<()> {
        let mut seen = HashSet::new();
        for child in children {
            let data = self
                .nodes
                .get(child.0)
                .ok_or(MeltError::MalformedNode(child.0))?;
            if data.parent.is_some() || !seen.insert(child) {
                return Err(MeltError::AlreadyAttached(child.0));
            }
        }
        Ok(())
    }

    fn adopt(&mut self, parent: NodeRef, children: &[NodeRef]) {
        for child in children {
            self.nodes[child.0].parent = Some(parent);
        }
    }
}

/// A finished, immutable document tree
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    root: NodeRef,
}

impl Document {
    pub fn root(&self) -> NodeRef {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, node: NodeRef) -> Option<&NodeData> {
        self.nodes.get(node.0)
    }

    /// The node behind `node`, or `None` for a dangling reference.
    pub fn node(&self, node: NodeRef) -> Option<&Node> {
        self.get(node).map(|data| &data.node)
    }

    pub fn id(&self, node: NodeRef) -> Option<u64> {
        self.get(node).map(|data| data.id)
    }

    pub fn parent(&self, node: NodeRef) -> Option<NodeRef> {
        self.get(node).and_then(|data| data.parent)
    }

    /// Key/value pairs of an object; empty for anything else.
    pub fn pairs(&self, node: NodeRef) -> &[(String, NodeRef)] {
        match self.node(node) {
            Some(Node::Object(pairs)) => pairs,
            _ => &[],
        }
    }

    /// Elements of an array; empty for anything else.
    pub fn elements(&self, node: NodeRef) -> &[NodeRef] {
        match self.node(node) {
            Some(Node::Array(elements)) => elements,
            _ => &[],
        }
    }

    pub fn is_object(&self, node: NodeRef) -> bool {
        self.node(node).is_some_and(Node::is_object)
    }

    /// First value stored under `key` in an object.
    pub fn field(&self, node: NodeRef, key: &str) -> Option<NodeRef> {
        self.pairs(node)
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| *value)
    }

    pub fn has_field(&self, node: NodeRef, key: &str) -> bool {
        self.field(node, key).is_some()
    }

    /// The key a node sits under and the object holding that key.
    ///
    /// Elements of an array report the key of the array itself.
    pub fn nesting(&self, node: NodeRef) -> Option<(&str, NodeRef)> {
        let parent = self.parent(node)?;
        match self.node(parent)? {
            Node::Object(pairs) => pairs
                .iter()
                .find(|(_, value)| *value == node)
                .map(|(key, _)| (key.as_str(), parent)),
            Node::Array(_) => self.nesting(parent),
            _ => None,
        }
    }
}
