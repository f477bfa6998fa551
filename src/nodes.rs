//! Node graph.
//!
//! A [`Document`] owns its nodes in an arena and refers to them by
//! [`NodeId`]. Children are stored as ids, and an alias simply reuses the id
//! of the anchored node, so one node may appear under several parents and
//! a collection may (transitively) contain itself. Code walking a document
//! must guard against cycles; [`Document::value_eq`] does so with a visited
//! set.

use std::collections::HashSet;
use std::ops::Index;

use indexmap::IndexMap;

use crate::anchor::Anchor;
use crate::comments::CommentLine;
use crate::common::{FlowStyle, ScalarStyle};
use crate::error::Result;
use crate::mark::Mark;
use crate::resolver::{construct_with, ScalarValue};
use crate::settings::LoadSettings;
use crate::tag::Tag;

/// Index of a node inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// Position in [`Document::nodes`].
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// One key/value pair of a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeTuple {
    pub key: NodeId,
    pub value: NodeId,
}

impl NodeTuple {
    pub fn new(key: NodeId, value: NodeId) -> Self {
        Self { key, value }
    }
}

/// Content of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Scalar {
        value: String,
        style: ScalarStyle,
    },
    Sequence {
        items: Vec<NodeId>,
        flow_style: FlowStyle,
    },
    Mapping {
        entries: Vec<NodeTuple>,
        flow_style: FlowStyle,
        /// Entries of `<<` merge keys were folded in
        merged: bool,
    },
}

impl NodeData {
    /// `"scalar"`, `"sequence"` or `"mapping"`.
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeData::Scalar { .. } => "scalar",
            NodeData::Sequence { .. } => "sequence",
            NodeData::Mapping { .. } => "mapping",
        }
    }
}

/// A composed node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub tag: Tag,
    /// The tag was inferred rather than written explicitly
    pub resolved: bool,
    pub anchor: Option<Anchor>,
    pub start: Option<Mark>,
    pub end: Option<Mark>,
    /// Free-form side table for consumers
    pub properties: IndexMap<String, String>,
    pub block_comments: Vec<CommentLine>,
    pub inline_comments: Vec<CommentLine>,
    pub end_comments: Vec<CommentLine>,
    /// The node is part of a cycle
    pub recursive: bool,
    pub data: NodeData,
}

impl Node {
    pub fn new(tag: Tag, data: NodeData, start: Option<Mark>, end: Option<Mark>) -> Self {
        Self {
            tag,
            resolved: false,
            anchor: None,
            start,
            end,
            properties: IndexMap::new(),
            block_comments: Vec::new(),
            inline_comments: Vec::new(),
            end_comments: Vec::new(),
            recursive: false,
            data,
        }
    }

    pub fn scalar(tag: Tag, value: impl Into<String>, style: ScalarStyle) -> Self {
        Self::new(
            tag,
            NodeData::Scalar {
                value: value.into(),
                style,
            },
            None,
            None,
        )
    }

    #[inline]
    pub fn is_scalar(&self) -> bool {
        matches!(self.data, NodeData::Scalar { .. })
    }

    /// The text of a scalar node.
    pub fn as_str(&self) -> Option<&str> {
        match &self.data {
            NodeData::Scalar { value, .. } => Some(value),
            _ => None,
        }
    }

    /// The items of a sequence node.
    pub fn items(&self) -> Option<&[NodeId]> {
        match &self.data {
            NodeData::Sequence { items, .. } => Some(items),
            _ => None,
        }
    }

    /// The entries of a mapping node.
    pub fn entries(&self) -> Option<&[NodeTuple]> {
        match &self.data {
            NodeData::Mapping { entries, .. } => Some(entries),
            _ => None,
        }
    }

    pub fn flow_style(&self) -> Option<FlowStyle> {
        match &self.data {
            NodeData::Scalar { .. } => None,
            NodeData::Sequence { flow_style, .. } | NodeData::Mapping { flow_style, .. } => {
                Some(*flow_style)
            }
        }
    }
}

/// One composed document: the node arena and its root.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    pub start: Option<Mark>,
    pub end: Option<Mark>,
}

impl Document {
    /// Build a document from an arena; `root` must index into `nodes`.
    pub fn new(nodes: Vec<Node>, root: NodeId) -> Self {
        Self {
            nodes,
            root,
            start: None,
            end: None,
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The root node.
    ///
    /// # Panics
    ///
    /// Panics if the document was built with a root outside its arena.
    /// Documents produced by the composer always have a valid root.
    #[inline]
    pub fn root_node(&self) -> &Node {
        &self.nodes[self.root.0]
    }

    /// Node `id`, or `None` if `id` belongs to another, larger document.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// All nodes in allocation order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Value of the entry of mapping `id` whose key is the scalar `key`.
    ///
    /// With duplicate keys allowed, the last entry wins.
    pub fn get(&self, id: NodeId, key: &str) -> Option<NodeId> {
        self.node(id)?
            .entries()?
            .iter()
            .rfind(|entry| self.nodes[entry.key.0].as_str() == Some(key))
            .map(|entry| entry.value)
    }

    /// Scalar text of node `id`.
    pub fn scalar(&self, id: NodeId) -> Option<&str> {
        self.node(id)?.as_str()
    }

    /// Follow a path of mapping keys from the root.
    pub fn lookup(&self, path: &[&str]) -> Option<NodeId> {
        path.iter()
            .try_fold(self.root, |id, key| self.get(id, key))
    }

    /// Construct the native value of scalar `id` using the schema's and
    /// the custom constructors of `settings`.
    pub fn construct_scalar(&self, id: NodeId, settings: &LoadSettings) -> Result<ScalarValue> {
        construct_with(self, id, &settings.constructors())
    }

    /// Structural equality of node `a` in `self` and node `b` in `other`.
    ///
    /// Tags, scalar values and children are compared; styles, marks and
    /// comments are not. Pairs already under comparison count as equal, so
    /// cyclic graphs terminate.
    pub fn value_eq(&self, a: NodeId, other: &Document, b: NodeId) -> bool {
        let mut visited: HashSet<(NodeId, NodeId)> = HashSet::new();
        let mut pending = vec![(a, b)];
        while let Some((a, b)) = pending.pop() {
            if !visited.insert((a, b)) {
                continue;
            }
            let (Some(left), Some(right)) = (self.node(a), other.node(b)) else {
                return false;
            };
            if left.tag != right.tag {
                return false;
            }
            match (&left.data, &right.data) {
                (NodeData::Scalar { value: l, .. }, NodeData::Scalar { value: r, .. }) => {
                    if l != r {
                        return false;
                    }
                }
                (NodeData::Sequence { items: l, .. }, NodeData::Sequence { items: r, .. }) => {
                    if l.len() != r.len() {
                        return false;
                    }
                    pending.extend(l.iter().copied().zip(r.iter().copied()));
                }
                (NodeData::Mapping { entries: l, .. }, NodeData::Mapping { entries: r, .. }) => {
                    if l.len() != r.len() {
                        return false;
                    }
                    for (le, re) in l.iter().zip(r.iter()) {
                        pending.push((le.key, re.key));
                        pending.push((le.value, re.value));
                    }
                }
                _ => return false,
            }
        }
        true
    }
}

/// `document[id]` is the node `id`.
///
/// # Panics
///
/// Panics if `id` is not in this document's arena, e.g. an id taken from
/// another document. Use [`Document::node`] to check instead.
impl Index<NodeId> for Document {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}
