//! Node graph composer.
//!
//! The composer consumes parser events and builds one [`Document`] per
//! YAML document. Like the parser it keeps an explicit stack of open
//! collections instead of recursing, and that stack doubles as the set of
//! nodes still under construction: an alias that points at one of them
//! closes a cycle, and every collection on the stack from the target up is
//! flagged `recursive`.
//!
//! Anchors are scoped to a document. A redefined anchor shadows the
//! earlier node for the aliases that follow it.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::anchor::Anchor;
use crate::comments::CommentLine;
use crate::common::CommentType;
use crate::error::{Result, YamlError};
use crate::events::{Event, EventId, EventKind};
use crate::mark::Mark;
use crate::nodes::{Document, Node, NodeData, NodeId, NodeTuple};
use crate::parser::Parser;
use crate::resolver::Schema;
use crate::settings::LoadSettings;
use crate::tag::Tag;

const MAPPING_CONTEXT: &str = "while constructing a mapping";

/// A collection that has started but not yet ended.
enum Frame {
    Sequence {
        id: NodeId,
    },
    Mapping {
        id: NodeId,
        /// Key waiting for its value
        key: Option<NodeId>,
        /// Scalar keys seen so far, by tag and text
        seen: HashSet<(Tag, String)>,
        has_merge: bool,
    },
}

impl Frame {
    fn id(&self) -> NodeId {
        match self {
            Frame::Sequence { id } | Frame::Mapping { id, .. } => *id,
        }
    }
}

fn push_node(nodes: &mut Vec<Node>, node: Node) -> NodeId {
    nodes.push(node);
    NodeId::new(nodes.len() - 1)
}

/// Tag of a collection: the default for untagged or `!`, else explicit.
fn collection_tag(tag: Option<String>, default: Tag) -> (Tag, bool) {
    match tag.as_deref() {
        None | Some("!") => (default, true),
        Some(explicit) => (Tag::new(explicit), false),
    }
}

/// Builds documents from a [`Parser`].
pub struct Composer<'a> {
    parser: Parser<'a>,
    schema: Arc<dyn Schema>,
    allow_recursive_keys: bool,
    allow_duplicate_keys: bool,
    max_aliases_for_collections: usize,
    anchors: HashMap<Anchor, NodeId>,
    collection_aliases: usize,
    pending_comments: Vec<CommentLine>,
    finished: bool,
}

impl<'a> Composer<'a> {
    pub fn new(parser: Parser<'a>, settings: &LoadSettings) -> Self {
        Self {
            parser,
            schema: Arc::clone(&settings.schema),
            allow_recursive_keys: settings.allow_recursive_keys,
            allow_duplicate_keys: settings.allow_duplicate_keys,
            max_aliases_for_collections: settings.max_aliases_for_collections,
            anchors: HashMap::new(),
            collection_aliases: 0,
            pending_comments: Vec::new(),
            finished: false,
        }
    }

    /// Whether another document follows. Consumes the stream start and any
    /// comments ahead of the document.
    pub fn has_node(&mut self) -> Result<bool> {
        if self.parser.check_event(&[EventId::StreamStart])? {
            self.parser.next_event()?;
        }
        self.collect_comments(&mut [], None)?;
        Ok(!self.parser.check_event(&[EventId::StreamEnd])? && self.parser.check_event(&[])?)
    }

    /// Compose the next document, or `None` at the end of the stream.
    pub fn next_document(&mut self) -> Result<Option<Document>> {
        if !self.has_node()? {
            if self.parser.check_event(&[EventId::StreamEnd])? {
                self.parser.next_event()?;
            }
            return Ok(None);
        }
        self.compose_document().map(Some)
    }

    /// Compose the only document of the stream.
    ///
    /// Returns `None` for a stream without documents and fails if a second
    /// document follows the first.
    pub fn single_document(&mut self) -> Result<Option<Document>> {
        let document = if self.has_node()? {
            Some(self.compose_document()?)
        } else {
            None
        };
        if self.has_node()? {
            let event = self.parser.next_event()?;
            return Err(YamlError::composer(
                Some("expected a single document in the stream"),
                document.as_ref().and_then(|d| d.start.clone()),
                "but found another document",
                event.start,
            ));
        }
        if self.parser.check_event(&[EventId::StreamEnd])? {
            self.parser.next_event()?;
        }
        Ok(document)
    }

    fn compose_document(&mut self) -> Result<Document> {
        let start = self.parser.next_event()?;
        if start.id() != EventId::DocumentStart {
            return Err(YamlError::composer(
                None,
                None,
                format!("expected a document start, but found {:?}", start.id()),
                start.start,
            ));
        }
        self.anchors.clear();
        self.collection_aliases = 0;

        let mut nodes = Vec::new();
        let root = self.compose_root(&mut nodes)?;
        self.collect_comments(&mut nodes, Some(root))?;
        nodes[root.index()]
            .end_comments
            .append(&mut self.pending_comments);
        let end = self.parser.next_event()?;

        debug!(
            nodes = nodes.len(),
            anchors = self.anchors.len(),
            "composed document"
        );
        let mut document = Document::new(nodes, root);
        document.start = start.start;
        document.end = end.end;
        Ok(document)
    }

    fn compose_root(&mut self, nodes: &mut Vec<Node>) -> Result<NodeId> {
        let mut stack: Vec<Frame> = Vec::new();
        let mut last: Option<NodeId> = None;
        loop {
            self.collect_comments(nodes, last)?;
            let Event { kind, start, end } = self.parser.next_event()?;
            let completed = match kind {
                EventKind::Alias(anchor) => Some(self.compose_alias(nodes, &stack, anchor, start)?),
                EventKind::Scalar {
                    anchor,
                    tag,
                    implicit,
                    value,
                    style,
                } => {
                    let (tag, resolved) = match tag.as_deref() {
                        None | Some("!") => (
                            self.schema.scalar_resolver().resolve(&value, implicit.plain),
                            true,
                        ),
                        Some(explicit) => (Tag::new(explicit), false),
                    };
                    let node = Node::new(tag, NodeData::Scalar { value, style }, start, end);
                    Some(self.add_node(nodes, node, resolved, anchor))
                }
                EventKind::SequenceStart {
                    anchor,
                    tag,
                    flow_style,
                    ..
                } => {
                    let (tag, resolved) = collection_tag(tag, Tag::SEQ);
                    let data = NodeData::Sequence {
                        items: Vec::new(),
                        flow_style,
                    };
                    let id = self.add_node(nodes, Node::new(tag, data, start, None), resolved, anchor);
                    stack.push(Frame::Sequence { id });
                    None
                }
                EventKind::MappingStart {
                    anchor,
                    tag,
                    flow_style,
                    ..
                } => {
                    let (tag, resolved) = collection_tag(tag, Tag::MAP);
                    let data = NodeData::Mapping {
                        entries: Vec::new(),
                        flow_style,
                        merged: false,
                    };
                    let id = self.add_node(nodes, Node::new(tag, data, start, None), resolved, anchor);
                    stack.push(Frame::Mapping {
                        id,
                        key: None,
                        seen: HashSet::new(),
                        has_merge: false,
                    });
                    None
                }
                EventKind::SequenceEnd | EventKind::MappingEnd => {
                    let frame = stack.pop().ok_or_else(|| {
                        YamlError::composer(None, None, "unexpected end of a collection", start.clone())
                    })?;
                    let id = frame.id();
                    let node = &mut nodes[id.index()];
                    node.end = end;
                    node.end_comments.append(&mut self.pending_comments);
                    if let Frame::Mapping {
                        has_merge: true, ..
                    } = frame
                    {
                        flatten_mapping(nodes, id)?;
                    }
                    Some(id)
                }
                other => {
                    return Err(YamlError::composer(
                        None,
                        None,
                        format!("expected a node, but found {:?}", other.id()),
                        start,
                    ))
                }
            };

            let Some(id) = completed else {
                continue;
            };
            last = Some(id);
            match stack.last_mut() {
                None => return Ok(id),
                Some(Frame::Sequence { id: sequence }) => {
                    if let NodeData::Sequence { items, .. } = &mut nodes[sequence.index()].data {
                        items.push(id);
                    }
                }
                Some(Frame::Mapping {
                    id: mapping,
                    key,
                    seen,
                    has_merge,
                }) => match key.take() {
                    Some(key) => {
                        if let NodeData::Mapping { entries, .. } = &mut nodes[mapping.index()].data {
                            entries.push(NodeTuple::new(key, id));
                        }
                    }
                    None => {
                        self.check_key(nodes, *mapping, id, seen, has_merge)?;
                        *key = Some(id);
                    }
                },
            }
        }
    }

    fn add_node(
        &mut self,
        nodes: &mut Vec<Node>,
        mut node: Node,
        resolved: bool,
        anchor: Option<Anchor>,
    ) -> NodeId {
        node.resolved = resolved;
        node.anchor = anchor.clone();
        node.block_comments = std::mem::take(&mut self.pending_comments);
        let id = push_node(nodes, node);
        if let Some(anchor) = anchor {
            if let Some(previous) = self.anchors.insert(anchor.clone(), id) {
                trace!(%anchor, previous = previous.index(), "anchor redefined");
            }
        }
        id
    }

    fn compose_alias(
        &mut self,
        nodes: &mut [Node],
        stack: &[Frame],
        anchor: Anchor,
        mark: Option<Mark>,
    ) -> Result<NodeId> {
        let id = match self.anchors.get(&anchor) {
            Some(id) => *id,
            None => {
                return Err(YamlError::composer(
                    None,
                    None,
                    format!("found undefined alias {}", anchor),
                    mark,
                ))
            }
        };
        if !nodes[id.index()].is_scalar() {
            self.collection_aliases += 1;
            if self.collection_aliases > self.max_aliases_for_collections {
                return Err(YamlError::composer(
                    None,
                    None,
                    format!(
                        "Number of aliases for non-scalar nodes exceeds the specified max={}",
                        self.max_aliases_for_collections
                    ),
                    mark,
                ));
            }
        }
        if let Some(position) = stack.iter().position(|frame| frame.id() == id) {
            for frame in &stack[position..] {
                nodes[frame.id().index()].recursive = true;
            }
        }
        debug!(%anchor, node = id.index(), "alias resolved");
        nodes[id.index()]
            .block_comments
            .append(&mut self.pending_comments);
        Ok(id)
    }

    fn check_key(
        &self,
        nodes: &[Node],
        mapping: NodeId,
        key: NodeId,
        seen: &mut HashSet<(Tag, String)>,
        has_merge: &mut bool,
    ) -> Result<()> {
        let node = &nodes[key.index()];
        if node.recursive && !self.allow_recursive_keys {
            return Err(YamlError::composer(
                Some(MAPPING_CONTEXT),
                nodes[mapping.index()].start.clone(),
                "Recursive key for mapping is detected but it is not configured to be allowed.",
                node.start.clone(),
            ));
        }
        if node.tag == Tag::MERGE {
            *has_merge = true;
            return Ok(());
        }
        if self.allow_duplicate_keys {
            return Ok(());
        }
        if let Some(value) = node.as_str() {
            if !seen.insert((node.tag.clone(), value.to_string())) {
                return Err(YamlError::composer(
                    Some(MAPPING_CONTEXT),
                    nodes[mapping.index()].start.clone(),
                    format!("found duplicate key {}", value),
                    node.start.clone(),
                ));
            }
        }
        Ok(())
    }

    /// Move comment events into nodes: inline comments go to the node that
    /// just completed, everything else waits for the next node.
    fn collect_comments(&mut self, nodes: &mut [Node], last: Option<NodeId>) -> Result<()> {
        while self.parser.check_event(&[EventId::Comment])? {
            let event = self.parser.next_event()?;
            let Some(line) = CommentLine::from_event(event) else {
                continue;
            };
            match (line.comment_type, last) {
                (CommentType::Inline, Some(id)) => nodes[id.index()].inline_comments.push(line),
                _ => self.pending_comments.push(line),
            }
        }
        Ok(())
    }
}

fn merge_error(nodes: &[Node], mapping: NodeId, offending: NodeId) -> YamlError {
    YamlError::composer(
        Some(MAPPING_CONTEXT),
        nodes[mapping.index()].start.clone(),
        "Expected mapping node or an anchor referencing mapping",
        nodes[offending.index()].start.clone(),
    )
}

/// Replace `<<` entries of mapping `id` with the entries they reference.
///
/// The mapping's own entries are kept as they are, after the merged ones,
/// and hide merged entries with the same key. For a sequence of mappings,
/// earlier mappings win over later ones and a merged key keeps the
/// position of its first occurrence.
fn flatten_mapping(nodes: &mut [Node], id: NodeId) -> Result<()> {
    let entries = match &nodes[id.index()].data {
        NodeData::Mapping { entries, .. } => entries.clone(),
        _ => return Ok(()),
    };
    let mut merged: Vec<NodeTuple> = Vec::new();
    let mut own: Vec<NodeTuple> = Vec::new();
    for entry in entries {
        if nodes[entry.key.index()].tag != Tag::MERGE {
            own.push(entry);
            continue;
        }
        match &nodes[entry.value.index()].data {
            NodeData::Mapping { entries, .. } => merged.extend(entries.iter().copied()),
            NodeData::Sequence { items, .. } => {
                let mut groups = Vec::with_capacity(items.len());
                for item in items {
                    match &nodes[item.index()].data {
                        NodeData::Mapping { entries, .. } => groups.push(entries.clone()),
                        _ => return Err(merge_error(nodes, id, *item)),
                    }
                }
                for group in groups.into_iter().rev() {
                    merged.extend(group);
                }
            }
            NodeData::Scalar { .. } => return Err(merge_error(nodes, id, entry.value)),
        }
    }

    let own_keys: HashSet<(Tag, String)> = own
        .iter()
        .filter_map(|entry| scalar_key(nodes, entry.key))
        .collect();
    let mut result: Vec<NodeTuple> = Vec::with_capacity(merged.len() + own.len());
    let mut positions: HashMap<(Tag, String), usize> = HashMap::new();
    for entry in merged {
        match scalar_key(nodes, entry.key) {
            Some(key) if own_keys.contains(&key) => {}
            Some(key) => match positions.entry(key) {
                Entry::Occupied(slot) => result[*slot.get()] = entry,
                Entry::Vacant(slot) => {
                    slot.insert(result.len());
                    result.push(entry);
                }
            },
            None => result.push(entry),
        }
    }
    result.extend(own);

    debug!(mapping = id.index(), entries = result.len(), "merge keys flattened");
    if let NodeData::Mapping {
        entries, merged, ..
    } = &mut nodes[id.index()].data
    {
        *entries = result;
        *merged = true;
    }
    Ok(())
}

/// Identity of a scalar key for duplicate and merge checks.
fn scalar_key(nodes: &[Node], id: NodeId) -> Option<(Tag, String)> {
    let node = &nodes[id.index()];
    node.as_str().map(|text| (node.tag.clone(), text.to_string()))
}

impl Iterator for Composer<'_> {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_document() {
            Ok(Some(document)) => Some(Ok(document)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}
