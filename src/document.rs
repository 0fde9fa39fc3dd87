//! Read-only document tree: ordered visible text leaves with an offset index.
//!
//! Every position the engine talks about is either a [`Boundary`] inside a
//! text leaf or an absolute char offset into the concatenated visible text.
//! The tree is frozen by [`DocumentBuilder::build`], which computes the
//! leaf table, element spans, block breaks, and the searchable text once.

use std::path::Path;

use scraper::Html;

use crate::error::Error;
use crate::normalize::{self, NormalizedText};
use crate::tags;

/// A point inside a text leaf: the leaf node plus a char offset into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    /// Text node holding the point.
    pub node: NodeId,
    /// Char offset into the node's text.
    pub offset: usize,
}

/// A frozen document. Construct with [`DocumentBuilder`] or [`Document::parse_html`].
#[derive(Debug)]
pub struct Document {
    /// Sorted absolute offsets where a visible block element starts or ends.
    block_breaks: Vec<usize>,
    /// Concatenated visible text.
    chars: Vec<char>,
    /// Leaf index for each node, `None` for elements and skipped text.
    leaf_of: Vec<Option<usize>>,
    /// Visible, non-blank text nodes in document order.
    leaves: Vec<TextLeaf>,
    /// Arena of all nodes; index 0 is the `body` root.
    nodes: Vec<Node>,
    /// Normalized, case-folded text used by the matcher.
    searchable: NormalizedText,
    /// Absolute text span of each node.
    spans: Vec<Span>,
}

/// Appends nodes to a tree rooted at `body`, then freezes it into a [`Document`].
#[derive(Debug)]
pub struct DocumentBuilder {
    /// Arena of nodes built so far.
    nodes: Vec<Node>,
}

/// A contiguous selection or match between two boundaries, start first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentRange {
    /// Boundary one past the last selected char.
    pub end: Boundary,
    /// Boundary at the first selected char.
    pub start: Boundary,
}

/// One tree node.
#[derive(Debug)]
struct Node {
    /// Child nodes in document order.
    children: Vec<NodeId>,
    /// Element or text payload.
    data: NodeData,
    /// Parent node, `None` only for the root.
    parent: Option<NodeId>,
}

/// Payload of a tree node.
#[derive(Debug)]
enum NodeData {
    /// An element with its lowercase tag name.
    Element {
        /// Carries the `hidden` attribute.
        hidden: bool,
        /// Lowercase tag name.
        tag: String,
    },
    /// A text node.
    Text(String),
}

/// Handle to a node inside one document or builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Absolute text span of a node.
#[derive(Debug, Clone, Copy, Default)]
struct Span {
    /// Offset one past the node's last char.
    end: usize,
    /// Whether the node sits in a hidden subtree.
    hidden: bool,
    /// Offset of the node's first char.
    start: usize,
}

/// A visible text node and its absolute char span.
#[derive(Debug, Clone, Copy)]
pub struct TextLeaf {
    /// Offset one past the leaf's last char.
    pub end: usize,
    /// The text node.
    pub node: NodeId,
    /// Offset of the leaf's first char.
    pub start: usize,
}

/// Traversal step used while freezing the tree.
#[derive(Debug, Clone, Copy)]
enum Visit {
    /// Enter a node.
    Enter,
    /// Leave an element after its children.
    Exit,
}

impl Document {
    /// Absolute char offset of a boundary, `None` if it is not inside a leaf.
    pub fn absolute(&self, boundary: Boundary) -> Option<usize> {
        let leaf = self.leaf_for(boundary.node)?;
        let position = leaf.start.checked_add(boundary.offset)?;
        return (position <= leaf.end).then_some(position);
    }

    /// Absolute `(start, end)` offsets of a range, `None` if reversed or detached.
    pub fn absolute_range(&self, range: &DocumentRange) -> Option<(usize, usize)> {
        let start = self.absolute(range.start)?;
        let end = self.absolute(range.end)?;
        return (start <= end).then_some((start, end));
    }

    /// The node and its ancestors, innermost first.
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            let Some(entry) = self.nodes.get(id.0) else { break };
            chain.push(id);
            current = entry.parent;
        }
        return chain;
    }

    /// Boundary for a range end at `position`: the leaf where
    /// `start < position <= end`.
    pub fn boundary_at_end(&self, position: usize) -> Option<Boundary> {
        let after = self.leaves.partition_point(|l| return l.start < position);
        let leaf = self.leaves.get(after.checked_sub(1)?)?;
        if position > leaf.end {
            return None;
        }
        return Some(Boundary {
            node: leaf.node,
            offset: position.saturating_sub(leaf.start),
        });
    }

    /// Boundary for a range start at `position`: the leaf where
    /// `start <= position < end`.
    pub fn boundary_at_start(&self, position: usize) -> Option<Boundary> {
        let after = self.leaves.partition_point(|l| return l.start <= position);
        let leaf = self.leaves.get(after.checked_sub(1)?)?;
        if position >= leaf.end {
            return None;
        }
        return Some(Boundary {
            node: leaf.node,
            offset: position.saturating_sub(leaf.start),
        });
    }

    /// Char at an absolute offset.
    pub fn char_at(&self, position: usize) -> Option<char> {
        return self.chars.get(position).copied();
    }

    /// Children of a node, empty for unknown ids.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        return self.nodes.get(node.0).map_or(&[], |n| return n.children.as_slice());
    }

    /// Deepest node containing both `a` and `b`.
    pub fn common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        let of_a = self.ancestors(a);
        return self.ancestors(b).into_iter().find(|id| return of_a.contains(id));
    }

    /// Whether the range touches a block element below its common ancestor,
    /// i.e. the contents of the range include a block-level element.
    pub fn crosses_block(&self, range: &DocumentRange) -> bool {
        let Some((start, end)) = self.absolute_range(range) else {
            return false;
        };
        let Some(common) = self.common_ancestor(range.start.node, range.end.node) else {
            return false;
        };

        let mut stack: Vec<NodeId> = self.children(common).to_vec();
        while let Some(id) = stack.pop() {
            let (Some(tag), Some(span)) = (self.tag(id), self.spans.get(id.0)) else {
                continue;
            };
            if span.hidden {
                continue;
            }
            let touches = if span.start == span.end {
                start < span.start && span.start < end
            } else {
                span.start < end && span.end > start
            };
            if !touches {
                continue;
            }
            if tags::is_block(tag) {
                return true;
            }
            stack.extend_from_slice(self.children(id));
        }
        return false;
    }

    /// Absolute `(start, end)` span of an element's visible text.
    pub fn element_span(&self, node: NodeId) -> Option<(usize, usize)> {
        let span = self.spans.get(node.0)?;
        return Some((span.start, span.end));
    }

    /// Locate the `occurrence`-th (one-based) match of `quote` in the
    /// normalized document text and return it as a range.
    pub fn find_quote(&self, quote: &str, occurrence: usize) -> Option<DocumentRange> {
        let needle = normalize::fold(&normalize::normalize(quote));
        if needle.is_empty() || occurrence == 0 {
            return None;
        }
        let haystack = self.searchable.as_str();
        let mut from = 0_usize;
        let mut seen = 0_usize;

        while let Some(found) = haystack.get(from..).and_then(|rest| return rest.find(&needle)) {
            let start_byte = from.saturating_add(found);
            seen = seen.saturating_add(1);
            if seen == occurrence {
                let end_byte = start_byte.saturating_add(needle.len());
                let start = self.searchable.char_index(start_byte)?;
                let end = self.searchable.char_index(end_byte)?;
                let (raw_start, raw_end) = self.searchable.raw_span(start, end)?;
                return self.range_from_offsets(raw_start, raw_end);
            }
            from = next_char_boundary(haystack, start_byte);
        }
        return None;
    }

    /// Whether a block element starts or ends at `position`.
    pub fn is_block_break(&self, position: usize) -> bool {
        return self.block_breaks.binary_search(&position).is_ok();
    }

    /// Leaf record for a text node.
    fn leaf_for(&self, node: NodeId) -> Option<&TextLeaf> {
        let index = (*self.leaf_of.get(node.0)?)?;
        return self.leaves.get(index);
    }

    /// Visible text leaves in document order.
    pub fn leaves(&self) -> &[TextLeaf] {
        return &self.leaves;
    }

    /// Read and parse an HTML file.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotFound` if the file cannot be read,
    /// or `Error::ParseFailed` if it has no `<body>`.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let html = std::fs::read_to_string(path)
            .map_err(|_err| return Error::FileNotFound { path: path.to_path_buf() })?;
        return Self::parse_html(&html).ok_or_else(|| return Error::ParseFailed {
            file: path.to_path_buf(),
            reason: "no <body> element".to_string(),
        });
    }

    /// Parse HTML and keep the `<body>` subtree: elements, their `hidden`
    /// attribute, and text. Comments and processing instructions are dropped.
    pub fn parse_html(html: &str) -> Option<Self> {
        let parsed = Html::parse_document(html);
        let body = parsed
            .tree
            .root()
            .descendants()
            .find(|n| return n.value().as_element().is_some_and(|e| return e.name() == "body"))?;

        let mut builder = DocumentBuilder::new();
        let mut stack = vec![(body, builder.root())];
        while let Some((html_node, parent)) = stack.pop() {
            let children: Vec<_> = html_node.children().collect();
            for child in children.into_iter().rev() {
                match child.value() {
                    scraper::Node::Element(element) => {
                        let tag = element.name();
                        let id = if element.attr("hidden").is_some() {
                            builder.hidden_element(parent, tag)
                        } else {
                            builder.element(parent, tag)
                        };
                        stack.push((child, id));
                    },
                    scraper::Node::Text(text) => {
                        builder.text(parent, text);
                    },
                    _ => {},
                }
            }
            builder.reverse_children(parent);
        }
        return Some(builder.build());
    }

    /// Sort key of a boundary in document order: `(leaf index, offset)`.
    /// Distinguishes the end of one leaf from the start of the next.
    pub fn position(&self, boundary: Boundary) -> Option<(usize, usize)> {
        let index = (*self.leaf_of.get(boundary.node.0)?)?;
        return Some((index, boundary.offset));
    }

    /// Build a range from absolute offsets. `None` when either end falls
    /// outside a text leaf or the range is empty.
    pub fn range_from_offsets(&self, start: usize, end: usize) -> Option<DocumentRange> {
        if start >= end {
            return None;
        }
        return Some(DocumentRange {
            end: self.boundary_at_end(end)?,
            start: self.boundary_at_start(start)?,
        });
    }

    /// Plain-text rendering of a range, block edges rendered as line breaks.
    pub fn range_text(&self, range: &DocumentRange) -> Option<String> {
        let (start, end) = self.absolute_range(range)?;
        return Some(self.text_between(start, end));
    }

    /// The root `body` element.
    pub const fn root(&self) -> NodeId {
        return NodeId(0);
    }

    /// Normalized, case-folded document text with its offset map.
    pub const fn searchable(&self) -> &NormalizedText {
        return &self.searchable;
    }

    /// Lowercase tag of an element, `None` for text nodes.
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        return match &self.nodes.get(node.0)?.data {
            NodeData::Element { tag, .. } => Some(tag.as_str()),
            NodeData::Text(_) => None,
        };
    }

    /// Visible text between two absolute offsets, with a line break at
    /// every block edge strictly inside the span.
    pub fn text_between(&self, start: usize, end: usize) -> String {
        let mut out = String::new();
        let end = end.min(self.chars.len());
        for position in start..end {
            if position > start && self.is_block_break(position) {
                out.push('\n');
            }
            if let Some(c) = self.chars.get(position) {
                out.push(*c);
            }
        }
        return out;
    }
}

impl DocumentBuilder {
    /// Append a node under `parent`. A parent id from another builder leaves
    /// the node detached, so it never becomes visible.
    fn append(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            children: Vec::new(),
            data,
            parent: Some(parent),
        });
        if let Some(parent_node) = self.nodes.get_mut(parent.0) {
            parent_node.children.push(id);
        }
        return id;
    }

    /// Freeze the tree and compute the leaf table, spans, block breaks, and
    /// searchable text.
    pub fn build(self) -> Document {
        let nodes = self.nodes;
        let mut spans = vec![Span::default(); nodes.len()];
        let mut leaf_of = vec![None; nodes.len()];
        let mut leaves = Vec::new();
        let mut chars = Vec::new();
        let mut block_breaks = Vec::new();
        let mut stack = vec![(NodeId(0), Visit::Enter, false)];

        while let Some((id, visit, hidden)) = stack.pop() {
            let (Some(node), Some(span)) = (nodes.get(id.0), spans.get_mut(id.0)) else {
                continue;
            };
            match (visit, &node.data) {
                (Visit::Enter, NodeData::Text(text)) => {
                    span.start = chars.len();
                    span.hidden = hidden;
                    if !hidden {
                        chars.extend(text.chars());
                        // Blank nodes keep their whitespace in the text but can't hold a boundary.
                        if !text.trim().is_empty()
                            && let Some(slot) = leaf_of.get_mut(id.0)
                        {
                            *slot = Some(leaves.len());
                            leaves.push(TextLeaf {
                                end: chars.len(),
                                node: id,
                                start: span.start,
                            });
                        }
                    }
                    span.end = chars.len();
                },
                (Visit::Enter, NodeData::Element { hidden: own, tag }) => {
                    let hide = hidden || *own || tags::is_hidden(tag);
                    span.start = chars.len();
                    span.hidden = hide;
                    if !hide && tags::is_block(tag) {
                        block_breaks.push(chars.len());
                    }
                    stack.push((id, Visit::Exit, hide));
                    for child in node.children.iter().rev() {
                        stack.push((*child, Visit::Enter, hide));
                    }
                },
                (Visit::Exit, NodeData::Element { tag, .. }) => {
                    span.end = chars.len();
                    if !hidden && tags::is_block(tag) {
                        block_breaks.push(chars.len());
                    }
                },
                (Visit::Exit, NodeData::Text(_)) => {},
            }
        }

        block_breaks.sort_unstable();
        block_breaks.dedup();
        let searchable = NormalizedText::build(&chars, &block_breaks);

        return Document {
            block_breaks,
            chars,
            leaf_of,
            leaves,
            nodes,
            searchable,
            spans,
        };
    }

    /// Append an element under `parent`.
    pub fn element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        return self.append(parent, NodeData::Element {
            hidden: false,
            tag: tag.to_ascii_lowercase(),
        });
    }

    /// Append an element carrying the `hidden` attribute under `parent`.
    pub fn hidden_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        return self.append(parent, NodeData::Element {
            hidden: true,
            tag: tag.to_ascii_lowercase(),
        });
    }

    /// Start a tree with an empty `body` root.
    pub fn new() -> Self {
        return Self {
            nodes: vec![Node {
                children: Vec::new(),
                data: NodeData::Element {
                    hidden: false,
                    tag: "body".to_string(),
                },
                parent: None,
            }],
        };
    }

    /// Reverse a node's child list; the HTML loader appends siblings last-first.
    fn reverse_children(&mut self, node: NodeId) {
        if let Some(entry) = self.nodes.get_mut(node.0) {
            entry.children.reverse();
        }
    }

    /// The `body` root.
    pub const fn root(&self) -> NodeId {
        return NodeId(0);
    }

    /// Append a text node under `parent`.
    pub fn text(&mut self, parent: NodeId, text: &str) -> NodeId {
        return self.append(parent, NodeData::Text(text.to_string()));
    }
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        return Self::new();
    }
}

/// Byte offset of the char after the one starting at `byte`.
pub fn next_char_boundary(text: &str, byte: usize) -> usize {
    let width = text.get(byte..).and_then(|rest| return rest.chars().next()).map_or(1, char::len_utf8);
    return byte.saturating_add(width);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId) {
        let mut b = DocumentBuilder::new();
        let root = b.root();
        let p = b.element(root, "p");
        let hello = b.text(p, "Hello ");
        let bold = b.element(p, "b");
        let world = b.text(bold, "world");
        let script = b.element(root, "script");
        b.text(script, "var x = 1;");
        let p2 = b.element(root, "p");
        b.text(p2, "Next line");
        (b.build(), hello, world)
    }

    #[test]
    fn skips_hidden_subtrees() {
        let (doc, _, _) = sample();
        assert_eq!(doc.text_between(0, usize::MAX), "Hello world\nNext line");
        assert_eq!(doc.leaves().len(), 3);
    }

    #[test]
    fn maps_offsets_to_boundaries_and_back() {
        let (doc, hello, world) = sample();
        let start = doc.boundary_at_start(6).unwrap();
        assert_eq!(start, Boundary { node: world, offset: 0 });
        let end = doc.boundary_at_end(6).unwrap();
        assert_eq!(end, Boundary { node: hello, offset: 6 });
        assert_eq!(doc.absolute(start), Some(6));
        assert_eq!(doc.absolute(end), Some(6));
        assert!(doc.position(end) < doc.position(start));
    }

    #[test]
    fn detects_block_crossing() {
        let (doc, _, _) = sample();
        let inside = doc.find_quote("Hello world", 1).unwrap();
        assert!(!doc.crosses_block(&inside));
        let across = doc.find_quote("world Next", 1).unwrap();
        assert!(doc.crosses_block(&across));
    }

    #[test]
    fn finds_nth_quote_case_insensitively() {
        let doc = Document::parse_html("<p>The cat. the CAT.</p>").unwrap();
        let second = doc.find_quote("the cat", 2).unwrap();
        assert_eq!(doc.absolute_range(&second), Some((9, 16)));
        assert!(doc.find_quote("the cat", 3).is_none());
    }

    #[test]
    fn parses_html_in_document_order() {
        let doc = Document::parse_html(
            "<html><head><title>T</title></head><body><h1>Title</h1><p>One <em>two</em> three</p>\
             <div hidden>secret</div><style>p{}</style></body></html>",
        )
        .unwrap();
        assert_eq!(doc.text_between(0, usize::MAX), "Title\nOne two three");
        assert_eq!(doc.searchable().as_str(), "title one two three");
    }

    #[test]
    fn blank_nodes_keep_words_apart_without_becoming_leaves() {
        let doc = Document::parse_html("<p><b>alpha</b> <i>beta</i></p>").unwrap();
        assert_eq!(doc.searchable().as_str(), "alpha beta");
        assert_eq!(doc.leaves().len(), 2);
        assert!(doc.boundary_at_start(5).is_none());
    }
}
