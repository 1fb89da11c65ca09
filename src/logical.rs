//! The index-addressable tree that render batches are applied against.
//!
//! Physical DOM adjacency can't be used for this directly: Component boundaries and markup blocks
//! occupy exactly one logical sibling slot each, but physically they are a marker comment followed
//! by any number of (logical) descendants, all as siblings in the same DOM parent.
//!
//! ```text
//! logical                 physical
//! <div>                   <div>
//! ├─ "a"                  ├─ "a"
//! ├─ [component]          ├─ <!--!-->
//! │  ├─ <p>               ├─ <p>
//! │  └─ [markup]          ├─ <!--!-->
//! │     └─ <b>            ├─ <b>
//! └─ "z"                  └─ "z"
//! ```

use crate::{
	batch::PermutationEntry,
	document::Document,
	error::{DomError, ProtocolViolation, RenderError, Result},
	form::DeferredValue,
};
use hashbrown::HashSet;
use slotmap::SlotMap;
use tracing::{instrument, trace, trace_span, warn};

slotmap::new_key_type! {
	/// Handle to a unit of the logical tree. Stays valid until the node is removed.
	pub struct LogicalNode;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicalKind {
	Element { tag: String, svg: bool },
	Text,
	/// Zero-footprint component or markup block, anchored by a marker comment.
	Container,
	/// Anything else taken over from parsed markup or pre-existing content (comments, mostly).
	Foreign,
}
impl LogicalKind {
	#[must_use]
	pub fn name(&self) -> &'static str {
		match self {
			LogicalKind::Element { .. } => "element",
			LogicalKind::Text => "text",
			LogicalKind::Container => "container",
			LogicalKind::Foreign => "foreign",
		}
	}

	#[must_use]
	pub fn is_element(&self, tag_name: &str) -> bool {
		matches!(self, LogicalKind::Element { tag, .. } if tag.eq_ignore_ascii_case(tag_name))
	}
}

#[derive(Debug)]
struct Entry<N> {
	physical: N,
	kind: LogicalKind,
	parent: Option<LogicalNode>,
	children: Vec<LogicalNode>,
	/// End marker of a root region. Content is kept in front of it.
	range_end: Option<N>,
	/// Only consulted for parentless non-elements.
	svg_context: bool,
	deferred_value: Option<DeferredValue>,
}
impl<N> Entry<N> {
	fn new(physical: N, kind: LogicalKind) -> Self {
		Self {
			physical,
			kind,
			parent: None,
			children: Vec::new(),
			range_end: None,
			svg_context: false,
			deferred_value: None,
		}
	}
}

/// Side tables mapping physical nodes to logical parent/children relations.
///
/// The physical document owns the nodes; this only holds handles to them.
#[derive(Debug)]
pub struct LogicalTree<N> {
	nodes: SlotMap<LogicalNode, Entry<N>>,
}
impl<N> Default for LogicalTree<N> {
	fn default() -> Self {
		Self::new()
	}
}
impl<N> LogicalTree<N> {
	#[must_use]
	pub fn new() -> Self {
		Self { nodes: SlotMap::with_key() }
	}

	fn entry(&self, node: LogicalNode) -> Result<&Entry<N>> {
		self.nodes.get(node).ok_or(RenderError::StaleNode)
	}

	fn entry_mut(&mut self, node: LogicalNode) -> Result<&mut Entry<N>> {
		self.nodes.get_mut(node).ok_or(RenderError::StaleNode)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	#[must_use]
	pub fn contains(&self, node: LogicalNode) -> bool {
		self.nodes.contains_key(node)
	}

	pub fn kind(&self, node: LogicalNode) -> Result<&LogicalKind> {
		Ok(&self.entry(node)?.kind)
	}

	pub fn physical(&self, node: LogicalNode) -> Result<&N> {
		Ok(&self.entry(node)?.physical)
	}

	#[must_use]
	pub fn parent_of(&self, node: LogicalNode) -> Option<LogicalNode> {
		self.nodes.get(node).and_then(|entry| entry.parent)
	}

	pub fn children(&self, parent: LogicalNode) -> Result<&[LogicalNode]> {
		Ok(&self.entry(parent)?.children)
	}

	pub fn child_at(&self, parent: LogicalNode, index: usize) -> Result<LogicalNode> {
		let children = &self.entry(parent)?.children;
		children.get(index).copied().ok_or(RenderError::IndexOutOfRange { index, len: children.len() })
	}

	/// The end marker of a root region, if `node` is one that still has it.
	#[must_use]
	pub fn sibling_range_end(&self, node: LogicalNode) -> Option<&N> {
		self.nodes.get(node).and_then(|entry| entry.range_end.as_ref())
	}

	#[must_use]
	pub fn deferred_value(&self, node: LogicalNode) -> Option<&DeferredValue> {
		self.nodes.get(node).and_then(|entry| entry.deferred_value.as_ref())
	}

	pub fn set_deferred_value(&mut self, node: LogicalNode, value: Option<DeferredValue>) -> Result<()> {
		self.entry_mut(node)?.deferred_value = value;
		Ok(())
	}

	/// Whether content created under `node` belongs in the SVG namespace.
	#[must_use]
	pub fn is_svg_context(&self, node: LogicalNode) -> bool {
		let mut current = self.nodes.get(node);
		while let Some(entry) = current {
			if let LogicalKind::Element { svg, .. } = entry.kind {
				return svg;
			}
			match entry.parent {
				Some(parent) => current = self.nodes.get(parent),
				None => return entry.svg_context,
			}
		}
		false
	}

	/// Closest strict logical ancestor that is an element with the given tag.
	#[must_use]
	pub fn closest_ancestor_element(&self, node: LogicalNode, tag_name: &str) -> Option<LogicalNode> {
		let mut current = self.parent_of(node);
		while let Some(ancestor) = current {
			let entry = self.nodes.get(ancestor)?;
			if entry.kind.is_element(tag_name) {
				return Some(ancestor);
			}
			current = entry.parent;
		}
		None
	}
}

impl<N: Clone + PartialEq> LogicalTree<N> {
	/// Takes over an existing element as a logical root. Its existing DOM children are not tracked.
	pub fn adopt_element<D: Document<Node = N>>(&mut self, document: &D, element: N) -> Result<LogicalNode> {
		let tag = document.tag_name(&element).ok_or(RenderError::UnexpectedNodeKind {
			operation: "attach a root component",
			expected: "element",
			found: if document.is_text(&element) { "text" } else { "non-element" },
		})?;
		let svg = document.is_svg(&element);
		Ok(self.nodes.insert(Entry::new(element, LogicalKind::Element { tag, svg })))
	}

	/// Takes over the nodes between a `start` and `end` marker pair as a logical root container.
	pub fn adopt_region<D: Document<Node = N>>(&mut self, document: &D, start: N, end: N) -> Result<LogicalNode> {
		let svg_context = document.parent_node(&start).map_or(false, |parent| document.is_svg(&parent));
		let mut existing = Vec::new();
		let mut next = document.next_sibling(&start);
		loop {
			match next {
				Some(node) if node == end => break,
				Some(node) => {
					next = document.next_sibling(&node);
					existing.push(node);
				}
				None => return Err(DomError::new("region end marker is not a following sibling of its start marker").into()),
			}
		}

		let mut entry = Entry::new(start, LogicalKind::Container);
		entry.range_end = Some(end);
		entry.svg_context = svg_context;
		let region = self.nodes.insert(entry);

		trace!("Adopting {} existing node(s) into the region.", existing.len());
		for node in existing {
			let child = self.adopt_foreign(document, node);
			self.link(region, None, child)?;
		}
		Ok(region)
	}

	/// Wraps a detached or pre-existing physical node as a logical leaf.
	pub fn adopt_foreign<D: Document<Node = N>>(&mut self, document: &D, node: N) -> LogicalNode {
		let kind = match document.tag_name(&node) {
			Some(tag) => LogicalKind::Element { svg: document.is_svg(&node), tag },
			None if document.is_text(&node) => LogicalKind::Text,
			None => LogicalKind::Foreign,
		};
		self.nodes.insert(Entry::new(node, kind))
	}

	pub fn create_element<D: Document<Node = N>>(&mut self, document: &mut D, tag_name: &str, svg: bool) -> Result<LogicalNode> {
		let element = document.create_element(tag_name, svg)?;
		Ok(self.nodes.insert(Entry::new(element, LogicalKind::Element { tag: tag_name.to_owned(), svg })))
	}

	pub fn create_text<D: Document<Node = N>>(&mut self, document: &mut D, data: &str) -> LogicalNode {
		let text = document.create_text_node(data);
		self.nodes.insert(Entry::new(text, LogicalKind::Text))
	}

	pub fn create_container<D: Document<Node = N>>(&mut self, document: &mut D) -> LogicalNode {
		let marker = document.create_comment("!");
		self.nodes.insert(Entry::new(marker, LogicalKind::Container))
	}

	/// Inserts `child` as the logical child `index` of `parent`, moving its whole physical range.
	#[instrument(skip(self, document))]
	pub fn insert_child<D: Document<Node = N>>(&mut self, document: &mut D, parent: LogicalNode, index: usize, child: LogicalNode) -> Result<()> {
		let parent_entry = self.entry(parent)?;
		match parent_entry.kind {
			LogicalKind::Element { .. } | LogicalKind::Container => (),
			ref other => {
				return Err(RenderError::UnexpectedNodeKind {
					operation: "insert a child",
					expected: "element or container",
					found: other.name(),
				})
			}
		}
		let len = parent_entry.children.len();
		if index > len {
			return Err(RenderError::IndexOutOfRange { index, len });
		}

		if let Some(previous_parent) = self.entry(child)?.parent {
			trace!("Moving child away from its previous logical parent.");
			self.entry_mut(previous_parent)?.children.retain(|&c| c != child);
		}

		let (container, reference) = self.insertion_point(document, parent, index)?;
		for node in self.physical_range(child)? {
			document.insert_before(&container, &node, reference.as_ref())?;
		}

		self.link(parent, Some(index), child)
	}

	fn link(&mut self, parent: LogicalNode, index: Option<usize>, child: LogicalNode) -> Result<()> {
		self.entry_mut(child)?.parent = Some(parent);
		let children = &mut self.entry_mut(parent)?.children;
		match index {
			Some(index) => children.insert(index, child),
			None => children.push(child),
		}
		Ok(())
	}

	/// Removes logical child `index` of `parent` along with all of its physical nodes.
	#[instrument(skip(self, document))]
	pub fn remove_child<D: Document<Node = N>>(&mut self, document: &mut D, parent: LogicalNode, index: usize) -> Result<()> {
		let child = self.child_at(parent, index)?;
		for node in self.physical_range(child)? {
			document.remove(&node)?;
		}
		self.entry_mut(parent)?.children.remove(index);
		self.free(child);
		Ok(())
	}

	/// Applies all moves as one reordering: `new[to] = old[from]` for each entry.
	#[instrument(skip(self, document))]
	pub fn permute_children<D: Document<Node = N>>(&mut self, document: &mut D, parent: LogicalNode, permutation: &[PermutationEntry]) -> Result<()> {
		let children = self.entry(parent)?.children.clone();
		let len = children.len();

		let mut sources = HashSet::with_capacity(permutation.len());
		let mut targets = HashSet::with_capacity(permutation.len());
		for &PermutationEntry { from_sibling_index, to_sibling_index } in permutation {
			for index in [from_sibling_index, to_sibling_index] {
				if index >= len {
					return Err(RenderError::IndexOutOfRange { index, len });
				}
			}
			if !sources.insert(from_sibling_index) {
				return Err(ProtocolViolation::InvalidPermutation("duplicate source index").into());
			}
			if !targets.insert(to_sibling_index) {
				return Err(ProtocolViolation::InvalidPermutation("duplicate target index").into());
			}
		}
		if sources != targets {
			return Err(ProtocolViolation::InvalidPermutation("source and target indices differ").into());
		}

		let mut reordered = children.clone();
		for entry in permutation {
			reordered[entry.to_sibling_index] = children[entry.from_sibling_index];
		}

		let first_moved = match reordered.iter().zip(&children).position(|(new, old)| new != old) {
			Some(first_moved) => first_moved,
			None => {
				trace!("Permutation is the identity.");
				return Ok(());
			}
		};

		// Everything from `first_moved` on is re-placed, in order, in front of a fixed anchor.
		let (container, anchor) = {
			let last = self.last_physical(children[len - 1])?;
			let container = document.parent_node(&last).ok_or_else(|| DomError::new("permuted children are not attached"))?;
			let anchor = document.next_sibling(&last);
			(container, anchor)
		};
		for &child in &reordered[first_moved..] {
			let span = trace_span!("Relocating child");
			let _enter = span.enter();
			for node in self.physical_range(child)? {
				document.insert_before(&container, &node, anchor.as_ref())?;
			}
		}

		self.entry_mut(parent)?.children = reordered;
		Ok(())
	}

	/// Removes all logical children of `node`.
	pub fn empty<D: Document<Node = N>>(&mut self, document: &mut D, node: LogicalNode) -> Result<()> {
		while let Some(last) = self.entry(node)?.children.len().checked_sub(1) {
			self.remove_child(document, node, last)?;
		}
		Ok(())
	}

	/// Removes all content of a root element, tracked or not.
	pub fn clear_element<D: Document<Node = N>>(&mut self, document: &mut D, element: LogicalNode) -> Result<()> {
		self.empty(document, element)?;
		let physical = self.entry(element)?.physical.clone();
		for child in document.child_nodes(&physical) {
			document.remove(&child)?;
		}
		Ok(())
	}

	/// Removes everything between a region's markers and the end marker itself,
	/// then blanks the start marker.
	pub fn clear_between<D: Document<Node = N>>(&mut self, document: &mut D, region: LogicalNode) -> Result<()> {
		self.empty(document, region)?;
		let entry = self.entry_mut(region)?;
		let start = entry.physical.clone();
		if let Some(end) = entry.range_end.take() {
			document.remove(&end)?;
		} else {
			warn!("Clearing a region whose end marker is already gone.");
		}
		document.set_character_data(&start, "!");
		Ok(())
	}

	fn insertion_point<D: Document<Node = N>>(&self, document: &D, parent: LogicalNode, index: usize) -> Result<(N, Option<N>)> {
		let entry = self.entry(parent)?;
		if let Some(&next) = entry.children.get(index) {
			let reference = self.entry(next)?.physical.clone();
			let container = document.parent_node(&reference).ok_or_else(|| DomError::new("logical sibling is not attached"))?;
			return Ok((container, Some(reference)));
		}

		match (&entry.kind, &entry.range_end) {
			(LogicalKind::Element { .. }, _) => Ok((entry.physical.clone(), None)),
			(_, Some(end)) => {
				let container = document.parent_node(end).ok_or_else(|| DomError::new("region end marker is not attached"))?;
				Ok((container, Some(end.clone())))
			}
			(_, None) => {
				let last = self.last_physical(parent)?;
				let container = document.parent_node(&last).ok_or_else(|| DomError::new("container is not attached"))?;
				let reference = document.next_sibling(&last);
				Ok((container, reference))
			}
		}
	}

	/// The physical node that ends `node`'s range.
	fn last_physical(&self, node: LogicalNode) -> Result<N> {
		let entry = self.entry(node)?;
		match (&entry.kind, entry.children.last()) {
			(LogicalKind::Container, Some(&last)) => self.last_physical(last),
			_ => Ok(entry.physical.clone()),
		}
	}

	/// All physical nodes that make up `node`'s slot, in document order.
	///
	/// For elements that's just the element itself; containers add their descendants' ranges.
	fn physical_range(&self, node: LogicalNode) -> Result<Vec<N>> {
		let mut range = Vec::new();
		self.collect_physical_range(node, &mut range)?;
		Ok(range)
	}

	fn collect_physical_range(&self, node: LogicalNode, range: &mut Vec<N>) -> Result<()> {
		let entry = self.entry(node)?;
		range.push(entry.physical.clone());
		if entry.kind == LogicalKind::Container {
			for &child in &entry.children {
				self.collect_physical_range(child, range)?;
			}
		}
		Ok(())
	}

	/// Drops `node` and its descendants from the side tables without touching the DOM.
	pub fn release(&mut self, node: LogicalNode) {
		if let Some(parent) = self.parent_of(node) {
			if let Some(parent) = self.nodes.get_mut(parent) {
				parent.children.retain(|&child| child != node);
			}
		}
		self.free(node);
	}

	fn free(&mut self, node: LogicalNode) {
		if let Some(entry) = self.nodes.remove(node) {
			for child in entry.children {
				self.free(child);
			}
		}
	}
}
