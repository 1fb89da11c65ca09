//! Structured view of a render batch.
//!
//! Decoding the binary wire format is the host's job.
//! This crate only ever sees [`Edit`]s and [`Frame`]s through a [`BatchReader`].

use crate::{ComponentId, EventHandlerId};

/// One instruction to mutate the logical tree.
///
/// Every sibling index is relative to the interpreter's cursor at the current depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit<'a> {
	PrependFrame { new_tree_index: usize, sibling_index: usize },
	RemoveFrame { sibling_index: usize },
	SetAttribute { new_tree_index: usize, sibling_index: usize },
	RemoveAttribute { sibling_index: usize, attribute_name: &'a str },
	UpdateText { new_tree_index: usize, sibling_index: usize },
	UpdateMarkup { new_tree_index: usize, sibling_index: usize },
	StepIn { sibling_index: usize },
	StepOut,
	PermutationListEntry { from_sibling_index: usize, to_sibling_index: usize },
	PermutationListEnd,
}

/// One unit of renderable content or metadata in the reference-frame array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
	/// `subtree_length` counts this frame, its attribute frames and all descendants.
	Element { tag_name: &'a str, subtree_length: usize },
	Text { content: &'a str },
	/// `value` is [`None`] for attributes that are present without a value (or absent, on removal).
	Attribute {
		name: &'a str,
		value: Option<&'a str>,
		event_handler_id: Option<EventHandlerId>,
	},
	Component { component_id: ComponentId, subtree_length: usize },
	Region { subtree_length: usize },
	Markup { content: &'a str },
	ElementReferenceCapture { capture_id: &'a str },
}
impl<'a> Frame<'a> {
	/// The subtree extent, **only** for frame kinds that define one.
	#[must_use]
	pub fn subtree_length(&self) -> Option<usize> {
		match *self {
			Frame::Element { subtree_length, .. } | Frame::Component { subtree_length, .. } | Frame::Region { subtree_length } => Some(subtree_length),
			Frame::Text { .. } | Frame::Attribute { .. } | Frame::Markup { .. } | Frame::ElementReferenceCapture { .. } => None,
		}
	}

	#[must_use]
	pub fn kind_name(&self) -> &'static str {
		match self {
			Frame::Element { .. } => "element",
			Frame::Text { .. } => "text",
			Frame::Attribute { .. } => "attribute",
			Frame::Component { .. } => "component",
			Frame::Region { .. } => "region",
			Frame::Markup { .. } => "markup",
			Frame::ElementReferenceCapture { .. } => "element reference capture",
		}
	}
}

/// A single `from → to` move, already resolved against the interpreter's cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PermutationEntry {
	pub from_sibling_index: usize,
	pub to_sibling_index: usize,
}

/// Read access to a received batch.
pub trait BatchReader {
	fn edit_count(&self) -> usize;
	fn edit_at(&self, index: usize) -> Option<Edit<'_>>;
	fn frame_at(&self, index: usize) -> Option<Frame<'_>>;

	fn disposed_event_handler_ids(&self) -> &[EventHandlerId] {
		&[]
	}

	fn disposed_component_ids(&self) -> &[ComponentId] {
		&[]
	}
}

/// An already-decoded batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderBatch<'a> {
	pub edits: Vec<Edit<'a>>,
	pub reference_frames: Vec<Frame<'a>>,
	pub disposed_event_handler_ids: Vec<EventHandlerId>,
	pub disposed_component_ids: Vec<ComponentId>,
}
impl<'a> RenderBatch<'a> {
	#[must_use]
	pub fn new(edits: Vec<Edit<'a>>, reference_frames: Vec<Frame<'a>>) -> Self {
		Self {
			edits,
			reference_frames,
			..Self::default()
		}
	}

	#[must_use]
	pub fn with_disposed_event_handlers(mut self, ids: impl IntoIterator<Item = EventHandlerId>) -> Self {
		self.disposed_event_handler_ids.extend(ids);
		self
	}

	#[must_use]
	pub fn with_disposed_components(mut self, ids: impl IntoIterator<Item = ComponentId>) -> Self {
		self.disposed_component_ids.extend(ids);
		self
	}
}
impl<'a> BatchReader for RenderBatch<'a> {
	fn edit_count(&self) -> usize {
		self.edits.len()
	}

	fn edit_at(&self, index: usize) -> Option<Edit<'_>> {
		self.edits.get(index).copied()
	}

	fn frame_at(&self, index: usize) -> Option<Frame<'_>> {
		self.reference_frames.get(index).copied()
	}

	fn disposed_event_handler_ids(&self) -> &[EventHandlerId] {
		&self.disposed_event_handler_ids
	}

	fn disposed_component_ids(&self) -> &[ComponentId] {
		&self.disposed_component_ids
	}
}
