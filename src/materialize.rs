use crate::{
	batch::{BatchReader, Frame},
	dispatch::{CaptureRegistry, EventDispatch},
	document::Document,
	error::{ProtocolViolation, Result},
	logical::{LogicalKind, LogicalNode},
	renderer::Renderer,
	ComponentId,
};
use tracing::{instrument, trace, trace_span};

pub(crate) fn frame_at<B: BatchReader + ?Sized>(batch: &B, frame_index: usize) -> Result<Frame<'_>> {
	batch.frame_at(frame_index).ok_or_else(|| ProtocolViolation::FrameIndexOutOfRange { frame_index }.into())
}

/// How many frames after `frame` were already consumed as its descendants.
///
/// Only element, component and region frames have a subtree length. Other frame kinds may reuse
/// that slot of the wire format for something else, so it's never read for them.
fn descendant_frame_count(frame: &Frame<'_>, frame_index: usize) -> Result<usize> {
	match frame.subtree_length() {
		Some(subtree_length) => subtree_length.checked_sub(1).ok_or_else(|| ProtocolViolation::EmptySubtree { frame_index }.into()),
		None => Ok(0),
	}
}

/// The frame index just past `frame`'s descendants.
fn subtree_end(frame: &Frame<'_>, frame_index: usize) -> Result<usize> {
	let descendants = descendant_frame_count(frame, frame_index)?;
	frame_index
		.checked_add(1)
		.and_then(|first_descendant| first_descendant.checked_add(descendants))
		.ok_or_else(|| ProtocolViolation::SubtreeOutOfRange { frame_index }.into())
}

impl<D, E, C> Renderer<D, E, C>
where
	D: Document,
	E: EventDispatch<D::Node>,
	C: CaptureRegistry<D::Node>,
{
	/// Materializes the frame at `frame_index` as logical child `child_index` of `parent`.
	///
	/// Returns the number of logical sibling slots consumed.
	#[instrument(skip(self, batch))]
	pub(crate) fn insert_frame<B: BatchReader + ?Sized>(&mut self, batch: &B, component_id: ComponentId, parent: LogicalNode, child_index: usize, frame_index: usize) -> Result<usize> {
		match frame_at(batch, frame_index)? {
			Frame::Element { tag_name, subtree_length } => {
				let span = trace_span!("Creating element", tag_name, subtree_length);
				let _enter = span.enter();
				self.insert_element(batch, component_id, parent, child_index, frame_index, tag_name, subtree_length)?;
				Ok(1)
			}

			Frame::Text { content } => {
				let span = if cfg!(feature = "dangerous-logging") {
					trace_span!("Creating text node", content)
				} else {
					trace_span!("Creating text node", len = content.len())
				};
				let _enter = span.enter();
				let text = self.tree.create_text(&mut self.document, content);
				self.tree.insert_child(&mut self.document, parent, child_index, text)?;
				Ok(1)
			}

			Frame::Attribute { .. } => Err(ProtocolViolation::AttributeFrameOutOfPlace { frame_index }.into()),

			Frame::Component { component_id: child_component_id, .. } => {
				let span = trace_span!("Creating component placeholder", child_component_id);
				let _enter = span.enter();
				let container = self.tree.create_container(&mut self.document);
				self.tree.insert_child(&mut self.document, parent, child_index, container)?;
				// The child's own content arrives later, as a separate update keyed by its id.
				self.attach_component_to_element(child_component_id, container);
				Ok(1)
			}

			Frame::Region { subtree_length } => {
				let span = trace_span!("Creating region", subtree_length);
				let _enter = span.enter();
				let end = subtree_end(&Frame::Region { subtree_length }, frame_index)?;
				self.insert_frame_range(batch, component_id, parent, child_index, frame_index + 1, end)
			}

			Frame::ElementReferenceCapture { capture_id } => {
				let span = trace_span!("Capturing element reference", capture_id);
				let _enter = span.enter();
				if !matches!(self.tree.kind(parent)?, LogicalKind::Element { .. }) {
					return Err(ProtocolViolation::CaptureOutsideElement { frame_index }.into());
				}
				let physical = self.tree.physical(parent)?;
				self.captures.attach_capture_id(physical, capture_id);
				// A capture is a child in the diff, but has no node in the DOM.
				Ok(0)
			}

			Frame::Markup { content } => {
				self.insert_markup(parent, child_index, content)?;
				Ok(1)
			}
		}
	}

	/// Materializes `start..end_exclusive` as consecutive children, skipping over descendants
	/// that were already handled recursively.
	///
	/// Returns the total number of logical sibling slots consumed.
	#[instrument(skip(self, batch))]
	pub(crate) fn insert_frame_range<B: BatchReader + ?Sized>(
		&mut self,
		batch: &B,
		component_id: ComponentId,
		parent: LogicalNode,
		mut child_index: usize,
		start: usize,
		end_exclusive: usize,
	) -> Result<usize> {
		let original_child_index = child_index;
		let mut index = start;
		while index < end_exclusive {
			child_index += self.insert_frame(batch, component_id, parent, child_index, index)?;
			index = subtree_end(&frame_at(batch, index)?, index)?;
		}
		Ok(child_index - original_child_index)
	}

	#[allow(clippy::too_many_arguments)]
	fn insert_element<B: BatchReader + ?Sized>(
		&mut self,
		batch: &B,
		component_id: ComponentId,
		parent: LogicalNode,
		child_index: usize,
		frame_index: usize,
		tag_name: &str,
		subtree_length: usize,
	) -> Result<()> {
		let descendants_end = subtree_end(&Frame::Element { tag_name, subtree_length }, frame_index)?;
		let svg = tag_name == "svg" || self.tree.is_svg_context(parent);
		let element = self.tree.create_element(&mut self.document, tag_name, svg)?;

		let mut inserted = false;
		for descendant_index in frame_index + 1..descendants_end {
			match frame_at(batch, descendant_index)? {
				Frame::Attribute { name, value, event_handler_id } => self.apply_attribute(component_id, element, name, value, event_handler_id)?,
				_ => {
					// Everything from here on is content. The element is placed first so
					// that its descendants are inserted into an already-attached parent.
					self.tree.insert_child(&mut self.document, parent, child_index, element)?;
					inserted = true;
					self.insert_frame_range(batch, component_id, element, 0, descendant_index, descendants_end)?;
					break;
				}
			}
		}

		if !inserted {
			self.tree.insert_child(&mut self.document, parent, child_index, element)?;
		}

		if self.tree.kind(element)?.is_element("option") {
			self.try_set_select_value_from_option(element)?;
		} else if self.tree.deferred_value(element).is_some() {
			trace!("Applying deferred value after construction.");
			self.apply_deferred_value(element)?;
		}
		Ok(())
	}

	/// Parses `content` into a fresh markup container at `child_index`.
	#[instrument(skip(self, content))]
	pub(crate) fn insert_markup(&mut self, parent: LogicalNode, child_index: usize, content: &str) -> Result<()> {
		let container = self.tree.create_container(&mut self.document);
		self.tree.insert_child(&mut self.document, parent, child_index, container)?;

		let svg = self.tree.is_svg_context(parent);
		let parsed = self.document.parse_fragment(content, svg)?;
		trace!("Parsed {} top-level markup node(s).", parsed.len());
		for (logical_sibling_index, node) in parsed.into_iter().enumerate() {
			let child = self.tree.adopt_foreign(&self.document, node);
			self.tree.insert_child(&mut self.document, container, logical_sibling_index, child)?;
		}
		Ok(())
	}
}
