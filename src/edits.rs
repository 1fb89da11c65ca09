use crate::{
	batch::{BatchReader, Edit, Frame, PermutationEntry},
	dispatch::{CaptureRegistry, EventDispatch},
	document::Document,
	error::{ProtocolViolation, RenderError, Result},
	logical::LogicalNode,
	materialize::frame_at,
	renderer::Renderer,
	ComponentId,
};
use tracing::{instrument, trace_span};

impl<D, E, C> Renderer<D, E, C>
where
	D: Document,
	E: EventDispatch<D::Node>,
	C: CaptureRegistry<D::Node>,
{
	/// Walks the edit list once, in order.
	///
	/// `child_index` is where inside `parent` the edits start. Only depth 0 may start at a non-zero offset.
	#[allow(clippy::too_many_lines)]
	#[instrument(skip(self, batch))]
	pub(crate) fn apply_edits<B: BatchReader + ?Sized>(&mut self, batch: &B, component_id: ComponentId, mut parent: LogicalNode, child_index: usize) -> Result<()> {
		let mut current_depth = 0_usize;
		let mut child_index_at_current_depth = child_index;
		let mut permutation_list: Option<Vec<PermutationEntry>> = None;

		for edit_index in 0..batch.edit_count() {
			let edit = batch.edit_at(edit_index).ok_or(ProtocolViolation::EditIndexOutOfRange { edit_index })?;
			match edit {
				Edit::PrependFrame { new_tree_index, sibling_index } => {
					let span = trace_span!("Prepending frame", new_tree_index, sibling_index);
					let _enter = span.enter();
					self.insert_frame(batch, component_id, parent, child_index_at_current_depth + sibling_index, new_tree_index)?;
				}

				Edit::RemoveFrame { sibling_index } => {
					let span = trace_span!("Removing frame", sibling_index);
					let _enter = span.enter();
					self.tree.remove_child(&mut self.document, parent, child_index_at_current_depth + sibling_index)?;
				}

				Edit::SetAttribute { new_tree_index, sibling_index } => {
					let span = trace_span!("Setting attribute", new_tree_index, sibling_index);
					let _enter = span.enter();
					let element = self.expect_child(parent, child_index_at_current_depth + sibling_index, "set an attribute", "element")?;
					match frame_at(batch, new_tree_index)? {
						Frame::Attribute { name, value, event_handler_id } => self.apply_attribute(component_id, element, name, value, event_handler_id)?,
						other => return Err(unexpected_frame(edit_index, new_tree_index, "attribute", &other)),
					}
				}

				Edit::RemoveAttribute { sibling_index, attribute_name } => {
					let span = trace_span!("Removing attribute", sibling_index, attribute_name);
					let _enter = span.enter();
					let element = self.expect_child(parent, child_index_at_current_depth + sibling_index, "remove an attribute", "element")?;
					self.remove_attribute(element, attribute_name)?;
				}

				Edit::UpdateText { new_tree_index, sibling_index } => {
					let span = trace_span!("Updating text", new_tree_index, sibling_index);
					let _enter = span.enter();
					let text_node = self.expect_child(parent, child_index_at_current_depth + sibling_index, "set text content", "text")?;
					let content = match frame_at(batch, new_tree_index)? {
						Frame::Text { content } => content,
						other => return Err(unexpected_frame(edit_index, new_tree_index, "text", &other)),
					};
					let physical = self.tree.physical(text_node)?;
					self.document.set_character_data(physical, content);
				}

				Edit::UpdateMarkup { new_tree_index, sibling_index } => {
					let span = trace_span!("Updating markup", new_tree_index, sibling_index);
					let _enter = span.enter();
					let content = match frame_at(batch, new_tree_index)? {
						Frame::Markup { content } => content,
						other => return Err(unexpected_frame(edit_index, new_tree_index, "markup", &other)),
					};
					self.tree.remove_child(&mut self.document, parent, child_index_at_current_depth + sibling_index)?;
					self.insert_markup(parent, child_index_at_current_depth + sibling_index, content)?;
				}

				Edit::StepIn { sibling_index } => {
					parent = self.tree.child_at(parent, child_index_at_current_depth + sibling_index)?;
					current_depth += 1;
					child_index_at_current_depth = 0;
				}

				Edit::StepOut => {
					if current_depth == 0 {
						return Err(ProtocolViolation::UnbalancedStepOut { edit_index }.into());
					}
					parent = self.tree.parent_of(parent).ok_or(RenderError::StaleNode)?;
					current_depth -= 1;
					// The starting offset only ever applies at depth 0.
					child_index_at_current_depth = if current_depth == 0 { child_index } else { 0 };
				}

				Edit::PermutationListEntry { from_sibling_index, to_sibling_index } => {
					permutation_list.get_or_insert_with(Vec::new).push(PermutationEntry {
						from_sibling_index: child_index_at_current_depth + from_sibling_index,
						to_sibling_index: child_index_at_current_depth + to_sibling_index,
					});
				}

				Edit::PermutationListEnd => {
					let span = trace_span!("Permuting children", edit_index);
					let _enter = span.enter();
					let permutation_list = permutation_list
						.take()
						.filter(|list| !list.is_empty())
						.ok_or(ProtocolViolation::EmptyPermutationList { edit_index })?;
					self.tree.permute_children(&mut self.document, parent, &permutation_list)?;
				}
			}
		}

		if current_depth != 0 {
			return Err(ProtocolViolation::UnbalancedStepIn { depth: current_depth }.into());
		}
		if let Some(permutation_list) = permutation_list {
			return Err(ProtocolViolation::UnterminatedPermutationList { entries: permutation_list.len() }.into());
		}
		Ok(())
	}

	fn expect_child(&self, parent: LogicalNode, index: usize, operation: &'static str, expected: &'static str) -> Result<LogicalNode> {
		let child = self.tree.child_at(parent, index)?;
		let kind = self.tree.kind(child)?;
		if kind.name() == expected {
			Ok(child)
		} else {
			Err(RenderError::UnexpectedNodeKind {
				operation,
				expected,
				found: kind.name(),
			})
		}
	}
}

fn unexpected_frame(edit_index: usize, frame_index: usize, expected: &'static str, found: &Frame<'_>) -> RenderError {
	ProtocolViolation::UnexpectedFrameKind {
		edit_index,
		frame_index,
		expected,
		found: found.kind_name(),
	}
	.into()
}
