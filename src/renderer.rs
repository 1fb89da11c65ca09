use crate::{
	batch::BatchReader,
	dispatch::{CaptureRegistry, EventDispatch},
	document::Document,
	error::{RenderError, Result},
	logical::{LogicalNode, LogicalTree},
	ComponentId, EventHandlerId,
};
use hashbrown::{HashMap, HashSet};
use tracing::{instrument, trace, trace_span, warn};

/// Where a root component renders into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootTarget<N> {
	/// The element's child nodes.
	Element(N),
	/// The nodes between two marker comments that share a parent.
	Region { start: N, end: N },
}

/// Applies render batches to a [`Document`], one component update at a time.
///
/// # Correct Use
///
/// Batches must be applied in the order they were produced.
/// After any method returned an error, the logical tree may no longer match what the
/// producer of the batches assumes, and the host should re-render from scratch.
#[derive(Debug)]
pub struct Renderer<D: Document, E, C> {
	pub(crate) document: D,
	pub(crate) events: E,
	pub(crate) captures: C,
	pub(crate) tree: LogicalTree<D::Node>,
	component_locations: HashMap<ComponentId, LogicalNode>,
	root_component_ids: HashSet<ComponentId>,
	elements_to_clear: HashMap<ComponentId, LogicalNode>,
}

impl<D, E, C> Renderer<D, E, C>
where
	D: Document,
	E: EventDispatch<D::Node>,
	C: CaptureRegistry<D::Node>,
{
	#[must_use]
	pub fn new(document: D, events: E, captures: C) -> Self {
		Self {
			document,
			events,
			captures,
			tree: LogicalTree::new(),
			component_locations: HashMap::new(),
			root_component_ids: HashSet::new(),
			elements_to_clear: HashMap::new(),
		}
	}

	pub fn document(&self) -> &D {
		&self.document
	}

	pub fn document_mut(&mut self) -> &mut D {
		&mut self.document
	}

	pub fn events(&self) -> &E {
		&self.events
	}

	pub fn events_mut(&mut self) -> &mut E {
		&mut self.events
	}

	pub fn captures(&self) -> &C {
		&self.captures
	}

	pub fn tree(&self) -> &LogicalTree<D::Node> {
		&self.tree
	}

	/// The logical node a component currently renders into, if it is registered and still alive.
	#[must_use]
	pub fn component_target(&self, component_id: ComponentId) -> Option<LogicalNode> {
		self.component_locations.get(&component_id).copied().filter(|&node| self.tree.contains(node))
	}

	#[must_use]
	pub fn into_parts(self) -> (D, E, C) {
		(self.document, self.events, self.captures)
	}

	/// Registers a root component.
	///
	/// Unless `append_content` is set, whatever `target` contains now is removed on the component's first update.
	#[instrument(skip(self, target))]
	pub fn attach_root(&mut self, component_id: ComponentId, target: RootTarget<D::Node>, append_content: bool) -> Result<LogicalNode> {
		let node = match target {
			RootTarget::Element(element) => self.tree.adopt_element(&self.document, element)?,
			RootTarget::Region { start, end } => self.tree.adopt_region(&self.document, start, end)?,
		};

		if let Some(&previous) = self.component_locations.get(&component_id) {
			warn!("Component {} was already attached to {:?}. Replacing the registration.", component_id, previous);
			if self.root_component_ids.contains(&component_id) {
				// Adopted roots are only referenced by their registration.
				self.tree.release(previous);
			}
		}
		self.attach_component_to_element(component_id, node);
		self.root_component_ids.insert(component_id);

		if append_content {
			self.elements_to_clear.remove(&component_id);
		} else {
			self.elements_to_clear.insert(component_id, node);
		}
		Ok(node)
	}

	pub(crate) fn attach_component_to_element(&mut self, component_id: ComponentId, node: LogicalNode) {
		trace!("Attaching component {} to {:?}.", component_id, node);
		self.component_locations.insert(component_id, node);
	}

	/// Applies one component's edits.
	///
	/// # Errors
	///
	/// [`RenderError::NoTarget`] if the component isn't attached anywhere, and any error from the edits themselves.
	/// Edits applied before the error stay applied.
	#[instrument(skip(self, batch))]
	pub fn apply_update<B: BatchReader + ?Sized>(&mut self, batch: &B, component_id: ComponentId) -> Result<()> {
		let target = self.component_target(component_id).ok_or(RenderError::NoTarget(component_id))?;

		// On the first render for each root component, clear any existing content (e.g. prerendered).
		if let Some(root_to_clear) = self.elements_to_clear.remove(&component_id) {
			let span = trace_span!("Clearing pre-existing root content", component_id);
			let _enter = span.enter();
			if self.tree.sibling_range_end(root_to_clear).is_some() {
				self.tree.clear_between(&mut self.document, root_to_clear)?;
			} else {
				self.tree.clear_element(&mut self.document, root_to_clear)?;
			}
		}

		let active_element_before = self.document.active_element();

		self.apply_edits(batch, component_id, target, 0)?;

		// Moving an element out and back in drops focus.
		if let Some(active_element_before) = active_element_before {
			if self.document.active_element().as_ref() != Some(&active_element_before) && self.document.is_connected(&active_element_before) {
				trace!("Restoring focus.");
				self.document.focus(&active_element_before);
			}
		}
		Ok(())
	}

	/// Applies a batch to `component_id`, then processes the batch's disposals.
	#[instrument(skip(self, batch))]
	pub fn render<B: BatchReader + ?Sized>(&mut self, component_id: ComponentId, batch: &B) -> Result<()> {
		self.apply_update(batch, component_id)?;
		for &disposed in batch.disposed_component_ids() {
			self.dispose_component(disposed)?;
		}
		for &disposed in batch.disposed_event_handler_ids() {
			self.dispose_event_handler(disposed);
		}
		Ok(())
	}

	/// Forgets a component. Root components also have their content removed.
	#[instrument(skip(self))]
	pub fn dispose_component(&mut self, component_id: ComponentId) -> Result<()> {
		self.elements_to_clear.remove(&component_id);
		let location = self.component_locations.remove(&component_id);
		if self.root_component_ids.remove(&component_id) {
			// There's no parent edit that would remove the root's own node, so restore it to empty instead.
			if let Some(root) = location.filter(|&node| self.tree.contains(node)) {
				self.tree.empty(&mut self.document, root)?;
				self.tree.release(root);
			}
		}
		Ok(())
	}

	#[instrument(skip(self))]
	pub fn dispose_event_handler(&mut self, event_handler_id: EventHandlerId) {
		self.events.remove_listener(event_handler_id);
	}
}
