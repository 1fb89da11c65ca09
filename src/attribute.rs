use crate::{
	dispatch::{CaptureRegistry, EventDispatch},
	document::Document,
	error::{ProtocolViolation, Result},
	logical::LogicalNode,
	renderer::Renderer,
	ComponentId, EventHandlerId,
};
use tracing::{instrument, trace};

/// Attribute names with this prefix configure the renderer instead of the DOM.
pub const INTERNAL_ATTRIBUTE_NAME_PREFIX: &str = "__internal_";
pub const EVENT_STOP_PROPAGATION_ATTRIBUTE_NAME_PREFIX: &str = "stopPropagation_";
pub const EVENT_PREVENT_DEFAULT_ATTRIBUTE_NAME_PREFIX: &str = "preventDefault_";

/// `"onclick"` → `"click"`.
///
/// # Errors
///
/// Iff `attribute_name` doesn't start with `on`.
pub fn strip_on_prefix(attribute_name: &str) -> Result<&str, ProtocolViolation> {
	attribute_name.strip_prefix("on").ok_or_else(|| ProtocolViolation::MissingEventPrefix(attribute_name.to_owned()))
}

impl<D, E, C> Renderer<D, E, C>
where
	D: Document,
	E: EventDispatch<D::Node>,
	C: CaptureRegistry<D::Node>,
{
	#[instrument(skip(self, value))]
	pub(crate) fn apply_attribute(&mut self, component_id: ComponentId, element: LogicalNode, name: &str, value: Option<&str>, event_handler_id: Option<EventHandlerId>) -> Result<()> {
		let physical = self.tree.physical(element)?.clone();

		if let Some(event_handler_id) = event_handler_id {
			let event_name = strip_on_prefix(name)?;
			trace!("Binding {:?} to handler {}.", event_name, event_handler_id);
			self.events.set_listener(&physical, event_name, event_handler_id, component_id);
			return Ok(());
		}

		if !self.try_apply_special_property(element, name, value)? {
			self.document.set_attribute(&physical, name, value.unwrap_or(""))?;
		}
		Ok(())
	}

	/// Note that event handlers don't need to be released here.
	/// Their ids arrive separately, as the batch's disposed event handlers.
	#[instrument(skip(self))]
	pub(crate) fn remove_attribute(&mut self, element: LogicalNode, name: &str) -> Result<()> {
		if !self.try_apply_special_property(element, name, None)? {
			let physical = self.tree.physical(element)?;
			self.document.remove_attribute(physical, name)?;
		}
		Ok(())
	}

	fn try_apply_special_property(&mut self, element: LogicalNode, name: &str, value: Option<&str>) -> Result<bool> {
		match name {
			"value" => self.try_apply_value_property(element, value),
			"checked" => self.try_apply_checked_property(element, value),
			_ => match name.strip_prefix(INTERNAL_ATTRIBUTE_NAME_PREFIX) {
				Some(internal_name) => {
					self.apply_internal_attribute(element, internal_name, value.is_some())?;
					Ok(true)
				}
				None => Ok(false),
			},
		}
	}

	fn apply_internal_attribute(&mut self, element: LogicalNode, internal_name: &str, present: bool) -> Result<()> {
		let physical = self.tree.physical(element)?;
		if let Some(event) = internal_name.strip_prefix(EVENT_STOP_PROPAGATION_ATTRIBUTE_NAME_PREFIX) {
			self.events.set_stop_propagation(physical, strip_on_prefix(event)?, present);
		} else if let Some(event) = internal_name.strip_prefix(EVENT_PREVENT_DEFAULT_ATTRIBUTE_NAME_PREFIX) {
			self.events.set_prevent_default(physical, strip_on_prefix(event)?, present);
		} else {
			// The prefix is reserved, so anything else is a mistake.
			return Err(ProtocolViolation::UnsupportedInternalAttribute(internal_name.to_owned()).into());
		}
		Ok(())
	}
}
