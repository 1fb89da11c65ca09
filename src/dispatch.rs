//! Collaborators that live outside the tree reconciliation itself.

use crate::{ComponentId, EventHandlerId};

/// Routes physical DOM events to handler ids.
pub trait EventDispatch<N> {
	/// Binds `handler_id` to `event_name` on `element`, replacing any handler bound there before.
	fn set_listener(&mut self, element: &N, event_name: &str, handler_id: EventHandlerId, component_id: ComponentId);
	fn remove_listener(&mut self, handler_id: EventHandlerId);
	fn set_stop_propagation(&mut self, element: &N, event_name: &str, value: bool);
	fn set_prevent_default(&mut self, element: &N, event_name: &str, value: bool);
}

/// Element reference capture bookkeeping.
pub trait CaptureRegistry<N> {
	fn attach_capture_id(&mut self, element: &N, capture_id: &str);
}

/// Ignores all event wiring. Useful for static rendering.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEvents;
impl<N> EventDispatch<N> for NoEvents {
	fn set_listener(&mut self, _: &N, _: &str, _: EventHandlerId, _: ComponentId) {}
	fn remove_listener(&mut self, _: EventHandlerId) {}
	fn set_stop_propagation(&mut self, _: &N, _: &str, _: bool) {}
	fn set_prevent_default(&mut self, _: &N, _: &str, _: bool) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoCaptures;
impl<N> CaptureRegistry<N> for NoCaptures {
	fn attach_capture_id(&mut self, _: &N, _: &str) {}
}
