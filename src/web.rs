//! [`web_sys`] bindings for [`Document`], [`EventDispatch`] and [`CaptureRegistry`].

use crate::{
	dispatch::{CaptureRegistry, EventDispatch},
	document::{Document, SVG_NAMESPACE},
	error::DomError,
	ComponentId, EventHandlerId,
};
use hashbrown::HashMap;
use js_sys::{Function, Reflect};
use std::rc::Rc;
use tracing::{error, trace, trace_span, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{Element, HtmlElement, HtmlInputElement, HtmlOptionElement, HtmlSelectElement, HtmlTemplateElement, HtmlTextAreaElement, Node};

impl From<JsValue> for DomError {
	fn from(value: JsValue) -> Self {
		Self::new(format!("{:?}", value))
	}
}

fn as_element(node: &Node) -> Result<&Element, DomError> {
	node.dyn_ref::<Element>().ok_or_else(|| DomError::new(format!("Expected an element but found {:?}", node)))
}

/// Moves all children out of `parent`, in order.
fn drain_child_nodes(parent: &Node) -> Result<Vec<Node>, DomError> {
	let mut nodes = Vec::new();
	while let Some(child) = parent.first_child() {
		parent.remove_child(&child)?;
		nodes.push(child);
	}
	Ok(nodes)
}

/// A browser document.
///
/// Markup is parsed through one reusable `<template>` (and one SVG `<g>` for SVG contexts),
/// which are always drained completely before [`Document::parse_fragment`] returns.
#[derive(Debug, Clone)]
pub struct WebDocument {
	document: web_sys::Document,
	template: HtmlTemplateElement,
	svg_scratch: Element,
}
impl WebDocument {
	pub fn new(document: web_sys::Document) -> Result<Self, DomError> {
		let template = document
			.create_element("template")?
			.dyn_into::<HtmlTemplateElement>()
			.map_err(|element| DomError::new(format!("<template> did not create an `HtmlTemplateElement`: {:?}", element)))?;
		let svg_scratch = document.create_element_ns(Some(SVG_NAMESPACE), "g")?;
		Ok(Self { document, template, svg_scratch })
	}

	#[must_use]
	pub fn document(&self) -> &web_sys::Document {
		&self.document
	}
}

impl Document for WebDocument {
	type Node = Node;

	fn create_element(&mut self, tag_name: &str, svg: bool) -> Result<Node, DomError> {
		let element = if svg {
			self.document.create_element_ns(Some(SVG_NAMESPACE), tag_name)
		} else {
			self.document.create_element(tag_name)
		};
		match element {
			Ok(element) => Ok(element.into()),
			Err(error) => {
				error!("Failed to create element <{}>: {:?}", tag_name, error);
				Err(error.into())
			}
		}
	}

	fn create_text_node(&mut self, data: &str) -> Node {
		self.document.create_text_node(data).into()
	}

	fn create_comment(&mut self, data: &str) -> Node {
		self.document.create_comment(data).into()
	}

	fn set_character_data(&mut self, node: &Node, data: &str) {
		node.set_text_content(Some(data));
	}

	fn insert_before(&mut self, parent: &Node, child: &Node, reference: Option<&Node>) -> Result<(), DomError> {
		if let Err(error) = parent.insert_before(child, reference) {
			error!("Failed to insert node: {:?}", error);
			return Err(error.into());
		}
		Ok(())
	}

	fn remove(&mut self, node: &Node) -> Result<(), DomError> {
		match node.parent_node() {
			Some(parent) => match parent.remove_child(node) {
				Ok(_) => Ok(()),
				Err(error) => {
					error!("Failed to remove the node: {:?}", error);
					Err(error.into())
				}
			},
			None => {
				trace!("Node to remove is already detached.");
				Ok(())
			}
		}
	}

	fn parent_node(&self, node: &Node) -> Option<Node> {
		node.parent_node()
	}

	fn next_sibling(&self, node: &Node) -> Option<Node> {
		node.next_sibling()
	}

	fn child_nodes(&self, node: &Node) -> Vec<Node> {
		let child_nodes = node.child_nodes();
		(0..child_nodes.length()).filter_map(|i| child_nodes.get(i)).collect()
	}

	fn tag_name(&self, node: &Node) -> Option<String> {
		node.dyn_ref::<Element>().map(Element::local_name)
	}

	fn is_text(&self, node: &Node) -> bool {
		node.node_type() == Node::TEXT_NODE
	}

	fn is_svg(&self, node: &Node) -> bool {
		node.dyn_ref::<Element>()
			.and_then(Element::namespace_uri)
			.map_or(false, |namespace| namespace == SVG_NAMESPACE)
	}

	fn get_attribute(&self, element: &Node, name: &str) -> Option<String> {
		element.dyn_ref::<Element>()?.get_attribute(name)
	}

	fn set_attribute(&mut self, element: &Node, name: &str, value: &str) -> Result<(), DomError> {
		as_element(element)?.set_attribute(name, value).map_err(|error| {
			error!("Could not set attribute {:?}: {:?}", name, error);
			error.into()
		})
	}

	fn remove_attribute(&mut self, element: &Node, name: &str) -> Result<(), DomError> {
		as_element(element)?.remove_attribute(name).map_err(|error| {
			warn!("Could not remove attribute {:?}: {:?}", name, error);
			error.into()
		})
	}

	fn set_value(&mut self, element: &Node, value: &str) {
		if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
			input.set_value(value);
		} else if let Some(select) = element.dyn_ref::<HtmlSelectElement>() {
			select.set_value(value);
		} else if let Some(text_area) = element.dyn_ref::<HtmlTextAreaElement>() {
			text_area.set_value(value);
		} else {
			warn!("Ignoring `value` property write on {:?}.", element);
		}
	}

	fn set_checked(&mut self, input: &Node, checked: bool) {
		match input.dyn_ref::<HtmlInputElement>() {
			Some(input) => input.set_checked(checked),
			None => warn!("Ignoring `checked` property write on {:?}.", input),
		}
	}

	fn is_multiple_select(&self, select: &Node) -> bool {
		select.dyn_ref::<HtmlSelectElement>().map_or(false, HtmlSelectElement::multiple)
	}

	fn select_options(&self, select: &Node) -> Vec<Node> {
		match select.dyn_ref::<HtmlSelectElement>() {
			Some(select) => {
				let options = select.options();
				(0..options.length()).filter_map(|i| options.item(i)).map(Node::from).collect()
			}
			None => Vec::new(),
		}
	}

	fn option_value(&self, option: &Node) -> String {
		option.dyn_ref::<HtmlOptionElement>().map(HtmlOptionElement::value).unwrap_or_default()
	}

	fn set_selected(&mut self, option: &Node, selected: bool) {
		if let Some(option) = option.dyn_ref::<HtmlOptionElement>() {
			option.set_selected(selected);
		}
	}

	fn parse_fragment(&mut self, markup: &str, svg: bool) -> Result<Vec<Node>, DomError> {
		// An empty string would leave the previous content in place on some engines.
		let markup = if markup.is_empty() { " " } else { markup };
		if svg {
			self.svg_scratch.set_inner_html(markup);
			drain_child_nodes(&self.svg_scratch)
		} else {
			self.template.set_inner_html(markup);
			drain_child_nodes(&self.template.content())
		}
	}

	fn active_element(&self) -> Option<Node> {
		self.document.active_element().map(Node::from)
	}

	fn is_connected(&self, node: &Node) -> bool {
		node.is_connected()
	}

	fn focus(&mut self, element: &Node) {
		if let Some(element) = element.dyn_ref::<HtmlElement>() {
			if let Err(error) = element.focus() {
				warn!("Failed to restore focus: {:?}", error);
			}
		}
	}
}

const STOP_PROPAGATION_FLAG: &str = "__renderBatchDomStopPropagation_";
const PREVENT_DEFAULT_FLAG: &str = "__renderBatchDomPreventDefault_";

fn read_flag(target: &JsValue, flag: &str, event_name: &str) -> bool {
	Reflect::get(target, &JsValue::from_str(&format!("{}{}", flag, event_name))).map_or(false, |value| value.is_truthy())
}

struct Listener {
	target: Node,
	event_name: String,
	closure: Closure<dyn Fn(web_sys::Event)>,
}

/// Binds one DOM listener per event handler id and forwards events to a host callback.
///
/// Stop-propagation and prevent-default flags are stored on the element itself,
/// and enforced by a shared listener that is added at most once per element and event name.
pub struct WebEventDispatch {
	handler: Rc<dyn Fn(EventHandlerId, ComponentId, web_sys::Event)>,
	listeners: HashMap<EventHandlerId, Listener>,
	flag_enforcer: Closure<dyn Fn(web_sys::Event)>,
}
impl WebEventDispatch {
	pub fn new(handler: impl 'static + Fn(EventHandlerId, ComponentId, web_sys::Event)) -> Self {
		Self {
			handler: Rc::new(handler),
			listeners: HashMap::new(),
			flag_enforcer: Closure::wrap(Box::new(|event: web_sys::Event| {
				let current_target = match event.current_target() {
					Some(current_target) => current_target,
					None => return,
				};
				let event_name = event.type_();
				if read_flag(&current_target, PREVENT_DEFAULT_FLAG, &event_name) {
					event.prevent_default();
				}
				if read_flag(&current_target, STOP_PROPAGATION_FLAG, &event_name) {
					event.stop_propagation();
				}
			}) as Box<dyn Fn(web_sys::Event)>),
		}
	}

	#[must_use]
	pub fn listener_count(&self) -> usize {
		self.listeners.len()
	}

	fn set_flag(&self, element: &Node, flag: &str, event_name: &str, value: bool) {
		if let Err(error) = Reflect::set(element, &JsValue::from_str(&format!("{}{}", flag, event_name)), &JsValue::from_bool(value)) {
			error!("Failed to store event flag {}{}: {:?}", flag, event_name, error);
			return;
		}
		// Adding the same function twice for the same event is a no-op.
		if let Err(error) = element.add_event_listener_with_callback(event_name, self.flag_enforcer.as_ref().unchecked_ref::<Function>()) {
			error!("Failed to add flag listener for {:?}: {:?}", event_name, error);
		}
	}
}
impl core::fmt::Debug for WebEventDispatch {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("WebEventDispatch").field("listeners", &self.listeners.len()).finish_non_exhaustive()
	}
}
impl EventDispatch<Node> for WebEventDispatch {
	fn set_listener(&mut self, element: &Node, event_name: &str, handler_id: EventHandlerId, component_id: ComponentId) {
		self.remove_listener(handler_id);
		// Only one handler per element and event name.
		let replaced = self
			.listeners
			.iter()
			.filter(|(_, listener)| listener.target == *element && listener.event_name == event_name)
			.map(|(&replaced, _)| replaced)
			.collect::<Vec<_>>();
		for replaced in replaced {
			trace!("Replacing listener for handler {} with handler {}.", replaced, handler_id);
			self.remove_listener(replaced);
		}

		let handler = Rc::clone(&self.handler);
		let closure = Closure::wrap(Box::new(move |event: web_sys::Event| {
			let span = trace_span!("Dispatching event", handler_id, component_id);
			let _enter = span.enter();
			handler(handler_id, component_id, event);
		}) as Box<dyn Fn(web_sys::Event)>);

		if let Err(error) = element.add_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref::<Function>()) {
			error!("Failed to add event listener {:?}: {:?}", event_name, error);
			return;
		}
		self.listeners.insert(
			handler_id,
			Listener {
				target: element.clone(),
				event_name: event_name.to_owned(),
				closure,
			},
		);
	}

	fn remove_listener(&mut self, handler_id: EventHandlerId) {
		if let Some(Listener { target, event_name, closure }) = self.listeners.remove(&handler_id) {
			if let Err(error) = target.remove_event_listener_with_callback(&event_name, closure.as_ref().unchecked_ref::<Function>()) {
				error!("Failed to remove event listener {:?}: {:?}", event_name, error);
			}
			trace!("Freed listener for handler {}.", handler_id);
		}
	}

	fn set_stop_propagation(&mut self, element: &Node, event_name: &str, value: bool) {
		self.set_flag(element, STOP_PROPAGATION_FLAG, event_name, value);
	}

	fn set_prevent_default(&mut self, element: &Node, event_name: &str, value: bool) {
		self.set_flag(element, PREVENT_DEFAULT_FLAG, event_name, value);
	}
}

/// Marks captured elements with an empty `{prefix}{capture id}` attribute, so that they can be found by selector.
#[derive(Debug, Clone)]
pub struct AttributeCaptures {
	attribute_prefix: String,
}
impl AttributeCaptures {
	pub fn new(attribute_prefix: impl Into<String>) -> Self {
		Self {
			attribute_prefix: attribute_prefix.into(),
		}
	}
}
impl Default for AttributeCaptures {
	fn default() -> Self {
		Self::new("_ref_")
	}
}
impl CaptureRegistry<Node> for AttributeCaptures {
	fn attach_capture_id(&mut self, element: &Node, capture_id: &str) {
		let name = format!("{}{}", self.attribute_prefix, capture_id);
		match element.dyn_ref::<Element>() {
			Some(element) => {
				if let Err(error) = element.set_attribute(&name, "") {
					error!("Failed to mark captured element with {:?}: {:?}", name, error);
				}
			}
			None => error!("Cannot capture a reference to non-element {:?}.", element),
		}
	}
}
