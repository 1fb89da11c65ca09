#![allow(dead_code)]

use render_batch_dom::{
	logical::{LogicalKind, LogicalNode},
	CaptureRegistry, ComponentId, Document, DomError, EventDispatch, EventHandlerId, Renderer,
};
use scraper::Html;
use std::collections::HashMap;
use std::sync::Once;

pub fn init_logging() {
	static INIT: Once = Once::new();
	INIT.call_once(|| {
		let _ = tracing_subscriber::fmt()
			.with_test_writer()
			.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
			.try_init();
	});
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
enum Data {
	Document,
	Element {
		tag: String,
		svg: bool,
		attributes: Vec<(String, String)>,
		value: String,
		checked: bool,
		selected: bool,
	},
	Text(String),
	Comment(String),
}

#[derive(Debug)]
struct MemoryNode {
	data: Data,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
}

/// A small, strict in-memory DOM. Markup is parsed with `scraper`.
#[derive(Debug)]
pub struct MemoryDocument {
	nodes: Vec<MemoryNode>,
	root: NodeId,
	body: NodeId,
	active: Option<NodeId>,
	pub focus_calls: usize,
	pub parse_calls: usize,
}

impl Default for MemoryDocument {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryDocument {
	pub fn new() -> Self {
		let mut document = Self {
			nodes: Vec::new(),
			root: NodeId(0),
			body: NodeId(0),
			active: None,
			focus_calls: 0,
			parse_calls: 0,
		};
		document.root = document.push(Data::Document);
		let body = document.element("body");
		document.append(document.root, body);
		document.body = body;
		document
	}

	fn push(&mut self, data: Data) -> NodeId {
		self.nodes.push(MemoryNode { data, parent: None, children: Vec::new() });
		NodeId(self.nodes.len() - 1)
	}

	fn node(&self, id: NodeId) -> &MemoryNode {
		&self.nodes[id.0]
	}

	fn node_mut(&mut self, id: NodeId) -> &mut MemoryNode {
		&mut self.nodes[id.0]
	}

	pub fn body(&self) -> NodeId {
		self.body
	}

	pub fn element(&mut self, tag: &str) -> NodeId {
		self.push(Data::Element {
			tag: tag.to_owned(),
			svg: false,
			attributes: Vec::new(),
			value: String::new(),
			checked: false,
			selected: false,
		})
	}

	pub fn text(&mut self, data: &str) -> NodeId {
		self.push(Data::Text(data.to_owned()))
	}

	pub fn comment(&mut self, data: &str) -> NodeId {
		self.push(Data::Comment(data.to_owned()))
	}

	/// Appends a detached node, for building fixtures.
	pub fn append(&mut self, parent: NodeId, child: NodeId) {
		self.detach(child);
		self.node_mut(child).parent = Some(parent);
		self.node_mut(parent).children.push(child);
	}

	/// A fresh `<div>` in the body.
	pub fn container(&mut self) -> NodeId {
		let div = self.element("div");
		let body = self.body;
		self.append(body, div);
		div
	}

	fn detach(&mut self, node: NodeId) {
		if let Some(parent) = self.node_mut(node).parent.take() {
			self.node_mut(parent).children.retain(|&child| child != node);
		}
		// Browsers blur elements that leave the document, even temporarily.
		if let Some(active) = self.active {
			if self.is_inclusive_ancestor(node, active) {
				self.active = None;
			}
		}
	}

	fn is_inclusive_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
		loop {
			if node == ancestor {
				return true;
			}
			match self.node(node).parent {
				Some(parent) => node = parent,
				None => return false,
			}
		}
	}

	pub fn children(&self, node: NodeId) -> Vec<NodeId> {
		self.node(node).children.clone()
	}

	pub fn parent(&self, node: NodeId) -> Option<NodeId> {
		self.node(node).parent
	}

	pub fn tag(&self, node: NodeId) -> Option<&str> {
		match &self.node(node).data {
			Data::Element { tag, .. } => Some(tag),
			_ => None,
		}
	}

	pub fn svg(&self, node: NodeId) -> bool {
		matches!(self.node(node).data, Data::Element { svg: true, .. })
	}

	pub fn data(&self, node: NodeId) -> Option<&str> {
		match &self.node(node).data {
			Data::Text(data) | Data::Comment(data) => Some(data),
			_ => None,
		}
	}

	pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
		match &self.node(node).data {
			Data::Element { attributes, .. } => attributes.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str()),
			_ => None,
		}
	}

	pub fn set_attribute_raw(&mut self, node: NodeId, name: &str, value: &str) {
		if let Data::Element { attributes, .. } = &mut self.node_mut(node).data {
			match attributes.iter_mut().find(|(n, _)| n == name) {
				Some((_, v)) => *v = value.to_owned(),
				None => attributes.push((name.to_owned(), value.to_owned())),
			}
		}
	}

	/// The `value` *property*, as a browser would report it.
	pub fn value(&self, node: NodeId) -> String {
		match &self.node(node).data {
			Data::Element { tag, .. } if tag == "select" => self
				.options_of(node)
				.into_iter()
				.find(|&option| self.selected(option))
				.map(|option| self.option_value_of(option))
				.unwrap_or_default(),
			Data::Element { value, .. } => value.clone(),
			_ => String::new(),
		}
	}

	pub fn checked(&self, node: NodeId) -> bool {
		matches!(self.node(node).data, Data::Element { checked: true, .. })
	}

	pub fn selected(&self, node: NodeId) -> bool {
		matches!(self.node(node).data, Data::Element { selected: true, .. })
	}

	pub fn text_content(&self, node: NodeId) -> String {
		match &self.node(node).data {
			Data::Text(data) => data.clone(),
			Data::Comment(_) => String::new(),
			_ => self.node(node).children.iter().map(|&child| self.text_content(child)).collect(),
		}
	}

	fn options_of(&self, node: NodeId) -> Vec<NodeId> {
		let mut options = Vec::new();
		for &child in &self.node(node).children {
			if self.tag(child) == Some("option") {
				options.push(child);
			}
			options.extend(self.options_of(child));
		}
		options
	}

	fn option_value_of(&self, option: NodeId) -> String {
		match self.attribute(option, "value") {
			Some(value) => value.to_owned(),
			None => self.text_content(option),
		}
	}

	pub fn set_active(&mut self, node: Option<NodeId>) {
		self.active = node;
	}

	pub fn active_element_id(&self) -> Option<NodeId> {
		self.active
	}

	pub fn inner_html(&self, node: NodeId) -> String {
		self.node(node).children.iter().map(|&child| self.outer_html(child)).collect()
	}

	pub fn outer_html(&self, node: NodeId) -> String {
		match &self.node(node).data {
			Data::Document => self.inner_html(node),
			Data::Text(data) => data.clone(),
			Data::Comment(data) => format!("<!--{}-->", data),
			Data::Element { tag, attributes, .. } => {
				let attributes: String = attributes.iter().map(|(name, value)| format!(" {}=\"{}\"", name, value)).collect();
				format!("<{tag}{attributes}>{}</{tag}>", self.inner_html(node), tag = tag, attributes = attributes)
			}
		}
	}

	fn import_fragment(&mut self, markup: &str, svg: bool) -> Vec<NodeId> {
		let fragment = Html::parse_fragment(markup);
		let root = fragment.root_element();
		let mut imported = HashMap::new();
		imported.insert(root.id(), None);
		let mut top_level = Vec::new();
		for node in root.descendants().skip(1) {
			let created = match node.value() {
				scraper::Node::Element(element) => {
					let created = self.element(element.name());
					if let Data::Element { svg: is_svg, .. } = &mut self.node_mut(created).data {
						*is_svg = svg;
					}
					for (name, value) in element.attrs() {
						self.set_attribute_raw(created, name, value);
					}
					created
				}
				scraper::Node::Text(text) => self.text(&text.text),
				scraper::Node::Comment(comment) => self.comment(&comment.comment),
				_ => continue,
			};
			imported.insert(node.id(), Some(created));
			match node.parent().and_then(|parent| imported.get(&parent.id()).copied()) {
				Some(Some(parent)) => self.append(parent, created),
				Some(None) => top_level.push(created),
				None => (),
			}
		}
		top_level
	}
}

impl Document for MemoryDocument {
	type Node = NodeId;

	fn create_element(&mut self, tag_name: &str, svg: bool) -> Result<NodeId, DomError> {
		if tag_name.is_empty() || tag_name.contains(char::is_whitespace) {
			return Err(DomError::new(format!("invalid tag name {:?}", tag_name)));
		}
		let element = self.element(tag_name);
		if let Data::Element { svg: is_svg, .. } = &mut self.node_mut(element).data {
			*is_svg = svg;
		}
		Ok(element)
	}

	fn create_text_node(&mut self, data: &str) -> NodeId {
		self.text(data)
	}

	fn create_comment(&mut self, data: &str) -> NodeId {
		self.comment(data)
	}

	fn set_character_data(&mut self, node: &NodeId, data: &str) {
		match &mut self.node_mut(*node).data {
			Data::Text(existing) | Data::Comment(existing) => *existing = data.to_owned(),
			other => panic!("set_character_data on {:?}", other),
		}
	}

	fn insert_before(&mut self, parent: &NodeId, child: &NodeId, reference: Option<&NodeId>) -> Result<(), DomError> {
		if self.is_inclusive_ancestor(*child, *parent) {
			return Err(DomError::new("cannot insert a node into itself"));
		}
		if matches!(self.node(*parent).data, Data::Text(_) | Data::Comment(_)) {
			return Err(DomError::new("character data can't have children"));
		}
		self.detach(*child);
		let index = match reference {
			Some(reference) => self.node(*parent).children.iter().position(|c| c == reference).ok_or_else(|| DomError::new("reference is not a child of parent"))?,
			None => self.node(*parent).children.len(),
		};
		self.node_mut(*parent).children.insert(index, *child);
		self.node_mut(*child).parent = Some(*parent);
		Ok(())
	}

	fn remove(&mut self, node: &NodeId) -> Result<(), DomError> {
		self.detach(*node);
		Ok(())
	}

	fn parent_node(&self, node: &NodeId) -> Option<NodeId> {
		self.node(*node).parent
	}

	fn next_sibling(&self, node: &NodeId) -> Option<NodeId> {
		let parent = self.node(*node).parent?;
		let siblings = &self.node(parent).children;
		let index = siblings.iter().position(|c| c == node)?;
		siblings.get(index + 1).copied()
	}

	fn child_nodes(&self, node: &NodeId) -> Vec<NodeId> {
		self.children(*node)
	}

	fn tag_name(&self, node: &NodeId) -> Option<String> {
		self.tag(*node).map(str::to_owned)
	}

	fn is_text(&self, node: &NodeId) -> bool {
		matches!(self.node(*node).data, Data::Text(_))
	}

	fn is_svg(&self, node: &NodeId) -> bool {
		self.svg(*node)
	}

	fn get_attribute(&self, element: &NodeId, name: &str) -> Option<String> {
		self.attribute(*element, name).map(str::to_owned)
	}

	fn set_attribute(&mut self, element: &NodeId, name: &str, value: &str) -> Result<(), DomError> {
		if self.tag(*element).is_none() {
			return Err(DomError::new("not an element"));
		}
		self.set_attribute_raw(*element, name, value);
		Ok(())
	}

	fn remove_attribute(&mut self, element: &NodeId, name: &str) -> Result<(), DomError> {
		match &mut self.node_mut(*element).data {
			Data::Element { attributes, .. } => {
				attributes.retain(|(n, _)| n != name);
				Ok(())
			}
			_ => Err(DomError::new("not an element")),
		}
	}

	fn set_value(&mut self, element: &NodeId, value: &str) {
		if self.tag(*element) == Some("select") {
			// Like browsers: select the first matching option, or nothing at all.
			let mut matched = false;
			for option in self.options_of(*element) {
				let selected = !matched && self.option_value_of(option) == value;
				matched |= selected;
				self.set_selected(&option, selected);
			}
		} else if let Data::Element { value: existing, .. } = &mut self.node_mut(*element).data {
			*existing = value.to_owned();
		}
	}

	fn set_checked(&mut self, input: &NodeId, checked: bool) {
		if let Data::Element { checked: existing, .. } = &mut self.node_mut(*input).data {
			*existing = checked;
		}
	}

	fn is_multiple_select(&self, select: &NodeId) -> bool {
		self.tag(*select) == Some("select") && self.attribute(*select, "multiple").is_some()
	}

	fn select_options(&self, select: &NodeId) -> Vec<NodeId> {
		self.options_of(*select)
	}

	fn option_value(&self, option: &NodeId) -> String {
		self.option_value_of(*option)
	}

	fn set_selected(&mut self, option: &NodeId, selected: bool) {
		if let Data::Element { selected: existing, .. } = &mut self.node_mut(*option).data {
			*existing = selected;
		}
	}

	fn parse_fragment(&mut self, markup: &str, svg: bool) -> Result<Vec<NodeId>, DomError> {
		self.parse_calls += 1;
		Ok(self.import_fragment(markup, svg))
	}

	fn active_element(&self) -> Option<NodeId> {
		self.active
	}

	fn is_connected(&self, node: &NodeId) -> bool {
		self.is_inclusive_ancestor(self.root, *node)
	}

	fn focus(&mut self, element: &NodeId) {
		self.focus_calls += 1;
		self.active = Some(*element);
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
	Listener { element: NodeId, event_name: String, handler_id: EventHandlerId, component_id: ComponentId },
	RemovedListener(EventHandlerId),
	StopPropagation { element: NodeId, event_name: String, value: bool },
	PreventDefault { element: NodeId, event_name: String, value: bool },
	Capture { element: NodeId, capture_id: String },
}

/// Records every call to the event dispatch and capture registry collaborators.
#[derive(Debug, Default)]
pub struct Recorder(pub Vec<Recorded>);
impl EventDispatch<NodeId> for Recorder {
	fn set_listener(&mut self, element: &NodeId, event_name: &str, handler_id: EventHandlerId, component_id: ComponentId) {
		self.0.push(Recorded::Listener {
			element: *element,
			event_name: event_name.to_owned(),
			handler_id,
			component_id,
		});
	}

	fn remove_listener(&mut self, handler_id: EventHandlerId) {
		self.0.push(Recorded::RemovedListener(handler_id));
	}

	fn set_stop_propagation(&mut self, element: &NodeId, event_name: &str, value: bool) {
		self.0.push(Recorded::StopPropagation {
			element: *element,
			event_name: event_name.to_owned(),
			value,
		});
	}

	fn set_prevent_default(&mut self, element: &NodeId, event_name: &str, value: bool) {
		self.0.push(Recorded::PreventDefault {
			element: *element,
			event_name: event_name.to_owned(),
			value,
		});
	}
}
impl CaptureRegistry<NodeId> for Recorder {
	fn attach_capture_id(&mut self, element: &NodeId, capture_id: &str) {
		self.0.push(Recorded::Capture {
			element: *element,
			capture_id: capture_id.to_owned(),
		});
	}
}

pub type TestRenderer = Renderer<MemoryDocument, Recorder, Recorder>;

pub fn renderer() -> TestRenderer {
	init_logging();
	Renderer::new(MemoryDocument::new(), Recorder::default(), Recorder::default())
}

/// Every logical child's physical range, in logical order.
pub fn flatten(renderer: &TestRenderer, node: LogicalNode) -> Vec<NodeId> {
	let tree = renderer.tree();
	let mut range = vec![*tree.physical(node).unwrap()];
	if *tree.kind(node).unwrap() == LogicalKind::Container {
		for &child in tree.children(node).unwrap() {
			range.extend(flatten(renderer, child));
		}
	}
	range
}

/// Checks that the logical tree below `node` matches the DOM exactly.
///
/// Elements must contain exactly their children's ranges. Containers must be followed directly by theirs.
pub fn assert_structurally_consistent(renderer: &TestRenderer, node: LogicalNode) {
	let tree = renderer.tree();
	let document = renderer.document();
	let physical = *tree.physical(node).unwrap();
	let expected: Vec<NodeId> = tree.children(node).unwrap().iter().flat_map(|&child| flatten(renderer, child)).collect();
	match tree.kind(node).unwrap() {
		LogicalKind::Element { .. } => assert_eq!(document.children(physical), expected),
		LogicalKind::Container => {
			let mut actual = Vec::new();
			let mut cursor = physical;
			for _ in 0..expected.len() {
				cursor = document.next_sibling(&cursor).unwrap();
				actual.push(cursor);
			}
			assert_eq!(actual, expected);
		}
		LogicalKind::Text | LogicalKind::Foreign => assert!(expected.is_empty()),
	}
	for &child in tree.children(node).unwrap() {
		assert_structurally_consistent(renderer, child);
	}
}
