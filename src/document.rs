use crate::error::DomError;
use core::fmt::Debug;

pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// The physical document that render batches are applied to.
///
/// Node handles are cheap clones that compare by identity.
/// All structural bookkeeping happens in [`LogicalTree`](`crate::logical::LogicalTree`),
/// so implementations only need to provide plain DOM primitives.
pub trait Document {
	type Node: Clone + PartialEq + Debug;

	/// Creates a detached element, in the SVG namespace if `svg` is set.
	fn create_element(&mut self, tag_name: &str, svg: bool) -> Result<Self::Node, DomError>;
	fn create_text_node(&mut self, data: &str) -> Self::Node;
	fn create_comment(&mut self, data: &str) -> Self::Node;

	/// Replaces the data of a text or comment node.
	fn set_character_data(&mut self, node: &Self::Node, data: &str);

	/// Moves `child` under `parent`, before `reference` or at the end if there is none.
	fn insert_before(&mut self, parent: &Self::Node, child: &Self::Node, reference: Option<&Self::Node>) -> Result<(), DomError>;
	/// Detaches `node` from its parent. Detached nodes are left alone.
	fn remove(&mut self, node: &Self::Node) -> Result<(), DomError>;

	fn parent_node(&self, node: &Self::Node) -> Option<Self::Node>;
	fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;
	fn child_nodes(&self, node: &Self::Node) -> Vec<Self::Node>;

	/// The element's local name, or [`None`] for any other node type.
	fn tag_name(&self, node: &Self::Node) -> Option<String>;
	fn is_text(&self, node: &Self::Node) -> bool;
	fn is_svg(&self, node: &Self::Node) -> bool;

	fn get_attribute(&self, element: &Self::Node, name: &str) -> Option<String>;
	fn set_attribute(&mut self, element: &Self::Node, name: &str, value: &str) -> Result<(), DomError>;
	fn remove_attribute(&mut self, element: &Self::Node, name: &str) -> Result<(), DomError>;

	/// Writes the `value` *property* of an `<input>`, `<select>` or `<textarea>`.
	fn set_value(&mut self, element: &Self::Node, value: &str);
	fn set_checked(&mut self, input: &Self::Node, checked: bool);
	fn is_multiple_select(&self, select: &Self::Node) -> bool;
	/// All `<option>`s of a `<select>`, in document order.
	fn select_options(&self, select: &Self::Node) -> Vec<Self::Node>;
	fn option_value(&self, option: &Self::Node) -> String;
	fn set_selected(&mut self, option: &Self::Node, selected: bool);

	/// Parses `markup` in an HTML or SVG context and returns the detached top-level nodes in order.
	///
	/// Any scratch container used for this must be fully drained before returning.
	fn parse_fragment(&mut self, markup: &str, svg: bool) -> Result<Vec<Self::Node>, DomError>;

	fn active_element(&self) -> Option<Self::Node>;
	fn is_connected(&self, node: &Self::Node) -> bool;
	fn focus(&mut self, element: &Self::Node);
}
