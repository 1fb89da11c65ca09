//! `value` and `checked` handling for form controls.
//!
//! Writing `value` straight to the DOM doesn't work in general:
//! A `<select>` drops any value that has no matching `<option>` *yet*, and range inputs clamp
//! against default `min`/`max` before the declared ones are applied.
//! The value is therefore stashed on the element's logical entry as a [`DeferredValue`] and
//! resolved from three places, all of which converge on the same result:
//!
//! 1. when an `<option>` is inserted (or its `value` changes), against its closest `<select>`,
//! 2. when an element finishes construction and nothing resolved its value yet
//!    (e.g. because its options arrived as an opaque markup block),
//! 3. immediately, when `value` changes on an element that is already live.

use crate::{
	dispatch::{CaptureRegistry, EventDispatch},
	document::Document,
	error::{ProtocolViolation, Result},
	logical::{LogicalKind, LogicalNode},
	renderer::Renderer,
};
use tracing::{instrument, trace};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredValue {
	/// There is no representable `null` select value, so [`None`] resolves to the empty string.
	Single(Option<String>),
	/// The selected option values of a multiple-select.
	Multiple(Vec<String>),
}

/// Drops a `:00` seconds component from `time` and `datetime-local` values,
/// which some browsers otherwise mishandle during keyboard entry.
///
/// ```
/// use render_batch_dom::form::normalize_input_value;
///
/// assert_eq!(normalize_input_value("12:30:00", Some("time")), "12:30");
/// assert_eq!(normalize_input_value("12:30:05", Some("time")), "12:30:05");
/// assert_eq!(normalize_input_value("2024-01-01T12:30:00", Some("datetime-local")), "2024-01-01T12:30");
/// ```
#[must_use]
pub fn normalize_input_value<'a>(value: &'a str, input_type: Option<&str>) -> &'a str {
	let kept = match input_type {
		Some("time") if value.len() == 8 && value.ends_with("00") => value.get(..5),
		Some("datetime-local") if value.len() == 19 && value.ends_with("00") => value.get(..16),
		_ => None,
	};
	kept.unwrap_or(value)
}

impl<D, E, C> Renderer<D, E, C>
where
	D: Document,
	E: EventDispatch<D::Node>,
	C: CaptureRegistry<D::Node>,
{
	/// Returns whether `value` was claimed. Unclaimed values are plain attributes.
	#[instrument(skip(self, value))]
	pub(crate) fn try_apply_value_property(&mut self, element: LogicalNode, value: Option<&str>) -> Result<bool> {
		let tag = match self.tree.kind(element)? {
			LogicalKind::Element { tag, .. } => tag.to_ascii_lowercase(),
			_ => return Ok(false),
		};
		let physical = self.tree.physical(element)?.clone();

		match tag.as_str() {
			"input" | "select" | "textarea" => {
				let deferred = if tag == "select" && self.document.is_multiple_select(&physical) {
					let values = match value {
						Some(json) => serde_json::from_str(json).map_err(ProtocolViolation::MultipleSelectValue)?,
						None => Vec::new(),
					};
					DeferredValue::Multiple(values)
				} else if tag == "input" {
					let input_type = self.document.get_attribute(&physical, "type");
					DeferredValue::Single(value.map(|value| normalize_input_value(value, input_type.as_deref()).to_owned()))
				} else {
					DeferredValue::Single(value.map(str::to_owned))
				};

				// Elements still being built have no logical parent yet. Those resolve once complete.
				let live = self.tree.parent_of(element).is_some() || self.document.is_connected(&physical);
				self.tree.set_deferred_value(element, Some(deferred))?;
				if live {
					self.apply_deferred_value(element)?;
				}
				Ok(true)
			}
			"option" => {
				match value {
					Some(value) => self.document.set_attribute(&physical, "value", value)?,
					None => self.document.remove_attribute(&physical, "value")?,
				}
				self.try_set_select_value_from_option(element)?;
				Ok(true)
			}
			_ => Ok(false),
		}
	}

	pub(crate) fn try_apply_checked_property(&mut self, element: LogicalNode, value: Option<&str>) -> Result<bool> {
		if !self.tree.kind(element)?.is_element("input") {
			return Ok(false);
		}
		let physical = self.tree.physical(element)?;
		self.document.set_checked(physical, value.is_some());
		Ok(true)
	}

	/// Resolves the closest ancestor `<select>`'s deferred value against `option`.
	///
	/// Returns whether there was anything to resolve.
	#[instrument(skip(self))]
	pub(crate) fn try_set_select_value_from_option(&mut self, option: LogicalNode) -> Result<bool> {
		let select = match self.tree.closest_ancestor_element(option, "select") {
			Some(select) => select,
			None => return Ok(false),
		};
		let option_physical = self.tree.physical(option)?.clone();
		let option_value = self.document.option_value(&option_physical);

		match self.tree.deferred_value(select) {
			None => Ok(false),
			Some(DeferredValue::Multiple(values)) => {
				let selected = values.contains(&option_value);
				self.document.set_selected(&option_physical, selected);
				Ok(true)
			}
			Some(DeferredValue::Single(value)) => {
				if value.as_deref() != Some(option_value.as_str()) {
					return Ok(false);
				}
				trace!("Option resolved the deferred select value.");
				let select_physical = self.tree.physical(select)?;
				self.document.set_value(select_physical, &option_value);
				self.tree.set_deferred_value(select, None)?;
				Ok(true)
			}
		}
	}

	/// Writes an element's stashed value to the DOM, if it has one.
	#[instrument(skip(self))]
	pub(crate) fn apply_deferred_value(&mut self, element: LogicalNode) -> Result<()> {
		let deferred = match self.tree.deferred_value(element) {
			Some(deferred) => deferred.clone(),
			None => return Ok(()),
		};
		let physical = self.tree.physical(element)?.clone();
		match deferred {
			DeferredValue::Single(value) => self.document.set_value(&physical, value.as_deref().unwrap_or("")),
			DeferredValue::Multiple(values) => {
				for option in self.document.select_options(&physical) {
					let selected = values.contains(&self.document.option_value(&option));
					self.document.set_selected(&option, selected);
				}
			}
		}
		Ok(())
	}
}
