use crate::ComponentId;
use core::fmt::{self, Display, Formatter};
use thiserror::Error;

pub type Result<T, E = RenderError> = core::result::Result<T, E>;

/// Fatal failure while applying a render batch.
///
/// There is no partial rollback: Whatever was applied before the error stays in the DOM,
/// and it is up to the host to request a full re-render.
#[derive(Debug, Error)]
pub enum RenderError {
	#[error("No element is currently associated with component {0}")]
	NoTarget(ComponentId),

	#[error("Logical child index {index} is out of range for a parent with {len} children")]
	IndexOutOfRange { index: usize, len: usize },

	#[error("Cannot {operation} on a {found} child; expected {expected}")]
	UnexpectedNodeKind {
		operation: &'static str,
		expected: &'static str,
		found: &'static str,
	},

	#[error("Logical node was already removed from the tree")]
	StaleNode,

	#[error(transparent)]
	Protocol(#[from] ProtocolViolation),

	#[error(transparent)]
	Dom(#[from] DomError),
}

/// A malformed edit or frame sequence.
#[derive(Debug, Error)]
pub enum ProtocolViolation {
	#[error("Attribute frames should only be present as leading children of element frames (frame {frame_index})")]
	AttributeFrameOutOfPlace { frame_index: usize },

	#[error("Reference capture frames can only be children of element frames (frame {frame_index})")]
	CaptureOutsideElement { frame_index: usize },

	#[error("Frame {frame_index} has a subtree length of 0")]
	EmptySubtree { frame_index: usize },

	#[error("Frame {frame_index}'s subtree extends past the largest addressable frame index")]
	SubtreeOutOfRange { frame_index: usize },

	#[error("Frame index {frame_index} is beyond the end of the reference frames")]
	FrameIndexOutOfRange { frame_index: usize },

	#[error("Edit index {edit_index} is beyond the end of the edit list")]
	EditIndexOutOfRange { edit_index: usize },

	#[error("Edit {edit_index} expected a {expected} frame at index {frame_index} but found a {found} frame")]
	UnexpectedFrameKind {
		edit_index: usize,
		frame_index: usize,
		expected: &'static str,
		found: &'static str,
	},

	#[error("Edit {edit_index} steps out above the node the update started at")]
	UnbalancedStepOut { edit_index: usize },

	#[error("Edit list ended at depth {depth} instead of 0")]
	UnbalancedStepIn { depth: usize },

	#[error("Edit {edit_index} ends a permutation list that has no entries")]
	EmptyPermutationList { edit_index: usize },

	#[error("Edit list ended with {entries} unterminated permutation list entries")]
	UnterminatedPermutationList { entries: usize },

	#[error("Permutation list is not a reordering of existing children: {0}")]
	InvalidPermutation(&'static str),

	#[error("Attribute should be an event name, but doesn't start with 'on'. Value: {0:?}")]
	MissingEventPrefix(String),

	#[error("Unsupported internal attribute {0:?}")]
	UnsupportedInternalAttribute(String),

	#[error("Multiple-select value is not a JSON array of strings: {0}")]
	MultipleSelectValue(#[source] serde_json::Error),
}

/// Failure reported by the physical [`Document`](`crate::Document`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomError(String);
impl DomError {
	pub fn new(message: impl Into<String>) -> Self {
		Self(message.into())
	}

	#[must_use]
	pub fn message(&self) -> &str {
		&self.0
	}
}
impl Display for DomError {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "DOM operation failed: {}", self.0)
	}
}
impl std::error::Error for DomError {}
