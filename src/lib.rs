//! Applies render batches to a live DOM.
//!
//! A render batch describes changes to one component's subtree as an ordered list of [`Edit`]s
//! that address children by sibling index and refer to new content in a reference-[`Frame`] array.
//! [`Renderer`] interprets those edits against a [`logical::LogicalTree`], in which component
//! boundaries and raw markup blocks occupy a single slot each even though they have no DOM
//! element of their own, and mirrors every change into a [`Document`].
//!
//! [`web::WebDocument`] drives a real browser DOM through [`web_sys`].
//! Event dispatch and element reference captures are left to the host through
//! [`EventDispatch`] and [`CaptureRegistry`].

#![doc(html_root_url = "https://docs.rs/render-batch-dom/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

pub mod attribute;
pub mod batch;
pub mod dispatch;
pub mod document;
mod edits;
pub mod error;
pub mod form;
pub mod logical;
mod materialize;
pub mod renderer;
pub mod web;

pub type ComponentId = i32;
pub type EventHandlerId = u64;

pub use batch::{BatchReader, Edit, Frame, PermutationEntry, RenderBatch};
pub use dispatch::{CaptureRegistry, EventDispatch, NoCaptures, NoEvents};
pub use document::Document;
pub use error::{DomError, ProtocolViolation, RenderError, Result};
pub use renderer::{Renderer, RootTarget};
