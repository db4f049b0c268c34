#![doc(html_root_url = "https://docs.rs/descriptor-dom/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! Applies batches of declarative component descriptors to a document.
//!
//! An [`Engine`] takes [`Instruction`]s (`add`, `replace`, `update`, `remove`, `notify`, `alert`, `load`, `reload`)
//! and turns them into element creation, lookup and mutation on any [`Document`] host:
//! [`WebDocument`] in a browser, or the headless [`VirtualDocument`] anywhere else.
//!
//! Failures of individual steps are logged through [`tracing`] and skipped, so one bad entry never aborts its batch.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

mod build;
mod compose;
pub mod config;
pub mod descriptor;
mod engine;
pub mod error;
pub mod host;
pub mod include;
pub mod load;
mod locate;
#[cfg(feature = "markdown")]
pub mod markdown;
pub mod present;
mod resources;
pub mod sanitize;
pub mod table;
mod update;
pub mod virtual_dom;
pub mod web;

pub use config::{EngineConfig, HandlerRegistry, SanitizeOptions, ToastConfig};
pub use descriptor::{Batch, Component, Instruction, Method, Namespace, Position, RequestContext, ScriptResource, StyleResource, Target};
pub use engine::{BatchReport, Engine};
pub use error::{EngineError, HostError, IncludeError, InstructionError, TableError};
pub use host::{Document, Listener, UiEvent};
pub use include::{ContentKind, Fetch, FetchResponse, IncludeOptions, IncludeStatus};
pub use load::{load_children, load_component};
pub use present::ToastOptions;
pub use table::{infer_columns, Column, RowOptions, RowRef, TableOptions, TableRef};
pub use virtual_dom::{VNode, VirtualDocument, WeakVNode, WeakVirtualDocument};
pub use web::{WeakWebDocument, WebDocument, WebFetch};
