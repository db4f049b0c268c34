//! The [`Engine`] and its batch entry points.

use crate::{
	config::EngineConfig,
	descriptor::{Batch, Instruction, Method, RequestContext},
	error::{EngineError, HostError},
	host::Document,
};
use core::{cell::RefCell, fmt};
use serde_json::Value;
use std::rc::Rc;
use tracing::{error, instrument, trace_span, warn};

/// How many entries of a batch took effect.
///
/// Per-entry failures are logged, never returned: a batch always runs to completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
	/// Entries that changed (or, for `reload`, signalled) the document.
	pub applied: usize,
	/// Malformed entries, unknown methods and entries none of whose targets could be found or built.
	pub skipped: usize,
}

impl BatchReport {
	fn record(&mut self, applied: bool) {
		if applied {
			self.applied += 1;
		} else {
			self.skipped += 1;
		}
	}
}

/// Applies instruction batches to one [`Document`].
///
/// The engine is single-threaded: entries apply in order, depth-first through nested `components`,
/// and each entry observes the effects of all earlier ones.
pub struct Engine<D: Document> {
	pub(crate) document: D,
	pub(crate) config: EngineConfig,
	/// The live toast container, if any. Shared with its own listeners so they can unregister it.
	pub(crate) toasts: Rc<RefCell<Option<D::Node>>>,
}

impl<D: Document + fmt::Debug> fmt::Debug for Engine<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Engine")
			.field("document", &self.document)
			.field("config", &self.config)
			.field("toasts", &self.toasts.borrow())
			.finish()
	}
}

impl<D: Document> Engine<D> {
	#[must_use]
	pub fn new(document: D, config: EngineConfig) -> Self {
		Self {
			document,
			config,
			toasts: Rc::new(RefCell::new(None)),
		}
	}

	#[must_use]
	pub fn document(&self) -> &D {
		&self.document
	}

	#[must_use]
	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	/// Applies a single [`Instruction`] or a list of them, in order.
	#[instrument(skip(self, batch))]
	pub fn apply_ui(&self, batch: impl Into<Batch<D::Node>>) -> BatchReport {
		self.apply_batch(batch.into().into_vec(), 0)
	}

	/// Like [`apply_ui`](`Engine::apply_ui`), but first copies the request's `payload` and `topic`
	/// onto every entry that doesn't carry its own.
	#[instrument(skip(self, batch))]
	pub fn apply_with_context(&self, batch: impl Into<Batch<D::Node>>, context: &RequestContext) -> BatchReport {
		let mut instructions = batch.into().into_vec();
		for instruction in &mut instructions {
			context.stamp(instruction);
		}
		self.apply_batch(instructions, 0)
	}

	/// Parses a JSON batch (one instruction object or an array of them) and applies it.
	///
	/// Entries are parsed one by one; malformed entries are logged and counted as skipped.
	///
	/// # Errors
	///
	/// Iff `json` isn't JSON at all. Nothing is applied in that case.
	#[instrument(skip(self, json))]
	pub fn apply_json(&self, json: &str) -> Result<BatchReport, EngineError> {
		let entries = match serde_json::from_str(json)? {
			Value::Array(entries) => entries,
			entry => vec![entry],
		};

		let mut malformed = 0;
		let mut instructions = Vec::with_capacity(entries.len());
		for (index, entry) in entries.into_iter().enumerate() {
			match serde_json::from_value::<Instruction<D::Node>>(entry) {
				Ok(instruction) => instructions.push(instruction),
				Err(error) => {
					warn!("Skipping malformed instruction {}: {}", index, error);
					malformed += 1;
				}
			}
		}

		let mut report = self.apply_batch(instructions, 0);
		report.skipped += malformed;
		Ok(report)
	}

	pub(crate) fn apply_batch(&self, instructions: Vec<Instruction<D::Node>>, depth: usize) -> BatchReport {
		let mut report = BatchReport::default();
		for (index, instruction) in instructions.into_iter().enumerate() {
			let method = match instruction.resolve_method() {
				Ok(method) => method,
				Err(error) => {
					warn!("Skipping instruction {}: {}", index, error);
					report.skipped += 1;
					continue;
				}
			};

			let span = trace_span!("Applying instruction", index, method = method.as_str(), depth);
			let _enter = span.enter();
			report.record(self.dispatch(method, &instruction, depth));
		}
		report
	}

	fn dispatch(&self, method: Method, instruction: &Instruction<D::Node>, depth: usize) -> bool {
		match method {
			Method::Add => self.add(instruction, depth),
			Method::Remove => self.remove(instruction, false),
			Method::RemoveAll => self.remove(instruction, true),
			Method::Replace => self.replace(instruction, depth),
			Method::Update => self.update(instruction, depth),
			Method::Load => self.load_resources(instruction),
			Method::Reload => succeeded(self.document.reload(), "reload"),
			Method::Notify => self.present_instruction(instruction, false),
			Method::Alert => self.present_instruction(instruction, true),
		}
	}

	/// `query_selector_all` that logs and swallows host errors.
	pub(crate) fn query_all(&self, scope: Option<&D::Node>, selector: &str) -> Vec<D::Node> {
		self.document.query_selector_all(scope, selector).unwrap_or_else(|error| {
			error!("{}", error);
			Vec::new()
		})
	}

	/// `query_selector` that logs and swallows host errors.
	pub(crate) fn query_first(&self, scope: Option<&D::Node>, selector: &str) -> Option<D::Node> {
		self.document.query_selector(scope, selector).unwrap_or_else(|error| {
			error!("{}", error);
			None
		})
	}
}

/// Logs a failed host call. Returns whether it succeeded.
pub(crate) fn succeeded(result: Result<(), HostError>, what: impl fmt::Display) -> bool {
	match result {
		Ok(()) => true,
		Err(error) => {
			error!("Could not {}: {}", what, error);
			false
		}
	}
}
