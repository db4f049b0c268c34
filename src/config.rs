//! Explicit engine configuration: collaborators, handler registry and presenter settings.

use crate::host::{Listener, UiEvent};
use core::{fmt, time::Duration};
use hashbrown::HashMap;
use std::rc::Rc;

pub type Sanitizer = Rc<dyn Fn(&str, &SanitizeOptions) -> String>;
pub type MarkdownRenderer = Rc<dyn Fn(&str) -> String>;

/// Extensions to a sanitizer's allow-list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizeOptions {
	pub extra_tags: Vec<String>,
	pub extra_attribs: Vec<String>,
}

/// Event handlers descriptors may refer to by name.
#[derive(Clone, Default)]
pub struct HandlerRegistry(HashMap<String, Listener>);

impl HandlerRegistry {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `handler` as `name`, returning the handler it replaces.
	pub fn register(&mut self, name: impl Into<String>, handler: impl Fn(&UiEvent) + 'static) -> Option<Listener> {
		self.0.insert(name.into(), Rc::new(handler))
	}

	#[must_use]
	pub fn get(&self, name: &str) -> Option<Listener> {
		self.0.get(name).cloned()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl fmt::Debug for HandlerRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_set().entries(self.0.keys()).finish()
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastConfig {
	/// `id` of the stacking container.
	pub container_id: String,
	pub default_delay: Duration,
}

impl Default for ToastConfig {
	fn default() -> Self {
		Self {
			container_id: "descriptor-dom-toasts".to_owned(),
			default_delay: Duration::from_secs(10),
		}
	}
}

#[derive(Clone)]
pub struct EngineConfig {
	sanitizer: Option<Sanitizer>,
	markdown: Option<MarkdownRenderer>,
	pub sanitize_options: SanitizeOptions,
	pub handlers: HandlerRegistry,
	pub toast: ToastConfig,
	/// Bounds both descriptor nesting and `update` re-entry.
	pub depth_limit: usize,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			sanitizer: None,
			markdown: None,
			sanitize_options: SanitizeOptions::default(),
			handlers: HandlerRegistry::new(),
			toast: ToastConfig::default(),
			depth_limit: 32,
		}
	}
}

impl fmt::Debug for EngineConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EngineConfig")
			.field("sanitizer", &self.sanitizer.is_some())
			.field("markdown", &self.markdown.is_some())
			.field("sanitize_options", &self.sanitize_options)
			.field("handlers", &self.handlers)
			.field("toast", &self.toast)
			.field("depth_limit", &self.depth_limit)
			.finish()
	}
}

impl EngineConfig {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with_sanitizer(mut self, sanitizer: impl Fn(&str, &SanitizeOptions) -> String + 'static) -> Self {
		self.sanitizer = Some(Rc::new(sanitizer));
		self
	}

	#[must_use]
	pub fn with_markdown(mut self, renderer: impl Fn(&str) -> String + 'static) -> Self {
		self.markdown = Some(Rc::new(renderer));
		self
	}

	/// Renders `slotMarkdown` with the bundled CommonMark renderer.
	#[cfg(feature = "markdown")]
	#[must_use]
	pub fn with_default_markdown(self) -> Self {
		self.with_markdown(crate::markdown::render)
	}

	#[must_use]
	pub fn with_handler(mut self, name: impl Into<String>, handler: impl Fn(&UiEvent) + 'static) -> Self {
		self.handlers.register(name, handler);
		self
	}

	#[must_use]
	pub fn with_sanitize_options(mut self, sanitize_options: SanitizeOptions) -> Self {
		self.sanitize_options = sanitize_options;
		self
	}

	#[must_use]
	pub fn with_toast(mut self, toast: ToastConfig) -> Self {
		self.toast = toast;
		self
	}

	#[must_use]
	pub fn with_depth_limit(mut self, depth_limit: usize) -> Self {
		self.depth_limit = depth_limit;
		self
	}

	/// Runs the configured sanitizer. Without one, markup passes through unchanged.
	pub(crate) fn sanitize(&self, markup: &str) -> String {
		match &self.sanitizer {
			Some(sanitizer) => sanitizer(markup, &self.sanitize_options),
			None => markup.to_owned(),
		}
	}

	/// [`None`] means no renderer is configured.
	pub(crate) fn render_markdown(&self, markdown: &str) -> Option<String> {
		self.markdown.as_ref().map(|render| render(markdown))
	}
}
