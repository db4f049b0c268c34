//! The Notification/Dialog Presenter: `notify` toasts and modal `alert`s, stacked in one container.

use crate::{
	build::DEFAULT_KIND,
	descriptor::{Component, Instruction, Target},
	engine::{succeeded, Engine},
	host::{Document, UiEvent},
};
use core::{cell::RefCell, time::Duration};
use std::rc::Rc;
use tracing::{error, trace};

const ALERT_PREFIX: &str = "\u{26a0}\u{fe0f} ";

/// Per-panel presentation options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToastOptions {
	/// Defaults to `true` for notifications and `false` for alerts.
	pub auto_hide: Option<bool>,
	/// Defaults to [`ToastConfig::default_delay`](`crate::ToastConfig::default_delay`).
	pub delay: Option<Duration>,
	/// Adds the panel below existing ones instead of on top.
	pub append: bool,
}

impl<D: Document> Engine<D> {
	/// Shows a non-modal panel built from `content` that hides itself after a delay.
	pub fn notify(&self, content: &Component, options: ToastOptions) -> Option<D::Node> {
		self.present(content, None, false, options)
	}

	/// Shows a modal panel built from `content`, prefixed with a warning sign. It stays until clicked.
	pub fn alert(&self, content: &Component, options: ToastOptions) -> Option<D::Node> {
		self.present(content, None, true, options)
	}

	/// Locator strings are shown as plain messages.
	pub(crate) fn present_instruction(&self, instruction: &Instruction<D::Node>, modal: bool) -> bool {
		let options = ToastOptions {
			auto_hide: instruction.auto_hide,
			delay: instruction.delay.map(Duration::from_millis),
			append: instruction.append_toast.unwrap_or(false),
		};
		let default_slot = instruction.payload_slot();
		let mut shown = false;
		for target in instruction.targets(true) {
			let panel = match &*target {
				Target::Component(content) => self.present(content, default_slot.as_deref(), modal, options),
				Target::Locator(message) => self.present(&Component::default().with_slot(message.as_str()), None, modal, options),
			};
			shown |= panel.is_some();
		}
		shown
	}

	fn present(&self, content: &Component, default_slot: Option<&str>, modal: bool, options: ToastOptions) -> Option<D::Node> {
		let container = self.toast_container()?;

		let mut content = content.clone();
		if modal {
			if content.slot.is_none() && content.slot_markdown.is_none() {
				content.slot = default_slot.map(str::to_owned);
			}
			match &mut content.slot_markdown {
				Some(markdown) => markdown.insert_str(0, ALERT_PREFIX),
				None => content.slot = Some(format!("{}{}", ALERT_PREFIX, content.slot.as_deref().unwrap_or_default())),
			}
		}

		let panel = match self.document.create_element(content.kind.as_deref().unwrap_or(DEFAULT_KIND)) {
			Ok(panel) => panel,
			Err(error) => {
				error!("Could not create a toast: {}", error);
				return None;
			}
		};
		self.compose(&panel, &content, default_slot);

		let class = if modal { "descriptor-dom-toast descriptor-dom-alert" } else { "descriptor-dom-toast" };
		let class = match self.document.get_attribute(&panel, "class") {
			Some(own) if !own.is_empty() => format!("{} {}", class, own),
			_ => class.to_owned(),
		};
		succeeded(self.document.set_attribute(&panel, "class", &class), "set the toast class");
		if modal {
			succeeded(self.document.set_attribute(&panel, "role", "alertdialog"), "set the alert role");
			succeeded(self.document.set_attribute(&panel, "aria-modal", "true"), "mark the alert modal");
		} else {
			succeeded(self.document.set_attribute(&panel, "role", "status"), "set the toast role");
		}

		let reference = if options.append { None } else { self.document.first_child(&container) };
		if !succeeded(self.document.insert_before(&container, &panel, reference.as_ref()), "show a toast") {
			return None;
		}

		let dismiss_on_click = self.dismisser(&panel);
		succeeded(
			self.document.add_event_listener(&panel, "click", Rc::new(move |_: &UiEvent| dismiss_on_click())),
			"make the toast dismissible",
		);

		if options.auto_hide.unwrap_or(!modal) {
			let delay = options.delay.unwrap_or(self.config.toast.default_delay);
			succeeded(self.document.set_timeout(delay, Box::new(self.dismisser(&panel))), "schedule hiding the toast");
		}
		Some(panel)
	}

	/// The registered container if it's still in the document, otherwise a new one appended to `<body>`.
	fn toast_container(&self) -> Option<D::Node> {
		if let Some(container) = self.toasts.borrow().as_ref() {
			if self.document.is_connected(container) {
				return Some(container.clone());
			}
		}

		let body = match self.document.body() {
			Some(body) => body,
			None => {
				error!("The document has no <body> to show toasts in.");
				return None;
			}
		};
		let container = match self.document.create_element("div") {
			Ok(container) => container,
			Err(error) => {
				error!("Could not create the toast container: {}", error);
				return None;
			}
		};
		let id = self.config.toast.container_id.clone();
		succeeded(self.document.set_attribute(&container, "id", &id), "set the toast container id");
		succeeded(self.document.set_attribute(&container, "class", "descriptor-dom-toasts"), "set the toast container class");
		succeeded(self.document.set_attribute(&container, "aria-live", "polite"), "make the toast container live");

		// Clicks on the container itself, not on a panel, clear all toasts.
		let (document, registry, handle) = (self.document.downgrade(), Rc::downgrade(&self.toasts), D::downgrade_node(&container));
		let clear_all = move |event: &UiEvent| {
			if event.target_id.as_deref() != Some(id.as_str()) {
				return;
			}
			if let (Some(document), Some(registry), Some(container)) = (D::upgrade(&document), registry.upgrade(), D::upgrade_node(&handle)) {
				trace!("Clearing all toasts.");
				document.remove(&container);
				unregister(&container, &registry);
			}
		};
		succeeded(self.document.add_event_listener(&container, "click", Rc::new(clear_all)), "make the toast container clearable");

		if !succeeded(self.document.insert_before(&body, &container, None), "insert the toast container") {
			return None;
		}
		*self.toasts.borrow_mut() = Some(container.clone());
		Some(container)
	}
}

impl<D: Document> Engine<D> {
	/// A callback that dismisses `panel`. It holds only weak handles, as the document ends up owning it.
	fn dismisser(&self, panel: &D::Node) -> impl Fn() + 'static {
		let (document, registry, handle) = (self.document.downgrade(), Rc::downgrade(&self.toasts), D::downgrade_node(panel));
		move || {
			if let (Some(document), Some(registry), Some(panel)) = (D::upgrade(&document), registry.upgrade(), D::upgrade_node(&handle)) {
				dismiss(&document, &registry, &panel);
			}
		}
	}
}

/// Removes `panel`, and its container once that's empty. Already dismissed panels are ignored.
fn dismiss<D: Document>(document: &D, registry: &RefCell<Option<D::Node>>, panel: &D::Node) {
	let container = match document.parent(panel) {
		Some(container) => container,
		None => return,
	};
	document.remove(panel);
	if document.children(&container).is_empty() {
		document.remove(&container);
		unregister(&container, registry);
	}
}

fn unregister<N: PartialEq>(container: &N, registry: &RefCell<Option<N>>) {
	let mut registered = registry.borrow_mut();
	if registered.as_ref() == Some(container) {
		*registered = None;
	}
}
