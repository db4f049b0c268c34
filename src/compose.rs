//! The Element Composer: applies one descriptor to one already-created element.
//!
//! Steps run in a fixed order so that later ones (and their log messages) can rely on
//! the element's attributes and `id` already being present:
//! attributes, `id` and `name`, namespace declarations, events, properties, `slot`, `slotMarkdown`.

use crate::{
	descriptor::{value_text, Component},
	engine::{succeeded, Engine},
	host::{Document, SVG_NAMESPACE, XLINK_NAMESPACE, XMLNS_NAMESPACE},
};
use serde_json::Value;
use tracing::{error, trace, trace_span, warn};

/// Non-rendered property listing the `event:handler` pairs already bound to an element,
/// so that re-composing on `update` doesn't bind a handler twice.
const BOUND_EVENTS_PROPERTY: &str = "descriptorDomEvents";

impl<D: Document> Engine<D> {
	/// `default_slot` is used as content iff `component` has neither `slot` nor `slotMarkdown`.
	pub(crate) fn compose(&self, element: &D::Node, component: &Component, default_slot: Option<&str>) {
		let span = trace_span!("Composing", kind = ?component.kind, id = ?component.id);
		let _enter = span.enter();

		for (name, value) in &component.attributes {
			self.apply_attribute(element, name, value);
		}
		if let Some(id) = &component.id {
			succeeded(self.document.set_attribute(element, "id", id), format_args!("set id {:?}", id));
		}
		if let Some(name) = &component.name {
			succeeded(self.document.set_attribute(element, "name", name), format_args!("set name {:?}", name));
		}
		if component.kind.as_deref() == Some("svg") {
			succeeded(self.document.set_attribute_ns(element, XMLNS_NAMESPACE, "xmlns", SVG_NAMESPACE), "declare the SVG namespace");
			succeeded(self.document.set_attribute_ns(element, XMLNS_NAMESPACE, "xmlns:xlink", XLINK_NAMESPACE), "declare the XLink namespace");
		}
		for (event, handler) in &component.events {
			self.bind_event(element, event, handler);
		}
		for (name, value) in &component.properties {
			self.apply_property(element, name, value);
		}
		self.compose_content(element, component, default_slot);
	}

	/// Replaces `element`'s content with `component`'s `slot` and then its rendered `slotMarkdown`.
	pub(crate) fn compose_content(&self, element: &D::Node, component: &Component, default_slot: Option<&str>) {
		let slot = match (&component.slot, &component.slot_markdown) {
			(Some(slot), _) => Some(slot.as_str()),
			(None, None) => default_slot,
			(None, Some(_)) => None,
		};
		if let Some(slot) = slot {
			self.inject(element, &self.config.sanitize(slot));
		}
		if let Some(markdown) = &component.slot_markdown {
			match self.config.render_markdown(markdown) {
				Some(markup) => self.inject(element, &self.config.sanitize(&markup)),
				None => self.document.set_text_content(element, markdown),
			}
		}
	}

	/// Swaps in `markup` atomically, then re-creates the (inert) scripts it contained so they run once.
	fn inject(&self, element: &D::Node, markup: &str) {
		if !succeeded(self.document.replace_children_with_markup(element, markup), "replace content") {
			return;
		}
		for inert in self.query_all(Some(element), "script") {
			let script = match self.document.create_element("script") {
				Ok(script) => script,
				Err(error) => {
					error!("Could not re-create a slot script: {}", error);
					continue;
				}
			};
			for (name, value) in self.document.attributes(&inert) {
				succeeded(self.document.set_attribute(&script, &name, &value), format_args!("copy script attribute {:?}", name));
			}
			self.document.set_text_content(&script, &self.document.text_content(&inert));
			succeeded(self.document.replace_with(&inert, &script), "activate a slot script");
		}
	}

	fn apply_attribute(&self, element: &D::Node, name: &str, value: &Value) {
		let text = match value {
			Value::Null | Value::Bool(false) => {
				succeeded(self.document.remove_attribute(element, name), format_args!("remove attribute {:?}", name));
				return;
			}
			Value::Bool(true) => String::new(),
			Value::Array(items) => {
				let separator = if name == "class" { " " } else { "," };
				items.iter().filter(|item| !item.is_null()).map(value_text).collect::<Vec<_>>().join(separator)
			}
			other => value_text(other),
		};

		let result = if name.starts_with("xlink:") {
			self.document.set_attribute_ns(element, XLINK_NAMESPACE, name, &text)
		} else {
			self.document.set_attribute(element, name, &text)
		};
		if succeeded(result, format_args!("set attribute {:?}", name)) && name == "value" {
			succeeded(self.document.set_property(element, "value", &Value::String(text)), "mirror `value` onto the property");
		}
	}

	fn bind_event(&self, element: &D::Node, event: &str, handler: &str) {
		let binding = format!("{}:{}", event, handler);
		let mut bound = match self.document.property(element, BOUND_EVENTS_PROPERTY) {
			Some(Value::Array(bound)) => bound,
			_ => Vec::new(),
		};
		if bound.iter().any(|existing| existing.as_str() == Some(binding.as_str())) {
			trace!("{:?} is already bound.", binding);
			return;
		}

		let listener = match self.config.handlers.get(handler) {
			Some(listener) => listener,
			None => return warn!("No handler named {:?} is registered; not binding {:?}.", handler, event),
		};
		if succeeded(self.document.add_event_listener(element, event, listener), format_args!("bind {:?}", event)) {
			bound.push(Value::String(binding));
			succeeded(self.document.set_property(element, BOUND_EVENTS_PROPERTY, &Value::Array(bound)), "record bound events");
		}
	}

	fn apply_property(&self, element: &D::Node, name: &str, value: &Value) {
		if !succeeded(self.document.set_property(element, name, value), format_args!("set property {:?}", name)) {
			return;
		}
		if name == "value" || name == "checked" {
			for kind in ["input", "change"] {
				succeeded(self.document.dispatch_event(element, kind), format_args!("dispatch {:?}", kind));
			}
		}
	}
}
