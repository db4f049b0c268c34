//! Reads live elements back into [`Component`] descriptors.
//!
//! Snapshots compare documents by tag, `id` and attribute set, and hand rendered content back to producers.
//! Events and live properties aren't part of a snapshot.

use crate::{
	descriptor::{Component, Target},
	host::Document,
};
use serde_json::Value;

/// Snapshots `node` and its element descendants.
///
/// Text is kept (as `slot`) only for elements without element children.
pub fn load_component<D: Document>(document: &D, node: &D::Node) -> Component {
	let mut component = Component::new(document.tag_name(node));
	for (name, value) in document.attributes(node) {
		match name.as_str() {
			"id" => component.id = Some(value),
			"name" => component.name = Some(value),
			// Namespace declarations are implied by `type: "svg"`.
			"xmlns" | "xmlns:xlink" if component.kind.as_deref() == Some("svg") => (),
			_ => {
				component.attributes.insert(name, Value::String(value));
			}
		}
	}

	let children = document.children(node);
	if children.is_empty() {
		let text = document.text_content(node);
		if !text.is_empty() {
			component.slot = Some(text);
		}
	} else {
		component.components = children.iter().map(|child| Target::Component(Box::new(load_component(document, child)))).collect();
	}
	component
}

/// Snapshots the element children of `node`.
pub fn load_children<D: Document>(document: &D, node: &D::Node) -> Vec<Component> {
	document.children(node).iter().map(|child| load_component(document, child)).collect()
}
