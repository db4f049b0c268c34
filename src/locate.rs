//! The Locator: which live elements a descriptor or locator string refers to. Also `remove`/`removeAll`.

use crate::{
	descriptor::{Component, Instruction, Target},
	engine::Engine,
	host::Document,
};
use tracing::{trace, warn};

impl<D: Document> Engine<D> {
	/// Every element within `scope` (or the document) matching `component`'s most specific hint.
	///
	/// Hints are considered in the order `id`, `selector`, `name`, `type`, and only the first one present is used.
	/// With `by_type` unset, a bare `type` matches nothing.
	pub(crate) fn locate(&self, component: &Component, scope: Option<&D::Node>, by_type: bool) -> Vec<D::Node> {
		match locator_selector(component, by_type) {
			Some(selector) => self.query_all(scope, &selector),
			None => Vec::new(),
		}
	}

	pub(crate) fn remove(&self, instruction: &Instruction<D::Node>, all: bool) -> bool {
		let scope = instruction.parent_el.as_ref();
		let mut removed = false;
		for target in instruction.targets(instruction.component.has_locator_hints()) {
			let (mut matches, description) = match &*target {
				Target::Locator(selector) => (self.query_all(scope, selector), format!("{:?}", selector)),
				Target::Component(component) => (self.locate(component, scope, true), describe(component)),
			};
			if matches.is_empty() {
				warn!("Nothing matches {}; nothing to remove.", description);
				continue;
			}
			if !all {
				matches.truncate(1);
			}
			trace!("Removing {} element(s) matching {}.", matches.len(), description);
			for node in &matches {
				self.document.remove(node);
			}
			removed = true;
		}
		removed
	}
}

pub(crate) fn locator_selector(component: &Component, by_type: bool) -> Option<String> {
	if let Some(id) = &component.id {
		Some(format!("[id=\"{}\"]", escape_css_string(id)))
	} else if let Some(selector) = &component.selector {
		Some(selector.clone())
	} else if let Some(name) = &component.name {
		Some(format!("[name=\"{}\"]", escape_css_string(name)))
	} else {
		match component.kind.as_deref() {
			Some(kind) if by_type && kind != "html" => Some(kind.to_owned()),
			_ => None,
		}
	}
}

/// Escapes `value` for use inside a double-quoted CSS string.
pub(crate) fn escape_css_string(value: &str) -> String {
	value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// `<type id=… name=…>` or similar, for log messages.
pub(crate) fn describe(component: &Component) -> String {
	let mut description = format!("<{}", component.kind.as_deref().unwrap_or("*"));
	if let Some(id) = &component.id {
		description.push_str(&format!(" id={:?}", id));
	}
	if let Some(name) = &component.name {
		description.push_str(&format!(" name={:?}", name));
	}
	if let Some(selector) = &component.selector {
		description.push_str(&format!(" selector={:?}", selector));
	}
	description.push('>');
	description
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn hint_priority() {
		let component = Component {
			kind: Some("p".to_owned()),
			name: Some("n".to_owned()),
			selector: Some(".s".to_owned()),
			id: Some("i".to_owned()),
			..Component::default()
		};
		assert_eq!(locator_selector(&component, true).as_deref(), Some(r#"[id="i"]"#));

		let by_name = Component { id: None, selector: None, ..component.clone() };
		assert_eq!(locator_selector(&by_name, true).as_deref(), Some(r#"[name="n"]"#));

		let by_type = Component::new("p");
		assert_eq!(locator_selector(&by_type, true).as_deref(), Some("p"));
		assert_eq!(locator_selector(&by_type, false), None);
		assert_eq!(locator_selector(&Component::new("html"), true), None);
	}

	#[test]
	fn quotes_are_escaped() {
		assert_eq!(locator_selector(&Component::default().with_id(r#"a"b\c"#), true).as_deref(), Some(r#"[id="a\"b\\c"]"#));
	}
}
