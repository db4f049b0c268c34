//! `load`: attaches external or inline scripts and stylesheets to the document head.

use crate::{
	descriptor::{Instruction, ScriptResource, StyleResource},
	engine::{succeeded, Engine},
	host::Document,
	locate::escape_css_string,
};
use tracing::{error, trace, warn};

impl<D: Document> Engine<D> {
	pub(crate) fn load_resources(&self, instruction: &Instruction<D::Node>) -> bool {
		if instruction.scripts.is_empty() && instruction.styles.is_empty() {
			warn!("`load` without `scripts` or `styles`; nothing to load.");
			return false;
		}
		let head = match self.document.head().or_else(|| self.document.body()) {
			Some(head) => head,
			None => {
				error!("The document has neither <head> nor <body> to load resources into.");
				return false;
			}
		};

		let mut loaded = false;
		for script in &instruction.scripts {
			loaded |= self.load_script(&head, script);
		}
		for style in &instruction.styles {
			loaded |= self.load_style(&head, style);
		}
		loaded
	}

	fn load_script(&self, head: &D::Node, script: &ScriptResource) -> bool {
		if let Some(src) = &script.src {
			if self.query_first(None, &format!("script[src=\"{}\"]", escape_css_string(src))).is_some() {
				trace!("Script {:?} is already loaded.", src);
				return false;
			}
		} else if script.text.is_none() {
			warn!("Script resource without `src` or `text`; skipping it.");
			return false;
		}

		let element = match self.document.create_element("script") {
			Ok(element) => element,
			Err(error) => {
				error!("{}", error);
				return false;
			}
		};
		if script.module {
			succeeded(self.document.set_attribute(&element, "type", "module"), "mark a module script");
		}
		match (&script.src, &script.text) {
			(Some(src), _) => {
				succeeded(self.document.set_attribute(&element, "src", src), "set a script source");
			}
			(None, Some(text)) => self.document.set_text_content(&element, text),
			(None, None) => (),
		}
		succeeded(self.document.insert_before(head, &element, None), "attach a script")
	}

	fn load_style(&self, head: &D::Node, style: &StyleResource) -> bool {
		let element = match (&style.href, &style.text) {
			(Some(href), _) => {
				if self.query_first(None, &format!("link[href=\"{}\"]", escape_css_string(href))).is_some() {
					trace!("Stylesheet {:?} is already loaded.", href);
					return false;
				}
				let link = match self.document.create_element("link") {
					Ok(link) => link,
					Err(error) => {
						error!("{}", error);
						return false;
					}
				};
				succeeded(self.document.set_attribute(&link, "rel", "stylesheet"), "mark a stylesheet link");
				succeeded(self.document.set_attribute(&link, "href", href), "set a stylesheet reference");
				link
			}
			(None, Some(text)) => {
				let element = match self.document.create_element("style") {
					Ok(element) => element,
					Err(error) => {
						error!("{}", error);
						return false;
					}
				};
				self.document.set_text_content(&element, text);
				element
			}
			(None, None) => {
				warn!("Style resource without `href` or `text`; skipping it.");
				return false;
			}
		};
		succeeded(self.document.insert_before(head, &element, None), "attach a stylesheet")
	}
}
