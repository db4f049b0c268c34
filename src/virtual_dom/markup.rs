//! Tolerant HTML fragment parsing and serialization for [`VirtualDocument`](`super::VirtualDocument`).

use super::{NodeKind, ScriptState, VNode, RAW_TEXT_ELEMENTS, VOID_ELEMENTS};
use crate::{
	host::{HTML_NAMESPACE, SVG_NAMESPACE},
	sanitize::{decode_entities, escape_html, parse_attributes},
};

/// Parses `markup` into detached nodes. Scripts in the result are inert.
pub(super) fn parse_fragment(markup: &str, svg_context: bool) -> Vec<VNode> {
	let mut roots = Vec::new();
	let mut open: Vec<VNode> = Vec::new();
	let mut rest = markup;

	while !rest.is_empty() {
		let lt = match rest.find('<') {
			Some(lt) => lt,
			None => {
				attach(&mut roots, &open, VNode::text(decode_entities(rest)));
				break;
			}
		};
		if lt > 0 {
			attach(&mut roots, &open, VNode::text(decode_entities(&rest[..lt])));
			rest = &rest[lt..];
		}

		if let Some(comment) = rest.strip_prefix("<!--") {
			let (text, after) = comment.split_once("-->").unwrap_or((comment, ""));
			attach(&mut roots, &open, VNode::comment(text));
			rest = after;
		} else if rest.starts_with("<!") || rest.starts_with("<?") {
			rest = rest.split_once('>').map_or("", |(_, after)| after);
		} else if let Some(closing) = rest.strip_prefix("</") {
			let (name, after) = closing.split_once('>').unwrap_or((closing, ""));
			let name = name.trim();
			if let Some(index) = open.iter().rposition(|node| node.local_name().map_or(false, |open_name| open_name.eq_ignore_ascii_case(name))) {
				open.truncate(index);
			}
			rest = after;
		} else if rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
			let end = tag_end(rest);
			let inner = &rest[1..end];
			rest = rest.get(end + 1..).unwrap_or("");

			let self_closing = inner.trim_end().ends_with('/');
			let name_end = inner.find(|c: char| c.is_whitespace() || c == '/').unwrap_or(inner.len());
			let raw_name = &inner[..name_end];

			let in_svg = match open.last() {
				Some(parent) => parent.namespace().as_deref() == Some(SVG_NAMESPACE) && parent.local_name().as_deref() != Some("foreignObject"),
				None => svg_context,
			};
			let (namespace, name) = if in_svg || raw_name.eq_ignore_ascii_case("svg") {
				(SVG_NAMESPACE, raw_name.to_owned())
			} else {
				(HTML_NAMESPACE, raw_name.to_ascii_lowercase())
			};
			let script = if namespace == HTML_NAMESPACE && name == "script" { ScriptState::Inert } else { ScriptState::NotScript };
			let element = VNode::element(namespace, &name, script);
			for (attribute, value) in parse_attributes(&inner[name_end..]) {
				let value = value.map(|value| decode_entities(&value)).unwrap_or_default();
				// Duplicate or malformed attributes are dropped, as an HTML parser would.
				if element.attribute(&attribute).is_none() && !attribute.is_empty() {
					let _ = element.set_attribute_raw(&attribute, &value);
				}
			}
			attach(&mut roots, &open, element.clone());

			let html = namespace == HTML_NAMESPACE;
			if self_closing || (html && VOID_ELEMENTS.contains(&name.as_str())) {
				continue;
			}
			if html && RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
				let close = find_ascii_case_insensitive(rest, &format!("</{}", name)).unwrap_or(rest.len());
				if close > 0 {
					let text = &rest[..close];
					let text = if name == "script" || name == "style" { text.to_owned() } else { decode_entities(text) };
					element.push_child(VNode::text(text));
				}
				rest = rest[close..].split_once('>').map_or("", |(_, after)| after);
				continue;
			}
			open.push(element);
		} else {
			attach(&mut roots, &open, VNode::text("<"));
			rest = &rest[1..];
		}
	}

	roots
}

fn attach(roots: &mut Vec<VNode>, open: &[VNode], node: VNode) {
	match open.last() {
		Some(parent) => parent.push_child(node),
		None => roots.push(node),
	}
}

/// Index of the `>` closing the tag that starts `source`, honouring quoted attribute values.
fn tag_end(source: &str) -> usize {
	let mut quote = None;
	for (i, c) in source.char_indices() {
		match (quote, c) {
			(None, '"' | '\'') => quote = Some(c),
			(Some(q), c) if q == c => quote = None,
			(None, '>') => return i,
			_ => (),
		}
	}
	source.len()
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
	haystack.to_ascii_lowercase().find(&needle.to_ascii_lowercase())
}


pub(super) fn serialize(node: &VNode, out: &mut String, raw_text: bool) {
	let data = node.0.borrow();
	match &data.kind {
		NodeKind::Text(text) if raw_text => out.push_str(text),
		NodeKind::Text(text) => out.push_str(&text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")),
		NodeKind::Comment(comment) => {
			out.push_str("<!--");
			out.push_str(comment);
			out.push_str("-->");
		}
		NodeKind::Element(element) => {
			out.push('<');
			out.push_str(&element.local_name);
			for attribute in &element.attributes {
				out.push(' ');
				out.push_str(&attribute.name);
				out.push_str("=\"");
				out.push_str(&escape_html(&attribute.value));
				out.push('"');
			}
			out.push('>');

			let html = element.namespace == HTML_NAMESPACE;
			if html && VOID_ELEMENTS.contains(&element.local_name.as_str()) {
				return;
			}
			let raw = html && RAW_TEXT_ELEMENTS.contains(&element.local_name.as_str());
			for child in &data.children {
				serialize(child, out, raw);
			}
			out.push_str("</");
			out.push_str(&element.local_name);
			out.push('>');
		}
	}
}
