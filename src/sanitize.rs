//! A small allow-list sanitizer usable as the engine's sanitizer collaborator.
//!
//! ```
//! use descriptor_dom::{sanitize, EngineConfig};
//!
//! let config = EngineConfig::new().with_sanitizer(sanitize::basic);
//! # drop(config);
//! ```

use crate::config::SanitizeOptions;

const ALLOWED_TAGS: &[&str] = &[
	"a", "abbr", "b", "blockquote", "br", "caption", "code", "dd", "del", "div", "dl", "dt", "em", "embed", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "i", "img", "li", "ol", "p", "pre", "s", "small", "span", "strong", "sub", "sup", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "u", "ul", "video",
];

const ALLOWED_ATTRIBUTES: &[&str] = &["alt", "class", "colspan", "controls", "download", "href", "id", "name", "rowspan", "src", "title", "type"];

const URL_ATTRIBUTES: &[&str] = &["href", "src"];

/// Keeps allowed tags and attributes; escapes every other tag so it displays as text.
///
/// `on*` attributes and `javascript:` URLs are always dropped, even if allowed by `options`.
/// `data-*` and `aria-*` attributes are kept.
#[must_use]
pub fn basic(markup: &str, options: &SanitizeOptions) -> String {
	let tag_allowed = |tag: &str| ALLOWED_TAGS.contains(&tag) || options.extra_tags.iter().any(|extra| extra.eq_ignore_ascii_case(tag));
	let attribute_allowed = |name: &str| {
		!name.starts_with("on")
			&& (ALLOWED_ATTRIBUTES.contains(&name)
				|| name.starts_with("data-")
				|| name.starts_with("aria-")
				|| options.extra_attribs.iter().any(|extra| extra.eq_ignore_ascii_case(name)))
	};

	let mut out = String::with_capacity(markup.len());
	let mut rest = markup;
	while let Some(start) = rest.find('<') {
		out.push_str(&rest[..start]);
		rest = &rest[start..];

		let end = match rest.find('>') {
			Some(end) => end,
			None => break,
		};
		let inner = &rest[1..end];
		let closing = inner.starts_with('/');
		let inner = inner.trim_start_matches('/');
		let tag_end = inner.find(|c: char| c.is_whitespace() || c == '/').unwrap_or(inner.len());
		let tag = inner[..tag_end].to_ascii_lowercase();

		if tag.is_empty() || !tag_allowed(&tag) {
			out.push_str("&lt;");
			rest = &rest[1..];
			continue;
		}

		if closing {
			out.push_str("</");
			out.push_str(&tag);
			out.push('>');
		} else {
			out.push('<');
			out.push_str(&tag);
			for (name, value) in parse_attributes(&inner[tag_end..]) {
				let value = value.map(|value| decode_entities(&value));
				if !attribute_allowed(&name) {
					continue;
				}
				if URL_ATTRIBUTES.contains(&name.as_str()) && value.as_deref().map_or(false, is_script_url) {
					continue;
				}
				out.push(' ');
				out.push_str(&name);
				if let Some(value) = value {
					out.push_str("=\"");
					out.push_str(&escape_attribute(&value));
					out.push('"');
				}
			}
			if inner.trim_end().ends_with('/') {
				out.push_str(" /");
			}
			out.push('>');
		}
		rest = &rest[end + 1..];
	}
	out.push_str(&rest.replace('<', "&lt;"));
	out
}

fn is_script_url(url: &str) -> bool {
	let compact: String = url.chars().filter(|c| !c.is_whitespace() && !c.is_control()).collect();
	compact.to_ascii_lowercase().starts_with("javascript:")
}

/// Lowercased attribute names with their unquoted values.
pub(crate) fn parse_attributes(source: &str) -> Vec<(String, Option<String>)> {
	let mut attributes = Vec::new();
	let mut chars = source.char_indices().peekable();
	while let Some(&(start, c)) = chars.peek() {
		if c.is_whitespace() || c == '/' {
			chars.next();
			continue;
		}

		let mut name_end = start;
		while let Some(&(i, c)) = chars.peek() {
			if c.is_whitespace() || c == '=' || c == '/' {
				break;
			}
			name_end = i + c.len_utf8();
			chars.next();
		}
		let name = source[start..name_end].to_ascii_lowercase();

		while matches!(chars.peek(), Some(&(_, c)) if c.is_whitespace()) {
			chars.next();
		}
		if !matches!(chars.peek(), Some(&(_, '='))) {
			attributes.push((name, None));
			continue;
		}
		chars.next();
		while matches!(chars.peek(), Some(&(_, c)) if c.is_whitespace()) {
			chars.next();
		}

		let mut value = String::new();
		match chars.peek() {
			Some(&(_, quote)) if quote == '"' || quote == '\'' => {
				chars.next();
				for (_, c) in chars.by_ref() {
					if c == quote {
						break;
					}
					value.push(c);
				}
			}
			_ => {
				while let Some(&(_, c)) = chars.peek() {
					if c.is_whitespace() {
						break;
					}
					value.push(c);
					chars.next();
				}
			}
		}
		attributes.push((name, Some(value)));
	}
	attributes
}

#[must_use]
pub fn escape_html(text: &str) -> String {
	text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

fn escape_attribute(value: &str) -> String {
	value.replace('&', "&amp;").replace('"', "&quot;")
}

/// Decodes character references; unknown ones stay as written.
pub(crate) fn decode_entities(text: &str) -> String {
	if !text.contains('&') {
		return text.to_owned();
	}

	let mut out = String::with_capacity(text.len());
	let mut rest = text;
	while let Some(amp) = rest.find('&') {
		out.push_str(&rest[..amp]);
		rest = &rest[amp..];
		let decoded = rest.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
			let entity = &rest[1..semi];
			let c = match entity {
				"amp" => Some('&'),
				"lt" => Some('<'),
				"gt" => Some('>'),
				"quot" => Some('"'),
				"apos" | "#39" => Some('\''),
				"nbsp" => Some('\u{a0}'),
				_ => entity
					.strip_prefix("#x")
					.or_else(|| entity.strip_prefix("#X"))
					.map(|hex| u32::from_str_radix(hex, 16))
					.or_else(|| entity.strip_prefix('#').map(str::parse))
					.and_then(Result::ok)
					.and_then(char::from_u32),
			};
			c.map(|c| (c, semi))
		});
		match decoded {
			Some((c, semi)) => {
				out.push(c);
				rest = &rest[semi + 1..];
			}
			None => {
				out.push('&');
				rest = &rest[1..];
			}
		}
	}
	out.push_str(rest);
	out
}
