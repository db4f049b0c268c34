//! Bundled CommonMark renderer for `slotMarkdown`.

use pulldown_cmark::{html, Options, Parser};

/// Renders `markdown` to HTML with tables and strikethrough enabled.
///
/// The output isn't sanitized; the engine runs its sanitizer afterwards.
#[must_use]
pub fn render(markdown: &str) -> String {
	let mut options = Options::empty();
	options.insert(Options::ENABLE_TABLES);
	options.insert(Options::ENABLE_STRIKETHROUGH);
	let parser = Parser::new_ext(markdown, options);
	let mut out = String::with_capacity(markdown.len() * 3 / 2);
	html::push_html(&mut out, parser);
	out
}
