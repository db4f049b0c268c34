use descriptor_dom::{host::SVG_NAMESPACE, BatchReport, Component, Document, Engine, EngineConfig, EngineError, Instruction, Method, RequestContext, VNode, VirtualDocument};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

fn init_logging() {
	let _ = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).with_test_writer().try_init();
}

fn engine() -> Engine<VirtualDocument> {
	init_logging();
	Engine::new(VirtualDocument::new(), EngineConfig::new())
}

fn apply(engine: &Engine<VirtualDocument>, batch: Value) -> BatchReport {
	engine.apply_json(&batch.to_string()).unwrap()
}

const fn report(applied: usize, skipped: usize) -> BatchReport {
	BatchReport { applied, skipped }
}

#[test]
fn add_update_remove() {
	let engine = engine();
	let document = engine.document();

	let added = apply(&engine, json!({ "method": "add", "components": [{ "type": "p", "id": "x", "slot": "hi" }] }));
	assert_eq!(added, report(1, 0));
	assert_eq!(document.body_html(), r#"<p id="x">hi</p>"#);
	let x = document.get_element_by_id("x").unwrap();

	let updated = apply(&engine, json!({ "method": "update", "components": [{ "id": "x", "slot": "bye" }] }));
	assert_eq!(updated, report(1, 0));
	assert_eq!(document.body_html(), r#"<p id="x">bye</p>"#);
	assert_eq!(document.get_element_by_id("x").unwrap(), x);

	let removed = apply(&engine, json!({ "method": "remove", "components": ["#x"] }));
	assert_eq!(removed, report(1, 0));
	assert_eq!(document.get_element_by_id("x"), None);

	let again = apply(&engine, json!({ "method": "remove", "components": ["#x"] }));
	assert_eq!(again, report(0, 1));
	assert_eq!(document.body_html(), "");
}

#[test]
fn positions() {
	let engine = engine();
	apply(
		&engine,
		json!([
			{ "method": "add", "components": [{ "type": "ul", "id": "l", "components": [{ "type": "li", "slot": "b" }] }] },
			{ "method": "add", "parent": "#l", "components": [{ "type": "li", "slot": "a", "position": "first" }] },
			{ "method": "add", "components": [{ "type": "li", "slot": "d", "parent": "#l" }] },
			{ "method": "add", "components": [{ "type": "li", "slot": "c", "parent": "#l", "position": 2 }] },
			{ "method": "add", "components": [{ "type": "li", "slot": "e", "parent": "#l", "position": 10 }] },
		]),
	);
	assert_eq!(engine.document().body_html(), r#"<ul id="l"><li>a</li><li>b</li><li>c</li><li>d</li><li>e</li></ul>"#);
}

#[test]
fn missing_parent_falls_back_to_body() {
	let engine = engine();
	let applied = apply(&engine, json!({ "method": "add", "components": [{ "type": "p", "parent": "#nowhere", "slot": "here" }] }));
	assert_eq!(applied, report(1, 0));
	assert_eq!(engine.document().body_html(), "<p>here</p>");
}

#[test]
fn parent_el_receives_new_nodes() {
	let engine = engine();
	let document = engine.document();
	apply(&engine, json!({ "method": "add", "components": [{ "type": "section", "id": "s" }, { "type": "aside" }] }));

	let section = document.get_element_by_id("s").unwrap();
	engine.apply_ui(Instruction::new(Method::Add).with_parent_el(section).with_component(Component::new("p").with_slot("inside")));
	assert_eq!(document.body_html(), r#"<section id="s"><p>inside</p></section><aside></aside>"#);
}

#[test]
fn replace_is_idempotent_and_degrades_to_add() {
	let engine = engine();
	let document = engine.document();
	apply(&engine, json!({ "method": "add", "components": [{ "type": "p", "id": "r", "slot": "one" }, { "type": "hr" }] }));

	for _ in 0..2 {
		let replaced = apply(&engine, json!({ "method": "replace", "components": [{ "type": "h2", "id": "r", "slot": "two" }] }));
		assert_eq!(replaced, report(1, 0));
	}
	assert_eq!(document.body_html(), r#"<h2 id="r">two</h2><hr>"#);

	apply(&engine, json!({ "method": "replace", "components": [{ "type": "span", "id": "new", "slot": "n" }] }));
	assert_eq!(document.body_html(), r#"<h2 id="r">two</h2><hr><span id="new">n</span>"#);
}

#[test]
fn update_miss_is_a_no_op() {
	let engine = engine();
	apply(&engine, json!({ "method": "add", "components": [{ "type": "p", "id": "x", "slot": "hi" }] }));

	let missed = apply(&engine, json!({ "method": "update", "components": [{ "id": "missing", "slot": "x" }] }));
	assert_eq!(missed, report(0, 1));
	assert_eq!(engine.document().body_html(), r#"<p id="x">hi</p>"#);
}

#[test]
fn flat_update_with_payload() {
	let engine = engine();
	apply(&engine, json!({ "method": "add", "components": [{ "type": "output", "id": "o" }] }));

	apply(&engine, json!({ "method": "update", "id": "o", "payload": 42 }));
	assert_eq!(engine.document().body_html(), r#"<output id="o">42</output>"#);

	let context = RequestContext {
		payload: Some(json!("from the request")),
		topic: Some("status".to_owned()),
	};
	let update: Instruction<VNode> = serde_json::from_value(json!({ "method": "update", "id": "o" })).unwrap();
	engine.apply_with_context(update, &context);
	assert_eq!(engine.document().body_html(), r#"<output id="o">from the request</output>"#);
}

#[test]
fn nested_update_propagates() {
	let engine = engine();
	let document = engine.document();
	apply(&engine, json!({ "method": "add", "components": [{ "type": "div", "id": "card", "components": [{ "type": "h1", "id": "t", "slot": "old" }] }] }));

	let applied = apply(
		&engine,
		json!({
			"method": "update",
			"components": [{
				"id": "card",
				"attributes": { "class": "open" },
				"components": [
					{ "id": "t", "slot": "new" },
					{ "type": "p", "method": "add", "slot": "more" },
				],
			}],
		}),
	);
	assert_eq!(applied, report(1, 0));
	assert_eq!(document.body_html(), r#"<div id="card" class="open"><h1 id="t">new</h1><p>more</p></div>"#);
}

#[test]
fn nested_update_is_scoped_to_its_parent() {
	let engine = engine();
	let document = engine.document();
	apply(
		&engine,
		json!({ "method": "add", "components": [
			{ "type": "div", "id": "a", "components": [{ "type": "span", "slot": "a" }] },
			{ "type": "div", "id": "b", "components": [{ "type": "span", "slot": "b" }] },
		] }),
	);

	apply(&engine, json!({ "method": "update", "components": [{ "id": "b", "components": [{ "type": "span", "slot": "B" }] }] }));
	assert_eq!(document.body_html(), r#"<div id="a"><span>a</span></div><div id="b"><span>B</span></div>"#);
}

#[test]
fn svg_namespace_reaches_every_descendant() {
	let engine = engine();
	let document = engine.document();
	apply(
		&engine,
		json!({ "method": "add", "components": [{
			"type": "svg",
			"id": "s",
			"attributes": { "viewBox": "0 0 10 10" },
			"components": [
				{ "type": "circle", "id": "c", "attributes": { "r": 5 } },
				{ "type": "foreignObject", "components": [{ "type": "g", "id": "g" }] },
			],
		}] }),
	);

	let namespace = |id: &str| document.namespace_uri(&document.get_element_by_id(id).unwrap());
	assert_eq!(namespace("s").as_deref(), Some(SVG_NAMESPACE));
	assert_eq!(namespace("c").as_deref(), Some(SVG_NAMESPACE));
	assert_eq!(namespace("g").as_deref(), Some(SVG_NAMESPACE));

	let svg = document.get_element_by_id("s").unwrap();
	assert_eq!(document.get_attribute(&svg, "viewBox").as_deref(), Some("0 0 10 10"));
	assert_eq!(document.get_attribute(&svg, "xmlns").as_deref(), Some(SVG_NAMESPACE));

	// Later additions into the svg inherit its namespace.
	apply(&engine, json!({ "method": "add", "components": [{ "type": "rect", "id": "r", "parent": "#s" }] }));
	assert_eq!(namespace("r").as_deref(), Some(SVG_NAMESPACE));
}

#[test]
fn html_children_inject_markup() {
	let engine = engine();
	apply(&engine, json!({ "method": "add", "components": [{ "type": "div", "id": "h", "components": [{ "type": "html", "slot": "<b>bold</b> text" }] }] }));
	assert_eq!(engine.document().body_html(), r#"<div id="h"><b>bold</b> text</div>"#);
}

#[test]
fn children_of_html_wrappers_inject_markup() {
	let engine = engine();
	apply(&engine, json!({ "method": "add", "components": [{ "type": "html", "id": "h", "components": [{ "type": "p", "slot": "<b>x</b>" }] }] }));
	assert_eq!(engine.document().body_html(), r#"<div id="h"><b>x</b></div>"#);
}

#[test]
fn attribute_values() {
	let engine = engine();
	let document = engine.document();
	apply(
		&engine,
		json!({ "method": "add", "components": [{
			"type": "div",
			"id": "a",
			"attributes": { "class": ["a", "b"], "hidden": true, "data-n": 3, "data-list": [1, 2] },
		}] }),
	);
	assert_eq!(document.body_html(), r#"<div class="a b" hidden="" data-n="3" data-list="1,2" id="a"></div>"#);

	apply(&engine, json!({ "method": "update", "id": "a", "attributes": { "hidden": false, "data-n": null } }));
	assert_eq!(document.body_html(), r#"<div class="a b" data-list="1,2" id="a"></div>"#);
}

#[test]
fn slot_scripts_run_once() {
	let engine = engine();
	let document = engine.document();
	apply(&engine, json!({ "method": "add", "components": [{ "type": "div", "slot": "<p>x</p><script>ran()</script>" }] }));
	assert_eq!(document.executed_scripts(), vec!["ran()".to_owned()]);
}

#[test]
fn sanitizer_runs_on_slots() {
	init_logging();
	let engine = Engine::new(VirtualDocument::new(), EngineConfig::new().with_sanitizer(descriptor_dom::sanitize::basic));
	let document = engine.document();
	apply(&engine, json!({ "method": "add", "components": [{ "type": "div", "id": "d", "slot": "<b onclick=\"x()\">hi</b><script>bad()</script>" }] }));

	assert!(document.executed_scripts().is_empty());
	let bold = document.query_selector(None, "#d b").unwrap().unwrap();
	assert_eq!(document.get_attribute(&bold, "onclick"), None);
	assert_eq!(document.text_content(&document.get_element_by_id("d").unwrap()), "hi<script>bad()</script>");
}

#[test]
fn markdown_slots() {
	init_logging();
	let plain = Engine::new(VirtualDocument::new(), EngineConfig::new());
	apply(&plain, json!({ "method": "add", "components": [{ "type": "div", "slotMarkdown": "**hi**" }] }));
	assert_eq!(plain.document().body_html(), "<div>**hi**</div>");

	let rendered = Engine::new(VirtualDocument::new(), EngineConfig::new().with_markdown(|markdown| format!("<em>{}</em>", markdown)));
	apply(&rendered, json!({ "method": "add", "components": [{ "type": "div", "slotMarkdown": "hi" }] }));
	assert_eq!(rendered.document().body_html(), "<div><em>hi</em></div>");
}

#[cfg(feature = "markdown")]
#[test]
fn bundled_markdown() {
	init_logging();
	let engine = Engine::new(VirtualDocument::new(), EngineConfig::new().with_default_markdown());
	apply(&engine, json!({ "method": "add", "components": [{ "type": "div", "slotMarkdown": "**hi**" }] }));
	let strong = engine.document().query_selector(None, "div > p > strong").unwrap().unwrap();
	assert_eq!(engine.document().text_content(&strong), "hi");
}

#[cfg(feature = "markdown")]
#[test]
fn sanitized_markdown_keeps_link_queries() {
	init_logging();
	let engine = Engine::new(VirtualDocument::new(), EngineConfig::new().with_default_markdown().with_sanitizer(descriptor_dom::sanitize::basic));
	apply(&engine, json!({ "method": "add", "components": [{ "type": "div", "slotMarkdown": "[x](/p?a=1&b=2)" }] }));
	let link = engine.document().query_selector(None, "div a").unwrap().unwrap();
	assert_eq!(engine.document().get_attribute(&link, "href").as_deref(), Some("/p?a=1&b=2"));
}

#[test]
fn remove_and_remove_all() {
	let engine = engine();
	let document = engine.document();
	apply(&engine, json!({ "method": "add", "components": [
		{ "type": "li", "attributes": { "class": "x" }, "slot": "1" },
		{ "type": "li", "attributes": { "class": "x" }, "slot": "2" },
		{ "type": "li", "attributes": { "class": "x" }, "slot": "3" },
	] }));

	apply(&engine, json!({ "method": "remove", "components": [".x"] }));
	assert_eq!(document.body_html(), r#"<li class="x">2</li><li class="x">3</li>"#);

	apply(&engine, json!({ "mode": "removeAll", "components": [{ "selector": ".x" }] }));
	assert_eq!(document.body_html(), "");
}

#[test]
fn flat_remove_by_name() {
	let engine = engine();
	apply(&engine, json!({ "method": "add", "components": [{ "type": "input", "name": "q" }, { "type": "input", "name": "r" }] }));
	apply(&engine, json!({ "method": "remove", "name": "q" }));
	assert_eq!(engine.document().body_html(), r#"<input name="r">"#);
}

#[test]
fn malformed_entries_are_skipped() {
	let engine = engine();
	let applied = apply(
		&engine,
		json!([
			{ "method": "explode" },
			{ "components": [{ "type": "p" }] },
			{ "method": "add", "components": [{ "type": "p", "slot": "kept" }] },
			{ "method": "add" },
		]),
	);
	assert_eq!(applied, report(1, 3));
	assert_eq!(engine.document().body_html(), "<p>kept</p>");
}

#[test]
fn mistyped_entries_do_not_sink_the_batch() {
	let engine = engine();
	let applied = apply(
		&engine,
		json!([
			{ "method": "add", "components": [{ "type": "p", "id": "ok" }] },
			{ "method": "add", "components": [{ "type": "p", "position": -1 }] },
			{ "method": "add", "attributes": "x" },
			"add",
		]),
	);
	assert_eq!(applied, report(1, 3));
	assert_eq!(engine.document().body_html(), r#"<p id="ok"></p>"#);
}

#[test]
fn malformed_batches_are_errors() {
	let engine = engine();
	assert!(matches!(engine.apply_json("{"), Err(EngineError::Parse(_))));
	assert_eq!(engine.document().body_html(), "");
}

#[test]
fn depth_limit() {
	init_logging();
	let engine = Engine::new(VirtualDocument::new(), EngineConfig::new().with_depth_limit(2));
	let mut component = Component::new("div").with_id("leaf");
	for level in 0..4 {
		component = Component::new("div").with_id(format!("level-{}", level)).with_child(component);
	}
	engine.apply_ui(Instruction::new(Method::Add).with_component(component));

	let document = engine.document();
	assert!(document.get_element_by_id("level-3").is_some());
	assert!(document.get_element_by_id("level-1").is_some());
	assert!(document.get_element_by_id("level-0").is_none());
	assert!(document.get_element_by_id("leaf").is_none());
}

#[test]
fn reload() {
	let engine = engine();
	assert_eq!(apply(&engine, json!({ "method": "reload" })), report(1, 0));
	assert_eq!(engine.document().reload_count(), 1);
}

#[test]
fn snapshot_round_trip() {
	let engine = engine();
	let card = Component::new("section")
		.with_id("card")
		.with_attribute("class", "c")
		.with_child(Component::new("h1").with_slot("Title"))
		.with_child(Component::new("p").with_slot("Body"));
	engine.apply_ui(Instruction::new(Method::Add).with_component(card.clone()));

	let document = engine.document();
	assert_eq!(descriptor_dom::load_component(document, &document.get_element_by_id("card").unwrap()), card);
}
