use core::{cell::RefCell, time::Duration};
use descriptor_dom::{Component, Document, Engine, EngineConfig, ToastConfig, ToastOptions, UiEvent, VirtualDocument};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

const CONTAINER: &str = "descriptor-dom-toasts";

fn init_logging() {
	let _ = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).with_test_writer().try_init();
}

fn engine_with(config: EngineConfig) -> Engine<VirtualDocument> {
	init_logging();
	Engine::new(VirtualDocument::new(), config)
}

fn apply(engine: &Engine<VirtualDocument>, batch: Value) {
	engine.apply_json(&batch.to_string()).unwrap();
}

fn toast_texts(document: &VirtualDocument) -> Vec<String> {
	document
		.get_element_by_id(CONTAINER)
		.map(|container| document.children(&container).iter().map(|panel| document.text_content(panel)).collect())
		.unwrap_or_default()
}

#[test]
fn notifications_hide_themselves() {
	let engine = engine_with(EngineConfig::new());
	let document = engine.document();

	apply(&engine, json!({ "method": "notify", "slot": "saved" }));
	let container = document.get_element_by_id(CONTAINER).unwrap();
	assert_eq!(document.get_attribute(&container, "aria-live").as_deref(), Some("polite"));
	let panel = document.children(&container).remove(0);
	assert_eq!(document.get_attribute(&panel, "class").as_deref(), Some("descriptor-dom-toast"));
	assert_eq!(document.get_attribute(&panel, "role").as_deref(), Some("status"));
	assert_eq!(toast_texts(document), vec!["saved".to_owned()]);
	assert_eq!(document.pending_timers(), 1);

	document.advance(Duration::from_secs(9));
	assert_eq!(toast_texts(document), vec!["saved".to_owned()]);
	document.advance(Duration::from_secs(1));
	assert!(document.get_element_by_id(CONTAINER).is_none());
}

#[test]
fn newest_toast_goes_on_top_unless_appended() {
	let engine = engine_with(EngineConfig::new());
	let document = engine.document();

	apply(&engine, json!({ "method": "notify", "slot": "one" }));
	apply(&engine, json!({ "method": "notify", "slot": "two" }));
	apply(&engine, json!({ "method": "notify", "slot": "three", "appendToast": true }));
	assert_eq!(toast_texts(document), vec!["two".to_owned(), "one".to_owned(), "three".to_owned()]);
}

#[test]
fn instruction_delay_overrides_the_default() {
	let engine = engine_with(EngineConfig::new().with_toast(ToastConfig {
		default_delay: Duration::from_secs(60),
		..ToastConfig::default()
	}));
	let document = engine.document();

	apply(&engine, json!({ "method": "notify", "slot": "quick", "delay": 500 }));
	apply(&engine, json!({ "method": "notify", "slot": "slow" }));
	document.advance(Duration::from_millis(500));
	assert_eq!(toast_texts(document), vec!["slow".to_owned()]);
	document.advance(Duration::from_secs(60));
	assert!(toast_texts(document).is_empty());
}

#[test]
fn alerts_are_modal_and_stay() {
	let engine = engine_with(EngineConfig::new());
	let document = engine.document();

	let panel = engine.alert(&Component::default().with_slot("careful"), ToastOptions::default()).unwrap();
	assert_eq!(document.text_content(&panel), "\u{26a0}\u{fe0f} careful");
	assert_eq!(document.get_attribute(&panel, "class").as_deref(), Some("descriptor-dom-toast descriptor-dom-alert"));
	assert_eq!(document.get_attribute(&panel, "role").as_deref(), Some("alertdialog"));
	assert_eq!(document.get_attribute(&panel, "aria-modal").as_deref(), Some("true"));
	assert_eq!(document.pending_timers(), 0);

	document.click(&panel);
	assert!(document.get_element_by_id(CONTAINER).is_none());
}

#[test]
fn alert_payload_is_its_message() {
	let engine = engine_with(EngineConfig::new());
	apply(&engine, json!({ "method": "alert", "payload": "from payload" }));
	assert_eq!(toast_texts(engine.document()), vec!["\u{26a0}\u{fe0f} from payload".to_owned()]);
}

#[test]
fn toasts_keep_their_own_classes() {
	let engine = engine_with(EngineConfig::new());
	let panel = engine
		.notify(&Component::new("section").with_attribute("class", "success").with_slot("ok"), ToastOptions {
			auto_hide: Some(false),
			..ToastOptions::default()
		})
		.unwrap();

	let document = engine.document();
	assert_eq!(document.tag_name(&panel), "section");
	assert_eq!(document.get_attribute(&panel, "class").as_deref(), Some("descriptor-dom-toast success"));
	assert_eq!(document.pending_timers(), 0);
}

#[test]
fn clicking_the_container_clears_all() {
	let engine = engine_with(EngineConfig::new());
	let document = engine.document();
	for text in ["a", "b"] {
		engine.notify(&Component::default().with_slot(text), ToastOptions::default());
	}

	let container = document.get_element_by_id(CONTAINER).unwrap();
	document.click(&container);
	assert!(document.get_element_by_id(CONTAINER).is_none());

	// Stale timers are harmless, and a new toast gets a fresh container.
	document.advance(Duration::from_secs(10));
	engine.notify(&Component::default().with_slot("c"), ToastOptions::default());
	assert_eq!(toast_texts(document), vec!["c".to_owned()]);
}

#[test]
fn registered_handlers_bind_once() {
	let clicks = Rc::new(RefCell::new(Vec::<UiEvent>::new()));
	let engine = engine_with(EngineConfig::new().with_handler("count", {
		let clicks = Rc::clone(&clicks);
		move |event: &UiEvent| clicks.borrow_mut().push(event.clone())
	}));
	let document = engine.document();

	apply(&engine, json!({ "method": "add", "components": [{ "type": "button", "id": "b", "events": { "click": "count", "dblclick": "unknown" } }] }));
	apply(&engine, json!({ "method": "update", "id": "b", "events": { "click": "count" } }));

	document.click(&document.get_element_by_id("b").unwrap());
	assert_eq!(
		*clicks.borrow(),
		vec![UiEvent {
			kind: "click".to_owned(),
			target_id: Some("b".to_owned()),
			current_target_id: Some("b".to_owned()),
		}]
	);
}

#[test]
fn value_properties_notify_listeners() {
	let changes = Rc::new(RefCell::new(0));
	let engine = engine_with(EngineConfig::new().with_handler("changed", {
		let changes = Rc::clone(&changes);
		move |_: &UiEvent| *changes.borrow_mut() += 1
	}));
	let document = engine.document();

	apply(&engine, json!({ "method": "add", "components": [{ "type": "input", "id": "i", "events": { "change": "changed" }, "properties": { "value": "v" } }] }));
	let input = document.get_element_by_id("i").unwrap();
	assert_eq!(document.property(&input, "value"), Some(json!("v")));
	assert_eq!(document.get_attribute(&input, "value"), None);
	assert_eq!(*changes.borrow(), 1);

	apply(&engine, json!({ "method": "update", "id": "i", "attributes": { "value": "w" } }));
	assert_eq!(document.property(&input, "value"), Some(json!("w")));
	assert_eq!(document.get_attribute(&input, "value").as_deref(), Some("w"));
}

#[test]
fn resources_load_once() {
	let engine = engine_with(EngineConfig::new());
	let document = engine.document();
	let load = json!({
		"method": "load",
		"scripts": [{ "src": "/a.js" }, { "text": "inline()", "module": true }],
		"styles": [{ "href": "/s.css" }, { "text": "p { color: red }" }],
	});

	apply(&engine, load.clone());
	assert_eq!(document.executed_scripts(), vec!["/a.js".to_owned(), "inline()".to_owned()]);
	let head = document.head().unwrap();
	assert_eq!(
		document.inner_html(&head),
		r#"<script src="/a.js"></script><script type="module">inline()</script><link rel="stylesheet" href="/s.css"><style>p { color: red }</style>"#
	);

	apply(&engine, load);
	assert_eq!(document.query_selector_all(None, r#"script[src="/a.js"]"#).unwrap().len(), 1);
	assert_eq!(document.query_selector_all(None, "link").unwrap().len(), 1);
}

#[test]
fn documents_with_toasts_can_be_dropped() {
	let engine = engine_with(EngineConfig::new());
	apply(&engine, json!([{ "method": "notify", "slot": "saved" }, { "method": "alert", "slot": "careful" }]));
	let document = engine.document().downgrade();
	let panel = {
		let document = engine.document();
		let container = document.get_element_by_id(CONTAINER).unwrap();
		VirtualDocument::downgrade_node(&document.children(&container)[0])
	};

	drop(engine);
	assert!(VirtualDocument::upgrade(&document).is_none());
	assert!(VirtualDocument::upgrade_node(&panel).is_none());
}
