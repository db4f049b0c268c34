use descriptor_dom::{Column, Document, Engine, EngineConfig, RowOptions, RowRef, TableError, TableOptions, TableRef, VirtualDocument};
use pretty_assertions::assert_eq;
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn engine() -> Engine<VirtualDocument> {
	let _ = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).with_test_writer().try_init();
	let engine = Engine::new(VirtualDocument::new(), EngineConfig::new());
	engine.apply_json(r#"{ "method": "add", "components": [{ "type": "div", "id": "host" }] }"#).unwrap();
	engine
}

fn placed(id: &str) -> TableOptions {
	TableOptions {
		id: Some(id.to_owned()),
		parent: Some("#host".to_owned()),
		..TableOptions::default()
	}
}

#[test]
fn rows_of_objects() {
	let engine = engine();
	let table = engine.build_table(&json!([{ "a": 1, "b": 2 }, { "a": 3, "b": 4 }]), &TableOptions::default()).unwrap();

	assert_eq!(
		engine.document().outer_html(&table),
		concat!(
			"<table>",
			r#"<thead><tr data-header-row=""><th scope="col" data-name="a" data-key="a">a</th><th scope="col" data-name="b" data-key="b">b</th></tr></thead>"#,
			"<tbody><tr><td>1</td><td>2</td></tr><tr><td>3</td><td>4</td></tr></tbody>",
			"</table>",
		)
	);
	// Without a parent, the table stays detached.
	assert!(!engine.document().is_connected(&table));
}

#[test]
fn large_tables_still_build() {
	let engine = engine();
	let data: Vec<_> = (0..1001).map(|n| json!({ "n": n })).collect();
	engine.build_table(&json!(data), &placed("big")).unwrap();

	let document = engine.document();
	let rows = document.query_selector_all(None, "#big tbody > tr").unwrap();
	assert_eq!(rows.len(), 1001);
	assert_eq!(document.text_content(&rows[1000]), "1000");
}

#[test]
fn rows_by_name_and_caption() {
	let engine = engine();
	let options = TableOptions {
		caption: Some("Stock".to_owned()),
		attributes: json!({ "class": "grid" }).as_object().cloned().unwrap(),
		..placed("t")
	};
	engine.build_table(&json!({ "apples": [3, "red"], "pears": [5, "green"] }), &options).unwrap();

	let document = engine.document();
	assert_eq!(
		document.inner_html(&document.get_element_by_id("host").unwrap()),
		concat!(
			r#"<table class="grid" id="t"><caption>Stock</caption>"#,
			r#"<thead><tr data-header-row=""><th scope="col" data-key="0">1</th><th scope="col" data-key="1">2</th></tr></thead>"#,
			r#"<tbody><tr data-row-name="apples"><td>3</td><td>red</td></tr><tr data-row-name="pears"><td>5</td><td>green</td></tr></tbody>"#,
			"</table>",
		)
	);
}

#[test]
fn explicit_columns() {
	let engine = engine();
	let cols: Vec<Column> = serde_json::from_value(json!([{ "name": "qty", "title": "Quantity", "dataType": "number", "editable": true }, { "name": "item" }])).unwrap();
	let table = engine
		.build_table(&json!([{ "item": "nails", "qty": 40, "ignored": true }]), &TableOptions { cols: Some(cols), ..placed("t") })
		.unwrap();

	let document = engine.document();
	let cells: Vec<String> = document.query_selector_all(Some(&table), "tbody td").unwrap().iter().map(|cell| document.outer_html(cell)).collect();
	assert_eq!(cells, vec![r#"<td contenteditable="true">40</td>"#.to_owned(), "<td>nails</td>".to_owned()]);

	let columns = engine.table_columns("#t".into()).unwrap();
	assert_eq!(columns.iter().map(|c| c.title.as_str()).collect::<Vec<_>>(), vec!["Quantity", "item"]);
	assert_eq!(columns[0].data_type.as_deref(), Some("number"));
}

#[test]
fn add_and_remove_rows() {
	let engine = engine();
	let document = engine.document();
	let table = engine.build_table(&json!([{ "a": 1, "b": 2 }]), &placed("t")).unwrap();

	engine.add_row("#t".into(), &json!({ "b": 6, "a": 5 }), &RowOptions { name: Some("five".to_owned()), ..RowOptions::default() }).unwrap();
	engine.add_row(TableRef::Node(&table), &json!({ "a": 0, "b": 0 }), &RowOptions { position: Some(descriptor_dom::Position::First), ..RowOptions::default() }).unwrap();

	let body = document.query_selector(Some(&table), "tbody").unwrap().unwrap();
	assert_eq!(
		document.inner_html(&body),
		r#"<tr><td>0</td><td>0</td></tr><tr><td>1</td><td>2</td></tr><tr data-row-name="five"><td>5</td><td>6</td></tr>"#
	);

	let removed = engine.remove_row("#t".into(), RowRef::Name("five")).unwrap();
	assert!(!document.is_connected(&removed));
	engine.remove_row("#t".into(), RowRef::Index(0)).unwrap();
	assert_eq!(document.inner_html(&body), "<tr><td>1</td><td>2</td></tr>");
}

#[test]
fn columns_are_recovered_from_markup() {
	let engine = engine();
	let document = engine.document();
	let host = document.get_element_by_id("host").unwrap();
	document
		.replace_children_with_markup(&host, r#"<table id="m"><thead><tr><th data-name="x">X</th><th>Y</th></tr></thead></table>"#)
		.unwrap();

	let columns = engine.table_columns("#m".into()).unwrap();
	assert_eq!(columns.len(), 2);
	assert_eq!(columns[0].name.as_deref(), Some("x"));
	assert_eq!(columns[0].title, "X");
	assert_eq!(columns[1].key.as_deref(), Some("1"));
	assert!(!columns[1].has_name);

	let row = engine.add_row("#m".into(), &json!({ "x": "by name", "1": "by key" }), &RowOptions::default()).unwrap();
	assert_eq!(document.outer_html(&row), "<tr><td>by name</td><td>by key</td></tr>");
	assert_eq!(document.query_selector_all(Some(&document.get_element_by_id("m").unwrap()), "tbody").unwrap().len(), 1);
}

#[test]
fn errors() {
	let engine = engine();

	assert_eq!(engine.build_table(&json!("rows"), &TableOptions::default()).unwrap_err(), TableError::InvalidData);
	assert_eq!(
		engine
			.build_table(&json!([]), &TableOptions {
				parent: Some("#host".to_owned()),
				..TableOptions::default()
			})
			.unwrap_err(),
		TableError::MissingId { parent: "#host".to_owned() }
	);
	assert_eq!(
		engine
			.build_table(&json!([]), &TableOptions {
				parent: Some("#nowhere".to_owned()),
				..placed("t")
			})
			.unwrap_err(),
		TableError::ParentNotFound { selector: "#nowhere".to_owned() }
	);
	assert_eq!(engine.document().inner_html(&engine.document().get_element_by_id("host").unwrap()), "");

	assert_eq!(engine.table_columns("#missing".into()).unwrap_err(), TableError::TableNotFound { locator: "#missing".to_owned() });
	assert_eq!(engine.add_row("#host".into(), &json!([1]), &RowOptions::default()).unwrap_err(), TableError::NotATable { found: "div".to_owned() });

	engine.build_table(&json!([[1]]), &placed("t")).unwrap();
	assert_eq!(engine.remove_row("#t".into(), RowRef::Index(3)).unwrap_err(), TableError::RowNotFound { row: "3".to_owned() });
	assert!(matches!(engine.table_columns("[".into()), Err(TableError::Host(_))));
}
