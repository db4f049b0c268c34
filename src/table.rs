//! The Table Builder.
//!
//! Tables are built from an array of rows or an object keyed by row name.
//! Unless columns are given explicitly, they are inferred from the first row,
//! and either way cached on the `<table>` so later row edits reuse them.

use crate::{
	descriptor::{value_text, Component, Position},
	engine::{succeeded, Engine},
	error::{HostError, TableError},
	host::Document,
	locate::escape_css_string,
};
use core::fmt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, instrument, trace, warn};

/// Non-rendered property of a `<table>` holding its serialized [`Column`]s.
const COLUMNS_PROPERTY: &str = "descriptorDomColumns";
const HEADER_ROW_MARKER: &str = "data-header-row";
const ROW_NAME_ATTRIBUTE: &str = "data-row-name";
const LARGE_TABLE: usize = 1000;

/// Column metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Column {
	/// 1-based position.
	pub index: usize,
	pub has_name: bool,
	pub title: String,
	/// Key of object rows this column shows, preferred over `key`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Fallback key, or the position within array rows.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub key: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data_type: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub editable: Option<bool>,
}

impl Column {
	fn named(index: usize, name: &str) -> Self {
		Self {
			index,
			has_name: true,
			title: name.to_owned(),
			name: Some(name.to_owned()),
			key: Some(name.to_owned()),
			..Self::default()
		}
	}

	fn positional(index: usize) -> Self {
		Self {
			index,
			has_name: false,
			title: index.to_string(),
			name: None,
			key: Some((index - 1).to_string()),
			..Self::default()
		}
	}

	/// The value of `row` shown in this column: by name, else by key or position.
	fn pick<'a>(&self, row: &'a Value) -> Option<&'a Value> {
		match row {
			Value::Object(fields) => self.name.as_deref().and_then(|name| fields.get(name)).or_else(|| self.key.as_deref().and_then(|key| fields.get(key))),
			Value::Array(items) => self
				.key
				.as_deref()
				.and_then(|key| key.parse::<usize>().ok())
				.or_else(|| self.index.checked_sub(1))
				.and_then(|position| items.get(position)),
			scalar => (self.index == 1).then(|| scalar),
		}
	}

	fn is_editable(&self) -> bool {
		self.editable == Some(true)
	}
}

/// Columns for rows shaped like `first`: its keys in order, or its positions if it's an array.
#[must_use]
pub fn infer_columns(first: &Value) -> Vec<Column> {
	match first {
		Value::Object(fields) => fields.keys().enumerate().map(|(i, name)| Column::named(i + 1, name)).collect(),
		Value::Array(items) => (1..=items.len()).map(Column::positional).collect(),
		_ => vec![Column::positional(1)],
	}
}

/// Fills in positions and `hasName` of explicitly supplied columns.
fn normalize(columns: &[Column]) -> Vec<Column> {
	columns
		.iter()
		.enumerate()
		.map(|(i, column)| {
			let mut column = column.clone();
			if column.index == 0 {
				column.index = i + 1;
			}
			column.has_name = column.name.is_some();
			if column.title.is_empty() {
				column.title = column.name.clone().or_else(|| column.key.clone()).unwrap_or_else(|| column.index.to_string());
			}
			column
		})
		.collect()
}

fn rows(data: &Value) -> Result<Vec<(Option<&str>, &Value)>, TableError> {
	match data {
		Value::Array(rows) => Ok(rows.iter().map(|row| (None, row)).collect()),
		Value::Object(rows) => Ok(rows.iter().map(|(name, row)| (Some(name.as_str()), row)).collect()),
		_ => Err(TableError::InvalidData),
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableOptions {
	/// Required together with `parent`, so the inserted table can be addressed later.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	/// Selector of the element to insert the table into. Without it, the table is returned detached.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub parent: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub position: Option<Position>,
	/// Explicit columns, which skip inference.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cols: Option<Vec<Column>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub caption: Option<String>,
	/// Further attributes of the `<table>`, as on a descriptor.
	#[serde(skip_serializing_if = "Map::is_empty")]
	pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RowOptions {
	/// Stored as `data-row-name`, for [`RowRef::Name`].
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub position: Option<Position>,
}

/// A rendered table, by handle or selector.
#[derive(Debug)]
pub enum TableRef<'a, N> {
	Node(&'a N),
	Selector(&'a str),
}

impl<N> Clone for TableRef<'_, N> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<N> Copy for TableRef<'_, N> {}

impl<'a, N> From<&'a str> for TableRef<'a, N> {
	fn from(selector: &'a str) -> Self {
		Self::Selector(selector)
	}
}

/// A body row, by 0-based position or by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRef<'a> {
	Index(usize),
	Name(&'a str),
}

impl fmt::Display for RowRef<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Index(index) => write!(f, "{}", index),
			Self::Name(name) => write!(f, "{:?}", name),
		}
	}
}

impl<D: Document> Engine<D> {
	/// Builds a `<table>` from `data`, inserting it under `options.parent` if given.
	///
	/// # Errors
	///
	/// Before touching the document, iff `data` is neither an array nor an object,
	/// `options.parent` is given without `options.id`, or `options.parent` matches nothing.
	/// Afterwards, iff the host refuses an operation.
	#[instrument(skip(self, data))]
	pub fn build_table(&self, data: &Value, options: &TableOptions) -> Result<D::Node, TableError> {
		let rows = rows(data)?;
		let parent = match &options.parent {
			Some(selector) if options.id.is_none() => return Err(TableError::MissingId { parent: selector.clone() }),
			Some(selector) => Some(self.document.query_selector(None, selector)?.ok_or_else(|| TableError::ParentNotFound { selector: selector.clone() })?),
			None => None,
		};
		if rows.len() > LARGE_TABLE {
			warn!("Building a table of {} rows; this may be slow.", rows.len());
		}

		let columns = match &options.cols {
			Some(columns) => normalize(columns),
			None => rows.first().map_or_else(Vec::new, |(_, first)| infer_columns(first)),
		};
		trace!(?columns);

		let table = self.document.create_element("table")?;
		let descriptor = Component {
			kind: Some("table".to_owned()),
			id: options.id.clone(),
			attributes: options.attributes.clone(),
			..Component::default()
		};
		self.compose(&table, &descriptor, None);

		if let Some(caption) = &options.caption {
			let element = self.document.create_element("caption")?;
			self.document.set_text_content(&element, caption);
			self.document.insert_before(&table, &element, None)?;
		}
		if !columns.is_empty() {
			let head = self.document.create_element("thead")?;
			let header = self.document.create_element("tr")?;
			self.document.set_attribute(&header, HEADER_ROW_MARKER, "")?;
			for column in &columns {
				let cell = self.header_cell(column)?;
				self.document.insert_before(&header, &cell, None)?;
			}
			self.document.insert_before(&head, &header, None)?;
			self.document.insert_before(&table, &head, None)?;
		}
		let body = self.document.create_element("tbody")?;
		for (name, row) in rows {
			let row = self.body_row(&columns, row, name)?;
			self.document.insert_before(&body, &row, None)?;
		}
		self.document.insert_before(&table, &body, None)?;
		self.cache_columns(&table, &columns);

		if let Some(parent) = parent {
			self.insert_at(&parent, &table, options.position.unwrap_or_default())?;
		}
		Ok(table)
	}

	/// Adds a body row to an existing table, using its cached or recovered columns.
	///
	/// # Errors
	///
	/// Iff `table` can't be resolved to a `<table>` or the host refuses an operation.
	#[instrument(skip(self, table, row))]
	pub fn add_row(&self, table: TableRef<'_, D::Node>, row: &Value, options: &RowOptions) -> Result<D::Node, TableError> {
		let table = self.resolve_table(table)?;
		let mut columns = self.columns_of(&table);
		if columns.is_empty() {
			columns = infer_columns(row);
			self.cache_columns(&table, &columns);
		}

		let body = match self.query_first(Some(&table), "tbody") {
			Some(body) => body,
			None => {
				let body = self.document.create_element("tbody")?;
				self.document.insert_before(&table, &body, None)?;
				body
			}
		};
		let element = self.body_row(&columns, row, options.name.as_deref())?;
		self.insert_at(&body, &element, options.position.unwrap_or_default())?;
		Ok(element)
	}

	/// Removes and returns a body row.
	///
	/// # Errors
	///
	/// Iff `table` can't be resolved to a `<table>` or has no such row.
	#[instrument(skip(self, table))]
	pub fn remove_row(&self, table: TableRef<'_, D::Node>, row: RowRef<'_>) -> Result<D::Node, TableError> {
		let table = self.resolve_table(table)?;
		let found = match row {
			RowRef::Name(name) => self.query_first(Some(&table), &format!("tr[{}=\"{}\"]", ROW_NAME_ATTRIBUTE, escape_css_string(name))),
			RowRef::Index(index) => self.body_rows(&table).into_iter().nth(index),
		};
		let found = found.ok_or_else(|| TableError::RowNotFound { row: row.to_string() })?;
		self.document.remove(&found);
		Ok(found)
	}

	/// The column metadata of a rendered table.
	///
	/// # Errors
	///
	/// Iff `table` can't be resolved to a `<table>`.
	pub fn table_columns(&self, table: TableRef<'_, D::Node>) -> Result<Vec<Column>, TableError> {
		let table = self.resolve_table(table)?;
		Ok(self.columns_of(&table))
	}

	fn resolve_table(&self, table: TableRef<'_, D::Node>) -> Result<D::Node, TableError> {
		let node = match table {
			TableRef::Node(node) => node.clone(),
			TableRef::Selector(selector) => self
				.document
				.query_selector(None, selector)?
				.ok_or_else(|| TableError::TableNotFound { locator: selector.to_owned() })?,
		};
		let tag = self.document.tag_name(&node);
		if tag.eq_ignore_ascii_case("table") {
			Ok(node)
		} else {
			Err(TableError::NotATable { found: tag })
		}
	}

	/// Cached metadata, else recovered from the marked header row, the first `<thead>` row or the first row, in that order.
	fn columns_of(&self, table: &D::Node) -> Vec<Column> {
		if let Some(cached) = self.document.property(table, COLUMNS_PROPERTY) {
			match serde_json::from_value(cached) {
				Ok(columns) => return columns,
				Err(error) => warn!("Ignoring malformed cached column metadata: {}", error),
			}
		}

		let header = self
			.query_first(Some(table), &format!("tr[{}]", HEADER_ROW_MARKER))
			.or_else(|| self.query_first(Some(table), "thead tr"))
			.or_else(|| self.query_first(Some(table), "tr"));
		let columns = header.map_or_else(Vec::new, |header| self.columns_from_row(&header));
		if !columns.is_empty() {
			trace!("Recovered {} columns from markup.", columns.len());
			self.cache_columns(table, &columns);
		}
		columns
	}

	fn columns_from_row(&self, row: &D::Node) -> Vec<Column> {
		self.document
			.children(row)
			.iter()
			.enumerate()
			.map(|(i, cell)| {
				let name = self.document.get_attribute(cell, "data-name");
				Column {
					index: i + 1,
					has_name: name.is_some(),
					title: self.document.text_content(cell).trim().to_owned(),
					key: self.document.get_attribute(cell, "data-key").or_else(|| name.clone()).or_else(|| Some(i.to_string())),
					name,
					data_type: self.document.get_attribute(cell, "data-type"),
					editable: self.document.get_attribute(cell, "data-editable").map(|_| true),
				}
			})
			.collect()
	}

	fn cache_columns(&self, table: &D::Node, columns: &[Column]) {
		match serde_json::to_value(columns) {
			Ok(columns) => {
				succeeded(self.document.set_property(table, COLUMNS_PROPERTY, &columns), "cache column metadata");
			}
			Err(error) => error!("Could not serialize column metadata: {}", error),
		}
	}

	fn header_cell(&self, column: &Column) -> Result<D::Node, HostError> {
		let cell = self.document.create_element("th")?;
		self.document.set_attribute(&cell, "scope", "col")?;
		if let Some(name) = &column.name {
			self.document.set_attribute(&cell, "data-name", name)?;
		}
		if let Some(key) = &column.key {
			self.document.set_attribute(&cell, "data-key", key)?;
		}
		if let Some(data_type) = &column.data_type {
			self.document.set_attribute(&cell, "data-type", data_type)?;
		}
		if column.is_editable() {
			self.document.set_attribute(&cell, "data-editable", "")?;
		}
		self.document.set_text_content(&cell, &column.title);
		Ok(cell)
	}

	/// Values without a matching column are dropped.
	fn body_row(&self, columns: &[Column], row: &Value, name: Option<&str>) -> Result<D::Node, HostError> {
		let element = self.document.create_element("tr")?;
		if let Some(name) = name {
			self.document.set_attribute(&element, ROW_NAME_ATTRIBUTE, name)?;
		}
		for column in columns {
			let cell = self.document.create_element("td")?;
			if let Some(value) = column.pick(row) {
				self.document.set_text_content(&cell, &value_text(value));
			}
			if column.is_editable() {
				self.document.set_attribute(&cell, "contenteditable", "true")?;
			}
			self.document.insert_before(&element, &cell, None)?;
		}
		Ok(element)
	}

	/// Rows outside `<thead>`, excluding the marked header row.
	fn body_rows(&self, table: &D::Node) -> Vec<D::Node> {
		self.query_all(Some(table), "tr")
			.into_iter()
			.filter(|row| {
				self.document.get_attribute(row, HEADER_ROW_MARKER).is_none()
					&& self.document.parent(row).map_or(true, |section| self.document.tag_name(&section) != "thead")
			})
			.collect()
	}
}
