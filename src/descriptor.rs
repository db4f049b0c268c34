//! The data model: [`Component`] descriptors and the [`Instruction`]s that carry them.
//!
//! Everything here is plain data that deserializes from the JSON a backend emits.
//! Only [`Instruction::parent_el`] can't come from the wire, since it holds a live node.

use crate::error::InstructionError;
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{borrow::Cow, collections::BTreeMap};

/// One element to create or update, plus its nested children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Component {
	/// Tag name, or one of the sentinels `"html"` (raw-markup wrapper) and `"svg"` (foreign root).
	#[serde(rename = "type", skip_serializing_if = "Option::is_none")]
	pub kind: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Arbitrary CSS selector used to locate existing elements.
	#[serde(alias = "select", skip_serializing_if = "Option::is_none")]
	pub selector: Option<String>,
	/// Method nested children of an `update` inherit.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub method: Option<String>,
	#[serde(skip_serializing_if = "Map::is_empty")]
	pub attributes: Map<String, Value>,
	#[serde(skip_serializing_if = "Map::is_empty")]
	pub properties: Map<String, Value>,
	/// Event name to registered handler name.
	#[serde(skip_serializing_if = "BTreeMap::is_empty")]
	pub events: BTreeMap<String, String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub slot: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub slot_markdown: Option<String>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub components: Vec<Target>,
	/// Selector of the element a *new* node is inserted into.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub parent: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub position: Option<Position>,
}

impl Component {
	#[must_use]
	pub fn new(kind: impl Into<String>) -> Self {
		Self {
			kind: Some(kind.into()),
			..Self::default()
		}
	}

	#[must_use]
	pub fn with_id(mut self, id: impl Into<String>) -> Self {
		self.id = Some(id.into());
		self
	}

	#[must_use]
	pub fn with_slot(mut self, slot: impl Into<String>) -> Self {
		self.slot = Some(slot.into());
		self
	}

	#[must_use]
	pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.attributes.insert(name.into(), value.into());
		self
	}

	#[must_use]
	pub fn with_child(mut self, child: Component) -> Self {
		self.components.push(Target::Component(Box::new(child)));
		self
	}

	/// Whether this descriptor names anything an existing element could be looked up by.
	#[must_use]
	pub fn has_locator_hints(&self) -> bool {
		self.id.is_some() || self.selector.is_some() || self.name.is_some() || self.kind.is_some()
	}
}

/// An entry of [`Component::components`] or [`Instruction`] targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Target {
	/// A CSS selector, as used by `remove` and `removeAll`.
	Locator(String),
	Component(Box<Component>),
}

impl From<Component> for Target {
	fn from(component: Component) -> Self {
		Self::Component(Box::new(component))
	}
}

impl From<&str> for Target {
	fn from(locator: &str) -> Self {
		Self::Locator(locator.to_owned())
	}
}

/// Where among its new siblings a created element goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RawPosition", into = "RawPosition")]
pub enum Position {
	First,
	/// Before the element child currently at this index.
	Index(usize),
	#[default]
	Last,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawPosition {
	Index(usize),
	Keyword(String),
}

impl From<RawPosition> for Position {
	fn from(raw: RawPosition) -> Self {
		match raw {
			RawPosition::Index(index) => Self::Index(index),
			RawPosition::Keyword(keyword) => match keyword.as_str() {
				"first" => Self::First,
				other => other.parse().map_or(Self::Last, Self::Index),
			},
		}
	}
}

impl From<Position> for RawPosition {
	fn from(position: Position) -> Self {
		match position {
			Position::First => Self::Keyword("first".to_owned()),
			Position::Index(index) => Self::Index(index),
			Position::Last => Self::Keyword("last".to_owned()),
		}
	}
}

/// Which element-creation rules apply to a descriptor. Derived, never authored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
	/// Raw-markup wrapper (`type: "html"`).
	Html,
	/// Foreign vector-graphics markup.
	Svg,
	/// Plain elements.
	Dom,
}

impl Namespace {
	/// Resolves a descriptor's namespace from its `type` and the namespace of the element it's built into.
	#[must_use]
	pub fn resolve(kind: &str, ambient: Namespace) -> Self {
		match kind {
			"html" => Self::Html,
			"svg" => Self::Svg,
			_ if ambient == Self::Svg => Self::Svg,
			_ => Self::Dom,
		}
	}
}

/// The closed set of batch operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
	Add,
	Remove,
	RemoveAll,
	Replace,
	Update,
	Load,
	Reload,
	Notify,
	Alert,
}

impl Method {
	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Add => "add",
			Self::Remove => "remove",
			Self::RemoveAll => "removeAll",
			Self::Replace => "replace",
			Self::Update => "update",
			Self::Load => "load",
			Self::Reload => "reload",
			Self::Notify => "notify",
			Self::Alert => "alert",
		}
	}
}

impl FromStr for Method {
	type Err = InstructionError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(match s {
			"add" => Self::Add,
			"remove" => Self::Remove,
			"removeAll" => Self::RemoveAll,
			"replace" => Self::Replace,
			"update" => Self::Update,
			"load" => Self::Load,
			"reload" => Self::Reload,
			"notify" => Self::Notify,
			"alert" => Self::Alert,
			other => return Err(InstructionError::UnknownMethod(other.to_owned())),
		})
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptResource {
	pub src: Option<String>,
	pub text: Option<String>,
	pub module: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleResource {
	pub href: Option<String>,
	pub text: Option<String>,
}

/// One dispatch unit of a [`Batch`].
///
/// The envelope is flattened together with a [`Component`], so a flat `update`
/// (one without `components`) carries its own target fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default, bound(deserialize = ""))]
pub struct Instruction<N = ()> {
	pub method: Option<String>,
	/// Legacy spelling of `method`.
	pub mode: Option<String>,
	pub payload: Option<Value>,
	pub topic: Option<String>,

	pub auto_hide: Option<bool>,
	/// Auto-hide delay in milliseconds.
	pub delay: Option<u64>,
	pub append_toast: Option<bool>,

	pub scripts: Vec<ScriptResource>,
	pub styles: Vec<StyleResource>,

	/// Direct reference to the element new nodes go into, and the scope lookups run in.
	#[serde(skip)]
	pub parent_el: Option<N>,

	#[serde(flatten)]
	pub component: Component,
}

impl<N> Default for Instruction<N> {
	fn default() -> Self {
		Self {
			method: None,
			mode: None,
			payload: None,
			topic: None,
			auto_hide: None,
			delay: None,
			append_toast: None,
			scripts: Vec::new(),
			styles: Vec::new(),
			parent_el: None,
			component: Component::default(),
		}
	}
}

impl<N> Instruction<N> {
	#[must_use]
	pub fn new(method: Method) -> Self {
		Self {
			method: Some(method.as_str().to_owned()),
			..Self::default()
		}
	}

	#[must_use]
	pub fn with_component(mut self, component: Component) -> Self {
		self.component.components.push(component.into());
		self
	}

	#[must_use]
	pub fn with_locator(mut self, locator: &str) -> Self {
		self.component.components.push(locator.into());
		self
	}

	#[must_use]
	pub fn with_parent_el(mut self, parent_el: N) -> Self {
		self.parent_el = Some(parent_el);
		self
	}

	#[must_use]
	pub fn with_payload(mut self, payload: impl Into<Value>) -> Self {
		self.payload = Some(payload.into());
		self
	}

	/// `method`, falling back to `mode`.
	///
	/// # Errors
	///
	/// Iff neither is present or the name isn't one of [`Method`]'s.
	pub fn resolve_method(&self) -> Result<Method, InstructionError> {
		self.method.as_deref().or(self.mode.as_deref()).ok_or(InstructionError::MissingMethod)?.parse()
	}

	/// The instruction's targets, or the instruction itself if it has none and `synthesize` is set.
	pub(crate) fn targets(&self, synthesize: bool) -> Vec<Cow<'_, Target>> {
		if self.component.components.is_empty() && synthesize {
			let mut own = self.component.clone();
			own.parent = None;
			own.position = None;
			vec![Cow::Owned(Target::Component(Box::new(own)))]
		} else {
			self.component.components.iter().map(Cow::Borrowed).collect()
		}
	}

	/// The `payload` as slot content, for descriptors that have none of their own.
	pub(crate) fn payload_slot(&self) -> Option<String> {
		self.payload.as_ref().map(value_text)
	}
}

/// A single [`Instruction`] or an ordered list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged, bound(deserialize = ""))]
pub enum Batch<N = ()> {
	Many(Vec<Instruction<N>>),
	One(Box<Instruction<N>>),
}

impl<N> Batch<N> {
	#[must_use]
	pub fn into_vec(self) -> Vec<Instruction<N>> {
		match self {
			Self::Many(instructions) => instructions,
			Self::One(instruction) => vec![*instruction],
		}
	}
}

impl<N> From<Instruction<N>> for Batch<N> {
	fn from(instruction: Instruction<N>) -> Self {
		Self::One(Box::new(instruction))
	}
}

impl<N> From<Vec<Instruction<N>>> for Batch<N> {
	fn from(instructions: Vec<Instruction<N>>) -> Self {
		Self::Many(instructions)
	}
}

/// Ambient data of the request that delivered a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
	pub payload: Option<Value>,
	pub topic: Option<String>,
}

impl RequestContext {
	/// Copies `payload` and `topic` onto `instruction` where it has none of its own.
	pub fn stamp<N>(&self, instruction: &mut Instruction<N>) {
		if instruction.payload.is_none() {
			instruction.payload = self.payload.clone();
		}
		if instruction.topic.is_none() {
			instruction.topic = self.topic.clone();
		}
	}
}

/// Text of a JSON value as it's shown in a document: strings verbatim, `null` empty.
#[must_use]
pub fn value_text(value: &Value) -> String {
	match value {
		Value::Null => String::new(),
		Value::String(text) => text.clone(),
		other => other.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;
	use serde_json::json;

	#[test]
	fn mode_aliases_method() {
		let instruction: Instruction = serde_json::from_value(json!({ "mode": "removeAll", "components": ["p"] })).unwrap();
		assert_eq!(instruction.resolve_method(), Ok(Method::RemoveAll));
	}

	#[test]
	fn missing_and_unknown_methods() {
		let missing: Instruction = serde_json::from_value(json!({ "components": [] })).unwrap();
		assert_eq!(missing.resolve_method(), Err(InstructionError::MissingMethod));

		let unknown: Instruction = serde_json::from_value(json!({ "method": "explode" })).unwrap();
		assert_eq!(unknown.resolve_method(), Err(InstructionError::UnknownMethod("explode".to_owned())));
	}

	#[test]
	fn targets_mix_locators_and_components() {
		let instruction: Instruction = serde_json::from_value(json!({
			"method": "remove",
			"components": ["#a", { "type": "p", "id": "b" }],
		}))
		.unwrap();
		assert_eq!(
			instruction.component.components,
			vec![Target::Locator("#a".to_owned()), Component::new("p").with_id("b").into()]
		);
	}

	#[test]
	fn flat_update_synthesizes_its_own_target() {
		let instruction: Instruction = serde_json::from_value(json!({ "method": "update", "id": "x", "slot": "bye" })).unwrap();
		let targets = instruction.targets(true);
		assert_eq!(targets.len(), 1);
		match &*targets[0] {
			Target::Component(component) => {
				assert_eq!(component.id.as_deref(), Some("x"));
				assert_eq!(component.slot.as_deref(), Some("bye"));
			}
			Target::Locator(locator) => panic!("unexpected locator {:?}", locator),
		}
	}

	#[test]
	fn positions() {
		let parse = |value: Value| serde_json::from_value::<Position>(value).unwrap();
		assert_eq!(parse(json!("first")), Position::First);
		assert_eq!(parse(json!(2)), Position::Index(2));
		assert_eq!(parse(json!("3")), Position::Index(3));
		assert_eq!(parse(json!("somewhere")), Position::Last);
	}

	#[test]
	fn batch_accepts_one_or_many() {
		let one: Batch = serde_json::from_value(json!({ "method": "reload" })).unwrap();
		assert_eq!(one.into_vec().len(), 1);
		let many: Batch = serde_json::from_value(json!([{ "method": "reload" }, { "method": "reload" }])).unwrap();
		assert_eq!(many.into_vec().len(), 2);
	}

	#[test]
	fn namespace_is_inherited_inside_svg() {
		assert_eq!(Namespace::resolve("svg", Namespace::Dom), Namespace::Svg);
		assert_eq!(Namespace::resolve("circle", Namespace::Svg), Namespace::Svg);
		assert_eq!(Namespace::resolve("html", Namespace::Svg), Namespace::Html);
		assert_eq!(Namespace::resolve("p", Namespace::Html), Namespace::Dom);
	}
}
