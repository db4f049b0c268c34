//! A headless, in-memory [`Document`] for server-side rendering and tests.
//!
//! Nodes are reference-counted handles, like their browser counterparts:
//! cloning a [`VNode`] clones the handle, not the node.

use crate::{
	error::HostError,
	host::{Document, Listener, UiEvent, HTML_NAMESPACE, SVG_NAMESPACE},
};
use core::{
	cell::{Cell, RefCell},
	fmt,
	time::Duration,
};
use hashbrown::HashMap;
use serde_json::Value;
use std::rc::{Rc, Weak};
use tracing::{instrument, trace};

mod markup;
mod selector;

const VOID_ELEMENTS: &[&str] = &["area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr"];
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScriptState {
	NotScript,
	/// Created through [`Document::create_element`]; runs once connected.
	Pending,
	/// Produced by markup parsing; never runs.
	Inert,
	Started,
}

struct Attribute {
	name: String,
	value: String,
}

struct ElementData {
	namespace: String,
	local_name: String,
	attributes: Vec<Attribute>,
	properties: HashMap<String, Value>,
	listeners: Vec<(String, Listener)>,
	script: ScriptState,
}

enum NodeKind {
	Element(ElementData),
	Text(String),
	Comment(String),
}

struct NodeData {
	kind: NodeKind,
	parent: Weak<RefCell<NodeData>>,
	children: Vec<VNode>,
}

/// A handle to a node of a [`VirtualDocument`]. Compares by identity.
#[derive(Clone)]
pub struct VNode(Rc<RefCell<NodeData>>);

impl PartialEq for VNode {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl Eq for VNode {}

impl fmt::Debug for VNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.0.borrow().kind {
			NodeKind::Element(element) => match element.attributes.iter().find(|a| a.name == "id") {
				Some(id) => write!(f, "<{} id={:?}>", element.local_name, id.value),
				None => write!(f, "<{}>", element.local_name),
			},
			NodeKind::Text(text) => write!(f, "#text {:?}", text),
			NodeKind::Comment(comment) => write!(f, "<!--{}-->", comment),
		}
	}
}

impl VNode {
	fn new(kind: NodeKind) -> Self {
		Self(Rc::new(RefCell::new(NodeData {
			kind,
			parent: Weak::new(),
			children: Vec::new(),
		})))
	}

	fn element(namespace: &str, local_name: &str, script: ScriptState) -> Self {
		Self::new(NodeKind::Element(ElementData {
			namespace: namespace.to_owned(),
			local_name: local_name.to_owned(),
			attributes: Vec::new(),
			properties: HashMap::new(),
			listeners: Vec::new(),
			script,
		}))
	}

	fn text(text: impl Into<String>) -> Self {
		Self::new(NodeKind::Text(text.into()))
	}

	fn comment(comment: impl Into<String>) -> Self {
		Self::new(NodeKind::Comment(comment.into()))
	}

	#[must_use]
	pub fn is_element(&self) -> bool {
		matches!(self.0.borrow().kind, NodeKind::Element(_))
	}

	#[must_use]
	pub fn local_name(&self) -> Option<String> {
		match &self.0.borrow().kind {
			NodeKind::Element(element) => Some(element.local_name.clone()),
			NodeKind::Text(_) | NodeKind::Comment(_) => None,
		}
	}

	fn namespace(&self) -> Option<String> {
		match &self.0.borrow().kind {
			NodeKind::Element(element) => Some(element.namespace.clone()),
			NodeKind::Text(_) | NodeKind::Comment(_) => None,
		}
	}

	#[must_use]
	pub fn attribute(&self, name: &str) -> Option<String> {
		match &self.0.borrow().kind {
			NodeKind::Element(element) => element.attributes.iter().find(|a| a.name == name).map(|a| a.value.clone()),
			NodeKind::Text(_) | NodeKind::Comment(_) => None,
		}
	}

	#[must_use]
	pub fn parent_node(&self) -> Option<VNode> {
		self.0.borrow().parent.upgrade().map(VNode)
	}

	#[must_use]
	pub fn child_nodes(&self) -> Vec<VNode> {
		self.0.borrow().children.clone()
	}

	fn element_children(&self) -> Vec<VNode> {
		self.0.borrow().children.iter().filter(|child| child.is_element()).cloned().collect()
	}

	/// All descendants in document order, excluding `self`.
	fn descendants(&self) -> Vec<VNode> {
		let mut found = Vec::new();
		let mut stack: Vec<VNode> = self.child_nodes().into_iter().rev().collect();
		while let Some(node) = stack.pop() {
			stack.extend(node.child_nodes().into_iter().rev());
			found.push(node);
		}
		found
	}

	fn is_inclusive_ancestor_of(&self, other: &VNode) -> bool {
		let mut current = Some(other.clone());
		while let Some(node) = current {
			if &node == self {
				return true;
			}
			current = node.parent_node();
		}
		false
	}

	fn detach(&self) {
		let parent = self.parent_node();
		if let Some(parent) = parent {
			parent.0.borrow_mut().children.retain(|child| child != self);
		}
		self.0.borrow_mut().parent = Weak::new();
	}

	fn push_child(&self, child: VNode) {
		child.0.borrow_mut().parent = Rc::downgrade(&self.0);
		self.0.borrow_mut().children.push(child);
	}

	fn with_element<R>(&self, f: impl FnOnce(&ElementData) -> R) -> Result<R, HostError> {
		match &self.0.borrow().kind {
			NodeKind::Element(element) => Ok(f(element)),
			other => Err(HostError::NotAnElement { found: kind_name(other).to_owned() }),
		}
	}

	fn with_element_mut<R>(&self, f: impl FnOnce(&mut ElementData) -> R) -> Result<R, HostError> {
		match &mut self.0.borrow_mut().kind {
			NodeKind::Element(element) => Ok(f(element)),
			other => Err(HostError::NotAnElement { found: kind_name(other).to_owned() }),
		}
	}

	fn set_attribute_raw(&self, name: &str, value: &str) -> Result<(), HostError> {
		self.with_element_mut(|element| match element.attributes.iter_mut().find(|a| a.name == name) {
			Some(attribute) => attribute.value = value.to_owned(),
			None => element.attributes.push(Attribute {
				name: name.to_owned(),
				value: value.to_owned(),
			}),
		})
	}

	fn text_content(&self) -> String {
		match &self.0.borrow().kind {
			NodeKind::Text(text) => text.clone(),
			NodeKind::Comment(comment) => comment.clone(),
			NodeKind::Element(_) => self
				.descendants()
				.iter()
				.filter_map(|node| match &node.0.borrow().kind {
					NodeKind::Text(text) => Some(text.clone()),
					NodeKind::Element(_) | NodeKind::Comment(_) => None,
				})
				.collect(),
		}
	}

	fn clear_children(&self) {
		let children = core::mem::take(&mut self.0.borrow_mut().children);
		for child in children {
			child.0.borrow_mut().parent = Weak::new();
		}
	}
}

fn kind_name(kind: &NodeKind) -> &'static str {
	match kind {
		NodeKind::Element(_) => "element",
		NodeKind::Text(_) => "text",
		NodeKind::Comment(_) => "comment",
	}
}

fn validate_name(name: &str) -> Result<(), String> {
	if name.is_empty() {
		Err("empty name".to_owned())
	} else if let Some(c) = name.chars().find(|&c| c.is_whitespace() || matches!(c, '<' | '>' | '"' | '\'' | '/' | '=' | '&')) {
		Err(format!("invalid character {:?}", c))
	} else {
		Ok(())
	}
}

struct Timer {
	due: Duration,
	sequence: u64,
	callback: Box<dyn FnOnce()>,
}

struct Shared {
	root: VNode,
	head: VNode,
	body: VNode,
	now: Cell<Duration>,
	timers: RefCell<Vec<Timer>>,
	next_timer: Cell<u64>,
	executed_scripts: RefCell<Vec<String>>,
	reloads: Cell<usize>,
}

/// An in-memory document with `<html>`, `<head>` and `<body>`.
///
/// Timers run on a virtual clock that only moves through [`VirtualDocument::advance`].
#[derive(Clone)]
pub struct VirtualDocument(Rc<Shared>);

impl Default for VirtualDocument {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for VirtualDocument {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("VirtualDocument").field("now", &self.0.now.get()).field("html", &self.outer_html(&self.0.root)).finish()
	}
}

impl VirtualDocument {
	#[must_use]
	pub fn new() -> Self {
		let root = VNode::element(HTML_NAMESPACE, "html", ScriptState::NotScript);
		let head = VNode::element(HTML_NAMESPACE, "head", ScriptState::NotScript);
		let body = VNode::element(HTML_NAMESPACE, "body", ScriptState::NotScript);
		root.push_child(head.clone());
		root.push_child(body.clone());
		Self(Rc::new(Shared {
			root,
			head,
			body,
			now: Cell::new(Duration::ZERO),
			timers: RefCell::new(Vec::new()),
			next_timer: Cell::new(0),
			executed_scripts: RefCell::new(Vec::new()),
			reloads: Cell::new(0),
		}))
	}

	#[must_use]
	pub fn root(&self) -> VNode {
		self.0.root.clone()
	}

	#[must_use]
	pub fn get_element_by_id(&self, id: &str) -> Option<VNode> {
		core::iter::once(self.root()).chain(self.0.root.descendants()).find(|node| node.attribute("id").as_deref() == Some(id))
	}

	#[must_use]
	pub fn outer_html(&self, node: &VNode) -> String {
		let mut out = String::new();
		markup::serialize(node, &mut out, false);
		out
	}

	#[must_use]
	pub fn inner_html(&self, node: &VNode) -> String {
		let mut out = String::new();
		let raw = node.local_name().map_or(false, |name| RAW_TEXT_ELEMENTS.contains(&name.as_str()));
		for child in node.child_nodes() {
			markup::serialize(&child, &mut out, raw);
		}
		out
	}

	/// Shorthand for `inner_html` of `<body>`.
	#[must_use]
	pub fn body_html(&self) -> String {
		self.inner_html(&self.0.body)
	}

	pub fn click(&self, node: &VNode) {
		// Clicking a detached or non-element node is a no-op, as in browsers.
		let _ = self.dispatch_event(node, "click");
	}

	#[must_use]
	pub fn now(&self) -> Duration {
		self.0.now.get()
	}

	#[must_use]
	pub fn pending_timers(&self) -> usize {
		self.0.timers.borrow().len()
	}

	/// Moves the virtual clock forward, running due timers in deadline order.
	#[instrument(skip(self))]
	pub fn advance(&self, by: Duration) {
		let target = self.0.now.get() + by;
		loop {
			let next = {
				let mut timers = self.0.timers.borrow_mut();
				let due = timers.iter().enumerate().filter(|(_, timer)| timer.due <= target).min_by_key(|(_, timer)| (timer.due, timer.sequence)).map(|(i, _)| i);
				due.map(|i| timers.remove(i))
			};
			match next {
				Some(timer) => {
					self.0.now.set(timer.due);
					trace!("Running timer {} due at {:?}.", timer.sequence, timer.due);
					(timer.callback)();
				}
				None => break,
			}
		}
		self.0.now.set(target);
	}

	/// `src` (or inline text) of every script that ran, in execution order.
	#[must_use]
	pub fn executed_scripts(&self) -> Vec<String> {
		self.0.executed_scripts.borrow().clone()
	}

	#[must_use]
	pub fn reload_count(&self) -> usize {
		self.0.reloads.get()
	}

	fn connected(&self, node: &VNode) -> bool {
		self.0.root.is_inclusive_ancestor_of(node)
	}

	fn run_scripts(&self, inserted: &VNode) {
		if !self.connected(inserted) {
			return;
		}
		for node in core::iter::once(inserted.clone()).chain(inserted.descendants()) {
			let pending = node.with_element(|element| element.script == ScriptState::Pending).unwrap_or(false);
			if pending {
				let _ = node.with_element_mut(|element| element.script = ScriptState::Started);
				let source = node.attribute("src").unwrap_or_else(|| node.text_content());
				trace!("Running script {:?}.", source);
				self.0.executed_scripts.borrow_mut().push(source);
			}
		}
	}

	fn query(&self, scope: Option<&VNode>, selector: &str, first_only: bool) -> Result<Vec<VNode>, HostError> {
		let selectors = selector::parse(selector)?;
		let candidates: Vec<VNode> = match scope {
			Some(scope) => scope.descendants(),
			None => core::iter::once(self.root()).chain(self.0.root.descendants()).collect(),
		};
		let mut found = Vec::new();
		for node in candidates {
			if node.is_element() && selectors.matches(&node) {
				found.push(node);
				if first_only {
					break;
				}
			}
		}
		Ok(found)
	}
}

/// A [`VirtualDocument`] handle that doesn't keep it alive.
pub struct WeakVirtualDocument(Weak<Shared>);

/// A [`VNode`] handle that doesn't keep the node alive.
pub struct WeakVNode(Weak<RefCell<NodeData>>);

impl Document for VirtualDocument {
	type Node = VNode;
	type Weak = WeakVirtualDocument;
	type WeakNode = WeakVNode;

	fn downgrade(&self) -> WeakVirtualDocument {
		WeakVirtualDocument(Rc::downgrade(&self.0))
	}

	fn upgrade(weak: &WeakVirtualDocument) -> Option<Self> {
		weak.0.upgrade().map(Self)
	}

	fn downgrade_node(node: &VNode) -> WeakVNode {
		WeakVNode(Rc::downgrade(&node.0))
	}

	fn upgrade_node(weak: &WeakVNode) -> Option<VNode> {
		weak.0.upgrade().map(VNode)
	}

	fn body(&self) -> Option<VNode> {
		Some(self.0.body.clone())
	}

	fn head(&self) -> Option<VNode> {
		Some(self.0.head.clone())
	}

	fn create_element(&self, tag: &str) -> Result<VNode, HostError> {
		validate_name(tag).map_err(|reason| HostError::Create { tag: tag.to_owned(), reason })?;
		let local_name = tag.to_ascii_lowercase();
		let script = if local_name == "script" { ScriptState::Pending } else { ScriptState::NotScript };
		Ok(VNode::element(HTML_NAMESPACE, &local_name, script))
	}

	fn create_element_ns(&self, namespace: &str, tag: &str) -> Result<VNode, HostError> {
		if namespace == HTML_NAMESPACE {
			return self.create_element(tag);
		}
		validate_name(tag).map_err(|reason| HostError::Create { tag: tag.to_owned(), reason })?;
		Ok(VNode::element(namespace, tag, ScriptState::NotScript))
	}

	fn query_selector(&self, scope: Option<&VNode>, selector: &str) -> Result<Option<VNode>, HostError> {
		Ok(self.query(scope, selector, true)?.into_iter().next())
	}

	fn query_selector_all(&self, scope: Option<&VNode>, selector: &str) -> Result<Vec<VNode>, HostError> {
		self.query(scope, selector, false)
	}

	fn tag_name(&self, node: &VNode) -> String {
		node.local_name().unwrap_or_else(|| "#text".to_owned())
	}

	fn namespace_uri(&self, node: &VNode) -> Option<String> {
		node.namespace()
	}

	fn get_attribute(&self, node: &VNode, name: &str) -> Option<String> {
		node.attribute(name)
	}

	fn attributes(&self, node: &VNode) -> Vec<(String, String)> {
		node.with_element(|element| element.attributes.iter().map(|a| (a.name.clone(), a.value.clone())).collect()).unwrap_or_default()
	}

	fn property(&self, node: &VNode, name: &str) -> Option<Value> {
		node.with_element(|element| element.properties.get(name).cloned()).ok().flatten()
	}

	fn text_content(&self, node: &VNode) -> String {
		node.text_content()
	}

	fn children(&self, node: &VNode) -> Vec<VNode> {
		node.element_children()
	}

	fn first_child(&self, node: &VNode) -> Option<VNode> {
		node.0.borrow().children.first().cloned()
	}

	fn parent(&self, node: &VNode) -> Option<VNode> {
		node.parent_node()
	}

	fn is_connected(&self, node: &VNode) -> bool {
		self.connected(node)
	}

	fn set_attribute(&self, node: &VNode, name: &str, value: &str) -> Result<(), HostError> {
		validate_name(name).map_err(|reason| HostError::Operation { operation: "setAttribute", reason })?;
		let html = node.namespace().as_deref() == Some(HTML_NAMESPACE);
		let name = if html { name.to_ascii_lowercase() } else { name.to_owned() };
		node.set_attribute_raw(&name, value)
	}

	fn set_attribute_ns(&self, node: &VNode, _namespace: &str, name: &str, value: &str) -> Result<(), HostError> {
		validate_name(name).map_err(|reason| HostError::Operation { operation: "setAttributeNS", reason })?;
		node.set_attribute_raw(name, value)
	}

	fn remove_attribute(&self, node: &VNode, name: &str) -> Result<(), HostError> {
		node.with_element_mut(|element| element.attributes.retain(|a| !a.name.eq_ignore_ascii_case(name)))
	}

	fn set_property(&self, node: &VNode, name: &str, value: &Value) -> Result<(), HostError> {
		node.with_element_mut(|element| {
			element.properties.insert(name.to_owned(), value.clone());
		})
	}

	fn set_text_content(&self, node: &VNode, text: &str) {
		let is_element = node.is_element();
		if is_element {
			node.clear_children();
			if !text.is_empty() {
				node.push_child(VNode::text(text));
			}
		} else if let NodeKind::Text(data) | NodeKind::Comment(data) = &mut node.0.borrow_mut().kind {
			*data = text.to_owned();
		}
	}

	fn replace_children_with_markup(&self, node: &VNode, markup: &str) -> Result<(), HostError> {
		let local_name = node.local_name().ok_or_else(|| HostError::NotAnElement { found: "text".to_owned() })?;
		if RAW_TEXT_ELEMENTS.contains(&local_name.as_str()) {
			self.set_text_content(node, markup);
			return Ok(());
		}
		let svg = node.namespace().as_deref() == Some(SVG_NAMESPACE) && local_name != "foreignObject";
		let fragment = markup::parse_fragment(markup, svg);
		node.clear_children();
		for child in fragment {
			node.push_child(child);
		}
		Ok(())
	}

	fn insert_before(&self, parent: &VNode, node: &VNode, reference: Option<&VNode>) -> Result<(), HostError> {
		if !parent.is_element() {
			return Err(HostError::Hierarchy("parent is not an element".to_owned()));
		}
		if node.is_inclusive_ancestor_of(parent) {
			return Err(HostError::Hierarchy("a node can't be inserted into itself or its descendants".to_owned()));
		}
		if let Some(reference) = reference {
			if reference == node {
				return Ok(());
			}
			if reference.parent_node().as_ref() != Some(parent) {
				return Err(HostError::Hierarchy("the reference node is not a child of the parent".to_owned()));
			}
		}

		node.detach();
		{
			let mut parent_data = parent.0.borrow_mut();
			let index = reference.and_then(|reference| parent_data.children.iter().position(|child| child == reference)).unwrap_or(parent_data.children.len());
			parent_data.children.insert(index, node.clone());
		}
		node.0.borrow_mut().parent = Rc::downgrade(&parent.0);
		self.run_scripts(node);
		Ok(())
	}

	fn replace_with(&self, old: &VNode, new: &VNode) -> Result<(), HostError> {
		if old == new {
			return Ok(());
		}
		let parent = old.parent_node().ok_or_else(|| HostError::Hierarchy("the replaced node has no parent".to_owned()))?;
		if new.is_inclusive_ancestor_of(&parent) {
			return Err(HostError::Hierarchy("a node can't replace one of its descendants".to_owned()));
		}

		new.detach();
		{
			let mut parent_data = parent.0.borrow_mut();
			let index = parent_data.children.iter().position(|child| child == old).ok_or_else(|| HostError::Hierarchy("inconsistent parent link".to_owned()))?;
			parent_data.children[index] = new.clone();
		}
		old.0.borrow_mut().parent = Weak::new();
		new.0.borrow_mut().parent = Rc::downgrade(&parent.0);
		self.run_scripts(new);
		Ok(())
	}

	fn remove(&self, node: &VNode) {
		node.detach();
	}

	fn add_event_listener(&self, node: &VNode, kind: &str, listener: Listener) -> Result<(), HostError> {
		node.with_element_mut(|element| element.listeners.push((kind.to_owned(), listener)))
	}

	fn dispatch_event(&self, node: &VNode, kind: &str) -> Result<(), HostError> {
		let target_id = node.with_element(|_| node.attribute("id"))?;
		let mut path = vec![node.clone()];
		let mut current = node.parent_node();
		while let Some(ancestor) = current {
			current = ancestor.parent_node();
			path.push(ancestor);
		}

		for current_target in path {
			let listeners: Vec<Listener> = current_target
				.with_element(|element| element.listeners.iter().filter(|(k, _)| k == kind).map(|(_, listener)| Rc::clone(listener)).collect())
				.unwrap_or_default();
			if listeners.is_empty() {
				continue;
			}
			let event = UiEvent {
				kind: kind.to_owned(),
				target_id: target_id.clone(),
				current_target_id: current_target.attribute("id"),
			};
			for listener in listeners {
				listener(&event);
			}
		}
		Ok(())
	}

	fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> Result<(), HostError> {
		let sequence = self.0.next_timer.get();
		self.0.next_timer.set(sequence + 1);
		self.0.timers.borrow_mut().push(Timer {
			due: self.0.now.get() + delay,
			sequence,
			callback,
		});
		Ok(())
	}

	fn reload(&self) -> Result<(), HostError> {
		self.0.reloads.set(self.0.reloads.get() + 1);
		Ok(())
	}
}
