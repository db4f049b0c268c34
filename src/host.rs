//! The document capability the engine is written against.
//!
//! Both [`VirtualDocument`](`crate::virtual_dom::VirtualDocument`) and
//! [`WebDocument`](`crate::web::WebDocument`) implement [`Document`],
//! so one [`Engine`](`crate::Engine`) runs unmodified against either.

use crate::error::HostError;
use core::{fmt::Debug, time::Duration};
use serde_json::Value;
use std::rc::Rc;

pub const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
pub const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// What a [`Listener`] sees of a dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiEvent {
	pub kind: String,
	/// `id` of the element the event was dispatched on, if it has one.
	pub target_id: Option<String>,
	/// `id` of the element whose listener is running, if it has one.
	pub current_target_id: Option<String>,
}

pub type Listener = Rc<dyn Fn(&UiEvent)>;

/// A live document: element creation, query-selection and node mutation.
///
/// Node handles are cheap to clone and compare by identity, like [`web_sys::Node`].
pub trait Document: Clone + 'static {
	type Node: Clone + PartialEq + Debug + 'static;
	/// A handle that doesn't keep the document alive, for callbacks the document itself stores.
	type Weak: 'static;
	/// A node handle that doesn't keep the node alive.
	type WeakNode: 'static;

	fn downgrade(&self) -> Self::Weak;
	fn upgrade(weak: &Self::Weak) -> Option<Self>;
	fn downgrade_node(node: &Self::Node) -> Self::WeakNode;
	fn upgrade_node(weak: &Self::WeakNode) -> Option<Self::Node>;

	fn body(&self) -> Option<Self::Node>;
	fn head(&self) -> Option<Self::Node>;

	fn create_element(&self, tag: &str) -> Result<Self::Node, HostError>;
	fn create_element_ns(&self, namespace: &str, tag: &str) -> Result<Self::Node, HostError>;

	/// `scope: None` searches the whole document, otherwise only descendants of `scope`.
	fn query_selector(&self, scope: Option<&Self::Node>, selector: &str) -> Result<Option<Self::Node>, HostError>;
	fn query_selector_all(&self, scope: Option<&Self::Node>, selector: &str) -> Result<Vec<Self::Node>, HostError>;

	/// Local name. HTML elements report it in lowercase.
	fn tag_name(&self, node: &Self::Node) -> String;
	fn namespace_uri(&self, node: &Self::Node) -> Option<String>;
	fn get_attribute(&self, node: &Self::Node, name: &str) -> Option<String>;
	/// Qualified name and value of each attribute, in document order.
	fn attributes(&self, node: &Self::Node) -> Vec<(String, String)>;
	fn property(&self, node: &Self::Node, name: &str) -> Option<Value>;
	fn text_content(&self, node: &Self::Node) -> String;
	/// Element children only.
	fn children(&self, node: &Self::Node) -> Vec<Self::Node>;
	/// Any kind of child node.
	fn first_child(&self, node: &Self::Node) -> Option<Self::Node>;
	fn parent(&self, node: &Self::Node) -> Option<Self::Node>;
	fn is_connected(&self, node: &Self::Node) -> bool;

	fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) -> Result<(), HostError>;
	fn set_attribute_ns(&self, node: &Self::Node, namespace: &str, name: &str, value: &str) -> Result<(), HostError>;
	fn remove_attribute(&self, node: &Self::Node, name: &str) -> Result<(), HostError>;
	/// Assigns a live object property, which is not reflected in markup.
	fn set_property(&self, node: &Self::Node, name: &str, value: &Value) -> Result<(), HostError>;
	fn set_text_content(&self, node: &Self::Node, text: &str);

	/// Atomically replaces all of `node`'s content with parsed `markup`.
	///
	/// `<script>` elements produced this way must stay inert.
	fn replace_children_with_markup(&self, node: &Self::Node, markup: &str) -> Result<(), HostError>;

	/// Inserts `node` into `parent` before `reference`, or appends it if `reference` is [`None`].
	fn insert_before(&self, parent: &Self::Node, node: &Self::Node, reference: Option<&Self::Node>) -> Result<(), HostError>;
	fn replace_with(&self, old: &Self::Node, new: &Self::Node) -> Result<(), HostError>;
	/// Detaches `node`. Detached nodes are ignored.
	fn remove(&self, node: &Self::Node);

	fn add_event_listener(&self, node: &Self::Node, kind: &str, listener: Listener) -> Result<(), HostError>;
	/// Dispatches a synthetic, bubbling event of type `kind` on `node`.
	fn dispatch_event(&self, node: &Self::Node, kind: &str) -> Result<(), HostError>;

	fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> Result<(), HostError>;
	fn reload(&self) -> Result<(), HostError>;
}
