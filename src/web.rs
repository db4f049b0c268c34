//! [`Document`] and [`Fetch`] for a live browser page, through [`web_sys`].

use crate::{
	error::{HostError, IncludeError},
	host::{Document, Listener, UiEvent, SVG_NAMESPACE},
	include::{Fetch, FetchResponse},
};
use core::{cell::RefCell, fmt, time::Duration};
use js_sys::{Reflect, Uint8Array, JSON};
use serde_json::Value;
use std::rc::{Rc, Weak};
use tracing::{trace, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Element, Event, EventInit, EventTarget, HtmlTemplateElement, Node};

/// Elements whose content is never parsed as markup.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// A browser document.
///
/// Listener closures live as long as the last clone of this handle.
#[derive(Clone)]
pub struct WebDocument {
	document: web_sys::Document,
	window: Option<web_sys::Window>,
	listeners: Rc<RefCell<Vec<Closure<dyn Fn(Event)>>>>,
}

impl fmt::Debug for WebDocument {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WebDocument")
			.field("document", &self.document)
			.field("listeners", &self.listeners.borrow().len())
			.finish_non_exhaustive()
	}
}

impl WebDocument {
	#[must_use]
	pub fn new(document: web_sys::Document) -> Self {
		Self {
			window: document.default_view(),
			document,
			listeners: Rc::default(),
		}
	}

	/// The current page's document, if there is one.
	#[must_use]
	pub fn from_window() -> Option<Self> {
		web_sys::window()?.document().map(Self::new)
	}

	#[must_use]
	pub fn document(&self) -> &web_sys::Document {
		&self.document
	}

	fn window(&self, operation: &'static str) -> Result<&web_sys::Window, HostError> {
		self.window.as_ref().ok_or(HostError::Operation {
			operation,
			reason: "The document has no window.".to_owned(),
		})
	}

	/// Parses `markup` into inert nodes, in the SVG namespace if `svg`.
	fn parse(&self, markup: &str, svg: bool) -> Result<web_sys::DocumentFragment, HostError> {
		let template: HtmlTemplateElement = self
			.document
			.create_element("template")
			.map_err(|error| HostError::Create {
				tag: "template".to_owned(),
				reason: describe(&error),
			})?
			.unchecked_into();
		if !svg {
			template.set_inner_html(markup);
			return Ok(template.content());
		}

		template.set_inner_html(&format!("<svg>{}</svg>", markup));
		let fragment = self.document.create_document_fragment();
		if let Some(wrapper) = template.content().first_child() {
			while let Some(child) = wrapper.first_child() {
				fragment.append_child(&child).map_err(|error| HostError::Hierarchy(describe(&error)))?;
			}
		}
		Ok(fragment)
	}
}

fn describe(value: &JsValue) -> String {
	value
		.as_string()
		.or_else(|| value.dyn_ref::<js_sys::Error>().map(|error| String::from(error.message())))
		.unwrap_or_else(|| format!("{:?}", value))
}

fn operation(operation: &'static str) -> impl FnOnce(JsValue) -> HostError {
	move |error| HostError::Operation {
		operation,
		reason: describe(&error),
	}
}

fn element(node: &Node) -> Result<&Element, HostError> {
	node.dyn_ref::<Element>().ok_or_else(|| HostError::NotAnElement { found: node.node_name() })
}

fn id_of(target: Option<EventTarget>) -> Option<String> {
	target?.dyn_into::<Element>().ok().map(|element| element.id()).filter(|id| !id.is_empty())
}

/// A [`WebDocument`] handle that doesn't keep its listener closures alive.
pub struct WeakWebDocument {
	document: web_sys::Document,
	window: Option<web_sys::Window>,
	listeners: Weak<RefCell<Vec<Closure<dyn Fn(Event)>>>>,
}

impl Document for WebDocument {
	type Node = Node;
	type Weak = WeakWebDocument;
	/// The browser collects nodes; only the closures are owned on this side.
	type WeakNode = Node;

	fn downgrade(&self) -> WeakWebDocument {
		WeakWebDocument {
			document: self.document.clone(),
			window: self.window.clone(),
			listeners: Rc::downgrade(&self.listeners),
		}
	}

	fn upgrade(weak: &WeakWebDocument) -> Option<Self> {
		Some(Self {
			document: weak.document.clone(),
			window: weak.window.clone(),
			listeners: weak.listeners.upgrade()?,
		})
	}

	fn downgrade_node(node: &Node) -> Node {
		node.clone()
	}

	fn upgrade_node(weak: &Node) -> Option<Node> {
		Some(weak.clone())
	}

	fn body(&self) -> Option<Node> {
		self.document.body().map(Into::into)
	}

	fn head(&self) -> Option<Node> {
		self.document.head().map(Into::into)
	}

	fn create_element(&self, tag: &str) -> Result<Node, HostError> {
		self.document.create_element(tag).map(Into::into).map_err(|error| HostError::Create {
			tag: tag.to_owned(),
			reason: describe(&error),
		})
	}

	fn create_element_ns(&self, namespace: &str, tag: &str) -> Result<Node, HostError> {
		self.document.create_element_ns(Some(namespace), tag).map(Into::into).map_err(|error| HostError::Create {
			tag: tag.to_owned(),
			reason: describe(&error),
		})
	}

	fn query_selector(&self, scope: Option<&Node>, selector: &str) -> Result<Option<Node>, HostError> {
		match scope {
			Some(scope) => element(scope)?.query_selector(selector),
			None => self.document.query_selector(selector),
		}
		.map(|found| found.map(Into::into))
		.map_err(|error| HostError::Selector {
			selector: selector.to_owned(),
			reason: describe(&error),
		})
	}

	fn query_selector_all(&self, scope: Option<&Node>, selector: &str) -> Result<Vec<Node>, HostError> {
		let list = match scope {
			Some(scope) => element(scope)?.query_selector_all(selector),
			None => self.document.query_selector_all(selector),
		}
		.map_err(|error| HostError::Selector {
			selector: selector.to_owned(),
			reason: describe(&error),
		})?;
		Ok((0..list.length()).filter_map(|i| list.get(i)).collect())
	}

	fn tag_name(&self, node: &Node) -> String {
		node.dyn_ref::<Element>().map_or_else(|| node.node_name(), Element::local_name)
	}

	fn namespace_uri(&self, node: &Node) -> Option<String> {
		node.dyn_ref::<Element>()?.namespace_uri()
	}

	fn get_attribute(&self, node: &Node, name: &str) -> Option<String> {
		node.dyn_ref::<Element>()?.get_attribute(name)
	}

	fn attributes(&self, node: &Node) -> Vec<(String, String)> {
		let attributes = match node.dyn_ref::<Element>() {
			Some(element) => element.attributes(),
			None => return Vec::new(),
		};
		(0..attributes.length())
			.filter_map(|i| attributes.item(i))
			.map(|attribute| (attribute.name(), attribute.value()))
			.collect()
	}

	fn property(&self, node: &Node, name: &str) -> Option<Value> {
		let value = Reflect::get(node, &JsValue::from_str(name)).ok()?;
		if value.is_undefined() {
			return None;
		}
		let json = JSON::stringify(&value).ok()?.as_string()?;
		serde_json::from_str(&json).ok()
	}

	fn text_content(&self, node: &Node) -> String {
		node.text_content().unwrap_or_default()
	}

	fn children(&self, node: &Node) -> Vec<Node> {
		let children = match node.dyn_ref::<Element>() {
			Some(element) => element.children(),
			None => return Vec::new(),
		};
		(0..children.length()).filter_map(|i| children.item(i)).map(Into::into).collect()
	}

	fn first_child(&self, node: &Node) -> Option<Node> {
		node.first_child()
	}

	fn parent(&self, node: &Node) -> Option<Node> {
		node.parent_node()
	}

	fn is_connected(&self, node: &Node) -> bool {
		node.is_connected()
	}

	fn set_attribute(&self, node: &Node, name: &str, value: &str) -> Result<(), HostError> {
		element(node)?.set_attribute(name, value).map_err(operation("setAttribute"))
	}

	fn set_attribute_ns(&self, node: &Node, namespace: &str, name: &str, value: &str) -> Result<(), HostError> {
		element(node)?.set_attribute_ns(Some(namespace), name, value).map_err(operation("setAttributeNS"))
	}

	fn remove_attribute(&self, node: &Node, name: &str) -> Result<(), HostError> {
		element(node)?.remove_attribute(name).map_err(operation("removeAttribute"))
	}

	fn set_property(&self, node: &Node, name: &str, value: &Value) -> Result<(), HostError> {
		let value = JSON::parse(&value.to_string()).map_err(operation("JSON.parse"))?;
		if Reflect::set(node, &JsValue::from_str(name), &value).map_err(operation("Reflect.set"))? {
			Ok(())
		} else {
			Err(HostError::Operation {
				operation: "Reflect.set",
				reason: format!("Property {:?} is read-only.", name),
			})
		}
	}

	fn set_text_content(&self, node: &Node, text: &str) {
		node.set_text_content(Some(text));
	}

	fn replace_children_with_markup(&self, node: &Node, markup: &str) -> Result<(), HostError> {
		let tag = self.tag_name(node);
		if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
			trace!("<{}> takes markup as text.", tag);
			node.set_text_content(Some(markup));
			return Ok(());
		}

		let svg = self.namespace_uri(node).as_deref() == Some(SVG_NAMESPACE) && tag != "foreignObject";
		let fragment = self.parse(markup, svg)?;
		node.set_text_content(None);
		node.append_child(&fragment).map(drop).map_err(|error| HostError::Hierarchy(describe(&error)))
	}

	fn insert_before(&self, parent: &Node, node: &Node, reference: Option<&Node>) -> Result<(), HostError> {
		parent.insert_before(node, reference).map(drop).map_err(|error| HostError::Hierarchy(describe(&error)))
	}

	fn replace_with(&self, old: &Node, new: &Node) -> Result<(), HostError> {
		let parent = old.parent_node().ok_or_else(|| HostError::Hierarchy("The replaced node is detached.".to_owned()))?;
		parent.replace_child(new, old).map(drop).map_err(|error| HostError::Hierarchy(describe(&error)))
	}

	fn remove(&self, node: &Node) {
		if let Some(parent) = node.parent_node() {
			if let Err(error) = parent.remove_child(node) {
				warn!("Could not remove {:?}: {}", node, describe(&error));
			}
		}
	}

	fn add_event_listener(&self, node: &Node, kind: &str, listener: Listener) -> Result<(), HostError> {
		let closure = Closure::wrap(Box::new(move |event: Event| {
			listener(&UiEvent {
				kind: event.type_(),
				target_id: id_of(event.target()),
				current_target_id: id_of(event.current_target()),
			});
		}) as Box<dyn Fn(Event)>);
		node.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())
			.map_err(operation("addEventListener"))?;
		self.listeners.borrow_mut().push(closure);
		trace!("Bound {:?} listener.", kind);
		Ok(())
	}

	fn dispatch_event(&self, node: &Node, kind: &str) -> Result<(), HostError> {
		let init = EventInit::new();
		init.set_bubbles(true);
		let event = Event::new_with_event_init_dict(kind, &init).map_err(operation("new Event"))?;
		node.dispatch_event(&event).map(drop).map_err(operation("dispatchEvent"))
	}

	fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> Result<(), HostError> {
		let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
		self.window("setTimeout")?
			.set_timeout_with_callback_and_timeout_and_arguments_0(Closure::once_into_js(move || callback()).unchecked_ref(), millis)
			.map(drop)
			.map_err(operation("setTimeout"))
	}

	fn reload(&self) -> Result<(), HostError> {
		self.window("location.reload")?.location().reload().map_err(operation("location.reload"))
	}
}

/// [`Fetch`] through the browser's `fetch`.
#[derive(Debug, Clone)]
pub struct WebFetch {
	window: web_sys::Window,
}

impl WebFetch {
	#[must_use]
	pub fn new(window: web_sys::Window) -> Self {
		Self { window }
	}

	#[must_use]
	pub fn from_window() -> Option<Self> {
		web_sys::window().map(Self::new)
	}
}

impl Fetch for WebFetch {
	async fn fetch(&self, url: &str) -> Result<FetchResponse, IncludeError> {
		let failed = |error: JsValue| IncludeError::Fetch {
			url: url.to_owned(),
			reason: describe(&error),
		};

		let response: web_sys::Response = JsFuture::from(self.window.fetch_with_str(url)).await.map_err(failed)?.unchecked_into();
		let content_type = response.headers().get("content-type").ok().flatten();
		let buffer = JsFuture::from(response.array_buffer().map_err(failed)?).await.map_err(failed)?;
		Ok(FetchResponse {
			status: response.status(),
			content_type,
			body: Uint8Array::new(&buffer).to_vec(),
		})
	}
}
