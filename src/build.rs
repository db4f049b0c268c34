//! The Namespace Resolver and Tree Builder: `add` and `replace`.

use crate::{
	descriptor::{Component, Instruction, Namespace, Position, Target},
	engine::{succeeded, Engine},
	error::HostError,
	host::{Document, SVG_NAMESPACE},
	locate::describe,
};
use tracing::{error, info, trace, warn};

/// Tag of descriptors without `type`, and of `"html"` wrappers.
pub(crate) const DEFAULT_KIND: &str = "div";

/// Where a newly built element goes.
#[derive(Debug)]
pub(crate) enum Placement<'a, N> {
	/// Into this parent, at the descriptor's `position`.
	Under(&'a N),
	/// In place of this element.
	Over(&'a N),
}

impl<D: Document> Engine<D> {
	pub(crate) fn add(&self, instruction: &Instruction<D::Node>, depth: usize) -> bool {
		let targets = instruction.targets(false);
		if targets.is_empty() {
			warn!("`add` without `components`; nothing to add.");
			return false;
		}

		let default_slot = instruction.payload_slot();
		let mut applied = false;
		for target in &targets {
			match &**target {
				Target::Component(component) => applied |= self.add_component(instruction, component, default_slot.as_deref(), depth).is_some(),
				Target::Locator(locator) => warn!("Can't add locator {:?}; `add` takes component descriptors.", locator),
			}
		}
		applied
	}

	/// Replaces the first element matching each target by `id`, `selector` or `name`.
	/// Targets that match nothing are added instead.
	pub(crate) fn replace(&self, instruction: &Instruction<D::Node>, depth: usize) -> bool {
		let targets = instruction.targets(false);
		if targets.is_empty() {
			warn!("`replace` without `components`; nothing to replace.");
			return false;
		}

		let default_slot = instruction.payload_slot();
		let mut applied = false;
		for target in &targets {
			let component = match &**target {
				Target::Component(component) => component,
				Target::Locator(locator) => {
					warn!("Can't replace with locator {:?}; `replace` takes component descriptors.", locator);
					continue;
				}
			};

			let existing = self.locate(component, instruction.parent_el.as_ref(), false).into_iter().next();
			let replaced = match existing {
				Some(old) => {
					let ambient = self.document.parent(&old).map_or(Namespace::Dom, |parent| self.namespace_of(&parent));
					self.build(component, Placement::Over(&old), ambient, default_slot.as_deref(), depth)
				}
				None => {
					trace!("Nothing matches {}; adding it instead.", describe(component));
					self.add_component(instruction, component, default_slot.as_deref(), depth)
				}
			};
			applied |= replaced.is_some();
		}
		applied
	}

	fn add_component(&self, instruction: &Instruction<D::Node>, component: &Component, default_slot: Option<&str>, depth: usize) -> Option<D::Node> {
		let parent = self.resolve_parent(instruction, component)?;
		let ambient = self.namespace_of(&parent);
		self.build(component, Placement::Under(&parent), ambient, default_slot, depth)
	}

	/// `parentEl`, then the descriptor's `parent`, then the instruction's `parent`, then `<body>`.
	fn resolve_parent(&self, instruction: &Instruction<D::Node>, component: &Component) -> Option<D::Node> {
		if let Some(parent) = &instruction.parent_el {
			return Some(parent.clone());
		}

		let mut missed = None;
		for selector in [component.parent.as_deref(), instruction.component.parent.as_deref()].into_iter().flatten() {
			if let Some(parent) = self.query_first(None, selector) {
				return Some(parent);
			}
			missed.get_or_insert(selector);
		}

		let body = self.document.body();
		match (&body, missed) {
			(None, _) => error!("The document has no <body> to add {} to.", describe(component)),
			(Some(_), Some(selector)) => info!("Parent {:?} not found; adding {} to <body> instead.", selector, describe(component)),
			(Some(_), None) => (),
		}
		body
	}

	/// Creates, composes and places the element for `component`, then builds its nested `components` into it.
	pub(crate) fn build(&self, component: &Component, placement: Placement<'_, D::Node>, ambient: Namespace, default_slot: Option<&str>, depth: usize) -> Option<D::Node> {
		let kind = component.kind.as_deref().unwrap_or(DEFAULT_KIND);
		if depth > self.config.depth_limit {
			error!("Depth limit of {} reached; skipping <{}> and its descendants.", self.config.depth_limit, kind);
			return None;
		}

		let namespace = Namespace::resolve(kind, ambient);
		let created = match namespace {
			Namespace::Html => self.document.create_element(DEFAULT_KIND),
			Namespace::Svg => self.document.create_element_ns(SVG_NAMESPACE, kind),
			Namespace::Dom => self.document.create_element(kind),
		};
		let element = match created {
			Ok(element) => element,
			Err(error) => {
				error!("{}", error);
				return None;
			}
		};

		self.compose(&element, component, default_slot);
		let placed = match placement {
			Placement::Under(parent) => self.insert_at(parent, &element, component.position.unwrap_or_default()),
			Placement::Over(old) => self.document.replace_with(old, &element),
		};
		if !succeeded(placed, format_args!("place <{}>", kind)) {
			return None;
		}

		self.build_children(&element, &component.components, namespace, depth + 1);
		Some(element)
	}

	fn build_children(&self, parent: &D::Node, children: &[Target], namespace: Namespace, depth: usize) {
		for child in children {
			let child = match child {
				Target::Component(child) => child,
				Target::Locator(locator) => {
					warn!("Ignoring locator {:?} among nested components.", locator);
					continue;
				}
			};
			let kind = child.kind.as_deref().unwrap_or(DEFAULT_KIND);
			if namespace == Namespace::Html || Namespace::resolve(kind, namespace) == Namespace::Html {
				// Raw markup owns the parent's content, whatever the child's own type.
				self.compose_content(parent, child, None);
				continue;
			}
			self.build(child, Placement::Under(parent), namespace, None, depth);
		}
	}

	pub(crate) fn insert_at(&self, parent: &D::Node, node: &D::Node, position: Position) -> Result<(), HostError> {
		let reference = match position {
			Position::First => self.document.first_child(parent),
			Position::Index(index) => self.document.children(parent).into_iter().nth(index),
			Position::Last => None,
		};
		self.document.insert_before(parent, node, reference.as_ref())
	}

	/// The ambient namespace for elements built into `node`.
	pub(crate) fn namespace_of(&self, node: &D::Node) -> Namespace {
		if self.document.namespace_uri(node).as_deref() == Some(SVG_NAMESPACE) {
			Namespace::Svg
		} else {
			Namespace::Dom
		}
	}
}
