//! The Update Propagator: in-place `update`, and re-entry into the dispatcher for nested `components`.

use crate::{
	descriptor::{Component, Instruction, Target},
	engine::Engine,
	host::Document,
	locate::describe,
};
use tracing::{error, trace, warn};

impl<D: Document> Engine<D> {
	pub(crate) fn update(&self, instruction: &Instruction<D::Node>, depth: usize) -> bool {
		let default_slot = instruction.payload_slot();
		let mut applied = false;
		for target in instruction.targets(true) {
			match &*target {
				Target::Component(component) => applied |= self.update_component(instruction, component, default_slot.as_deref(), depth),
				Target::Locator(selector) => warn!("`update` target {:?} carries no changes; skipping it.", selector),
			}
		}
		applied
	}

	/// A descriptor without any locator hint updates `parentEl` itself.
	fn update_component(&self, instruction: &Instruction<D::Node>, component: &Component, default_slot: Option<&str>, depth: usize) -> bool {
		let scope = instruction.parent_el.as_ref();
		let targets = if component.has_locator_hints() {
			self.locate(component, scope, true)
		} else {
			scope.cloned().into_iter().collect()
		};
		if targets.is_empty() {
			warn!("Nothing matches {}; skipping update.", describe(component));
			return false;
		}

		for element in &targets {
			self.compose(element, component, default_slot);
			if !component.components.is_empty() {
				self.propagate(instruction, component, element, depth);
			}
		}
		true
	}

	/// Dispatches each of `component`'s children as its own instruction, scoped to `element`.
	///
	/// A child's method is its own `method`, else `component`'s, else the enclosing instruction's.
	fn propagate(&self, instruction: &Instruction<D::Node>, component: &Component, element: &D::Node, depth: usize) {
		if depth >= self.config.depth_limit {
			return error!("Depth limit of {} reached; not updating the children of {}.", self.config.depth_limit, describe(component));
		}

		let inherited = component.method.as_deref().or(instruction.method.as_deref()).or(instruction.mode.as_deref());
		let nested = component
			.components
			.iter()
			.map(|child| {
				let own = match child {
					Target::Component(child) => child.method.as_deref(),
					Target::Locator(_) => None,
				};
				Instruction {
					method: own.or(inherited).map(str::to_owned),
					topic: instruction.topic.clone(),
					parent_el: Some(element.clone()),
					component: Component {
						components: vec![child.clone()],
						..Component::default()
					},
					..Instruction::default()
				}
			})
			.collect();

		let report = self.apply_batch(nested, depth + 1);
		trace!(?report, "Propagated into nested components.");
	}
}
