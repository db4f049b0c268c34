//! The CSS selector subset [`VirtualDocument`](`super::VirtualDocument`) understands.
//!
//! Supported: type and universal selectors, `#id`, `.class`, attribute selectors
//! (`[a]`, `[a=v]`, `[a~=v]`, `[a^=v]`, `[a$=v]`, `[a*=v]`), compound selectors,
//! descendant and child combinators and selector lists.
//! Pseudo-classes and sibling combinators are rejected like any other malformed input.

use super::VNode;
use crate::error::HostError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
	Descendant,
	Child,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeOperator {
	Exists,
	Equals,
	Includes,
	Prefix,
	Suffix,
	Substring,
}

#[derive(Debug)]
struct AttributeSelector {
	name: String,
	operator: AttributeOperator,
	value: String,
}

impl AttributeSelector {
	fn matches(&self, actual: &str) -> bool {
		match self.operator {
			AttributeOperator::Exists => true,
			AttributeOperator::Equals => actual == self.value,
			AttributeOperator::Includes => actual.split_whitespace().any(|word| word == self.value),
			AttributeOperator::Prefix => !self.value.is_empty() && actual.starts_with(&self.value),
			AttributeOperator::Suffix => !self.value.is_empty() && actual.ends_with(&self.value),
			AttributeOperator::Substring => !self.value.is_empty() && actual.contains(&self.value),
		}
	}
}

#[derive(Debug, Default)]
struct Compound {
	/// [`None`] for `*` or when only qualifiers are given.
	tag: Option<String>,
	ids: Vec<String>,
	classes: Vec<String>,
	attributes: Vec<AttributeSelector>,
}

impl Compound {
	fn matches(&self, node: &VNode) -> bool {
		node.with_element(|element| {
			if let Some(tag) = &self.tag {
				if !element.local_name.eq_ignore_ascii_case(tag) {
					return false;
				}
			}
			let attribute = |name: &str| element.attributes.iter().find(|a| a.name.eq_ignore_ascii_case(name)).map(|a| a.value.as_str());
			self.ids.iter().all(|id| attribute("id") == Some(id.as_str()))
				&& self.classes.iter().all(|class| attribute("class").map_or(false, |classes| classes.split_whitespace().any(|c| c == class)))
				&& self.attributes.iter().all(|selector| attribute(&selector.name).map_or(false, |actual| selector.matches(actual)))
		})
		.unwrap_or(false)
	}
}

/// Compounds from left to right, each with its relation to the one before it.
#[derive(Debug)]
struct Complex(Vec<(Combinator, Compound)>);

impl Complex {
	fn matches(&self, node: &VNode) -> bool {
		matches_from(&self.0, node)
	}
}

fn matches_from(parts: &[(Combinator, Compound)], node: &VNode) -> bool {
	let ((combinator, last), rest) = match parts.split_last() {
		Some(split) => split,
		None => return true,
	};
	if !last.matches(node) {
		return false;
	}
	if rest.is_empty() {
		return true;
	}
	match combinator {
		Combinator::Child => node.parent_node().filter(VNode::is_element).map_or(false, |parent| matches_from(rest, &parent)),
		Combinator::Descendant => {
			let mut current = node.parent_node();
			while let Some(ancestor) = current {
				if ancestor.is_element() && matches_from(rest, &ancestor) {
					return true;
				}
				current = ancestor.parent_node();
			}
			false
		}
	}
}

#[derive(Debug)]
pub(super) struct SelectorList(Vec<Complex>);

impl SelectorList {
	pub(super) fn matches(&self, node: &VNode) -> bool {
		self.0.iter().any(|complex| complex.matches(node))
	}
}

pub(super) fn parse(source: &str) -> Result<SelectorList, HostError> {
	let mut parser = Parser {
		source,
		chars: source.chars().collect(),
		pos: 0,
	};
	let mut list = vec![parser.complex()?];
	while parser.peek() == Some(',') {
		parser.pos += 1;
		list.push(parser.complex()?);
	}
	match parser.peek() {
		None => Ok(SelectorList(list)),
		Some(c) => Err(parser.fail(format!("unexpected {:?}", c))),
	}
}

struct Parser<'a> {
	source: &'a str,
	chars: Vec<char>,
	pos: usize,
}

impl Parser<'_> {
	fn fail(&self, reason: impl Into<String>) -> HostError {
		HostError::Selector {
			selector: self.source.to_owned(),
			reason: reason.into(),
		}
	}

	fn peek(&self) -> Option<char> {
		self.chars.get(self.pos).copied()
	}

	fn skip_whitespace(&mut self) -> bool {
		let start = self.pos;
		while self.peek().map_or(false, char::is_whitespace) {
			self.pos += 1;
		}
		self.pos > start
	}

	fn expect(&mut self, expected: char) -> Result<(), HostError> {
		match self.peek() {
			Some(c) if c == expected => {
				self.pos += 1;
				Ok(())
			}
			Some(c) => Err(self.fail(format!("expected {:?} but found {:?}", expected, c))),
			None => Err(self.fail(format!("expected {:?} but the selector ended", expected))),
		}
	}

	fn complex(&mut self) -> Result<Complex, HostError> {
		self.skip_whitespace();
		let first = self.compound()?.ok_or_else(|| self.fail("expected a selector"))?;
		let mut parts = vec![(Combinator::Descendant, first)];
		loop {
			let spaced = self.skip_whitespace();
			match self.peek() {
				None | Some(',') => break,
				Some('>') => {
					self.pos += 1;
					self.skip_whitespace();
					let compound = self.compound()?.ok_or_else(|| self.fail("expected a selector after `>`"))?;
					parts.push((Combinator::Child, compound));
				}
				Some(c) if spaced => {
					let compound = self.compound()?.ok_or_else(|| self.fail(format!("unexpected {:?}", c)))?;
					parts.push((Combinator::Descendant, compound));
				}
				Some(c) => return Err(self.fail(format!("unexpected {:?}", c))),
			}
		}
		Ok(Complex(parts))
	}

	fn compound(&mut self) -> Result<Option<Compound>, HostError> {
		let mut compound = Compound::default();
		let mut any = false;
		match self.peek() {
			Some('*') => {
				self.pos += 1;
				any = true;
			}
			Some(c) if is_identifier_start(c) => {
				compound.tag = Some(self.identifier()?.to_ascii_lowercase());
				any = true;
			}
			_ => (),
		}
		loop {
			match self.peek() {
				Some('#') => {
					self.pos += 1;
					compound.ids.push(self.identifier()?);
				}
				Some('.') => {
					self.pos += 1;
					compound.classes.push(self.identifier()?);
				}
				Some('[') => {
					self.pos += 1;
					compound.attributes.push(self.attribute()?);
				}
				Some(':') => return Err(self.fail("pseudo-classes aren't supported")),
				_ => break,
			}
			any = true;
		}
		Ok(if any { Some(compound) } else { None })
	}

	fn attribute(&mut self) -> Result<AttributeSelector, HostError> {
		self.skip_whitespace();
		let name = self.identifier()?.to_ascii_lowercase();
		self.skip_whitespace();
		let operator = match self.peek() {
			Some(']') => {
				self.pos += 1;
				return Ok(AttributeSelector {
					name,
					operator: AttributeOperator::Exists,
					value: String::new(),
				});
			}
			Some('=') => AttributeOperator::Equals,
			Some('~') => AttributeOperator::Includes,
			Some('^') => AttributeOperator::Prefix,
			Some('$') => AttributeOperator::Suffix,
			Some('*') => AttributeOperator::Substring,
			Some(c) => return Err(self.fail(format!("unexpected {:?} in attribute selector", c))),
			None => return Err(self.fail("unterminated attribute selector")),
		};
		if operator != AttributeOperator::Equals {
			self.pos += 1;
		}
		self.expect('=')?;
		self.skip_whitespace();
		let value = match self.peek() {
			Some(quote @ ('"' | '\'')) => {
				self.pos += 1;
				self.quoted(quote)?
			}
			_ => self.identifier()?,
		};
		self.skip_whitespace();
		self.expect(']')?;
		Ok(AttributeSelector { name, operator, value })
	}

	fn quoted(&mut self, quote: char) -> Result<String, HostError> {
		let mut value = String::new();
		loop {
			match self.peek() {
				Some('\\') => {
					self.pos += 1;
					let escaped = self.peek().ok_or_else(|| self.fail("dangling escape"))?;
					value.push(escaped);
				}
				Some(c) if c == quote => {
					self.pos += 1;
					return Ok(value);
				}
				Some(c) => value.push(c),
				None => return Err(self.fail("unterminated string")),
			}
			self.pos += 1;
		}
	}

	fn identifier(&mut self) -> Result<String, HostError> {
		match self.peek() {
			Some(c) if is_identifier_start(c) => (),
			Some(c) => return Err(self.fail(format!("expected an identifier but found {:?}", c))),
			None => return Err(self.fail("expected an identifier but the selector ended")),
		}
		let mut identifier = String::new();
		while let Some(c) = self.peek() {
			if c == '\\' {
				self.pos += 1;
				let escaped = self.peek().ok_or_else(|| self.fail("dangling escape"))?;
				identifier.push(escaped);
			} else if is_identifier_char(c) {
				identifier.push(c);
			} else {
				break;
			}
			self.pos += 1;
		}
		Ok(identifier)
	}
}

fn is_identifier_start(c: char) -> bool {
	c.is_ascii_alphabetic() || matches!(c, '-' | '_' | '\\') || !c.is_ascii()
}

fn is_identifier_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || matches!(c, '-' | '_') || !c.is_ascii()
}
