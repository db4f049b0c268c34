use thiserror::Error;

/// A failed call into a [`Document`](`crate::host::Document`) implementation.
///
/// The engine logs these and skips the affected step; they never abort a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
	#[error("Invalid selector {selector:?}: {reason}")]
	Selector { selector: String, reason: String },

	#[error("Could not create <{tag}>: {reason}")]
	Create { tag: String, reason: String },

	#[error("Expected an element but found {found}")]
	NotAnElement { found: String },

	#[error("Hierarchy request error: {0}")]
	Hierarchy(String),

	#[error("{operation} failed: {reason}")]
	Operation { operation: &'static str, reason: String },
}

/// Why a batch entry couldn't be dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstructionError {
	#[error("Instruction has neither `method` nor `mode`")]
	MissingMethod,

	#[error("Unknown method {0:?}")]
	UnknownMethod(String),
}

/// Input [`Engine::apply_json`](`crate::Engine::apply_json`) can't read at all.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Instruction batch is not valid JSON: {0}")]
	Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
	#[error("A table inserted under {parent:?} needs an `id` so its rows can be addressed later")]
	MissingId { parent: String },

	#[error("Table data must be an array of rows or an object keyed by row name")]
	InvalidData,

	#[error("No table found for {locator:?}")]
	TableNotFound { locator: String },

	#[error("No parent found for {selector:?}")]
	ParentNotFound { selector: String },

	#[error("Expected <table> but found <{found}>")]
	NotATable { found: String },

	#[error("No row {row} in table")]
	RowNotFound { row: String },

	#[error(transparent)]
	Host(#[from] HostError),
}

/// Failure of a single `include` fetch. Sibling instructions are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IncludeError {
	#[error("Fetching {url:?} failed: {reason}")]
	Fetch { url: String, reason: String },

	#[error("Fetching {url:?} returned status {status}")]
	Status { url: String, status: u16 },

	#[error("Expected {expected} content but {url:?} returned {found:?}")]
	ContentType { url: String, expected: String, found: String },

	#[error("Could not decode {url:?}: {reason}")]
	Decode { url: String, reason: String },
}
