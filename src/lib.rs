//! # Strata Engine
//!
//! The structured content engine behind the Strata headless CMS.
//!
//! Strata stores content as trees of typed component instances. This crate
//! is the part of the backend that actually has to think: it validates
//! nested content against dynamically-defined component schemas, derives
//! hierarchical addressing (slugs, paths, breadcrumbs), arbitrates exclusive
//! editing access through time-bounded locks, and keeps language variants of
//! the same content structurally in sync. Persistence, transport, and
//! authentication live elsewhere and are consumed through narrow traits.
//!
//! ## Architecture
//!
//! ```text
//! strata-engine
//! ├── components   - Component schemas, field definitions, registry
//! ├── validation   - Schema-driven payload validation
//! ├── nodes        - Content nodes, status workflow, node store
//! ├── tree         - Slug/path/breadcrumb derivation over the node tree
//! ├── locks        - Time-bounded exclusive edit locks
//! ├── translations - Translation groups, structural sync, completeness
//! └── engine       - Facade wiring the modules behind one API
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use strata_engine::prelude::*;
//!
//! let registry = InMemoryComponentRegistry::new();
//! registry.register(
//!     Component::new("article")
//!         .with_field(FieldDefinition::new("title", FieldKind::text().required()))
//!         .with_field(FieldDefinition::new("body", FieldKind::Blocks)),
//! )?;
//!
//! let store = InMemoryNodeStore::new();
//! let engine = ContentEngine::new(space, Arc::new(store), Arc::new(registry));
//!
//! let report = engine.validate_content(&payload, "article")?;
//! assert!(report.is_valid());
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

// Module declarations
pub mod components;
pub mod engine;
pub mod locks;
pub mod nodes;
pub mod translations;
pub mod tree;
pub mod validation;

// Prelude for convenient imports
pub mod prelude {
	//! Convenient re-exports of commonly used items

	// Components
	pub use crate::components::{
		Component, ComponentRegistry, FieldDefinition, FieldKind, InMemoryComponentRegistry,
		SelectOption,
	};

	// Validation
	pub use crate::validation::{SchemaValidator, ValidationReport};

	// Nodes
	pub use crate::nodes::{Actor, ContentNode, InMemoryNodeStore, NodeStatus, NodeStore, Space};

	// Tree
	pub use crate::tree::{Breadcrumb, TreeFields};

	// Locks
	pub use crate::locks::{LockInfo, LockManager};

	// Translations
	pub use crate::translations::{
		SyncField, TranslatableFields, TranslationOverrides, TranslationStatus,
		TranslationSynchronizer,
	};

	// Engine
	pub use crate::engine::ContentEngine;

	// Errors
	pub use crate::error::{EngineError, EngineResult};
}

/// Engine error types
pub mod error {
	use thiserror::Error;
	use uuid::Uuid;

	/// Errors raised by the content engine
	///
	/// Expected, frequent outcomes (a failed lock attempt, an invalid
	/// payload) are *not* errors: lock operations return booleans and
	/// validation returns a [`crate::validation::ValidationReport`]. The
	/// variants here cover conditions the caller must handle explicitly or
	/// that indicate already-broken invariants.
	#[derive(Error, Debug)]
	pub enum EngineError {
		/// Node not found in the store
		#[error("Content node not found: {0}")]
		NodeNotFound(Uuid),

		/// Another actor holds an active lock on the node
		#[error("Node {node} is locked by {locked_by} until {until}")]
		LockConflict {
			/// Node the conflicting lock sits on
			node: Uuid,
			/// Display name of the current lock holder
			locked_by: String,
			/// Expiry of the current lock
			until: chrono::DateTime<chrono::Utc>,
		},

		/// A translation for the language already exists in the group
		#[error("Translation for language '{language}' already exists in group {group}")]
		DuplicateTranslation {
			/// Language that was requested twice
			language: String,
			/// Translation group that already contains it
			group: Uuid,
		},

		/// Ancestor-chain traversal exceeded its sanity bound
		///
		/// Implies a corrupted `parent_id` graph; treated as a fatal
		/// data-integrity fault requiring manual repair.
		#[error("Cycle detected in parent chain at node {0}")]
		CycleDetected(Uuid),

		/// A referenced component schema could not be resolved
		#[error("Component schema not found: {0}")]
		SchemaMissing(String),

		/// Component registration conflict or malformed schema
		#[error("Invalid component schema: {0}")]
		InvalidSchema(String),

		/// Slug fails the allowed-character rules
		#[error(
			"Invalid slug '{0}': use lowercase letters, digits, hyphens or underscores, \
			 without a leading or trailing hyphen"
		)]
		InvalidSlug(String),

		/// Disallowed status transition
		#[error("Invalid status transition: {0}")]
		InvalidTransition(String),

		/// Underlying store failure
		#[error("Store error: {0}")]
		Storage(String),
	}

	/// Result type for engine operations
	pub type EngineResult<T> = Result<T, EngineError>;
}
