//! Component schemas and field definitions
//!
//! A [`Component`] is a reusable schema for one kind of content block: an
//! ordered list of typed [`FieldDefinition`]s keyed by a stable
//! `technical_name`. Content nodes carry trees of component *instances*;
//! the schemas defined here are what [`crate::validation`] checks those
//! instances against.

use crate::error::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// One selectable option of a [`FieldKind::Select`] or
/// [`FieldKind::Multiselect`] field
///
/// Options are compared by `value`, never by `label`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
	/// Human-readable label shown in the editor
	pub label: String,
	/// Stored value
	pub value: String,
}

impl SelectOption {
	/// Create a new option
	pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			label: label.into(),
			value: value.into(),
		}
	}
}

/// Field type, carrying only the constraints meaningful to it
///
/// Modeled as a tagged union so the validation dispatch is exhaustive at
/// compile time; a constraint that does not exist for a type cannot be
/// expressed for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
	/// Single-line text
	Text {
		/// Minimum length in characters
		#[serde(default, skip_serializing_if = "Option::is_none")]
		min_length: Option<usize>,
		/// Maximum length in characters
		#[serde(default, skip_serializing_if = "Option::is_none")]
		max_length: Option<usize>,
	},
	/// Multi-line plain text
	Textarea {
		/// Minimum length in characters
		#[serde(default, skip_serializing_if = "Option::is_none")]
		min_length: Option<usize>,
		/// Maximum length in characters
		#[serde(default, skip_serializing_if = "Option::is_none")]
		max_length: Option<usize>,
	},
	/// Markdown source text
	Markdown {
		/// Minimum length in characters
		#[serde(default, skip_serializing_if = "Option::is_none")]
		min_length: Option<usize>,
		/// Maximum length in characters
		#[serde(default, skip_serializing_if = "Option::is_none")]
		max_length: Option<usize>,
	},
	/// Rich text (serialized editor document)
	Richtext {
		/// Minimum length in characters
		#[serde(default, skip_serializing_if = "Option::is_none")]
		min_length: Option<usize>,
		/// Maximum length in characters
		#[serde(default, skip_serializing_if = "Option::is_none")]
		max_length: Option<usize>,
	},
	/// Numeric value
	Number {
		/// Inclusive lower bound
		#[serde(default, skip_serializing_if = "Option::is_none")]
		min: Option<f64>,
		/// Inclusive upper bound
		#[serde(default, skip_serializing_if = "Option::is_none")]
		max: Option<f64>,
	},
	/// Boolean flag
	Boolean,
	/// Calendar date
	Date,
	/// Date with time of day
	Datetime,
	/// Single choice from a fixed option set
	Select {
		/// Allowed options
		options: Vec<SelectOption>,
	},
	/// Multiple choices from a fixed option set
	Multiselect {
		/// Allowed options
		options: Vec<SelectOption>,
	},
	/// Image asset reference
	Image,
	/// File asset reference
	File,
	/// Generic asset reference
	Asset,
	/// Internal or external link
	Link,
	/// E-mail address
	Email,
	/// HTTP/HTTPS URL
	Url,
	/// CSS color value
	Color,
	/// Arbitrary JSON value
	Json,
	/// Tabular data
	Table,
	/// Nested array of component instances
	Blocks,
	/// Reference to another content node
	NodeReference,
	/// Single nested component instance
	ComponentReference,
}

impl FieldKind {
	/// Unconstrained single-line text
	pub fn text() -> Self {
		Self::Text {
			min_length: None,
			max_length: None,
		}
	}

	/// Unconstrained numeric field
	pub fn number() -> Self {
		Self::Number {
			min: None,
			max: None,
		}
	}

	/// Select field over the given options
	pub fn select(options: Vec<SelectOption>) -> Self {
		Self::Select { options }
	}

	/// Multiselect field over the given options
	pub fn multiselect(options: Vec<SelectOption>) -> Self {
		Self::Multiselect { options }
	}
}

/// One entry of a component schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
	/// Field key inside the component instance
	pub key: String,
	/// Whether an absent or empty value is a validation error
	#[serde(default)]
	pub required: bool,
	/// Field type and its constraints
	#[serde(flatten)]
	pub kind: FieldKind,
}

impl FieldDefinition {
	/// Create an optional field of the given kind
	///
	/// # Examples
	///
	/// ```
	/// use strata_engine::components::{FieldDefinition, FieldKind};
	///
	/// let field = FieldDefinition::new("title", FieldKind::text());
	/// assert_eq!(field.key, "title");
	/// assert!(!field.required);
	/// ```
	pub fn new(key: impl Into<String>, kind: FieldKind) -> Self {
		Self {
			key: key.into(),
			required: false,
			kind,
		}
	}

	/// Mark the field as required
	pub fn required(mut self) -> Self {
		self.required = true;
		self
	}
}

/// A schema definition for a class of content blocks
///
/// `technical_name` is the stable machine key content instances use to
/// reference the schema; it is unique within a space. `version` is bumped
/// whenever the schema changes. Components referenced by live content are
/// never hard-deleted, only marked via `deleted_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
	/// Component id
	pub id: Uuid,
	/// Stable machine key, unique within a space
	pub technical_name: String,
	/// Human-readable name shown in the editor
	pub display_name: Option<String>,
	/// Ordered field schema
	pub schema: Vec<FieldDefinition>,
	/// Schema version, bumped on every schema change
	pub version: u32,
	/// Creation timestamp
	pub created_at: DateTime<Utc>,
	/// Last modification timestamp
	pub updated_at: DateTime<Utc>,
	/// Soft-delete marker
	pub deleted_at: Option<DateTime<Utc>>,
}

impl Component {
	/// Create a new component with an empty schema
	///
	/// # Examples
	///
	/// ```
	/// use strata_engine::components::Component;
	///
	/// let component = Component::new("article");
	/// assert_eq!(component.technical_name, "article");
	/// assert_eq!(component.version, 1);
	/// ```
	pub fn new(technical_name: impl Into<String>) -> Self {
		let now = Utc::now();
		Self {
			id: Uuid::new_v4(),
			technical_name: technical_name.into(),
			display_name: None,
			schema: Vec::new(),
			version: 1,
			created_at: now,
			updated_at: now,
			deleted_at: None,
		}
	}

	/// Set the display name
	pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
		self.display_name = Some(name.into());
		self
	}

	/// Append a field to the schema
	pub fn with_field(mut self, field: FieldDefinition) -> Self {
		self.schema.push(field);
		self
	}

	/// Look up a schema field by key
	pub fn field(&self, key: &str) -> Option<&FieldDefinition> {
		self.schema.iter().find(|f| f.key == key)
	}

	/// Whether the component has been soft-deleted
	pub fn is_deleted(&self) -> bool {
		self.deleted_at.is_some()
	}

	// Schema entries must have unique keys and the technical name must be
	// non-empty; checked on registration, not construction, so builders can
	// stay infallible.
	fn ensure_well_formed(&self) -> EngineResult<()> {
		if self.technical_name.is_empty() {
			return Err(EngineError::InvalidSchema(
				"technical_name must not be empty".to_string(),
			));
		}
		let mut seen = HashSet::new();
		for field in &self.schema {
			if !seen.insert(field.key.as_str()) {
				return Err(EngineError::InvalidSchema(format!(
					"duplicate field key '{}' in component '{}'",
					field.key, self.technical_name
				)));
			}
		}
		Ok(())
	}
}

/// Capability to resolve a component schema by technical name
///
/// The validator uses this for nested block validation; implementations are
/// expected to be already scoped to one space.
pub trait ComponentRegistry: Send + Sync {
	/// Resolve a component by technical name
	fn get(&self, technical_name: &str) -> Option<Component>;

	/// Resolve just the field schema of a component
	///
	/// Soft-deleted components still resolve: live content may reference
	/// them until it is migrated away.
	fn schema(&self, technical_name: &str) -> Option<Vec<FieldDefinition>> {
		self.get(technical_name).map(|c| c.schema)
	}
}

/// In-memory component registry
///
/// # Examples
///
/// ```
/// use strata_engine::components::{Component, ComponentRegistry, InMemoryComponentRegistry};
///
/// let registry = InMemoryComponentRegistry::new();
/// registry.register(Component::new("hero")).unwrap();
/// assert!(registry.get("hero").is_some());
/// assert!(registry.register(Component::new("hero")).is_err());
/// ```
pub struct InMemoryComponentRegistry {
	components: RwLock<HashMap<String, Component>>,
}

impl InMemoryComponentRegistry {
	/// Create an empty registry
	pub fn new() -> Self {
		Self {
			components: RwLock::new(HashMap::new()),
		}
	}

	/// Register a new component
	///
	/// Fails when the technical name is already taken or the schema has
	/// duplicate field keys.
	pub fn register(&self, component: Component) -> EngineResult<()> {
		component.ensure_well_formed()?;
		let mut components = self.components.write();
		if components.contains_key(&component.technical_name) {
			return Err(EngineError::InvalidSchema(format!(
				"component '{}' is already registered",
				component.technical_name
			)));
		}
		components.insert(component.technical_name.clone(), component);
		Ok(())
	}

	/// Replace a registered component's schema
	///
	/// Bumps `version` when the field schema actually changed and returns
	/// the stored component.
	pub fn update(&self, component: Component) -> EngineResult<Component> {
		component.ensure_well_formed()?;
		let mut components = self.components.write();
		let existing = components
			.get(&component.technical_name)
			.ok_or_else(|| EngineError::SchemaMissing(component.technical_name.clone()))?;

		let mut updated = component;
		updated.id = existing.id;
		updated.created_at = existing.created_at;
		updated.version = if updated.schema != existing.schema {
			existing.version + 1
		} else {
			existing.version
		};
		updated.updated_at = Utc::now();
		components.insert(updated.technical_name.clone(), updated.clone());
		Ok(updated)
	}

	/// Soft-delete a component
	///
	/// The schema stays resolvable for content that still references it.
	pub fn mark_deleted(&self, technical_name: &str) -> EngineResult<()> {
		let mut components = self.components.write();
		let component = components
			.get_mut(technical_name)
			.ok_or_else(|| EngineError::SchemaMissing(technical_name.to_string()))?;
		component.deleted_at = Some(Utc::now());
		Ok(())
	}

	/// All registered components, including soft-deleted ones
	pub fn all(&self) -> Vec<Component> {
		self.components.read().values().cloned().collect()
	}
}

impl ComponentRegistry for InMemoryComponentRegistry {
	fn get(&self, technical_name: &str) -> Option<Component> {
		self.components.read().get(technical_name).cloned()
	}
}

impl Default for InMemoryComponentRegistry {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_update_bumps_version_on_schema_change() {
		let registry = InMemoryComponentRegistry::new();
		registry
			.register(Component::new("article").with_field(FieldDefinition::new(
				"title",
				FieldKind::text(),
			)))
			.unwrap();

		let mut changed = registry.get("article").unwrap();
		changed.schema.push(FieldDefinition::new("subtitle", FieldKind::text()));
		let stored = registry.update(changed).unwrap();
		assert_eq!(stored.version, 2);

		// Re-storing the same schema keeps the version
		let unchanged = registry.get("article").unwrap();
		let stored = registry.update(unchanged).unwrap();
		assert_eq!(stored.version, 2);
	}

	#[test]
	fn test_duplicate_field_keys_rejected() {
		let registry = InMemoryComponentRegistry::new();
		let component = Component::new("broken")
			.with_field(FieldDefinition::new("title", FieldKind::text()))
			.with_field(FieldDefinition::new("title", FieldKind::text()));
		assert!(registry.register(component).is_err());
	}

	#[test]
	fn test_soft_deleted_schema_stays_resolvable() {
		let registry = InMemoryComponentRegistry::new();
		registry.register(Component::new("legacy")).unwrap();
		registry.mark_deleted("legacy").unwrap();

		let component = registry.get("legacy").unwrap();
		assert!(component.is_deleted());
		assert!(registry.schema("legacy").is_some());
	}
}
