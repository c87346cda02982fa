//! Schema-driven payload validation
//!
//! [`SchemaValidator`] checks a content payload against a component's field
//! schema. Validation is purely structural and side-effect-free: no I/O, no
//! mutation, so it runs synchronously on every write. Errors are collected
//! per field instead of short-circuiting, so a caller can report every
//! problem in one response.

use crate::components::{ComponentRegistry, FieldDefinition, FieldKind, SelectOption};
use crate::error::{EngineError, EngineResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

// HTTP/HTTPS URL pattern.
//
// Validates URLs with:
// - http or https scheme only
// - Valid domain labels (no leading/trailing hyphens)
// - Optional port number (1-5 digits)
// - Optional path, query string, and fragment
static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r"^https?://[a-zA-Z0-9]([a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9\-]*[a-zA-Z0-9])?)*(:[0-9]{1,5})?(/[^\s?#]*)?(\?[^\s#]*)?(#[^\s]*)?$",
	)
	.expect("URL_REGEX: invalid regex pattern")
});

// Pragmatic e-mail pattern: local part, @, domain with at least one dot.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$")
		.expect("EMAIL_REGEX: invalid regex pattern")
});

// ASCII slug pattern: lowercase letters, digits, hyphens, underscores.
//
// Does not allow hyphens at the start or end of the slug.
static SLUG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^[a-z0-9][a-z0-9_-]*[a-z0-9]$|^[a-z0-9]$")
		.expect("SLUG_REGEX: invalid regex pattern")
});

/// Whether a string is a valid URL slug segment
///
/// # Examples
///
/// ```
/// use strata_engine::validation::is_valid_slug;
///
/// assert!(is_valid_slug("my-article"));
/// assert!(is_valid_slug("page_1"));
/// assert!(!is_valid_slug("-leading"));
/// assert!(!is_valid_slug("Has Space"));
/// assert!(!is_valid_slug(""));
/// ```
pub fn is_valid_slug(slug: &str) -> bool {
	SLUG_REGEX.is_match(slug)
}

/// Per-field validation errors
///
/// An empty report means the payload is valid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
	errors: HashMap<String, String>,
}

impl ValidationReport {
	/// Create an empty (valid) report
	pub fn new() -> Self {
		Self::default()
	}

	/// Whether no field failed validation
	pub fn is_valid(&self) -> bool {
		self.errors.is_empty()
	}

	/// The error message recorded for a field, if any
	pub fn error(&self, field: &str) -> Option<&str> {
		self.errors.get(field).map(String::as_str)
	}

	/// All errors, keyed by field path (`body.0.title` for nested blocks)
	pub fn errors(&self) -> &HashMap<String, String> {
		&self.errors
	}

	/// Consume the report, yielding the error map
	pub fn into_errors(self) -> HashMap<String, String> {
		self.errors
	}

	fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
		self.errors.insert(field.into(), message.into());
	}

	fn merge_nested(&mut self, prefix: &str, nested: ValidationReport) {
		for (key, message) in nested.errors {
			self.errors.insert(format!("{prefix}.{key}"), message);
		}
	}
}

// Absent, null, empty string, empty array and empty object all count as
// "no value" for the required check.
fn is_empty_value(value: Option<&JsonValue>) -> bool {
	match value {
		None | Some(JsonValue::Null) => true,
		Some(JsonValue::String(s)) => s.is_empty(),
		Some(JsonValue::Array(items)) => items.is_empty(),
		Some(JsonValue::Object(map)) => map.is_empty(),
		Some(_) => false,
	}
}

// Canonical boolean-ish literals accepted alongside real booleans.
fn is_boolean_ish(value: &JsonValue) -> bool {
	match value {
		JsonValue::Bool(_) => true,
		JsonValue::Number(n) => n.as_i64() == Some(0) || n.as_i64() == Some(1),
		JsonValue::String(s) => matches!(s.as_str(), "0" | "1" | "true" | "false"),
		_ => false,
	}
}

fn matches_option(value: &str, options: &[SelectOption]) -> bool {
	options.iter().any(|option| option.value == value)
}

/// Validates content payloads against component schemas
///
/// Holds a [`ComponentRegistry`] so nested `blocks` and component-reference
/// values can recurse into the referenced component's own schema.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use serde_json::json;
/// use strata_engine::components::{Component, FieldDefinition, FieldKind, InMemoryComponentRegistry};
/// use strata_engine::validation::SchemaValidator;
///
/// let registry = InMemoryComponentRegistry::new();
/// let schema = vec![FieldDefinition::new("title", FieldKind::text()).required()];
///
/// let validator = SchemaValidator::new(Arc::new(registry));
/// let report = validator.validate(json!({"title": "Hello"}).as_object().unwrap(), &schema);
/// assert!(report.is_valid());
/// ```
#[derive(Clone)]
pub struct SchemaValidator {
	registry: Arc<dyn ComponentRegistry>,
}

impl SchemaValidator {
	/// Create a validator over the given registry
	pub fn new(registry: Arc<dyn ComponentRegistry>) -> Self {
		Self { registry }
	}

	/// Validate a payload against the named component's schema
	///
	/// Fails with [`EngineError::SchemaMissing`] when the component itself
	/// cannot be resolved; unresolvable components referenced by *nested*
	/// blocks are reported as field errors instead.
	pub fn validate_component(
		&self,
		payload: &JsonMap<String, JsonValue>,
		technical_name: &str,
	) -> EngineResult<ValidationReport> {
		let schema = self
			.registry
			.schema(technical_name)
			.ok_or_else(|| EngineError::SchemaMissing(technical_name.to_string()))?;
		Ok(self.validate(payload, &schema))
	}

	/// Validate a payload against a field schema
	///
	/// Iterates schema fields in order. A missing required value records an
	/// error and skips further checks for that field; present values are
	/// dispatched to their type-specific checker.
	pub fn validate(
		&self,
		payload: &JsonMap<String, JsonValue>,
		schema: &[FieldDefinition],
	) -> ValidationReport {
		let mut report = ValidationReport::new();
		for field in schema {
			let value = payload.get(&field.key);
			if is_empty_value(value) {
				if field.required {
					report.add(&field.key, format!("Field '{}' is required", field.key));
				}
				continue;
			}
			// is_empty_value returned false, so the value is present
			let value = value.expect("present value");
			self.check_value(&field.key, &field.kind, value, &mut report);
		}
		report
	}

	fn check_value(
		&self,
		key: &str,
		kind: &FieldKind,
		value: &JsonValue,
		report: &mut ValidationReport,
	) {
		match kind {
			FieldKind::Text {
				min_length,
				max_length,
			}
			| FieldKind::Textarea {
				min_length,
				max_length,
			}
			| FieldKind::Markdown {
				min_length,
				max_length,
			}
			| FieldKind::Richtext {
				min_length,
				max_length,
			} => {
				self.check_string(key, value, *min_length, *max_length, report);
			}
			FieldKind::Number { min, max } => match value.as_f64() {
				Some(n) => {
					if let Some(min) = min {
						if n < *min {
							report.add(key, format!("Value must be at least {min}"));
							return;
						}
					}
					if let Some(max) = max {
						if n > *max {
							report.add(key, format!("Value must not exceed {max}"));
						}
					}
				}
				None => report.add(key, "Value must be numeric"),
			},
			FieldKind::Boolean => {
				if !is_boolean_ish(value) {
					report.add(key, "Value must be a boolean");
				}
			}
			FieldKind::Email => match value.as_str() {
				Some(s) if EMAIL_REGEX.is_match(s) => {}
				_ => report.add(key, "Enter a valid e-mail address"),
			},
			FieldKind::Url => match value.as_str() {
				Some(s) if URL_REGEX.is_match(s) => {}
				_ => report.add(key, "Enter a valid URL"),
			},
			FieldKind::Date => match value.as_str() {
				Some(s) if NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() => {}
				_ => report.add(key, "Enter a valid date (YYYY-MM-DD)"),
			},
			FieldKind::Datetime => match value.as_str() {
				Some(s) if parses_as_datetime(s) => {}
				_ => report.add(key, "Enter a valid date and time"),
			},
			FieldKind::Select { options } => match value.as_str() {
				Some(s) if matches_option(s, options) => {}
				_ => report.add(key, "Select a valid choice"),
			},
			FieldKind::Multiselect { options } => match value.as_array() {
				Some(items) => {
					let all_valid = items.iter().all(|item| {
						item.as_str()
							.map(|s| matches_option(s, options))
							.unwrap_or(false)
					});
					if !all_valid {
						report.add(key, "Select valid choices");
					}
				}
				None => report.add(key, "Value must be a list of choices"),
			},
			FieldKind::Json => {
				if let Some(s) = value.as_str() {
					if serde_json::from_str::<JsonValue>(s).is_err() {
						report.add(key, "Value must be valid JSON");
					}
				}
				// Already-structured values are accepted as-is
			}
			FieldKind::Blocks => match value.as_array() {
				Some(items) => {
					for (index, item) in items.iter().enumerate() {
						self.check_block(&format!("{key}.{index}"), item, report);
					}
				}
				None => report.add(key, "Value must be a list of blocks"),
			},
			FieldKind::ComponentReference => {
				self.check_block(key, value, report);
			}
			// Remaining kinds get structural validation only; the required
			// check above already rejected empty values.
			FieldKind::Image
			| FieldKind::File
			| FieldKind::Asset
			| FieldKind::Link
			| FieldKind::Color
			| FieldKind::Table
			| FieldKind::NodeReference => {}
		}
	}

	fn check_string(
		&self,
		key: &str,
		value: &JsonValue,
		min_length: Option<usize>,
		max_length: Option<usize>,
		report: &mut ValidationReport,
	) {
		let Some(s) = value.as_str() else {
			report.add(key, "Value must be a string");
			return;
		};
		let length = s.chars().count();
		if let Some(min) = min_length {
			if length < min {
				report.add(key, format!("Value must be at least {min} characters"));
				return;
			}
		}
		if let Some(max) = max_length {
			if length > max {
				report.add(key, format!("Value must not exceed {max} characters"));
			}
		}
	}

	// One component instance: an object tagged with a `component` reference
	// whose remaining fields validate against that component's schema.
	fn check_block(&self, path: &str, value: &JsonValue, report: &mut ValidationReport) {
		let Some(instance) = value.as_object() else {
			report.add(path, "Block must be an object");
			return;
		};
		let Some(component_ref) = instance.get("component").and_then(JsonValue::as_str) else {
			report.add(path, "Block is missing its component reference");
			return;
		};
		match self.registry.schema(component_ref) {
			Some(schema) => {
				let nested = self.validate(instance, &schema);
				report.merge_nested(path, nested);
			}
			None => {
				report.add(path, format!("Unknown component '{component_ref}'"));
			}
		}
	}
}

fn parses_as_datetime(s: &str) -> bool {
	DateTime::parse_from_rfc3339(s).is_ok()
		|| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
		|| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").is_ok()
}
