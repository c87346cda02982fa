//! Translation groups, structural sync and completeness metrics
//!
//! Content nodes that represent the same logical content in different
//! languages share a `translation_group_id`. The synchronizer forms those
//! groups, propagates *structural* changes from a source node to its
//! siblings while preserving already-translated text, and computes
//! completion and staleness metrics per language.
//!
//! Content blocks are unordered, insertable and deletable independently per
//! language, so positional array diffing would misalign edits; blocks are
//! correlated across languages by their stable `_uid` instead.

use crate::error::{EngineError, EngineResult};
use crate::nodes::{Actor, ContentNode, NodeStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Stable per-instance id carried by every content block
const UID_KEY: &str = "_uid";

/// Component reference tag carried by every content block
const COMPONENT_KEY: &str = "component";

/// Marker set on blocks a sync pass appended to a translation
pub const TRANSLATION_NEEDED_KEY: &str = "_translation_needed";

/// Predicate deciding whether a field name carries translatable text
///
/// The classifier is heuristic: a field is considered translatable when its
/// name contains one of the configured words (case-insensitive substring
/// match). The default word list mirrors common editorial field names; it
/// is approximate by nature and tunable per space.
///
/// # Examples
///
/// ```
/// use strata_engine::translations::TranslatableFields;
///
/// let fields = TranslatableFields::default();
/// assert!(fields.is_translatable("title"));
/// assert!(fields.is_translatable("meta_description"));
/// assert!(!fields.is_translatable("canonical_url"));
/// assert!(!fields.is_translatable("_uid"));
/// ```
#[derive(Debug, Clone)]
pub struct TranslatableFields {
	words: Vec<String>,
}

impl TranslatableFields {
	/// Build a predicate over a custom word list
	pub fn new(words: impl IntoIterator<Item = impl Into<String>>) -> Self {
		Self {
			words: words.into_iter().map(|w| w.into().to_lowercase()).collect(),
		}
	}

	/// Whether a field of this name is expected to differ per language
	///
	/// Internal keys (underscore-prefixed) and the component tag are never
	/// translatable.
	pub fn is_translatable(&self, field_name: &str) -> bool {
		if field_name.starts_with('_') || field_name == COMPONENT_KEY {
			return false;
		}
		let lower = field_name.to_lowercase();
		self.words.iter().any(|word| lower.contains(word.as_str()))
	}
}

impl Default for TranslatableFields {
	fn default() -> Self {
		Self::new([
			"text",
			"title",
			"description",
			"content",
			"body",
			"headline",
			"subtitle",
			"caption",
			"alt_text",
			"meta_title",
			"meta_description",
		])
	}
}

/// Which node fields a sync pass covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncField {
	/// The structured content tree
	Content,
	/// The editorial metadata object
	MetaData,
}

impl SyncField {
	/// Both content and metadata, the default sync scope
	pub const ALL: [SyncField; 2] = [SyncField::Content, SyncField::MetaData];
}

/// Explicit overrides applied when creating a translation
#[derive(Debug, Clone, Default)]
pub struct TranslationOverrides {
	/// Replacement display name
	pub name: Option<String>,
	/// Replacement slug
	pub slug: Option<String>,
	/// Replacement content tree
	pub content: Option<JsonValue>,
	/// Replacement metadata object
	pub meta_data: Option<JsonValue>,
}

impl TranslationOverrides {
	/// No overrides; the translation starts as a copy of the source
	pub fn none() -> Self {
		Self::default()
	}

	/// Override the display name
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	/// Override the slug
	pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
		self.slug = Some(slug.into());
		self
	}

	/// Override the content tree
	pub fn with_content(mut self, content: JsonValue) -> Self {
		self.content = Some(content);
		self
	}

	/// Override the metadata object
	pub fn with_meta_data(mut self, meta_data: JsonValue) -> Self {
		self.meta_data = Some(meta_data);
		self
	}
}

/// Per-language translation state of a group member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationStatus {
	/// Share of translatable fields with a non-empty value, 0..=100
	pub completion_percentage: u8,
	/// Last modification of the member
	pub last_updated: DateTime<Utc>,
	/// Whether the group's source changed after this member did
	pub needs_sync: bool,
}

/// Groups translations, propagates structural changes, measures progress
#[derive(Debug, Clone)]
pub struct TranslationSynchronizer {
	translatable: TranslatableFields,
	meta_allowlist: Vec<String>,
}

impl TranslationSynchronizer {
	/// Create a synchronizer with the default translatable-field heuristic
	/// and metadata allow-list
	pub fn new() -> Self {
		Self {
			translatable: TranslatableFields::default(),
			meta_allowlist: vec![
				"canonical_url".to_string(),
				"robots".to_string(),
				"structured_data".to_string(),
			],
		}
	}

	/// Replace the translatable-field predicate
	pub fn with_translatable_fields(mut self, translatable: TranslatableFields) -> Self {
		self.translatable = translatable;
		self
	}

	/// Replace the metadata keys copied between translations
	pub fn with_meta_allowlist(
		mut self,
		keys: impl IntoIterator<Item = impl Into<String>>,
	) -> Self {
		self.meta_allowlist = keys.into_iter().map(Into::into).collect();
		self
	}

	/// The active translatable-field predicate
	pub fn translatable_fields(&self) -> &TranslatableFields {
		&self.translatable
	}

	/// Create a new translation of `source` in `target_language`
	///
	/// Fails with [`EngineError::DuplicateTranslation`] when the group
	/// already has a member in that language. The new node inherits the
	/// source's position and content (subject to `overrides`), starts as a
	/// draft, and joins the source's translation group; the group id
	/// defaults to the source's own id and is backfilled onto the source
	/// when the source was not grouped yet. Every member's cached language
	/// list is refreshed afterwards.
	pub async fn create_translation(
		&self,
		store: &dyn NodeStore,
		source: &ContentNode,
		target_language: &str,
		overrides: TranslationOverrides,
		actor: &Actor,
	) -> EngineResult<ContentNode> {
		let group_id = source.translation_group_id.unwrap_or(source.id);

		let mut languages: Vec<String> = store
			.find_by_group(group_id)
			.await?
			.into_iter()
			.map(|member| member.language)
			.collect();
		// An ungrouped source is not in the index yet but is still a member
		if source.translation_group_id.is_none() {
			languages.push(source.language.clone());
		}
		if languages.iter().any(|language| language == target_language) {
			return Err(EngineError::DuplicateTranslation {
				language: target_language.to_string(),
				group: group_id,
			});
		}

		let mut translation = ContentNode::new(
			overrides.name.clone().unwrap_or_else(|| source.name.clone()),
			overrides.slug.clone().unwrap_or_else(|| source.slug.clone()),
			target_language,
		);
		translation.parent_id = source.parent_id;
		translation.is_folder = source.is_folder;
		translation.content = overrides.content.unwrap_or_else(|| source.content.clone());
		translation.meta_data = overrides
			.meta_data
			.unwrap_or_else(|| source.meta_data.clone());
		translation.translation_group_id = Some(group_id);
		store.save(&translation).await?;

		if source.translation_group_id.is_none() {
			let mut origin = source.clone();
			origin.translation_group_id = Some(group_id);
			store.save(&origin).await?;
		}

		// Refresh every member's cached language list to current membership
		let members = store.find_by_group(group_id).await?;
		let mut group_languages: Vec<String> =
			members.iter().map(|member| member.language.clone()).collect();
		group_languages.sort();
		for mut member in members {
			member.translated_languages = group_languages.clone();
			store.save(&member).await?;
		}

		info!(
			source = %source.id,
			translation = %translation.id,
			language = target_language,
			actor = %actor.id,
			"translation created"
		);
		// Return the stored shape, including the refreshed language cache
		let mut created = translation;
		created.translated_languages = group_languages;
		Ok(created)
	}

	/// Whether two nodes are translations of one another
	pub fn is_translation_of(&self, a: &ContentNode, b: &ContentNode) -> bool {
		a.id != b.id
			&& a.translation_group_id.is_some()
			&& a.translation_group_id == b.translation_group_id
	}

	/// Propagate structural (non-text) changes from `source` into `target`
	///
	/// Keys absent from the target, and non-translatable values, are copied
	/// over; translated text in the target is preserved. Block arrays are
	/// merged by `_uid`: matched pairs merge recursively, and source blocks
	/// with no counterpart are appended flagged
	/// [`TRANSLATION_NEEDED_KEY`]. Returns whether the target changed.
	pub fn sync_content(
		&self,
		target: &mut ContentNode,
		source: &ContentNode,
		fields: &[SyncField],
	) -> bool {
		let mut changed = false;
		for field in fields {
			changed |= match field {
				SyncField::Content => self.merge_value(&mut target.content, &source.content),
				SyncField::MetaData => self.merge_meta(&mut target.meta_data, &source.meta_data),
			};
		}
		if changed {
			target.updated_at = Utc::now();
			debug!(target = %target.id, source = %source.id, "translation structure synced");
		}
		changed
	}

	/// Translation state of every member of the node's group, by language
	///
	/// An ungrouped node reports only itself. `needs_sync` compares each
	/// member against the group's designated source: the member whose id
	/// equals the group id (the origin the group was formed from), falling
	/// back to the oldest member when the origin is gone.
	pub async fn translation_status(
		&self,
		store: &dyn NodeStore,
		node: &ContentNode,
	) -> EngineResult<HashMap<String, TranslationStatus>> {
		let members = match node.translation_group_id {
			Some(group_id) => store.find_by_group(group_id).await?,
			None => vec![node.clone()],
		};

		let source_id = self.designated_source(node.translation_group_id, &members);
		let source_updated = members
			.iter()
			.find(|member| Some(member.id) == source_id)
			.map(|member| member.updated_at);

		let mut statuses = HashMap::new();
		for member in &members {
			let needs_sync = match (source_id, source_updated) {
				(Some(source_id), Some(source_updated)) => {
					member.id != source_id && source_updated > member.updated_at
				}
				_ => false,
			};
			statuses.insert(
				member.language.clone(),
				TranslationStatus {
					completion_percentage: self.completion_of(member),
					last_updated: member.updated_at,
					needs_sync,
				},
			);
		}
		Ok(statuses)
	}

	/// Source fields whose translation is missing in `target`
	///
	/// Walks the source content; a leaf string counts as untranslated when
	/// the corresponding target field is empty or byte-identical to the
	/// source value (identical text is a strong signal it was never
	/// retranslated). Returns a map of field path to source text.
	pub fn find_untranslated_fields(
		&self,
		target: &ContentNode,
		source: &ContentNode,
	) -> HashMap<String, String> {
		let mut untranslated = HashMap::new();
		self.walk_untranslated("", &source.content, Some(&target.content), &mut untranslated);
		untranslated
	}

	fn designated_source(
		&self,
		group_id: Option<Uuid>,
		members: &[ContentNode],
	) -> Option<Uuid> {
		let origin = group_id.and_then(|group_id| {
			members
				.iter()
				.find(|member| member.id == group_id)
				.map(|member| member.id)
		});
		origin.or_else(|| {
			members
				.iter()
				.min_by_key(|member| member.created_at)
				.map(|member| member.id)
		})
	}

	// Completion = non-empty translatable fields over all translatable
	// fields in the member's own content tree; clamped to 0..=100. A tree
	// with nothing to translate counts as complete.
	fn completion_of(&self, node: &ContentNode) -> u8 {
		let mut total = 0usize;
		let mut translated = 0usize;
		self.count_translatable(&node.content, &mut total, &mut translated);
		if total == 0 {
			return 100;
		}
		let percentage = (100.0 * translated as f64 / total as f64).round() as u64;
		percentage.min(100) as u8
	}

	fn count_translatable(&self, value: &JsonValue, total: &mut usize, translated: &mut usize) {
		match value {
			JsonValue::Object(map) => {
				for (key, child) in map {
					match child {
						JsonValue::String(text) if self.translatable.is_translatable(key) => {
							*total += 1;
							if !text.trim().is_empty() {
								*translated += 1;
							}
						}
						JsonValue::Object(_) | JsonValue::Array(_) => {
							self.count_translatable(child, total, translated);
						}
						_ => {}
					}
				}
			}
			JsonValue::Array(items) => {
				for item in items {
					self.count_translatable(item, total, translated);
				}
			}
			_ => {}
		}
	}

	// Structural merge of one value. Objects merge key-wise; block arrays
	// merge by _uid; anything else is left to the key-level rule in
	// merge_key.
	fn merge_value(&self, target: &mut JsonValue, source: &JsonValue) -> bool {
		match (target, source) {
			(JsonValue::Object(target_map), JsonValue::Object(source_map)) => {
				let mut changed = false;
				for (key, source_child) in source_map {
					changed |= self.merge_key(target_map, key, source_child);
				}
				changed
			}
			(JsonValue::Array(target_items), JsonValue::Array(source_items))
				if is_block_array(source_items) =>
			{
				self.merge_blocks(target_items, source_items)
			}
			_ => false,
		}
	}

	fn merge_key(
		&self,
		target_map: &mut serde_json::Map<String, JsonValue>,
		key: &str,
		source_child: &JsonValue,
	) -> bool {
		if !target_map.contains_key(key) {
			// Absent from the target entirely; adopt the source value. A
			// block array enters through the block merge so its members
			// get flagged for translation.
			if let JsonValue::Array(source_items) = source_child {
				if is_block_array(source_items) {
					let mut adopted = Vec::new();
					self.merge_blocks(&mut adopted, source_items);
					target_map.insert(key.to_string(), JsonValue::Array(adopted));
					return true;
				}
			}
			target_map.insert(key.to_string(), source_child.clone());
			return true;
		}

		let target_child = target_map.get_mut(key).expect("key present");
		match (target_child, source_child) {
			(nested @ JsonValue::Object(_), JsonValue::Object(_)) => {
				self.merge_value(nested, source_child)
			}
			(JsonValue::Array(target_items), JsonValue::Array(source_items))
				if is_block_array(source_items) =>
			{
				self.merge_blocks(target_items, source_items)
			}
			(target_child, source_child) => {
				// Scalar or mixed shape: non-translatable values follow
				// the source, translated text stays.
				if !self.translatable.is_translatable(key) && target_child != source_child {
					*target_child = source_child.clone();
					true
				} else {
					false
				}
			}
		}
	}

	fn merge_blocks(&self, target_items: &mut Vec<JsonValue>, source_items: &[JsonValue]) -> bool {
		let mut changed = false;
		for source_block in source_items {
			let Some(uid) = block_uid(source_block) else {
				// No stable id, no reliable correlation; leave it alone
				continue;
			};
			match target_items
				.iter_mut()
				.find(|candidate| block_uid(candidate) == Some(uid))
			{
				Some(target_block) => {
					changed |= self.merge_value(target_block, source_block);
				}
				None => {
					let mut appended = source_block.clone();
					if let Some(block) = appended.as_object_mut() {
						block.insert(TRANSLATION_NEEDED_KEY.to_string(), JsonValue::Bool(true));
					}
					target_items.push(appended);
					changed = true;
				}
			}
		}
		changed
	}

	// Only the fixed allow-list of non-translatable metadata keys follows
	// the source; translatable metadata stays untouched.
	fn merge_meta(&self, target: &mut JsonValue, source: &JsonValue) -> bool {
		let Some(source_map) = source.as_object() else {
			return false;
		};
		if !target.is_object() {
			*target = JsonValue::Object(serde_json::Map::new());
		}
		let target_map = target.as_object_mut().expect("object ensured above");

		let mut changed = false;
		for key in &self.meta_allowlist {
			if let Some(source_value) = source_map.get(key) {
				if target_map.get(key) != Some(source_value) {
					target_map.insert(key.clone(), source_value.clone());
					changed = true;
				}
			}
		}
		changed
	}

	fn walk_untranslated(
		&self,
		path: &str,
		source: &JsonValue,
		target: Option<&JsonValue>,
		untranslated: &mut HashMap<String, String>,
	) {
		match source {
			JsonValue::Object(source_map) => {
				for (key, source_child) in source_map {
					if key.starts_with('_') || key == COMPONENT_KEY {
						continue;
					}
					let child_path = join_path(path, key);
					let target_child = target.and_then(|t| t.get(key));
					match source_child {
						JsonValue::String(text) if self.translatable.is_translatable(key) => {
							if text.is_empty() {
								continue;
							}
							let missing = match target_child.and_then(JsonValue::as_str) {
								None => true,
								Some(translated) => {
									translated.is_empty() || translated == text.as_str()
								}
							};
							if missing {
								untranslated.insert(child_path, text.clone());
							}
						}
						JsonValue::Object(_) => {
							self.walk_untranslated(
								&child_path,
								source_child,
								target_child,
								untranslated,
							);
						}
						JsonValue::Array(source_items) => {
							for (index, source_item) in source_items.iter().enumerate() {
								// Correlate blocks by uid, fall back to position
								let target_item = match block_uid(source_item) {
									Some(uid) => target_child.and_then(|t| {
										t.as_array()?.iter().find(|c| block_uid(c) == Some(uid))
									}),
									None => target_child.and_then(|t| t.get(index)),
								};
								self.walk_untranslated(
									&format!("{child_path}.{index}"),
									source_item,
									target_item,
									untranslated,
								);
							}
						}
						_ => {}
					}
				}
			}
			JsonValue::Array(source_items) => {
				for (index, source_item) in source_items.iter().enumerate() {
					let target_item = target.and_then(|t| t.get(index));
					self.walk_untranslated(
						&format!("{path}.{index}"),
						source_item,
						target_item,
						untranslated,
					);
				}
			}
			_ => {}
		}
	}
}

impl Default for TranslationSynchronizer {
	fn default() -> Self {
		Self::new()
	}
}

fn block_uid(value: &JsonValue) -> Option<&str> {
	value.get(UID_KEY).and_then(JsonValue::as_str)
}

fn is_block_array(items: &[JsonValue]) -> bool {
	items.iter().any(|item| block_uid(item).is_some())
}

fn join_path(path: &str, key: &str) -> String {
	if path.is_empty() {
		key.to_string()
	} else {
		format!("{path}.{key}")
	}
}
