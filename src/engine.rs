//! Engine facade
//!
//! [`ContentEngine`] wires the node store, component registry, validator,
//! lock manager and translation synchronizer behind the surface the thin
//! HTTP layer consumes. Tenant context ([`Space`]) and actor identity are
//! explicit values threaded through every call; the engine holds no
//! ambient state.
//!
//! The typical edit flow: acquire a lock on the target node, submit a
//! payload through [`ContentEngine::save_content`] (validates against the
//! node's component schema, mutates on success), recompute tree fields if
//! hierarchy-affecting fields changed, optionally trigger a sync pass to
//! sibling translations, release the lock or let it expire.

use crate::components::ComponentRegistry;
use crate::error::{EngineError, EngineResult};
use crate::locks::{LockInfo, LockManager};
use crate::nodes::{Actor, ContentNode, NodeStatus, NodeStore, Space};
use crate::translations::{
	SyncField, TranslationOverrides, TranslationStatus, TranslationSynchronizer,
};
use crate::tree::{self, TreeFields};
use crate::validation::{SchemaValidator, ValidationReport, is_valid_slug};
use chrono::{Duration, Utc};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// The structured content engine
///
/// # Examples
///
/// ```rust,ignore
/// let engine = ContentEngine::new(space, Arc::new(store), Arc::new(registry));
///
/// let node = engine.create_node(ContentNode::new("Blog", "blog", "en")).await?;
/// assert!(engine.lock(node.id, &actor, Some("session-1"), None).await?);
///
/// let report = engine
///     .save_content(node.id, payload, "article", &actor, Some("session-1"))
///     .await?;
/// assert!(report.is_valid());
/// ```
pub struct ContentEngine {
	space: Space,
	store: Arc<dyn NodeStore>,
	registry: Arc<dyn ComponentRegistry>,
	validator: SchemaValidator,
	locks: LockManager,
	translations: TranslationSynchronizer,
}

impl ContentEngine {
	/// Create an engine over the given store and registry
	pub fn new(
		space: Space,
		store: Arc<dyn NodeStore>,
		registry: Arc<dyn ComponentRegistry>,
	) -> Self {
		let validator = SchemaValidator::new(registry.clone());
		Self {
			space,
			store,
			registry,
			validator,
			locks: LockManager::new(),
			translations: TranslationSynchronizer::new(),
		}
	}

	/// Replace the lock manager (custom default duration)
	pub fn with_lock_manager(mut self, locks: LockManager) -> Self {
		self.locks = locks;
		self
	}

	/// Replace the translation synchronizer (custom heuristics)
	pub fn with_synchronizer(mut self, translations: TranslationSynchronizer) -> Self {
		self.translations = translations;
		self
	}

	/// The space this engine operates in
	pub fn space(&self) -> &Space {
		&self.space
	}

	/// The component registry backing validation
	pub fn registry(&self) -> &Arc<dyn ComponentRegistry> {
		&self.registry
	}

	async fn get_node(&self, id: Uuid) -> EngineResult<ContentNode> {
		self.store
			.get(id)
			.await?
			.ok_or(EngineError::NodeNotFound(id))
	}

	// ------------------------------------------------------------------
	// Nodes & tree
	// ------------------------------------------------------------------

	/// Store a new node, deriving its addressing fields
	///
	/// The slug must pass the slug format rules and the parent, when set,
	/// must exist (the derivation walk resolves it).
	pub async fn create_node(&self, mut node: ContentNode) -> EngineResult<ContentNode> {
		if !is_valid_slug(&node.slug) {
			return Err(EngineError::InvalidSlug(node.slug.clone()));
		}
		tree::recompute(&mut node, self.store.as_ref()).await?;
		self.store.save(&node).await?;
		info!(space = %self.space.id, node = %node.id, path = %node.path, "node created");
		Ok(node)
	}

	/// Load a node by id
	pub async fn node(&self, id: Uuid) -> EngineResult<ContentNode> {
		self.get_node(id).await
	}

	/// Recompute a node's derived addressing fields and persist them
	pub async fn recompute_tree_fields(&self, id: Uuid) -> EngineResult<TreeFields> {
		let mut node = self.get_node(id).await?;
		let fields = tree::recompute(&mut node, self.store.as_ref()).await?;
		self.store.save(&node).await?;
		Ok(fields)
	}

	/// Change a node's slug and rederive its addressing
	pub async fn set_slug(&self, id: Uuid, slug: &str) -> EngineResult<TreeFields> {
		if !is_valid_slug(slug) {
			return Err(EngineError::InvalidSlug(slug.to_string()));
		}
		let mut node = self.get_node(id).await?;
		node.slug = slug.to_string();
		node.updated_at = Utc::now();
		let fields = tree::recompute(&mut node, self.store.as_ref()).await?;
		self.store.save(&node).await?;
		Ok(fields)
	}

	/// Move a node under a new parent and rederive its addressing
	///
	/// Moving a node under its own descendant is caught by the derivation
	/// walk's cycle guard and fails without persisting anything.
	pub async fn move_node(&self, id: Uuid, new_parent: Option<Uuid>) -> EngineResult<TreeFields> {
		let mut node = self.get_node(id).await?;
		node.parent_id = new_parent;
		node.updated_at = Utc::now();
		let fields = tree::recompute(&mut node, self.store.as_ref()).await?;
		self.store.save(&node).await?;
		Ok(fields)
	}

	/// Change a node's publication status, enforcing the transition table
	pub async fn set_status(&self, id: Uuid, status: NodeStatus) -> EngineResult<ContentNode> {
		let mut node = self.get_node(id).await?;
		node.set_status(status)?;
		self.store.save(&node).await?;
		Ok(node)
	}

	/// Soft-delete a node
	///
	/// Nodes are never hard-deleted; children keep their parent reference
	/// and the node stays resolvable for tree derivation.
	pub async fn delete_node(&self, id: Uuid) -> EngineResult<()> {
		let mut node = self.get_node(id).await?;
		node.deleted_at = Some(Utc::now());
		self.store.save(&node).await?;
		Ok(())
	}

	// ------------------------------------------------------------------
	// Validation
	// ------------------------------------------------------------------

	/// Validate a content payload against the named component's schema
	pub fn validate_content(
		&self,
		payload: &JsonMap<String, JsonValue>,
		component_ref: &str,
	) -> EngineResult<ValidationReport> {
		self.validator.validate_component(payload, component_ref)
	}

	/// Validate and, when valid, store a node's content
	///
	/// Enforces the edit flow: the caller must hold the node's lock (or
	/// the node must be unlocked). An invalid payload is reported back
	/// without mutating anything; validation problems are never errors.
	pub async fn save_content(
		&self,
		id: Uuid,
		payload: JsonMap<String, JsonValue>,
		component_ref: &str,
		actor: &Actor,
		session_id: Option<&str>,
	) -> EngineResult<ValidationReport> {
		let mut node = self.get_node(id).await?;

		self.locks.expire_lapsed(&mut node);
		if self.locks.is_locked(&node) && !self.locks.is_locked_by(&node, actor) {
			let held_by_session = matches!(
				(session_id, node.lock_session_id.as_deref()),
				(Some(given), Some(held)) if given == held
			);
			if !held_by_session {
				return Err(EngineError::LockConflict {
					node: node.id,
					locked_by: node.locked_by_name.clone().unwrap_or_default(),
					until: node.lock_expires_at.unwrap_or_else(Utc::now),
				});
			}
		}

		let report = self.validator.validate_component(&payload, component_ref)?;
		if !report.is_valid() {
			return Ok(report);
		}

		node.content = JsonValue::Object(payload);
		node.updated_at = Utc::now();
		self.store.save(&node).await?;
		info!(space = %self.space.id, node = %node.id, component = component_ref, "content saved");
		Ok(report)
	}

	// ------------------------------------------------------------------
	// Locks
	// ------------------------------------------------------------------

	/// Acquire or refresh an exclusive edit lock on a node
	pub async fn lock(
		&self,
		id: Uuid,
		actor: &Actor,
		session_id: Option<&str>,
		duration: Option<Duration>,
	) -> EngineResult<bool> {
		let mut node = self.get_node(id).await?;
		let acquired = self.locks.lock(&mut node, actor, session_id, duration);
		if acquired {
			self.store.save(&node).await?;
		}
		Ok(acquired)
	}

	/// Release a node's lock; `actor = None` force-clears it
	pub async fn unlock(
		&self,
		id: Uuid,
		actor: Option<&Actor>,
		session_id: Option<&str>,
	) -> EngineResult<bool> {
		let mut node = self.get_node(id).await?;
		let released = self.locks.unlock(&mut node, actor, session_id);
		if released {
			self.store.save(&node).await?;
		}
		Ok(released)
	}

	/// Extend a lock currently held by `actor`
	pub async fn extend_lock(
		&self,
		id: Uuid,
		actor: &Actor,
		extension: Option<Duration>,
	) -> EngineResult<bool> {
		let mut node = self.get_node(id).await?;
		let extended = self.locks.extend(&mut node, actor, extension);
		if extended {
			self.store.save(&node).await?;
		}
		Ok(extended)
	}

	/// Whether a node carries an active lock
	pub async fn is_locked(&self, id: Uuid) -> EngineResult<bool> {
		let node = self.get_node(id).await?;
		Ok(self.locks.is_locked(&node))
	}

	/// Snapshot of a node's active lock, if any
	pub async fn lock_info(&self, id: Uuid) -> EngineResult<Option<LockInfo>> {
		let node = self.get_node(id).await?;
		Ok(self.locks.lock_info(&node))
	}

	/// Sweep the given nodes, clearing every expired lock
	///
	/// Lazy expiry only runs when a node is touched; this catches stale
	/// locks on nodes nobody revisits. Returns how many were cleared.
	pub async fn cleanup_expired_locks(&self, ids: &[Uuid]) -> EngineResult<usize> {
		let mut cleared = 0;
		for &id in ids {
			let Some(mut node) = self.store.get(id).await? else {
				continue;
			};
			if self.locks.expire_lapsed(&mut node) {
				self.store.save(&node).await?;
				cleared += 1;
			}
		}
		Ok(cleared)
	}

	// ------------------------------------------------------------------
	// Translations
	// ------------------------------------------------------------------

	/// Create a translation of `source_id` in `target_language`
	pub async fn create_translation(
		&self,
		source_id: Uuid,
		target_language: &str,
		overrides: TranslationOverrides,
		actor: &Actor,
	) -> EngineResult<ContentNode> {
		let source = self.get_node(source_id).await?;
		let mut translation = self
			.translations
			.create_translation(self.store.as_ref(), &source, target_language, overrides, actor)
			.await?;
		// The translation inherits the source's position; derive its own
		// addressing before handing it back.
		tree::recompute(&mut translation, self.store.as_ref()).await?;
		self.store.save(&translation).await?;
		Ok(translation)
	}

	/// Whether two nodes are translations of one another
	pub async fn is_translation_of(&self, a: Uuid, b: Uuid) -> EngineResult<bool> {
		let a = self.get_node(a).await?;
		let b = self.get_node(b).await?;
		Ok(self.translations.is_translation_of(&a, &b))
	}

	/// Propagate structural changes from `source_id` into `target_id`
	///
	/// Returns whether the target changed; the mutated target is persisted.
	pub async fn sync_content(
		&self,
		target_id: Uuid,
		source_id: Uuid,
		fields: &[SyncField],
	) -> EngineResult<bool> {
		let mut target = self.get_node(target_id).await?;
		let source = self.get_node(source_id).await?;
		let changed = self.translations.sync_content(&mut target, &source, fields);
		if changed {
			self.store.save(&target).await?;
		}
		Ok(changed)
	}

	/// Translation state of every member of a node's group, by language
	pub async fn translation_status(
		&self,
		id: Uuid,
	) -> EngineResult<HashMap<String, TranslationStatus>> {
		let node = self.get_node(id).await?;
		self.translations
			.translation_status(self.store.as_ref(), &node)
			.await
	}

	/// Source fields whose translation is missing in the target node
	pub async fn find_untranslated_fields(
		&self,
		target_id: Uuid,
		source_id: Uuid,
	) -> EngineResult<HashMap<String, String>> {
		let target = self.get_node(target_id).await?;
		let source = self.get_node(source_id).await?;
		Ok(self
			.translations
			.find_untranslated_fields(&target, &source))
	}
}
