//! Content nodes and the node store seam
//!
//! A [`ContentNode`] is one addressable unit of structured content in the
//! hierarchical tree. Nodes reference their parent by id (never by pointer),
//! carry a nested JSON tree of component instances as `content`, and embed
//! their own lock and translation bookkeeping fields. Persistence happens
//! behind the async [`NodeStore`] trait; implementations are assumed to be
//! already scoped to one space.

use crate::error::{EngineError, EngineResult};
use crate::tree::Breadcrumb;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Publication status of a content node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
	/// Being edited, not publicly visible
	Draft,
	/// Submitted for editorial review
	Review,
	/// Publicly visible
	Published,
	/// Queued for publication at a later time
	Scheduled,
	/// Withdrawn from publication
	Archived,
}

impl NodeStatus {
	/// Whether a transition to `next` is allowed
	///
	/// Publication goes through review; published content can only be
	/// withdrawn, not silently rewound.
	pub fn can_transition_to(self, next: NodeStatus) -> bool {
		use NodeStatus::*;
		matches!(
			(self, next),
			(Draft, Review)
				| (Draft, Scheduled)
				| (Review, Draft)
				| (Review, Published)
				| (Review, Scheduled)
				| (Scheduled, Published)
				| (Scheduled, Draft)
				| (Published, Archived)
				| (Archived, Draft)
		)
	}
}

/// An authenticated actor identity
///
/// The engine never authenticates; it only records ownership. Callers pass
/// this in explicitly instead of the engine reading ambient session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
	/// Opaque actor id
	pub id: Uuid,
	/// Name used in lock-conflict messages
	pub display_name: String,
}

impl Actor {
	/// Create an actor identity
	pub fn new(id: Uuid, display_name: impl Into<String>) -> Self {
		Self {
			id,
			display_name: display_name.into(),
		}
	}
}

/// Tenant context threaded through every engine call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
	/// Space id
	pub id: Uuid,
	/// Space name
	pub name: String,
	/// Language of the space's origin content
	pub default_language: String,
}

impl Space {
	/// Create a space context
	pub fn new(name: impl Into<String>, default_language: impl Into<String>) -> Self {
		Self {
			id: Uuid::new_v4(),
			name: name.into(),
			default_language: default_language.into(),
		}
	}
}

/// A node of structured content, addressable and hierarchical
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentNode {
	/// Node id
	pub id: Uuid,
	/// Display name
	pub name: String,
	/// Leaf slug segment
	pub slug: String,
	/// `/`-joined slugs of the ancestor chain plus own slug (derived)
	pub full_slug: String,
	/// `full_slug` with a leading `/` (derived)
	pub path: String,
	/// Parent node id; `None` for roots
	pub parent_id: Option<Uuid>,
	/// Folders group children and carry no publishable content of their own
	pub is_folder: bool,
	/// Nested JSON tree of component instances
	pub content: JsonValue,
	/// Editorial metadata (SEO fields, robots directives, ...)
	pub meta_data: JsonValue,
	/// Language of this node's text content
	pub language: String,
	/// Translation group this node belongs to
	pub translation_group_id: Option<Uuid>,
	/// Cached languages of the node's translation group
	pub translated_languages: Vec<String>,
	/// Publication status
	pub status: NodeStatus,
	/// Cached ancestor chain, root to self (derived)
	pub breadcrumbs: Vec<Breadcrumb>,

	// Embedded lock claim; active iff locked_by is set and lock_expires_at
	// is in the future. Expired fields may linger until lazy cleanup.
	/// Actor currently holding the edit lock
	pub locked_by: Option<Uuid>,
	/// Display name of the lock holder
	pub locked_by_name: Option<String>,
	/// When the lock was acquired
	pub locked_at: Option<DateTime<Utc>>,
	/// When the lock lapses
	pub lock_expires_at: Option<DateTime<Utc>>,
	/// Editing session the lock belongs to
	pub lock_session_id: Option<String>,

	/// Creation timestamp
	pub created_at: DateTime<Utc>,
	/// Last content or metadata change
	pub updated_at: DateTime<Utc>,
	/// Soft-delete marker
	pub deleted_at: Option<DateTime<Utc>>,
}

impl ContentNode {
	/// Create a new draft node with empty content
	///
	/// # Examples
	///
	/// ```
	/// use strata_engine::nodes::{ContentNode, NodeStatus};
	///
	/// let node = ContentNode::new("Blog", "blog", "en");
	/// assert_eq!(node.status, NodeStatus::Draft);
	/// assert!(node.parent_id.is_none());
	/// ```
	pub fn new(
		name: impl Into<String>,
		slug: impl Into<String>,
		language: impl Into<String>,
	) -> Self {
		let now = Utc::now();
		let slug = slug.into();
		Self {
			id: Uuid::new_v4(),
			name: name.into(),
			full_slug: slug.clone(),
			path: format!("/{slug}"),
			slug,
			parent_id: None,
			is_folder: false,
			content: serde_json::json!({}),
			meta_data: serde_json::json!({}),
			language: language.into(),
			translation_group_id: None,
			translated_languages: Vec::new(),
			status: NodeStatus::Draft,
			breadcrumbs: Vec::new(),
			locked_by: None,
			locked_by_name: None,
			locked_at: None,
			lock_expires_at: None,
			lock_session_id: None,
			created_at: now,
			updated_at: now,
			deleted_at: None,
		}
	}

	/// Attach the node under a parent
	pub fn with_parent(mut self, parent_id: Uuid) -> Self {
		self.parent_id = Some(parent_id);
		self
	}

	/// Mark the node as a folder
	pub fn as_folder(mut self) -> Self {
		self.is_folder = true;
		self
	}

	/// Set the content tree
	pub fn with_content(mut self, content: JsonValue) -> Self {
		self.content = content;
		self
	}

	/// Set the metadata object
	pub fn with_meta_data(mut self, meta_data: JsonValue) -> Self {
		self.meta_data = meta_data;
		self
	}

	/// Whether the node has been soft-deleted
	pub fn is_deleted(&self) -> bool {
		self.deleted_at.is_some()
	}

	/// Change the publication status, enforcing the transition table
	pub fn set_status(&mut self, next: NodeStatus) -> EngineResult<()> {
		if self.status == next {
			return Ok(());
		}
		if !self.status.can_transition_to(next) {
			return Err(EngineError::InvalidTransition(format!(
				"{:?} -> {:?}",
				self.status, next
			)));
		}
		self.status = next;
		self.updated_at = Utc::now();
		Ok(())
	}
}

/// Node persistence seam
///
/// Implementations are expected to be tenant-scoped: every query already
/// sees only one space's nodes. The engine performs no cross-node
/// transactions through this trait; each `save` is an independent
/// single-node update.
#[async_trait]
pub trait NodeStore: Send + Sync {
	/// Load a node by id
	async fn get(&self, id: Uuid) -> EngineResult<Option<ContentNode>>;

	/// Persist a node
	async fn save(&self, node: &ContentNode) -> EngineResult<()>;

	/// All members of a translation group
	async fn find_by_group(&self, group_id: Uuid) -> EngineResult<Vec<ContentNode>>;

	/// Direct children of a node
	async fn children_of(&self, id: Uuid) -> EngineResult<Vec<ContentNode>>;
}

/// In-memory node store for tests and embedded use
#[derive(Clone, Default)]
pub struct InMemoryNodeStore {
	nodes: std::sync::Arc<DashMap<Uuid, ContentNode>>,
}

impl InMemoryNodeStore {
	/// Create an empty store
	pub fn new() -> Self {
		Self::default()
	}

	/// All stored nodes, in no particular order
	pub fn all(&self) -> Vec<ContentNode> {
		self.nodes.iter().map(|entry| entry.value().clone()).collect()
	}
}

#[async_trait]
impl NodeStore for InMemoryNodeStore {
	async fn get(&self, id: Uuid) -> EngineResult<Option<ContentNode>> {
		Ok(self.nodes.get(&id).map(|entry| entry.value().clone()))
	}

	async fn save(&self, node: &ContentNode) -> EngineResult<()> {
		self.nodes.insert(node.id, node.clone());
		Ok(())
	}

	async fn find_by_group(&self, group_id: Uuid) -> EngineResult<Vec<ContentNode>> {
		Ok(self
			.nodes
			.iter()
			.filter(|entry| entry.value().translation_group_id == Some(group_id))
			.map(|entry| entry.value().clone())
			.collect())
	}

	async fn children_of(&self, id: Uuid) -> EngineResult<Vec<ContentNode>> {
		Ok(self
			.nodes
			.iter()
			.filter(|entry| entry.value().parent_id == Some(id))
			.map(|entry| entry.value().clone())
			.collect())
	}
}
