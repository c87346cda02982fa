//! Slug, path and breadcrumb derivation over the content tree
//!
//! Nodes reference their parent by id, so every derived addressing field is
//! computed by walking the `parent_id` chain through the [`NodeStore`]. The
//! walk is bounded: a revisited id or an implausible depth fails with
//! [`EngineError::CycleDetected`] instead of hanging on a corrupted graph.

use crate::error::{EngineError, EngineResult};
use crate::nodes::{ContentNode, NodeStore};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Hard bound on ancestor-chain length
///
/// Real content trees stay in the single digits; anything past this is a
/// corrupted parent graph.
const MAX_ANCESTOR_DEPTH: usize = 64;

/// One entry of a node's ancestry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
	/// Node id
	pub id: Uuid,
	/// Node display name
	pub name: String,
	/// Node leaf slug
	pub slug: String,
}

impl Breadcrumb {
	fn of(node: &ContentNode) -> Self {
		Self {
			id: node.id,
			name: node.name.clone(),
			slug: node.slug.clone(),
		}
	}
}

/// Derived addressing fields of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeFields {
	/// `/`-joined slugs of the ancestor chain plus the node's own slug
	pub full_slug: String,
	/// `full_slug` with a leading `/`
	pub path: String,
	/// Ancestor chain, root to self
	pub breadcrumbs: Vec<Breadcrumb>,
}

// Walks the parent chain and returns the chain root-to-self. The visited
// set and depth bound turn a cyclic parent graph into an error.
async fn ancestor_chain(
	node: &ContentNode,
	store: &dyn NodeStore,
) -> EngineResult<Vec<Breadcrumb>> {
	let mut chain = vec![Breadcrumb::of(node)];
	let mut visited: HashSet<Uuid> = HashSet::from([node.id]);
	let mut next_parent = node.parent_id;

	while let Some(parent_id) = next_parent {
		if !visited.insert(parent_id) || visited.len() > MAX_ANCESTOR_DEPTH {
			return Err(EngineError::CycleDetected(parent_id));
		}
		let parent = store
			.get(parent_id)
			.await?
			.ok_or(EngineError::NodeNotFound(parent_id))?;
		chain.push(Breadcrumb::of(&parent));
		next_parent = parent.parent_id;
	}

	chain.reverse();
	Ok(chain)
}

/// Compute a node's full slug
///
/// Walks the `parent_id` chain, prepending each ancestor's slug, and joins
/// the collected slugs with `/`. A root node yields its own slug.
pub async fn full_slug(node: &ContentNode, store: &dyn NodeStore) -> EngineResult<String> {
	let chain = ancestor_chain(node, store).await?;
	Ok(chain
		.iter()
		.map(|crumb| crumb.slug.as_str())
		.collect::<Vec<_>>()
		.join("/"))
}

/// Compute a node's breadcrumb trail, root to self
pub async fn breadcrumbs(
	node: &ContentNode,
	store: &dyn NodeStore,
) -> EngineResult<Vec<Breadcrumb>> {
	ancestor_chain(node, store).await
}

/// Compute all derived addressing fields in one walk
pub async fn derive(node: &ContentNode, store: &dyn NodeStore) -> EngineResult<TreeFields> {
	let chain = ancestor_chain(node, store).await?;
	let full_slug = chain
		.iter()
		.map(|crumb| crumb.slug.as_str())
		.collect::<Vec<_>>()
		.join("/");
	Ok(TreeFields {
		path: format!("/{full_slug}"),
		full_slug,
		breadcrumbs: chain,
	})
}

/// Recompute and apply derived fields after a `slug` or `parent_id` change
///
/// The caller invokes this explicitly after any hierarchy-affecting
/// mutation; nothing recomputes behind the caller's back.
pub async fn recompute(node: &mut ContentNode, store: &dyn NodeStore) -> EngineResult<TreeFields> {
	let fields = derive(node, store).await?;
	node.full_slug = fields.full_slug.clone();
	node.path = fields.path.clone();
	node.breadcrumbs = fields.breadcrumbs.clone();
	Ok(fields)
}
