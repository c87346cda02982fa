//! Time-bounded exclusive edit locks
//!
//! A lock is a pessimistic, session-scoped claim of editing rights on one
//! node. It protects two humans from clobbering each other's edits; it is
//! not a distributed mutex and no correctness guarantee derives from it.
//! Expiry is the safety valve against abandoned sessions: a lock is active
//! iff the owner is set *and* the expiry is in the future, and expired
//! fields are cleared lazily by the next lock-aware operation.

use crate::nodes::{Actor, ContentNode};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Snapshot of an active lock, surfaced as "locked by X until Y"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
	/// Actor holding the lock
	pub locked_by: Uuid,
	/// Display name of the lock holder
	pub locked_by_name: String,
	/// Acquisition time
	pub locked_at: DateTime<Utc>,
	/// Expiry time
	pub expires_at: DateTime<Utc>,
	/// Editing session the lock belongs to
	pub session_id: Option<String>,
}

/// Grants, extends and revokes edit locks on content nodes
///
/// All operations mutate only the node's embedded lock fields and report
/// their outcome as a boolean; a failed acquisition is an expected,
/// frequent outcome, not an error. Persisting the mutated node is the
/// caller's job, and must be a single-row update.
#[derive(Debug, Clone)]
pub struct LockManager {
	default_duration: Duration,
}

impl LockManager {
	/// Create a manager with the default 30-minute lock duration
	pub fn new() -> Self {
		Self {
			default_duration: Duration::minutes(30),
		}
	}

	/// Override the default lock duration
	pub fn with_default_duration(mut self, duration: Duration) -> Self {
		self.default_duration = duration;
		self
	}

	/// Clear the lock fields if the lock has lapsed
	///
	/// Returns `true` when stale fields were actually cleared. Lock-aware
	/// operations call this first so expired locks never block anyone.
	pub fn expire_lapsed(&self, node: &mut ContentNode) -> bool {
		let lapsed = matches!(
			(node.locked_by, node.lock_expires_at),
			(Some(_), Some(expires_at)) if expires_at <= Utc::now()
		) || (node.locked_by.is_some() && node.lock_expires_at.is_none());
		if lapsed {
			clear_lock_fields(node);
		}
		lapsed
	}

	/// Acquire or refresh an exclusive lock
	///
	/// Fails (without state change) when another actor holds an unexpired
	/// lock. Re-locking by the current owner refreshes the expiry.
	pub fn lock(
		&self,
		node: &mut ContentNode,
		actor: &Actor,
		session_id: Option<&str>,
		duration: Option<Duration>,
	) -> bool {
		self.expire_lapsed(node);

		if let Some(owner) = node.locked_by {
			if owner != actor.id {
				return false;
			}
		}

		let now = Utc::now();
		node.locked_by = Some(actor.id);
		node.locked_by_name = Some(actor.display_name.clone());
		node.locked_at = Some(now);
		node.lock_expires_at = Some(now + duration.unwrap_or(self.default_duration));
		if let Some(session) = session_id {
			node.lock_session_id = Some(session.to_string());
		}
		debug!(node = %node.id, actor = %actor.id, "edit lock acquired");
		true
	}

	/// Release a lock
	///
	/// With no `actor`, the lock is force-cleared unconditionally
	/// (administrative override). Otherwise clearing is permitted only for
	/// the lock's owner or for the session that acquired it.
	pub fn unlock(
		&self,
		node: &mut ContentNode,
		actor: Option<&Actor>,
		session_id: Option<&str>,
	) -> bool {
		self.expire_lapsed(node);

		let Some(actor) = actor else {
			clear_lock_fields(node);
			return true;
		};

		let Some(owner) = node.locked_by else {
			// Nothing to release
			return true;
		};

		let same_session = match (session_id, node.lock_session_id.as_deref()) {
			(Some(given), Some(held)) => given == held,
			_ => false,
		};
		if owner == actor.id || same_session {
			clear_lock_fields(node);
			debug!(node = %node.id, actor = %actor.id, "edit lock released");
			return true;
		}
		false
	}

	/// Extend the expiry of a lock currently held by `actor`
	pub fn extend(
		&self,
		node: &mut ContentNode,
		actor: &Actor,
		extension: Option<Duration>,
	) -> bool {
		if !self.is_locked_by(node, actor) {
			return false;
		}
		node.lock_expires_at = Some(Utc::now() + extension.unwrap_or(self.default_duration));
		true
	}

	/// Whether the node carries an active (unexpired) lock
	pub fn is_locked(&self, node: &ContentNode) -> bool {
		matches!(
			(node.locked_by, node.lock_expires_at),
			(Some(_), Some(expires_at)) if expires_at > Utc::now()
		)
	}

	/// Whether `actor` holds an active lock on the node
	pub fn is_locked_by(&self, node: &ContentNode, actor: &Actor) -> bool {
		self.is_locked(node) && node.locked_by == Some(actor.id)
	}

	/// Snapshot of the active lock, if any
	pub fn lock_info(&self, node: &ContentNode) -> Option<LockInfo> {
		if !self.is_locked(node) {
			return None;
		}
		Some(LockInfo {
			locked_by: node.locked_by?,
			locked_by_name: node.locked_by_name.clone().unwrap_or_default(),
			locked_at: node.locked_at?,
			expires_at: node.lock_expires_at?,
			session_id: node.lock_session_id.clone(),
		})
	}

	/// Maintenance sweep clearing every expired lock in `nodes`
	///
	/// Lazy cleanup only triggers on nodes that are touched again; the
	/// sweep catches stale locks on nodes nobody revisits. Idempotent and
	/// safe to run concurrently with individual lock checks.
	pub fn cleanup_expired<'a>(
		&self,
		nodes: impl IntoIterator<Item = &'a mut ContentNode>,
	) -> usize {
		let mut cleared = 0;
		for node in nodes {
			if self.expire_lapsed(node) {
				cleared += 1;
			}
		}
		if cleared > 0 {
			debug!(cleared, "expired edit locks swept");
		}
		cleared
	}
}

impl Default for LockManager {
	fn default() -> Self {
		Self::new()
	}
}

fn clear_lock_fields(node: &mut ContentNode) {
	node.locked_by = None;
	node.locked_by_name = None;
	node.locked_at = None;
	node.lock_expires_at = None;
	node.lock_session_id = None;
}
