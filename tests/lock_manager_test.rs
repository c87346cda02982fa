//! Tests for the edit-lock state machine

use chrono::{Duration, Utc};
use rstest::rstest;
use strata_engine::locks::LockManager;
use strata_engine::nodes::{Actor, ContentNode};
use uuid::Uuid;

fn actor(name: &str) -> Actor {
	Actor::new(Uuid::new_v4(), name)
}

fn node() -> ContentNode {
	ContentNode::new("Page", "page", "en")
}

#[rstest]
fn test_lock_acquisition_succeeds_on_unlocked_node() {
	// Arrange
	let manager = LockManager::new();
	let mut node = node();
	let editor = actor("U1");

	// Act
	let acquired = manager.lock(&mut node, &editor, Some("session-1"), None);

	// Assert
	assert!(acquired);
	assert!(manager.is_locked(&node));
	assert!(manager.is_locked_by(&node, &editor));
	assert_eq!(node.lock_session_id.as_deref(), Some("session-1"));
}

#[rstest]
fn test_locking_is_mutually_exclusive() {
	// Arrange - U1 holds an unexpired lock
	let manager = LockManager::new();
	let mut node = node();
	let u1 = actor("U1");
	let u2 = actor("U2");
	assert!(manager.lock(&mut node, &u1, None, None));
	let held_until = node.lock_expires_at;

	// Act
	let acquired = manager.lock(&mut node, &u2, None, None);

	// Assert - failure leaves the lock fields unchanged
	assert!(!acquired);
	assert_eq!(node.locked_by, Some(u1.id));
	assert_eq!(node.lock_expires_at, held_until);
}

#[rstest]
fn test_relocking_by_owner_refreshes_expiry() {
	// Arrange
	let manager = LockManager::new();
	let mut node = node();
	let editor = actor("U1");
	assert!(manager.lock(&mut node, &editor, None, Some(Duration::minutes(5))));
	let first_expiry = node.lock_expires_at.unwrap();

	// Act - idempotent re-acquisition with a longer duration
	let acquired = manager.lock(&mut node, &editor, None, Some(Duration::minutes(30)));

	// Assert
	assert!(acquired);
	assert!(node.lock_expires_at.unwrap() > first_expiry);
}

#[rstest]
fn test_expired_lock_is_self_healing() {
	// Arrange - U1's lock has already lapsed
	let manager = LockManager::new();
	let mut node = node();
	let u1 = actor("U1");
	let u2 = actor("U2");
	assert!(manager.lock(&mut node, &u1, None, None));
	node.lock_expires_at = Some(Utc::now() - Duration::minutes(1));

	// Act + Assert - the lock reads as absent and U2 can take it
	assert!(!manager.is_locked(&node));
	assert!(manager.lock(&mut node, &u2, None, None));
	assert_eq!(node.locked_by, Some(u2.id));
}

#[rstest]
fn test_unlock_by_owner() {
	let manager = LockManager::new();
	let mut node = node();
	let editor = actor("U1");
	assert!(manager.lock(&mut node, &editor, None, None));

	assert!(manager.unlock(&mut node, Some(&editor), None));
	assert!(!manager.is_locked(&node));
	assert!(node.locked_by.is_none());
}

#[rstest]
fn test_unlock_by_other_actor_fails() {
	// Arrange
	let manager = LockManager::new();
	let mut node = node();
	let u1 = actor("U1");
	let u2 = actor("U2");
	assert!(manager.lock(&mut node, &u1, None, None));

	// Act + Assert
	assert!(!manager.unlock(&mut node, Some(&u2), None));
	assert!(manager.is_locked(&node));
}

#[rstest]
fn test_unlock_by_matching_session() {
	// Arrange - same browser session, different authenticated actor
	let manager = LockManager::new();
	let mut node = node();
	let u1 = actor("U1");
	let u2 = actor("U2");
	assert!(manager.lock(&mut node, &u1, Some("shared-session"), None));

	// Act
	let released = manager.unlock(&mut node, Some(&u2), Some("shared-session"));

	// Assert
	assert!(released);
	assert!(!manager.is_locked(&node));
}

#[rstest]
fn test_force_unlock_without_actor() {
	let manager = LockManager::new();
	let mut node = node();
	let editor = actor("U1");
	assert!(manager.lock(&mut node, &editor, None, None));

	// Administrative override clears unconditionally
	assert!(manager.unlock(&mut node, None, None));
	assert!(!manager.is_locked(&node));
}

#[rstest]
fn test_extend_requires_current_ownership() {
	// Arrange
	let manager = LockManager::new();
	let mut node = node();
	let u1 = actor("U1");
	let u2 = actor("U2");
	assert!(manager.lock(&mut node, &u1, None, Some(Duration::minutes(5))));
	let first_expiry = node.lock_expires_at.unwrap();

	// Act + Assert - the owner can extend
	assert!(manager.extend(&mut node, &u1, Some(Duration::minutes(30))));
	assert!(node.lock_expires_at.unwrap() > first_expiry);

	// Act + Assert - a bystander cannot
	assert!(!manager.extend(&mut node, &u2, None));
}

#[rstest]
fn test_extend_fails_on_expired_lock() {
	let manager = LockManager::new();
	let mut node = node();
	let editor = actor("U1");
	assert!(manager.lock(&mut node, &editor, None, None));
	node.lock_expires_at = Some(Utc::now() - Duration::seconds(1));

	assert!(!manager.extend(&mut node, &editor, None));
}

#[rstest]
fn test_lock_info_reports_active_lock_only() {
	// Arrange
	let manager = LockManager::new();
	let mut node = node();
	let editor = actor("Jane Editor");
	assert!(manager.lock(&mut node, &editor, Some("s-9"), None));

	// Act + Assert - active lock is visible
	let info = manager.lock_info(&node).expect("lock must be active");
	assert_eq!(info.locked_by, editor.id);
	assert_eq!(info.locked_by_name, "Jane Editor");
	assert_eq!(info.session_id.as_deref(), Some("s-9"));

	// Act + Assert - lapsed lock reads as absent
	node.lock_expires_at = Some(Utc::now() - Duration::minutes(1));
	assert!(manager.lock_info(&node).is_none());
}

#[rstest]
fn test_cleanup_sweep_clears_only_expired_locks() {
	// Arrange - one lapsed lock, one active, one unlocked
	let manager = LockManager::new();
	let editor = actor("U1");

	let mut stale = node();
	assert!(manager.lock(&mut stale, &editor, None, None));
	stale.lock_expires_at = Some(Utc::now() - Duration::minutes(10));

	let mut active = node();
	assert!(manager.lock(&mut active, &editor, None, None));

	let mut untouched = node();

	// Act
	let cleared = manager.cleanup_expired([&mut stale, &mut active, &mut untouched]);

	// Assert
	assert_eq!(cleared, 1);
	assert!(stale.locked_by.is_none());
	assert!(manager.is_locked(&active));
	assert!(untouched.locked_by.is_none());
}

#[rstest]
fn test_cleanup_sweep_is_idempotent() {
	let manager = LockManager::new();
	let editor = actor("U1");

	let mut stale = node();
	assert!(manager.lock(&mut stale, &editor, None, None));
	stale.lock_expires_at = Some(Utc::now() - Duration::minutes(10));

	assert_eq!(manager.cleanup_expired([&mut stale]), 1);
	assert_eq!(manager.cleanup_expired([&mut stale]), 0);
}
