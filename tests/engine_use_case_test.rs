//! End-to-end use case tests combining engine modules

use rstest::rstest;
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use strata_engine::components::{
	Component, FieldDefinition, FieldKind, InMemoryComponentRegistry,
};
use strata_engine::engine::ContentEngine;
use strata_engine::error::EngineError;
use strata_engine::nodes::{Actor, ContentNode, InMemoryNodeStore, NodeStatus, Space};
use strata_engine::translations::{SyncField, TranslationOverrides};
use uuid::Uuid;

fn engine() -> (ContentEngine, InMemoryNodeStore) {
	let store = InMemoryNodeStore::new();
	let registry = InMemoryComponentRegistry::new();
	registry
		.register(
			Component::new("article")
				.with_display_name("Article")
				.with_field(
					FieldDefinition::new(
						"title",
						FieldKind::Text {
							min_length: None,
							max_length: Some(80),
						},
					)
					.required(),
				)
				.with_field(FieldDefinition::new("body", FieldKind::Blocks)),
		)
		.unwrap();
	registry
		.register(
			Component::new("paragraph")
				.with_field(FieldDefinition::new("text", FieldKind::text()).required()),
		)
		.unwrap();

	let space = Space::new("demo", "en");
	let engine = ContentEngine::new(space, Arc::new(store.clone()), Arc::new(registry));
	(engine, store)
}

fn payload(value: JsonValue) -> serde_json::Map<String, JsonValue> {
	value.as_object().expect("payload must be an object").clone()
}

#[rstest]
#[tokio::test]
async fn test_edit_flow_lock_validate_save_recompute() {
	// Arrange
	let (engine, _store) = engine();
	let editor = Actor::new(Uuid::new_v4(), "Editor");

	let folder = engine
		.create_node(ContentNode::new("Blog", "blog", "en").as_folder())
		.await
		.unwrap();
	let post = engine
		.create_node(ContentNode::new("First Post", "first-post", "en").with_parent(folder.id))
		.await
		.unwrap();
	assert_eq!(post.full_slug, "blog/first-post");

	// Act - acquire the lock, submit a valid payload
	assert!(engine
		.lock(post.id, &editor, Some("session-1"), None)
		.await
		.unwrap());
	let report = engine
		.save_content(
			post.id,
			payload(json!({
				"title": "First Post",
				"body": [
					{"_uid": "b1", "component": "paragraph", "text": "Welcome!"},
				]
			})),
			"article",
			&editor,
			Some("session-1"),
		)
		.await
		.unwrap();

	// Assert - saved, addressed, and released cleanly
	assert!(report.is_valid());
	let stored = engine.node(post.id).await.unwrap();
	assert_eq!(stored.content["title"], "First Post");
	assert_eq!(stored.path, "/blog/first-post");
	assert_eq!(stored.breadcrumbs.len(), 2);

	assert!(engine.unlock(post.id, Some(&editor), None).await.unwrap());
	assert!(!engine.is_locked(post.id).await.unwrap());
}

#[rstest]
#[tokio::test]
async fn test_save_content_rejects_invalid_payload_without_mutation() {
	// Arrange
	let (engine, _store) = engine();
	let editor = Actor::new(Uuid::new_v4(), "Editor");
	let post = engine
		.create_node(ContentNode::new("Post", "post", "en"))
		.await
		.unwrap();

	// Act - required title missing
	let report = engine
		.save_content(
			post.id,
			payload(json!({"body": []})),
			"article",
			&editor,
			None,
		)
		.await
		.unwrap();

	// Assert - problems reported, node untouched
	assert!(!report.is_valid());
	assert!(report.error("title").is_some());
	let stored = engine.node(post.id).await.unwrap();
	assert_eq!(stored.content, json!({}));
}

#[rstest]
#[tokio::test]
async fn test_save_content_respects_foreign_lock() {
	// Arrange - another actor holds the node
	let (engine, _store) = engine();
	let owner = Actor::new(Uuid::new_v4(), "Owner");
	let intruder = Actor::new(Uuid::new_v4(), "Intruder");
	let post = engine
		.create_node(ContentNode::new("Post", "post", "en"))
		.await
		.unwrap();
	assert!(engine.lock(post.id, &owner, None, None).await.unwrap());

	// Act
	let result = engine
		.save_content(
			post.id,
			payload(json!({"title": "Takeover"})),
			"article",
			&intruder,
			None,
		)
		.await;

	// Assert - surfaced as "locked by X until Y"
	match result {
		Err(EngineError::LockConflict { locked_by, .. }) => {
			assert_eq!(locked_by, "Owner");
		}
		other => panic!("expected LockConflict, got {other:?}"),
	}
}

#[rstest]
#[tokio::test]
async fn test_lock_info_surfaces_holder() {
	// Arrange
	let (engine, _store) = engine();
	let editor = Actor::new(Uuid::new_v4(), "Jane");
	let post = engine
		.create_node(ContentNode::new("Post", "post", "en"))
		.await
		.unwrap();

	// Act
	assert!(engine.lock(post.id, &editor, None, None).await.unwrap());
	let info = engine.lock_info(post.id).await.unwrap();

	// Assert
	let info = info.expect("lock must be active");
	assert_eq!(info.locked_by, editor.id);
	assert_eq!(info.locked_by_name, "Jane");
}

#[rstest]
#[tokio::test]
async fn test_move_node_under_descendant_fails() {
	// Arrange - blog/first-post
	let (engine, _store) = engine();
	let folder = engine
		.create_node(ContentNode::new("Blog", "blog", "en").as_folder())
		.await
		.unwrap();
	let post = engine
		.create_node(ContentNode::new("Post", "post", "en").with_parent(folder.id))
		.await
		.unwrap();

	// Act - reparent the folder under its own child
	let result = engine.move_node(folder.id, Some(post.id)).await;

	// Assert - rejected, addressing intact
	assert!(matches!(result, Err(EngineError::CycleDetected(_))));
	let stored = engine.node(post.id).await.unwrap();
	assert_eq!(stored.full_slug, "blog/post");
}

#[rstest]
#[tokio::test]
async fn test_slug_rules_are_enforced() {
	let (engine, _store) = engine();

	let result = engine
		.create_node(ContentNode::new("Bad", "Not A Slug", "en"))
		.await;
	assert!(matches!(result, Err(EngineError::InvalidSlug(_))));

	let node = engine
		.create_node(ContentNode::new("Good", "good-slug", "en"))
		.await
		.unwrap();
	let result = engine.set_slug(node.id, "-broken-").await;
	assert!(matches!(result, Err(EngineError::InvalidSlug(_))));
}

#[rstest]
#[tokio::test]
async fn test_set_slug_rederives_addressing() {
	// Arrange
	let (engine, _store) = engine();
	let folder = engine
		.create_node(ContentNode::new("Blog", "blog", "en").as_folder())
		.await
		.unwrap();
	let post = engine
		.create_node(ContentNode::new("Post", "post", "en").with_parent(folder.id))
		.await
		.unwrap();

	// Act
	let fields = engine.set_slug(post.id, "renamed-post").await.unwrap();

	// Assert
	assert_eq!(fields.full_slug, "blog/renamed-post");
	assert_eq!(fields.path, "/blog/renamed-post");
}

#[rstest]
#[tokio::test]
async fn test_status_workflow_through_engine() {
	// Arrange
	let (engine, _store) = engine();
	let post = engine
		.create_node(ContentNode::new("Post", "post", "en"))
		.await
		.unwrap();

	// Act + Assert - draft cannot publish directly
	let result = engine.set_status(post.id, NodeStatus::Published).await;
	assert!(matches!(result, Err(EngineError::InvalidTransition(_))));

	// Review first, then publish
	engine.set_status(post.id, NodeStatus::Review).await.unwrap();
	let published = engine
		.set_status(post.id, NodeStatus::Published)
		.await
		.unwrap();
	assert_eq!(published.status, NodeStatus::Published);
}

#[rstest]
#[tokio::test]
async fn test_translation_round_trip_through_engine() {
	// Arrange - an English post with content
	let (engine, _store) = engine();
	let editor = Actor::new(Uuid::new_v4(), "Editor");
	let post = engine
		.create_node(ContentNode::new("Post", "post", "en").with_content(json!({
			"title": "Hello",
			"body": [
				{"_uid": "b1", "component": "paragraph", "text": "First paragraph"},
			]
		})))
		.await
		.unwrap();

	// Act - translate, then extend the source and sync
	let french = engine
		.create_translation(post.id, "fr", TranslationOverrides::none(), &editor)
		.await
		.unwrap();
	assert!(engine.is_translation_of(post.id, french.id).await.unwrap());

	let mut updated = engine.node(post.id).await.unwrap();
	updated.content["body"]
		.as_array_mut()
		.unwrap()
		.push(json!({"_uid": "b2", "component": "paragraph", "text": "Second paragraph"}));
	let payload_map = payload(updated.content.clone());
	engine
		.save_content(post.id, payload_map, "article", &editor, None)
		.await
		.unwrap();

	let changed = engine
		.sync_content(french.id, post.id, &SyncField::ALL)
		.await
		.unwrap();

	// Assert - the French copy gained the new block, flagged for work
	assert!(changed);
	let stored = engine.node(french.id).await.unwrap();
	let body = stored.content["body"].as_array().unwrap();
	assert_eq!(body.len(), 2);
	assert_eq!(body[1]["_uid"], "b2");
	assert_eq!(body[1]["_translation_needed"], true);

	let statuses = engine.translation_status(post.id).await.unwrap();
	assert!(statuses.contains_key("en"));
	assert!(statuses.contains_key("fr"));

	let untranslated = engine
		.find_untranslated_fields(french.id, post.id)
		.await
		.unwrap();
	assert!(untranslated.contains_key("body.1.text"));
}

#[rstest]
#[tokio::test]
async fn test_cleanup_sweep_through_engine() {
	// Arrange - a lock that already lapsed
	let (engine, store) = engine();
	let editor = Actor::new(Uuid::new_v4(), "Editor");
	let post = engine
		.create_node(ContentNode::new("Post", "post", "en"))
		.await
		.unwrap();
	assert!(engine
		.lock(post.id, &editor, None, Some(chrono::Duration::seconds(-10)))
		.await
		.unwrap());

	// Act
	let ids: Vec<Uuid> = store.all().iter().map(|node| node.id).collect();
	let cleared = engine.cleanup_expired_locks(&ids).await.unwrap();

	// Assert
	assert_eq!(cleared, 1);
	assert!(!engine.is_locked(post.id).await.unwrap());
}
