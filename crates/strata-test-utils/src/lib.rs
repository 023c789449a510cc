//! Testing utilities for Strata workspace
//!
//! Shared fixtures: a small seeded content tree, snapshot helpers and
//! transformations that record or fail on demand.

#![allow(missing_docs)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use strata_migrate::{
    BlockTransform, BlockValue, ContentHolder, ContentStore, InMemoryStore, JsonStreamCodec,
    NewNode, NodeId, NodeSchema, NodeType, PathScheme, SchemaRegistry, Snapshot, TextStreamCodec, TransformError,
    TreeNode,
};

pub const BODY: &str = "body";
pub const SIDEBAR: &str = "sidebar";

pub fn home_page() -> NodeType {
    NodeType::new("core", "HomePage")
}

pub fn learn_page() -> NodeType {
    NodeType::new("content", "LearnPage")
}

/// Registry with `LearnPage` v1 (text sidebar) and v2 (JSON sidebar)
pub fn registry() -> SchemaRegistry {
    SchemaRegistry::new()
        .with(NodeSchema::new(home_page(), 1))
        .with(
            NodeSchema::new(learn_page(), 1)
                .with_stream_field(BODY, JsonStreamCodec)
                .with_stream_field(SIDEBAR, TextStreamCodec),
        )
        .with(
            NodeSchema::new(learn_page(), 2)
                .with_stream_field(BODY, JsonStreamCodec)
                .with_stream_field(SIDEBAR, JsonStreamCodec),
        )
}

/// Store holding a single root `HomePage` at `0001`
pub fn store_with_root() -> (InMemoryStore, TreeNode) {
    let store = InMemoryStore::new();
    let root = store
        .insert_node(NewNode {
            node_type: home_page(),
            schema_version: 1,
            title: "Home".to_string(),
            slug: "home".to_string(),
            live: true,
            path: "0001".to_string(),
            depth: 1,
            fields: Map::new(),
        })
        .unwrap();
    (store, root)
}

/// Insert a `LearnPage` v2 child of `parent` with `body` set, bumping the
/// parent's child count
pub fn insert_learn_page(store: &InMemoryStore, parent: &TreeNode, slug: &str, body: Value) -> TreeNode {
    let mut parent = store.node(parent.id).unwrap();
    parent.numchild += 1;
    let mut fields = Map::new();
    fields.insert(BODY.to_string(), body);

    let node = store
        .insert_node(NewNode {
            node_type: learn_page(),
            schema_version: 2,
            title: slug.to_uppercase(),
            slug: slug.to_string(),
            live: true,
            path: PathScheme::default()
                .child_path(&parent.path, parent.depth, parent.numchild)
                .unwrap()
                .into_string(),
            depth: parent.depth + 1,
            fields,
        })
        .unwrap();
    store.save_node(&parent).unwrap();
    node
}

/// Fixed base time for snapshots
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Record a snapshot whose `body` holds `body` as JSON text
pub fn snapshot_with_body(store: &InMemoryStore, node: NodeId, body: &Value, minutes: i64) -> Snapshot {
    let content = json!({
        "title": "snapshot",
        BODY: body.to_string(),
    });
    store
        .insert_snapshot(node, content.to_string(), base_time() + Duration::minutes(minutes))
        .unwrap()
}

/// Snapshot a node's current state the way a revision save would
pub fn snapshot_node(store: &InMemoryStore, node: &TreeNode, minutes: i64) -> Snapshot {
    let registry = registry();
    let schema = registry.resolve(&node.node_type, node.schema_version).unwrap();
    let content = schema.snapshot_content(node).unwrap();
    store
        .insert_snapshot(node.id, content, base_time() + Duration::minutes(minutes))
        .unwrap()
}

/// Block entry with a scalar text value
pub fn text_block(block_type: &str, text: &str) -> Value {
    json!({"type": block_type, "value": text})
}

/// Block entry holding a nested sequence
pub fn nested_block(block_type: &str, children: Vec<Value>) -> Value {
    json!({"type": block_type, "value": children})
}

/// Uppercases text values and records which holders it saw, in order
#[derive(Debug, Default)]
pub struct RecordingTransform {
    seen: Mutex<Vec<String>>,
}

impl RecordingTransform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }
}

impl BlockTransform<ContentHolder> for RecordingTransform {
    fn transform(&self, owner: &ContentHolder, value: BlockValue) -> Result<BlockValue, TransformError> {
        self.seen.lock().push(owner.label());
        let text = value
            .as_text()
            .ok_or_else(|| TransformError::InvalidInput("expected text".to_string()))?;
        Ok(BlockValue::text(text.to_uppercase()))
    }

    fn describe(&self) -> String {
        "recording uppercase".to_string()
    }
}

/// Uppercases text values, failing on the `fail_on`-th call (1-based)
#[derive(Debug)]
pub struct FailingTransform {
    fail_on: usize,
    calls: Mutex<usize>,
}

impl FailingTransform {
    pub fn new(fail_on: usize) -> Self {
        Self {
            fail_on,
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

impl BlockTransform<ContentHolder> for FailingTransform {
    fn transform(&self, _owner: &ContentHolder, value: BlockValue) -> Result<BlockValue, TransformError> {
        let mut calls = self.calls.lock();
        *calls += 1;
        if *calls == self.fail_on {
            return Err(TransformError::failed(format!("injected failure on call {}", *calls)));
        }
        let text = value.as_text().unwrap_or_default().to_uppercase();
        Ok(BlockValue::text(text))
    }
}
