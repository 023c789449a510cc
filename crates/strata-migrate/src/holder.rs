//! Content holders and structured field access
//!
//! Provides [`ContentHolder`], a live node or a historical snapshot, and the
//! two accessors that read and write a structured field on either kind.
//! Live nodes go through their schema's [`FieldCodec`](crate::FieldCodec);
//! snapshots keep structured fields as JSON text inside their content blob.

use crate::error::MigrateError;
use crate::schema::NodeSchema;
use crate::store::ContentStore;
use crate::types::{NodeId, Snapshot, TreeNode};
use serde_json::{Map, Value};
use strata_stream::{StreamData, StreamError};

/// Anything carrying structured content
#[derive(Debug, Clone, PartialEq)]
pub enum ContentHolder {
    /// Current state of a node
    Live(TreeNode),
    /// Serialized historical copy of a node
    Historical(Snapshot),
}

impl ContentHolder {
    /// Check if this is a live node
    #[inline]
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live(_))
    }

    /// Node the content belongs to
    #[inline]
    #[must_use]
    pub fn node_id(&self) -> NodeId {
        match self {
            Self::Live(node) => node.id,
            Self::Historical(snapshot) => snapshot.node_id,
        }
    }

    /// Human-readable name, used in errors and logs
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Live(node) => format!("node {}", node.id),
            Self::Historical(snapshot) => {
                format!("snapshot {} of node {}", snapshot.id, snapshot.node_id)
            }
        }
    }

    /// Borrow the live node, if any
    #[inline]
    #[must_use]
    pub fn as_live(&self) -> Option<&TreeNode> {
        match self {
            Self::Live(node) => Some(node),
            Self::Historical(_) => None,
        }
    }

    /// Borrow the snapshot, if any
    #[inline]
    #[must_use]
    pub fn as_historical(&self) -> Option<&Snapshot> {
        match self {
            Self::Historical(snapshot) => Some(snapshot),
            Self::Live(_) => None,
        }
    }

    /// Read a raw field value
    ///
    /// A snapshot's content blob is parsed on every call.
    ///
    /// # Errors
    /// Returns [`MigrateError::MalformedContent`] if a snapshot blob is not a
    /// JSON object
    pub fn read_field(&self, field: &str) -> Result<Option<Value>, MigrateError> {
        match self {
            Self::Live(node) => Ok(node.field(field).cloned()),
            Self::Historical(snapshot) => {
                Ok(snapshot_object(snapshot, &self.label())?.shift_remove(field))
            }
        }
    }

    /// Replace a raw field value in memory
    ///
    /// Other keys of a snapshot blob keep their order.
    ///
    /// # Errors
    /// Returns [`MigrateError::MalformedContent`] if a snapshot blob is not a
    /// JSON object
    pub fn write_field(&mut self, field: &str, value: Value) -> Result<(), MigrateError> {
        let label = self.label();
        match self {
            Self::Live(node) => node.set_field(field, value),
            Self::Historical(snapshot) => {
                let mut object = snapshot_object(snapshot, &label)?;
                object.insert(field.to_string(), value);
                snapshot.content = serde_json::to_string(&Value::Object(object))
                    .map_err(|e| MigrateError::malformed(label, e.into()))?;
            }
        }
        Ok(())
    }

    /// Write the holder back to the store
    ///
    /// # Errors
    /// Returns the store's error
    pub fn persist<S: ContentStore + ?Sized>(&self, store: &S) -> Result<(), MigrateError> {
        match self {
            Self::Live(node) => store.save_node(node),
            Self::Historical(snapshot) => store.save_snapshot(snapshot),
        }
    }
}

fn snapshot_object(snapshot: &Snapshot, label: &str) -> Result<Map<String, Value>, MigrateError> {
    match serde_json::from_str::<Value>(&snapshot.content) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => Err(MigrateError::malformed(
            label,
            StreamError::malformed("snapshot content is not a JSON object"),
        )),
        Err(e) => Err(MigrateError::malformed(label, e.into())),
    }
}

/// Read a structured field as a block sequence
///
/// For a live node the field is decoded with the schema's codec. For a
/// snapshot the field is JSON text inside the content blob; a missing, null
/// or empty field reads as an empty sequence.
///
/// # Errors
/// - [`MigrateError::NotFound`] if the schema does not declare `field`
/// - [`MigrateError::MalformedContent`] if the stored content does not decode
pub fn get_structured_value(
    holder: &ContentHolder,
    field: &str,
    schema: &NodeSchema,
) -> Result<StreamData, MigrateError> {
    let codec = schema.codec(field)?;
    let raw = holder.read_field(field)?;

    let decoded = match (holder, raw) {
        (ContentHolder::Live(_), raw) => codec.decode(raw.as_ref().unwrap_or(&Value::Null)),
        (ContentHolder::Historical(_), None | Some(Value::Null)) => Ok(StreamData::empty()),
        (ContentHolder::Historical(_), Some(Value::String(text))) => {
            StreamData::from_json_str(&text)
        }
        (ContentHolder::Historical(_), Some(_)) => Err(StreamError::malformed(format!(
            "snapshot field '{field}' is not JSON text"
        ))),
    };
    decoded.map_err(|e| MigrateError::malformed(holder.label(), e))
}

/// Store a block sequence into a structured field
///
/// The holder is updated in memory. With `commit` it is also persisted,
/// exactly once; without it the caller is responsible for persisting.
///
/// # Errors
/// - [`MigrateError::NotFound`] if the schema does not declare `field`
/// - [`MigrateError::MalformedContent`] if the sequence cannot be encoded or
///   the snapshot blob does not parse
/// - the store's error when committing
pub fn set_structured_value<S: ContentStore + ?Sized>(
    store: &S,
    holder: &mut ContentHolder,
    field: &str,
    data: &StreamData,
    schema: &NodeSchema,
    commit: bool,
) -> Result<(), MigrateError> {
    let codec = schema.codec(field)?;

    let encoded = if holder.is_live() {
        codec.encode(data)
    } else {
        data.to_json_string().map(Value::String)
    };
    let encoded = encoded.map_err(|e| MigrateError::malformed(holder.label(), e))?;
    holder.write_field(field, encoded)?;

    if commit {
        holder.persist(store)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{JsonStreamCodec, TextStreamCodec};
    use crate::store::InMemoryStore;
    use crate::types::{NewNode, NodeType};
    use chrono::Utc;
    use serde_json::json;
    use strata_stream::{BlockEntry, BlockValue};

    fn page() -> NodeType {
        NodeType::new("content", "LearnPage")
    }

    fn schema() -> NodeSchema {
        NodeSchema::new(page(), 1)
            .with_stream_field("body", JsonStreamCodec)
            .with_stream_field("sidebar", TextStreamCodec)
    }

    fn seeded() -> (InMemoryStore, TreeNode) {
        let store = InMemoryStore::new();
        let mut fields = Map::new();
        fields.insert("body".into(), json!([{"type": "text", "value": "hi"}]));
        let node = store
            .insert_node(NewNode {
                node_type: page(),
                schema_version: 1,
                title: "Learn".into(),
                slug: "learn".into(),
                live: true,
                path: "0001".into(),
                depth: 1,
                fields,
            })
            .unwrap();
        (store, node)
    }

    #[test]
    fn live_field_reads_through_codec() {
        let (_, node) = seeded();
        let data = get_structured_value(&ContentHolder::Live(node), "body", &schema()).unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data.entries()[0].value.as_text(), Some("hi"));
    }

    #[test]
    fn live_missing_field_reads_empty() {
        let (_, node) = seeded();
        let data = get_structured_value(&ContentHolder::Live(node), "sidebar", &schema()).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn undeclared_field_is_not_found() {
        let (_, node) = seeded();
        let err = get_structured_value(&ContentHolder::Live(node), "summary", &schema());
        assert!(err.unwrap_err().is_not_found());
    }

    #[test]
    fn snapshot_field_reads_json_text() {
        let (store, node) = seeded();
        let content = json!({"title": "Learn", "body": "[{\"type\":\"text\",\"value\":\"old\"}]"});
        let snapshot = store
            .insert_snapshot(node.id, content.to_string(), Utc::now())
            .unwrap();

        let holder = ContentHolder::Historical(snapshot);
        let data = get_structured_value(&holder, "body", &schema()).unwrap();
        assert_eq!(data.entries()[0].value.as_text(), Some("old"));
        assert!(get_structured_value(&holder, "sidebar", &schema())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn snapshot_empty_string_reads_empty() {
        let (store, node) = seeded();
        let snapshot = store
            .insert_snapshot(node.id, r#"{"body": ""}"#, Utc::now())
            .unwrap();
        let data =
            get_structured_value(&ContentHolder::Historical(snapshot), "body", &schema()).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn snapshot_garbage_is_malformed() {
        let (store, node) = seeded();
        let snapshot = store
            .insert_snapshot(node.id, r#"{"body": "not json"}"#, Utc::now())
            .unwrap();
        let err = get_structured_value(&ContentHolder::Historical(snapshot), "body", &schema())
            .unwrap_err();
        assert!(matches!(err, MigrateError::MalformedContent { .. }));

        let snapshot = store.insert_snapshot(node.id, "[1, 2]", Utc::now()).unwrap();
        let err = get_structured_value(&ContentHolder::Historical(snapshot), "body", &schema())
            .unwrap_err();
        assert!(matches!(err, MigrateError::MalformedContent { .. }));
    }

    #[test]
    fn set_without_commit_does_not_persist() {
        let (store, node) = seeded();
        let mut holder = ContentHolder::Live(node.clone());
        let data = StreamData::new(vec![BlockEntry::new("text", BlockValue::text("new"))]);

        set_structured_value(&store, &mut holder, "body", &data, &schema(), false).unwrap();

        assert_eq!(store.node_saves(), 1);
        assert_eq!(store.node(node.id).unwrap(), node);
        assert_eq!(
            holder.as_live().unwrap().field("body"),
            Some(&json!([{"type": "text", "value": "new"}]))
        );
    }

    #[test]
    fn set_with_commit_persists_once() {
        let (store, node) = seeded();
        let mut holder = ContentHolder::Live(node.clone());
        let data = StreamData::new(vec![BlockEntry::new("text", BlockValue::text("new"))]);

        set_structured_value(&store, &mut holder, "sidebar", &data, &schema(), true).unwrap();

        assert_eq!(store.node_saves(), 2);
        assert_eq!(
            store.node(node.id).unwrap().field("sidebar"),
            Some(&json!("[{\"type\":\"text\",\"value\":\"new\"}]"))
        );
    }

    #[test]
    fn set_snapshot_rewrites_only_target_field() {
        let (store, node) = seeded();
        let snapshot = store
            .insert_snapshot(node.id, r#"{"title":"Learn","body":"[]","live":true}"#, Utc::now())
            .unwrap();
        let mut holder = ContentHolder::Historical(snapshot.clone());
        let data = StreamData::new(vec![BlockEntry::new("text", BlockValue::text("x"))]);

        set_structured_value(&store, &mut holder, "body", &data, &schema(), true).unwrap();

        let stored = store.snapshot(snapshot.id).unwrap();
        assert_eq!(
            stored.content,
            r#"{"title":"Learn","body":"[{\"type\":\"text\",\"value\":\"x\"}]","live":true}"#
        );
        assert_eq!(store.snapshot_saves(), 1);
    }

    #[test]
    fn wide_numbers_in_other_fields_survive() {
        let (store, node) = seeded();
        let content = r#"{"revision":123456789012345678901234567890,"body":"[]","score":2.50}"#;
        let snapshot = store.insert_snapshot(node.id, content, Utc::now()).unwrap();
        let mut holder = ContentHolder::Historical(snapshot);

        holder.write_field("body", json!("[]")).unwrap();

        assert_eq!(holder.as_historical().unwrap().content, content);
    }

    #[test]
    fn raw_field_access_on_both_kinds() {
        let (store, node) = seeded();
        let snapshot = store
            .insert_snapshot(node.id, r#"{"a":1,"b":2}"#, Utc::now())
            .unwrap();

        let mut historical = ContentHolder::Historical(snapshot);
        assert_eq!(historical.read_field("b").unwrap(), Some(json!(2)));
        assert_eq!(historical.read_field("c").unwrap(), None);
        historical.write_field("a", json!("x")).unwrap();
        assert_eq!(historical.as_historical().unwrap().content, r#"{"a":"x","b":2}"#);

        let mut live = ContentHolder::Live(node);
        live.write_field("summary", json!("s")).unwrap();
        assert_eq!(live.read_field("summary").unwrap(), Some(json!("s")));
    }

    #[test]
    fn holder_labels() {
        let (store, node) = seeded();
        let snapshot = store.insert_snapshot(node.id, "{}", Utc::now()).unwrap();
        assert_eq!(ContentHolder::Live(node.clone()).label(), format!("node {}", node.id));
        let historical = ContentHolder::Historical(snapshot);
        assert!(!historical.is_live());
        assert_eq!(historical.node_id(), node.id);
        assert!(historical.label().starts_with("snapshot"));
    }
}
