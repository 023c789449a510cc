//! Schema registry for node types
//!
//! Provides [`SchemaRegistry`], which maps a node type and schema version to
//! the codecs that turn its structured fields into block sequences. The
//! registry is passed to the migration driver explicitly so migrations can run
//! against schema versions the current code no longer defines.

use crate::error::{EntityKind, MigrateError};
use crate::types::{NodeType, TreeNode};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::sync::Arc;
use strata_stream::{StreamData, StreamError};

/// Conversion between a live node's typed field and its block sequence
pub trait FieldCodec: Send + Sync + Debug {
    /// Decode the typed value (`null` when the field is absent)
    ///
    /// # Errors
    /// Returns error if the value does not hold a block sequence
    fn decode(&self, raw: &Value) -> Result<StreamData, StreamError>;

    /// Encode a block sequence back into the typed value
    ///
    /// Nested blocks are not validated; they are re-materialized lazily by
    /// whoever reads the field next.
    ///
    /// # Errors
    /// Returns error if the sequence cannot be represented
    fn encode(&self, data: &StreamData) -> Result<Value, StreamError>;
}

/// Field stored as a JSON array of entries
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonStreamCodec;

impl FieldCodec for JsonStreamCodec {
    fn decode(&self, raw: &Value) -> Result<StreamData, StreamError> {
        StreamData::from_json(raw.clone())
    }

    fn encode(&self, data: &StreamData) -> Result<Value, StreamError> {
        Ok(data.to_json())
    }
}

/// Field stored as JSON text (older schemas kept streams in text columns)
#[derive(Debug, Clone, Copy, Default)]
pub struct TextStreamCodec;

impl FieldCodec for TextStreamCodec {
    fn decode(&self, raw: &Value) -> Result<StreamData, StreamError> {
        match raw {
            Value::Null => Ok(StreamData::empty()),
            Value::String(text) => StreamData::from_json_str(text),
            _ => Err(StreamError::malformed("text stream field is not a string")),
        }
    }

    fn encode(&self, data: &StreamData) -> Result<Value, StreamError> {
        data.to_json_string().map(Value::String)
    }
}

/// Shape of one node type at one schema version
#[derive(Debug, Clone)]
pub struct NodeSchema {
    node_type: NodeType,
    version: u32,
    stream_fields: BTreeMap<String, Arc<dyn FieldCodec>>,
}

impl NodeSchema {
    /// Create schema with no structured fields
    #[inline]
    #[must_use]
    pub fn new(node_type: NodeType, version: u32) -> Self {
        Self {
            node_type,
            version,
            stream_fields: BTreeMap::new(),
        }
    }

    /// Declare a structured field
    #[must_use]
    pub fn with_stream_field(
        mut self,
        name: impl Into<String>,
        codec: impl FieldCodec + 'static,
    ) -> Self {
        self.stream_fields.insert(name.into(), Arc::new(codec));
        self
    }

    /// Node type
    #[inline]
    #[must_use]
    pub fn node_type(&self) -> &NodeType {
        &self.node_type
    }

    /// Schema version
    #[inline]
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Names of structured fields
    pub fn stream_fields(&self) -> impl Iterator<Item = &str> {
        self.stream_fields.keys().map(String::as_str)
    }

    /// Codec of a structured field
    ///
    /// # Errors
    /// Returns [`MigrateError::NotFound`] if the field is not declared
    pub fn codec(&self, field: &str) -> Result<&dyn FieldCodec, MigrateError> {
        self.stream_fields
            .get(field)
            .map(|codec| codec.as_ref())
            .ok_or_else(|| {
                MigrateError::not_found(
                    EntityKind::Field,
                    format!("{}@v{}.{field}", self.node_type, self.version),
                )
            })
    }

    /// Serialize a node the way its snapshots store it
    ///
    /// Produces a JSON object with the node's title, slug, live flag and
    /// every domain field. Structured fields are written as pre-serialized
    /// JSON text.
    ///
    /// # Errors
    /// Returns error if a structured field does not decode
    pub fn snapshot_content(&self, node: &TreeNode) -> Result<String, MigrateError> {
        let holder = format!("node {}", node.id);
        let mut content = Map::new();
        content.insert("title".to_string(), Value::String(node.title.clone()));
        content.insert("slug".to_string(), Value::String(node.slug.clone()));
        content.insert("live".to_string(), Value::Bool(node.live));

        for (name, value) in &node.fields {
            let stored = match self.stream_fields.get(name) {
                Some(codec) => {
                    let text = codec
                        .decode(value)
                        .and_then(|data| data.to_json_string())
                        .map_err(|e| MigrateError::malformed(holder.clone(), e))?;
                    Value::String(text)
                }
                None => value.clone(),
            };
            content.insert(name.clone(), stored);
        }

        serde_json::to_string(&Value::Object(content))
            .map_err(|e| MigrateError::malformed(holder, e.into()))
    }
}

/// Registry of node schemas keyed by type and version
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<NodeType, BTreeMap<u32, NodeSchema>>,
}

impl SchemaRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            schemas: HashMap::new(),
        }
    }

    /// Register a schema, replacing any with the same type and version
    pub fn register(&mut self, schema: NodeSchema) {
        self.schemas
            .entry(schema.node_type.clone())
            .or_default()
            .insert(schema.version, schema);
    }

    /// Register a schema, builder style
    #[must_use]
    pub fn with(mut self, schema: NodeSchema) -> Self {
        self.register(schema);
        self
    }

    /// Check if any version of a type is registered
    #[inline]
    #[must_use]
    pub fn contains_type(&self, node_type: &NodeType) -> bool {
        self.schemas.contains_key(node_type)
    }

    /// Resolve an exact type and version
    ///
    /// # Errors
    /// Returns [`MigrateError::NotFound`] for an unknown type or version
    pub fn resolve(&self, node_type: &NodeType, version: u32) -> Result<&NodeSchema, MigrateError> {
        let versions = self
            .schemas
            .get(node_type)
            .ok_or_else(|| MigrateError::not_found(EntityKind::NodeType, node_type))?;
        versions.get(&version).ok_or_else(|| {
            MigrateError::not_found(EntityKind::SchemaVersion, format!("{node_type}@v{version}"))
        })
    }

    /// Newest registered version of a type
    ///
    /// # Errors
    /// Returns [`MigrateError::NotFound`] for an unknown type
    pub fn latest(&self, node_type: &NodeType) -> Result<&NodeSchema, MigrateError> {
        self.schemas
            .get(node_type)
            .and_then(|versions| versions.values().next_back())
            .ok_or_else(|| MigrateError::not_found(EntityKind::NodeType, node_type))
    }

    /// Registered node types
    pub fn types(&self) -> impl Iterator<Item = &NodeType> {
        self.schemas.keys()
    }

    /// Number of registered (type, version) pairs
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.values().map(BTreeMap::len).sum()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
