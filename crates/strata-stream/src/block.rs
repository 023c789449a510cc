//! Block entries and their JSON form
//!
//! Provides [`BlockEntry`], [`BlockValue`] and [`StreamData`], the decoded
//! shape of a structured field.

use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use serde_json::{Map, Value};

const TYPE_KEY: &str = "type";
const VALUE_KEY: &str = "value";
const ID_KEY: &str = "id";

/// Value carried by a block entry
///
/// A value is either opaque to the migrator or is itself an ordered
/// sequence of entries that the rewrite descends into. Text is always a
/// scalar and is never walked as a sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockValue {
    /// Opaque value (text, number, struct object, list of non-entries)
    Scalar(Value),

    /// Nested ordered sequence of entries
    Nested(Vec<BlockEntry>),
}

impl BlockValue {
    /// Scalar text value
    #[inline]
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Scalar(Value::String(s.into()))
    }

    /// Classify a raw JSON value
    ///
    /// A non-empty array whose elements are all objects must be a sequence
    /// of entries; anything else is a scalar.
    ///
    /// # Errors
    /// Returns [`StreamError::Malformed`] if an entry-shaped array holds an
    /// object without a string `type` or without a `value`.
    pub fn from_json(value: Value) -> Result<Self, StreamError> {
        match value {
            Value::Array(items) if is_entry_sequence(&items) => items
                .into_iter()
                .map(BlockEntry::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Nested),
            other => Ok(Self::Scalar(other)),
        }
    }

    /// Canonical JSON form
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Scalar(value) => value.clone(),
            Self::Nested(entries) => {
                Value::Array(entries.iter().map(BlockEntry::to_json).collect())
            }
        }
    }

    /// Scalar payload, if this is a scalar
    #[inline]
    #[must_use]
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::Nested(_) => None,
        }
    }

    /// Scalar text, if this is a string scalar
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        self.as_scalar().and_then(Value::as_str)
    }

    /// Nested entries, if this is a sequence
    #[inline]
    #[must_use]
    pub fn as_nested(&self) -> Option<&[BlockEntry]> {
        match self {
            Self::Nested(entries) => Some(entries),
            Self::Scalar(_) => None,
        }
    }
}

fn is_entry_sequence(items: &[Value]) -> bool {
    !items.is_empty() && items.iter().all(Value::is_object)
}

/// One element of a structured field
///
/// `extra` keeps any keys besides `type`, `value` and a string `id`
/// untouched. A decoded entry remembers its key order and encodes back in
/// that order; equality ignores it.
#[derive(Debug, Clone)]
pub struct BlockEntry {
    /// Type tag
    pub block_type: String,

    /// Tag-dependent value
    pub value: BlockValue,

    /// Stable block identifier, when the source carried one
    pub id: Option<String>,

    /// Remaining keys of the entry object
    pub extra: Map<String, Value>,

    layout: Vec<String>,
}

impl PartialEq for BlockEntry {
    fn eq(&self, other: &Self) -> bool {
        self.block_type == other.block_type
            && self.value == other.value
            && self.id == other.id
            && self.extra == other.extra
    }
}

impl BlockEntry {
    /// Create entry without id or extra keys
    #[inline]
    #[must_use]
    pub fn new(block_type: impl Into<String>, value: BlockValue) -> Self {
        Self {
            block_type: block_type.into(),
            value,
            id: None,
            extra: Map::new(),
            layout: Vec::new(),
        }
    }

    /// Set the block id
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Decode an entry object
    ///
    /// # Errors
    /// Returns [`StreamError::Malformed`] if the value is not an object, has
    /// no string `type`, or has no `value` key.
    pub fn from_json(raw: Value) -> Result<Self, StreamError> {
        let Value::Object(mut object) = raw else {
            return Err(StreamError::malformed("block entry is not an object"));
        };
        let layout = object.keys().cloned().collect();

        let block_type = match object.shift_remove(TYPE_KEY) {
            Some(Value::String(tag)) => tag,
            Some(_) => return Err(StreamError::malformed("block type is not a string")),
            None => return Err(StreamError::malformed("block entry has no type")),
        };

        let raw_value = object.shift_remove(VALUE_KEY).ok_or_else(|| {
            StreamError::malformed(format!("block '{block_type}' has no value"))
        })?;

        // non-string ids stay in `extra` as they were
        let id = object.get(ID_KEY).and_then(Value::as_str).map(str::to_owned);
        if id.is_some() {
            object.shift_remove(ID_KEY);
        }

        let value = BlockValue::from_json(raw_value)?;

        Ok(Self {
            block_type,
            value,
            id,
            extra: object,
            layout,
        })
    }

    /// JSON form of the entry
    ///
    /// Keys come out in the order they were decoded in. Keys the entry did
    /// not have when decoded follow as `type`, `value`, `id`, then extra
    /// keys, which is the whole order for entries built with [`BlockEntry::new`].
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut object = Map::with_capacity(self.extra.len() + 3);
        let canonical = [TYPE_KEY, VALUE_KEY, ID_KEY]
            .into_iter()
            .chain(self.extra.keys().map(String::as_str));
        for key in self.layout.iter().map(String::as_str).chain(canonical) {
            if object.contains_key(key) {
                continue;
            }
            if let Some(value) = self.key_value(key) {
                object.insert(key.to_string(), value);
            }
        }
        Value::Object(object)
    }

    fn key_value(&self, key: &str) -> Option<Value> {
        match key {
            TYPE_KEY => Some(Value::String(self.block_type.clone())),
            VALUE_KEY => Some(self.value.to_json()),
            ID_KEY => self
                .id
                .clone()
                .map(Value::String)
                .or_else(|| self.extra.get(ID_KEY).cloned()),
            _ => self.extra.get(key).cloned(),
        }
    }

    /// Count entries with `block_type` here and below
    #[must_use]
    pub fn count_type(&self, block_type: &str) -> usize {
        if self.block_type == block_type {
            return 1;
        }
        self.value
            .as_nested()
            .map_or(0, |entries| entries.iter().map(|e| e.count_type(block_type)).sum())
    }
}

/// Decoded structured field: an ordered sequence of block entries
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamData(Vec<BlockEntry>);

impl StreamData {
    /// Create from entries
    #[inline]
    #[must_use]
    pub fn new(entries: Vec<BlockEntry>) -> Self {
        Self(entries)
    }

    /// Empty sequence
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Entries in order
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[BlockEntry] {
        &self.0
    }

    /// Consume into entries
    #[inline]
    #[must_use]
    pub fn into_entries(self) -> Vec<BlockEntry> {
        self.0
    }

    /// Number of top-level entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no entries
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append an entry
    #[inline]
    pub fn push(&mut self, entry: BlockEntry) {
        self.0.push(entry);
    }

    /// Iterate top-level entries
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, BlockEntry> {
        self.0.iter()
    }

    /// Count entries of `block_type` at any depth
    #[must_use]
    pub fn count_type(&self, block_type: &str) -> usize {
        self.0.iter().map(|e| e.count_type(block_type)).sum()
    }

    /// Decode a field's JSON value
    ///
    /// `null` decodes as empty.
    ///
    /// # Errors
    /// Returns [`StreamError::Malformed`] if the value is not an array of
    /// well-formed entries.
    pub fn from_json(raw: Value) -> Result<Self, StreamError> {
        match raw {
            Value::Null => Ok(Self::empty()),
            Value::Array(items) => items
                .into_iter()
                .map(BlockEntry::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(Self),
            other => Err(StreamError::malformed(format!(
                "structured field must be an array, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Decode from serialized JSON text
    ///
    /// Empty or whitespace-only text decodes as empty.
    ///
    /// # Errors
    /// Returns [`StreamError::Json`] on invalid JSON, or
    /// [`StreamError::Malformed`] on a wrong shape.
    pub fn from_json_str(text: &str) -> Result<Self, StreamError> {
        if text.trim().is_empty() {
            return Ok(Self::empty());
        }
        let raw: Value = serde_json::from_str(text)?;
        Self::from_json(raw)
    }

    /// Canonical JSON form
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Array(self.0.iter().map(BlockEntry::to_json).collect())
    }

    /// Serialize to JSON text
    ///
    /// # Errors
    /// Returns [`StreamError::Json`] if serialization fails
    pub fn to_json_string(&self) -> Result<String, StreamError> {
        Ok(serde_json::to_string(&self.to_json())?)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl From<Vec<BlockEntry>> for StreamData {
    fn from(entries: Vec<BlockEntry>) -> Self {
        Self(entries)
    }
}

impl FromIterator<BlockEntry> for StreamData {
    fn from_iter<I: IntoIterator<Item = BlockEntry>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for StreamData {
    type Item = BlockEntry;
    type IntoIter = std::vec::IntoIter<BlockEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a StreamData {
    type Item = &'a BlockEntry;
    type IntoIter = std::slice::Iter<'a, BlockEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for StreamData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StreamData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Self::from_json(raw).map_err(de::Error::custom)
    }
}

/// Errors decoding or encoding structured fields
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Content does not have the entry-sequence shape
    #[error("malformed structured content: {0}")]
    Malformed(String),

    /// JSON text could not be parsed or produced
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StreamError {
    /// Create malformed-content error
    #[inline]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}
