//! Content storage seam and an in-memory implementation
//!
//! Provides [`ContentStore`], the persistence interface the migrator runs
//! against, and [`InMemoryStore`], a transactional implementation used by
//! tests and fixtures.

use crate::error::{EntityKind, MigrateError};
use crate::types::{NewNode, NodeId, NodeType, Snapshot, SnapshotId, TreeNode};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use strata_path::{MaterializedPath, PathIndex};

/// Persistence interface for nodes and snapshots
///
/// Methods take `&self` like a shared database connection. Implementations
/// must make [`ContentStore::atomic`] all-or-nothing.
pub trait ContentStore {
    /// Load a node by id
    ///
    /// # Errors
    /// Returns [`MigrateError::NotFound`] if no such node exists
    fn node(&self, id: NodeId) -> Result<TreeNode, MigrateError>;

    /// Find a node of a type by slug
    ///
    /// # Errors
    /// Returns error if the lookup fails
    fn node_by_slug(&self, node_type: &NodeType, slug: &str)
        -> Result<Option<TreeNode>, MigrateError>;

    /// Find a node by exact path
    ///
    /// # Errors
    /// Returns error if the lookup fails
    fn node_by_path(&self, path: &str) -> Result<Option<TreeNode>, MigrateError>;

    /// All nodes of a type, in id order
    ///
    /// # Errors
    /// Returns error if the lookup fails
    fn nodes_of_type(&self, node_type: &NodeType) -> Result<Vec<TreeNode>, MigrateError>;

    /// Snapshots of a node, newest first
    ///
    /// # Errors
    /// Returns error if the lookup fails
    fn snapshots_of(&self, node_id: NodeId) -> Result<Vec<Snapshot>, MigrateError>;

    /// Insert a node, assigning its id
    ///
    /// # Errors
    /// Returns [`MigrateError::Storage`] if the path is already taken
    fn insert_node(&self, node: NewNode) -> Result<TreeNode, MigrateError>;

    /// Persist an existing node
    ///
    /// # Errors
    /// Returns [`MigrateError::NotFound`] if the node was never inserted
    fn save_node(&self, node: &TreeNode) -> Result<(), MigrateError>;

    /// Persist an existing snapshot
    ///
    /// # Errors
    /// Returns [`MigrateError::NotFound`] if the snapshot does not exist
    fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), MigrateError>;

    /// Run `f` so that either all of its writes persist or none do
    ///
    /// # Errors
    /// Returns whatever `f` returns; on error every write made inside `f`
    /// is undone.
    fn atomic<R, F>(&self, f: F) -> Result<R, MigrateError>
    where
        Self: Sized,
        F: FnOnce(&Self) -> Result<R, MigrateError>;
}

/// Adapter exposing a store's path lookup to the allocator
#[derive(Debug)]
pub struct StorePathIndex<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: ContentStore + ?Sized> StorePathIndex<'a, S> {
    /// Wrap a store
    #[inline]
    #[must_use]
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }
}

impl<S: ContentStore + ?Sized> PathIndex for StorePathIndex<'_, S> {
    type Error = MigrateError;

    fn is_occupied(&self, path: &MaterializedPath) -> Result<bool, MigrateError> {
        Ok(self.store.node_by_path(path.as_str())?.is_some())
    }
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    nodes: BTreeMap<NodeId, TreeNode>,
    paths: HashMap<String, NodeId>,
    snapshots: BTreeMap<SnapshotId, Snapshot>,
    next_node: u64,
    next_snapshot: u64,
}

/// Transactional in-memory store
///
/// `atomic` copies the state on entry and restores the copy if the closure
/// fails, so nested blocks roll back independently. Write counters are not
/// rolled back: they count persist calls, not surviving rows.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
    node_saves: AtomicU64,
    snapshot_saves: AtomicU64,
}

impl InMemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a snapshot of a node
    ///
    /// # Errors
    /// Returns [`MigrateError::NotFound`] if the node does not exist
    pub fn insert_snapshot(
        &self,
        node_id: NodeId,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Snapshot, MigrateError> {
        let mut state = self.state.write();
        if !state.nodes.contains_key(&node_id) {
            return Err(MigrateError::not_found(EntityKind::Node, node_id));
        }

        state.next_snapshot += 1;
        let snapshot = Snapshot {
            id: SnapshotId(state.next_snapshot),
            node_id,
            created_at,
            content: content.into(),
        };
        state.snapshots.insert(snapshot.id, snapshot.clone());
        Ok(snapshot)
    }

    /// Load a snapshot by id
    ///
    /// # Errors
    /// Returns [`MigrateError::NotFound`] if it does not exist
    pub fn snapshot(&self, id: SnapshotId) -> Result<Snapshot, MigrateError> {
        self.state
            .read()
            .snapshots
            .get(&id)
            .cloned()
            .ok_or_else(|| MigrateError::not_found(EntityKind::Snapshot, id))
    }

    /// Number of nodes
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.state.read().nodes.len()
    }

    /// Number of snapshots
    #[must_use]
    pub fn snapshot_count(&self) -> usize {
        self.state.read().snapshots.len()
    }

    /// Calls to `save_node` and `insert_node` so far
    #[inline]
    #[must_use]
    pub fn node_saves(&self) -> u64 {
        self.node_saves.load(Ordering::SeqCst)
    }

    /// Calls to `save_snapshot` so far
    #[inline]
    #[must_use]
    pub fn snapshot_saves(&self) -> u64 {
        self.snapshot_saves.load(Ordering::SeqCst)
    }

    /// All persist calls so far
    #[inline]
    #[must_use]
    pub fn total_saves(&self) -> u64 {
        self.node_saves() + self.snapshot_saves()
    }
}

impl ContentStore for InMemoryStore {
    fn node(&self, id: NodeId) -> Result<TreeNode, MigrateError> {
        self.state
            .read()
            .nodes
            .get(&id)
            .cloned()
            .ok_or_else(|| MigrateError::not_found(EntityKind::Node, id))
    }

    fn node_by_slug(
        &self,
        node_type: &NodeType,
        slug: &str,
    ) -> Result<Option<TreeNode>, MigrateError> {
        Ok(self
            .state
            .read()
            .nodes
            .values()
            .find(|n| &n.node_type == node_type && n.slug == slug)
            .cloned())
    }

    fn node_by_path(&self, path: &str) -> Result<Option<TreeNode>, MigrateError> {
        let state = self.state.read();
        Ok(state
            .paths
            .get(path)
            .and_then(|id| state.nodes.get(id))
            .cloned())
    }

    fn nodes_of_type(&self, node_type: &NodeType) -> Result<Vec<TreeNode>, MigrateError> {
        Ok(self
            .state
            .read()
            .nodes
            .values()
            .filter(|n| &n.node_type == node_type)
            .cloned()
            .collect())
    }

    fn snapshots_of(&self, node_id: NodeId) -> Result<Vec<Snapshot>, MigrateError> {
        let mut snapshots: Vec<Snapshot> = self
            .state
            .read()
            .snapshots
            .values()
            .filter(|s| s.node_id == node_id)
            .cloned()
            .collect();
        snapshots.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(snapshots)
    }

    fn insert_node(&self, node: NewNode) -> Result<TreeNode, MigrateError> {
        let mut state = self.state.write();
        if state.paths.contains_key(&node.path) {
            return Err(MigrateError::Storage(format!(
                "path '{}' is already taken",
                node.path
            )));
        }

        state.next_node += 1;
        let inserted = TreeNode {
            id: NodeId(state.next_node),
            node_type: node.node_type,
            schema_version: node.schema_version,
            title: node.title,
            slug: node.slug,
            live: node.live,
            path: node.path,
            depth: node.depth,
            numchild: 0,
            fields: node.fields,
        };
        state.paths.insert(inserted.path.clone(), inserted.id);
        state.nodes.insert(inserted.id, inserted.clone());
        self.node_saves.fetch_add(1, Ordering::SeqCst);
        Ok(inserted)
    }

    fn save_node(&self, node: &TreeNode) -> Result<(), MigrateError> {
        let mut state = self.state.write();
        let previous_path = state
            .nodes
            .get(&node.id)
            .map(|existing| existing.path.clone())
            .ok_or_else(|| MigrateError::not_found(EntityKind::Node, node.id))?;

        if previous_path != node.path {
            if state.paths.contains_key(&node.path) {
                return Err(MigrateError::Storage(format!(
                    "path '{}' is already taken",
                    node.path
                )));
            }
            state.paths.remove(&previous_path);
            state.paths.insert(node.path.clone(), node.id);
        }

        state.nodes.insert(node.id, node.clone());
        self.node_saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), MigrateError> {
        let mut state = self.state.write();
        if !state.snapshots.contains_key(&snapshot.id) {
            return Err(MigrateError::not_found(EntityKind::Snapshot, snapshot.id));
        }
        state.snapshots.insert(snapshot.id, snapshot.clone());
        self.snapshot_saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn atomic<R, F>(&self, f: F) -> Result<R, MigrateError>
    where
        F: FnOnce(&Self) -> Result<R, MigrateError>,
    {
        let checkpoint = self.state.read().clone();

        match f(self) {
            Ok(result) => Ok(result),
            Err(error) => {
                *self.state.write() = checkpoint;
                tracing::warn!(%error, "atomic block failed, writes rolled back");
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::Map;

    fn new_node(slug: &str, path: &str) -> NewNode {
        NewNode {
            node_type: NodeType::new("core", "Page"),
            schema_version: 1,
            title: slug.to_uppercase(),
            slug: slug.to_string(),
            live: true,
            path: path.to_string(),
            depth: path.len() / 4,
            fields: Map::new(),
        }
    }

    #[test]
    fn insert_and_lookup() {
        let store = InMemoryStore::new();
        let root = store.insert_node(new_node("root", "0001")).unwrap();

        assert_eq!(store.node(root.id).unwrap().slug, "root");
        assert_eq!(store.node_by_path("0001").unwrap().unwrap().id, root.id);
        assert!(store.node_by_path("0002").unwrap().is_none());
        assert_eq!(
            store
                .node_by_slug(&NodeType::new("core", "Page"), "root")
                .unwrap()
                .map(|n| n.id),
            Some(root.id)
        );
        assert_eq!(store.node_saves(), 1);
    }

    #[test]
    fn missing_node_is_not_found() {
        let store = InMemoryStore::new();
        assert!(store.node(NodeId(99)).unwrap_err().is_not_found());
    }

    #[test]
    fn duplicate_path_is_rejected() {
        let store = InMemoryStore::new();
        store.insert_node(new_node("a", "0001")).unwrap();
        let result = store.insert_node(new_node("b", "0001"));
        assert!(matches!(result, Err(MigrateError::Storage(_))));
    }

    #[test]
    fn snapshots_newest_first() {
        let store = InMemoryStore::new();
        let node = store.insert_node(new_node("a", "0001")).unwrap();
        let t = |s| Utc.timestamp_opt(s, 0).unwrap();

        let old = store.insert_snapshot(node.id, "{}", t(100)).unwrap();
        let newest = store.insert_snapshot(node.id, "{}", t(300)).unwrap();
        let middle = store.insert_snapshot(node.id, "{}", t(200)).unwrap();
        let tie = store.insert_snapshot(node.id, "{}", t(300)).unwrap();

        let order: Vec<_> = store
            .snapshots_of(node.id)
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(order, vec![tie.id, newest.id, middle.id, old.id]);
    }

    #[test]
    fn atomic_rolls_back_on_error() {
        let store = InMemoryStore::new();
        let root = store.insert_node(new_node("root", "0001")).unwrap();

        let result: Result<(), _> = store.atomic(|s| {
            let mut changed = s.node(root.id)?;
            changed.title = "Changed".into();
            s.save_node(&changed)?;
            s.insert_node(new_node("child", "00010001"))?;
            Err(MigrateError::Storage("boom".into()))
        });

        assert!(result.is_err());
        assert_eq!(store.node(root.id).unwrap().title, "ROOT");
        assert!(store.node_by_path("00010001").unwrap().is_none());
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn atomic_commits_on_success() {
        let store = InMemoryStore::new();
        let inserted = store
            .atomic(|s| s.insert_node(new_node("root", "0001")))
            .unwrap();
        assert_eq!(store.node(inserted.id).unwrap().path, "0001");
    }

    #[test]
    fn nested_atomic_inner_rollback_keeps_outer_writes() {
        let store = InMemoryStore::new();

        store
            .atomic(|s| {
                s.insert_node(new_node("outer", "0001"))?;
                let inner: Result<(), _> = s.atomic(|s| {
                    s.insert_node(new_node("inner", "0002"))?;
                    Err(MigrateError::Storage("inner".into()))
                });
                assert!(inner.is_err());
                Ok(())
            })
            .unwrap();

        assert!(store.node_by_path("0001").unwrap().is_some());
        assert!(store.node_by_path("0002").unwrap().is_none());
    }

    #[test]
    fn save_node_moves_path_index() {
        let store = InMemoryStore::new();
        let mut node = store.insert_node(new_node("a", "0001")).unwrap();
        node.path = "0002".into();
        store.save_node(&node).unwrap();

        assert!(store.node_by_path("0001").unwrap().is_none());
        assert_eq!(store.node_by_path("0002").unwrap().unwrap().id, node.id);
    }

    #[test]
    fn path_index_adapter_probes_store() {
        let store = InMemoryStore::new();
        store.insert_node(new_node("a", "0001")).unwrap();
        let index = StorePathIndex::new(&store);
        let scheme = strata_path::PathScheme::default();

        assert!(index.is_occupied(&scheme.parse("0001").unwrap()).unwrap());
        assert!(!index.is_occupied(&scheme.parse("0002").unwrap()).unwrap());
    }
}
