//! In-memory storage implementation for the document store.
//!
//! Documents live in an ordered map from ID to lineage. Each lineage is a
//! [`RevisionTree`] behind its own async read-write lock, which is the per-document
//! exclusivity boundary: writers of one document are serialized and checked against the
//! current winner, while writers of different documents never wait on each other.
//! The map lock is only held long enough to look up or insert a lineage.

use async_trait::async_trait;
use mea::rwlock::RwLock;
use serde_json::Value;
use std::{
    collections::{BTreeMap, btree_map::Entry},
    sync::Arc,
};
use tracing::debug;
use uuid::Uuid;

use revlayer_core::{
    backend::{IndexInfo, StoreBackend, StoreBackendBuilder},
    cursor::ResultCursor,
    error::{DocumentStoreError, DocumentStoreResult},
    query::FindRequest,
    revision::{Fields, Revision, RevisionId, RevisionTree},
};

use crate::find;

/// A document's revision arena behind its per-document lock.
pub(crate) type Lineage = RwLock<RevisionTree>;

type DocumentMap = BTreeMap<String, Arc<Lineage>>;

const DEFAULT_SCAN_CONCURRENCY: usize = 8;

const INDEXES_UNSUPPORTED: &str = "indexes are not supported; Find always scans every document";

/// Thread-safe in-memory multi-version document store.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data.
///
/// # Consistency
///
/// Reads and writes of a single document are atomic. A Find scan takes each document's
/// lock in turn and never holds a lock across the whole scan, so it may observe a mix of
/// states across documents written during the scan.
///
/// # Indexes
///
/// There are none. Find always scans, and the index management calls always report
/// [`DocumentStoreError::Unsupported`].
///
/// # Example
///
/// ```ignore
/// use revlayer_memory::InMemoryStore;
/// use revlayer::backend::StoreBackend;
///
/// let store = InMemoryStore::new();
/// let rev = store.put("d1", fields, None).await?;
/// assert_eq!(store.get("d1").await?.id(), &rev);
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryStore {
    /// Document ID -> revision lineage, ordered by ID.
    docs: Arc<RwLock<DocumentMap>>,
    /// Number of per-document resolutions a Find keeps in flight.
    scan_concurrency: usize,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store with default settings.
    pub fn new() -> Self {
        Self::with_scan_concurrency(DEFAULT_SCAN_CONCURRENCY)
    }

    fn with_scan_concurrency(scan_concurrency: usize) -> Self {
        Self {
            docs: Arc::new(RwLock::new(DocumentMap::new())),
            scan_concurrency: scan_concurrency.max(1),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore` with custom options.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use revlayer_memory::InMemoryStore;
    ///
    /// let store = InMemoryStore::builder().scan_concurrency(16).build().await?;
    /// ```
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    pub fn scan_concurrency(&self) -> usize {
        self.scan_concurrency
    }

    async fn lineage(&self, id: &str) -> Option<Arc<Lineage>> {
        self.docs.read().await.get(id).cloned()
    }

    async fn existing_lineage(&self, id: &str) -> DocumentStoreResult<Arc<Lineage>> {
        self.lineage(id)
            .await
            .ok_or_else(|| DocumentStoreError::DocumentNotFound(id.to_string()))
    }

    // Consistent per-document snapshot of the map, in ID order. The map lock is released
    // before any lineage lock is taken.
    async fn snapshot(&self) -> Vec<(String, Arc<Lineage>)> {
        self.docs
            .read()
            .await
            .iter()
            .map(|(id, lineage)| (id.clone(), Arc::clone(lineage)))
            .collect()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_id(id: &str) -> DocumentStoreResult<()> {
    if id.is_empty() {
        return Err(DocumentStoreError::Validation("Document id must not be empty".to_string()));
    }

    Ok(())
}

fn winner<'t>(tree: &'t RevisionTree, id: &str) -> DocumentStoreResult<&'t Revision> {
    tree.winner()
        .ok_or_else(|| DocumentStoreError::DocumentNotFound(id.to_string()))
}

/// Appends a revision on top of the current winner, enforcing optimistic concurrency.
///
/// Without `expected` the write is only accepted when the winner is a tombstone, which
/// recreates a deleted document.
fn extend(
    tree: &mut RevisionTree,
    id: &str,
    fields: Fields,
    expected: Option<&RevisionId>,
    deleted: bool,
) -> DocumentStoreResult<RevisionId> {
    let current = winner(tree, id)?;

    let accepted = match expected {
        Some(expected) => current.id() == expected,
        None => current.is_deleted(),
    };

    if !accepted {
        debug!(
            doc_id = id,
            expected = ?expected.map(ToString::to_string),
            current = %current.id(),
            "revision conflict"
        );
        return Err(DocumentStoreError::Conflict(id.to_string()));
    }

    if deleted && current.is_deleted() {
        return Err(DocumentStoreError::DocumentNotFound(id.to_string()));
    }

    let revision = Revision::child_of(current.id(), fields, deleted);
    let rev = revision.id().clone();
    tree.insert(revision);

    Ok(rev)
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn put(
        &self,
        id: &str,
        fields: Fields,
        expected: Option<&RevisionId>,
    ) -> DocumentStoreResult<RevisionId> {
        validate_id(id)?;

        let lineage = match self.lineage(id).await {
            Some(lineage) => lineage,
            None => {
                let mut docs = self.docs.write().await;

                match docs.entry(id.to_string()) {
                    Entry::Vacant(slot) => {
                        if expected.is_some() {
                            return Err(DocumentStoreError::Conflict(id.to_string()));
                        }

                        let root = Revision::root(fields);
                        let rev = root.id().clone();
                        slot.insert(Arc::new(RwLock::new(RevisionTree::with_root(root))));

                        debug!(doc_id = id, rev = %rev, "created document");
                        return Ok(rev);
                    }
                    // Another writer created it between the lookup and the write lock.
                    Entry::Occupied(slot) => Arc::clone(slot.get()),
                }
            }
        };

        let mut tree = lineage.write().await;
        let rev = extend(&mut tree, id, fields, expected, false)?;

        debug!(doc_id = id, rev = %rev, "updated document");
        Ok(rev)
    }

    async fn post(&self, fields: Fields) -> DocumentStoreResult<(String, RevisionId)> {
        let id = Uuid::new_v4().simple().to_string();
        let rev = StoreBackend::put(self, &id, fields, None).await?;

        Ok((id, rev))
    }

    async fn get(&self, id: &str) -> DocumentStoreResult<Revision> {
        let lineage = self.existing_lineage(id).await?;
        let tree = lineage.read().await;

        Ok(winner(&tree, id)?.clone())
    }

    async fn get_revision(&self, id: &str, rev: &RevisionId) -> DocumentStoreResult<Revision> {
        let lineage = self.existing_lineage(id).await?;
        let tree = lineage.read().await;

        tree.get(rev)
            .cloned()
            .ok_or_else(|| DocumentStoreError::RevisionNotFound(id.to_string(), rev.to_string()))
    }

    async fn delete(&self, id: &str, expected: &RevisionId) -> DocumentStoreResult<RevisionId> {
        let lineage = self.existing_lineage(id).await?;
        let mut tree = lineage.write().await;
        let rev = extend(&mut tree, id, Fields::new(), Some(expected), true)?;

        debug!(doc_id = id, rev = %rev, "deleted document");
        Ok(rev)
    }

    async fn insert_revision(&self, id: &str, revision: Revision) -> DocumentStoreResult<()> {
        validate_id(id)?;

        let lineage = match (self.lineage(id).await, revision.parent()) {
            (Some(lineage), _) => lineage,
            (None, Some(parent)) => {
                return Err(DocumentStoreError::RevisionNotFound(id.to_string(), parent.to_string()));
            }
            (None, None) => {
                let mut docs = self.docs.write().await;

                match docs.entry(id.to_string()) {
                    Entry::Vacant(slot) => {
                        debug!(doc_id = id, rev = %revision.id(), "imported document");
                        slot.insert(Arc::new(RwLock::new(RevisionTree::with_root(revision))));
                        return Ok(());
                    }
                    Entry::Occupied(slot) => Arc::clone(slot.get()),
                }
            }
        };

        let mut tree = lineage.write().await;

        match revision.parent() {
            Some(parent) if !tree.contains(parent) => {
                return Err(DocumentStoreError::RevisionNotFound(id.to_string(), parent.to_string()));
            }
            // A lineage has exactly one root; re-importing that root is a no-op.
            None if !tree.contains(revision.id()) => {
                debug!(doc_id = id, rev = %revision.id(), "rejected second root revision");
                return Err(DocumentStoreError::Conflict(id.to_string()));
            }
            _ => {}
        }

        let rev = revision.id().clone();
        if tree.insert(revision) {
            debug!(doc_id = id, rev = %rev, "imported revision");
        }

        Ok(())
    }

    async fn conflicts(&self, id: &str) -> DocumentStoreResult<Vec<RevisionId>> {
        let lineage = self.existing_lineage(id).await?;
        let tree = lineage.read().await;

        Ok(tree
            .conflicts()
            .into_iter()
            .map(|rev| rev.id().clone())
            .collect())
    }

    async fn all_ids(&self) -> DocumentStoreResult<Vec<String>> {
        Ok(self.docs.read().await.keys().cloned().collect())
    }

    async fn find(&self, request: FindRequest) -> DocumentStoreResult<ResultCursor> {
        let lineages = self.snapshot().await;

        Ok(find::execute(lineages, request, self.scan_concurrency).await)
    }

    async fn create_index(
        &self,
        _design_doc: &str,
        _name: &str,
        _definition: Value,
    ) -> DocumentStoreResult<()> {
        Err(DocumentStoreError::Unsupported(INDEXES_UNSUPPORTED.to_string()))
    }

    async fn get_indexes(&self) -> DocumentStoreResult<Vec<IndexInfo>> {
        Err(DocumentStoreError::Unsupported(INDEXES_UNSUPPORTED.to_string()))
    }

    async fn delete_index(&self, _design_doc: &str, _name: &str) -> DocumentStoreResult<()> {
        Err(DocumentStoreError::Unsupported(INDEXES_UNSUPPORTED.to_string()))
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use revlayer_memory::InMemoryStore;
/// use revlayer::backend::StoreBackendBuilder;
///
/// let store = InMemoryStore::builder().scan_concurrency(4).build().await?;
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryStoreBuilder {
    scan_concurrency: usize,
}

impl InMemoryStoreBuilder {
    /// Sets how many per-document resolutions a Find keeps in flight. Clamped to at least 1.
    pub fn scan_concurrency(mut self, scan_concurrency: usize) -> Self {
        self.scan_concurrency = scan_concurrency;
        self
    }
}

impl Default for InMemoryStoreBuilder {
    fn default() -> Self {
        Self { scan_concurrency: DEFAULT_SCAN_CONCURRENCY }
    }
}

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] instance.
    ///
    /// This always succeeds and returns a freshly initialized store.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::with_scan_concurrency(self.scan_concurrency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = InMemoryStore::new();
        let rev = store.put("d1", fields(json!({"a": 1})), None).await.unwrap();

        let current = store.get("d1").await.unwrap();
        assert_eq!(current.id(), &rev);
        assert_eq!(current.generation(), 1);
        assert_eq!(Value::Object(current.into_fields()), json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_optimistic_concurrency() {
        let store = InMemoryStore::new();
        let r1 = store.put("d1", fields(json!({"x": 1})), None).await.unwrap();

        let err = store.put("d1", fields(json!({"x": 2})), None).await.unwrap_err();
        assert_eq!(err, DocumentStoreError::Conflict("d1".into()));

        let r2 = store.put("d1", fields(json!({"x": 2})), Some(&r1)).await.unwrap();
        assert_eq!(r2.generation(), 2);
        assert_eq!(store.get("d1").await.unwrap().id(), &r2);

        let stale = store.put("d1", fields(json!({"x": 3})), Some(&r1)).await.unwrap_err();
        assert!(stale.is_conflict());
        assert_eq!(store.get("d1").await.unwrap().id(), &r2);
    }

    #[tokio::test]
    async fn test_expected_revision_on_missing_document_conflicts() {
        let store = InMemoryStore::new();
        let rev: RevisionId = "1-abc".parse().unwrap();

        assert!(store.put("d1", Fields::new(), Some(&rev)).await.unwrap_err().is_conflict());
        assert!(store.all_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_id_is_rejected_before_mutation() {
        let store = InMemoryStore::new();

        assert!(matches!(
            store.put("", Fields::new(), None).await,
            Err(DocumentStoreError::Validation(_))
        ));
        assert!(store.all_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_document_and_revision() {
        let store = InMemoryStore::new();
        assert_eq!(
            store.get("nope").await.unwrap_err(),
            DocumentStoreError::DocumentNotFound("nope".into())
        );

        let r1 = store.put("d1", fields(json!({"v": 1})), None).await.unwrap();
        let r2 = store.put("d1", fields(json!({"v": 2})), Some(&r1)).await.unwrap();

        let old = store.get_revision("d1", &r1).await.unwrap();
        assert_eq!(old.fields().get("v"), Some(&json!(1)));
        assert_eq!(store.get_revision("d1", &r2).await.unwrap().parent(), Some(&r1));

        let unknown: RevisionId = "7-ffff".parse().unwrap();
        assert!(matches!(
            store.get_revision("d1", &unknown).await,
            Err(DocumentStoreError::RevisionNotFound(_, _))
        ));
    }

    #[tokio::test]
    async fn test_delete_leaves_tombstone_and_history() {
        let store = InMemoryStore::new();
        let r1 = store.put("d1", fields(json!({"v": 1})), None).await.unwrap();
        let r2 = store.delete("d1", &r1).await.unwrap();

        let current = store.get("d1").await.unwrap();
        assert!(current.is_deleted());
        assert_eq!(current.id(), &r2);
        assert!(store.get_revision("d1", &r1).await.is_ok());

        assert!(store.delete("d1", &r1).await.unwrap_err().is_conflict());
        assert!(store.delete("d1", &r2).await.unwrap_err().is_not_found());
        assert!(store.delete("missing", &r1).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_recreate_after_delete() {
        let store = InMemoryStore::new();
        let r1 = store.put("d1", fields(json!({"v": 1})), None).await.unwrap();
        let r2 = store.delete("d1", &r1).await.unwrap();
        let r3 = store.put("d1", fields(json!({"v": 2})), None).await.unwrap();

        assert_eq!(r3.generation(), 3);
        let current = store.get("d1").await.unwrap();
        assert!(!current.is_deleted());
        assert_eq!(current.parent(), Some(&r2));
    }

    #[tokio::test]
    async fn test_insert_revision_creates_conflicts() {
        let store = InMemoryStore::new();
        let r1 = store.put("d1", fields(json!({"v": 0})), None).await.unwrap();

        let a = Revision::child_of(&r1, fields(json!({"v": "a"})), false);
        let b = Revision::child_of(&r1, fields(json!({"v": "b"})), false);
        store.insert_revision("d1", a.clone()).await.unwrap();
        store.insert_revision("d1", b.clone()).await.unwrap();

        let (win, lose) = if a.id() > b.id() { (a, b) } else { (b, a) };
        assert_eq!(store.get("d1").await.unwrap().id(), win.id());
        assert_eq!(store.conflicts("d1").await.unwrap(), vec![lose.id().clone()]);

        // Writing against the losing branch is a conflict.
        assert!(store.put("d1", Fields::new(), Some(lose.id())).await.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn test_insert_revision_requires_known_parent() {
        let store = InMemoryStore::new();
        let orphan_parent: RevisionId = "1-abc".parse().unwrap();
        let orphan = Revision::child_of(&orphan_parent, Fields::new(), false);

        assert!(matches!(
            store.insert_revision("d1", orphan.clone()).await,
            Err(DocumentStoreError::RevisionNotFound(_, _))
        ));

        store.put("d1", Fields::new(), None).await.unwrap();
        assert!(matches!(
            store.insert_revision("d1", orphan).await,
            Err(DocumentStoreError::RevisionNotFound(_, _))
        ));

        let root = Revision::root(fields(json!({"imported": true})));
        store.insert_revision("d2", root.clone()).await.unwrap();
        assert_eq!(store.get("d2").await.unwrap().id(), root.id());
    }

    #[tokio::test]
    async fn test_insert_revision_rejects_second_root() {
        let store = InMemoryStore::new();
        let root = Revision::root(fields(json!({"v": 1})));
        store.insert_revision("d1", root.clone()).await.unwrap();

        // Same root again is idempotent.
        store.insert_revision("d1", root.clone()).await.unwrap();

        let other = Revision::root(fields(json!({"v": 2})));
        assert_eq!(
            store.insert_revision("d1", other.clone()).await,
            Err(DocumentStoreError::Conflict("d1".to_string()))
        );
        assert!(store.get_revision("d1", other.id()).await.unwrap_err().is_not_found());
        assert_eq!(store.get("d1").await.unwrap().id(), root.id());
        assert!(store.conflicts("d1").await.unwrap().is_empty());

        // Documents created through put have a root as well.
        store.put("d2", Fields::new(), None).await.unwrap();
        assert!(matches!(
            store.insert_revision("d2", other).await,
            Err(DocumentStoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_all_ids_are_lexicographic_and_restartable() {
        let store = InMemoryStore::new();
        for id in ["m", "b", "z", "a"] {
            store.put(id, Fields::new(), None).await.unwrap();
        }

        let first = store.all_ids().await.unwrap();
        assert_eq!(first, ["a", "b", "m", "z"]);
        assert_eq!(store.all_ids().await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_post_generates_ids() {
        let store = InMemoryStore::new();
        let (id_a, _) = store.post(fields(json!({"n": 1}))).await.unwrap();
        let (id_b, rev_b) = store.post(fields(json!({"n": 1}))).await.unwrap();

        assert_ne!(id_a, id_b);
        assert_eq!(store.get(&id_b).await.unwrap().id(), &rev_b);
    }

    #[tokio::test]
    async fn test_index_management_is_unsupported() {
        let store = InMemoryStore::new();

        assert!(matches!(
            store.create_index("_design/x", "by-age", json!({"fields": ["age"]})).await,
            Err(DocumentStoreError::Unsupported(_))
        ));
        assert!(matches!(store.get_indexes().await, Err(DocumentStoreError::Unsupported(_))));
        assert!(matches!(
            store.delete_index("_design/x", "by-age").await,
            Err(DocumentStoreError::Unsupported(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_on_same_parent() {
        let store = InMemoryStore::new();
        let r1 = store.put("d1", fields(json!({"n": 0})), None).await.unwrap();

        let handles = (0..16)
            .map(|n| {
                let store = store.clone();
                let r1 = r1.clone();
                tokio::spawn(async move { store.put("d1", fields(json!({"n": n + 1})), Some(&r1)).await })
            })
            .collect::<Vec<_>>();

        let mut succeeded = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(e) if e.is_conflict() => conflicts += 1,
                Err(e) => panic!("unexpected error {e}"),
            }
        }

        assert_eq!(succeeded, 1);
        assert_eq!(conflicts, 15);
        assert_eq!(store.get("d1").await.unwrap().generation(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creators_of_same_document() {
        let store = InMemoryStore::new();

        let handles = (0..8)
            .map(|n| {
                let store = store.clone();
                tokio::spawn(async move { store.put("new", fields(json!({"n": n})), None).await })
            })
            .collect::<Vec<_>>();

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }

        assert_eq!(succeeded, 1);
    }

    #[tokio::test]
    async fn test_builder_clamps_concurrency() {
        let store = InMemoryStore::builder().scan_concurrency(0).build().await.unwrap();
        assert_eq!(store.scan_concurrency(), 1);
    }
}
