//! Revision identities, revision records and winner resolution.
//!
//! Every document owns an append-only set of [`Revision`] records. Each record names its
//! parent by [`RevisionId`] rather than by reference, so a document's lineage is a flat
//! arena ([`RevisionTree`]) keyed by `(generation, hash)`.
//!
//! The winning leaf is the leaf that maximizes `(generation, hash)`. [`resolve_winner`]
//! computes it as a pure function over any set of revisions, so two stores holding the same
//! revisions always agree on the current state regardless of insertion order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    str::FromStr,
};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// The field map of a single revision.
///
/// Keys are unique and iterate in a fixed order, which keeps content hashes deterministic.
pub type Fields = Map<String, Value>;

/// Identity of a revision: its generation and content hash, rendered as `"<generation>-<hash>"`.
///
/// The derived ordering compares generation first and hash second, which is exactly the
/// order used to pick a document's winning leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RevisionId {
    generation: u64,
    hash: String,
}

impl RevisionId {
    /// Returns the generation, which is `1` for a root and grows by one along each lineage path.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the content hash token.
    pub fn hash(&self) -> &str {
        &self.hash
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.generation, self.hash)
    }
}

impl FromStr for RevisionId {
    type Err = DocumentStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DocumentStoreError::Validation(format!("Invalid revision id: {s}"));

        let (generation, hash) = s.split_once('-').ok_or_else(invalid)?;
        let generation = generation.parse::<u64>().map_err(|_| invalid())?;

        if generation == 0 || hash.is_empty() {
            return Err(invalid());
        }

        Ok(RevisionId { generation, hash: hash.to_string() })
    }
}

impl TryFrom<String> for RevisionId {
    type Error = DocumentStoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RevisionId> for String {
    fn from(id: RevisionId) -> Self {
        id.to_string()
    }
}

/// A single immutable revision of a document.
///
/// Revisions can only be built through [`Revision::root`] and [`Revision::child_of`], which
/// derive the generation from the parent and the hash from the content. A revision's
/// identity therefore always agrees with its place in the lineage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Revision {
    id: RevisionId,
    parent: Option<RevisionId>,
    deleted: bool,
    fields: Fields,
}

impl Revision {
    /// Builds the first revision of a new lineage.
    pub fn root(fields: Fields) -> Self {
        Self::build(None, fields, false)
    }

    /// Builds a revision that extends `parent`.
    ///
    /// A `deleted` revision is a tombstone; its fields are kept as given.
    pub fn child_of(parent: &RevisionId, fields: Fields, deleted: bool) -> Self {
        Self::build(Some(parent.clone()), fields, deleted)
    }

    fn build(parent: Option<RevisionId>, fields: Fields, deleted: bool) -> Self {
        let generation = parent
            .as_ref()
            .map(|p| p.generation + 1)
            .unwrap_or(1);
        let hash = content_hash(parent.as_ref(), deleted, &fields);

        Self {
            id: RevisionId { generation, hash },
            parent,
            deleted,
            fields,
        }
    }

    /// Returns this revision's identity.
    pub fn id(&self) -> &RevisionId {
        &self.id
    }

    /// Returns the parent revision's identity, or `None` for a root.
    pub fn parent(&self) -> Option<&RevisionId> {
        self.parent.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.id.generation
    }

    /// Returns `true` if this revision is a tombstone.
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn into_fields(self) -> Fields {
        self.fields
    }
}

fn content_hash(parent: Option<&RevisionId>, deleted: bool, fields: &Fields) -> String {
    let mut hasher = Sha256::new();

    if let Some(parent) = parent {
        hasher.update(parent.to_string().as_bytes());
    }
    hasher.update([0u8, deleted as u8]);
    hasher.update(serde_json::to_vec(fields).expect("string-keyed JSON maps always serialize"));

    hex::encode(&hasher.finalize()[..16])
}

/// Selects the winning leaf from a set of revisions.
///
/// A leaf is a revision that no other revision in the set names as its parent. The winner
/// is the leaf with the greatest `(generation, hash)`. The result depends only on the set,
/// never on iteration order, and is `None` only for an empty set.
pub fn resolve_winner<'a, I>(revisions: I) -> Option<&'a Revision>
where
    I: IntoIterator<Item = &'a Revision>,
    I::IntoIter: Clone,
{
    let revisions = revisions.into_iter();
    let parents = revisions
        .clone()
        .filter_map(Revision::parent)
        .collect::<BTreeSet<_>>();

    revisions
        .filter(|rev| !parents.contains(rev.id()))
        .max_by(|a, b| a.id().cmp(b.id()))
}

/// Arena of every revision a document has ever had.
///
/// Revisions are keyed by [`RevisionId`]; parents are referenced by key. The tree is never
/// empty: it is created from a root and only ever grows.
#[derive(Debug, Clone)]
pub struct RevisionTree {
    revisions: BTreeMap<RevisionId, Revision>,
    parents: BTreeSet<RevisionId>,
}

impl RevisionTree {
    /// Creates a lineage holding a single root revision.
    pub fn with_root(root: Revision) -> Self {
        let mut tree = Self {
            revisions: BTreeMap::new(),
            parents: BTreeSet::new(),
        };
        tree.insert(root);
        tree
    }

    /// Adds a revision to the arena.
    ///
    /// Returns `false` if a revision with the same identity was already present. The parent
    /// does not need to be present yet, which lets a tree be rebuilt from revisions arriving
    /// in any order.
    pub fn insert(&mut self, revision: Revision) -> bool {
        if self.revisions.contains_key(revision.id()) {
            return false;
        }

        if let Some(parent) = revision.parent() {
            self.parents.insert(parent.clone());
        }
        self.revisions.insert(revision.id().clone(), revision);

        true
    }

    pub fn get(&self, id: &RevisionId) -> Option<&Revision> {
        self.revisions.get(id)
    }

    pub fn contains(&self, id: &RevisionId) -> bool {
        self.revisions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    /// Iterates over every leaf, in ascending `(generation, hash)` order.
    pub fn leaves(&self) -> impl DoubleEndedIterator<Item = &Revision> + '_ {
        self.revisions
            .values()
            .filter(move |rev| !self.parents.contains(rev.id()))
    }

    /// Returns the winning leaf.
    ///
    /// Agrees with [`resolve_winner`] over the same revisions: leaves iterate in ascending
    /// `(generation, hash)` order, so the last one wins.
    pub fn winner(&self) -> Option<&Revision> {
        self.leaves().next_back()
    }

    /// Returns the non-deleted leaves that lost to the winner, best first.
    pub fn conflicts(&self) -> Vec<&Revision> {
        let winner = self.winner().map(Revision::id);

        self.leaves()
            .rev()
            .filter(|rev| Some(rev.id()) != winner && !rev.is_deleted())
            .collect()
    }
}
