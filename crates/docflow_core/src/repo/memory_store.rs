//! In-process document store with per-document compare-and-swap.

use crate::model::correspondence::{Correspondence, DocumentId};
use crate::repo::document_repo::{
    normalize_list_limit, DocumentListQuery, DocumentStore, RepoError, RepoResult,
};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct StoredDocument {
    document: Correspondence,
    /// Monotonic write sequence standing in for `updated_at`.
    updated_seq: u64,
}

#[derive(Debug, Default)]
struct Arena {
    documents: BTreeMap<DocumentId, StoredDocument>,
    next_id: DocumentId,
    write_seq: u64,
}

/// Document store kept in memory.
///
/// Safe to share between threads; every operation holds the arena lock for
/// its whole read-check-write, so `save` is a true compare-and-swap.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    arena: Mutex<Arena>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Arena>> {
        self.arena.lock().map_err(|_| RepoError::LockPoisoned)
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn insert(&self, document: &Correspondence) -> RepoResult<DocumentId> {
        document.validate()?;

        let mut arena = self.lock()?;
        arena.next_id += 1;
        arena.write_seq += 1;
        let id = arena.next_id;

        let mut stored = document.clone();
        stored.id = id;
        stored.version = 1;
        let updated_seq = arena.write_seq;
        arena.documents.insert(
            id,
            StoredDocument {
                document: stored,
                updated_seq,
            },
        );
        Ok(id)
    }

    fn load(&self, id: DocumentId) -> RepoResult<Correspondence> {
        let arena = self.lock()?;
        arena
            .documents
            .get(&id)
            .map(|stored| stored.document.clone())
            .ok_or(RepoError::NotFound(id))
    }

    fn save(&self, document: &Correspondence, expected_version: u64) -> RepoResult<u64> {
        document.validate()?;

        let mut arena = self.lock()?;
        arena.write_seq += 1;
        let updated_seq = arena.write_seq;
        let stored = arena
            .documents
            .get_mut(&document.id)
            .ok_or(RepoError::NotFound(document.id))?;

        if stored.document.version != expected_version {
            return Err(RepoError::VersionConflict {
                document_id: document.id,
                expected: expected_version,
                actual: stored.document.version,
            });
        }

        let new_version = expected_version + 1;
        stored.document = document.clone();
        stored.document.version = new_version;
        stored.updated_seq = updated_seq;
        Ok(new_version)
    }

    fn list(&self, query: &DocumentListQuery) -> RepoResult<Vec<Correspondence>> {
        let arena = self.lock()?;
        let mut matching: Vec<&StoredDocument> = arena
            .documents
            .values()
            .filter(|stored| query.matches(&stored.document))
            .collect();
        matching.sort_by(|left, right| {
            right
                .updated_seq
                .cmp(&left.updated_seq)
                .then(left.document.id.cmp(&right.document.id))
        });

        let limit = normalize_list_limit(query.limit) as usize;
        Ok(matching
            .into_iter()
            .skip(query.offset as usize)
            .take(limit)
            .map(|stored| stored.document.clone())
            .collect())
    }
}
