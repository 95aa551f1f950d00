//! Document store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist correspondence snapshots addressed by integer id.
//! - Detect concurrent modification with a compare-and-swap `version`.
//!
//! # Invariants
//! - Write paths call `Correspondence::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - `save` succeeds only when the stored version equals `expected_version`,
//!   and then bumps it by exactly one.

use crate::db::DbError;
use crate::model::correspondence::{Correspondence, CorrespondenceValidationError, DocumentId};
use crate::model::stage::Stage;
use crate::model::user::DepartmentId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const LIST_DEFAULT_LIMIT: u32 = 20;
const LIST_LIMIT_MAX: u32 = 100;

const DOCUMENT_SELECT_SQL: &str = "SELECT
    id,
    stage,
    snapshot,
    version
FROM correspondence";

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for document persistence, query and sink operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(CorrespondenceValidationError),
    Db(DbError),
    NotFound(DocumentId),
    /// Stored version moved on since the caller loaded the snapshot.
    VersionConflict {
        document_id: DocumentId,
        expected: u64,
        actual: u64,
    },
    InvalidData(String),
    LockPoisoned,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "document not found: {id}"),
            Self::VersionConflict {
                document_id,
                expected,
                actual,
            } => write!(
                f,
                "document {document_id} was modified concurrently: expected version {expected}, found {actual}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted document data: {message}"),
            Self::LockPoisoned => write!(f, "document store lock poisoned"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CorrespondenceValidationError> for RepoError {
    fn from(value: CorrespondenceValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Filter and pagination options for listing documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentListQuery {
    pub stage: Option<Stage>,
    pub kartoteka: Option<String>,
    pub department_id: Option<DepartmentId>,
    /// Defaults to 20 and clamps to 100.
    pub limit: Option<u32>,
    pub offset: u32,
}

impl DocumentListQuery {
    /// Returns whether `document` passes every filter.
    pub fn matches(&self, document: &Correspondence) -> bool {
        self.stage.map_or(true, |stage| document.stage == stage)
            && self
                .kartoteka
                .as_deref()
                .map_or(true, |kartoteka| document.kartoteka == kartoteka)
            && self
                .department_id
                .map_or(true, |department_id| document.department_id == Some(department_id))
    }
}

/// Normalizes an optional list limit into the supported range.
pub fn normalize_list_limit(limit: Option<u32>) -> u32 {
    limit
        .unwrap_or(LIST_DEFAULT_LIMIT)
        .clamp(1, LIST_LIMIT_MAX)
}

/// Durable storage of correspondence snapshots.
pub trait DocumentStore {
    /// Stores a new document and returns the assigned id. The stored
    /// version starts at 1.
    fn insert(&self, document: &Correspondence) -> RepoResult<DocumentId>;
    /// Loads one document; `NotFound` when absent.
    fn load(&self, id: DocumentId) -> RepoResult<Correspondence>;
    /// Replaces `document` iff the stored version equals `expected_version`.
    /// Returns the new version.
    fn save(&self, document: &Correspondence, expected_version: u64) -> RepoResult<u64>;
    /// Lists documents ordered by most recent update first.
    fn list(&self, query: &DocumentListQuery) -> RepoResult<Vec<Correspondence>>;
}

impl<T: DocumentStore + ?Sized> DocumentStore for &T {
    fn insert(&self, document: &Correspondence) -> RepoResult<DocumentId> {
        (**self).insert(document)
    }

    fn load(&self, id: DocumentId) -> RepoResult<Correspondence> {
        (**self).load(id)
    }

    fn save(&self, document: &Correspondence, expected_version: u64) -> RepoResult<u64> {
        (**self).save(document, expected_version)
    }

    fn list(&self, query: &DocumentListQuery) -> RepoResult<Vec<Correspondence>> {
        (**self).list(query)
    }
}

/// SQLite-backed document store.
pub struct SqliteDocumentStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentStore<'conn> {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn stored_version(&self, id: DocumentId) -> RepoResult<Option<u64>> {
        let version = self
            .conn
            .query_row(
                "SELECT version FROM correspondence WHERE id = ?1;",
                [id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        version.map(version_from_db).transpose()
    }
}

impl DocumentStore for SqliteDocumentStore<'_> {
    fn insert(&self, document: &Correspondence) -> RepoResult<DocumentId> {
        document.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO correspondence (
                kind,
                stage,
                kartoteka,
                title,
                department_id,
                snapshot,
                version,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, '{}', 1, ?6);",
            params![
                document.kind.as_str(),
                document.stage.as_str(),
                document.kartoteka.as_str(),
                document.title.as_str(),
                document.department_id,
                document.created_at,
            ],
        )?;
        let id = tx.last_insert_rowid();

        let mut stored = document.clone();
        stored.id = id;
        stored.version = 1;
        tx.execute(
            "UPDATE correspondence SET snapshot = ?2 WHERE id = ?1;",
            params![id, encode_snapshot(&stored)?],
        )?;
        tx.commit()?;

        Ok(id)
    }

    fn load(&self, id: DocumentId) -> RepoResult<Correspondence> {
        let mut stmt = self
            .conn
            .prepare(&format!("{DOCUMENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return parse_document_row(row);
        }

        Err(RepoError::NotFound(id))
    }

    fn save(&self, document: &Correspondence, expected_version: u64) -> RepoResult<u64> {
        document.validate()?;

        let new_version = expected_version + 1;
        let mut stored = document.clone();
        stored.version = new_version;

        let changed = self.conn.execute(
            "UPDATE correspondence
             SET
                stage = ?3,
                kartoteka = ?4,
                title = ?5,
                department_id = ?6,
                snapshot = ?7,
                version = ?8,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND version = ?2;",
            params![
                document.id,
                version_to_db(expected_version)?,
                document.stage.as_str(),
                document.kartoteka.as_str(),
                document.title.as_str(),
                document.department_id,
                encode_snapshot(&stored)?,
                version_to_db(new_version)?,
            ],
        )?;

        if changed == 0 {
            return match self.stored_version(document.id)? {
                None => Err(RepoError::NotFound(document.id)),
                Some(actual) => Err(RepoError::VersionConflict {
                    document_id: document.id,
                    expected: expected_version,
                    actual,
                }),
            };
        }

        Ok(new_version)
    }

    fn list(&self, query: &DocumentListQuery) -> RepoResult<Vec<Correspondence>> {
        let mut sql = format!("{DOCUMENT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(stage) = query.stage {
            sql.push_str(" AND stage = ?");
            bind_values.push(Value::Text(stage.as_str().to_string()));
        }
        if let Some(kartoteka) = query.kartoteka.as_ref() {
            sql.push_str(" AND kartoteka = ?");
            bind_values.push(Value::Text(kartoteka.clone()));
        }
        if let Some(department_id) = query.department_id {
            sql.push_str(" AND department_id = ?");
            bind_values.push(Value::Integer(department_id));
        }

        sql.push_str(" ORDER BY updated_at DESC, id ASC LIMIT ?");
        bind_values.push(Value::Integer(i64::from(normalize_list_limit(query.limit))));
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            documents.push(parse_document_row(row)?);
        }

        Ok(documents)
    }
}

fn parse_document_row(row: &Row<'_>) -> RepoResult<Correspondence> {
    let id: DocumentId = row.get("id")?;
    let snapshot: String = row.get("snapshot")?;
    let mut document: Correspondence = serde_json::from_str(&snapshot).map_err(|err| {
        RepoError::InvalidData(format!("invalid snapshot for document {id}: {err}"))
    })?;

    let stage_text: String = row.get("stage")?;
    if stage_text != document.stage.as_str() {
        return Err(RepoError::InvalidData(format!(
            "stage column `{stage_text}` disagrees with snapshot stage `{}` for document {id}",
            document.stage
        )));
    }

    document.id = id;
    document.version = version_from_db(row.get("version")?)?;
    document.validate()?;
    Ok(document)
}

fn encode_snapshot(document: &Correspondence) -> RepoResult<String> {
    serde_json::to_string(document)
        .map_err(|err| RepoError::InvalidData(format!("failed to encode snapshot: {err}")))
}

fn version_to_db(version: u64) -> RepoResult<i64> {
    i64::try_from(version)
        .map_err(|_| RepoError::InvalidData(format!("version {version} out of range")))
}

fn version_from_db(value: i64) -> RepoResult<u64> {
    u64::try_from(value).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid version `{value}` in correspondence.version"
        ))
    })
}
