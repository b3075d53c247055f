//! Saved-question (collection) repository.
//!
//! # Invariants
//! - At most one row per `(author_id, question_id)`, backed by a unique index.
//! - Rows are listed in `created_at DESC, id ASC` order.

use super::{parse_uuid, RepoError, RepoResult};
use crate::model::collection::{Collection, CollectionId};
use crate::model::question::QuestionId;
use crate::model::user::UserId;
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Repository interface for bookmark rows.
pub trait CollectionRepository {
    fn find_collection(
        &self,
        author_id: UserId,
        question_id: QuestionId,
    ) -> RepoResult<Option<Collection>>;
    fn insert_collection(&self, collection: &Collection) -> RepoResult<CollectionId>;
    fn delete_collection(&self, id: CollectionId) -> RepoResult<()>;
    fn list_collections_by_author(&self, author_id: UserId) -> RepoResult<Vec<Collection>>;
}

/// SQLite-backed collection repository.
pub struct SqliteCollectionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCollectionRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CollectionRepository for SqliteCollectionRepository<'_> {
    fn find_collection(
        &self,
        author_id: UserId,
        question_id: QuestionId,
    ) -> RepoResult<Option<Collection>> {
        let collection = self
            .conn
            .query_row(
                "SELECT id, author_id, question_id, created_at
                 FROM collections
                 WHERE author_id = ?1
                   AND question_id = ?2;",
                params![author_id.to_string(), question_id.to_string()],
                |row| Ok(parse_collection_row(row)),
            )
            .optional()?;
        collection.transpose()
    }

    fn insert_collection(&self, collection: &Collection) -> RepoResult<CollectionId> {
        self.conn.execute(
            "INSERT INTO collections (id, author_id, question_id, created_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                collection.id.to_string(),
                collection.author_id.to_string(),
                collection.question_id.to_string(),
                collection.created_at,
            ],
        )?;
        Ok(collection.id)
    }

    fn delete_collection(&self, id: CollectionId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM collections WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "collection",
                id,
            });
        }
        Ok(())
    }

    fn list_collections_by_author(&self, author_id: UserId) -> RepoResult<Vec<Collection>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, author_id, question_id, created_at
             FROM collections
             WHERE author_id = ?1
             ORDER BY created_at DESC, id ASC;",
        )?;
        let mut rows = stmt.query([author_id.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_collection_row(row)?);
        }
        Ok(items)
    }
}

fn parse_collection_row(row: &Row<'_>) -> RepoResult<Collection> {
    let id_text: String = row.get("id")?;
    let author_text: String = row.get("author_id")?;
    let question_text: String = row.get("question_id")?;
    Ok(Collection {
        id: parse_uuid(&id_text, "collections.id")?,
        author_id: parse_uuid(&author_text, "collections.author_id")?,
        question_id: parse_uuid(&question_text, "collections.question_id")?,
        created_at: row.get("created_at")?,
    })
}
