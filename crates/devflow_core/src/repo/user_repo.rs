//! User repository: authoring support and author-summary lookups.

use super::{for_each_row_in, parse_uuid, RepoResult};
use crate::model::user::{User, UserId, UserSummary};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;

/// Repository interface for user records.
pub trait UserRepository {
    fn create_user(&self, user: &User) -> RepoResult<UserId>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    /// Resolves author summaries keyed by id; missing ids are absent.
    fn get_user_summaries(&self, ids: &[UserId]) -> RepoResult<HashMap<UserId, UserSummary>>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &User) -> RepoResult<UserId> {
        self.conn.execute(
            "INSERT INTO users (id, name, image, created_at) VALUES (?1, ?2, ?3, ?4);",
            params![
                user.id.to_string(),
                user.name.as_str(),
                user.image.as_deref(),
                user.created_at,
            ],
        )?;
        Ok(user.id)
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, name, image, created_at FROM users WHERE id = ?1;",
                [id.to_string()],
                |row| Ok(parse_user_row(row)),
            )
            .optional()?;
        user.transpose()
    }

    fn get_user_summaries(&self, ids: &[UserId]) -> RepoResult<HashMap<UserId, UserSummary>> {
        let mut summaries = HashMap::new();
        for_each_row_in(
            self.conn,
            ids,
            |list| format!("SELECT id, name, image, created_at FROM users WHERE id IN ({list});"),
            |row| {
                let user = parse_user_row(row)?;
                summaries.insert(user.id, user.summary());
                Ok(())
            },
        )?;
        Ok(summaries)
    }
}

pub(crate) fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let id_text: String = row.get("id")?;
    Ok(User {
        id: parse_uuid(&id_text, "users.id")?,
        name: row.get("name")?,
        image: row.get("image")?,
        created_at: row.get("created_at")?,
    })
}
