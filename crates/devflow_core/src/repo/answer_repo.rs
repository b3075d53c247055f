//! Answer repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Insert, load and delete answer rows.
//! - List answers of one question with their author summaries.
//!
//! # Invariants
//! - Listing order is fully deterministic: the sort key is always followed
//!   by `id ASC` so offset pagination is stable under ties.
//! - Counter columns are never written here except for the initial insert.

use super::{parse_uuid, RepoResult};
use crate::model::answer::{Answer, AnswerId, AnswerView};
use crate::model::question::QuestionId;
use crate::model::user::UserSummary;
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Sort modes for answer listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AnswerSort {
    /// `created_at DESC`.
    #[default]
    Latest,
    /// `created_at ASC`.
    Oldest,
    /// `upvotes DESC`.
    Popular,
}

impl AnswerSort {
    /// Parses a filter value; absent or unknown values fall back to `Latest`.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("oldest") => Self::Oldest,
            Some("popular") => Self::Popular,
            _ => Self::Latest,
        }
    }

    fn order_by(self) -> &'static str {
        match self {
            Self::Latest => "a.created_at DESC, a.id ASC",
            Self::Oldest => "a.created_at ASC, a.id ASC",
            Self::Popular => "a.upvotes DESC, a.id ASC",
        }
    }
}

/// Repository interface for answer persistence.
pub trait AnswerRepository {
    fn insert_answer(&self, answer: &Answer) -> RepoResult<AnswerId>;
    fn get_answer(&self, id: AnswerId) -> RepoResult<Option<Answer>>;
    /// Hard-deletes one answer row.
    fn delete_answer(&self, id: AnswerId) -> RepoResult<()>;
    fn count_answers(&self, question_id: QuestionId) -> RepoResult<u64>;
    fn list_answers(
        &self,
        question_id: QuestionId,
        sort: AnswerSort,
        skip: u64,
        limit: u64,
    ) -> RepoResult<Vec<AnswerView>>;
}

/// SQLite-backed answer repository.
pub struct SqliteAnswerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAnswerRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AnswerRepository for SqliteAnswerRepository<'_> {
    fn insert_answer(&self, answer: &Answer) -> RepoResult<AnswerId> {
        self.conn.execute(
            "INSERT INTO answers (
                id,
                author_id,
                question_id,
                content,
                upvotes,
                downvotes,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, 0, 0, ?5);",
            params![
                answer.id.to_string(),
                answer.author_id.to_string(),
                answer.question_id.to_string(),
                answer.content.as_str(),
                answer.created_at,
            ],
        )?;
        Ok(answer.id)
    }

    fn get_answer(&self, id: AnswerId) -> RepoResult<Option<Answer>> {
        let answer = self
            .conn
            .query_row(
                "SELECT id, author_id, question_id, content, upvotes, downvotes, created_at
                 FROM answers
                 WHERE id = ?1;",
                [id.to_string()],
                |row| Ok(parse_answer_row(row)),
            )
            .optional()?;
        answer.transpose()
    }

    fn delete_answer(&self, id: AnswerId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM answers WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(super::RepoError::NotFound {
                entity: "answer",
                id,
            });
        }
        Ok(())
    }

    fn count_answers(&self, question_id: QuestionId) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM answers WHERE question_id = ?1;",
            [question_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn list_answers(
        &self,
        question_id: QuestionId,
        sort: AnswerSort,
        skip: u64,
        limit: u64,
    ) -> RepoResult<Vec<AnswerView>> {
        let sql = format!(
            "SELECT
                a.id AS id,
                a.author_id AS author_id,
                a.question_id AS question_id,
                a.content AS content,
                a.upvotes AS upvotes,
                a.downvotes AS downvotes,
                a.created_at AS created_at,
                u.name AS author_name,
                u.image AS author_image
             FROM answers a
             INNER JOIN users u ON u.id = a.author_id
             WHERE a.question_id = ?1
             ORDER BY {}
             LIMIT ?2 OFFSET ?3;",
            sort.order_by()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![
            question_id.to_string(),
            limit as i64,
            skip as i64
        ])?;

        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            let answer = parse_answer_row(row)?;
            let author = UserSummary {
                id: answer.author_id,
                name: row.get("author_name")?,
                image: row.get("author_image")?,
            };
            items.push(AnswerView { answer, author });
        }
        Ok(items)
    }
}

fn parse_answer_row(row: &Row<'_>) -> RepoResult<Answer> {
    let id_text: String = row.get("id")?;
    let author_text: String = row.get("author_id")?;
    let question_text: String = row.get("question_id")?;
    Ok(Answer {
        id: parse_uuid(&id_text, "answers.id")?,
        author_id: parse_uuid(&author_text, "answers.author_id")?,
        question_id: parse_uuid(&question_text, "answers.question_id")?,
        content: row.get("content")?,
        upvotes: row.get("upvotes")?,
        downvotes: row.get("downvotes")?,
        created_at: row.get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::AnswerSort;

    #[test]
    fn unknown_or_missing_sort_defaults_to_latest() {
        assert_eq!(AnswerSort::parse(None), AnswerSort::Latest);
        assert_eq!(AnswerSort::parse(Some("bogus")), AnswerSort::Latest);
        assert_eq!(AnswerSort::parse(Some(" Popular ")), AnswerSort::Popular);
        assert_eq!(AnswerSort::parse(Some("oldest")), AnswerSort::Oldest);
    }
}
