//! Question/tag repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist questions together with their ordered tag links.
//! - Resolve questions and tags by id for keyed read paths.
//!
//! # Invariants
//! - Tag names are normalized to lowercase and deduplicated before storage.
//! - `Question::tag_ids` preserves the order tags were attached in.
//! - Counter columns are never written here except for the initial insert.

use super::{for_each_row_in, parse_uuid, RepoResult};
use crate::model::question::{Question, QuestionId, Tag, TagId};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

const QUESTION_SELECT_SQL: &str = "SELECT
    id,
    author_id,
    title,
    content,
    answers,
    upvotes,
    downvotes,
    views,
    created_at
FROM questions";

/// Repository interface for question authoring and keyed lookups.
pub trait QuestionRepository {
    /// Inserts a question and links the given tag names, creating tags on
    /// demand. Returns the stored question with resolved `tag_ids`.
    fn create_question(&self, question: &Question, tag_names: &[String]) -> RepoResult<Question>;
    fn get_question(&self, id: QuestionId) -> RepoResult<Option<Question>>;
    fn question_exists(&self, id: QuestionId) -> RepoResult<bool>;
    /// Resolves questions keyed by id; missing ids are absent.
    fn get_questions(&self, ids: &[QuestionId]) -> RepoResult<HashMap<QuestionId, Question>>;
    /// Resolves tags keyed by id; missing ids are absent.
    fn get_tags(&self, ids: &[TagId]) -> RepoResult<HashMap<TagId, Tag>>;
}

/// SQLite-backed question repository.
pub struct SqliteQuestionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteQuestionRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl QuestionRepository for SqliteQuestionRepository<'_> {
    fn create_question(&self, question: &Question, tag_names: &[String]) -> RepoResult<Question> {
        self.conn.execute(
            "INSERT INTO questions (
                id,
                author_id,
                title,
                content,
                answers,
                upvotes,
                downvotes,
                views,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, 0, 0, 0, 0, ?5);",
            params![
                question.id.to_string(),
                question.author_id.to_string(),
                question.title.as_str(),
                question.content.as_str(),
                question.created_at,
            ],
        )?;

        let mut tag_ids = Vec::new();
        for (position, name) in normalize_tags(tag_names).into_iter().enumerate() {
            let tag = ensure_tag(self.conn, &name)?;
            self.conn.execute(
                "INSERT INTO question_tags (question_id, tag_id, position) VALUES (?1, ?2, ?3);",
                params![question.id.to_string(), tag.id.to_string(), position as i64],
            )?;
            tag_ids.push(tag.id);
        }

        Ok(Question {
            tag_ids,
            answers: 0,
            upvotes: 0,
            downvotes: 0,
            views: 0,
            ..question.clone()
        })
    }

    fn get_question(&self, id: QuestionId) -> RepoResult<Option<Question>> {
        Ok(self.get_questions(&[id])?.remove(&id))
    }

    fn question_exists(&self, id: QuestionId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM questions WHERE id = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn get_questions(&self, ids: &[QuestionId]) -> RepoResult<HashMap<QuestionId, Question>> {
        let mut questions = HashMap::new();
        for_each_row_in(
            self.conn,
            ids,
            |list| format!("{QUESTION_SELECT_SQL} WHERE id IN ({list});"),
            |row| {
                let question = parse_question_row(row)?;
                questions.insert(question.id, question);
                Ok(())
            },
        )?;

        // Rows arrive grouped per question in position order.
        let found: Vec<QuestionId> = questions.keys().copied().collect();
        for_each_row_in(
            self.conn,
            &found,
            |list| {
                format!(
                    "SELECT question_id, tag_id
                     FROM question_tags
                     WHERE question_id IN ({list})
                     ORDER BY question_id, position ASC;"
                )
            },
            |row| {
                let question_id: String = row.get(0)?;
                let tag_id: String = row.get(1)?;
                let question_id = parse_uuid(&question_id, "question_tags.question_id")?;
                if let Some(question) = questions.get_mut(&question_id) {
                    question
                        .tag_ids
                        .push(parse_uuid(&tag_id, "question_tags.tag_id")?);
                }
                Ok(())
            },
        )?;
        Ok(questions)
    }

    fn get_tags(&self, ids: &[TagId]) -> RepoResult<HashMap<TagId, Tag>> {
        let mut tags = HashMap::new();
        for_each_row_in(
            self.conn,
            ids,
            |list| format!("SELECT id, name FROM tags WHERE id IN ({list});"),
            |row| {
                let tag = parse_tag_row(row)?;
                tags.insert(tag.id, tag);
                Ok(())
            },
        )?;
        Ok(tags)
    }
}

/// Normalizes one tag value: trimmed, lowercase, `None` when blank.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes and deduplicates tag values, keeping first-seen order.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    tags.iter()
        .filter_map(|tag| normalize_tag(tag))
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

fn ensure_tag(conn: &Connection, name: &str) -> RepoResult<Tag> {
    let existing = conn
        .query_row(
            "SELECT id, name FROM tags WHERE name = ?1 COLLATE NOCASE;",
            [name],
            |row| Ok(parse_tag_row(row)),
        )
        .optional()?;
    if let Some(tag) = existing {
        return tag;
    }

    let tag = Tag {
        id: Uuid::new_v4(),
        name: name.to_string(),
    };
    conn.execute(
        "INSERT INTO tags (id, name) VALUES (?1, ?2);",
        params![tag.id.to_string(), tag.name.as_str()],
    )?;
    Ok(tag)
}

fn parse_question_row(row: &Row<'_>) -> RepoResult<Question> {
    let id_text: String = row.get("id")?;
    let author_text: String = row.get("author_id")?;
    Ok(Question {
        id: parse_uuid(&id_text, "questions.id")?,
        author_id: parse_uuid(&author_text, "questions.author_id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        tag_ids: Vec::new(),
        answers: row.get("answers")?,
        upvotes: row.get("upvotes")?,
        downvotes: row.get("downvotes")?,
        views: row.get("views")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_tag_row(row: &Row<'_>) -> RepoResult<Tag> {
    let id_text: String = row.get("id")?;
    Ok(Tag {
        id: parse_uuid(&id_text, "tags.id")?,
        name: row.get::<_, String>("name")?.to_lowercase(),
    })
}
