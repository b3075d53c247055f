//! Stage-based join/filter/sort/paginate pipeline for saved questions.
//!
//! # Responsibility
//! - Start from one user's collections and resolve question, author and tags.
//! - Apply text filtering, sorting and offset pagination in stage order.
//! - Project the assembled documents into the response shape.
//!
//! # Invariants
//! - `LookupQuestion` and `LookupAuthor` are inner joins.
//! - `LookupTags` keeps the question's tag order and skips unknown tag ids.
//! - Sorting always ends with a `question.id ASC` tiebreak.

use crate::model::collection::{Collection, CollectionId};
use crate::model::question::{Question, QuestionId, Tag, TagId};
use crate::model::user::{UserId, UserSummary};
use crate::repo::{RepoError, RepoResult};
use log::debug;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

/// Keyed fetches the pipeline needs from a store.
pub trait LookupSource {
    fn collections_by_author(&self, author_id: UserId) -> RepoResult<Vec<Collection>>;
    fn questions_by_id(&self, ids: &[QuestionId]) -> RepoResult<HashMap<QuestionId, Question>>;
    fn authors_by_id(&self, ids: &[UserId]) -> RepoResult<HashMap<UserId, UserSummary>>;
    fn tags_by_id(&self, ids: &[TagId]) -> RepoResult<HashMap<TagId, Tag>>;
}

/// Case-insensitive literal substring matcher over title and content.
#[derive(Debug, Clone)]
pub struct TextFilter {
    needle: String,
    regex: Regex,
}

impl TextFilter {
    /// Builds a matcher treating `needle` literally. Returns `Ok(None)` for a
    /// blank needle.
    pub fn new(needle: &str) -> Result<Option<Self>, regex::Error> {
        let trimmed = needle.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let regex = RegexBuilder::new(&regex::escape(trimmed))
            .case_insensitive(true)
            .build()?;
        Ok(Some(Self {
            needle: trimmed.to_string(),
            regex,
        }))
    }

    pub fn needle(&self) -> &str {
        &self.needle
    }

    pub fn matches(&self, question: &Question) -> bool {
        self.regex.is_match(&question.title) || self.regex.is_match(&question.content)
    }
}

/// Sort modes of the saved-questions view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SavedQuestionSort {
    /// `createdAt DESC`.
    #[default]
    MostRecent,
    /// `createdAt ASC`.
    Oldest,
    /// `upvotes DESC`.
    MostVoted,
    /// `views DESC`.
    MostViewed,
    /// `answers DESC`.
    MostAnswers,
}

impl SavedQuestionSort {
    /// Parses a filter value; absent or unknown values fall back to
    /// `MostRecent`.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("oldest") => Self::Oldest,
            Some("mostvoted") => Self::MostVoted,
            Some("mostviewed") => Self::MostViewed,
            Some("mostanswers") => Self::MostAnswers,
            _ => Self::MostRecent,
        }
    }

    fn compare(self, left: &Question, right: &Question) -> Ordering {
        let primary = match self {
            Self::MostRecent => right.created_at.cmp(&left.created_at),
            Self::Oldest => left.created_at.cmp(&right.created_at),
            Self::MostVoted => right.upvotes.cmp(&left.upvotes),
            Self::MostViewed => right.views.cmp(&left.views),
            Self::MostAnswers => right.answers.cmp(&left.answers),
        };
        primary.then_with(|| left.id.cmp(&right.id))
    }
}

/// One pipeline step. Documents flow through stages in order.
#[derive(Debug, Clone)]
pub enum Stage {
    LookupQuestion,
    LookupAuthor,
    LookupTags,
    MatchText(TextFilter),
    Sort(SavedQuestionSort),
    Skip(u64),
    Limit(u64),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LookupQuestion => "lookup_question",
            Self::LookupAuthor => "lookup_author",
            Self::LookupTags => "lookup_tags",
            Self::MatchText(_) => "match_text",
            Self::Sort(_) => "sort",
            Self::Skip(_) => "skip",
            Self::Limit(_) => "limit",
        }
    }
}

/// Question with its author and tags resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub id: QuestionId,
    pub title: String,
    pub content: String,
    pub answers: i64,
    pub upvotes: i64,
    pub downvotes: i64,
    pub views: i64,
    pub created_at: i64,
    pub author: UserSummary,
    pub tags: Vec<Tag>,
}

impl QuestionView {
    pub fn assemble(question: Question, author: UserSummary, tags: Vec<Tag>) -> Self {
        Self {
            id: question.id,
            title: question.title,
            content: question.content,
            answers: question.answers,
            upvotes: question.upvotes,
            downvotes: question.downvotes,
            views: question.views,
            created_at: question.created_at,
            author,
            tags,
        }
    }
}

/// Projected saved-question record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedQuestion {
    pub collection_id: CollectionId,
    pub question: QuestionView,
}

#[derive(Debug, Clone)]
struct Document {
    collection: Collection,
    question: Option<Question>,
    author: Option<UserSummary>,
    tags: Vec<Tag>,
}

/// Ordered stage list rooted at one user's collections.
#[derive(Debug, Clone)]
pub struct Pipeline {
    owner: UserId,
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Starts a pipeline whose first stage matches collections of `owner`.
    pub fn collections_of(owner: UserId) -> Self {
        Self {
            owner,
            stages: Vec::new(),
        }
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Runs every stage and returns the number of surviving documents.
    pub fn count(&self, source: &impl LookupSource) -> RepoResult<u64> {
        Ok(self.run(source)?.len() as u64)
    }

    /// Runs every stage and projects the surviving documents.
    ///
    /// # Errors
    /// - `InvalidData` when the stages do not resolve question and author
    ///   before projection.
    pub fn execute(&self, source: &impl LookupSource) -> RepoResult<Vec<SavedQuestion>> {
        self.run(source)?.into_iter().map(project).collect()
    }

    fn run(&self, source: &impl LookupSource) -> RepoResult<Vec<Document>> {
        let mut docs: Vec<Document> = source
            .collections_by_author(self.owner)?
            .into_iter()
            .filter(|collection| collection.author_id == self.owner)
            .map(|collection| Document {
                collection,
                question: None,
                author: None,
                tags: Vec::new(),
            })
            .collect();

        for stage in &self.stages {
            let docs_in = docs.len();
            docs = apply_stage(stage, docs, source)?;
            debug!(
                "event=pipeline_stage module=query status=ok stage={} docs_in={docs_in} docs_out={}",
                stage.name(),
                docs.len()
            );
        }
        Ok(docs)
    }
}

fn apply_stage(
    stage: &Stage,
    mut docs: Vec<Document>,
    source: &impl LookupSource,
) -> RepoResult<Vec<Document>> {
    match stage {
        Stage::LookupQuestion => {
            let ids = distinct(docs.iter().map(|doc| doc.collection.question_id));
            let questions = source.questions_by_id(&ids)?;
            Ok(docs
                .into_iter()
                .filter_map(|mut doc| {
                    doc.question = Some(questions.get(&doc.collection.question_id)?.clone());
                    Some(doc)
                })
                .collect())
        }
        Stage::LookupAuthor => {
            let ids = distinct(
                docs.iter()
                    .filter_map(|doc| doc.question.as_ref().map(|question| question.author_id)),
            );
            let authors = source.authors_by_id(&ids)?;
            Ok(docs
                .into_iter()
                .filter_map(|mut doc| {
                    let author_id = doc.question.as_ref()?.author_id;
                    doc.author = Some(authors.get(&author_id)?.clone());
                    Some(doc)
                })
                .collect())
        }
        Stage::LookupTags => {
            let ids = distinct(docs.iter().flat_map(|doc| {
                doc.question
                    .iter()
                    .flat_map(|question| question.tag_ids.iter().copied())
            }));
            let tags = source.tags_by_id(&ids)?;
            for doc in &mut docs {
                doc.tags = doc
                    .question
                    .as_ref()
                    .map(|question| {
                        question
                            .tag_ids
                            .iter()
                            .filter_map(|id| tags.get(id).cloned())
                            .collect()
                    })
                    .unwrap_or_default();
            }
            Ok(docs)
        }
        Stage::MatchText(filter) => Ok(docs
            .into_iter()
            .filter(|doc| {
                doc.question
                    .as_ref()
                    .is_some_and(|question| filter.matches(question))
            })
            .collect()),
        Stage::Sort(mode) => {
            docs.sort_by(|left, right| match (&left.question, &right.question) {
                (Some(l), Some(r)) => mode.compare(l, r),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => left.collection.id.cmp(&right.collection.id),
            });
            Ok(docs)
        }
        Stage::Skip(count) => Ok(docs.into_iter().skip(to_usize(*count)).collect()),
        Stage::Limit(count) => {
            docs.truncate(to_usize(*count));
            Ok(docs)
        }
    }
}

fn project(doc: Document) -> RepoResult<SavedQuestion> {
    let Document {
        collection,
        question,
        author,
        tags,
    } = doc;
    let (question, author) = match (question, author) {
        (Some(question), Some(author)) => (question, author),
        _ => {
            return Err(RepoError::InvalidData(
                "saved-question projection requires question and author lookups".to_string(),
            ))
        }
    };

    Ok(SavedQuestion {
        collection_id: collection.id,
        question: QuestionView::assemble(question, author, tags),
    })
}

fn distinct<T: Ord + Copy>(values: impl Iterator<Item = T>) -> Vec<T> {
    values.collect::<BTreeSet<_>>().into_iter().collect()
}

fn to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}
