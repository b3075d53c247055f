//! Input schema gate for core operations.
//!
//! # Responsibility
//! - Parse raw, caller-shaped parameters into typed operation inputs.
//! - Report every failing field at once as a `ValidationError`.
//!
//! # Invariants
//! - Core operations only receive values produced here or constructed
//!   directly from typed ids.
//! - Unknown or absent sort/filter values fall back to the default mode
//!   rather than failing.

use crate::config::PaginationConfig;
use crate::error::ValidationError;
use crate::model::answer::AnswerId;
use crate::model::question::QuestionId;
use crate::model::vote::{TargetKind, VoteKind, VoteTarget};
use crate::query::pipeline::{SavedQuestionSort, TextFilter};
use crate::repo::answer_repo::AnswerSort;
use crate::repo::question_repo::normalize_tags;
use serde::Deserialize;
use uuid::Uuid;

pub const MAX_ANSWER_CHARS: usize = 10_000;
pub const MAX_TITLE_CHARS: usize = 150;
pub const MAX_TAGS: usize = 5;

/// Offset pagination request. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// Rows skipped before this page: `(page - 1) * page_size`.
    pub fn skip(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    /// Whether more rows exist after the `returned` rows of this page.
    pub fn has_next(&self, total_count: u64, returned: usize) -> bool {
        total_count > self.skip() + returned as u64
    }

    /// Validates raw page inputs against configured bounds.
    pub fn parse(
        page: Option<i64>,
        page_size: Option<i64>,
        config: &PaginationConfig,
    ) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::default();
        let page = page.unwrap_or(1);
        if page < 1 || page > i64::from(u32::MAX) {
            errors.push("page", "must be a positive integer");
        }
        let page_size = page_size.unwrap_or(i64::from(config.default_page_size));
        if page_size < 1 || page_size > i64::from(config.max_page_size) {
            errors.push(
                "pageSize",
                format!("must be between 1 and {}", config.max_page_size),
            );
        }
        errors.into_result()?;
        Ok(Self {
            page: page as u32,
            page_size: page_size as u32,
        })
    }
}

/// Raw input of `castVote`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteParams {
    pub target_id: String,
    pub target_type: String,
    pub vote_type: String,
}

impl CastVoteParams {
    pub fn validate(&self) -> Result<(VoteTarget, VoteKind), ValidationError> {
        let mut errors = ValidationError::default();
        let target = parse_target(&self.target_id, &self.target_type, &mut errors);
        let kind = VoteKind::parse(self.vote_type.trim());
        if kind.is_none() {
            errors.push("voteType", "must be `upvote` or `downvote`");
        }
        errors.into_result()?;
        match (target, kind) {
            (Some(target), Some(kind)) => Ok((target, kind)),
            _ => Err(ValidationError::field("voteType", "invalid vote")),
        }
    }
}

/// Raw input of `hasVoted`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HasVotedParams {
    pub target_id: String,
    pub target_type: String,
}

impl HasVotedParams {
    pub fn validate(&self) -> Result<VoteTarget, ValidationError> {
        let mut errors = ValidationError::default();
        let target = parse_target(&self.target_id, &self.target_type, &mut errors);
        errors.into_result()?;
        target.ok_or_else(|| ValidationError::field("targetId", "invalid target"))
    }
}

/// Raw input of `createAnswer`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnswerParams {
    pub question_id: String,
    pub content: String,
}

impl CreateAnswerParams {
    pub fn validate(&self) -> Result<(QuestionId, String), ValidationError> {
        let mut errors = ValidationError::default();
        let question_id = parse_id("questionId", &self.question_id, &mut errors);
        let content = parse_answer_content(&self.content, &mut errors);
        errors.into_result()?;
        match (question_id, content) {
            (Some(question_id), Some(content)) => Ok((question_id, content)),
            _ => Err(ValidationError::field("content", "invalid answer")),
        }
    }
}

/// Raw input of `deleteAnswer`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAnswerParams {
    pub answer_id: String,
}

impl DeleteAnswerParams {
    pub fn validate(&self) -> Result<AnswerId, ValidationError> {
        let mut errors = ValidationError::default();
        let id = parse_id("answerId", &self.answer_id, &mut errors);
        errors.into_result()?;
        id.ok_or_else(|| ValidationError::field("answerId", "invalid id"))
    }
}

/// Raw input of `getAnswers`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetAnswersParams {
    pub question_id: String,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
    #[serde(default)]
    pub filter: Option<String>,
}

/// Typed input of `getAnswers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswersRequest {
    pub question_id: QuestionId,
    pub page: PageRequest,
    pub sort: AnswerSort,
}

impl GetAnswersParams {
    pub fn validate(&self, config: &PaginationConfig) -> Result<AnswersRequest, ValidationError> {
        let mut errors = ValidationError::default();
        let question_id = parse_id("questionId", &self.question_id, &mut errors);
        let page = PageRequest::parse(self.page, self.page_size, config)
            .map_err(|err| merge(&mut errors, err))
            .ok();
        errors.into_result()?;
        match (question_id, page) {
            (Some(question_id), Some(page)) => Ok(AnswersRequest {
                question_id,
                page,
                sort: AnswerSort::parse(self.filter.as_deref()),
            }),
            _ => Err(ValidationError::field("questionId", "invalid request")),
        }
    }
}

/// Raw input of `toggleSaveQuestion` and `hasSavedQuestion`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionParams {
    pub question_id: String,
}

impl CollectionParams {
    pub fn validate(&self) -> Result<QuestionId, ValidationError> {
        let mut errors = ValidationError::default();
        let id = parse_id("questionId", &self.question_id, &mut errors);
        errors.into_result()?;
        id.ok_or_else(|| ValidationError::field("questionId", "invalid id"))
    }
}

/// Raw input of the saved-questions view.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedQuestionsParams {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub filter: Option<String>,
}

/// Typed input of the saved-questions view, minus the requester.
#[derive(Debug, Clone)]
pub struct SavedQuestionsRequest {
    pub page: PageRequest,
    pub text: Option<TextFilter>,
    pub sort: SavedQuestionSort,
}

impl SavedQuestionsParams {
    pub fn validate(
        &self,
        config: &PaginationConfig,
    ) -> Result<SavedQuestionsRequest, ValidationError> {
        let mut errors = ValidationError::default();
        let page = PageRequest::parse(self.page, self.page_size, config)
            .map_err(|err| merge(&mut errors, err))
            .ok();
        let text = match self.query.as_deref().map(TextFilter::new).transpose() {
            Ok(text) => text.flatten(),
            Err(_) => {
                errors.push("query", "query is too complex");
                None
            }
        };
        errors.into_result()?;
        let page = page.ok_or_else(|| ValidationError::field("page", "invalid page"))?;
        Ok(SavedQuestionsRequest {
            page,
            text,
            sort: SavedQuestionSort::parse(self.filter.as_deref()),
        })
    }
}

/// Raw input of question authoring.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionParams {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Typed question authoring input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

impl CreateQuestionParams {
    pub fn validate(&self) -> Result<QuestionDraft, ValidationError> {
        let mut errors = ValidationError::default();
        let title = self.title.trim();
        if title.is_empty() {
            errors.push("title", "title is required");
        } else if title.chars().count() > MAX_TITLE_CHARS {
            errors.push(
                "title",
                format!("title must be at most {MAX_TITLE_CHARS} characters"),
            );
        }
        if self.content.trim().is_empty() {
            errors.push("content", "content is required");
        }
        let tags = normalize_tags(&self.tags);
        if tags.is_empty() {
            errors.push("tags", "at least one tag is required");
        } else if tags.len() > MAX_TAGS {
            errors.push("tags", format!("at most {MAX_TAGS} tags are allowed"));
        }
        errors.into_result()?;
        Ok(QuestionDraft {
            title: title.to_string(),
            content: self.content.clone(),
            tags,
        })
    }
}

fn parse_id(field: &'static str, raw: &str, errors: &mut ValidationError) -> Option<Uuid> {
    match Uuid::parse_str(raw.trim()) {
        Ok(id) => Some(id),
        Err(_) => {
            errors.push(field, "must be a valid id");
            None
        }
    }
}

fn parse_target(
    raw_id: &str,
    raw_kind: &str,
    errors: &mut ValidationError,
) -> Option<VoteTarget> {
    let id = parse_id("targetId", raw_id, errors);
    let kind = TargetKind::parse(raw_kind.trim());
    if kind.is_none() {
        errors.push("targetType", "must be `question` or `answer`");
    }
    Some(VoteTarget::from_parts(kind?, id?))
}

fn parse_answer_content(raw: &str, errors: &mut ValidationError) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        errors.push("content", "answer content is required");
        return None;
    }
    if trimmed.chars().count() > MAX_ANSWER_CHARS {
        errors.push(
            "content",
            format!("answer must be at most {MAX_ANSWER_CHARS} characters"),
        );
        return None;
    }
    Some(trimmed.to_string())
}

fn merge(errors: &mut ValidationError, other: ValidationError) {
    for (field, message) in other.fields {
        errors.push(field, message);
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CastVoteParams, CreateAnswerParams, CreateQuestionParams, GetAnswersParams, PageRequest,
        SavedQuestionsParams,
    };
    use crate::config::PaginationConfig;
    use crate::model::vote::{VoteKind, VoteTarget};
    use crate::query::pipeline::SavedQuestionSort;
    use crate::repo::answer_repo::AnswerSort;
    use uuid::Uuid;

    #[test]
    fn page_request_computes_skip_and_has_next() {
        let first = PageRequest {
            page: 1,
            page_size: 10,
        };
        assert_eq!(first.skip(), 0);
        assert!(first.has_next(25, 10));

        let third = PageRequest {
            page: 3,
            page_size: 10,
        };
        assert_eq!(third.skip(), 20);
        assert!(!third.has_next(25, 5));
    }

    #[test]
    fn page_request_parses_within_configured_bounds() {
        let config = PaginationConfig::default();
        let err = PageRequest::parse(Some(0), Some(1_000), &config).unwrap_err();
        assert!(err.fields.contains_key("page"));
        assert!(err.fields.contains_key("pageSize"));

        let defaulted = PageRequest::parse(None, None, &config).unwrap();
        assert_eq!(defaulted.page, 1);
        assert_eq!(defaulted.page_size, 10);
    }

    #[test]
    fn cast_vote_params_parse_from_camel_case_json() {
        let id = Uuid::new_v4();
        let raw = format!(
            r#"{{"targetId": "{id}", "targetType": "answer", "voteType": "downvote"}}"#
        );
        let params: CastVoteParams = serde_json::from_str(&raw).unwrap();
        let (target, kind) = params.validate().unwrap();
        assert_eq!(target, VoteTarget::Answer(id));
        assert_eq!(kind, VoteKind::Downvote);
    }

    #[test]
    fn cast_vote_params_report_every_bad_field() {
        let params = CastVoteParams {
            target_id: "x".to_string(),
            target_type: "comment".to_string(),
            vote_type: "sideways".to_string(),
        };
        let err = params.validate().unwrap_err();
        assert_eq!(err.fields.len(), 3);
    }

    #[test]
    fn blank_answer_content_is_rejected() {
        let params = CreateAnswerParams {
            question_id: Uuid::new_v4().to_string(),
            content: "   ".to_string(),
        };
        let err = params.validate().unwrap_err();
        assert!(err.fields.contains_key("content"));
    }

    #[test]
    fn get_answers_defaults_sort_and_page() {
        let params = GetAnswersParams {
            question_id: Uuid::new_v4().to_string(),
            page: None,
            page_size: None,
            filter: Some("unknown".to_string()),
        };
        let request = params.validate(&PaginationConfig::default()).unwrap();
        assert_eq!(request.sort, AnswerSort::Latest);
        assert_eq!(request.page.page, 1);
    }

    #[test]
    fn saved_questions_params_build_text_filter_and_sort() {
        let params = SavedQuestionsParams {
            query: Some("  GoLang ".to_string()),
            filter: Some("mostanswers".to_string()),
            ..SavedQuestionsParams::default()
        };
        let request = params.validate(&PaginationConfig::default()).unwrap();
        assert_eq!(request.text.as_ref().map(|t| t.needle()), Some("GoLang"));
        assert_eq!(request.sort, SavedQuestionSort::MostAnswers);

        let blank = SavedQuestionsParams {
            query: Some("   ".to_string()),
            ..SavedQuestionsParams::default()
        };
        assert!(blank
            .validate(&PaginationConfig::default())
            .unwrap()
            .text
            .is_none());
    }

    #[test]
    fn question_params_require_title_content_and_tags() {
        let params = CreateQuestionParams {
            title: " ".to_string(),
            content: String::new(),
            tags: vec!["  ".to_string()],
        };
        let err = params.validate().unwrap_err();
        assert_eq!(err.fields.len(), 3);
    }
}
