//! Saved-questions view: pipeline assembly, count pass and page pass.
//!
//! # Invariants
//! - The count pass runs the same match/lookup/filter stages as the page
//!   pass, without sort or pagination.
//! - `has_next == total_count > skip + items.len()`.

use super::pipeline::{LookupSource, Pipeline, SavedQuestion, SavedQuestionSort, Stage, TextFilter};
use crate::model::user::UserId;
use crate::repo::RepoResult;
use crate::validation::PageRequest;
use serde::Serialize;

/// Typed input of the saved-questions view.
#[derive(Debug, Clone)]
pub struct SavedQuestionsQuery {
    pub owner: UserId,
    pub text: Option<TextFilter>,
    pub sort: SavedQuestionSort,
    pub page: PageRequest,
}

/// One page of the saved-questions view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedQuestionsPage {
    pub items: Vec<SavedQuestion>,
    pub total_count: u64,
    pub has_next: bool,
}

impl SavedQuestionsQuery {
    /// Match, join and text-filter stages shared by both passes.
    pub fn matching_pipeline(&self) -> Pipeline {
        let pipeline = Pipeline::collections_of(self.owner)
            .stage(Stage::LookupQuestion)
            .stage(Stage::LookupAuthor)
            .stage(Stage::LookupTags);
        match &self.text {
            Some(filter) => pipeline.stage(Stage::MatchText(filter.clone())),
            None => pipeline,
        }
    }

    /// Matching stages followed by sort, skip and limit.
    pub fn page_pipeline(&self) -> Pipeline {
        self.matching_pipeline()
            .stage(Stage::Sort(self.sort))
            .stage(Stage::Skip(self.page.skip()))
            .stage(Stage::Limit(u64::from(self.page.page_size)))
    }

    /// Runs the count pass and the page pass against `source`.
    pub fn run(&self, source: &impl LookupSource) -> RepoResult<SavedQuestionsPage> {
        let total_count = self.matching_pipeline().count(source)?;
        let items = self.page_pipeline().execute(source)?;
        let has_next = self.page.has_next(total_count, items.len());
        Ok(SavedQuestionsPage {
            items,
            total_count,
            has_next,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::SavedQuestionsQuery;
    use crate::query::pipeline::{SavedQuestionSort, Stage, TextFilter};
    use crate::validation::PageRequest;
    use uuid::Uuid;

    fn stage_names(stages: &[Stage]) -> Vec<&'static str> {
        stages.iter().map(Stage::name).collect()
    }

    #[test]
    fn count_pass_shares_matching_stages_without_sort_or_paging() {
        let query = SavedQuestionsQuery {
            owner: Uuid::new_v4(),
            text: TextFilter::new("rust").expect("literal needle"),
            sort: SavedQuestionSort::Oldest,
            page: PageRequest {
                page: 3,
                page_size: 20,
            },
        };

        let matching = query.matching_pipeline();
        assert_eq!(
            stage_names(matching.stages()),
            vec!["lookup_question", "lookup_author", "lookup_tags", "match_text"]
        );

        let page = query.page_pipeline();
        assert_eq!(
            stage_names(&page.stages()[..4]),
            stage_names(matching.stages())
        );
        assert!(matches!(
            &page.stages()[4..],
            [
                Stage::Sort(SavedQuestionSort::Oldest),
                Stage::Skip(40),
                Stage::Limit(20)
            ]
        ));
    }

    #[test]
    fn blank_text_adds_no_match_stage() {
        let query = SavedQuestionsQuery {
            owner: Uuid::new_v4(),
            text: TextFilter::new("   ").expect("blank needle"),
            sort: SavedQuestionSort::MostRecent,
            page: PageRequest {
                page: 1,
                page_size: 10,
            },
        };
        assert!(!stage_names(query.matching_pipeline().stages()).contains(&"match_text"));
    }
}
