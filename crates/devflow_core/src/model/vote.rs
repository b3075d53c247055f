//! Vote records, vote targets and the per-(voter, target) state machine.
//!
//! # Responsibility
//! - Describe what can be voted on as a typed union instead of a runtime
//!   model lookup.
//! - Define the pure transition function the vote engine executes.
//!
//! # Invariants
//! - At most one vote exists per `(voter, target)`.
//! - Every transition's counter deltas net to the change in vote records.

use super::answer::{Answer, AnswerId};
use super::question::{Question, QuestionId};
use super::user::UserId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type VoteId = Uuid;

/// Direction of a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteKind {
    Upvote,
    Downvote,
}

impl VoteKind {
    /// Counter cached on the target for this vote direction.
    pub fn counter_field(self) -> CounterField {
        match self {
            Self::Upvote => CounterField::Upvotes,
            Self::Downvote => CounterField::Downvotes,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upvote => "upvote",
            Self::Downvote => "downvote",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "upvote" => Some(Self::Upvote),
            "downvote" => Some(Self::Downvote),
            _ => None,
        }
    }
}

/// Discriminant of a vote target as persisted in `votes.target_kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Question,
    Answer,
}

impl TargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Question => "question",
            Self::Answer => "answer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "question" => Some(Self::Question),
            "answer" => Some(Self::Answer),
            _ => None,
        }
    }
}

/// Entities that carry cached `upvotes`/`downvotes` columns.
pub trait HasVoteCounters {
    /// Persisted discriminant for votes on this entity.
    const TARGET_KIND: TargetKind;
    /// Table holding the entity and its counter columns.
    const TABLE: &'static str;
}

impl HasVoteCounters for Question {
    const TARGET_KIND: TargetKind = TargetKind::Question;
    const TABLE: &'static str = "questions";
}

impl HasVoteCounters for Answer {
    const TARGET_KIND: TargetKind = TargetKind::Answer;
    const TABLE: &'static str = "answers";
}

/// Typed reference to a question or answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum VoteTarget {
    Question(QuestionId),
    Answer(AnswerId),
}

impl VoteTarget {
    pub fn id(self) -> Uuid {
        match self {
            Self::Question(id) | Self::Answer(id) => id,
        }
    }

    pub fn kind(self) -> TargetKind {
        match self {
            Self::Question(_) => <Question as HasVoteCounters>::TARGET_KIND,
            Self::Answer(_) => <Answer as HasVoteCounters>::TARGET_KIND,
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            Self::Question(_) => <Question as HasVoteCounters>::TABLE,
            Self::Answer(_) => <Answer as HasVoteCounters>::TABLE,
        }
    }

    /// Whether `field` exists on this target's entity.
    pub fn supports(self, field: CounterField) -> bool {
        match self {
            Self::Question(_) => true,
            Self::Answer(_) => matches!(field, CounterField::Upvotes | CounterField::Downvotes),
        }
    }

    pub fn from_parts(kind: TargetKind, id: Uuid) -> Self {
        match kind {
            TargetKind::Question => Self::Question(id),
            TargetKind::Answer => Self::Answer(id),
        }
    }
}

impl Display for VoteTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind().as_str(), self.id())
    }
}

/// Denormalized counter columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterField {
    Upvotes,
    Downvotes,
    /// Question only.
    Answers,
    /// Question only.
    Views,
}

impl CounterField {
    /// Column name. Only ever one of these literals, so safe to splice into SQL.
    pub fn column(self) -> &'static str {
        match self {
            Self::Upvotes => "upvotes",
            Self::Downvotes => "downvotes",
            Self::Answers => "answers",
            Self::Views => "views",
        }
    }
}

/// Durable record of one user's vote on one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub voter_id: UserId,
    pub target: VoteTarget,
    pub kind: VoteKind,
    pub created_at: i64,
}

impl Vote {
    pub fn new(voter_id: UserId, target: VoteTarget, kind: VoteKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            voter_id,
            target,
            kind,
            created_at: super::now_epoch_ms(),
        }
    }
}

/// State of one `(voter, target)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteState {
    NoVote,
    Voted(VoteKind),
}

impl VoteState {
    pub fn from_vote(vote: Option<&Vote>) -> Self {
        vote.map_or(Self::NoVote, |vote| Self::Voted(vote.kind))
    }

    /// Computes the transition for a `castVote(requested)` call.
    pub fn transition(self, requested: VoteKind) -> VoteTransition {
        match self {
            Self::NoVote => VoteTransition::Cast(requested),
            Self::Voted(current) if current == requested => VoteTransition::Retract(current),
            Self::Voted(current) => VoteTransition::Switch {
                from: current,
                to: requested,
            },
        }
    }
}

/// One edge of the vote state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteTransition {
    /// `NoVote -> Voted(k)`.
    Cast(VoteKind),
    /// `Voted(k) -> NoVote` when `k` is requested again.
    Retract(VoteKind),
    /// `Voted(from) -> Voted(to)`.
    Switch { from: VoteKind, to: VoteKind },
}

impl VoteTransition {
    /// Counter deltas in application order.
    pub fn counter_deltas(self) -> Vec<(CounterField, i64)> {
        match self {
            Self::Cast(kind) => vec![(kind.counter_field(), 1)],
            Self::Retract(kind) => vec![(kind.counter_field(), -1)],
            Self::Switch { from, to } => {
                vec![(from.counter_field(), -1), (to.counter_field(), 1)]
            }
        }
    }

    pub fn resulting_state(self) -> VoteState {
        match self {
            Self::Cast(kind) => VoteState::Voted(kind),
            Self::Retract(_) => VoteState::NoVote,
            Self::Switch { to, .. } => VoteState::Voted(to),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Cast(_) => "cast",
            Self::Retract(_) => "retract",
            Self::Switch { .. } => "switch",
        }
    }
}

/// Read-side view of a voter's state on a target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteStatus {
    pub has_upvoted: bool,
    pub has_downvoted: bool,
}

impl From<VoteState> for VoteStatus {
    fn from(value: VoteState) -> Self {
        match value {
            VoteState::NoVote => Self::default(),
            VoteState::Voted(VoteKind::Upvote) => Self {
                has_upvoted: true,
                has_downvoted: false,
            },
            VoteState::Voted(VoteKind::Downvote) => Self {
                has_upvoted: false,
                has_downvoted: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CounterField, VoteKind, VoteState, VoteStatus, VoteTarget, VoteTransition};
    use uuid::Uuid;

    #[test]
    fn repeating_the_same_kind_retracts_and_nets_to_zero() {
        let cast = VoteState::NoVote.transition(VoteKind::Upvote);
        let retract = cast.resulting_state().transition(VoteKind::Upvote);
        assert_eq!(retract, VoteTransition::Retract(VoteKind::Upvote));
        assert_eq!(retract.resulting_state(), VoteState::NoVote);

        let net: i64 = cast
            .counter_deltas()
            .into_iter()
            .chain(retract.counter_deltas())
            .map(|(_, delta)| delta)
            .sum();
        assert_eq!(net, 0);
    }

    #[test]
    fn switching_decrements_old_counter_before_incrementing_new() {
        let switch = VoteState::Voted(VoteKind::Upvote).transition(VoteKind::Downvote);
        assert_eq!(
            switch.counter_deltas(),
            vec![(CounterField::Upvotes, -1), (CounterField::Downvotes, 1)]
        );
        assert_eq!(
            VoteStatus::from(switch.resulting_state()),
            VoteStatus {
                has_upvoted: false,
                has_downvoted: true
            }
        );
    }

    #[test]
    fn answers_only_support_vote_counters() {
        let answer = VoteTarget::Answer(Uuid::new_v4());
        assert!(answer.supports(CounterField::Upvotes));
        assert!(!answer.supports(CounterField::Answers));
        assert!(!answer.supports(CounterField::Views));
        assert_eq!(answer.table(), "answers");
        assert!(VoteTarget::Question(Uuid::new_v4()).supports(CounterField::Views));
    }
}
