mod common;

use devflow_core::model::vote::{CounterField, VoteTarget};
use devflow_core::repo::counter_repo::{CounterSnapshot, CounterStore, SqliteCounterStore};
use devflow_core::{QuestionService, RepoError};
use uuid::Uuid;

#[test]
fn adjust_counter_applies_signed_deltas_and_returns_snapshot() {
    let mut fx = common::fixture();
    let author = fx.user("ada");
    let question = fx.question(&author, "How do lifetimes work?", "Explain please");
    let target = VoteTarget::Question(question.id);
    let store = SqliteCounterStore::new(&fx.conn);

    store.adjust_counter(target, CounterField::Upvotes, 1).unwrap();
    store.adjust_counter(target, CounterField::Upvotes, 1).unwrap();
    let snapshot = store
        .adjust_counter(target, CounterField::Upvotes, -1)
        .unwrap();

    assert_eq!(snapshot.upvotes(), 1);
    assert_eq!(snapshot.downvotes(), 0);
    assert_eq!(snapshot.page_question_id(), question.id);
}

#[test]
fn adjust_counter_does_not_clamp_at_zero() {
    let mut fx = common::fixture();
    let author = fx.user("ada");
    let question = fx.question(&author, "Negative?", "Counters are not clamped");
    let store = SqliteCounterStore::new(&fx.conn);

    let snapshot = store
        .adjust_counter(VoteTarget::Question(question.id), CounterField::Downvotes, -1)
        .unwrap();
    assert_eq!(snapshot.downvotes(), -1);
}

#[test]
fn adjust_counter_on_missing_entity_is_not_found() {
    let fx = common::fixture();
    let store = SqliteCounterStore::new(&fx.conn);

    let err = store
        .adjust_counter(VoteTarget::Answer(Uuid::new_v4()), CounterField::Upvotes, 1)
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "answer", .. }));
}

#[test]
fn answers_reject_question_only_counters() {
    let fx = common::fixture();
    let store = SqliteCounterStore::new(&fx.conn);

    let err = store
        .adjust_counter(VoteTarget::Answer(Uuid::new_v4()), CounterField::Views, 1)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::InvalidCounter {
            entity: "answer",
            field: "views"
        }
    ));
}

#[test]
fn record_view_increments_views_through_counter_store() {
    let mut fx = common::fixture();
    let author = fx.user("ada");
    let question = fx.question(&author, "Views", "Count me");
    let service = QuestionService::new(fx.ctx.clone());

    assert_eq!(service.record_view(&fx.conn, question.id).unwrap(), 1);
    assert_eq!(service.record_view(&fx.conn, question.id).unwrap(), 2);

    let snapshot = SqliteCounterStore::new(&fx.conn)
        .read_counters(VoteTarget::Question(question.id))
        .unwrap()
        .unwrap();
    assert!(matches!(snapshot, CounterSnapshot::Question { views: 2, .. }));
}

#[test]
fn read_counters_returns_none_for_missing_entity() {
    let fx = common::fixture();
    let snapshot = SqliteCounterStore::new(&fx.conn)
        .read_counters(VoteTarget::Question(Uuid::new_v4()))
        .unwrap();
    assert!(snapshot.is_none());
}
