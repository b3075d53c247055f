mod common;

use common::as_user;
use devflow_core::model::vote::{CounterField, VoteKind, VoteTarget};
use devflow_core::{AnswerService, Invalidation, ReconcileService, VoteService};

#[test]
fn audit_reports_drift_without_writing() {
    let mut fx = common::fixture();
    let author = fx.user("author");
    let question = fx.question(&author, "Q", "body");
    fx.conn
        .execute(
            "UPDATE questions SET upvotes = 7 WHERE id = ?1;",
            [question.id.to_string()],
        )
        .unwrap();

    let report = ReconcileService::new(fx.ctx.clone())
        .audit_counters(&fx.conn)
        .unwrap();

    assert!(!report.applied);
    assert_eq!(report.corrections.len(), 1);
    let drift = &report.corrections[0];
    assert_eq!(drift.target, VoteTarget::Question(question.id));
    assert_eq!(drift.field, CounterField::Upvotes);
    assert_eq!((drift.cached, drift.actual), (7, 0));
    assert_eq!(fx.question_counters(question.id).1, 7);
}

#[test]
fn reconcile_rewrites_counters_from_records() {
    let mut fx = common::fixture();
    let author = fx.user("author");
    let voter = fx.user("voter");
    let question = fx.question(&author, "Q", "body");
    let answer = AnswerService::new(fx.ctx.clone())
        .create_answer(&mut fx.conn, &as_user(&author), question.id, "answer")
        .unwrap();
    VoteService::new(fx.ctx.clone())
        .cast_vote(
            &mut fx.conn,
            &as_user(&voter),
            VoteTarget::Answer(answer.id),
            VoteKind::Downvote,
        )
        .unwrap();
    fx.conn
        .execute_batch(&format!(
            "UPDATE questions SET answers = 0 WHERE id = '{q}';
             UPDATE answers SET downvotes = 3 WHERE id = '{a}';",
            q = question.id,
            a = answer.id
        ))
        .unwrap();
    fx.sink.take();

    let service = ReconcileService::new(fx.ctx.clone());
    let report = service.reconcile_counters(&mut fx.conn).unwrap();

    assert!(report.applied);
    assert_eq!(report.corrections.len(), 2);
    assert_eq!(fx.question_counters(question.id).0, 1);
    let downvotes: i64 = fx
        .conn
        .query_row(
            "SELECT downvotes FROM answers WHERE id = ?1;",
            [answer.id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(downvotes, 1);
    assert_eq!(fx.sink.take(), vec![Invalidation::QuestionPage(question.id)]);

    assert!(service.audit_counters(&fx.conn).unwrap().is_clean());
}
