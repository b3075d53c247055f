use devflow_core::config::StoreConfig;
use devflow_core::model::user::User;
use devflow_core::model::vote::{VoteKind, VoteTarget};
use devflow_core::repo::vote_repo::{SqliteVoteRepository, VoteRepository};
use devflow_core::validation::QuestionDraft;
use devflow_core::{
    NoopInvalidationSink, QuestionService, RequestContext, ServiceContext, SessionAuthorizer,
    Store, TxPolicy, VoteService,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const VOTERS: usize = 8;

fn context() -> ServiceContext {
    ServiceContext::new(Arc::new(SessionAuthorizer), Arc::new(NoopInvalidationSink)).with_tx_policy(
        TxPolicy {
            max_attempts: 20,
            base_backoff: Duration::from_millis(5),
            timeout: Duration::from_secs(5),
        },
    )
}

#[test]
fn concurrent_votes_on_one_target_are_all_counted() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(&StoreConfig {
        path: Some(dir.path().join("concurrency.db")),
        ..StoreConfig::default()
    })
    .unwrap();
    let ctx = context();

    let mut conn = store.connect().unwrap();
    let authoring = QuestionService::new(ctx.clone());
    let asker = authoring.create_user(&conn, "asker", None).unwrap();
    let question = authoring
        .create_question(
            &mut conn,
            &RequestContext::authenticated(asker.id),
            &QuestionDraft {
                title: "Hot question".to_string(),
                content: "Everyone votes".to_string(),
                tags: vec!["sqlite".to_string()],
            },
        )
        .unwrap();
    let voters: Vec<User> = (0..VOTERS)
        .map(|index| {
            authoring
                .create_user(&conn, &format!("voter-{index}"), None)
                .unwrap()
        })
        .collect();
    drop(conn);

    let handles: Vec<_> = voters
        .into_iter()
        .map(|voter| {
            let store = store.clone();
            let ctx = ctx.clone();
            let target = VoteTarget::Question(question.id);
            thread::spawn(move || {
                let mut conn = store.connect().unwrap();
                VoteService::new(ctx)
                    .cast_vote(
                        &mut conn,
                        &RequestContext::authenticated(voter.id),
                        target,
                        VoteKind::Upvote,
                    )
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let conn = store.connect().unwrap();
    let upvotes: i64 = conn
        .query_row(
            "SELECT upvotes FROM questions WHERE id = ?1;",
            [question.id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(upvotes, VOTERS as i64);
    drop(conn);
    store.close().unwrap();
}

#[test]
fn one_voter_racing_mixed_votes_keeps_at_most_one_record() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(&StoreConfig {
        path: Some(dir.path().join("same-voter.db")),
        ..StoreConfig::default()
    })
    .unwrap();
    let ctx = context();

    let mut conn = store.connect().unwrap();
    let authoring = QuestionService::new(ctx.clone());
    let voter = authoring.create_user(&conn, "fidget", None).unwrap();
    let question = authoring
        .create_question(
            &mut conn,
            &RequestContext::authenticated(voter.id),
            &QuestionDraft {
                title: "Clicked a lot".to_string(),
                content: "Same voter, many threads".to_string(),
                tags: vec!["sqlite".to_string()],
            },
        )
        .unwrap();
    drop(conn);
    let voter_id = voter.id;
    let target = VoteTarget::Question(question.id);

    let handles: Vec<_> = (0..=VOTERS)
        .map(|index| {
            let store = store.clone();
            let ctx = ctx.clone();
            let kind = if index % 2 == 0 {
                VoteKind::Upvote
            } else {
                VoteKind::Downvote
            };
            thread::spawn(move || {
                let mut conn = store.connect().unwrap();
                VoteService::new(ctx)
                    .cast_vote(
                        &mut conn,
                        &RequestContext::authenticated(voter_id),
                        target,
                        kind,
                    )
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let conn = store.connect().unwrap();
    let (upvotes, downvotes): (i64, i64) = conn
        .query_row(
            "SELECT upvotes, downvotes FROM questions WHERE id = ?1;",
            [question.id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    let records = SqliteVoteRepository::new(&conn)
        .count_votes_for_target(target)
        .unwrap();
    assert!(records <= 1, "one voter holds at most one vote, got {records}");
    assert!(upvotes >= 0 && downvotes >= 0);
    assert_eq!((upvotes + downvotes) as u64, records);
    drop(conn);
    store.close().unwrap();
}
