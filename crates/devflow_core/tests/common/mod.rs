#![allow(dead_code)]

use devflow_core::db::open_db_in_memory;
use devflow_core::model::user::User;
use devflow_core::query::pipeline::QuestionView;
use devflow_core::validation::QuestionDraft;
use devflow_core::{
    QuestionService, RecordingInvalidationSink, RequestContext, ServiceContext,
    SessionAuthorizer,
};
use rusqlite::Connection;
use std::sync::Arc;

pub struct Fixture {
    pub conn: Connection,
    pub sink: Arc<RecordingInvalidationSink>,
    pub ctx: ServiceContext,
}

pub fn fixture() -> Fixture {
    let sink = Arc::new(RecordingInvalidationSink::new());
    let ctx = ServiceContext::new(Arc::new(SessionAuthorizer), sink.clone());
    Fixture {
        conn: open_db_in_memory().unwrap(),
        sink,
        ctx,
    }
}

pub fn as_user(user: &User) -> RequestContext {
    RequestContext::authenticated(user.id)
}

impl Fixture {
    pub fn user(&self, name: &str) -> User {
        QuestionService::new(self.ctx.clone())
            .create_user(&self.conn, name, None)
            .unwrap()
    }

    pub fn question(&mut self, author: &User, title: &str, content: &str) -> QuestionView {
        self.tagged_question(author, title, content, &["general"])
    }

    pub fn tagged_question(
        &mut self,
        author: &User,
        title: &str,
        content: &str,
        tags: &[&str],
    ) -> QuestionView {
        let draft = QuestionDraft {
            title: title.to_string(),
            content: content.to_string(),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
        };
        QuestionService::new(self.ctx.clone())
            .create_question(&mut self.conn, &as_user(author), &draft)
            .unwrap()
    }

    pub fn set_created_at(&self, table: &str, id: uuid::Uuid, created_at: i64) {
        self.conn
            .execute(
                &format!("UPDATE {table} SET created_at = ?1 WHERE id = ?2;"),
                rusqlite::params![created_at, id.to_string()],
            )
            .unwrap();
    }

    pub fn question_counters(&self, id: uuid::Uuid) -> (i64, i64, i64, i64) {
        self.conn
            .query_row(
                "SELECT answers, upvotes, downvotes, views FROM questions WHERE id = ?1;",
                [id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .unwrap()
    }
}
