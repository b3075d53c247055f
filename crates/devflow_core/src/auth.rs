//! Actor resolution for mutating and per-user operations.
//!
//! # Responsibility
//! - Resolve the acting user of a request or reject it as unauthorized.
//!
//! # Invariants
//! - Authorization always runs before any store access of an operation.
//! - A missing session is `Unauthorized`, never `NotFound`.

use crate::error::{CoreError, CoreResult};
use crate::model::user::UserId;

/// Per-request caller context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestContext {
    session_user: Option<UserId>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user_id: UserId) -> Self {
        Self {
            session_user: Some(user_id),
        }
    }

    pub fn session_user(&self) -> Option<UserId> {
        self.session_user
    }
}

/// Resolves the acting user id of a request.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, request: &RequestContext) -> CoreResult<UserId>;
}

/// Trusts the session attached to the request context.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionAuthorizer;

impl Authorizer for SessionAuthorizer {
    fn authorize(&self, request: &RequestContext) -> CoreResult<UserId> {
        request
            .session_user()
            .ok_or_else(|| CoreError::Unauthorized("no active session".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{Authorizer, RequestContext, SessionAuthorizer};
    use crate::error::CoreError;
    use uuid::Uuid;

    #[test]
    fn session_authorizer_returns_session_user() {
        let user_id = Uuid::new_v4();
        let resolved = SessionAuthorizer
            .authorize(&RequestContext::authenticated(user_id))
            .unwrap();
        assert_eq!(resolved, user_id);
    }

    #[test]
    fn anonymous_request_is_unauthorized() {
        let err = SessionAuthorizer
            .authorize(&RequestContext::anonymous())
            .unwrap_err();
        assert!(matches!(err, CoreError::Unauthorized(_)));
    }
}
