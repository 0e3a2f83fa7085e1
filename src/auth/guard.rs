use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use std::sync::Arc;
use tracing::{error, info};

use crate::db::models::User;
use crate::db::store::{CredentialStore, SessionStore};
use crate::error::{AppError, AuthError, DatabaseError};
use crate::AppState;

/// Extracts the token from `Bearer <token>`. The scheme is matched
/// case-insensitively and the value must split into exactly two parts.
pub fn parse_bearer(authorization: &str) -> Option<&str> {
    let mut parts = authorization.split(' ');
    let scheme = parts.next()?;
    let token = parts.next()?;

    if parts.next().is_some() || !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}

/// Resolves bearer tokens to users for protected operations.
pub struct AccessGuard {
    credentials: Arc<dyn CredentialStore>,
    sessions: Arc<dyn SessionStore>,
}

impl AccessGuard {
    pub fn new(credentials: Arc<dyn CredentialStore>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { credentials, sessions }
    }

    /// Every failure, including storage errors, is reported as
    /// [`AuthError::InvalidToken`].
    pub async fn resolve(&self, authorization: Option<&str>) -> Result<User, AuthError> {
        let authorization = authorization.ok_or_else(|| {
            info!("Missing Authorization header");
            AuthError::InvalidToken
        })?;
        let token = parse_bearer(authorization).ok_or_else(|| {
            info!("Malformed Authorization header");
            AuthError::InvalidToken
        })?;

        let session = match self.sessions.get_session_by_token(token).await {
            Ok(session) => session,
            Err(DatabaseError::NotFound) => {
                info!("Unknown access token");
                return Err(AuthError::InvalidToken);
            }
            Err(e) => {
                error!("Failed to look up session: {}", e);
                return Err(AuthError::InvalidToken);
            }
        };

        match self.credentials.get_user_by_id(session.user_id).await {
            Ok(user) => Ok(user),
            Err(DatabaseError::NotFound) => {
                error!(session_id = session.id, "Session references missing user {}", session.user_id);
                Err(AuthError::InvalidToken)
            }
            Err(e) => {
                error!(session_id = session.id, "Failed to look up session user: {}", e);
                Err(AuthError::InvalidToken)
            }
        }
    }
}

/// The caller of a protected endpoint, resolved from its bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let authorization = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        Box::pin(async move {
            let state = state.ok_or_else(|| {
                AppError::InternalError("application state is not registered".to_string())
            })?;
            let user = state.guard.resolve(authorization.as_deref()).await?;
            Ok(AuthenticatedUser(user))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::InMemoryStore;
    use crate::db::models::Session;
    use crate::db::store::{MockCredentialStore, MockSessionStore};

    #[test]
    fn test_parse_bearer() {
        assert_eq!(parse_bearer("Bearer abc123"), Some("abc123"));
        assert_eq!(parse_bearer("bearer abc123"), Some("abc123"));
        assert_eq!(parse_bearer("BEARER abc123"), Some("abc123"));

        assert_eq!(parse_bearer(""), None);
        assert_eq!(parse_bearer("abc123"), None);
        assert_eq!(parse_bearer("Bearer"), None);
        assert_eq!(parse_bearer("Bearer "), None);
        assert_eq!(parse_bearer("Basic abc123"), None);
        assert_eq!(parse_bearer("Bearer abc 123"), None);
        assert_eq!(parse_bearer("Bearer  abc123"), None);
        assert_eq!(parse_bearer("Token abc123"), None);
    }

    async fn guard_with_session() -> (AccessGuard, User) {
        let store = Arc::new(InMemoryStore::new());
        let user = store.create_user("alice", "hash").await.unwrap();
        store.create_session(user.id, "known-token").await.unwrap();
        (AccessGuard::new(store.clone(), store), user)
    }

    #[tokio::test]
    async fn test_resolve_known_token() {
        let (guard, user) = guard_with_session().await;
        let resolved = guard.resolve(Some("Bearer known-token")).await.unwrap();
        assert_eq!(resolved, user);
    }

    #[tokio::test]
    async fn test_resolve_rejects_bad_headers() {
        let (guard, _) = guard_with_session().await;

        for header in [None, Some("known-token"), Some("Basic known-token"), Some("Bearer unknown")] {
            let err = guard.resolve(header).await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidToken), "header {:?}", header);
        }
    }

    #[tokio::test]
    async fn test_resolve_storage_failure_is_unauthorized() {
        let mut sessions = MockSessionStore::new();
        sessions
            .expect_get_session_by_token()
            .returning(|_| Err(DatabaseError::ConnectionError("pool closed".into())));

        let mut credentials = MockCredentialStore::new();
        credentials.expect_get_user_by_id().never();

        let guard = AccessGuard::new(Arc::new(credentials), Arc::new(sessions));
        let err = guard.resolve(Some("Bearer token")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_resolve_dangling_session() {
        let mut sessions = MockSessionStore::new();
        sessions.expect_get_session_by_token().returning(|token| {
            Ok(Session {
                id: 1,
                user_id: 99,
                access_token: token.to_string(),
            })
        });

        let mut credentials = MockCredentialStore::new();
        credentials
            .expect_get_user_by_id()
            .returning(|_| Err(DatabaseError::NotFound));

        let guard = AccessGuard::new(Arc::new(credentials), Arc::new(sessions));
        let err = guard.resolve(Some("Bearer token")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }
}
