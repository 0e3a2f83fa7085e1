use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::auth::password::{self, MAX_PASSWORD_BYTES};
use crate::auth::token::{self, TOKEN_LENGTH};
use crate::config::AuthConfig;
use crate::db::models::{Session, User};
use crate::db::store::{CredentialStore, SessionStore};
use crate::error::{AppError, AuthError, DatabaseError};
use crate::Result;

/// Outcome of a successful `authenticate`.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub user: User,
    pub session: Session,
}

impl IssuedSession {
    pub fn access_token(&self) -> &str {
        &self.session.access_token
    }
}

pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    sessions: Arc<dyn SessionStore>,
    config: AuthConfig,
    // Verified against when the name is unknown, so both rejection paths pay
    // for one bcrypt comparison.
    dummy_hash: String,
}

impl AuthService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionStore>,
        config: AuthConfig,
    ) -> Result<Self> {
        let dummy_hash = bcrypt::hash("postboard-dummy-password", config.bcrypt_cost)
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?;

        Ok(Self {
            credentials,
            sessions,
            config,
            dummy_hash,
        })
    }

    pub async fn register(&self, name: &str, password: &str) -> Result<User> {
        validate_credentials(name, password)?;

        let password_hash = password::hash_password(password, self.config.bcrypt_cost).await?;

        match self.credentials.create_user(name, &password_hash).await {
            Ok(user) => {
                info!(user_id = user.id, "Registered user {}", user.name);
                Ok(user)
            }
            Err(e) if e.is_uniqueness_violation() => {
                info!("Registration rejected, name {} is taken", name);
                Err(AuthError::NameTaken.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Verifies a name/password pair and issues a fresh session.
    ///
    /// Unknown names and wrong passwords both yield
    /// [`AuthError::InvalidCredentials`].
    pub async fn authenticate(&self, name: &str, password: &str) -> Result<IssuedSession> {
        let user = match self.credentials.get_user_by_name(name).await {
            Ok(user) => Some(user),
            Err(DatabaseError::NotFound) => None,
            Err(e) => return Err(e.into()),
        };

        let hash = user.as_ref().map_or(self.dummy_hash.as_str(), |u| u.password_hash.as_str());
        // bcrypt only reads the first 72 bytes, and registration never
        // stores a longer password, so longer input cannot match.
        let matches = password::verify_password(password, hash).await?
            && password.len() <= MAX_PASSWORD_BYTES;

        let user = match user {
            Some(user) if matches => user,
            _ => {
                warn!("Authentication failed for name {}", name);
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        let session = self.issue_session(&user).await?;
        info!(user_id = user.id, session_id = session.id, "Issued session for {}", user.name);

        Ok(IssuedSession { user, session })
    }

    // Uniqueness of the token is enforced by the store; a collision just
    // means drawing again.
    async fn issue_session(&self, user: &User) -> Result<Session> {
        let attempts = self.config.max_token_attempts;

        for attempt in 1..=attempts {
            let access_token = token::generate_token(TOKEN_LENGTH)?;

            match self.sessions.create_session(user.id, &access_token).await {
                Ok(session) => return Ok(session),
                Err(e) if e.is_uniqueness_violation() => {
                    debug!(attempt, "Access token collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        error!(user_id = user.id, attempts, "Gave up issuing a unique access token");
        Err(AuthError::TokenIssuanceExhausted { attempts }.into())
    }
}

fn validate_credentials(name: &str, password: &str) -> Result<()> {
    if name.is_empty() {
        return Err(AppError::ValidationError("name must not be empty".into()));
    }
    if password.is_empty() {
        return Err(AppError::ValidationError("password must not be empty".into()));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AppError::ValidationError(format!(
            "password must be at most {} bytes",
            MAX_PASSWORD_BYTES
        )));
    }
    Ok(())
}
