use async_trait::async_trait;

use crate::{
    domain::session::{Session, User},
    infra::contracts::SessionStore,
};

use super::{contracts::SourceError, context::SessionContext};

const LOGIN_PERSIST_FAILED: &str = "LOGIN_PERSIST_FAILED";

#[derive(Clone, PartialEq, Eq)]
pub struct LoginCommand {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCommand")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
pub trait AuthSource: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<Session, SourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    MissingCredentials,
    InvalidCredentials,
    TemporarilyUnavailable,
    PersistFailed,
}

impl LoginError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "Enter both email and password.",
            Self::InvalidCredentials => "Invalid email or password.",
            Self::TemporarilyUnavailable => "The server is unavailable. Try again later.",
            Self::PersistFailed => "Logged in, but the session could not be saved.",
        }
    }
}

/// Authenticates, persists the session and makes it current.
pub async fn login(
    source: &dyn AuthSource,
    store: &dyn SessionStore,
    context: &mut SessionContext,
    command: LoginCommand,
) -> Result<User, LoginError> {
    let email = command.email.trim();
    if email.is_empty() || command.password.is_empty() {
        return Err(LoginError::MissingCredentials);
    }

    let session = source
        .login(email, &command.password)
        .await
        .map_err(map_source_error)?;

    if let Err(error) = store.save(&session) {
        tracing::error!(code = LOGIN_PERSIST_FAILED, error = %error, "session could not be persisted");
        return Err(LoginError::PersistFailed);
    }

    tracing::info!(
        user_id = session.user.id,
        role = session.user.role.as_label(),
        "login completed"
    );
    let user = session.user.clone();
    context.replace(session);
    Ok(user)
}

fn map_source_error(error: SourceError) -> LoginError {
    match error {
        SourceError::Unauthorized | SourceError::Forbidden => LoginError::InvalidCredentials,
        SourceError::Rejected(_) => LoginError::MissingCredentials,
        SourceError::NotFound | SourceError::Unavailable | SourceError::InvalidData => {
            LoginError::TemporarilyUnavailable
        }
    }
}
