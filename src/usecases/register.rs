use async_trait::async_trait;

use crate::{
    domain::session::{Session, User, UserRole},
    infra::contracts::SessionStore,
};

use super::{contracts::SourceError, context::SessionContext};

const REGISTER_PERSIST_FAILED: &str = "REGISTER_PERSIST_FAILED";
const REGISTER_LOOKUP_FAILED: &str = "REGISTER_LOOKUP_FAILED";

const MIN_PASSWORD_LEN: usize = 6;
const MAX_SUGGESTIONS: usize = 5;

#[derive(Clone, PartialEq, Eq)]
pub struct RegisterCommand {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: UserRole,
    /// Study group; required for students.
    pub group: Option<String>,
    /// Name the teacher appears under in the schedule; required for teachers.
    pub teacher: Option<String>,
}

impl std::fmt::Debug for RegisterCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterCommand")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("full_name", &self.full_name)
            .field("role", &self.role)
            .field("group", &self.group)
            .field("teacher", &self.teacher)
            .finish()
    }
}

/// A validated sign-up form, as sent to `POST /register`.
#[derive(Clone, PartialEq, Eq)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: UserRole,
    pub group: Option<String>,
    pub teacher: Option<String>,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait RegistrationSource: Send + Sync {
    async fn register(&self, registration: &Registration) -> Result<Session, SourceError>;
    /// Group names known to the schedule (`GET /groups`).
    async fn known_groups(&self) -> Result<Vec<String>, SourceError>;
    /// Teacher names known to the schedule (`GET /teachers`).
    async fn known_teachers(&self) -> Result<Vec<String>, SourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    InvalidInput(&'static str),
    /// The group or teacher name matches nothing in the schedule.
    UnknownAffiliation { suggestions: Vec<String> },
    /// Refused by the backend, e.g. the email is already taken.
    Rejected(String),
    TemporarilyUnavailable,
    PersistFailed,
}

impl RegisterError {
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput(details) => (*details).to_owned(),
            Self::UnknownAffiliation { suggestions } if suggestions.is_empty() => {
                "No such group or teacher in the schedule.".to_owned()
            }
            Self::UnknownAffiliation { suggestions } => format!(
                "No such group or teacher in the schedule. Did you mean: {}?",
                suggestions.join(", ")
            ),
            Self::Rejected(details) => details.clone(),
            Self::TemporarilyUnavailable => "The server is unavailable. Try again later.".to_owned(),
            Self::PersistFailed => "Registered, but the session could not be saved.".to_owned(),
        }
    }
}

/// Choices offered for the affiliation field of `role`. Lookup failures are
/// logged and yield an empty list; registration can proceed without them.
pub async fn affiliation_options(source: &dyn RegistrationSource, role: UserRole) -> Vec<String> {
    let result = match role {
        UserRole::Student => source.known_groups().await,
        UserRole::Teacher => source.known_teachers().await,
        UserRole::Admin => return Vec::new(),
    };

    match result {
        Ok(mut options) => {
            options.retain(|option| !option.trim().is_empty());
            options.sort();
            options.dedup();
            options
        }
        Err(error) => {
            tracing::warn!(code = REGISTER_LOOKUP_FAILED, role = role.as_label(), error = ?error, "registration lookup failed");
            Vec::new()
        }
    }
}

/// Up to five options containing `text`, ignoring case.
pub fn suggest(options: &[String], text: &str) -> Vec<String> {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    options
        .iter()
        .filter(|option| option.to_lowercase().contains(&needle))
        .take(MAX_SUGGESTIONS)
        .cloned()
        .collect()
}

/// Creates the account, persists the returned session and makes it current.
pub async fn register(
    source: &dyn RegistrationSource,
    store: &dyn SessionStore,
    context: &mut SessionContext,
    command: RegisterCommand,
) -> Result<User, RegisterError> {
    let mut registration = validate(command)?;

    let options = affiliation_options(source, registration.role).await;
    let affiliation = match registration.role {
        UserRole::Student => registration.group.as_mut(),
        _ => registration.teacher.as_mut(),
    };
    if let Some(value) = affiliation {
        *value = canonical_affiliation(&options, value)?;
    }

    let session = source
        .register(&registration)
        .await
        .map_err(map_source_error)?;

    if let Err(error) = store.save(&session) {
        tracing::error!(code = REGISTER_PERSIST_FAILED, error = %error, "session could not be persisted");
        return Err(RegisterError::PersistFailed);
    }

    tracing::info!(
        user_id = session.user.id,
        role = session.user.role.as_label(),
        "registration completed"
    );
    let user = session.user.clone();
    context.replace(session);
    Ok(user)
}

fn validate(command: RegisterCommand) -> Result<Registration, RegisterError> {
    let email = command.email.trim();
    if email.is_empty() {
        return Err(RegisterError::InvalidInput("Enter an email address."));
    }
    if !looks_like_email(email) {
        return Err(RegisterError::InvalidInput("The email address is not valid."));
    }
    if command.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(RegisterError::InvalidInput(
            "The password must be at least 6 characters long.",
        ));
    }

    let full_name = command.full_name.split_whitespace().collect::<Vec<_>>();
    if full_name.len() < 2 {
        return Err(RegisterError::InvalidInput("Enter your full name."));
    }

    let group = non_blank(command.group);
    let teacher = non_blank(command.teacher);
    let (group, teacher) = match command.role {
        UserRole::Student => match group {
            Some(group) => (Some(group), None),
            None => return Err(RegisterError::InvalidInput("Students must enter a group.")),
        },
        UserRole::Teacher => match teacher {
            Some(teacher) => (None, Some(teacher)),
            None => {
                return Err(RegisterError::InvalidInput(
                    "Teachers must choose their name from the schedule.",
                ))
            }
        },
        UserRole::Admin => {
            return Err(RegisterError::InvalidInput(
                "Only students and teachers can register.",
            ))
        }
    };

    Ok(Registration {
        email: email.to_owned(),
        password: command.password,
        full_name: full_name.join(" "),
        role: command.role,
        group,
        teacher,
    })
}

/// The schedule's spelling of `value`. With no known options the value is
/// accepted as typed.
fn canonical_affiliation(options: &[String], value: &str) -> Result<String, RegisterError> {
    if options.is_empty() {
        return Ok(value.to_owned());
    }

    options
        .iter()
        .find(|option| option.to_lowercase() == value.to_lowercase())
        .cloned()
        .ok_or_else(|| RegisterError::UnknownAffiliation {
            suggestions: suggest(options, value),
        })
}

fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .rsplit_once('.')
        .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn map_source_error(error: SourceError) -> RegisterError {
    match error {
        SourceError::Rejected(details) => RegisterError::Rejected(details),
        SourceError::Unauthorized
        | SourceError::Forbidden
        | SourceError::NotFound
        | SourceError::Unavailable
        | SourceError::InvalidData => RegisterError::TemporarilyUnavailable,
    }
}
