use crate::infra::{contracts::SessionStore, error::AppError};

use super::context::SessionContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutOutcome {
    pub session_removed: bool,
}

/// Removes the persisted session and clears the in-memory one. Cached
/// snapshots stay on disk.
pub fn logout(
    store: &dyn SessionStore,
    context: &mut SessionContext,
) -> Result<LogoutOutcome, AppError> {
    let session_removed = store.clear()?;
    let had_context = context.teardown().is_some();

    tracing::info!(session_removed, had_context, "logout completed");

    Ok(LogoutOutcome { session_removed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::session::{Session, User, UserRole},
        infra::stubs::MemorySessionStore,
    };

    fn session() -> Session {
        Session {
            token: "t".to_owned(),
            user: User {
                id: 1,
                email: "a@uni.edu".to_owned(),
                full_name: "A".to_owned(),
                role: UserRole::Admin,
                group: None,
                teacher: None,
            },
        }
    }

    #[test]
    fn logout_removes_session_and_context() {
        let store = MemorySessionStore::with_session(session());
        let mut context = SessionContext::default();
        context.replace(session());

        let outcome = logout(&store, &mut context).expect("logout should succeed");

        assert!(outcome.session_removed);
        assert_eq!(store.stored(), None);
        assert_eq!(context.current(), None);
    }

    #[test]
    fn logout_is_idempotent_when_nothing_is_stored() {
        let store = MemorySessionStore::default();
        let mut context = SessionContext::default();

        let outcome = logout(&store, &mut context).expect("logout should succeed");

        assert!(!outcome.session_removed);
    }
}
