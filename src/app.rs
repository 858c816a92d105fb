use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDate};
use tokio::{io::AsyncBufRead, sync::mpsc};

use crate::{
    api::ApiClient,
    cli::{Cli, Command, NewChatKind, RegisterRole},
    domain::{
        chat_list_state::ChatListState,
        session::{User, UserRole},
    },
    ui::{
        self,
        terminal::{StdTerminal, Terminal},
    },
    usecases::{
        bootstrap::{self, Bootstrapped},
        chat_screen::ChatScreen,
        chat_sync::SyncSettings,
        context::AppContext,
        create_chat::{create_chat, CreateChatCommand},
        list_chats::{list_chats, ListChatsError},
        list_contacts::{list_contacts, ListContactsError},
        load_profile::{load_profile, session_profile, LoadProfileError},
        load_schedule::{load_schedule, LoadScheduleError},
        login::{login, LoginCommand},
        logout::logout,
        offline_cache::Cached,
        register::{affiliation_options, register, RegisterCommand},
        send_message::{send_message, SendMessageCommand},
    },
};

const LOGIN_REQUIRED: &str = "Not logged in. Run `campus login --email <address>` first.";
const CHATS_OFFLINE: &str = "CHATS_OFFLINE";
const SCHEDULE_OFFLINE: &str = "SCHEDULE_OFFLINE";
const PROFILE_OFFLINE: &str = "PROFILE_OFFLINE";
const CONTACTS_OFFLINE: &str = "CONTACTS_OFFLINE";
const SHOWN_OPTIONS: usize = 20;

pub async fn run(cli: Cli) -> Result<()> {
    let Bootstrapped {
        mut context,
        log_guard: _log_guard,
    } = bootstrap::bootstrap(cli.config.as_deref())?;
    let mut terminal = StdTerminal;

    dispatch(cli.command_or_default(), &mut context, &mut terminal).await
}

async fn dispatch(
    command: Command,
    context: &mut AppContext,
    terminal: &mut dyn Terminal,
) -> Result<()> {
    match command {
        Command::Login { email } => run_login(context, terminal, email).await,
        Command::Register {
            email,
            name,
            role,
            group,
            teacher,
        } => {
            let form = RegisterForm {
                email,
                name,
                role,
                group,
                teacher,
            };
            run_register(context, terminal, form).await
        }
        Command::Profile => show_profile(context, terminal).await,
        Command::Contacts => show_contacts(context, terminal).await,
        Command::Logout => {
            let outcome = logout(context.sessions.as_ref(), &mut context.session)?;
            if outcome.session_removed {
                terminal.print_line("Logged out.")?;
            } else {
                terminal.print_line("No saved session; nothing to do.")?;
            }
            Ok(())
        }
        Command::Chats => show_chats(context, terminal).await,
        Command::Open { chat_id } => {
            let input = tokio::io::BufReader::new(tokio::io::stdin());
            open_chat(context, chat_id, input, terminal).await
        }
        Command::Send { chat_id, text } => {
            let client = api_client(context)?;
            let command = SendMessageCommand {
                chat_id,
                text: text.join(" "),
            };
            match send_message(&client, command).await {
                Ok(message) => {
                    terminal.print_line(&format!("Sent message {} to chat {chat_id}.", message.id))?;
                    Ok(())
                }
                Err(error) => bail!(error.user_message()),
            }
        }
        Command::Schedule { date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            show_schedule(context, terminal, date).await
        }
        Command::NewChat { kind } => {
            let client = api_client(context)?;
            let command = match kind {
                NewChatKind::Private { user_id } => CreateChatCommand::Private { user_id },
                NewChatKind::Group { group_id, name } => CreateChatCommand::Group { group_id, name },
            };
            let chat = create_chat(&client, command)
                .await
                .map_err(|error| anyhow!(error.user_message()))?;
            terminal.print_line(&format!(
                "Created chat {} \"{}\". Open it with `campus open {}`.",
                chat.id,
                chat.list_title(),
                chat.id
            ))?;
            Ok(())
        }
    }
}

async fn run_login(
    context: &mut AppContext,
    terminal: &mut dyn Terminal,
    email: Option<String>,
) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => terminal
            .prompt_line("Email: ")?
            .ok_or_else(|| anyhow!("login cancelled"))?,
    };
    let password = terminal
        .prompt_secret("Password: ")?
        .ok_or_else(|| anyhow!("login cancelled"))?;

    let client = ApiClient::new(&context.config.api, None)?;
    let user = login(
        &client,
        context.sessions.as_ref(),
        &mut context.session,
        LoginCommand { email, password },
    )
    .await
    .map_err(|error| anyhow!(error.user_message()))?;

    terminal.print_line(&format!(
        "Logged in as {} ({}).",
        user.full_name,
        user.role.as_label()
    ))?;
    Ok(())
}

/// Register flags as typed; missing values are prompted for.
struct RegisterForm {
    email: Option<String>,
    name: Option<String>,
    role: RegisterRole,
    group: Option<String>,
    teacher: Option<String>,
}

async fn run_register(
    context: &mut AppContext,
    terminal: &mut dyn Terminal,
    form: RegisterForm,
) -> Result<()> {
    let client = ApiClient::new(&context.config.api, None)?;
    let role = UserRole::from(form.role);

    let email = prompt_unless_given(terminal, form.email, "Email: ")?;
    let full_name = prompt_unless_given(terminal, form.name, "Full name: ")?;
    let given = match role {
        UserRole::Student => form.group,
        _ => form.teacher,
    };
    let affiliation = match given {
        Some(value) => value,
        None => {
            let (label, prompt) = match role {
                UserRole::Student => ("Groups", "Group: "),
                _ => ("Teachers in the schedule", "Your name in the schedule: "),
            };
            let options = affiliation_options(&client, role).await;
            if !options.is_empty() {
                let shown = options.iter().take(SHOWN_OPTIONS).cloned().collect::<Vec<_>>();
                let more = options.len().saturating_sub(shown.len());
                let suffix = if more > 0 { format!(" and {more} more") } else { String::new() };
                terminal.print_line(&format!("{label}: {}{suffix}", shown.join(", ")))?;
            }
            prompt_unless_given(terminal, None, prompt)?
        }
    };
    let password = terminal
        .prompt_secret("Password (at least 6 characters): ")?
        .ok_or_else(|| anyhow!("registration cancelled"))?;

    let (group, teacher) = match role {
        UserRole::Student => (Some(affiliation), None),
        _ => (None, Some(affiliation)),
    };
    let command = RegisterCommand {
        email,
        password,
        full_name,
        role,
        group,
        teacher,
    };
    let user = register(&client, context.sessions.as_ref(), &mut context.session, command)
        .await
        .map_err(|error| anyhow!(error.user_message()))?;

    terminal.print_line(&format!(
        "Registered and logged in as {} ({}).",
        user.full_name,
        user.role.as_label()
    ))?;
    Ok(())
}

fn prompt_unless_given(
    terminal: &mut dyn Terminal,
    given: Option<String>,
    prompt: &str,
) -> Result<String> {
    match given {
        Some(value) => Ok(value),
        None => terminal
            .prompt_line(prompt)?
            .ok_or_else(|| anyhow!("registration cancelled")),
    }
}

async fn show_profile(context: &AppContext, terminal: &mut dyn Terminal) -> Result<()> {
    let viewer = current_user(context)?.clone();
    let client = api_client(context)?;

    let (profile, offline) = match load_profile(&client, context.snapshots.as_ref()).await {
        Cached::Fresh(profile) => (profile, false),
        Cached::Offline { value, reason } => {
            warn_offline(PROFILE_OFFLINE, &reason);
            login_hint(terminal, reason == LoadProfileError::Unauthorized)?;
            (value, true)
        }
        Cached::Unavailable { reason } => {
            warn_offline(PROFILE_OFFLINE, &reason);
            login_hint(terminal, reason == LoadProfileError::Unauthorized)?;
            terminal.print_line(reason.user_message())?;
            (session_profile(&viewer), true)
        }
    };

    terminal.print_lines(&ui::profile_view::render_profile(&profile, offline))?;
    Ok(())
}

async fn show_contacts(context: &AppContext, terminal: &mut dyn Terminal) -> Result<()> {
    let viewer = current_user(context)?.clone();
    let client = api_client(context)?;

    let (contacts, offline) =
        match list_contacts(&client, context.snapshots.as_ref(), &viewer).await {
            Cached::Fresh(contacts) => (contacts, false),
            Cached::Offline { value, reason } => {
                warn_offline(CONTACTS_OFFLINE, &reason);
                login_hint(terminal, reason == ListContactsError::Unauthorized)?;
                (value, true)
            }
            Cached::Unavailable {
                reason: ListContactsError::NotSupported,
            } => {
                terminal.print_line(ListContactsError::NotSupported.user_message())?;
                return Ok(());
            }
            Cached::Unavailable { reason } => {
                warn_offline(CONTACTS_OFFLINE, &reason);
                login_hint(terminal, reason == ListContactsError::Unauthorized)?;
                terminal.print_line(reason.user_message())?;
                return Ok(());
            }
        };

    terminal.print_lines(&ui::profile_view::render_contacts(&contacts, viewer.role, offline))?;
    Ok(())
}

async fn show_chats(context: &AppContext, terminal: &mut dyn Terminal) -> Result<()> {
    let client = api_client(context)?;
    let mut state = ChatListState::default();

    match list_chats(&client, context.snapshots.as_ref()).await {
        Cached::Fresh(chats) => state.set_ready(chats, false),
        Cached::Offline { value, reason } => {
            warn_offline(CHATS_OFFLINE, &reason);
            login_hint(terminal, reason == ListChatsError::Unauthorized)?;
            state.set_ready(value, true);
        }
        Cached::Unavailable { reason } => {
            warn_offline(CHATS_OFFLINE, &reason);
            login_hint(terminal, reason == ListChatsError::Unauthorized)?;
            terminal.print_line(reason.user_message())?;
            state.set_ready(Vec::new(), true);
        }
    }

    terminal.print_lines(&ui::chat_list::render_chat_list(&state, &Local::now()))?;
    Ok(())
}

async fn show_schedule(
    context: &AppContext,
    terminal: &mut dyn Terminal,
    date: NaiveDate,
) -> Result<()> {
    let client = api_client(context)?;

    let (lessons, offline) = match load_schedule(&client, context.snapshots.as_ref(), date).await {
        Cached::Fresh(lessons) => (lessons, false),
        Cached::Offline { value, reason } => {
            warn_offline(SCHEDULE_OFFLINE, &reason);
            login_hint(terminal, reason == LoadScheduleError::Unauthorized)?;
            (value, true)
        }
        Cached::Unavailable { reason } => {
            warn_offline(SCHEDULE_OFFLINE, &reason);
            login_hint(terminal, reason == LoadScheduleError::Unauthorized)?;
            terminal.print_line(reason.user_message())?;
            (Vec::new(), true)
        }
    };

    terminal.print_lines(&ui::schedule_view::render_schedule(date, &lessons, offline))?;
    Ok(())
}

async fn open_chat<R>(
    context: &AppContext,
    chat_id: i64,
    input: R,
    terminal: &mut dyn Terminal,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let viewer = current_user(context)?.clone();
    let client = Arc::new(api_client(context)?);
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    let (commands, screen) = ChatScreen::open(
        chat_id,
        viewer.clone(),
        client,
        Arc::clone(&context.snapshots),
        SyncSettings::from(&context.config.sync),
        events_tx,
    );

    ui::chat_screen::run(input, terminal, commands, events_rx, viewer.id).await?;
    screen.await.context("chat screen task failed")?;
    Ok(())
}

fn current_user(context: &AppContext) -> Result<&User> {
    context.session.user().ok_or_else(|| anyhow!(LOGIN_REQUIRED))
}

fn api_client(context: &AppContext) -> Result<ApiClient> {
    current_user(context)?;
    let token = context.session.token().map(ToOwned::to_owned);
    Ok(ApiClient::new(&context.config.api, token)?)
}

fn warn_offline(code: &'static str, reason: &dyn std::fmt::Debug) {
    tracing::warn!(code, reason = ?reason, "showing cached data");
}

fn login_hint(terminal: &mut dyn Terminal, unauthorized: bool) -> Result<()> {
    if unauthorized {
        terminal.print_line("Your session has expired. Run `campus login` again.")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};

    use super::*;
    use crate::{
        domain::session::{Session, UserRole},
        infra::{
            config::AppConfig,
            storage_layout::StorageLayout,
            stubs::{MemorySessionStore, MemorySnapshotStore},
        },
        ui::terminal::fake::FakeTerminal,
        usecases::{context::SessionContext, offline_cache::CHAT_LIST_KEY},
    };

    fn user() -> User {
        User {
            id: 1,
            email: "t@uni.edu".to_owned(),
            full_name: "Teacher One".to_owned(),
            role: UserRole::Teacher,
            group: None,
            teacher: Some("Teacher One".to_owned()),
        }
    }

    struct Harness {
        context: AppContext,
        sessions: Arc<MemorySessionStore>,
        snapshots: Arc<MemorySnapshotStore>,
        _temp: tempfile::TempDir,
    }

    fn harness(server: &Server, logged_in: bool) -> Harness {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut config = AppConfig::default();
        config.api.base_url = server.url();
        config.api.request_timeout_ms = 2_000;

        let session = Session {
            token: "token-1".to_owned(),
            user: user(),
        };
        let sessions = Arc::new(if logged_in {
            MemorySessionStore::with_session(session.clone())
        } else {
            MemorySessionStore::default()
        });
        let snapshots = Arc::new(MemorySnapshotStore::default());
        let mut session_context = SessionContext::default();
        if logged_in {
            session_context.replace(session);
        }

        let context = AppContext::new(
            config,
            StorageLayout::under(temp.path().join("campus")),
            session_context,
            sessions.clone(),
            snapshots.clone(),
        );

        Harness {
            context,
            sessions,
            snapshots,
            _temp: temp,
        }
    }

    #[tokio::test]
    async fn login_prompts_for_password_and_persists_session() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/login")
            .match_body(Matcher::Json(
                serde_json::json!({"email": "t@uni.edu", "password": "pw"}),
            ))
            .with_status(200)
            .with_body(
                r#"{"token": "jwt", "user": {"id": 1, "email": "t@uni.edu", "fullName": "Teacher One", "userType": "teacher"}}"#,
            )
            .create_async()
            .await;
        let mut harness = harness(&server, false);
        let mut terminal = FakeTerminal::new(vec![Some("pw")]);

        dispatch(
            Command::Login {
                email: Some("t@uni.edu".to_owned()),
            },
            &mut harness.context,
            &mut terminal,
        )
        .await
        .expect("login should succeed");

        assert!(terminal.printed("Logged in as Teacher One (teacher)"));
        assert_eq!(
            harness.sessions.stored().map(|session| session.token),
            Some("jwt".to_owned())
        );
        assert_eq!(harness.context.session.token(), Some("jwt"));
    }

    #[tokio::test]
    async fn commands_require_login() {
        let server = Server::new_async().await;
        let mut harness = harness(&server, false);
        let mut terminal = FakeTerminal::default();

        let error = dispatch(Command::Chats, &mut harness.context, &mut terminal)
            .await
            .expect_err("chats need a session");

        assert_eq!(error.to_string(), LOGIN_REQUIRED);
    }

    #[tokio::test]
    async fn chats_are_listed_and_cached() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/chats")
            .match_header("authorization", "Bearer token-1")
            .with_status(200)
            .with_body(
                r#"[{"id": 4, "type": "private", "display_name": "Anna", "last_message": "hi", "unread_count": 1}]"#,
            )
            .create_async()
            .await;
        let mut harness = harness(&server, true);
        let mut terminal = FakeTerminal::default();

        dispatch(Command::Chats, &mut harness.context, &mut terminal)
            .await
            .expect("chats should load");

        assert!(terminal.printed("Anna (1)"));
        assert!(harness.snapshots.get(CHAT_LIST_KEY).is_some());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unreachable_server_shows_cached_chats_offline() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/chats")
            .with_status(503)
            .create_async()
            .await;
        let mut harness = harness(&server, true);
        harness.snapshots.insert_json(
            CHAT_LIST_KEY,
            &serde_json::json!([{"id": 4, "type": "private", "display_name": "Anna"}]),
        );
        let mut terminal = FakeTerminal::default();

        dispatch(Command::Chats, &mut harness.context, &mut terminal)
            .await
            .expect("offline list is still a success");

        assert!(terminal.printed("[offline]"));
        assert!(terminal.printed("Anna"));
    }

    #[tokio::test]
    async fn failed_send_reports_user_message() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chats/4/messages")
            .with_status(500)
            .create_async()
            .await;
        let mut harness = harness(&server, true);
        let mut terminal = FakeTerminal::default();

        let error = dispatch(
            Command::Send {
                chat_id: 4,
                text: vec!["hello".to_owned()],
            },
            &mut harness.context,
            &mut terminal,
        )
        .await
        .expect_err("send should fail");

        assert!(!error.to_string().is_empty());
        assert!(terminal.output.is_empty());
    }

    #[tokio::test]
    async fn empty_schedule_prints_empty_state() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/schedule")
            .match_query(Matcher::UrlEncoded("date".into(), "2024-10-15".into()))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        let mut harness = harness(&server, true);
        let mut terminal = FakeTerminal::default();

        dispatch(
            Command::Schedule {
                date: NaiveDate::from_ymd_opt(2024, 10, 15),
            },
            &mut harness.context,
            &mut terminal,
        )
        .await
        .expect("schedule should load");

        assert!(terminal.printed("No lessons on this day."));
        assert!(!terminal.printed("[offline]"));
    }

    #[tokio::test]
    async fn logout_forgets_session() {
        let server = Server::new_async().await;
        let mut harness = harness(&server, true);
        let mut terminal = FakeTerminal::default();

        dispatch(Command::Logout, &mut harness.context, &mut terminal)
            .await
            .expect("logout should succeed");

        assert!(terminal.printed("Logged out."));
        assert!(harness.sessions.stored().is_none());
        assert!(harness.context.session.current().is_none());
    }

    #[tokio::test]
    async fn open_chat_prints_history_and_closes_on_quit() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/chats/4/messages")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"[{"id": 11, "sender_id": 2, "sender_name": "Anna", "message": "hello", "created_at": "2024-10-15T09:32:00Z"}]"#,
            )
            .create_async()
            .await;
        server
            .mock("POST", "/chats/4/read")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        let harness = harness(&server, true);
        let mut terminal = FakeTerminal::default();

        // /quit only after the history had time to arrive.
        let (mut writer, reader) = tokio::io::duplex(64);
        let typist = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
            tokio::io::AsyncWriteExt::write_all(&mut writer, b"/quit\n")
                .await
                .expect("input should be writable");
        });

        open_chat(
            &harness.context,
            4,
            tokio::io::BufReader::new(reader),
            &mut terminal,
        )
        .await
        .expect("chat screen should run");
        typist.await.expect("typist should finish");

        assert!(terminal.printed("Anna:"));
        assert!(terminal.printed("hello"));
        assert!(terminal.printed("Chat closed."));
    }

    #[tokio::test]
    async fn register_prompts_for_missing_group_and_logs_in() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/groups")
            .with_status(200)
            .with_body(r#"["IS-21", "PM-11"]"#)
            .create_async()
            .await;
        let mock = server
            .mock("POST", "/register")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "email": "n@uni.edu",
                "fullName": "Nina Orlova",
                "userType": "student",
                "group": "IS-21"
            })))
            .with_status(200)
            .with_body(
                r#"{"token": "jwt-new", "user": {"id": 31, "email": "n@uni.edu", "fullName": "Nina Orlova", "userType": "student", "group": "IS-21"}}"#,
            )
            .create_async()
            .await;
        let mut harness = harness(&server, false);
        let mut terminal = FakeTerminal::new(vec![Some("is-21"), Some("secret1")]);

        dispatch(
            Command::Register {
                email: Some("n@uni.edu".to_owned()),
                name: Some("Nina Orlova".to_owned()),
                role: RegisterRole::Student,
                group: None,
                teacher: None,
            },
            &mut harness.context,
            &mut terminal,
        )
        .await
        .expect("registration should succeed");

        assert!(terminal.printed("Groups: IS-21, PM-11"));
        assert!(terminal.printed("Registered and logged in as Nina Orlova (student)"));
        assert_eq!(harness.context.session.token(), Some("jwt-new"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn profile_prints_details() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/profile/details")
            .match_header("authorization", "Bearer token-1")
            .with_status(200)
            .with_body(
                r#"{"id": 1, "email": "t@uni.edu", "full_name": "Teacher One", "user_type": "teacher",
                    "teacher_name": "Teacher One", "faculty": "Informatics", "total_groups": 4}"#,
            )
            .create_async()
            .await;
        let mut harness = harness(&server, true);
        let mut terminal = FakeTerminal::default();

        dispatch(Command::Profile, &mut harness.context, &mut terminal)
            .await
            .expect("profile should load");

        assert!(terminal.printed("Teacher One (teacher)"));
        assert!(terminal.printed("Informatics"));
        assert!(terminal.printed("4 groups"));
    }

    #[tokio::test]
    async fn unreachable_profile_falls_back_to_session_user() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", Matcher::Regex("^/profile".to_owned()))
            .with_status(503)
            .expect_at_least(1)
            .create_async()
            .await;
        let mut harness = harness(&server, true);
        let mut terminal = FakeTerminal::default();

        dispatch(Command::Profile, &mut harness.context, &mut terminal)
            .await
            .expect("offline profile is still shown");

        assert!(terminal.printed("[offline]"));
        assert!(terminal.printed("Teacher One (teacher)"));
    }

    #[tokio::test]
    async fn teacher_contacts_list_students_with_ids() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/students/my")
            .with_status(200)
            .with_body(
                r#"[{"id": 8, "full_name": "Anna", "email": "a@uni.edu", "group_name": "IS-21"}]"#,
            )
            .create_async()
            .await;
        let mut harness = harness(&server, true);
        let mut terminal = FakeTerminal::default();

        dispatch(Command::Contacts, &mut harness.context, &mut terminal)
            .await
            .expect("contacts should load");

        assert!(terminal.printed("Your students (1)"));
        assert!(terminal.printed("     8  Anna"));
        assert!(terminal.printed("new-chat private --user-id"));
        mock.assert_async().await;
    }
}
