//! Async driver for one open chat.
//!
//! Owns the `ChatSync` state machine and its `PollTimer`, performs the IO the
//! machine asks for, and reports what changed as `ScreenEvent`s. Everything
//! runs in a single `select!` loop; fetches are spawned and report back over
//! a completion channel, so a response that lands after `Close` finds the
//! loop gone and is dropped.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{
    domain::{
        chat::{resolve_header, ChatSession},
        lifecycle::AppPhase,
        message::Message,
        message_input_state::MessageInputState,
        open_chat_state::{OpenChatState, WindowUpdate},
        session::User,
    },
    infra::contracts::SnapshotStore,
};

use super::{
    chat_sync::{
        ChatSync, FallbackOutcome, FetchKind, FetchRequest, LatestPageOutcome, OlderPageOutcome,
        SyncSettings,
    },
    load_messages::{load_messages, LoadMessagesError, MessagesSource},
    mark_read::{mark_read, ReadMarker},
    offline_cache::{chat_messages_key, read_snapshot, store_snapshot, CHAT_LIST_KEY},
    poll_timer::PollTimer,
    send_message::{send_message, MessageSender, SendMessageCommand, SendMessageError},
};

const CHAT_SCREEN_OPENED: &str = "CHAT_SCREEN_OPENED";
const CHAT_SCREEN_CLOSED: &str = "CHAT_SCREEN_CLOSED";
const CHAT_SEND_FAILED: &str = "CHAT_SEND_FAILED";

/// Everything the chat screen needs from the backend.
pub trait ChatGateway: Send + Sync {
    fn messages(&self) -> &dyn MessagesSource;
    fn sender(&self) -> &dyn MessageSender;
    fn read_marker(&self) -> &dyn ReadMarker;
}

impl<T> ChatGateway for T
where
    T: MessagesSource + MessageSender + ReadMarker,
{
    fn messages(&self) -> &dyn MessagesSource {
        self
    }

    fn sender(&self) -> &dyn MessageSender {
        self
    }

    fn read_marker(&self) -> &dyn ReadMarker {
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenCommand {
    /// Replaces the composer text.
    Draft(String),
    /// Sends the composer text.
    Submit,
    LoadOlder,
    SetAtBottom(bool),
    Lifecycle(AppPhase),
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenEvent {
    Rendered(OpenChatState),
    ScrollToBottom,
    /// First load failed; showing `cached` messages from the snapshot.
    Offline { cached: usize },
    /// First load failed and nothing was cached.
    Unavailable,
    /// No older history left to load.
    HistoryExhausted,
    Alert(String),
    /// Composer text after a send attempt.
    Draft(String),
    Closed,
}

enum Completion {
    Latest {
        kind: FetchKind,
        result: Result<Vec<Message>, LoadMessagesError>,
    },
    Older(Result<Vec<Message>, LoadMessagesError>),
    Sent(Result<Message, SendMessageError>),
}

pub struct ChatScreen {
    chat_id: i64,
    viewer: User,
    gateway: Arc<dyn ChatGateway>,
    snapshots: Arc<dyn SnapshotStore>,
    cached_chats: Vec<ChatSession>,
    sync: ChatSync,
    input: MessageInputState,
    events: mpsc::UnboundedSender<ScreenEvent>,
    done_tx: mpsc::UnboundedSender<Completion>,
}

impl ChatScreen {
    /// Spawns the screen loop and returns its command handle.
    pub fn open(
        chat_id: i64,
        viewer: User,
        gateway: Arc<dyn ChatGateway>,
        snapshots: Arc<dyn SnapshotStore>,
        settings: SyncSettings,
        events: mpsc::UnboundedSender<ScreenEvent>,
    ) -> (mpsc::Sender<ScreenCommand>, tokio::task::JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::channel(32);
        let (done_tx, done_rx) = mpsc::unbounded_channel();

        let cached_chats: Vec<ChatSession> =
            read_snapshot(snapshots.as_ref(), CHAT_LIST_KEY).unwrap_or_default();
        let header = resolve_header(&cached_chats, chat_id, &viewer, &[]);

        let screen = Self {
            chat_id,
            viewer,
            gateway,
            snapshots,
            cached_chats,
            sync: ChatSync::new(chat_id, header, settings),
            input: MessageInputState::default(),
            events,
            done_tx,
        };

        let handle = tokio::spawn(screen.run(command_rx, done_rx));
        (command_tx, handle)
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<ScreenCommand>,
        mut done_rx: mpsc::UnboundedReceiver<Completion>,
    ) {
        let (tick_tx, mut tick_rx) = mpsc::unbounded_channel();
        let mut timer = PollTimer::new(tick_tx);

        tracing::info!(code = CHAT_SCREEN_OPENED, chat_id = self.chat_id, "chat screen opened");
        self.render();

        let plan = self.sync.mount();
        self.spawn_fetch(plan.fetch);
        timer.arm(plan.period);
        self.spawn_mark_read();

        loop {
            tokio::select! {
                Some(tick) = tick_rx.recv() => {
                    if !timer.is_current(tick) {
                        continue;
                    }
                    if let Some(request) = self.sync.on_tick() {
                        self.spawn_fetch(request);
                    }
                }
                command = commands.recv() => {
                    match command {
                        None | Some(ScreenCommand::Close) => break,
                        Some(command) => self.on_command(command, &mut timer),
                    }
                }
                Some(completion) = done_rx.recv() => self.on_completion(completion),
            }
        }

        self.sync.unmount();
        timer.cancel();
        tracing::info!(code = CHAT_SCREEN_CLOSED, chat_id = self.chat_id, "chat screen closed");
        self.emit(ScreenEvent::Closed);
    }

    fn on_command(&mut self, command: ScreenCommand, timer: &mut PollTimer) {
        match command {
            ScreenCommand::Draft(text) => self.input.set_text(&text),
            ScreenCommand::Submit => match self.input.begin_send() {
                Some(text) => self.spawn_send(text),
                None if self.input.is_sending() => {
                    tracing::debug!(chat_id = self.chat_id, "send already in flight")
                }
                None => {}
            },
            ScreenCommand::LoadOlder => match self.sync.begin_load_older() {
                Some(request) => self.spawn_fetch(request),
                None if !self.sync.window().has_more() => {
                    self.emit(ScreenEvent::HistoryExhausted)
                }
                None => {}
            },
            ScreenCommand::SetAtBottom(at_bottom) => self.sync.set_at_bottom(at_bottom),
            ScreenCommand::Lifecycle(phase) => {
                if let Some(rearm) = self.sync.on_lifecycle(phase) {
                    timer.arm(rearm.period);
                    if let Some(request) = rearm.fetch {
                        self.spawn_fetch(request);
                    }
                }
            }
            ScreenCommand::Close => {}
        }
    }

    fn on_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Latest { kind, result } => {
                match self.sync.on_latest_page(kind, result) {
                    LatestPageOutcome::Applied { update, snapshot } => {
                        if let Some(snapshot) = snapshot {
                            store_snapshot(
                                self.snapshots.as_ref(),
                                &chat_messages_key(self.chat_id),
                                &snapshot,
                            );
                        }
                        self.spawn_mark_read();
                        self.on_window_update(update);
                    }
                    LatestPageOutcome::FallbackRequired => self.fall_back_to_cache(),
                    LatestPageOutcome::Stale | LatestPageOutcome::Ignored => {}
                }
            }
            Completion::Older(result) => match self.sync.on_older_page(result) {
                OlderPageOutcome::Prepended { added, has_more } => {
                    self.spawn_mark_read();
                    if added > 0 {
                        self.render();
                    }
                    if !has_more {
                        self.emit(ScreenEvent::HistoryExhausted);
                    }
                }
                OlderPageOutcome::Failed | OlderPageOutcome::Ignored => {}
            },
            Completion::Sent(Ok(message)) => {
                self.input.finish_send(true);
                self.emit(ScreenEvent::Draft(String::new()));
                if let Some(update) = self.sync.on_message_sent(message) {
                    self.on_window_update(update);
                }
            }
            Completion::Sent(Err(error)) => {
                tracing::warn!(
                    code = CHAT_SEND_FAILED,
                    chat_id = self.chat_id,
                    error = ?error,
                    "sending message failed"
                );
                self.input.finish_send(false);
                self.emit(ScreenEvent::Alert(error.user_message().to_owned()));
                self.emit(ScreenEvent::Draft(self.input.text().to_owned()));
            }
        }
    }

    fn on_window_update(&mut self, update: WindowUpdate) {
        let WindowUpdate::Changed { scroll_to_bottom } = update else {
            return;
        };

        self.refresh_header();
        self.render();
        if scroll_to_bottom {
            self.emit(ScreenEvent::ScrollToBottom);
        }
    }

    fn fall_back_to_cache(&mut self) {
        let snapshot: Option<Vec<Message>> =
            read_snapshot(self.snapshots.as_ref(), &chat_messages_key(self.chat_id));

        match self.sync.on_cache_fallback(snapshot) {
            FallbackOutcome::Offline { cached } => {
                self.refresh_header();
                self.render();
                self.emit(ScreenEvent::Offline { cached });
            }
            FallbackOutcome::Empty => {
                self.render();
                self.emit(ScreenEvent::Unavailable);
            }
            FallbackOutcome::Ignored => {}
        }
    }

    /// Chats missing from the cached list take their title from the messages.
    fn refresh_header(&mut self) {
        let header = resolve_header(
            &self.cached_chats,
            self.chat_id,
            &self.viewer,
            self.sync.window().messages(),
        );
        if &header != self.sync.window().header() {
            self.sync.set_header(header);
        }
    }

    fn spawn_fetch(&self, request: FetchRequest) {
        let gateway = Arc::clone(&self.gateway);
        let done_tx = self.done_tx.clone();

        tokio::spawn(async move {
            let result = load_messages(gateway.messages(), request.query)
                .await
                .map(|output| output.messages);
            let completion = match request.kind {
                FetchKind::Older => Completion::Older(result),
                kind => Completion::Latest { kind, result },
            };
            let _ = done_tx.send(completion);
        });
    }

    fn spawn_send(&self, text: String) {
        let gateway = Arc::clone(&self.gateway);
        let done_tx = self.done_tx.clone();
        let command = SendMessageCommand {
            chat_id: self.chat_id,
            text,
        };

        tokio::spawn(async move {
            let result = send_message(gateway.sender(), command).await;
            let _ = done_tx.send(Completion::Sent(result));
        });
    }

    fn spawn_mark_read(&self) {
        let gateway = Arc::clone(&self.gateway);
        let chat_id = self.chat_id;

        tokio::spawn(async move {
            mark_read(gateway.read_marker(), chat_id).await;
        });
    }

    fn render(&self) {
        self.emit(ScreenEvent::Rendered(self.sync.window().clone()));
    }

    fn emit(&self, event: ScreenEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
        time::Duration,
    };

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use tokio::time;

    use super::*;
    use crate::{
        domain::{
            chat::ChatKind,
            session::UserRole,
        },
        infra::stubs::MemorySnapshotStore,
        usecases::contracts::SourceError,
    };

    const CHAT_ID: i64 = 9;

    struct StubGateway {
        page: Mutex<Result<Vec<Message>, SourceError>>,
        send_result: Result<Message, SourceError>,
        fetches: AtomicUsize,
        offsets: Mutex<Vec<usize>>,
        marks: AtomicUsize,
    }

    impl StubGateway {
        fn serving(page: Result<Vec<Message>, SourceError>) -> Self {
            Self {
                page: Mutex::new(page),
                send_result: Ok(message(100, 1)),
                fetches: AtomicUsize::new(0),
                offsets: Mutex::new(Vec::new()),
                marks: AtomicUsize::new(0),
            }
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MessagesSource for StubGateway {
        async fn list_messages(
            &self,
            _chat_id: i64,
            _limit: usize,
            offset: usize,
        ) -> Result<Vec<Message>, SourceError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.offsets.lock().expect("offsets lock").push(offset);
            if offset > 0 {
                return Ok(Vec::new());
            }
            self.page.lock().expect("page lock").clone()
        }
    }

    #[async_trait]
    impl MessageSender for StubGateway {
        async fn send_message(&self, _chat_id: i64, _text: &str) -> Result<Message, SourceError> {
            self.send_result.clone()
        }
    }

    #[async_trait]
    impl ReadMarker for StubGateway {
        async fn mark_read(&self, _chat_id: i64) -> Result<(), SourceError> {
            self.marks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn message(id: i64, sender_id: i64) -> Message {
        Message {
            id,
            chat_id: CHAT_ID,
            sender_id,
            sender_name: Some(format!("User {sender_id}")),
            text: format!("#{id}"),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
                + chrono::Duration::seconds(id),
        }
    }

    fn newest_first(ids: std::ops::RangeInclusive<i64>) -> Vec<Message> {
        ids.rev().map(|id| message(id, 2)).collect()
    }

    fn viewer() -> User {
        User {
            id: 1,
            email: "me@uni.edu".to_owned(),
            full_name: "Me".to_owned(),
            role: UserRole::Student,
            group: None,
            teacher: None,
        }
    }

    struct Harness {
        gateway: Arc<StubGateway>,
        commands: mpsc::Sender<ScreenCommand>,
        events: mpsc::UnboundedReceiver<ScreenEvent>,
        handle: tokio::task::JoinHandle<()>,
    }

    impl Harness {
        fn open(gateway: StubGateway, snapshots: MemorySnapshotStore) -> Self {
            let gateway = Arc::new(gateway);
            let (event_tx, events) = mpsc::unbounded_channel();
            let (commands, handle) = ChatScreen::open(
                CHAT_ID,
                viewer(),
                gateway.clone(),
                Arc::new(snapshots),
                SyncSettings::default(),
                event_tx,
            );

            Self {
                gateway,
                commands,
                events,
                handle,
            }
        }

        async fn send(&self, command: ScreenCommand) {
            self.commands.send(command).await.expect("screen is running");
        }

        fn drain(&mut self) -> Vec<ScreenEvent> {
            let mut events = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                events.push(event);
            }
            events
        }

        async fn close(self) -> Vec<ScreenEvent> {
            self.send(ScreenCommand::Close).await;
            let Harness {
                handle, mut events, ..
            } = self;
            handle.await.expect("screen task should finish");

            let mut drained = Vec::new();
            while let Ok(event) = events.try_recv() {
                drained.push(event);
            }
            drained
        }
    }

    fn last_window(events: &[ScreenEvent]) -> Option<&OpenChatState> {
        events.iter().rev().find_map(|event| match event {
            ScreenEvent::Rendered(window) => Some(window),
            _ => None,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn regular_cadence_polls_once_per_period() {
        let harness = Harness::open(
            StubGateway::serving(Ok(newest_first(1..=3))),
            MemorySnapshotStore::default(),
        );

        time::sleep(Duration::from_millis(3_550)).await;

        assert_eq!(harness.gateway.fetches(), 2);
        harness.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn background_then_foreground_within_one_interval_adds_exactly_one_fetch() {
        let harness = Harness::open(
            StubGateway::serving(Ok(newest_first(1..=3))),
            MemorySnapshotStore::default(),
        );

        time::sleep(Duration::from_millis(500)).await;
        harness.send(ScreenCommand::Lifecycle(AppPhase::Background)).await;
        time::sleep(Duration::from_millis(500)).await;
        harness.send(ScreenCommand::Lifecycle(AppPhase::Foreground)).await;
        time::sleep(Duration::from_millis(2_550)).await;

        assert_eq!(harness.gateway.fetches(), 3);
        harness.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn background_phase_slows_polling() {
        let harness = Harness::open(
            StubGateway::serving(Ok(newest_first(1..=3))),
            MemorySnapshotStore::default(),
        );

        time::sleep(Duration::from_millis(100)).await;
        harness.send(ScreenCommand::Lifecycle(AppPhase::Background)).await;
        time::sleep(Duration::from_millis(9_800)).await;

        assert_eq!(harness.gateway.fetches(), 1);
        time::sleep(Duration::from_millis(300)).await;
        assert_eq!(harness.gateway.fetches(), 2);
        harness.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn first_load_renders_and_marks_read() {
        let snapshots = MemorySnapshotStore::default();
        let mut harness = Harness::open(StubGateway::serving(Ok(newest_first(1..=3))), snapshots);

        time::sleep(Duration::from_millis(10)).await;
        let events = harness.drain();

        let window = last_window(&events).expect("window should render");
        assert_eq!(
            window.messages().iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(window.header().title, "User 2");
        assert!(events.contains(&ScreenEvent::ScrollToBottom));
        assert_eq!(harness.gateway.marks.load(Ordering::SeqCst), 2);
        harness.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn header_comes_from_cached_chat_list() {
        let snapshots = MemorySnapshotStore::default();
        snapshots.insert_json(
            CHAT_LIST_KEY,
            &vec![ChatSession {
                id: CHAT_ID,
                kind: ChatKind::Group,
                name: Some("Databases".to_owned()),
                display_name: None,
                group_id: Some("IS-21".to_owned()),
                last_message: None,
                last_message_at: None,
                unread_count: 0,
            }],
        );
        let mut harness = Harness::open(StubGateway::serving(Ok(newest_first(1..=3))), snapshots);

        time::sleep(Duration::from_millis(10)).await;
        let events = harness.drain();

        let window = last_window(&events).expect("window should render");
        assert_eq!(window.header().title, "Databases");
        harness.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_send_keeps_draft_and_alerts() {
        let mut gateway = StubGateway::serving(Ok(newest_first(1..=3)));
        gateway.send_result = Err(SourceError::Unavailable);
        let mut harness = Harness::open(gateway, MemorySnapshotStore::default());
        time::sleep(Duration::from_millis(10)).await;
        harness.drain();

        harness.send(ScreenCommand::Draft("hello".to_owned())).await;
        harness.send(ScreenCommand::Submit).await;
        time::sleep(Duration::from_millis(10)).await;
        let events = harness.drain();

        assert!(events
            .iter()
            .any(|event| matches!(event, ScreenEvent::Alert(_))));
        assert!(events.contains(&ScreenEvent::Draft("hello".to_owned())));
        harness.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn delivered_message_is_appended_and_draft_cleared() {
        let mut harness = Harness::open(
            StubGateway::serving(Ok(newest_first(1..=3))),
            MemorySnapshotStore::default(),
        );
        time::sleep(Duration::from_millis(10)).await;
        harness.send(ScreenCommand::SetAtBottom(false)).await;
        harness.drain();

        harness.send(ScreenCommand::Draft("hi".to_owned())).await;
        harness.send(ScreenCommand::Submit).await;
        time::sleep(Duration::from_millis(10)).await;
        let events = harness.drain();

        let window = last_window(&events).expect("window should render");
        assert_eq!(window.newest_id(), Some(100));
        assert!(events.contains(&ScreenEvent::Draft(String::new())));
        assert!(events.contains(&ScreenEvent::ScrollToBottom));
        harness.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_first_load_shows_cached_snapshot_offline() {
        let snapshots = MemorySnapshotStore::default();
        snapshots.insert_json(&chat_messages_key(CHAT_ID), &newest_first(1..=3));
        let mut harness =
            Harness::open(StubGateway::serving(Err(SourceError::Unavailable)), snapshots);

        time::sleep(Duration::from_millis(10)).await;
        let events = harness.drain();

        assert!(events.contains(&ScreenEvent::Offline { cached: 3 }));
        let window = last_window(&events).expect("window should render");
        assert!(window.is_offline());
        assert_eq!(window.messages().len(), 3);
        harness.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_first_load_without_snapshot_is_unavailable() {
        let mut harness = Harness::open(
            StubGateway::serving(Err(SourceError::Unavailable)),
            MemorySnapshotStore::default(),
        );

        time::sleep(Duration::from_millis(10)).await;

        assert!(harness.drain().contains(&ScreenEvent::Unavailable));
        harness.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn load_older_requests_offset_past_loaded_window() {
        let mut harness = Harness::open(
            StubGateway::serving(Ok(newest_first(1..=20))),
            MemorySnapshotStore::default(),
        );
        time::sleep(Duration::from_millis(10)).await;

        harness.send(ScreenCommand::LoadOlder).await;
        time::sleep(Duration::from_millis(10)).await;

        assert_eq!(
            *harness.gateway.offsets.lock().expect("offsets lock"),
            vec![0, 20]
        );
        assert!(harness.drain().contains(&ScreenEvent::HistoryExhausted));
        harness.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn close_stops_polling() {
        let harness = Harness::open(
            StubGateway::serving(Ok(newest_first(1..=3))),
            MemorySnapshotStore::default(),
        );
        time::sleep(Duration::from_millis(10)).await;
        let gateway = harness.gateway.clone();

        let events = harness.close().await;
        time::sleep(Duration::from_secs(10)).await;

        assert_eq!(events.last(), Some(&ScreenEvent::Closed));
        assert_eq!(gateway.fetches(), 1);
    }
}
