//! Polling synchronization for one open chat.
//!
//! `ChatSync` is a pure state machine: it decides which fetches to issue and
//! how their results change the message window, while the caller owns timers
//! and IO. Phases run `Loading -> Idle <-> Polling`, and `Closed` is terminal.
//! The foreground/background dimension only changes the poll period.

use std::time::Duration;

use crate::{
    domain::{
        chat::ChatHeader,
        lifecycle::AppPhase,
        message::Message,
        open_chat_state::{LatestPagePolicy, OpenChatState, WindowUpdate},
    },
    infra::config::SyncConfig,
};

use super::load_messages::{normalize_page_size, LoadMessagesError, LoadMessagesQuery};

const CHAT_SYNC_POLL_FAILED: &str = "CHAT_SYNC_POLL_FAILED";
const CHAT_SYNC_INITIAL_LOAD_FAILED: &str = "CHAT_SYNC_INITIAL_LOAD_FAILED";
const CHAT_SYNC_OLDER_PAGE_FAILED: &str = "CHAT_SYNC_OLDER_PAGE_FAILED";
const CHAT_SYNC_OLDER_PAGE_DISCARDED: &str = "CHAT_SYNC_OLDER_PAGE_DISCARDED";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Initial fetch in flight.
    Loading,
    /// Timer armed, no poll in flight.
    Idle,
    /// Silent poll in flight.
    Polling,
    /// Screen unmounted; every later input is ignored.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub page_size: usize,
    pub foreground_period: Duration,
    pub background_multiplier: u32,
}

impl From<&SyncConfig> for SyncSettings {
    fn from(config: &SyncConfig) -> Self {
        Self {
            page_size: config.page_size,
            foreground_period: Duration::from_millis(config.foreground_interval_ms),
            background_multiplier: config.background_multiplier,
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            page_size: 20,
            foreground_period: Duration::from_millis(2_000),
            background_multiplier: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Initial,
    Silent,
    Older,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub kind: FetchKind,
    pub query: LoadMessagesQuery,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPlan {
    pub fetch: FetchRequest,
    pub period: Duration,
}

/// Timer change requested by a lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rearm {
    pub period: Duration,
    pub fetch: Option<FetchRequest>,
}

/// What the caller must do after a newest-page fetch completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LatestPageOutcome {
    /// Screen already closed, or result not expected.
    Ignored,
    /// Fetch succeeded. `snapshot` is the newest-first page to cache when
    /// the window changed. A read mark is due either way.
    Applied {
        update: WindowUpdate,
        snapshot: Option<Vec<Message>>,
    },
    /// Silent poll failed; the stale window stays on screen.
    Stale,
    /// First load failed; the caller should try the cached snapshot.
    FallbackRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackOutcome {
    Ignored,
    Offline { cached: usize },
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OlderPageOutcome {
    Ignored,
    Prepended { added: usize, has_more: bool },
    Failed,
}

#[derive(Debug, Clone)]
pub struct ChatSync {
    chat_id: i64,
    settings: SyncSettings,
    phase: SyncPhase,
    app_phase: AppPhase,
    /// Window generation the pending older-page request was issued against.
    older_in_flight: Option<u64>,
    window: OpenChatState,
}

impl ChatSync {
    pub fn new(chat_id: i64, header: ChatHeader, settings: SyncSettings) -> Self {
        let settings = SyncSettings {
            page_size: normalize_page_size(settings.page_size),
            ..settings
        };
        let mut window = OpenChatState::default();
        window.set_loading(chat_id, header);

        Self {
            chat_id,
            settings,
            phase: SyncPhase::Loading,
            app_phase: AppPhase::Foreground,
            older_in_flight: None,
            window,
        }
    }

    pub fn chat_id(&self) -> i64 {
        self.chat_id
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn app_phase(&self) -> AppPhase {
        self.app_phase
    }

    pub fn window(&self) -> &OpenChatState {
        &self.window
    }

    /// Poll period for the current lifecycle phase.
    pub fn period(&self) -> Duration {
        match self.app_phase {
            AppPhase::Foreground => self.settings.foreground_period,
            AppPhase::Background => self
                .settings
                .foreground_period
                .saturating_mul(self.settings.background_multiplier.max(2)),
        }
    }

    /// Starts the screen: one visible fetch of the newest page, timer at the
    /// current period.
    pub fn mount(&mut self) -> MountPlan {
        self.phase = SyncPhase::Loading;

        MountPlan {
            fetch: self.latest_request(FetchKind::Initial),
            period: self.period(),
        }
    }

    /// Timer fired. Issues a silent poll only from `Idle`.
    pub fn on_tick(&mut self) -> Option<FetchRequest> {
        if self.phase != SyncPhase::Idle {
            return None;
        }

        self.phase = SyncPhase::Polling;
        Some(self.latest_request(FetchKind::Silent))
    }

    /// Lifecycle transition. Returns `None` when nothing changes.
    pub fn on_lifecycle(&mut self, next: AppPhase) -> Option<Rearm> {
        if self.phase == SyncPhase::Closed || next == self.app_phase {
            return None;
        }

        self.app_phase = next;
        let fetch = match next {
            AppPhase::Foreground => self.on_tick(),
            AppPhase::Background => None,
        };

        Some(Rearm {
            period: self.period(),
            fetch,
        })
    }

    pub fn on_latest_page(
        &mut self,
        kind: FetchKind,
        result: Result<Vec<Message>, LoadMessagesError>,
    ) -> LatestPageOutcome {
        let expected = matches!(
            (kind, self.phase),
            (FetchKind::Initial, SyncPhase::Loading) | (FetchKind::Silent, SyncPhase::Polling)
        );
        if !expected {
            return LatestPageOutcome::Ignored;
        }

        self.phase = SyncPhase::Idle;

        match result {
            Ok(page) => {
                let snapshot = page.clone();
                let policy = self.policy();
                let update = self
                    .window
                    .apply_latest_page(page, self.settings.page_size, policy);
                let snapshot = match update {
                    WindowUpdate::Unchanged => None,
                    WindowUpdate::Changed { .. } => Some(snapshot),
                };

                LatestPageOutcome::Applied { update, snapshot }
            }
            Err(error) if kind == FetchKind::Initial => {
                tracing::warn!(
                    code = CHAT_SYNC_INITIAL_LOAD_FAILED,
                    chat_id = self.chat_id,
                    error = ?error,
                    "initial message load failed; falling back to cached snapshot"
                );
                LatestPageOutcome::FallbackRequired
            }
            Err(error) => {
                tracing::debug!(
                    code = CHAT_SYNC_POLL_FAILED,
                    chat_id = self.chat_id,
                    error = ?error,
                    "silent poll failed; keeping stale messages"
                );
                LatestPageOutcome::Stale
            }
        }
    }

    /// Applies the cached snapshot read after a failed first load.
    pub fn on_cache_fallback(&mut self, snapshot: Option<Vec<Message>>) -> FallbackOutcome {
        if self.phase == SyncPhase::Closed {
            return FallbackOutcome::Ignored;
        }

        match snapshot {
            Some(messages) if !messages.is_empty() => {
                let cached = messages.len();
                self.window
                    .show_offline_snapshot(messages, self.settings.page_size);
                FallbackOutcome::Offline { cached }
            }
            _ => {
                self.window.set_error();
                FallbackOutcome::Empty
            }
        }
    }

    /// User asked for older history. At most one such fetch is in flight.
    pub fn begin_load_older(&mut self) -> Option<FetchRequest> {
        let ready = matches!(self.phase, SyncPhase::Idle | SyncPhase::Polling);
        let blocked =
            self.older_in_flight.is_some() || !self.window.has_more() || self.window.is_offline();
        if !ready || blocked {
            return None;
        }

        self.older_in_flight = Some(self.window.generation());
        Some(FetchRequest {
            kind: FetchKind::Older,
            query: LoadMessagesQuery {
                chat_id: self.chat_id,
                limit: self.settings.page_size,
                offset: self.window.older_page_offset(),
            },
        })
    }

    pub fn on_older_page(
        &mut self,
        result: Result<Vec<Message>, LoadMessagesError>,
    ) -> OlderPageOutcome {
        if self.phase == SyncPhase::Closed {
            return OlderPageOutcome::Ignored;
        }
        let Some(requested_under) = self.older_in_flight.take() else {
            return OlderPageOutcome::Ignored;
        };
        if requested_under != self.window.generation() {
            tracing::debug!(
                code = CHAT_SYNC_OLDER_PAGE_DISCARDED,
                chat_id = self.chat_id,
                "window was rebuilt while older messages were loading"
            );
            return OlderPageOutcome::Ignored;
        }

        match result {
            Ok(page) => {
                let added = self
                    .window
                    .prepend_older_page(page, self.settings.page_size);
                OlderPageOutcome::Prepended {
                    added,
                    has_more: self.window.has_more(),
                }
            }
            Err(error) => {
                tracing::warn!(
                    code = CHAT_SYNC_OLDER_PAGE_FAILED,
                    chat_id = self.chat_id,
                    error = ?error,
                    "loading older messages failed"
                );
                OlderPageOutcome::Failed
            }
        }
    }

    /// Server echoed a message we sent.
    pub fn on_message_sent(&mut self, message: Message) -> Option<WindowUpdate> {
        if self.phase == SyncPhase::Closed {
            return None;
        }

        Some(self.window.append_sent(message))
    }

    pub fn set_header(&mut self, header: ChatHeader) {
        self.window.set_header(header);
    }

    pub fn set_at_bottom(&mut self, at_bottom: bool) {
        self.window.set_at_bottom(at_bottom);
    }

    pub fn unmount(&mut self) {
        self.phase = SyncPhase::Closed;
        self.older_in_flight = None;
    }

    /// Merge whenever older history is loaded or loading, so a newest page
    /// never overwrites it.
    fn policy(&self) -> LatestPagePolicy {
        if self.older_in_flight.is_some() || self.window.is_extended() {
            LatestPagePolicy::Merge
        } else {
            LatestPagePolicy::Replace
        }
    }

    fn latest_request(&self, kind: FetchKind) -> FetchRequest {
        FetchRequest {
            kind,
            query: LoadMessagesQuery::latest(self.chat_id, self.settings.page_size),
        }
    }
}
