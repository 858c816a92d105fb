//! Interactive chat screen on a plain line terminal.
//!
//! Reads lines from the user and forwards them to the screen driver as
//! `ScreenCommand`s; prints each `ScreenEvent` as it arrives. Already printed
//! messages are not repeated, so a poll that finds nothing new prints nothing.

use std::{collections::HashSet, io};

use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::mpsc,
};

use crate::{
    domain::{
        chat::ChatHeader, lifecycle::AppPhase, message::Message, open_chat_state::OpenChatState,
    },
    usecases::chat_screen::{ScreenCommand, ScreenEvent},
};

use super::{chat_list::OFFLINE_MARKER, message_rendering::render_messages, terminal::Terminal};

const HELP_LINES: [&str; 7] = [
    "Type a message and press Enter to send it.",
    "/more        load older messages",
    "/bottom      follow new messages",
    "/up          stop following (new messages are still printed)",
    "/background  simulate the app going to the background",
    "/foreground  simulate the app coming back",
    "/quit        close the chat",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    Commands(Vec<ScreenCommand>),
    Help,
    Unknown(String),
    Ignore,
}

pub fn parse_input(line: &str) -> InputAction {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return InputAction::Ignore;
    }

    let command = match trimmed {
        "/more" => ScreenCommand::LoadOlder,
        "/bottom" => ScreenCommand::SetAtBottom(true),
        "/up" => ScreenCommand::SetAtBottom(false),
        "/quit" | "/q" => ScreenCommand::Close,
        "/help" => return InputAction::Help,
        other if other.starts_with('/') => match AppPhase::from_lifecycle_name(&other[1..]) {
            Some(phase) => ScreenCommand::Lifecycle(phase),
            None => return InputAction::Unknown(other.to_owned()),
        },
        _ => {
            return InputAction::Commands(vec![
                ScreenCommand::Draft(line.to_owned()),
                ScreenCommand::Submit,
            ])
        }
    };

    InputAction::Commands(vec![command])
}

/// Turns screen events into printable lines.
#[derive(Debug)]
pub struct Transcript {
    viewer_id: i64,
    header: Option<ChatHeader>,
    printed: HashSet<i64>,
    oldest: Option<Message>,
    newest: Option<Message>,
}

impl Transcript {
    pub fn new(viewer_id: i64) -> Self {
        Self {
            viewer_id,
            header: None,
            printed: HashSet::new(),
            oldest: None,
            newest: None,
        }
    }

    pub fn on_event(&mut self, event: &ScreenEvent) -> Vec<String> {
        match event {
            ScreenEvent::Rendered(state) => self.on_render(state),
            ScreenEvent::ScrollToBottom => Vec::new(),
            ScreenEvent::Offline { cached } => vec![
                OFFLINE_MARKER.to_owned(),
                format!("Showing {cached} saved messages."),
            ],
            ScreenEvent::Unavailable => {
                vec!["Messages could not be loaded and nothing is saved for this chat.".to_owned()]
            }
            ScreenEvent::HistoryExhausted => vec!["No older messages.".to_owned()],
            ScreenEvent::Alert(text) => vec![format!("! {text}")],
            ScreenEvent::Draft(text) if !text.is_empty() => {
                vec![format!("Not sent, draft kept: {text}")]
            }
            ScreenEvent::Draft(_) => Vec::new(),
            ScreenEvent::Closed => vec!["Chat closed.".to_owned()],
        }
    }

    fn on_render(&mut self, state: &OpenChatState) -> Vec<String> {
        let mut lines = Vec::new();

        if self.header.as_ref() != Some(state.header()) {
            let header = state.header().clone();
            lines.push(format!("== {} ({}) ==", header.title, header.subtitle));
            self.header = Some(header);
        }

        let fresh: Vec<Message> = state
            .messages()
            .iter()
            .filter(|message| !self.printed.contains(&message.id))
            .cloned()
            .collect();
        if fresh.is_empty() {
            return lines;
        }

        let (older, newer): (Vec<Message>, Vec<Message>) = match &self.oldest {
            Some(oldest) => fresh
                .into_iter()
                .partition(|message| message.order_key() < oldest.order_key()),
            None => (Vec::new(), fresh),
        };

        if !older.is_empty() {
            lines.push("--- earlier messages ---".to_owned());
            lines.extend(render_messages(&older, self.viewer_id, None));
            lines.push("--- end of earlier messages ---".to_owned());
        }
        if !newer.is_empty() {
            lines.extend(render_messages(&newer, self.viewer_id, self.newest.as_ref()));
        }

        for message in older.into_iter().chain(newer) {
            self.printed.insert(message.id);
            if self
                .oldest
                .as_ref()
                .map_or(true, |oldest| message.order_key() < oldest.order_key())
            {
                self.oldest = Some(message.clone());
            }
            if self
                .newest
                .as_ref()
                .map_or(true, |newest| message.order_key() > newest.order_key())
            {
                self.newest = Some(message);
            }
        }

        lines
    }
}

/// Runs the chat screen until it closes or `input` reaches end of file.
pub async fn run<R>(
    input: R,
    out: &mut dyn Terminal,
    commands: mpsc::Sender<ScreenCommand>,
    mut events: mpsc::UnboundedReceiver<ScreenEvent>,
    viewer_id: i64,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut transcript = Transcript::new(viewer_id);
    let mut lines = input.lines();
    let mut input_open = true;

    out.print_line("Type /help for commands.")?;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                out.print_lines(&transcript.on_event(&event))?;
                if event == ScreenEvent::Closed {
                    break;
                }
            }
            line = lines.next_line(), if input_open => {
                let commands_to_send = match line? {
                    Some(line) => match parse_input(&line) {
                        InputAction::Commands(commands) => commands,
                        InputAction::Help => {
                            for help in HELP_LINES {
                                out.print_line(help)?;
                            }
                            continue;
                        }
                        InputAction::Unknown(command) => {
                            out.print_line(&format!("Unknown command {command}. Type /help."))?;
                            continue;
                        }
                        InputAction::Ignore => continue,
                    },
                    None => {
                        input_open = false;
                        vec![ScreenCommand::Close]
                    }
                };

                for command in commands_to_send {
                    if command == ScreenCommand::Close {
                        input_open = false;
                    }
                    if commands.send(command).await.is_err() {
                        return Ok(());
                    }
                }
            }
        }
    }

    Ok(())
}
