use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

use crate::domain::session::UserRole;

#[derive(Debug, Parser)]
#[command(name = "campus", about = "Terminal client for the university portal")]
pub struct Cli {
    /// Path to config file (default: ./config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Log in; the password is prompted for
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account and log in; the password is prompted for
    Register {
        #[arg(long)]
        email: Option<String>,
        /// Full name, e.g. "Nina Orlova"
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_enum)]
        role: RegisterRole,
        /// Study group (students)
        #[arg(long, conflicts_with = "teacher")]
        group: Option<String>,
        /// Your name as it appears in the schedule (teachers)
        #[arg(long)]
        teacher: Option<String>,
    },
    /// Forget the saved session
    Logout,
    /// Show your profile and semester statistics
    Profile,
    /// List people you can start a private chat with
    Contacts,
    /// List chats (default)
    Chats,
    /// Open a chat and follow new messages
    Open { chat_id: i64 },
    /// Send one message and exit
    Send {
        chat_id: i64,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Show lessons for a day (default: today)
    Schedule {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Start a new chat
    NewChat {
        #[command(subcommand)]
        kind: NewChatKind,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum NewChatKind {
    /// Private chat with one user
    Private {
        #[arg(long)]
        user_id: i64,
    },
    /// Chat for a study group (teachers only)
    Group {
        #[arg(long)]
        group_id: String,
        #[arg(long)]
        name: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RegisterRole {
    Student,
    Teacher,
}

impl From<RegisterRole> for UserRole {
    fn from(role: RegisterRole) -> Self {
        match role {
            RegisterRole::Student => Self::Student,
            RegisterRole::Teacher => Self::Teacher,
        }
    }
}

impl Cli {
    pub fn command_or_default(&self) -> Command {
        self.command.clone().unwrap_or(Command::Chats)
    }
}
