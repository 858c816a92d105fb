//! Use case layer: application workflows and orchestration.

pub mod bootstrap;
pub mod chat_screen;
pub mod chat_sync;
pub mod context;
pub mod contracts;
pub mod create_chat;
pub mod list_chats;
pub mod list_contacts;
pub mod load_messages;
pub mod load_profile;
pub mod load_schedule;
pub mod login;
pub mod logout;
pub mod mark_read;
pub mod offline_cache;
pub mod poll_timer;
pub mod register;
pub mod send_message;
