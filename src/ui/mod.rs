//! UI layer: line-oriented terminal rendering and the interactive chat screen.

pub mod chat_list;
pub mod chat_screen;
mod message_rendering;
pub mod profile_view;
pub mod schedule_view;
pub mod terminal;
