//! Domain layer: core entities and business rules.

pub mod chat;
pub mod chat_list_state;
pub mod lifecycle;
pub mod message;
pub mod message_input_state;
pub mod open_chat_state;
pub mod profile;
pub mod schedule;
pub mod session;
