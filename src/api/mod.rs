//! REST adapter for the campus portal backend.

mod auth;
mod chats;
mod client;
mod error;
mod profile;
mod schedule;

pub use client::ApiClient;
