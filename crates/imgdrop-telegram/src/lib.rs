//! Telegram Bot API transport
//!
//! The [`BotApi`] trait is the only surface the worker depends on: long-poll
//! for updates, resolve a file id, stream a file, send a reply. The
//! [`TelegramClient`] implements it over HTTPS with explicit timeouts and no
//! internal retries; retry policy belongs to the caller.

pub mod api;
pub mod client;
pub mod error;
pub mod types;

pub use api::{BotApi, FileDescriptor, FileStream};
pub use client::TelegramClient;
pub use error::TransportError;
pub use types::{Chat, Document, Message, PhotoSize, Update, User};
