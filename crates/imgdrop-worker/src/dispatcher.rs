use futures::FutureExt;
use imgdrop_telegram::{BotApi, Message, Update};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::pipeline::{DocumentEvent, IngestionPipeline, MediaSource, Submitter};
use crate::replies::Reply;

/// What one inbound message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Command { name: String },
    Photo { file_id: String },
    Document(DocumentEvent),
    Unrecognized,
}

/// Classify a message. A text command wins over a photo, a photo over a
/// document.
pub fn classify(message: &Message) -> Event {
    if let Some(name) = message.text.as_deref().and_then(command_name) {
        return Event::Command { name };
    }

    // sizes are ordered smallest first
    if let Some(largest) = message.photo.last() {
        return Event::Photo {
            file_id: largest.file_id.clone(),
        };
    }

    if let Some(doc) = &message.document {
        return Event::Document(DocumentEvent {
            file_id: doc.file_id.clone(),
            declared_name: doc.file_name.clone(),
            declared_mime: doc.mime_type.clone(),
            declared_size: doc.file_size,
        });
    }

    Event::Unrecognized
}

/// `/Start@SomeBot payload` -> `start`.
fn command_name(text: &str) -> Option<String> {
    let first = text.trim_start().split_whitespace().next()?;
    let command = first.strip_prefix('/')?;
    let name = command.split('@').next().unwrap_or(command);
    if name.is_empty() {
        return None;
    }
    Some(name.to_lowercase())
}

/// Routes classified events to replies or to the ingestion pipeline.
pub struct UpdateDispatcher {
    bot: Arc<dyn BotApi>,
    pipeline: Arc<IngestionPipeline>,
}

impl UpdateDispatcher {
    pub fn new(bot: Arc<dyn BotApi>, pipeline: Arc<IngestionPipeline>) -> Self {
        Self { bot, pipeline }
    }

    /// Handle one update completely. Never fails: errors are answered inside
    /// the pipeline and a panic is caught here and answered generically.
    pub async fn dispatch(&self, update: &Update) {
        let Some(message) = &update.message else {
            tracing::debug!(update_id = update.update_id, "Update without message ignored");
            return;
        };
        let chat_id = message.chat.id;

        let outcome = AssertUnwindSafe(self.route(message)).catch_unwind().await;
        if outcome.is_err() {
            tracing::error!(
                update_id = update.update_id,
                chat_id = chat_id,
                "Handler panicked"
            );
            self.bot.send_reply(chat_id, &Reply::Failed.render()).await;
        }
    }

    async fn route(&self, message: &Message) {
        let chat_id = message.chat.id;

        match classify(message) {
            Event::Command { name } => {
                tracing::debug!(chat_id = chat_id, command = %name, "Command received");
                let reply = if name == "start" {
                    Reply::Welcome
                } else {
                    Reply::Help
                };
                self.bot.send_reply(chat_id, &reply.render()).await;
            }
            Event::Photo { file_id } => {
                let submitter = submitter_of(message);
                let _ = self
                    .pipeline
                    .handle(chat_id, &submitter, MediaSource::Photo { file_id })
                    .await;
            }
            Event::Document(doc) => {
                let submitter = submitter_of(message);
                let _ = self
                    .pipeline
                    .handle(chat_id, &submitter, MediaSource::Document(doc))
                    .await;
            }
            Event::Unrecognized => {
                self.bot.send_reply(chat_id, &Reply::Help.render()).await;
            }
        }
    }
}

/// Messages without a sender (channel posts) are attributed to the chat.
fn submitter_of(message: &Message) -> Submitter {
    match &message.from {
        Some(user) => Submitter {
            id: user.id.to_string(),
            username: user.username.clone(),
        },
        None => Submitter {
            id: message.chat.id.to_string(),
            username: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgdrop_telegram::{Chat, Document, PhotoSize};

    fn photo(file_id: &str, width: u32) -> PhotoSize {
        PhotoSize {
            file_id: file_id.to_string(),
            file_unique_id: String::new(),
            width,
            height: width,
            file_size: None,
        }
    }

    fn document() -> Document {
        Document {
            file_id: "doc".to_string(),
            file_name: Some("scan.png".to_string()),
            mime_type: Some("image/png".to_string()),
            file_size: Some(1000),
        }
    }

    fn message() -> Message {
        Message {
            message_id: 1,
            chat: Chat { id: 5 },
            ..Default::default()
        }
    }

    #[test]
    fn commands_are_normalized() {
        assert_eq!(command_name("/start"), Some("start".to_string()));
        assert_eq!(command_name("/Start@ImgBot hello"), Some("start".to_string()));
        assert_eq!(command_name("  /help"), Some("help".to_string()));
        assert_eq!(command_name("hello /start"), None);
        assert_eq!(command_name("/"), None);
        assert_eq!(command_name("/@bot"), None);
    }

    #[test]
    fn command_wins_over_media() {
        let msg = Message {
            text: Some("/start".to_string()),
            photo: vec![photo("p", 10)],
            document: Some(document()),
            ..message()
        };
        assert_eq!(
            classify(&msg),
            Event::Command {
                name: "start".to_string()
            }
        );
    }

    #[test]
    fn photo_wins_over_document_and_uses_largest_size() {
        let msg = Message {
            photo: vec![photo("small", 90), photo("medium", 320), photo("large", 1280)],
            document: Some(document()),
            ..message()
        };
        assert_eq!(
            classify(&msg),
            Event::Photo {
                file_id: "large".to_string()
            }
        );
    }

    #[test]
    fn document_carries_declared_metadata() {
        let msg = Message {
            document: Some(document()),
            ..message()
        };
        assert_eq!(
            classify(&msg),
            Event::Document(DocumentEvent {
                file_id: "doc".to_string(),
                declared_name: Some("scan.png".to_string()),
                declared_mime: Some("image/png".to_string()),
                declared_size: Some(1000),
            })
        );
    }

    #[test]
    fn plain_text_is_unrecognized() {
        let msg = Message {
            text: Some("hello there".to_string()),
            ..message()
        };
        assert_eq!(classify(&msg), Event::Unrecognized);
        assert_eq!(classify(&message()), Event::Unrecognized);
    }

    #[test]
    fn sender_falls_back_to_chat() {
        assert_eq!(submitter_of(&message()).id, "5");
    }
}
