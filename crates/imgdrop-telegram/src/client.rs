use async_trait::async_trait;
use futures::TryStreamExt;
use imgdrop_core::Config;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

use crate::api::{BotApi, FileDescriptor, FileStream};
use crate::error::TransportError;
use crate::types::{ApiResponse, TgFile, Update};

/// Extra time on top of the long-poll wait before the HTTP call gives up.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Used when a 429 carries no `retry_after`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// Bot API client over HTTPS
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
    request_timeout: Duration,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_url", &self.api_url)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    pub fn new(
        api_url: impl Into<String>,
        token: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            request_timeout,
        })
    }

    /// Build a client from configuration. Fails when the bot token is unusable.
    pub fn from_config(config: &Config) -> Result<Self, anyhow::Error> {
        let token = config.bot_token()?;
        Ok(Self::new(
            config.telegram_api_url(),
            token,
            config.http_timeout(),
        )?)
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    fn file_url(&self, path: &str) -> String {
        format!(
            "{}/file/bot{}/{}",
            self.api_url,
            self.token,
            path.trim_start_matches('/')
        )
    }

    /// Call one Bot API method and unwrap its envelope.
    async fn call<P, T>(&self, method: &str, params: &P, timeout: Duration) -> Result<T, TransportError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.method_url(method))
            .timeout(timeout)
            .json(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let envelope = serde_json::from_str::<ApiResponse<T>>(&body);

        if status == StatusCode::CONFLICT {
            return Err(TransportError::Conflict);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = envelope
                .ok()
                .and_then(|e| e.parameters)
                .and_then(|p| p.retry_after)
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(TransportError::RateLimited { retry_after });
        }

        let envelope = match envelope {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(TransportError::Status {
                    status: status.as_u16(),
                })
            }
            Err(e) => return Err(TransportError::Decode(e.to_string())),
        };

        if !envelope.ok {
            return Err(TransportError::Api {
                code: envelope.error_code,
                description: envelope
                    .description
                    .unwrap_or_else(|| format!("{} failed", method)),
            });
        }

        envelope
            .result
            .ok_or_else(|| TransportError::Decode(format!("{} returned no result", method)))
    }
}

/// Decode a `getUpdates` batch one element at a time.
///
/// An element that does not match the wire types is kept as an update with
/// no message, so the cursor still moves past its id. Elements without an
/// `update_id` are dropped. The batch fails only when nothing in it carries
/// an id.
fn decode_updates(raw: Vec<serde_json::Value>) -> Result<Vec<Update>, TransportError> {
    let received = raw.len();
    let mut updates = Vec::with_capacity(received);

    for value in raw {
        let update_id = value.get("update_id").and_then(serde_json::Value::as_i64);
        match serde_json::from_value::<Update>(value) {
            Ok(update) => updates.push(update),
            Err(e) => match update_id {
                Some(update_id) => {
                    tracing::warn!(update_id = update_id, error = %e, "Skipping malformed update");
                    updates.push(Update {
                        update_id,
                        message: None,
                    });
                }
                None => tracing::warn!(error = %e, "Dropping update without update_id"),
            },
        }
    }

    if received > 0 && updates.is_empty() {
        return Err(TransportError::Decode(format!(
            "none of {} updates carries an update_id",
            received
        )));
    }

    Ok(updates)
}

#[async_trait]
impl BotApi for TelegramClient {
    async fn fetch_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TransportError> {
        let params = json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        let timeout = Duration::from_secs(timeout_secs) + POLL_GRACE;

        let raw: Vec<serde_json::Value> = self.call("getUpdates", &params, timeout).await?;
        decode_updates(raw)
    }

    async fn fetch_file_descriptor(
        &self,
        file_id: &str,
    ) -> Result<FileDescriptor, TransportError> {
        let file: TgFile = self
            .call("getFile", &json!({ "file_id": file_id }), self.request_timeout)
            .await?;

        let path = file
            .file_path
            .filter(|p| !p.is_empty())
            .ok_or_else(|| TransportError::MissingFilePath(file.file_id.clone()))?;

        Ok(FileDescriptor {
            path,
            size: file.file_size,
        })
    }

    async fn download_file(&self, path: &str) -> Result<FileStream, TransportError> {
        let response = self
            .http
            .get(self.file_url(path))
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }

        Ok(Box::pin(response.bytes_stream().map_err(TransportError::from)))
    }

    async fn send_reply(&self, chat_id: i64, text: &str) {
        let params = json!({
            "chat_id": chat_id,
            "text": text,
            "disable_web_page_preview": true,
        });

        let result: Result<serde_json::Value, TransportError> = self
            .call("sendMessage", &params, self.request_timeout)
            .await;

        if let Err(e) = result {
            tracing::warn!(chat_id = chat_id, error = %e, "Failed to send reply");
        }
    }

    async fn delete_webhook(&self) -> Result<(), TransportError> {
        let _: bool = self
            .call(
                "deleteWebhook",
                &json!({ "drop_pending_updates": false }),
                self.request_timeout,
            )
            .await?;
        Ok(())
    }
}
