//! Telegram polling loop startup

use imgdrop_core::Config;
use imgdrop_db::ImageStore;
use imgdrop_storage::Storage;
use imgdrop_telegram::{BotApi, TelegramClient};
use imgdrop_worker::{IngestionPipeline, PollerConfig, PollerHandle, PollingLoop, UpdateDispatcher};
use std::sync::Arc;

/// Wire the client, pipeline and dispatcher and start polling.
///
/// Without a usable bot token the loop is not started and the web surface
/// keeps serving what is already stored.
pub fn start_polling(
    config: &Config,
    storage: Arc<dyn Storage>,
    store: Arc<dyn ImageStore>,
) -> Option<PollerHandle> {
    let client = match TelegramClient::from_config(config) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(
                error = %e,
                "Telegram bot token is not usable, polling loop not started"
            );
            return None;
        }
    };

    let bot: Arc<dyn BotApi> = Arc::new(client);
    let pipeline = Arc::new(IngestionPipeline::from_config(
        config,
        bot.clone(),
        storage,
        store,
    ));
    let dispatcher = Arc::new(UpdateDispatcher::new(bot.clone(), pipeline));

    let handle = PollingLoop::new(bot, dispatcher, PollerConfig::from_config(config)).start();
    tracing::info!(
        api_url = %config.telegram_api_url(),
        drop_pending_updates = config.drop_pending_updates(),
        "Telegram polling loop started"
    );

    Some(handle)
}
