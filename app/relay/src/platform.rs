use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use telegram::bot::Bot;
use telegram::bot_api::Message;
use telegram::bot_api::Update;
use tracing::debug;
use tracing::warn;

use crate::dispatcher::Inbound;
use crate::dispatcher::RequestDispatcher;
use crate::request::Originator;
use crate::request::Request;

pub const RETRY_DELAY: Duration = Duration::from_secs(5);

#[async_trait]
pub trait Messenger: Send + Sync {
    async fn reply(&self, originator: &Originator, text: &str) -> Result<()>;
}

pub struct TelegramMessenger {
    bot: Arc<Bot>,
}

impl TelegramMessenger {
    pub fn new(bot: Arc<Bot>) -> Self {
        TelegramMessenger { bot }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn reply(&self, originator: &Originator, text: &str) -> Result<()> {
        self.bot
            .send_message(originator.chat_id, text, Some(originator.message_id))
            .await?;
        Ok(())
    }
}

#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Updates after `offset`, waiting up to `timeout` seconds for one to arrive.
    async fn updates(&self, offset: Option<i64>, timeout: u64) -> Result<Vec<Update>>;
}

#[async_trait]
impl UpdateSource for Bot {
    async fn updates(&self, offset: Option<i64>, timeout: u64) -> Result<Vec<Update>> {
        self.get_updates(offset, timeout).await
    }
}

/// Long polls until the process stops. Failed polls are retried after `retry_delay`.
pub async fn poll_updates(
    source: &dyn UpdateSource,
    dispatcher: &RequestDispatcher,
    timeout: u64,
    retry_delay: Duration,
) -> Result<()> {
    let mut offset = None;
    loop {
        let updates = match source.updates(offset, timeout).await {
            Ok(updates) => updates,
            Err(err) => {
                warn!("failed to poll updates, offset={offset:?}, error={err:?}");
                tokio::time::sleep(retry_delay).await;
                continue;
            }
        };

        for update in updates {
            offset = Some(update.update_id + 1);
            let Some(inbound) = update.message.as_ref().and_then(inbound) else {
                continue;
            };
            if let Err(err) = dispatcher.handle(inbound).await {
                warn!("failed to reply, error={err:?}");
            }
        }
    }
}

fn inbound(message: &Message) -> Option<Inbound> {
    let originator = Originator {
        chat_id: message.chat.id,
        message_id: message.message_id,
    };
    match message.command() {
        Some("start") => Some(Inbound::Start(originator)),
        Some(command) => {
            debug!("ignore command, command={command}");
            None
        }
        None => message
            .text
            .as_ref()
            .map(|text| Inbound::Text(Request::new(originator, text.clone()))),
    }
}
