use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing::warn;

use crate::channel::CompletionReceiver;
use crate::platform::Messenger;

pub struct CompletionNotifier {
    completions: CompletionReceiver,
    messenger: Arc<dyn Messenger>,
    done: String,
}

impl CompletionNotifier {
    pub fn new(completions: CompletionReceiver, messenger: Arc<dyn Messenger>, done: String) -> Self {
        CompletionNotifier {
            completions,
            messenger,
            done,
        }
    }

    /// Ticks until cancelled, then makes one last pass so no finished request goes unanswered.
    pub async fn run(mut self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.notify().await;
                }
                _ = cancel.cancelled() => {
                    self.notify().await;
                    return;
                }
            }
        }
    }

    pub async fn notify(&mut self) -> usize {
        if self.completions.is_empty() {
            return 0;
        }
        let signals = self.completions.drain();
        for signal in &signals {
            let chat_id = signal.originator.chat_id;
            match self.messenger.reply(&signal.originator, &self.done).await {
                Ok(()) => info!("sent done reply, chat_id={chat_id}"),
                Err(err) => warn!("failed to send done reply, chat_id={chat_id}, error={err:?}"),
            }
        }
        signals.len()
    }
}
