use std::sync::Arc;

use anyhow::Result;
use framework::task;
use tracing::Instrument;
use tracing::info;
use tracing::info_span;
use tracing::warn;

use crate::config::Replies;
use crate::display::DisplayController;
use crate::gate::RequestGate;
use crate::platform::Messenger;
use crate::request::Originator;
use crate::request::Request;
use crate::worker::StreamWorker;

#[derive(Debug)]
pub enum Inbound {
    Start(Originator),
    Text(Request),
}

pub struct RequestDispatcher {
    gate: Arc<RequestGate>,
    worker: Arc<StreamWorker>,
    display: Arc<DisplayController>,
    messenger: Arc<dyn Messenger>,
    replies: Arc<Replies>,
}

impl RequestDispatcher {
    pub fn new(
        gate: Arc<RequestGate>,
        worker: Arc<StreamWorker>,
        display: Arc<DisplayController>,
        messenger: Arc<dyn Messenger>,
        replies: Arc<Replies>,
    ) -> Self {
        RequestDispatcher {
            gate,
            worker,
            display,
            messenger,
            replies,
        }
    }

    /// Returns once the immediate reply is sent; accepted requests keep streaming in the background.
    pub async fn handle(&self, inbound: Inbound) -> Result<()> {
        match inbound {
            Inbound::Start(originator) => self.messenger.reply(&originator, &self.replies.greeting).await,
            Inbound::Text(request) => self.dispatch(request).await,
        }
    }

    async fn dispatch(&self, request: Request) -> Result<()> {
        let originator = request.originator;
        let span = info_span!("request", request_id = %request.id, chat_id = originator.chat_id);

        let Some(permit) = self.gate.try_acquire() else {
            info!(parent: &span, "gate busy, drop message");
            return self.messenger.reply(&originator, &self.replies.busy).await;
        };
        info!(parent: &span, "received message, message={}", request.message);

        let worker = Arc::clone(&self.worker);
        task::spawn(
            async move {
                worker.run(request, permit).await;
                Ok(())
            }
            .instrument(span),
        );

        match self.display.ensure_active() {
            Ok(true) => info!("display surface requested"),
            Ok(false) => {}
            Err(err) => warn!("failed to start display, error={err:?}"),
        }

        self.messenger.reply(&originator, &self.replies.processing).await
    }
}
