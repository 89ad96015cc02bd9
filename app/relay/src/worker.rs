use std::sync::Arc;

use anyhow::Result;
use anyhow::bail;
use futures::StreamExt;
use openai::assistant::RunEvent;
use tracing::debug;
use tracing::error;
use tracing::info;

use crate::channel::CompletionSender;
use crate::channel::CompletionSignal;
use crate::channel::DisplayEvent;
use crate::channel::MessageSender;
use crate::completion::CompletionService;
use crate::gate::GatePermit;
use crate::request::Request;

const RULE: &str = "______________________________________";

pub struct StreamWorker {
    service: Arc<dyn CompletionService>,
    messages: MessageSender,
    completions: CompletionSender,
    follow_up: FollowUpWorker,
}

impl StreamWorker {
    pub fn new(service: Arc<dyn CompletionService>, messages: MessageSender, completions: CompletionSender) -> Self {
        let follow_up = FollowUpWorker {
            service: Arc::clone(&service),
            messages: messages.clone(),
        };
        StreamWorker {
            service,
            messages,
            completions,
            follow_up,
        }
    }

    /// Streams the answer and its follow-up for a request that holds the gate, then gives the gate back.
    pub async fn run(&self, request: Request, permit: GatePermit) {
        info!("stream started");
        match self.stream(&request).await {
            Ok(()) => {
                self.messages.push(DisplayEvent::EndOfStream);
                self.completions.push(CompletionSignal {
                    originator: request.originator,
                });
                info!("request completed");
            }
            Err(err) => {
                // failed requests get no completion signal, the originator is never told "done"
                error!("stream failed, error={err:?}");
                self.messages.push(DisplayEvent::Error(format!("An error occurred: {err:#}")));
            }
        }
        permit.release();
    }

    async fn stream(&self, request: &Request) -> Result<()> {
        let mut stream = self.service.answer(&request.message).await?;
        self.messages.push(DisplayEvent::Separator(format!(
            "\n\nAnswers for {}:\n{RULE}\n\n",
            request.message
        )));

        let mut answer = String::new();
        let completed = loop {
            match stream.next().await {
                Some(event) => match event? {
                    RunEvent::Delta(text) => {
                        answer.push_str(&text);
                        self.messages.push(DisplayEvent::Text(text));
                    }
                    RunEvent::MessageCompleted => break true,
                    RunEvent::Error(message) => bail!("{message}"),
                },
                None => break false,
            }
        };
        // anything the run sends after the first completed message is not displayed
        drop(stream);

        if !completed {
            bail!("stream ended before the message completed");
        }
        debug!("answer completed, length={}", answer.len());

        self.follow_up.run(&request.message, &answer).await;
        Ok(())
    }
}

pub struct FollowUpWorker {
    service: Arc<dyn CompletionService>,
    messages: MessageSender,
}

impl FollowUpWorker {
    /// Never fails: problems are shown on the display and the caller carries on.
    pub async fn run(&self, question: &str, answer: &str) {
        self.messages.push(DisplayEvent::Separator(format!(
            "\n\nPossible Follow-up Questions and Answers:\n{RULE}\n\n"
        )));

        if let Err(err) = self.stream(question, answer).await {
            error!("follow-up failed, error={err:?}");
            self.messages.push(DisplayEvent::Error(format!(
                "\nAn error occurred while generating follow-up: {err:#}\n"
            )));
        }
    }

    async fn stream(&self, question: &str, answer: &str) -> Result<()> {
        let mut stream = self.service.follow_up(question, answer).await?;
        while let Some(token) = stream.next().await {
            self.messages.push(DisplayEvent::Text(token?));
        }
        Ok(())
    }
}
