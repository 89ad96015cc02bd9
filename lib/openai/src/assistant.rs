use anyhow::Result;
use framework::http_client::EventSource;
use framework::http_client::ResponseExt;
use framework::http_client::ServerSentEvent;
use framework::json;
use framework::task;
use tokio::sync::mpsc;
use tokio::sync::mpsc::Sender;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;
use tracing::trace;

use crate::assistant_api::CreateThreadAndRunRequest;
use crate::assistant_api::MessageDeltaEvent;
use crate::assistant_api::RunFailedEvent;
use crate::assistant_api::ThreadMessage;
use crate::assistant_api::ThreadRequest;
use crate::call_api;
use crate::chat_api::Role;

const ASSISTANTS_BETA: (&str, &str) = ("OpenAI-Beta", "assistants=v2");

/// Runs a preconfigured assistant on a fresh single-message thread.
pub struct Assistant {
    url: String,
    api_key: String,
    assistant_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Delta(String),
    MessageCompleted,
    Error(String),
}

impl Assistant {
    pub fn new(url: String, api_key: String, assistant_id: String) -> Self {
        Assistant {
            url,
            api_key,
            assistant_id,
        }
    }

    pub async fn run_stream(&self, message: String) -> Result<ReceiverStream<Result<RunEvent>>> {
        let request = CreateThreadAndRunRequest {
            assistant_id: self.assistant_id.clone(),
            thread: ThreadRequest {
                messages: vec![ThreadMessage {
                    role: Role::User,
                    content: message,
                }],
            },
            stream: true,
        };
        let http_response = call_api(&self.url, &self.api_key, &[ASSISTANTS_BETA], &request).await?;

        let (tx, rx) = mpsc::channel(64);
        task::spawn(async move {
            if let Err(err) = read_sse_response(http_response.events(), &tx).await {
                let _ = tx.send(Err(err)).await;
            }
            Ok(())
        });
        Ok(ReceiverStream::new(rx))
    }
}

async fn read_sse_response(mut event_source: EventSource, tx: &Sender<Result<RunEvent>>) -> Result<()> {
    while let Some(event) = event_source.next().await {
        let event = event?;
        trace!(event = ?event.event, "[assistant] data={}", event.data);

        if event.data == "[DONE]" {
            break;
        }

        if let Some(run_event) = run_event(&event)? {
            if tx.send(Ok(run_event)).await.is_err() {
                debug!("assistant stream receiver dropped, stop reading");
                return Ok(());
            }
        }
    }
    Ok(())
}

fn run_event(event: &ServerSentEvent) -> Result<Option<RunEvent>> {
    match event.event.as_deref() {
        Some("thread.message.delta") => {
            let delta: MessageDeltaEvent = json::from_json(&event.data)?;
            let text: String = delta
                .delta
                .content
                .unwrap_or_default()
                .into_iter()
                .filter(|block| block.r#type == "text")
                .filter_map(|block| block.text.and_then(|text| text.value))
                .collect();
            Ok((!text.is_empty()).then_some(RunEvent::Delta(text)))
        }
        Some("thread.message.completed") => Ok(Some(RunEvent::MessageCompleted)),
        Some("thread.run.failed") => {
            let run: RunFailedEvent = json::from_json(&event.data)?;
            let message = match run.last_error {
                Some(error) => match error.code {
                    Some(code) => format!("run failed, code={code}, message={}", error.message),
                    None => format!("run failed, message={}", error.message),
                },
                None => "run failed".to_string(),
            };
            Ok(Some(RunEvent::Error(message)))
        }
        Some("error") => Ok(Some(RunEvent::Error(error_message(&event.data)))),
        _ => Ok(None),
    }
}

fn error_message(data: &str) -> String {
    let value: serde_json::Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(_) => return data.to_string(),
    };
    value
        .pointer("/message")
        .or_else(|| value.pointer("/error/message"))
        .and_then(|message| message.as_str())
        .map(|message| message.to_string())
        .unwrap_or_else(|| data.to_string())
}
