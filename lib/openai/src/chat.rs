use anyhow::Result;
use framework::http_client::EventSource;
use framework::http_client::ResponseExt;
use framework::json;
use framework::task;
use tokio::sync::mpsc;
use tokio::sync::mpsc::Sender;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::call_api;
use crate::chat_api::ChatRequest;
use crate::chat_api::ChatRequestMessage;
use crate::chat_api::ChatStreamResponse;
use crate::chat_api::Role;

pub struct Chat {
    pub config: ChatConfig,
}

#[derive(Default, Debug, Clone)]
pub struct ChatConfig {
    url: String,
    model: String,
    api_key: String,

    pub system_message: Option<String>,
    pub top_p: Option<f32>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

impl Chat {
    pub fn new(url: String, api_key: String, model: String) -> Self {
        Chat {
            config: ChatConfig {
                url,
                model,
                api_key,
                ..ChatConfig::default()
            },
        }
    }

    pub async fn generate_stream(
        &self,
        messages: Vec<ChatRequestMessage>,
    ) -> Result<ReceiverStream<Result<String>>> {
        let request = chat_request(&self.config, messages);
        let http_response = call_api(&self.config.url, &self.config.api_key, &[], &request).await?;

        let (tx, rx) = mpsc::channel(64);
        task::spawn(async move {
            if let Err(err) = read_sse_response(http_response.events(), &tx).await {
                // receiver may already be gone, nothing left to report to then
                let _ = tx.send(Err(err)).await;
            }
            Ok(())
        });
        Ok(ReceiverStream::new(rx))
    }
}

fn chat_request(config: &ChatConfig, messages: Vec<ChatRequestMessage>) -> ChatRequest {
    let mut request_messages = Vec::with_capacity(messages.len() + 1);
    if let Some(ref system_message) = config.system_message {
        request_messages.push(ChatRequestMessage::new_message(Role::System, system_message.clone()));
    }
    request_messages.extend(messages);

    ChatRequest {
        model: config.model.clone(),
        messages: request_messages,
        temperature: config.temperature.unwrap_or(1.0),
        top_p: config.top_p.unwrap_or(1.0),
        stream: true,
        max_tokens: config.max_tokens,
        presence_penalty: 0.0,
        frequency_penalty: 0.0,
    }
}

async fn read_sse_response(mut event_source: EventSource, tx: &Sender<Result<String>>) -> Result<()> {
    while let Some(event) = event_source.next().await {
        let event = event?;

        if event.data == "[DONE]" {
            break;
        }

        if let Some(content) = stream_content(&event.data)? {
            if tx.send(Ok(content)).await.is_err() {
                debug!("chat stream receiver dropped, stop reading");
                return Ok(());
            }
        }
    }
    Ok(())
}

// only support one choice, n=1
fn stream_content(data: &str) -> Result<Option<String>> {
    let response: ChatStreamResponse = json::from_json(data)?;
    Ok(response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty()))
}
