use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatRequestMessage>,
    pub temperature: f32,
    pub top_p: f32,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i32>,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
}

#[derive(Debug, Serialize, Clone)]
pub struct ChatRequestMessage {
    pub role: Role,
    pub content: String,
}

impl ChatRequestMessage {
    pub fn new_message(role: Role, content: String) -> Self {
        ChatRequestMessage { role, content }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "system")]
    System,
}

#[derive(Debug, Deserialize)]
pub struct ChatStreamResponse {
    pub choices: Vec<ChatStreamCompletionChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatStreamCompletionChoice {
    pub delta: ChatStreamResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChatStreamResponseMessage {
    pub content: Option<String>,
}
