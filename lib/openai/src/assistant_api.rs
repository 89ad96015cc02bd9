use serde::Deserialize;
use serde::Serialize;

use crate::chat_api::Role;

#[derive(Debug, Serialize)]
pub struct CreateThreadAndRunRequest {
    pub assistant_id: String,
    pub thread: ThreadRequest,
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub struct ThreadRequest {
    pub messages: Vec<ThreadMessage>,
}

#[derive(Debug, Serialize)]
pub struct ThreadMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageDeltaEvent {
    pub delta: MessageDelta,
}

#[derive(Debug, Deserialize)]
pub struct MessageDelta {
    pub content: Option<Vec<MessageDeltaContent>>,
}

#[derive(Debug, Deserialize)]
pub struct MessageDeltaContent {
    pub r#type: String,
    pub text: Option<TextDelta>,
}

#[derive(Debug, Deserialize)]
pub struct TextDelta {
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RunFailedEvent {
    pub last_error: Option<RunError>,
}

#[derive(Debug, Deserialize)]
pub struct RunError {
    pub code: Option<String>,
    pub message: String,
}
