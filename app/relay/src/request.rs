use uuid::Uuid;

/// Where replies for a request go: the chat, threaded under the originating message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Originator {
    pub chat_id: i64,
    pub message_id: i64,
}

#[derive(Debug, Clone)]
pub struct Request {
    pub id: Uuid,
    pub originator: Originator,
    pub message: String,
}

impl Request {
    pub fn new(originator: Originator, message: String) -> Self {
        Request {
            id: Uuid::now_v7(),
            originator,
            message,
        }
    }
}
