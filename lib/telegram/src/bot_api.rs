use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct GetUpdatesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    pub timeout: u64,
    pub allowed_updates: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageRequest {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_parameters: Option<ReplyParameters>,
}

#[derive(Debug, Serialize)]
pub struct ReplyParameters {
    pub message_id: i64,
    pub allow_sending_without_reply: bool,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
    pub entities: Option<Vec<MessageEntity>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MessageEntity {
    pub r#type: String,
    pub offset: i64,
    pub length: i64,
}

impl Message {
    /// Name of the bot command the message starts with, `/start@relay_bot now` gives `start`.
    pub fn command(&self) -> Option<&str> {
        let text = self.text.as_deref()?;
        let starts_with_command = self
            .entities
            .iter()
            .flatten()
            .any(|entity| entity.r#type == "bot_command" && entity.offset == 0);
        if !starts_with_command {
            return None;
        }
        let command = text.strip_prefix('/')?.split_whitespace().next()?;
        command.split('@').next()
    }
}

#[cfg(test)]
mod tests {
    use framework::json;

    use super::*;

    #[test]
    fn reads_text_update() {
        let update: Update = json::from_json(
            r#"{"update_id":10,"message":{"message_id":7,"date":1,"chat":{"id":42,"type":"private"},"from":{"id":5,"is_bot":false,"first_name":"a","username":"ann"},"text":"what is 6*7"}}"#,
        )
        .unwrap();

        let message = update.message.unwrap();
        assert_eq!(update.update_id, 10);
        assert_eq!(message.chat.id, 42);
        assert_eq!(message.text.as_deref(), Some("what is 6*7"));
        assert_eq!(message.command(), None);
    }

    #[test]
    fn reads_bot_commands() {
        let update: Update = json::from_json(
            r#"{"update_id":11,"message":{"message_id":8,"chat":{"id":42},"text":"/start@relay_bot now","entities":[{"type":"bot_command","offset":0,"length":16}]}}"#,
        )
        .unwrap();

        assert_eq!(update.message.unwrap().command(), Some("start"));
    }

    #[test]
    fn slash_without_command_entity_is_text() {
        let update: Update =
            json::from_json(r#"{"update_id":12,"message":{"message_id":9,"chat":{"id":42},"text":"/ is a slash"}}"#)
                .unwrap();

        assert_eq!(update.message.unwrap().command(), None);
    }

    #[test]
    fn writes_reply_request() {
        let request = SendMessageRequest {
            chat_id: 42,
            text: "Done".to_string(),
            reply_parameters: Some(ReplyParameters {
                message_id: 7,
                allow_sending_without_reply: true,
            }),
        };
        assert_eq!(
            json::to_json(&request).unwrap(),
            r#"{"chat_id":42,"text":"Done","reply_parameters":{"message_id":7,"allow_sending_without_reply":true}}"#
        );
    }
}
