use anyhow::Result;
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use openai::assistant::Assistant;
use openai::assistant::RunEvent;
use openai::chat::Chat;
use openai::chat_api::ChatRequestMessage;
use openai::chat_api::Role;

pub type AnswerStream = BoxStream<'static, Result<RunEvent>>;
pub type FollowUpStream = BoxStream<'static, Result<String>>;

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Opens the primary answer stream for a user message.
    async fn answer(&self, message: &str) -> Result<AnswerStream>;

    /// Opens the follow-up stream for a finished question and answer pair.
    async fn follow_up(&self, question: &str, answer: &str) -> Result<FollowUpStream>;
}

pub struct OpenAiCompletion {
    assistant: Assistant,
    chat: Chat,
}

impl OpenAiCompletion {
    pub fn new(assistant: Assistant, chat: Chat) -> Self {
        OpenAiCompletion { assistant, chat }
    }
}

#[async_trait]
impl CompletionService for OpenAiCompletion {
    async fn answer(&self, message: &str) -> Result<AnswerStream> {
        let stream = self.assistant.run_stream(message.to_string()).await?;
        Ok(stream.boxed())
    }

    async fn follow_up(&self, question: &str, answer: &str) -> Result<FollowUpStream> {
        let prompt = follow_up_prompt(question, answer);
        let stream = self
            .chat
            .generate_stream(vec![ChatRequestMessage::new_message(Role::User, prompt)])
            .await?;
        Ok(stream.boxed())
    }
}

fn follow_up_prompt(question: &str, answer: &str) -> String {
    format!("Question: {question}\nAnswer: {answer}")
}
