use std::env;
use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use secrecy::SecretString;
use serde::Deserialize;
use tracing::info;

const FOLLOW_UP_INSTRUCTION: &str = "You generate likely follow-up questions for the given question and answer, \
each paired with a structured, concise answer the presenter can read aloud as is. \
Prefer questions examiners commonly ask about this kind of topic. \
Use supporting data, statistics or comparisons only when they appear in the input, and never introduce figures or outcomes it does not mention. \
Write in the first person singular and keep the tone natural rather than stiff.";

#[derive(Deserialize)]
#[serde(default)]
pub struct Config {
    pub openai_api_key: String,
    pub telegram_token: String,
    pub assistant_id: String,
    pub assistant_url: String,
    pub chat_url: String,
    pub telegram_api_url: String,
    pub follow_up: FollowUpConfig,
    pub replies: Replies,
    pub display: DisplayConfig,
    pub notify_interval_ms: u64,
    pub polling_timeout_secs: u64,
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct FollowUpConfig {
    pub model: String,
    pub instruction: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: i32,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Replies {
    pub greeting: String,
    pub processing: String,
    pub busy: String,
    pub done: String,
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct DisplayConfig {
    pub poll_interval_ms: u64,
    pub viewer: Option<ViewerConfig>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ViewerConfig {
    pub command: Vec<String>,
    #[serde(default)]
    pub styled: bool,
}

pub struct Secrets {
    pub openai_api_key: SecretString,
    pub telegram_token: SecretString,
    pub assistant_id: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            openai_api_key: "env:OPENAI_API_KEY".to_string(),
            telegram_token: "env:TELEGRAM_TOKEN".to_string(),
            assistant_id: "env:ASSISTANT_ID".to_string(),
            assistant_url: "https://api.openai.com/v1/threads/runs".to_string(),
            chat_url: "https://api.openai.com/v1/chat/completions".to_string(),
            telegram_api_url: "https://api.telegram.org".to_string(),
            follow_up: FollowUpConfig::default(),
            replies: Replies::default(),
            display: DisplayConfig::default(),
            notify_interval_ms: 1000,
            polling_timeout_secs: 30,
        }
    }
}

impl Default for FollowUpConfig {
    fn default() -> Self {
        FollowUpConfig {
            model: "gpt-4o-mini".to_string(),
            instruction: FOLLOW_UP_INSTRUCTION.to_string(),
            temperature: 1.0,
            top_p: 1.0,
            max_tokens: 2048,
        }
    }
}

impl Default for Replies {
    fn default() -> Self {
        Replies {
            greeting: "Hi! Send me a message to process with OpenAI.".to_string(),
            processing: "Processing your request...".to_string(),
            busy: "I'm still processing the previous request. Please wait.".to_string(),
            done: "Done".to_string(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            poll_interval_ms: 100,
            viewer: None,
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(path) => {
                info!("load config, path={}", path.to_string_lossy());
                framework::json::load_file(path)
            }
            None => Ok(Config::default()),
        }
    }

    pub fn secrets(&self) -> Result<Secrets> {
        Ok(Secrets {
            openai_api_key: SecretString::from(resolve("openai_api_key", &self.openai_api_key)?),
            telegram_token: SecretString::from(resolve("telegram_token", &self.telegram_token)?),
            assistant_id: resolve("assistant_id", &self.assistant_id)?,
        })
    }
}

/// `env:NAME` reads the variable NAME, anything else is taken literally.
fn resolve(name: &str, value: &str) -> Result<String> {
    let resolved = match value.strip_prefix("env:") {
        Some(variable) => {
            env::var(variable).with_context(|| format!("required setting is missing, name={name}, env={variable}"))?
        }
        None => value.to_string(),
    };
    if resolved.trim().is_empty() {
        bail!("required setting is empty, name={name}");
    }
    Ok(resolved)
}
