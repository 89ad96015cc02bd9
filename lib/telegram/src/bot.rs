use std::fmt;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use framework::http_client::HTTP_CLIENT;
use framework::json;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::bot_api::ApiResponse;
use crate::bot_api::GetUpdatesRequest;
use crate::bot_api::Message;
use crate::bot_api::ReplyParameters;
use crate::bot_api::SendMessageRequest;
use crate::bot_api::Update;

// the shared client only limits connecting, every telegram call is bounded here
const SEND_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_GRACE: Duration = Duration::from_secs(10);

pub struct Bot {
    url: String,
}

impl Bot {
    pub fn with_api_url(api_url: &str, token: &str) -> Self {
        Bot {
            url: format!("{}/bot{token}", api_url.trim_end_matches('/')),
        }
    }

    /// Long polls for updates after `offset`, waiting up to `timeout` seconds on the server.
    pub async fn get_updates(&self, offset: Option<i64>, timeout: u64) -> Result<Vec<Update>> {
        let request = GetUpdatesRequest {
            offset,
            timeout,
            allowed_updates: vec!["message"],
        };
        self.call("getUpdates", &request, poll_timeout(timeout)).await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str, reply_to: Option<i64>) -> Result<Message> {
        let request = SendMessageRequest {
            chat_id,
            text: text.to_string(),
            reply_parameters: reply_to.map(|message_id| ReplyParameters {
                message_id,
                allow_sending_without_reply: true,
            }),
        };
        self.call("sendMessage", &request, SEND_TIMEOUT).await
    }

    async fn call<Request, T>(&self, method: &str, request: &Request, timeout: Duration) -> Result<T>
    where
        Request: Serialize + fmt::Debug,
        T: DeserializeOwned,
    {
        debug!(method, "[telegram] call api");
        let body = json::to_json(request)?;
        let http_response = HTTP_CLIENT
            .post(format!("{}/{method}", self.url))
            .header("Content-Type", "application/json")
            .timeout(timeout)
            .body(body)
            .send()
            .await
            // the request url carries the bot token
            .map_err(|err| err.without_url())
            .with_context(|| format!("failed to call telegram api, method={method}"))?;

        let status = http_response.status();
        let response_text = http_response.text().await.map_err(|err| err.without_url())?;
        let response: ApiResponse<T> = json::from_json(&response_text)
            .with_context(|| format!("unexpected telegram response, method={method}, status={status}"))?;
        api_result(method, response)
    }
}

fn poll_timeout(timeout: u64) -> Duration {
    Duration::from_secs(timeout) + POLL_GRACE
}

fn api_result<T>(method: &str, response: ApiResponse<T>) -> Result<T> {
    if !response.ok {
        return Err(anyhow!(
            "telegram api failed, method={method}, error_code={}, description={}",
            response.error_code.unwrap_or_default(),
            response.description.unwrap_or_default()
        ));
    }
    response
        .result
        .with_context(|| format!("telegram api returned no result, method={method}"))
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;

    #[test]
    fn builds_method_url_from_token() {
        let bot = Bot::with_api_url("http://localhost:8081/", "123:abc");
        assert_eq!(bot.url, "http://localhost:8081/bot123:abc");
    }

    #[test]
    fn reports_api_errors() {
        let response: ApiResponse<Vec<Update>> = json::from_json(
            r#"{"ok":false,"error_code":409,"description":"Conflict: terminated by other getUpdates request"}"#,
        )
        .unwrap();
        let error = api_result("getUpdates", response).unwrap_err();
        assert!(format!("{error}").contains("error_code=409"));
    }

    #[test]
    fn returns_result_on_success() {
        let response: ApiResponse<Vec<Update>> =
            json::from_json(r#"{"ok":true,"result":[{"update_id":1},{"update_id":2}]}"#).unwrap();
        let updates = api_result("getUpdates", response).unwrap();
        assert_eq!(updates.len(), 2);
        assert!(updates[0].message.is_none());
    }

    #[test]
    fn long_poll_gets_grace_over_server_timeout() {
        assert_eq!(poll_timeout(30), Duration::from_secs(40));
        assert_eq!(poll_timeout(0), POLL_GRACE);
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        // accepts connections and never answers
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut connections = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                connections.push(socket);
            }
        });

        let bot = Bot::with_api_url(&format!("http://{address}"), "123:abc");
        let request = GetUpdatesRequest {
            offset: None,
            timeout: 0,
            allowed_updates: vec!["message"],
        };
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            bot.call::<_, Vec<Update>>("getUpdates", &request, Duration::from_millis(200)),
        )
        .await;

        let error = result.expect("call did not give up on its own").unwrap_err();
        let message = format!("{error:?}");
        assert!(message.contains("method=getUpdates"));
        assert!(!message.contains("123:abc"));
        server.abort();
    }
}
