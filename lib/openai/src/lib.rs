use std::fmt;

use anyhow::Result;
use anyhow::anyhow;
use framework::http_client::HTTP_CLIENT;
use framework::json;
use reqwest::Response;
use serde::Serialize;
use tracing::info;

pub mod assistant;
pub mod assistant_api;
pub mod chat;
pub mod chat_api;

async fn call_api<T>(url: &str, api_key: &str, headers: &[(&'static str, &str)], request: &T) -> Result<Response>
where
    T: Serialize + fmt::Debug,
{
    let body = json::to_json(request)?;
    let mut http_request = HTTP_CLIENT
        .post(url)
        .header("Content-Type", "application/json")
        .header("api-key", api_key) // azure api use header
        .bearer_auth(api_key);
    for (name, value) in headers {
        http_request = http_request.header(*name, *value);
    }
    let response = http_request.body(body.clone()).send().await?;

    let status = response.status();
    if status != 200 {
        info!("body={}", body);
        let response_text = response.text().await?;
        return Err(anyhow!("failed to call api, status={status}, response={response_text}"));
    }

    Ok(response)
}
