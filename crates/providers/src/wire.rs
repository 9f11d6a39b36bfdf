//! Chat-completions wire format shared by the OpenAI-compatible and
//! Azure-deployment providers.
//!
//! Both dialects send the same `{messages: [{role, content}]}` body and
//! answer with the same `choices[0].message.content` shape; only the URL
//! and auth header differ.

use lorebot_core::error::ProviderError;
use lorebot_core::message::Message;
use lorebot_core::provider::{ProviderRequest, ProviderResponse, Usage};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ApiMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

/// Convert our Message types to the API format.
pub(crate) fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
    messages
        .iter()
        .map(|m| ApiMessage {
            role: m.role.as_str().into(),
            content: Some(m.content.clone()),
        })
        .collect()
}

/// Build the JSON request body. `model` is omitted for Azure, where the
/// deployment in the URL selects it.
pub(crate) fn request_body(request: &ProviderRequest, include_model: bool) -> serde_json::Value {
    let mut body = serde_json::json!({
        "messages": to_api_messages(&request.messages),
    });

    if include_model {
        body["model"] = serde_json::json!(request.model);
    }

    if let Some(temperature) = request.temperature {
        body["temperature"] = serde_json::json!(temperature);
    }

    if let Some(max_tokens) = request.max_tokens {
        body["max_tokens"] = serde_json::json!(max_tokens);
    }

    body
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<ApiChoice>,
    #[serde(default)]
    pub usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiChoice {
    pub message: ApiMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Map a raw HTTP response onto a [`ProviderResponse`].
pub(crate) async fn read_completion(
    provider: &str,
    requested_model: &str,
    response: reqwest::Response,
) -> Result<ProviderResponse, ProviderError> {
    let status = response.status().as_u16();

    if status == 429 {
        let retry_after_secs = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(5);
        return Err(ProviderError::RateLimited { retry_after_secs });
    }

    if status == 401 || status == 403 {
        return Err(ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ));
    }

    if !(200..300).contains(&status) {
        let error_body = response.text().await.unwrap_or_default();
        warn!(provider, status, body = %error_body, "Provider returned error");
        return Err(ProviderError::ApiError {
            status_code: status,
            message: error_body,
        });
    }

    let api_response: ApiResponse = response.json().await.map_err(|e| ProviderError::ApiError {
        status_code: status,
        message: format!("Failed to parse response: {e}"),
    })?;

    parse_completion(requested_model, api_response)
}

pub(crate) fn parse_completion(
    requested_model: &str,
    api_response: ApiResponse,
) -> Result<ProviderResponse, ProviderError> {
    let choice = api_response
        .choices
        .into_iter()
        .next()
        .ok_or(ProviderError::EmptyResponse)?;

    let message = Message::assistant(choice.message.content.unwrap_or_default());

    let usage = api_response.usage.map(|u| Usage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    let model = if api_response.model.is_empty() {
        requested_model.to_string()
    } else {
        api_response.model
    };

    Ok(ProviderResponse {
        message,
        usage,
        model,
    })
}
