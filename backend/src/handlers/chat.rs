use std::sync::Arc;

use crate::{
    models::{
        chat::{CompletionChunk, Role, WireMessage},
        error::ApiError,
    },
    utils::{lines::LineBuffer, state::AppState},
};
use axum::{
    body::{Body, Bytes},
    extract::State,
    response::{IntoResponse, Response},
};
use futures::{future, stream, StreamExt};
use http::{header, StatusCode};
use serde_json::{json, Value};
use tracing::{error, info};

const SYSTEM_PROMPT: &str = "You are an AI assistant for AgriVision, a farming assistance app for farmers in Jharkhand, India.

Your role:
- Help farmers with agricultural questions about crops, soil, weather, and farming practices
- Provide information about government schemes like PM-KISAN, Fasal Bima Yojana, and KCC loans
- Assist with queries about Jharkhand-specific farming conditions
- Answer questions about the app's features: Soil Scanner, Crop Analysis, Market Prices, Shop, Services
- Be helpful, friendly, and use simple language
- Support conversations in English, Hindi, and Nagpuri

Keep responses concise and practical for farmers. If asked about specific schemes, mention that they can check the Services section of the app for detailed information and application links.";

fn parse_messages(body: &Bytes) -> Result<Vec<WireMessage>, ApiError> {
    let invalid = || ApiError::new(StatusCode::BAD_REQUEST, "Invalid messages format");

    let body: Value = serde_json::from_slice(body).map_err(|_| invalid())?;
    let messages = body
        .get("messages")
        .filter(|m| m.as_array().is_some_and(|a| !a.is_empty()))
        .ok_or_else(invalid)?;
    serde_json::from_value(messages.clone()).map_err(|_| invalid())
}

/// Turns one upstream server-sent-event line into a `0:"delta"` frame.
pub fn completion_line_to_frame(line: &str) -> Option<Bytes> {
    let data = line.strip_prefix("data:")?.trim_start();
    if data == "[DONE]" {
        return None;
    }
    let chunk: CompletionChunk = serde_json::from_str(data).ok()?;
    let content = chunk.choices.into_iter().next()?.delta.content?;
    if content.is_empty() {
        return None;
    }
    let encoded = serde_json::to_string(&content).ok()?;
    Some(Bytes::from(format!("0:{}\n", encoded)))
}

pub async fn chat_completion(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let messages = parse_messages(&body)?;

    let api_key = state.config.openai_api_key.as_deref().ok_or_else(|| {
        error!("chat requested but OPENAI_API_KEY is not configured");
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "AI service not configured. Please contact support.",
        )
    })?;

    let turns = messages.len();
    let mut conversation = vec![WireMessage {
        role: Role::System,
        content: SYSTEM_PROMPT.to_string(),
    }];
    conversation.extend(messages);

    let upstream = state
        .http_client
        .post(format!("{}/chat/completions", state.config.openai_base_url))
        .bearer_auth(api_key)
        .json(&json!({
            "model": state.config.openai_model,
            "messages": conversation,
            "temperature": 0.7,
            "max_tokens": 800,
            "stream": true,
        }))
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| {
            error!("chat completion request failed: {}", e);
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to process chat request",
            )
        })?;

    info!(turns, "streaming chat completion");

    let frames = upstream
        .bytes_stream()
        .scan(LineBuffer::new(), |lines, chunk| {
            let out: Vec<Result<Bytes, reqwest::Error>> = match chunk {
                Ok(bytes) => lines
                    .push(&bytes)
                    .iter()
                    .filter_map(|line| completion_line_to_frame(line))
                    .map(Ok)
                    .collect(),
                Err(e) => vec![Err(e)],
            };
            future::ready(Some(stream::iter(out)))
        })
        .flatten();

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(frames),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_becomes_prefixed_frame() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hello \"farmer\""}}]}"#;
        let frame = completion_line_to_frame(line).unwrap();
        assert_eq!(&frame[..], b"0:\"Hello \\\"farmer\\\"\"\n");
    }

    #[test]
    fn control_lines_produce_nothing() {
        assert!(completion_line_to_frame("data: [DONE]").is_none());
        assert!(completion_line_to_frame("").is_none());
        assert!(completion_line_to_frame(": keep-alive").is_none());
        assert!(completion_line_to_frame(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#).is_none());
    }

    #[test]
    fn empty_message_list_is_rejected() {
        let err = parse_messages(&Bytes::from_static(br#"{"messages":[]}"#)).unwrap_err();
        assert_eq!(err.code, StatusCode::BAD_REQUEST);
        assert!(parse_messages(&Bytes::from_static(b"not json")).is_err());
        let ok = parse_messages(&Bytes::from_static(
            br#"{"messages":[{"role":"user","content":"hi"}]}"#,
        ))
        .unwrap();
        assert_eq!(ok[0].role, Role::User);
    }
}
