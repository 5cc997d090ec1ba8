// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client for the hosted language-model completion endpoint (DashScope apps).
//!
//! The streaming call enables server-sent events with incremental output, so
//! each record carries only the newly generated text.

use crate::config::Config;
use crate::error::AppError;
use crate::models::ItineraryRequest;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 2000;

/// Completion API client.
#[derive(Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    host: String,
    api_key: Option<String>,
    app_id: Option<String>,
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    input: CompletionInput<'a>,
    parameters: CompletionParameters,
}

#[derive(Serialize)]
struct CompletionInput<'a> {
    prompt: &'a str,
}

#[derive(Serialize)]
struct CompletionParameters {
    temperature: f64,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    incremental_output: Option<bool>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    output: Option<CompletionOutput>,
}

#[derive(Deserialize)]
struct CompletionOutput {
    #[serde(default)]
    text: Option<String>,
}

impl CompletionClient {
    pub fn new(host: impl Into<String>, api_key: Option<String>, app_id: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            host: host.into().trim_end_matches('/').to_string(),
            api_key,
            app_id,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.completion_host.clone(),
            config.completion_api_key.clone(),
            config.completion_app_id.clone(),
        )
    }

    /// Whether both the API key and the app ID are configured.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.app_id.is_some()
    }

    fn credentials(&self) -> Result<(&str, &str), AppError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AppError::ConfigMissing("DASHSCOPE_API_KEY"))?;
        let app_id = self
            .app_id
            .as_deref()
            .ok_or(AppError::ConfigMissing("DASHSCOPE_APP_ID"))?;
        Ok((api_key, app_id))
    }

    fn endpoint(&self, app_id: &str) -> String {
        format!(
            "{}/api/v1/apps/{}/completion",
            self.host,
            urlencoding::encode(app_id)
        )
    }

    /// Stream an itinerary completion, forwarding each text fragment in
    /// arrival order.
    ///
    /// Returns the concatenated text once the stream ends. A transport
    /// failure mid-stream is returned as an error; fragments already
    /// forwarded stay delivered.
    pub async fn stream_itinerary<F>(
        &self,
        request: &ItineraryRequest,
        mut on_fragment: F,
    ) -> Result<String, AppError>
    where
        F: FnMut(&str) + Send,
    {
        let (api_key, app_id) = self.credentials()?;
        let prompt = build_prompt(request);

        let body = CompletionBody {
            input: CompletionInput { prompt: &prompt },
            parameters: CompletionParameters {
                temperature: TEMPERATURE,
                max_tokens: MAX_TOKENS,
                incremental_output: Some(true),
            },
        };

        tracing::info!(
            destination = %request.destination,
            days = request.day_count(),
            "Requesting streamed itinerary completion"
        );

        let response = self
            .http
            .post(self.endpoint(app_id))
            .bearer_auth(api_key)
            .header("X-DashScope-SSE", "enable")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;

        let response = check_response(response).await?;

        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut text = String::new();
        let mut received_bytes = 0usize;
        let mut fragments = 0usize;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                tracing::warn!(error = %e, fragments, "Completion stream interrupted");
                AppError::Transport(format!("Stream error: {}", e))
            })?;
            received_bytes += chunk.len();

            for fragment in decoder.push(&chunk) {
                text.push_str(&fragment);
                fragments += 1;
                on_fragment(&fragment);
            }
        }

        for fragment in decoder.finish() {
            text.push_str(&fragment);
            fragments += 1;
            on_fragment(&fragment);
        }

        if received_bytes == 0 {
            return Err(AppError::Completion("empty response body".to_string()));
        }

        tracing::info!(fragments, chars = text.chars().count(), "Completion stream finished");
        Ok(text)
    }

    /// Request a complete itinerary in one response.
    ///
    /// Returns the model's text; an absent text field yields `"{}"`.
    pub async fn complete(&self, request: &ItineraryRequest) -> Result<String, AppError> {
        let (api_key, app_id) = self.credentials()?;
        let prompt = build_prompt(request);

        let body = CompletionBody {
            input: CompletionInput { prompt: &prompt },
            parameters: CompletionParameters {
                temperature: TEMPERATURE,
                max_tokens: MAX_TOKENS,
                incremental_output: None,
            },
        };

        let response = self
            .http
            .post(self.endpoint(app_id))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;

        let response = check_response(response).await?;

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::MalformedData(format!("JSON parse error: {}", e)))?;

        Ok(parsed
            .output
            .and_then(|o| o.text)
            .unwrap_or_else(|| "{}".to_string()))
    }
}

/// Check response status and return an error if not successful.
async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, AppError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), "Completion endpoint returned an error");
    Err(AppError::Completion(format!("HTTP {}: {}", status, body)))
}

/// Incremental decoder for the completion event stream.
///
/// Bytes are buffered until a full line is available, so records and
/// multi-byte characters split across network chunks decode correctly.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the text fragments of every completed record.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut fragments = Vec::new();
        while let Some(line_end) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=line_end).collect();
            if let Some(fragment) = decode_line(&line[..line_end]) {
                fragments.push(fragment);
            }
        }
        fragments
    }

    /// Flush a final record that was not newline-terminated.
    pub fn finish(&mut self) -> Vec<String> {
        let line = std::mem::take(&mut self.pending);
        decode_line(&line).into_iter().collect()
    }
}

fn decode_line(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches('\r');

    let data = line.strip_prefix("data:")?.trim();
    if data.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(data) {
        Ok(record) => record
            .get("output")
            .and_then(|o| o.get("text"))
            .and_then(Value::as_str)
            .map(str::to_string),
        Err(e) => {
            tracing::debug!(error = %e, "Skipping malformed completion record");
            None
        }
    }
}

/// Build the planning prompt for a request.
pub fn build_prompt(request: &ItineraryRequest) -> String {
    let special_requests = request
        .special_requests
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("无");

    format!(
        r#"请为用户规划一个详细的旅行行程，具体要求如下：
目的地：{destination}
出行日期：{start} 至 {end}
预算：{budget}元
出行人数：{travelers}人
旅行偏好：{preferences}
特殊要求：{special_requests}

请按照以下JSON格式返回结果：
{{
  "estimatedCost": 3000,
  "itinerary": [
    {{
      "day": 1,
      "date": "YYYY-MM-DD",
      "activities": [
        {{
          "time": "09:00",
          "title": "活动标题",
          "description": "活动详细描述",
          "location": "活动地点",
          "duration": "活动时长",
          "cost": 100
        }}
      ]
    }}
  ]
}}

注意事项：
1. 行程安排要合理，符合时间逻辑
2. 活动内容要与用户偏好匹配
3. 费用估算要尽量准确
4. 只返回JSON格式数据，不要包含其他内容，不要使用Markdown格式"#,
        destination = request.destination,
        start = request.start_date.format("%Y-%m-%d"),
        end = request.end_date.format("%Y-%m-%d"),
        budget = request.budget,
        travelers = request.travelers,
        preferences = request.preferences,
        special_requests = special_requests,
    )
}
