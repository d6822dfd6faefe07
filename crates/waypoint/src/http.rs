// File: src/http.rs
// Purpose: Built-in HTTP-backed default loader and action

use reqwest::header::{HeaderValue, ACCEPT, RANGE};
use reqwest::{Client, Response};
use serde_json::Value;
use waypoint_router::loader::{Action, DefaultEndpoints, LoadError, Loader};

/// Reqwest-backed implementation of the built-in defaults
///
/// The default loader issues `GET <prefix><pathname><search>` with
/// `Accept: application/json` and a `Range: route=<nesting-level>` header so
/// a server can return only the data for one nested segment. The default
/// action POSTs the submission body to the same URL pattern; submissions
/// always target the whole route, so the action sends no `Range` header.
/// Bodies decode as JSON when the response advertises a JSON content type
/// with a non-zero length, as text otherwise; non-success statuses surface
/// as [`LoadError::Http`] carrying the status and raw body.
#[derive(Debug, Clone, Default)]
pub struct HttpEndpoints {
    client: Client,
}

impl HttpEndpoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a preconfigured client, e.g. one carrying auth headers
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl DefaultEndpoints for HttpEndpoints {
    fn loader(&self, prefix: &str, depth: usize) -> Loader {
        let client = self.client.clone();
        let prefix = prefix.to_string();
        Loader::from_fn(move |cx| {
            let client = client.clone();
            let url = format!("{prefix}{}", cx.url);
            async move {
                let request = loader_request(&client, &url, depth);
                let send = async move {
                    let response = request
                        .send()
                        .await
                        .map_err(|err| LoadError::Message(err.to_string()))?;
                    decode_response(response).await
                };
                tokio::select! {
                    _ = cx.cancel.cancelled() => Err(LoadError::Cancelled),
                    result = send => result,
                }
            }
        })
    }

    fn action(&self, prefix: &str, _depth: usize) -> Action {
        let client = self.client.clone();
        let prefix = prefix.to_string();
        Action::from_fn(move |cx| {
            let client = client.clone();
            let url = format!("{prefix}{}", cx.url);
            async move {
                let request = action_request(&client, &url, &cx.data);
                let send = async move {
                    let response = request
                        .send()
                        .await
                        .map_err(|err| LoadError::Message(err.to_string()))?;
                    decode_response(response).await
                };
                tokio::select! {
                    _ = cx.cancel.cancelled() => Err(LoadError::Cancelled),
                    result = send => result,
                }
            }
        })
    }
}

/// The default loader's request: GET with the JSON accept header and the
/// per-segment range
fn loader_request(client: &Client, url: &str, depth: usize) -> reqwest::RequestBuilder {
    client
        .get(url)
        .header(ACCEPT, HeaderValue::from_static("application/json"))
        .header(RANGE, format!("route={depth}"))
}

/// The default action's request: POST of the submission body, no range
fn action_request(client: &Client, url: &str, data: &Value) -> reqwest::RequestBuilder {
    client
        .post(url)
        .header(ACCEPT, HeaderValue::from_static("application/json"))
        .json(data)
}

async fn decode_response(response: Response) -> Result<Value, LoadError> {
    let status = response.status();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let content_length = response.content_length();
    let body = response
        .text()
        .await
        .map_err(|err| LoadError::Message(err.to_string()))?;

    if !status.is_success() {
        return Err(LoadError::Http {
            status: status.as_u16(),
            body,
        });
    }

    Ok(decode_body(content_type.as_deref(), content_length, &body))
}

/// Decodes a response body per the defaults' rules
///
/// JSON only when the content type says so and the body is non-empty;
/// anything else, including malformed JSON, falls back to text.
fn decode_body(content_type: Option<&str>, content_length: Option<u64>, body: &str) -> Value {
    let is_json = content_type
        .map(|value| value.contains("json"))
        .unwrap_or(false);
    let has_body = match content_length {
        Some(length) => length > 0,
        None => !body.is_empty(),
    };

    if is_json && has_body {
        serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
    } else {
        Value::String(body.to_string())
    }
}
