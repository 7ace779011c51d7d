//! Command implementations for the nbconvert CLI.
//!
//! Each command module provides:
//! - Args struct for clap argument parsing
//! - execute() function that performs the command
//! - Human-readable and JSON output formatting

pub mod cache;
pub mod formats;

use anyhow::Result;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Serialize;

/// Common error type for HTTP requests.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },
}

/// Build an HTTP client, optionally configured with a Bearer token.
pub fn build_client(token: Option<&str>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();

    if let Some(token) = token {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| anyhow::anyhow!("Invalid token value: {}", e))?;
        headers.insert(AUTHORIZATION, value);
        builder = builder.default_headers(headers);
    }

    Ok(builder.build()?)
}

/// Print output in JSON or human-readable format.
pub fn output<T: Serialize + HumanReadable>(value: &T, human: bool) -> Result<()> {
    if human {
        value.print_human();
    } else {
        println!("{}", serde_json::to_string_pretty(value)?);
    }
    Ok(())
}

/// Trait for types that can be printed in human-readable format.
pub trait HumanReadable {
    fn print_human(&self);
}

/// Send a request and decode a JSON success body.
pub async fn make_request<T: serde::de::DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, CliError> {
    let response = check_status(request.send().await?).await?;
    Ok(response.json::<T>().await?)
}

/// Send a request whose success response has no body.
pub async fn send_request(request: reqwest::RequestBuilder) -> Result<(), CliError> {
    check_status(request.send().await?).await?;
    Ok(())
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, CliError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(CliError::Server {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// Pull the message out of a `{"error": {"code", "message"}}` body, falling
/// back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            json.pointer("/error/message")
                .and_then(|v| v.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}
