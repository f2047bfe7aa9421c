//! JSON-RPC envelope used by the Odoo web controllers.

use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Failures of a single JSON-RPC round trip.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Transport failure or a body that was not JSON.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// The server answered with an `error` object.
    #[error("server error: {0}")]
    Server(String),
    /// `result` was absent, null or `false`.
    #[error("response carried no result")]
    MissingResult,
    /// `result` did not have the expected shape.
    #[error("unexpected result shape: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Request envelope shared by every call.
#[derive(Debug, Serialize)]
struct RpcRequest<P> {
    jsonrpc: &'static str,
    method: &'static str,
    params: P,
    id: u32,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<RpcErrorData>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorData {
    #[serde(default)]
    message: String,
}

/// `params` of a `call_kw` request.
#[derive(Debug, Serialize)]
struct CallKwParams<'a> {
    model: &'a str,
    method: &'a str,
    args: Value,
    kwargs: Value,
}

/// Post one JSON-RPC `call` and return its non-empty `result`.
pub async fn call<P: Serialize>(http: &Client, url: &str, params: P) -> Result<Value, RpcError> {
    let body = RpcRequest {
        jsonrpc: "2.0",
        method: "call",
        params,
        id: rand::thread_rng().gen_range(0..1_000_000),
    };

    let resp = http
        .post(url)
        .json(&body)
        .send()
        .await?
        .error_for_status()?
        .json::<RpcResponse>()
        .await?;

    if let Some(err) = resp.error {
        // Odoo puts the useful text in data.message; the top level is generic.
        let msg = err
            .data
            .map(|d| d.message)
            .filter(|m| !m.is_empty())
            .unwrap_or(err.message);
        return Err(RpcError::Server(msg));
    }
    match resp.result {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Err(RpcError::MissingResult),
        Some(v) => Ok(v),
    }
}

/// Call an ORM method through `/web/dataset/call_kw`.
pub async fn call_kw(
    http: &Client,
    base_url: &str,
    model: &str,
    method: &str,
    args: Value,
    kwargs: Value,
) -> Result<Value, RpcError> {
    let url = format!("{}/web/dataset/call_kw", base_url.trim_end_matches('/'));
    tracing::debug!("call_kw {model}.{method}");
    call(
        http,
        &url,
        CallKwParams {
            model,
            method,
            args,
            kwargs,
        },
    )
    .await
}
