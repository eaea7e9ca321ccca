//! JSON-RPC client over the shared HTTP connection pool.
//!
//! Two call forms: `call` collapses every failure mode to `None` and hands
//! back the `result` payload verbatim; `call_raw` surfaces the full envelope
//! so callers can react to specific RPC error codes.

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: String,
    pub method: String,
    pub params: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse<T> {
    #[serde(default)]
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Clone)]
pub struct RpcClient {
    http: Client,
}

impl RpcClient {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    /// Issue one RPC call. Transport errors, timeouts, non-2xx responses,
    /// and RPC error objects are logged and collapsed to `None`; a caller
    /// only ever sees "data" or "no data".
    pub async fn call(&self, url: &str, method: &str, params: Value) -> Option<Value> {
        match self.call_raw(url, method, params).await {
            Ok(response) => {
                if let Some(err) = response.error {
                    error!("RPC error for {method}: {} (code {})", err.message, err.code);
                    return None;
                }
                response.result
            }
            Err(e) => {
                warn!("{method} call to {url} failed: {e}");
                None
            }
        }
    }

    /// Low-level form: returns the raw response envelope, including any
    /// `error` object. Only transport and HTTP-level failures are errors
    /// here.
    pub async fn call_raw(
        &self,
        url: &str,
        method: &str,
        params: Value,
    ) -> Result<JsonRpcResponse<Value>> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Uuid::new_v4().to_string(),
            method: method.to_string(),
            params,
        };

        let response = self.http.post(url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {}", response.status()));
        }

        Ok(response.json::<JsonRpcResponse<Value>>().await?)
    }
}

/// Decode an RPC `result` payload into its typed shape. A shape the decoder
/// does not recognize is treated the same as a failed call.
pub fn decode_result<T: DeserializeOwned>(method: &str, result: Option<Value>) -> Option<T> {
    let value = result?;
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!("unexpected {method} payload shape: {e}");
            None
        }
    }
}
