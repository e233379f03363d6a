use anyhow::Result;
use calc_models::{HealthReport, JsonRpcResponse};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use crate::SseStream;

pub struct CalcClient {
    client: Client,
    base_url: String,
}

impl CalcClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<HealthReport> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            anyhow::bail!("Health check failed: {}", error_text);
        }

        Ok(response.json().await?)
    }

    pub async fn metrics(&self) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/metrics", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            anyhow::bail!("Metrics scrape failed: {}", error_text);
        }

        Ok(response.text().await?)
    }

    pub async fn sse_status(&self) -> Result<Value> {
        let response = self
            .client
            .get(format!("{}/sse/status", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            anyhow::bail!("SSE status failed: {}", error_text);
        }

        Ok(response.json().await?)
    }

    /// POST a raw body to `/mcp` and return the status with the decoded reply.
    pub async fn mcp_raw(&self, body: String) -> Result<(StatusCode, JsonRpcResponse)> {
        let response = self
            .client
            .post(format!("{}/mcp", self.base_url))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await?;
        let status = response.status();
        Ok((status, response.json().await?))
    }

    pub async fn mcp(&self, method: &str, params: Value, id: Value) -> Result<JsonRpcResponse> {
        let body = json!({"jsonrpc": "2.0", "method": method, "params": params, "id": id});
        let (status, response) = self.mcp_raw(body.to_string()).await?;

        if !status.is_success() {
            anyhow::bail!("MCP request {} failed with {}: {:?}", method, status, response.error);
        }

        Ok(response)
    }

    /// Call a tool over `/mcp` and return the `result` member.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value> {
        let response = self
            .mcp("tools/call", json!({"name": name, "arguments": arguments}), json!(1))
            .await?;
        response
            .result
            .ok_or_else(|| anyhow::anyhow!("tools/call {} returned no result", name))
    }

    pub async fn list_tools(&self) -> Result<Vec<Value>> {
        let response = self.mcp("tools/list", json!({}), json!(1)).await?;
        match response.result.as_ref().and_then(|r| r.get("tools")) {
            Some(Value::Array(tools)) => Ok(tools.clone()),
            _ => anyhow::bail!("tools/list returned no tools"),
        }
    }

    pub async fn connect_sse(&self, client_id: Option<&str>) -> Result<SseStream> {
        let mut request = self.client.get(format!("{}/sse/connect", self.base_url));
        if let Some(id) = client_id {
            request = request.query(&[("client_id", id)]);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            anyhow::bail!("SSE connect failed: {}", error_text);
        }

        Ok(SseStream::new(response))
    }

    /// POST to `/sse/mcp` with the client id header, returning the raw
    /// status and JSON body.
    pub async fn sse_post(&self, client_id: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        let mut request = self
            .client
            .post(format!("{}/sse/mcp", self.base_url))
            .json(&body);
        if let Some(id) = client_id {
            request = request.header("X-Client-ID", id);
        }
        let response = request.send().await?;
        let status = response.status();
        Ok((status, response.json().await?))
    }
}
