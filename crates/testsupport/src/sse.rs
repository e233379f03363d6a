use anyhow::{Context, Result};
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;
use std::time::Duration;

/// One decoded server-sent event.
#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    pub event: String,
    pub data: Value,
}

/// Reads events off an open `/sse/connect` response.
pub struct SseStream {
    chunks: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    buffer: String,
}

impl SseStream {
    pub fn new(response: reqwest::Response) -> Self {
        Self {
            chunks: response
                .bytes_stream()
                .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
                .boxed(),
            buffer: String::new(),
        }
    }

    /// Wait up to `timeout` for the next complete event.
    pub async fn next_event(&mut self, timeout: Duration) -> Result<SseEvent> {
        tokio::time::timeout(timeout, self.read_event())
            .await
            .context("timed out waiting for an SSE event")?
    }

    /// Skip heartbeats until an event named `name` arrives.
    pub async fn expect_event(&mut self, name: &str, timeout: Duration) -> Result<SseEvent> {
        tokio::time::timeout(timeout, async {
            loop {
                let event = self.read_event().await?;
                if event.event == name {
                    return Ok(event);
                }
            }
        })
        .await
        .with_context(|| format!("timed out waiting for a {name} event"))?
    }

    async fn read_event(&mut self) -> Result<SseEvent> {
        loop {
            if let Some(event) = self.take_frame()? {
                return Ok(event);
            }
            let chunk = self
                .chunks
                .next()
                .await
                .context("SSE stream closed")??;
            self.buffer.push_str(std::str::from_utf8(&chunk)?);
        }
    }

    fn take_frame(&mut self) -> Result<Option<SseEvent>> {
        let Some(end) = self.buffer.find("\n\n") else {
            return Ok(None);
        };
        let frame: String = self.buffer.drain(..end + 2).collect();
        Ok(Some(parse_frame(&frame)?))
    }

    /// True once the server has closed the stream.
    pub async fn is_closed(&mut self, timeout: Duration) -> bool {
        loop {
            match tokio::time::timeout(timeout, self.chunks.next()).await {
                Ok(None) | Ok(Some(Err(_))) => return true,
                Ok(Some(Ok(_))) => continue,
                Err(_) => return false,
            }
        }
    }
}

/// Decode one `event:`/`data:` frame. Multiple data lines are joined with
/// newlines, as the SSE format specifies.
pub fn parse_frame(frame: &str) -> Result<SseEvent> {
    let mut event = String::from("message");
    let mut data = Vec::new();
    for line in frame.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            event = rest.trim_start().to_string();
        } else if let Some(rest) = line.strip_prefix("data:") {
            data.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    let data = serde_json::from_str(&data.join("\n"))
        .with_context(|| format!("SSE data is not JSON: {frame:?}"))?;
    Ok(SseEvent { event, data })
}
