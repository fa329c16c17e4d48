//! REST/SSE adapter for the hosted realtime database.
//!
//! Implements the core's [`RemoteSessionClient`] contract over plain HTTP:
//! JSON endpoints for auth, device listing, and status snapshots, and
//! `text/event-stream` long polls for the push metric channels. Each
//! subscription owns one background task that parses the stream and feeds
//! the installed sink; unsubscribing aborts the task.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures_util::StreamExt;
use parking_lot::Mutex;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crown::remote::{AuthHandle, MetricSink, RemoteError, RemoteSessionClient, SubscriptionHandle};
use crown_protocol::{AccelerometerUpdate, DeviceInfo, MetricChannel, MetricUpdate, ProbabilityPayload};

pub struct RestSessionClient {
    http: reqwest::Client,
    base_url: String,
    token: Mutex<Option<String>>,
    next_subscription: AtomicU64,
    streams: Mutex<HashMap<u64, JoinHandle<()>>>,
}

impl RestSessionClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: Mutex::new(None),
            next_subscription: AtomicU64::new(0),
            streams: Mutex::new(HashMap::new()),
        }
    }

    fn auth_token(&self) -> Result<String, RemoteError> {
        self.token.lock().clone().ok_or(RemoteError::NotConnected)
    }

    fn abort_all_streams(&self) {
        for (_, task) in self.streams.lock().drain() {
            task.abort();
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: String,
    user_id: String,
}

/// One `put`/`patch` frame on a metric stream.
#[derive(Deserialize)]
struct StreamEnvelope {
    data: serde_json::Value,
}

fn transport(error: reqwest::Error) -> RemoteError {
    RemoteError::Unreachable(error.to_string())
}

/// Stream path segment for a channel; kinesis labels nest under `kinesis/`.
fn channel_path(channel: &MetricChannel) -> String {
    channel.name().replace(':', "/")
}

fn decode_update(channel: &MetricChannel, value: serde_json::Value) -> Option<MetricUpdate> {
    match channel {
        MetricChannel::Calm => {
            let payload: ProbabilityPayload = serde_json::from_value(value).ok()?;
            Some(MetricUpdate::Calm(payload.probability))
        }
        MetricChannel::Focus => {
            let payload: ProbabilityPayload = serde_json::from_value(value).ok()?;
            Some(MetricUpdate::Focus(payload.probability))
        }
        MetricChannel::Accelerometer => {
            let payload: AccelerometerUpdate = serde_json::from_value(value).ok()?;
            Some(MetricUpdate::Accelerometer(payload))
        }
        MetricChannel::Kinesis(label) => {
            let payload: ProbabilityPayload = serde_json::from_value(value).ok()?;
            Some(MetricUpdate::Kinesis { label: label.clone(), probability: payload.probability })
        }
    }
}

/// Incremental `text/event-stream` line parser.
///
/// Feed it one line at a time (without the trailing newline); a blank line
/// terminates the pending event. Comment lines and unknown fields are
/// ignored per the SSE grammar.
#[derive(Debug, Default)]
pub struct SseParser {
    event: String,
    data: String,
}

#[derive(Debug, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

impl SseParser {
    pub fn push_line(&mut self, line: &str) -> Option<SseEvent> {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            if self.data.is_empty() {
                self.event.clear();
                return None;
            }
            let event = if self.event.is_empty() {
                "message".to_string()
            } else {
                std::mem::take(&mut self.event)
            };
            return Some(SseEvent { event, data: std::mem::take(&mut self.data) });
        }
        if let Some(rest) = line.strip_prefix("event:") {
            self.event = rest.trim_start().to_string();
        } else if let Some(rest) = line.strip_prefix("data:") {
            if !self.data.is_empty() {
                self.data.push('\n');
            }
            self.data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
        }
        None
    }
}

fn handle_event(channel: &MetricChannel, event: SseEvent, sink: &MetricSink) {
    // Firebase streams send keep-alive and auth-revoked events too; only the
    // value frames carry metric payloads.
    if event.event != "put" && event.event != "patch" {
        return;
    }
    let envelope: StreamEnvelope = match serde_json::from_str(&event.data) {
        Ok(envelope) => envelope,
        Err(error) => {
            debug!(target: "crown.rest", %channel, %error, "unparseable stream frame");
            return;
        }
    };
    if let Some(update) = decode_update(channel, envelope.data) {
        sink(update);
    }
}

async fn run_stream(response: reqwest::Response, channel: MetricChannel, sink: MetricSink) {
    let mut parser = SseParser::default();
    let mut buffer = String::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(error) => {
                warn!(target: "crown.rest", %channel, %error, "metric stream ended");
                return;
            }
        };
        buffer.push_str(&String::from_utf8_lossy(&chunk));
        while let Some(newline) = buffer.find('\n') {
            let line: String = buffer.drain(..=newline).collect();
            if let Some(event) = parser.push_line(line.trim_end_matches('\n')) {
                handle_event(&channel, event, &sink);
            }
        }
    }
    debug!(target: "crown.rest", %channel, "metric stream closed by server");
}

#[async_trait]
impl RemoteSessionClient for RestSessionClient {
    async fn login(&self, email: &str, password: &str) -> Result<AuthHandle, RemoteError> {
        let response = self
            .http
            .post(format!("{}/auth/login", self.base_url))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(RemoteError::AuthRejected(format!("account {email}")));
            }
            status if !status.is_success() => {
                return Err(RemoteError::Protocol(format!("login returned {status}")));
            }
            _ => {}
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Protocol(e.to_string()))?;
        *self.token.lock() = Some(body.token);
        Ok(AuthHandle { user_id: body.user_id })
    }

    async fn logout(&self) -> Result<(), RemoteError> {
        self.abort_all_streams();
        let Some(token) = self.token.lock().take() else {
            return Ok(());
        };
        self.http
            .post(format!("{}/auth/logout", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(|e| RemoteError::Protocol(e.to_string()))?;
        Ok(())
    }

    async fn list_devices(&self) -> Result<Vec<DeviceInfo>, RemoteError> {
        let token = self.auth_token()?;
        let devices = self
            .http
            .get(format!("{}/devices.json", self.base_url))
            .query(&[("auth", token)])
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(|e| RemoteError::Protocol(e.to_string()))?
            .json()
            .await
            .map_err(|e| RemoteError::Protocol(e.to_string()))?;
        Ok(devices)
    }

    async fn status_snapshot(
        &self,
        device_id: &str,
    ) -> Result<Option<serde_json::Value>, RemoteError> {
        let token = self.auth_token()?;
        let value: serde_json::Value = self
            .http
            .get(format!("{}/devices/{device_id}/status.json", self.base_url))
            .query(&[("auth", token)])
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(|e| RemoteError::Protocol(e.to_string()))?
            .json()
            .await
            .map_err(|e| RemoteError::Protocol(e.to_string()))?;

        // An absent node serializes as JSON null.
        Ok(if value.is_null() { None } else { Some(value) })
    }

    async fn subscribe(
        &self,
        device_id: &str,
        channel: MetricChannel,
        sink: MetricSink,
    ) -> Result<SubscriptionHandle, RemoteError> {
        let token = self.auth_token()?;
        let path = channel_path(&channel);
        let response = self
            .http
            .get(format!("{}/devices/{device_id}/metrics/{path}.json", self.base_url))
            .query(&[("auth", token)])
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(|e| RemoteError::Protocol(e.to_string()))?;

        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed) + 1;
        let task = tokio::spawn(run_stream(response, channel.clone(), sink));
        self.streams.lock().insert(id, task);
        debug!(target: "crown.rest", %channel, id, "metric stream opened");
        Ok(SubscriptionHandle { id, channel })
    }

    async fn unsubscribe(&self, handle: &SubscriptionHandle) -> Result<(), RemoteError> {
        if let Some(task) = self.streams.lock().remove(&handle.id) {
            task.abort();
        }
        Ok(())
    }
}

impl Drop for RestSessionClient {
    fn drop(&mut self) {
        self.abort_all_streams();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parser_assembles_event_and_data_lines() {
        let mut parser = SseParser::default();
        assert_eq!(parser.push_line("event: put"), None);
        assert_eq!(parser.push_line("data: {\"data\":{\"probability\":0.5}}"), None);

        let event = parser.push_line("").unwrap();
        assert_eq!(event.event, "put");
        assert_eq!(event.data, "{\"data\":{\"probability\":0.5}}");
    }

    #[test]
    fn parser_ignores_comments_and_defaults_the_event_name() {
        let mut parser = SseParser::default();
        assert_eq!(parser.push_line(": keep-alive"), None);
        assert_eq!(parser.push_line(""), None);

        parser.push_line("data: one");
        parser.push_line("data: two");
        let event = parser.push_line("").unwrap();
        assert_eq!(event.event, "message");
        assert_eq!(event.data, "one\ntwo");
    }

    #[test]
    fn kinesis_channels_nest_in_the_stream_path() {
        assert_eq!(channel_path(&MetricChannel::Calm), "calm");
        assert_eq!(channel_path(&MetricChannel::Kinesis("leftArm".into())), "kinesis/leftArm");
    }

    #[test]
    fn updates_decode_per_channel() {
        let calm = decode_update(&MetricChannel::Calm, serde_json::json!({"probability": 0.8}));
        assert_eq!(calm, Some(MetricUpdate::Calm(0.8)));

        let kinesis = decode_update(
            &MetricChannel::Kinesis("jaw".into()),
            serde_json::json!({"probability": 0.3}),
        );
        assert_eq!(
            kinesis,
            Some(MetricUpdate::Kinesis { label: "jaw".into(), probability: 0.3 })
        );

        let accel = decode_update(
            &MetricChannel::Accelerometer,
            serde_json::json!({"pitch": 1.0, "roll": 2.0, "x": 0.1, "y": 0.2, "z": 0.3}),
        );
        let Some(MetricUpdate::Accelerometer(update)) = accel else {
            panic!("expected an accelerometer update");
        };
        assert_eq!(update.pitch, 1.0);
        assert_eq!(update.z, 0.3);

        assert_eq!(decode_update(&MetricChannel::Focus, serde_json::json!("bogus")), None);
    }
}
