//! Event-stream producer: forwards compile log lines to the supervisor.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{mpsc, watch};

use super::state::JobId;
use super::{cancelled, SupervisorEvent};
use crate::backend::BackendApi;
use crate::models::LogEvent;

/// Delay before re-opening a dropped subscription.
pub const STREAM_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Message types that carry no log content.
const CONTROL_TYPES: [&str; 2] = ["heartbeat", "connected"];

/// One decoded `data:` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamMessage {
    Log(LogEvent),
    Control(String),
    Malformed(String),
}

/// Decode one payload independently of every other.
pub fn decode_message(data: &str) -> StreamMessage {
    let value: serde_json::Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(e) => return StreamMessage::Malformed(e.to_string()),
    };

    if let Some(kind) = value.get("type").and_then(|t| t.as_str()) {
        if CONTROL_TYPES.contains(&kind) {
            return StreamMessage::Control(kind.to_string());
        }
    }

    match serde_json::from_value::<LogEvent>(value) {
        Ok(event) => StreamMessage::Log(event),
        Err(e) => StreamMessage::Malformed(e.to_string()),
    }
}

/// Subscribe to the log stream and forward every log message in arrival order.
///
/// Runs until cancelled or until the consumer goes away. Transport failures
/// are reported as notices and the subscription is re-opened.
pub(crate) async fn run_log_stream(
    job_id: JobId,
    backend: Arc<dyn BackendApi>,
    tx: mpsc::Sender<SupervisorEvent>,
    mut cancel_rx: watch::Receiver<bool>,
) {
    loop {
        let opened = tokio::select! {
            biased;
            _ = cancelled(&mut cancel_rx) => return,
            opened = backend.open_log_stream() => opened,
        };

        match opened {
            Ok(mut stream) => {
                log::info!("[Supervisor] job {}: log stream connected", job_id);
                loop {
                    let item = tokio::select! {
                        biased;
                        _ = cancelled(&mut cancel_rx) => return,
                        item = stream.next() => item,
                    };

                    match item {
                        Some(Ok(data)) => match decode_message(&data) {
                            StreamMessage::Log(event) => {
                                if tx.send(SupervisorEvent::Log { job_id, event }).await.is_err() {
                                    return;
                                }
                            }
                            StreamMessage::Control(kind) => {
                                log::debug!("[Supervisor] job {}: stream {}", job_id, kind);
                            }
                            StreamMessage::Malformed(err) => {
                                log::debug!("[Supervisor] job {}: 解析日志数据失败: {}", job_id, err);
                            }
                        },
                        Some(Err(e)) => {
                            log::warn!("[Supervisor] job {}: 日志流连接错误: {}", job_id, e);
                            let notice = SupervisorEvent::StreamNotice {
                                job_id,
                                message: e.to_string(),
                            };
                            if tx.send(notice).await.is_err() {
                                return;
                            }
                            break;
                        }
                        None => {
                            log::info!("[Supervisor] job {}: log stream closed by server", job_id);
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                log::warn!("[Supervisor] job {}: 日志流连接错误: {}", job_id, e);
                let notice = SupervisorEvent::StreamNotice {
                    job_id,
                    message: e.to_string(),
                };
                if tx.send(notice).await.is_err() {
                    return;
                }
            }
        }

        tokio::select! {
            biased;
            _ = cancelled(&mut cancel_rx) => return,
            _ = tokio::time::sleep(STREAM_RETRY_DELAY) => {}
        }
    }
}
