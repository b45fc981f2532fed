//! Backend client: the HTTP contract consumed by the wizard and the supervisor.
//!
//! All calls go through the [`BackendApi`] trait so the session logic can run
//! against the real server ([`HttpBackend`]) or a scripted fake in tests.

pub mod sse;

use std::collections::HashMap;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{BoxStream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::ConfigPayload;
use crate::error::BackendError;
use crate::models::{CompilationStatus, LogEvent, Preset};
use sse::SseDecoder;

/// Raw `data:` payloads of the log event stream, in arrival order.
pub type LogStream = BoxStream<'static, Result<String, BackendError>>;

/// Trait for the build server operations
pub trait BackendApi: Send + Sync {
    /// `GET /api/presets`
    fn fetch_presets(&self) -> BoxFuture<'static, Result<HashMap<String, Preset>, BackendError>>;
    /// `GET /api/preset/<id>`
    fn fetch_preset(&self, id: &str) -> BoxFuture<'static, Result<Preset, BackendError>>;
    /// `POST /api/save-config`
    fn save_config(&self, payload: &ConfigPayload) -> BoxFuture<'static, Result<(), BackendError>>;
    /// `POST /api/generate-script`, resolving to the generated script path
    fn generate_script(&self, payload: &ConfigPayload) -> BoxFuture<'static, Result<String, BackendError>>;
    /// `POST /api/start-compilation`
    fn start_compilation(&self, payload: &ConfigPayload) -> BoxFuture<'static, Result<(), BackendError>>;
    /// `GET /api/compilation-status`
    fn compilation_status(&self) -> BoxFuture<'static, Result<CompilationStatus, BackendError>>;
    /// `GET /api/logs`
    fn fetch_logs(&self) -> BoxFuture<'static, Result<Vec<LogEvent>, BackendError>>;
    /// `POST /api/logs/clear`
    fn clear_logs(&self) -> BoxFuture<'static, Result<(), BackendError>>;
    /// `GET /api/logs/stream`
    fn open_log_stream(&self) -> BoxFuture<'static, Result<LogStream, BackendError>>;
}

/// `{success, error?, script_path?}` envelope used by the action endpoints.
#[derive(Debug, Deserialize)]
struct ActionResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    script_path: Option<String>,
}

impl ActionResponse {
    fn into_result(self, fallback: &str) -> Result<Self, BackendError> {
        if self.success {
            Ok(self)
        } else {
            Err(BackendError::Rejected(
                self.error.clone().unwrap_or_else(|| fallback.to_string()),
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
struct LogsResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    logs: Vec<LogEvent>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// reqwest-backed implementation of [`BackendApi`].
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl HttpBackend {
    /// Create a client for the server at `base_url` (e.g. `http://127.0.0.1:5000`).
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self, BackendError> {
        // No client-wide timeout: it would also cut off the long-lived event stream.
        let client = reqwest::Client::builder()
            .connect_timeout(request_timeout)
            .build()?;
        Ok(HttpBackend {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get_json<T: DeserializeOwned + Send + 'static>(
        &self,
        path: &str,
    ) -> BoxFuture<'static, Result<T, BackendError>> {
        let request = self.client.get(self.url(path)).timeout(self.request_timeout);
        async move {
            let response = request.send().await?;
            read_json(response).await
        }
        .boxed()
    }

    fn post_json<T: DeserializeOwned + Send + 'static>(
        &self,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> BoxFuture<'static, Result<T, BackendError>> {
        let mut request = self.client.post(self.url(path)).timeout(self.request_timeout);
        if let Some(body) = body {
            request = request.json(&body);
        }
        async move {
            let response = request.send().await?;
            read_json(response).await
        }
        .boxed()
    }

    fn post_payload(
        &self,
        path: &str,
        payload: &ConfigPayload,
    ) -> BoxFuture<'static, Result<ActionResponse, BackendError>> {
        match serde_json::to_value(payload) {
            Ok(body) => self.post_json(path, Some(body)),
            Err(e) => {
                let err = BackendError::Decode(format!("Failed to encode configuration: {}", e));
                async move { Err(err) }.boxed()
            }
        }
    }
}

/// Decode a JSON body; a non-2xx status is only an error if the body is not
/// the expected shape (the server reports most failures as 200 + `success:false`).
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
    let status = response.status();
    let body = response.text().await?;
    match serde_json::from_str::<T>(&body) {
        Ok(value) => Ok(value),
        Err(_) if !status.is_success() => Err(BackendError::HttpStatus {
            status: status.as_u16(),
            body,
        }),
        Err(e) => Err(BackendError::Decode(e.to_string())),
    }
}

impl BackendApi for HttpBackend {
    fn fetch_presets(&self) -> BoxFuture<'static, Result<HashMap<String, Preset>, BackendError>> {
        let fut = self.get_json::<HashMap<String, Preset>>("/api/presets");
        async move {
            let mut presets = fut.await?;
            for (id, preset) in presets.iter_mut() {
                preset.id = id.clone();
            }
            Ok(presets)
        }
        .boxed()
    }

    fn fetch_preset(&self, id: &str) -> BoxFuture<'static, Result<Preset, BackendError>> {
        let id = id.to_string();
        let request = self
            .client
            .get(self.url(&format!("/api/preset/{}", id)))
            .timeout(self.request_timeout);
        async move {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await?;
                let reason = serde_json::from_str::<ErrorBody>(&body)
                    .ok()
                    .and_then(|b| b.error)
                    .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
                return Err(BackendError::Rejected(reason));
            }
            let mut preset: Preset = read_json(response).await?;
            preset.id = id;
            Ok(preset)
        }
        .boxed()
    }

    fn save_config(&self, payload: &ConfigPayload) -> BoxFuture<'static, Result<(), BackendError>> {
        let fut = self.post_payload("/api/save-config", payload);
        async move {
            fut.await?.into_result("保存失败")?;
            Ok(())
        }
        .boxed()
    }

    fn generate_script(&self, payload: &ConfigPayload) -> BoxFuture<'static, Result<String, BackendError>> {
        let fut = self.post_payload("/api/generate-script", payload);
        async move {
            let response = fut.await?.into_result("脚本生成失败")?;
            Ok(response.script_path.unwrap_or_default())
        }
        .boxed()
    }

    fn start_compilation(&self, payload: &ConfigPayload) -> BoxFuture<'static, Result<(), BackendError>> {
        let fut = self.post_payload("/api/start-compilation", payload);
        async move {
            fut.await?.into_result("启动编译失败")?;
            Ok(())
        }
        .boxed()
    }

    fn compilation_status(&self) -> BoxFuture<'static, Result<CompilationStatus, BackendError>> {
        self.get_json::<CompilationStatus>("/api/compilation-status")
    }

    fn fetch_logs(&self) -> BoxFuture<'static, Result<Vec<LogEvent>, BackendError>> {
        let fut = self.get_json::<LogsResponse>("/api/logs");
        async move {
            let response = fut.await?;
            if !response.success {
                return Err(BackendError::Rejected(
                    response.error.unwrap_or_else(|| "获取日志失败".to_string()),
                ));
            }
            Ok(response.logs)
        }
        .boxed()
    }

    fn clear_logs(&self) -> BoxFuture<'static, Result<(), BackendError>> {
        let fut = self.post_json::<ActionResponse>("/api/logs/clear", None);
        async move {
            fut.await?.into_result("清空日志失败")?;
            Ok(())
        }
        .boxed()
    }

    fn open_log_stream(&self) -> BoxFuture<'static, Result<LogStream, BackendError>> {
        let request = self
            .client
            .get(self.url("/api/logs/stream"))
            .header(reqwest::header::ACCEPT, "text/event-stream");
        async move {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(BackendError::HttpStatus {
                    status: status.as_u16(),
                    body,
                });
            }
            Ok(decode_event_stream(response.bytes_stream()))
        }
        .boxed()
    }
}

struct StreamState<S> {
    bytes: S,
    decoder: SseDecoder,
    ready: std::collections::VecDeque<String>,
    done: bool,
}

/// Turn a byte stream into a stream of event payloads.
pub fn decode_event_stream<S, B, E>(bytes: S) -> LogStream
where
    S: futures::Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<BackendError> + Send + 'static,
{
    let state = StreamState {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::new(),
        ready: std::collections::VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(data) = state.ready.pop_front() {
                return Some((Ok(data), state));
            }
            if state.done {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push(chunk.as_ref());
                    state.ready.extend(events);
                }
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(e.into()), state));
                }
                None => {
                    state.done = true;
                    if let Some(tail) = state.decoder.finish() {
                        state.ready.push_back(tail);
                    }
                }
            }
        }
    })
    .boxed()
}
