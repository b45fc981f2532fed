//! Scripted in-memory build server shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::{self, BoxFuture};
use futures::stream::{self, StreamExt};
use futures::FutureExt;

use ffdroid_builder::backend::{BackendApi, LogStream};
use ffdroid_builder::config::ConfigPayload;
use ffdroid_builder::models::{CompilationStatus, ConfigPatch, Configuration, LogEvent, Preset};
use ffdroid_builder::BackendError;

/// Each `open_log_stream` call consumes one script. Once the scripts run out,
/// the stream stays open and silent.
pub enum StreamScript {
    Messages(Vec<String>),
    Fail(String),
}

#[derive(Default)]
pub struct FakeBackend {
    pub presets: HashMap<String, Preset>,
    start_rejections: Mutex<VecDeque<String>>,
    statuses: Mutex<VecDeque<Result<CompilationStatus, String>>>,
    streams: Mutex<VecDeque<StreamScript>>,
    pub submitted: Mutex<Vec<Configuration>>,
    pub start_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub stream_opens: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preset(mut self, id: &str, patch: ConfigPatch) -> Self {
        self.presets.insert(
            id.to_string(),
            Preset {
                id: id.to_string(),
                name: format!("{} preset", id),
                description: String::new(),
                config: patch,
            },
        );
        self
    }

    pub fn reject_next_start(&self, reason: &str) {
        self.start_rejections.lock().unwrap().push_back(reason.to_string());
    }

    pub fn push_status(&self, status: CompilationStatus) {
        self.statuses.lock().unwrap().push_back(Ok(status));
    }

    pub fn push_status_error(&self, reason: &str) {
        self.statuses.lock().unwrap().push_back(Err(reason.to_string()));
    }

    pub fn push_stream(&self, script: StreamScript) {
        self.streams.lock().unwrap().push_back(script);
    }

    pub fn starts(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> usize {
        self.stream_opens.load(Ordering::SeqCst)
    }
}

pub fn running(progress: u32, label: &str) -> CompilationStatus {
    CompilationStatus {
        running: true,
        completed: false,
        success: false,
        status: label.to_string(),
        progress,
        error: None,
    }
}

pub fn finished(success: bool, error: Option<&str>) -> CompilationStatus {
    CompilationStatus {
        running: false,
        completed: true,
        success,
        status: if success { "编译完成" } else { "编译失败" }.to_string(),
        progress: 100,
        error: error.map(str::to_string),
    }
}

pub fn log_message(level: &str, message: &str) -> String {
    serde_json::json!({
        "timestamp": "10:00:00",
        "level": level,
        "message": message,
    })
    .to_string()
}

pub fn control_message(kind: &str) -> String {
    serde_json::json!({ "type": kind }).to_string()
}

impl BackendApi for FakeBackend {
    fn fetch_presets(&self) -> BoxFuture<'static, Result<HashMap<String, Preset>, BackendError>> {
        future::ready(Ok(self.presets.clone())).boxed()
    }

    fn fetch_preset(&self, id: &str) -> BoxFuture<'static, Result<Preset, BackendError>> {
        let result = self
            .presets
            .get(id)
            .cloned()
            .ok_or_else(|| BackendError::Rejected(format!("预设不存在: {}", id)));
        future::ready(result).boxed()
    }

    fn save_config(&self, payload: &ConfigPayload) -> BoxFuture<'static, Result<(), BackendError>> {
        self.submitted.lock().unwrap().push(payload.config().clone());
        future::ready(Ok(())).boxed()
    }

    fn generate_script(&self, payload: &ConfigPayload) -> BoxFuture<'static, Result<String, BackendError>> {
        self.submitted.lock().unwrap().push(payload.config().clone());
        future::ready(Ok("/tmp/build_ffmpeg.sh".to_string())).boxed()
    }

    fn start_compilation(&self, payload: &ConfigPayload) -> BoxFuture<'static, Result<(), BackendError>> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().unwrap().push(payload.config().clone());
        let result = match self.start_rejections.lock().unwrap().pop_front() {
            Some(reason) => Err(BackendError::Rejected(reason)),
            None => Ok(()),
        };
        future::ready(result).boxed()
    }

    fn compilation_status(&self) -> BoxFuture<'static, Result<CompilationStatus, BackendError>> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let result = match self.statuses.lock().unwrap().pop_front() {
            Some(Ok(status)) => Ok(status),
            Some(Err(reason)) => Err(BackendError::HttpStatus {
                status: 500,
                body: reason,
            }),
            None => Ok(running(50, "编译中...")),
        };
        future::ready(result).boxed()
    }

    fn fetch_logs(&self) -> BoxFuture<'static, Result<Vec<LogEvent>, BackendError>> {
        future::ready(Ok(Vec::new())).boxed()
    }

    fn clear_logs(&self) -> BoxFuture<'static, Result<(), BackendError>> {
        future::ready(Ok(())).boxed()
    }

    fn open_log_stream(&self) -> BoxFuture<'static, Result<LogStream, BackendError>> {
        self.stream_opens.fetch_add(1, Ordering::SeqCst);
        let result: Result<LogStream, BackendError> = match self.streams.lock().unwrap().pop_front() {
            Some(StreamScript::Messages(messages)) => Ok(stream::iter(messages.into_iter().map(Ok))
                .chain(stream::pending())
                .boxed()),
            Some(StreamScript::Fail(reason)) => Err(BackendError::Rejected(reason)),
            None => Ok(stream::pending().boxed()),
        };
        future::ready(result).boxed()
    }
}

pub fn shared(backend: FakeBackend) -> Arc<FakeBackend> {
    Arc::new(backend)
}
