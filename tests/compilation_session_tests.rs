//! Compilation session integration tests
//!
//! Drives AppController and CompilationSupervisor against a scripted backend
//! on a paused clock:
//! - start gating (busy, rejected, wizard validation)
//! - log stream filtering and ordering
//! - status poll cadence, failure retry and termination
//! - stream reconnect
//! - stale events after a job ends

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{control_message, finished, log_message, running, FakeBackend, StreamScript};
use ffdroid_builder::backend::BackendApi;
use ffdroid_builder::config::{ClientSettings, ConfigField, FieldValue};
use ffdroid_builder::models::{CompileAffordance, LogEvent, LogLevel, Severity, StatusIndicator};
use ffdroid_builder::orchestrator::{SessionOutcome, SessionUpdate, SupervisorEvent};
use ffdroid_builder::ui::controller::{SessionView, DEFAULT_STATUS_TEXT};
use ffdroid_builder::{AppController, AppError};

fn controller_for(backend: &Arc<FakeBackend>) -> AppController {
    let api: Arc<dyn BackendApi> = backend.clone();
    AppController::new(api, ClientSettings::default())
}

/// Pump events until the job finishes, collecting every update on the way.
async fn run_to_finish(controller: &mut AppController) -> (SessionOutcome, Vec<SessionUpdate>) {
    let mut updates = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(3600), controller.next_event())
            .await
            .expect("job never finished")
            .expect("event channel closed");
        match controller.handle_event(event) {
            SessionUpdate::Finished(outcome) => return (outcome, updates),
            other => updates.push(other),
        }
    }
}

fn messages(controller: &AppController) -> Vec<String> {
    controller
        .sink()
        .entries()
        .iter()
        .map(|e| e.message.clone())
        .collect()
}

fn notification_texts(controller: &AppController) -> Vec<(Severity, String)> {
    controller
        .reporter()
        .active()
        .into_iter()
        .map(|n| (n.severity, n.message))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_successful_job_end_to_end() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_stream(StreamScript::Messages(vec![
        control_message("connected"),
        log_message("info", "配置 FFmpeg"),
        control_message("heartbeat"),
        "not json".to_string(),
        log_message("success", "libavcodec 构建完成"),
    ]));
    backend.push_status(running(40, "编译中: libavcodec"));
    backend.push_status(finished(true, None));

    let mut controller = controller_for(&backend);
    let job_id = controller.start_compilation().await.unwrap();
    assert_eq!(job_id, 1);
    assert_eq!(controller.affordance(), CompileAffordance::Compiling);
    assert!(!controller.affordance().enabled());
    assert_eq!(controller.view(), SessionView::CompileStatus);
    assert_eq!(controller.status_text(), DEFAULT_STATUS_TEXT);

    let (outcome, updates) = run_to_finish(&mut controller).await;

    assert!(outcome.success);
    assert_eq!(outcome.job_id, 1);
    assert!(updates.iter().any(|u| matches!(
        u,
        SessionUpdate::Progress(status) if status.progress == 40
    )));

    // Control and malformed payloads never reach the sink
    assert_eq!(messages(&controller), vec!["配置 FFmpeg", "libavcodec 构建完成"]);
    assert_eq!(controller.sink().entries()[1].level, LogLevel::Success);

    assert_eq!(controller.affordance(), CompileAffordance::Succeeded);
    assert_eq!(controller.indicator(), StatusIndicator::Success);
    assert_eq!(controller.view(), SessionView::Summary);
    assert_eq!(controller.progress(), 100);
    assert!(!controller.is_compiling());
    assert!(notification_texts(&controller)
        .contains(&(Severity::Success, "FFmpeg编译完成！".to_string())));
}

#[tokio::test(start_paused = true)]
async fn test_monitoring_stops_after_terminal_status() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_stream(StreamScript::Messages(vec![log_message("info", "start")]));
    backend.push_status(running(10, ""));
    backend.push_status(finished(true, None));

    let mut controller = controller_for(&backend);
    controller.start_compilation().await.unwrap();
    run_to_finish(&mut controller).await;

    assert_eq!(backend.polls(), 2);
    assert!(!controller.supervisor().is_monitoring());

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(backend.polls(), 2, "no poll after the job ended");
    assert_eq!(backend.opens(), 1, "no stream re-open after the job ended");
    assert_eq!(controller.pump_events(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_late_events_are_dropped() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_status(finished(true, None));

    let mut controller = controller_for(&backend);
    let job_id = controller.start_compilation().await.unwrap();
    run_to_finish(&mut controller).await;
    let before = controller.sink().len();

    let late_log = SupervisorEvent::Log {
        job_id,
        event: LogEvent::new("10:00:09", LogLevel::Info, "too late"),
    };
    assert_eq!(controller.handle_event(late_log), SessionUpdate::Dropped);

    let late_status = SupervisorEvent::Status {
        job_id,
        status: finished(false, Some("stale")),
    };
    assert_eq!(controller.handle_event(late_status), SessionUpdate::Dropped);

    assert_eq!(controller.sink().len(), before);
    assert_eq!(controller.affordance(), CompileAffordance::Succeeded);
}

#[tokio::test(start_paused = true)]
async fn test_second_start_while_running_is_busy() {
    let backend = Arc::new(FakeBackend::new());
    let mut controller = controller_for(&backend);

    controller.start_compilation().await.unwrap();
    let err = controller.start_compilation().await.unwrap_err();

    assert!(matches!(err, AppError::Busy(_)));
    assert_eq!(backend.starts(), 1, "busy start must not reach the server");
    assert!(notification_texts(&controller)
        .contains(&(Severity::Warning, "编译正在进行中...".to_string())));
    assert_eq!(controller.affordance(), CompileAffordance::Compiling);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(backend.opens(), 1, "busy start must not open a second stream");
    assert_eq!(backend.polls(), 1, "busy start must not start a second poll");
}

#[tokio::test(start_paused = true)]
async fn test_rejected_start_opens_no_channels() {
    let backend = Arc::new(FakeBackend::new());
    backend.reject_next_start("已有编译任务在运行");
    let mut controller = controller_for(&backend);

    let err = controller.start_compilation().await.unwrap_err();
    assert_eq!(err.user_message(), "启动编译失败: 已有编译任务在运行");
    assert!(notification_texts(&controller)
        .contains(&(Severity::Error, "启动编译失败: 已有编译任务在运行".to_string())));

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(backend.opens(), 0);
    assert_eq!(backend.polls(), 0);
    assert!(!controller.is_compiling());
    assert_eq!(controller.affordance(), CompileAffordance::Ready);
    assert_eq!(controller.view(), SessionView::Summary);

    // A rejected start does not block the next one
    controller.start_compilation().await.unwrap();
    assert_eq!(backend.starts(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_configuration_is_not_submitted() {
    let backend = Arc::new(FakeBackend::new());
    let mut controller = controller_for(&backend);
    controller
        .set_field(ConfigField::Decoders, FieldValue::List(Vec::new()))
        .unwrap();

    let err = controller.start_compilation().await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(controller.last_validation_error(), Some("请至少选择一个解码器"));
    assert_eq!(backend.starts(), 0);
    assert_eq!(controller.affordance(), CompileAffordance::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_poll_failures_retry_on_fixed_interval() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_status_error("internal error");
    backend.push_status_error("internal error");
    backend.push_status(finished(false, Some("链接失败")));

    let mut controller = controller_for(&backend);
    let started = tokio::time::Instant::now();
    controller.start_compilation().await.unwrap();
    let (outcome, _) = run_to_finish(&mut controller).await;

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(120), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(121), "elapsed {:?}", elapsed);
    assert_eq!(backend.polls(), 3);

    assert!(!outcome.success);
    assert_eq!(outcome.message(), "编译失败: 链接失败");
    assert_eq!(controller.affordance(), CompileAffordance::Failed);
    assert_eq!(controller.indicator(), StatusIndicator::Error);
    assert!(notification_texts(&controller)
        .contains(&(Severity::Error, "编译失败: 链接失败".to_string())));
}

#[tokio::test(start_paused = true)]
async fn test_failure_without_error_reports_unknown() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_status(finished(false, None));

    let mut controller = controller_for(&backend);
    controller.start_compilation().await.unwrap();
    let (outcome, _) = run_to_finish(&mut controller).await;

    assert_eq!(outcome.message(), "编译失败: 未知错误");
}

#[tokio::test(start_paused = true)]
async fn test_stream_reconnects_after_error() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_stream(StreamScript::Fail("connection refused".to_string()));
    backend.push_stream(StreamScript::Messages(vec![log_message("info", "reconnected")]));

    let mut controller = controller_for(&backend);
    let started = tokio::time::Instant::now();
    controller.start_compilation().await.unwrap();

    let mut saw_notice = false;
    loop {
        let event = controller.next_event().await.unwrap();
        match controller.handle_event(event) {
            SessionUpdate::StreamNotice(message) => {
                assert!(message.contains("connection refused"));
                saw_notice = true;
            }
            SessionUpdate::LogAppended => break,
            _ => {}
        }
    }

    assert!(saw_notice);
    assert!(started.elapsed() >= Duration::from_secs(3));
    assert_eq!(backend.opens(), 2);
    assert_eq!(messages(&controller), vec!["reconnected"]);
    // Notices are diagnostic only
    assert!(notification_texts(&controller).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_completion_resets_log_view() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_stream(StreamScript::Messages(vec![log_message("info", "first run")]));
    backend.push_status(running(50, ""));
    backend.push_status(finished(true, None));

    let mut controller = controller_for(&backend);
    controller.start_compilation().await.unwrap();
    run_to_finish(&mut controller).await;
    assert_eq!(controller.sink().len(), 1);

    let second = controller.start_compilation().await.unwrap();
    assert_eq!(second, 2);
    assert_eq!(backend.starts(), 2);
    assert!(controller.sink().is_empty());
    assert!(controller.sink().placeholder().is_none());
    assert_eq!(controller.affordance(), CompileAffordance::Compiling);
}

#[tokio::test(start_paused = true)]
async fn test_running_snapshot_without_label_uses_default_text() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_status(running(250, ""));

    let mut controller = controller_for(&backend);
    controller.start_compilation().await.unwrap();

    let event = controller.next_event().await.unwrap();
    assert!(matches!(controller.handle_event(event), SessionUpdate::Progress(_)));
    assert_eq!(controller.status_text(), DEFAULT_STATUS_TEXT);
    assert_eq!(controller.progress(), 100);
    assert_eq!(controller.indicator(), StatusIndicator::Running);
}
