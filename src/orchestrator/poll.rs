//! Status-poll producer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use super::state::JobId;
use super::{cancelled, SupervisorEvent};
use crate::backend::BackendApi;

/// Pull the job status until it reports not-running.
///
/// The first pull is immediate. Each following pull is scheduled only after
/// the previous one was handled. Failures are retried on the same interval
/// forever.
pub(crate) async fn run_status_poll(
    job_id: JobId,
    backend: Arc<dyn BackendApi>,
    interval: Duration,
    tx: mpsc::Sender<SupervisorEvent>,
    mut cancel_rx: watch::Receiver<bool>,
) {
    let mut failures: u64 = 0;

    loop {
        let result = tokio::select! {
            biased;
            _ = cancelled(&mut cancel_rx) => return,
            result = backend.compilation_status() => result,
        };

        match result {
            Ok(status) => {
                failures = 0;
                let running = status.running;
                if tx.send(SupervisorEvent::Status { job_id, status }).await.is_err() {
                    return;
                }
                if !running {
                    log::debug!("[Supervisor] job {}: terminal status, polling stopped", job_id);
                    return;
                }
            }
            Err(e) => {
                failures += 1;
                log::warn!(
                    "[Supervisor] job {}: 获取编译状态失败 ({} consecutive): {}",
                    job_id,
                    failures,
                    e
                );
            }
        }

        tokio::select! {
            biased;
            _ = cancelled(&mut cancel_rx) => return,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
