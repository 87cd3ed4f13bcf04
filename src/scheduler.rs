use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::engine::Engine;

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Pause between successful mover passes.
    pub sweep_interval: Duration,
    /// Shortened pause after a pass that errored out.
    pub error_backoff: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(300),
            error_backoff: Duration::from_secs(60),
        }
    }
}

struct Worker {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Owned handle over the background sweep task. One instance per process;
/// `start` spawns exactly one loop and `stop` joins it. Not a global — pass
/// the handle to whatever needs to control it.
pub struct Scheduler {
    engine: Arc<Engine>,
    config: SchedulerConfig,
    worker: Option<Worker>,
}

impl Scheduler {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self::with_config(engine, SchedulerConfig::default())
    }

    pub fn with_config(engine: Arc<Engine>, config: SchedulerConfig) -> Self {
        Self {
            engine,
            config,
            worker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Spawn the sweep loop. No-op if already running.
    pub fn start(&mut self) {
        if self.worker.is_some() {
            return;
        }
        let (shutdown, rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(self.engine.clone(), self.config, rx));
        self.worker = Some(Worker { shutdown, handle });
        info!("meeting scheduler started");
    }

    /// Signal the loop to terminate and wait until it has exited. Interrupts
    /// an in-progress sleep immediately; a mover pass in flight finishes
    /// first.
    pub async fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = worker.shutdown.send(true);
        let _ = worker.handle.await;
        info!("meeting scheduler stopped");
    }
}

/// Strictly sequential: one mover pass, then sleep. Errors never end the
/// loop — they are logged and followed by the shorter backoff.
async fn run_loop(engine: Arc<Engine>, config: SchedulerConfig, mut shutdown: watch::Receiver<bool>) {
    loop {
        let pause = match engine.check_and_move_finished_meetings().await {
            Ok(report) => {
                debug!(moved = report.moved(), failed = report.failed(), "sweep pass complete");
                config.sweep_interval
            }
            Err(e) => {
                error!(error = %e, "sweep pass failed, backing off");
                metrics::counter!(crate::observability::SCHEDULER_ERRORS_TOTAL).increment(1);
                config.error_backoff
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            changed = shutdown.changed() => {
                // A closed channel means the handle is gone and nothing can
                // ever signal this loop again; exit rather than spin.
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}
