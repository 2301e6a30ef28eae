// 定时任务
// 每个任务独立计时，同一任务不会并发执行

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::Instrument;
use uuid::Uuid;

use crate::error::TokenError;

#[async_trait]
pub trait ScheduledJob: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self) -> Result<(), TokenError>;
}

/// 同一时刻只允许一个持有者
#[derive(Debug, Default)]
pub struct SingleFlight {
    running: AtomicBool,
}

impl SingleFlight {
    pub fn try_acquire(self: &Arc<Self>) -> Option<FlightGuard> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard {
                flight: Arc::clone(self),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// 释放时清除运行标记，任务 panic 也会释放
#[derive(Debug)]
pub struct FlightGuard {
    flight: Arc<SingleFlight>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.flight.running.store(false, Ordering::Release);
    }
}

#[derive(Default)]
pub struct Scheduler {
    jobs: Vec<(Duration, Arc<dyn ScheduledJob>)>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 周期为 0 的任务不会启动
    pub fn every(mut self, period: Duration, job: Arc<dyn ScheduledJob>) -> Self {
        self.jobs.push((period, job));
        self
    }

    pub fn start(self) -> SchedulerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);

        let loops = self
            .jobs
            .into_iter()
            .filter_map(|(period, job)| {
                if period.is_zero() {
                    tracing::warn!(job = job.name(), "Job disabled, period is zero");
                    return None;
                }
                tracing::info!(job = job.name(), period_secs = period.as_secs(), "Job scheduled");
                Some(tokio::spawn(tick_loop(period, job, stop_rx.clone())))
            })
            .collect();

        SchedulerHandle {
            stop: stop_tx,
            loops,
        }
    }
}

pub struct SchedulerHandle {
    stop: watch::Sender<bool>,
    loops: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// 停止计时，并等待已开始的运行完成
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        for handle in self.loops {
            if let Err(e) = handle.await {
                tracing::error!("Scheduler loop terminated abnormally: {}", e);
            }
        }
        tracing::info!("Scheduler stopped");
    }
}

async fn tick_loop(period: Duration, job: Arc<dyn ScheduledJob>, mut stop: watch::Receiver<bool>) {
    let flight = Arc::new(SingleFlight::default());
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // 单飞保证同一时刻最多一个运行
    let mut in_flight: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            _ = stop.changed() => break,
            _ = ticker.tick() => {
                let Some(guard) = flight.try_acquire() else {
                    tracing::warn!(job = job.name(), "Previous run still active, skipping tick");
                    continue;
                };

                let job = job.clone();
                let span = tracing::info_span!("job", job = %job.name(), run_id = %Uuid::new_v4());
                in_flight = Some(tokio::spawn(
                    async move {
                        let _guard = guard;
                        let started = Instant::now();
                        match job.run().await {
                            Ok(()) => tracing::debug!(
                                elapsed_ms = started.elapsed().as_millis() as u64,
                                "Job finished"
                            ),
                            Err(e) => tracing::error!(
                                elapsed_ms = started.elapsed().as_millis() as u64,
                                "Job failed: {}",
                                e
                            ),
                        }
                    }
                    .instrument(span),
                ));
            }
        }
    }

    if let Some(run) = in_flight {
        if !run.is_finished() {
            tracing::info!(job = job.name(), "Waiting for in-flight run to finish");
        }
        if let Err(e) = run.await {
            tracing::error!(job = job.name(), "Job run terminated abnormally: {}", e);
        }
    }
}
