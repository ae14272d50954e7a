//! In-process expiry sweep. Runs the same sweep as `/api/cron/expire-ads`
//! on a fixed interval until shutdown is signalled.

use std::sync::Arc;
use std::time::Duration;

use api_adapters::AdMetrics;
use services::{AdService, SweepReport};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub struct Sweeper {
    service: AdService,
    metrics: Arc<AdMetrics>,
    interval: Duration,
}

impl Sweeper {
    pub fn new(service: AdService, metrics: Arc<AdMetrics>, interval: Duration) -> Self {
        Self {
            service,
            metrics,
            interval,
        }
    }

    /// Runs one sweep and records it.
    pub async fn run_once(&self) -> domains::Result<SweepReport> {
        let report = self.service.expire_sweep().await?;
        self.metrics.observe_sweep(report.expired);
        Ok(report)
    }

    /// The first tick fires immediately, so a restart catches up on
    /// anything that went stale while the service was down.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match self.run_once().await {
                            Ok(report) if report.expired > 0 => {
                                tracing::info!(expired = report.expired, "scheduled sweep expired ads");
                            }
                            Ok(_) => tracing::debug!("scheduled sweep found nothing to expire"),
                            Err(e) => tracing::error!(error = %e, "scheduled sweep failed"),
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            tracing::debug!("sweeper stopping");
                            break;
                        }
                    }
                }
            }
        })
    }
}
