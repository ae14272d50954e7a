use std::sync::Arc;

use domains::AccessGuard;
use services::AdService;

use crate::metrics::AdMetrics;

/// State shared across all axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: AdService,
    /// Guards `/api/cron/expire-ads`
    pub cron_guard: Arc<dyn AccessGuard>,
    /// Guards `/api/admin/*`
    pub admin_guard: Arc<dyn AccessGuard>,
    pub metrics: Arc<AdMetrics>,
}

impl AppState {
    pub fn new(
        service: AdService,
        cron_guard: Arc<dyn AccessGuard>,
        admin_guard: Arc<dyn AccessGuard>,
        metrics: Arc<AdMetrics>,
    ) -> Self {
        Self {
            service,
            cron_guard,
            admin_guard,
            metrics,
        }
    }
}
