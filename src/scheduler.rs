use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::application::OrderService;
use crate::domain::ports::RowStore;

/// Sweeps the default sheet every `period`, starting immediately.
pub fn spawn_retention_sweeper<S: RowStore>(
    service: Arc<OrderService<S>>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let service = Arc::clone(&service);
            if let Err(e) = tokio::task::spawn_blocking(move || service.sweep_expired(None)).await {
                log::error!("retention sweep task aborted: {}", e);
            }
        }
    })
}
