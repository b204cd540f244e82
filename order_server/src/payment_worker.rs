use std::time::Duration;

use chrono::Utc;
use log::*;
use order_engine::{PaymentApi, SqliteDatabase};
use tokio::task::JoinHandle;

use crate::integrations::sepay::SepayProvider;

/// Starts the payment sweep worker. Every `interval`, each order created within the last `window` that is still
/// waiting for its bank transfer is checked against the payment provider. This catches transfers whose webhook was lost
/// after the customer closed the payment page.
///
/// Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_payment_worker(
    api: PaymentApi<SqliteDatabase, SepayProvider>,
    interval: Duration,
    window: chrono::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        info!("🕰️ Payment sweep worker started. Checking unpaid orders every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            debug!("🕰️ Running payment sweep");
            match api.sweep(Utc::now() - window).await {
                Ok(result) if result.paid > 0 => {
                    info!("🕰️ Payment sweep checked {} orders. {} were paid.", result.checked, result.paid);
                },
                Ok(result) => debug!("🕰️ Payment sweep checked {} orders. None were paid.", result.checked),
                Err(e) => error!("🕰️ Error running the payment sweep: {e}"),
            }
        }
    })
}
