use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use tokio_cron_scheduler::{Job, JobScheduler};

pub type RefreshCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Starts a scheduler running `callback` on `cron_spec` (six-field, with seconds).
pub async fn configure_refresh_job(cron_spec: &str, callback: RefreshCallback) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;
    let label = cron_spec.to_string();
    let job = Job::new_async(cron_spec, move |_id, _l| {
        let cb = callback.clone();
        let cron_label = label.clone();
        Box::pin(async move {
            tracing::debug!(target: "scheduler", cron = %cron_label, "auto refresh triggered");
            cb().await;
        })
    })
    .with_context(|| format!("invalid auto refresh cron spec {cron_spec:?}"))?;
    scheduler.add(job).await?;
    scheduler.start().await?;
    tracing::info!(target: "scheduler", cron = %cron_spec, "auto refresh job registered");
    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use futures::FutureExt;

    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn rejects_malformed_cron_expression() {
        let callback: RefreshCallback = Arc::new(|| async {}.boxed());
        assert!(configure_refresh_job("every so often", callback).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn runs_callback_on_schedule() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let callback: RefreshCallback = Arc::new(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        });

        let mut scheduler = configure_refresh_job("* * * * * *", callback).await.unwrap();
        for _ in 0..40 {
            if runs.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        scheduler.shutdown().await.unwrap();
        assert!(runs.load(Ordering::SeqCst) > 0);
    }
}
