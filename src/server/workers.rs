//! Bounded worker pool. Submissions land on a bounded queue; a fixed set
//! of workers drains it, each owning one job end-to-end and writing its
//! terminal status. This caps concurrent load on the model APIs and the
//! render tool regardless of submission rate.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::jobs::{JobStatus, JobStore};
use crate::pipeline::JobOrchestrator;

/// One queued submission.
#[derive(Debug)]
pub struct JobRequest {
    pub job_id: String,
    pub prompt: String,
}

/// Spawn `count` workers draining `rx`. Workers exit when the queue
/// closes (all senders dropped).
pub fn spawn_workers(
    count: usize,
    rx: mpsc::Receiver<JobRequest>,
    store: JobStore,
    config: Arc<Config>,
) {
    let rx = Arc::new(Mutex::new(rx));

    for worker in 0..count {
        let rx = Arc::clone(&rx);
        let store = store.clone();
        let config = Arc::clone(&config);

        tokio::spawn(async move {
            loop {
                let request = rx.lock().await.recv().await;
                let Some(request) = request else {
                    debug!(worker, "job queue closed, worker exiting");
                    break;
                };

                info!(worker, job_id = %request.job_id, "job picked up");
                let orchestrator = JobOrchestrator::new(Arc::clone(&config));
                match orchestrator.run(&request.job_id, &request.prompt).await {
                    Ok(published) => {
                        info!(worker, job_id = %request.job_id, "job succeeded");
                        store.complete(
                            &request.job_id,
                            JobStatus::Success,
                            "Video generated successfully",
                            Some(published),
                        );
                    }
                    Err(e) => {
                        error!(worker, job_id = %request.job_id, error = %e, "job failed");
                        store.complete(&request.job_id, JobStatus::Error, &e.to_string(), None);
                    }
                }
            }
        });
    }
}
