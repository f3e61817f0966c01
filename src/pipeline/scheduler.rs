use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::{BatchProgress, JobOutcome, JobPipeline};

/// Outcome of one reference in a batch
#[derive(Debug)]
pub struct JobReport {
    pub index: usize,
    pub reference: String,
    pub outcome: JobOutcome,
}

/// Outcomes of a whole batch, in input order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub jobs: Vec<JobReport>,
    /// Jobs whose task panicked before reporting
    pub aborted: usize,
}

impl BatchReport {
    pub fn completed(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Completed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(JobOutcome::is_failed) + self.aborted
    }

    fn count(&self, predicate: impl Fn(&JobOutcome) -> bool) -> usize {
        self.jobs.iter().filter(|j| predicate(&j.outcome)).count()
    }
}

/// Run every reference through `pipeline`, at most `concurrency` at a time.
/// One job failing never stops the others; the batch always runs to completion.
pub async fn run_batch(
    pipeline: Arc<JobPipeline>,
    references: Vec<String>,
    concurrency: usize,
    progress: BatchProgress,
) -> BatchReport {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    tracing::info!(
        "Processing {} video(s) with up to {} at a time",
        references.len(),
        concurrency.max(1)
    );

    for (index, reference) in references.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let pipeline = Arc::clone(&pipeline);
        let progress = progress.clone();

        tasks.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return None;
            };

            progress.job_started(&reference);
            let outcome = pipeline.run(&reference).await;
            progress.job_finished(&reference, &outcome);

            Some(JobReport {
                index,
                reference,
                outcome,
            })
        });
    }

    let mut report = BatchReport::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Some(job)) => report.jobs.push(job),
            Ok(None) => report.aborted += 1,
            Err(e) => {
                tracing::error!("Job task aborted: {}", e);
                report.aborted += 1;
            }
        }
    }

    report.jobs.sort_by_key(|j| j.index);
    progress.finish();
    report
}
