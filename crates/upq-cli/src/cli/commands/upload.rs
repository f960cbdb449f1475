//! `upq upload` – push files through the queue and report live status.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use upq_core::config::{QueueConfig, UpqConfig};
use upq_core::transfer::LocalDirExecutor;
use upq_core::{EventKind, JobId, JobSnapshot, JobState, Payload, QueueEvent, QueueManager};

const PROGRESS_INTERVAL_MS: u64 = 500;

/// Flags of `upq upload`; unset values fall back to the config file.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub files: Vec<PathBuf>,
    pub jobs: Option<usize>,
    pub retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub dest: Option<PathBuf>,
    pub retry_rounds: u32,
    pub json: bool,
}

impl UploadOptions {
    /// Queue policy after applying command-line overrides.
    pub fn queue_config(&self, base: &QueueConfig) -> QueueConfig {
        QueueConfig {
            max_concurrent: self.jobs.unwrap_or(base.max_concurrent),
            max_retries: self.retries.unwrap_or(base.max_retries),
            retry_delay_ms: self.retry_delay_ms.unwrap_or(base.retry_delay_ms),
        }
    }
}

pub async fn run_upload(cfg: &UpqConfig, opts: UploadOptions) -> Result<()> {
    let queue_cfg = opts.queue_config(&cfg.queue);
    let executor = match &opts.dest {
        Some(dir) => LocalDirExecutor::new(dir.clone(), cfg.storage.max_file_bytes),
        None => LocalDirExecutor::from_config(&cfg.storage)?,
    };
    tracing::info!(dest = %executor.dest_dir().display(), "uploading {} file(s)", opts.files.len());

    let payloads = opts
        .files
        .iter()
        .map(|path| Payload::from_path(path).with_context(|| format!("cannot upload {}", path.display())))
        .collect::<Result<Vec<_>>>()?;

    let queue = QueueManager::new(queue_cfg, Arc::new(executor)).context("create upload queue")?;
    let events = queue.subscribe_channel(&[EventKind::Progress, EventKind::StatusChange]);
    let max_retries = queue.config().max_retries;
    let json = opts.json;
    let printer = tokio::spawn(async move { print_events(events, max_retries, json).await });

    queue.submit(payloads);
    queue.wait_idle().await;
    for round in 1..=opts.retry_rounds {
        if queue.status().failed == 0 {
            break;
        }
        let reset = queue.retry_failed();
        tracing::info!(round, reset, "retrying failed uploads");
        queue.wait_idle().await;
    }

    let jobs = queue.jobs();
    let status = queue.status();
    // Dropping the last handle closes the event channel and ends the printer.
    drop(queue);
    let _ = printer.await;

    if json {
        println!("{}", serde_json::json!({ "event": "summary", "status": status, "jobs": jobs }));
    } else {
        print_summary(&jobs);
    }

    if status.failed > 0 {
        anyhow::bail!("{} of {} upload(s) failed", status.failed, status.total);
    }
    Ok(())
}

async fn print_events(mut events: mpsc::UnboundedReceiver<QueueEvent>, max_retries: u32, json: bool) {
    let mut last_progress: HashMap<JobId, Instant> = HashMap::new();
    let interval = Duration::from_millis(PROGRESS_INTERVAL_MS);
    while let Some(event) = events.recv().await {
        if json {
            let kind = match event.kind() {
                EventKind::Progress => "progress",
                EventKind::StatusChange => "status",
            };
            println!("{}", serde_json::json!({ "event": kind, "job": event.snapshot() }));
            continue;
        }
        match &event {
            QueueEvent::Progress(job) => {
                let now = Instant::now();
                let due = last_progress
                    .get(&job.id)
                    .map_or(true, |t| now.duration_since(*t) >= interval);
                if due {
                    println!("{:>4} {:>3}%      {}", job.id, job.progress, job.payload.name);
                    last_progress.insert(job.id, now);
                }
            }
            QueueEvent::StatusChanged(job) => println!("{}", status_line(job, max_retries)),
        }
    }
}

/// One human-readable line for a status change.
pub(crate) fn status_line(job: &JobSnapshot, max_retries: u32) -> String {
    let mut line = format!("{:>4} {:<10} {}", job.id, job.state.label(), job.payload.name);
    match job.state {
        JobState::Retrying => {
            line.push_str(&format!(" (retry {}/{})", job.retry_count, max_retries));
        }
        JobState::Completed => {
            if let Some(receipt) = &job.result {
                line.push_str(&format!(" -> {}", receipt.location));
            }
        }
        _ => {}
    }
    if job.state != JobState::Completed {
        if let Some(err) = &job.error {
            line.push_str(&format!(": {}", err));
        }
    }
    line
}

fn print_summary(jobs: &[JobSnapshot]) {
    println!();
    println!("{:<6} {:<10} {:<6} {}", "ID", "STATE", "RETRY", "FILE");
    for j in jobs {
        let detail = match (&j.result, &j.error) {
            (Some(r), _) => format!("{} -> {}", j.payload.name, r.location),
            (None, Some(e)) => format!("{} ({})", j.payload.name, e),
            (None, None) => j.payload.name.clone(),
        };
        println!("{:<6} {:<10} {:<6} {}", j.id, j.state.as_str(), j.retry_count, detail);
    }
}
