//! Pool coordinator
//!
//! Channel topology:
//!
//! - `jobs`: bounded at the worker count, so submission applies
//!   backpressure instead of loading every path up front.
//! - `results`: bounded at the number of files, so workers never block
//!   pushing reports while the coordinator is still submitting.
//! - optional `publish`: owned by the publisher pool, bounded at
//!   workers × 30; the coordinator forwards extracted messages there as
//!   reports come in.
//!
//! Reports arrive in completion order; per-queue statistics are
//! associative so the interleaving does not matter.

use crate::error::{ReplayerError, Result};
use crate::stats::Statistics;
use crate::store::{FileReport, Message};
use crossbeam_channel::{bounded, Sender};
use regex::Regex;
use std::path::PathBuf;
use std::thread;
use tracing::{debug, error, info};

use super::worker::parser_loop;

/// Aggregated outcome of one pipeline run
#[derive(Debug, Default)]
pub struct RunReport {
    /// One bucket per file that produced messages
    pub files: Statistics,
    /// File buckets folded by extension
    pub file_types: Statistics,
    /// One bucket per queue
    pub queues: Statistics,
    /// Queue buckets folded by the queue name's extension
    pub queue_types: Statistics,
    /// Files submitted to the pool
    pub files_processed: usize,
    /// Total messages kept across all files
    pub messages: u64,
}

/// Run the parser pool over the given files
///
/// When `publish` is set, every extracted message is forwarded there
/// after its file's statistics are merged. Per-file parse failures have
/// already been converted into empty reports by the workers; the only
/// errors left here are broken channels.
pub fn run_pool(
    files: Vec<PathBuf>,
    threads: usize,
    match_re: Option<Regex>,
    publish: Option<Sender<Message>>,
) -> Result<RunReport> {
    let workers = threads.max(1);
    let total = files.len();
    let (jobs_tx, jobs_rx) = bounded::<PathBuf>(workers);
    let (results_tx, results_rx) = bounded::<FileReport>(total.max(1));

    info!(files = total, workers, "starting extraction pool");

    let mut handles = Vec::with_capacity(workers);
    for id in 0..workers {
        let jobs_rx = jobs_rx.clone();
        let results_tx = results_tx.clone();
        let match_re = match_re.clone();
        let handle = thread::Builder::new()
            .name(format!("parser-{id}"))
            .spawn(move || parser_loop(id, jobs_rx, results_tx, match_re))?;
        handles.push(handle);
    }
    drop(jobs_rx);
    drop(results_tx);

    for path in files {
        if jobs_tx.send(path).is_err() {
            return Err(ReplayerError::ChannelClosed);
        }
    }
    drop(jobs_tx);

    let mut report = RunReport {
        files_processed: total,
        ..RunReport::default()
    };
    for _ in 0..total {
        let file = results_rx
            .recv()
            .map_err(|_| ReplayerError::ChannelClosed)?;
        debug!(
            file = %file.name,
            messages = file.count(),
            bytes = file.size(),
            "report collected"
        );

        report.queues.join(&file.queues);
        if file.count() > 0 {
            report.files.add_statistic(&file.stat);
            report.file_types.add_group(&file.kind, &file.stat);
        }
        report.messages += file.count() as u64;

        if let Some(tx) = &publish {
            for msg in file.messages {
                tx.send(msg).map_err(|_| ReplayerError::ChannelClosed)?;
            }
        }
    }

    for handle in handles {
        if handle.join().is_err() {
            error!("parser worker panicked");
        }
    }

    let queues = &report.queues;
    let queue_types = &mut report.queue_types;
    for stat in queues.iter() {
        queue_types.add_group(queue_type_of(&stat.name), stat);
    }

    Ok(report)
}

/// Queue type: the extension of the queue name, without the dot
fn queue_type_of(queue: &str) -> &str {
    queue.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("")
}
