//! `find-lost` command: selective extraction against per-queue quotas
//!
//! Given a document listing how many messages each queue lost, scan the
//! persistent-store segments newest-first and write each matched body
//! as a base64 line into that queue's output file. A queue whose quota
//! is met is done; once every queue is done scanning stops, even in the
//! middle of a file. Output files that received nothing are deleted.

use crate::config::RunConfig;
use crate::discovery::find_files;
use crate::error::{ConfigError, Result};
use crate::report::{self, print_aligned};
use crate::store::{RabbitFile, ScanControl};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// One entry of the lost-message document
#[derive(Debug, Clone, Deserialize)]
pub struct LostQueue {
    pub name: String,
    pub messages: u64,
}

/// Per-queue result of a finder run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindOutcome {
    pub queue: String,
    pub to_find: u64,
    pub found: u64,
    pub push_api: u64,
}

/// Outcome of the whole finder run
#[derive(Debug)]
pub struct FindSummary {
    /// Per-queue outcomes, sorted by queue name
    pub outcomes: Vec<FindOutcome>,
    /// Segments actually opened before the quotas were met
    pub files_handled: usize,
}

struct QueueOutput {
    to_find: u64,
    found: u64,
    push_api: u64,
    done: bool,
    path: PathBuf,
    writer: BufWriter<File>,
}

pub fn run(config: &RunConfig, lost_messages: &Path, starts_with: Option<u64>) -> Result<FindSummary> {
    let output_folder = config.require_output_folder()?.clone();
    fs::create_dir_all(&output_folder)?;

    let quotas = load_lost_queues(lost_messages)?;

    report::status("Finding files");
    let files = find_files(&config.folder, config.max_depth, &config.patterns)?;
    report::status(format!("Found {} files. Sorting files", files.len()));

    // Persistent-store segments carry numeric names; replay them
    // newest (highest number) first
    let mut numbers: Vec<u64> = files
        .iter()
        .filter_map(|path| {
            let stem = path.file_stem()?.to_str()?;
            match stem.parse::<u64>() {
                Ok(n) => Some(n),
                Err(_) => {
                    warn!(file = %path.display(), "skipping non-numeric file name");
                    None
                }
            }
        })
        .collect();
    numbers.sort_unstable_by(|a, b| b.cmp(a));
    numbers.dedup();
    if let Some(bound) = starts_with {
        numbers.retain(|&n| n <= bound);
    }

    // One output stream per queue, created up front
    let mut outputs: HashMap<String, QueueOutput> = HashMap::new();
    for quota in &quotas {
        let path = output_folder.join(&quota.name);
        let writer = BufWriter::new(File::create(&path)?);
        outputs.insert(
            quota.name.clone(),
            QueueOutput {
                to_find: quota.messages,
                found: 0,
                push_api: 0,
                done: quota.messages == 0,
                path,
                writer,
            },
        );
    }

    let mut files_handled = 0;
    for number in numbers {
        if outputs.values().all(|q| q.done) {
            break;
        }
        let path = config.folder.join(format!("{number}.rdq"));
        report::status(format!("Handling file: {}", path.display()));
        files_handled += 1;

        let file = match RabbitFile::load(&path, None) {
            Ok(file) => file,
            Err(err) => {
                report::alert(format!("Unable to read {}: {err}", path.display()));
                continue;
            }
        };

        file.scan_with(|msg| {
            let mut completed: Option<String> = None;
            if let Some(queue) = outputs.get_mut(&msg.queue) {
                if !queue.done {
                    if msg.is_push() {
                        queue.push_api += 1;
                    }
                    let line = STANDARD.encode(&msg.body);
                    if let Err(err) = writeln!(queue.writer, "{line}") {
                        warn!(queue = %msg.queue, error = %err, "write failed");
                    }
                    queue.found += 1;
                    if queue.found >= queue.to_find {
                        queue.done = true;
                        completed = Some(msg.queue.clone());
                    }
                }
            }
            if let Some(name) = completed {
                report::status(format!("All messages in {name} have been found"));
                if outputs.values().all(|q| q.done) {
                    return ScanControl::Stop;
                }
            }
            ScanControl::Continue
        });
    }
    report::status("Completed!");

    // Flush everything, drop the empty output files, table the rest
    let mut names: Vec<String> = outputs.keys().cloned().collect();
    names.sort();

    let mut outcomes = Vec::with_capacity(names.len());
    for name in &names {
        let mut queue = outputs.remove(name).expect("queue output by name");
        if let Err(err) = queue.writer.flush() {
            warn!(queue = %name, error = %err, "flush failed");
        }
        drop(queue.writer);
        if queue.found == 0 {
            if let Err(err) = fs::remove_file(&queue.path) {
                warn!(file = %queue.path.display(), error = %err, "cleanup failed");
            }
        }
        outcomes.push(FindOutcome {
            queue: name.clone(),
            to_find: queue.to_find,
            found: queue.found,
            push_api: queue.push_api,
        });
    }

    print_summary(&outcomes);

    Ok(FindSummary {
        outcomes,
        files_handled,
    })
}

fn load_lost_queues(path: &Path) -> Result<Vec<LostQueue>> {
    let text = fs::read_to_string(path).map_err(|err| ConfigError::LostMessagesUnreadable {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    let quotas: Vec<LostQueue> =
        serde_yaml::from_str(&text).map_err(|err| ConfigError::LostMessagesMalformed {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
    Ok(quotas)
}

fn print_summary(outcomes: &[FindOutcome]) {
    let header: Vec<String> = [
        "Queue name",
        "To find",
        "Found",
        "PushAPI",
        "Crawlers",
        "Missing/Over",
    ]
    .map(String::from)
    .to_vec();

    let row = |name: &str, to_find: u64, found: u64, push_api: u64| {
        vec![
            name.to_string(),
            to_find.to_string(),
            found.to_string(),
            push_api.to_string(),
            (found as i64 - push_api as i64).to_string(),
            (found as i64 - to_find as i64).to_string(),
        ]
    };

    let rows: Vec<Vec<String>> = outcomes
        .iter()
        .map(|o| row(&o.queue, o.to_find, o.found, o.push_api))
        .collect();

    let to_find: u64 = outcomes.iter().map(|o| o.to_find).sum();
    let found: u64 = outcomes.iter().map(|o| o.found).sum();
    let push_api: u64 = outcomes.iter().map(|o| o.push_api).sum();
    let footer = row("", to_find, found, push_api);

    print_aligned(&header, &rows, Some(&footer));
    println!();
}
