//! `split-messages` command: bucket every recovered message into one
//! base64 file per queue
//!
//! Reader workers fan out over the discovered files; a single writer
//! thread owns the output files so no two threads ever share a handle.

use crate::config::RunConfig;
use crate::discovery::find_files;
use crate::error::{ReplayerError, Result};
use crate::report;
use crate::store::{RabbitFile, ScanControl};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use crossbeam_channel::bounded;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::warn;

/// One base64 line bound for a queue's output file
struct WriteData {
    queue: String,
    line: String,
}

pub fn run(config: &RunConfig) -> Result<()> {
    let output_folder = config.require_output_folder()?.clone();
    fs::create_dir_all(&output_folder)?;

    let files = find_files(&config.folder, config.max_depth, &config.patterns)?;
    let workers = files.len().min(config.threads).max(1);
    report::status(format!("Reading with {workers} thread(s)!"));

    let (jobs_tx, jobs_rx) = bounded::<PathBuf>(workers);
    let (write_tx, write_rx) = bounded::<WriteData>(workers);
    let read_count = Arc::new(AtomicU64::new(0));

    let writer = thread::Builder::new()
        .name("split-writer".to_string())
        .spawn(move || writer_loop(&output_folder, write_rx))?;

    let mut readers = Vec::with_capacity(workers);
    for id in 0..workers {
        let jobs_rx = jobs_rx.clone();
        let write_tx = write_tx.clone();
        let match_re = config.match_re.clone();
        let read_count = Arc::clone(&read_count);
        let handle = thread::Builder::new()
            .name(format!("split-reader-{id}"))
            .spawn(move || {
                for path in jobs_rx.iter() {
                    read_count.fetch_add(1, Ordering::Relaxed);
                    report::status(format!(" - Reading file {}", path.display()));
                    let file = match RabbitFile::load(&path, match_re.clone()) {
                        Ok(file) => file,
                        Err(err) => {
                            report::alert(format!("Unable to read {}: {err}", path.display()));
                            continue;
                        }
                    };
                    file.scan_with(|msg| {
                        let data = WriteData {
                            queue: msg.queue.clone(),
                            line: STANDARD.encode(&msg.body),
                        };
                        if write_tx.send(data).is_err() {
                            warn!(file = %path.display(), "writer gone, stopping scan");
                            return ScanControl::Stop;
                        }
                        ScanControl::Continue
                    });
                }
            })?;
        readers.push(handle);
    }
    drop(jobs_rx);
    drop(write_tx);

    for path in files {
        if jobs_tx.send(path).is_err() {
            return Err(ReplayerError::ChannelClosed);
        }
    }
    drop(jobs_tx);

    for handle in readers {
        if handle.join().is_err() {
            warn!("split reader panicked");
        }
    }
    report::status(format!(
        "Read {} file(s)!",
        read_count.load(Ordering::Relaxed)
    ));

    let written = writer.join().map_err(|_| ReplayerError::ChannelClosed)?;
    report::status(format!("Done writing! {written} message(s)"));
    Ok(())
}

/// Drain the write channel into per-queue files, creating them lazily
fn writer_loop(output_folder: &Path, write_rx: crossbeam_channel::Receiver<WriteData>) -> u64 {
    let mut handles: HashMap<String, BufWriter<File>> = HashMap::new();
    let mut written = 0u64;

    for data in write_rx.iter() {
        if !handles.contains_key(&data.queue) {
            let path = output_folder.join(&data.queue);
            match File::create(&path) {
                Ok(file) => {
                    handles.insert(data.queue.clone(), BufWriter::new(file));
                }
                Err(err) => {
                    warn!(file = %path.display(), error = %err, "cannot create output file");
                    continue;
                }
            }
        }
        if let Some(writer) = handles.get_mut(&data.queue) {
            if let Err(err) = writeln!(writer, "{}", data.line) {
                warn!(queue = %data.queue, error = %err, "write failed");
                continue;
            }
            written += 1;
        }
    }

    for (queue, mut writer) in handles {
        if let Err(err) = writer.flush() {
            warn!(queue = %queue, error = %err, "flush failed");
        }
    }
    written
}
