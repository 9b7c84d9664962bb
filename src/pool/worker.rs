//! Parser worker loop
//!
//! Each worker pulls file paths from the job queue, parses one file at
//! a time and pushes the report to the collector. Failures stay inside
//! the file they belong to: `parse_file` maps every scan or read error
//! to a diagnostic plus an empty report, so a worker never dies on a
//! corrupt input and simply advances to the next file.

use crate::store::file::{parse_file, FileReport};
use crossbeam_channel::{Receiver, Sender};
use regex::Regex;
use std::path::PathBuf;
use tracing::{debug, warn};

pub(crate) fn parser_loop(
    id: usize,
    jobs: Receiver<PathBuf>,
    results: Sender<FileReport>,
    match_re: Option<Regex>,
) {
    debug!(worker = id, "parser worker starting");
    for path in jobs.iter() {
        let report = parse_file(&path, match_re.clone());
        debug!(
            worker = id,
            file = %report.name,
            messages = report.count(),
            "file parsed"
        );
        if results.send(report).is_err() {
            warn!(worker = id, "result channel closed, stopping");
            return;
        }
    }
    debug!(worker = id, "parser worker finished");
}
