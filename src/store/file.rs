//! Per-file parsing of index and persistent-store files
//!
//! A [`RabbitFile`] owns one file's bytes for the duration of its scan.
//! Framing is selected by extension: `.idx` files are unframed, `.rdq`
//! and anything else use the persistent-store framing. The scan produces
//! a [`FileReport`] with the extracted messages, a file-level statistic
//! bucket and a per-queue table.
//!
//! Failure contract: a scan error discards everything gathered from the
//! file (the report comes back empty) and is reported as a diagnostic —
//! never propagated, so one corrupt file cannot poison the run.

use crate::error::ParseResult;
use crate::stats::{Statistic, Statistics};
use crate::store::blob::Blob;
use crate::store::message::Message;
use crate::store::ScanControl;
use regex::Regex;
use std::fs;
use std::io;
use std::path::Path;
use tracing::warn;

/// Extension marking the unframed queue-index layout
const INDEX_EXTENSION: &str = "idx";

/// Output of parsing one file
#[derive(Debug, Clone, Default)]
pub struct FileReport {
    /// Source file name
    pub name: String,
    /// File type: extension without the dot
    pub kind: String,
    /// Messages in file order
    pub messages: Vec<Message>,
    /// File-level bucket (one fold per kept message)
    pub stat: Statistic,
    /// Per-queue buckets
    pub queues: Statistics,
}

impl FileReport {
    fn empty(name: &str, kind: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            messages: Vec::new(),
            stat: Statistic::named(name),
            queues: Statistics::default(),
        }
    }

    /// Number of messages kept from the file
    pub fn count(&self) -> usize {
        self.messages.len()
    }

    /// Total size of kept messages
    pub fn size(&self) -> f64 {
        self.stat.sum()
    }
}

/// One loaded index or persistent-store file
#[derive(Debug)]
pub struct RabbitFile {
    name: String,
    kind: String,
    framed: bool,
    data: Vec<u8>,
    match_re: Option<Regex>,
}

impl RabbitFile {
    /// Load a whole file into memory
    ///
    /// Messages whose queue does not match `match_re` (when set) are
    /// dropped during the scan.
    pub fn load(path: &Path, match_re: Option<Regex>) -> io::Result<Self> {
        let data = fs::read(path)?;
        let name = path.display().to_string();
        let kind = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_string();
        let framed = kind != INDEX_EXTENSION;
        Ok(Self {
            name,
            kind,
            framed,
            data,
            match_re,
        })
    }

    /// Build a file from raw bytes; used by tests and fixtures
    pub fn from_bytes(name: &str, kind: &str, data: Vec<u8>, match_re: Option<Regex>) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            framed: kind != INDEX_EXTENSION,
            data,
            match_re,
        }
    }

    /// Source file name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File type: extension without the dot
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Scan the file and accumulate a report
    pub fn scan(&self) -> FileReport {
        self.scan_with(|_| ScanControl::Continue)
    }

    /// Scan the file, handing each kept message to `handler` as it is
    /// produced; a `Stop` verdict ends the scan early, keeping the
    /// report gathered so far
    pub fn scan_with<F>(&self, mut handler: F) -> FileReport
    where
        F: FnMut(&Message) -> ScanControl,
    {
        let mut report = FileReport::empty(&self.name, &self.kind);
        match self.run_scan(&mut report, &mut handler) {
            Ok(()) => report,
            Err(err) => {
                warn!(file = %self.name, error = %err, "scan failed, discarding file");
                FileReport::empty(&self.name, &self.kind)
            }
        }
    }

    fn run_scan<F>(&self, report: &mut FileReport, handler: &mut F) -> ParseResult<()>
    where
        F: FnMut(&Message) -> ScanControl,
    {
        let mut blob = Blob::new(&self.data, &self.name, self.framed);
        blob.scan(&mut |msg: Message| {
            if let Some(re) = &self.match_re {
                if !re.is_match(&msg.queue) {
                    return ScanControl::Continue;
                }
            }
            report.stat.add(msg.length as f64);
            report.queues.add(&msg.queue, msg.length as f64);
            let verdict = handler(&msg);
            report.messages.push(msg);
            verdict
        })
    }
}

/// Load and scan one file, mapping read failures to an empty report
///
/// This is the unit of work a parser worker executes per job.
pub fn parse_file(path: &Path, match_re: Option<Regex>) -> FileReport {
    match RabbitFile::load(path, match_re) {
        Ok(file) => file.scan(),
        Err(err) => {
            warn!(file = %path.display(), error = %err, "unable to read file");
            let kind = path
                .extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or("")
                .to_string();
            FileReport::empty(&path.display().to_string(), &kind)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Record bytes shared by the framed and unframed fixtures
    fn record_body(queue: &str, blocks: &[&[u8]]) -> Vec<u8> {
        let mut inner = b"exchange".to_vec();
        inner.push(0x01);
        inner.extend_from_slice(&(queue.len() as u32).to_be_bytes());
        inner.extend_from_slice(queue.as_bytes());
        inner.extend_from_slice(crate::store::RABBIT_MARKER);
        inner.push(b'l');
        inner.extend_from_slice(&(blocks.len() as u32).to_be_bytes());
        for block in blocks {
            inner.push(b'm');
            inner.extend_from_slice(&(block.len() as u32).to_be_bytes());
            inner.extend_from_slice(block);
        }
        inner
    }

    fn rdq_record(queue: &str, blocks: &[&[u8]]) -> Vec<u8> {
        let inner = record_body(queue, blocks);
        let mut rec = (inner.len() as u64).to_be_bytes().to_vec();
        rec.extend_from_slice(&inner);
        rec.push(0xFF);
        rec
    }

    #[test]
    fn test_framed_single_message() {
        let data = rdq_record("qa", &[b"iHELLO"]);
        let file = RabbitFile::from_bytes("seg.rdq", "rdq", data, None);
        let report = file.scan();
        assert_eq!(report.count(), 1);
        assert_eq!(report.messages[0].queue, "qa");
        assert_eq!(report.messages[0].body, b"iHELLO");
        assert_eq!(report.messages[0].method, "Process");
        assert!(!report.messages[0].is_push());
    }

    #[test]
    fn test_unframed_single_message() {
        let data = record_body("q1", &[b"XYZ"]);
        let file = RabbitFile::from_bytes("0.idx", "idx", data, None);
        let report = file.scan();
        assert_eq!(report.count(), 1);
        assert_eq!(report.messages[0].queue, "q1");
        assert_eq!(report.messages[0].body, b"XYZ");
    }

    #[test]
    fn test_unframed_multi_block_rejected() {
        let data = record_body("q1", &[b"A", b"B"]);
        let file = RabbitFile::from_bytes("0.idx", "idx", data, None);
        let report = file.scan();
        assert_eq!(report.count(), 0);
        assert!(report.queues.is_empty());
        assert_eq!(report.stat.messages(), 0);
    }

    #[test]
    fn test_framed_reverse_reassembly() {
        let data = rdq_record("q2", &[b"WORLD", b"HELLO"]);
        let file = RabbitFile::from_bytes("seg.rdq", "rdq", data, None);
        let report = file.scan();
        assert_eq!(report.messages[0].body, b"HELLOWORLD");
        assert_eq!(report.messages[0].length, 10);
    }

    #[test]
    fn test_regex_filter_drops_messages() {
        let mut data = rdq_record("keep.doc", &[b"iAAA"]);
        data.extend_from_slice(&rdq_record("drop.doc", &[b"iBBB"]));
        let re = Regex::new("^keep").unwrap();
        let file = RabbitFile::from_bytes("seg.rdq", "rdq", data, Some(re));
        let report = file.scan();
        assert_eq!(report.count(), 1);
        assert_eq!(report.messages[0].queue, "keep.doc");
        assert!(report.queues.get("drop.doc").is_none());
    }

    #[test]
    fn test_corrupt_file_yields_empty_report() {
        // Valid first record, then a record whose list tag is wrong
        let mut data = rdq_record("q1", &[b"iAAA"]);
        let mut bad = record_body("q1", &[b"iBBB"]);
        let tag_at = bad
            .windows(crate::store::RABBIT_MARKER.len())
            .position(|w| w == crate::store::RABBIT_MARKER)
            .unwrap()
            + crate::store::RABBIT_MARKER.len();
        bad[tag_at] = b'x';
        data.extend_from_slice(&(bad.len() as u64).to_be_bytes());
        data.extend_from_slice(&bad);
        data.push(0xFF);
        let file = RabbitFile::from_bytes("seg.rdq", "rdq", data, None);
        let report = file.scan();
        assert_eq!(report.count(), 0);
        assert_eq!(report.stat.messages(), 0);
    }

    #[test]
    fn test_partial_tail_tolerated() {
        let mut data = rdq_record("q1", &[b"iAAA"]);
        // Framed record without the sentinel ends the scan cleanly
        let tail = b"garbage bytes without the marker";
        data.extend_from_slice(&(tail.len() as u64).to_be_bytes());
        data.extend_from_slice(tail);
        data.push(0xFF);
        let file = RabbitFile::from_bytes("seg.rdq", "rdq", data, None);
        let report = file.scan();
        assert_eq!(report.count(), 1);
    }

    #[test]
    fn test_bad_trailing_marker_continues() {
        let mut first = rdq_record("q1", &[b"iAAA"]);
        *first.last_mut().unwrap() = 0x00;
        first.extend_from_slice(&rdq_record("q2", &[b"iBBB"]));
        let file = RabbitFile::from_bytes("seg.rdq", "rdq", first, None);
        let report = file.scan();
        assert_eq!(report.count(), 2);
    }

    #[test]
    fn test_scan_with_early_stop() {
        let mut data = rdq_record("q1", &[b"iAAA"]);
        data.extend_from_slice(&rdq_record("q1", &[b"iBBB"]));
        data.extend_from_slice(&rdq_record("q1", &[b"iCCC"]));
        let file = RabbitFile::from_bytes("seg.rdq", "rdq", data, None);
        let mut seen = 0;
        let report = file.scan_with(|_| {
            seen += 1;
            if seen == 2 {
                ScanControl::Stop
            } else {
                ScanControl::Continue
            }
        });
        assert_eq!(report.count(), 2);
    }

    #[test]
    fn test_unknown_extension_defaults_to_framed() {
        let data = rdq_record("q1", &[b"iAAA"]);
        let file = RabbitFile::from_bytes("seg.bin", "bin", data, None);
        let report = file.scan();
        assert_eq!(report.count(), 1);
        assert_eq!(report.kind, "bin");
    }
}
