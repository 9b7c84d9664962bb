//! Binary decoding of RabbitMQ persistence artifacts
//!
//! Two on-disk layouts share the same inner record format:
//!
//! - `.rdq` persistent-store segments: repeated `u64 length | length
//!   bytes | 0xFF` frames, each holding one encoded message record.
//! - `.idx` queue-index files: the same record format without the outer
//!   framing, scanned directly from the file buffer.
//!
//! Every record is preceded by the ASCII sentinel
//! `rabbit_framing_amqp_0_9_1`, followed by a list tag `'l'`, a block
//! count, and `'m'`-tagged length-prefixed blocks. Multi-block bodies
//! are reassembled in reverse encounter order. All integers are
//! big-endian.

pub mod blob;
pub mod file;
pub mod message;

pub use blob::{Blob, RABBIT_MARKER};
pub use file::{FileReport, RabbitFile};
pub use message::{Message, DEFAULT_METHOD};

/// Handler verdict for the scan loop: keep going or stop cleanly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanControl {
    /// Continue scanning the current buffer
    Continue,
    /// Stop scanning; everything seen so far is kept
    Stop,
}
