//! Positioned reader over the bytes of one persistence file
//!
//! A [`Blob`] owns a cursor over a borrowed byte buffer and offers the
//! primitive reads the record format needs: big-endian integers, fixed
//! slices, asserted literal bytes and forward literal search. Every read
//! that would cross the end of the buffer fails with an offset-precise
//! [`ParseError::OutOfBounds`]; nothing is ever interpreted in host
//! endianness.
//!
//! The scan loop lives here too: it walks the buffer record by record
//! and hands each reassembled [`Message`] to a caller-supplied handler.

use crate::error::{ParseError, ParseResult};
use crate::store::message::Message;
use crate::store::ScanControl;
use tracing::warn;

/// ASCII sentinel preceding every encoded message record
pub const RABBIT_MARKER: &[u8] = b"rabbit_framing_amqp_0_9_1";

/// A positioned view over a byte buffer for sequential decoding
#[derive(Debug)]
pub struct Blob<'a> {
    data: &'a [u8],
    pos: usize,
    name: String,
    framed: bool,
}

impl<'a> Blob<'a> {
    /// Create a reader over a whole file buffer
    ///
    /// `framed` selects the persistent-store layout (outer `u64` length
    /// prefix and `0xFF` terminator per record); index files scan the
    /// buffer directly.
    pub fn new(data: &'a [u8], name: &str, framed: bool) -> Self {
        Self {
            data,
            pos: 0,
            name: name.to_string(),
            framed,
        }
    }

    /// View over one framed record, labeled with its occurrence index
    fn record_view(&self, data: &'a [u8], sequence_no: usize) -> Self {
        Self {
            data,
            pos: 0,
            name: format!("{}:{}", self.name, sequence_no),
            framed: self.framed,
        }
    }

    /// Source label used in diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current cursor position
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left between the cursor and the end of the buffer
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn check(&self, wanted: usize) -> ParseResult<()> {
        if self.pos + wanted > self.data.len() {
            return Err(ParseError::OutOfBounds {
                name: self.name.clone(),
                pos: self.pos,
                wanted,
                len: self.data.len(),
            });
        }
        Ok(())
    }

    /// Borrow `n` bytes and advance the cursor past them
    pub fn read_bytes(&mut self, n: usize) -> ParseResult<&'a [u8]> {
        self.check(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read a big-endian u32 and advance the cursor by 4
    pub fn read_u32(&mut self) -> ParseResult<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a big-endian u64 and advance the cursor by 8
    pub fn read_u64(&mut self) -> ParseResult<u64> {
        let b = self.read_bytes(8)?;
        Ok(u64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// Read one byte that must equal `want`
    ///
    /// On mismatch the cursor stays on the offending byte so the error
    /// offset points at it.
    pub fn expect(&mut self, want: u8) -> ParseResult<()> {
        self.check(1)?;
        let got = self.data[self.pos];
        if got != want {
            return Err(ParseError::UnexpectedByte {
                name: self.name.clone(),
                pos: self.pos,
                want,
                got,
            });
        }
        self.pos += 1;
        Ok(())
    }

    /// Search forward from the cursor for a literal byte pattern
    ///
    /// Returns the absolute offset of the first match; the cursor is
    /// never moved.
    pub fn find(&self, needle: &[u8]) -> Option<usize> {
        self.data[self.pos..]
            .windows(needle.len())
            .position(|window| window == needle)
            .map(|rel| self.pos + rel)
    }

    /// Place the cursor at an absolute offset
    pub fn seek(&mut self, pos: usize) -> ParseResult<()> {
        if pos > self.data.len() {
            return Err(ParseError::OutOfBounds {
                name: self.name.clone(),
                pos: self.pos,
                wanted: pos - self.pos,
                len: self.data.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Advance the cursor by `n` bytes without reading them
    pub fn skip(&mut self, n: usize) -> ParseResult<()> {
        self.check(n)?;
        self.pos += n;
        Ok(())
    }

    /// Scan the buffer and hand every reassembled message to `handler`
    ///
    /// Framed buffers are consumed frame by frame; a record whose
    /// trailing byte is not `0xFF` is logged and skipped over, while a
    /// record without the sentinel ends the scan cleanly (partial tails
    /// are tolerated). Unframed buffers are searched directly and reject
    /// multi-block records. Any other malformation aborts the scan with
    /// the error, leaving the caller to discard the file.
    pub fn scan<F>(&mut self, handler: &mut F) -> ParseResult<()>
    where
        F: FnMut(Message) -> ScanControl,
    {
        let mut sequence_no = 0;
        while self.pos < self.data.len() {
            let position = self.pos;
            let body = if self.framed {
                let length = self.read_u64()? as usize;
                let record = self.read_bytes(length)?;
                if let Err(err) = self.expect(0xFF) {
                    match err {
                        ParseError::UnexpectedByte { .. } => {
                            warn!(blob = %self.name, error = %err, "bad end-of-record marker");
                            self.pos += 1;
                        }
                        fatal => return Err(fatal),
                    }
                }
                let mut view = self.record_view(record, sequence_no);
                match view.read_blocks()? {
                    Some(blocks) => reassemble(&blocks),
                    None => break,
                }
            } else {
                let Some(marker) = self.find(RABBIT_MARKER) else {
                    break;
                };
                self.pos = marker + RABBIT_MARKER.len();
                self.expect(b'l')?;
                let nb_blocks = self.read_u32()? as usize;
                if nb_blocks != 1 {
                    return Err(ParseError::Structure {
                        name: self.name.clone(),
                        pos: self.pos,
                        reason: format!(
                            "expected a single block in an index file, found {nb_blocks}"
                        ),
                    });
                }
                self.expect(b'm')?;
                let len = self.read_u32()? as usize;
                self.read_bytes(len)?.to_vec()
            };
            sequence_no += 1;

            let msg = Message::extract(self.data, position, body, &self.name)?;
            if handler(msg) == ScanControl::Stop {
                break;
            }
        }
        Ok(())
    }

    /// Decode the sentinel-tagged block list of one record
    ///
    /// Returns `None` when the sentinel is absent from the buffer.
    fn read_blocks(&mut self) -> ParseResult<Option<Vec<&'a [u8]>>> {
        let Some(marker) = self.find(RABBIT_MARKER) else {
            return Ok(None);
        };
        self.pos = marker + RABBIT_MARKER.len();
        self.expect(b'l')?;
        let nb_blocks = self.read_u32()? as usize;
        let mut blocks = Vec::with_capacity(nb_blocks.min(64));
        for _ in 0..nb_blocks {
            self.expect(b'm')?;
            let len = self.read_u32()? as usize;
            blocks.push(self.read_bytes(len)?);
        }
        Ok(Some(blocks))
    }
}

/// Concatenate record blocks in reverse encounter order
fn reassemble(blocks: &[&[u8]]) -> Vec<u8> {
    let total = blocks.iter().map(|b| b.len()).sum();
    let mut body = Vec::with_capacity(total);
    for block in blocks.iter().rev() {
        body.extend_from_slice(block);
    }
    body
}
