//! One extracted message and its embedded routing metadata
//!
//! The queue (or exchange) name and the optional method are not part of
//! the record framing: they sit in the AMQP-encoded term structure
//! surrounding the body and are recovered by literal search from the
//! message's starting offset.

use crate::error::{ParseError, ParseResult};
use crate::store::blob::Blob;

/// Method attached to messages that do not carry one
pub const DEFAULT_METHOD: &str = "Process";

/// One recovered payload with routing metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Queue (or exchange) the message belongs to
    pub queue: String,
    /// Push-API method, `"Process"` when absent or not a push message
    pub method: String,
    /// Reassembled body, owned; self-contained once the file is dropped
    pub body: Vec<u8>,
    /// Body length after reassembly
    pub length: usize,
    /// Offset of the record in the source file
    pub position: usize,
}

impl Message {
    /// Build a message from a record scanned out of `data`
    ///
    /// `position` is the record's starting offset; the metadata search
    /// covers everything from there to the end of the buffer.
    pub(crate) fn extract(
        data: &[u8],
        position: usize,
        body: Vec<u8>,
        source: &str,
    ) -> ParseResult<Self> {
        let region = &data[position..];
        let queue = extract_queue_name(region, source, position)?;
        let method = if is_push_body(&body) {
            extract_method(region).unwrap_or_else(|| DEFAULT_METHOD.to_string())
        } else {
            DEFAULT_METHOD.to_string()
        };
        let length = body.len();
        Ok(Self {
            queue,
            method,
            body,
            length,
            position,
        })
    }

    /// Build a message from a bare body (replay of exported files)
    ///
    /// With no surrounding file buffer the method search runs over the
    /// body itself.
    pub fn from_body(queue: impl Into<String>, body: Vec<u8>) -> Self {
        let method = if is_push_body(&body) {
            extract_method(&body).unwrap_or_else(|| DEFAULT_METHOD.to_string())
        } else {
            DEFAULT_METHOD.to_string()
        };
        let length = body.len();
        Self {
            queue: queue.into(),
            method,
            body,
            length,
            position: 0,
        }
    }

    /// True when the message originates from the Push API
    ///
    /// Index messages start with `'i'`; anything else (including an
    /// empty body, treated as non-push) is a push message.
    pub fn is_push(&self) -> bool {
        is_push_body(&self.body)
    }

    /// Header value synthesized on republish of push messages
    pub fn cmf_header(&self) -> String {
        format!("{{url:{},method:{},zip:true}}", self.queue, self.method)
    }
}

fn is_push_body(body: &[u8]) -> bool {
    body.first().is_some_and(|&b| b != b'i')
}

/// Recover the queue name embedded near the record
///
/// The primary path reads the length-prefixed name following the
/// `"exchange"` literal; when that is absent or names nothing, the
/// quoted-url fallback is tried. Both failing is a structural error.
fn extract_queue_name(region: &[u8], source: &str, position: usize) -> ParseResult<String> {
    if let Some(name) = queue_from_exchange(region, source)? {
        if !name.is_empty() {
            return Ok(name);
        }
    }
    if let Some(name) = queue_from_url(region) {
        if !name.is_empty() {
            return Ok(name);
        }
    }
    Err(ParseError::QueueNameNotFound {
        name: source.to_string(),
        pos: position,
    })
}

/// `"exchange"` + 9 | u32 len | (len == 0: skip 6, re-read len) | name
fn queue_from_exchange(region: &[u8], source: &str) -> ParseResult<Option<String>> {
    let mut blob = Blob::new(region, source, false);
    let Some(at) = blob.find(b"exchange") else {
        return Ok(None);
    };
    blob.seek(at)?;
    blob.skip(9)?;
    let mut len = blob.read_u32()?;
    if len == 0 {
        blob.skip(6)?;
        len = blob.read_u32()?;
    }
    let name = blob.read_bytes(len as usize)?;
    Ok(Some(String::from_utf8_lossy(name).into_owned()))
}

/// `"3'url"` then the next two single quotes; the bytes between them,
/// minus one trailing byte, name the queue
fn queue_from_url(region: &[u8]) -> Option<String> {
    let prefix = find_from(region, 0, b"3'url")?;
    let open = find_from(region, prefix + 5, b"'")?;
    let close = find_from(region, open + 1, b"'")?;
    if close <= open + 1 {
        return None;
    }
    let name = &region[open + 1..close - 1];
    Some(String::from_utf8_lossy(name).into_owned())
}

/// `"method:"` + 7 | bytes until the next `','`
fn extract_method(region: &[u8]) -> Option<String> {
    let at = find_from(region, 0, b"method:")?;
    let rest = &region[at + 7..];
    let end = rest.iter().position(|&b| b == b',').unwrap_or(rest.len());
    let method = String::from_utf8_lossy(&rest[..end]).into_owned();
    if method.is_empty() {
        None
    } else {
        Some(method)
    }
}

fn find_from(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|rel| from + rel)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange_region(queue: &str) -> Vec<u8> {
        let mut region = b"...exchange".to_vec();
        region.push(0x01); // term byte between the literal and the length
        region.extend_from_slice(&(queue.len() as u32).to_be_bytes());
        region.extend_from_slice(queue.as_bytes());
        region
    }

    #[test]
    fn test_queue_from_exchange() {
        let region = exchange_region("qa");
        assert_eq!(extract_queue_name(&region, "t", 0).unwrap(), "qa");
    }

    #[test]
    fn test_queue_from_exchange_zero_length_retry() {
        let mut region = b"exchange".to_vec();
        region.push(0x01);
        region.extend_from_slice(&0u32.to_be_bytes());
        region.extend_from_slice(&[0u8; 6]);
        region.extend_from_slice(&2u32.to_be_bytes());
        region.extend_from_slice(b"q1");
        assert_eq!(extract_queue_name(&region, "t", 0).unwrap(), "q1");
    }

    #[test]
    fn test_queue_from_url_fallback() {
        let region = b"....3'url.'my.queueX'....".to_vec();
        assert_eq!(extract_queue_name(&region, "t", 0).unwrap(), "my.queue");
    }

    #[test]
    fn test_queue_name_not_found() {
        let err = extract_queue_name(b"nothing here", "t", 7).unwrap_err();
        assert!(matches!(
            err,
            ParseError::QueueNameNotFound { pos: 7, .. }
        ));
    }

    #[test]
    fn test_empty_exchange_name_falls_back_to_url() {
        // Primary path resolves to an empty name; fallback must be tried
        let mut region = b"exchange".to_vec();
        region.push(0x01);
        region.extend_from_slice(&0u32.to_be_bytes());
        region.extend_from_slice(&[0u8; 6]);
        region.extend_from_slice(&0u32.to_be_bytes());
        region.extend_from_slice(b"3'url.'qzX'");
        assert_eq!(extract_queue_name(&region, "t", 0).unwrap(), "qz");
    }

    #[test]
    fn test_is_push() {
        assert!(!Message::from_body("q", b"index".to_vec()).is_push());
        assert!(Message::from_body("q", b"{doc}".to_vec()).is_push());
        // Empty bodies are non-push
        assert!(!Message::from_body("q", Vec::new()).is_push());
    }

    #[test]
    fn test_method_extraction() {
        let region = b"..method:Delete,zip:true..";
        assert_eq!(extract_method(region).unwrap(), "Delete");
    }

    #[test]
    fn test_method_defaults_to_process() {
        let msg = Message::from_body("q", b"{no method here}".to_vec());
        assert_eq!(msg.method, DEFAULT_METHOD);
    }

    #[test]
    fn test_method_from_push_body() {
        let msg = Message::from_body("q", b"{url:q,method:Add,zip:true}".to_vec());
        assert_eq!(msg.method, "Add");
    }

    #[test]
    fn test_cmf_header() {
        let msg = Message::from_body("q.doc", b"{payload}".to_vec());
        assert_eq!(msg.cmf_header(), "{url:q.doc,method:Process,zip:true}");
    }
}
