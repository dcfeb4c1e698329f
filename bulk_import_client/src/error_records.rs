use bulk_import_types::ErrorRecord;
use bytes::{Buf, BytesMut};
use futures::Stream;
use tracing::{debug, warn};

use crate::error::{BulkImportError, Result};
use crate::interface::ResponseBody;

/// Outcome of walking the MessagePack framing at the front of a buffer.
#[derive(Debug, PartialEq, Eq)]
enum Frame {
    /// A whole value occupies the first `n` bytes.
    Complete(usize),
    /// The first value needs at least `n` bytes in total.
    Incomplete(usize),
    /// Byte `0xc1` (never used) at this offset.
    Invalid(usize),
}

/// Reads a big-endian length of `width` bytes at `pos`.
fn read_len(buf: &[u8], pos: usize, width: usize) -> std::result::Result<u64, Frame> {
    let bytes = buf.get(pos..pos + width).ok_or(Frame::Incomplete(pos + width))?;
    Ok(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

/// Finds the extent of the first value by reading markers and lengths only; string, binary and
/// extension payloads are skipped without being looked at.
fn frame(buf: &[u8]) -> Frame {
    match frame_inner(buf) {
        Ok(n) => Frame::Complete(n),
        Err(f) => f,
    }
}

fn frame_inner(buf: &[u8]) -> std::result::Result<usize, Frame> {
    let mut pos = 0usize;
    // values still to walk; maps count keys and values separately
    let mut pending: u64 = 1;

    while pending > 0 {
        pending -= 1;
        let marker = *buf.get(pos).ok_or(Frame::Incomplete(pos + 1))?;
        pos += 1;

        // bytes after the marker and any length prefix
        let payload: u64 = match marker {
            0x00..=0x7f | 0xe0..=0xff | 0xc0 | 0xc2 | 0xc3 => 0,
            0x80..=0x8f => {
                pending = pending.saturating_add(2 * u64::from(marker & 0x0f));
                0
            },
            0x90..=0x9f => {
                pending = pending.saturating_add(u64::from(marker & 0x0f));
                0
            },
            0xa0..=0xbf => u64::from(marker & 0x1f),
            0xc1 => return Err(Frame::Invalid(pos - 1)),
            0xc4 | 0xd9 => read_prefixed(buf, &mut pos, 1)?,
            0xc5 | 0xda => read_prefixed(buf, &mut pos, 2)?,
            0xc6 | 0xdb => read_prefixed(buf, &mut pos, 4)?,
            // ext: length, then one type byte
            0xc7 => read_prefixed(buf, &mut pos, 1)? + 1,
            0xc8 => read_prefixed(buf, &mut pos, 2)? + 1,
            0xc9 => read_prefixed(buf, &mut pos, 4)? + 1,
            0xca => 4,
            0xcb => 8,
            0xcc | 0xd0 => 1,
            0xcd | 0xd1 => 2,
            0xce | 0xd2 => 4,
            0xcf | 0xd3 => 8,
            0xd4 => 2,
            0xd5 => 3,
            0xd6 => 5,
            0xd7 => 9,
            0xd8 => 17,
            0xdc => {
                pending = pending.saturating_add(read_prefixed(buf, &mut pos, 2)?);
                0
            },
            0xdd => {
                pending = pending.saturating_add(read_prefixed(buf, &mut pos, 4)?);
                0
            },
            0xde => {
                pending = pending.saturating_add(2 * read_prefixed(buf, &mut pos, 2)?);
                0
            },
            0xdf => {
                pending = pending.saturating_add(2 * read_prefixed(buf, &mut pos, 4)?);
                0
            },
        };

        let end = (pos as u64).saturating_add(payload);
        if end > buf.len() as u64 {
            return Err(Frame::Incomplete(usize::try_from(end).unwrap_or(usize::MAX)));
        }
        pos = end as usize;
    }
    Ok(pos)
}

fn read_prefixed(buf: &[u8], pos: &mut usize, width: usize) -> std::result::Result<u64, Frame> {
    let len = read_len(buf, *pos, width)?;
    *pos += width;
    Ok(len)
}

/// Forward-only reader over the records rejected by a perform.
///
/// The body is a bare concatenation of MessagePack values with no count or length prefix.
/// Records are decoded as their bytes arrive. An empty body yields no records. A body ending in
/// the middle of a record yields every complete record before it and then ends; a failure reading
/// the body is returned as an error and ends the sequence.
pub struct ErrorRecords {
    operation: &'static str,
    session_name: String,
    body: Option<ResponseBody>,
    buffer: BytesMut,
    /// The buffer cannot hold a whole record until it reaches this length.
    needed: usize,
    decoded: u64,
}

impl ErrorRecords {
    pub(crate) fn new(operation: &'static str, session_name: String, body: ResponseBody) -> Self {
        Self {
            operation,
            session_name,
            body: Some(body),
            buffer: BytesMut::new(),
            needed: 1,
            decoded: 0,
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Number of records handed out so far.
    pub fn decoded(&self) -> u64 {
        self.decoded
    }

    /// Decodes one record from the front of the buffer, or `None` if it holds no complete record.
    fn decode_buffered(&mut self) -> Result<Option<ErrorRecord>> {
        if self.buffer.len() < self.needed {
            return Ok(None);
        }

        let len = match frame(&self.buffer) {
            Frame::Complete(len) => len,
            Frame::Incomplete(needed) => {
                self.needed = needed;
                return Ok(None);
            },
            Frame::Invalid(offset) => {
                return Err(self.malformed(format!("invalid marker 0xc1 at byte {offset}")));
            },
        };

        let mut cursor: &[u8] = &self.buffer[..len];
        let record = rmpv::decode::read_value(&mut cursor).map_err(|e| self.malformed(e.to_string()))?;
        self.buffer.advance(len);
        self.needed = 1;
        Ok(Some(record))
    }

    fn malformed(&self, reason: String) -> BulkImportError {
        BulkImportError::MalformedResponse {
            operation: self.operation,
            reason: format!("invalid error record #{}: {reason}", self.decoded + 1),
            body: format!("<{} undecoded bytes>", self.buffer.len()),
        }
    }

    /// The next record, or `None` once the stream has ended.
    pub async fn next(&mut self) -> Result<Option<ErrorRecord>> {
        loop {
            if self.body.is_none() {
                return Ok(None);
            }

            match self.decode_buffered() {
                Ok(Some(record)) => {
                    self.decoded += 1;
                    return Ok(Some(record));
                },
                Ok(None) => {},
                Err(e) => {
                    self.finish();
                    return Err(e);
                },
            }

            let next_chunk = match self.body.as_mut() {
                Some(body) => body.chunk().await,
                None => return Ok(None),
            };

            match next_chunk {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    self.finish();
                    return Err(BulkImportError::transport(self.operation, e));
                },
                None => {
                    if !self.buffer.is_empty() {
                        warn!(
                            "error_records for session {} ended inside a record; dropping {} trailing bytes after {} records",
                            self.session_name,
                            self.buffer.len(),
                            self.decoded
                        );
                    }
                    self.finish();
                    return Ok(None);
                },
            }
        }
    }

    /// Drops the body, releasing the connection.
    fn finish(&mut self) {
        if self.body.take().is_some() {
            debug!("error_records for session {}: {} records read", self.session_name, self.decoded);
        }
        self.buffer.clear();
        self.needed = 1;
    }

    /// Reads every remaining record into memory.
    pub async fn collect_all(mut self) -> Result<Vec<ErrorRecord>> {
        let mut records = Vec::new();
        while let Some(record) = self.next().await? {
            records.push(record);
        }
        Ok(records)
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<ErrorRecord>> + Send {
        futures::stream::try_unfold(self, |mut records| async move {
            Ok(records.next().await?.map(|record| (record, records)))
        })
    }
}

impl std::fmt::Debug for ErrorRecords {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorRecords")
            .field("session_name", &self.session_name)
            .field("decoded", &self.decoded)
            .field("finished", &self.body.is_none())
            .finish()
    }
}
