//! Share-log framing
//!
//! A share log is a sequence of frames:
//!
//! ```text
//! [length: u32 LE][length bytes of body] [length: u32 LE][body] ...
//! ```
//!
//! The body is either a bare share payload ([`Framing::Raw`]) or a
//! version-prefixed share ([`Framing::Versioned`]). Frames whose body fails to
//! decode are reported and skipped; the reader moves on to the next frame.

use crate::error::SharelogError;
use crate::share::{ShareBeam, PREFIX_LEN};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Frames longer than this are treated as corruption
pub const MAX_FRAME_LEN: u32 = 1 << 20;

/// Read buffer size
const READ_BUFFER_SIZE: usize = 256 * 1024;

/// Body layout inside each frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Framing {
    /// Bare payload
    Raw,
    /// Version tag followed by the payload
    Versioned,
}

impl Framing {
    fn decode(self, body: &[u8]) -> Result<ShareBeam, crate::error::ShareError> {
        match self {
            Framing::Raw => ShareBeam::decode_payload(body),
            Framing::Versioned => ShareBeam::decode(body),
        }
    }
}

/// Iterator over the shares of a share log.
///
/// Yields `Err` for frames that can't be decoded. After a truncated frame,
/// a corrupt length, or an I/O error, iteration ends.
pub struct ShareLogReader<R: Read> {
    inner: BufReader<R>,
    framing: Framing,
    offset: u64,
    body: Vec<u8>,
    done: bool,
}

impl ShareLogReader<File> {
    /// Open a share log file
    pub fn open<P: AsRef<Path>>(path: P, framing: Framing) -> io::Result<Self> {
        Ok(Self::new(File::open(path)?, framing))
    }
}

impl<R: Read> ShareLogReader<R> {
    /// Wrap any reader positioned at a frame boundary
    pub fn new(reader: R, framing: Framing) -> Self {
        Self {
            inner: BufReader::with_capacity(READ_BUFFER_SIZE, reader),
            framing,
            offset: 0,
            body: Vec::new(),
            done: false,
        }
    }

    /// Byte offset of the next frame
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn next_frame(&mut self) -> Result<Option<ShareBeam>, SharelogError> {
        let frame_offset = self.offset;

        let mut len_buf = [0u8; PREFIX_LEN];
        let got = read_full(&mut self.inner, &mut len_buf)?;
        if got == 0 {
            return Ok(None);
        }
        if got < PREFIX_LEN {
            return Err(SharelogError::TruncatedFrame {
                offset: frame_offset,
                expected: PREFIX_LEN,
                available: got,
            });
        }

        let len = u32::from_le_bytes(len_buf);
        if len > MAX_FRAME_LEN {
            return Err(SharelogError::CorruptFrame {
                offset: frame_offset,
                length: len,
                max: MAX_FRAME_LEN,
            });
        }

        self.body.resize(len as usize, 0);
        let got = read_full(&mut self.inner, &mut self.body)?;
        if got < self.body.len() {
            return Err(SharelogError::TruncatedFrame {
                offset: frame_offset,
                expected: self.body.len(),
                available: got,
            });
        }
        self.offset += (PREFIX_LEN + self.body.len()) as u64;

        self.framing
            .decode(&self.body)
            .map(Some)
            .map_err(|source| SharelogError::Record {
                offset: frame_offset,
                source,
            })
    }
}

impl<R: Read> Iterator for ShareLogReader<R> {
    type Item = Result<ShareBeam, SharelogError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.next_frame() {
            Ok(Some(share)) => Some(Ok(share)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                // A bad body leaves the framing intact; anything else doesn't
                if !matches!(e, SharelogError::Record { .. }) {
                    self.done = true;
                }
                Some(Err(e))
            }
        }
    }
}

/// Writes shares as a share log
pub struct ShareLogWriter<W: Write> {
    inner: BufWriter<W>,
    framing: Framing,
    offset: u64,
}

impl ShareLogWriter<File> {
    /// Create (or truncate) a share log file
    pub fn create<P: AsRef<Path>>(path: P, framing: Framing) -> io::Result<Self> {
        Ok(Self::new(File::create(path)?, framing))
    }
}

impl<W: Write> ShareLogWriter<W> {
    /// Wrap any writer; frames are buffered until `finish`
    pub fn new(writer: W, framing: Framing) -> Self {
        Self {
            inner: BufWriter::new(writer),
            framing,
            offset: 0,
        }
    }

    /// Append one share as a frame
    pub fn append(&mut self, share: &ShareBeam) -> Result<(), SharelogError> {
        let encoded = match self.framing {
            Framing::Raw => share.encode_length_prefixed(),
            Framing::Versioned => share.encode_version_prefixed(),
        }
        .map_err(|source| SharelogError::Record {
            offset: self.offset,
            source,
        })?;

        // A length-prefixed record already is a complete raw frame
        if self.framing == Framing::Versioned {
            self.inner.write_all(&(encoded.len() as u32).to_le_bytes())?;
            self.offset += PREFIX_LEN as u64;
        }
        self.inner.write_all(&encoded)?;
        self.offset += encoded.len() as u64;
        Ok(())
    }

    /// Bytes written so far
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Flush and hand back the underlying writer
    pub fn finish(self) -> io::Result<W> {
        self.inner.into_inner().map_err(|e| e.into_error())
    }
}

/// Read until `buf` is full or the stream ends; returns bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
