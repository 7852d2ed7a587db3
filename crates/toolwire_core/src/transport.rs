//! Line-delimited framing over TCP.
//!
//! Each envelope is one UTF-8 JSON line. Both ends wrap their socket with
//! [`framed`] so the frame limit is enforced identically.
//!
//! Unlike `LinesCodec`, a line that is too long or not UTF-8 is yielded as
//! a [`Frame`] variant instead of an error: `Framed` stops polling after a
//! decode error, and a bad line must not end the connection.

use std::io;

use bytes::{Buf, BufMut, BytesMut};
use tokio::net::TcpStream;
use tokio_util::codec::{Decoder, Encoder, Framed};

/// Longest accepted frame, in bytes.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

pub type FramedStream = Framed<TcpStream, FrameCodec>;

/// Transport-level failure. Always ends the connection.
pub type FrameError = io::Error;

pub fn framed(stream: TcpStream) -> FramedStream {
    Framed::new(stream, FrameCodec::new())
}

/// One decoded line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Line(String),
    /// Longer than the limit. The rest of the line is skipped.
    Oversized,
    InvalidUtf8,
}

impl Frame {
    pub fn into_line(self) -> Option<String> {
        match self {
            Frame::Line(line) => Some(line),
            _ => None,
        }
    }

    /// Why the line was dropped, if it was.
    pub fn rejection(&self) -> Option<&'static str> {
        match self {
            Frame::Line(_) => None,
            Frame::Oversized => Some("max line length exceeded"),
            Frame::InvalidUtf8 => Some("frame is not valid UTF-8"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_length: usize,
    /// Where the next newline search resumes.
    next_index: usize,
    /// Inside an oversized line, skipping to its newline.
    discarding: bool,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::with_max_length(MAX_FRAME_BYTES)
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
            discarding: false,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_line(raw: &[u8]) -> Frame {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    match std::str::from_utf8(raw) {
        Ok(line) => Frame::Line(line.to_string()),
        Err(_) => Frame::InvalidUtf8,
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        loop {
            let read_to = self.max_length.saturating_add(1).min(buf.len());
            let newline = buf[self.next_index..read_to]
                .iter()
                .position(|b| *b == b'\n')
                .map(|offset| offset + self.next_index);

            match (self.discarding, newline) {
                (true, Some(index)) => {
                    buf.advance(index + 1);
                    self.discarding = false;
                    self.next_index = 0;
                }
                (true, None) => {
                    buf.advance(read_to);
                    self.next_index = 0;
                    if buf.is_empty() {
                        return Ok(None);
                    }
                }
                (false, Some(index)) => {
                    self.next_index = 0;
                    let line = buf.split_to(index + 1);
                    return Ok(Some(decode_line(&line[..index])));
                }
                (false, None) if buf.len() > self.max_length => {
                    self.discarding = true;
                    return Ok(Some(Frame::Oversized));
                }
                (false, None) => {
                    self.next_index = read_to;
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }
        self.next_index = 0;
        if self.discarding || buf.is_empty() {
            self.discarding = false;
            buf.clear();
            return Ok(None);
        }
        let line = buf.split_to(buf.len());
        Ok(Some(decode_line(&line)))
    }
}

impl Encoder<String> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, line: String, buf: &mut BytesMut) -> Result<(), FrameError> {
        buf.reserve(line.len() + 1);
        buf.put_slice(line.as_bytes());
        buf.put_u8(b'\n');
        Ok(())
    }
}
