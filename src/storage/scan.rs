//! Sequential frame walking.
//!
//! The scanner reads frames front to back through a positional-read source:
//! a live `Store` (reads flush first) or a raw `File` for offline inspection.
//!
//! ## Torn tails
//! A crash mid-append can leave a prefix without its payload, or half a prefix.
//! The scanner reports that once as `CorruptFrame` and stops. `valid_len()` then
//! tells how many leading bytes form complete frames.

use crate::error::{Result, StoreError};
use crate::storage::frame::{self, LEN_WIDTH, LEN_WIDTH_U64};
use crate::storage::pread;
use crate::storage::store::Store;
use std::fs::File;

/// Anything that supports positional reads returning a short count at EOF.
pub trait FrameSource {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize>;
}

impl FrameSource for Store {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        Store::read_at(self, buf, offset)
    }
}

impl FrameSource for File {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        Ok(pread::read_at_full(self, buf, offset)?)
    }
}

impl<S: FrameSource + ?Sized> FrameSource for &S {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        (**self).read_at(buf, offset)
    }
}

/// One frame recovered by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Start-of-frame offset (the handle `Store::read` accepts).
    pub offset: u64,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Bytes this frame occupies on disk.
    pub fn width(&self) -> u64 {
        frame::frame_width(self.payload.len())
    }
}

/// Iterator over the frames of a source, starting at offset 0.
pub struct FrameScanner<S> {
    source: S,
    cursor: u64,
    done: bool,
}

impl<S: FrameSource> FrameScanner<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cursor: 0,
            done: false,
        }
    }

    /// Bytes covered by the complete frames yielded so far.
    pub fn valid_len(&self) -> u64 {
        self.cursor
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let offset = self.cursor;

        let mut prefix = [0u8; LEN_WIDTH];
        let n = self.source.read_at(&mut prefix, offset)?;
        if n == 0 {
            return Ok(None);
        }
        if n < LEN_WIDTH {
            return Err(StoreError::CorruptFrame {
                offset,
                reason: format!("incomplete length prefix: {} of {} bytes", n, LEN_WIDTH),
            });
        }

        let len = frame::decode_len(prefix);

        // Probe the last payload byte before allocating: a torn or garbage
        // prefix must not turn into a huge allocation.
        let payload_start = offset + LEN_WIDTH_U64;
        if len > 0 {
            let mut probe = [0u8; 1];
            let last = payload_start.checked_add(len - 1);
            let present = match last {
                Some(last) => self.source.read_at(&mut probe, last)? == 1,
                None => false,
            };
            if !present {
                return Err(StoreError::CorruptFrame {
                    offset,
                    reason: format!("payload of {} bytes runs past end of data", len),
                });
            }
        }

        let buf_len = frame::payload_len(len).ok_or(StoreError::FrameTooLarge { offset, len })?;
        let mut payload = vec![0u8; buf_len];
        let n = self.source.read_at(&mut payload, payload_start)?;
        if n < payload.len() {
            return Err(StoreError::CorruptFrame {
                offset,
                reason: format!("incomplete payload: {} of {} bytes", n, len),
            });
        }

        self.cursor = payload_start + len;
        Ok(Some(Frame { offset, payload }))
    }
}

impl<S: FrameSource> Iterator for FrameScanner<S> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
