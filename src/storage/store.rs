use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::storage::frame::{self, LEN_WIDTH, LEN_WIDTH_U64};
use crate::storage::pread;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A Store is one append-only file of length-prefixed records.
///
/// Responsibilities:
/// - Own the backing file handle exclusively
/// - Append frames and hand back the byte offset each frame starts at
/// - Serve reads by offset (read your own writes, even if still buffered)
/// - Track the logical file size, including buffered bytes
///
/// NOT responsible for:
/// - Logical record numbering (a higher layer maps record ids to offsets)
/// - Segment rotation, retention, compaction
/// - Checksums (frames are raw)
///
/// ## Ownership model:
/// - Store owns the File through a BufWriter; the File is never handed out
/// - Writes go through the buffer, reads go straight to the file after a flush
///
/// ## Thread safety:
/// - Store is Send + Sync; share it with `Arc<Store>`
/// - Every operation holds one exclusive lock for its full duration
/// - No two operations of any kind run concurrently against one Store
///
/// ## On-disk format:
/// ```text
/// | length: u64 (BE) | payload: [u8; length] | length: u64 (BE) | payload | ...
/// ```
/// No header, footer or padding. File length == `size()` whenever the store is idle
/// and flushed.
pub struct Store {
    inner: Mutex<Inner>,
    config: StoreConfig,
}

/// What the write path needs from the file under the buffer.
///
/// `File` is the only production implementation. Reads are positional and
/// must not move the write cursor.
pub(crate) trait Backing: Write + Seek {
    fn file_len(&self) -> io::Result<u64>;
    fn set_len(&self, len: u64) -> io::Result<()>;
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()>;
}

impl Backing for File {
    fn file_len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn set_len(&self, len: u64) -> io::Result<()> {
        File::set_len(self, len)
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        pread::read_at_full(self, buf, offset)
    }

    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        pread::read_exact_at(self, buf, offset)
    }
}

/// Lifecycle of a store.
///
/// Open -> Closed is the normal path.
/// Open -> Failed happens only when a failed append could not be rolled back.
enum State<F: Write = File> {
    Open(BufWriter<F>),
    Failed(BufWriter<F>),
    Closed,
}

struct Inner<F: Write = File> {
    state: State<F>,

    /// Logical size: flushed bytes + buffered bytes.
    /// Next append starts here.
    size: u64,
}

impl<F: Backing> Inner<F> {
    fn new(file: F, capacity: usize, size: u64) -> Self {
        Inner {
            state: State::Open(BufWriter::with_capacity(capacity, file)),
            size,
        }
    }

    fn writer(&mut self) -> Result<&mut BufWriter<F>> {
        match &mut self.state {
            State::Open(writer) => Ok(writer),
            State::Failed(_) => Err(StoreError::Failed),
            State::Closed => Err(StoreError::Closed),
        }
    }

    /// Flush the write buffer and return the file for positional reads.
    fn flushed_file(&mut self) -> Result<&F> {
        let writer = self.writer()?;
        writer.flush()?;
        Ok(writer.get_ref())
    }

    fn append(&mut self, payload: &[u8]) -> Result<(u64, u64)> {
        let pos = self.size;

        // Prefix and payload go in as two writes; a failure in either one
        // is undone as a whole by rollback.
        let writer = self.writer()?;
        let written = writer
            .write_all(&frame::encode_len(payload.len() as u64))
            .and_then(|()| writer.write_all(payload));

        if let Err(e) = written {
            self.rollback(pos);
            return Err(e.into());
        }

        let width = frame::frame_width(payload.len());
        self.size += width;

        Ok((width, pos))
    }

    fn read(&mut self, offset: u64) -> Result<Vec<u8>> {
        let size = self.size;
        let file = self.flushed_file()?;

        let out_of_range = StoreError::OffsetOutOfRange { offset, size };

        let payload_start = match offset.checked_add(LEN_WIDTH_U64) {
            Some(end) if end <= size => end,
            _ => return Err(out_of_range),
        };

        let mut prefix = [0u8; LEN_WIDTH];
        file.read_exact_at(&mut prefix, offset)?;
        let len = frame::decode_len(prefix);

        match payload_start.checked_add(len) {
            Some(end) if end <= size => {}
            _ => return Err(out_of_range),
        }

        let buf_len = frame::payload_len(len).ok_or(StoreError::FrameTooLarge { offset, len })?;
        let mut payload = vec![0u8; buf_len];
        file.read_exact_at(&mut payload, payload_start)?;

        Ok(payload)
    }

    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let file = self.flushed_file()?;
        Ok(file.read_at(buf, offset)?)
    }

    /// Undo a failed append so the file ends at `pos` again.
    ///
    /// The buffer may still hold earlier (acknowledged) frames plus part of the
    /// failed one. Flush everything, then cut the file back to `pos`.
    /// If either step fails the file no longer matches `size` and the store is
    /// marked Failed.
    fn rollback(&mut self, pos: u64) {
        let State::Open(writer) = &mut self.state else {
            return;
        };

        let restored = (|| -> io::Result<()> {
            writer.flush()?;
            let file = writer.get_mut();
            let on_disk = file.file_len()?;
            if on_disk < pos {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("file is {} bytes, expected at least {}", on_disk, pos),
                ));
            }
            if on_disk > pos {
                file.set_len(pos)?;
                // Non-append handles write at the cursor; keep it at the new end.
                file.seek(SeekFrom::Start(pos))?;
            }
            Ok(())
        })();

        match restored {
            Ok(()) => {
                tracing::warn!(offset = pos, "append failed, store rolled back to previous size");
            }
            Err(e) => {
                tracing::error!(offset = pos, error = %e, "append rollback failed, store is unusable");
                if let State::Open(writer) = std::mem::replace(&mut self.state, State::Closed) {
                    self.state = State::Failed(writer);
                }
            }
        }
    }
}

impl Store {
    /// Build a store over an already opened file with the default config.
    ///
    /// The file must be readable and writable. Append mode is not required:
    /// the write cursor is moved to the end of the file before the first append.
    ///
    /// # Errors
    /// - I/O errors reading file metadata (size cannot be determined)
    pub fn open(file: File) -> Result<Self> {
        Self::open_with_config(file, StoreConfig::default())
    }

    /// Build a store over an already opened file.
    ///
    /// The initial size is the file's current length, so a store reopened over an
    /// existing file resumes appending at its end.
    ///
    /// # Errors
    /// - I/O errors reading file metadata or seeking to the end of the file
    pub fn open_with_config(mut file: File, config: StoreConfig) -> Result<Self> {
        let size = file.metadata()?.len();
        // A plain read+write handle starts at byte 0; appends must land at `size`.
        file.seek(SeekFrom::End(0))?;
        let capacity = config.buffer_capacity.max(LEN_WIDTH);

        tracing::debug!(size, buffer_capacity = capacity, "opened store");

        Ok(Store {
            inner: Mutex::new(Inner::new(file, capacity, size)),
            config,
        })
    }

    /// Open or create the file at `path` and build a store over it.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_path_with_config(path, StoreConfig::default())
    }

    /// Open or create the file at `path` (read + append) and build a store over it.
    ///
    /// # Errors
    /// - I/O errors opening or creating the file
    pub fn open_path_with_config(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        let path = path.as_ref();

        let mut options = OpenOptions::new();
        options.create(true).read(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }
        let file = options.open(path)?;

        tracing::debug!(path = %path.display(), "opening store file");
        Self::open_with_config(file, config)
    }

    /// Append a record.
    ///
    /// This is the write path:
    /// 1. Capture the start offset (current size)
    /// 2. Write the 8-byte big-endian length prefix into the buffer
    /// 3. Write the payload into the buffer
    /// 4. Advance size by the frame width
    ///
    /// The frame may still sit in the write buffer when this returns. The offset
    /// is stable anyway: reads flush before they look at the file.
    ///
    /// # Returns
    /// - `(width, offset)`: frame width (8 + payload length) and start offset
    ///
    /// # Errors
    /// - I/O errors writing the frame. Size is not advanced and the partial frame
    ///   is rolled back; if that rollback fails the store becomes Failed
    /// - `Closed` / `Failed` if the store can no longer accept writes
    pub fn append(&self, payload: &[u8]) -> Result<(u64, u64)> {
        self.lock()?.append(payload)
    }

    /// Read the record whose frame starts at `offset`.
    ///
    /// Flushes the write buffer first so records appended by this process are
    /// visible, then reads the length prefix and the payload behind it.
    ///
    /// `offset` must be a value returned by `append`. Other values are not
    /// detected, but the read never goes past the written region.
    ///
    /// # Errors
    /// - `OffsetOutOfRange` if the prefix or the payload extends past `size`
    /// - `FrameTooLarge` if the payload cannot be addressed in memory on this platform
    /// - I/O errors flushing or reading
    pub fn read(&self, offset: u64) -> Result<Vec<u8>> {
        self.lock()?.read(offset)
    }

    /// Raw positional read.
    ///
    /// Flushes, then copies file bytes starting at `offset` into `buf`.
    /// Returns how many bytes were copied; fewer than `buf.len()` means end of
    /// file was reached (0 at or past the end).
    ///
    /// Used to walk frames by hand: read 8 bytes, decode the length, read the payload.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.lock()?.read_at(buf, offset)
    }

    /// Flush everything and release the file.
    ///
    /// On success every acknowledged append is in the file (and on stable storage
    /// when `sync_on_close` is set). The store is Closed afterwards and every
    /// further call, including a second close, returns `Closed`.
    ///
    /// # Errors
    /// - I/O errors flushing or syncing. The store stays Open after a failed flush
    /// - `Failed` if the store was poisoned by an earlier append; the handle is
    ///   released without writing the leftover buffer
    pub fn close(&self) -> Result<()> {
        let mut inner = self.lock()?;

        if let State::Open(writer) = &mut inner.state {
            writer.flush()?;
        }

        match std::mem::replace(&mut inner.state, State::Closed) {
            State::Open(writer) => {
                let file = writer.into_inner().map_err(|e| e.into_error())?;
                if self.config.sync_on_close {
                    file.sync_all()?;
                }
                drop(file);
                tracing::debug!(size = inner.size, "closed store");
                Ok(())
            }
            State::Failed(writer) => {
                let (file, _unflushed) = writer.into_parts();
                drop(file);
                tracing::warn!(size = inner.size, "closed failed store without flushing");
                Err(StoreError::Failed)
            }
            State::Closed => Err(StoreError::Closed),
        }
    }

    /// Logical size in bytes: flushed plus buffered. Next append offset.
    pub fn size(&self) -> u64 {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).size
    }

    pub fn is_closed(&self) -> bool {
        matches!(
            self.inner.lock().unwrap_or_else(PoisonError::into_inner).state,
            State::Closed
        )
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        match std::mem::replace(&mut inner.state, State::Closed) {
            State::Open(mut writer) => {
                match writer.flush() {
                    Ok(()) => tracing::warn!(size = inner.size, "store dropped without close"),
                    Err(e) => tracing::warn!(
                        size = inner.size,
                        error = %e,
                        "store dropped without close, flush failed"
                    ),
                }
                // Buffer is empty or unflushable; don't let BufWriter retry on drop.
                drop(writer.into_parts());
            }
            State::Failed(writer) => drop(writer.into_parts()),
            State::Closed => {}
        }
    }
}
