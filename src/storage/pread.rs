//! Positional reads on a shared `&File`.
//!
//! Reads never move the write cursor: the store keeps appending where it left
//! off no matter how many reads happen in between.

use std::fs::File;
use std::io;

/// Read into `buf` starting at `offset`, looping until `buf` is full or EOF.
///
/// Returns the number of bytes copied. A short count means EOF was reached.
pub fn read_at_full(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    let mut copied = 0;
    while copied < buf.len() {
        match read_at(file, &mut buf[copied..], offset + copied as u64) {
            Ok(0) => break,
            Ok(n) => copied += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(copied)
}

/// Read exactly `buf.len()` bytes at `offset`.
///
/// # Errors
/// - `UnexpectedEof` if the file ends first
pub fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    let copied = read_at_full(file, buf, offset)?;
    if copied < buf.len() {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!(
                "short read at offset {}: wanted {} bytes, got {}",
                offset,
                buf.len(),
                copied
            ),
        ));
    }
    Ok(())
}

#[cfg(unix)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.read_at(buf, offset)
}

#[cfg(windows)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::io::{Seek, SeekFrom};
    use std::os::windows::fs::FileExt;

    // seek_read moves the cursor on Windows; put it back for the writer.
    let mut handle = file;
    let cursor = handle.stream_position()?;
    let result = file.seek_read(buf, offset);
    handle.seek(SeekFrom::Start(cursor))?;
    result
}
