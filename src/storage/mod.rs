/// Storage layer for RustLog
///
/// This module provides the append-only record store at the bottom of the log.
///
/// Current scope:
/// - Frame: 8-byte big-endian length prefix + payload, the on-disk unit
/// - Store: one file, buffered appends, offset-addressed reads
/// - Scan: sequential frame walking and torn-tail detection
///
/// Not in scope here:
/// - Segments and indexes over multiple stores
/// - Retention, compaction
pub mod frame;
pub mod pread;
pub mod scan;
pub mod store;
