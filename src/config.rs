//! Record store configuration.
//!
//! The store has very few knobs:
//! 1. How many frame bytes to buffer before they are written to the file
//! 2. Whether close() forces the file to stable storage (fsync)
//!
//! The frame layout itself (8-byte big-endian length prefix) is NOT configurable.
//! It lives in `storage::frame` as constants because it is part of the on-disk format.

use crate::storage::frame::LEN_WIDTH;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Configuration Constants
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Default write buffer capacity in bytes.
///
/// Matches the standard library's `BufWriter` default.
/// Frames larger than the buffer bypass it and go straight to the file.
pub const DEFAULT_BUFFER_CAPACITY: usize = 8 * 1024;

/// Default for fsync on close.
///
/// A successful close() means every acknowledged append survives a crash.
pub const DEFAULT_SYNC_ON_CLOSE: bool = true;

/// Environment variable overriding the buffer capacity (bytes).
pub const ENV_BUFFER_BYTES: &str = "RUSTLOG_STORE_BUFFER_BYTES";

/// Environment variable overriding fsync on close (`true`/`false`/`1`/`0`).
pub const ENV_SYNC_ON_CLOSE: &str = "RUSTLOG_STORE_SYNC_ON_CLOSE";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Store Config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Tunables for a single `Store`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Write buffer capacity in bytes. Never smaller than one length prefix.
    pub buffer_capacity: usize,

    /// Call `sync_all` on the file during close().
    pub sync_on_close: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            sync_on_close: DEFAULT_SYNC_ON_CLOSE,
        }
    }
}

impl StoreConfig {
    /// Set the write buffer capacity, clamped to at least `LEN_WIDTH` bytes.
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity.max(LEN_WIDTH);
        self
    }

    pub fn with_sync_on_close(mut self, sync: bool) -> Self {
        self.sync_on_close = sync;
        self
    }

    /// Build a config from the process environment.
    ///
    /// Missing variables fall back to defaults.
    /// Unparsable values are ignored with a warning rather than failing startup.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, with an injectable lookup (used by tests).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_BUFFER_BYTES) {
            match raw.trim().parse::<usize>() {
                Ok(capacity) => config = config.with_buffer_capacity(capacity),
                Err(e) => tracing::warn!(
                    variable = ENV_BUFFER_BYTES,
                    value = %raw,
                    error = %e,
                    "ignoring invalid buffer capacity"
                ),
            }
        }

        if let Some(raw) = lookup(ENV_SYNC_ON_CLOSE) {
            match parse_bool(&raw) {
                Some(sync) => config = config.with_sync_on_close(sync),
                None => tracing::warn!(
                    variable = ENV_SYNC_ON_CLOSE,
                    value = %raw,
                    "ignoring invalid sync-on-close flag"
                ),
            }
        }

        config
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
