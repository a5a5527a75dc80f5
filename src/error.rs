/// Store-level errors
/// These represent failures in the record store's core operations.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("offset out of range: requested {offset}, store size {size}")]
    OffsetOutOfRange { offset: u64, size: u64 },

    #[error("corrupt frame at offset {offset}: {reason}")]
    CorruptFrame { offset: u64, reason: String },

    #[error("frame at offset {offset} too large to load: {len} bytes")]
    FrameTooLarge { offset: u64, len: u64 },

    #[error("store is closed")]
    Closed,

    #[error("store failed: a partial append could not be rolled back")]
    Failed,

    #[error("lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, StoreError>;
