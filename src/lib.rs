pub mod config;
pub mod error;
pub mod storage;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use storage::scan::{Frame, FrameScanner, FrameSource};
pub use storage::store::Store;
