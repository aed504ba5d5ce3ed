use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that end a request. Short reads, odd trailing bytes, empty windows
/// and collapsed amplitude scales are absorbed where they occur and never show up here.
#[derive(Debug, Error)]
pub enum EcgError {
    #[error("sample stream {} cannot be opened: {source}", path.display())]
    StorageUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("read failed at byte offset {offset}: {source}")]
    Read {
        offset: u64,
        #[source]
        source: io::Error,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
