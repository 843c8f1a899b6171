use std::io;
use thiserror::Error;

/// Failure reported from inside a transform: by the codec itself or by one
/// of the adapter callbacks it drives.
#[derive(Error, Debug)]
pub enum CodecFault {
    #[error("Empty input file")]
    InputEmpty,
    #[error("Failed to allocate memory for {0} buffer")]
    BufferAlloc(&'static str),
    #[error("{0}")]
    Message(String),
    #[error("Stream I/O failed: {0}")]
    Io(#[from] io::Error),
}

impl CodecFault {
    pub fn message(text: impl Into<String>) -> Self {
        Self::Message(text.into())
    }
}

/// Failure surfaced to the caller of a transform.
#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Stream I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("Codec error: {message}")]
    Codec { message: String },
}

impl TranscodeError {
    pub fn is_codec_error(&self) -> bool {
        matches!(self, Self::Codec { .. })
    }
}

impl From<CodecFault> for TranscodeError {
    fn from(fault: CodecFault) -> Self {
        match fault {
            CodecFault::Io(err) => Self::Io(err),
            other => Self::Codec {
                message: other.to_string(),
            },
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaError {
    #[error("Invalid or already freed handle {0:#x}")]
    InvalidHandle(i64),
    #[error("Range {offset}..{offset}+{count} out of bounds for handle {handle:#x} of size {size}")]
    OutOfBounds {
        handle: i64,
        offset: usize,
        count: usize,
        size: usize,
    },
    #[error("Source and destination share handle {0:#x}")]
    SameBuffer(i64),
    #[error("Memory chunk already closed")]
    Closed,
    #[error("Memory chunk size must be positive")]
    EmptyChunk,
    #[error("Could not allocate {0} bytes")]
    AllocationFailed(usize),
}
