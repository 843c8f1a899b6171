//! Plumbing for callback-driven JPEG transcoding.
//!
//! * [`source`] and [`destination`] adapt caller-owned byte streams to the
//!   buffered pull/push callbacks a JPEG codec drives.
//! * [`guard`] turns a fatal codec error into an ordinary error value and
//!   releases the codec contexts exactly once.
//! * [`arena`] keeps native byte buffers addressable by integer handles for
//!   host runtimes; [`ffi`], the wasm bindings and the Python package expose it.

pub mod arena;
pub mod codec;
pub mod constants;
pub mod destination;
pub mod error;
pub mod ffi;
pub mod guard;
pub mod jpeg_marker_code;
pub mod markers;
pub mod memory_chunk;
pub mod source;
pub mod stream;
pub mod transcoder;
pub mod wasm;

pub use arena::NativeBufferArena;
pub use codec::{Codec, CodecContext, Rotation, ScaleFactor, TransformParams};
pub use destination::{DestinationManager, StreamDestination};
pub use error::{ArenaError, CodecFault, TranscodeError};
pub use guard::{ErrorContext, ErrorUnwindGuard};
pub use markers::{Segment, StripSummary};
pub use memory_chunk::NativeMemoryChunk;
pub use source::{SourceManager, StreamSource};
pub use stream::{ForwardStream, InputStream, IoStream, OutputStream};
pub use transcoder::{JpegTranscoder, run_source_job, run_stream_job};
