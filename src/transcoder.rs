//! Entry points that wire caller streams, the bridge adapters and the error
//! guard around one codec invocation.

use crate::codec::{Codec, TransformParams};
use crate::constants::STREAM_BUFFER_SIZE;
use crate::destination::{DestinationManager, StreamDestination};
use crate::error::{CodecFault, TranscodeError};
use crate::guard::ErrorUnwindGuard;
use crate::source::{SourceManager, StreamSource};
use crate::stream::{InputStream, OutputStream};
use log::debug;

/// Rotates, downscales and re-encodes JPEG streams with a pluggable codec.
pub struct JpegTranscoder<K> {
    codec: K,
    buffer_size: usize,
}

impl<K: Codec> JpegTranscoder<K> {
    pub fn new(codec: K) -> Self {
        Self {
            codec,
            buffer_size: STREAM_BUFFER_SIZE,
        }
    }

    /// Chunk size used on both sides of the bridge.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn codec(&self) -> &K {
        &self.codec
    }

    pub fn codec_mut(&mut self) -> &mut K {
        &mut self.codec
    }

    /// Transcodes `input` into `output`.
    ///
    /// * `rotation_angle` - 0, 90, 180 or 270.
    /// * `scale_numerator` - 1 to 16; the image is scaled by `scale_numerator / 8`.
    /// * `quality` - 0 to 100.
    ///
    /// Arguments are validated before either stream is touched. On failure,
    /// bytes already flushed to `output` stay there.
    pub fn transcode<I: InputStream, O: OutputStream>(
        &mut self,
        input: I,
        output: O,
        rotation_angle: i32,
        scale_numerator: i32,
        quality: i32,
    ) -> Result<(), TranscodeError> {
        let params = TransformParams::new(rotation_angle, scale_numerator, quality)?;
        self.transcode_with(input, output, &params)
    }

    pub fn transcode_with<I: InputStream, O: OutputStream>(
        &mut self,
        input: I,
        output: O,
        params: &TransformParams,
    ) -> Result<(), TranscodeError> {
        debug!(
            "transcoding: rotation {}, scale {}/{}, quality {}",
            params.rotation.degrees(),
            params.scale.numerator,
            params.scale.denominator,
            params.quality
        );
        let mut source = StreamSource::with_capacity(input, self.buffer_size);
        let mut destination = StreamDestination::with_capacity(output, self.buffer_size);
        let mut guard = ErrorUnwindGuard::<K::Decompress, K::Compress>::new();
        let codec = &mut self.codec;
        guard.run(|contexts| codec.transform(contexts, &mut source, &mut destination, params))
    }
}

/// Runs a job that needs both adapters but owns no codec contexts, under the
/// same error guard as a transform.
pub fn run_stream_job<I, O, T, F>(
    input: I,
    output: O,
    buffer_size: usize,
    job: F,
) -> Result<T, TranscodeError>
where
    I: InputStream,
    O: OutputStream,
    F: FnOnce(&mut dyn SourceManager, &mut dyn DestinationManager) -> Result<T, CodecFault>,
{
    let mut source = StreamSource::with_capacity(input, buffer_size);
    let mut destination = StreamDestination::with_capacity(output, buffer_size);
    let mut guard = ErrorUnwindGuard::<(), ()>::new();
    guard.run(|_| job(&mut source, &mut destination))
}

/// Runs a job that only reads, under the error guard.
pub fn run_source_job<I, T, F>(input: I, buffer_size: usize, job: F) -> Result<T, TranscodeError>
where
    I: InputStream,
    F: FnOnce(&mut dyn SourceManager) -> Result<T, CodecFault>,
{
    let mut source = StreamSource::with_capacity(input, buffer_size);
    let mut guard = ErrorUnwindGuard::<(), ()>::new();
    guard.run(|_| job(&mut source))
}
