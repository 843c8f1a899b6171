// End-to-end transforms through JpegTranscoder with a scripted codec that
// counts every context it creates and destroys.

use jpegpipe_rs::stream::{IoStream, OutputStream};
use jpegpipe_rs::{
    Codec, CodecContext, CodecFault, DestinationManager, ErrorContext, InputStream, JpegTranscoder,
    Rotation, SourceManager, TranscodeError, TransformParams,
};
use std::io::{self, Cursor};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
struct Counters {
    created: AtomicUsize,
    destroyed: AtomicUsize,
}

impl Counters {
    fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }
}

struct TrackedContext {
    counters: Arc<Counters>,
}

impl TrackedContext {
    fn new(counters: &Arc<Counters>) -> Self {
        counters.created.fetch_add(1, Ordering::SeqCst);
        Self {
            counters: Arc::clone(counters),
        }
    }
}

impl CodecContext for TrackedContext {
    fn destroy(&mut self) {
        self.counters.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Failure {
    None,
    AfterDecode,
    MidEncode,
    Panic,
}

/// Decodes by collecting bytes up to EOI, encodes by writing them back out
/// (reversed for a half turn).
struct ScriptedCodec {
    counters: Arc<Counters>,
    failure: Failure,
    calls: usize,
}

impl ScriptedCodec {
    fn new(failure: Failure) -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            failure,
            calls: 0,
        }
    }
}

impl Codec for ScriptedCodec {
    type Decompress = TrackedContext;
    type Compress = TrackedContext;

    fn transform(
        &mut self,
        contexts: &mut ErrorContext<TrackedContext, TrackedContext>,
        source: &mut dyn SourceManager,
        destination: &mut dyn DestinationManager,
        params: &TransformParams,
    ) -> Result<(), CodecFault> {
        self.calls += 1;
        contexts.set_decompress(TrackedContext::new(&self.counters));
        source.init_source()?;

        let mut image = Vec::new();
        while !image.ends_with(&[0xFF, 0xD9]) {
            image.push(source.read_u8()?);
        }
        if self.failure == Failure::AfterDecode {
            return Err(CodecFault::message("Corrupt JPEG data: bad Huffman code"));
        }

        contexts.set_compress(TrackedContext::new(&self.counters));
        destination.init_destination()?;
        if self.failure == Failure::Panic {
            panic!("quantization table 3 undefined");
        }
        if params.rotation == Rotation::Rotate180 {
            image.reverse();
        }
        if self.failure == Failure::MidEncode {
            destination.write_bytes(&image[..image.len() / 2])?;
            return Err(CodecFault::message("Output file write error"));
        }
        destination.write_bytes(&image)?;
        destination.term_destination()?;
        contexts.finish_compress();
        contexts.finish_decompress();
        source.term_source();
        Ok(())
    }
}

/// Counts reads so tests can prove the stream was never touched.
struct CountingInput {
    inner: Cursor<Vec<u8>>,
    reads: usize,
}

impl InputStream for CountingInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads += 1;
        io::Read::read(&mut self.inner, buf)
    }

    fn seek_relative(&mut self, offset: i64) -> io::Result<u64> {
        io::Seek::seek(&mut self.inner, io::SeekFrom::Current(offset))
    }
}

struct BrokenPipe;

impl OutputStream for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader went away"))
    }
}

fn small_jpeg() -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8];
    data.extend((0u8..100).map(|i| i & 0x7F));
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
}

fn input_over(data: Vec<u8>) -> IoStream<Cursor<Vec<u8>>> {
    IoStream::new(Cursor::new(data))
}

#[test]
fn test_successful_transform_releases_each_context_once() {
    let mut transcoder = JpegTranscoder::new(ScriptedCodec::new(Failure::None)).with_buffer_size(16);
    let mut output = IoStream::new(Vec::new());
    transcoder
        .transcode(input_over(small_jpeg()), &mut output, 90, 8, 85)
        .unwrap();

    assert_eq!(output.into_inner(), small_jpeg());
    let counters = &transcoder.codec().counters;
    assert_eq!(counters.created(), 2);
    assert_eq!(counters.destroyed(), 2);
}

#[test]
fn test_rotation_reaches_codec() {
    let mut transcoder = JpegTranscoder::new(ScriptedCodec::new(Failure::None));
    let mut output = IoStream::new(Vec::new());
    transcoder
        .transcode(input_over(small_jpeg()), &mut output, 180, 8, 85)
        .unwrap();
    let mut expected = small_jpeg();
    expected.reverse();
    assert_eq!(output.into_inner(), expected);
}

#[test]
fn test_empty_input_reports_empty_file() {
    let mut transcoder = JpegTranscoder::new(ScriptedCodec::new(Failure::None));
    let err = transcoder
        .transcode(input_over(Vec::new()), IoStream::new(Vec::new()), 90, 8, 85)
        .unwrap_err();
    assert!(err.is_codec_error());
    assert_eq!(err.to_string(), "Codec error: Empty input file");

    let counters = &transcoder.codec().counters;
    assert_eq!(counters.created(), 1);
    assert_eq!(counters.destroyed(), 1);
}

#[test]
fn test_fault_during_decode_releases_decompress_only() {
    let mut transcoder = JpegTranscoder::new(ScriptedCodec::new(Failure::AfterDecode));
    let mut output = IoStream::new(Vec::new());
    let err = transcoder
        .transcode(input_over(small_jpeg()), &mut output, 270, 4, 50)
        .unwrap_err();
    match err {
        TranscodeError::Codec { message } => assert!(message.contains("bad Huffman code")),
        other => panic!("unexpected error: {other}"),
    }
    assert!(output.into_inner().is_empty());
    let counters = &transcoder.codec().counters;
    assert_eq!((counters.created(), counters.destroyed()), (1, 1));
}

#[test]
fn test_fault_during_encode_keeps_flushed_output() {
    let mut transcoder = JpegTranscoder::new(ScriptedCodec::new(Failure::MidEncode)).with_buffer_size(8);
    let mut output = IoStream::new(Vec::new());
    let err = transcoder
        .transcode(input_over(small_jpeg()), &mut output, 90, 16, 100)
        .unwrap_err();
    assert!(err.is_codec_error());

    // Half of 104 bytes is 52: six full 8-byte chunks went out, the rest
    // was still buffered when the codec failed.
    let written = output.into_inner();
    assert_eq!(written.len(), 48);
    assert_eq!(written, small_jpeg()[..48].to_vec());

    let counters = &transcoder.codec().counters;
    assert_eq!((counters.created(), counters.destroyed()), (2, 2));
}

#[test]
fn test_panicking_codec_is_contained() {
    let mut transcoder = JpegTranscoder::new(ScriptedCodec::new(Failure::Panic));
    let err = transcoder
        .transcode(input_over(small_jpeg()), IoStream::new(Vec::new()), 90, 8, 85)
        .unwrap_err();
    assert!(err.to_string().contains("quantization table 3 undefined"));
    let counters = &transcoder.codec().counters;
    assert_eq!((counters.created(), counters.destroyed()), (2, 2));
}

#[test]
fn test_output_failure_surfaces_as_io_error() {
    let mut transcoder = JpegTranscoder::new(ScriptedCodec::new(Failure::None)).with_buffer_size(4);
    let err = transcoder
        .transcode(input_over(small_jpeg()), BrokenPipe, 90, 8, 85)
        .unwrap_err();
    match err {
        TranscodeError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
        other => panic!("unexpected error: {other}"),
    }
    let counters = &transcoder.codec().counters;
    assert_eq!(counters.created(), counters.destroyed());
}

#[test]
fn test_truncated_input_ends_at_fake_eoi() {
    let mut data = small_jpeg();
    data.truncate(data.len() - 2);
    let mut transcoder = JpegTranscoder::new(ScriptedCodec::new(Failure::None)).with_buffer_size(32);
    let mut output = IoStream::new(Vec::new());
    transcoder.transcode(input_over(data.clone()), &mut output, 90, 8, 85).unwrap();

    let written = output.into_inner();
    assert_eq!(&written[..data.len()], &data[..]);
    assert_eq!(&written[data.len()..], &[0xFF, 0xD9]);
}

#[test]
fn test_invalid_arguments_never_touch_streams() {
    let cases = [(45, 8, 85), (90, 0, 85), (90, 17, 85), (90, 8, 101), (90, 8, -1), (0, 8, 85)];
    for (rotation, scale, quality) in cases {
        let mut transcoder = JpegTranscoder::new(ScriptedCodec::new(Failure::None));
        let mut input = CountingInput {
            inner: Cursor::new(small_jpeg()),
            reads: 0,
        };
        let mut output = IoStream::new(Vec::new());
        let err = transcoder
            .transcode(&mut input, &mut output, rotation, scale, quality)
            .unwrap_err();
        assert!(matches!(err, TranscodeError::InvalidArgument(_)), "{err}");
        assert_eq!(input.reads, 0);
        assert!(output.into_inner().is_empty());
        assert_eq!(transcoder.codec().calls, 0);
    }
}

#[test]
fn test_transcoder_is_reusable_after_failure() {
    let mut transcoder = JpegTranscoder::new(ScriptedCodec::new(Failure::AfterDecode));
    assert!(
        transcoder
            .transcode(input_over(small_jpeg()), IoStream::new(Vec::new()), 90, 8, 85)
            .is_err()
    );

    transcoder.codec_mut().failure = Failure::None;
    let mut output = IoStream::new(Vec::new());
    transcoder
        .transcode(input_over(small_jpeg()), &mut output, 90, 8, 85)
        .unwrap();
    assert_eq!(output.into_inner(), small_jpeg());
    let counters = &transcoder.codec().counters;
    assert_eq!((counters.created(), counters.destroyed()), (3, 3));
}
