//! Pull side of the stream bridge.
//!
//! A codec decoding through a [`SourceManager`] sees a window of buffered
//! bytes. When the window is empty it asks for a refill; when it wants to
//! ignore a large segment it asks for a skip. [`StreamSource`] answers those
//! requests from a caller-owned [`InputStream`] in fixed-size chunks.

use crate::constants::{FAKE_END_OF_IMAGE, STREAM_BUFFER_SIZE};
use crate::error::CodecFault;
use crate::stream::InputStream;
use log::{debug, trace};
use std::io;

/// Codec-facing callback table for buffered input.
///
/// Every callback returns its outcome; a codec must propagate an `Err`
/// instead of continuing.
pub trait SourceManager {
    fn init_source(&mut self) -> Result<(), CodecFault>;

    /// Refills the window. Only called when [`bytes_in_buffer`] is zero.
    ///
    /// [`bytes_in_buffer`]: SourceManager::bytes_in_buffer
    fn fill_input_buffer(&mut self) -> Result<(), CodecFault>;

    /// Discards `num_bytes` of input. Non-positive counts are ignored.
    fn skip_input_data(&mut self, num_bytes: i64) -> Result<(), CodecFault>;

    fn term_source(&mut self);

    /// Bytes left in the current window.
    fn bytes_in_buffer(&self) -> usize;

    /// The current window; empty once exhausted.
    fn next_input_bytes(&self) -> &[u8];

    /// Advances the cursor past `count` bytes of the window.
    fn consume(&mut self, count: usize);

    /// Whether the current window is a synthesized end of image rather than
    /// stream data.
    fn input_exhausted(&self) -> bool {
        false
    }

    fn read_u8(&mut self) -> Result<u8, CodecFault> {
        if self.bytes_in_buffer() == 0 {
            self.fill_input_buffer()?;
        }
        let value = self.next_input_bytes()[0];
        self.consume(1);
        Ok(value)
    }

    fn read_u16(&mut self) -> Result<u16, CodecFault> {
        let high = self.read_u8()?;
        let low = self.read_u8()?;
        Ok(u16::from_be_bytes([high, low]))
    }
}

/// [`SourceManager`] reading from an [`InputStream`].
#[derive(Debug)]
pub struct StreamSource<S> {
    stream: S,
    buffer: Vec<u8>,
    capacity: usize,
    cursor: Option<usize>,
    bytes_in_buffer: usize,
    start_of_file: bool,
    exhausted: bool,
    fill_count: usize,
    bytes_read: u64,
}

impl<S: InputStream> StreamSource<S> {
    pub fn new(stream: S) -> Self {
        Self::with_capacity(stream, STREAM_BUFFER_SIZE)
    }

    pub fn with_capacity(stream: S, capacity: usize) -> Self {
        Self {
            stream,
            buffer: Vec::new(),
            capacity: capacity.max(FAKE_END_OF_IMAGE.len()),
            // Forces a fill on first read.
            cursor: None,
            bytes_in_buffer: 0,
            start_of_file: true,
            exhausted: false,
            fill_count: 0,
            bytes_read: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of successful `fill_input_buffer` calls so far.
    pub fn fill_count(&self) -> usize {
        self.fill_count
    }

    /// Bytes pulled from the wrapped stream, excluding synthesized markers.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: InputStream> SourceManager for StreamSource<S> {
    fn init_source(&mut self) -> Result<(), CodecFault> {
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(self.capacity)
            .map_err(|_| CodecFault::BufferAlloc("read"))?;
        buffer.resize(self.capacity, 0);
        self.buffer = buffer;
        self.cursor = None;
        self.bytes_in_buffer = 0;
        self.start_of_file = true;
        self.exhausted = false;
        debug!("source initialized with {} byte buffer", self.capacity);
        Ok(())
    }

    fn fill_input_buffer(&mut self) -> Result<(), CodecFault> {
        if self.buffer.len() < self.capacity {
            self.init_source()?;
        }

        let mut nbytes = loop {
            match self.stream.read(&mut self.buffer[..self.capacity]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        };
        self.exhausted = nbytes == 0;
        if nbytes == 0 {
            if self.start_of_file {
                return Err(CodecFault::InputEmpty);
            }
            // Let the codec see a clean end of image instead of reading on.
            debug!("input exhausted, inserting fake EOI marker");
            self.buffer[..FAKE_END_OF_IMAGE.len()].copy_from_slice(&FAKE_END_OF_IMAGE);
            nbytes = FAKE_END_OF_IMAGE.len();
        } else {
            self.bytes_read += nbytes as u64;
        }

        trace!("filled {} bytes", nbytes);
        self.cursor = Some(0);
        self.bytes_in_buffer = nbytes;
        self.start_of_file = false;
        self.fill_count += 1;
        Ok(())
    }

    fn skip_input_data(&mut self, num_bytes: i64) -> Result<(), CodecFault> {
        if num_bytes <= 0 {
            return Ok(());
        }

        let requested = num_bytes as u64;
        if requested <= self.bytes_in_buffer as u64 {
            self.consume(requested as usize);
            return Ok(());
        }

        let to_skip = requested - self.bytes_in_buffer as u64;
        let offset = i64::try_from(to_skip).map_err(|_| {
            CodecFault::message(format!("skip of {num_bytes} bytes exceeds stream range"))
        })?;
        // The landing position is not verified: a seek past the end simply
        // shows up as an exhausted stream on the next fill.
        let position = self.stream.seek_relative(offset)?;
        debug!("skipped {} bytes past buffer, stream now at {}", to_skip, position);
        self.cursor = None;
        self.bytes_in_buffer = 0;
        Ok(())
    }

    fn term_source(&mut self) {
        debug!(
            "source terminated after {} fills, {} bytes read",
            self.fill_count, self.bytes_read
        );
    }

    fn bytes_in_buffer(&self) -> usize {
        self.bytes_in_buffer
    }

    fn next_input_bytes(&self) -> &[u8] {
        match self.cursor {
            Some(start) => &self.buffer[start..start + self.bytes_in_buffer],
            None => &[],
        }
    }

    fn input_exhausted(&self) -> bool {
        self.exhausted
    }

    fn consume(&mut self, count: usize) {
        let count = count.min(self.bytes_in_buffer);
        self.bytes_in_buffer -= count;
        self.cursor = match self.cursor {
            Some(start) if self.bytes_in_buffer > 0 => Some(start + count),
            _ => None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::IoStream;
    use std::io::Cursor;

    fn source_over(data: &[u8], capacity: usize) -> StreamSource<IoStream<Cursor<Vec<u8>>>> {
        let mut source = StreamSource::with_capacity(IoStream::new(Cursor::new(data.to_vec())), capacity);
        source.init_source().unwrap();
        source
    }

    #[test]
    fn test_first_fill_on_empty_input_fails() {
        let mut source = source_over(&[], 16);
        let err = source.fill_input_buffer().unwrap_err();
        assert!(matches!(err, CodecFault::InputEmpty));
        assert_eq!(err.to_string(), "Empty input file");
    }

    #[test]
    fn test_fill_then_fake_eoi() {
        let mut source = source_over(&[1, 2, 3], 16);
        source.fill_input_buffer().unwrap();
        assert_eq!(source.next_input_bytes(), &[1, 2, 3]);
        source.consume(3);
        assert_eq!(source.bytes_in_buffer(), 0);
        assert!(source.next_input_bytes().is_empty());

        source.fill_input_buffer().unwrap();
        assert_eq!(source.next_input_bytes(), &FAKE_END_OF_IMAGE);
        assert_eq!(source.bytes_read(), 3);
    }

    #[test]
    fn test_fill_reads_in_chunks() {
        let data: Vec<u8> = (0..40).collect();
        let mut source = source_over(&data, 16);
        source.fill_input_buffer().unwrap();
        assert_eq!(source.bytes_in_buffer(), 16);
        source.consume(16);
        source.fill_input_buffer().unwrap();
        assert_eq!(source.next_input_bytes()[0], 16);
        source.consume(16);
        source.fill_input_buffer().unwrap();
        assert_eq!(source.bytes_in_buffer(), 8);
    }

    #[test]
    fn test_skip_within_buffer_does_no_io() {
        let data: Vec<u8> = (0..40).collect();
        let mut source = source_over(&data, 16);
        source.fill_input_buffer().unwrap();
        source.skip_input_data(5).unwrap();
        assert_eq!(source.bytes_in_buffer(), 11);
        assert_eq!(source.next_input_bytes()[0], 5);
        assert_eq!(source.fill_count(), 1);
    }

    #[test]
    fn test_skip_beyond_buffer_seeks() {
        let data: Vec<u8> = (0..40).collect();
        let mut source = source_over(&data, 16);
        source.fill_input_buffer().unwrap();
        source.consume(4);
        source.skip_input_data(20).unwrap();
        assert_eq!(source.bytes_in_buffer(), 0);
        assert_eq!(source.read_u8().unwrap(), 24);
    }

    #[test]
    fn test_skip_non_positive_is_noop() {
        let mut source = source_over(&[9, 8, 7], 16);
        source.fill_input_buffer().unwrap();
        source.skip_input_data(0).unwrap();
        source.skip_input_data(-4).unwrap();
        assert_eq!(source.bytes_in_buffer(), 3);
    }

    /// Reports `Interrupted` for the first `interrupts` reads.
    struct InterruptedStream {
        inner: IoStream<Cursor<Vec<u8>>>,
        interrupts: usize,
    }

    impl InputStream for InterruptedStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.interrupts > 0 {
                self.interrupts -= 1;
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }

        fn seek_relative(&mut self, offset: i64) -> io::Result<u64> {
            self.inner.seek_relative(offset)
        }
    }

    #[test]
    fn test_interrupted_read_is_retried() {
        let stream = InterruptedStream {
            inner: IoStream::new(Cursor::new(vec![0xFF, 0xD8, 0xFF])),
            interrupts: 3,
        };
        let mut source = StreamSource::with_capacity(stream, 16);
        source.init_source().unwrap();
        source.fill_input_buffer().unwrap();
        assert_eq!(source.next_input_bytes(), &[0xFF, 0xD8, 0xFF]);
        assert_eq!(source.fill_count(), 1);
    }

    #[test]
    fn test_exhausted_flag_tracks_fake_eoi() {
        let mut source = source_over(&[0xFF, 0xD9], 16);
        source.fill_input_buffer().unwrap();
        assert!(!source.input_exhausted());
        source.consume(2);
        source.fill_input_buffer().unwrap();
        assert!(source.input_exhausted());
    }

    #[test]
    fn test_skip_past_end_yields_fake_eoi() {
        let mut source = source_over(&[0xFF, 0xD8, 0, 0], 16);
        source.fill_input_buffer().unwrap();
        source.skip_input_data(100).unwrap();
        assert_eq!(source.read_u16().unwrap(), 0xFFD9);
    }
}
