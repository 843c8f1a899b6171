//! Push side of the stream bridge.
//!
//! A codec encoding through a [`DestinationManager`] fills a fixed-size
//! buffer. Each time the buffer is full it is handed to the caller's
//! [`OutputStream`] as one chunk; whatever is left at termination goes out as
//! a final, shorter chunk.

use crate::constants::STREAM_BUFFER_SIZE;
use crate::error::CodecFault;
use crate::stream::OutputStream;
use log::{debug, trace};
use std::io;

/// Codec-facing callback table for buffered output.
pub trait DestinationManager {
    fn init_destination(&mut self) -> Result<(), CodecFault>;

    /// Sends the full buffer downstream and resets it to empty.
    fn empty_output_buffer(&mut self) -> Result<(), CodecFault>;

    /// Sends whatever is still buffered downstream.
    fn term_destination(&mut self) -> Result<(), CodecFault>;

    /// Free bytes left in the buffer.
    fn free_in_buffer(&self) -> usize;

    /// The free part of the buffer, starting at the next free byte.
    fn next_output_bytes(&mut self) -> &mut [u8];

    /// Marks `count` bytes of [`next_output_bytes`] as written.
    ///
    /// [`next_output_bytes`]: DestinationManager::next_output_bytes
    fn commit(&mut self, count: usize);

    /// Copies `bytes` into the buffer, emptying it every time it fills up.
    fn write_bytes(&mut self, mut bytes: &[u8]) -> Result<(), CodecFault> {
        while !bytes.is_empty() {
            if self.free_in_buffer() == 0 {
                self.empty_output_buffer()?;
            }
            let n = bytes.len().min(self.free_in_buffer());
            self.next_output_bytes()[..n].copy_from_slice(&bytes[..n]);
            self.commit(n);
            bytes = &bytes[n..];
            if self.free_in_buffer() == 0 {
                self.empty_output_buffer()?;
            }
        }
        Ok(())
    }

    fn write_u8(&mut self, value: u8) -> Result<(), CodecFault> {
        self.write_bytes(&[value])
    }

    fn write_u16(&mut self, value: u16) -> Result<(), CodecFault> {
        self.write_bytes(&value.to_be_bytes())
    }
}

/// [`DestinationManager`] writing to an [`OutputStream`].
#[derive(Debug)]
pub struct StreamDestination<S> {
    stream: S,
    buffer: Vec<u8>,
    capacity: usize,
    next_output_byte: usize,
    free_in_buffer: usize,
    chunks_written: usize,
    bytes_written: u64,
}

impl<S: OutputStream> StreamDestination<S> {
    pub fn new(stream: S) -> Self {
        Self::with_capacity(stream, STREAM_BUFFER_SIZE)
    }

    pub fn with_capacity(stream: S, capacity: usize) -> Self {
        Self {
            stream,
            buffer: Vec::new(),
            capacity: capacity.max(1),
            next_output_byte: 0,
            free_in_buffer: 0,
            chunks_written: 0,
            bytes_written: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Full chunks sent by `empty_output_buffer`.
    pub fn chunks_written(&self) -> usize {
        self.chunks_written
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Hands `len` buffered bytes to the stream, looping over partial writes.
    fn flush_buffer(&mut self, len: usize) -> Result<(), CodecFault> {
        let mut written = 0;
        while written < len {
            match self.stream.write(&self.buffer[written..len]) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "output stream accepted no bytes",
                    )
                    .into());
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        self.bytes_written += len as u64;
        trace!("flushed {} bytes", len);
        Ok(())
    }
}

impl<S: OutputStream> DestinationManager for StreamDestination<S> {
    fn init_destination(&mut self) -> Result<(), CodecFault> {
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(self.capacity)
            .map_err(|_| CodecFault::BufferAlloc("write"))?;
        buffer.resize(self.capacity, 0);
        self.buffer = buffer;
        self.next_output_byte = 0;
        self.free_in_buffer = self.capacity;
        debug!("destination initialized with {} byte buffer", self.capacity);
        Ok(())
    }

    fn empty_output_buffer(&mut self) -> Result<(), CodecFault> {
        if self.buffer.len() < self.capacity {
            return Err(CodecFault::message("destination used before init_destination"));
        }
        self.flush_buffer(self.capacity)?;
        self.next_output_byte = 0;
        self.free_in_buffer = self.capacity;
        self.chunks_written += 1;
        Ok(())
    }

    fn term_destination(&mut self) -> Result<(), CodecFault> {
        let datacount = self.capacity.saturating_sub(self.free_in_buffer);
        if datacount > 0 {
            self.flush_buffer(datacount)?;
            self.next_output_byte = 0;
            self.free_in_buffer = self.capacity;
        }
        self.stream.flush()?;
        debug!(
            "destination terminated after {} full chunks, {} bytes written",
            self.chunks_written, self.bytes_written
        );
        Ok(())
    }

    fn free_in_buffer(&self) -> usize {
        self.free_in_buffer
    }

    fn next_output_bytes(&mut self) -> &mut [u8] {
        let start = self.next_output_byte;
        &mut self.buffer[start..start + self.free_in_buffer]
    }

    fn commit(&mut self, count: usize) {
        let count = count.min(self.free_in_buffer);
        self.next_output_byte += count;
        self.free_in_buffer -= count;
    }
}
