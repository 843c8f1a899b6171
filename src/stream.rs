//! Byte stream handles supplied by the host.
//!
//! The adapters in [`crate::source`] and [`crate::destination`] only need a
//! small contract from the caller's stream: read into a buffer, write from a
//! buffer, and move the read position relative to where it is. The stream is
//! always owned by the caller; nothing in this crate closes it.

use std::io::{self, Read, Seek, SeekFrom, Write};

/// Readable end of a caller-owned stream.
pub trait InputStream {
    /// Reads up to `buf.len()` bytes. `Ok(0)` means the stream is exhausted.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Moves the read position by `offset` bytes and returns the new position.
    ///
    /// Positions past the end are allowed; subsequent reads return `Ok(0)`.
    fn seek_relative(&mut self, offset: i64) -> io::Result<u64>;
}

/// Writable end of a caller-owned stream.
pub trait OutputStream {
    /// Writes some prefix of `buf` and returns how many bytes were taken.
    /// Partial writes are allowed.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: InputStream + ?Sized> InputStream for &mut S {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn seek_relative(&mut self, offset: i64) -> io::Result<u64> {
        (**self).seek_relative(offset)
    }
}

impl<S: InputStream + ?Sized> InputStream for Box<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn seek_relative(&mut self, offset: i64) -> io::Result<u64> {
        (**self).seek_relative(offset)
    }
}

impl<S: OutputStream + ?Sized> OutputStream for &mut S {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

impl<S: OutputStream + ?Sized> OutputStream for Box<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Wraps a `std::io` stream: `Read + Seek` for input, `Write` for output.
#[derive(Debug)]
pub struct IoStream<T> {
    inner: T,
}

impl<T> IoStream<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + Seek> InputStream for IoStream<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }

    fn seek_relative(&mut self, offset: i64) -> io::Result<u64> {
        self.inner.seek(SeekFrom::Current(offset))
    }
}

impl<T: Write> OutputStream for IoStream<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Input over a reader that cannot seek (pipes, sockets).
///
/// Forward seeks read and discard; the reported position counts bytes
/// consumed through this wrapper. Backward seeks fail with `Unsupported`.
#[derive(Debug)]
pub struct ForwardStream<R> {
    inner: R,
    position: u64,
}

impl<R: Read> ForwardStream<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, position: 0 }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> InputStream for ForwardStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn seek_relative(&mut self, offset: i64) -> io::Result<u64> {
        if offset < 0 {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "backward seek on a forward-only stream",
            ));
        }
        // Running out early is fine: the position stops at the real end.
        let skipped = io::copy(&mut (&mut self.inner).take(offset as u64), &mut io::sink())?;
        self.position += skipped;
        Ok(self.position)
    }
}
