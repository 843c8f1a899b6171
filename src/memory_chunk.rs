use crate::arena::{self, NativeBufferArena};
use crate::constants::NULL_HANDLE;
use crate::error::ArenaError;
use log::{debug, warn};
use std::ptr;

/// Owner of one arena buffer.
///
/// Reads and writes clamp the requested count to what is available past
/// the offset and report how many bytes actually moved. The buffer is freed
/// by [`close`](NativeMemoryChunk::close) or on drop.
pub struct NativeMemoryChunk<'a> {
    arena: &'a NativeBufferArena,
    handle: i64,
    size: usize,
    closed: bool,
}

impl NativeMemoryChunk<'static> {
    /// Allocates `size` bytes in the process-wide arena.
    pub fn new(size: usize) -> Result<Self, ArenaError> {
        Self::new_in(arena::global(), size)
    }
}

impl<'a> NativeMemoryChunk<'a> {
    pub fn new_in(arena: &'a NativeBufferArena, size: usize) -> Result<Self, ArenaError> {
        if size == 0 {
            return Err(ArenaError::EmptyChunk);
        }
        let handle = arena.allocate(size);
        if handle == NULL_HANDLE {
            return Err(ArenaError::AllocationFailed(size));
        }
        Ok(Self {
            arena,
            handle,
            size,
            closed: false,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn handle(&self) -> i64 {
        self.handle
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Frees the buffer. Further calls do nothing.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.arena.free(self.handle) {
            warn!("closing chunk {:#x}: {}", self.handle, e);
        }
    }

    /// Copies from `src` into the chunk at `offset`; returns bytes written.
    pub fn write(&self, offset: usize, src: &[u8]) -> Result<usize, ArenaError> {
        self.ensure_open()?;
        let count = self.adjust_byte_count(offset, src.len());
        self.arena
            .copy_from_external(self.handle, offset, &src[..count])?;
        Ok(count)
    }

    /// Copies from the chunk at `offset` into `dst`; returns bytes read.
    pub fn read(&self, offset: usize, dst: &mut [u8]) -> Result<usize, ArenaError> {
        self.ensure_open()?;
        let count = self.adjust_byte_count(offset, dst.len());
        self.arena
            .copy_to_external(self.handle, offset, &mut dst[..count])?;
        Ok(count)
    }

    pub fn read_byte(&self, offset: usize) -> Result<u8, ArenaError> {
        self.ensure_open()?;
        self.arena.read_byte_at(self.handle, offset)
    }

    /// Copies `count` bytes from this chunk at `offset` into `other` at
    /// `other_offset`. Copying a chunk onto itself is rejected.
    pub fn copy_to(
        &self,
        offset: usize,
        other: &NativeMemoryChunk<'_>,
        other_offset: usize,
        count: usize,
    ) -> Result<(), ArenaError> {
        self.ensure_open()?;
        other.ensure_open()?;
        if !ptr::eq(self.arena, other.arena) {
            return Err(ArenaError::InvalidHandle(other.handle));
        }
        self.arena
            .copy_between_at(other.handle, other_offset, self.handle, offset, count)
    }

    fn ensure_open(&self) -> Result<(), ArenaError> {
        if self.closed {
            Err(ArenaError::Closed)
        } else {
            Ok(())
        }
    }

    fn adjust_byte_count(&self, offset: usize, count: usize) -> usize {
        self.size.saturating_sub(offset).min(count)
    }
}

impl Drop for NativeMemoryChunk<'_> {
    fn drop(&mut self) {
        if !self.closed {
            debug!("chunk {:#x} dropped while open, freeing", self.handle);
            self.close();
        }
    }
}
