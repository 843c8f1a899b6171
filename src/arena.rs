//! Native buffer arena.
//!
//! Byte buffers live outside any host runtime's garbage collector and are
//! referred to by plain `i64` handles. The handle table is authoritative:
//! every operation looks the handle up, so an unknown or freed handle is an
//! [`ArenaError::InvalidHandle`] rather than a stray memory access, and every
//! offset/count is checked against the buffer's size.
//!
//! Handles are never reused. The table lock is only held for lookups; bytes
//! are moved under the per-buffer lock, and a buffer freed mid-copy stays
//! alive until that copy finishes.

use crate::constants::NULL_HANDLE;
use crate::error::ArenaError;
use log::{debug, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, LazyLock};

type SharedBuffer = Arc<Mutex<Vec<u8>>>;

static GLOBAL_ARENA: LazyLock<NativeBufferArena> = LazyLock::new(NativeBufferArena::new);

/// The process-wide arena used by the runtime bindings.
pub fn global() -> &'static NativeBufferArena {
    &GLOBAL_ARENA
}

pub struct NativeBufferArena {
    table: Mutex<HashMap<i64, SharedBuffer>>,
    next_handle: AtomicI64,
}

impl NativeBufferArena {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
            next_handle: AtomicI64::new(NULL_HANDLE + 1),
        }
    }

    /// Reserves `size` zeroed bytes. Returns [`NULL_HANDLE`] if the memory
    /// cannot be obtained.
    pub fn allocate(&self, size: usize) -> i64 {
        let mut bytes = Vec::new();
        if bytes.try_reserve_exact(size).is_err() {
            warn!("could not allocate {} bytes", size);
            return NULL_HANDLE;
        }
        bytes.resize(size, 0);

        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.table.lock().insert(handle, Arc::new(Mutex::new(bytes)));
        debug!("allocated {} bytes as handle {:#x}", size, handle);
        handle
    }

    pub fn free(&self, handle: i64) -> Result<(), ArenaError> {
        match self.table.lock().remove(&handle) {
            Some(_) => {
                debug!("freed handle {:#x}", handle);
                Ok(())
            }
            None => Err(ArenaError::InvalidHandle(handle)),
        }
    }

    pub fn size_of(&self, handle: i64) -> Result<usize, ArenaError> {
        Ok(self.lookup(handle)?.lock().len())
    }

    /// Number of live allocations.
    pub fn live_count(&self) -> usize {
        self.table.lock().len()
    }

    /// Copies `dst.len()` bytes starting at `offset` out of the buffer.
    pub fn copy_to_external(
        &self,
        handle: i64,
        offset: usize,
        dst: &mut [u8],
    ) -> Result<(), ArenaError> {
        let buffer = self.lookup(handle)?;
        let bytes = buffer.lock();
        let range = check_range(handle, bytes.len(), offset, dst.len())?;
        dst.copy_from_slice(&bytes[range]);
        Ok(())
    }

    /// Copies `src` into the buffer starting at `offset`.
    pub fn copy_from_external(
        &self,
        handle: i64,
        offset: usize,
        src: &[u8],
    ) -> Result<(), ArenaError> {
        let buffer = self.lookup(handle)?;
        let mut bytes = buffer.lock();
        let range = check_range(handle, bytes.len(), offset, src.len())?;
        bytes[range].copy_from_slice(src);
        Ok(())
    }

    /// Copies the first `count` bytes of `src` to the start of `dst`.
    pub fn copy_between(&self, dst: i64, src: i64, count: usize) -> Result<(), ArenaError> {
        self.copy_between_at(dst, 0, src, 0, count)
    }

    /// Copies `count` bytes from `src[src_offset..]` to `dst[dst_offset..]`.
    ///
    /// The two handles must differ. Buffers are locked in handle order so
    /// concurrent copies in opposite directions cannot deadlock.
    pub fn copy_between_at(
        &self,
        dst: i64,
        dst_offset: usize,
        src: i64,
        src_offset: usize,
        count: usize,
    ) -> Result<(), ArenaError> {
        if dst == src {
            warn!("refusing to copy handle {:#x} onto itself", dst);
            return Err(ArenaError::SameBuffer(dst));
        }
        let (dst_buffer, src_buffer) = {
            let table = self.table.lock();
            let dst_buffer = table.get(&dst).cloned().ok_or(ArenaError::InvalidHandle(dst))?;
            let src_buffer = table.get(&src).cloned().ok_or(ArenaError::InvalidHandle(src))?;
            (dst_buffer, src_buffer)
        };

        let (mut dst_bytes, src_bytes) = if dst < src {
            let d = dst_buffer.lock();
            let s = src_buffer.lock();
            (d, s)
        } else {
            let s = src_buffer.lock();
            let d = dst_buffer.lock();
            (d, s)
        };

        let src_range = check_range(src, src_bytes.len(), src_offset, count)?;
        let dst_range = check_range(dst, dst_bytes.len(), dst_offset, count)?;
        dst_bytes[dst_range].copy_from_slice(&src_bytes[src_range]);
        Ok(())
    }

    /// The byte at the start of the buffer.
    pub fn read_byte(&self, handle: i64) -> Result<u8, ArenaError> {
        self.read_byte_at(handle, 0)
    }

    pub fn read_byte_at(&self, handle: i64, offset: usize) -> Result<u8, ArenaError> {
        let buffer = self.lookup(handle)?;
        let bytes = buffer.lock();
        let range = check_range(handle, bytes.len(), offset, 1)?;
        Ok(bytes[range.start])
    }

    /// Fresh copy of `count` bytes starting at `offset`.
    pub fn read_vec(&self, handle: i64, offset: usize, count: usize) -> Result<Vec<u8>, ArenaError> {
        let buffer = self.lookup(handle)?;
        let bytes = buffer.lock();
        let range = check_range(handle, bytes.len(), offset, count)?;
        Ok(bytes[range].to_vec())
    }

    fn lookup(&self, handle: i64) -> Result<SharedBuffer, ArenaError> {
        self.table
            .lock()
            .get(&handle)
            .cloned()
            .ok_or(ArenaError::InvalidHandle(handle))
    }
}

impl Default for NativeBufferArena {
    fn default() -> Self {
        Self::new()
    }
}

fn check_range(
    handle: i64,
    size: usize,
    offset: usize,
    count: usize,
) -> Result<std::ops::Range<usize>, ArenaError> {
    match offset.checked_add(count) {
        Some(end) if end <= size => Ok(offset..end),
        _ => Err(ArenaError::OutOfBounds {
            handle,
            offset,
            count,
            size,
        }),
    }
}
