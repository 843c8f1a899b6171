//! C Foreign Function Interface for the native buffer arena.
//!
//! Buffers are referred to by plain `int64_t` handles; zero is the null
//! handle. Every function other than allocate returns a status code, and
//! every handle, offset and count is checked before memory is touched.

use crate::arena;
use crate::constants::NULL_HANDLE;
use crate::error::ArenaError;
use std::os::raw::{c_int, c_uchar};

/// Status codes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegPipeStatus {
    Ok = 0,
    InvalidHandle = 1,
    OutOfBounds = 2,
    SameBuffer = 3,
    InvalidArgument = 4,
    NullPointer = 5,
}

impl From<ArenaError> for JpegPipeStatus {
    fn from(err: ArenaError) -> Self {
        match err {
            ArenaError::InvalidHandle(_) | ArenaError::Closed => Self::InvalidHandle,
            ArenaError::OutOfBounds { .. } => Self::OutOfBounds,
            ArenaError::SameBuffer(_) => Self::SameBuffer,
            ArenaError::EmptyChunk | ArenaError::AllocationFailed(_) => Self::InvalidArgument,
        }
    }
}

fn status(result: Result<(), ArenaError>) -> c_int {
    match result {
        Ok(()) => JpegPipeStatus::Ok as c_int,
        Err(e) => JpegPipeStatus::from(e) as c_int,
    }
}

fn non_negative(value: c_int) -> Option<usize> {
    usize::try_from(value).ok()
}

/// Allocate `size` bytes. Returns 0 on failure or negative size.
#[unsafe(no_mangle)]
pub extern "C" fn jpegpipe_native_allocate(size: c_int) -> i64 {
    match non_negative(size) {
        Some(size) => arena::global().allocate(size),
        None => NULL_HANDLE,
    }
}

/// Free a buffer.
#[unsafe(no_mangle)]
pub extern "C" fn jpegpipe_native_free(handle: i64) -> c_int {
    status(arena::global().free(handle))
}

/// Copy `count` bytes at `offset` of the buffer into `byte_array`.
///
/// # Safety
/// `byte_array` must be valid for writes of `count` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn jpegpipe_native_copy_to_byte_array(
    handle: i64,
    byte_array: *mut c_uchar,
    offset: c_int,
    count: c_int,
) -> c_int {
    let (Some(offset), Some(count)) = (non_negative(offset), non_negative(count)) else {
        return JpegPipeStatus::InvalidArgument as c_int;
    };
    if count == 0 {
        return status(arena::global().copy_to_external(handle, offset, &mut []));
    }
    if byte_array.is_null() {
        return JpegPipeStatus::NullPointer as c_int;
    }
    let dst = unsafe { std::slice::from_raw_parts_mut(byte_array, count) };
    status(arena::global().copy_to_external(handle, offset, dst))
}

/// Copy `count` bytes from `byte_array` into the buffer at `offset`.
///
/// # Safety
/// `byte_array` must be valid for reads of `count` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn jpegpipe_native_copy_from_byte_array(
    handle: i64,
    byte_array: *const c_uchar,
    offset: c_int,
    count: c_int,
) -> c_int {
    let (Some(offset), Some(count)) = (non_negative(offset), non_negative(count)) else {
        return JpegPipeStatus::InvalidArgument as c_int;
    };
    if count == 0 {
        return status(arena::global().copy_from_external(handle, offset, &[]));
    }
    if byte_array.is_null() {
        return JpegPipeStatus::NullPointer as c_int;
    }
    let src = unsafe { std::slice::from_raw_parts(byte_array, count) };
    status(arena::global().copy_from_external(handle, offset, src))
}

/// Copy the first `count` bytes of `src` to the start of `dst`.
#[unsafe(no_mangle)]
pub extern "C" fn jpegpipe_native_memcpy(dst: i64, src: i64, count: c_int) -> c_int {
    match non_negative(count) {
        Some(count) => status(arena::global().copy_between(dst, src, count)),
        None => JpegPipeStatus::InvalidArgument as c_int,
    }
}

/// Read the first byte of the buffer into `out`.
///
/// # Safety
/// `out` must be valid for a one-byte write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn jpegpipe_native_read_byte(handle: i64, out: *mut c_uchar) -> c_int {
    if out.is_null() {
        return JpegPipeStatus::NullPointer as c_int;
    }
    match arena::global().read_byte(handle) {
        Ok(value) => {
            unsafe { *out = value };
            JpegPipeStatus::Ok as c_int
        }
        Err(e) => JpegPipeStatus::from(e) as c_int,
    }
}
