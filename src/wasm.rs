//! WebAssembly bindings for jpegpipe-rs.
//!
//! Exposes the native buffer arena and the marker scanner to JavaScript via
//! wasm-bindgen. Handles cross the boundary as `BigInt`.

#[cfg(target_arch = "wasm32")]
use crate::arena;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
fn to_js(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Allocate `size` bytes. Returns 0 when the memory cannot be obtained.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn native_allocate(size: u32) -> i64 {
    arena::global().allocate(size as usize)
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn native_free(handle: i64) -> Result<(), JsValue> {
    arena::global().free(handle).map_err(to_js)
}

/// Copy `count` bytes starting at `offset` out of the buffer.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn native_copy_to_byte_array(handle: i64, offset: u32, count: u32) -> Result<Vec<u8>, JsValue> {
    arena::global()
        .read_vec(handle, offset as usize, count as usize)
        .map_err(to_js)
}

/// Copy `data` into the buffer starting at `offset`.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn native_copy_from_byte_array(handle: i64, offset: u32, data: &[u8]) -> Result<(), JsValue> {
    arena::global()
        .copy_from_external(handle, offset as usize, data)
        .map_err(to_js)
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn native_memcpy(dst: i64, src: i64, count: u32) -> Result<(), JsValue> {
    arena::global()
        .copy_between(dst, src, count as usize)
        .map_err(to_js)
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn native_read_byte(handle: i64) -> Result<u8, JsValue> {
    arena::global().read_byte(handle).map_err(to_js)
}

/// List the marker segments of a JPEG, one `offset marker length` line each.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn scan_markers(data: &[u8]) -> Result<String, JsValue> {
    use crate::constants::STREAM_BUFFER_SIZE;
    use crate::markers::scan_segments;
    use crate::stream::IoStream;
    use crate::transcoder::run_source_job;

    let stream = IoStream::new(std::io::Cursor::new(data));
    let segments = run_source_job(stream, STREAM_BUFFER_SIZE, scan_segments).map_err(to_js)?;
    Ok(segments
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join("\n"))
}
