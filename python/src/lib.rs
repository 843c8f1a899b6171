//! Python bindings for jpegpipe-rs using PyO3.

use jpegpipe_rs::arena;
use jpegpipe_rs::constants::STREAM_BUFFER_SIZE;
use jpegpipe_rs::markers::scan_segments;
use jpegpipe_rs::stream::IoStream;
use jpegpipe_rs::transcoder::run_source_job;
use pyo3::prelude::*;
use pyo3::types::PyBytes;
use std::io::Cursor;

fn value_error(e: impl std::fmt::Display) -> PyErr {
    PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{}", e))
}

/// One marker segment.
#[pyclass]
#[derive(Clone)]
struct Segment {
    #[pyo3(get)]
    marker: u8,
    #[pyo3(get)]
    offset: u64,
    #[pyo3(get)]
    length: u16,
}

#[pymethods]
impl Segment {
    fn __repr__(&self) -> String {
        format!(
            "Segment(marker=0x{:02X}, offset={}, length={})",
            self.marker, self.offset, self.length
        )
    }
}

/// Allocate a native buffer.
///
/// Returns:
///     Handle of the buffer, or 0 if the memory could not be obtained
#[pyfunction]
fn native_allocate(size: usize) -> i64 {
    arena::global().allocate(size)
}

#[pyfunction]
fn native_free(handle: i64) -> PyResult<()> {
    arena::global().free(handle).map_err(value_error)
}

/// Copy `count` bytes at `offset` out of a native buffer.
#[pyfunction]
fn native_copy_to_byte_array(
    py: Python<'_>,
    handle: i64,
    offset: usize,
    count: usize,
) -> PyResult<Py<PyBytes>> {
    let bytes = arena::global()
        .read_vec(handle, offset, count)
        .map_err(value_error)?;
    Ok(PyBytes::new(py, &bytes).into())
}

/// Copy `data` into a native buffer at `offset`.
#[pyfunction]
fn native_copy_from_byte_array(handle: i64, offset: usize, data: &[u8]) -> PyResult<()> {
    arena::global()
        .copy_from_external(handle, offset, data)
        .map_err(value_error)
}

#[pyfunction]
fn native_memcpy(dst: i64, src: i64, count: usize) -> PyResult<()> {
    arena::global()
        .copy_between(dst, src, count)
        .map_err(value_error)
}

#[pyfunction]
fn native_read_byte(handle: i64) -> PyResult<u8> {
    arena::global().read_byte(handle).map_err(value_error)
}

/// List the marker segments of a JPEG up to its first scan.
///
/// Args:
///     data: JPEG file bytes
#[pyfunction]
fn scan_markers(data: &[u8]) -> PyResult<Vec<Segment>> {
    let stream = IoStream::new(Cursor::new(data));
    let segments = run_source_job(stream, STREAM_BUFFER_SIZE, scan_segments)
        .map_err(value_error)?;
    Ok(segments
        .into_iter()
        .map(|s| Segment {
            marker: s.marker,
            offset: s.offset,
            length: s.length,
        })
        .collect())
}

/// jpegpipe Python module.
#[pymodule]
fn jpegpipe(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    m.add_class::<Segment>()?;
    m.add_function(wrap_pyfunction!(native_allocate, m)?)?;
    m.add_function(wrap_pyfunction!(native_free, m)?)?;
    m.add_function(wrap_pyfunction!(native_copy_to_byte_array, m)?)?;
    m.add_function(wrap_pyfunction!(native_copy_from_byte_array, m)?)?;
    m.add_function(wrap_pyfunction!(native_memcpy, m)?)?;
    m.add_function(wrap_pyfunction!(native_read_byte, m)?)?;
    m.add_function(wrap_pyfunction!(scan_markers, m)?)?;
    Ok(())
}
