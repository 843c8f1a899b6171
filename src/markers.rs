//! Marker-level JPEG tools that run on top of the bridge adapters.
//!
//! These never decode pixels. They walk the segment structure of a JPEG
//! stream, which is enough to list its segments or to drop metadata while
//! copying everything else byte for byte.

use crate::destination::DestinationManager;
use crate::error::CodecFault;
use crate::jpeg_marker_code::{
    JPEG_MARKER_START_BYTE, JpegMarkerCode, is_restart_marker, is_standalone_marker, marker_name,
};
use crate::source::SourceManager;
use log::{debug, warn};
use std::fmt;

/// One marker segment as found in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub marker: u8,
    /// Offset of the 0xFF byte that starts the marker.
    pub offset: u64,
    /// Value of the length field; zero for standalone markers.
    pub length: u16,
}

impl Segment {
    pub fn marker_code(&self) -> Option<JpegMarkerCode> {
        JpegMarkerCode::try_from(self.marker).ok()
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>8}  {:<5} length {}",
            self.offset,
            marker_name(self.marker),
            self.length
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StripSummary {
    pub segments_kept: usize,
    pub segments_dropped: usize,
    pub bytes_dropped: u64,
}

fn read_start_of_image(source: &mut dyn SourceManager) -> Result<(), CodecFault> {
    let first = source.read_u8()?;
    let second = source.read_u8()?;
    if first != JPEG_MARKER_START_BYTE || second != JpegMarkerCode::StartOfImage as u8 {
        return Err(CodecFault::message(format!(
            "Not a JPEG file: starts with 0x{first:02x} 0x{second:02x}"
        )));
    }
    Ok(())
}

/// Reads up to and including the next marker code, skipping fill bytes.
/// Returns the code and how many bytes were consumed.
fn read_marker(source: &mut dyn SourceManager) -> Result<(u8, u64), CodecFault> {
    let mut consumed = 0u64;
    let mut garbage = 0u64;
    loop {
        let byte = source.read_u8()?;
        consumed += 1;
        if byte != JPEG_MARKER_START_BYTE {
            garbage += 1;
            continue;
        }
        let mut code = source.read_u8()?;
        consumed += 1;
        while code == JPEG_MARKER_START_BYTE {
            code = source.read_u8()?;
            consumed += 1;
        }
        if code == 0 {
            // Stuffed zero outside a scan: not a marker.
            garbage += 2;
            continue;
        }
        if garbage > 0 {
            warn!("skipped {} extraneous bytes before marker 0x{:02x}", garbage, code);
        }
        return Ok((code, consumed));
    }
}

fn read_segment_length(source: &mut dyn SourceManager) -> Result<u16, CodecFault> {
    let length = source.read_u16()?;
    if length < 2 {
        return Err(CodecFault::message(format!("Bogus marker length {length}")));
    }
    Ok(length)
}

/// Copies `count` bytes from the source window straight into the destination.
/// Running out of input before `count` bytes is an error.
fn copy_bytes(
    source: &mut dyn SourceManager,
    destination: &mut dyn DestinationManager,
    mut count: usize,
) -> Result<(), CodecFault> {
    while count > 0 {
        if source.bytes_in_buffer() == 0 {
            source.fill_input_buffer()?;
            if source.input_exhausted() {
                return Err(CodecFault::message("Premature end of JPEG file"));
            }
        }
        let n = count.min(source.bytes_in_buffer());
        destination.write_bytes(&source.next_input_bytes()[..n])?;
        source.consume(n);
        count -= n;
    }
    Ok(())
}

/// Copies entropy-coded data up to the next real marker and returns its code.
fn copy_entropy_data(
    source: &mut dyn SourceManager,
    destination: &mut dyn DestinationManager,
) -> Result<u8, CodecFault> {
    loop {
        if source.bytes_in_buffer() == 0 {
            source.fill_input_buffer()?;
        }
        let window = source.next_input_bytes();
        let run = window
            .iter()
            .position(|&b| b == JPEG_MARKER_START_BYTE)
            .unwrap_or(window.len());
        if run > 0 {
            destination.write_bytes(&window[..run])?;
            source.consume(run);
            continue;
        }

        source.consume(1);
        let mut code = source.read_u8()?;
        while code == JPEG_MARKER_START_BYTE {
            code = source.read_u8()?;
        }
        if code == 0 || is_restart_marker(code) {
            destination.write_bytes(&[JPEG_MARKER_START_BYTE, code])?;
        } else {
            return Ok(code);
        }
    }
}

/// Lists the segments of a JPEG stream up to its first scan.
///
/// Segment bodies are skipped, not read.
pub fn scan_segments(source: &mut dyn SourceManager) -> Result<Vec<Segment>, CodecFault> {
    source.init_source()?;
    read_start_of_image(source)?;

    let mut segments = vec![Segment {
        marker: JpegMarkerCode::StartOfImage as u8,
        offset: 0,
        length: 0,
    }];
    let mut position = 2u64;

    loop {
        let (code, consumed) = read_marker(source)?;
        let offset = position + consumed - 2;
        position += consumed;

        if is_standalone_marker(code) {
            segments.push(Segment {
                marker: code,
                offset,
                length: 0,
            });
            if code == JpegMarkerCode::EndOfImage as u8 {
                break;
            }
            continue;
        }

        let length = read_segment_length(source)?;
        segments.push(Segment {
            marker: code,
            offset,
            length,
        });
        if code == JpegMarkerCode::StartOfScan as u8 {
            break;
        }
        source.skip_input_data(i64::from(length) - 2)?;
        position += u64::from(length);
    }

    source.term_source();
    debug!("scanned {} segments", segments.len());
    Ok(segments)
}

/// Copies a JPEG stream dropping metadata-only segments (EXIF, XMP, ICC,
/// comments and other application data except JFIF and Adobe).
pub fn strip_metadata(
    source: &mut dyn SourceManager,
    destination: &mut dyn DestinationManager,
) -> Result<StripSummary, CodecFault> {
    source.init_source()?;
    destination.init_destination()?;
    read_start_of_image(source)?;
    destination.write_bytes(&[JPEG_MARKER_START_BYTE, JpegMarkerCode::StartOfImage as u8])?;

    let mut summary = StripSummary::default();
    let mut pending = None;

    loop {
        let code = match pending.take() {
            Some(code) => code,
            None => read_marker(source)?.0,
        };

        if is_standalone_marker(code) {
            destination.write_bytes(&[JPEG_MARKER_START_BYTE, code])?;
            if code == JpegMarkerCode::EndOfImage as u8 {
                break;
            }
            continue;
        }

        let length = read_segment_length(source)?;
        let body = usize::from(length) - 2;
        let is_metadata = JpegMarkerCode::try_from(code)
            .map(|m| m.is_metadata())
            .unwrap_or(false);
        if is_metadata {
            source.skip_input_data(body as i64)?;
            summary.segments_dropped += 1;
            summary.bytes_dropped += u64::from(length) + 2;
            continue;
        }

        destination.write_bytes(&[JPEG_MARKER_START_BYTE, code])?;
        destination.write_u16(length)?;
        copy_bytes(source, destination, body)?;
        summary.segments_kept += 1;

        if code == JpegMarkerCode::StartOfScan as u8 {
            pending = Some(copy_entropy_data(source, destination)?);
        }
    }

    destination.term_destination()?;
    source.term_source();
    debug!(
        "kept {} segments, dropped {} ({} bytes)",
        summary.segments_kept, summary.segments_dropped, summary.bytes_dropped
    );
    Ok(summary)
}
