// Marker listing and metadata stripping run through the guarded job helpers.

use jpegpipe_rs::markers::{scan_segments, strip_metadata};
use jpegpipe_rs::stream::{ForwardStream, IoStream};
use jpegpipe_rs::{TranscodeError, run_source_job, run_stream_job};
use std::io::Cursor;

fn jpeg_with_exif(exif_len: usize) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8];
    data.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
    data.extend_from_slice(b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0");
    let len = (exif_len + 2) as u16;
    data.extend_from_slice(&[0xFF, 0xE1]);
    data.extend_from_slice(&len.to_be_bytes());
    data.extend(std::iter::repeat_n(0x45u8, exif_len));
    data.extend_from_slice(&[0xFF, 0xC4, 0x00, 0x05, 0x00, 0x01, 0x02]);
    data.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02]);
    data.extend_from_slice(&[0x10, 0x20, 0xFF, 0x00, 0x30]);
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
}

#[test]
fn test_scan_skips_large_segment_through_seek() {
    let data = jpeg_with_exif(50_000);
    let segments = run_source_job(IoStream::new(Cursor::new(data)), 1024, scan_segments).unwrap();
    let markers: Vec<u8> = segments.iter().map(|s| s.marker).collect();
    assert_eq!(markers, vec![0xD8, 0xE0, 0xE1, 0xC4, 0xDA]);
    assert_eq!(segments[3].offset, 2 + 18 + 4 + 50_000);
}

#[test]
fn test_scan_over_pipe() {
    let data = jpeg_with_exif(3000);
    let segments = run_source_job(ForwardStream::new(&data[..]), 256, scan_segments).unwrap();
    assert_eq!(segments.len(), 5);
    assert_eq!(segments[2].length, 3002);
}

#[test]
fn test_strip_removes_exif() {
    let data = jpeg_with_exif(10_000);
    let mut output = IoStream::new(Vec::new());
    let input = IoStream::new(Cursor::new(data.clone()));
    let summary = run_stream_job(input, &mut output, 512, strip_metadata).unwrap();
    assert_eq!(summary.segments_dropped, 1);
    assert_eq!(summary.bytes_dropped, 10_004);

    let stripped = output.into_inner();
    assert_eq!(stripped.len(), data.len() - 10_004);
    assert_eq!(&stripped[..20], &data[..20]);
    assert_eq!(&stripped[20..], &data[20 + 10_004..]);
}

#[test]
fn test_empty_input_is_reported() {
    let err = run_source_job(IoStream::new(Cursor::new(Vec::new())), 64, scan_segments).unwrap_err();
    match err {
        TranscodeError::Codec { message } => assert_eq!(message, "Empty input file"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_bogus_length_is_a_codec_error() {
    let data = vec![0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x01];
    let err = run_source_job(IoStream::new(Cursor::new(data)), 64, scan_segments).unwrap_err();
    assert!(err.is_codec_error());
    assert!(err.to_string().contains("Bogus marker length 1"));
}

#[test]
fn test_strip_cut_inside_kept_segment_is_an_error() {
    let mut data = jpeg_with_exif(100);
    data.truncate(12);
    let mut output = IoStream::new(Vec::new());
    let input = IoStream::new(Cursor::new(data));
    let err = run_stream_job(input, &mut output, 64, strip_metadata).unwrap_err();
    assert!(err.is_codec_error());
    assert_eq!(err.to_string(), "Codec error: Premature end of JPEG file");
}
