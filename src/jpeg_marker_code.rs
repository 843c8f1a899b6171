use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum JpegMarkerCode {
    /// SOF0: Baseline DCT frame.
    StartOfFrameBaseline = 0xC0,
    /// SOF1: Extended sequential DCT frame.
    StartOfFrameExtended = 0xC1,
    /// SOF2: Progressive DCT frame.
    StartOfFrameProgressive = 0xC2,
    /// SOF3: Lossless (sequential) frame.
    StartOfFrameLossless = 0xC3,

    /// DHT: Defines one or more Huffman tables.
    DefineHuffmanTable = 0xC4,

    /// SOF9: Extended sequential DCT frame, arithmetic coding.
    StartOfFrameExtendedArithmetic = 0xC9,
    /// SOF10: Progressive DCT frame, arithmetic coding.
    StartOfFrameProgressiveArithmetic = 0xCA,

    /// DAC: Defines arithmetic coding conditioning.
    DefineArithmeticConditioning = 0xCC,

    /// SOI: Marks the start of an image.
    StartOfImage = 0xD8,

    /// EOI: Marks the end of an image.
    EndOfImage = 0xD9,

    /// SOS: Marks the start of scan.
    StartOfScan = 0xDA,

    /// DQT: Defines one or more quantization tables.
    DefineQuantizationTable = 0xDB,

    /// DNL: Defines the number of lines in a scan.
    DefineNumberOfLines = 0xDC,

    /// DRI: Defines the restart interval used in succeeding scans.
    DefineRestartInterval = 0xDD,

    /// APP0: Application data 0: used for JFIF header.
    ApplicationData0 = 0xE0,
    /// APP1: Application data 1: used for EXIF or XMP header.
    ApplicationData1 = 0xE1,
    /// APP2: Application data 2: used for ICC profile.
    ApplicationData2 = 0xE2,
    ApplicationData3 = 0xE3,
    ApplicationData4 = 0xE4,
    ApplicationData5 = 0xE5,
    ApplicationData6 = 0xE6,
    ApplicationData7 = 0xE7,
    ApplicationData8 = 0xE8,
    ApplicationData9 = 0xE9,
    ApplicationData10 = 0xEA,
    ApplicationData11 = 0xEB,
    ApplicationData12 = 0xEC,
    /// APP13: Application data 13: used by PhotoShop IRB
    ApplicationData13 = 0xED,
    /// APP14: Application data 14: used by Adobe, carries the color transform.
    ApplicationData14 = 0xEE,
    ApplicationData15 = 0xEF,

    /// COM: Comment block.
    Comment = 0xFE,
}

impl JpegMarkerCode {
    pub fn is_application_data(self) -> bool {
        (0xE0..=0xEF).contains(&u8::from(self))
    }

    /// Segments that only carry metadata and can be dropped without changing
    /// the decoded image. APP0 (JFIF) and APP14 (Adobe) stay because they
    /// affect color interpretation.
    pub fn is_metadata(self) -> bool {
        match self {
            Self::ApplicationData0 | Self::ApplicationData14 => false,
            Self::Comment => true,
            other => other.is_application_data(),
        }
    }
}

pub const JPEG_MARKER_START_BYTE: u8 = 0xFF;
pub const JPEG_RESTART_MARKER_BASE: u8 = 0xD0;
pub const JPEG_RESTART_MARKER_RANGE: u8 = 8;

// TEM: the only standalone marker besides SOI, EOI and RSTn.
pub const JPEG_TEMPORARY_MARKER: u8 = 0x01;

pub fn is_restart_marker(code: u8) -> bool {
    (JPEG_RESTART_MARKER_BASE..JPEG_RESTART_MARKER_BASE + JPEG_RESTART_MARKER_RANGE).contains(&code)
}

/// Markers that are not followed by a length field.
pub fn is_standalone_marker(code: u8) -> bool {
    code == JPEG_TEMPORARY_MARKER
        || is_restart_marker(code)
        || code == JpegMarkerCode::StartOfImage as u8
        || code == JpegMarkerCode::EndOfImage as u8
}

/// Human-readable name of a marker byte, for listings.
pub fn marker_name(code: u8) -> String {
    match JpegMarkerCode::try_from(code) {
        Ok(JpegMarkerCode::StartOfImage) => "SOI".to_string(),
        Ok(JpegMarkerCode::EndOfImage) => "EOI".to_string(),
        Ok(JpegMarkerCode::StartOfScan) => "SOS".to_string(),
        Ok(JpegMarkerCode::DefineQuantizationTable) => "DQT".to_string(),
        Ok(JpegMarkerCode::DefineHuffmanTable) => "DHT".to_string(),
        Ok(JpegMarkerCode::DefineArithmeticConditioning) => "DAC".to_string(),
        Ok(JpegMarkerCode::DefineNumberOfLines) => "DNL".to_string(),
        Ok(JpegMarkerCode::DefineRestartInterval) => "DRI".to_string(),
        Ok(JpegMarkerCode::Comment) => "COM".to_string(),
        Ok(marker) if marker.is_application_data() => format!("APP{}", code - 0xE0),
        _ if is_restart_marker(code) => format!("RST{}", code - JPEG_RESTART_MARKER_BASE),
        _ if (0xC0..=0xCF).contains(&code) => format!("SOF{}", code - 0xC0),
        _ => format!("0x{code:02X}"),
    }
}
