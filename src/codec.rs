//! Contract between the bridge and a black-box JPEG codec.

use crate::constants::{
    MAX_QUALITY, MAX_SCALE_NUMERATOR, MIN_QUALITY, MIN_SCALE_NUMERATOR, SCALE_DENOMINATOR,
};
use crate::destination::DestinationManager;
use crate::error::{CodecFault, TranscodeError};
use crate::guard::ErrorContext;
use crate::source::SourceManager;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Clockwise rotation applied by the transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum Rotation {
    None = 0,
    Rotate90 = 90,
    Rotate180 = 180,
    Rotate270 = 270,
}

impl Rotation {
    pub fn from_degrees(degrees: i32) -> Result<Self, TranscodeError> {
        u16::try_from(degrees)
            .ok()
            .and_then(|d| Rotation::try_from(d).ok())
            .ok_or_else(|| {
                TranscodeError::InvalidArgument(format!(
                    "rotation angle {degrees} is not one of 0, 90, 180, 270"
                ))
            })
    }

    pub fn degrees(self) -> u16 {
        self.into()
    }
}

/// Downscale ratio `numerator / denominator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleFactor {
    pub numerator: u8,
    pub denominator: u8,
}

impl ScaleFactor {
    pub fn eighths(numerator: i32) -> Result<Self, TranscodeError> {
        if !(MIN_SCALE_NUMERATOR..=MAX_SCALE_NUMERATOR).contains(&numerator) {
            return Err(TranscodeError::InvalidArgument(format!(
                "scale numerator {numerator} outside {MIN_SCALE_NUMERATOR}..={MAX_SCALE_NUMERATOR}"
            )));
        }
        Ok(Self {
            numerator: numerator as u8,
            denominator: SCALE_DENOMINATOR,
        })
    }

    pub fn is_identity(&self) -> bool {
        self.numerator == self.denominator
    }
}

/// Validated arguments of one transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformParams {
    pub rotation: Rotation,
    pub scale: ScaleFactor,
    pub quality: u8,
}

impl TransformParams {
    pub fn new(
        rotation_degrees: i32,
        scale_numerator: i32,
        quality: i32,
    ) -> Result<Self, TranscodeError> {
        let scale = ScaleFactor::eighths(scale_numerator)?;
        if !(MIN_QUALITY..=MAX_QUALITY).contains(&quality) {
            return Err(TranscodeError::InvalidArgument(format!(
                "quality {quality} outside {MIN_QUALITY}..={MAX_QUALITY}"
            )));
        }
        let rotation = Rotation::from_degrees(rotation_degrees)?;
        if scale.is_identity() && rotation == Rotation::None {
            return Err(TranscodeError::InvalidArgument(
                "no transformation requested".to_string(),
            ));
        }
        Ok(Self {
            rotation,
            scale,
            quality: quality as u8,
        })
    }
}

/// Codec-owned state that must be torn down exactly once, whether the
/// transform finishes or fails.
pub trait CodecContext {
    fn destroy(&mut self);
}

/// Stand-in for jobs that own no codec state.
impl CodecContext for () {
    fn destroy(&mut self) {}
}

/// A JPEG transform engine driven through the bridge adapters.
///
/// Implementations register their decompress/compress state in `contexts`
/// as soon as it exists, so that a failure anywhere releases exactly what
/// is live. Every adapter callback result must be propagated with `?`.
pub trait Codec {
    type Decompress: CodecContext;
    type Compress: CodecContext;

    fn transform(
        &mut self,
        contexts: &mut ErrorContext<Self::Decompress, Self::Compress>,
        source: &mut dyn SourceManager,
        destination: &mut dyn DestinationManager,
        params: &TransformParams,
    ) -> Result<(), CodecFault>;
}
