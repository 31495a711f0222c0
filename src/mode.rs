//! Coordinate transformation conventions and scale factors

use crate::error::{ResizeError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How an output pixel index maps onto a continuous input coordinate.
///
/// The integer values match the `coordinate_transformation_mode` operator
/// argument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(i32)]
pub enum CoordinateTransformationMode {
    /// `in = out * scale`
    #[default]
    None = 0,
    /// `in = (out + 0.5) * scale - 0.5` (TensorFlow >= 1.14)
    HalfPixel = 1,
    /// Like [`HalfPixel`](Self::HalfPixel), but `in = 0` when the output axis has length 1.
    PytorchHalfPixel = 2,
}

impl CoordinateTransformationMode {
    /// Whether this mode uses the `A = -0.5` table and renormalized weights.
    #[inline]
    pub fn uses_half_pixel_table(self) -> bool {
        self == Self::HalfPixel
    }

    /// Map an output coordinate to a continuous input coordinate.
    #[inline]
    pub fn source_coordinate(self, scale: f32, out_loc: usize, out_size: usize) -> f32 {
        match self {
            Self::None => out_loc as f32 * scale,
            Self::HalfPixel => (out_loc as f32 + 0.5) * scale - 0.5,
            Self::PytorchHalfPixel => {
                if out_size > 1 {
                    (out_loc as f32 + 0.5) * scale - 0.5
                } else {
                    0.0
                }
            }
        }
    }
}

impl TryFrom<i32> for CoordinateTransformationMode {
    type Error = ResizeError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::HalfPixel),
            2 => Ok(Self::PytorchHalfPixel),
            other => Err(ResizeError::UnknownCoordinateTransformationMode(other)),
        }
    }
}

/// Scale factor from output to input coordinates along one axis.
///
/// With `align_corners` the first and last pixels of both axes coincide,
/// which is only meaningful when both axes have more than one pixel.
#[inline]
pub fn calculate_resize_scale(in_size: usize, out_size: usize, align_corners: bool) -> f32 {
    if align_corners && in_size > 1 && out_size > 1 {
        (in_size - 1) as f32 / (out_size - 1) as f32
    } else {
        in_size as f32 / out_size as f32
    }
}
