//! Bicubic image resizing with TensorFlow and PyTorch numerics
//!
//! This crate resizes `[batch, channels, height, width]` float tensors with
//! bicubic convolution interpolation. Output coordinates can be mapped onto
//! the input with several conventions (see [`CoordinateTransformationMode`]),
//! so results agree with the framework a model was trained in.
//!
//! # Features
//!
//! - **Table-driven kernel**: cubic convolution weights come from a
//!   precomputed 1024-step table, built once per process
//! - **Separable 4x4 interpolation**: columns first, then rows
//! - **Parallel execution**: uses rayon over batch items and output rows
//! - **ndarray integration**: works directly with ndarray arrays
//!
//! # Example
//!
//! ```rust
//! use ndarray::Array4;
//! use resize_bicubic::{resize_bicubic, ResizeBicubicOptions};
//!
//! // A single 2x2 grayscale image
//! let input = Array4::from_shape_vec((1, 1, 2, 2), vec![1.0f32, 2.0, 3.0, 4.0]).unwrap();
//!
//! // Upsample to 4x4 with the default (scale-only) convention
//! let output = resize_bicubic(&input.view(), 4, 4, &ResizeBicubicOptions::default()).unwrap();
//! assert_eq!(output.dim(), (1, 1, 4, 4));
//! assert_eq!(output[[0, 0, 0, 0]], 1.0);
//! ```

pub mod coeffs;
pub mod error;
pub mod mode;
pub mod op;
pub mod parallel;
pub mod scalar;

#[cfg(feature = "python")]
mod python;

use ndarray::{Array4, ArrayView4, ArrayViewMut4};

pub use coeffs::{coeffs_table, CoeffsTable, TABLE_SIZE};
pub use error::{ResizeError, Result};
pub use mode::{calculate_resize_scale, CoordinateTransformationMode};
pub use op::{
    create_resize_bicubic_op, resolve_output_size, CpuResizeBicubicOp, CpuResizeKernel, DeviceType,
    GpuResizeBicubicOp, KernelFactory, MemoryType, OpConstructContext, OpContext, OpInputs, Operation,
    ResizeBicubicOptions, ResizeKernel,
};
pub use parallel::{RowBand, ThreadPool};
pub use scalar::{axis_sample, interpolate_1d, resize_image, AxisSample};

/// Resize a 4D image to `out_height x out_width` on rayon's global pool.
///
/// The `size` field of `options` is ignored; the explicit output size wins.
///
/// # Arguments
///
/// * `input` - Input `[batch, channels, height, width]` view
/// * `out_height` - Output height
/// * `out_width` - Output width
/// * `options` - Corner alignment and coordinate transformation mode
///
/// # Returns
///
/// Resized array of shape `[batch, channels, out_height, out_width]`
pub fn resize_bicubic(
    input: &ArrayView4<f32>,
    out_height: usize,
    out_width: usize,
    options: &ResizeBicubicOptions,
) -> Result<Array4<f32>> {
    let mut output = Array4::zeros((0, 0, 0, 0));
    op::resize_cpu(
        &ThreadPool::global(),
        options,
        input.view(),
        out_height,
        out_width,
        &mut output,
    )?;
    Ok(output)
}

/// Resize `input` into a pre-allocated `output`.
///
/// The output's height and width set the target size; batch and channel
/// counts must match the input. Contiguous outputs are written in place.
pub fn resize_bicubic_into(
    input: &ArrayView4<f32>,
    output: &mut ArrayViewMut4<f32>,
    options: &ResizeBicubicOptions,
) -> Result<()> {
    let (batch, channels, in_height, in_width) = input.dim();
    let (out_batch, out_channels, out_height, out_width) = output.dim();
    if out_batch != batch || out_channels != channels {
        return Err(ResizeError::OutputShapeMismatch {
            expected: [batch, channels, out_height, out_width],
            actual: [out_batch, out_channels, out_height, out_width],
        });
    }
    op::check_spatial(input, out_height, out_width)?;

    let pool = ThreadPool::global();
    match output.as_slice_mut() {
        Some(output_data) => {
            op::resize_into_slice(&pool, options, input.view(), out_height, out_width, output_data);
        }
        None => {
            let mut staged = Array4::zeros((0, 0, 0, 0));
            op::resize_cpu(&pool, options, input.view(), out_height, out_width, &mut staged)?;
            output.assign(&staged);
        }
    }
    log::trace!("resize_bicubic_into: {in_height}x{in_width} -> {out_height}x{out_width}");
    Ok(())
}
