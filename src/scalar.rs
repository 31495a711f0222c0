//! Scalar bicubic interpolation kernels
//!
//! Resizing is separable: every output pixel first interpolates four input
//! rows at the column taps, then combines those four values with the row
//! weights. Tap positions and weights come from [`axis_sample`].

use crate::coeffs::{coeffs_table, TABLE_SIZE};
use crate::mode::CoordinateTransformationMode;
use crate::parallel::ThreadPool;

/// Four source taps and their weights for one output coordinate on one axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSample {
    pub indices: [usize; 4],
    pub weights: [f32; 4],
}

/// Clamp a tap position into `[0, limit - 1]`.
#[inline]
fn bound(val: isize, limit: usize) -> usize {
    val.clamp(0, limit as isize - 1) as usize
}

/// Compute the taps and weights for output coordinate `out_loc`.
///
/// `out_size` is the output length of the axis and `limit` the input length,
/// which must be non-zero. Indices always lie in `[0, limit - 1]`.
#[inline]
pub fn axis_sample(
    scale: f32,
    mode: CoordinateTransformationMode,
    out_loc: usize,
    out_size: usize,
    limit: usize,
) -> AxisSample {
    let coeffs = coeffs_table(mode);

    let in_coord = mode.source_coordinate(scale, out_loc, out_size);
    let in_floor = in_coord.floor();
    let in_loc = in_floor as isize;
    let delta = in_coord - in_floor;
    // Ties round to even, delta < 1 keeps offset within [0, TABLE_SIZE]
    let offset = ((delta * TABLE_SIZE as f32).round_ties_even() as usize).min(TABLE_SIZE);

    let indices = [
        bound(in_loc - 1, limit),
        bound(in_loc, limit),
        bound(in_loc + 1, limit),
        bound(in_loc + 2, limit),
    ];

    let mut weights = [
        coeffs.far(offset),
        coeffs.near(offset),
        coeffs.near(TABLE_SIZE - offset),
        coeffs.far(TABLE_SIZE - offset),
    ];

    if mode.uses_half_pixel_table() {
        // Taps that fell outside the image contribute nothing
        for (i, w) in weights.iter_mut().enumerate() {
            if indices[i] as isize != in_loc - 1 + i as isize {
                *w = 0.0;
            }
        }

        let weight_sum = weights[0] + weights[1] + weights[2] + weights[3];
        if weight_sum.abs() >= 1000.0 * f32::MIN_POSITIVE {
            let one_over_weight_sum = 1.0 / weight_sum;
            for w in weights.iter_mut() {
                *w *= one_over_weight_sum;
            }
        }
    }

    AxisSample { indices, weights }
}

/// Weighted sum of four samples
#[inline]
pub fn interpolate_1d(weights: &[f32; 4], values: &[f32; 4]) -> f32 {
    values[0] * weights[0] + values[1] * weights[1] + values[2] * weights[2] + values[3] * weights[3]
}

/// Bicubic resize of a contiguous `[batch, channels, in_height, in_width]`
/// buffer into a contiguous `[batch, channels, out_height, out_width]` buffer.
///
/// Work is split over batch items and output rows on `pool`; the call blocks
/// until every output element has been written.
#[allow(clippy::too_many_arguments)]
pub fn resize_image(
    pool: &ThreadPool,
    images: &[f32],
    batch_size: usize,
    in_height: usize,
    in_width: usize,
    out_height: usize,
    out_width: usize,
    channels: usize,
    height_scale: f32,
    width_scale: f32,
    mode: CoordinateTransformationMode,
    output: &mut [f32],
) {
    debug_assert_eq!(images.len(), batch_size * channels * in_height * in_width);
    debug_assert_eq!(output.len(), batch_size * channels * out_height * out_width);

    let in_plane = in_height * in_width;

    pool.compute_2d(output, batch_size, channels, out_height, out_width, |band| {
        let b = band.batch();
        for y in band.rows() {
            let ys = axis_sample(height_scale, mode, y, out_height, in_height);
            for x in 0..out_width {
                let xs = axis_sample(width_scale, mode, x, out_width, in_width);

                for c in 0..channels {
                    // 4x4 patch around (b, c, y, x)
                    let plane_start = (b * channels + c) * in_plane;
                    let channel_input = &images[plane_start..plane_start + in_plane];

                    let mut coeff = [0.0f32; 4];
                    for (i, &row) in ys.indices.iter().enumerate() {
                        let row_input = &channel_input[row * in_width..(row + 1) * in_width];
                        let values = [
                            row_input[xs.indices[0]],
                            row_input[xs.indices[1]],
                            row_input[xs.indices[2]],
                            row_input[xs.indices[3]],
                        ];
                        coeff[i] = interpolate_1d(&xs.weights, &values);
                    }

                    band.row_mut(c, y)[x] = interpolate_1d(&ys.weights, &coeff);
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const MODES: [CoordinateTransformationMode; 3] = [
        CoordinateTransformationMode::None,
        CoordinateTransformationMode::HalfPixel,
        CoordinateTransformationMode::PytorchHalfPixel,
    ];

    #[test]
    fn test_integer_coordinate_selects_single_tap() {
        for mode in [CoordinateTransformationMode::None, CoordinateTransformationMode::PytorchHalfPixel] {
            let s = axis_sample(1.0, mode, 3, 8, 8);
            assert_eq!(s.indices, [2, 3, 4, 5]);
            assert_eq!(s.weights, [0.0, 1.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn test_midpoint_weights() {
        let s = axis_sample(0.5, CoordinateTransformationMode::None, 3, 8, 4);
        assert_eq!(s.indices, [0, 1, 2, 3]);
        assert_eq!(s.weights, [-0.09375, 0.59375, 0.59375, -0.09375]);
    }

    #[test]
    fn test_default_mode_does_not_renormalize_clamped_taps() {
        // in = 0.5 with only two input samples: taps -1 and 2 are clamped
        let s = axis_sample(0.5, CoordinateTransformationMode::None, 1, 4, 2);
        assert_eq!(s.indices, [0, 0, 1, 1]);
        assert_eq!(s.weights, [-0.09375, 0.59375, 0.59375, -0.09375]);
    }

    #[test]
    fn test_half_pixel_drops_and_renormalizes_clamped_taps() {
        // in = (0 + 0.5) * 0.5 - 0.5 = -0.25, so base = -1 and offset = 768
        let s = axis_sample(0.5, CoordinateTransformationMode::HalfPixel, 0, 8, 4);
        assert_eq!(s.indices, [0, 0, 0, 1]);
        assert_eq!(s.weights[0], 0.0);
        assert_eq!(s.weights[1], 0.0);
        assert!(s.weights[2] > 0.0);
        assert_relative_eq!(s.weights.iter().sum::<f32>(), 1.0, epsilon = 1e-6);

        let table = coeffs_table(CoordinateTransformationMode::HalfPixel);
        let near = table.near(TABLE_SIZE - 768);
        let far = table.far(TABLE_SIZE - 768);
        assert_relative_eq!(s.weights[2], near / (near + far), epsilon = 1e-6);
        assert_relative_eq!(s.weights[3], far / (near + far), epsilon = 1e-6);
    }

    #[test]
    fn test_half_pixel_interior_weights_sum_to_one() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2000 {
            let limit = rng.gen_range(4..64);
            let out_size = rng.gen_range(1..128);
            let scale = limit as f32 / out_size as f32;
            let out_loc = rng.gen_range(0..out_size);

            let s = axis_sample(scale, CoordinateTransformationMode::HalfPixel, out_loc, out_size, limit);
            let in_loc = CoordinateTransformationMode::HalfPixel
                .source_coordinate(scale, out_loc, out_size)
                .floor() as isize;
            let clamped = (0..4).any(|i| s.indices[i] as isize != in_loc - 1 + i as isize);
            if !clamped {
                assert_relative_eq!(s.weights.iter().sum::<f32>(), 1.0, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_half_pixel_clamped_weights_still_sum_to_one() {
        for out_loc in [0, 1, 62, 63] {
            let s = axis_sample(0.25, CoordinateTransformationMode::HalfPixel, out_loc, 64, 16);
            assert_relative_eq!(s.weights.iter().sum::<f32>(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_pytorch_single_output_collapses_to_origin() {
        let s = axis_sample(5.0, CoordinateTransformationMode::PytorchHalfPixel, 0, 1, 5);
        assert_eq!(s.indices, [0, 0, 1, 2]);
        assert_eq!(s.weights, [0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_offset_rounds_ties_to_even() {
        // delta * TABLE_SIZE = 0.5 exactly: ties to even gives offset 0
        let scale = 0.5 / TABLE_SIZE as f32;
        let s = axis_sample(scale, CoordinateTransformationMode::None, 1, 4, 4);
        assert_eq!(s.weights, [0.0, 1.0, 0.0, 0.0]);

        // delta * TABLE_SIZE = 1.5: rounds up to 2
        let scale = 1.5 / TABLE_SIZE as f32;
        let s = axis_sample(scale, CoordinateTransformationMode::None, 1, 4, 4);
        let table = coeffs_table(CoordinateTransformationMode::None);
        assert_eq!(s.weights[1], table.near(2));
    }

    #[test]
    fn test_indices_within_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..5000 {
            let limit = rng.gen_range(1..40);
            let out_size = rng.gen_range(1..80);
            let scale = rng.gen_range(0.01f32..8.0);
            let out_loc = rng.gen_range(0..out_size);

            for mode in MODES {
                let s = axis_sample(scale, mode, out_loc, out_size, limit);
                for &i in &s.indices {
                    assert!(i < limit, "index {i} out of range for limit {limit}");
                }
                for &w in &s.weights {
                    assert!(w.is_finite());
                }
            }
        }
    }

    #[test]
    fn test_interpolate_1d() {
        assert_eq!(interpolate_1d(&[0.0, 1.0, 0.0, 0.0], &[5.0, 6.0, 7.0, 8.0]), 6.0);
        assert_eq!(interpolate_1d(&[0.25, 0.25, 0.25, 0.25], &[1.0, 2.0, 3.0, 4.0]), 2.5);
        assert_eq!(interpolate_1d(&[-1.0, 2.0, 0.5, 0.0], &[2.0, 3.0, 4.0, 100.0]), 6.0);
    }

    #[test]
    fn test_resize_image_constant_stays_constant() {
        // Clamped taps only repeat edge samples, so a flat image stays flat
        let (b, c, h, w) = (2, 3, 5, 6);
        let (oh, ow) = (9, 4);
        let input = vec![3.5f32; b * c * h * w];
        let mut output = vec![0.0f32; b * c * oh * ow];

        for mode in MODES {
            resize_image(
                &ThreadPool::global(),
                &input,
                b,
                h,
                w,
                oh,
                ow,
                c,
                h as f32 / oh as f32,
                w as f32 / ow as f32,
                mode,
                &mut output,
            );
            for &v in &output {
                assert_relative_eq!(v, 3.5, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_resize_image_single_and_multi_thread_match() {
        let (b, c, h, w) = (3, 2, 11, 7);
        let (oh, ow) = (17, 13);
        let mut rng = StdRng::seed_from_u64(3);
        let input: Vec<f32> = (0..b * c * h * w).map(|_| rng.gen_range(-1.0..1.0)).collect();

        let run = |pool: &ThreadPool| {
            let mut output = vec![0.0f32; b * c * oh * ow];
            resize_image(
                pool,
                &input,
                b,
                h,
                w,
                oh,
                ow,
                c,
                h as f32 / oh as f32,
                w as f32 / ow as f32,
                CoordinateTransformationMode::HalfPixel,
                &mut output,
            );
            output
        };

        let single = run(&ThreadPool::with_threads(1).unwrap());
        let multi = run(&ThreadPool::with_threads(4).unwrap());
        assert_eq!(single, multi);
    }
}
