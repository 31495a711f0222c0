//! Bicubic convolution coefficient tables
//!
//! The cubic convolution kernel is sampled at `TABLE_SIZE + 1` evenly spaced
//! fractional positions. Entry `2 * i` holds the inner branch (`|x| < 1`) at
//! `x = i / TABLE_SIZE` and entry `2 * i + 1` holds the outer branch
//! (`1 <= |x| < 2`) at `x = 1 + i / TABLE_SIZE`.
//!
//! Two tables exist for the lifetime of the process: `A = -0.75` for the
//! default and PyTorch conventions, `A = -0.5` for TensorFlow's half-pixel
//! convention. Both are built on first use.

use std::sync::Arc;

use log::debug;
use once_cell::sync::Lazy;

use crate::mode::CoordinateTransformationMode;

/// Number of fractional steps between two input samples.
pub const TABLE_SIZE: usize = 1024;

/// Shape parameter used by the default and PyTorch conventions.
pub const DEFAULT_A: f32 = -0.75;

/// Shape parameter used by the TensorFlow half-pixel convention.
pub const HALF_PIXEL_A: f32 = -0.5;

static DEFAULT_TABLE: Lazy<CoeffsTable> = Lazy::new(|| CoeffsTable::new(DEFAULT_A));
static HALF_PIXEL_TABLE: Lazy<CoeffsTable> = Lazy::new(|| CoeffsTable::new(HALF_PIXEL_A));

/// Immutable lookup table of the cubic convolution kernel
#[derive(Debug, Clone)]
pub struct CoeffsTable {
    a: f32,
    coeffs: Arc<[f32]>,
}

impl CoeffsTable {
    /// Sample the cubic convolution kernel with shape parameter `a`.
    pub fn new(a: f32) -> Self {
        debug!("building bicubic coefficients table: a={a}, table_size={TABLE_SIZE}");

        let mut coeffs = Vec::with_capacity((TABLE_SIZE + 1) * 2);
        for i in 0..=TABLE_SIZE {
            let x = i as f32 / TABLE_SIZE as f32;
            coeffs.push(((a + 2.0) * x - (a + 3.0)) * x * x + 1.0);
            let x = x + 1.0;
            coeffs.push(((a * x - 5.0 * a) * x + 8.0 * a) * x - 4.0 * a);
        }

        Self {
            a,
            coeffs: coeffs.into(),
        }
    }

    /// Shape parameter the table was built from
    #[inline]
    pub fn a(&self) -> f32 {
        self.a
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.coeffs
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.coeffs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Inner-branch weight for a tap at distance `offset / TABLE_SIZE`.
    #[inline]
    pub fn near(&self, offset: usize) -> f32 {
        self.coeffs[offset * 2]
    }

    /// Outer-branch weight for a tap at distance `1 + offset / TABLE_SIZE`.
    #[inline]
    pub fn far(&self, offset: usize) -> f32 {
        self.coeffs[offset * 2 + 1]
    }

    /// Whether two handles share the same backing storage.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.coeffs, &other.coeffs)
    }
}

/// Shared table for a coordinate transformation mode.
///
/// Concurrent first calls still build each table exactly once.
#[inline]
pub fn coeffs_table(mode: CoordinateTransformationMode) -> &'static CoeffsTable {
    if mode.uses_half_pixel_table() {
        &HALF_PIXEL_TABLE
    } else {
        &DEFAULT_TABLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn inner(a: f32, x: f32) -> f32 {
        ((a + 2.0) * x - (a + 3.0)) * x * x + 1.0
    }

    fn outer(a: f32, x: f32) -> f32 {
        ((a * x - 5.0 * a) * x + 8.0 * a) * x - 4.0 * a
    }

    #[test]
    fn test_table_length() {
        let table = CoeffsTable::new(DEFAULT_A);
        assert_eq!(table.len(), 2 * (TABLE_SIZE + 1));
        assert_eq!(table.a(), DEFAULT_A);
    }

    #[test]
    fn test_branch_formulas_at_reference_offsets() {
        let table = CoeffsTable::new(DEFAULT_A);
        let k = TABLE_SIZE;

        for i in [0, k / 2, k] {
            let x = i as f32 / k as f32;
            assert_eq!(table.near(i), inner(DEFAULT_A, x));
            assert_eq!(table.far(i), outer(DEFAULT_A, x + 1.0));

            // Complementary offset addresses the mirrored tap
            let xc = (k - i) as f32 / k as f32;
            assert_eq!(table.near(k - i), inner(DEFAULT_A, xc));
            assert_eq!(table.far(k - i), outer(DEFAULT_A, xc + 1.0));
        }
    }

    #[test]
    fn test_kernel_endpoints() {
        for a in [DEFAULT_A, HALF_PIXEL_A] {
            let table = CoeffsTable::new(a);
            // w(0) = 1, w(1) = 0, w(2) = 0
            assert_eq!(table.near(0), 1.0);
            assert_eq!(table.near(TABLE_SIZE), 0.0);
            assert_eq!(table.far(0), 0.0);
            assert_eq!(table.far(TABLE_SIZE), 0.0);
        }
    }

    #[test]
    fn test_taps_sum_to_one() {
        // The four taps around any fractional position form a partition of unity
        for a in [DEFAULT_A, HALF_PIXEL_A] {
            let table = CoeffsTable::new(a);
            for offset in (0..=TABLE_SIZE).step_by(7) {
                let sum = table.far(offset)
                    + table.near(offset)
                    + table.near(TABLE_SIZE - offset)
                    + table.far(TABLE_SIZE - offset);
                assert_relative_eq!(sum, 1.0, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_half_point_values() {
        let table = CoeffsTable::new(DEFAULT_A);
        assert_eq!(table.near(TABLE_SIZE / 2), 0.59375);
        assert_eq!(table.far(TABLE_SIZE / 2), -0.09375);
    }

    #[test]
    fn test_cache_selects_table_by_mode() {
        assert_eq!(coeffs_table(CoordinateTransformationMode::None).a(), DEFAULT_A);
        assert_eq!(coeffs_table(CoordinateTransformationMode::PytorchHalfPixel).a(), DEFAULT_A);
        assert_eq!(coeffs_table(CoordinateTransformationMode::HalfPixel).a(), HALF_PIXEL_A);
    }

    #[test]
    fn test_cache_is_shared_across_threads() {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                std::thread::spawn(move || {
                    let mode = if i % 2 == 0 {
                        CoordinateTransformationMode::None
                    } else {
                        CoordinateTransformationMode::HalfPixel
                    };
                    coeffs_table(mode).clone()
                })
            })
            .collect();

        let tables: Vec<CoeffsTable> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let default = coeffs_table(CoordinateTransformationMode::None);
        let half = coeffs_table(CoordinateTransformationMode::HalfPixel);

        for (i, table) in tables.iter().enumerate() {
            if i % 2 == 0 {
                assert!(table.ptr_eq(default));
            } else {
                assert!(table.ptr_eq(half));
            }
        }
        assert!(!default.ptr_eq(half));
    }
}
