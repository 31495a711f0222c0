//! Error types for the resize operator

use crate::op::MemoryType;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ResizeError>;

/// Failures detected before any interpolation work is dispatched.
#[derive(Debug, Error)]
pub enum ResizeError {
    #[error("input must be 4-dimensional, got rank {0}")]
    InvalidRank(usize),

    #[error("no usable static size and no size input tensor was provided")]
    MissingSizeInput,

    #[error("size tensor must have shape [2], got {0:?}")]
    InvalidSizeTensor(Vec<usize>),

    #[error("output size must be positive, got {height}x{width}")]
    NonPositiveSize { height: i64, width: i64 },

    #[error("cannot resize empty input of spatial size {height}x{width}")]
    EmptyInput { height: usize, width: usize },

    #[error("output shape {0:?} overflows usize")]
    ShapeOverflow([usize; 4]),

    #[error("failed to allocate output of {elements} elements")]
    Allocation { elements: usize },

    #[error("output shape {actual:?} does not match expected {expected:?}")]
    OutputShapeMismatch {
        expected: [usize; 4],
        actual: [usize; 4],
    },

    #[error("memory type {0:?} is not supported by the accelerator resize kernel")]
    UnsupportedMemoryType(MemoryType),

    #[error("accelerator device requested but no resize kernel was supplied")]
    MissingAcceleratorKernel,

    #[error("unknown coordinate transformation mode {0}")]
    UnknownCoordinateTransformationMode(i32),

    #[error("thread pool error: {0}")]
    ThreadPool(String),

    #[error("resize kernel failed: {0}")]
    Kernel(String),
}
